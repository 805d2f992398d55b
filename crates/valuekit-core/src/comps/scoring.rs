//! Relative-value scoring of peers from their valuation multiples.
//!
//! Each selected metric is normalised to a z-score across the peers that
//! report it, and a peer's score is the sum of its z-scores. Lower scores
//! mean cheaper relative to the group. A missing value is left out of the
//! metric's mean and standard deviation and contributes zero to its own
//! peer, so one gap never drops a peer from the comparison. A metric whose
//! statistics leave the `Decimal` range is dropped with a warning instead
//! of failing the whole group.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::error::ValuationError;
use crate::financials::MultipleSet;
use crate::types::{with_metadata, ComputationOutput};
use crate::ValuationResult;

use super::bands::{classify_multiple, MultipleBand};
use super::statistics::MetricStatistics;

/// Identifier of a peer, usually its ticker.
pub type PeerId = String;

/// Peers below this count give z-scores with little meaning.
const MIN_MEANINGFUL_PEERS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringInput {
    pub peers: BTreeMap<PeerId, MultipleSet>,
    /// Metrics to score. `None` scores every metric any peer reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_metrics: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPeer {
    /// 1-based position, cheapest first
    pub rank: usize,
    pub peer: PeerId,
    pub score: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringOutput {
    pub scores: BTreeMap<PeerId, Decimal>,
    pub ranking: Vec<RankedPeer>,
    pub best_peer: Option<PeerId>,
    /// Per-peer z-score of each scored metric the peer reports
    pub z_profiles: BTreeMap<PeerId, BTreeMap<String, Decimal>>,
    pub statistics: Vec<MetricStatistics>,
    /// Display band of each reported raw multiple
    pub bands: BTreeMap<PeerId, BTreeMap<String, MultipleBand>>,
    pub metrics_scored: Vec<String>,
}

/// Per-metric statistics over the peers that report the metric. Metrics no
/// peer reports, and metrics whose statistics overflow, are omitted.
pub fn metric_statistics(
    peers: &BTreeMap<PeerId, MultipleSet>,
    metrics: &BTreeSet<String>,
) -> Vec<MetricStatistics> {
    metrics
        .iter()
        .filter_map(|metric| {
            let values = reported_values(peers, metric);
            match MetricStatistics::from_values(metric, &values) {
                Ok(stats) => stats,
                Err(e) => {
                    tracing::warn!(%metric, error = %e, "metric statistics dropped");
                    None
                }
            }
        })
        .collect()
}

/// Aggregate z-score per peer. Every peer in `peers` gets an entry.
pub fn score_peers(
    peers: &BTreeMap<PeerId, MultipleSet>,
    metrics: &BTreeSet<String>,
) -> BTreeMap<PeerId, Decimal> {
    let stats = metric_statistics(peers, metrics);
    peers
        .iter()
        .map(|(id, set)| {
            let score = z_profile(set, &stats).values().copied().sum();
            (id.clone(), score)
        })
        .collect()
}

/// Peers sorted by ascending score; equal scores fall back to peer id.
pub fn rank_peers(scores: &BTreeMap<PeerId, Decimal>) -> Vec<RankedPeer> {
    let mut ordered: Vec<(&PeerId, &Decimal)> = scores.iter().collect();
    ordered.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, (peer, score))| RankedPeer {
            rank: i + 1,
            peer: peer.clone(),
            score: *score,
        })
        .collect()
}

/// The peer with the lowest score, if any.
pub fn best_peer(scores: &BTreeMap<PeerId, Decimal>) -> Option<PeerId> {
    rank_peers(scores).into_iter().next().map(|r| r.peer)
}

/// Score, rank and profile a peer group.
pub fn calculate_peer_scores(
    input: &ScoringInput,
) -> ValuationResult<ComputationOutput<ScoringOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.peers.is_empty() {
        return Err(ValuationError::InvalidInput {
            field: "peers".into(),
            reason: "At least one peer is required".into(),
        });
    }

    let metrics = match &input.selected_metrics {
        Some(selected) if selected.is_empty() => {
            return Err(ValuationError::InvalidInput {
                field: "selected_metrics".into(),
                reason: "Select at least one metric to score".into(),
            });
        }
        Some(selected) => selected.clone(),
        None => input
            .peers
            .values()
            .flat_map(|set| set.iter().filter(|(_, v)| v.is_some()).map(|(k, _)| k.clone()))
            .collect(),
    };

    if input.peers.len() < MIN_MEANINGFUL_PEERS {
        warnings.push(format!(
            "Only {} peer(s); z-scores need at least {MIN_MEANINGFUL_PEERS} to be meaningful",
            input.peers.len()
        ));
    }

    let statistics = metric_statistics(&input.peers, &metrics);
    for metric in &metrics {
        match statistics.iter().find(|s| &s.metric == metric) {
            None if !reported_values(&input.peers, metric).is_empty() => warnings.push(format!(
                "'{metric}' statistics are out of representable range; metric dropped"
            )),
            None => warnings.push(format!("No peer reports '{metric}'; metric ignored")),
            Some(s) if s.std_dev.is_zero() => warnings.push(format!(
                "'{metric}' has no spread across peers; it contributes nothing to the scores"
            )),
            Some(_) => {}
        }
    }

    let z_profiles: BTreeMap<PeerId, BTreeMap<String, Decimal>> = input
        .peers
        .iter()
        .map(|(id, set)| (id.clone(), z_profile(set, &statistics)))
        .collect();
    let scores: BTreeMap<PeerId, Decimal> = z_profiles
        .iter()
        .map(|(id, profile)| (id.clone(), profile.values().copied().sum()))
        .collect();
    let ranking = rank_peers(&scores);
    let best_peer = ranking.first().map(|r| r.peer.clone());

    let bands = input
        .peers
        .iter()
        .map(|(id, set)| {
            let banded = set
                .iter()
                .filter(|(metric, _)| metrics.contains(*metric))
                .filter_map(|(metric, v)| v.map(|v| (metric.clone(), classify_multiple(v))))
                .collect();
            (id.clone(), banded)
        })
        .collect();

    tracing::debug!(
        peers = input.peers.len(),
        metrics = metrics.len(),
        best = ?best_peer,
        "peer scoring complete"
    );

    let output = ScoringOutput {
        scores,
        ranking,
        best_peer,
        z_profiles,
        metrics_scored: statistics.iter().map(|s| s.metric.clone()).collect(),
        statistics,
        bands,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Comparable multiples (sum of z-scores, lower is cheaper)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn reported_values(peers: &BTreeMap<PeerId, MultipleSet>, metric: &str) -> Vec<Decimal> {
    peers
        .values()
        .filter_map(|set| set.get(metric).copied().flatten())
        .collect()
}

fn z_profile(set: &MultipleSet, stats: &[MetricStatistics]) -> BTreeMap<String, Decimal> {
    stats
        .iter()
        .filter_map(|s| {
            let value = set.get(&s.metric).copied().flatten()?;
            s.z_score(value).map(|z| (s.metric.clone(), z))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn peer(values: &[(&str, Option<Decimal>)]) -> MultipleSet {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.0000001)
    }

    fn metrics(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn three_peers() -> BTreeMap<PeerId, MultipleSet> {
        let mut peers = BTreeMap::new();
        peers.insert("AAA".into(), peer(&[("P/E", Some(dec!(10))), ("EV/EBITDA", Some(dec!(8)))]));
        peers.insert("BBB".into(), peer(&[("P/E", Some(dec!(20))), ("EV/EBITDA", Some(dec!(12)))]));
        peers.insert("CCC".into(), peer(&[("P/E", Some(dec!(30))), ("EV/EBITDA", Some(dec!(10)))]));
        peers
    }

    #[test]
    fn test_scores_sum_z_per_metric() {
        let scores = score_peers(&three_peers(), &metrics(&["P/E"]));
        assert!(close(scores["AAA"], dec!(-1)));
        assert!(close(scores["BBB"], Decimal::ZERO));
        assert!(close(scores["CCC"], Decimal::ONE));
    }

    #[test]
    fn test_scores_sum_to_zero_without_gaps() {
        let scores = score_peers(&three_peers(), &metrics(&["P/E", "EV/EBITDA"]));
        let total: Decimal = scores.values().copied().sum();
        assert!(close(total, Decimal::ZERO));
    }

    #[test]
    fn test_equal_values_give_zero_scores() {
        let mut peers = BTreeMap::new();
        peers.insert("A".into(), peer(&[("P/E", Some(dec!(15)))]));
        peers.insert("B".into(), peer(&[("P/E", Some(dec!(15)))]));
        let scores = score_peers(&peers, &metrics(&["P/E"]));
        assert!(scores.values().all(|s| s.is_zero()));
    }

    #[test]
    fn test_missing_value_excluded_and_contributes_zero() {
        let mut peers = three_peers();
        peers.insert("DDD".into(), peer(&[("P/E", None), ("EV/EBITDA", Some(dec!(10)))]));
        let scores = score_peers(&peers, &metrics(&["P/E"]));
        // P/E statistics are still computed over AAA, BBB and CCC only
        assert!(close(scores["AAA"], dec!(-1)));
        assert_eq!(scores["DDD"], Decimal::ZERO);
        assert_eq!(scores.len(), 4);
    }

    #[test]
    fn test_metric_missing_everywhere_contributes_nothing() {
        let scores = score_peers(&three_peers(), &metrics(&["P/E", "Forward P/E"]));
        assert!(close(scores["AAA"], dec!(-1)));
    }

    #[test]
    fn test_rank_ties_broken_by_id() {
        let mut scores = BTreeMap::new();
        scores.insert("ZZZ".to_string(), dec!(-0.5));
        scores.insert("MMM".to_string(), dec!(0.2));
        scores.insert("AAA".to_string(), dec!(-0.5));
        let ranking = rank_peers(&scores);
        assert_eq!(ranking[0].peer, "AAA");
        assert_eq!(ranking[1].peer, "ZZZ");
        assert_eq!(ranking[2].rank, 3);
        assert_eq!(best_peer(&scores), Some("AAA".to_string()));
    }

    #[test]
    fn test_calculate_peer_scores_envelope() {
        let input = ScoringInput {
            peers: three_peers(),
            selected_metrics: None,
        };
        let out = calculate_peer_scores(&input).unwrap();
        let result = &out.result;
        assert_eq!(result.best_peer.as_deref(), Some("AAA"));
        assert_eq!(result.metrics_scored.len(), 2);
        assert!(close(result.z_profiles["CCC"]["P/E"], Decimal::ONE));
        assert_eq!(result.bands["AAA"]["P/E"], MultipleBand::Low);
        assert_eq!(result.bands["CCC"]["P/E"], MultipleBand::High);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let no_peers = ScoringInput {
            peers: BTreeMap::new(),
            selected_metrics: None,
        };
        assert!(calculate_peer_scores(&no_peers).is_err());

        let no_metrics = ScoringInput {
            peers: three_peers(),
            selected_metrics: Some(BTreeSet::new()),
        };
        assert!(calculate_peer_scores(&no_metrics).is_err());
    }

    #[test]
    fn test_overflowing_metric_dropped_with_warning() {
        let mut peers = three_peers();
        peers.get_mut("AAA").unwrap().insert("P/S".into(), Some(dec!(1_000_000_000_000_000)));
        peers.get_mut("BBB").unwrap().insert("P/S".into(), Some(dec!(3_000_000_000_000_000)));
        peers.get_mut("CCC").unwrap().insert("P/S".into(), Some(dec!(5_000_000_000_000_000)));
        let input = ScoringInput {
            peers,
            selected_metrics: None,
        };
        let out = calculate_peer_scores(&input).unwrap();
        let result = &out.result;
        assert!(out
            .warnings
            .iter()
            .any(|w| w.contains("P/S") && w.contains("out of representable range")));
        assert!(!result.metrics_scored.contains(&"P/S".to_string()));
        assert_eq!(result.metrics_scored.len(), 2);
        assert_eq!(result.best_peer.as_deref(), Some("AAA"));
        assert!(!result.z_profiles["AAA"].contains_key("P/S"));
    }

    #[test]
    fn test_unreported_metric_warns() {
        let input = ScoringInput {
            peers: three_peers(),
            selected_metrics: Some(metrics(&["P/E", "Forward P/E"])),
        };
        let out = calculate_peer_scores(&input).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("Forward P/E")));
        assert_eq!(out.result.metrics_scored, vec!["P/E".to_string()]);
    }
}
