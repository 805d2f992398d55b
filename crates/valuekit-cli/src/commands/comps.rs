use clap::Args;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;

use valuekit_core::comps::scoring::{self, ScoringInput};
use valuekit_core::financials::{FinancialSnapshot, MultipleSet, STANDARD_METRICS};

use crate::input;

/// Arguments for peer multiples scoring
#[derive(Args)]
pub struct CompsArgs {
    /// JSON array of company snapshots, or a scoring input object
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated metrics to score (e.g. "P/E Ratio (TTM),EV/EBITDA")
    #[arg(long, value_delimiter = ',')]
    pub metrics: Option<Vec<String>>,

    /// Score the standard multiples only
    #[arg(long, conflicts_with = "metrics")]
    pub standard: bool,
}

pub fn run_comps(args: CompsArgs) -> Result<Value, Box<dyn Error>> {
    let data: Value = input::load(args.input.as_deref())?
        .ok_or("--input file (or piped JSON) is required for comps analysis")?;

    let mut scoring_input = if data.is_array() {
        let snapshots: Vec<FinancialSnapshot> = serde_json::from_value(data)?;
        ScoringInput {
            peers: peers_from_snapshots(snapshots)?,
            selected_metrics: None,
        }
    } else {
        serde_json::from_value(data)?
    };

    if let Some(metrics) = args.metrics {
        scoring_input.selected_metrics = Some(
            metrics
                .into_iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
        );
    } else if args.standard {
        scoring_input.selected_metrics =
            Some(STANDARD_METRICS.iter().map(|m| m.to_string()).collect::<BTreeSet<_>>());
    }

    let result = scoring::calculate_peer_scores(&scoring_input)?;
    Ok(serde_json::to_value(result)?)
}

fn peers_from_snapshots(
    snapshots: Vec<FinancialSnapshot>,
) -> Result<BTreeMap<String, MultipleSet>, Box<dyn Error>> {
    let mut peers = BTreeMap::new();
    for snap in snapshots {
        if peers.contains_key(&snap.ticker) {
            return Err(format!("Duplicate ticker '{}' in peer list", snap.ticker).into());
        }
        peers.insert(snap.ticker.clone(), snap.multiples);
    }
    Ok(peers)
}
