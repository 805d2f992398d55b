use serde::{Deserialize, Serialize};
use std::error::Error;

use valuekit_core::valuation::capm::CapmAssumptions;
use valuekit_core::valuation::peer_comparison::PeerDcfAssumptions;

use crate::input;

/// Environment variable naming a house assumptions file.
pub const ASSUMPTIONS_ENV: &str = "VALUEKIT_ASSUMPTIONS";

/// Market and house assumptions shared by every command.
///
/// Loaded once at startup and passed by reference; commands never mutate
/// it. Any section left out of the file keeps its built-in default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseAssumptions {
    pub capm: CapmAssumptions,
    pub peer_dcf: PeerDcfAssumptions,
}

impl HouseAssumptions {
    /// Load from `path`, then `$VALUEKIT_ASSUMPTIONS`, else built-in defaults.
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let path = path
            .map(str::to_string)
            .or_else(|| std::env::var(ASSUMPTIONS_ENV).ok());
        match path {
            Some(p) => {
                let house: HouseAssumptions = input::file::read_structured(&p)?;
                tracing::info!(path = %p, "loaded house assumptions");
                Ok(house)
            }
            None => Ok(HouseAssumptions::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "capm:\n  risk_free_rate: '0.04'\n  market_return: '0.085'\n";
        let house: HouseAssumptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(house.capm.risk_free_rate, dec!(0.04));
        assert_eq!(house.capm.default_beta, dec!(1));
        assert_eq!(house.peer_dcf.exit_multiple, dec!(12));
    }

    #[test]
    fn test_peer_section_overrides_single_field() {
        let json = r#"{ "peer_dcf": { "growth_rate": "0.07" } }"#;
        let house: HouseAssumptions = serde_json::from_str(json).unwrap();
        assert_eq!(house.peer_dcf.growth_rate, dec!(0.07));
        assert_eq!(house.peer_dcf.discount_rate, dec!(0.10));
        assert_eq!(house.capm.risk_free_rate, dec!(0.045));
    }
}
