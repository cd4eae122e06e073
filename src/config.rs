use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One positive integer weight per soft policy. A weight of zero disables
/// the policy without touching the hard model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PenaltyWeights {
    pub maths_count: i64,
    pub maths_consecutive: i64,
    pub maths_clash: i64,
    pub s2i_window: i64,
    pub same_day: i64,
    pub back_to_back: i64,
    pub teacher_repeat: i64,
    pub goubet_coverage: i64,
    pub berteloot_coverage: i64,
    pub other_coverage: i64,
}

impl Default for PenaltyWeights {
    fn default() -> PenaltyWeights {
        PenaltyWeights {
            maths_count: 15,
            maths_consecutive: 20,
            maths_clash: 25,
            s2i_window: 25,
            same_day: 6,
            back_to_back: 10,
            teacher_repeat: 8,
            goubet_coverage: 20,
            berteloot_coverage: 20,
            other_coverage: 2,
        }
    }
}

impl PenaltyWeights {
    /// Hard-constraints-only run: every preference switched off.
    pub fn disabled() -> PenaltyWeights {
        PenaltyWeights {
            maths_count: 0,
            maths_consecutive: 0,
            maths_clash: 0,
            s2i_window: 0,
            same_day: 0,
            back_to_back: 0,
            teacher_repeat: 0,
            goubet_coverage: 0,
            berteloot_coverage: 0,
            other_coverage: 0,
        }
    }
}

/// Scalar run configuration, read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub weights: PenaltyWeights,
    pub time_budget_secs: u64,
    pub workers: u32,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            weights: PenaltyWeights::default(),
            time_budget_secs: 21_600,
            workers: 12,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_standing_policy() {
        let config = Config::default();
        assert_eq!(config.weights.maths_count, 15);
        assert_eq!(config.weights.other_coverage, 2);
        assert_eq!(config.time_budget_secs, 21_600);
        assert_eq!(config.workers, 12);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let config: Config =
            serde_json::from_str(r#"{"workers": 4, "weights": {"same_day": 9}}"#).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.weights.same_day, 9);
        assert_eq!(config.weights.maths_count, 15);
        assert_eq!(config.time_budget_secs, 21_600);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"tiem_budget_secs": 3}"#).is_err());
    }
}
