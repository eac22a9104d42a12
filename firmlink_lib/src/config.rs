//! Calibration constants and run settings.
//!
//! Every numeric constant the matcher uses lives here under a name, with a
//! default that reproduces the tuned behaviour. Constants are calibration
//! artifacts: re-derive them from a labelled sample (see `calibration`)
//! rather than trusting the defaults on a new corpus.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lexicon::LexiconError;
use crate::types::Strategy;

/// Error types for configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid lexicon: {0}")]
    Lexicon(#[from] LexiconError),
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BlockingConfig {
    /// Minimum character length of an indexed token.
    pub min_token_len: usize,
    /// Shared significant tokens needed for a token-index candidate.
    pub min_token_overlap: usize,
    /// Upper bound on the candidate set per entity.
    pub max_candidates: usize,
    /// Tokens shared by more firms than this are too common to block on.
    pub max_token_postings: usize,
    /// Leading characters of the separator-free name also used as a blocking
    /// key, so misspelled single-token names still reach fuzzy comparison.
    /// Zero disables.
    pub prefix_len: usize,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            min_token_len: 3,
            min_token_overlap: 1,
            max_candidates: 200,
            max_token_postings: 2000,
            prefix_len: 4,
        }
    }
}

/// Base confidence per strategy and signal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StrategyConfidences {
    pub exact_name: f64,
    pub ticker_acronym: f64,
    pub ticker_enriched: f64,
    pub acronym_initials: f64,
    pub homepage_domain: f64,
    pub homepage_domain_variant: f64,
    pub alternate_name: f64,
    pub substring_word: f64,
    pub substring_partial: f64,
    pub subsidiary: f64,
    pub ultra_clean: f64,
    pub fuzzy_min: f64,
    pub fuzzy_max: f64,
    /// Multiplier applied to a parent's confidence when a child inherits it.
    pub cascade_discount: f64,
}

impl Default for StrategyConfidences {
    fn default() -> Self {
        Self {
            exact_name: 0.99,
            ticker_acronym: 0.96,
            ticker_enriched: 0.97,
            acronym_initials: 0.93,
            homepage_domain: 0.98,
            homepage_domain_variant: 0.97,
            alternate_name: 0.96,
            substring_word: 0.95,
            substring_partial: 0.94,
            subsidiary: 0.92,
            ultra_clean: 0.98,
            fuzzy_min: 0.86,
            fuzzy_max: 0.92,
            cascade_discount: 0.95,
        }
    }
}

/// Thresholds used inside individual strategies.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    /// Whole-word containment needs a contained name at least this long.
    pub substring_min_word_len: usize,
    /// Raw in-word containment needs a contained name at least this long.
    pub substring_min_len: usize,
    pub fuzzy_threshold: f64,
    pub fuzzy_min_len: usize,
    pub acronym_min_len: usize,
    pub acronym_max_len: usize,
    /// Name similarity that corroborates a ticker/acronym hit.
    pub name_similarity_corroboration: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            substring_min_word_len: 5,
            substring_min_len: 8,
            fuzzy_threshold: 0.93,
            fuzzy_min_len: 5,
            acronym_min_len: 2,
            acronym_max_len: 6,
            name_similarity_corroboration: 0.90,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ValidatorConfig {
    pub country_match_boost: f64,
    pub country_mismatch_penalty: f64,
    pub description_overlap_boost: f64,
    /// Entity tokens shorter than this never count as description overlap.
    pub description_min_token_len: usize,
    pub city_boost: f64,
    pub region_boost: f64,
    pub url_similarity_boost: f64,
    pub url_similarity_threshold: f64,
    /// Ceiling on the sum of positive boosts for one candidate.
    pub max_total_boost: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            country_match_boost: 0.02,
            country_mismatch_penalty: 0.02,
            description_overlap_boost: 0.02,
            description_min_token_len: 4,
            city_boost: 0.01,
            region_boost: 0.005,
            url_similarity_boost: 0.01,
            url_similarity_threshold: 0.90,
            max_total_boost: 0.04,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub timeout_ms: u64,
    pub max_concurrency: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            max_concurrency: 8,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Lower edges of the confidence bands above the acceptance floor.
    pub bands: Vec<f64>,
    pub max_strategy_error_rate: f64,
    pub min_labelled_per_strategy: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            bands: vec![0.90, 0.95, 0.98],
            max_strategy_error_rate: 0.10,
            min_labelled_per_strategy: 20,
        }
    }
}

/// Complete matcher configuration. Immutable for the duration of a run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// Candidates below this after validation are dropped.
    pub acceptance_floor: f64,
    pub high_confidence_threshold: f64,
    /// Normalized names shorter than this never survive via collision-prone
    /// strategies.
    pub min_name_len: usize,
    pub disabled_strategies: BTreeSet<Strategy>,
    pub blocking: BlockingConfig,
    pub confidences: StrategyConfidences,
    pub matching: MatchingConfig,
    pub validators: ValidatorConfig,
    pub enrichment: EnrichmentConfig,
    pub sampling: SamplingConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            acceptance_floor: 0.85,
            high_confidence_threshold: 0.94,
            min_name_len: 3,
            disabled_strategies: BTreeSet::new(),
            blocking: BlockingConfig::default(),
            confidences: StrategyConfidences::default(),
            matching: MatchingConfig::default(),
            validators: ValidatorConfig::default(),
            enrichment: EnrichmentConfig::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("{} is outside [0, 1]", value),
        });
    }
    Ok(())
}

impl MatchConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn is_enabled(&self, strategy: Strategy) -> bool {
        !self.disabled_strategies.contains(&strategy)
    }

    /// Check ranges and orderings that the matcher relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("acceptance_floor", self.acceptance_floor)?;
        check_unit("high_confidence_threshold", self.high_confidence_threshold)?;
        if self.high_confidence_threshold < self.acceptance_floor {
            return Err(ConfigError::InvalidValue {
                field: "high_confidence_threshold",
                reason: "must not be below acceptance_floor".to_string(),
            });
        }

        let c = &self.confidences;
        for (field, value) in [
            ("confidences.exact_name", c.exact_name),
            ("confidences.ticker_acronym", c.ticker_acronym),
            ("confidences.ticker_enriched", c.ticker_enriched),
            ("confidences.acronym_initials", c.acronym_initials),
            ("confidences.homepage_domain", c.homepage_domain),
            ("confidences.homepage_domain_variant", c.homepage_domain_variant),
            ("confidences.alternate_name", c.alternate_name),
            ("confidences.substring_word", c.substring_word),
            ("confidences.substring_partial", c.substring_partial),
            ("confidences.subsidiary", c.subsidiary),
            ("confidences.ultra_clean", c.ultra_clean),
            ("confidences.fuzzy_min", c.fuzzy_min),
            ("confidences.fuzzy_max", c.fuzzy_max),
            ("confidences.cascade_discount", c.cascade_discount),
            ("matching.fuzzy_threshold", self.matching.fuzzy_threshold),
            (
                "matching.name_similarity_corroboration",
                self.matching.name_similarity_corroboration,
            ),
            ("validators.max_total_boost", self.validators.max_total_boost),
            (
                "validators.url_similarity_threshold",
                self.validators.url_similarity_threshold,
            ),
            (
                "sampling.max_strategy_error_rate",
                self.sampling.max_strategy_error_rate,
            ),
        ] {
            check_unit(field, value)?;
        }
        if c.fuzzy_min > c.fuzzy_max {
            return Err(ConfigError::InvalidValue {
                field: "confidences.fuzzy_min",
                reason: "must not exceed fuzzy_max".to_string(),
            });
        }

        if self.matching.acronym_min_len == 0
            || self.matching.acronym_min_len > self.matching.acronym_max_len
        {
            return Err(ConfigError::InvalidValue {
                field: "matching.acronym_min_len",
                reason: "must be positive and not exceed acronym_max_len".to_string(),
            });
        }
        if self.blocking.max_candidates == 0 {
            return Err(ConfigError::InvalidValue {
                field: "blocking.max_candidates",
                reason: "must be positive".to_string(),
            });
        }
        if self.blocking.min_token_overlap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "blocking.min_token_overlap",
                reason: "must be positive".to_string(),
            });
        }
        if self.enrichment.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "enrichment.max_concurrency",
                reason: "must be positive".to_string(),
            });
        }

        let bands = &self.sampling.bands;
        if bands.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::InvalidValue {
                field: "sampling.bands",
                reason: "must be strictly increasing".to_string(),
            });
        }
        for band in bands {
            check_unit("sampling.bands", *band)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
acceptance_floor = 0.9
disabled_strategies = ["fuzzy"]

[confidences]
exact_name = 0.995

[blocking]
max_candidates = 50
"#;
        let config = MatchConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.acceptance_floor, 0.9);
        assert_eq!(config.confidences.exact_name, 0.995);
        assert_eq!(config.confidences.alternate_name, 0.96);
        assert_eq!(config.blocking.max_candidates, 50);
        assert_eq!(config.blocking.min_token_len, 3);
        assert!(!config.is_enabled(Strategy::Fuzzy));
        assert!(config.is_enabled(Strategy::ExactName));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let result = MatchConfig::from_toml_str("acceptance_floor = 1.5");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "acceptance_floor",
                ..
            })
        ));
    }

    #[test]
    fn test_threshold_below_floor_rejected() {
        let result =
            MatchConfig::from_toml_str("acceptance_floor = 0.9\nhigh_confidence_threshold = 0.8");
        assert!(result.is_err());
    }

    #[test]
    fn test_unsorted_bands_rejected() {
        let result = MatchConfig::from_toml_str("[sampling]\nbands = [0.95, 0.90]");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result = MatchConfig::from_toml_str("disabled_strategies = [\"psychic\"]");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = MatchConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(MatchConfig::from_toml_str(&text).unwrap(), config);
    }
}
