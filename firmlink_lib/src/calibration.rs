//! Turns a labelled validation sample into recommendations for the next run.
//!
//! Nothing here mutates a live configuration: `apply_to` returns a new
//! `MatchConfig` that the caller may persist and load for a later run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::types::{HumanLabel, SampleRecord, Strategy};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StrategyCalibration {
    pub strategy: Strategy,
    pub sampled: usize,
    /// Samples labelled correct or incorrect; unsure and unlabelled excluded.
    pub labelled: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub precision: Option<f64>,
    pub error_rate: Option<f64>,
    /// Observed precision, offered as the base confidence for the next run
    /// once enough labels exist.
    pub suggested_confidence: Option<f64>,
    pub recommend_disable: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CalibrationReport {
    pub strategies: BTreeMap<Strategy, StrategyCalibration>,
}

/// Per-strategy precision and disable recommendations.
pub fn calibrate(samples: &[SampleRecord], config: &MatchConfig) -> CalibrationReport {
    let mut report = CalibrationReport::default();
    for sample in samples {
        let entry = report
            .strategies
            .entry(sample.strategy)
            .or_insert_with(|| StrategyCalibration {
                strategy: sample.strategy,
                sampled: 0,
                labelled: 0,
                correct: 0,
                incorrect: 0,
                precision: None,
                error_rate: None,
                suggested_confidence: None,
                recommend_disable: false,
            });
        entry.sampled += 1;
        match sample.human_label {
            Some(HumanLabel::Correct) => entry.correct += 1,
            Some(HumanLabel::Incorrect) => entry.incorrect += 1,
            Some(HumanLabel::Unsure) | None => {}
        }
    }

    for entry in report.strategies.values_mut() {
        entry.labelled = entry.correct + entry.incorrect;
        if entry.labelled > 0 {
            let precision = entry.correct as f64 / entry.labelled as f64;
            entry.precision = Some(precision);
            entry.error_rate = Some(1.0 - precision);
        }
        let enough = entry.labelled >= config.sampling.min_labelled_per_strategy;
        if enough {
            entry.suggested_confidence = entry.precision;
        }
        entry.recommend_disable = enough
            && entry
                .error_rate
                .is_some_and(|rate| rate > config.sampling.max_strategy_error_rate);
        if entry.recommend_disable {
            tracing::warn!(
                "Strategy {} error rate {:.3} over {} labels exceeds {:.3}",
                entry.strategy,
                entry.error_rate.unwrap_or_default(),
                entry.labelled,
                config.sampling.max_strategy_error_rate
            );
        }
    }
    report
}

impl CalibrationReport {
    pub fn disabled(&self) -> Vec<Strategy> {
        self.strategies
            .values()
            .filter(|c| c.recommend_disable)
            .map(|c| c.strategy)
            .collect()
    }

    /// A copy of `config` with recommended strategies disabled.
    pub fn apply_to(&self, config: &MatchConfig) -> MatchConfig {
        let mut next = config.clone();
        next.disabled_strategies.extend(self.disabled());
        next
    }
}
