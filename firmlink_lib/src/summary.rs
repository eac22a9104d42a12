//! End-of-run counts per outcome kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enrichment::EnrichmentStats;
use crate::quality::FilterReason;
use crate::types::Strategy;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Entities accepted into the run after input validation.
    pub total_entities: usize,
    pub total_firms: usize,
    pub matched: usize,
    pub no_candidate: usize,
    pub low_confidence: usize,
    /// Entities whose top confidence was shared by another firm.
    pub ambiguous_resolved: usize,
    pub filtered: usize,
    /// Entity and firm rows skipped as malformed.
    pub malformed_input: usize,
    pub external_service_error: usize,
    pub hierarchy_links_dropped: usize,
    pub wins_by_strategy: BTreeMap<Strategy, usize>,
    pub filtered_by_reason: BTreeMap<FilterReason, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentStats>,
}

impl RunSummary {
    pub fn unmatched(&self) -> usize {
        self.no_candidate + self.low_confidence + self.filtered
    }

    /// Fold enrichment counts in; timeouts and failures are external errors.
    pub fn record_enrichment(&mut self, stats: EnrichmentStats) {
        self.external_service_error += stats.external_errors();
        self.enrichment = Some(stats);
    }

    pub fn log(&self) {
        tracing::info!(
            "Run complete: {} entities, {} matched, {} no candidate, {} low confidence, {} filtered, {} malformed, {} external errors",
            self.total_entities,
            self.matched,
            self.no_candidate,
            self.low_confidence,
            self.filtered,
            self.malformed_input,
            self.external_service_error
        );
        for (strategy, wins) in &self.wins_by_strategy {
            tracing::info!("  {}: {}", strategy, wins);
        }
    }
}
