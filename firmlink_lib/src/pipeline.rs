//! End-to-end resolution of an entity table against the firm registry.
//!
//! Per entity: prepare, block, propose (every enabled strategy), validate,
//! combine, filter. Entities are processed one hierarchy level at a time so
//! a child sees its parent's filtered match; inside a level entities are
//! independent and run in parallel on rayon. Results are sorted by entity id
//! before they leave the pipeline, so output never depends on scheduling.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rayon::prelude::*;

use crate::blocking::FirmIndex;
use crate::combiner::{combine, Combined};
use crate::config::MatchConfig;
use crate::db::{CheckpointStage, Db, DbError};
use crate::enrichment::{Enricher, LookupProvider};
use crate::error::FirmLinkError;
use crate::hierarchy::Hierarchy;
use crate::io;
use crate::lexicon::Lexicon;
use crate::normalize::Normalizer;
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::quality::{FilterReason, QualityFilter};
use crate::sampler::Sampler;
use crate::strategies::{default_strategies, MatchContext, MatchStrategy};
use crate::summary::RunSummary;
use crate::types::{Entity, FinalMatch, Firm, SampleRecord};
use crate::validators::ValidatorSet;

/// How one entity left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Matched,
    /// The blocker found no firm and no strategy proposed one.
    NoCandidate,
    /// Candidates existed but none survived validation.
    LowConfidence,
    Filtered(FilterReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityResolution {
    pub entity_id: String,
    pub outcome: Outcome,
    /// Combiner decision, present for `Matched` and `Filtered`.
    pub combined: Option<Combined>,
}

impl EntityResolution {
    pub fn final_match(&self) -> Option<&FinalMatch> {
        match self.outcome {
            Outcome::Matched => self.combined.as_ref().map(|c| &c.final_match),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Combiner output before the quality filter, sorted by entity id.
    pub combined_matches: Vec<FinalMatch>,
    /// The Final Match table, sorted by entity id.
    pub final_matches: Vec<FinalMatch>,
    pub summary: RunSummary,
}

pub struct Matcher {
    config: MatchConfig,
    normalizer: Normalizer,
    index: FirmIndex,
    strategies: Vec<Box<dyn MatchStrategy>>,
    validators: ValidatorSet,
    skipped_firms: usize,
}

impl Matcher {
    /// Validate the configuration and index the firm registry.
    pub fn new(firms: Vec<Firm>, config: MatchConfig, lexicon: Lexicon) -> Result<Self, FirmLinkError> {
        config.validate()?;
        let normalizer = Normalizer::new(lexicon);
        let submitted = firms.len();
        let index = FirmIndex::build(firms, &normalizer, &config)?;
        Ok(Self {
            skipped_firms: submitted - index.len(),
            config,
            normalizer,
            index,
            strategies: default_strategies(),
            validators: ValidatorSet::default(),
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn index(&self) -> &FirmIndex {
        &self.index
    }

    /// Resolve a single entity given the matches of already-resolved parents.
    pub fn resolve_entity(
        &self,
        entity: Entity,
        resolved: &HashMap<String, FinalMatch>,
    ) -> EntityResolution {
        let prepared = PreparedEntity::new(entity, &self.normalizer, &self.config);
        let entity_id = prepared.id().to_string();
        let ctx = MatchContext {
            config: &self.config,
            normalizer: &self.normalizer,
            index: &self.index,
            resolved,
        };

        let blocked = self.index.candidates(&prepared, &self.config);
        let firms: Vec<&PreparedFirm> = blocked.iter().map(|&i| self.index.firm(i)).collect();

        let proposals: Vec<_> = self
            .strategies
            .iter()
            .filter(|s| self.config.is_enabled(s.strategy()))
            .flat_map(|s| s.propose(&ctx, &prepared, &firms))
            .collect();
        if proposals.is_empty() && firms.is_empty() {
            tracing::debug!("Entity {} ({}): no candidates", entity_id, prepared.name);
            return EntityResolution {
                entity_id,
                outcome: Outcome::NoCandidate,
                combined: None,
            };
        }

        let validated: Vec<_> = proposals
            .into_iter()
            .filter_map(|c| self.validators.apply(&ctx, &prepared, c))
            .collect();
        let Some(combined) = combine(&prepared.name, validated) else {
            tracing::debug!(
                "Entity {} ({}): {} candidate firms, none accepted",
                entity_id,
                prepared.name,
                firms.len()
            );
            return EntityResolution {
                entity_id,
                outcome: Outcome::LowConfidence,
                combined: None,
            };
        };

        let filter = QualityFilter::new(&self.config, self.normalizer.lexicon());
        let outcome = match filter.check(&combined.final_match) {
            Some(reason) => Outcome::Filtered(reason),
            None => Outcome::Matched,
        };
        EntityResolution {
            entity_id,
            outcome,
            combined: Some(combined),
        }
    }

    /// Resolve every entity. Rows without an id or display name and repeated
    /// ids are skipped and counted as malformed input.
    pub fn run(&self, entities: Vec<Entity>) -> PipelineOutput {
        let mut summary = RunSummary {
            total_firms: self.index.len(),
            malformed_input: self.skipped_firms,
            ..Default::default()
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut entities: Vec<Entity> = entities
            .into_iter()
            .filter(|e| {
                if e.id.trim().is_empty() || e.display_name.trim().is_empty() {
                    tracing::warn!("Skipping entity without id or display name: {:?}", e.id);
                    summary.malformed_input += 1;
                    return false;
                }
                if !seen.insert(e.id.clone()) {
                    tracing::warn!("Skipping duplicate entity id {}", e.id);
                    summary.malformed_input += 1;
                    return false;
                }
                true
            })
            .collect();
        summary.total_entities = entities.len();

        let hierarchy = Hierarchy::build(&entities);
        summary.hierarchy_links_dropped = hierarchy.dropped_links();
        let effective_parents: Vec<Option<String>> = (0..entities.len())
            .map(|i| hierarchy.parent_of(i).map(|p| entities[p].id.clone()))
            .collect();
        for (entity, parent) in entities.iter_mut().zip(effective_parents) {
            entity.parent_id = parent;
        }

        tracing::info!(
            "Matching {} entities against {} firms in {} hierarchy levels",
            entities.len(),
            self.index.len(),
            hierarchy.levels().len()
        );

        let mut resolved: HashMap<String, FinalMatch> = HashMap::new();
        let mut combined_matches = Vec::new();
        let mut final_matches = Vec::new();
        for level in hierarchy.levels() {
            let results: Vec<EntityResolution> = level
                .par_iter()
                .map(|&i| self.resolve_entity(entities[i].clone(), &resolved))
                .collect();

            for result in results {
                match result.outcome {
                    Outcome::Matched => summary.matched += 1,
                    Outcome::NoCandidate => summary.no_candidate += 1,
                    Outcome::LowConfidence => summary.low_confidence += 1,
                    Outcome::Filtered(reason) => {
                        summary.filtered += 1;
                        *summary.filtered_by_reason.entry(reason).or_insert(0) += 1;
                    }
                }
                let Some(combined) = result.combined else {
                    continue;
                };
                if combined.ambiguous {
                    summary.ambiguous_resolved += 1;
                }
                combined_matches.push(combined.final_match.clone());
                if result.outcome == Outcome::Matched {
                    let m = combined.final_match;
                    *summary.wins_by_strategy.entry(m.winning_strategy).or_insert(0) += 1;
                    resolved.insert(m.entity_id.clone(), m.clone());
                    final_matches.push(m);
                }
            }
        }

        combined_matches.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        final_matches.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        summary.log();

        PipelineOutput {
            combined_matches,
            final_matches,
            summary,
        }
    }

    /// Enrich entities through the lookup provider, then resolve them.
    /// Provider failures only reduce enrichment; they never fail the run.
    pub async fn run_enriched<P: LookupProvider>(
        &self,
        entities: Vec<Entity>,
        enricher: &Enricher<P>,
    ) -> PipelineOutput {
        let (entities, stats) = enricher.enrich(entities).await;
        let mut output = self.run(entities);
        output.summary.record_enrichment(stats);
        output
    }

    /// Re-apply the quality filter to matches from an earlier checkpoint,
    /// e.g. after calibration disabled a strategy.
    pub fn refilter(&self, matches: Vec<FinalMatch>) -> (Vec<FinalMatch>, Vec<(FinalMatch, FilterReason)>) {
        QualityFilter::new(&self.config, self.normalizer.lexicon()).filter(matches)
    }

    /// Stratified validation sample of the Final Match table.
    pub fn sample(&self, output: &PipelineOutput, n: usize, seed: u64) -> Vec<SampleRecord> {
        Sampler::from_config(&self.config).sample(&output.final_matches, n, seed)
    }

    /// Persist both checkpoints and the summary. Returns the run id.
    pub fn checkpoint(&self, db: &mut Db, output: &PipelineOutput) -> Result<i64, DbError> {
        let run_id = db.start_run(&self.config)?;
        db.save_checkpoint(run_id, CheckpointStage::PostCombiner, &output.combined_matches)?;
        db.save_checkpoint(run_id, CheckpointStage::PostFilter, &output.final_matches)?;
        db.save_summary(run_id, &output.summary)?;
        tracing::info!("Checkpointed run {}", run_id);
        Ok(run_id)
    }
}

/// Load both tables from CSV and resolve them. Only unusable reference
/// data fails the run.
pub fn run_files(
    entities_path: &Path,
    firms_path: &Path,
    config: MatchConfig,
    lexicon: Lexicon,
) -> Result<PipelineOutput, FirmLinkError> {
    let firms = io::read_firms(firms_path)?;
    let entities = io::read_entities(entities_path)?;
    let matcher = Matcher::new(firms.records, config, lexicon)?;
    let mut output = matcher.run(entities.records);
    output.summary.malformed_input += firms.malformed.len() + entities.malformed.len();
    Ok(output)
}
