//! Entity resolution of organization names against a registry of firms.
//!
//! Entities are normalized, blocked to a small candidate set, scored by a
//! fixed list of independent matching strategies, adjusted by evidence
//! validators, reduced to at most one firm per entity, and passed through a
//! quality filter. A stratified sampler draws reproducible audit samples
//! from the result, and a calibration report turns labelled samples into a
//! configuration for the next run.

pub mod blocking;
pub mod calibration;
pub mod combiner;
pub mod config;
pub mod db;
pub mod domain;
pub mod enrichment;
pub mod error;
pub mod hierarchy;
pub mod io;
pub mod lexicon;
pub mod normalize;
pub mod pipeline;
pub mod prepare;
pub mod quality;
pub mod sampler;
pub mod strategies;
pub mod summary;
pub mod types;
pub mod validators;

pub use firmlink_kb;

pub use calibration::{calibrate, CalibrationReport, StrategyCalibration};
pub use config::{ConfigError, MatchConfig};
pub use db::{CheckpointStage, Db, DbError};
pub use enrichment::{Enricher, EnrichmentStats, LookupProvider};
pub use error::{FirmLinkError, RecordError, ReferenceDataError};
pub use lexicon::{Lexicon, LexiconError};
pub use normalize::Normalizer;
pub use pipeline::{run_files, EntityResolution, Matcher, Outcome, PipelineOutput};
pub use quality::FilterReason;
pub use sampler::{sample, Sampler};
pub use summary::RunSummary;
pub use types::{
    CandidateMatch, Entity, EvidenceFlag, FinalMatch, Firm, HumanLabel, SampleRecord, Strategy,
};
