//! SQLite checkpoint store for matching runs.
//!
//! Matches are persisted at two boundaries only: after the combiner and
//! after the quality filter. Validation samples and the run summary are
//! stored alongside so a labelled sample can be traced back to the run and
//! configuration that produced it.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::config::MatchConfig;
use crate::summary::RunSummary;
use crate::types::{EvidenceFlag, FinalMatch, HumanLabel, SampleRecord, Strategy};

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

/// Pipeline boundary at which matches are checkpointed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStage {
    PostCombiner,
    PostFilter,
}

impl CheckpointStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PostCombiner => "post_combiner",
            Self::PostFilter => "post_filter",
        }
    }
}

impl fmt::Display for CheckpointStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SCHEMA_VERSION: i32 = 1;

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Create any missing tables and stamp the schema version.
    pub fn init(&self) -> Result<(), DbError> {
        let schema = include_str!("../../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;
        self.conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// Record the start of a run and the configuration it uses.
    pub fn start_run(&self, config: &MatchConfig) -> Result<i64, DbError> {
        let config_json = serde_json::to_string(config)?;
        self.conn.execute(
            "INSERT INTO runs (started_at, config_json) VALUES (?1, ?2)",
            params![chrono::Utc::now().to_rfc3339(), config_json],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn run_config(&self, run_id: i64) -> Result<Option<MatchConfig>, DbError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT config_json FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Replace the checkpoint for (run, stage) with `matches`.
    pub fn save_checkpoint(
        &mut self,
        run_id: i64,
        stage: CheckpointStage,
        matches: &[FinalMatch],
    ) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM match_checkpoints WHERE run_id = ?1 AND stage = ?2",
            params![run_id, stage.as_str()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO match_checkpoints (
                   run_id, stage, entity_id, firm_id, confidence, winning_strategy,
                   evidence_flags, matched_name, entity_normalized_name
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for m in matches {
                stmt.execute(params![
                    run_id,
                    stage.as_str(),
                    m.entity_id,
                    m.firm_id,
                    m.confidence,
                    m.winning_strategy.as_str(),
                    serde_json::to_string(&m.evidence_flags)?,
                    m.matched_name,
                    m.entity_normalized_name,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!("Checkpointed {} matches for run {} at {}", matches.len(), run_id, stage);
        Ok(matches.len())
    }

    /// Checkpointed matches ordered by entity id.
    pub fn load_checkpoint(
        &self,
        run_id: i64,
        stage: CheckpointStage,
    ) -> Result<Vec<FinalMatch>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_id, firm_id, confidence, winning_strategy, evidence_flags,
                    matched_name, entity_normalized_name
             FROM match_checkpoints
             WHERE run_id = ?1 AND stage = ?2
             ORDER BY entity_id",
        )?;
        let rows = stmt.query_map(params![run_id, stage.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (entity_id, firm_id, confidence, strategy, flags, matched_name, normalized) = row?;
            let evidence_flags: BTreeSet<EvidenceFlag> = serde_json::from_str(&flags)?;
            out.push(FinalMatch {
                entity_id,
                firm_id,
                confidence,
                winning_strategy: parse_strategy(&strategy)?,
                evidence_flags,
                matched_name,
                entity_normalized_name: normalized,
            });
        }
        Ok(out)
    }

    pub fn save_samples(&mut self, run_id: i64, samples: &[SampleRecord]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM validation_samples WHERE run_id = ?1",
            params![run_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO validation_samples (
                   run_id, entity_id, firm_id, strategy, confidence, confidence_band, human_label
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for s in samples {
                stmt.execute(params![
                    run_id,
                    s.entity_id,
                    s.firm_id,
                    s.strategy.as_str(),
                    s.confidence,
                    s.confidence_band,
                    s.human_label.map(HumanLabel::as_str),
                ])?;
            }
        }
        tx.commit()?;
        Ok(samples.len())
    }

    /// Record a reviewer's label. Returns false when the sample does not exist.
    pub fn set_sample_label(
        &self,
        run_id: i64,
        entity_id: &str,
        label: HumanLabel,
    ) -> Result<bool, DbError> {
        let updated = self.conn.execute(
            "UPDATE validation_samples SET human_label = ?1 WHERE run_id = ?2 AND entity_id = ?3",
            params![label.as_str(), run_id, entity_id],
        )?;
        Ok(updated > 0)
    }

    pub fn load_samples(&self, run_id: i64) -> Result<Vec<SampleRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_id, firm_id, strategy, confidence, confidence_band, human_label
             FROM validation_samples
             WHERE run_id = ?1
             ORDER BY strategy, confidence_band, entity_id",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (entity_id, firm_id, strategy, confidence, confidence_band, label) = row?;
            let human_label = match label {
                Some(raw) => Some(raw.parse::<HumanLabel>().map_err(DbError::InvalidValue)?),
                None => None,
            };
            out.push(SampleRecord {
                entity_id,
                firm_id,
                strategy: parse_strategy(&strategy)?,
                confidence,
                confidence_band,
                human_label,
            });
        }
        Ok(out)
    }

    pub fn save_summary(&self, run_id: i64, summary: &RunSummary) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE runs SET summary_json = ?1 WHERE run_id = ?2",
            params![serde_json::to_string(summary)?, run_id],
        )?;
        Ok(())
    }

    pub fn load_summary(&self, run_id: i64) -> Result<Option<RunSummary>, DbError> {
        let raw: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT summary_json FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        match raw.flatten() {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

fn parse_strategy(raw: &str) -> Result<Strategy, DbError> {
    raw.parse().map_err(DbError::InvalidValue)
}
