//! CSV readers and writers for the batch tables.
//!
//! Readers distinguish two failure levels. A missing file, a header that
//! cannot be parsed, or a missing required column is a `ReferenceDataError`
//! and aborts the load. A bad row is a `RecordError`: it is logged, skipped
//! and returned alongside the good rows.
//!
//! List-valued columns (`alternate_names`, `name_variants`, `tickers`) hold
//! `;`-separated values.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord, Writer};
use serde::Serialize;

use crate::error::{FirmLinkError, RecordError, ReferenceDataError};
use crate::summary::RunSummary;
use crate::types::{format_confidence, Entity, Firm, FinalMatch, HumanLabel, SampleRecord, Strategy};

const LIST_SEPARATOR: char = ';';

/// Rows that loaded cleanly plus the rows that were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable<T> {
    pub records: Vec<T>,
    pub malformed: Vec<RecordError>,
}

impl<T> LoadedTable<T> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            malformed: Vec::new(),
        }
    }

    fn skip(&mut self, error: RecordError) {
        tracing::warn!("Skipping malformed row: {}", error);
        self.malformed.push(error);
    }
}

/// Header lookup for one table.
struct Columns {
    table: &'static str,
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_headers(
        table: &'static str,
        headers: &StringRecord,
        required: &[&'static str],
    ) -> Result<Self, ReferenceDataError> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}').to_lowercase(), i))
            .collect();
        for &column in required {
            if !index.contains_key(column) {
                return Err(ReferenceDataError::MissingColumn { table, column });
            }
        }
        Ok(Self { table, index })
    }

    fn get<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.index
            .get(column)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn required(
        &self,
        record: &StringRecord,
        line: u64,
        field: &'static str,
    ) -> Result<String, RecordError> {
        self.get(record, field)
            .map(str::to_string)
            .ok_or(RecordError::MissingField {
                table: self.table,
                line,
                field,
            })
    }

    fn optional(&self, record: &StringRecord, column: &str) -> Option<String> {
        self.get(record, column).map(str::to_string)
    }

    fn list(&self, record: &StringRecord, column: &str) -> Vec<String> {
        self.get(record, column).map(split_list).unwrap_or_default()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn open_file(table: &'static str, path: &Path) -> Result<File, ReferenceDataError> {
    if !path.exists() {
        return Err(ReferenceDataError::Missing {
            table,
            path: path.to_path_buf(),
        });
    }
    File::open(path).map_err(|e| ReferenceDataError::Unreadable {
        table,
        source: csv::Error::from(e),
    })
}

fn csv_reader<R: Read>(rdr: R) -> Reader<R> {
    ReaderBuilder::new().flexible(true).from_reader(rdr)
}

/// Drive `parse` over every row, sorting failures into fatal and per-row.
fn load_rows<R, T, F>(
    table: &'static str,
    mut rdr: Reader<R>,
    required: &[&'static str],
    mut parse: F,
) -> Result<LoadedTable<T>, ReferenceDataError>
where
    R: std::io::Read,
    F: FnMut(&Columns, &StringRecord, u64) -> Result<T, RecordError>,
{
    let headers = rdr
        .headers()
        .map_err(|source| ReferenceDataError::Unreadable { table, source })?
        .clone();
    let columns = Columns::from_headers(table, &headers, required)?;

    let mut loaded = LoadedTable::new();
    for (i, result) in rdr.records().enumerate() {
        // Header occupies line 1.
        let fallback_line = i as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => {
                return Err(ReferenceDataError::Unreadable { table, source: e });
            }
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(fallback_line);
                loaded.skip(RecordError::Unparseable {
                    table,
                    line,
                    message: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);
        match parse(&columns, &record, line) {
            Ok(row) => loaded.records.push(row),
            Err(e) => loaded.skip(e),
        }
    }
    Ok(loaded)
}

/// Reject repeated ids, keeping the first occurrence.
fn dedupe<T>(
    table: &'static str,
    loaded: LoadedTable<(u64, T)>,
    id: impl Fn(&T) -> &str,
) -> LoadedTable<T> {
    let mut out = LoadedTable {
        records: Vec::with_capacity(loaded.records.len()),
        malformed: loaded.malformed,
    };
    let mut seen = HashSet::new();
    for (line, row) in loaded.records {
        if seen.insert(id(&row).to_string()) {
            out.records.push(row);
        } else {
            out.skip(RecordError::DuplicateId {
                table,
                line,
                id: id(&row).to_string(),
            });
        }
    }
    out
}

fn parse_entity(columns: &Columns, record: &StringRecord, line: u64) -> Result<(u64, Entity), RecordError> {
    let weight = match columns.get(record, "weight") {
        None => 0.0,
        Some(raw) => match raw.parse::<f64>() {
            Ok(w) if w.is_finite() => w,
            _ => {
                return Err(RecordError::InvalidField {
                    table: columns.table,
                    line,
                    field: "weight",
                    value: raw.to_string(),
                })
            }
        },
    };
    let entity = Entity {
        id: columns.required(record, line, "id")?,
        display_name: columns.required(record, line, "display_name")?,
        alternate_names: columns.list(record, "alternate_names"),
        homepage_url: columns.optional(record, "homepage_url"),
        country_code: columns.optional(record, "country_code"),
        parent_id: columns.optional(record, "parent_id"),
        weight,
        city: columns.optional(record, "city"),
        region: columns.optional(record, "region"),
        external_id: columns.optional(record, "external_id"),
        tickers: columns.list(record, "tickers"),
    };
    Ok((line, entity))
}

fn parse_firm(columns: &Columns, record: &StringRecord, line: u64) -> Result<(u64, Firm), RecordError> {
    let mut tickers = columns.list(record, "tickers");
    // Single-valued `ticker` column is accepted as well.
    tickers.extend(columns.list(record, "ticker"));
    let firm = Firm {
        id: columns.required(record, line, "id")?,
        legal_name: columns.required(record, line, "legal_name")?,
        name_variants: columns.list(record, "name_variants"),
        tickers,
        country_code: columns.optional(record, "country_code"),
        homepage_domain: columns.optional(record, "homepage_domain"),
        business_description: columns.optional(record, "business_description").unwrap_or_default(),
        security_id: columns.optional(record, "security_id"),
        city: columns.optional(record, "city"),
        region: columns.optional(record, "region"),
    };
    Ok((line, firm))
}

fn parse_sample(columns: &Columns, record: &StringRecord, line: u64) -> Result<SampleRecord, RecordError> {
    let invalid = |field: &'static str, value: &str| RecordError::InvalidField {
        table: columns.table,
        line,
        field,
        value: value.to_string(),
    };
    let strategy_raw = columns.required(record, line, "strategy")?;
    let strategy: Strategy = strategy_raw
        .parse()
        .map_err(|_| invalid("strategy", &strategy_raw))?;
    let confidence_raw = columns.required(record, line, "confidence")?;
    let confidence: f64 = confidence_raw
        .parse()
        .map_err(|_| invalid("confidence", &confidence_raw))?;
    let human_label = match columns.get(record, "human_label") {
        None => None,
        Some(raw) => Some(raw.parse::<HumanLabel>().map_err(|_| invalid("human_label", raw))?),
    };
    Ok(SampleRecord {
        entity_id: columns.required(record, line, "entity_id")?,
        firm_id: columns.required(record, line, "firm_id")?,
        strategy,
        confidence,
        confidence_band: columns.optional(record, "confidence_band").unwrap_or_default(),
        human_label,
    })
}

/// Entity table from any reader. `id` and `display_name` are required columns.
pub fn read_entities_from<R: Read>(rdr: R) -> Result<LoadedTable<Entity>, ReferenceDataError> {
    let loaded = load_rows("entities", csv_reader(rdr), &["id", "display_name"], parse_entity)?;
    Ok(dedupe("entities", loaded, |e: &Entity| e.id.as_str()))
}

pub fn read_entities(path: &Path) -> Result<LoadedTable<Entity>, ReferenceDataError> {
    read_entities_from(open_file("entities", path)?)
}

/// Firm registry from any reader. `id` and `legal_name` are required columns.
pub fn read_firms_from<R: Read>(rdr: R) -> Result<LoadedTable<Firm>, ReferenceDataError> {
    let loaded = load_rows("firms", csv_reader(rdr), &["id", "legal_name"], parse_firm)?;
    Ok(dedupe("firms", loaded, |f: &Firm| f.id.as_str()))
}

pub fn read_firms(path: &Path) -> Result<LoadedTable<Firm>, ReferenceDataError> {
    read_firms_from(open_file("firms", path)?)
}

/// A validation sample, typically after a reviewer filled in `human_label`.
pub fn read_samples_from<R: Read>(rdr: R) -> Result<LoadedTable<SampleRecord>, ReferenceDataError> {
    load_rows(
        "samples",
        csv_reader(rdr),
        &["entity_id", "firm_id", "strategy", "confidence"],
        parse_sample,
    )
}

pub fn read_samples(path: &Path) -> Result<LoadedTable<SampleRecord>, ReferenceDataError> {
    read_samples_from(open_file("samples", path)?)
}

/// Prefix spreadsheet formula triggers so free text cannot execute on open.
pub fn sanitize_csv_field(value: &str) -> String {
    match value.chars().next() {
        Some('=' | '+' | '-' | '@') => format!("\t{}", value),
        _ => value.to_string(),
    }
}

#[derive(Serialize)]
struct FinalMatchRow<'a> {
    entity_id: &'a str,
    firm_id: &'a str,
    confidence: String,
    winning_strategy: &'static str,
    evidence_flags: String,
    matched_name: String,
}

#[derive(Serialize)]
struct SampleRow<'a> {
    entity_id: &'a str,
    firm_id: &'a str,
    strategy: &'static str,
    confidence: String,
    confidence_band: &'a str,
    human_label: &'static str,
}

pub fn write_final_matches<W: Write>(out: W, matches: &[FinalMatch]) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(out);
    for m in matches {
        let flags: Vec<&str> = m.evidence_flags.iter().map(|f| f.as_str()).collect();
        wtr.serialize(FinalMatchRow {
            entity_id: &m.entity_id,
            firm_id: &m.firm_id,
            confidence: format_confidence(m.confidence),
            winning_strategy: m.winning_strategy.as_str(),
            evidence_flags: flags.join(";"),
            matched_name: sanitize_csv_field(&m.matched_name),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_samples<W: Write>(out: W, samples: &[SampleRecord]) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(out);
    for s in samples {
        wtr.serialize(SampleRow {
            entity_id: &s.entity_id,
            firm_id: &s.firm_id,
            strategy: s.strategy.as_str(),
            confidence: format_confidence(s.confidence),
            confidence_band: &s.confidence_band,
            human_label: s.human_label.map(HumanLabel::as_str).unwrap_or(""),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_final_matches_to_path(path: &Path, matches: &[FinalMatch]) -> Result<(), FirmLinkError> {
    write_final_matches(File::create(path)?, matches)?;
    Ok(())
}

pub fn write_samples_to_path(path: &Path, samples: &[SampleRecord]) -> Result<(), FirmLinkError> {
    write_samples(File::create(path)?, samples)?;
    Ok(())
}

/// Pretty-printed JSON with a trailing newline.
pub fn write_summary<W: Write>(mut out: W, summary: &RunSummary) -> Result<(), FirmLinkError> {
    serde_json::to_writer_pretty(&mut out, summary)?;
    out.write_all(b"\n")?;
    Ok(())
}

pub fn write_summary_to_path(path: &Path, summary: &RunSummary) -> Result<(), FirmLinkError> {
    write_summary(File::create(path)?, summary)
}
