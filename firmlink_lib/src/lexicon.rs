//! Word lists driving normalization, blocking, and the quality gate.
//!
//! The default lexicon is embedded at compile time from
//! `seed_data/lexicon.yml`; a replacement can be loaded from disk. Entries are
//! lower-cased on load so lookups never depend on the file's casing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Error types for lexicon loading.
#[derive(Error, Debug)]
pub enum LexiconError {
    #[error("Failed to parse lexicon YAML: {0}")]
    YamlParse(#[from] serde_yml::Error),
    #[error("Failed to read lexicon file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Abbreviation '{key}' expands to '{value}', which contains another abbreviation")]
    ChainedAbbreviation { key: String, value: String },
    #[error("Invalid country code '{code}' for '{name}'")]
    InvalidCountryCode { name: String, code: String },
    #[error("Failed to compile subsidiary pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Top-level structure of the lexicon YAML file.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct LexiconFile {
    #[serde(default)]
    pub legal_suffixes: Vec<String>,
    #[serde(default)]
    pub abbreviations: BTreeMap<String, String>,
    #[serde(default)]
    pub stopwords: Vec<String>,
    #[serde(default)]
    pub generic_tickers: Vec<String>,
    #[serde(default)]
    pub generic_terms: Vec<String>,
    #[serde(default)]
    pub subsidiary_words: Vec<String>,
    #[serde(default)]
    pub countries: BTreeMap<String, String>,
}

/// Trailing words that may follow a subsidiary word ("X Research Center").
const SUBSIDIARY_TRAILERS: &[&str] = &[
    "center",
    "centre",
    "institute",
    "division",
    "group",
    "unit",
    "department",
    "laboratories",
];

/// Validated, lookup-ready lexicon.
#[derive(Debug, Clone)]
pub struct Lexicon {
    legal_suffixes: HashSet<String>,
    abbreviations: HashMap<String, Vec<String>>,
    stopwords: HashSet<String>,
    generic_tickers: HashSet<String>,
    generic_terms: HashSet<String>,
    subsidiary_pattern: Option<Regex>,
    countries: HashMap<String, String>,
}

fn clean(entry: &str) -> String {
    entry.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn clean_set(entries: &[String]) -> HashSet<String> {
    entries
        .iter()
        .map(|e| clean(e))
        .filter(|e| !e.is_empty())
        .collect()
}

impl Lexicon {
    /// Load the lexicon embedded at compile time.
    pub fn embedded() -> Result<Self, LexiconError> {
        let yaml_content = include_str!("../../seed_data/lexicon.yml");
        Self::from_yaml_str(yaml_content)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LexiconError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml_content: &str) -> Result<Self, LexiconError> {
        let file: LexiconFile = serde_yml::from_str(yaml_content)?;
        Self::from_file(file)
    }

    /// Validate and index a parsed lexicon file.
    pub fn from_file(file: LexiconFile) -> Result<Self, LexiconError> {
        let mut abbreviations = HashMap::new();
        for (key, value) in &file.abbreviations {
            let key = clean(key);
            let expansion: Vec<String> = clean(value)
                .split(' ')
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            if key.is_empty() || expansion.is_empty() {
                continue;
            }
            abbreviations.insert(key, expansion);
        }

        // Expansions must be terminal or normalization stops being idempotent.
        for (key, expansion) in &abbreviations {
            if expansion.iter().any(|t| abbreviations.contains_key(t)) {
                return Err(LexiconError::ChainedAbbreviation {
                    key: key.clone(),
                    value: expansion.join(" "),
                });
            }
        }

        let mut countries = HashMap::new();
        for (name, code) in &file.countries {
            let code = code.trim().to_uppercase();
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(LexiconError::InvalidCountryCode {
                    name: name.clone(),
                    code,
                });
            }
            countries.insert(clean(name), code);
        }

        let mut subsidiary_words: Vec<String> = clean_set(&file.subsidiary_words).into_iter().collect();
        // Longest alternatives first so "research center" beats "research".
        subsidiary_words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let subsidiary_pattern = if subsidiary_words.is_empty() {
            None
        } else {
            let words = subsidiary_words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            let trailers = SUBSIDIARY_TRAILERS.join("|");
            Some(Regex::new(&format!(
                r"^(?P<parent>.+?) (?:{})(?: (?:{}))?$",
                words, trailers
            ))?)
        };

        Ok(Self {
            legal_suffixes: clean_set(&file.legal_suffixes),
            abbreviations,
            stopwords: clean_set(&file.stopwords),
            generic_tickers: clean_set(&file.generic_tickers),
            generic_terms: clean_set(&file.generic_terms),
            subsidiary_pattern,
            countries,
        })
    }

    pub fn is_legal_suffix(&self, token: &str) -> bool {
        self.legal_suffixes.contains(token)
    }

    /// Expansion for an abbreviation token, if one is defined.
    pub fn expand(&self, token: &str) -> Option<&[String]> {
        self.abbreviations.get(token).map(Vec::as_slice)
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Case-insensitive check against the generic-ticker blocklist.
    pub fn is_generic_ticker(&self, ticker: &str) -> bool {
        self.generic_tickers.contains(&ticker.trim().to_lowercase())
    }

    /// Whether a normalized string is a blocklisted generic name fragment.
    pub fn is_generic_term(&self, normalized: &str) -> bool {
        self.generic_terms.contains(normalized)
    }

    /// True when every token of `normalized` is a generic term or stopword.
    pub fn is_all_generic(&self, normalized: &str) -> bool {
        let mut tokens = normalized.split(' ').filter(|t| !t.is_empty()).peekable();
        if tokens.peek().is_none() {
            return true;
        }
        tokens.all(|t| self.is_generic_term(t) || self.is_stopword(t))
    }

    /// ISO 3166 alpha-2 code for a country name or alias.
    pub fn country_code(&self, name: &str) -> Option<&str> {
        self.countries.get(&clean(name)).map(String::as_str)
    }

    /// Parent name extracted from a research-subsidiary style name
    /// ("acme research" -> "acme").
    pub fn subsidiary_parent<'a>(&self, normalized: &'a str) -> Option<&'a str> {
        let caps = self.subsidiary_pattern.as_ref()?.captures(normalized)?;
        caps.name("parent").map(|m| m.as_str())
    }
}
