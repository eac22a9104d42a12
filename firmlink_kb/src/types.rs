//! Response types returned by the lookup provider.

use serde::{Deserialize, Serialize};

/// Envelope wrapping a single record.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Response<T> {
    pub data: T,
}

/// Structured organization record.
///
/// Every field except `id` may be absent; callers must treat the record as
/// advisory and merge only what is present.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrganizationRecord {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub legal_names: Vec<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
}

/// Reference to the parent organization, by provider id and optional label.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParentRef {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl OrganizationRecord {
    /// Ticker symbol normalized to upper case, ignoring blank values.
    pub fn normalized_ticker(&self) -> Option<String> {
        self.ticker
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| t.to_uppercase())
    }
}
