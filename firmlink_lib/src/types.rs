//! Record types flowing through the matching pipeline.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An organization-name record drawn from publication or patent metadata.
///
/// Entities are immutable once loaded; enrichment produces a modified copy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Entity {
    pub id: String,
    pub display_name: String,
    pub alternate_names: Vec<String>,
    pub homepage_url: Option<String>,
    pub country_code: Option<String>,
    pub parent_id: Option<String>,
    /// Activity weight (e.g. document count). Heavier entities are processed first.
    pub weight: f64,
    pub city: Option<String>,
    pub region: Option<String>,
    /// Identifier in the external lookup provider, when known.
    pub external_id: Option<String>,
    /// Ticker symbols supplied by enrichment.
    pub tickers: Vec<String>,
}

/// A canonical record in the firm registry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Firm {
    pub id: String,
    pub legal_name: String,
    pub name_variants: Vec<String>,
    pub tickers: Vec<String>,
    pub country_code: Option<String>,
    pub homepage_domain: Option<String>,
    pub business_description: String,
    /// Permanent security identifier.
    pub security_id: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
}

/// Matcher strategies, declared strongest evidence first.
///
/// Declaration order is the tie-break precedence used by the combiner.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ExactName,
    TickerAcronym,
    HomepageDomain,
    AlternateName,
    Substring,
    Subsidiary,
    UltraClean,
    Fuzzy,
    ParentCascade,
}

impl Strategy {
    pub const ALL: [Strategy; 9] = [
        Strategy::ExactName,
        Strategy::TickerAcronym,
        Strategy::HomepageDomain,
        Strategy::AlternateName,
        Strategy::Substring,
        Strategy::Subsidiary,
        Strategy::UltraClean,
        Strategy::Fuzzy,
        Strategy::ParentCascade,
    ];

    /// Higher wins ties.
    pub fn precedence(self) -> u8 {
        (Self::ALL.len() - self as usize) as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactName => "exact_name",
            Self::TickerAcronym => "ticker_acronym",
            Self::HomepageDomain => "homepage_domain",
            Self::AlternateName => "alternate_name",
            Self::Substring => "substring",
            Self::Subsidiary => "subsidiary",
            Self::UltraClean => "ultra_clean",
            Self::Fuzzy => "fuzzy",
            Self::ParentCascade => "parent_cascade",
        }
    }

    /// Candidates from these strategies survive validation only with at
    /// least one validator flag.
    pub fn requires_validator_corroboration(self) -> bool {
        matches!(self, Self::Fuzzy)
    }

    /// Strategies prone to short-string collisions.
    pub fn is_collision_prone(self) -> bool {
        matches!(self, Self::Substring | Self::TickerAcronym)
    }

    /// Strategies that accept a match on part of a firm name rather than
    /// the whole of it.
    pub fn matches_on_name_fragment(self) -> bool {
        matches!(self, Self::Substring | Self::Subsidiary | Self::Fuzzy)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == s.trim())
            .ok_or_else(|| format!("unknown strategy: {}", s))
    }
}

/// A named signal recording why a candidate was proposed or adjusted.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceFlag {
    ExactName,
    AlternateName,
    UltraCleanName,
    TickerMatch,
    KnowledgeBaseTicker,
    AcronymMatch,
    InitialsMatch,
    NameSimilarity,
    DomainMatch,
    DomainVariant,
    SubstringWord,
    SubstringPartial,
    SubsidiaryPattern,
    FuzzyName,
    ParentCascade,
    CountryMatch,
    CountryMismatch,
    DescriptionOverlap,
    CityMatch,
    RegionMatch,
    UrlSimilar,
}

impl EvidenceFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactName => "exact_name",
            Self::AlternateName => "alternate_name",
            Self::UltraCleanName => "ultra_clean_name",
            Self::TickerMatch => "ticker_match",
            Self::KnowledgeBaseTicker => "knowledge_base_ticker",
            Self::AcronymMatch => "acronym_match",
            Self::InitialsMatch => "initials_match",
            Self::NameSimilarity => "name_similarity",
            Self::DomainMatch => "domain_match",
            Self::DomainVariant => "domain_variant",
            Self::SubstringWord => "substring_word",
            Self::SubstringPartial => "substring_partial",
            Self::SubsidiaryPattern => "subsidiary_pattern",
            Self::FuzzyName => "fuzzy_name",
            Self::ParentCascade => "parent_cascade",
            Self::CountryMatch => "country_match",
            Self::CountryMismatch => "country_mismatch",
            Self::DescriptionOverlap => "description_overlap",
            Self::CityMatch => "city_match",
            Self::RegionMatch => "region_match",
            Self::UrlSimilar => "url_similar",
        }
    }

    /// Flags that only evidence validators emit and that count as
    /// independent corroboration.
    pub fn is_corroborating(self) -> bool {
        matches!(
            self,
            Self::CountryMatch
                | Self::DescriptionOverlap
                | Self::CityMatch
                | Self::RegionMatch
                | Self::UrlSimilar
        )
    }
}

impl fmt::Display for EvidenceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposal from one strategy. Transient: consumed by validators and the
/// combiner, never persisted individually.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMatch {
    pub entity_id: String,
    pub firm_id: String,
    pub strategy: Strategy,
    pub raw_score: f64,
    pub evidence: BTreeSet<EvidenceFlag>,
    pub confidence: f64,
    /// The firm-side string (name, ticker, or domain) that produced the match.
    pub matched_name: String,
}

impl CandidateMatch {
    pub fn has(&self, flag: EvidenceFlag) -> bool {
        self.evidence.contains(&flag)
    }
}

/// The single accepted resolution for an entity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FinalMatch {
    pub entity_id: String,
    pub firm_id: String,
    pub confidence: f64,
    pub winning_strategy: Strategy,
    pub evidence_flags: BTreeSet<EvidenceFlag>,
    pub matched_name: String,
    pub entity_normalized_name: String,
}

/// Outcome of a human or heuristic audit of one sampled match.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HumanLabel {
    Correct,
    Incorrect,
    Unsure,
}

impl HumanLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
            Self::Unsure => "unsure",
        }
    }
}

impl FromStr for HumanLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "correct" | "yes" | "y" | "true" | "1" => Ok(Self::Correct),
            "incorrect" | "no" | "n" | "false" | "0" => Ok(Self::Incorrect),
            "unsure" | "?" => Ok(Self::Unsure),
            other => Err(format!("unrecognized label: {}", other)),
        }
    }
}

/// One row of the validation sample.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub entity_id: String,
    pub firm_id: String,
    pub strategy: Strategy,
    pub confidence: f64,
    pub confidence_band: String,
    pub human_label: Option<HumanLabel>,
}

/// Integer key for a confidence value, so float noise never decides ordering.
pub fn confidence_key(confidence: f64) -> i64 {
    (confidence * 1_000_000.0).round() as i64
}

/// Renders a confidence with fixed precision for reproducible output.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.4}", confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_follows_declaration_order() {
        assert!(Strategy::ExactName.precedence() > Strategy::TickerAcronym.precedence());
        assert!(Strategy::UltraClean.precedence() > Strategy::Fuzzy.precedence());
        assert_eq!(Strategy::ParentCascade.precedence(), 1);
    }

    #[test]
    fn strategy_round_trips_through_str() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.as_str().parse::<Strategy>(), Ok(strategy));
        }
        assert!("nonsense".parse::<Strategy>().is_err());
    }

    #[test]
    fn strategy_serde_matches_display() {
        let json = serde_json::to_string(&Strategy::HomepageDomain).unwrap();
        assert_eq!(json, "\"homepage_domain\"");
    }

    #[test]
    fn labels_parse_loosely() {
        assert_eq!("Correct".parse::<HumanLabel>(), Ok(HumanLabel::Correct));
        assert_eq!(" 0 ".parse::<HumanLabel>(), Ok(HumanLabel::Incorrect));
        assert!("maybe".parse::<HumanLabel>().is_err());
    }

    #[test]
    fn confidence_key_absorbs_float_noise() {
        assert_eq!(confidence_key(0.1 + 0.2), confidence_key(0.3));
        assert!(confidence_key(0.95) > confidence_key(0.9499));
    }

    #[test]
    fn only_validator_flags_corroborate() {
        assert!(EvidenceFlag::CountryMatch.is_corroborating());
        assert!(!EvidenceFlag::CountryMismatch.is_corroborating());
        assert!(!EvidenceFlag::FuzzyName.is_corroborating());
    }
}
