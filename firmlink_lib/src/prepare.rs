//! Pre-computed comparison forms for entities and firms.
//!
//! Normalization is the expensive part of every comparison, so each record is
//! normalized exactly once and the strategies only ever see these views.

use crate::config::MatchConfig;
use crate::domain::{domain_label, is_shared_hosting, root_domain};
use crate::normalize::{ultra_from_normalized, Normalizer};
use crate::types::{Entity, Firm};

#[derive(Debug, Clone)]
pub struct PreparedEntity {
    pub entity: Entity,
    /// Normalized display name.
    pub name: String,
    pub ultra: String,
    /// Normalized alternate names, deduplicated, excluding `name`.
    pub alternates: Vec<String>,
    pub alternate_ultras: Vec<String>,
    /// Short single-token names usable as acronyms.
    pub acronyms: Vec<String>,
    /// Lower-cased tickers supplied by enrichment.
    pub enriched_tickers: Vec<String>,
    /// Significant tokens across the display and alternate names.
    pub tokens: Vec<String>,
    pub initials: Option<String>,
    pub root_domain: Option<String>,
    pub domain_label: Option<String>,
    /// Entity country, or the one implied by a trailing location qualifier.
    pub country: Option<String>,
    /// Parent name extracted by the subsidiary pattern.
    pub subsidiary_parent: Option<String>,
}

impl PreparedEntity {
    pub fn new(entity: Entity, normalizer: &Normalizer, config: &MatchConfig) -> Self {
        let name = normalizer.normalize(&entity.display_name);
        let ultra = ultra_from_normalized(&name);

        let mut alternates: Vec<String> = Vec::new();
        for raw in &entity.alternate_names {
            let alt = normalizer.normalize(raw);
            if !alt.is_empty() && alt != name && !alternates.contains(&alt) {
                alternates.push(alt);
            }
        }
        let alternate_ultras = alternates.iter().map(|a| ultra_from_normalized(a)).collect();

        let mut acronyms: Vec<String> = Vec::new();
        for candidate in std::iter::once(&name).chain(alternates.iter()) {
            let len = candidate.chars().count();
            if !candidate.contains(' ')
                && len >= config.matching.acronym_min_len
                && len <= config.matching.acronym_max_len
                && candidate.chars().all(|c| c.is_alphanumeric())
                && !acronyms.contains(candidate)
            {
                acronyms.push(candidate.clone());
            }
        }

        let mut enriched_tickers: Vec<String> = Vec::new();
        for ticker in &entity.tickers {
            let ticker = ticker.trim().to_lowercase();
            if !ticker.is_empty() && !enriched_tickers.contains(&ticker) {
                enriched_tickers.push(ticker);
            }
        }

        let mut tokens = normalizer.tokens(&name, config.blocking.min_token_len);
        for alt in &alternates {
            for t in normalizer.tokens(alt, config.blocking.min_token_len) {
                if !tokens.contains(&t) {
                    tokens.push(t);
                }
            }
        }
        let initials = normalizer.initials(&name);

        let root_domain = entity
            .homepage_url
            .as_deref()
            .and_then(root_domain)
            .filter(|d| !is_shared_hosting(d));
        let domain_label = root_domain.as_deref().map(|d| domain_label(d).to_string());

        let country = entity
            .country_code
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .or_else(|| normalizer.country_hint(&entity.display_name));

        let subsidiary_parent = normalizer
            .lexicon()
            .subsidiary_parent(&name)
            .map(str::to_string);

        Self {
            entity,
            name,
            ultra,
            alternates,
            alternate_ultras,
            acronyms,
            enriched_tickers,
            tokens,
            initials,
            root_domain,
            domain_label,
            country,
            subsidiary_parent,
        }
    }

    pub fn id(&self) -> &str {
        &self.entity.id
    }

    /// Display name followed by alternates, all normalized.
    pub fn all_names(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.name).chain(self.alternates.iter())
    }
}

#[derive(Debug, Clone)]
pub struct PreparedFirm {
    pub firm: Firm,
    /// Normalized legal name first, then distinct variants.
    pub names: Vec<String>,
    pub ultras: Vec<String>,
    pub initials: Vec<String>,
    pub tickers: Vec<String>,
    pub root_domain: Option<String>,
    pub domain_label: Option<String>,
    pub tokens: Vec<String>,
    pub description_tokens: Vec<String>,
    pub country: Option<String>,
}

impl PreparedFirm {
    pub fn new(firm: Firm, normalizer: &Normalizer, config: &MatchConfig) -> Self {
        let mut names: Vec<String> = Vec::new();
        for raw in std::iter::once(&firm.legal_name).chain(firm.name_variants.iter()) {
            let n = normalizer.normalize(raw);
            if !n.is_empty() && !names.contains(&n) {
                names.push(n);
            }
        }

        let mut ultras: Vec<String> = Vec::new();
        let mut initials: Vec<String> = Vec::new();
        let mut tokens: Vec<String> = Vec::new();
        for n in &names {
            let u = ultra_from_normalized(n);
            if !ultras.contains(&u) {
                ultras.push(u);
            }
            if let Some(i) = normalizer.initials(n) {
                if !initials.contains(&i) {
                    initials.push(i);
                }
            }
            for t in normalizer.tokens(n, config.blocking.min_token_len) {
                if !tokens.contains(&t) {
                    tokens.push(t);
                }
            }
        }

        let mut tickers: Vec<String> = Vec::new();
        for ticker in &firm.tickers {
            let t = ticker.trim().to_lowercase();
            if !t.is_empty() && !tickers.contains(&t) {
                tickers.push(t);
            }
        }

        let root_domain = firm
            .homepage_domain
            .as_deref()
            .and_then(root_domain)
            .filter(|d| !is_shared_hosting(d));
        let domain_label = root_domain.as_deref().map(|d| domain_label(d).to_string());

        let description = normalizer.normalize(&firm.business_description);
        let description_tokens = normalizer.tokens(&description, config.validators.description_min_token_len);

        let country = firm
            .country_code
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());

        Self {
            firm,
            names,
            ultras,
            initials,
            tickers,
            root_domain,
            domain_label,
            tokens,
            description_tokens,
            country,
        }
    }

    pub fn id(&self) -> &str {
        &self.firm.id
    }
}
