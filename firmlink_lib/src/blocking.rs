//! Candidate blocking over the firm registry.
//!
//! The index is built once per run and only read afterwards, so a single
//! `FirmIndex` is shared by every worker without locking. Firms are stored
//! sorted by id, which makes a firm's position a stable tie-break key.

use std::collections::{BTreeSet, HashMap};

use crate::config::MatchConfig;
use crate::error::ReferenceDataError;
use crate::normalize::{ultra_from_normalized, Normalizer};
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::types::Firm;

pub struct FirmIndex {
    firms: Vec<PreparedFirm>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, Vec<usize>>,
    by_ultra: HashMap<String, Vec<usize>>,
    by_ticker: HashMap<String, Vec<usize>>,
    by_initials: HashMap<String, Vec<usize>>,
    by_domain: HashMap<String, Vec<usize>>,
    by_domain_label: HashMap<String, Vec<usize>>,
    by_token: HashMap<String, Vec<usize>>,
    by_prefix: HashMap<String, Vec<usize>>,
}

/// Leading `len` characters of a separator-free name, when it is longer.
fn prefix_key(ultra: &str, len: usize) -> Option<&str> {
    if len == 0 {
        return None;
    }
    let (end, _) = ultra.char_indices().nth(len)?;
    Some(&ultra[..end])
}

fn post(map: &mut HashMap<String, Vec<usize>>, key: &str, idx: usize) {
    let postings = map.entry(key.to_string()).or_default();
    if postings.last() != Some(&idx) {
        postings.push(idx);
    }
}

impl FirmIndex {
    /// Normalize and index the firm registry.
    ///
    /// Firms with a duplicate id or a name that normalizes to nothing are
    /// skipped with a warning. An empty result is fatal.
    pub fn build(
        mut firms: Vec<Firm>,
        normalizer: &Normalizer,
        config: &MatchConfig,
    ) -> Result<Self, ReferenceDataError> {
        firms.sort_by(|a, b| a.id.cmp(&b.id));

        let mut index = Self {
            firms: Vec::with_capacity(firms.len()),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            by_ultra: HashMap::new(),
            by_ticker: HashMap::new(),
            by_initials: HashMap::new(),
            by_domain: HashMap::new(),
            by_domain_label: HashMap::new(),
            by_token: HashMap::new(),
            by_prefix: HashMap::new(),
        };

        for firm in firms {
            if index.by_id.contains_key(&firm.id) {
                tracing::warn!("Skipping duplicate firm id {}", firm.id);
                continue;
            }
            let prepared = PreparedFirm::new(firm, normalizer, config);
            if prepared.names.is_empty() {
                tracing::warn!(
                    "Skipping firm {}: legal name normalizes to nothing",
                    prepared.id()
                );
                continue;
            }

            let idx = index.firms.len();
            index.by_id.insert(prepared.id().to_string(), idx);
            for name in &prepared.names {
                post(&mut index.by_name, name, idx);
            }
            for ultra in &prepared.ultras {
                post(&mut index.by_ultra, ultra, idx);
            }
            for ticker in &prepared.tickers {
                post(&mut index.by_ticker, ticker, idx);
            }
            for initials in &prepared.initials {
                post(&mut index.by_initials, initials, idx);
            }
            if let Some(domain) = &prepared.root_domain {
                post(&mut index.by_domain, domain, idx);
            }
            if let Some(label) = &prepared.domain_label {
                post(&mut index.by_domain_label, label, idx);
            }
            for token in &prepared.tokens {
                post(&mut index.by_token, token, idx);
            }
            for ultra in &prepared.ultras {
                if let Some(prefix) = prefix_key(ultra, config.blocking.prefix_len) {
                    post(&mut index.by_prefix, prefix, idx);
                }
            }
            index.firms.push(prepared);
        }

        if index.firms.is_empty() {
            return Err(ReferenceDataError::EmptyRegistry);
        }
        tracing::info!(
            "Indexed {} firms ({} names, {} tokens)",
            index.firms.len(),
            index.by_name.len(),
            index.by_token.len()
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.firms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.firms.is_empty()
    }

    pub fn firm(&self, idx: usize) -> &PreparedFirm {
        &self.firms[idx]
    }

    pub fn firm_by_id(&self, id: &str) -> Option<&PreparedFirm> {
        self.by_id.get(id).map(|&idx| &self.firms[idx])
    }

    /// Firms sharing an exact normalized name.
    pub fn firms_named(&self, normalized: &str) -> &[usize] {
        self.by_name.get(normalized).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Firms sharing a separator-stripped name.
    pub fn firms_ultra(&self, ultra: &str) -> &[usize] {
        self.by_ultra.get(ultra).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidate firm positions for an entity, sorted ascending.
    ///
    /// Direct hits (exact or separator-stripped name, ticker, initials,
    /// domain) are always kept. Token-overlap hits fill the remaining room up
    /// to `max_candidates`, ranked by shared-token count.
    pub fn candidates(&self, entity: &PreparedEntity, config: &MatchConfig) -> Vec<usize> {
        let blocking = &config.blocking;
        let mut direct: BTreeSet<usize> = BTreeSet::new();

        let mut lookup = |map: &HashMap<String, Vec<usize>>, key: &str| {
            if let Some(postings) = map.get(key) {
                direct.extend(postings.iter().copied());
            }
        };

        for name in entity.all_names() {
            lookup(&self.by_name, name);
        }
        lookup(&self.by_ultra, &entity.ultra);
        for ultra in &entity.alternate_ultras {
            lookup(&self.by_ultra, ultra);
        }
        for acronym in &entity.acronyms {
            lookup(&self.by_ticker, acronym);
            lookup(&self.by_initials, acronym);
        }
        for ticker in &entity.enriched_tickers {
            lookup(&self.by_ticker, ticker);
        }
        if let Some(domain) = &entity.root_domain {
            lookup(&self.by_domain, domain);
        }
        if let Some(label) = &entity.domain_label {
            lookup(&self.by_domain_label, label);
        }
        if let Some(parent) = &entity.subsidiary_parent {
            lookup(&self.by_name, parent);
            lookup(&self.by_ultra, &ultra_from_normalized(parent));
        }

        let mut out: Vec<usize> = direct.iter().copied().take(blocking.max_candidates).collect();
        let room = blocking.max_candidates.saturating_sub(out.len());
        if room > 0 {
            let prefixes: BTreeSet<&str> = std::iter::once(&entity.ultra)
                .chain(entity.alternate_ultras.iter())
                .filter_map(|u| prefix_key(u, blocking.prefix_len))
                .collect();
            let keys = entity
                .tokens
                .iter()
                .filter_map(|t| self.by_token.get(t))
                .chain(prefixes.iter().filter_map(|p| self.by_prefix.get(*p)));

            let mut overlap: HashMap<usize, usize> = HashMap::new();
            for postings in keys {
                if postings.len() > blocking.max_token_postings {
                    continue;
                }
                for &idx in postings {
                    *overlap.entry(idx).or_insert(0) += 1;
                }
            }
            let mut ranked: Vec<(usize, usize)> = overlap
                .into_iter()
                .filter(|(idx, count)| *count >= blocking.min_token_overlap && !direct.contains(idx))
                .collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            out.extend(ranked.into_iter().take(room).map(|(idx, _)| idx));
        }

        out.sort_unstable();
        out
    }
}
