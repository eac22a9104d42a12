//! Optional pre-matching enrichment from the structured-entity lookup
//! provider.
//!
//! Lookups are advisory. Each one runs under its own timeout, concurrency is
//! bounded by a semaphore, and any failure leaves the entity as it was. The
//! batch never waits on the provider longer than one timeout per
//! concurrency slot, and never aborts because of it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use firmlink_kb::types::OrganizationRecord;
use firmlink_kb::LookupQuery;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::EnrichmentConfig;
use crate::types::Entity;

/// Anything that can resolve an entity reference to an organization record.
pub trait LookupProvider: Send + Sync + 'static {
    fn lookup(
        &self,
        query: LookupQuery,
    ) -> impl Future<Output = Result<Option<OrganizationRecord>, firmlink_kb::Error>> + Send;
}

impl LookupProvider for firmlink_kb::Client {
    fn lookup(
        &self,
        query: LookupQuery,
    ) -> impl Future<Output = Result<Option<OrganizationRecord>, firmlink_kb::Error>> + Send {
        async move { self.lookup_organization(&query).await }
    }
}

/// Enrichment outcome counts for the run summary.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    /// Distinct lookups sent to the provider.
    pub looked_up: usize,
    pub found: usize,
    pub not_found: usize,
    /// Provider errors other than timeouts.
    pub failed: usize,
    pub timed_out: usize,
    pub cache_hits: usize,
    /// Entities that gained at least one field.
    pub enriched: usize,
}

impl EnrichmentStats {
    /// Lookups that degraded to no enrichment because of the provider.
    pub fn external_errors(&self) -> usize {
        self.failed + self.timed_out
    }
}

pub struct Enricher<P> {
    provider: Arc<P>,
    cache: DashMap<String, Option<OrganizationRecord>>,
    timeout: Duration,
    max_concurrency: usize,
}

/// Cache key and query for an entity: provider id when known, otherwise the
/// lower-cased name plus country.
fn lookup_key(entity: &Entity) -> Option<(String, LookupQuery)> {
    if let Some(id) = entity.external_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return Some((
            format!("id:{}", id),
            LookupQuery::default().with_external_id(id),
        ));
    }
    let name = entity.display_name.trim();
    if name.is_empty() {
        return None;
    }
    let country = entity.country_code.as_deref().map(str::trim).unwrap_or_default();
    let mut query = LookupQuery::default().with_name(name);
    if !country.is_empty() {
        query = query.with_country(country);
    }
    if let Some(homepage) = &entity.homepage_url {
        query = query.with_homepage(homepage);
    }
    Some((
        format!("name:{}|{}", name.to_lowercase(), country.to_uppercase()),
        query,
    ))
}

impl<P: LookupProvider> Enricher<P> {
    pub fn new(provider: P, config: &EnrichmentConfig) -> Self {
        Self::with_shared(Arc::new(provider), config)
    }

    pub fn with_shared(provider: Arc<P>, config: &EnrichmentConfig) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
            timeout: Duration::from_millis(config.timeout_ms),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Look up every entity and return enriched copies in input order.
    pub async fn enrich(&self, entities: Vec<Entity>) -> (Vec<Entity>, EnrichmentStats) {
        let mut stats = EnrichmentStats::default();

        let keys: Vec<Option<String>> = entities
            .iter()
            .map(|e| lookup_key(e).map(|(k, _)| k))
            .collect();
        let mut pending: BTreeMap<String, LookupQuery> = BTreeMap::new();
        let mut hits: BTreeSet<String> = BTreeSet::new();
        for entity in &entities {
            if let Some((key, query)) = lookup_key(entity) {
                if self.cache.contains_key(&key) {
                    hits.insert(key);
                } else {
                    pending.entry(key).or_insert(query);
                }
            }
        }
        stats.cache_hits = hits.len();

        self.fetch(pending, &mut stats).await;

        let by_external_id: HashMap<&str, &str> = entities
            .iter()
            .filter_map(|e| e.external_id.as_deref().map(|x| (x, e.id.as_str())))
            .collect();
        let mut out = Vec::with_capacity(entities.len());
        for (entity, key) in entities.iter().zip(&keys) {
            let record = key
                .as_ref()
                .and_then(|k| self.cache.get(k).and_then(|r| r.value().clone()));
            match record {
                Some(record) => {
                    let (merged, changed) = merge(entity, &record, &by_external_id);
                    if changed {
                        stats.enriched += 1;
                    }
                    out.push(merged);
                }
                None => out.push(entity.clone()),
            }
        }

        tracing::info!(
            "Enrichment: {} lookups, {} found, {} not found, {} failed, {} timed out, {} entities enriched",
            stats.looked_up,
            stats.found,
            stats.not_found,
            stats.failed,
            stats.timed_out,
            stats.enriched
        );
        (out, stats)
    }

    async fn fetch(&self, pending: BTreeMap<String, LookupQuery>, stats: &mut EnrichmentStats) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        for (key, query) in pending {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.timeout;
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = tokio::time::timeout(timeout, provider.lookup(query)).await;
                (key, result)
            });
            stats.looked_up += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            let (key, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("Enrichment task failed: {}", e);
                    stats.failed += 1;
                    continue;
                }
            };
            match result {
                Ok(Ok(Some(record))) => {
                    stats.found += 1;
                    self.cache.insert(key, Some(record));
                }
                Ok(Ok(None)) => {
                    stats.not_found += 1;
                    self.cache.insert(key, None);
                }
                Ok(Err(firmlink_kb::Error::Timeout)) | Err(_) => {
                    tracing::warn!("Enrichment lookup {} timed out; continuing without it", key);
                    stats.timed_out += 1;
                }
                Ok(Err(e)) => {
                    tracing::warn!("Enrichment lookup {} failed: {}; continuing without it", key, e);
                    stats.failed += 1;
                }
            }
        }
    }
}

/// Copy `entity` with the record's fields filled in where the entity has
/// none. Returns whether anything changed.
fn merge(
    entity: &Entity,
    record: &OrganizationRecord,
    by_external_id: &HashMap<&str, &str>,
) -> (Entity, bool) {
    let mut merged = entity.clone();
    let mut changed = false;

    if let Some(ticker) = record.normalized_ticker() {
        if !merged.tickers.iter().any(|t| t.eq_ignore_ascii_case(&ticker)) {
            merged.tickers.push(ticker);
            changed = true;
        }
    }

    if merged.parent_id.is_none() {
        if let Some(parent) = &record.parent {
            match by_external_id.get(parent.id.as_str()) {
                Some(&parent_id) if parent_id != entity.id => {
                    merged.parent_id = Some(parent_id.to_string());
                    changed = true;
                }
                _ => {}
            }
        }
    }

    for name in record.label.iter().chain(record.legal_names.iter()) {
        let name = name.trim();
        if name.is_empty()
            || name.eq_ignore_ascii_case(entity.display_name.trim())
            || merged.alternate_names.iter().any(|a| a.eq_ignore_ascii_case(name))
        {
            continue;
        }
        merged.alternate_names.push(name.to_string());
        changed = true;
    }

    if merged.country_code.is_none() {
        if let Some(country) = record.country.as_deref().map(str::trim).filter(|c| c.len() == 2) {
            merged.country_code = Some(country.to_uppercase());
            changed = true;
        }
    }
    if merged.homepage_url.is_none() {
        if let Some(homepage) = record.homepage.as_deref().filter(|h| !h.trim().is_empty()) {
            merged.homepage_url = Some(homepage.to_string());
            changed = true;
        }
    }
    if merged.external_id.is_none() {
        merged.external_id = Some(record.id.clone());
    }

    (merged, changed)
}
