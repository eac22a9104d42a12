//! Reproducible stratified sampling of final matches for accuracy audits.
//!
//! Matches are grouped by (winning strategy, confidence band). Every stratum
//! gets one draw before any stratum gets a second, so each strategy's error
//! rate stays observable even when it produced few matches; the remaining
//! draws are spread in proportion to stratum size. All randomness comes from
//! one `StdRng` seeded by the caller and consumed in a fixed order, so the
//! same (matches, n, seed) always yields the same sample.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::MatchConfig;
use crate::types::{confidence_key, format_confidence, FinalMatch, SampleRecord, Strategy};

pub struct Sampler {
    floor: f64,
    /// Strictly increasing lower band edges above the floor.
    bands: Vec<f64>,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::from_config(&MatchConfig::default())
    }
}

impl Sampler {
    pub fn new(floor: f64, bands: Vec<f64>) -> Self {
        Self { floor, bands }
    }

    pub fn from_config(config: &MatchConfig) -> Self {
        Self::new(config.acceptance_floor, config.sampling.bands.clone())
    }

    /// Index of the band a confidence falls in; 0 is the lowest band.
    pub fn band_index(&self, confidence: f64) -> usize {
        let key = confidence_key(confidence);
        self.bands
            .iter()
            .take_while(|edge| confidence_key(**edge) <= key)
            .count()
    }

    /// Human-readable band label, e.g. `[0.90,0.95)`.
    pub fn band_label(&self, index: usize) -> String {
        let lower = if index == 0 {
            self.floor
        } else {
            self.bands[index - 1]
        };
        match self.bands.get(index) {
            Some(upper) => format!("[{:.2},{:.2})", lower, upper),
            None => format!("[{:.2},1.00]", lower),
        }
    }

    /// Draw up to `n` matches. When `n` covers the table, every match is
    /// returned.
    pub fn sample(&self, matches: &[FinalMatch], n: usize, seed: u64) -> Vec<SampleRecord> {
        let mut strata: BTreeMap<(Strategy, usize), Vec<&FinalMatch>> = BTreeMap::new();
        for m in matches {
            strata
                .entry((m.winning_strategy, self.band_index(m.confidence)))
                .or_default()
                .push(m);
        }
        for members in strata.values_mut() {
            members.sort_by(|a, b| {
                a.entity_id
                    .cmp(&b.entity_id)
                    .then_with(|| a.firm_id.cmp(&b.firm_id))
            });
        }

        let mut chosen: Vec<(Strategy, usize, &FinalMatch)> = Vec::new();
        if n >= matches.len() {
            for (&(strategy, band), members) in &strata {
                chosen.extend(members.iter().map(|m| (strategy, band, *m)));
            }
        } else if n > 0 {
            let mut rng = StdRng::seed_from_u64(seed);
            let allocation = allocate(&strata, n, &mut rng);
            for ((key, members), take) in strata.iter_mut().zip(allocation) {
                if take == 0 {
                    continue;
                }
                let (picked, _) = members.partial_shuffle(&mut rng, take);
                chosen.extend(picked.iter().map(|m| (key.0, key.1, *m)));
            }
        }

        chosen.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.entity_id.cmp(&b.2.entity_id))
        });
        chosen
            .into_iter()
            .map(|(strategy, band, m)| SampleRecord {
                entity_id: m.entity_id.clone(),
                firm_id: m.firm_id.clone(),
                strategy,
                confidence: format_confidence(m.confidence).parse().unwrap_or(m.confidence),
                confidence_band: self.band_label(band),
                human_label: None,
            })
            .collect()
    }
}

/// Per-stratum draw counts, in stratum order, summing to `n`.
///
/// Requires `0 < n < total members`.
fn allocate(
    strata: &BTreeMap<(Strategy, usize), Vec<&FinalMatch>>,
    n: usize,
    rng: &mut StdRng,
) -> Vec<usize> {
    let sizes: Vec<usize> = strata.values().map(Vec::len).collect();
    let k = sizes.len();
    let mut allocation = vec![0usize; k];

    if n < k {
        let mut order: Vec<usize> = (0..k).collect();
        order.shuffle(rng);
        for &i in order.iter().take(n) {
            allocation[i] = 1;
        }
        return allocation;
    }

    // One per stratum, then the rest by largest remainder over spare capacity.
    allocation.iter_mut().for_each(|a| *a = 1);
    let remaining = n - k;
    let spare: Vec<usize> = sizes.iter().map(|s| s - 1).collect();
    let total_spare: usize = spare.iter().sum();
    if remaining == 0 || total_spare == 0 {
        return allocation;
    }

    let mut assigned = 0;
    let mut remainders: Vec<(usize, usize)> = Vec::with_capacity(k);
    for (i, &cap) in spare.iter().enumerate() {
        let numer = remaining * cap;
        let share = numer / total_spare;
        allocation[i] += share;
        assigned += share;
        remainders.push((numer % total_spare, i));
    }
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    for &(_, i) in remainders.iter().take(remaining - assigned) {
        allocation[i] += 1;
    }
    allocation
}

/// Sample with the default bands and acceptance floor.
pub fn sample(matches: &[FinalMatch], n: usize, seed: u64) -> Vec<SampleRecord> {
    Sampler::default().sample(matches, n, seed)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};

    use super::*;

    fn table() -> Vec<FinalMatch> {
        let mut out = Vec::new();
        for i in 0..300 {
            let (strategy, confidence) = match i % 10 {
                0..=5 => (Strategy::ExactName, 0.99),
                6 | 7 => (Strategy::Substring, 0.95),
                8 => (Strategy::Fuzzy, 0.88),
                _ => (Strategy::TickerAcronym, 0.94),
            };
            out.push(FinalMatch {
                entity_id: format!("E{:04}", i),
                firm_id: format!("F{}", i % 37),
                confidence,
                winning_strategy: strategy,
                evidence_flags: BTreeSet::new(),
                matched_name: String::new(),
                entity_normalized_name: String::new(),
            });
        }
        out.push(FinalMatch {
            entity_id: "E9999".into(),
            firm_id: "F1".into(),
            confidence: 0.9405,
            winning_strategy: Strategy::ParentCascade,
            evidence_flags: BTreeSet::new(),
            matched_name: String::new(),
            entity_normalized_name: String::new(),
        });
        out
    }

    #[test]
    fn test_band_index_and_label() {
        let s = Sampler::default();
        assert_eq!(s.band_index(0.86), 0);
        assert_eq!(s.band_index(0.90), 1);
        assert_eq!(s.band_index(0.9499), 1);
        assert_eq!(s.band_index(0.99), 3);
        assert_eq!(s.band_label(0), "[0.85,0.90)");
        assert_eq!(s.band_label(3), "[0.98,1.00]");
    }

    #[test]
    fn test_same_seed_same_sample() {
        let t = table();
        assert_eq!(sample(&t, 50, 42), sample(&t, 50, 42));
    }

    #[test]
    fn test_different_seed_differs() {
        let t = table();
        assert_ne!(sample(&t, 50, 42), sample(&t, 50, 7));
    }

    #[test]
    fn test_every_stratum_represented() {
        let t = table();
        let s = sample(&t, 10, 42);
        assert_eq!(s.len(), 10);
        let strategies: HashSet<Strategy> = s.iter().map(|r| r.strategy).collect();
        assert_eq!(strategies.len(), 5);
        assert!(s.iter().any(|r| r.entity_id == "E9999"));
    }

    #[test]
    fn test_sample_has_no_duplicates_and_exact_size() {
        let t = table();
        let s = sample(&t, 123, 1);
        assert_eq!(s.len(), 123);
        let ids: HashSet<&str> = s.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids.len(), 123);
    }

    #[test]
    fn test_oversized_request_returns_everything() {
        let t = table();
        let s = sample(&t, 500, 42);
        assert_eq!(s.len(), t.len());
        assert!(s.iter().all(|r| r.human_label.is_none()));
    }

    #[test]
    fn test_fewer_draws_than_strata() {
        let t = table();
        let s = sample(&t, 3, 42);
        assert_eq!(s.len(), 3);
        let strata: HashSet<(Strategy, String)> = s
            .iter()
            .map(|r| (r.strategy, r.confidence_band.clone()))
            .collect();
        assert_eq!(strata.len(), 3);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(sample(&[], 10, 42).is_empty());
        assert!(sample(&table(), 0, 42).is_empty());
    }
}
