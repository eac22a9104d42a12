//! Evidence validators.
//!
//! Each validator inspects one candidate against its firm and returns a
//! confidence adjustment plus evidence flags. Positive adjustments across all
//! validators are summed and capped; penalties are applied in full. A
//! candidate that ends below the acceptance floor, or that needs
//! corroboration and received none, is dropped here.

use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::strategies::MatchContext;
use crate::types::{confidence_key, CandidateMatch, EvidenceFlag, Strategy};

/// Confidence change and flags produced by one validator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Adjustment {
    pub delta: f64,
    pub flags: Vec<EvidenceFlag>,
}

impl Adjustment {
    fn flag(delta: f64, flag: EvidenceFlag) -> Self {
        Self {
            delta,
            flags: vec![flag],
        }
    }
}

pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        firm: &PreparedFirm,
        candidate: &CandidateMatch,
    ) -> Adjustment;
}

/// Country-code agreement. Disagreement is a penalty except on exact names.
pub struct CountryValidator;

impl Validator for CountryValidator {
    fn name(&self) -> &'static str {
        "country"
    }

    fn validate(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        firm: &PreparedFirm,
        candidate: &CandidateMatch,
    ) -> Adjustment {
        let cfg = &ctx.config.validators;
        match (&entity.country, &firm.country) {
            (Some(a), Some(b)) if a == b => {
                Adjustment::flag(cfg.country_match_boost, EvidenceFlag::CountryMatch)
            }
            (Some(_), Some(_)) => {
                let penalty = if candidate.strategy == Strategy::ExactName {
                    0.0
                } else {
                    cfg.country_mismatch_penalty
                };
                Adjustment::flag(-penalty, EvidenceFlag::CountryMismatch)
            }
            _ => Adjustment::default(),
        }
    }
}

/// Entity name words that appear in the firm's business description.
///
/// Words that are generic, short, or already part of the firm's own name say
/// nothing new and are ignored.
pub struct DescriptionValidator;

impl Validator for DescriptionValidator {
    fn name(&self) -> &'static str {
        "description"
    }

    fn validate(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        firm: &PreparedFirm,
        _candidate: &CandidateMatch,
    ) -> Adjustment {
        let cfg = &ctx.config.validators;
        let lexicon = ctx.normalizer.lexicon();
        let overlap = entity.tokens.iter().any(|t| {
            t.chars().count() >= cfg.description_min_token_len
                && !lexicon.is_generic_term(t)
                && !firm.tokens.contains(t)
                && firm.description_tokens.contains(t)
        });
        if overlap {
            Adjustment::flag(cfg.description_overlap_boost, EvidenceFlag::DescriptionOverlap)
        } else {
            Adjustment::default()
        }
    }
}

/// City and region co-location.
pub struct GeoValidator;

fn same_place(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let a = a.trim();
            !a.is_empty() && a.eq_ignore_ascii_case(b.trim())
        }
        _ => false,
    }
}

impl Validator for GeoValidator {
    fn name(&self) -> &'static str {
        "geo"
    }

    fn validate(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        firm: &PreparedFirm,
        _candidate: &CandidateMatch,
    ) -> Adjustment {
        let cfg = &ctx.config.validators;
        let mut adjustment = Adjustment::default();
        if same_place(&entity.entity.city, &firm.firm.city) {
            adjustment.delta += cfg.city_boost;
            adjustment.flags.push(EvidenceFlag::CityMatch);
        }
        if same_place(&entity.entity.region, &firm.firm.region) {
            adjustment.delta += cfg.region_boost;
            adjustment.flags.push(EvidenceFlag::RegionMatch);
        }
        adjustment
    }
}

/// Textual similarity of homepage labels, for candidates that did not come
/// from the homepage strategy itself.
pub struct UrlValidator;

impl Validator for UrlValidator {
    fn name(&self) -> &'static str {
        "url"
    }

    fn validate(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        firm: &PreparedFirm,
        candidate: &CandidateMatch,
    ) -> Adjustment {
        if candidate.strategy == Strategy::HomepageDomain {
            return Adjustment::default();
        }
        let (Some(a), Some(b)) = (&entity.domain_label, &firm.domain_label) else {
            return Adjustment::default();
        };
        let cfg = &ctx.config.validators;
        let min = ctx.config.min_name_len;
        let contains = a.len() >= min && b.len() >= min && (a.contains(b.as_str()) || b.contains(a.as_str()));
        if contains || strsim::jaro_winkler(a, b) >= cfg.url_similarity_threshold {
            Adjustment::flag(cfg.url_similarity_boost, EvidenceFlag::UrlSimilar)
        } else {
            Adjustment::default()
        }
    }
}

/// Ordered validator list plus the acceptance gate.
pub struct ValidatorSet {
    validators: Vec<Box<dyn Validator>>,
}

impl Default for ValidatorSet {
    fn default() -> Self {
        Self {
            validators: vec![
                Box::new(CountryValidator),
                Box::new(DescriptionValidator),
                Box::new(GeoValidator),
                Box::new(UrlValidator),
            ],
        }
    }
}

impl ValidatorSet {
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self { validators }
    }

    /// Apply every validator to a candidate. Returns `None` when the
    /// candidate does not survive validation.
    pub fn apply(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        mut candidate: CandidateMatch,
    ) -> Option<CandidateMatch> {
        let Some(firm) = ctx.index.firm_by_id(&candidate.firm_id) else {
            tracing::debug!("Dropping candidate for unknown firm {}", candidate.firm_id);
            return None;
        };

        let mut boost = 0.0;
        let mut penalty = 0.0;
        for validator in &self.validators {
            let adjustment = validator.validate(ctx, entity, firm, &candidate);
            if adjustment.delta >= 0.0 {
                boost += adjustment.delta;
            } else {
                penalty += adjustment.delta;
            }
            candidate.evidence.extend(adjustment.flags);
        }
        let boost = boost.min(ctx.config.validators.max_total_boost);
        candidate.confidence = (candidate.confidence + boost + penalty).clamp(0.0, 1.0);

        if confidence_key(candidate.confidence) < confidence_key(ctx.config.acceptance_floor) {
            tracing::debug!(
                "Candidate {} -> {} ({}) below floor at {:.4}",
                candidate.entity_id,
                candidate.firm_id,
                candidate.strategy,
                candidate.confidence
            );
            return None;
        }
        if candidate.strategy.requires_validator_corroboration()
            && !candidate.evidence.iter().any(|f| f.is_corroborating())
        {
            tracing::debug!(
                "Candidate {} -> {} ({}) lacks corroboration",
                candidate.entity_id,
                candidate.firm_id,
                candidate.strategy
            );
            return None;
        }
        Some(candidate)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{firm, Fixture};
    use crate::strategies::{FuzzyStrategy, MatchStrategy, TickerAcronymStrategy};
    use crate::types::{Entity, Firm};

    fn ibm() -> Firm {
        let mut f = firm("F1", "INTL BUSINESS MACHINES CORP");
        f.tickers = vec!["IBM".into()];
        f.country_code = Some("US".into());
        f
    }

    fn validated(fx: &Fixture, strategy: &dyn MatchStrategy, entity: &PreparedEntity) -> Vec<CandidateMatch> {
        let set = ValidatorSet::default();
        fx.run(strategy, entity)
            .into_iter()
            .filter_map(|c| set.apply(&fx.ctx(), entity, c))
            .collect()
    }

    #[test]
    fn test_country_boost_and_penalty() {
        let fx = Fixture::new(vec![ibm()]);
        let us = validated(&fx, &TickerAcronymStrategy, &fx.named("IBM (United States)"));
        assert_eq!(confidence_key(us[0].confidence), confidence_key(0.98));
        assert!(us[0].has(EvidenceFlag::CountryMatch));

        let ca = validated(&fx, &TickerAcronymStrategy, &fx.named("IBM (Canada)"));
        assert_eq!(confidence_key(ca[0].confidence), confidence_key(0.94));
        assert!(ca[0].has(EvidenceFlag::CountryMismatch));
    }

    #[test]
    fn test_boosts_are_capped() {
        let mut f = ibm();
        f.city = Some("Armonk".into());
        f.region = Some("NY".into());
        f.business_description = "Mainframe computers and consulting".into();
        let fx = Fixture::new(vec![f]);
        let entity = fx.entity(Entity {
            id: "E1".into(),
            display_name: "IBM Mainframe".into(),
            alternate_names: vec!["IBM".into()],
            country_code: Some("US".into()),
            city: Some("armonk".into()),
            region: Some("ny".into()),
            ..Default::default()
        });
        let found = validated(&fx, &TickerAcronymStrategy, &entity);
        assert_eq!(found.len(), 1);
        assert!(found[0].has(EvidenceFlag::DescriptionOverlap));
        assert!(found[0].has(EvidenceFlag::CityMatch));
        assert!(found[0].has(EvidenceFlag::RegionMatch));
        assert_eq!(confidence_key(found[0].confidence), confidence_key(1.0));
    }

    #[test]
    fn test_fuzzy_without_corroboration_dropped() {
        let fx = Fixture::new(vec![firm("F1", "Schlumberger Ltd")]);
        assert!(validated(&fx, &FuzzyStrategy, &fx.named("Schlumbergr")).is_empty());
    }

    #[test]
    fn test_fuzzy_with_country_survives() {
        let mut f = firm("F1", "Schlumberger Ltd");
        f.country_code = Some("US".into());
        let fx = Fixture::new(vec![f]);
        let entity = fx.entity(Entity {
            id: "E1".into(),
            display_name: "Schlumbergr".into(),
            country_code: Some("US".into()),
            ..Default::default()
        });
        let found = validated(&fx, &FuzzyStrategy, &entity);
        assert_eq!(found.len(), 1);
        assert!(found[0].confidence >= 0.88);
    }

    #[test]
    fn test_below_floor_dropped() {
        let mut config = crate::config::MatchConfig::default();
        config.confidences.ticker_acronym = 0.86;
        let fx = Fixture::with_config(vec![ibm()], config);
        assert!(validated(&fx, &TickerAcronymStrategy, &fx.named("IBM (Canada)")).is_empty());
    }

    #[test]
    fn test_url_similarity() {
        let mut f = firm("F1", "Acme Robotics");
        f.homepage_domain = Some("acmerobotics.com".into());
        let fx = Fixture::new(vec![f]);
        let entity = fx.entity(Entity {
            id: "E1".into(),
            display_name: "Acme Robotic".into(),
            homepage_url: Some("http://acme-robotics.de".into()),
            ..Default::default()
        });
        let found = validated(&fx, &FuzzyStrategy, &entity);
        assert_eq!(found.len(), 1);
        assert!(found[0].has(EvidenceFlag::UrlSimilar));
    }

    #[test]
    fn test_default_set_order() {
        assert_eq!(
            ValidatorSet::default().names(),
            vec!["country", "description", "geo", "url"]
        );
    }
}
