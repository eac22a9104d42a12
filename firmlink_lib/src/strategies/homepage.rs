use super::{candidate, char_len, MatchContext, MatchStrategy};
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::types::{CandidateMatch, EvidenceFlag, Strategy};

/// Entity homepage and firm homepage reduce to the same root domain, or to
/// the same registrable label under different suffixes (`ibm.com` and
/// `ibm.co.uk`).
pub struct HomepageDomainStrategy;

impl MatchStrategy for HomepageDomainStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::HomepageDomain
    }

    fn propose(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        candidates: &[&PreparedFirm],
    ) -> Vec<CandidateMatch> {
        let Some(entity_domain) = entity.root_domain.as_deref() else {
            return Vec::new();
        };
        let entity_label = entity.domain_label.as_deref().unwrap_or_default();
        let confidences = &ctx.config.confidences;

        let mut out = Vec::new();
        for firm in candidates {
            let Some(firm_domain) = firm.root_domain.as_deref() else {
                continue;
            };
            if firm_domain == entity_domain {
                out.push(candidate(
                    entity,
                    firm,
                    Strategy::HomepageDomain,
                    1.0,
                    confidences.homepage_domain,
                    [EvidenceFlag::DomainMatch],
                    firm_domain,
                ));
            } else if firm.domain_label.as_deref() == Some(entity_label)
                && char_len(entity_label) >= ctx.config.min_name_len
                && !ctx.normalizer.lexicon().is_generic_term(entity_label)
            {
                out.push(candidate(
                    entity,
                    firm,
                    Strategy::HomepageDomain,
                    1.0,
                    confidences.homepage_domain_variant,
                    [EvidenceFlag::DomainVariant],
                    firm_domain,
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{firm, Fixture};
    use crate::types::Entity;

    fn with_homepage(url: &str) -> Entity {
        Entity {
            id: "E1".into(),
            display_name: "Some Research Group".into(),
            homepage_url: Some(url.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_same_root_domain() {
        let mut f = firm("F1", "INTL BUSINESS MACHINES CORP");
        f.homepage_domain = Some("ibm.com".into());
        let fx = Fixture::new(vec![f]);
        let found = fx.run(
            &HomepageDomainStrategy,
            &fx.entity(with_homepage("https://research.ibm.com/labs/zurich")),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 0.98);
        assert!(found[0].has(EvidenceFlag::DomainMatch));
    }

    #[test]
    fn test_country_tld_variant() {
        let mut f = firm("F1", "INTL BUSINESS MACHINES CORP");
        f.homepage_domain = Some("www.ibm.com".into());
        let fx = Fixture::new(vec![f]);
        let found = fx.run(
            &HomepageDomainStrategy,
            &fx.entity(with_homepage("http://www.ibm.co.uk")),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 0.97);
        assert!(found[0].has(EvidenceFlag::DomainVariant));
    }

    #[test]
    fn test_no_homepage_no_match() {
        let mut f = firm("F1", "Acme");
        f.homepage_domain = Some("acme.com".into());
        let fx = Fixture::new(vec![f]);
        assert!(fx.run(&HomepageDomainStrategy, &fx.named("Acme")).is_empty());
        assert!(fx
            .run(&HomepageDomainStrategy, &fx.entity(with_homepage("acme-labs.org")))
            .is_empty());
    }
}
