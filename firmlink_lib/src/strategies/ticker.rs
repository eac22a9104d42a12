use super::{best_name_similarity, candidate, char_len, countries_agree, MatchContext, MatchStrategy};
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::types::{CandidateMatch, EvidenceFlag, Strategy};

/// Entity acronym or looked-up ticker equals a firm ticker or firm initials.
///
/// Three signals, strongest first:
/// - a ticker supplied by the lookup provider equals a firm ticker
/// - a short entity name equals a firm ticker, corroborated by country,
///   firm initials or name similarity
/// - a short entity name equals the initials of a firm name
///
/// Blocklisted generic tickers never match, and entities whose normalized
/// name is below the minimum length are skipped entirely.
pub struct TickerAcronymStrategy;

impl MatchStrategy for TickerAcronymStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::TickerAcronym
    }

    fn propose(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        candidates: &[&PreparedFirm],
    ) -> Vec<CandidateMatch> {
        if char_len(&entity.name) < ctx.config.min_name_len {
            return Vec::new();
        }
        let lexicon = ctx.normalizer.lexicon();
        let confidences = &ctx.config.confidences;
        let acronyms: Vec<&String> = entity
            .acronyms
            .iter()
            .filter(|a| !lexicon.is_generic_ticker(a))
            .collect();

        let mut out = Vec::new();
        for firm in candidates {
            let enriched = entity
                .enriched_tickers
                .iter()
                .find(|t| !lexicon.is_generic_ticker(t) && firm.tickers.contains(*t));
            if let Some(ticker) = enriched {
                out.push(candidate(
                    entity,
                    firm,
                    Strategy::TickerAcronym,
                    1.0,
                    confidences.ticker_enriched,
                    [EvidenceFlag::TickerMatch, EvidenceFlag::KnowledgeBaseTicker],
                    ticker,
                ));
                continue;
            }

            if let Some(acronym) = acronyms.iter().find(|a| firm.tickers.contains(**a)) {
                let initials = firm.initials.contains(*acronym);
                let similarity = best_name_similarity(entity, firm);
                let similar = similarity >= ctx.config.matching.name_similarity_corroboration;
                if !(initials || similar || countries_agree(entity, firm)) {
                    tracing::debug!(
                        "Uncorroborated ticker {} for entity {} and firm {}",
                        acronym,
                        entity.id(),
                        firm.id()
                    );
                    continue;
                }
                let mut evidence = vec![EvidenceFlag::TickerMatch, EvidenceFlag::AcronymMatch];
                if initials {
                    evidence.push(EvidenceFlag::InitialsMatch);
                }
                if similar {
                    evidence.push(EvidenceFlag::NameSimilarity);
                }
                out.push(candidate(
                    entity,
                    firm,
                    Strategy::TickerAcronym,
                    similarity,
                    confidences.ticker_acronym,
                    evidence,
                    acronym,
                ));
                continue;
            }

            // Initials span every significant token of a firm name. Country is
            // left to the validators.
            if let Some(acronym) = acronyms.iter().find(|a| firm.initials.contains(**a)) {
                out.push(candidate(
                    entity,
                    firm,
                    Strategy::TickerAcronym,
                    best_name_similarity(entity, firm),
                    confidences.acronym_initials,
                    [EvidenceFlag::AcronymMatch, EvidenceFlag::InitialsMatch],
                    acronym,
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

    fn ibm() -> crate::types::Firm {
        let mut f = firm("F1", "INTL BUSINESS MACHINES CORP");
        f.tickers = vec!["IBM".into()];
        f.country_code = Some("US".into());
        f
    }

    #[test]
    fn test_ticker_corroborated_by_initials() {
        let fx = Fixture::new(vec![ibm()]);
        let found = fx.run(&TickerAcronymStrategy, &fx.named("IBM (Canada)"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 0.96);
        assert!(found[0].has(EvidenceFlag::InitialsMatch));
        assert!(found[0].has(EvidenceFlag::TickerMatch));
    }

    #[test]
    fn test_uncorroborated_ticker_rejected() {
        let mut f = firm("F1", "Zenith Widgets");
        f.tickers = vec!["ZXQ".into()];
        f.country_code = Some("US".into());
        let fx = Fixture::new(vec![f]);
        let entity = fx.entity(Entity {
            id: "E1".into(),
            display_name: "ZXQ".into(),
            country_code: Some("FR".into()),
            ..Default::default()
        });
        assert!(fx.run(&TickerAcronymStrategy, &entity).is_empty());
    }

    #[test]
    fn test_ticker_corroborated_by_country() {
        let mut f = firm("F1", "Zenith Widgets");
        f.tickers = vec!["ZXQ".into()];
        f.country_code = Some("US".into());
        let fx = Fixture::new(vec![f]);
        let entity = fx.entity(Entity {
            id: "E1".into(),
            display_name: "ZXQ".into(),
            country_code: Some("US".into()),
            ..Default::default()
        });
        let found = fx.run(&TickerAcronymStrategy, &entity);
        assert_eq!(found.len(), 1);
        assert!(!found[0].has(EvidenceFlag::InitialsMatch));
    }

    #[test]
    fn test_generic_ticker_blocked() {
        let mut f = firm("F1", "C3.ai Inc");
        f.tickers = vec!["AI".into()];
        f.country_code = Some("US".into());
        let fx = Fixture::new(vec![f]);
        let entity = fx.entity(Entity {
            id: "E1".into(),
            display_name: "AI Corporation".into(),
            country_code: Some("US".into()),
            tickers: vec!["AI".into()],
            ..Default::default()
        });
        assert!(fx.run(&TickerAcronymStrategy, &entity).is_empty());
    }

    #[test]
    fn test_enriched_ticker() {
        let mut f = firm("F1", "Alphabet Inc");
        f.tickers = vec!["GOOGL".into()];
        let fx = Fixture::new(vec![f]);
        let entity = fx.entity(Entity {
            id: "E1".into(),
            display_name: "Google DeepMind".into(),
            tickers: vec!["googl".into()],
            ..Default::default()
        });
        let found = fx.run(&TickerAcronymStrategy, &entity);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 0.97);
        assert!(found[0].has(EvidenceFlag::KnowledgeBaseTicker));
    }

    #[test]
    fn test_initials_match_without_country() {
        let mut f = firm("F1", "Koninklijke Philips Medical");
        f.country_code = Some("NL".into());
        let fx = Fixture::new(vec![f]);

        let same = fx.entity(Entity {
            id: "E1".into(),
            display_name: "KPM".into(),
            country_code: Some("NL".into()),
            ..Default::default()
        });
        let found = fx.run(&TickerAcronymStrategy, &same);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 0.93);

        let unknown = fx.entity(Entity {
            id: "E2".into(),
            display_name: "KPM".into(),
            ..Default::default()
        });
        assert_eq!(fx.run(&TickerAcronymStrategy, &unknown).len(), 1);

        let abroad = fx.entity(Entity {
            id: "E3".into(),
            display_name: "KPM".into(),
            country_code: Some("US".into()),
            ..Default::default()
        });
        assert_eq!(fx.run(&TickerAcronymStrategy, &abroad).len(), 1);
    }

    #[test]
    fn test_initials_of_legal_name_only_firm() {
        let fx = Fixture::new(vec![firm("F1", "INTL BUSINESS MACHINES CORP")]);
        for name in ["IBM (United States)", "IBM (Canada)"] {
            let found = fx.run(&TickerAcronymStrategy, &fx.named(name));
            assert_eq!(found.len(), 1, "{}", name);
            assert_eq!(found[0].firm_id, "F1");
            assert!(found[0].has(EvidenceFlag::InitialsMatch));
            assert!(!found[0].has(EvidenceFlag::TickerMatch));
        }
    }
}
