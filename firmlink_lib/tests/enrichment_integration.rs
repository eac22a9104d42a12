use std::time::Duration;

use firmlink_lib::config::EnrichmentConfig;
use firmlink_lib::firmlink_kb::Client;
use firmlink_lib::{Enricher, Entity, EvidenceFlag, Firm, Lexicon, MatchConfig, Matcher, Strategy};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn alphabet() -> Firm {
    Firm {
        id: "F001".into(),
        legal_name: "ALPHABET INC".into(),
        tickers: vec!["GOOGL".into(), "GOOG".into()],
        ..Default::default()
    }
}

fn entity(id: &str, name: &str) -> Entity {
    Entity {
        id: id.into(),
        display_name: name.into(),
        weight: 1.0,
        ..Default::default()
    }
}

fn matcher() -> Matcher {
    Matcher::new(vec![alphabet()], MatchConfig::default(), Lexicon::embedded().unwrap()).unwrap()
}

#[tokio::test]
async fn looked_up_ticker_resolves_entity() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizations/lookup"))
        .and(query_param("name", "Ocelot Neural Works"))
        .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("organization.json")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let enricher = Enricher::new(client, &EnrichmentConfig::default());
    let m = matcher();

    let out = m
        .run_enriched(vec![entity("E1", "Ocelot Neural Works")], &enricher)
        .await;
    assert_eq!(out.final_matches.len(), 1);
    let found = &out.final_matches[0];
    assert_eq!(found.firm_id, "F001");
    assert_eq!(found.winning_strategy, Strategy::TickerAcronym);
    assert!(found.evidence_flags.contains(&EvidenceFlag::KnowledgeBaseTicker));

    let stats = out.summary.enrichment.as_ref().unwrap();
    assert_eq!(stats.looked_up, 1);
    assert_eq!(stats.found, 1);
    assert_eq!(stats.enriched, 1);
    assert_eq!(out.summary.external_service_error, 0);
}

#[tokio::test]
async fn provider_outage_degrades_to_plain_matching() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizations/lookup"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let enricher = Enricher::new(client, &EnrichmentConfig::default());
    let m = matcher();

    let out = m
        .run_enriched(
            vec![entity("E1", "Ocelot Neural Works"), entity("E2", "Alphabet Inc.")],
            &enricher,
        )
        .await;
    assert_eq!(out.summary.external_service_error, 2);
    assert_eq!(out.summary.total_entities, 2);
    assert_eq!(out.final_matches.len(), 1);
    assert_eq!(out.final_matches[0].entity_id, "E2");
}

#[tokio::test]
async fn slow_provider_times_out_without_blocking_the_run() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizations/lookup"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(load_fixture("organization.json"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let config = EnrichmentConfig {
        timeout_ms: 100,
        ..Default::default()
    };
    let enricher = Enricher::new(client, &config);
    let m = matcher();

    let out = m
        .run_enriched(vec![entity("E1", "Ocelot Neural Works")], &enricher)
        .await;
    let stats = out.summary.enrichment.as_ref().unwrap();
    assert_eq!(stats.timed_out, 1);
    assert_eq!(out.summary.external_service_error, 1);
    assert!(out.final_matches.is_empty());
}

#[tokio::test]
async fn repeated_references_hit_the_cache() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizations/lookup"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let enricher = Enricher::new(client, &EnrichmentConfig::default());

    let (_, first) = enricher
        .enrich(vec![entity("E1", "Nonexistent Widgets"), entity("E2", "NONEXISTENT WIDGETS")])
        .await;
    assert_eq!(first.looked_up, 1);
    assert_eq!(first.not_found, 1);

    let (_, second) = enricher.enrich(vec![entity("E3", "Nonexistent Widgets")]).await;
    assert_eq!(second.looked_up, 0);
    assert_eq!(second.cache_hits, 1);
}
