use std::time::Duration;

use firmlink_kb::{Client, Error, LookupQuery};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

#[tokio::test]
async fn lookup_success() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("organization.json");

    Mock::given(method("GET"))
        .and(path("/organizations/lookup"))
        .and(query_param("name", "Google DeepMind"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let query = LookupQuery::default().with_name("Google DeepMind");
    let result = client.lookup_organization(&query).await;
    assert!(result.is_ok());

    let org = result.unwrap().expect("record present");
    assert_eq!(org.id, "Q15733006");
    assert_eq!(org.normalized_ticker().as_deref(), Some("GOOGL"));
}

#[tokio::test]
async fn lookup_not_found_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations/lookup"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let query = LookupQuery::default().with_name("Nonexistent Widgets");
    let result = client.lookup_organization(&query).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn lookup_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations/lookup"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let query = LookupQuery::default().with_name("Google");
    let err = client.lookup_organization(&query).await.unwrap_err();
    match err {
        Error::HttpStatus { status, ref body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "Service Unavailable");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn lookup_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/organizations/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not valid json}"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let query = LookupQuery::default().with_name("Google");
    let result = client.lookup_organization(&query).await;
    assert!(matches!(result, Err(Error::RequestFailed)));
}

#[tokio::test]
async fn lookup_times_out() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("organization_minimal.json");

    Mock::given(method("GET"))
        .and(path("/organizations/lookup"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(&body)
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client =
        Client::with_base_url_and_timeout(&mock_server.uri(), Duration::from_millis(50)).unwrap();
    let query = LookupQuery::default().with_name("Slow Corp");
    let result = client.lookup_organization(&query).await;
    assert!(matches!(result, Err(Error::Timeout)));
}

#[tokio::test]
async fn empty_query_skips_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri()).unwrap();
    let result = client.lookup_organization(&LookupQuery::default()).await;
    assert!(matches!(result, Ok(None)));
}

#[tokio::test]
async fn get_organization_by_id() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("organization_minimal.json");

    Mock::given(method("GET"))
        .and(path("/organizations/Q42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri())
        .unwrap()
        .with_api_key("secret".to_string());
    let org = client.get_organization("Q42").await.unwrap().unwrap();
    assert_eq!(org.id, "Q42");
}
