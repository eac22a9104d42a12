use firmlink_kb::types::{OrganizationRecord, Response};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

#[test]
fn deserialize_organization_full() {
    let json = load_fixture("organization.json");
    let resp: Response<OrganizationRecord> = serde_json::from_str(&json).unwrap();
    let org = resp.data;

    assert_eq!(org.id, "Q15733006");
    assert_eq!(org.label.as_deref(), Some("Google DeepMind"));
    assert_eq!(org.normalized_ticker().as_deref(), Some("GOOGL"));
    assert_eq!(org.parent.as_ref().map(|p| p.id.as_str()), Some("Q20800404"));
    assert_eq!(org.legal_names, vec!["DeepMind Technologies Limited".to_string()]);
    assert_eq!(org.country.as_deref(), Some("GB"));
}

#[test]
fn deserialize_organization_minimal() {
    let json = load_fixture("organization_minimal.json");
    let resp: Response<OrganizationRecord> = serde_json::from_str(&json).unwrap();
    let org = resp.data;

    assert_eq!(org.id, "Q42");
    assert!(org.label.is_none());
    assert!(org.normalized_ticker().is_none());
    assert!(org.parent.is_none());
    assert!(org.legal_names.is_empty());
}

#[test]
fn blank_ticker_is_ignored() {
    let org: OrganizationRecord =
        serde_json::from_str(r#"{"id": "Q1", "ticker": "  "}"#).unwrap();
    assert!(org.normalized_ticker().is_none());
}
