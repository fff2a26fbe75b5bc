use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::types::ClearableField;

fn store_json(id: Uuid, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "address": null,
        "city": "Austin",
        "state": "TX",
        "phone": null,
        "website": null,
        "email": null,
        "email_confidence": null,
        "source": "manual",
        "source_url": null,
        "notes": null,
        "verified": false,
        "created_at": "2026-03-01T12:00:00Z",
        "updated_at": "2026-03-01T12:00:00Z"
    })
}

fn client_for(server: &MockServer, api_key: Option<&str>) -> ApiClient {
    ApiClient::new(&format!("{}/api", server.uri()), api_key.map(str::to_owned))
        .expect("client")
}

#[tokio::test]
async fn list_stores_sends_view_filters() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/api/stores"))
        .and(query_param("skip", "20"))
        .and(query_param("limit", "20"))
        .and(query_param("has_email", "false"))
        .and(query_param("search", "video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([store_json(id, "Tape Town")])))
        .expect(1)
        .mount(&server)
        .await;

    let view = StoreListView {
        search: Some("video".to_owned()),
        has_email: Some(false),
        page: 2,
        ..StoreListView::default()
    };
    let stores = client_for(&server, None)
        .list_stores(&view)
        .await
        .expect("stores");

    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0].id, id);
    assert_eq!(stores[0].name, "Tape Town");
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_stores": 3,
            "verified_stores": 1,
            "stores_with_emails": 2,
            "credits_remaining": null,
            "active_jobs": 0,
            "recent_jobs": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stats = client_for(&server, Some("s3cret"))
        .stats()
        .await
        .expect("stats");

    assert_eq!(stats.total_stores, 3);
    assert_eq!(stats.credits_remaining, None);
}

#[tokio::test]
async fn update_sends_nulls_for_cleared_fields() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("PUT"))
        .and(path(format!("/api/stores/{id}")))
        .and(body_json(json!({ "city": "Portland", "phone": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(store_json(id, "Disc Depot")))
        .expect(1)
        .mount(&server)
        .await;

    let edit = StoreEdit {
        city: Some("Portland".to_owned()),
        clear: vec![ClearableField::Phone],
        ..StoreEdit::default()
    };
    let store = client_for(&server, None)
        .update_store(id, &edit)
        .await
        .expect("store");

    assert_eq!(store.name, "Disc Depot");
}

#[tokio::test]
async fn error_envelope_becomes_api_error() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("DELETE"))
        .and(path(format!("/api/stores/{id}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "not_found", "message": "resource not found" },
            "meta": { "request_id": "abc", "timestamp": "2026-03-01T12:00:00Z" }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .delete_store(id)
        .await
        .expect_err("404");

    assert!(err.is_not_found());
    match err {
        ClientError::Api { code, message, .. } => {
            assert_eq!(code, "not_found");
            assert_eq!(message, "resource not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_envelope_error_uses_status_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .list_jobs(10)
        .await
        .expect_err("502");

    match err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, 502);
            assert_eq!(code, "http_error");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn directory_search_passes_only_given_parameters() {
    let server = MockServer::start().await;
    let job_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/api/search/directory"))
        .and(query_param("location", "Austin, TX"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "job_id": job_id, "status": "started" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let started = client_for(&server, None)
        .start_directory_search(None, Some("Austin, TX"), None)
        .await
        .expect("started");

    assert_eq!(started.job_id, job_id);
    assert_eq!(started.status, "started");
    assert_eq!(started.stores_to_process, None);
}

#[tokio::test]
async fn email_discovery_sends_explicit_ids() {
    let server = MockServer::start().await;
    let job_id = Uuid::new_v4();
    let store_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/api/search/emails"))
        .and(body_json(json!({ "store_ids": [store_id] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": job_id,
            "status": "started",
            "stores_to_process": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let started = client_for(&server, None)
        .start_email_discovery(&[store_id])
        .await
        .expect("started");

    assert_eq!(started.stores_to_process, Some(1));
}

#[tokio::test]
async fn malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/provider/account"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .provider_account()
        .await
        .expect_err("bad body");

    assert!(matches!(err, ClientError::Deserialize { .. }));
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = ApiClient::new("not a url", None).expect_err("invalid");
    assert!(matches!(err, ClientError::InvalidUrl { .. }));
}

#[test]
fn debug_output_redacts_api_key() {
    let client = ApiClient::new("http://localhost:8001/api", Some("s3cret".to_owned()))
        .expect("client");
    let debug = format!("{client:?}");
    assert!(!debug.contains("s3cret"));
    assert!(debug.contains("[redacted]"));
}
