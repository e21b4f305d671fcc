// Integration tests for `InventoryClient` using wiremock.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nilo_api::inventory::models::MacStateUpdate;
use nilo_api::{ApiCredential, BackoffRange, ClientPageQuery, Error, InventoryClient, RetryPolicy};

// ── Helpers ─────────────────────────────────────────────────────────

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        backoff: BackoffRange::immediate(),
        ..RetryPolicy::default()
    }
}

fn credential() -> ApiCredential {
    ApiCredential::new(&SecretString::from(" secret-key "), Some("tenant-1".into()))
}

async fn setup() -> (MockServer, InventoryClient) {
    let server = MockServer::start().await;
    let client = InventoryClient::from_reqwest(
        &server.uri(),
        reqwest::Client::new(),
        credential(),
        fast_retry(),
    )
    .unwrap();
    (server, client)
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

// ── Headers and envelopes ───────────────────────────────────────────

#[tokio::test]
async fn sends_trimmed_key_and_tenant_headers() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sites"))
        .and(header("x-nile-api-key", "secret-key"))
        .and(header("x-tenant-id", "tenant-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "s1", "name": "HQ"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let sites = client.list_sites(&CancellationToken::new()).await.unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].name.as_deref(), Some("HQ"));
}

#[tokio::test]
async fn list_endpoints_accept_every_envelope_shape() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/buildings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"id": "b1", "name": "North"}, {"id": "b2", "name": "South"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/segments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"content": [{"id": "seg-1", "instanceName": "Corp"}]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/floors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "f1", "name": "Ground", "number": 0, "buildingId": "b1"}
        ])))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let buildings = client.list_buildings(&cancel).await.unwrap();
    let segments = client.list_segments(&cancel).await.unwrap();
    let floors = client.list_floors(&cancel).await.unwrap();

    assert_eq!(buildings.len(), 2);
    assert_eq!(segments[0].name.as_deref(), Some("Corp"));
    assert_eq!(floors[0].building_id.as_deref(), Some("b1"));
}

#[tokio::test]
async fn waiting_devices_use_the_action_filter() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(query_param("action", "AUTH_WAITING_FOR_APPROVAL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"clientConfig": {"id": "c1", "macAddress": "aa:bb:cc:00:00:01",
                              "state": "AUTH_WAITING_FOR_APPROVAL"}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client
        .list_devices(
            Some(nilo_api::inventory::AWAITING_APPROVAL_ACTION),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(devices[0].mac_address.as_deref(), Some("aa:bb:cc:00:00:01"));
}

#[tokio::test]
async fn client_pages_are_walked_until_a_short_page() {
    let (server, client) = setup().await;

    let device = |n: u32| json!({"id": format!("c{n}"), "macAddress": format!("00:00:00:00:00:{n:02}")});

    Mock::given(method("GET"))
        .and(path("/clients"))
        .and(query_param("pageNumber", "1"))
        .and(query_param("pageSize", "2"))
        .and(query_param("tenantId", "tenant-1"))
        .and(query_param("startTime", "2025-03-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([device(1), device(2)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clients"))
        .and(query_param("pageNumber", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": [device(3)]})))
        .mount(&server)
        .await;

    let query = ClientPageQuery {
        tenant_id: "tenant-1".into(),
        start: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap(),
        page_number: 1,
        page_size: 2,
    };
    let all = client
        .list_all_clients(&query, &CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<_> = all.iter().map(|d| d.id.clone().unwrap()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn blank_client_records_are_skipped_without_ending_paging() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/clients"))
        .and(query_param("pageNumber", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"clientConfig": {"id": "c1", "macAddress": "00:00:00:00:00:01"}},
            {"clientConfig": null}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clients"))
        .and(query_param("pageNumber", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"clientConfig": {"id": "c3", "macAddress": "00:00:00:00:00:03"}}
        ])))
        .mount(&server)
        .await;

    let query = ClientPageQuery {
        tenant_id: "tenant-1".into(),
        start: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap(),
        page_number: 1,
        page_size: 2,
    };
    let cancel = CancellationToken::new();

    let first = client.list_clients(&query, &cancel).await.unwrap();
    assert_eq!(first.len(), 1);

    let all = client.list_all_clients(&query, &cancel).await.unwrap();
    let ids: Vec<_> = all.iter().map(|d| d.id.clone().unwrap()).collect();
    assert_eq!(ids, vec!["c1", "c3"]);
}

// ── Retry behaviour ─────────────────────────────────────────────────

#[tokio::test]
async fn unauthorized_responses_are_retried_until_success() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(3)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .with_priority(2)
        .mount(&server)
        .await;

    let sites = client.list_sites(&CancellationToken::new()).await.unwrap();
    assert!(sites.is_empty());
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn retry_ceiling_yields_authentication_exhausted() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/floors"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client
        .list_floors(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::AuthenticationExhausted {
            attempts: 6,
            last_status: 401
        }
    ));
    assert_eq!(request_count(&server).await, 6);
}

#[tokio::test]
async fn server_errors_are_not_retried() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/segments"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client
        .list_segments(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn unreachable_host_yields_network_exhausted() {
    let client = InventoryClient::from_reqwest(
        "http://127.0.0.1:1",
        reqwest::Client::new(),
        credential(),
        RetryPolicy {
            max_retries: 2,
            ..fast_retry()
        },
    )
    .unwrap();

    let err = client
        .list_sites(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::NetworkExhausted { attempts: 3, .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn cancelling_an_inflight_request_is_not_a_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client.list_sites(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn mac_state_update_sends_a_single_entry_macs_list() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/client-configs"))
        .and(body_json(json!({
            "macsList": [{
                "id": "c1-aa:bb:cc:dd:ee:ff",
                "macAddress": "aa:bb:cc:dd:ee:ff",
                "segmentId": "seg-1",
                "state": "AUTH_OK",
                "description": "lobby printer"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let update = MacStateUpdate {
        id: "c1-aa:bb:cc:dd:ee:ff".into(),
        mac_address: "aa:bb:cc:dd:ee:ff".into(),
        segment_id: "seg-1".into(),
        state: "AUTH_OK".into(),
        description: "lobby printer".into(),
    };
    let resp = client
        .update_mac_state(update, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(resp["status"], "ok");
}

#[tokio::test]
async fn refresh_requires_the_success_phrase() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/tenant/update"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Site(s), Building(s), Floor(s), and Segment(s) Updated Successfully.",
        ))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tenant/update"))
        .respond_with(ResponseTemplate::new(200).set_body_string("queued"))
        .with_priority(2)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let ok = client.refresh_tenant(&cancel).await.unwrap();
    assert!(ok.contains("Segment(s)"));

    let err = client.refresh_tenant(&cancel).await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse(_)));
}
