// Integration tests for `Dashboard` against wiremock backends.
#![allow(clippy::unwrap_used)]

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nilo_api::BackoffRange;
use nilo_core::{
    AuthorizeForm, ClientWindow, CoreError, Dashboard, DashboardConfig, IdentityConfig,
    NewCredential, RetryPolicy, UNKNOWN_BUILDING, authorize,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer) -> DashboardConfig {
    let mut config = DashboardConfig::new(format!("{}/api/", server.uri()).parse().unwrap());
    config.store_url = Some(format!("{}/store/", server.uri()).parse().unwrap());
    config.tenant_id = Some("tenant-1".into());
    config.retry = RetryPolicy {
        backoff: BackoffRange::immediate(),
        ..RetryPolicy::default()
    };
    config
}

/// Dashboard with an explicit API key; no identity provider.
async fn keyed() -> (MockServer, Dashboard) {
    let server = MockServer::start().await;
    let mut config = config(&server);
    config.api_key = Some(SecretString::from("explicit-key"));
    let dashboard = Dashboard::new(config).unwrap();
    (server, dashboard)
}

/// Dashboard that signs in and resolves its key from the store.
async fn signed_in() -> (MockServer, Dashboard) {
    let server = MockServer::start().await;
    let mut config = config(&server);
    config.identity = Some(IdentityConfig {
        endpoint: format!("{}/idp", server.uri()).parse().unwrap(),
        client_id: "app-client".into(),
    });

    let claims = json!({"sub": "sub-1", "cognito:username": "ada", "email": "ada@example.com"});
    let id_token = format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(claims.to_string()));
    Mock::given(method("POST"))
        .and(path("/idp"))
        .and(header("x-amz-target", "AWSCognitoIdentityProviderService.InitiateAuth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "AuthenticationResult": {
                "IdToken": id_token,
                "AccessToken": "access-token",
                "RefreshToken": "refresh-token",
                "ExpiresIn": 3600
            }
        })))
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(config).unwrap();
    dashboard
        .session()
        .unwrap()
        .sign_in("ada", &SecretString::from("pw"), &CancellationToken::new())
        .await
        .unwrap();
    (server, dashboard)
}

async fn mount_hierarchy(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/buildings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": [
            {"id": "B1", "siteId": "S1", "name": "Alpha"},
            {"id": "B2", "siteId": "S1", "name": "Beta"}
        ]})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/floors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"content": [
            {"id": "F1", "buildingId": "B1", "name": "Ground", "number": 0}
        ]}})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "S1", "name": "HQ", "address": "{\"city\":\"Austin\"}"}
        ])))
        .mount(server)
        .await;
}

// ── Hierarchy ───────────────────────────────────────────────────────

#[tokio::test]
async fn device_tree_groups_by_resolved_names() {
    let (server, dashboard) = keyed().await;
    mount_hierarchy(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .and(query_param("action", "AUTH_WAITING_FOR_APPROVAL"))
        .and(header("x-nile-api-key", "explicit-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "d1", "macAddress": "b0:00:00:00:00:01", "buildingId": "B2", "floorId": "F1"},
            {"id": "d2", "macAddress": "A0:00:00:00:00:02", "buildingId": "B1", "floorId": "F1"},
            {"id": "d3", "macAddress": "c0:00:00:00:00:03", "buildingId": "B2", "floorId": "F1"},
            {"id": "d4", "macAddress": "d0:00:00:00:00:04"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let tree = dashboard
        .device_tree(true, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tree.grouping.building_order, vec!["B1", "B2", UNKNOWN_BUILDING]);
    assert_eq!(tree.grouping.building_name("B2"), "Beta");
    assert_eq!(tree.grouping.floor_name("F1"), "Ground");
    assert_eq!(tree.grouping.item_count(), 4);
    assert!(tree.expansion.is_building_expanded("B1"));
    assert!(!tree.expansion.is_floor_expanded("B1", "F1"));
}

#[tokio::test]
async fn device_tree_lists_buildings_and_floors_once_and_skips_sites() {
    let (server, dashboard) = keyed().await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "d1", "macAddress": "a0:00:00:00:00:01", "buildingId": "B1", "floorId": "F1"},
            {"clientConfig": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/buildings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "B1", "siteId": "S1", "name": "Alpha"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/floors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "F1", "buildingId": "B1", "name": "Ground"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/sites"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let tree = dashboard
        .device_tree(false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tree.grouping.building_order, vec!["B1"]);
    assert_eq!(tree.grouping.building_name("B1"), "Alpha");
    assert_eq!(tree.grouping.floor_name("F1"), "Ground");
    assert_eq!(tree.grouping.item_count(), 1);
}

#[tokio::test]
async fn floors_carry_parent_names() {
    let (server, dashboard) = keyed().await;
    mount_hierarchy(&server).await;

    let floors = dashboard.floors(&CancellationToken::new()).await.unwrap();
    assert_eq!(floors.len(), 1);
    assert_eq!(floors[0].building_name.as_deref(), Some("Alpha"));
    assert_eq!(floors[0].site_name.as_deref(), Some("HQ"));
    assert_eq!(floors[0].number.as_deref(), Some("0"));
}

#[tokio::test]
async fn assembled_tenant_nests_flat_lists() {
    let (server, dashboard) = keyed().await;
    mount_hierarchy(&server).await;

    let tenant = dashboard
        .assembled_tenant(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(tenant.id, "tenant-1");
    assert_eq!(tenant.sites[0].address.city.as_deref(), Some("Austin"));
    assert_eq!(tenant.building_count(), 2);
    assert_eq!(tenant.floor_count(), 1);
}

#[tokio::test]
async fn client_page_uses_window_and_tenant() {
    let (server, dashboard) = keyed().await;
    Mock::given(method("GET"))
        .and(path("/api/clients"))
        .and(query_param("tenantId", "tenant-1"))
        .and(query_param("startTime", "2025-03-01T00:00:00Z"))
        .and(query_param("endTime", "2025-03-02T00:00:00Z"))
        .and(query_param("pageNumber", "2"))
        .and(query_param("pageSize", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": [
            {"clientConfig": {"id": "c1", "macAddress": "aa:aa:aa:aa:aa:aa"}}
        ]})))
        .expect(1)
        .mount(&server)
        .await;

    let now = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
    let mut window = ClientWindow::last_day(now, 10);
    window.page = Some(2);

    let clients = dashboard
        .clients(&window, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].mac.as_str(), "aa:aa:aa:aa:aa:aa");
}

// ── Credential resolution ───────────────────────────────────────────

#[tokio::test]
async fn stored_key_is_resolved_for_inventory_calls() {
    let (server, dashboard) = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/store/api-keys"))
        .and(header("authorization", "Bearer ".to_owned() + &id_token_of(&dashboard)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"apiKeys": [
            {"keyId": "k1", "name": "other", "key": "other-key", "service": "Other"},
            {"keyId": "k2", "name": "backup", "key": "backup-key", "service": "nile-backup"},
            {"keyId": "k3", "name": "prod", "key": "nile-key", "service": "Nile"}
        ]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/segments"))
        .and(header("x-nile-api-key", "nile-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "seg-1", "name": "Corp"}
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let segments = dashboard.segments(&cancel).await.unwrap();
    assert_eq!(segments[0].name, "Corp");

    // Second call reuses the resolved client without listing keys again.
    dashboard.segments(&cancel).await.unwrap();
}

fn id_token_of(dashboard: &Dashboard) -> String {
    use secrecy::ExposeSecret;
    dashboard
        .session()
        .unwrap()
        .id_token()
        .unwrap()
        .expose_secret()
        .to_owned()
}

#[tokio::test]
async fn signed_in_user_without_keys_gets_an_actionable_error() {
    let (server, dashboard) = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/store/api-keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"apiKeys": []})))
        .mount(&server)
        .await;

    let err = dashboard
        .sites(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NoCredentialAvailable { ref target } if target == "Nile"));
}

// ── Authorization ───────────────────────────────────────────────────

#[tokio::test]
async fn approval_sends_one_patch_with_ok_state() {
    let (server, dashboard) = keyed().await;
    Mock::given(method("PATCH"))
        .and(path("/api/client-configs"))
        .and(body_json(json!({"macsList": [{
            "id": "c1-AA:BB:CC:DD:EE:FF",
            "macAddress": "AA:BB:CC:DD:EE:FF",
            "segmentId": "seg-1",
            "state": "AUTH_OK",
            "description": "Updated via MAB Onboarding API"
        }]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut form = AuthorizeForm::new(Some("c1"), Some("AA:BB:CC:DD:EE:FF"));
    form.form_mut().set_field_value(authorize::STATUS_FIELD, "Approved");
    form.form_mut().set_field_value(authorize::SEGMENT_FIELD, "seg-1");

    let mac = dashboard
        .authorize(&mut form, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(mac.as_str(), "AA:BB:CC:DD:EE:FF");
    assert!(!form.form().has_errors());
    assert!(!form.form().is_submitting());
}

#[tokio::test]
async fn denial_maps_to_denied_state() {
    let (server, dashboard) = keyed().await;
    Mock::given(method("PATCH"))
        .and(path("/api/client-configs"))
        .and(body_partial_json(json!({"macsList": [{"state": "AUTH_DENIED", "description": "rogue"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut form = AuthorizeForm::new(Some("c9"), Some("aa:bb"));
    let f = form.form_mut();
    f.set_field_value(authorize::STATUS_FIELD, "Denied");
    f.set_field_value(authorize::SEGMENT_FIELD, "seg-2");
    f.set_field_value(authorize::DESCRIPTION_FIELD, "rogue");

    dashboard
        .authorize(&mut form, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_status_never_reaches_the_network() {
    let (server, dashboard) = keyed().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut form = AuthorizeForm::new(Some("c1"), Some("aa:bb"));
    form.form_mut().set_field_value(authorize::STATUS_FIELD, "Quarantined");
    form.form_mut().set_field_value(authorize::SEGMENT_FIELD, "seg-1");

    let err = dashboard
        .authorize(&mut form, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidStatus { ref value } if value == "Quarantined"));
}

#[tokio::test]
async fn backend_failure_is_recorded_on_the_form() {
    let (server, dashboard) = keyed().await;
    Mock::given(method("PATCH"))
        .and(path("/api/client-configs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("segment locked"))
        .expect(1)
        .mount(&server)
        .await;

    let mut form = AuthorizeForm::new(Some("c1"), Some("aa:bb"));
    form.form_mut().set_field_value(authorize::STATUS_FIELD, "Approved");
    form.form_mut().set_field_value(authorize::SEGMENT_FIELD, "seg-1");

    let err = dashboard
        .authorize(&mut form, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    let message = form.form().error(nilo_core::FORM_ERROR_KEY).unwrap();
    assert!(message.contains("segment locked"));
    assert!(!form.form().is_submitting());
}

// ── API keys ────────────────────────────────────────────────────────

#[tokio::test]
async fn key_crud_keeps_the_cache_in_step() {
    let (server, dashboard) = signed_in().await;
    Mock::given(method("POST"))
        .and(path("/store/api-keys"))
        .and(body_partial_json(json!({"name": "lab", "service": "Nile", "tenantId": "t-1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "keyId": "k-new", "name": "lab", "key": "lab-key", "service": "Nile",
            "tenantId": "t-1", "createdAt": "2025-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/store/api-keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "lab-renamed", "updatedAt": "2025-02-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/store/api-keys"))
        .and(query_param("keyId", "k-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})))
        .expect(1)
        .mount(&server)
        .await;

    let keys = dashboard.keys().unwrap();
    let cancel = CancellationToken::new();

    let created = keys
        .create(
            NewCredential {
                name: "lab".into(),
                key: SecretString::from("lab-key"),
                service: "Nile".into(),
                url: None,
                valid_before: None,
                tenant_id: Some("t-1".into()),
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(created.id, "k-new");
    assert_eq!(keys.cache().len(), 1);

    let mut renamed = created.clone();
    renamed.name = "lab-renamed".into();
    let updated = keys.update(&renamed, &cancel).await.unwrap();
    assert_eq!(updated.updated_at.as_deref(), Some("2025-02-01T00:00:00Z"));
    assert_eq!(keys.cache().snapshot()[0].name, "lab-renamed");

    keys.delete("k-new", &cancel).await.unwrap();
    assert!(keys.cache().is_empty());
}

#[tokio::test]
async fn updating_an_uncached_key_leaves_the_cache_alone() {
    let (server, dashboard) = signed_in().await;
    Mock::given(method("PUT"))
        .and(path("/store/api-keys"))
        .and(body_partial_json(json!({"keyId": "elsewhere"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "updatedAt": "2025-02-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let keys = dashboard.keys().unwrap();
    let credential = nilo_core::ApiKeyCredential {
        id: "elsewhere".into(),
        name: "other-device".into(),
        key: SecretString::from("k"),
        service: "Nile".into(),
        url: None,
        valid_before: None,
        tenant_id: Some("t-1".into()),
        created_at: None,
        updated_at: None,
    };
    let updated = keys
        .update(&credential, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(updated.updated_at.as_deref(), Some("2025-02-01T00:00:00Z"));
    assert!(keys.cache().is_empty());
}

#[tokio::test]
async fn store_rejection_carries_its_status() {
    let (server, dashboard) = signed_in().await;
    Mock::given(method("PUT"))
        .and(path("/store/api-keys"))
        .respond_with(ResponseTemplate::new(404).set_body_string("API key not found"))
        .mount(&server)
        .await;

    let mut ghost = nilo_core::ApiKeyCredential {
        id: "missing".into(),
        name: "ghost".into(),
        key: SecretString::from("k"),
        service: "Nile".into(),
        url: None,
        valid_before: None,
        tenant_id: Some("t-1".into()),
        created_at: None,
        updated_at: None,
    };
    let err = dashboard
        .keys()
        .unwrap()
        .update(&ghost, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::RemoteStore { status: 404, .. }));

    ghost.tenant_id = None;
    let err = dashboard
        .keys()
        .unwrap()
        .update(&ghost, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn signed_out_user_cannot_touch_keys() {
    let (server, dashboard) = signed_in().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "AWSCognitoIdentityProviderService.GlobalSignOut"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;
    Mock::given(path("/store/api-keys"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    dashboard.session().unwrap().sign_out(&cancel).await.unwrap();

    let err = dashboard.keys().unwrap().list(&cancel).await.unwrap_err();
    assert!(matches!(err, CoreError::NotAuthenticated));
}

// ── Refresh ─────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_requires_the_success_marker() {
    let (server, dashboard) = keyed().await;
    Mock::given(method("GET"))
        .and(path("/api/tenant/update"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Tenant Updated Successfully"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    assert!(dashboard.refresh(&cancel).await.is_ok());

    Mock::given(method("GET"))
        .and(path("/api/tenant/update"))
        .respond_with(ResponseTemplate::new(200).set_body_string("queued"))
        .mount(&server)
        .await;
    let err = dashboard.refresh(&cancel).await.unwrap_err();
    assert!(matches!(err, CoreError::UnexpectedResponse { .. }));
}
