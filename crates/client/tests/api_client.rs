//! HTTP-level tests of `ApiClient` against the mock backend.
//!
//! Covers bearer injection, the `{data}` envelope, error-message
//! extraction, session expiry on 401, and the voucher endpoints whose
//! response shapes differ from the rest.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use serde_json::json;

use common::{client, page, scope, spawn_backend, Reply};
use eduadmin_client::error::ClientError;
use eduadmin_client::storage::{AUTH_TOKEN_KEY, SCOPE_KEY, USER_KEY};
use eduadmin_core::search::SearchQuery;
use eduadmin_core::voucher::{StatsSource, VoucherStatus};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_persists_token_and_sends_bearer() {
    let server = spawn_backend().await;
    server.mock.on(
        "POST /auth/login",
        vec![Reply::data(json!({
            "token": "tok-123",
            "user": {"id": 1, "username": "admin", "role": "admin"}
        }))],
    );
    server
        .mock
        .on("GET /filters/countries", vec![Reply::data(json!([{"id": 1, "name": "Egypt"}]))]);
    let (api, storage) = client(&server);

    let user = api.login("admin", "secret").await.unwrap();
    assert_eq!(user.username.as_deref(), Some("admin"));
    assert_eq!(
        storage.get(AUTH_TOKEN_KEY).unwrap().as_deref(),
        Some("\"tok-123\"")
    );

    let countries = api.countries().await.unwrap();
    assert_eq!(countries[0].name, "Egypt");

    let login = &server.mock.requests_to("POST /auth/login")[0];
    assert_eq!(login.body, json!({"username": "admin", "password": "secret"}));
    assert_eq!(login.authorization, None);
    let list = &server.mock.requests_to("GET /filters/countries")[0];
    assert_eq!(list.authorization.as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn test_unsuccessful_login_reports_message() {
    let server = spawn_backend().await;
    server.mock.on(
        "POST /auth/login",
        vec![Reply::Json(
            StatusCode::OK,
            json!({"success": false, "message": "Invalid credentials"}),
        )],
    );
    let (api, _storage) = client(&server);

    let err = api.login("admin", "wrong").await.unwrap_err();
    assert_eq!(err.user_message("Login failed"), "Invalid credentials");
    assert!(!api.session().is_authenticated());
}

#[tokio::test]
async fn test_401_clears_token_user_and_scope() {
    let server = spawn_backend().await;
    server.mock.on(
        "POST /auth/login",
        vec![Reply::data(json!({"token": "tok", "user": {"username": "admin"}}))],
    );
    server.mock.on(
        "POST /bundles/search",
        vec![Reply::error(StatusCode::UNAUTHORIZED, "Token expired")],
    );
    let (api, storage) = client(&server);
    api.login("admin", "secret").await.unwrap();
    api.session().scope().select_subject(scope(4)).unwrap();

    let err = api
        .search_bundles(&SearchQuery::new(4, 1, 20))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!api.session().is_authenticated());
    assert!(api.session().scope().current().is_none());
    for key in [AUTH_TOKEN_KEY, USER_KEY, SCOPE_KEY] {
        assert!(storage.get(key).unwrap().is_none(), "{key} should be cleared");
    }
}

// ---------------------------------------------------------------------------
// Envelope and errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_search_sends_filters_and_reads_pagination() {
    let server = spawn_backend().await;
    server.mock.on(
        "POST /rows/search",
        vec![page(
            json!([{"id": 3, "name": "Featured", "is_active": true}]),
            41,
        )],
    );
    let (api, _storage) = client(&server);

    let query = SearchQuery::new(4, 1, 20).with_default("name", Some(json!("Feat")));
    let result = api.search_rows(&query).await.unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].name, "Featured");
    assert_eq!(result.pagination.total_records, 41);
    let sent = &server.mock.requests_to("POST /rows/search")[0];
    assert_eq!(
        sent.body,
        json!({"gradeId": 4, "page": 1, "pageSize": 20, "name": "Feat"})
    );
}

#[tokio::test]
async fn test_backend_error_message_is_surfaced() {
    let server = spawn_backend().await;
    server.mock.on(
        "DELETE /rows/3",
        vec![Reply::error(StatusCode::BAD_REQUEST, "Row has bundles")],
    );
    let (api, _storage) = client(&server);

    let err = api.delete_row(3).await.unwrap_err();
    assert_matches!(err, ClientError::Api { status: 400, .. });
    assert_eq!(err.user_message("Failed to delete row"), "Row has bundles");
}

#[tokio::test]
async fn test_missing_data_on_required_fetch() {
    let server = spawn_backend().await;
    server.mock.on("GET /auth/me", vec![Reply::ok()]);
    let (api, _storage) = client(&server);

    assert_matches!(api.me().await, Err(ClientError::MissingData));
}

// ---------------------------------------------------------------------------
// Vouchers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_voucher_search_reads_nested_page() {
    let server = spawn_backend().await;
    server.mock.on(
        "POST /vouchers/search",
        vec![Reply::data(json!({
            "vouchers": [{
                "id": "6b1f2a52-56a4-4f44-9d5c-2f0f1c1c0a01",
                "code": "ABC-123",
                "bundle_id": "0d0c8f3e-7b6a-4b53-8f1e-6a3f0c2b9d10",
                "is_active": true,
                "used_at": "2024-01-01T00:00:00Z"
            }],
            "pagination": {"currentPage": 2, "pageSize": 20, "totalRecords": 21, "totalPages": 2}
        }))],
    );
    let (api, _storage) = client(&server);

    let result = api
        .search_vouchers(&SearchQuery::new(4, 2, 20))
        .await
        .unwrap();
    assert_eq!(result.items[0].status(), VoucherStatus::Used);
    assert_eq!(result.pagination.current_page, 2);
    assert_eq!(result.pagination.total_pages, 2);
}

#[tokio::test]
async fn test_voucher_stats_by_source() {
    let server = spawn_backend().await;
    server.mock.on(
        "GET /vouchers/stats/grade/4",
        vec![Reply::data(json!({
            "total_vouchers": 10,
            "available_vouchers": 6,
            "used_vouchers": 3
        }))],
    );
    let (api, _storage) = client(&server);

    let stats = api.voucher_stats(StatsSource::Grade(4)).await.unwrap();
    assert_eq!((stats.total, stats.available, stats.used, stats.inactive), (10, 6, 3, 0));

    let none = api.voucher_stats(StatsSource::None).await.unwrap();
    assert_eq!(none.total, 0);
    assert_eq!(server.mock.requests().len(), 1);
}

#[tokio::test]
async fn test_voucher_set_active_uses_query_flag() {
    let server = spawn_backend().await;
    let id = "6b1f2a52-56a4-4f44-9d5c-2f0f1c1c0a01";
    server
        .mock
        .on(&format!("PATCH /vouchers/{id}/set-active"), vec![Reply::ok()]);
    let (api, _storage) = client(&server);

    api.set_voucher_active(id.parse().unwrap(), false)
        .await
        .unwrap();
    let sent = &server.mock.requests()[0];
    assert_eq!(sent.query.as_deref(), Some("isActive=false"));
}
