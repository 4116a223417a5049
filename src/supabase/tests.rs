use super::auth::{AuthChange, AuthEvent, MemorySessionStore, SessionStore, SignUpOutcome};
use super::query::TableQuery;
use super::storage::FileUpload;
use super::*;
use crate::error::AppErrorStatus;
use crate::request::{MockHttpClient, ReqwestHttpClient};
use serde_json::json;
use std::cell::RefCell;

// =========================================================
// 辅助函数（服务层测试共用）
// =========================================================

pub(crate) const BASE_URL: &str = "http://sb.test";
pub(crate) const ANON_KEY: &str = "anon-key";

pub(crate) fn backend_config() -> BackendConfig {
    BackendConfig {
        url: BASE_URL.to_string(),
        anon_key: ANON_KEY.to_string(),
    }
}

pub(crate) fn rest_url(path: &str) -> String {
    format!("{}{}", BASE_URL, path)
}

pub(crate) fn session_json(user_id: &str) -> serde_json::Value {
    json!({
        "access_token": format!("token-{}", user_id),
        "refresh_token": format!("refresh-{}", user_id),
        "expires_at": 1_900_000_000,
        "user": {
            "id": user_id,
            "email": format!("{}@example.com", user_id),
            "user_metadata": { "full_name": "Jane Doe" }
        }
    })
}

pub(crate) fn anonymous_client() -> SupabaseClient<MockHttpClient> {
    SupabaseClient::new(
        MockHttpClient::new(),
        backend_config(),
        Rc::new(MemorySessionStore::default()),
    )
}

/// 已从存储恢复会话的客户端
pub(crate) fn signed_in_client(user_id: &str) -> SupabaseClient<MockHttpClient> {
    let store = MemorySessionStore::with_value(&session_json(user_id).to_string());
    let client = SupabaseClient::new(MockHttpClient::new(), backend_config(), Rc::new(store));
    client.auth().restore();
    client
}

/// 存储中的会话早已过期（expires_at = 1000）
pub(crate) fn expired_client(user_id: &str) -> SupabaseClient<MockHttpClient> {
    let mut session = session_json(user_id);
    session["expires_at"] = json!(1000);
    let store = MemorySessionStore::with_value(&session.to_string());
    SupabaseClient::new(MockHttpClient::new(), backend_config(), Rc::new(store))
}

fn record_changes(client: &SupabaseClient<MockHttpClient>) -> (Rc<RefCell<Vec<AuthChange>>>, auth::AuthSubscription) {
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    let sub = client
        .auth()
        .subscribe(move |change| sink.borrow_mut().push(*change));
    (changes, sub)
}

// =========================================================
// 请求构造与错误映射
// =========================================================

#[test]
fn test_request_uses_anon_key_without_session() {
    let client = anonymous_client();
    let req = client.request(HttpMethod::Get, "/rest/v1/profiles");

    assert_eq!(req.url, "http://sb.test/rest/v1/profiles");
    assert_eq!(req.header("apikey"), Some(ANON_KEY));
    assert_eq!(req.header("Authorization"), Some("Bearer anon-key"));
}

#[test]
fn test_request_uses_access_token_with_session() {
    let client = signed_in_client("u1");
    let req = client.request(HttpMethod::Get, "/rest/v1/profiles");

    assert_eq!(req.header("apikey"), Some(ANON_KEY));
    assert_eq!(req.header("Authorization"), Some("Bearer token-u1"));
}

#[test]
fn test_error_message_extraction() {
    assert_eq!(error_message(r#"{"msg":"Invalid login credentials"}"#), "Invalid login credentials");
    assert_eq!(error_message(r#"{"message":"duplicate key"}"#), "duplicate key");
    assert_eq!(
        error_message(r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#),
        "Email not confirmed"
    );
    assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    assert_eq!(error_message("  "), "Request failed");
}

#[tokio::test]
async fn test_execute_maps_status_and_adds_span() {
    let client = anonymous_client();
    client.http().mock_response(
        HttpMethod::Get,
        &rest_url("/rest/v1/reports"),
        401,
        json!({"message": "JWT expired"}),
    );

    let err = client
        .select::<serde_json::Value>(&TableQuery::new("reports"))
        .await
        .unwrap_err();

    assert_eq!(err.status, AppErrorStatus::Unauthorized);
    assert_eq!(err.message(), "JWT expired");
    assert_eq!(err.spans()[0].operation, "rest.select");
}

#[tokio::test]
async fn test_select_one_first_row_or_none() {
    let client = signed_in_client("u1");
    let query = TableQuery::new("profiles").select("*").eq("id", "u1");
    let url = rest_url(&query.path());

    client
        .http()
        .mock_response(HttpMethod::Get, &url, 200, json!([{"id": "u1"}, {"id": "u2"}]));
    client.http().mock_response(HttpMethod::Get, &url, 200, json!([]));

    let first: Option<serde_json::Value> = client.select_one(&query).await.unwrap();
    assert_eq!(first.unwrap()["id"], "u1");

    let none: Option<serde_json::Value> = client.select_one(&query).await.unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_insert_requests_representation() {
    let client = signed_in_client("u1");
    let url = rest_url("/rest/v1/chat_history");
    client
        .http()
        .mock_response(HttpMethod::Post, &url, 201, json!([{"id": 1}]));

    let rows: Vec<serde_json::Value> = client
        .insert("chat_history", &json!({"message": "hi"}))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let sent = client.http().requests_to(HttpMethod::Post, &url);
    assert_eq!(sent[0].2.get("Prefer").unwrap(), "return=representation");
    assert_eq!(sent[0].3.as_deref(), Some(r#"{"message":"hi"}"#));
}

#[tokio::test]
async fn test_upsert_merges_on_conflict() {
    let client = signed_in_client("u1");
    let url = rest_url("/rest/v1/health_metrics?on_conflict=user_id,date");
    client.http().mock_raw(HttpMethod::Post, &url, 201, "");

    client
        .upsert("health_metrics", "user_id,date", &json!([{"steps": 1}]))
        .await
        .unwrap();

    let sent = client.http().requests_to(HttpMethod::Post, &url);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].2.get("Prefer").unwrap().starts_with("resolution=merge-duplicates"));
}

#[test]
fn test_require_user_id() {
    let err = anonymous_client().require_user_id("chat.send").unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(signed_in_client("u9").require_user_id("x").unwrap(), "u9");
}

// =========================================================
// 认证
// =========================================================

#[tokio::test]
async fn test_sign_in_persists_session_and_notifies() {
    let store = Rc::new(MemorySessionStore::default());
    let client = SupabaseClient::new(MockHttpClient::new(), backend_config(), store.clone());
    let (changes, _sub) = record_changes(&client);

    let url = rest_url("/auth/v1/token?grant_type=password");
    client
        .http()
        .mock_response(HttpMethod::Post, &url, 200, session_json("u1"));

    let session = client
        .auth()
        .sign_in_with_password(" u1@example.com ", "secret1")
        .await
        .unwrap();

    assert_eq!(session.user.id, "u1");
    assert_eq!(session.user.full_name(), Some("Jane Doe"));
    assert!(client.auth().is_signed_in());
    assert!(store.load().unwrap().contains("token-u1"));
    assert_eq!(
        changes.borrow().as_slice(),
        &[AuthChange { event: AuthEvent::SignedIn, has_session: true }]
    );

    let sent = client.http().requests_to(HttpMethod::Post, &url);
    let body: serde_json::Value = serde_json::from_str(sent[0].3.as_deref().unwrap()).unwrap();
    assert_eq!(body["email"], "u1@example.com");
}

#[tokio::test]
async fn test_sign_in_email_not_confirmed() {
    let client = anonymous_client();
    client.http().mock_response(
        HttpMethod::Post,
        &rest_url("/auth/v1/token?grant_type=password"),
        400,
        json!({"error": "invalid_grant", "error_description": "Email not confirmed"}),
    );

    let err = client
        .auth()
        .sign_in_with_password("a@b.c", "secret1")
        .await
        .unwrap_err();

    assert_eq!(err.status, AppErrorStatus::EmailNotConfirmed);
    assert!(err.user_message().contains("verify your email"));
    assert!(!client.auth().is_signed_in());
}

#[tokio::test]
async fn test_sign_in_rejects_empty_fields_without_request() {
    let client = anonymous_client();
    let err = client.auth().sign_in_with_password("  ", "x").await.unwrap_err();

    assert_eq!(err.status, AppErrorStatus::InvalidInput);
    assert!(client.http().requests.borrow().is_empty());
}

#[tokio::test]
async fn test_sign_up_pending_confirmation() {
    let client = anonymous_client();
    let url = rest_url("/auth/v1/signup");
    client.http().mock_response(
        HttpMethod::Post,
        &url,
        200,
        json!({"id": "u2", "email": "new@example.com", "confirmation_sent_at": "2024-01-01T00:00:00Z"}),
    );

    let outcome = client
        .auth()
        .sign_up("New User", "new@example.com", "secret1")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SignUpOutcome::PendingConfirmation { email: "new@example.com".to_string() }
    );
    assert!(!client.auth().is_signed_in());

    let sent = client.http().requests_to(HttpMethod::Post, &url);
    let body: serde_json::Value = serde_json::from_str(sent[0].3.as_deref().unwrap()).unwrap();
    assert_eq!(body["data"]["full_name"], "New User");
}

#[tokio::test]
async fn test_sign_up_with_active_session() {
    let client = anonymous_client();
    client.http().mock_response(
        HttpMethod::Post,
        &rest_url("/auth/v1/signup"),
        200,
        session_json("u3"),
    );

    let outcome = client.auth().sign_up("A", "u3@example.com", "secret1").await.unwrap();

    assert!(matches!(outcome, SignUpOutcome::Active(ref s) if s.user.id == "u3"));
    assert_eq!(client.current_user_id().as_deref(), Some("u3"));
}

#[tokio::test]
async fn test_sign_up_short_password_rejected() {
    let client = anonymous_client();
    let err = client.auth().sign_up("A", "a@b.c", "123").await.unwrap_err();
    assert_eq!(err.status, AppErrorStatus::InvalidInput);
    assert!(client.http().requests.borrow().is_empty());
}

#[tokio::test]
async fn test_sign_out_clears_even_if_remote_fails() {
    let store = Rc::new(MemorySessionStore::with_value(&session_json("u1").to_string()));
    let client = SupabaseClient::new(MockHttpClient::new(), backend_config(), store.clone());
    client.auth().restore();
    let (changes, _sub) = record_changes(&client);

    client
        .http()
        .mock_response(HttpMethod::Post, &rest_url("/auth/v1/logout"), 500, json!({"message": "down"}));

    client.auth().sign_out().await;

    assert!(!client.auth().is_signed_in());
    assert!(store.load().is_none());
    assert_eq!(changes.borrow().last().unwrap().event, AuthEvent::SignedOut);
}

#[test]
fn test_session_expiry_window() {
    let session: auth::Session = serde_json::from_value(session_json("u1")).unwrap();

    assert!(!session.expires_within(1_800_000_000, auth::REFRESH_MARGIN_SECS));
    assert!(session.expires_within(1_899_999_800, auth::REFRESH_MARGIN_SECS));
    assert!(session.expires_within(1_900_000_100, auth::REFRESH_MARGIN_SECS));

    let no_expiry = auth::Session {
        expires_at: None,
        ..session
    };
    assert!(!no_expiry.expires_within(i64::MAX, 0));
}

#[tokio::test]
async fn test_refresh_failure_clears_session() {
    let client = signed_in_client("u1");
    let (changes, _sub) = record_changes(&client);
    client.http().mock_response(
        HttpMethod::Post,
        &rest_url("/auth/v1/token?grant_type=refresh_token"),
        400,
        json!({"error_description": "Invalid Refresh Token"}),
    );

    let err = client.auth().refresh_session().await.unwrap_err();

    assert_eq!(err.status, AppErrorStatus::InvalidInput);
    assert!(!client.auth().is_signed_in());
    assert_eq!(
        changes.borrow().as_slice(),
        &[AuthChange { event: AuthEvent::SignedOut, has_session: false }]
    );
}

#[tokio::test]
async fn test_refresh_success_replaces_token() {
    let client = signed_in_client("u1");
    let mut fresh = session_json("u1");
    fresh["access_token"] = json!("token-new");
    client.http().mock_response(
        HttpMethod::Post,
        &rest_url("/auth/v1/token?grant_type=refresh_token"),
        200,
        fresh,
    );

    let session = client.auth().refresh_session().await.unwrap();

    assert_eq!(session.access_token, "token-new");
    let req = client.request(HttpMethod::Get, "/rest/v1/profiles");
    assert_eq!(req.header("Authorization"), Some("Bearer token-new"));
}

#[test]
fn test_restore_emits_initial_session() {
    let store = Rc::new(MemorySessionStore::with_value(&session_json("u1").to_string()));
    let client = SupabaseClient::new(MockHttpClient::new(), backend_config(), store);
    let (changes, _sub) = record_changes(&client);

    let restored = client.auth().restore();

    assert_eq!(restored.unwrap().user.id, "u1");
    assert_eq!(
        changes.borrow().as_slice(),
        &[AuthChange { event: AuthEvent::InitialSession, has_session: true }]
    );
}

#[test]
fn test_restore_discards_unreadable_session() {
    let store = Rc::new(MemorySessionStore::with_value("{not json"));
    let client = SupabaseClient::new(MockHttpClient::new(), backend_config(), store.clone());
    let (changes, _sub) = record_changes(&client);

    assert!(client.auth().restore().is_none());
    assert!(store.load().is_none());
    assert!(!changes.borrow()[0].has_session);
}

#[test]
fn test_adopt_external_session() {
    let client = anonymous_client();
    let (changes, _sub) = record_changes(&client);

    client
        .auth()
        .adopt_external(Some(&session_json("u5").to_string()));
    assert_eq!(client.current_user_id().as_deref(), Some("u5"));

    client.auth().adopt_external(None);
    assert!(client.current_user_id().is_none());

    let events: Vec<(AuthEvent, bool)> = changes
        .borrow()
        .iter()
        .map(|c| (c.event, c.has_session))
        .collect();
    assert_eq!(events, vec![(AuthEvent::External, true), (AuthEvent::External, false)]);
}

#[test]
fn test_subscription_drop_unsubscribes() {
    let client = anonymous_client();
    let (changes, sub) = record_changes(&client);
    assert_eq!(client.auth_state().listener_count(), 1);

    drop(sub);
    assert_eq!(client.auth_state().listener_count(), 0);

    client.auth().adopt_external(None);
    assert!(changes.borrow().is_empty());
}

#[tokio::test]
async fn test_update_password_validation() {
    let client = signed_in_client("u1");

    let short = client.auth().update_password("abc", "abc").await.unwrap_err();
    assert!(short.message().contains("at least 6"));

    let mismatch = client
        .auth()
        .update_password("secret1", "secret2")
        .await
        .unwrap_err();
    assert_eq!(mismatch.message(), "Passwords do not match");

    assert!(client.http().requests.borrow().is_empty());
}

#[tokio::test]
async fn test_update_password_sends_put() {
    let client = signed_in_client("u1");
    let url = rest_url("/auth/v1/user");
    client.http().mock_response(
        HttpMethod::Put,
        &url,
        200,
        json!({"id": "u1", "email": "u1@example.com"}),
    );

    client
        .auth()
        .update_password("secret1", "secret1")
        .await
        .unwrap();

    let sent = client.http().requests_to(HttpMethod::Put, &url);
    assert_eq!(sent[0].3.as_deref(), Some(r#"{"password":"secret1"}"#));
    assert!(client.auth().is_signed_in());
}

// =========================================================
// 存储
// =========================================================

#[tokio::test]
async fn test_upload_encodes_path_and_content_type() {
    let client = signed_in_client("u1");
    let url = rest_url("/storage/v1/object/reports/u1/lab%20result.png");
    client
        .http()
        .mock_response(HttpMethod::Post, &url, 200, json!({"Key": "reports/u1/lab result.png"}));

    let file = FileUpload::new("lab result.png", "image/png", vec![1, 2, 3]);
    let path = client
        .storage()
        .upload("reports", "u1/lab result.png", &file)
        .await
        .unwrap();

    assert_eq!(path, "u1/lab result.png");
    let sent = client.http().requests_to(HttpMethod::Post, &url);
    assert_eq!(sent[0].2.get("Content-Type").unwrap(), "image/png");
}

#[tokio::test]
async fn test_upload_rejects_empty_file() {
    let client = signed_in_client("u1");
    let file = FileUpload::new("a.png", "image/png", Vec::new());

    let err = client.storage().upload("avatars", "a.png", &file).await.unwrap_err();
    assert_eq!(err.status, AppErrorStatus::InvalidInput);
}

#[test]
fn test_public_url_and_extension() {
    let client = anonymous_client();
    assert_eq!(
        client.storage().public_url("avatars", "0.42.jpg"),
        "http://sb.test/storage/v1/object/public/avatars/0.42.jpg"
    );

    let file = FileUpload::new("scan.final.PDF", "application/pdf", vec![0]);
    assert_eq!(file.extension(), "PDF");
    assert!(!file.is_image());
}

#[test]
fn test_extension_falls_back_to_mime_type() {
    assert_eq!(FileUpload::new("scan", "application/pdf", vec![0]).extension(), "pdf");
    assert_eq!(FileUpload::new("photo.", "image/jpeg", vec![0]).extension(), "jpg");
    assert_eq!(FileUpload::new("blob", "application/octet-stream", vec![0]).extension(), "");

    assert_eq!(storage::file_name_with_extension("u1/17_abc", "pdf"), "u1/17_abc.pdf");
    assert_eq!(storage::file_name_with_extension("u1/17_abc", ""), "u1/17_abc");
}

// =========================================================
// 联调（需要真实后端，默认忽略）
// =========================================================

#[tokio::test]
#[ignore]
async fn test_live_sign_in() {
    let config = crate::config::AppConfig::from_lookup(|k| std::env::var(k).ok());
    let (Ok(email), Ok(password)) = (
        std::env::var("ROBTOR_TEST_EMAIL"),
        std::env::var("ROBTOR_TEST_PASSWORD"),
    ) else {
        return;
    };

    let client = SupabaseClient::new(
        ReqwestHttpClient::new(),
        config.backend,
        Rc::new(MemorySessionStore::default()),
    );
    let session = client
        .auth()
        .sign_in_with_password(&email, &password)
        .await
        .unwrap();
    assert!(!session.access_token.is_empty());

    let user = client.auth().get_user().await.unwrap();
    assert_eq!(user.id, session.user.id);
}
