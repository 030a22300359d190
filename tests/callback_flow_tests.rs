//! End-to-end callback handler scenarios: state validation, code exchange,
//! token persistence, and browser redirects.

mod test_utils;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use integrations::config::AppConfig;
use integrations::handlers::callback::{CallbackQuery, oauth_callback};
use integrations::handlers::connect::ProviderPath;
use integrations::server::AppState;
use serde_json::json;
use test_utils::test_state;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn google_state(mock_server: &MockServer) -> AppState {
    test_state(AppConfig {
        app_origin: Some("https://projects.example.com".to_string()),
        crypto_key: Some(vec![7u8; 32]),
        google_client_id: Some("test-client-id".to_string()),
        google_client_secret: Some("test-client-secret".to_string()),
        google_token_base: mock_server.uri(),
        ..AppConfig::default()
    })
    .await
    .unwrap()
}

async fn run_callback(state: &AppState, provider: &str, query: CallbackQuery) -> String {
    let response = oauth_callback(
        State(state.clone()),
        Path(ProviderPath {
            provider: provider.to_string(),
        }),
        Query(query),
    )
    .await
    .into_response();

    assert!(response.status().is_redirection());
    response
        .headers()
        .get("location")
        .expect("redirect has a location")
        .to_str()
        .unwrap()
        .to_string()
}

fn query(code: Option<&str>, state_token: Option<&str>) -> CallbackQuery {
    CallbackQuery {
        code: code.map(str::to_string),
        state: state_token.map(str::to_string),
        error: None,
        error_description: None,
    }
}

#[tokio::test]
async fn test_unknown_state_redirects_without_calling_exchange() {
    let mock_server = MockServer::start().await;

    // The token endpoint must never be hit for a forged/expired state
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let state = google_state(&mock_server).await;

    let location = run_callback(
        &state,
        "google-calendar",
        query(Some("some-code"), Some("never-issued-state")),
    )
    .await;

    assert!(location.starts_with("https://projects.example.com/integrations?"));
    assert!(
        location.contains("connect_error=Invalid+or+expired+state"),
        "location was: {location}"
    );
}

#[tokio::test]
async fn test_successful_callback_persists_tokens_and_redirects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("code_verifier=the-verifier"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = google_state(&mock_server).await;
    let user_id = Uuid::new_v4();

    state
        .pending_repo()
        .create(user_id, "google-calendar", "valid-state", "the-verifier", None, 10)
        .await
        .unwrap();

    let location = run_callback(
        &state,
        "google-calendar",
        query(Some("auth-code"), Some("valid-state")),
    )
    .await;

    assert_eq!(
        location,
        "https://projects.example.com/integrations?connected=google-calendar"
    );

    let stored = state
        .token_repo()
        .get(user_id, "google-calendar")
        .await
        .unwrap()
        .expect("tokens persisted");
    assert_eq!(stored.access_token, "new-access");
    assert_eq!(stored.refresh_token.as_deref(), Some("new-refresh"));
}

#[tokio::test]
async fn test_state_cannot_be_replayed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = google_state(&mock_server).await;

    state
        .pending_repo()
        .create(
            Uuid::new_v4(),
            "google-calendar",
            "one-shot-state",
            "verifier",
            None,
            10,
        )
        .await
        .unwrap();

    let first = run_callback(
        &state,
        "google-calendar",
        query(Some("auth-code"), Some("one-shot-state")),
    )
    .await;
    assert!(first.contains("connected=google-calendar"));

    // Browser back-navigation replays the same callback
    let second = run_callback(
        &state,
        "google-calendar",
        query(Some("auth-code"), Some("one-shot-state")),
    )
    .await;
    assert!(
        second.contains("connect_error=Invalid+or+expired+state"),
        "location was: {second}"
    );
}

#[tokio::test]
async fn test_provider_error_redirects_with_description() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let state = google_state(&mock_server).await;

    let location = run_callback(
        &state,
        "google-calendar",
        CallbackQuery {
            code: None,
            state: Some("any".to_string()),
            error: Some("access_denied".to_string()),
            error_description: Some("User declined consent".to_string()),
        },
    )
    .await;

    assert!(
        location.contains("connect_error=User+declined+consent"),
        "location was: {location}"
    );
}

#[tokio::test]
async fn test_missing_parameters_redirect_with_error() {
    let mock_server = MockServer::start().await;
    let state = google_state(&mock_server).await;

    let location = run_callback(&state, "google-calendar", query(Some("code-only"), None)).await;
    assert!(
        location.contains("connect_error=Missing+code+or+state+parameter"),
        "location was: {location}"
    );
}

#[tokio::test]
async fn test_exchange_failure_redirects_with_readable_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = google_state(&mock_server).await;

    state
        .pending_repo()
        .create(
            Uuid::new_v4(),
            "google-calendar",
            "doomed-state",
            "verifier",
            None,
            10,
        )
        .await
        .unwrap();

    let location = run_callback(
        &state,
        "google-calendar",
        query(Some("expired-code"), Some("doomed-state")),
    )
    .await;

    assert!(location.contains("connect_error="), "location was: {location}");
    assert!(location.contains("invalid_grant"), "location was: {location}");
}

#[tokio::test]
async fn test_return_path_is_honored_on_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "expires_in": 3600
        })))
        .mount(&mock_server)
        .await;

    let state = google_state(&mock_server).await;

    state
        .pending_repo()
        .create(
            Uuid::new_v4(),
            "google-calendar",
            "with-return-path",
            "verifier",
            Some("/projects/7".to_string()),
            10,
        )
        .await
        .unwrap();

    let location = run_callback(
        &state,
        "google-calendar",
        query(Some("auth-code"), Some("with-return-path")),
    )
    .await;

    assert_eq!(
        location,
        "https://projects.example.com/projects/7?connected=google-calendar"
    );
}

#[tokio::test]
async fn test_unknown_provider_redirects_with_error() {
    let mock_server = MockServer::start().await;
    let state = google_state(&mock_server).await;

    let location = run_callback(&state, "hubspot", query(Some("c"), Some("s"))).await;
    assert!(
        location.contains("connect_error=Unknown+provider"),
        "location was: {location}"
    );
}
