//! Fake Twitter API: the OAuth handshake endpoints plus the three REST
//! endpoints twitter-atom reads, with canned data and trigger tokens.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;

/// Access token key that makes every API call fail with 401.
pub const EXPIRED_TOKEN: &str = "expired";
/// Access token key that makes timeline fetches hang long enough to trip
/// short request deadlines.
pub const SLOW_TOKEN: &str = "slow";

pub const REQUEST_TOKEN_KEY: &str = "fixture-request-token";
pub const REQUEST_TOKEN_SECRET: &str = "fixture-request-secret";
pub const ACCESS_TOKEN_KEY: &str = "fixture-access-token";
pub const ACCESS_TOKEN_SECRET: &str = "fixture-access-secret";
pub const SCREEN_NAME: &str = "fixture_user";

// Server state to hold the fetch counter used by cache tests
#[derive(Clone, Default)]
struct TwitterState {
    timeline_requests: Arc<AtomicUsize>,
}

/// The fake Twitter API as a mountable router.
pub fn twitter_router() -> Router {
    Router::new()
        // OAuth handshake endpoints
        .route("/oauth/request_token", post(request_token))
        .route("/oauth/authorize", get(authorize))
        .route("/oauth/access_token", post(access_token))
        // REST endpoints
        .route(
            "/1.1/account/verify_credentials.json",
            get(verify_credentials),
        )
        .route("/1.1/statuses/home_timeline.json", get(home_timeline))
        .route("/1.1/lists/statuses.json", get(list_statuses))
        // Test instrumentation
        .route("/_fixture/timeline_requests", get(timeline_requests))
        .with_state(TwitterState::default())
}

// Handler implementations

async fn request_token() -> impl IntoResponse {
    form_body(format!(
        "oauth_token={REQUEST_TOKEN_KEY}&oauth_token_secret={REQUEST_TOKEN_SECRET}&oauth_callback_confirmed=true"
    ))
}

async fn authorize(Query(params): Query<HashMap<String, String>>) -> Html<String> {
    let token = params.get("oauth_token").cloned().unwrap_or_default();
    Html(format!(
        "<html><body><p>Authorize request token {token}?</p></body></html>"
    ))
}

async fn access_token(headers: HeaderMap) -> Response {
    if authorized_token(&headers).as_deref() != Some(REQUEST_TOKEN_KEY) {
        return (StatusCode::UNAUTHORIZED, "invalid request token").into_response();
    }
    form_body(format!(
        "oauth_token={ACCESS_TOKEN_KEY}&oauth_token_secret={ACCESS_TOKEN_SECRET}&screen_name={SCREEN_NAME}&user_id=1001"
    ))
    .into_response()
}

async fn verify_credentials(headers: HeaderMap) -> Response {
    if authorized_token(&headers).as_deref() == Some(EXPIRED_TOKEN) {
        return unauthorized();
    }
    Json(fixture_user()).into_response()
}

async fn home_timeline(
    State(state): State<TwitterState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match authorized_token(&headers).as_deref() {
        Some(EXPIRED_TOKEN) => return unauthorized(),
        Some(SLOW_TOKEN) => tokio::time::sleep(Duration::from_secs(5)).await,
        _ => {}
    }
    state.timeline_requests.fetch_add(1, Ordering::SeqCst);

    let include_rts = params.get("include_rts").map(String::as_str) != Some("false");

    // Deliberately oldest-first: the proxy is expected to re-sort.
    let mut tweets = vec![first_post()];
    if include_rts {
        tweets.push(retweet_post());
    }
    Json(Value::Array(tweets)).into_response()
}

async fn list_statuses(
    State(state): State<TwitterState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match authorized_token(&headers).as_deref() {
        Some(EXPIRED_TOKEN) => return unauthorized(),
        Some(SLOW_TOKEN) => tokio::time::sleep(Duration::from_secs(5)).await,
        _ => {}
    }

    let (Some(owner), Some(slug)) = (params.get("owner_screen_name"), params.get("slug")) else {
        return (StatusCode::BAD_REQUEST, "owner_screen_name and slug required").into_response();
    };
    state.timeline_requests.fetch_add(1, Ordering::SeqCst);
    info!("serving list {owner}/{slug}");

    Json(json!([{
        "id_str": "900",
        "created_at": "Wed Jul 10 09:00:00 +0000 2013",
        "text": format!("hello from {owner}/{slug}"),
        "user": {
            "id_str": "2002",
            "screen_name": "list_member",
            "name": "List Member"
        }
    }]))
    .into_response()
}

async fn timeline_requests(State(state): State<TwitterState>) -> Json<Value> {
    Json(json!({"count": state.timeline_requests.load(Ordering::SeqCst)}))
}

// Canned data

fn fixture_user() -> Value {
    json!({
        "id_str": "1001",
        "screen_name": SCREEN_NAME,
        "name": "Fixture User",
        "description": "Test user served by the twitter fixture",
        "profile_image_url_https": "https://pbs.example.com/fixture.jpg"
    })
}

fn first_post() -> Value {
    json!({
        "id_str": "600",
        "created_at": "Mon Jul 08 20:00:00 +0000 2013",
        "text": "first post with a link https://t.co/abc",
        "user": fixture_user(),
        "entities": {
            "urls": [{
                "url": "https://t.co/abc",
                "expanded_url": "https://example.com/first",
                "display_url": "example.com/first"
            }]
        }
    })
}

fn retweet_post() -> Value {
    json!({
        "id_str": "700",
        "created_at": "Tue Jul 09 12:00:00 +0000 2013",
        "text": "RT @other_user: the original post in…",
        "user": fixture_user(),
        "retweeted_status": {
            "id_str": "650",
            "created_at": "Tue Jul 09 11:00:00 +0000 2013",
            "text": "the original post in full",
            "user": {
                "id_str": "3003",
                "screen_name": "other_user",
                "name": "Other User"
            }
        }
    })
}

// Helpers

/// Pull `oauth_token="…"` out of an OAuth1 Authorization header.
fn authorized_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let marker = "oauth_token=\"";
    let start = auth.find(marker)? + marker.len();
    let rest = &auth[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "invalid or expired access token").into_response()
}

fn form_body(body: String) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/x-www-form-urlencoded")],
        body,
    )
}
