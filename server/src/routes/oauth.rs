use axum::extract::{Form, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use maud::html;
use serde::Deserialize;
use tracing::info;

use crate::components::layout::{Card, Page};
use crate::errors::ApiError;
use crate::oauth::{self, store::StoredRequestToken, AccessToken};
use crate::state::AppState;
use crate::twitter::ListId;

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
    list: Option<String>,
}

/// Start the three-legged handshake: obtain a request token and bounce the
/// browser to Twitter's authorization page.
pub async fn generate(
    State(state): State<AppState>,
    Form(params): Form<GenerateParams>,
) -> Result<Response, ApiError> {
    let consumer_key = required(params.consumer_key, "consumer_key")?;
    let consumer_secret = required(params.consumer_secret, "consumer_secret")?;

    // Validate the list before burning an upstream round trip on it.
    let list = match params.list.as_deref().filter(|l| !l.is_empty()) {
        Some(raw) => Some(ListId::parse(raw)?),
        None => None,
    };
    let list = list.as_ref().map(ListId::to_string);

    let callback_url = state.oauth_callback_url(list.as_deref());
    let request_token = oauth::get_request_token(
        &state.http,
        &state.twitter_base,
        &consumer_key,
        &consumer_secret,
        &callback_url,
    )
    .await?;

    state.request_tokens.insert(
        request_token.key.clone(),
        StoredRequestToken {
            token_secret: request_token.secret,
            consumer_key,
            consumer_secret,
        },
    );

    let auth_url = oauth::authorize_url(&state.twitter_base, &request_token.key);
    info!("generated request token, redirecting to {auth_url}");
    Ok(Redirect::to(&auth_url).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    oauth_token: Option<String>,
    oauth_verifier: Option<String>,
    list: Option<String>,
}

/// The OAuth callback: trade the verifier for an access token and show the
/// generated feed URL.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let oauth_token = required(params.oauth_token, "oauth_token")?;

    // No verifier means the user hit "cancel" on the authorization page.
    let Some(verifier) = params.oauth_verifier.filter(|v| !v.is_empty()) else {
        info!("authorization declined, returning to the front page");
        return Ok(Redirect::to("/").into_response());
    };

    let stored = state
        .request_tokens
        .take(&oauth_token)
        .ok_or(ApiError::UnknownRequestToken)?;

    let access = oauth::get_access_token(
        &state.http,
        &state.twitter_base,
        &stored.consumer_key,
        &stored.consumer_secret,
        &oauth_token,
        &stored.token_secret,
        &verifier,
    )
    .await?;

    let feed_url = feed_url(&state, &stored, &access, params.list.as_deref());
    info!("generated feed URL: {feed_url}");

    Ok(generated_page(&feed_url).into_response())
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingParam(name))
}

/// The generated feed URL embeds all four credential fields as plain query
/// parameters; nothing is kept server-side once this page is rendered.
fn feed_url(
    state: &AppState,
    stored: &StoredRequestToken,
    access: &AccessToken,
    list: Option<&str>,
) -> String {
    let mut pairs = vec![
        ("consumer_key", stored.consumer_key.as_str()),
        ("consumer_secret", stored.consumer_secret.as_str()),
        ("access_token_key", access.key.as_str()),
        ("access_token_secret", access.secret.as_str()),
    ];
    if let Some(list) = list.filter(|l| !l.is_empty()) {
        pairs.push(("list", list));
    }
    let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
    format!("{}/atom?{}", state.base_url(), query)
}

fn generated_page(feed_url: &str) -> Page {
    let content = html! {
        h1 class="text-2xl font-semibold text-sky-800" { "Your feed is ready" }
        p class="text-gray-600 mt-2 mb-4" {
            "Subscribe to this URL in your feed reader. It embeds your "
            "credentials, so treat it like a password."
        }

        input type="text" readonly value=(feed_url) onclick="this.select()"
            class="w-full border rounded-md px-3 py-2 text-sm font-mono bg-gray-50";

        p class="text-xs text-gray-500 mt-4" {
            a href=(feed_url) class="text-sky-600 hover:underline" { "Open the feed" }
            " · "
            a href="/" class="text-sky-600 hover:underline" { "Generate another" }
        }
    };

    Page::new(
        "Feed generated - twitter-atom".to_string(),
        Box::new(Card::new(content)),
    )
}
