use axum::extract::{Query, State};
use axum::http::{header, Uri};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{error, info};

use crate::cache::RenderedFeed;
use crate::errors::ApiError;
use crate::feed::{self, FeedFormat};
use crate::oauth::Credentials;
use crate::state::AppState;
use crate::twitter::{self, ListId, TwitterClient};

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
    access_token_key: Option<String>,
    access_token_secret: Option<String>,
    list: Option<String>,
    retweets: Option<bool>,
}

impl FeedParams {
    fn credentials(&self) -> Result<Credentials, ApiError> {
        Ok(Credentials {
            consumer_key: require(&self.consumer_key, "consumer_key")?,
            consumer_secret: require(&self.consumer_secret, "consumer_secret")?,
            access_token_key: require(&self.access_token_key, "access_token_key")?,
            access_token_secret: require(&self.access_token_secret, "access_token_secret")?,
        })
    }
}

fn require(value: &Option<String>, name: &'static str) -> Result<String, ApiError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingParam(name))
}

/// Proxies the Atom feed for the user's stream or a named list.
pub async fn atom(
    State(state): State<AppState>,
    uri: Uri,
    Query(params): Query<FeedParams>,
) -> Response {
    serve_feed(state, uri, params, FeedFormat::Atom).await
}

/// The same feed as a microformats HTML fragment.
pub async fn html(
    State(state): State<AppState>,
    uri: Uri,
    Query(params): Query<FeedParams>,
) -> Response {
    serve_feed(state, uri, params, FeedFormat::Html).await
}

async fn serve_feed(state: AppState, uri: Uri, params: FeedParams, format: FeedFormat) -> Response {
    match build_response(&state, &uri, &params, format).await {
        Ok(feed) => ([(header::CONTENT_TYPE, feed.content_type)], feed.body).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn build_response(
    state: &AppState,
    uri: &Uri,
    params: &FeedParams,
    format: FeedFormat,
) -> Result<RenderedFeed, ApiError> {
    // Blacklist before anything else: blocked lists get a 429 whatever
    // credentials came along.
    let list = match params.list.as_deref().filter(|l| !l.is_empty()) {
        Some(raw) => {
            let list = ListId::parse(raw)?;
            if list.is_blacklisted() {
                return Err(ApiError::RateLimited(format!(
                    "list {list} is permanently blocked"
                )));
            }
            Some(list)
        }
        None => None,
    };

    // Feeds from before consumer credentials were user-supplied: point the
    // reader at the new URL format instead of calling upstream.
    let has_consumer = [&params.consumer_key, &params.consumer_secret]
        .iter()
        .any(|v| v.as_deref().is_some_and(|v| !v.is_empty()));
    if !has_consumer {
        info!("legacy feed URL with no consumer credentials");
        return Ok(RenderedFeed {
            content_type: FeedFormat::Atom.content_type(),
            body: feed::welcome_back_feed(&state.base_url()),
        });
    }

    let creds = params.credentials()?;
    let retweets = params.retweets.unwrap_or(true);

    let key = cache_key(format, &creds, list.as_ref(), retweets);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(cached);
    }

    let request_url = format!("{}{}", state.base_url(), uri);
    let fetch = fetch_and_render(state, &creds, list.as_ref(), retweets, format, &request_url);
    let rendered = match timeout(state.request_deadline, fetch).await {
        Ok(result) => result?,
        Err(_) => {
            error!(
                list = %list.map(|l| l.to_string()).unwrap_or_default(),
                "request deadline exceeded while fetching from twitter"
            );
            return Err(ApiError::DeadlineExceeded);
        }
    };

    state.cache.insert(key, rendered.clone());
    Ok(rendered)
}

async fn fetch_and_render(
    state: &AppState,
    creds: &Credentials,
    list: Option<&ListId>,
    retweets: bool,
    format: FeedFormat,
    request_url: &str,
) -> Result<RenderedFeed, ApiError> {
    let client = TwitterClient::new(state.http.clone(), &state.twitter_base);
    let base_url = state.base_url();

    let (actor, activities, title) =
        match twitter::fetch_feed_source(&client, creds, list, retweets).await {
            Ok((actor, activities)) => {
                let subject = match list {
                    Some(list) => list.to_string(),
                    None => actor.name().to_string(),
                };
                let title = format!("{} feed for {}", feed::SERVICE_NAME, subject);
                (Some(actor), activities, title)
            }
            // Expired credentials become a normal feed with a fix-it entry,
            // so readers don't surface a hard fetch failure.
            Err(ApiError::AuthExpired) => {
                info!("twitter rejected the credentials, serving re-auth prompt feed");
                let title = format!("{} feed", feed::SERVICE_NAME);
                (None, vec![feed::reauth_activity(&base_url)], title)
            }
            Err(err) => return Err(err),
        };

    let body = match format {
        FeedFormat::Atom => {
            feed::render_atom(&activities, actor.as_ref(), &title, &base_url, request_url)
        }
        FeedFormat::Html => feed::render_html(&activities),
    };

    Ok(RenderedFeed {
        content_type: format.content_type(),
        body,
    })
}

/// Every input that affects the rendered bytes participates in the key; two
/// users with identical-looking queries but different credentials must never
/// share an entry.
fn cache_key(
    format: FeedFormat,
    creds: &Credentials,
    list: Option<&ListId>,
    retweets: bool,
) -> String {
    format!(
        "{:?}\n{}\n{}\n{}\n{}\n{}\n{}",
        format,
        creds.consumer_key,
        creds.consumer_secret,
        creds.access_token_key,
        creds.access_token_secret,
        list.map(|l| l.to_string()).unwrap_or_default(),
        retweets,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            access_token_key: "atk".to_string(),
            access_token_secret: "ats".to_string(),
        }
    }

    #[test]
    fn missing_access_token_is_rejected() {
        let params = FeedParams {
            consumer_key: Some("ck".to_string()),
            consumer_secret: Some("cs".to_string()),
            ..FeedParams::default()
        };
        assert!(matches!(
            params.credentials(),
            Err(ApiError::MissingParam("access_token_key"))
        ));
    }

    #[test]
    fn empty_parameters_count_as_missing() {
        let params = FeedParams {
            consumer_key: Some(String::new()),
            ..FeedParams::default()
        };
        assert!(matches!(
            params.credentials(),
            Err(ApiError::MissingParam("consumer_key"))
        ));
    }

    #[test]
    fn cache_keys_cover_every_output_affecting_input() {
        let base = cache_key(FeedFormat::Atom, &creds(), None, true);

        let mut other_creds = creds();
        other_creds.access_token_key = "different".to_string();
        assert_ne!(base, cache_key(FeedFormat::Atom, &other_creds, None, true));

        let list = ListId::parse("snarfed/birds").unwrap();
        assert_ne!(base, cache_key(FeedFormat::Atom, &creds(), Some(&list), true));
        assert_ne!(base, cache_key(FeedFormat::Atom, &creds(), None, false));
        assert_ne!(base, cache_key(FeedFormat::Html, &creds(), None, true));
    }
}
