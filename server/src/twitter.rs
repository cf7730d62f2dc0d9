//! Upstream client adapter for the Twitter v1.1 REST API: signed GETs,
//! the handful of endpoints the proxy consumes, and list handling.

use std::fmt;
use std::sync::OnceLock;

use axum::http::StatusCode;
use oauth1_request as oauth;
use regex::Regex;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, info};

use crate::activity::{Activity, Actor};
use crate::errors::{truncate_body, ApiError};
use crate::oauth::Credentials;

/// Tweets fetched per timeline or list request.
pub const TWEET_COUNT: u32 = 50;

/// Lists that are permanently rejected: known abusive consumers that polled
/// hard enough to exhaust the shared upstream rate limit.
const BLACKLISTED_LISTS: &[&str] = &["tonysss13/financial"];

/// A named list, parsed from `owner/slug` (optional leading `@`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListId {
    pub owner: String,
    pub slug: String,
}

fn list_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@?([A-Za-z0-9_]+)/([A-Za-z0-9_-]+)$").expect("list pattern is valid")
    })
}

impl ListId {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let captures = list_pattern()
            .captures(raw)
            .ok_or_else(|| ApiError::InvalidList(raw.to_string()))?;
        Ok(Self {
            owner: captures[1].to_string(),
            slug: captures[2].to_string(),
        })
    }

    pub fn is_blacklisted(&self) -> bool {
        let id = self.to_string();
        BLACKLISTED_LISTS.contains(&id.as_str())
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

/// The slice of a Twitter user object the proxy consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterUser {
    pub id_str: String,
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub profile_image_url_https: Option<String>,
}

/// The slice of a tweet object the proxy consumes. `full_text` is set when
/// the request asked for extended tweets; `text` otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id_str: String,
    pub created_at: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub full_text: Option<String>,
    pub user: TwitterUser,
    #[serde(default)]
    pub retweeted_status: Option<Box<Tweet>>,
    #[serde(default)]
    pub entities: Option<Entities>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
}

/// A t.co wrapper and the link it stands for.
#[derive(Debug, Clone, Deserialize)]
pub struct UrlEntity {
    pub url: String,
    #[serde(default)]
    pub expanded_url: Option<String>,
    #[serde(default)]
    pub display_url: Option<String>,
}

#[derive(oauth::Request)]
struct TimelineParams {
    count: u32,
    include_rts: bool,
}

#[derive(oauth::Request)]
struct ListStatusesParams<'a> {
    count: u32,
    include_rts: bool,
    owner_screen_name: &'a str,
    slug: &'a str,
}

/// Wraps outbound Twitter API calls with the caller's OAuth1 credentials
/// attached, and translates non-2xx responses into typed failures.
#[derive(Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    base: String,
}

impl TwitterClient {
    pub fn new(http: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into(),
        }
    }

    pub async fn verify_credentials(&self, creds: &Credentials) -> Result<TwitterUser, ApiError> {
        self.signed_get("/1.1/account/verify_credentials.json", &(), creds)
            .await
    }

    pub async fn home_timeline(
        &self,
        creds: &Credentials,
        count: u32,
        include_rts: bool,
    ) -> Result<Vec<Tweet>, ApiError> {
        let params = TimelineParams { count, include_rts };
        self.signed_get("/1.1/statuses/home_timeline.json", &params, creds)
            .await
    }

    pub async fn list_statuses(
        &self,
        creds: &Credentials,
        list: &ListId,
        count: u32,
        include_rts: bool,
    ) -> Result<Vec<Tweet>, ApiError> {
        let params = ListStatusesParams {
            count,
            include_rts,
            owner_screen_name: &list.owner,
            slug: &list.slug,
        };
        self.signed_get("/1.1/lists/statuses.json", &params, creds)
            .await
    }

    /// GET an API path with an OAuth1 signature over exactly the query
    /// parameters being sent.
    async fn signed_get<R, T>(
        &self,
        path: &str,
        params: &R,
        creds: &Credentials,
    ) -> Result<T, ApiError>
    where
        R: oauth::Request,
        T: serde::de::DeserializeOwned,
    {
        let endpoint = format!("{}{}", self.base, path);
        let authorization = oauth::get(&endpoint, params, &creds.as_token(), oauth::HMAC_SHA1);
        let url = oauth::to_query(endpoint, params);

        debug!("fetching {url}");
        let resp = self
            .http
            .get(&url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::AuthExpired),
            StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimited(format!(
                "GET {path} returned 429"
            ))),
            _ if !status.is_success() => {
                let body = resp.text().await.unwrap_or_default();
                info!("GET {url} returned {status}");
                Err(ApiError::Upstream {
                    status,
                    body: truncate_body(&body),
                })
            }
            _ => Ok(resp.json().await?),
        }
    }
}

/// Resolve whose feed is being requested and pull the matching page of
/// posts: the authenticated user's home timeline, or a named list.
pub async fn fetch_feed_source(
    client: &TwitterClient,
    creds: &Credentials,
    list: Option<&ListId>,
    include_rts: bool,
) -> Result<(Actor, Vec<Activity>), ApiError> {
    let user = client.verify_credentials(creds).await?;
    let actor = Actor::from_user(&user);

    let tweets = match list {
        Some(list) => {
            client
                .list_statuses(creds, list, TWEET_COUNT, include_rts)
                .await?
        }
        None => client.home_timeline(creds, TWEET_COUNT, include_rts).await?,
    };

    let mut activities: Vec<Activity> = tweets.iter().map(Activity::from_tweet).collect();
    // Newest first, tweet id breaking ties; upstream ordering is not trusted
    // to be consistent across pages.
    activities.sort_by(|a, b| {
        b.published
            .cmp(&a.published)
            .then_with(|| (b.id.len(), &b.id).cmp(&(a.id.len(), &a.id)))
    });

    Ok((actor, activities))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_parse_into_owner_and_slug() {
        let list = ListId::parse("snarfed/some-list").expect("valid list");
        assert_eq!(list.owner, "snarfed");
        assert_eq!(list.slug, "some-list");
    }

    #[test]
    fn leading_at_sign_is_stripped() {
        let list = ListId::parse("@snarfed/some-list").expect("valid list");
        assert_eq!(list.owner, "snarfed");
        assert_eq!(list.to_string(), "snarfed/some-list");
    }

    #[test]
    fn malformed_lists_are_rejected() {
        for raw in [
            "",
            "nolist",
            "owner/",
            "/slug",
            "owner/slug/extra",
            "owner name/slug",
            "owner/slug!",
            "@@owner/slug",
        ] {
            assert!(ListId::parse(raw).is_err(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn the_blocked_list_is_blacklisted() {
        assert!(ListId::parse("tonysss13/financial")
            .expect("valid syntax")
            .is_blacklisted());
        assert!(ListId::parse("@tonysss13/financial")
            .expect("valid syntax")
            .is_blacklisted());
        assert!(!ListId::parse("snarfed/some-list")
            .expect("valid syntax")
            .is_blacklisted());
    }

    #[test]
    fn tweets_decode_from_api_json() {
        let tweet: Tweet = serde_json::from_str(
            r#"{
                "id_str": "501",
                "created_at": "Mon Jul 08 20:00:00 +0000 2013",
                "text": "hello world https://t.co/abc",
                "user": {"id_str": "1", "screen_name": "snarfed", "name": "Ryan"},
                "entities": {"urls": [{"url": "https://t.co/abc", "expanded_url": "https://example.com/", "display_url": "example.com"}]}
            }"#,
        )
        .expect("tweet should decode");
        assert_eq!(tweet.id_str, "501");
        assert_eq!(tweet.user.screen_name, "snarfed");
        let entities = tweet.entities.expect("entities present");
        assert_eq!(
            entities.urls[0].expanded_url.as_deref(),
            Some("https://example.com/")
        );
    }
}
