use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::WrapErr;

use crate::cache::ResponseCache;
use crate::oauth::store::RequestTokenStore;

/// How long a single outbound call to Twitter may take. Deliberately
/// generous; the overall request deadline still bounds the response.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub domain: String,
    pub protocol: String,
    pub port: u16,
    /// Base URL for both the Twitter REST API and its OAuth endpoints.
    /// Points at the fixture server in tests.
    pub twitter_base: String,
    pub http: reqwest::Client,
    pub request_tokens: Arc<RequestTokenStore>,
    pub cache: Arc<ResponseCache>,
    /// Overall deadline for a read request; exceeding it yields a 503.
    pub request_deadline: Duration,
}

impl AppState {
    pub fn from_env() -> color_eyre::Result<Self> {
        let domain = std::env::var("DOMAIN").wrap_err("DOMAIN must be set")?;
        let protocol = std::env::var("PROTO").unwrap_or_else(|_| "https".to_string());
        let port = env_or("PORT", 3000)?;

        let twitter_base = std::env::var("TWITTER_BASE_URL")
            .unwrap_or_else(|_| "https://api.twitter.com".to_string());

        let cache_ttl = Duration::from_secs(env_or("CACHE_TTL_SECS", 900)?);
        let request_deadline = Duration::from_secs(env_or("REQUEST_DEADLINE_SECS", 60)?);

        let http = reqwest::ClientBuilder::new()
            .timeout(UPSTREAM_TIMEOUT)
            .use_rustls_tls()
            .build()?;

        Ok(Self {
            domain,
            protocol,
            port,
            twitter_base,
            http,
            request_tokens: Arc::new(RequestTokenStore::default()),
            cache: Arc::new(ResponseCache::new(cache_ttl)),
            request_deadline,
        })
    }

    /// The service's own base URL, used for generated feed URLs and the
    /// re-authentication prompt.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }

    /// Callback URL for the OAuth handshake. The list identifier rides along
    /// as a query parameter so it survives the round trip through Twitter
    /// without server-side session state.
    pub fn oauth_callback_url(&self, list: Option<&str>) -> String {
        let mut url = format!("{}/oauth_callback", self.base_url());
        if let Some(list) = list {
            url.push_str("?list=");
            url.push_str(&urlencoding::encode(list));
        }
        url
    }
}

fn env_or<T>(name: &str, default: T) -> color_eyre::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .wrap_err_with(|| format!("could not parse {name}={value}")),
        Err(_) => Ok(default),
    }
}
