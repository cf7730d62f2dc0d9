//! Three-legged OAuth 1.0a handshake against the Twitter endpoints.
//!
//! Signature construction is delegated to `oauth1-request`; this module owns
//! the request-token and access-token exchanges plus the transient store
//! that bridges them.

pub mod store;

use oauth1_request as oauth;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{truncate_body, ApiError};

/// The four credential fields a read request must supply.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token_key: String,
    pub access_token_secret: String,
}

impl Credentials {
    pub fn as_token(&self) -> oauth::Token<&str> {
        oauth::Token::from_parts(
            self.consumer_key.as_str(),
            self.consumer_secret.as_str(),
            self.access_token_key.as_str(),
            self.access_token_secret.as_str(),
        )
    }
}

/// Temporary token from the first leg of the handshake.
#[derive(Debug, Deserialize)]
pub struct RequestToken {
    #[serde(rename = "oauth_token")]
    pub key: String,
    #[serde(rename = "oauth_token_secret")]
    pub secret: String,
}

/// The user's access token from the final leg.
#[derive(Debug, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "oauth_token")]
    pub key: String,
    #[serde(rename = "oauth_token_secret")]
    pub secret: String,
    pub screen_name: Option<String>,
}

/// Obtain a request token, with our callback URL bound into the signature.
pub async fn get_request_token(
    http: &reqwest::Client,
    base: &str,
    consumer_key: &str,
    consumer_secret: &str,
    callback_url: &str,
) -> Result<RequestToken, ApiError> {
    let uri = format!("{base}/oauth/request_token");
    let client = oauth::Credentials::new(consumer_key, consumer_secret);
    let authorization = oauth::Builder::<_, _, &str>::new(client, oauth::HMAC_SHA1)
        .callback(callback_url)
        .post(&uri, &());

    exchange(http, &uri, authorization).await
}

/// The authorization page the end user's browser is redirected to.
pub fn authorize_url(base: &str, token_key: &str) -> String {
    format!(
        "{}/oauth/authorize?oauth_token={}",
        base,
        urlencoding::encode(token_key)
    )
}

/// Trade the authorized request token and verifier for an access token.
pub async fn get_access_token(
    http: &reqwest::Client,
    base: &str,
    consumer_key: &str,
    consumer_secret: &str,
    token_key: &str,
    token_secret: &str,
    verifier: &str,
) -> Result<AccessToken, ApiError> {
    let uri = format!("{base}/oauth/access_token");
    let client = oauth::Credentials::new(consumer_key, consumer_secret);
    let authorization = oauth::Builder::new(client, oauth::HMAC_SHA1)
        .token(oauth::Credentials::new(token_key, token_secret))
        .verifier(verifier)
        .post(&uri, &());

    exchange(http, &uri, authorization).await
}

/// POST to an OAuth endpoint and decode its form-urlencoded response.
async fn exchange<T>(
    http: &reqwest::Client,
    uri: &str,
    authorization: String,
) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned,
{
    debug!("POST {uri}");
    let resp = http
        .post(uri)
        .header(AUTHORIZATION, authorization)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ApiError::Upstream {
            status,
            body: truncate_body(&body),
        });
    }

    serde_urlencoded::from_str(&body).map_err(|e| ApiError::Upstream {
        status,
        body: format!("unparseable token response: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_responses_are_form_encoded() {
        let parsed: AccessToken = serde_urlencoded::from_str(
            "oauth_token=the-key&oauth_token_secret=the-secret&screen_name=snarfed&user_id=5",
        )
        .expect("well-formed response");
        assert_eq!(parsed.key, "the-key");
        assert_eq!(parsed.secret, "the-secret");
        assert_eq!(parsed.screen_name.as_deref(), Some("snarfed"));
    }

    #[test]
    fn authorize_url_escapes_the_token() {
        assert_eq!(
            authorize_url("https://api.twitter.com", "ab/cd"),
            "https://api.twitter.com/oauth/authorize?oauth_token=ab%2Fcd"
        );
    }
}
