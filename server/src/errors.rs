use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

/// Failure modes of the proxy, mapped onto the statuses feed readers see.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),

    #[error("invalid list identifier {0:?}, expected owner/slug")]
    InvalidList(String),

    /// Twitter rejected the stored credentials (401/403). The read path
    /// intercepts this before it can reach a feed reader as an error status.
    #[error("twitter credentials expired or revoked")]
    AuthExpired,

    #[error("rate limited: {0}")]
    RateLimited(String),

    /// No request token row for the `oauth_token` a callback presented.
    #[error("unknown or already-used oauth_token")]
    UnknownRequestToken,

    #[error("twitter returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParam(_)
            | ApiError::InvalidList(_)
            | ApiError::UnknownRequestToken => StatusCode::BAD_REQUEST,
            ApiError::AuthExpired => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream { .. } | ApiError::Http(_) => StatusCode::BAD_GATEWAY,
            ApiError::DeadlineExceeded => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = %status, "request failed");
        } else {
            warn!(error = %self, status = %status, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}

/// Upstream error bodies can be arbitrarily large; keep enough to diagnose.
pub fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 200;
    if body.chars().count() <= LIMIT {
        body.to_string()
    } else {
        let mut out: String = body.chars().take(LIMIT).collect();
        out.push('…');
        out
    }
}
