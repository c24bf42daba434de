use thiserror::Error;

/// Errors returned by gateway operations.
#[derive(Debug, Error)]
pub enum StripeError {
    /// Transport-level failure: the call never got a gateway answer.
    #[error("gateway request failed: {0}")]
    Http(String),

    /// The gateway answered with a non-success status.
    #[error("gateway rejected request ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StripeError {
    /// True when the gateway rejected the request as malformed or
    /// unprocessable, i.e. the fault lies with what we sent.
    pub fn is_client_error(&self) -> bool {
        matches!(self, StripeError::Api { status, .. } if (400..500).contains(status))
    }

    /// True when the gateway reported the referenced resource missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StripeError::Api { status: 404, .. })
    }
}

/// Errors raised while authenticating and parsing a webhook delivery.
///
/// The HTTP layer collapses all of these into one generic rejection so
/// callers cannot probe which check failed; the distinction exists for
/// operator logs and metrics only.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed signature header")]
    MalformedHeader,

    #[error("signature mismatch")]
    BadSignature,

    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,

    #[error("malformed event payload: {0}")]
    BadPayload(#[source] serde_json::Error),
}

impl WebhookError {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            WebhookError::MalformedHeader => "malformed_header",
            WebhookError::BadSignature => "bad_signature",
            WebhookError::StaleTimestamp => "stale_timestamp",
            WebhookError::BadPayload(_) => "bad_payload",
        }
    }
}
