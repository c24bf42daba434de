use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::StripeError;
use crate::intent::{CreatePaymentIntent, PaymentIntent, UpdatePaymentIntent};
use crate::transfer::{CreateTransfer, Transfer};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Minimal typed client for the gateway REST API.
///
/// Requests are form-encoded with Bearer authentication, matching the
/// gateway's wire format. The client performs no retries; redelivery
/// and retry policy belong to callers (and, for transfers, to the
/// gateway's own idempotency handling).
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            secret_key: secret_key.into(),
        }
    }

    /// Point the client at a different API base URL. Tests use this to
    /// substitute a fake gateway.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn create_payment_intent(
        &self,
        params: &CreatePaymentIntent,
    ) -> Result<PaymentIntent, StripeError> {
        self.post("/v1/payment_intents", params.to_form(), None)
            .await
    }

    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeError> {
        self.get(&format!("/v1/payment_intents/{id}")).await
    }

    pub async fn update_payment_intent(
        &self,
        id: &str,
        params: &UpdatePaymentIntent,
    ) -> Result<PaymentIntent, StripeError> {
        self.post(&format!("/v1/payment_intents/{id}"), params.to_form(), None)
            .await
    }

    /// Create a transfer to a connected account.
    ///
    /// With an `idempotency_key` set, the gateway deduplicates repeated
    /// requests carrying the same key, so an at-least-once webhook
    /// delivery cannot pay the destination twice.
    pub async fn create_transfer(
        &self,
        params: &CreateTransfer,
        idempotency_key: Option<&str>,
    ) -> Result<Transfer, StripeError> {
        self.post("/v1/transfers", params.to_form(), idempotency_key)
            .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StripeError> {
        let resp = self
            .http
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| StripeError::Http(format!("request failed: {e}")))?;
        decode_response(resp).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Vec<(String, String)>,
        idempotency_key: Option<&str>,
    ) -> Result<T, StripeError> {
        let mut request = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .timeout(REQUEST_TIMEOUT)
            .form(&form);

        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| StripeError::Http(format!("request failed: {e}")))?;
        decode_response(resp).await
    }
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn decode_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, StripeError> {
    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| StripeError::Http(format!("failed to read response: {e}")))?;

    if !status.is_success() {
        // The gateway wraps failures in an `{ "error": { ... } }`
        // envelope; fall back to the raw body when it does not.
        let (code, message) = match serde_json::from_slice::<ApiErrorEnvelope>(&bytes) {
            Ok(envelope) => (
                envelope.error.code,
                envelope
                    .error
                    .message
                    .unwrap_or_else(|| "unknown gateway error".to_string()),
            ),
            Err(_) => (None, String::from_utf8_lossy(&bytes).into_owned()),
        };
        tracing::debug!(status = status.as_u16(), code = ?code, "gateway returned error response");
        return Err(StripeError::Api {
            status: status.as_u16(),
            code,
            message,
        });
    }

    Ok(serde_json::from_slice(&bytes)?)
}
