use std::env;
use std::fmt;

use thiserror::Error;

const DEFAULT_PORT: u16 = 4242;
const DEFAULT_RATE_LIMIT_RPM: u64 = 120;

/// Process-wide configuration, read from the environment once at
/// startup and immutable afterwards.
pub struct ServerConfig {
    /// Gateway secret API key.
    pub stripe_secret_key: String,
    /// Publishable key handed to the browser so it can mount the
    /// card-entry widget.
    pub stripe_publishable_key: String,
    /// Webhook signing secret. `None` means degraded-trust mode:
    /// webhook payloads are accepted without signature verification.
    /// Acceptable only for local development against test deliveries.
    pub webhook_secret: Option<Vec<u8>>,
    /// Connected account that receives donation transfers.
    pub organization_account: String,
    /// Override for the gateway API base URL.
    pub api_base: Option<String>,
    /// Directory with the checkout page assets. `None` = API only.
    pub static_dir: Option<String>,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub rate_limit_rpm: u64,
    /// Bearer token required for /metrics (None = access denied unless
    /// CHECKOUT_PUBLIC_METRICS=true).
    pub metrics_token: Option<String>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("stripe_secret_key", &"[REDACTED]")
            .field("stripe_publishable_key", &self.stripe_publishable_key)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("organization_account", &self.organization_account)
            .field("api_base", &self.api_base)
            .field("static_dir", &self.static_dir)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let stripe_secret_key = require("STRIPE_SECRET_KEY")?;
        let stripe_publishable_key = require("STRIPE_PUBLISHABLE_KEY")?;
        let organization_account = require("ORGANIZATION_ACCOUNT_ID")?;

        let webhook_secret = env::var("STRIPE_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(String::into_bytes);

        if webhook_secret.is_none() {
            tracing::warn!(
                "STRIPE_WEBHOOK_SECRET not set — webhook payloads will be trusted WITHOUT \
                 signature verification. Do not run this way outside local development."
            );
        }

        let api_base = env::var("STRIPE_API_BASE").ok().filter(|s| !s.is_empty());
        let static_dir = env::var("STATIC_DIR").ok().filter(|s| !s.is_empty());

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let allowed_origins: Vec<String> = env::var("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit_rpm = env::var("RATE_LIMIT_RPM")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_RPM);

        let metrics_token = env::var("METRICS_TOKEN").ok().filter(|s| !s.is_empty());
        if metrics_token.is_none() {
            tracing::warn!(
                "METRICS_TOKEN not set — /metrics requires CHECKOUT_PUBLIC_METRICS=true"
            );
        }

        Ok(Self {
            stripe_secret_key,
            stripe_publishable_key,
            webhook_secret,
            organization_account,
            api_base,
            static_dir,
            port,
            allowed_origins,
            rate_limit_rpm,
            metrics_token,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::MissingRequired(name))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_secrets() {
        let config = ServerConfig {
            stripe_secret_key: "sk_live_abc".to_string(),
            stripe_publishable_key: "pk_live_abc".to_string(),
            webhook_secret: Some(b"whsec_abc".to_vec()),
            organization_account: "acct_org".to_string(),
            api_base: None,
            static_dir: None,
            port: 4242,
            allowed_origins: vec![],
            rate_limit_rpm: 120,
            metrics_token: Some("metrics-token".to_string()),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk_live_abc"));
        assert!(!debug.contains("whsec_abc"));
        assert!(!debug.contains("metrics-token"));
        assert!(debug.contains("pk_live_abc"));
    }
}
