use stripe_gateway::StripeClient;

use crate::config::ServerConfig;

/// Shared application state.
///
/// Built once at startup and read-only during request handling, so
/// concurrent requests need no locking. The gateway itself serializes
/// all per-intent state.
pub struct AppState {
    pub gateway: StripeClient,
    /// Publishable key returned to the browser at intent creation.
    pub publishable_key: String,
    /// Webhook signing secret. `None` = degraded-trust mode.
    pub webhook_secret: Option<Vec<u8>>,
    /// Destination account for donation transfers.
    pub organization_account: String,
    /// Bearer token for the /metrics endpoint.
    pub metrics_token: Option<Vec<u8>>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        let mut gateway = StripeClient::new(config.stripe_secret_key.clone());
        if let Some(ref base) = config.api_base {
            gateway = gateway.with_api_base(base.clone());
        }
        Self {
            gateway,
            publishable_key: config.stripe_publishable_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            organization_account: config.organization_account.clone(),
            metrics_token: config
                .metrics_token
                .as_ref()
                .map(|s| s.clone().into_bytes()),
        }
    }
}
