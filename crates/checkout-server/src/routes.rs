use actix_web::{get, post, web, HttpRequest, HttpResponse};
use rand::Rng;
use serde::{Deserialize, Serialize};
use stripe_gateway::{
    security, CreatePaymentIntent, DonationMetadata, PaymentIntent, UpdatePaymentIntent,
};

use crate::error::{retrieve_error, ApiError};
use crate::metrics;
use crate::pricing;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub currency: String,
    /// Item ids are accepted but pricing currently ignores them; the
    /// two-tier amount policy does not depend on the basket.
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub public_key: String,
    pub payment_intent: PaymentIntent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub id: String,
    pub is_donating: bool,
    /// Accepted from the checkout form; not used by the charge logic.
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub amount: i64,
}

/// Open a payment intent for a new checkout session.
///
/// The amount is always computed server-side; any amount in the
/// request body is ignored. Returns the publishable key and the
/// created intent (id plus client secret) so the browser can mount
/// the card widget and confirm directly against the gateway.
#[post("/create-payment-intent")]
pub async fn create_payment_intent(
    state: web::Data<AppState>,
    request: web::Json<CreateRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    if request.currency.trim().is_empty() {
        metrics::INTENT_REQUESTS
            .with_label_values(&["create", "invalid"])
            .inc();
        return Err(ApiError::Validation("currency is required".to_string()));
    }

    // Unique per checkout attempt; groups the charge with any donation
    // transfer later derived from it. A collision only muddies the
    // gateway's transfer bookkeeping, never correctness.
    let transfer_group = format!("group_{}", rand::rng().random_range(0..1_000_000));

    let params = CreatePaymentIntent {
        amount: pricing::order_amount(false),
        currency: request.currency.to_lowercase(),
        transfer_group: Some(transfer_group),
    };

    let start = std::time::Instant::now();
    let intent = state
        .gateway
        .create_payment_intent(&params)
        .await
        .map_err(|e| {
            metrics::INTENT_REQUESTS
                .with_label_values(&["create", "error"])
                .inc();
            ApiError::Gateway(e)
        })?;
    metrics::GATEWAY_LATENCY
        .with_label_values(&["create_intent"])
        .observe(start.elapsed().as_secs_f64());
    metrics::INTENT_REQUESTS
        .with_label_values(&["create", "ok"])
        .inc();

    tracing::info!(
        intent = %intent.id,
        amount = intent.amount,
        currency = %intent.currency,
        items = request.items.len(),
        "payment intent created"
    );

    Ok(HttpResponse::Ok().json(CreateResponse {
        public_key: state.publishable_key.clone(),
        payment_intent: intent,
    }))
}

/// Toggle the donation on an existing intent.
///
/// Retrieve-merge-update against the gateway: the donation metadata is
/// a full overwrite of both donation keys, so repeated calls with the
/// same flag land on the same amount and metadata, and two racing
/// updates resolve to whichever lands last at the gateway.
#[post("/update-payment-intent")]
pub async fn update_payment_intent(
    state: web::Data<AppState>,
    request: web::Json<UpdateRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    if request.id.trim().is_empty() {
        metrics::INTENT_REQUESTS
            .with_label_values(&["update", "invalid"])
            .inc();
        return Err(ApiError::Validation("id is required".to_string()));
    }

    let existing = state
        .gateway
        .retrieve_payment_intent(&request.id)
        .await
        .map_err(|e| {
            metrics::INTENT_REQUESTS
                .with_label_values(&["update", "error"])
                .inc();
            retrieve_error(&request.id, e)
        })?;

    if existing.status.is_terminal() {
        metrics::INTENT_REQUESTS
            .with_label_values(&["update", "rejected"])
            .inc();
        return Err(ApiError::IntentClosed {
            id: existing.id,
            status: existing.status.as_str(),
        });
    }

    let donation = if request.is_donating {
        DonationMetadata::donating(pricing::DONATION_AMOUNT, &state.organization_account)
    } else {
        DonationMetadata::none()
    };

    let mut metadata = existing.metadata.clone();
    donation.merge_into(&mut metadata);

    let params = UpdatePaymentIntent {
        amount: Some(pricing::order_amount(request.is_donating)),
        metadata: Some(metadata),
    };

    let start = std::time::Instant::now();
    let updated = state
        .gateway
        .update_payment_intent(&existing.id, &params)
        .await
        .map_err(|e| {
            metrics::INTENT_REQUESTS
                .with_label_values(&["update", "error"])
                .inc();
            ApiError::Gateway(e)
        })?;
    metrics::GATEWAY_LATENCY
        .with_label_values(&["update_intent"])
        .observe(start.elapsed().as_secs_f64());
    metrics::INTENT_REQUESTS
        .with_label_values(&["update", "ok"])
        .inc();

    tracing::info!(
        intent = %updated.id,
        amount = updated.amount,
        donating = request.is_donating,
        email = ?request.email,
        "payment intent updated"
    );

    Ok(HttpResponse::Ok().json(UpdateResponse {
        amount: updated.amount,
    }))
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "checkout-server",
    }))
}

#[get("/metrics")]
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match &state.metrics_token {
        Some(token) => {
            let authorized = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| security::constant_time_eq(t.as_bytes(), token))
                .unwrap_or(false);

            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None => {
            // No token configured — metrics stay protected by default.
            // CHECKOUT_PUBLIC_METRICS=true opts in to open access.
            let public_metrics = std::env::var("CHECKOUT_PUBLIC_METRICS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false);
            if !public_metrics {
                return HttpResponse::Forbidden().json(serde_json::json!({
                    "error": "forbidden",
                    "message": "Set METRICS_TOKEN or CHECKOUT_PUBLIC_METRICS=true to access /metrics"
                }));
            }
        }
    }
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}
