//! Webhook endpoint: verify the delivery, route on event type, settle
//! donation transfers.
//!
//! Delivery is at-least-once and unordered relative to the client's
//! own confirmation calls, so this handler assumes nothing about what
//! the browser has or has not seen. A verified event is always
//! acknowledged with 200 — even when the downstream transfer fails —
//! because a non-2xx answer makes the gateway redeliver, and endless
//! redelivery cannot fix a broken transfer.

use actix_web::{post, web, HttpRequest, HttpResponse};
use stripe_gateway::webhook::{self as gateway_webhook, Event, EventType};
use stripe_gateway::{CreateTransfer, DonationMetadata, WebhookError};

use crate::metrics;
use crate::state::AppState;

/// Donation transfers are always settled in this currency, whatever
/// currency the originating charge used.
const TRANSFER_CURRENCY: &str = "usd";

/// What a verified event asks the server to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Succeeded donating intent: move the donated amount on.
    Transfer {
        amount: i64,
        destination: String,
        transfer_group: Option<String>,
        intent_id: String,
    },
    /// Succeeded intent without a donation.
    PaymentReceived { intent_id: String },
    /// Failed payment. No retry from here; a retry, if any, is the
    /// customer starting over client-side.
    PaymentFailed { intent_id: String },
    /// Event type outside the handled set.
    Ignore,
}

/// Decide what to do with a verified event. Pure: the caller performs
/// all side effects, which keeps the routing table testable without a
/// gateway.
pub fn route_event(event: &Event) -> Result<Disposition, WebhookError> {
    match event.event_type {
        EventType::PaymentIntentSucceeded => {
            let intent = event.payment_intent().map_err(WebhookError::BadPayload)?;
            let donation = DonationMetadata::from_map(&intent.metadata);
            match (donation.donation_amount, donation.organization_account_id) {
                (Some(amount), Some(destination)) if amount > 0 => Ok(Disposition::Transfer {
                    amount,
                    destination,
                    transfer_group: intent.transfer_group,
                    intent_id: intent.id,
                }),
                _ => Ok(Disposition::PaymentReceived {
                    intent_id: intent.id,
                }),
            }
        }
        EventType::PaymentIntentPaymentFailed => {
            let intent = event.payment_intent().map_err(WebhookError::BadPayload)?;
            Ok(Disposition::PaymentFailed {
                intent_id: intent.id,
            })
        }
        EventType::Other => Ok(Disposition::Ignore),
    }
}

#[post("/webhook")]
pub async fn webhook(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    // Verification runs over the exact delivered bytes, never over a
    // re-serialized structure.
    let event = match &state.webhook_secret {
        Some(secret) => {
            let header = req
                .headers()
                .get(gateway_webhook::SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok());
            let Some(header) = header else {
                metrics::WEBHOOK_REJECTIONS
                    .with_label_values(&["missing_header"])
                    .inc();
                tracing::warn!("webhook rejected — signature header missing");
                return rejection();
            };
            match gateway_webhook::construct_event(&body, header, secret) {
                Ok(event) => event,
                Err(e) => {
                    metrics::WEBHOOK_REJECTIONS
                        .with_label_values(&[e.reason()])
                        .inc();
                    // The reason stays in the logs; the response body
                    // is identical for every failure mode.
                    tracing::warn!(error = %e, "webhook rejected");
                    return rejection();
                }
            }
        }
        None => {
            // Degraded-trust mode: no signing secret configured, the
            // payload is taken at face value.
            tracing::debug!("webhook accepted without signature verification (no secret)");
            match serde_json::from_slice::<Event>(&body) {
                Ok(event) => event,
                Err(e) => {
                    metrics::WEBHOOK_REJECTIONS
                        .with_label_values(&["bad_payload"])
                        .inc();
                    tracing::warn!(error = %e, "webhook rejected — unparseable payload");
                    return rejection();
                }
            }
        }
    };

    metrics::WEBHOOK_EVENTS
        .with_label_values(&[event.event_type.as_str()])
        .inc();

    let disposition = match route_event(&event) {
        Ok(d) => d,
        Err(e) => {
            metrics::WEBHOOK_REJECTIONS
                .with_label_values(&[e.reason()])
                .inc();
            tracing::warn!(error = %e, event = ?event.id, "webhook rejected");
            return rejection();
        }
    };

    match disposition {
        Disposition::Transfer {
            amount,
            destination,
            transfer_group,
            intent_id,
        } => {
            // Delivery is at-least-once; the idempotency key makes the
            // transfer at-most-once at the gateway, so a redelivered
            // event cannot double-pay the organization.
            let idempotency_key = format!("donation-transfer-{intent_id}");
            let params = CreateTransfer {
                amount,
                currency: TRANSFER_CURRENCY.to_string(),
                destination: destination.clone(),
                transfer_group,
            };
            match state
                .gateway
                .create_transfer(&params, Some(&idempotency_key))
                .await
            {
                Ok(transfer) => {
                    metrics::TRANSFERS.with_label_values(&["ok"]).inc();
                    tracing::info!(
                        transfer = %transfer.id,
                        amount = transfer.amount,
                        destination = %transfer.destination,
                        intent = %intent_id,
                        "donation transferred"
                    );
                }
                Err(e) => {
                    // Already verified: acknowledge anyway and leave
                    // the failure for manual reconciliation.
                    metrics::TRANSFERS.with_label_values(&["error"]).inc();
                    tracing::error!(
                        intent = %intent_id,
                        amount,
                        destination = %destination,
                        error = %e,
                        "donation transfer failed — needs manual reconciliation"
                    );
                }
            }
        }
        Disposition::PaymentReceived { intent_id } => {
            tracing::info!(intent = %intent_id, "payment received — no donation");
        }
        Disposition::PaymentFailed { intent_id } => {
            tracing::warn!(intent = %intent_id, "payment failed");
        }
        Disposition::Ignore => {
            tracing::debug!(event = ?event.id, "ignoring unhandled event type");
        }
    }

    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

fn rejection() -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": "webhook verification failed"
    }))
}
