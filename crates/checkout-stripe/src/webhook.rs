//! Webhook event model and signature verification.
//!
//! The gateway signs each delivery with HMAC-SHA256 over
//! `"<timestamp>.<raw body>"` and ships the result in the
//! `Stripe-Signature: t=<ts>,v1=<hex>` header. Verification must run
//! over the exact delivered bytes: re-encoding the parsed JSON first
//! would change whitespace and key order and break the signature.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::WebhookError;
use crate::intent::PaymentIntent;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Maximum accepted distance between the signature timestamp and the
/// local clock, in seconds. Bounds the replay window for captured
/// deliveries.
pub const DEFAULT_TOLERANCE: u64 = 300;

/// Event types this system acts on.
///
/// The set is open by design: the gateway ships new types without
/// notice, and unrecognized ones must be acknowledged, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "payment_intent.succeeded")]
    PaymentIntentSucceeded,
    #[serde(rename = "payment_intent.payment_failed")]
    PaymentIntentPaymentFailed,
    #[serde(other)]
    Other,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::PaymentIntentSucceeded => "payment_intent.succeeded",
            EventType::PaymentIntentPaymentFailed => "payment_intent.payment_failed",
            EventType::Other => "other",
        }
    }
}

/// An event as delivered to the webhook endpoint. Transient: processed
/// once and dropped, never persisted. Delivery is at-least-once and
/// unordered, so the same event may arrive again.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: serde_json::Value,
}

impl Event {
    /// Snapshot of the payment intent carried by this event. Only
    /// meaningful for `payment_intent.*` types.
    pub fn payment_intent(&self) -> Result<PaymentIntent, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Parsed `t=<ts>,v1=<hex>` signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: u64,
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parse the comma-separated `k=v` header. Several `v1` entries
    /// may be present while the sender rolls its secret; entries with
    /// other scheme names are ignored.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or(WebhookError::MalformedHeader)?;
            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| WebhookError::MalformedHeader)?)
                }
                "v1" => signatures.push(value.to_string()),
                _ => {}
            }
        }
        let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
        if signatures.is_empty() {
            return Err(WebhookError::MalformedHeader);
        }
        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Compute the hex signature for a timestamp and payload. Used by the
/// verifier and by tests constructing deliveries.
pub fn compute_signature(secret: &[u8], timestamp: u64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify the signature header against the exact raw body bytes, then
/// parse the verified payload into an [`Event`].
pub fn construct_event(payload: &[u8], header: &str, secret: &[u8]) -> Result<Event, WebhookError> {
    construct_event_at(payload, header, secret, unix_now(), DEFAULT_TOLERANCE)
}

/// Same as [`construct_event`] with an explicit clock and tolerance.
pub fn construct_event_at(
    payload: &[u8],
    header: &str,
    secret: &[u8],
    now: u64,
    tolerance: u64,
) -> Result<Event, WebhookError> {
    let parsed = SignatureHeader::parse(header)?;

    if now.abs_diff(parsed.timestamp) > tolerance {
        return Err(WebhookError::StaleTimestamp);
    }

    let accepted = parsed.signatures.iter().any(|sig| {
        // Undecodable hex compares against zeros so the hex check
        // itself carries no timing signal.
        let candidate = hex::decode(sig).unwrap_or_else(|_| vec![0u8; 32]);
        let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
        mac.update(parsed.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice is constant-time
        mac.verify_slice(&candidate).is_ok()
    });
    if !accepted {
        return Err(WebhookError::BadSignature);
    }

    serde_json::from_slice(payload).map_err(WebhookError::BadPayload)
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().fold(String::new(), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
            s
        })
    }

    pub fn decode(s: &str) -> Result<Vec<u8>, ()> {
        if !s.len().is_multiple_of(2) || !s.is_ascii() {
            return Err(());
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"whsec_test_secret";

    fn sample_payload() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {
                "object": {
                    "id": "pi_123",
                    "amount": 1400,
                    "currency": "usd",
                    "status": "succeeded",
                    "metadata": {"donationAmount": "46", "organizationAccountId": "acct_org"},
                }
            }
        }))
        .unwrap()
    }

    fn header_for(payload: &[u8], timestamp: u64) -> String {
        format!(
            "t={timestamp},v1={}",
            compute_signature(SECRET, timestamp, payload)
        )
    }

    #[test]
    fn valid_signature_yields_event() {
        let payload = sample_payload();
        let event =
            construct_event_at(&payload, &header_for(&payload, 1_000_000), SECRET, 1_000_000, 300)
                .unwrap();
        assert_eq!(event.event_type, EventType::PaymentIntentSucceeded);
        assert_eq!(event.payment_intent().unwrap().id, "pi_123");
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let payload = sample_payload();
        let header = header_for(&payload, 1_000_000);
        let mut tampered = payload.clone();
        tampered.extend_from_slice(b" ");
        let err = construct_event_at(&tampered, &header, SECRET, 1_000_000, 300).unwrap_err();
        assert!(matches!(err, WebhookError::BadSignature));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let payload = sample_payload();
        let header = format!(
            "t=1000000,v1={}",
            compute_signature(b"other-secret", 1_000_000, &payload)
        );
        let err = construct_event_at(&payload, &header, SECRET, 1_000_000, 300).unwrap_err();
        assert!(matches!(err, WebhookError::BadSignature));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = sample_payload();
        let header = header_for(&payload, 1_000_000);
        let err = construct_event_at(&payload, &header, SECRET, 1_000_000 + 600, 300).unwrap_err();
        assert!(matches!(err, WebhookError::StaleTimestamp));
    }

    #[test]
    fn future_timestamp_beyond_tolerance_is_rejected() {
        let payload = sample_payload();
        let header = header_for(&payload, 1_000_000 + 600);
        let err = construct_event_at(&payload, &header, SECRET, 1_000_000, 300).unwrap_err();
        assert!(matches!(err, WebhookError::StaleTimestamp));
    }

    #[test]
    fn small_clock_skew_is_tolerated() {
        let payload = sample_payload();
        let header = header_for(&payload, 1_000_000);
        assert!(construct_event_at(&payload, &header, SECRET, 1_000_000 + 120, 300).is_ok());
    }

    #[test]
    fn second_v1_entry_is_accepted_during_secret_roll() {
        let payload = sample_payload();
        let good = compute_signature(SECRET, 1_000_000, &payload);
        let stale = compute_signature(b"retired-secret", 1_000_000, &payload);
        let header = format!("t=1000000,v1={stale},v1={good}");
        assert!(construct_event_at(&payload, &header, SECRET, 1_000_000, 300).is_ok());
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let payload = sample_payload();
        for header in ["", "t=abc,v1=00", "v1=00", "t=1000000", "nonsense"] {
            let err = construct_event_at(&payload, header, SECRET, 1_000_000, 300).unwrap_err();
            assert!(matches!(err, WebhookError::MalformedHeader), "{header:?}");
        }
    }

    #[test]
    fn invalid_hex_signature_is_rejected() {
        let payload = sample_payload();
        let err =
            construct_event_at(&payload, "t=1000000,v1=zz-not-hex", SECRET, 1_000_000, 300)
                .unwrap_err();
        assert!(matches!(err, WebhookError::BadSignature));
    }

    #[test]
    fn verified_garbage_payload_is_bad_payload() {
        let payload = b"not json";
        let header = format!(
            "t=1000000,v1={}",
            compute_signature(SECRET, 1_000_000, payload)
        );
        let err = construct_event_at(payload, &header, SECRET, 1_000_000, 300).unwrap_err();
        assert!(matches!(err, WebhookError::BadPayload(_)));
    }

    #[test]
    fn unknown_event_type_parses_as_other() {
        let payload = serde_json::to_vec(&serde_json::json!({
            "id": "evt_2",
            "type": "charge.refunded",
            "data": {"object": {"id": "re_1"}}
        }))
        .unwrap();
        let header = format!(
            "t=1000000,v1={}",
            compute_signature(SECRET, 1_000_000, &payload)
        );
        let event = construct_event_at(&payload, &header, SECRET, 1_000_000, 300).unwrap();
        assert_eq!(event.event_type, EventType::Other);
    }
}
