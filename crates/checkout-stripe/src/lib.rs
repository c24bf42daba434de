//! Stripe gateway client and webhook verification for the donation
//! checkout server.
//!
//! Two halves:
//!
//! - **Outbound** ([`client`]) — a minimal typed REST client for the
//!   gateway operations this system needs: create/retrieve/update
//!   payment intents and create transfers.
//! - **Inbound** ([`webhook`]) — verification of asynchronously
//!   delivered events, signed with HMAC-SHA256 over the exact raw
//!   request body (`t=<ts>,v1=<hex>` header scheme).
//!
//! The gateway is the sole source of truth for an intent's state; this
//! crate holds no state of its own beyond credentials.

pub mod client;
pub mod error;
pub mod intent;
pub mod security;
pub mod transfer;
pub mod webhook;

pub use client::{StripeClient, DEFAULT_API_BASE};
pub use error::{StripeError, WebhookError};
pub use intent::{
    CreatePaymentIntent, DonationMetadata, IntentStatus, PaymentIntent, UpdatePaymentIntent,
};
pub use transfer::{CreateTransfer, Transfer};
pub use webhook::{construct_event, Event, EventType, SIGNATURE_HEADER};
