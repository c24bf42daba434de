//! Server-side amount policy.
//!
//! The charge total is always computed here and never read from the
//! client: a tampered `amount` field in a request body has no effect
//! because no handler looks at one.

/// Base order total in minor currency units.
pub const BASE_AMOUNT: i64 = 1354;

/// Fixed donation increment in minor currency units. Also the amount
/// transferred to the organization account when the donation settles.
pub const DONATION_AMOUNT: i64 = 46;

/// Authoritative charge amount for an order.
pub fn order_amount(is_donating: bool) -> i64 {
    if is_donating {
        BASE_AMOUNT + DONATION_AMOUNT
    } else {
        BASE_AMOUNT
    }
}
