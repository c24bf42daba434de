use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata key carrying the donated amount in minor units.
pub const METADATA_DONATION_AMOUNT: &str = "donationAmount";

/// Metadata key carrying the payout destination account.
pub const METADATA_ORGANIZATION_ACCOUNT: &str = "organizationAccountId";

/// Gateway-side lifecycle status of a payment intent.
///
/// The set is open: the gateway may introduce statuses this crate does
/// not know about, and those deserialize as [`IntentStatus::Unknown`]
/// rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Succeeded,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl IntentStatus {
    /// Terminal intents can no longer be amended.
    pub fn is_terminal(self) -> bool {
        matches!(self, IntentStatus::Succeeded | IntentStatus::Canceled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntentStatus::RequiresPaymentMethod => "requires_payment_method",
            IntentStatus::RequiresConfirmation => "requires_confirmation",
            IntentStatus::RequiresAction => "requires_action",
            IntentStatus::Processing => "processing",
            IntentStatus::RequiresCapture => "requires_capture",
            IntentStatus::Succeeded => "succeeded",
            IntentStatus::Canceled => "canceled",
            IntentStatus::Unknown => "unknown",
        }
    }
}

/// A payment intent as returned by the gateway.
///
/// Owned by the gateway; this is a snapshot, referenced by `id`. The
/// amount is in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: IntentStatus,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub transfer_group: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub receipt_email: Option<String>,
}

/// Donation fields carried in an intent's metadata map.
///
/// The gateway has no native donation concept, so the donated amount
/// and the payout destination ride along as metadata strings. Internal
/// logic works on this typed record; the string map exists only at the
/// wire boundary. A non-donating update writes explicit empty markers
/// for both keys instead of deleting them, so the map keeps the same
/// shape across toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationMetadata {
    pub donation_amount: Option<i64>,
    pub organization_account_id: Option<String>,
}

impl DonationMetadata {
    pub fn donating(amount: i64, organization_account_id: impl Into<String>) -> Self {
        Self {
            donation_amount: Some(amount),
            organization_account_id: Some(organization_account_id.into()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Read the donation fields back out of a gateway metadata map.
    /// Empty markers, absent keys and unparseable amounts all read as
    /// `None`.
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let donation_amount = map
            .get(METADATA_DONATION_AMOUNT)
            .filter(|v| !v.is_empty())
            .and_then(|v| v.parse().ok());
        let organization_account_id = map
            .get(METADATA_ORGANIZATION_ACCOUNT)
            .filter(|v| !v.is_empty())
            .cloned();
        Self {
            donation_amount,
            organization_account_id,
        }
    }

    /// Overwrite the donation fields in an existing metadata map.
    ///
    /// Both keys are always written, so two calls with the same record
    /// land on the same map regardless of what was there before. Keys
    /// outside the donation pair are left untouched.
    pub fn merge_into(&self, map: &mut BTreeMap<String, String>) {
        map.insert(
            METADATA_DONATION_AMOUNT.to_string(),
            self.donation_amount
                .map(|a| a.to_string())
                .unwrap_or_default(),
        );
        map.insert(
            METADATA_ORGANIZATION_ACCOUNT.to_string(),
            self.organization_account_id.clone().unwrap_or_default(),
        );
    }

    pub fn is_donating(&self) -> bool {
        self.donation_amount.is_some_and(|a| a > 0)
    }
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone)]
pub struct CreatePaymentIntent {
    pub amount: i64,
    pub currency: String,
    pub transfer_group: Option<String>,
}

impl CreatePaymentIntent {
    pub(crate) fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), self.currency.clone()),
        ];
        if let Some(ref group) = self.transfer_group {
            form.push(("transfer_group".to_string(), group.clone()));
        }
        form
    }
}

/// Parameters for amending an existing payment intent.
#[derive(Debug, Clone, Default)]
pub struct UpdatePaymentIntent {
    pub amount: Option<i64>,
    pub metadata: Option<BTreeMap<String, String>>,
}

impl UpdatePaymentIntent {
    pub(crate) fn to_form(&self) -> Vec<(String, String)> {
        let mut form = Vec::new();
        if let Some(amount) = self.amount {
            form.push(("amount".to_string(), amount.to_string()));
        }
        if let Some(ref metadata) = self.metadata {
            for (key, value) in metadata {
                form.push((format!("metadata[{key}]"), value.clone()));
            }
        }
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_deserializes_without_error() {
        let status: IntentStatus = serde_json::from_str("\"some_future_status\"").unwrap();
        assert_eq!(status, IntentStatus::Unknown);
        assert!(!status.is_terminal());
    }

    #[test]
    fn succeeded_and_canceled_are_terminal() {
        assert!(IntentStatus::Succeeded.is_terminal());
        assert!(IntentStatus::Canceled.is_terminal());
        assert!(!IntentStatus::RequiresConfirmation.is_terminal());
        assert!(!IntentStatus::Processing.is_terminal());
    }

    #[test]
    fn donation_merge_overwrites_both_keys() {
        let mut map = BTreeMap::new();
        DonationMetadata::donating(46, "acct_org").merge_into(&mut map);
        assert_eq!(map.get(METADATA_DONATION_AMOUNT).unwrap(), "46");
        assert_eq!(map.get(METADATA_ORGANIZATION_ACCOUNT).unwrap(), "acct_org");

        // Toggling off clears the values but keeps the keys.
        DonationMetadata::none().merge_into(&mut map);
        assert_eq!(map.get(METADATA_DONATION_AMOUNT).unwrap(), "");
        assert_eq!(map.get(METADATA_ORGANIZATION_ACCOUNT).unwrap(), "");
        assert!(!DonationMetadata::from_map(&map).is_donating());
    }

    #[test]
    fn donation_merge_is_idempotent() {
        let donation = DonationMetadata::donating(46, "acct_org");
        let mut once = BTreeMap::new();
        donation.merge_into(&mut once);
        let mut twice = once.clone();
        donation.merge_into(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn donation_merge_preserves_unrelated_keys() {
        let mut map = BTreeMap::new();
        map.insert("orderRef".to_string(), "ab-123".to_string());
        DonationMetadata::donating(46, "acct_org").merge_into(&mut map);
        assert_eq!(map.get("orderRef").unwrap(), "ab-123");
    }

    #[test]
    fn donation_round_trips_through_map() {
        let donation = DonationMetadata::donating(46, "acct_org");
        let mut map = BTreeMap::new();
        donation.merge_into(&mut map);
        assert_eq!(DonationMetadata::from_map(&map), donation);
    }

    #[test]
    fn empty_markers_read_as_absent() {
        let mut map = BTreeMap::new();
        map.insert(METADATA_DONATION_AMOUNT.to_string(), String::new());
        map.insert(METADATA_ORGANIZATION_ACCOUNT.to_string(), String::new());
        let donation = DonationMetadata::from_map(&map);
        assert_eq!(donation, DonationMetadata::none());
    }

    #[test]
    fn update_form_flattens_metadata_keys() {
        let mut metadata = BTreeMap::new();
        metadata.insert(METADATA_DONATION_AMOUNT.to_string(), "46".to_string());
        let params = UpdatePaymentIntent {
            amount: Some(1400),
            metadata: Some(metadata),
        };
        let form = params.to_form();
        assert!(form.contains(&("amount".to_string(), "1400".to_string())));
        assert!(form.contains(&("metadata[donationAmount]".to_string(), "46".to_string())));
    }

    #[test]
    fn create_form_includes_transfer_group() {
        let params = CreatePaymentIntent {
            amount: 1354,
            currency: "usd".to_string(),
            transfer_group: Some("group_7".to_string()),
        };
        let form = params.to_form();
        assert!(form.contains(&("amount".to_string(), "1354".to_string())));
        assert!(form.contains(&("transfer_group".to_string(), "group_7".to_string())));
    }

    #[test]
    fn intent_snapshot_deserializes() {
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_123",
            "amount": 1354,
            "currency": "usd",
            "status": "requires_confirmation",
            "client_secret": "pi_123_secret",
            "transfer_group": "group_42",
            "metadata": {"donationAmount": "46", "organizationAccountId": "acct_org"},
        }))
        .unwrap();
        assert_eq!(intent.status, IntentStatus::RequiresConfirmation);
        assert!(DonationMetadata::from_map(&intent.metadata).is_donating());
    }
}
