use serde::{Deserialize, Serialize};

/// A fund transfer to a connected account, as returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub destination: String,
    #[serde(default)]
    pub transfer_group: Option<String>,
}

/// Parameters for creating a transfer.
///
/// The transfer group is copied from the originating intent so the
/// gateway's ledger links the charge with the payout derived from it.
#[derive(Debug, Clone)]
pub struct CreateTransfer {
    pub amount: i64,
    pub currency: String,
    pub destination: String,
    pub transfer_group: Option<String>,
}

impl CreateTransfer {
    pub(crate) fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), self.currency.clone()),
            ("destination".to_string(), self.destination.clone()),
        ];
        if let Some(ref group) = self.transfer_group {
            form.push(("transfer_group".to_string(), group.clone()));
        }
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_form_carries_group_when_present() {
        let params = CreateTransfer {
            amount: 46,
            currency: "usd".to_string(),
            destination: "acct_org".to_string(),
            transfer_group: Some("group_42".to_string()),
        };
        let form = params.to_form();
        assert!(form.contains(&("amount".to_string(), "46".to_string())));
        assert!(form.contains(&("destination".to_string(), "acct_org".to_string())));
        assert!(form.contains(&("transfer_group".to_string(), "group_42".to_string())));
    }

    #[test]
    fn transfer_form_omits_missing_group() {
        let params = CreateTransfer {
            amount: 46,
            currency: "usd".to_string(),
            destination: "acct_org".to_string(),
            transfer_group: None,
        };
        assert!(!params.to_form().iter().any(|(k, _)| k == "transfer_group"));
    }
}
