//! Relevance filter for live events
//!
//! With an account configured, a live record is kept only when that account
//! is its source, the destination of a payment-shaped record, or the
//! trustee of a trust-change shaped record. Without one, everything is kept.

use types::ids::AccountId;
use types::operation::OperationRecord;

/// Outcome of filtering one live event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveDecision {
    Accepted,
    /// Not an error: the event does not concern the configured account.
    Discarded,
}

#[derive(Debug, Clone, Default)]
pub struct RelevanceFilter {
    account: Option<AccountId>,
}

impl RelevanceFilter {
    pub fn new(account: Option<AccountId>) -> Self {
        Self { account }
    }

    pub fn decide(&self, record: &OperationRecord) -> LiveDecision {
        let Some(account) = &self.account else {
            return LiveDecision::Accepted;
        };

        let concerned = record.source_account == *account
            || record.destination() == Some(account)
            || record.trustee() == Some(account);

        if concerned {
            LiveDecision::Accepted
        } else {
            LiveDecision::Discarded
        }
    }

    pub fn accepts(&self, record: &OperationRecord) -> bool {
        self.decide(record) == LiveDecision::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{manage_data, payment, record_with, OTHER, WATCHED};
    use serde_json::json;

    fn watching() -> RelevanceFilter {
        RelevanceFilter::new(Some(AccountId::new(WATCHED)))
    }

    #[test]
    fn test_no_filter_accepts_everything() {
        let filter = RelevanceFilter::default();
        assert!(filter.accepts(&payment("1", OTHER, OTHER)));
        assert!(filter.accepts(&manage_data("2", "key")));
    }

    #[test]
    fn test_source_account_match() {
        assert!(watching().accepts(&payment("1", WATCHED, OTHER)));
    }

    #[test]
    fn test_destination_match() {
        assert!(watching().accepts(&payment("1", OTHER, WATCHED)));

        let path = record_with(
            "2",
            OTHER,
            "path_payment",
            json!({
                "to": WATCHED,
                "amount": "1.0000000",
                "asset_type": "native",
                "source_max": "1.0000000",
                "source_asset_type": "native"
            }),
        );
        assert!(watching().accepts(&path));
    }

    #[test]
    fn test_trustee_match() {
        let trust = record_with(
            "1",
            OTHER,
            "change_trust",
            json!({
                "asset_type": "credit_alphanum4",
                "asset_code": "USD",
                "asset_issuer": WATCHED,
                "trustee": WATCHED,
                "trustor": OTHER
            }),
        );
        assert!(watching().accepts(&trust));
    }

    #[test]
    fn test_unrelated_discarded() {
        assert_eq!(watching().decide(&payment("1", OTHER, OTHER)), LiveDecision::Discarded);
        // create_account destinations are not part of the relevance rule
        let created = record_with(
            "2",
            OTHER,
            "create_account",
            json!({ "account": WATCHED, "starting_balance": "1.0000000" }),
        );
        assert_eq!(watching().decide(&created), LiveDecision::Discarded);
    }
}
