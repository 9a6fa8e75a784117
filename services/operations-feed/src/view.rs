//! Display rows for rendering collaborators
//!
//! A [`FeedRow`] is everything a renderer needs for one line of the feed:
//! source account, operation label, detail summary and age. Rows are built
//! fresh for every snapshot; summaries are never cached.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use types::ids::AccountId;
use types::operation::OperationRecord;

use crate::age::LOADING_PLACEHOLDER;
use crate::interpreter::{interpret, Summary};
use crate::window::FeedEntry;

/// Separator between the parts of a flow ("amount » destination").
const FLOW: &str = "\u{bb}";

/// One rendered line of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRow {
    pub id: String,
    pub source_account: AccountId,
    /// Operation column label (`passive_offer` for passive offers).
    pub type_label: String,
    pub self_link: Option<String>,
    /// `None` for records of an unrecognised type.
    pub summary: Option<Summary>,
    pub created_at: Option<DateTime<Utc>>,
    /// Relative age, or the loading placeholder.
    pub age_text: String,
    pub record: Arc<OperationRecord>,
}

impl FeedRow {
    pub fn from_entry(entry: &FeedEntry) -> Self {
        let record = &entry.record;
        Self {
            id: record.id.to_string(),
            source_account: record.source_account.clone(),
            type_label: record.display_label().to_string(),
            self_link: record.self_href().map(str::to_string),
            summary: interpret(record),
            created_at: entry.created_at,
            age_text: entry
                .age_text
                .clone()
                .unwrap_or_else(|| LOADING_PLACEHOLDER.to_string()),
            record: Arc::clone(record),
        }
    }

    /// Detail column text; empty when there is no summary.
    pub fn details(&self) -> String {
        self.summary.as_ref().map(Summary::to_string).unwrap_or_default()
    }
}

impl fmt::Display for FeedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.source_account,
            self.type_label,
            self.details(),
            self.age_text
        )
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::AccountCreated {
                starting_balance,
                asset,
                account,
            } => write!(f, "{} {} {} {}", starting_balance, asset, FLOW, account),
            Summary::Payment { amount, asset, to } => {
                write!(f, "{} {} {} {}", amount, asset, FLOW, to)
            }
            Summary::PathPayment {
                source_max,
                source_asset,
                amount,
                asset,
                to,
            } => write!(
                f,
                "max {} {} {} {} {} {} {}",
                source_max, source_asset, FLOW, amount, asset, FLOW, to
            ),
            Summary::Trust { asset_code, issuer } => write!(
                f,
                "{} issued by {}",
                asset_code.as_deref().unwrap_or("-"),
                issuer.as_ref().map_or("-", |i| i.as_str())
            ),
            Summary::TrustAuthorization {
                authorized,
                trustor,
                asset_code,
            } => write!(
                f,
                "{} {} to hold {}",
                if *authorized { "Allowed" } else { "Disallowed" },
                trustor,
                asset_code
            ),
            Summary::Offer {
                amount,
                selling,
                buying,
            } => write!(f, "Sell {} {} for {}", amount, selling, buying),
            Summary::Merge { into } => write!(f, "{} {}", FLOW, into),
            Summary::DataEntry { key } => write!(f, "Key: {}", key),
        }
    }
}

/// Feed title: label plus the leading characters of the filtered account.
pub fn heading(label: &str, account: Option<&AccountId>) -> String {
    format!(
        "Recent operations: {} {}",
        label,
        account.map(AccountId::short).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{manage_data, payment, record_with, OTHER, WATCHED};
    use serde_json::json;

    fn row(record: OperationRecord) -> FeedRow {
        FeedRow::from_entry(&FeedEntry::pending(Arc::new(record)))
    }

    #[test]
    fn test_payment_row() {
        let r = row(payment("7", OTHER, WATCHED));
        assert_eq!(r.id, "7");
        assert_eq!(r.type_label, "payment");
        assert_eq!(r.details(), "10 XLM \u{bb} GWATCHEDACCOUNT");
        assert_eq!(r.age_text, "Loading...");
        assert_eq!(r.self_link.as_deref(), Some("https://horizon.example/operations/7"));
    }

    #[test]
    fn test_allow_trust_text() {
        let r = row(record_with(
            "1",
            "GISSUER",
            "allow_trust",
            json!({ "asset_code": "USD", "trustor": WATCHED, "trustee": "GISSUER", "authorize": false }),
        ));
        assert_eq!(r.details(), "Disallowed GWATCHEDACCOUNT to hold USD");
    }

    #[test]
    fn test_path_payment_text() {
        let r = row(record_with(
            "1",
            OTHER,
            "path_payment",
            json!({
                "to": WATCHED,
                "amount": "1000.0000000",
                "asset_type": "credit_alphanum4",
                "asset_code": "EUR",
                "asset_issuer": "GISSUER",
                "source_max": "1200.5000000",
                "source_asset_type": "native"
            }),
        ));
        assert_eq!(
            r.details(),
            "max 1,200.5 XLM \u{bb} 1,000 EUR \u{bb} GWATCHEDACCOUNT"
        );
    }

    #[test]
    fn test_offer_and_data_text() {
        let offer = row(record_with(
            "1",
            OTHER,
            "create_passive_offer",
            json!({
                "amount": "5.0000000",
                "selling_asset_type": "credit_alphanum4",
                "selling_asset_code": "BTC",
                "selling_asset_issuer": "GISSUER",
                "buying_asset_type": "native"
            }),
        ));
        assert_eq!(offer.type_label, "passive_offer");
        assert_eq!(offer.details(), "Sell 5 BTC for XLM");

        let data = row(manage_data("2", "a-very-long-data-entry-name"));
        assert_eq!(data.details(), "Key: a-very-long-data-ent...");
    }

    #[test]
    fn test_unknown_type_row_keeps_other_fields() {
        let r = row(record_with("9", OTHER, "inflation", json!({})));
        assert!(r.summary.is_none());
        assert_eq!(r.details(), "");
        assert_eq!(r.type_label, "inflation");
        assert_eq!(r.source_account.as_str(), OTHER);
    }

    #[test]
    fn test_heading() {
        let account = AccountId::new("GCKFBEIYV2U22IO2BJ4KVJOIP7XPWQGQFKKWXR6DOSJBV7STMAQSMTGG");
        assert_eq!(heading("Anchor", Some(&account)), "Recent operations: Anchor GCKF");
        assert_eq!(heading("Network", None), "Recent operations: Network ");
    }
}
