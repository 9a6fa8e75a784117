//! Operation type interpreter
//!
//! Maps each record shape to a normalized [`Summary`]: who is involved,
//! which amounts and which assets. Pure and deterministic; the record is
//! only borrowed. Records of an unrecognised type have no summary.

use serde::Serialize;
use types::asset::Asset;
use types::ids::AccountId;
use types::numeric::Amount;
use types::operation::{OperationBody, OperationRecord};

/// Data entry names longer than this are truncated.
pub const DATA_KEY_MAX_CHARS: usize = 20;
/// Marker appended to truncated data entry names.
pub const ELLIPSIS: &str = "...";

/// Normalized description of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Summary {
    /// Starting balance (always native) flowing to a new account.
    AccountCreated {
        starting_balance: Amount,
        asset: Asset,
        account: AccountId,
    },
    /// Amount of an asset flowing to a destination.
    Payment {
        amount: Amount,
        asset: Asset,
        to: AccountId,
    },
    /// At most `source_max` of `source_asset` converted into `amount` of `asset`.
    PathPayment {
        source_max: Amount,
        source_asset: Asset,
        amount: Amount,
        asset: Asset,
        to: AccountId,
    },
    /// Trustline to an asset code and its issuer.
    Trust {
        asset_code: Option<String>,
        issuer: Option<AccountId>,
    },
    /// Trustline authorization granted or revoked for a trustor.
    TrustAuthorization {
        authorized: bool,
        trustor: AccountId,
        asset_code: String,
    },
    /// Sell an amount of one asset for another (managed or passive).
    Offer {
        amount: Amount,
        selling: Asset,
        buying: Asset,
    },
    /// Account merged into a destination.
    Merge { into: AccountId },
    /// Data entry key, truncated for display.
    DataEntry { key: String },
}

/// Summarize a record. `None` for unrecognised types.
pub fn interpret(record: &OperationRecord) -> Option<Summary> {
    let summary = match &record.body {
        OperationBody::CreateAccount(op) => Summary::AccountCreated {
            starting_balance: op.starting_balance,
            asset: Asset::Native,
            account: op.account.clone(),
        },
        OperationBody::Payment(op) => Summary::Payment {
            amount: op.amount,
            asset: op.asset.clone(),
            to: op.to.clone(),
        },
        OperationBody::PathPayment(op) => Summary::PathPayment {
            source_max: op.source_max,
            source_asset: op.source_asset.clone(),
            amount: op.amount,
            asset: op.asset.clone(),
            to: op.to.clone(),
        },
        OperationBody::ChangeTrust(op) => Summary::Trust {
            asset_code: op.asset_code.clone(),
            issuer: op.asset_issuer.clone(),
        },
        OperationBody::AllowTrust(op) => Summary::TrustAuthorization {
            authorized: op.authorize,
            trustor: op.trustor.clone(),
            asset_code: op.asset_code.clone(),
        },
        OperationBody::ManageOffer(op) | OperationBody::CreatePassiveOffer(op) => Summary::Offer {
            amount: op.amount,
            selling: op.selling.clone(),
            buying: op.buying.clone(),
        },
        OperationBody::AccountMerge(op) => Summary::Merge {
            into: op.into.clone(),
        },
        OperationBody::ManageData(op) => Summary::DataEntry {
            key: truncate_key(&op.name),
        },
        OperationBody::Other { .. } => return None,
    };
    Some(summary)
}

/// First `DATA_KEY_MAX_CHARS` characters plus an ellipsis when longer.
pub fn truncate_key(name: &str) -> String {
    if name.chars().count() <= DATA_KEY_MAX_CHARS {
        name.to_string()
    } else {
        let mut key: String = name.chars().take(DATA_KEY_MAX_CHARS).collect();
        key.push_str(ELLIPSIS);
        key
    }
}
