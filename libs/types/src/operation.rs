//! Operation records
//!
//! An operation is a single ledger action (payment, trust change, offer, ...)
//! as returned by the query service. The common envelope (`id`,
//! `paging_token`, `source_account`, `_links`) is decoded into
//! [`OperationRecord`]; the type-specific fields are decoded into the
//! closed [`OperationBody`] union keyed by the record's `type` tag.
//!
//! Decoding never fails because of the payload: an unrecognised tag, or a
//! recognised tag whose fields do not match the expected shape, yields
//! [`OperationBody::Other`] carrying the raw tag.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::asset::{Asset, AssetType};
use crate::errors::TypeError;
use crate::ids::{AccountId, OperationId, PagingToken};
use crate::numeric::Amount;

/// A hypermedia link attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    pub href: String,
}

/// Links carried in a record's `_links` object
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OperationLinks {
    /// Canonical location of this operation
    #[serde(rename = "self", default)]
    pub self_link: Option<Link>,
    /// Parent transaction, whose detail holds the authoritative creation time
    #[serde(default)]
    pub transaction: Option<Link>,
}

/// An immutable operation record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawOperation")]
pub struct OperationRecord {
    pub id: OperationId,
    pub paging_token: PagingToken,
    pub source_account: AccountId,
    /// Creation time as reported by the listing, when present. Not
    /// authoritative; the parent transaction is.
    pub reported_created_at: Option<DateTime<Utc>>,
    pub links: OperationLinks,
    pub body: OperationBody,
}

impl OperationRecord {
    /// Wire tag of this record (`payment`, `manage_data`, ...)
    pub fn type_name(&self) -> &str {
        self.body.type_name()
    }

    /// Label shown in the operation column; passive offers are shortened.
    pub fn display_label(&self) -> &str {
        match self.body {
            OperationBody::CreatePassiveOffer(_) => "passive_offer",
            _ => self.type_name(),
        }
    }

    pub fn transaction_href(&self) -> Option<&str> {
        self.links.transaction.as_ref().map(|l| l.href.as_str())
    }

    pub fn self_href(&self) -> Option<&str> {
        self.links.self_link.as_ref().map(|l| l.href.as_str())
    }

    /// Receiving account of payment-shaped records
    pub fn destination(&self) -> Option<&AccountId> {
        self.body.destination()
    }

    /// Trustee of trust-change shaped records
    pub fn trustee(&self) -> Option<&AccountId> {
        self.body.trustee()
    }
}

/// Envelope as it appears on the wire, before the payload is interpreted.
#[derive(Deserialize)]
struct RawOperation {
    id: OperationId,
    paging_token: PagingToken,
    source_account: AccountId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "_links", default)]
    links: OperationLinks,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl From<RawOperation> for OperationRecord {
    fn from(raw: RawOperation) -> Self {
        Self {
            id: raw.id,
            paging_token: raw.paging_token,
            source_account: raw.source_account,
            reported_created_at: raw.created_at,
            links: raw.links,
            body: OperationBody::decode(raw.kind, raw.fields),
        }
    }
}

/// Type-specific payload of an operation record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationBody {
    CreateAccount(CreateAccountOp),
    Payment(PaymentOp),
    PathPayment(PathPaymentOp),
    ChangeTrust(ChangeTrustOp),
    AllowTrust(AllowTrustOp),
    ManageOffer(OfferOp),
    CreatePassiveOffer(OfferOp),
    AccountMerge(AccountMergeOp),
    ManageData(ManageDataOp),
    /// Unrecognised or malformed payload; `kind` is the raw wire tag.
    #[serde(skip_deserializing)]
    Other { kind: String },
}

impl OperationBody {
    /// Decode a payload from its tag and remaining fields.
    pub fn decode(kind: String, mut fields: Map<String, Value>) -> Self {
        fields.insert("type".to_string(), Value::String(kind.clone()));
        serde_json::from_value(Value::Object(fields)).unwrap_or(OperationBody::Other { kind })
    }

    pub fn type_name(&self) -> &str {
        match self {
            OperationBody::CreateAccount(_) => "create_account",
            OperationBody::Payment(_) => "payment",
            OperationBody::PathPayment(_) => "path_payment",
            OperationBody::ChangeTrust(_) => "change_trust",
            OperationBody::AllowTrust(_) => "allow_trust",
            OperationBody::ManageOffer(_) => "manage_offer",
            OperationBody::CreatePassiveOffer(_) => "create_passive_offer",
            OperationBody::AccountMerge(_) => "account_merge",
            OperationBody::ManageData(_) => "manage_data",
            OperationBody::Other { kind } => kind,
        }
    }

    pub fn destination(&self) -> Option<&AccountId> {
        match self {
            OperationBody::Payment(op) => Some(&op.to),
            OperationBody::PathPayment(op) => Some(&op.to),
            _ => None,
        }
    }

    pub fn trustee(&self) -> Option<&AccountId> {
        match self {
            OperationBody::ChangeTrust(op) => op.trustee.as_ref(),
            OperationBody::AllowTrust(op) => op.trustee.as_ref(),
            _ => None,
        }
    }
}

/// Funds and creates a new account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateAccountOp {
    pub account: AccountId,
    pub starting_balance: Amount,
    #[serde(default)]
    pub funder: Option<AccountId>,
}

/// Sends an amount of one asset to a destination
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "PaymentFields")]
pub struct PaymentOp {
    pub from: Option<AccountId>,
    pub to: AccountId,
    pub amount: Amount,
    pub asset: Asset,
}

/// Sends up to `source_max` of a source asset, delivering `amount` of `asset`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "PathPaymentFields")]
pub struct PathPaymentOp {
    pub from: Option<AccountId>,
    pub to: AccountId,
    pub amount: Amount,
    pub asset: Asset,
    pub source_max: Amount,
    pub source_asset: Asset,
    pub source_amount: Option<Amount>,
}

/// Creates, updates or removes a trustline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeTrustOp {
    pub asset_type: AssetType,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<AccountId>,
    #[serde(default)]
    pub trustee: Option<AccountId>,
    #[serde(default)]
    pub trustor: Option<AccountId>,
    #[serde(default)]
    pub limit: Option<Amount>,
}

/// Authorizes or revokes another account's trustline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AllowTrustOp {
    pub trustor: AccountId,
    #[serde(default)]
    pub trustee: Option<AccountId>,
    pub asset_code: String,
    #[serde(default)]
    pub authorize: bool,
}

/// Offer to sell `amount` of `selling` for `buying`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "OfferFields")]
pub struct OfferOp {
    pub amount: Amount,
    pub price: Option<String>,
    pub selling: Asset,
    pub buying: Asset,
}

/// Merges the source account into `into`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountMergeOp {
    #[serde(default)]
    pub account: Option<AccountId>,
    pub into: AccountId,
}

/// Sets or clears a named data entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManageDataOp {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Deserialize)]
struct PaymentFields {
    #[serde(default)]
    from: Option<AccountId>,
    to: AccountId,
    amount: Amount,
    asset_type: AssetType,
    #[serde(default)]
    asset_code: Option<String>,
    #[serde(default)]
    asset_issuer: Option<AccountId>,
}

impl TryFrom<PaymentFields> for PaymentOp {
    type Error = TypeError;

    fn try_from(f: PaymentFields) -> Result<Self, Self::Error> {
        let asset = Asset::from_parts(f.asset_type, f.asset_code.as_deref(), f.asset_issuer.as_ref())?;
        Ok(Self {
            from: f.from,
            to: f.to,
            amount: f.amount,
            asset,
        })
    }
}

#[derive(Deserialize)]
struct PathPaymentFields {
    #[serde(default)]
    from: Option<AccountId>,
    to: AccountId,
    amount: Amount,
    asset_type: AssetType,
    #[serde(default)]
    asset_code: Option<String>,
    #[serde(default)]
    asset_issuer: Option<AccountId>,
    source_max: Amount,
    source_asset_type: AssetType,
    #[serde(default)]
    source_asset_code: Option<String>,
    #[serde(default)]
    source_asset_issuer: Option<AccountId>,
    #[serde(default)]
    source_amount: Option<Amount>,
}

impl TryFrom<PathPaymentFields> for PathPaymentOp {
    type Error = TypeError;

    fn try_from(f: PathPaymentFields) -> Result<Self, Self::Error> {
        let asset = Asset::from_parts(f.asset_type, f.asset_code.as_deref(), f.asset_issuer.as_ref())?;
        let source_asset = Asset::from_parts(
            f.source_asset_type,
            f.source_asset_code.as_deref(),
            f.source_asset_issuer.as_ref(),
        )?;
        Ok(Self {
            from: f.from,
            to: f.to,
            amount: f.amount,
            asset,
            source_max: f.source_max,
            source_asset,
            source_amount: f.source_amount,
        })
    }
}

#[derive(Deserialize)]
struct OfferFields {
    amount: Amount,
    #[serde(default)]
    price: Option<String>,
    selling_asset_type: AssetType,
    #[serde(default)]
    selling_asset_code: Option<String>,
    #[serde(default)]
    selling_asset_issuer: Option<AccountId>,
    buying_asset_type: AssetType,
    #[serde(default)]
    buying_asset_code: Option<String>,
    #[serde(default)]
    buying_asset_issuer: Option<AccountId>,
}

impl TryFrom<OfferFields> for OfferOp {
    type Error = TypeError;

    fn try_from(f: OfferFields) -> Result<Self, Self::Error> {
        let selling = Asset::from_parts(
            f.selling_asset_type,
            f.selling_asset_code.as_deref(),
            f.selling_asset_issuer.as_ref(),
        )?;
        let buying = Asset::from_parts(
            f.buying_asset_type,
            f.buying_asset_code.as_deref(),
            f.buying_asset_issuer.as_ref(),
        )?;
        Ok(Self {
            amount: f.amount,
            price: f.price,
            selling,
            buying,
        })
    }
}
