//! Assets held and exchanged on the ledger
//!
//! Records describe an asset with three loose fields (`*_asset_type`,
//! `*_asset_code`, `*_asset_issuer`). `Asset::from_parts` folds them into
//! a single value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::TypeError;
use crate::ids::AccountId;

/// Display marker for the native asset
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// Asset type tag as sent by the query service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Native,
    CreditAlphanum4,
    CreditAlphanum12,
    /// Pool shares and any type introduced after this library was written
    #[serde(other)]
    Other,
}

/// A ledger asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Asset {
    /// The network's native asset
    Native,
    /// An issued asset identified by code and issuer
    Credit {
        code: String,
        issuer: Option<AccountId>,
    },
}

impl Asset {
    /// Build an asset from the loose record fields.
    ///
    /// Native assets ignore code and issuer. Every other type requires a code.
    pub fn from_parts(
        asset_type: AssetType,
        code: Option<&str>,
        issuer: Option<&AccountId>,
    ) -> Result<Self, TypeError> {
        match asset_type {
            AssetType::Native => Ok(Asset::Native),
            other => match code {
                Some(code) if !code.is_empty() => Ok(Asset::Credit {
                    code: code.to_string(),
                    issuer: issuer.cloned(),
                }),
                _ => Err(TypeError::MissingAssetCode {
                    asset_type: format!("{:?}", other),
                }),
            },
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }

    /// Code shown to users (`XLM` for the native asset)
    pub fn code(&self) -> &str {
        match self {
            Asset::Native => NATIVE_ASSET_CODE,
            Asset::Credit { code, .. } => code,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
