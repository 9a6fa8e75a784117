//! Decimal amounts
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Amounts arrive from the query service as decimal strings with seven
//! fractional digits and are rendered with grouped thousands and trailing
//! zeros removed.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::TypeError;

/// Fractional digits carried by ledger amounts
pub const DISPLAY_DECIMALS: u32 = 7;

/// An asset amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Render for display: seven decimals rounded half up, thousands grouped
    /// with `,`, then trailing zeros and a dangling point removed.
    ///
    /// `1000.5` renders as `1,000.5` and `100` as `100`.
    pub fn to_display_string(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
        let fixed = format!("{:.*}", DISPLAY_DECIMALS as usize, rounded);

        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
        let (sign, digits) = match int_part.strip_prefix('-') {
            Some(digits) => ("-", digits),
            None => ("", int_part),
        };
        let grouped = group_thousands(digits);
        let frac = frac_part.trim_end_matches('0');

        if frac.is_empty() {
            format!("{}{}", sign, grouped)
        } else {
            format!("{}{}.{}", sign, grouped, frac)
        }
    }
}

impl FromStr for Amount {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .map(Self)
            .map_err(|_| TypeError::InvalidAmount(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
