use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use web3::types::U256;

use crate::error::{Field, ValidationError};

/// 1 wei is the minimal unit of value
/// 1 ether = 10^18 wei
pub const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;
// 10 ^ ETHER_DECIMAL_PLACES
/// Number of decimal places used in the string representation of ether value.
pub const ETHER_DECIMAL_PLACES: u8 = 18;

/// Unit of value
#[derive(
    Clone, Copy, Debug, Deserialize, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize,
)]
pub struct Ether(U256);

impl Ether {
    /// Create from whole ethers
    #[inline]
    pub fn from_ether(ether: u64) -> Self {
        Self(U256::from(ether) * U256::from(WEI_PER_ETHER))
    }

    /// Create from wei
    #[inline]
    pub fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    /// Retrieve the wei value within.
    #[inline]
    pub fn wei(self) -> U256 {
        self.0
    }

    /// Return integer and fractional part, useful for pretty printing
    pub fn ether_and_wei(self) -> (U256, U256) {
        let wei_per_ether = U256::from(WEI_PER_ETHER);

        (self.0 / wei_per_ether, self.0 % wei_per_ether)
    }
}

/// Trailing zeros of the fractional part are not printed, and whole amounts are printed
/// without decimal point.
impl fmt::Display for Ether {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (amount_ether, amount_wei) = self.ether_and_wei();
        if amount_wei.is_zero() {
            return write!(f, "{}", amount_ether);
        }

        let width = usize::from(ETHER_DECIMAL_PLACES);
        let fraction = format!("{:0>width$}", amount_wei.to_string(), width = width);

        write!(f, "{}.{}", amount_ether, fraction.trim_end_matches('0'))
    }
}

/// Parse a decimal amount of ether, as typed by a user: `1`, `1.5`, `.25`.
///
/// The conversion to wei must be lossless, so amounts with more than 18 significant decimal
/// places are rejected. Negative amounts can never be represented and fail with
/// `ValidationError::NotPositive`.
impl FromStr for Ether {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Empty(Field::Amount));
        }

        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let is_digits = |x: &str| x.chars().all(|c| c.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !is_digits(int_part)
            || !is_digits(frac_part)
        {
            return Err(ValidationError::NotANumber(s.to_string()));
        }
        if negative {
            return Err(ValidationError::NotPositive);
        }

        let frac_part = frac_part.trim_end_matches('0');
        let decimals = usize::from(ETHER_DECIMAL_PLACES);
        if frac_part.len() > decimals {
            return Err(ValidationError::TooPrecise(s.to_string()));
        }

        let overflow = || ValidationError::Overflow(s.to_string());
        let int_value = if int_part.is_empty() {
            U256::zero()
        } else {
            U256::from_dec_str(int_part).map_err(|_| overflow())?
        };
        let frac_value = if frac_part.is_empty() {
            U256::zero()
        } else {
            // At most 18 digits, always fits
            U256::from_dec_str(frac_part).map_err(|_| overflow())?
                * U256::exp10(decimals - frac_part.len())
        };

        int_value
            .checked_mul(U256::from(WEI_PER_ETHER))
            .and_then(|wei| wei.checked_add(frac_value))
            .map(Ether)
            .ok_or_else(overflow)
    }
}
