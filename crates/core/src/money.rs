//! Monetary amounts in minor units.

use core::ops::Neg;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Minor units per major unit (kobo per naira).
pub const MINOR_PER_MAJOR: i64 = 100;

/// A signed amount of money in minor units (e.g. kobo).
///
/// Balances and ledger amounts never go through floating point: user
/// input is parsed straight into minor units and percentages round
/// half away from zero.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Whole major units (e.g. `Money::from_major(50_000)` is 50,000.00).
    pub const fn from_major(major: i64) -> Self {
        Self(major * MINOR_PER_MAJOR)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// `pct` percent of this amount, rounded half away from zero.
    pub fn percentage(self, pct: u32) -> Money {
        let scaled = i128::from(self.0.unsigned_abs()) * i128::from(pct);
        let rounded = (scaled + 50) / 100;
        let magnitude = i64::try_from(rounded).unwrap_or(i64::MAX);
        if self.0 < 0 { Money(-magnitude) } else { Money(magnitude) }
    }

    /// Parse a decimal amount such as `"1000"`, `"1000.5"` or `"-12.34"`.
    ///
    /// At most two fractional digits are accepted; anything else is a
    /// validation error rather than a silent rounding.
    pub fn parse(input: &str) -> DomainResult<Money> {
        let s = input.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (digits, None),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation(format!("invalid amount '{input}'")));
        }

        let frac_minor = match frac {
            None => 0,
            Some(f) if f.is_empty() || f.len() > 2 || !f.bytes().all(|b| b.is_ascii_digit()) => {
                return Err(DomainError::validation(format!("invalid amount '{input}'")));
            }
            Some(f) => {
                let v: i64 = f
                    .parse()
                    .map_err(|_| DomainError::validation(format!("invalid amount '{input}'")))?;
                if f.len() == 1 { v * 10 } else { v }
            }
        };

        let whole_minor = whole
            .parse::<i64>()
            .ok()
            .and_then(|w| w.checked_mul(MINOR_PER_MAJOR))
            .and_then(|w| w.checked_add(frac_minor))
            .ok_or_else(|| DomainError::validation(format!("amount out of range '{input}'")))?;

        Ok(if negative { Money(-whole_minor) } else { Money(whole_minor) })
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let abs = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        let per = MINOR_PER_MAJOR as u64;
        write!(f, "{sign}{}.{:02}", abs / per, abs % per)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(Money::parse("1000").unwrap(), Money::from_minor(100_000));
        assert_eq!(Money::parse("1000.5").unwrap(), Money::from_minor(100_050));
        assert_eq!(Money::parse(" 1000.05 ").unwrap(), Money::from_minor(100_005));
        assert_eq!(Money::parse("-12.34").unwrap(), Money::from_minor(-1_234));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", "abc", "1.234", "1.", ".5", "1e3", "--1", "1,000", "99999999999999999999"] {
            assert!(
                matches!(Money::parse(bad), Err(DomainError::Validation(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn displays_two_decimal_places() {
        assert_eq!(Money::from_major(50_000).to_string(), "50000.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-90_000).to_string(), "-900.00");
    }

    #[test]
    fn ten_percent_rounds_half_away_from_zero() {
        assert_eq!(Money::from_major(1_000).percentage(10), Money::from_major(100));
        assert_eq!(Money::from_minor(15).percentage(10), Money::from_minor(2));
        assert_eq!(Money::from_minor(14).percentage(10), Money::from_minor(1));
        assert_eq!(Money::from_minor(-15).percentage(10), Money::from_minor(-2));
    }

    proptest! {
        #[test]
        fn display_then_parse_is_identity(minor in -1_000_000_000_000i64..1_000_000_000_000i64) {
            let m = Money::from_minor(minor);
            prop_assert_eq!(Money::parse(&m.to_string()).unwrap(), m);
        }
    }
}
