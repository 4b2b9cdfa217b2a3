//! Card numbers: the externally shared handle of an account.

use core::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// Number of digits in a card number.
pub const CARD_NUMBER_LEN: usize = 16;

/// A 16-digit card number.
///
/// Stored and compared without separators; `hyphenated()` is the
/// presentation form (`1234-5678-9012-3456`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardNumber(String);

impl ValueObject for CardNumber {}

impl CardNumber {
    /// Parse user input, ignoring whitespace and `-` separators.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let digits: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();

        if digits.len() != CARD_NUMBER_LEN || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation(format!(
                "card number must be {CARD_NUMBER_LEN} digits"
            )));
        }

        Ok(Self(digits))
    }

    /// Draw a uniformly random card number. Uniqueness is the caller's concern.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let digits = (0..CARD_NUMBER_LEN)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        Self(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn hyphenated(&self) -> String {
        self.0
            .as_bytes()
            .chunks(4)
            .map(|c| core::str::from_utf8(c).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl core::fmt::Display for CardNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CardNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CardNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CardNumber> for String {
    fn from(value: CardNumber) -> Self {
        value.0
    }
}
