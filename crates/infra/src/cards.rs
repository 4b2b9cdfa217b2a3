//! Card-number issuance with bounded collision retry.

use std::future::Future;
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

use cardbank_core::CardNumber;

use crate::store::{StoreError, UniqueField};

pub const DEFAULT_CARD_ISSUANCE_ATTEMPTS: u32 = 5;

/// Source of candidate card numbers.
pub trait CardIssuer: Send + Sync {
    fn next_card(&self) -> CardNumber;
}

/// Uniformly random 16-digit numbers from the thread RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCardIssuer;

impl CardIssuer for RandomCardIssuer {
    fn next_card(&self) -> CardNumber {
        CardNumber::random(&mut rand::thread_rng())
    }
}

/// Hands out a fixed sequence of numbers, repeating the last one once the
/// sequence runs out. Useful to force collisions.
#[derive(Debug)]
pub struct ScriptedCardIssuer {
    cards: Vec<CardNumber>,
    next: Mutex<usize>,
}

impl ScriptedCardIssuer {
    pub fn new(cards: Vec<CardNumber>) -> Self {
        Self {
            cards,
            next: Mutex::new(0),
        }
    }
}

impl CardIssuer for ScriptedCardIssuer {
    fn next_card(&self) -> CardNumber {
        let idx = {
            let mut next = self.next.lock().unwrap_or_else(|p| p.into_inner());
            let idx = *next;
            *next += 1;
            idx
        };
        match self.cards.get(idx).or_else(|| self.cards.last()) {
            Some(card) => card.clone(),
            None => RandomCardIssuer.next_card(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CardIssuanceError {
    #[error("card issuance exhausted after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Draw card numbers from `issuer` and hand each to `insert` until one is
/// accepted. Only a card-number uniqueness conflict triggers a retry; any
/// other store error is returned immediately.
pub async fn issue_with_retry<F, Fut>(
    issuer: &dyn CardIssuer,
    attempts: u32,
    mut insert: F,
) -> Result<CardNumber, CardIssuanceError>
where
    F: FnMut(CardNumber) -> Fut,
    Fut: Future<Output = Result<(), StoreError>>,
{
    for attempt in 1..=attempts {
        let card = issuer.next_card();
        match insert(card.clone()).await {
            Ok(()) => return Ok(card),
            Err(StoreError::Duplicate(UniqueField::CardNumber)) => {
                warn!(attempt, max_attempts = attempts, "card number collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(CardIssuanceError::Exhausted { attempts })
}
