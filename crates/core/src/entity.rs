//! Records with identity.

/// Accounts, ledger rows and receipts: two values with the same id are the
/// same record, whatever their other fields say.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
