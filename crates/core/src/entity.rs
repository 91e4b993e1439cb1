//! Entity trait: a record whose identity outlives changes to its attributes.

/// Anything stored under a stable key.
///
/// Jobs are keyed by [`crate::JobId`], users by [`crate::WalletAddress`];
/// stores index rows by this key.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
