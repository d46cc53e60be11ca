//! Locking primitives shared by the observable collections.
//!
//! The central type is [`StampedLock`]: a reentrant read/write lock whose
//! acquisitions hand back a [`Stamp`] that must be returned on release, with
//! a non-blocking optimistic read mode and an explicit owner transfer.

/// Lock error taxonomy.
pub mod error;
/// Reentrant stamped lock.
pub mod stamped;

#[cfg(test)]
mod invariants;

pub use error::LockError;
pub use stamped::{Stamp, StampedLock};
