use weft_sync::LockError;

use crate::ReadOnlyReason;

/// Contract violations surfaced by collection operations.
///
/// None of these are retried internally; each indicates misuse the caller
/// can correct.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
	/// Index outside `0..len` (or `0..=len` for insertion).
	#[error("index {index} out of range for length {len}")]
	IndexOutOfRange { index: usize, len: usize },
	/// Mutation attempted through a read-only scope.
	#[error("collection is read-only: {0}")]
	ReadOnly(ReadOnlyReason),
	/// A cursor or sub-list observed a structural edit it did not make.
	#[error("collection was structurally modified outside this cursor")]
	ConcurrentModification,
	/// A writable scope is used from a thread that does not own the write lock.
	#[error("calling thread does not own the write lock of this scope")]
	LockState,
	/// Cursor `remove`/`set` without a preceding `next`/`previous`.
	#[error("no current element; call next or previous first")]
	IllegalCursorState,
	/// A collection was asked to mirror its own contents.
	#[error("a collection cannot be content-bound to itself")]
	SelfBinding,
	/// A permutation mapping that is not a bijection over its range.
	#[error("mapping is not a permutation of {start}..{end}")]
	InvalidPermutation { start: usize, end: usize },
	#[error(transparent)]
	Lock(#[from] LockError),
}
