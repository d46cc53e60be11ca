//! Scoped access modes and the shared release logic behind
//! [`crate::LockedList`] and [`crate::LockedSet`].

use std::fmt;
use std::thread::ThreadId;

use weft_sync::{Stamp, StampedLock};

use crate::CollectionError;
use crate::change::Classify;
use crate::engine::{Backing, Core};

/// What a scope may do with its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
	/// Outermost write scope; mutation allowed.
	Writable,
	/// Requested read-only through `lock_read_only`.
	ExplicitReadOnly,
	/// Requested while the thread already owned the write lock.
	NestedReadOnly,
}

impl AccessMode {
	pub const fn is_read_only(self) -> bool {
		!matches!(self, Self::Writable)
	}

	pub(crate) const fn read_only_reason(self) -> Option<ReadOnlyReason> {
		match self {
			Self::Writable => None,
			Self::ExplicitReadOnly => Some(ReadOnlyReason::Explicit),
			Self::NestedReadOnly => Some(ReadOnlyReason::Nested),
		}
	}
}

/// Why a scope rejected a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOnlyReason {
	Explicit,
	Nested,
}

impl fmt::Display for ReadOnlyReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Explicit => f.write_str("scope was acquired read-only"),
			Self::Nested => f.write_str("scope is nested inside an outer write scope on this thread"),
		}
	}
}

/// Operations common to every scoped guard.
pub trait LockedCollection {
	fn mode(&self) -> AccessMode;

	fn is_read_only(&self) -> bool {
		self.mode().is_read_only()
	}

	/// Hands the write lock held by this scope to `thread`.
	///
	/// The scope itself may then be moved to `thread` and released there.
	/// Nothing prevents the current thread from continuing to use the
	/// collection afterwards; callers must stop acting as the owner.
	///
	/// # Errors
	///
	/// [`CollectionError::ReadOnly`] for read-only scopes, or
	/// [`CollectionError::Lock`] if the calling thread is not the owner.
	fn change_owner(&self, thread: ThreadId) -> Result<(), CollectionError>;

	/// Releases the scope now, flushing pending changes for a writable scope.
	///
	/// # Errors
	///
	/// Returns the lock error if the stamp no longer matches the lock state.
	fn release(self) -> Result<(), CollectionError>
	where
		Self: Sized;
}

/// Fails unless `mode` permits mutation and the calling thread owns `lock`.
pub(crate) fn ensure_writable(mode: AccessMode, lock: &StampedLock) -> Result<(), CollectionError> {
	if let Some(reason) = mode.read_only_reason() {
		return Err(CollectionError::ReadOnly(reason));
	}
	if !lock.is_write_locked_by_current_thread() {
		return Err(CollectionError::LockState);
	}
	Ok(())
}

/// Lock stamp held for the lifetime of a guard. Released exactly once.
pub(crate) struct Scope<'a, S: Backing, R: Classify + Send + Sync + 'static> {
	core: &'a Core<S, R>,
	mode: AccessMode,
	stamp: Option<Stamp>,
}

impl<'a, S: Backing, R: Classify + Send + Sync + 'static> Scope<'a, S, R> {
	/// Writable scope, or a nested read-only one if the thread already owns the lock.
	pub(crate) fn write(core: &'a Core<S, R>) -> Result<Self, CollectionError> {
		let stamp = core.lock().acquire_write()?;
		if stamp.is_outermost_write() {
			return Ok(Self {
				core,
				mode: AccessMode::Writable,
				stamp: Some(stamp),
			});
		}
		core.lock().release_write(stamp)?;
		Ok(Self {
			core,
			mode: AccessMode::NestedReadOnly,
			stamp: None,
		})
	}

	pub(crate) fn read_only(core: &'a Core<S, R>) -> Self {
		Self {
			core,
			mode: AccessMode::ExplicitReadOnly,
			stamp: Some(core.lock().acquire_read()),
		}
	}

	pub(crate) fn mode(&self) -> AccessMode {
		self.mode
	}

	/// Fails unless this scope may mutate from the calling thread.
	pub(crate) fn check_writable(&self) -> Result<(), CollectionError> {
		ensure_writable(self.mode, self.core.lock())
	}

	pub(crate) fn change_owner(&self, thread: ThreadId) -> Result<(), CollectionError> {
		if let Some(reason) = self.mode.read_only_reason() {
			return Err(CollectionError::ReadOnly(reason));
		}
		self.core.lock().change_owner(thread)?;
		Ok(())
	}

	pub(crate) fn release(mut self) -> Result<(), CollectionError> {
		self.release_inner()
	}

	fn release_inner(&mut self) -> Result<(), CollectionError> {
		let Some(stamp) = self.stamp.take() else {
			return Ok(());
		};
		if stamp.is_read() {
			self.core.lock().release_read(stamp)?;
			return Ok(());
		}
		self.core.end_write(stamp)
	}
}

impl<S: Backing, R: Classify + Send + Sync + 'static> Drop for Scope<'_, S, R> {
	fn drop(&mut self) {
		if let Err(err) = self.release_inner() {
			tracing::error!(error = %err, mode = ?self.mode, "collection.scope_release_failed");
		}
	}
}
