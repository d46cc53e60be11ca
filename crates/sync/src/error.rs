use std::thread::ThreadId;

/// Contract violations reported by [`crate::StampedLock`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
	/// The calling thread holds a read lock and asked for the write lock.
	#[error("cannot acquire the write lock while holding a read lock on thread {thread:?}")]
	Upgrade { thread: ThreadId },

	/// An ownership operation was attempted by a thread that does not own the write lock.
	#[error("thread {thread:?} does not own the write lock (owner: {owner:?})")]
	NotOwner { thread: ThreadId, owner: Option<ThreadId> },

	/// A stamp was released that does not match the lock state.
	#[error("invalid stamp release: {reason}")]
	Release { reason: &'static str },
}
