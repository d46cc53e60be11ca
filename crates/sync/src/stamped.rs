//! Reentrant stamped read/write lock.
//!
//! # Role
//!
//! [`StampedLock`] serialises structural mutation of a collection while
//! letting readers proceed concurrently. It carries no data of its own: the
//! caller protects its state by only touching it while holding a suitable
//! stamp.
//!
//! # Modes
//!
//! - **Read**: shared; blocks only while another thread owns the write lock.
//! - **Write**: exclusive and reentrant for the owning thread. Nested
//!   acquisitions return [`Stamp::ReentrantWrite`] and only adjust the depth.
//! - **Optimistic**: never blocks. The returned stamp is checked afterwards
//!   with [`StampedLock::validate`]; on failure the caller must re-read under
//!   a real read lock.
//!
//! # Invariants
//!
//! - At most one thread owns the write lock, and no thread holds a read lock
//!   while it is owned (the owner's own reads are reentrant and uncounted).
//! - `version` is odd exactly while the write lock is held, so an optimistic
//!   stamp survives validation only if no write was acquired or released in
//!   between.
//! - The lock becomes free only when the write depth returns to zero.
//!
//! # Owner transfer
//!
//! [`StampedLock::change_owner`] reassigns the recorded write owner without
//! releasing the lock. Nothing stops the previous owner from continuing to
//! act after the transfer; callers must ensure only one logical owner is
//! active at a time.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering, fence};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use crate::LockError;

/// Token returned by every acquisition and handed back on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a stamp must be handed back to the lock that issued it"]
pub enum Stamp {
	/// No lock is held; an optimistic read was refused.
	None,
	/// Speculative read at the given version.
	Optimistic(u64),
	/// Shared read lock held by `holder`.
	Read { holder: ThreadId },
	/// Read requested by the thread that owns the write lock.
	ReentrantRead,
	/// Outermost write acquisition at the given version.
	Write(u64),
	/// Nested write acquisition by the owning thread.
	ReentrantWrite,
}

impl Stamp {
	/// Returns true for stamps that must be released with [`StampedLock::release_read`].
	pub const fn is_read(&self) -> bool {
		matches!(self, Self::Read { .. } | Self::ReentrantRead)
	}

	/// Returns true for stamps that must be released with [`StampedLock::release_write`].
	pub const fn is_write(&self) -> bool {
		matches!(self, Self::Write(_) | Self::ReentrantWrite)
	}

	/// Returns true for the stamp whose release frees the write lock.
	pub const fn is_outermost_write(&self) -> bool {
		matches!(self, Self::Write(_))
	}

	/// Returns true for speculative stamps.
	pub const fn is_optimistic(&self) -> bool {
		matches!(self, Self::Optimistic(_))
	}
}

#[derive(Debug, Default)]
struct LockState {
	owner: Option<ThreadId>,
	depth: u32,
	readers: FxHashMap<ThreadId, u32>,
	reader_count: usize,
}

/// Reentrant read/write lock with optimistic reads and explicit owner transfer.
///
/// There is no fairness guarantee: a steady stream of readers can starve a
/// waiting writer.
pub struct StampedLock {
	state: Mutex<LockState>,
	released: Condvar,
	version: AtomicU64,
}

impl Default for StampedLock {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for StampedLock {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("StampedLock")
			.field("owner", &state.owner)
			.field("depth", &state.depth)
			.field("readers", &state.reader_count)
			.field("version", &self.version.load(Ordering::Relaxed))
			.finish()
	}
}

impl StampedLock {
	/// Creates an unlocked lock.
	pub fn new() -> Self {
		Self {
			state: Mutex::new(LockState::default()),
			released: Condvar::new(),
			version: AtomicU64::new(0),
		}
	}

	/// Acquires a shared read lock, blocking while another thread owns the write lock.
	///
	/// The owner of the write lock gets [`Stamp::ReentrantRead`] immediately.
	pub fn acquire_read(&self) -> Stamp {
		let me = thread::current().id();
		let mut state = self.state.lock();
		if state.owner == Some(me) {
			return Stamp::ReentrantRead;
		}

		while state.owner.is_some() {
			self.released.wait(&mut state);
		}

		*state.readers.entry(me).or_insert(0) += 1;
		state.reader_count += 1;
		Stamp::Read { holder: me }
	}

	/// Acquires a read lock without blocking, returning `None` while a writer holds the lock.
	pub fn try_acquire_read(&self) -> Option<Stamp> {
		let me = thread::current().id();
		let mut state = self.state.lock();
		match state.owner {
			Some(owner) if owner == me => Some(Stamp::ReentrantRead),
			Some(_) => None,
			None => {
				*state.readers.entry(me).or_insert(0) += 1;
				state.reader_count += 1;
				Some(Stamp::Read { holder: me })
			}
		}
	}

	/// Returns a speculative stamp without blocking.
	///
	/// Returns [`Stamp::None`] while the write lock is held; such a stamp never validates.
	pub fn try_optimistic_read(&self) -> Stamp {
		let version = self.version.load(Ordering::Acquire);
		if version & 1 == 1 { Stamp::None } else { Stamp::Optimistic(version) }
	}

	/// Returns true if no write was acquired or released since `stamp` was issued.
	///
	/// Held read and write stamps are always valid; [`Stamp::None`] never is.
	pub fn validate(&self, stamp: Stamp) -> bool {
		match stamp {
			Stamp::None => false,
			Stamp::Optimistic(version) => {
				fence(Ordering::Acquire);
				self.version.load(Ordering::Relaxed) == version
			}
			_ => true,
		}
	}

	/// Runs `read` speculatively and returns its result only if the stamp still validates.
	///
	/// `read` may observe state that a concurrent writer is changing, so it
	/// must only touch data that is safe to read racily (atomics, snapshots).
	pub fn optimistic<R>(&self, read: impl FnOnce() -> R) -> Option<R> {
		let stamp = self.try_optimistic_read();
		if !stamp.is_optimistic() {
			return None;
		}
		let value = read();
		self.validate(stamp).then_some(value)
	}

	/// Acquires the write lock.
	///
	/// Blocks until no readers and no other writer hold the lock. If the
	/// calling thread already owns it, the depth is incremented and
	/// [`Stamp::ReentrantWrite`] is returned without blocking.
	///
	/// # Errors
	///
	/// [`LockError::Upgrade`] if the calling thread holds a read lock.
	pub fn acquire_write(&self) -> Result<Stamp, LockError> {
		let me = thread::current().id();
		let mut state = self.state.lock();
		if state.owner == Some(me) {
			state.depth += 1;
			return Ok(Stamp::ReentrantWrite);
		}

		if state.readers.contains_key(&me) {
			return Err(LockError::Upgrade { thread: me });
		}

		while state.owner.is_some() || state.reader_count > 0 {
			self.released.wait(&mut state);
		}

		Ok(self.take_write(&mut state, me))
	}

	/// Acquires the write lock without blocking.
	///
	/// Returns `Ok(None)` if another thread or any reader holds the lock.
	///
	/// # Errors
	///
	/// [`LockError::Upgrade`] if the calling thread holds a read lock.
	pub fn try_acquire_write(&self) -> Result<Option<Stamp>, LockError> {
		let me = thread::current().id();
		let mut state = self.state.lock();
		if state.owner == Some(me) {
			state.depth += 1;
			return Ok(Some(Stamp::ReentrantWrite));
		}

		if state.readers.contains_key(&me) {
			return Err(LockError::Upgrade { thread: me });
		}

		if state.owner.is_some() || state.reader_count > 0 {
			return Ok(None);
		}

		Ok(Some(self.take_write(&mut state, me)))
	}

	fn take_write(&self, state: &mut LockState, owner: ThreadId) -> Stamp {
		state.owner = Some(owner);
		state.depth = 1;
		let version = self.version.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
		fence(Ordering::Release);
		Stamp::Write(version)
	}

	/// Releases a read stamp.
	///
	/// # Errors
	///
	/// [`LockError::Release`] if `stamp` is not a read stamp held on this lock.
	pub fn release_read(&self, stamp: Stamp) -> Result<(), LockError> {
		match stamp {
			Stamp::ReentrantRead => Ok(()),
			Stamp::Read { holder } => {
				let mut state = self.state.lock();
				let Some(count) = state.readers.get_mut(&holder) else {
					return Err(LockError::Release {
						reason: "read stamp holder does not hold a read lock",
					});
				};
				*count -= 1;
				if *count == 0 {
					state.readers.remove(&holder);
				}
				state.reader_count -= 1;
				if state.reader_count == 0 {
					self.released.notify_all();
				}
				Ok(())
			}
			_ => Err(LockError::Release {
				reason: "not a read stamp",
			}),
		}
	}

	/// Releases a write stamp.
	///
	/// A reentrant stamp only decrements the depth. The outermost stamp frees
	/// the lock and wakes waiters. Release is not tied to the calling thread,
	/// so a lock handed over with [`Self::change_owner`] is released by its new owner.
	///
	/// # Errors
	///
	/// [`LockError::Release`] if the stamp does not match the current depth or version.
	pub fn release_write(&self, stamp: Stamp) -> Result<(), LockError> {
		let mut state = self.state.lock();
		match stamp {
			Stamp::ReentrantWrite => {
				if state.depth <= 1 {
					return Err(LockError::Release {
						reason: "reentrant write stamp released at the outermost depth",
					});
				}
				state.depth -= 1;
				Ok(())
			}
			Stamp::Write(version) => {
				if state.owner.is_none() {
					return Err(LockError::Release {
						reason: "write lock is not held",
					});
				}
				if state.depth != 1 {
					return Err(LockError::Release {
						reason: "outermost write stamp released before nested acquisitions",
					});
				}
				if self.version.load(Ordering::Relaxed) != version {
					return Err(LockError::Release {
						reason: "stale write stamp",
					});
				}
				state.owner = None;
				state.depth = 0;
				self.version.fetch_add(1, Ordering::Release);
				self.released.notify_all();
				Ok(())
			}
			_ => Err(LockError::Release {
				reason: "not a write stamp",
			}),
		}
	}

	/// Makes `new_owner` the recorded owner of the write lock without releasing it.
	///
	/// The new owner inherits the current depth and becomes responsible for
	/// the outstanding releases. The lock does not stop the previous owner
	/// from acting afterwards.
	///
	/// # Errors
	///
	/// [`LockError::NotOwner`] if the calling thread does not own the write lock.
	pub fn change_owner(&self, new_owner: ThreadId) -> Result<(), LockError> {
		let me = thread::current().id();
		let mut state = self.state.lock();
		if state.owner != Some(me) {
			return Err(LockError::NotOwner {
				thread: me,
				owner: state.owner,
			});
		}
		state.owner = Some(new_owner);
		tracing::trace!(from = ?me, to = ?new_owner, depth = state.depth, "lock.change_owner");
		Ok(())
	}

	/// Returns true if any thread owns the write lock.
	pub fn is_write_locked(&self) -> bool {
		self.state.lock().owner.is_some()
	}

	/// Returns true if the calling thread owns the write lock.
	pub fn is_write_locked_by_current_thread(&self) -> bool {
		self.state.lock().owner == Some(thread::current().id())
	}

	/// Returns true if the calling thread holds a (non-reentrant) read lock.
	pub fn is_read_locked_by_current_thread(&self) -> bool {
		self.state.lock().readers.contains_key(&thread::current().id())
	}

	/// Current write depth; zero when the write lock is free.
	pub fn write_depth(&self) -> u32 {
		self.state.lock().depth
	}

	/// Number of outstanding read locks across all threads.
	pub fn reader_count(&self) -> usize {
		self.state.lock().reader_count
	}

	/// Thread recorded as the write owner.
	pub fn owner(&self) -> Option<ThreadId> {
		self.state.lock().owner
	}
}
