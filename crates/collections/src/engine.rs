//! Lock, backing state and listener registry shared by every collection.
//!
//! # Protocol
//!
//! - Reads try an optimistic stamp first and fall back to a shared read lock
//!   when validation fails.
//! - Writes run inside a write scope. The outermost scope's release drains
//!   the pending records and dispatches them before the lock is released,
//!   including when the scope is left by a panic.
//!   Listeners that edit the collection reentrantly produce further records,
//!   which are drained and dispatched in a later round of the same release.
//! - The backing state sits in a [`RwLock`] held only for the duration of one
//!   edit or one read, never across user callbacks.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::RwLock;
use weft_sync::{Stamp, StampedLock};

use crate::change::{Change, ChangeAggregator, Classify};
use crate::listener::ListenerRegistry;
use crate::{CollectionError, DispatchConfig, config};

/// Storage a [`Core`] guards.
pub(crate) trait Backing: Send + Sync + 'static {
	fn len(&self) -> usize;
}

pub(crate) struct State<S, R> {
	pub(crate) data: S,
	mod_count: u64,
	pending: ChangeAggregator<R>,
}

impl<S, R: Classify> State<S, R> {
	pub(crate) fn record(&mut self, record: R) {
		self.pending.record(record);
	}

	/// Marks a structural edit, invalidating outstanding cursors.
	pub(crate) fn touch(&mut self) {
		self.mod_count = self.mod_count.wrapping_add(1);
	}
}

pub(crate) struct Core<S: Backing, R: Classify> {
	lock: StampedLock,
	state: RwLock<State<S, R>>,
	len: AtomicUsize,
	listeners: ListenerRegistry<Change<R>>,
	config: Option<DispatchConfig>,
}

impl<S, R> Core<S, R>
where
	S: Backing,
	R: Classify + Send + Sync + 'static,
{
	pub(crate) fn new(data: S, config: Option<DispatchConfig>) -> Self {
		let len = data.len();
		Self {
			lock: StampedLock::new(),
			state: RwLock::new(State {
				data,
				mod_count: 0,
				pending: ChangeAggregator::new(),
			}),
			len: AtomicUsize::new(len),
			listeners: ListenerRegistry::new(),
			config,
		}
	}

	pub(crate) fn lock(&self) -> &StampedLock {
		&self.lock
	}

	pub(crate) fn listeners(&self) -> &ListenerRegistry<Change<R>> {
		&self.listeners
	}

	pub(crate) fn len(&self) -> usize {
		if let Some(len) = self.lock.optimistic(|| self.len.load(Ordering::Acquire)) {
			return len;
		}
		self.read(|data| data.len())
	}

	pub(crate) fn mod_count(&self) -> u64 {
		self.read_state(|state| state.mod_count)
	}

	/// Runs `read` over the data, speculatively first.
	///
	/// `read` may run twice: once optimistically and again under a read lock
	/// if a writer intervened.
	pub(crate) fn read<V>(&self, read: impl Fn(&S) -> V) -> V {
		self.read_state(|state| read(&state.data))
	}

	fn read_state<V>(&self, read: impl Fn(&State<S, R>) -> V) -> V {
		if let Some(value) = self.lock.optimistic(|| read(&self.state.read_recursive())) {
			return value;
		}
		let stamp = self.lock.acquire_read();
		let value = read(&self.state.read_recursive());
		if let Err(err) = self.lock.release_read(stamp) {
			tracing::error!(error = %err, "collection.read_release_failed");
		}
		value
	}

	/// Reads the data without touching the stamped lock.
	///
	/// Only meaningful while the caller holds the write lock.
	pub(crate) fn inspect<V>(&self, read: impl FnOnce(&S) -> V) -> V {
		read(&self.state.read_recursive().data)
	}

	/// Applies one edit to the backing state. Must run inside [`Self::write_scope`].
	pub(crate) fn mutate<V>(&self, edit: impl FnOnce(&mut State<S, R>) -> Result<V, CollectionError>) -> Result<V, CollectionError> {
		let mut state = self.state.write();
		let result = edit(&mut state);
		self.len.store(state.data.len(), Ordering::Release);
		result
	}

	/// Runs `body` holding the write lock, acquiring it reentrantly if the
	/// thread already owns it.
	///
	/// The stamp is released on every exit path. If `body` panics, the records
	/// it made so far are still flushed before the panic continues.
	pub(crate) fn write_scope<V>(&self, body: impl FnOnce() -> Result<V, CollectionError>) -> Result<V, CollectionError> {
		let stamp = WriteStamp::acquire(self)?;
		let result = body();
		let released = stamp.release();
		let value = result?;
		released?;
		Ok(value)
	}

	/// Single edit in its own write scope.
	pub(crate) fn write<V>(&self, edit: impl FnOnce(&mut State<S, R>) -> Result<V, CollectionError>) -> Result<V, CollectionError> {
		self.write_scope(|| self.mutate(edit))
	}

	/// Releases a write stamp, flushing first if it is the outermost one.
	pub(crate) fn end_write(&self, stamp: Stamp) -> Result<(), CollectionError> {
		if stamp.is_outermost_write() {
			if thread::panicking() {
				tracing::warn!(pending = self.state.read_recursive().pending.len(), "collection.flush_on_unwind");
			}
			self.flush();
		}
		self.lock.release_write(stamp)?;
		Ok(())
	}

	fn flush(&self) {
		// An edit that panicked part way may have skipped the mirror update.
		self.len.store(self.state.read_recursive().data.len(), Ordering::Release);
		let mut rounds = 0u32;
		loop {
			let change = self.state.write().pending.finish();
			let Some(change) = change else {
				break;
			};
			rounds += 1;
			tracing::trace!(records = change.len(), groups = change.group_count(), round = rounds, "collection.flush");
			let settings = self.config.unwrap_or_else(|| *config::global());
			self.listeners.dispatch(Arc::new(change), &settings);
		}
	}
}

/// Write stamp owned by one [`Core::write_scope`] call.
struct WriteStamp<'a, S, R>
where
	S: Backing,
	R: Classify + Send + Sync + 'static,
{
	core: &'a Core<S, R>,
	stamp: Option<Stamp>,
}

impl<'a, S, R> WriteStamp<'a, S, R>
where
	S: Backing,
	R: Classify + Send + Sync + 'static,
{
	fn acquire(core: &'a Core<S, R>) -> Result<Self, CollectionError> {
		let stamp = core.lock.acquire_write()?;
		Ok(Self { core, stamp: Some(stamp) })
	}

	fn release(mut self) -> Result<(), CollectionError> {
		match self.stamp.take() {
			Some(stamp) => self.core.end_write(stamp),
			None => Ok(()),
		}
	}
}

impl<S, R> Drop for WriteStamp<'_, S, R>
where
	S: Backing,
	R: Classify + Send + Sync + 'static,
{
	fn drop(&mut self) {
		let Some(stamp) = self.stamp.take() else {
			return;
		};
		if let Err(err) = self.core.end_write(stamp) {
			tracing::error!(error = %err, "collection.write_release_failed");
		}
	}
}

impl<S: Backing, R: Classify> fmt::Debug for Core<S, R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Core")
			.field("lock", &self.lock)
			.field("len", &self.len.load(Ordering::Relaxed))
			.field("listeners", &self.listeners)
			.finish_non_exhaustive()
	}
}
