use std::cell::Cell;
use std::ops::Range;

use crate::access::ensure_writable;
use crate::list::{ListCursor, ObservableList};
use crate::{AccessMode, CollectionError};

/// Window onto `from..to` of a locked list.
///
/// Only obtainable from a [`crate::LockedList`], so it cannot outlive the
/// scope. Edits through the window adjust its end; structural edits made
/// elsewhere invalidate it.
pub struct SubList<'g, T: Send + Sync + 'static> {
	list: &'g ObservableList<T>,
	mode: AccessMode,
	from: usize,
	to: Cell<usize>,
	expected_mod: Cell<u64>,
}

impl<'g, T: Clone + Send + Sync + 'static> SubList<'g, T> {
	pub(super) fn new(list: &'g ObservableList<T>, mode: AccessMode, range: Range<usize>) -> Self {
		Self {
			list,
			mode,
			from: range.start,
			to: Cell::new(range.end),
			expected_mod: Cell::new(list.mod_count()),
		}
	}

	pub(super) fn end(&self) -> usize {
		self.to.get()
	}

	pub(super) fn resync(&self, mod_count: u64, delta: isize) {
		self.expected_mod.set(mod_count);
		self.to.set(self.to.get().saturating_add_signed(delta));
	}

	fn check(&self) -> Result<(), CollectionError> {
		if self.list.mod_count() != self.expected_mod.get() {
			return Err(CollectionError::ConcurrentModification);
		}
		Ok(())
	}

	fn check_writable(&self) -> Result<(), CollectionError> {
		ensure_writable(self.mode, self.list.inner.core.lock())?;
		self.check()
	}

	fn absolute(&self, index: usize, inclusive: bool) -> Result<usize, CollectionError> {
		let len = self.len();
		let valid = if inclusive { index <= len } else { index < len };
		if !valid {
			return Err(CollectionError::IndexOutOfRange { index, len });
		}
		Ok(self.from + index)
	}

	pub fn len(&self) -> usize {
		self.to.get() - self.from
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Result<T, CollectionError> {
		self.check()?;
		self.list.get(self.absolute(index, false)?)
	}

	pub fn to_vec(&self) -> Result<Vec<T>, CollectionError> {
		self.check()?;
		let (from, to) = (self.from, self.to.get());
		Ok(self.list.inner.core.read(|data| data.items[from..to].to_vec()))
	}

	pub fn set(&self, index: usize, value: T) -> Result<T, CollectionError> {
		self.check_writable()?;
		let old = self.list.set(self.absolute(index, false)?, value)?;
		self.resync(self.list.mod_count(), 0);
		Ok(old)
	}

	pub fn push(&self, value: T) -> Result<(), CollectionError> {
		self.insert(self.len(), value)
	}

	pub fn insert(&self, index: usize, value: T) -> Result<(), CollectionError> {
		self.check_writable()?;
		self.list.insert(self.absolute(index, true)?, value)?;
		self.resync(self.list.mod_count(), 1);
		Ok(())
	}

	pub fn remove_at(&self, index: usize) -> Result<T, CollectionError> {
		self.check_writable()?;
		let removed = self.list.remove_at(self.absolute(index, false)?)?;
		self.resync(self.list.mod_count(), -1);
		Ok(removed)
	}

	/// Removes the whole window from the parent as one `Remove` record.
	pub fn clear(&self) -> Result<(), CollectionError> {
		self.check_writable()?;
		let len = self.len();
		if len == 0 {
			return Ok(());
		}
		self.list.remove_range(self.from..self.to.get())?;
		self.resync(self.list.mod_count(), -(len as isize));
		Ok(())
	}

	pub fn iter(&self) -> Result<ListCursor<'_, T>, CollectionError> {
		self.check()?;
		ListCursor::new(self.list, self.mode, Some(self), self.from, self.from)
	}
}
