use crate::access::ensure_writable;
use crate::list::{ObservableList, SubList};
use crate::{AccessMode, CollectionError};

/// Bidirectional cursor over a locked list or sub-list.
///
/// The cursor remembers the list's modification count. Any structural edit
/// not made through the cursor makes the next access fail with
/// [`CollectionError::ConcurrentModification`], after which iteration ends.
pub struct ListCursor<'g, T: Send + Sync + 'static> {
	list: &'g ObservableList<T>,
	mode: AccessMode,
	sub: Option<&'g SubList<'g, T>>,
	from: usize,
	next: usize,
	last: Option<usize>,
	expected_mod: u64,
	failed: bool,
}

impl<'g, T: Clone + Send + Sync + 'static> ListCursor<'g, T> {
	pub(crate) fn new(list: &'g ObservableList<T>, mode: AccessMode, sub: Option<&'g SubList<'g, T>>, from: usize, start: usize) -> Result<Self, CollectionError> {
		if mode == AccessMode::Writable && !list.is_write_locked_by_current_thread() {
			return Err(CollectionError::LockState);
		}
		Ok(Self {
			list,
			mode,
			sub,
			from,
			next: start,
			last: None,
			expected_mod: list.mod_count(),
			failed: false,
		})
	}

	fn end(&self) -> usize {
		match self.sub {
			Some(sub) => sub.end(),
			None => self.list.len(),
		}
	}

	fn check(&self) -> Result<(), CollectionError> {
		if self.list.mod_count() != self.expected_mod {
			return Err(CollectionError::ConcurrentModification);
		}
		Ok(())
	}

	fn resync(&mut self, delta: isize) {
		self.expected_mod = self.list.mod_count();
		if let Some(sub) = self.sub {
			sub.resync(self.expected_mod, delta);
		}
	}

	pub fn has_next(&self) -> bool {
		self.next < self.end()
	}

	pub fn has_previous(&self) -> bool {
		self.next > self.from
	}

	/// Position of the element `next` would return, relative to the cursor's range.
	pub fn next_index(&self) -> usize {
		self.next - self.from
	}

	/// Steps backwards, returning the element passed over.
	pub fn previous(&mut self) -> Option<Result<T, CollectionError>> {
		if self.failed {
			return None;
		}
		if let Err(err) = self.check() {
			self.failed = true;
			return Some(Err(err));
		}
		if !self.has_previous() {
			return None;
		}
		let index = self.next - 1;
		Some(self.list.get(index).inspect(|_| {
			self.next = index;
			self.last = Some(index);
		}))
	}

	/// Removes the element last returned by `next` or `previous`.
	pub fn remove(&mut self) -> Result<T, CollectionError> {
		ensure_writable(self.mode, self.list.inner.core.lock())?;
		self.check()?;
		let index = self.last.take().ok_or(CollectionError::IllegalCursorState)?;
		let removed = self.list.remove_at(index)?;
		if index < self.next {
			self.next -= 1;
		}
		self.resync(-1);
		Ok(removed)
	}

	/// Replaces the element last returned by `next` or `previous`.
	pub fn set(&mut self, value: T) -> Result<T, CollectionError> {
		ensure_writable(self.mode, self.list.inner.core.lock())?;
		self.check()?;
		let index = self.last.ok_or(CollectionError::IllegalCursorState)?;
		let old = self.list.set(index, value)?;
		self.resync(0);
		Ok(old)
	}

	/// Inserts before the element `next` would return.
	pub fn insert(&mut self, value: T) -> Result<(), CollectionError> {
		ensure_writable(self.mode, self.list.inner.core.lock())?;
		self.check()?;
		self.list.insert(self.next, value)?;
		self.next += 1;
		self.last = None;
		self.resync(1);
		Ok(())
	}
}

impl<T: Clone + Send + Sync + 'static> Iterator for ListCursor<'_, T> {
	type Item = Result<T, CollectionError>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.failed {
			return None;
		}
		if let Err(err) = self.check() {
			self.failed = true;
			return Some(Err(err));
		}
		if !self.has_next() {
			return None;
		}
		let index = self.next;
		let item = self.list.get(index);
		match &item {
			Ok(_) => {
				self.next = index + 1;
				self.last = Some(index);
			}
			Err(_) => self.failed = true,
		}
		Some(item)
	}
}
