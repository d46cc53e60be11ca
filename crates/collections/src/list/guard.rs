use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::thread::ThreadId;

use crate::access::{LockedCollection, Scope};
use crate::change::ChangeRecord;
use crate::list::{ListCursor, ListData, ObservableList, SubList};
use crate::{AccessMode, CollectionError};

/// Scoped access to an [`ObservableList`].
///
/// A writable guard batches every edit made through it (or by the owning
/// thread directly on the list) into one notification, delivered when the
/// guard is dropped or [released](LockedCollection::release). A guard dropped
/// by a panic still delivers the edits made before the panic.
pub struct LockedList<'a, T: Send + Sync + 'static> {
	list: &'a ObservableList<T>,
	scope: Scope<'a, ListData<T>, ChangeRecord<T>>,
}

impl<'a, T: Clone + Send + Sync + 'static> LockedList<'a, T> {
	pub(super) fn new(list: &'a ObservableList<T>, scope: Scope<'a, ListData<T>, ChangeRecord<T>>) -> Self {
		Self { list, scope }
	}

	pub fn list(&self) -> &'a ObservableList<T> {
		self.list
	}

	pub fn len(&self) -> usize {
		self.list.len()
	}

	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}

	pub fn get(&self, index: usize) -> Result<T, CollectionError> {
		self.list.get(index)
	}

	pub fn to_vec(&self) -> Vec<T> {
		self.list.to_vec()
	}

	/// Cursor positioned before the first element.
	///
	/// # Errors
	///
	/// [`CollectionError::LockState`] if this guard is writable but the calling
	/// thread does not own the write lock.
	pub fn iter(&self) -> Result<ListCursor<'_, T>, CollectionError> {
		self.cursor_at(0)
	}

	/// Cursor positioned before `index`.
	pub fn cursor_at(&self, index: usize) -> Result<ListCursor<'_, T>, CollectionError> {
		let len = self.list.len();
		if index > len {
			return Err(CollectionError::IndexOutOfRange { index, len });
		}
		ListCursor::new(self.list, self.scope.mode(), None, 0, index)
	}

	/// View over `range`, valid only while this guard lives.
	pub fn sub_list(&self, range: Range<usize>) -> Result<SubList<'_, T>, CollectionError> {
		let len = self.list.len();
		if range.start > range.end || range.end > len {
			return Err(CollectionError::IndexOutOfRange {
				index: range.end.max(range.start),
				len,
			});
		}
		Ok(SubList::new(self.list, self.scope.mode(), range))
	}

	pub fn push(&self, value: T) -> Result<(), CollectionError> {
		self.scope.check_writable()?;
		self.list.push(value)
	}

	pub fn insert(&self, index: usize, value: T) -> Result<(), CollectionError> {
		self.scope.check_writable()?;
		self.list.insert(index, value)
	}

	pub fn extend(&self, items: impl IntoIterator<Item = T>) -> Result<(), CollectionError> {
		self.scope.check_writable()?;
		self.list.extend(items)
	}

	pub fn insert_all(&self, index: usize, items: impl IntoIterator<Item = T>) -> Result<(), CollectionError> {
		self.scope.check_writable()?;
		self.list.insert_all(index, items)
	}

	pub fn set(&self, index: usize, value: T) -> Result<T, CollectionError> {
		self.scope.check_writable()?;
		self.list.set(index, value)
	}

	pub fn remove_at(&self, index: usize) -> Result<T, CollectionError> {
		self.scope.check_writable()?;
		self.list.remove_at(index)
	}

	pub fn remove_range(&self, range: Range<usize>) -> Result<(), CollectionError> {
		self.scope.check_writable()?;
		self.list.remove_range(range)
	}

	pub fn clear(&self) -> Result<(), CollectionError> {
		self.scope.check_writable()?;
		self.list.clear()
	}

	pub fn retain(&self, keep: impl FnMut(&T) -> bool) -> Result<bool, CollectionError> {
		self.scope.check_writable()?;
		self.list.retain(keep)
	}

	pub fn set_all(&self, items: impl IntoIterator<Item = T>) -> Result<(), CollectionError> {
		self.scope.check_writable()?;
		self.list.set_all(items)
	}

	pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> Ordering) -> Result<(), CollectionError> {
		self.scope.check_writable()?;
		self.list.sort_by(compare)
	}
}

impl<T: Clone + PartialEq + Send + Sync + 'static> LockedList<'_, T> {
	pub fn contains(&self, value: &T) -> bool {
		self.list.contains(value)
	}

	pub fn index_of(&self, value: &T) -> Option<usize> {
		self.list.index_of(value)
	}

	pub fn remove(&self, value: &T) -> Result<bool, CollectionError> {
		self.scope.check_writable()?;
		self.list.remove(value)
	}

	pub fn remove_all(&self, values: &[T]) -> Result<bool, CollectionError> {
		self.scope.check_writable()?;
		self.list.remove_all(values)
	}

	pub fn retain_all(&self, values: &[T]) -> Result<bool, CollectionError> {
		self.scope.check_writable()?;
		self.list.retain_all(values)
	}
}

impl<T: Clone + Send + Sync + 'static> LockedCollection for LockedList<'_, T> {
	fn mode(&self) -> AccessMode {
		self.scope.mode()
	}

	fn change_owner(&self, thread: ThreadId) -> Result<(), CollectionError> {
		self.scope.change_owner(thread)
	}

	fn release(self) -> Result<(), CollectionError> {
		self.scope.release()
	}
}

impl<T: Send + Sync + 'static> fmt::Debug for LockedList<'_, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LockedList").field("mode", &self.scope.mode()).finish_non_exhaustive()
	}
}
