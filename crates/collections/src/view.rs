//! Read-only views over observable collections.
//!
//! A view shares the backing collection of the handle it was made from, so
//! it sees and reports every change, but exposes no mutation and no write
//! scope. [`ReadOnlyList::empty`] and [`ReadOnlySet::empty`] wrap a fresh
//! collection that nothing else holds, which therefore stays empty.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use weft_worker::Executor;

use crate::change::{ListChange, SetChange};
use crate::{CollectionError, ListenerId, ObservableCollection, ObservableList, ObservableSet};

/// List handle without mutation methods.
pub struct ReadOnlyList<T: Send + Sync + 'static> {
	list: ObservableList<T>,
}

impl<T: Clone + Send + Sync + 'static> ReadOnlyList<T> {
	pub fn empty() -> Self {
		Self { list: ObservableList::new() }
	}

	/// View over a list that only this view and its clones can reach.
	pub fn from_vec(items: Vec<T>) -> Self {
		Self {
			list: ObservableList::from_vec(items),
		}
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

	pub fn add_invalidation_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
		self.list.add_invalidation_listener(listener)
	}

	pub fn add_invalidation_listener_on(&self, executor: Arc<dyn Executor>, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
		self.list.add_invalidation_listener_on(executor, listener)
	}

	pub fn add_change_listener(&self, listener: impl Fn(&ListChange<T>) + Send + Sync + 'static) -> ListenerId {
		self.list.add_change_listener(listener)
	}

	pub fn add_change_listener_on(&self, executor: Arc<dyn Executor>, listener: impl Fn(&ListChange<T>) + Send + Sync + 'static) -> ListenerId {
		self.list.add_change_listener_on(executor, listener)
	}

	pub fn remove_listener(&self, id: ListenerId) -> bool {
		self.list.remove_listener(id)
	}
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ReadOnlyList<T> {
	pub fn contains(&self, value: &T) -> bool {
		self.list.contains(value)
	}

	pub fn index_of(&self, value: &T) -> Option<usize> {
		self.list.index_of(value)
	}
}

impl<T: Clone + Send + Sync + 'static> ObservableList<T> {
	/// View of this list that cannot mutate it.
	pub fn read_only(&self) -> ReadOnlyList<T> {
		ReadOnlyList { list: self.clone() }
	}
}

impl<T: Clone + Send + Sync + 'static> From<ObservableList<T>> for ReadOnlyList<T> {
	fn from(list: ObservableList<T>) -> Self {
		Self { list }
	}
}

impl<T: Clone + Send + Sync + 'static> Default for ReadOnlyList<T> {
	fn default() -> Self {
		Self::empty()
	}
}

impl<T: Send + Sync + 'static> Clone for ReadOnlyList<T> {
	fn clone(&self) -> Self {
		Self { list: self.list.clone() }
	}
}

impl<T: Clone + Send + Sync + 'static> ObservableCollection<T> for ReadOnlyList<T> {
	fn len(&self) -> usize {
		self.list.len()
	}

	fn snapshot(&self) -> Vec<T> {
		self.list.to_vec()
	}

	fn remove_listener(&self, id: ListenerId) -> bool {
		self.list.remove_listener(id)
	}
}

impl<T: Clone + PartialEq + Send + Sync + 'static> PartialEq for ReadOnlyList<T> {
	fn eq(&self, other: &Self) -> bool {
		self.list == other.list
	}
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> fmt::Debug for ReadOnlyList<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&self.list, f)
	}
}

/// Set handle without mutation methods.
pub struct ReadOnlySet<T: Send + Sync + 'static> {
	set: ObservableSet<T>,
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> ReadOnlySet<T> {
	pub fn empty() -> Self {
		Self { set: ObservableSet::new() }
	}

	/// View over a set that only this view and its clones can reach.
	pub fn of(items: impl IntoIterator<Item = T>) -> Self {
		Self { set: items.into_iter().collect() }
	}

	pub fn len(&self) -> usize {
		self.set.len()
	}

	pub fn is_empty(&self) -> bool {
		self.set.is_empty()
	}

	pub fn contains(&self, value: &T) -> bool {
		self.set.contains(value)
	}

	pub fn contains_all(&self, values: &[T]) -> bool {
		self.set.contains_all(values)
	}

	pub fn to_vec(&self) -> Vec<T> {
		self.set.to_vec()
	}

	pub fn add_invalidation_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
		self.set.add_invalidation_listener(listener)
	}

	pub fn add_invalidation_listener_on(&self, executor: Arc<dyn Executor>, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
		self.set.add_invalidation_listener_on(executor, listener)
	}

	pub fn add_change_listener(&self, listener: impl Fn(&SetChange<T>) + Send + Sync + 'static) -> ListenerId {
		self.set.add_change_listener(listener)
	}

	pub fn add_change_listener_on(&self, executor: Arc<dyn Executor>, listener: impl Fn(&SetChange<T>) + Send + Sync + 'static) -> ListenerId {
		self.set.add_change_listener_on(executor, listener)
	}

	pub fn remove_listener(&self, id: ListenerId) -> bool {
		self.set.remove_listener(id)
	}
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> ObservableSet<T> {
	/// View of this set that cannot mutate it.
	pub fn read_only(&self) -> ReadOnlySet<T> {
		ReadOnlySet { set: self.clone() }
	}
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> From<ObservableSet<T>> for ReadOnlySet<T> {
	fn from(set: ObservableSet<T>) -> Self {
		Self { set }
	}
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> Default for ReadOnlySet<T> {
	fn default() -> Self {
		Self::empty()
	}
}

impl<T: Send + Sync + 'static> Clone for ReadOnlySet<T> {
	fn clone(&self) -> Self {
		Self { set: self.set.clone() }
	}
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> ObservableCollection<T> for ReadOnlySet<T> {
	fn len(&self) -> usize {
		self.set.len()
	}

	fn snapshot(&self) -> Vec<T> {
		self.set.to_vec()
	}

	fn remove_listener(&self, id: ListenerId) -> bool {
		self.set.remove_listener(id)
	}
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> PartialEq for ReadOnlySet<T> {
	fn eq(&self, other: &Self) -> bool {
		self.set == other.set
	}
}

impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> fmt::Debug for ReadOnlySet<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&self.set, f)
	}
}
