//! Observable, thread-safe sequence.
//!
//! # Transactions
//!
//! Each mutating method runs in a write scope of its own, or joins the scope
//! the calling thread already holds. Records are flushed to listeners when
//! the outermost scope ends, so a [`LockedList`] obtained with
//! [`ObservableList::lock`] batches every edit made through it into one
//! notification.
//!
//! # Record granularity
//!
//! One call produces one record, except for the filtering operations
//! (`remove_all`, `retain_all`, `retain`), which record one `Remove` per
//! dropped element in removal order.

mod binding;
mod cursor;
mod guard;
#[cfg(test)]
mod invariants;
mod sublist;
#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, Weak};

use smallvec::SmallVec;
use weft_worker::{Executor, direct};

pub use self::cursor::ListCursor;
pub use self::guard::LockedList;
pub use self::sublist::SubList;
use crate::access::Scope;
use crate::change::{ChangeRecord, ListChange};
use crate::engine::{Backing, Core};
use crate::listener::{ListenerId, ListenerStats, RegistryShape};
use crate::observer::{Dependencies, Dependency, ElementObserver, Extractor, Notify};
use crate::{CollectionError, DispatchConfig, ObservableCollection};

/// Items plus, when observed, one subscription tag per item.
///
/// `tags` is either empty (no observer) or exactly as long as `items`.
pub(crate) struct ListData<T> {
	pub(crate) items: Vec<T>,
	pub(crate) tags: Vec<u64>,
}

impl<T: Send + Sync + 'static> Backing for ListData<T> {
	fn len(&self) -> usize {
		self.items.len()
	}
}

pub(crate) struct ListInner<T: Send + Sync + 'static> {
	pub(crate) core: Core<ListData<T>, ChangeRecord<T>>,
	observer: Option<ElementObserver<T>>,
}

impl<T: Clone + Send + Sync + 'static> ListInner<T> {
	fn tags_for(&self, count: usize) -> Vec<u64> {
		self.observer.as_ref().map_or_else(Vec::new, |o| o.allocate(count))
	}

	fn attach(&self, tags: &[u64], items: &[T]) {
		if let Some(observer) = &self.observer {
			for (tag, item) in tags.iter().zip(items) {
				observer.attach(*tag, item);
			}
		}
	}

	fn detach(&self, tags: Vec<u64>) {
		if tags.is_empty() {
			return;
		}
		if let Some(observer) = &self.observer {
			observer.detach(tags);
		}
	}

	/// Records an in-place update for every index carrying `tag`.
	fn element_updated(&self, tag: u64) {
		let result = self.core.write(|state| {
			let indices: SmallVec<[usize; 4]> = state
				.data
				.tags
				.iter()
				.enumerate()
				.filter(|(_, t)| **t == tag)
				.map(|(i, _)| i)
				.collect();
			for index in indices {
				state.record(ChangeRecord::Update { index });
			}
			Ok(())
		});
		if let Err(err) = result {
			tracing::warn!(tag, error = %err, "list.update_dropped");
		}
	}
}

/// Thread-safe list whose edits are delivered to listeners in batches.
///
/// Cloning yields another handle to the same list.
pub struct ObservableList<T: Send + Sync + 'static> {
	inner: Arc<ListInner<T>>,
}

impl<T: Send + Sync + 'static> Clone for ObservableList<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

/// Configures an [`ObservableList`] before construction.
pub struct ListBuilder<T> {
	items: Vec<T>,
	extractor: Option<Extractor<T>>,
	config: Option<DispatchConfig>,
}

impl<T: Clone + Send + Sync + 'static> ListBuilder<T> {
	/// Initial contents. No notification is emitted for them.
	pub fn items(mut self, items: impl IntoIterator<Item = T>) -> Self {
		self.items = items.into_iter().collect();
		self
	}

	/// Observes the dependencies `extractor` returns for each element.
	pub fn extractor<F, I>(mut self, extractor: F) -> Self
	where
		F: Fn(&T) -> I + Send + Sync + 'static,
		I: IntoIterator<Item = Arc<dyn Dependency>>,
	{
		let extractor: Extractor<T> = Arc::new(move |item: &T| -> Dependencies { extractor(item).into_iter().collect() });
		self.extractor = Some(extractor);
		self
	}

	/// Dispatch settings used instead of the process-wide ones.
	pub fn dispatch_config(mut self, config: DispatchConfig) -> Self {
		self.config = Some(config);
		self
	}

	pub fn build(self) -> ObservableList<T> {
		let Self { items, extractor, config } = self;
		let inner = Arc::new_cyclic(|weak: &Weak<ListInner<T>>| {
			let observer = extractor.map(|extractor| {
				let weak = weak.clone();
				let notify: Notify = Arc::new(move |tag| {
					if let Some(inner) = weak.upgrade() {
						inner.element_updated(tag);
					}
				});
				ElementObserver::new(extractor, notify)
			});
			let tags = match &observer {
				Some(observer) => {
					let tags = observer.allocate(items.len());
					for (tag, item) in tags.iter().zip(&items) {
						observer.attach(*tag, item);
					}
					tags
				}
				None => Vec::new(),
			};
			ListInner {
				core: Core::new(ListData { items, tags }, config),
				observer,
			}
		});
		ObservableList { inner }
	}
}

impl<T: Clone + Send + Sync + 'static> Default for ObservableList<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Clone + Send + Sync + 'static> ObservableList<T> {
	pub fn new() -> Self {
		Self::builder().build()
	}

	pub fn from_vec(items: Vec<T>) -> Self {
		Self::builder().items(items).build()
	}

	pub fn builder() -> ListBuilder<T> {
		ListBuilder {
			items: Vec::new(),
			extractor: None,
			config: None,
		}
	}

	/// Opens a write scope.
	///
	/// Returns an [`AccessMode::NestedReadOnly`](crate::AccessMode) guard if
	/// the calling thread already owns the write lock.
	///
	/// # Errors
	///
	/// [`CollectionError::Lock`] if the thread holds a read lock on this list.
	pub fn lock(&self) -> Result<LockedList<'_, T>, CollectionError> {
		Ok(LockedList::new(self, Scope::write(&self.inner.core)?))
	}

	/// Opens a read-only scope, blocking while another thread writes.
	pub fn lock_read_only(&self) -> LockedList<'_, T> {
		LockedList::new(self, Scope::read_only(&self.inner.core))
	}

	pub fn is_write_locked_by_current_thread(&self) -> bool {
		self.inner.core.lock().is_write_locked_by_current_thread()
	}

	pub fn len(&self) -> usize {
		self.inner.core.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Result<T, CollectionError> {
		self.inner.core.read(|data| {
			data.items.get(index).cloned().ok_or(CollectionError::IndexOutOfRange {
				index,
				len: data.items.len(),
			})
		})
	}

	pub fn to_vec(&self) -> Vec<T> {
		self.inner.core.read(|data| data.items.clone())
	}

	pub(crate) fn mod_count(&self) -> u64 {
		self.inner.core.mod_count()
	}

	pub fn push(&self, value: T) -> Result<(), CollectionError> {
		self.insert_many(None, vec![value])
	}

	pub fn insert(&self, index: usize, value: T) -> Result<(), CollectionError> {
		self.insert_many(Some(index), vec![value])
	}

	/// Appends every item as one `Insert` record.
	pub fn extend(&self, items: impl IntoIterator<Item = T>) -> Result<(), CollectionError> {
		self.insert_many(None, items.into_iter().collect())
	}

	/// Inserts every item at `index` as one `Insert` record.
	pub fn insert_all(&self, index: usize, items: impl IntoIterator<Item = T>) -> Result<(), CollectionError> {
		self.insert_many(Some(index), items.into_iter().collect())
	}

	/// Appends a snapshot of `other`, taken before this list is locked.
	pub fn add_all_from(&self, other: &dyn ObservableCollection<T>) -> Result<(), CollectionError> {
		let items = other.snapshot();
		self.extend(items)
	}

	fn insert_many(&self, at: Option<usize>, values: Vec<T>) -> Result<(), CollectionError> {
		let inner = &*self.inner;
		inner.core.write_scope(|| {
			let tags = inner.tags_for(values.len());
			let observed = if tags.is_empty() { Vec::new() } else { values.clone() };
			inner.core.mutate(|state| {
				let len = state.data.items.len();
				let index = at.unwrap_or(len);
				if index > len {
					return Err(CollectionError::IndexOutOfRange { index, len });
				}
				if values.is_empty() {
					return Ok(());
				}
				let range = index..index + values.len();
				state.data.items.splice(index..index, values.iter().cloned());
				if !tags.is_empty() {
					state.data.tags.splice(index..index, tags.iter().copied());
				}
				state.record(ChangeRecord::Insert { range, added: values });
				state.touch();
				Ok(())
			})?;
			inner.attach(&tags, &observed);
			Ok(())
		})
	}

	/// Replaces the element at `index`, returning the old one.
	pub fn set(&self, index: usize, value: T) -> Result<T, CollectionError> {
		let inner = &*self.inner;
		inner.core.write_scope(|| {
			let tags = inner.tags_for(1);
			let observed = if tags.is_empty() { Vec::new() } else { vec![value.clone()] };
			let (old, old_tag) = inner.core.mutate(|state| {
				let len = state.data.items.len();
				if index >= len {
					return Err(CollectionError::IndexOutOfRange { index, len });
				}
				let old = std::mem::replace(&mut state.data.items[index], value.clone());
				let old_tag = tags.first().map(|tag| std::mem::replace(&mut state.data.tags[index], *tag));
				state.record(ChangeRecord::Replace {
					index,
					old: old.clone(),
					new: value,
				});
				state.touch();
				Ok((old, old_tag))
			})?;
			inner.detach(old_tag.into_iter().collect());
			inner.attach(&tags, &observed);
			Ok(old)
		})
	}

	pub fn remove_at(&self, index: usize) -> Result<T, CollectionError> {
		self.inner.core.write_scope(|| {
			let len = self.inner.core.inspect(|data| data.items.len());
			if index >= len {
				return Err(CollectionError::IndexOutOfRange { index, len });
			}
			let mut removed = self.remove_span(index..index + 1)?;
			removed.pop().ok_or(CollectionError::IndexOutOfRange { index, len })
		})
	}

	/// Removes `range` as one `Remove` record.
	pub fn remove_range(&self, range: Range<usize>) -> Result<(), CollectionError> {
		self.remove_span(range).map(drop)
	}

	/// Removes everything as one `Remove` record. No record for an empty list.
	pub fn clear(&self) -> Result<(), CollectionError> {
		self.inner.core.write_scope(|| {
			let len = self.inner.core.inspect(|data| data.items.len());
			self.remove_span(0..len).map(drop)
		})
	}

	fn remove_span(&self, range: Range<usize>) -> Result<Vec<T>, CollectionError> {
		let inner = &*self.inner;
		inner.core.write_scope(|| {
			let (removed, tags) = inner.core.mutate(|state| {
				let len = state.data.items.len();
				if range.start > range.end || range.end > len {
					return Err(CollectionError::IndexOutOfRange {
						index: range.end.max(range.start),
						len,
					});
				}
				if range.is_empty() {
					return Ok((Vec::new(), Vec::new()));
				}
				let removed: Vec<T> = state.data.items.drain(range.clone()).collect();
				let tags: Vec<u64> = if state.data.tags.is_empty() {
					Vec::new()
				} else {
					state.data.tags.drain(range.clone()).collect()
				};
				state.record(ChangeRecord::Remove {
					range,
					removed: removed.clone(),
				});
				state.touch();
				Ok((removed, tags))
			})?;
			inner.detach(tags);
			Ok(removed)
		})
	}

	/// Keeps only the elements `keep` accepts. Returns true if anything was removed.
	///
	/// `keep` sees a snapshot and runs without any internal lock held.
	pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> Result<bool, CollectionError> {
		self.inner.core.write_scope(|| {
			let items = self.inner.core.inspect(|data| data.items.clone());
			let doomed: Vec<usize> = items.iter().enumerate().filter(|(_, item)| !keep(item)).map(|(i, _)| i).collect();
			for (shift, index) in doomed.iter().enumerate() {
				self.remove_span(index - shift..index - shift + 1)?;
			}
			Ok(!doomed.is_empty())
		})
	}

	/// Replaces the contents with `items`: one `Remove` then one `Insert`.
	pub fn set_all(&self, items: impl IntoIterator<Item = T>) -> Result<(), CollectionError> {
		let items: Vec<T> = items.into_iter().collect();
		self.inner.core.write_scope(|| {
			self.clear()?;
			self.insert_many(None, items)
		})
	}

	/// Stable sort recorded as one `Permutation`. No record if already sorted.
	pub fn sort_by(&self, mut compare: impl FnMut(&T, &T) -> Ordering) -> Result<(), CollectionError> {
		let inner = &*self.inner;
		inner.core.write_scope(|| {
			let items = inner.core.inspect(|data| data.items.clone());
			let mut order: Vec<usize> = (0..items.len()).collect();
			order.sort_by(|&a, &b| compare(&items[a], &items[b]));
			if order.iter().enumerate().all(|(new, &old)| new == old) {
				return Ok(());
			}

			let mut mapping = vec![0; order.len()];
			for (new, &old) in order.iter().enumerate() {
				mapping[old] = new;
			}

			inner.core.mutate(|state| {
				state.data.items = order.iter().map(|&old| items[old].clone()).collect();
				if !state.data.tags.is_empty() {
					let tags: Vec<u64> = order.iter().map(|&old| state.data.tags[old]).collect();
					state.data.tags = tags;
				}
				state.record(ChangeRecord::Permutation {
					range: 0..order.len(),
					mapping,
				});
				state.touch();
				Ok(())
			})
		})
	}

	/// Moves the element at `range.start + i` to `mapping[i]`, recorded as one
	/// `Permutation`.
	fn permute(&self, range: Range<usize>, mapping: &[usize]) -> Result<(), CollectionError> {
		self.inner.core.write(|state| {
			let len = state.data.items.len();
			if range.start > range.end || range.end > len {
				return Err(CollectionError::IndexOutOfRange {
					index: range.end.max(range.start),
					len,
				});
			}
			let mut seen = vec![false; range.len()];
			let bijective = mapping.len() == range.len()
				&& mapping
					.iter()
					.all(|&to| range.contains(&to) && !std::mem::replace(&mut seen[to - range.start], true));
			if !bijective {
				return Err(CollectionError::InvalidPermutation {
					start: range.start,
					end: range.end,
				});
			}
			if range.is_empty() {
				return Ok(());
			}

			let moved: Vec<T> = state.data.items[range.clone()].to_vec();
			for (offset, item) in moved.into_iter().enumerate() {
				state.data.items[mapping[offset]] = item;
			}
			if !state.data.tags.is_empty() {
				let tags: Vec<u64> = state.data.tags[range.clone()].to_vec();
				for (offset, tag) in tags.into_iter().enumerate() {
					state.data.tags[mapping[offset]] = tag;
				}
			}
			state.record(ChangeRecord::Permutation {
				range,
				mapping: mapping.to_vec(),
			});
			state.touch();
			Ok(())
		})
	}

	/// Records an in-place update of the element at `index`.
	fn mark_updated(&self, index: usize) -> Result<(), CollectionError> {
		self.inner.core.write(|state| {
			let len = state.data.items.len();
			if index >= len {
				return Err(CollectionError::IndexOutOfRange { index, len });
			}
			state.record(ChangeRecord::Update { index });
			Ok(())
		})
	}

	/// Registers `listener` to run inline once per flushed transaction.
	pub fn add_invalidation_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
		self.add_invalidation_listener_on(direct(), listener)
	}

	pub fn add_invalidation_listener_on(&self, executor: Arc<dyn Executor>, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
		self.inner.core.listeners().add_invalidation(executor, listener)
	}

	/// Registers `listener` to receive every flushed [`ListChange`] inline.
	pub fn add_change_listener(&self, listener: impl Fn(&ListChange<T>) + Send + Sync + 'static) -> ListenerId {
		self.add_change_listener_on(direct(), listener)
	}

	pub fn add_change_listener_on(&self, executor: Arc<dyn Executor>, listener: impl Fn(&ListChange<T>) + Send + Sync + 'static) -> ListenerId {
		self.inner.core.listeners().add_change(executor, listener)
	}

	pub fn remove_listener(&self, id: ListenerId) -> bool {
		self.inner.core.listeners().remove(id)
	}

	pub fn listener_stats(&self, id: ListenerId) -> Option<Arc<ListenerStats>> {
		self.inner.core.listeners().stats(id)
	}

	pub fn listener_shape(&self) -> RegistryShape {
		self.inner.core.listeners().shape()
	}

	/// Number of elements with live dependency subscriptions.
	pub fn observed_elements(&self) -> usize {
		self.inner.observer.as_ref().map_or(0, ElementObserver::observed)
	}
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ObservableList<T> {
	pub fn contains(&self, value: &T) -> bool {
		self.inner.core.read(|data| data.items.contains(value))
	}

	pub fn contains_all(&self, values: &[T]) -> bool {
		self.inner.core.read(|data| values.iter().all(|v| data.items.contains(v)))
	}

	pub fn index_of(&self, value: &T) -> Option<usize> {
		self.inner.core.read(|data| data.items.iter().position(|item| item == value))
	}

	pub fn last_index_of(&self, value: &T) -> Option<usize> {
		self.inner.core.read(|data| data.items.iter().rposition(|item| item == value))
	}

	/// Removes the first occurrence of `value`. Returns false if absent.
	pub fn remove(&self, value: &T) -> Result<bool, CollectionError> {
		self.inner.core.write_scope(|| {
			let Some(index) = self.inner.core.inspect(|data| data.items.iter().position(|item| item == value)) else {
				return Ok(false);
			};
			self.remove_span(index..index + 1)?;
			Ok(true)
		})
	}

	/// Removes every element equal to one of `values`.
	pub fn remove_all(&self, values: &[T]) -> Result<bool, CollectionError> {
		self.retain(|item| !values.contains(item))
	}

	/// Removes every element not equal to one of `values`.
	pub fn retain_all(&self, values: &[T]) -> Result<bool, CollectionError> {
		self.retain(|item| values.contains(item))
	}

	/// [`Self::remove_all`] against a snapshot of `other`.
	pub fn remove_all_from(&self, other: &dyn ObservableCollection<T>) -> Result<bool, CollectionError> {
		let values = other.snapshot();
		self.remove_all(&values)
	}

	/// [`Self::retain_all`] against a snapshot of `other`.
	pub fn retain_all_from(&self, other: &dyn ObservableCollection<T>) -> Result<bool, CollectionError> {
		let values = other.snapshot();
		self.retain_all(&values)
	}

	/// Element-wise equality against a snapshot of `other`.
	pub fn content_eq(&self, other: &dyn ObservableCollection<T>) -> bool {
		let theirs = other.snapshot();
		self.inner.core.read(|data| data.items == theirs)
	}
}

impl<T: Clone + Ord + Send + Sync + 'static> ObservableList<T> {
	pub fn sort(&self) -> Result<(), CollectionError> {
		self.sort_by(Ord::cmp)
	}
}

impl<T: Clone + Send + Sync + 'static> ObservableCollection<T> for ObservableList<T> {
	fn len(&self) -> usize {
		ObservableList::len(self)
	}

	fn snapshot(&self) -> Vec<T> {
		self.to_vec()
	}

	fn remove_listener(&self, id: ListenerId) -> bool {
		ObservableList::remove_listener(self, id)
	}
}

impl<T: Clone + Send + Sync + 'static> FromIterator<T> for ObservableList<T> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		Self::from_vec(iter.into_iter().collect())
	}
}

impl<T: Clone + PartialEq + Send + Sync + 'static> PartialEq for ObservableList<T> {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner) || self.content_eq(other)
	}
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> fmt::Debug for ObservableList<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.to_vec()).finish()
	}
}
