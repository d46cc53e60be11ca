//! Machine-checkable invariants for [`ObservableList`].
//!
//! Each invariant is a `pub(crate) fn test_*()` compiled as a test.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::thread;

use parking_lot::Mutex;

use super::*;
use crate::access::LockedCollection;
use crate::{AccessMode, Classify, OpClass, Property, ReadOnlyReason};

fn capture<T: Clone + Send + Sync + 'static>(list: &ObservableList<T>) -> Arc<Mutex<Vec<ListChange<T>>>> {
	let log = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&log);
	list.add_change_listener(move |change| sink.lock().push(change.clone()));
	log
}

/// Invariant: N edits inside one outermost write scope MUST reach listeners
/// as exactly one change carrying N records in edit order.
#[cfg_attr(test, test)]
pub(crate) fn test_single_flush() {
	let list = ObservableList::from_vec(vec![0]);
	let log = capture(&list);
	{
		let guard = list.lock().unwrap();
		guard.push(1).unwrap();
		guard.set(0, 5).unwrap();
		guard.remove_at(1).unwrap();
		guard.extend([7, 8]).unwrap();
		guard.sort_by(|a, b| b.cmp(a)).unwrap();
		assert!(log.lock().is_empty());
	}
	let log = log.lock();
	assert_eq!(log.len(), 1);
	assert_eq!(log[0].len(), 5);
	let classes: Vec<OpClass> = log[0].records().iter().map(Classify::class).collect();
	assert_eq!(classes, vec![OpClass::Insert, OpClass::Replace, OpClass::Remove, OpClass::Insert, OpClass::Permute]);
}

/// Invariant: a scope opened while the thread owns the write lock MUST
/// reject every mutation with a nested read-only error.
#[cfg_attr(test, test)]
pub(crate) fn test_nested_scope_rejects_mutation() {
	let list = ObservableList::from_vec(vec!['a']);
	let _outer = list.lock().unwrap();
	let nested = list.lock().unwrap();
	assert_eq!(nested.mode(), AccessMode::NestedReadOnly);
	let denied = Err(CollectionError::ReadOnly(ReadOnlyReason::Nested));
	assert_eq!(nested.push('b'), denied);
	assert_eq!(nested.insert(0, 'b'), denied);
	assert_eq!(nested.set(0, 'b').map(drop), denied);
	assert_eq!(nested.remove_at(0).map(drop), denied);
	assert_eq!(nested.remove(&'a').map(drop), denied);
	assert_eq!(nested.clear(), denied);
	assert_eq!(nested.sort_by(|a, b| a.cmp(b)), denied);
}

/// Invariant: replaying every delivered change over the previous contents
/// MUST reproduce the current contents.
#[cfg_attr(test, test)]
pub(crate) fn test_replay_reconstructs_contents() {
	let initial = vec![5, 3, 9, 1];
	let list = ObservableList::from_vec(initial.clone());
	let log = capture(&list);

	list.push(4).unwrap();
	{
		let guard = list.lock().unwrap();
		guard.insert(2, 8).unwrap();
		guard.remove_all(&[3]).unwrap();
		guard.set(0, 6).unwrap();
	}
	list.sort().unwrap();
	list.remove_range(1..3).unwrap();
	list.set_all([2, 2, 7]).unwrap();
	list.retain(|v| *v != 7).unwrap();

	let mut replay = initial;
	for change in log.lock().iter() {
		change.apply_to(&mut replay);
	}
	assert_eq!(replay, list.to_vec());
}

/// Invariant: with an observer installed, the tag vector MUST stay exactly
/// as long as the item vector, and each live tag MUST hold a subscription.
#[cfg_attr(test, test)]
pub(crate) fn test_tags_track_items() {
	let props: Vec<Property<u8>> = (0..4).map(Property::new).collect();
	let list = ObservableList::builder()
		.items(props.clone())
		.extractor(|p: &Property<u8>| [p.as_dependency()])
		.build();

	let aligned = |list: &ObservableList<Property<u8>>| list.inner.core.inspect(|data| data.tags.len() == data.items.len());

	assert!(aligned(&list));
	list.push(Property::new(9)).unwrap();
	list.remove_at(1).unwrap();
	list.set(0, Property::new(7)).unwrap();
	list.sort_by(|a, b| a.get().cmp(&b.get())).unwrap();
	assert!(aligned(&list));
	assert_eq!(list.observed_elements(), list.len());

	list.clear().unwrap();
	assert!(aligned(&list));
	assert_eq!(list.observed_elements(), 0);
	assert!(props.iter().all(|p| p.listener_count() == 0));
}

/// Invariant: a read whose optimistic attempt overlaps a write MUST be
/// retried under a read lock and return the state after that write.
#[cfg_attr(test, test)]
pub(crate) fn test_optimistic_read_falls_back_after_write() {
	let list = ObservableList::from_vec(vec![1]);
	let core = &list.inner.core;
	let attempts = AtomicUsize::new(0);

	let observed = thread::scope(|s| {
		core.read(|data| {
			if attempts.fetch_add(1, AtomicOrdering::SeqCst) == 0 {
				s.spawn(|| list.push(2).unwrap());
				// The writer takes the stamp, then waits for this speculative read to finish.
				while !core.lock().is_write_locked() {
					thread::yield_now();
				}
			}
			data.items.clone()
		})
	});

	assert_eq!(observed, vec![1, 2]);
	assert_eq!(attempts.load(AtomicOrdering::SeqCst), 2);
	assert_eq!(list.len(), 2);
}
