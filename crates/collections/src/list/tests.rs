use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::{AccessMode, LockError, LockedCollection, OpClass, Property, ReadOnlyReason};

fn record<T: Clone + Send + Sync + 'static>(list: &ObservableList<T>) -> Arc<Mutex<Vec<ListChange<T>>>> {
	let log = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&log);
	list.add_change_listener(move |change| sink.lock().push(change.clone()));
	log
}

fn insert<T: Clone>(at: usize, items: &[T]) -> ChangeRecord<T> {
	ChangeRecord::Insert {
		range: at..at + items.len(),
		added: items.to_vec(),
	}
}

fn remove<T: Clone>(at: usize, items: &[T]) -> ChangeRecord<T> {
	ChangeRecord::Remove {
		range: at..at + items.len(),
		removed: items.to_vec(),
	}
}

#[test]
fn reads_report_bounds() {
	let list = ObservableList::from_vec(vec![10, 20]);
	assert_eq!(list.get(1), Ok(20));
	assert_eq!(list.get(2), Err(CollectionError::IndexOutOfRange { index: 2, len: 2 }));
	assert_eq!(list.len(), 2);
	assert!(!list.is_empty());
}

#[test]
fn failed_insert_emits_nothing() {
	let list = ObservableList::from_vec(vec!['a', 'b']);
	let log = record(&list);
	assert_eq!(list.insert(3, 'z'), Err(CollectionError::IndexOutOfRange { index: 3, len: 2 }));
	assert!(log.lock().is_empty());
	assert_eq!(list.to_vec(), vec!['a', 'b']);
}

#[test]
fn unscoped_edits_notify_individually() {
	let list = ObservableList::new();
	let log = record(&list);
	list.push(1).unwrap();
	list.push(2).unwrap();
	let records: Vec<Vec<ChangeRecord<i32>>> = log.lock().iter().map(|c| c.records().to_vec()).collect();
	assert_eq!(records, vec![vec![insert(0, &[1])], vec![insert(1, &[2])]]);
}

#[test]
fn guard_batches_into_one_change() {
	let list = ObservableList::new();
	let log = record(&list);
	let invalidations = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&invalidations);
	list.add_invalidation_listener(move || {
		counter.fetch_add(1, AtomicOrdering::SeqCst);
	});

	{
		let guard = list.lock().unwrap();
		assert_eq!(guard.mode(), AccessMode::Writable);
		guard.push("x").unwrap();
		guard.push("y").unwrap();
		guard.insert(0, "w").unwrap();
		assert!(log.lock().is_empty(), "notified before scope closed");
	}

	assert_eq!(invalidations.load(AtomicOrdering::SeqCst), 1);
	let log = log.lock();
	assert_eq!(log.len(), 1);
	assert_eq!(log[0].records(), &[insert(0, &["x"]), insert(1, &["y"]), insert(0, &["w"])]);
	assert_eq!(list.to_vec(), vec!["w", "x", "y"]);
}

#[test]
fn nested_lock_is_read_only() {
	let list = ObservableList::from_vec(vec![1]);
	let log = record(&list);
	let outer = list.lock().unwrap();
	{
		let nested = list.lock().unwrap();
		assert_eq!(nested.mode(), AccessMode::NestedReadOnly);
		assert_eq!(nested.push(2), Err(CollectionError::ReadOnly(ReadOnlyReason::Nested)));
		assert_eq!(nested.clear(), Err(CollectionError::ReadOnly(ReadOnlyReason::Nested)));
		assert_eq!(nested.get(0), Ok(1));
		assert_eq!(
			nested.change_owner(thread::current().id()),
			Err(CollectionError::ReadOnly(ReadOnlyReason::Nested))
		);
	}
	assert!(list.is_write_locked_by_current_thread(), "nested guard released the outer lock");
	outer.push(3).unwrap();
	drop(outer);
	assert_eq!(log.lock().len(), 1);
	assert!(!list.is_write_locked_by_current_thread());
}

#[test]
fn explicit_read_only_rejects_mutation() {
	let list = ObservableList::from_vec(vec![1, 2]);
	let guard = list.lock_read_only();
	assert_eq!(guard.mode(), AccessMode::ExplicitReadOnly);
	assert_eq!(guard.set(0, 9), Err(CollectionError::ReadOnly(ReadOnlyReason::Explicit)));
	assert!(matches!(list.push(3), Err(CollectionError::Lock(LockError::Upgrade { .. }))));
	assert!(matches!(list.lock(), Err(CollectionError::Lock(LockError::Upgrade { .. }))));
	assert_eq!(guard.to_vec(), vec![1, 2]);
	guard.release().unwrap();
	list.push(3).unwrap();
}

#[test]
fn set_records_replace_with_both_values() {
	let list = ObservableList::from_vec(vec!["a"]);
	let log = record(&list);
	assert_eq!(list.set(0, "b"), Ok("a"));
	assert_eq!(list.set(1, "c"), Err(CollectionError::IndexOutOfRange { index: 1, len: 1 }));
	assert_eq!(log.lock()[0].records(), &[ChangeRecord::Replace {
		index: 0,
		old: "a",
		new: "b",
	}]);
}

#[test]
fn filtering_records_one_remove_per_element() {
	let list = ObservableList::from_vec(vec!['a', 'b', 'a', 'c']);
	let log = record(&list);
	assert_eq!(list.remove_all(&['a']), Ok(true));
	assert_eq!(list.remove_all(&['z']), Ok(false));
	assert_eq!(list.to_vec(), vec!['b', 'c']);
	let log = log.lock();
	assert_eq!(log.len(), 1);
	assert_eq!(log[0].records(), &[remove(0, &['a']), remove(1, &['a'])]);
	assert_eq!(log[0].group_count(), 1);
}

#[test]
fn retain_all_keeps_listed_values() {
	let list: ObservableList<u8> = (0..6).collect();
	assert_eq!(list.retain_all(&[1, 4]), Ok(true));
	assert_eq!(list.to_vec(), vec![1, 4]);
	assert_eq!(list.retain(|v| *v > 1), Ok(true));
	assert_eq!(list.to_vec(), vec![4]);
}

#[test]
fn clear_is_one_record_and_noop_when_empty() {
	let list = ObservableList::from_vec(vec![1, 2, 3]);
	let log = record(&list);
	list.clear().unwrap();
	list.clear().unwrap();
	let log = log.lock();
	assert_eq!(log.len(), 1);
	assert_eq!(log[0].records(), &[remove(0, &[1, 2, 3])]);
}

#[test]
fn remove_range_validates_bounds() {
	let list = ObservableList::from_vec(vec![1, 2, 3, 4]);
	assert_eq!(list.remove_range(1..5), Err(CollectionError::IndexOutOfRange { index: 5, len: 4 }));
	list.remove_range(1..3).unwrap();
	assert_eq!(list.to_vec(), vec![1, 4]);
	assert_eq!(list.remove_at(7), Err(CollectionError::IndexOutOfRange { index: 7, len: 2 }));
	assert_eq!(list.remove(&4), Ok(true));
	assert_eq!(list.remove(&4), Ok(false));
}

#[test]
fn sort_records_permutation_that_replays() {
	let before = vec![3, 1, 2];
	let list = ObservableList::from_vec(before.clone());
	let log = record(&list);
	list.sort().unwrap();
	list.sort().unwrap();
	assert_eq!(list.to_vec(), vec![1, 2, 3]);

	let log = log.lock();
	assert_eq!(log.len(), 1, "sorting a sorted list must not notify");
	assert_eq!(log[0].records(), &[ChangeRecord::Permutation {
		range: 0..3,
		mapping: vec![2, 0, 1],
	}]);
	let mut replay = before;
	log[0].apply_to(&mut replay);
	assert_eq!(replay, vec![1, 2, 3]);
}

#[test]
fn set_all_emits_remove_then_insert_groups() {
	let list = ObservableList::from_vec(vec![1, 2]);
	let log = record(&list);
	list.set_all([7, 8, 9]).unwrap();
	let log = log.lock();
	assert_eq!(log.len(), 1);
	let classes: Vec<OpClass> = log[0].groups().map(|(class, _)| class).collect();
	assert_eq!(classes, vec![OpClass::Remove, OpClass::Insert]);
	assert_eq!(log[0].removed_count(), 2);
	assert_eq!(log[0].added_count(), 3);
}

#[test]
fn listener_edits_flush_as_later_notification() {
	let list = ObservableList::new();
	let log = record(&list);
	let echo = list.clone();
	let locked_during_dispatch = Arc::new(AtomicUsize::new(0));
	let locked = Arc::clone(&locked_during_dispatch);
	list.add_change_listener(move |change: &ListChange<&'static str>| {
		if echo.is_write_locked_by_current_thread() {
			locked.fetch_add(1, AtomicOrdering::SeqCst);
		}
		let triggered = change.iter().any(|r| matches!(r, ChangeRecord::Insert { added, .. } if added.contains(&"ping")));
		if triggered {
			echo.push("pong").unwrap();
		}
	});

	list.push("ping").unwrap();

	let log = log.lock();
	assert_eq!(log.len(), 2);
	assert_eq!(log[0].records(), &[insert(0, &["ping"])]);
	assert_eq!(log[1].records(), &[insert(1, &["pong"])]);
	assert_eq!(locked_during_dispatch.load(AtomicOrdering::SeqCst), 2, "dispatch ran after release");
	assert!(!list.is_write_locked_by_current_thread());
}

#[test]
fn cursor_walks_and_edits_in_place() {
	let list = ObservableList::from_vec(vec![1, 2, 3, 4]);
	let log = record(&list);
	{
		let guard = list.lock().unwrap();
		let mut cursor = guard.iter().unwrap();
		while let Some(item) = cursor.next() {
			let item = item.unwrap();
			if item % 2 == 0 {
				cursor.remove().unwrap();
			} else {
				cursor.set(item * 10).unwrap();
			}
		}
		cursor.insert(99).unwrap();
		assert!(!cursor.has_next());
		assert_eq!(cursor.previous(), Some(Ok(99)));
	}
	assert_eq!(list.to_vec(), vec![10, 30, 99]);
	let log = log.lock();
	assert_eq!(log.len(), 1);
	let mut replay = vec![1, 2, 3, 4];
	log[0].apply_to(&mut replay);
	assert_eq!(replay, list.to_vec());
}

#[test]
fn cursor_fails_after_outside_edit() {
	let list = ObservableList::from_vec(vec!['a', 'b', 'c']);
	let guard = list.lock().unwrap();
	let mut stale = guard.iter().unwrap();
	assert_eq!(stale.next(), Some(Ok('a')));

	guard.push('d').unwrap();
	assert_eq!(stale.next(), Some(Err(CollectionError::ConcurrentModification)));
	assert_eq!(stale.next(), None);
	assert_eq!(stale.remove(), Err(CollectionError::ConcurrentModification));

	let fresh: Result<Vec<char>, _> = guard.iter().unwrap().collect();
	assert_eq!(fresh, Ok(vec!['a', 'b', 'c', 'd']));
}

#[test]
fn cursor_requires_current_element() {
	let list = ObservableList::from_vec(vec![1]);
	let guard = list.lock().unwrap();
	let mut cursor = guard.iter().unwrap();
	assert_eq!(cursor.remove(), Err(CollectionError::IllegalCursorState));
	assert_eq!(cursor.set(5), Err(CollectionError::IllegalCursorState));
	cursor.next();
	cursor.remove().unwrap();
	assert_eq!(cursor.remove(), Err(CollectionError::IllegalCursorState));
}

#[test]
fn read_only_cursor_reads_but_rejects_edits() {
	let list = ObservableList::from_vec(vec![1, 2]);
	let guard = list.lock_read_only();
	let mut cursor = guard.cursor_at(2).unwrap();
	assert_eq!(cursor.previous(), Some(Ok(2)));
	assert_eq!(cursor.previous(), Some(Ok(1)));
	assert_eq!(cursor.previous(), None);
	assert_eq!(cursor.remove(), Err(CollectionError::ReadOnly(ReadOnlyReason::Explicit)));
	assert_eq!(cursor.insert(0), Err(CollectionError::ReadOnly(ReadOnlyReason::Explicit)));
}

#[test]
fn writable_cursor_checks_lock_owner() {
	let list = ObservableList::from_vec(vec![1]);
	let guard = list.lock().unwrap();
	thread::scope(|s| {
		let guard = &guard;
		s.spawn(move || {
			assert!(matches!(guard.iter(), Err(CollectionError::LockState)));
			assert_eq!(guard.push(2), Err(CollectionError::LockState));
		});
	});
}

#[test]
fn sub_list_edits_track_window() {
	let list = ObservableList::from_vec(vec![0, 1, 2, 3, 4]);
	let log = record(&list);
	{
		let guard = list.lock().unwrap();
		let sub = guard.sub_list(1..3).unwrap();
		assert_eq!(sub.to_vec(), Ok(vec![1, 2]));
		sub.push(9).unwrap();
		assert_eq!(sub.len(), 3);
		assert_eq!(sub.get(2), Ok(9));
		assert_eq!(sub.get(3), Err(CollectionError::IndexOutOfRange { index: 3, len: 3 }));

		let mut cursor = sub.iter().unwrap();
		cursor.next();
		cursor.remove().unwrap();
		drop(cursor);
		assert_eq!(sub.to_vec(), Ok(vec![2, 9]));

		sub.clear().unwrap();
		assert!(sub.is_empty());
	}
	assert_eq!(list.to_vec(), vec![0, 3, 4]);
	assert_eq!(log.lock().len(), 1);
}

#[test]
fn sub_list_invalidated_by_parent_edit() {
	let list = ObservableList::from_vec(vec![0, 1, 2]);
	let guard = list.lock().unwrap();
	let sub = guard.sub_list(0..2).unwrap();
	guard.remove_at(2).unwrap();
	assert_eq!(sub.get(0), Err(CollectionError::ConcurrentModification));
	assert!(matches!(guard.sub_list(1..4), Err(CollectionError::IndexOutOfRange { index: 4, len: 2 })));
}

#[derive(Clone)]
struct Item {
	name: &'static str,
	price: Property<u32>,
}

fn observed_list(items: Vec<Item>) -> ObservableList<Item> {
	ObservableList::builder()
		.items(items)
		.extractor(|item: &Item| [item.price.as_dependency()])
		.build()
}

fn names(change: &ListChange<Item>) -> Vec<String> {
	change
		.iter()
		.map(|r| match r {
			ChangeRecord::Update { index } => format!("update {index}"),
			ChangeRecord::Insert { added, .. } => format!("insert {}", added[0].name),
			ChangeRecord::Remove { removed, .. } => format!("remove {}", removed[0].name),
			ChangeRecord::Replace { new, .. } => format!("replace {}", new.name),
			ChangeRecord::Permutation { .. } => String::from("permute"),
		})
		.collect()
}

#[test]
fn dependency_change_records_update() {
	let apple = Item {
		name: "apple",
		price: Property::new(3),
	};
	let pear = Item {
		name: "pear",
		price: Property::new(4),
	};
	let list = observed_list(vec![apple.clone(), pear.clone()]);
	let log = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&log);
	list.add_change_listener(move |change| sink.lock().push(names(change)));
	assert_eq!(list.observed_elements(), 2);

	pear.price.set(5);
	{
		let guard = list.lock().unwrap();
		apple.price.set(1);
		guard.push(apple.clone()).unwrap();
		apple.price.set(2);
	}

	assert_eq!(*log.lock(), vec![
		vec![String::from("update 1")],
		vec![String::from("update 0"), String::from("insert apple"), String::from("update 0"), String::from("update 2")],
	]);
}

#[test]
fn removed_elements_stop_being_observed() {
	let tracked = Item {
		name: "kiwi",
		price: Property::new(1),
	};
	let list = observed_list(vec![tracked.clone()]);
	let log = record(&list);
	assert_eq!(tracked.price.listener_count(), 1);

	list.set(
		0,
		Item {
			name: "plum",
			price: Property::new(2),
		},
	)
	.unwrap();
	assert_eq!(tracked.price.listener_count(), 0);
	tracked.price.set(9);

	list.clear().unwrap();
	assert_eq!(list.observed_elements(), 0);
	assert_eq!(log.lock().len(), 2);
}

#[test]
fn sort_keeps_observation_aligned() {
	let a = Item {
		name: "a",
		price: Property::new(2),
	};
	let b = Item {
		name: "b",
		price: Property::new(1),
	};
	let list = observed_list(vec![a.clone(), b.clone()]);
	list.sort_by(|x, y| x.price.get().cmp(&y.price.get())).unwrap();
	let log = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&log);
	list.add_change_listener(move |change| sink.lock().push(names(change)));

	a.price.set(0);
	assert_eq!(*log.lock(), vec![vec![String::from("update 1")]]);
}

fn replay_all<T: Clone>(log: &[ListChange<T>]) -> Vec<T> {
	let mut replay = Vec::new();
	for change in log {
		change.apply_to(&mut replay);
	}
	replay
}

/// Pushes from a second thread, failing instead of hanging if the lock leaked.
fn push_from_other_thread<T: Clone + Send + Sync + 'static>(list: &ObservableList<T>, value: T) {
	let (tx, rx) = mpsc::channel();
	let list = list.clone();
	thread::spawn(move || tx.send(list.push(value)).unwrap());
	assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(Ok(())), "write lock still held");
}

#[test]
fn panic_inside_scope_still_delivers_edits() {
	let list = ObservableList::new();
	let log = record(&list);
	let outcome = catch_unwind(AssertUnwindSafe(|| {
		let guard = list.lock().unwrap();
		guard.push(1).unwrap();
		panic!("abort transaction");
	}));
	assert!(outcome.is_err());
	assert_eq!(list.to_vec(), vec![1]);
	assert_eq!(log.lock().len(), 1);
	assert_eq!(log.lock()[0].records(), &[insert(0, &[1])]);

	push_from_other_thread(&list, 2);
	assert_eq!(log.lock().len(), 2);
	assert_eq!(replay_all(&log.lock()), list.to_vec());
}

#[test]
fn panicking_predicate_releases_write_lock() {
	let list = ObservableList::from_vec(vec![1, 2, 3]);
	let log = record(&list);
	let outcome = catch_unwind(AssertUnwindSafe(|| list.retain(|_| panic!("bad predicate"))));
	assert!(outcome.is_err());
	assert!(!list.is_write_locked_by_current_thread());
	assert_eq!(list.lock().map(|guard| guard.mode()), Ok(AccessMode::Writable));

	push_from_other_thread(&list, 4);
	assert_eq!(list.to_vec(), vec![1, 2, 3, 4]);
	assert_eq!(log.lock().len(), 1);
}

#[test]
fn panicking_comparator_inside_guard_flushes_earlier_edits() {
	let list = ObservableList::from_vec(vec![3, 1]);
	let log = record(&list);
	let outcome = catch_unwind(AssertUnwindSafe(|| {
		let guard = list.lock().unwrap();
		guard.push(2).unwrap();
		guard.sort_by(|_, _| panic!("bad comparator")).unwrap();
	}));
	assert!(outcome.is_err());
	assert!(!list.is_write_locked_by_current_thread());
	assert_eq!(list.to_vec(), vec![3, 1, 2]);
	assert_eq!(log.lock().len(), 1);
	assert_eq!(log.lock()[0].records(), &[insert(2, &[2])]);

	push_from_other_thread(&list, 5);
	let mut expected = vec![3, 1];
	for change in log.lock().iter() {
		change.apply_to(&mut expected);
	}
	assert_eq!(expected, list.to_vec());
}

#[test]
fn readers_wait_for_open_transaction() {
	let list = ObservableList::new();
	let guard = list.lock().unwrap();
	guard.push(1).unwrap();
	let (tx, rx) = mpsc::channel();

	thread::scope(|s| {
		s.spawn(|| tx.send((list.len(), list.get(0))).unwrap());
		assert!(rx.recv_timeout(Duration::from_millis(50)).is_err(), "reader saw an open transaction");
		guard.push(2).unwrap();
		drop(guard);
		assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), (2, Ok(1)));
	});
}

#[test]
fn change_owner_hands_scope_to_another_thread() {
	let list = ObservableList::new();
	let log = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&log);
	list.add_change_listener(move |change: &ListChange<u8>| {
		sink.lock().push((change.len(), thread::current().id()));
	});

	let guard = list.lock().unwrap();
	guard.push(1).unwrap();
	let (tx, rx) = mpsc::channel::<LockedList<'_, u8>>();

	let finisher = thread::scope(|s| {
		let handle = s.spawn(move || {
			let guard = rx.recv().unwrap();
			guard.push(2).unwrap();
			drop(guard);
			thread::current().id()
		});
		guard.change_owner(handle.thread().id()).unwrap();
		assert!(!list.is_write_locked_by_current_thread());
		tx.send(guard).unwrap();
		handle.join().unwrap()
	});

	assert_eq!(*log.lock(), vec![(2, finisher)]);
	assert_eq!(list.to_vec(), vec![1, 2]);
	assert!(list.lock().is_ok());
}

#[test]
fn bulk_ops_snapshot_other_collections() {
	let source = ObservableList::from_vec(vec![1, 2, 3]);
	let target = ObservableList::from_vec(vec![0]);
	target.add_all_from(&source).unwrap();
	assert_eq!(target.to_vec(), vec![0, 1, 2, 3]);

	let filter = crate::ObservableSet::from_iter([2, 3]);
	assert_eq!(target.remove_all_from(&filter), Ok(true));
	assert_eq!(target.to_vec(), vec![0, 1]);
	assert_eq!(target.retain_all_from(&source), Ok(true));
	assert_eq!(target.to_vec(), vec![1]);

	target.add_all_from(&target.clone()).unwrap();
	assert_eq!(target.to_vec(), vec![1, 1]);
	assert_eq!(target.last_index_of(&1), Some(1));
	assert!(target.contains_all(&[1]));
	assert!(!target.contains_all(&[1, 2]));
}

#[test]
fn equality_and_debug_use_contents() {
	let a = ObservableList::from_vec(vec!["x", "y"]);
	let b = ObservableList::from_vec(vec!["x", "y"]);
	assert_eq!(a, b);
	b.push("z").unwrap();
	assert_ne!(a, b);
	assert_eq!(format!("{a:?}"), r#"["x", "y"]"#);
}

#[test]
fn listener_registration_round_trips() {
	let list = ObservableList::<u8>::new();
	assert_eq!(list.listener_shape(), RegistryShape::Empty);
	let id = list.add_invalidation_listener(|| {});
	assert_eq!(list.listener_shape(), RegistryShape::SingleInvalidation);
	list.push(1).unwrap();
	assert_eq!(list.listener_stats(id).map(|s| s.invocations()), Some(1));
	assert!(list.remove_listener(id));
	assert_eq!(list.listener_shape(), RegistryShape::Empty);
}

#[test]
fn bound_list_mirrors_every_source_edit() {
	let source = ObservableList::from_vec(vec![5, 3]);
	let target = ObservableList::from_vec(vec![9]);
	let binding = target.bind_content(&source).unwrap();
	assert_eq!(target.to_vec(), vec![5, 3]);

	source.push(4).unwrap();
	source.set(0, 1).unwrap();
	source.sort().unwrap();
	source.retain(|v| *v != 3).unwrap();
	{
		let guard = source.lock().unwrap();
		guard.insert(0, 7).unwrap();
		guard.remove_at(1).unwrap();
	}

	assert_eq!(target.to_vec(), source.to_vec());
	assert_eq!(target.to_vec(), vec![7, 4]);
	assert_eq!(source.listener_shape(), RegistryShape::SingleChange);
	binding.unbind();
	assert_eq!(source.listener_shape(), RegistryShape::Empty);
}

#[test]
fn each_source_change_replays_as_one_target_change() {
	let source = ObservableList::new();
	let target = ObservableList::new();
	let _binding = target.bind_content(&source).unwrap();
	let log = record(&target);

	{
		let guard = source.lock().unwrap();
		guard.extend([1, 2, 3]).unwrap();
		guard.remove_at(0).unwrap();
	}

	let log = log.lock();
	assert_eq!(log.len(), 1);
	assert_eq!(log[0].records(), &[insert(0, &[1, 2, 3]), remove(0, &[1])]);
}

#[test]
fn converted_binding_maps_elements() {
	let source = ObservableList::from_vec(vec![1, 2]);
	let target = ObservableList::new();
	let _binding = target.bind_content_with(&source, |v: &i32| v.to_string()).unwrap();

	source.insert(1, 10).unwrap();
	source.sort_by(|a, b| b.cmp(a)).unwrap();

	assert_eq!(target.to_vec(), vec!["10", "2", "1"]);
}

#[test]
fn dropping_binding_stops_replay() {
	let source = ObservableList::from_vec(vec!['a']);
	let target = ObservableList::new();
	let binding = target.bind_content(&source).unwrap();
	drop(binding);

	source.push('b').unwrap();

	assert_eq!(target.to_vec(), vec!['a']);
	assert!(source.listener_shape() == RegistryShape::Empty);
}

#[test]
fn binding_to_itself_is_rejected() {
	let list = ObservableList::from_vec(vec![1]);
	let alias = list.clone();
	assert_eq!(list.bind_content(&alias).err(), Some(CollectionError::SelfBinding));
	assert_eq!(list.listener_shape(), RegistryShape::Empty);
}

#[test]
fn dropped_target_leaves_source_usable() {
	let source = ObservableList::new();
	let binding = {
		let target = ObservableList::new();
		target.bind_content(&source).unwrap()
	};

	assert_eq!(source.push(1), Ok(()));
	assert_eq!(source.to_vec(), vec![1]);
	drop(binding);
}

#[test]
fn bound_list_forwards_element_updates() {
	let price = Property::new(3);
	let source = observed_list(vec![Item { name: "fig", price: price.clone() }]);
	let target = ObservableList::new();
	let _binding = target.bind_content_with(&source, |item: &Item| item.name).unwrap();
	let log = record(&target);

	price.set(4);

	assert_eq!(log.lock().len(), 1);
	assert_eq!(log.lock()[0].records(), &[ChangeRecord::Update { index: 0 }]);
	assert_eq!(target.to_vec(), vec!["fig"]);
}

#[test]
fn permute_rejects_mappings_that_are_not_bijections() {
	let list = ObservableList::from_vec(vec![1, 2, 3]);
	let log = record(&list);

	assert_eq!(list.permute(0..2, &[0, 0]), Err(CollectionError::InvalidPermutation { start: 0, end: 2 }));
	assert_eq!(list.permute(0..2, &[1, 2]), Err(CollectionError::InvalidPermutation { start: 0, end: 2 }));
	assert_eq!(list.permute(1..4, &[1, 2, 3]), Err(CollectionError::IndexOutOfRange { index: 4, len: 3 }));
	assert!(log.lock().is_empty());

	list.permute(0..3, &[2, 0, 1]).unwrap();
	assert_eq!(list.to_vec(), vec![2, 3, 1]);
	assert_eq!(log.lock().len(), 1);
}
