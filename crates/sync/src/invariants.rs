//! Machine-checkable invariants for [`StampedLock`].
//!
//! Each invariant is a `pub(crate) fn test_*()` compiled as a test.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::{Stamp, StampedLock};

/// Invariant: at most one thread is inside a write section at a time, and
/// readers never overlap a writer.
#[cfg_attr(test, test)]
pub(crate) fn test_writer_exclusion() {
	let lock = Arc::new(StampedLock::new());
	let writers = Arc::new(AtomicUsize::new(0));
	let readers = Arc::new(AtomicUsize::new(0));

	let handles: Vec<_> = (0..8)
		.map(|i| {
			let lock = Arc::clone(&lock);
			let writers = Arc::clone(&writers);
			let readers = Arc::clone(&readers);
			thread::spawn(move || {
				for _ in 0..200 {
					if i % 2 == 0 {
						let stamp = lock.acquire_write().unwrap();
						assert_eq!(writers.fetch_add(1, Ordering::SeqCst), 0, "two writers overlapped");
						assert_eq!(readers.load(Ordering::SeqCst), 0, "reader overlapped a writer");
						writers.fetch_sub(1, Ordering::SeqCst);
						lock.release_write(stamp).unwrap();
					} else {
						let stamp = lock.acquire_read();
						readers.fetch_add(1, Ordering::SeqCst);
						assert_eq!(writers.load(Ordering::SeqCst), 0, "writer overlapped a reader");
						readers.fetch_sub(1, Ordering::SeqCst);
						lock.release_read(stamp).unwrap();
					}
				}
			})
		})
		.collect();

	for handle in handles {
		handle.join().unwrap();
	}
	assert!(!lock.is_write_locked());
	assert_eq!(lock.reader_count(), 0);
}

/// Invariant: a speculative read validated after a completed write MUST be rejected.
#[cfg_attr(test, test)]
pub(crate) fn test_optimistic_soundness() {
	let lock = StampedLock::new();
	for _ in 0..64 {
		let result = lock.optimistic(|| {
			thread::scope(|s| {
				s.spawn(|| {
					let stamp = lock.acquire_write().unwrap();
					lock.release_write(stamp).unwrap();
				});
			});
			"speculative"
		});
		assert_eq!(result, None, "optimistic read accepted across a write");
	}
}

/// Invariant: a stamp issued while the write lock is held never validates.
#[cfg_attr(test, test)]
pub(crate) fn test_optimistic_refused_under_write() {
	let lock = StampedLock::new();
	let write = lock.acquire_write().unwrap();
	let stamp = lock.try_optimistic_read();
	assert_eq!(stamp, Stamp::None);
	lock.release_write(write).unwrap();
	assert!(!lock.validate(stamp));
}
