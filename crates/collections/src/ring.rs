use std::collections::VecDeque;

/// Fixed-capacity FIFO that evicts its oldest element on overflow.
///
/// Not synchronised; wrap it in a lock to share it between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingBuffer<T> {
	items: VecDeque<T>,
	capacity: usize,
}

impl<T> RingBuffer<T> {
	pub fn new(capacity: usize) -> Self {
		Self {
			items: VecDeque::with_capacity(capacity),
			capacity,
		}
	}

	/// Appends `item`, returning the element evicted to make room, if any.
	///
	/// With zero capacity the item itself is returned.
	pub fn offer(&mut self, item: T) -> Option<T> {
		if self.capacity == 0 {
			return Some(item);
		}
		let evicted = if self.items.len() == self.capacity {
			self.items.pop_front()
		} else {
			None
		};
		self.items.push_back(item);
		evicted
	}

	/// Removes and returns the oldest element.
	pub fn poll(&mut self) -> Option<T> {
		self.items.pop_front()
	}

	/// Oldest element, left in place.
	pub fn peek(&self) -> Option<&T> {
		self.items.front()
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn is_full(&self) -> bool {
		self.items.len() == self.capacity
	}

	/// Oldest to newest.
	pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
		self.items.iter()
	}

	pub fn clear(&mut self) {
		self.items.clear();
	}
}

impl<T> Extend<T> for RingBuffer<T> {
	fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
		for item in iter {
			self.offer(item);
		}
	}
}

impl<T> IntoIterator for RingBuffer<T> {
	type Item = T;
	type IntoIter = std::collections::vec_deque::IntoIter<T>;

	fn into_iter(self) -> Self::IntoIter {
		self.items.into_iter()
	}
}
