/// Fixed-capacity listener slots with compacting removal.
///
/// Live entries always occupy `slots[..len]`. When full, the array grows to
/// `capacity * 3 / 2 + 1`.
#[derive(Clone)]
pub(super) struct ListenerArray<L> {
	slots: Box<[Option<L>]>,
	len: usize,
}

impl<L> ListenerArray<L> {
	pub(super) fn new() -> Self {
		Self {
			slots: Box::new([]),
			len: 0,
		}
	}

	pub(super) fn from_vec(entries: Vec<L>) -> Self {
		let len = entries.len();
		Self {
			slots: entries.into_iter().map(Some).collect(),
			len,
		}
	}

	pub(super) fn len(&self) -> usize {
		self.len
	}

	pub(super) fn capacity(&self) -> usize {
		self.slots.len()
	}

	pub(super) fn first(&self) -> Option<&L> {
		self.iter().next()
	}

	pub(super) fn iter(&self) -> impl Iterator<Item = &L> {
		self.slots[..self.len].iter().flatten()
	}

	pub(super) fn contains(&self, pred: impl Fn(&L) -> bool) -> bool {
		self.iter().any(pred)
	}

	pub(super) fn push(&mut self, entry: L) {
		if self.len == self.slots.len() {
			self.grow();
		}
		self.slots[self.len] = Some(entry);
		self.len += 1;
	}

	/// Removes the first entry matching `pred`, shifting later entries down.
	pub(super) fn remove(&mut self, pred: impl Fn(&L) -> bool) -> Option<L> {
		let pos = self.slots[..self.len].iter().position(|slot| slot.as_ref().is_some_and(&pred))?;
		let removed = self.slots[pos].take();
		for i in pos..self.len - 1 {
			self.slots[i] = self.slots[i + 1].take();
		}
		self.len -= 1;
		removed
	}

	fn grow(&mut self) {
		let capacity = self.slots.len() * 3 / 2 + 1;
		let mut next = Vec::with_capacity(capacity);
		next.extend(self.slots.iter_mut().map(Option::take));
		next.resize_with(capacity, || None);
		tracing::trace!(from = self.slots.len(), to = capacity, "listener.array_grow");
		self.slots = next.into_boxed_slice();
	}
}
