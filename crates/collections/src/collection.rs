use crate::ListenerId;

/// Contract shared by [`crate::ObservableList`], [`crate::ObservableSet`] and
/// their read-only views.
///
/// Bulk operations that take another collection go through this trait and
/// snapshot it under its own read lock before touching the receiver.
pub trait ObservableCollection<T>: Send + Sync {
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Consistent copy of the contents, taken under a read lock.
	fn snapshot(&self) -> Vec<T>;

	fn remove_listener(&self, id: ListenerId) -> bool;
}
