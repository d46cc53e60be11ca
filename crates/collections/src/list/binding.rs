use std::sync::Arc;

use crate::binding::{ContentBinding, same_collection};
use crate::change::{ChangeRecord, ListChange};
use crate::list::ObservableList;
use crate::{CollectionError, ObservableCollection};

impl<T: Clone + Send + Sync + 'static> ObservableList<T> {
	/// Makes this list mirror `source` until the returned binding is dropped.
	///
	/// The current contents are replaced by a copy of `source`, taken under
	/// its read lock, and every later change of `source` is replayed here on
	/// the thread that flushed it.
	///
	/// # Errors
	///
	/// [`CollectionError::SelfBinding`] if `source` is this list, or the error
	/// of the initial copy.
	pub fn bind_content(&self, source: &ObservableList<T>) -> Result<ContentBinding, CollectionError> {
		self.bind_content_with(source, T::clone)
	}

	/// Like [`Self::bind_content`], storing `convert(element)` for each source element.
	///
	/// `Update` records are replayed as updates of the already converted
	/// element; `convert` is not called again for them.
	pub fn bind_content_with<S, F>(&self, source: &ObservableList<S>, convert: F) -> Result<ContentBinding, CollectionError>
	where
		S: Clone + Send + Sync + 'static,
		F: Fn(&S) -> T + Send + Sync + 'static,
	{
		if same_collection(&self.inner, &source.inner) {
			return Err(CollectionError::SelfBinding);
		}

		let held = source.lock_read_only();
		let initial: Vec<T> = held.to_vec().iter().map(&convert).collect();
		self.set_all(initial)?;

		let target = Arc::downgrade(&self.inner);
		let listener = source.add_change_listener(move |change: &ListChange<S>| {
			let Some(inner) = target.upgrade() else {
				return;
			};
			let target = ObservableList { inner };
			if let Err(err) = target.replay(change, &convert) {
				tracing::warn!(error = %err, records = change.len(), "binding.replay_failed");
			}
		});
		drop(held);

		tracing::debug!(listener = listener.get(), "binding.list_bound");
		let source: Box<dyn ObservableCollection<S>> = Box::new(source.clone());
		Ok(ContentBinding::new(listener, source))
	}

	/// Applies `change` as one transaction, stopping at the first record that does not fit.
	fn replay<S>(&self, change: &ListChange<S>, convert: &impl Fn(&S) -> T) -> Result<(), CollectionError> {
		self.inner.core.write_scope(|| {
			for record in change {
				match record {
					ChangeRecord::Insert { range, added } => self.insert_all(range.start, added.iter().map(convert))?,
					ChangeRecord::Remove { range, .. } => self.remove_range(range.clone())?,
					ChangeRecord::Replace { index, new, .. } => {
						self.set(*index, convert(new))?;
					}
					ChangeRecord::Permutation { range, mapping } => self.permute(range.clone(), mapping)?,
					ChangeRecord::Update { index } => self.mark_updated(*index)?,
				}
			}
			Ok(())
		})
	}
}
