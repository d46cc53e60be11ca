use std::hash::Hash;
use std::sync::Arc;

use crate::binding::{ContentBinding, same_collection};
use crate::change::{SetChange, SetChangeRecord};
use crate::set::ObservableSet;
use crate::{CollectionError, ObservableCollection};

impl<T: Clone + Eq + Hash + Send + Sync + 'static> ObservableSet<T> {
	/// Makes this set mirror `source` until the returned binding is dropped.
	///
	/// # Errors
	///
	/// [`CollectionError::SelfBinding`] if `source` is this set, or the error
	/// of the initial copy.
	pub fn bind_content(&self, source: &ObservableSet<T>) -> Result<ContentBinding, CollectionError> {
		self.bind_content_with(source, T::clone)
	}

	/// Like [`Self::bind_content`], storing `convert(element)` for each source element.
	///
	/// A removal is replayed by removing `convert(element)`, so `convert`
	/// must map equal elements to equal values.
	pub fn bind_content_with<S, F>(&self, source: &ObservableSet<S>, convert: F) -> Result<ContentBinding, CollectionError>
	where
		S: Clone + Eq + Hash + Send + Sync + 'static,
		F: Fn(&S) -> T + Send + Sync + 'static,
	{
		if same_collection(&self.core, &source.core) {
			return Err(CollectionError::SelfBinding);
		}

		let held = source.lock_read_only();
		let initial: Vec<T> = held.to_vec().iter().map(&convert).collect();
		self.core.write_scope(|| {
			self.clear()?;
			self.extend(initial).map(drop)
		})?;

		let target = Arc::downgrade(&self.core);
		let listener = source.add_change_listener(move |change: &SetChange<S>| {
			let Some(core) = target.upgrade() else {
				return;
			};
			let target = ObservableSet { core };
			if let Err(err) = target.replay(change, &convert) {
				tracing::warn!(error = %err, records = change.len(), "binding.replay_failed");
			}
		});
		drop(held);

		tracing::debug!(listener = listener.get(), "binding.set_bound");
		let source: Box<dyn ObservableCollection<S>> = Box::new(source.clone());
		Ok(ContentBinding::new(listener, source))
	}

	fn replay<S>(&self, change: &SetChange<S>, convert: &impl Fn(&S) -> T) -> Result<(), CollectionError> {
		self.core.write_scope(|| {
			for record in change {
				match record {
					SetChangeRecord::Added(value) => self.insert(convert(value)).map(drop)?,
					SetChangeRecord::Removed(value) => self.remove(&convert(value)).map(drop)?,
				}
			}
			Ok(())
		})
	}
}
