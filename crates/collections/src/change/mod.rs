//! Change records and the batched [`Change`] delivered to listeners.
//!
//! Every record describes one elementary edit. Indices in a record refer to
//! the collection as it was just before that record was applied, so
//! replaying the records in order over the previous contents reproduces the
//! new contents (see [`Change::apply_to`]).

mod aggregator;

use std::hash::{BuildHasher, Hash};
use std::ops::Range;

use indexmap::IndexSet;

pub use self::aggregator::ChangeAggregator;

/// Diff shape of a record. Consecutive records of one class form a [`Group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpClass {
	Insert,
	Remove,
	Replace,
	Permute,
	Update,
}

impl OpClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Insert => "insert",
			Self::Remove => "remove",
			Self::Replace => "replace",
			Self::Permute => "permute",
			Self::Update => "update",
		}
	}
}

/// Records that know their [`OpClass`].
pub trait Classify {
	fn class(&self) -> OpClass;
}

/// One elementary list edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRecord<T> {
	/// `added` now occupies `range`.
	Insert { range: Range<usize>, added: Vec<T> },
	/// `removed` previously occupied `range`.
	Remove { range: Range<usize>, removed: Vec<T> },
	/// The element at `index` was replaced.
	Replace { index: usize, old: T, new: T },
	/// Elements in `range` were reordered; the element previously at
	/// `range.start + i` moved to `mapping[i]`.
	Permutation { range: Range<usize>, mapping: Vec<usize> },
	/// The element at `index` changed in place.
	Update { index: usize },
}

impl<T> Classify for ChangeRecord<T> {
	fn class(&self) -> OpClass {
		match self {
			Self::Insert { .. } => OpClass::Insert,
			Self::Remove { .. } => OpClass::Remove,
			Self::Replace { .. } => OpClass::Replace,
			Self::Permutation { .. } => OpClass::Permute,
			Self::Update { .. } => OpClass::Update,
		}
	}
}

/// One elementary set edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetChangeRecord<T> {
	Added(T),
	Removed(T),
}

impl<T> Classify for SetChangeRecord<T> {
	fn class(&self) -> OpClass {
		match self {
			Self::Added(_) => OpClass::Insert,
			Self::Removed(_) => OpClass::Remove,
		}
	}
}

/// Contiguous run of records sharing one [`OpClass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
	pub class: OpClass,
	pub range: Range<usize>,
}

/// Ordered edits of one write transaction.
///
/// Records are never merged or reordered. Group boundaries mark every point
/// where the operation class changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<R> {
	records: Vec<R>,
	groups: Vec<Group>,
}

pub type ListChange<T> = Change<ChangeRecord<T>>;
pub type SetChange<T> = Change<SetChangeRecord<T>>;

impl<R> Change<R> {
	pub(crate) fn from_parts(records: Vec<R>, groups: Vec<Group>) -> Self {
		Self { records, groups }
	}

	pub fn records(&self) -> &[R] {
		&self.records
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, R> {
		self.records.iter()
	}

	/// Groups in order, each with its records.
	pub fn groups(&self) -> impl Iterator<Item = (OpClass, &[R])> + '_ {
		self.groups.iter().map(|g| (g.class, &self.records[g.range.clone()]))
	}

	pub fn group_count(&self) -> usize {
		self.groups.len()
	}

	pub fn into_records(self) -> Vec<R> {
		self.records
	}
}

impl<'a, R> IntoIterator for &'a Change<R> {
	type Item = &'a R;
	type IntoIter = std::slice::Iter<'a, R>;

	fn into_iter(self) -> Self::IntoIter {
		self.records.iter()
	}
}

impl<T: Clone> ListChange<T> {
	/// Replays the edits over `target`, which must hold the contents from
	/// before the transaction.
	///
	/// # Panics
	///
	/// Panics if a record's indices do not fit `target`.
	pub fn apply_to(&self, target: &mut Vec<T>) {
		for record in &self.records {
			match record {
				ChangeRecord::Insert { range, added } => {
					target.splice(range.start..range.start, added.iter().cloned());
				}
				ChangeRecord::Remove { range, .. } => {
					target.drain(range.clone());
				}
				ChangeRecord::Replace { index, new, .. } => target[*index] = new.clone(),
				ChangeRecord::Permutation { range, mapping } => {
					let moved: Vec<T> = target[range.clone()].to_vec();
					for (offset, item) in moved.into_iter().enumerate() {
						target[mapping[offset]] = item;
					}
				}
				ChangeRecord::Update { .. } => {}
			}
		}
	}

	pub fn added_count(&self) -> usize {
		self.records
			.iter()
			.map(|r| match r {
				ChangeRecord::Insert { added, .. } => added.len(),
				_ => 0,
			})
			.sum()
	}

	pub fn removed_count(&self) -> usize {
		self.records
			.iter()
			.map(|r| match r {
				ChangeRecord::Remove { removed, .. } => removed.len(),
				_ => 0,
			})
			.sum()
	}
}

impl<T: Clone + Eq + Hash> SetChange<T> {
	/// Replays the edits over `target`, which must hold the contents from
	/// before the transaction.
	pub fn apply_to<S: BuildHasher>(&self, target: &mut IndexSet<T, S>) {
		for record in &self.records {
			match record {
				SetChangeRecord::Added(value) => {
					target.insert(value.clone());
				}
				SetChangeRecord::Removed(value) => {
					target.shift_remove(value);
				}
			}
		}
	}
}
