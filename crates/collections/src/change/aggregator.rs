use crate::change::{Change, Classify, Group, OpClass};

/// Accumulates the records of one write transaction.
///
/// A new [`Group`] starts whenever a record's class differs from the
/// previous record's.
#[derive(Debug)]
pub struct ChangeAggregator<R> {
	records: Vec<R>,
	groups: Vec<Group>,
}

impl<R> Default for ChangeAggregator<R> {
	fn default() -> Self {
		Self {
			records: Vec::new(),
			groups: Vec::new(),
		}
	}
}

impl<R: Classify> ChangeAggregator<R> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record(&mut self, record: R) {
		let class = record.class();
		let at = self.records.len();
		self.records.push(record);
		match self.groups.last_mut() {
			Some(group) if group.class == class => {
				group.range.end = at + 1;
				return;
			}
			Some(group) => {
				tracing::trace!(from = group.class.as_str(), to = class.as_str(), at, "change.group_split");
			}
			None => {}
		}
		self.groups.push(Group { class, range: at..at + 1 });
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Class of the most recent record.
	pub fn current_class(&self) -> Option<OpClass> {
		self.groups.last().map(|g| g.class)
	}

	/// Drains the transaction, or `None` if nothing was recorded.
	pub fn finish(&mut self) -> Option<Change<R>> {
		if self.records.is_empty() {
			return None;
		}
		let records = std::mem::take(&mut self.records);
		let groups = std::mem::take(&mut self.groups);
		Some(Change::from_parts(records, groups))
	}

	/// Drops everything recorded so far and returns how many records were lost.
	pub fn discard(&mut self) -> usize {
		let dropped = self.records.len();
		self.records.clear();
		self.groups.clear();
		dropped
	}
}
