//! Observable collections that many threads read and write concurrently.
//!
//! [`ObservableList`] and [`ObservableSet`] serialise structural mutation
//! through a reentrant [`weft_sync::StampedLock`]. Every elementary edit made
//! inside one outermost write scope is recorded, and the batch is delivered
//! to listeners exactly once when that scope ends, before the lock is
//! released. Listeners run on the [`weft_worker::Executor`] they were
//! registered with.
//!
//! ```
//! use weft_collections::{ChangeRecord, ObservableList};
//!
//! let list = ObservableList::new();
//! let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! list.add_change_listener(move |change| sink.lock().extend(change.records().to_vec()));
//!
//! {
//! 	let guard = list.lock().unwrap();
//! 	guard.push("a").unwrap();
//! 	guard.set(0, "b").unwrap();
//! }
//! assert_eq!(seen.lock().len(), 2);
//! assert!(matches!(seen.lock()[1], ChangeRecord::Replace { index: 0, .. }));
//! ```

mod access;
mod binding;
mod change;
mod collection;
pub mod config;
pub mod diagnostics;
mod engine;
mod error;
mod list;
mod listener;
mod observer;
mod property;
mod ring;
mod set;
mod view;

pub use access::{AccessMode, LockedCollection, ReadOnlyReason};
pub use binding::ContentBinding;
pub use change::{Change, ChangeAggregator, ChangeRecord, Classify, Group, ListChange, OpClass, SetChange, SetChangeRecord};
pub use collection::ObservableCollection;
pub use config::DispatchConfig;
pub use error::CollectionError;
pub use list::{ListBuilder, ListCursor, LockedList, ObservableList, SubList};
pub use listener::{ListenerId, ListenerRegistry, ListenerStats, RegistryShape};
pub use observer::{Dependency, Subscription};
pub use property::Property;
pub use ring::RingBuffer;
pub use set::{LockedSet, ObservableSet, SetBuilder};
pub use view::{ReadOnlyList, ReadOnlySet};
pub use weft_sync::{LockError, Stamp, StampedLock};
pub use weft_worker::{DirectExecutor, Executor, SerialExecutor, TokioExecutor};
