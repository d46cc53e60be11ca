//! Executors used to deliver listener callbacks.
//!
//! An [`Executor`] accepts boxed closures and runs them somewhere: inline on
//! the submitting thread ([`DirectExecutor`]), in submission order on one
//! dedicated thread ([`SerialExecutor`]), or on a tokio runtime
//! ([`TokioExecutor`]).

mod executor;
mod panic;
mod serial;
mod spawn;

pub use executor::{DirectExecutor, Executor, Task, TokioExecutor, direct};
pub use panic::panic_message;
pub use serial::SerialExecutor;
pub use spawn::spawn_named_thread;
