//! Worker threads and the per-worker storage they share with the control task.

mod pool;
mod slot;

pub use pool::WorkerPool;
pub use slot::{BroadcastCompletion, Slot};
