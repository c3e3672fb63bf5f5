//! Blocking synchronization primitives built directly on the scheduler's own
//! queues: no OS mutex or condition variable underneath either of these.

mod condvar;
mod mutex;

pub use condvar::Condvar;
pub use mutex::{Mutex, MutexGuard};
