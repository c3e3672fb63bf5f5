//! A user-space M:1 green thread scheduler: many cooperatively- and
//! preemptively-scheduled tasks multiplexed onto a single OS thread, with
//! mutex and condition-variable primitives built directly on the
//! scheduler's own queues rather than on OS synchronization.
//!
//! ```no_run
//! use green_rt::SchedulerConfig;
//!
//! green_rt::init(SchedulerConfig::default()).unwrap();
//! let handle = green_rt::spawn(|| {
//!     println!("hello from a green thread");
//! }).unwrap();
//! handle.join();
//! ```
//!
//! # Architecture Overview
//!
//! [`init`] installs a single process-wide [`Scheduler`](scheduler) holding
//! an append-only arena of task descriptors and a ready queue. [`spawn`]
//! allocates a stack, plants a [`Context`](context::Context) that resumes at
//! a trampoline, and appends the new task to the ready queue. [`yield_now`]
//! and [`JoinHandle::join`] cooperatively switch directly between tasks; the
//! preemption timer installed by [`preempt`] does the same from inside a
//! `SIGVTALRM` handler when [`SchedulerConfig::cooperative_only`] is not
//! set. [`sync::Mutex`] and [`sync::Condvar`] block by moving the calling
//! task onto a queue of their own instead of spinning.
//!
//! # Safety Considerations
//!
//! There is exactly one OS thread running this scheduler; "concurrency"
//! here means interleaving, never parallelism. Every mutation of scheduler
//! state happens with `SIGVTALRM` blocked (see [`critical`]), so a `&mut`
//! reference into the scheduler's arena is never aliased. Context switches
//! themselves are `unsafe`, hand-written `asm!` per target architecture
//! (see [`context`]) and are confined to the scheduler's internals; none of
//! it is reachable from the public API without going through [`spawn`],
//! [`yield_now`], [`JoinHandle::join`], or the [`sync`] primitives.
//!
//! # Limitations
//!
//! No work-stealing, no multi-core parallelism, no async/await integration.
//! A task that blocks on a real OS syscall blocks the entire process; this
//! crate assumes tasks cooperate by yielding, blocking on its own
//! primitives, or running short enough quanta for preemption to rotate them.
//!
//! # Non-goals
//!
//! Timer-driven wakeups unrelated to preemption, cross-process scheduling,
//! and a stable C ABI are outside this crate's scope.

mod config;
mod context;
mod critical;
mod error;
mod preempt;
mod queue;
mod scheduler;
mod sync;
mod task;

pub use config::{SchedulerConfig, DEFAULT_QUANTUM, DEFAULT_STACK_SIZE};
pub use error::{GreenError, Result};
pub use scheduler::{init, spawn, yield_now, JoinHandle};
#[cfg(feature = "test-util")]
pub use scheduler::reset_for_test;
pub use sync::{Condvar, Mutex, MutexGuard};
pub use task::TaskId;
