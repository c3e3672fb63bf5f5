//! Error taxonomy for the handful of library entry points that can fail in
//! an ordinary, expected way (bad configuration, the OS refusing a resource).
//!
//! Everything else — a corrupted queue, scheduling with nothing runnable,
//! unlocking a mutex you don't own in a debug build — is a contract
//! violation and stays a panic. Threading `Result` through the scheduling
//! hot path would force callers to "handle" a broken invariant as if it were
//! routine control flow.

use std::io;
use thiserror::Error;

/// Recoverable failure modes exposed at the crate's public boundary.
#[derive(Debug, Error)]
pub enum GreenError {
    /// [`crate::init`] was called a second time.
    #[error("scheduler is already initialized")]
    AlreadyInitialized,

    /// A scheduler entry point was called before [`crate::init`].
    #[error("scheduler has not been initialized; call green_rt::init first")]
    NotInitialized,

    /// The allocator could not satisfy a task stack of the requested size.
    #[error("failed to allocate a {0}-byte task stack")]
    StackAllocation(usize),

    /// Installing the preemption signal handler or arming the interval
    /// timer failed.
    #[error("failed to install the preemption timer: {0}")]
    SignalSetup(#[source] io::Error),
}

/// Convenience alias for this crate's fallible return type.
pub type Result<T> = std::result::Result<T, GreenError>;
