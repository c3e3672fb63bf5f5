//! Scheduler configuration, read once at [`crate::init`] and immutable for
//! the life of the process.

use std::time::Duration;

/// Default per-task stack size.
///
/// The C implementation this crate is descended from used a 4096-byte
/// stack, which is too small for anything beyond the shallowest call graphs.
/// 64 KiB is a more realistic default for code compiled against a normal
/// Rust call stack; callers with tighter memory budgets can still ask for
/// less via [`SchedulerConfig::stack_size`].
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Default preemption quantum: how long a task may run before the timer
/// forces a yield.
pub const DEFAULT_QUANTUM: Duration = Duration::from_micros(100);

/// Configuration captured by [`crate::init`].
///
/// Construct with [`SchedulerConfig::default`] and adjust with the builder
/// methods, or build one field at a time:
///
/// ```
/// use green_rt::SchedulerConfig;
/// use std::time::Duration;
///
/// let config = SchedulerConfig::default()
///     .stack_size(128 * 1024)
///     .quantum(Duration::from_micros(500));
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub(crate) stack_size: usize,
    pub(crate) quantum: Duration,
    pub(crate) cooperative_only: bool,
}

impl SchedulerConfig {
    /// `const` constructor used for the scheduler's static initializer.
    pub const fn const_default() -> Self {
        SchedulerConfig {
            stack_size: DEFAULT_STACK_SIZE,
            quantum: DEFAULT_QUANTUM,
            cooperative_only: false,
        }
    }

    /// Sets the stack size every subsequently spawned task receives.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Sets the preemption quantum (ignored if `cooperative_only`).
    pub fn quantum(mut self, quantum: Duration) -> Self {
        self.quantum = quantum;
        self
    }

    /// Disables the preemption timer entirely. Every task must then yield
    /// voluntarily; this is the mode the deterministic test scenarios run
    /// under so interleavings are reproducible.
    pub fn cooperative_only(mut self, cooperative_only: bool) -> Self {
        self.cooperative_only = cooperative_only;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::const_default()
    }
}
