//! Architecture-specific CPU context save/restore.
//!
//! A [`Context`] holds exactly the state needed to resume a task where it
//! last yielded or was preempted: the stack pointer and the callee-saved
//! registers the platform's calling convention guarantees survive a call.
//! Caller-saved registers need no attention because every switch crosses a
//! function-call boundary, the same reasoning the `ucontext.h` family of
//! APIs that the original implementation used is built on.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        mod x86_64;
        pub(crate) use self::x86_64::{switch_context, Context};
    } else if #[cfg(target_arch = "aarch64")] {
        mod aarch64;
        pub(crate) use self::aarch64::{switch_context, Context};
    } else {
        compile_error!("green-rt has no Context implementation for this target architecture");
    }
}

impl Context {
    /// Builds a context for a brand-new task so its first `switch_context`
    /// resumes execution at `trampoline` with `stack_top` as its stack.
    pub(crate) fn new(stack_top: *mut u8, trampoline: unsafe extern "C" fn() -> !) -> Self {
        Self::init(stack_top, trampoline)
    }
}

/// Switches into `new`, never to return here. Used when a task terminates
/// and has nothing to save: `old` is a throwaway that nothing will ever
/// switch back into.
pub(crate) unsafe fn install_context(new: *const Context) -> ! {
    let mut discard = Context::default();
    switch_context(&mut discard, new);
    unreachable!("install_context: nothing ever switches back into a discarded context")
}
