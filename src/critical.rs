//! The single process-wide gate every scheduler-state mutation happens
//! under: blocking `SIGVTALRM` so the preemption timer cannot interrupt a
//! queue mutation partway through.
//!
//! Every safe entry point constructs a [`CriticalSection`] at the top. Most
//! let it `Drop` normally on return. The scheduler's own suspension points
//! (`yield_now`, `join`, mutex/condvar wait) instead `mem::forget` it
//! immediately before a `switch_context` call and rely on
//! [`leave_after_resume`] to unblock once some task resumes past that call
//! — not necessarily the same task that entered. Grep for `mem::forget(cs)`
//! and `leave_after_resume()` to check the pairing.

use std::marker::PhantomData;
use std::mem::MaybeUninit;

fn vtalrm_set() -> libc::sigset_t {
    unsafe {
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();
        libc::sigemptyset(set.as_mut_ptr());
        libc::sigaddset(set.as_mut_ptr(), libc::SIGVTALRM);
        set.assume_init()
    }
}

unsafe fn block() {
    let set = vtalrm_set();
    libc::sigprocmask(libc::SIG_BLOCK, &set, std::ptr::null_mut());
}

unsafe fn unblock() {
    let set = vtalrm_set();
    libc::sigprocmask(libc::SIG_UNBLOCK, &set, std::ptr::null_mut());
}

/// RAII guard over the critical section. Deliberately `!Send`/`!Sync` (via
/// the `PhantomData<*const ()>`) — it makes no sense to move this across
/// anything resembling a thread boundary.
pub(crate) struct CriticalSection(PhantomData<*const ()>);

impl CriticalSection {
    pub(crate) fn enter() -> Self {
        unsafe { block() };
        CriticalSection(PhantomData)
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        unsafe { unblock() };
    }
}

/// Re-pairs with a `mem::forget`'d [`CriticalSection`]. Called once at the
/// very top of the trampoline, and once immediately after every
/// `switch_context`/`install_context` call site that carried a forgotten
/// guard across the switch.
pub(crate) unsafe fn leave_after_resume() {
    unblock();
}

/// Switching stacks from inside the preemption signal handler bypasses the
/// kernel's `sigreturn`, which is what would normally undo the automatic
/// re-block of `SIGVTALRM` the kernel performs on handler entry. Without
/// this, the first preemption tick would block the timer signal forever.
/// Called once, first thing, whenever the handler is about to switch away
/// instead of returning normally.
pub(crate) unsafe fn restore_after_signal_entry() {
    unblock();
}
