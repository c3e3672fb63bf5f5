//! Periodic virtual-time preemption.
//!
//! Installs a `SIGVTALRM` handler and arms `ITIMER_VIRTUAL` for the
//! configured quantum. The handler rotates the ready queue exactly like
//! [`crate::yield_now`], but is invoked by the kernel at an arbitrary
//! instruction boundary rather than by user code, and does not go through
//! [`crate::critical::CriticalSection`] — the kernel only delivers
//! `SIGVTALRM` when it is unblocked, which is precisely the set of program
//! points outside a critical section.

use crate::error::{GreenError, Result};
use crate::scheduler;
use log::trace;
use std::io;
use std::mem::MaybeUninit;
use std::time::Duration;

pub(crate) fn install(quantum: Duration) -> Result<()> {
    unsafe {
        let mut action: libc::sigaction = MaybeUninit::zeroed().assume_init();
        action.sa_sigaction = handler as usize;
        action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(libc::SIGVTALRM, &action, std::ptr::null_mut()) != 0 {
            return Err(GreenError::SignalSetup(io::Error::last_os_error()));
        }

        let micros = quantum.as_micros().max(1) as i64;
        let interval = libc::timeval {
            tv_sec: micros / 1_000_000,
            tv_usec: (micros % 1_000_000) as libc::suseconds_t,
        };
        let timer = libc::itimerval {
            it_interval: interval,
            it_value: interval,
        };
        if libc::setitimer(libc::ITIMER_VIRTUAL, &timer, std::ptr::null_mut()) != 0 {
            return Err(GreenError::SignalSetup(io::Error::last_os_error()));
        }
    }
    Ok(())
}

extern "C" fn handler(_signum: libc::c_int) {
    unsafe { crate::critical::restore_after_signal_entry() };
    trace!("green: preemption tick");
    scheduler::preempt();
}
