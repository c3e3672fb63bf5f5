//! A mutual-exclusion lock whose waiters block by moving onto a queue owned
//! by this `Mutex`, instead of spinning or handing off to an OS primitive.

use crate::queue::Queue;
use crate::scheduler;
use crate::task::TaskId;
use log::warn;
use std::cell::UnsafeCell;

struct State {
    taken: bool,
    waiters: Queue,
    #[cfg(debug_assertions)]
    owner: Option<TaskId>,
}

/// A lock around a `T`, acquired and released only from within the green
/// thread runtime — there is no OS thread here to block, so contending
/// tasks are simply moved off the ready queue until the lock is released.
pub struct Mutex<T> {
    state: UnsafeCell<State>,
    value: UnsafeCell<T>,
}

// Safety: every operation on `state` and `value` runs with `SIGVTALRM`
// blocked (a `CriticalSection` held), and there is exactly one OS thread,
// so no two tasks ever observe `Mutex<T>` concurrently in the sense `Sync`
// cares about.
unsafe impl<T: Send> Sync for Mutex<T> {}
unsafe impl<T: Send> Send for Mutex<T> {}

/// Grants access to the data while the lock is held. Dropping it unlocks.
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
}

impl<T> Mutex<T> {
    pub fn new(value: T) -> Self {
        Mutex {
            state: UnsafeCell::new(State {
                taken: false,
                waiters: Queue::new(),
                #[cfg(debug_assertions)]
                owner: None,
            }),
            value: UnsafeCell::new(value),
        }
    }

    /// Blocks the calling task until the lock is free, then takes it.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        loop {
            let cs = scheduler::critical_section();
            let state = unsafe { &mut *self.state.get() };
            if !state.taken {
                state.taken = true;
                #[cfg(debug_assertions)]
                {
                    state.owner = Some(scheduler::current_task_id());
                }
                drop(cs);
                return MutexGuard { mutex: self };
            }
            // `suspend_on` takes the critical section with it and only
            // returns once this task has been woken and rescheduled; loop
            // back around to recheck `taken` rather than assuming we got it
            // (another waiter may have raced us if several were woken).
            scheduler::suspend_on(&mut state.waiters, cs);
        }
    }

    /// Releases the lock this task currently holds and wakes one waiter, if
    /// any. Called automatically by `MutexGuard::drop`, and callable
    /// directly by a caller that obtained the guard and `mem::forget`'s it
    /// (or otherwise holds the lock without a guard). Panics in debug
    /// builds if the calling task is not the owner; in release builds,
    /// unlocking a mutex you do not hold is undefined behavior at the
    /// design level.
    pub fn unlock(&self) {
        let _cs = scheduler::critical_section();
        let state = unsafe { &mut *self.state.get() };
        debug_assert!(state.taken, "unlocking a mutex that is not held");
        #[cfg(debug_assertions)]
        {
            let caller = scheduler::current_task_id();
            if state.owner != Some(caller) {
                warn!(
                    "green: Mutex::unlock called by task {caller} which does not own the lock (owner is {:?})",
                    state.owner
                );
                panic!(
                    "Error: Mutex::unlock: called by task {caller}, but task {:?} holds the lock.",
                    state.owner
                );
            }
            state.owner = None;
        }
        state.taken = false;
        scheduler::wake_one(&mut state.waiters);
    }

    /// Releases the mutex and suspends the calling task on `queue` as a
    /// single atomic step — used by [`crate::sync::Condvar::wait`] so no
    /// signal delivered between "unlock" and "go to sleep" can be missed.
    pub(crate) fn unlock_for_wait(&self, queue: &mut Queue) {
        let cs = scheduler::critical_section();
        let state = unsafe { &mut *self.state.get() };
        debug_assert!(state.taken, "waiting on a condvar without holding its mutex");
        #[cfg(debug_assertions)]
        {
            state.owner = None;
        }
        state.taken = false;
        scheduler::wake_one(&mut state.waiters);
        scheduler::suspend_on(queue, cs);
    }
}

/// Recovers the `Mutex` a guard came from, so [`crate::sync::Condvar::wait`]
/// can release and later reacquire the right lock.
pub(crate) fn guarded_mutex<'a, T>(guard: &MutexGuard<'a, T>) -> &'a Mutex<T> {
    guard.mutex
}

impl<'a, T> std::ops::Deref for MutexGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.value.get() }
    }
}

impl<'a, T> std::ops::DerefMut for MutexGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.value.get() }
    }
}

impl<'a, T> Drop for MutexGuard<'a, T> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}
