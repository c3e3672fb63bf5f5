//! The scheduler core: a single ready queue, an append-only task arena, and
//! the switch/spawn/yield/join/terminate operations that move tasks between
//! them.
//!
//! All state lives in one process-wide [`Scheduler`], reached through
//! `static mut SCHEDULER` behind the safe accessors below. There is exactly
//! one OS thread running this code, so a `&mut` obtained under a
//! [`CriticalSection`] is never aliased.

use crate::config::SchedulerConfig;
use crate::context::{self, Context};
use crate::critical::{self, CriticalSection};
use crate::error::{GreenError, Result};
use crate::preempt;
use crate::queue::Queue;
use crate::task::{Arena, Entry, Slot, Stack, Task, TaskId};
use log::{debug, error, trace};
use std::mem;
use std::panic::{self, AssertUnwindSafe};

/// The single process-wide scheduler. `None` until [`init`] runs.
static mut SCHEDULER: Option<Scheduler> = None;

struct Scheduler {
    arena: Arena,
    ready: Queue,
    /// The task presently running. Its `Context` in the arena is stale
    /// while it runs — `switch_context` only writes it at the moment this
    /// task gives up the CPU.
    current: Slot,
    next_id: TaskId,
    config: SchedulerConfig,
}

/// Initializes the scheduler on the calling OS thread, registering it as
/// the "main" task (id 0). Installs the preemption timer unless
/// `config.cooperative_only()` was set. Must be called exactly once.
pub fn init(config: SchedulerConfig) -> Result<()> {
    unsafe {
        if SCHEDULER.is_some() {
            return Err(GreenError::AlreadyInitialized);
        }
        let mut arena = Arena::new();
        let main_slot = arena.insert(Task::main(0));
        SCHEDULER = Some(Scheduler {
            arena,
            ready: Queue::new(),
            current: main_slot,
            next_id: 1,
            config: config.clone(),
        });
    }
    if !config.cooperative_only {
        preempt::install(config.quantum)?;
    }
    debug!(
        "green: scheduler initialized (cooperative_only={}, quantum={:?})",
        config.cooperative_only, config.quantum
    );
    Ok(())
}

fn sched() -> &'static mut Scheduler {
    unsafe {
        SCHEDULER
            .as_mut()
            .expect("Error: scheduler::sched: called before init.")
    }
}

/// Returns `Err(NotInitialized)` instead of panicking, for call sites that
/// can gracefully report the condition to a caller.
fn try_sched() -> Result<&'static mut Scheduler> {
    unsafe { SCHEDULER.as_mut().ok_or(GreenError::NotInitialized) }
}

/// A handle to a spawned task, returned by [`spawn`]. Cheap to copy — it is
/// just a slot index and an id — so more than one task may hold a handle to
/// the same spawned task and each may call [`JoinHandle::join`].
#[derive(Clone, Copy)]
pub struct JoinHandle {
    slot: Slot,
    id: TaskId,
}

impl JoinHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Blocks the calling task until the joined task terminates. Returns
    /// immediately if it already has. Safe to call more than once, and from
    /// more than one [`JoinHandle`] referring to the same task; waiters are
    /// woken in the reverse of the order they called `join`.
    pub fn join(&self) {
        join(self.slot);
    }
}

/// Spawns `entry` as a new task on its own stack and places it on the ready
/// queue. Does not run it immediately; the caller keeps running until it
/// yields, blocks, or is preempted.
pub fn spawn<F>(entry: F) -> Result<JoinHandle>
where
    F: FnOnce() + 'static,
{
    let _cs = CriticalSection::enter();
    let s = try_sched()?;
    let stack = Stack::new(s.config.stack_size)?;
    let ctx = Context::new(stack.top(), trampoline);
    let id = s.next_id;
    s.next_id += 1;
    let slot = s.arena.insert(Task::spawned(id, ctx, stack, Box::new(entry) as Entry));
    s.ready.push(&mut s.arena, slot);
    trace!("green: spawned task {id}");
    Ok(JoinHandle { slot, id })
}

/// Gives up the remainder of the current task's quantum cooperatively,
/// running the next ready task if one exists.
pub fn yield_now() {
    let cs = CriticalSection::enter();
    let s = sched();
    if s.ready.is_empty() {
        // Nothing else to run; fall straight back through.
        return;
    }
    let from = s.current;
    s.ready.push(&mut s.arena, from);
    let to = s.ready.pop(&mut s.arena);
    s.current = to;
    switch(cs, from, to);
}

/// Blocks the calling task until the task behind `slot` terminates. Returns
/// immediately if it already has. Safe to call from multiple joiners; they
/// are all woken, in the reverse of the order they called `join`.
fn join(slot: Slot) {
    let cs = CriticalSection::enter();
    let s = sched();
    if s.arena.get(slot).done {
        return;
    }
    let from = s.current;
    // Reuse `from`'s own `next` field as a singly-linked LIFO stack rooted
    // at the target's `join_waiters` — `from` is not a member of any queue
    // while it waits here, so its `next` field is free to borrow.
    debug_assert!(s.arena.get(from).next.is_none());
    let head = s.arena.get(slot).join_waiters;
    s.arena.get_mut(from).next = head;
    s.arena.get_mut(slot).join_waiters = Some(from);

    let to = s.ready.pop(&mut s.arena);
    s.current = to;
    switch(cs, from, to);
}

/// The first thing every spawned task runs on its own stack. Runs the
/// task's closure, isolating a panic so one task's unwind cannot corrupt
/// the scheduler's own stack, then tears the task down.
unsafe extern "C" fn trampoline() -> ! {
    critical::leave_after_resume();
    let slot = sched().current;
    let entry = sched()
        .arena
        .get_mut(slot)
        .entry
        .take()
        .expect("Error: scheduler::trampoline: task has no entry closure.");
    let result = panic::catch_unwind(AssertUnwindSafe(entry));
    if let Err(payload) = result {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Box<dyn Any>".to_string());
        error!("green: task panicked: {message}");
    }
    terminate_current();
}

/// Marks the current task done, wakes every joiner (LIFO), and switches
/// away permanently. Never returns: the terminated task's `Context` is
/// abandoned, nothing will ever switch back into it.
fn terminate_current() -> ! {
    let cs = CriticalSection::enter();
    let s = sched();
    let me = s.current;
    s.arena.get_mut(me).done = true;
    s.arena.get_mut(me).stack = None;

    let mut waiter = s.arena.get_mut(me).join_waiters.take();
    while let Some(w) = waiter {
        let next = s.arena.get_mut(w).next.take();
        s.ready.push(&mut s.arena, w);
        waiter = next;
    }

    let to = if s.ready.is_empty() {
        panic!("Error: scheduler::terminate_current: last task terminated with nothing to resume.")
    } else {
        s.ready.pop(&mut s.arena)
    };
    s.current = to;
    mem::forget(cs);
    unsafe {
        let ctx: *const Context = &s.arena.get(to).ctx;
        context::install_context(ctx);
    }
}

/// Called from the `SIGVTALRM` handler. Rotates the ready queue exactly
/// like [`yield_now`], except there is no caller frame to return to
/// normally: the interrupted task's context was saved by the `asm!` switch
/// just like any other, it simply didn't ask to be switched away from.
pub(crate) fn preempt() {
    let cs = CriticalSection::enter();
    let s = sched();
    if s.ready.is_empty() {
        return;
    }
    let from = s.current;
    s.ready.push(&mut s.arena, from);
    let to = s.ready.pop(&mut s.arena);
    s.current = to;
    switch(cs, from, to);
}

/// Common switch tail for `yield_now`/`join`/`preempt`: forgets the guard,
/// performs the raw register switch, and re-enters the critical section on
/// the resuming side via [`critical::leave_after_resume`].
fn switch(cs: CriticalSection, from: Slot, to: Slot) {
    mem::forget(cs);
    unsafe {
        let s = sched();
        let old: *mut Context = &mut s.arena.get_mut(from).ctx;
        let new: *const Context = &s.arena.get(to).ctx;
        context::switch_context(old, new);
        critical::leave_after_resume();
    }
}

/// Returns the id of the task presently running. Used by
/// [`crate::sync::Mutex`] for debug-only ownership tracking.
pub(crate) fn current_task_id() -> TaskId {
    let s = sched();
    s.arena.get(s.current).id
}

/// Moves the current task onto `queue` and switches to the next ready
/// task. Used by [`crate::sync::Mutex`] and [`crate::sync::Condvar`], whose
/// waiter queues live outside the `Scheduler` struct so there is no
/// aliasing hazard in taking `&mut Scheduler` and `&mut Queue` at once.
pub(crate) fn suspend_on(queue: &mut Queue, cs: CriticalSection) {
    let s = sched();
    let from = s.current;
    queue.push(&mut s.arena, from);
    let to = s.ready.pop(&mut s.arena);
    s.current = to;
    switch(cs, from, to);
}

/// Pops one task off `queue`, if any, and places it on the ready queue.
/// Returns whether a task was woken.
///
/// The signal mask is not reference-counted, so the caller must already be
/// holding a [`CriticalSection`] — entering a second one here and dropping
/// it before returning would unblock `SIGVTALRM` out from under an outer
/// critical section that is not done yet.
pub(crate) fn wake_one(queue: &mut Queue) -> bool {
    if queue.is_empty() {
        return false;
    }
    let s = sched();
    let woken = queue.pop(&mut s.arena);
    s.ready.push(&mut s.arena, woken);
    true
}

/// Enters a fresh [`CriticalSection`] for callers outside this module that
/// need one around a queue they own (mutex/condvar operations).
pub(crate) fn critical_section() -> CriticalSection {
    CriticalSection::enter()
}

/// Tears down the global scheduler so a fresh `init` can run. Only ever
/// useful between `#[test]`s, which otherwise share the one process-wide
/// scheduler Martos's own singleton `TaskManager` tests reset the same way.
#[cfg(feature = "test-util")]
pub fn reset_for_test() {
    unsafe {
        SCHEDULER = None;
    }
}
