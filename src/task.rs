//! Task descriptor storage: the append-only slab every queue indexes into,
//! and the owned stack each spawned task runs on.

use crate::context::Context;
use crate::error::{GreenError, Result};
use std::alloc::{alloc, dealloc, Layout};

/// Identifies a task for logging and `JoinHandle` equality; never reused.
pub type TaskId = u64;

/// Index into the scheduler's [`Arena`]. Slots are never freed, so a `Slot`
/// stays valid for the life of the process once handed out.
pub(crate) type Slot = usize;

pub(crate) type Entry = Box<dyn FnOnce() + 'static>;

const STACK_ALIGN: usize = 16;

/// An owned, heap-allocated task stack, freed when the task terminates (or
/// when the `Stack` is otherwise dropped).
pub(crate) struct Stack {
    ptr: *mut u8,
    layout: Layout,
}

impl Stack {
    pub(crate) fn new(size: usize) -> Result<Self> {
        let layout =
            Layout::from_size_align(size, STACK_ALIGN).map_err(|_| GreenError::StackAllocation(size))?;
        let ptr = unsafe { alloc(layout) };
        if ptr.is_null() {
            return Err(GreenError::StackAllocation(size));
        }
        Ok(Stack { ptr, layout })
    }

    /// Highest address of the region; the stack grows down from here.
    pub(crate) fn top(&self) -> *mut u8 {
        let top = (self.ptr as usize + self.layout.size()) & !(STACK_ALIGN - 1);
        top as *mut u8
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr, self.layout) };
    }
}

/// A single green thread's saved state.
///
/// `next` is reused by whichever queue currently owns this task: the ready
/// queue, a mutex's or a condvar's waiter queue, or — while some other task
/// is blocked joining this one — this task's own `join_waiters` chain. A
/// task is a member of at most one of those at a time.
pub(crate) struct Task {
    pub(crate) id: TaskId,
    pub(crate) ctx: Context,
    pub(crate) stack: Option<Stack>,
    pub(crate) entry: Option<Entry>,
    pub(crate) next: Option<Slot>,
    pub(crate) join_waiters: Option<Slot>,
    pub(crate) done: bool,
}

impl Task {
    /// Descriptor for the OS thread that calls `init`, so it participates in
    /// scheduling like any spawned task.
    ///
    /// Its `ctx` starts zeroed and is never read before it is written: the
    /// first time the main task is ever switched away from, `switch_context`
    /// saves its *live* register state into this slot, the same way the
    /// original C implementation's `getcontext` is only ever meaningful
    /// relative to a later `swapcontext`.
    pub(crate) fn main(id: TaskId) -> Self {
        Task {
            id,
            ctx: Context::default(),
            stack: None,
            entry: None,
            next: None,
            join_waiters: None,
            done: false,
        }
    }

    pub(crate) fn spawned(id: TaskId, ctx: Context, stack: Stack, entry: Entry) -> Self {
        Task {
            id,
            ctx,
            stack: Some(stack),
            entry: Some(entry),
            next: None,
            join_waiters: None,
            done: false,
        }
    }
}

/// Append-only slab of tasks.
///
/// Slots are never reused: a terminated task's descriptor (with its stack
/// and entry closure already freed) stays valid for the life of the process
/// so a late `join` can still observe that it finished.
pub(crate) struct Arena {
    slots: Vec<Task>,
}

impl Arena {
    pub(crate) const fn new() -> Self {
        Arena { slots: Vec::new() }
    }

    pub(crate) fn insert(&mut self, task: Task) -> Slot {
        self.slots.push(task);
        self.slots.len() - 1
    }

    pub(crate) fn get(&self, slot: Slot) -> &Task {
        &self.slots[slot]
    }

    pub(crate) fn get_mut(&mut self, slot: Slot) -> &mut Task {
        &mut self.slots[slot]
    }
}
