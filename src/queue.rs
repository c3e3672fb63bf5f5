//! Intrusive singly-linked FIFO queue.
//!
//! There is no allocation here: every node is a slot already owned by the
//! scheduler's [`Arena`]; the queue only remembers which slot is first and
//! last and threads the arena's own `next` field between them. A task may be
//! linked into at most one queue (or join-chain) at a time.

use crate::task::{Arena, Slot};

#[derive(Clone, Copy)]
pub(crate) struct Queue {
    front: Option<Slot>,
    back: Option<Slot>,
}

impl Queue {
    pub(crate) const fn new() -> Self {
        Queue {
            front: None,
            back: None,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.front.is_none()
    }


    /// Appends `slot` at the tail. `slot`'s `next` link must already be
    /// `None` on entry — the caller is asserting it isn't a member of any
    /// other queue right now.
    pub(crate) fn push(&mut self, arena: &mut Arena, slot: Slot) {
        debug_assert!(
            arena.get(slot).next.is_none(),
            "task pushed while already linked into another queue"
        );
        match self.back {
            None => {
                self.front = Some(slot);
                self.back = Some(slot);
            }
            Some(back) => {
                arena.get_mut(back).next = Some(slot);
                self.back = Some(slot);
            }
        }
    }

    /// Removes and returns the head.
    ///
    /// Calling this on an empty queue is a contract violation: every caller
    /// in this crate pops only after establishing that something is
    /// runnable. Left as a panic by design, not a `Result`.
    pub(crate) fn pop(&mut self, arena: &mut Arena) -> Slot {
        let slot = self
            .front
            .expect("Error: Queue::pop: called on an empty queue.");
        let next = arena.get_mut(slot).next.take();
        self.front = next;
        if next.is_none() {
            self.back = None;
        }
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn arena_with(n: usize) -> (Arena, Vec<Slot>) {
        let mut arena = Arena::new();
        let slots = (0..n as u64).map(|id| arena.insert(Task::main(id))).collect();
        (arena, slots)
    }

    #[test]
    fn fifo_order_is_preserved() {
        let (mut arena, slots) = arena_with(3);
        let mut q = Queue::new();
        for &s in &slots {
            q.push(&mut arena, s);
        }
        for &s in &slots {
            assert_eq!(q.pop(&mut arena), s);
        }
        assert!(q.is_empty());
    }

    #[test]
    fn front_and_back_invariant_holds_through_interleaved_use() {
        let (mut arena, slots) = arena_with(4);
        let mut q = Queue::new();
        q.push(&mut arena, slots[0]);
        q.push(&mut arena, slots[1]);
        assert_eq!(q.pop(&mut arena), slots[0]);
        q.push(&mut arena, slots[2]);
        q.push(&mut arena, slots[3]);
        assert_eq!(q.pop(&mut arena), slots[1]);
        assert_eq!(q.pop(&mut arena), slots[2]);
        assert_eq!(q.pop(&mut arena), slots[3]);
        assert!(q.is_empty());
    }

    #[test]
    #[should_panic(expected = "Error: Queue::pop: called on an empty queue.")]
    fn pop_on_empty_queue_panics() {
        let mut arena = Arena::new();
        let mut q = Queue::new();
        q.pop(&mut arena);
    }
}
