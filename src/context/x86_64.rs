//! x86_64 System V context switch: save/restore `rsp` and the callee-saved
//! registers (`rbx`, `rbp`, `r12`-`r15`), then `ret` into whatever return
//! address sits on top of the restored stack.

use std::arch::asm;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Context {
    rsp: u64,
    rbx: u64,
    rbp: u64,
    r12: u64,
    r13: u64,
    r14: u64,
    r15: u64,
}

impl Context {
    /// Builds a context for a brand-new task so its first `switch_context`
    /// lands at `trampoline`, running on `stack_top` (the stack's highest
    /// address; it grows down).
    pub(crate) fn init(stack_top: *mut u8, trampoline: unsafe extern "C" fn() -> !) -> Self {
        debug_assert_eq!(stack_top as usize % 16, 0, "stack top must be 16-byte aligned");
        let rsp = unsafe {
            // `ret` pops a return address; plant `trampoline` where a `call`
            // would have pushed one so the very first switch "returns" into it.
            let slot = (stack_top as *mut u64).sub(1);
            *slot = trampoline as usize as u64;
            slot as u64
        };
        Context {
            rsp,
            ..Default::default()
        }
    }
}

/// Saves the current callee-saved registers and `rsp` into `*old`, loads
/// them from `*new`, then `ret`s — into a resumed task's saved return point,
/// or a newly spawned task's trampoline.
#[inline(never)]
pub(crate) unsafe fn switch_context(old: *mut Context, new: *const Context) {
    asm!(
        "mov [rdi + 0x00], rsp",
        "mov [rdi + 0x08], rbx",
        "mov [rdi + 0x10], rbp",
        "mov [rdi + 0x18], r12",
        "mov [rdi + 0x20], r13",
        "mov [rdi + 0x28], r14",
        "mov [rdi + 0x30], r15",
        "mov rsp, [rsi + 0x00]",
        "mov rbx, [rsi + 0x08]",
        "mov rbp, [rsi + 0x10]",
        "mov r12, [rsi + 0x18]",
        "mov r13, [rsi + 0x20]",
        "mov r14, [rsi + 0x28]",
        "mov r15, [rsi + 0x30]",
        "ret",
        in("rdi") old,
        in("rsi") new,
        clobber_abi("C"),
    );
}
