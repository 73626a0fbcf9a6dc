//! The saved register frame of a suspended task
//!
//! When a task is switched out, two things are pushed onto its stack. First
//! the hardware stacks the caller-saved registers, the return address and the
//! status register on exception entry. Then the switch handler pushes the
//! callee-saved registers, plus the `EXC_RETURN` value it must later return
//! through. The task's saved stack pointer then points at the lowest word.
//!
//! ```text
//! high address   xPSR  <- the Thumb bit, for a new task
//!                PC    <- the task entry point, for a new task
//!                LR    <- the exit trampoline, for a new task
//!                R12
//!                R3 .. R0
//!                EXC_RETURN
//! low address    R11 .. R4    <- saved stack pointer
//! ```
//!
//! A new task gets a synthetic frame of exactly this shape, so the first
//! switch into it looks just like resuming a task that yielded.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::StackPusher;

/// The registers the switch handler saves and restores itself
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SoftwareFrame {
    pub r4: usize,
    pub r5: usize,
    pub r6: usize,
    pub r7: usize,
    pub r8: usize,
    pub r9: usize,
    pub r10: usize,
    pub r11: usize,
    /// The value of LR on entry to the switch handler
    pub exc_return: usize,
}

/// The registers the hardware stacks on exception entry
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct HardwareFrame {
    pub r0: usize,
    pub r1: usize,
    pub r2: usize,
    pub r3: usize,
    pub r12: usize,
    pub lr: usize,
    pub pc: usize,
    pub xpsr: usize,
}

/// A complete saved context, as found at a suspended task's stack pointer
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub software: SoftwareFrame,
    pub hardware: HardwareFrame,
}

impl StackFrame {
    /// Size of a frame, in bytes
    pub const SIZE: usize = core::mem::size_of::<StackFrame>();

    /// Size of a frame, in machine words
    pub const WORDS: usize = Self::SIZE / core::mem::size_of::<usize>();
}

/// Push a synthetic frame for a task that has never run
///
/// Everything is zero apart from the status register, the resume address, the
/// link register and the `EXC_RETURN` value. Returns the new stack pointer.
///
/// # Safety
///
/// There must be at least [`StackFrame::SIZE`] writable bytes below
/// `stack_top`, and `stack_top` must be aligned for `usize`.
pub(crate) unsafe fn push_initial_frame(
    stack_top: *mut usize,
    pc: usize,
    lr: usize,
    xpsr: usize,
    exc_return: usize,
) -> *mut usize {
    // SAFETY: the caller guarantees the space
    let mut stack_pusher = unsafe { StackPusher::new(stack_top) };

    // Standard Arm exception frame

    // xPSR
    stack_pusher.push(xpsr);
    // PC
    stack_pusher.push(pc);
    // LR
    stack_pusher.push(lr);
    // R12, R3, R2, R1, R0
    stack_pusher.push_repeated(0, 5);

    // Additional task state we persist

    stack_pusher.push(exc_return);
    // R11 - R4
    stack_pusher.push_repeated(0, 8);

    stack_pusher.current()
}


// End of File
