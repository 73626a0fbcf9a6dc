//! Holds the [`TaskId`] type and the task control block

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

/// The function a task starts in.
///
/// A task may return from it, in which case its slot in the task table is
/// released and can be handed to a new task.
pub type TaskEntry = extern "C" fn();

/// Represents a Task
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskId(usize);

impl TaskId {
    /// Represents the Task ID we produce when no task has run yet
    const INVALID_ID: usize = usize::MAX;

    /// Refer to the task in the given slot of the task table
    pub const fn new(index: usize) -> TaskId {
        TaskId(index)
    }

    /// Is this the invalid Task ID?
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID_ID
    }

    /// The slot in the task table, unless this is the invalid Task ID
    pub const fn index(self) -> Option<usize> {
        if self.is_invalid() {
            None
        } else {
            Some(self.0)
        }
    }

    /// Create an invalid Task ID
    pub(crate) const fn invalid() -> TaskId {
        TaskId(Self::INVALID_ID)
    }
}

#[cfg(target_os = "none")]
impl defmt::Format for TaskId {
    fn format(&self, fmt: defmt::Formatter) {
        if self.is_invalid() {
            defmt::write!(fmt, "T---");
        } else {
            defmt::write!(fmt, "T{=usize:03}", self.0);
        }
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_invalid() {
            write!(fmt, "T---")
        } else {
            write!(fmt, "T{:03}", self.0)
        }
    }
}

bitflags::bitflags! {
    /// Status bits held in every task control block
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub(crate) struct TaskFlags: u8 {
        /// The slot holds a live task
        const IN_USE = 1 << 0;
        /// The task is live but must not be picked
        const PAUSED = 1 << 1;
    }
}

impl TaskFlags {
    /// Can the scheduler pick a task with these flags?
    pub(crate) fn is_runnable(self) -> bool {
        self.contains(TaskFlags::IN_USE) && !self.contains(TaskFlags::PAUSED)
    }
}

/// What a slot in the task table is currently doing
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum TaskState {
    /// No task lives here
    Free,
    /// A live task, which the scheduler may pick
    Ready,
    /// A live task, which waits for someone to resume it
    Paused,
}

impl From<TaskFlags> for TaskState {
    fn from(flags: TaskFlags) -> TaskState {
        if !flags.contains(TaskFlags::IN_USE) {
            TaskState::Free
        } else if flags.contains(TaskFlags::PAUSED) {
            TaskState::Paused
        } else {
            TaskState::Ready
        }
    }
}

/// One slot in the task table
///
/// The saved stack pointer is only meaningful while the task is not running;
/// the running task's stack pointer lives in the hardware.
#[repr(C)]
pub(crate) struct TaskControlBlock {
    stack: AtomicPtr<usize>,
    flags: AtomicU8,
}

impl TaskControlBlock {
    /// Create a free slot
    pub(crate) const fn new() -> TaskControlBlock {
        TaskControlBlock {
            stack: AtomicPtr::new(core::ptr::null_mut()),
            flags: AtomicU8::new(0),
        }
    }

    /// Get the saved stack pointer for this task
    pub(crate) fn stack(&self) -> *mut usize {
        self.stack.load(Ordering::Relaxed)
    }

    /// Set the saved stack pointer for this task
    ///
    /// # Safety
    ///
    /// The task will resume using the stack given, so it must point to a
    /// complete frame, as laid out by [`crate::frame::StackFrame`], within
    /// this task's own stack region.
    pub(crate) unsafe fn set_stack(&self, new_stack: *mut usize) {
        self.stack.store(new_stack, Ordering::Relaxed)
    }

    /// Get the current status bits
    pub(crate) fn flags(&self) -> TaskFlags {
        TaskFlags::from_bits_truncate(self.flags.load(Ordering::Relaxed))
    }

    /// Overwrite the status bits
    ///
    /// Use [`TaskControlBlock::modify_flags`] if the new value depends on the
    /// old one.
    pub(crate) fn store_flags(&self, flags: TaskFlags) {
        self.flags.store(flags.bits(), Ordering::Relaxed)
    }

    /// Read-modify-write the status bits, returning the old value
    ///
    /// Armv6-M has no atomic read-modify-write instructions, and the
    /// switch handler must never see a half-done update, so this runs inside
    /// a critical section.
    pub(crate) fn modify_flags(&self, f: impl FnOnce(TaskFlags) -> TaskFlags) -> TaskFlags {
        critical_section::with(|_cs| {
            let old = self.flags();
            self.store_flags(f(old));
            old
        })
    }
}


// End of File
