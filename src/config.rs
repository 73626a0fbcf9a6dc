//! Default sizing for the task table and the stack arena
//!
//! Both sizes are const generic parameters of [`crate::Scheduler`], so each
//! application can pick its own. Every slot owns one stack region whether or
//! not a task is living in it, so tune these to avoid wasting RAM.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::frame::StackFrame;

/// The number of slots in the task table, unless you pick another.
pub const DEFAULT_MAX_TASKS: usize = 8;

/// The size of each task stack in bytes, unless you pick another.
pub const DEFAULT_STACK_SIZE: usize = 2048;

/// The smallest stack we can support.
///
/// Make space for one full synthetic frame, plus some headroom for the task
/// to call at least one function.
pub const MIN_STACK_SIZE: usize = StackFrame::SIZE + 64;

/// Check a task table and stack size pair, at compile time
///
/// Evaluated from a `const`, so a bad pair fails the build.
pub(crate) const fn check_sizes(max_tasks: usize, stack_size: usize) {
    assert!(max_tasks > 0, "need at least one task slot");
    assert!(
        max_tasks < isize::MAX as usize,
        "task index must fit the current task marker"
    );
    // AAPCS wants 8-byte aligned stacks, and every region top must stay aligned
    assert!(
        stack_size.is_multiple_of(8),
        "stack size must be a multiple of 8"
    );
    assert!(stack_size >= MIN_STACK_SIZE, "stack size too small");
}

const _: () = check_sizes(DEFAULT_MAX_TASKS, DEFAULT_STACK_SIZE);

// End of File
