//! Architecture ports
//!
//! A [`Port`] is everything the scheduler needs from the processor it runs
//! on: how a new task's frame looks, how to request a context switch, what to
//! do when nothing can run, and how the switch handler finds the one and only
//! [`crate::Scheduler`] object. Ports see that object through [`Schedule`],
//! so they work whatever size its task table is.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Schedule, TaskEntry, frame};

#[cfg(any(arm_abi = "eabi", arm_abi = "eabihf"))]
pub mod cortex_m;

#[cfg(any(test, feature = "std"))]
pub mod hosted;

/// The port for the target we are building for
#[cfg(any(arm_abi = "eabi", arm_abi = "eabihf"))]
pub type DefaultPort = cortex_m::CortexM;

/// The port for the target we are building for
#[cfg(all(
    not(any(arm_abi = "eabi", arm_abi = "eabihf")),
    any(test, feature = "std")
))]
pub type DefaultPort = hosted::Hosted;

/// The services an architecture provides to the scheduler
///
/// The port also owns the switch handler, which must save the outgoing
/// task's registers into a [`frame::StackFrame`] on its stack, call
/// [`Schedule::switch_context`], then restore the registers from the frame
/// it gets back and resume.
pub trait Port: Sized + Sync + 'static {
    /// Status register value a new task starts with
    const INITIAL_XPSR: usize;

    /// Value the switch handler returns through when starting a new task
    const INITIAL_EXC_RETURN: usize;

    /// Get the scheduler serving the calling context, if it has been started
    fn scheduler() -> Option<&'static dyn Schedule<Self>>;

    /// Request a context switch
    ///
    /// Returns once the calling task has been picked again, which for a
    /// finished task is never.
    fn trigger_switch(scheduler: &'static dyn Schedule<Self>);

    /// Called by the switch handler after each full lap of the task table
    /// that found nothing runnable
    ///
    /// `laps` counts the empty laps of this one switch, starting from 1, so
    /// it is 1 exactly once each time the scheduler runs out of work. If this
    /// returns, the switch handler keeps looking.
    fn starved(scheduler: &'static dyn Schedule<Self>, laps: usize);

    /// Stop the calling context for good
    fn halt() -> !;

    /// The address a task resumes at, for the given entry function
    fn entry_address(entry: TaskEntry) -> usize {
        entry as usize
    }

    /// Build the synthetic frame for a new task below `stack_top`, returning
    /// the task's initial stack pointer
    ///
    /// The frame resumes at `entry`, with the link register set to `exit` so
    /// that returning from `entry` lands in `exit`.
    ///
    /// # Safety
    ///
    /// There must be at least [`frame::StackFrame::SIZE`] writable bytes
    /// below `stack_top`, which must be 8-byte aligned.
    unsafe fn build_initial_frame(
        stack_top: *mut usize,
        entry: TaskEntry,
        exit: TaskEntry,
    ) -> *mut usize {
        // SAFETY: passed on from our caller
        unsafe {
            frame::push_initial_frame(
                stack_top,
                Self::entry_address(entry),
                exit as usize,
                Self::INITIAL_XPSR,
                Self::INITIAL_EXC_RETURN,
            )
        }
    }
}

// End of File
