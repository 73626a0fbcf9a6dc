//! # COOPS - a Cooperative, Round-Robin Task Scheduler
//!
//! Runs a fixed number of tasks on a single Arm Cortex-M core. Each task gets
//! a stack region of its own, and keeps the processor until it yields, sleeps,
//! pauses or returns. Then the next runnable task in the task table gets it.
//!
//! ```rust,ignore
//! static SCHEDULER: Scheduler<CortexM> = Scheduler::new(CortexM::new(), &SYSTICK_CLOCK);
//!
//! #[cortex_m_rt::entry]
//! fn main() -> ! {
//!     let mut cp = cortex_m::Peripherals::take().unwrap();
//!     SCHEDULER.create_task(rabbits).unwrap();
//!     SCHEDULER.start(&mut cp.SCB, cp.SYST, SYSTICKS_PER_TICK);
//! }
//!
//! extern "C" fn rabbits() {
//!     loop {
//!         coops::sleep(5);
//!     }
//! }
//! ```
//!
//! The task table defaults to [`DEFAULT_MAX_TASKS`] slots of
//! [`DEFAULT_STACK_SIZE`] bytes each. Pick other sizes to suit your RAM:
//!
//! ```rust,ignore
//! static SCHEDULER: Scheduler<CortexM, 3, 1024> = Scheduler::new(CortexM::new(), &SYSTICK_CLOCK);
//! ```
//!
//! With the `std` feature, [`port::hosted::Hosted`] runs the same scheduler
//! on a desktop, with one thread per task.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
mod log;

#[cfg(any(arm_abi = "eabi", arm_abi = "eabihf"))]
mod asm;
mod config;
mod error;
pub mod frame;
pub mod port;
mod scheduler;
mod stack;
mod stack_pusher;
mod task;
pub mod tick;

pub use config::{DEFAULT_MAX_TASKS, DEFAULT_STACK_SIZE, MIN_STACK_SIZE};
pub use error::Error;
pub use scheduler::{Schedule, Scheduler, TaskSelection};
use stack_pusher::StackPusher;
pub use task::{TaskEntry, TaskId, TaskState};
pub use tick::{Clock, MillisCounter};

#[cfg(any(arm_abi = "eabi", arm_abi = "eabihf", test, feature = "std"))]
pub use api::*;

/// Calls on whichever scheduler the calling task belongs to
#[cfg(any(arm_abi = "eabi", arm_abi = "eabihf", test, feature = "std"))]
mod api {
    use crate::{Error, Schedule, TaskId, port::DefaultPort, port::Port};

    /// Switch to the next runnable task, returning when this one is picked
    /// again
    ///
    /// Does nothing before the scheduler starts.
    pub fn yield_now() {
        if let Some(scheduler) = DefaultPort::scheduler() {
            scheduler.yield_now();
        }
    }

    /// Delay a task for at least the given number of ticks, yielding all the
    /// while
    pub fn sleep(ticks: u32) {
        if let Some(scheduler) = DefaultPort::scheduler() {
            scheduler.sleep(ticks);
        }
    }

    /// Stop the current task until another one resumes it
    pub fn pause() {
        if let Some(scheduler) = DefaultPort::scheduler() {
            scheduler.pause();
        }
    }

    /// Let a paused task run again
    pub fn resume(task_id: TaskId) -> Result<(), Error> {
        match DefaultPort::scheduler() {
            Some(scheduler) => scheduler.resume(task_id),
            None => Err(Error::NoSuchTask(task_id)),
        }
    }

    /// Get the ID of the running task
    ///
    /// You get the invalid Task ID before the first task switch.
    pub fn current_task() -> TaskId {
        DefaultPort::scheduler()
            .map(|scheduler| scheduler.current_task())
            .unwrap_or(TaskId::invalid())
    }

    /// Get the current time in ticks
    pub fn now() -> u32 {
        match DefaultPort::scheduler() {
            Some(scheduler) => scheduler.now(),
            None => 0xFFFF_FFFF,
        }
    }

    /// A task body that does nothing but yield
    ///
    /// Create one of these if you would rather the processor spins than
    /// having the scheduler starve when every other task is paused.
    pub extern "C" fn idle() {
        loop {
            yield_now();
        }
    }
}

// End of File
