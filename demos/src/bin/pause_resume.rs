//! A controller pausing and resuming a worker
//!
//! The worker does one step of work and then pauses itself. The controller
//! resumes it every 5 ticks. Meanwhile a short-lived task returns, and the
//! controller reuses its slot for a new one.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use coops::{
    Scheduler, TaskId, TaskState,
    port::cortex_m::{CortexM, SYSTICK_CLOCK},
};

use coops_demos::SYSTICKS_PER_TICK;

static SCHEDULER: Scheduler<CortexM> = Scheduler::new(CortexM::new(), &SYSTICK_CLOCK);

static WORKER_ID: AtomicUsize = AtomicUsize::new(usize::MAX);

static STEPS: AtomicU32 = AtomicU32::new(0);

#[cortex_m_rt::entry]
fn main() -> ! {
    let mut cp = cortex_m::Peripherals::take().unwrap();
    defmt::info!("Hello!");
    let worker_id = SCHEDULER.create_task(worker).unwrap();
    WORKER_ID.store(worker_id.index().unwrap(), Ordering::Relaxed);
    SCHEDULER.create_task(one_shot).unwrap();
    SCHEDULER.create_task(controller).unwrap();
    SCHEDULER.start(&mut cp.SCB, cp.SYST, SYSTICKS_PER_TICK);
}

/// Does one step per resume
extern "C" fn worker() {
    loop {
        let steps = STEPS.fetch_add(1, Ordering::Relaxed) + 1;
        defmt::info!("Worker step {=u32}", steps);
        coops::pause();
    }
}

/// Returns straight away, freeing its slot
extern "C" fn one_shot() {
    defmt::info!("One shot, done");
}

/// Keeps the worker going, then stops the demo
extern "C" fn controller() {
    let worker_id = TaskId::new(WORKER_ID.load(Ordering::Relaxed));
    let replacement = SCHEDULER.create_task(one_shot).unwrap();
    defmt::info!("Re-used slot {}", replacement);

    while STEPS.load(Ordering::Relaxed) < 5 {
        coops::sleep(5);
        if SCHEDULER.task_state(worker_id) == TaskState::Paused {
            coops::resume(worker_id).unwrap();
        }
    }

    defmt::info!(
        "Worker used {=usize} bytes of stack",
        SCHEDULER.stack_high_water(worker_id).unwrap_or(0)
    );
    coops_demos::exit_success();
}

// End of File
