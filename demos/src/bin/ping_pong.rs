//! Two tasks taking turns, plus one that sleeps
//!
//! `ping` and `pong` yield to each other as fast as they can. `snooze` wakes
//! up every 10 ticks, and ends the demo once it has done that a few times.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use coops::{
    Scheduler,
    port::cortex_m::{CortexM, SYSTICK_CLOCK},
};

use coops_demos::SYSTICKS_PER_TICK;

static SCHEDULER: Scheduler<CortexM> = Scheduler::new(CortexM::new(), &SYSTICK_CLOCK);

static PINGS: AtomicU32 = AtomicU32::new(0);

#[cortex_m_rt::entry]
fn main() -> ! {
    let mut cp = cortex_m::Peripherals::take().unwrap();
    defmt::info!("Hello!");
    SCHEDULER.create_task(ping).unwrap();
    SCHEDULER.create_task(pong).unwrap();
    SCHEDULER.create_task(snooze).unwrap();
    SCHEDULER.start(&mut cp.SCB, cp.SYST, SYSTICKS_PER_TICK);
}

/// Our 'ping' task
extern "C" fn ping() {
    loop {
        PINGS.fetch_add(1, Ordering::Relaxed);
        coops::yield_now();
    }
}

/// Our 'pong' task
extern "C" fn pong() {
    loop {
        defmt::trace!("Pong!");
        coops::yield_now();
    }
}

/// Our 'snooze' task
extern "C" fn snooze() {
    for _ in 0..5 {
        coops::sleep(10);
        defmt::info!("Awake, after {=u32} pings", PINGS.load(Ordering::Relaxed));
    }
    coops_demos::exit_success();
}

// End of File
