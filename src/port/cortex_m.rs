//! The Arm Cortex-M port
//!
//! Context switches happen in the PendSV exception, which runs at the lowest
//! priority so it only fires once every other interrupt is done. Tasks run in
//! Thread mode on the Process stack. SysTick drives [`SYSTICK_CLOCK`].

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::{
    cell::Cell,
    sync::atomic::{AtomicIsize, AtomicPtr, Ordering},
};

use cortex_m::peripheral::{SCB, SYST, scb::SystemHandler};

use crate::{MillisCounter, Schedule, Scheduler, TaskEntry, port::Port};

/// Holds the running scheduler
static SCHEDULER: critical_section::Mutex<Cell<Option<&'static dyn Schedule<CortexM>>>> =
    critical_section::Mutex::new(Cell::new(None));

/// Holds a pointer to the running scheduler's current task index
///
/// We need this so that the free-standing PendSV handler can tell, without
/// touching any register it has not saved, whether there is a task to stack.
pub(crate) static CURRENT_TASK_PTR: AtomicPtr<AtomicIsize> =
    AtomicPtr::new(core::ptr::null_mut());

/// The tick counter SysTick advances, once per scheduler tick
///
/// Hand this to [`Scheduler::new`] as the clock.
pub static SYSTICK_CLOCK: MillisCounter = MillisCounter::new();

/// SysTick Handler
#[unsafe(no_mangle)]
extern "C" fn SysTick() {
    SYSTICK_CLOCK.tick();
}

/// Port state for Armv6-M, Armv7-M and Armv8-M
pub struct CortexM(());

impl CortexM {
    /// Create the port state
    pub const fn new() -> CortexM {
        CortexM(())
    }
}

impl Default for CortexM {
    fn default() -> Self {
        CortexM::new()
    }
}

impl<const MAX_TASKS: usize, const STACK_SIZE: usize> Scheduler<CortexM, MAX_TASKS, STACK_SIZE> {
    /// Run the scheduler
    ///
    /// You may only call this once, and you should call it from `fn main()`
    /// once all your hardware is configured and you have created at least one
    /// task. We should be in Privileged Thread mode on the Main stack, which
    /// we leave for good.
    ///
    /// PendSV and SysTick are moved to the lowest priority. SysTick then
    /// fires every `systicks_per_tick` processor clock cycles, and advances
    /// [`SYSTICK_CLOCK`].
    pub fn start(&'static self, scb: &mut SCB, mut syst: SYST, systicks_per_tick: u32) -> ! {
        let scheduler: &'static dyn Schedule<CortexM> = self;
        let already_started = critical_section::with(|cs| {
            let cell = SCHEDULER.borrow(cs);
            let already_started = cell.get().is_some();
            if !already_started {
                cell.set(Some(scheduler));
            }
            already_started
        });
        if already_started {
            panic!("Tried to re-start scheduler!");
        }

        // remember where the current task lives - it cannot move because
        // this object lives forever
        let current_task_ptr = &self.current_task as *const AtomicIsize as *mut AtomicIsize;
        info!(
            "Scheduler @ {=usize:08x}, current task @ {=usize:08x}",
            self as *const Self as usize, current_task_ptr as usize
        );
        CURRENT_TASK_PTR.store(current_task_ptr, Ordering::Release);

        // SAFETY: we are not inside a priority-based critical section, and
        // lowering the priority of these two cannot break one
        unsafe {
            scb.set_priority(SystemHandler::PendSV, 0xFF);
            scb.set_priority(SystemHandler::SysTick, 0xFF);
        }

        syst.set_reload(systicks_per_tick);
        syst.set_clock_source(cortex_m::peripheral::syst::SystClkSource::Core);
        syst.clear_current();
        syst.enable_counter();
        syst.enable_interrupt();

        // The boot context is never saved, so this never returns
        self.yield_now();
        unreachable!();
    }
}

impl Port for CortexM {
    /// Task should run in Thumb mode (the only supported mode on Cortex-M)
    const INITIAL_XPSR: usize = 1 << 24;

    /// Return to Thread mode, on the Process stack, with no FPU state
    const INITIAL_EXC_RETURN: usize = 0xFFFF_FFFD;

    fn scheduler() -> Option<&'static dyn Schedule<Self>> {
        critical_section::with(|cs| SCHEDULER.borrow(cs).get())
    }

    fn trigger_switch(scheduler: &'static dyn Schedule<Self>) {
        if CURRENT_TASK_PTR.load(Ordering::Acquire).is_null() {
            warn!(
                "Cannot switch {} before the scheduler starts",
                scheduler.current_task()
            );
            return;
        }
        // Fire the PendSV exception - the PendSV handler will select a task
        // to run and run it
        SCB::set_pendsv();
        // flush the pipeline to ensure the PendSV fires before we return
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }

    fn starved(_scheduler: &'static dyn Schedule<Self>, laps: usize) {
        // Keep looking. Only a higher priority interrupt can resume a task now.
        if laps == 1 {
            warn!("No runnable tasks");
        }
    }

    fn halt() -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }

    fn entry_address(entry: TaskEntry) -> usize {
        // the stacked PC must not have the Thumb bit set
        (entry as usize) & !1
    }
}

/// Called by the PendSV handler, with the outgoing task's registers saved
///
/// Returns the stack pointer of the frame to restore.
///
/// # Safety
///
/// Only the PendSV handler may call this, and only once the scheduler has
/// started.
pub(crate) unsafe extern "C" fn switch_context(outgoing: *mut usize) -> *mut usize {
    match CortexM::scheduler() {
        // SAFETY: our caller saved a complete frame at `outgoing`, if there
        // is a current task
        Some(scheduler) => unsafe { scheduler.switch_context(outgoing) },
        // PendSV is only pended once the scheduler is registered
        None => outgoing,
    }
}

// End of File
