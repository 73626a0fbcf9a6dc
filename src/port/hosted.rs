//! A hosted port, for running tasks on a desktop operating system
//!
//! Every task gets its own OS thread, but only one context ever runs at a
//! time: a baton, held in a mutex, says which. A task that yields runs the
//! switch handler's bookkeeping itself, with every other context parked, then
//! hands the baton on and parks until it gets it back. That makes each
//! context switch one step that nothing else can interleave with, just like
//! PendSV on a real core.
//!
//! Task stacks still come from the stack arena, and new tasks still get a
//! synthetic frame, but the registers live in the OS threads. Each frame's
//! `r4` slot holds a token naming the thread that owns it; zero means the
//! frame was never resumed, so the thread has yet to be spawned.
//!
//! [`Scheduler::run_for`] starts everything from a fresh boot thread and
//! returns once a switch budget runs out, or the scheduler starves.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    cell::Cell,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    thread,
};

use crate::{Schedule, Scheduler, TaskEntry, frame::StackFrame, port::Port};

/// How a call to [`Scheduler::run_for`] ended
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A task asked for another switch once all of them were used up
    BudgetExhausted {
        /// How many switches were performed
        switches: usize,
    },
    /// A switch found no runnable task, and nothing else could ever make one
    /// runnable
    Deadlock {
        /// How many switches were started, including the one that starved
        switches: usize,
    },
}

/// Which context holds the baton
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Context {
    /// Whatever called `run_for`, before the first switch
    Boot,
    /// The thread with this token
    Task(usize),
    /// Nobody, ever again
    Halted,
}

struct State {
    running: Context,
    started: bool,
    switches: usize,
    budget: usize,
    next_token: usize,
    outcome: Option<RunOutcome>,
}

/// The hosted port's state
pub struct Hosted {
    state: Mutex<State>,
    baton: Condvar,
}

thread_local! {
    /// The scheduler this thread belongs to
    static SCHEDULER: Cell<Option<&'static dyn Schedule<Hosted>>> = const { Cell::new(None) };
    /// The context this thread runs
    static CONTEXT: Cell<Context> = const { Cell::new(Context::Boot) };
    /// Where this thread's frame lives in the stack arena
    static STACK: Cell<usize> = const { Cell::new(0) };
}

impl Hosted {
    /// Create the port state
    pub const fn new() -> Hosted {
        Hosted {
            state: Mutex::new(State {
                running: Context::Boot,
                started: false,
                switches: 0,
                budget: 0,
                next_token: 0,
                outcome: None,
            }),
            baton: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.baton.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand the baton to nobody, and park the caller for good
    fn halt_with(&self, mut state: MutexGuard<'_, State>, outcome: RunOutcome) -> ! {
        state.outcome.get_or_insert(outcome);
        state.running = Context::Halted;
        self.baton.notify_all();
        loop {
            state = self.wait(state);
        }
    }

    /// Park until `me` holds the baton
    fn wait_for_turn(&self, mut state: MutexGuard<'_, State>, me: Context) {
        while state.running != me {
            state = self.wait(state);
        }
    }

    /// Perform one context switch away from the calling context
    fn switch_from(&self, scheduler: &'static dyn Schedule<Hosted>, me: Context) {
        {
            let mut state = self.lock();
            if state.switches >= state.budget {
                let switches = state.switches;
                self.halt_with(state, RunOutcome::BudgetExhausted { switches });
            }
            state.switches += 1;
        }

        // Every other context is parked, so this is the only thread touching
        // the scheduler until we pass the baton on
        let outgoing = STACK.get() as *mut usize;
        // SAFETY: our registers live in this thread, and the frame at
        // `outgoing` stays as it was when we were resumed
        let next = unsafe { scheduler.switch_context(outgoing) };
        let next = self.restore(scheduler, next);

        let mut state = self.lock();
        state.running = next;
        self.baton.notify_all();
        self.wait_for_turn(state, me);
    }

    /// Find, or start, the thread owning the frame at `stack`
    fn restore(&self, scheduler: &'static dyn Schedule<Hosted>, stack: *mut usize) -> Context {
        // SAFETY: the scheduler only hands out pointers to complete frames,
        // and the task owning this one is parked
        let frame = unsafe { &mut *stack.cast::<StackFrame>() };
        if frame.software.r4 != 0 {
            return Context::Task(frame.software.r4);
        }

        let token = {
            let mut state = self.lock();
            state.next_token += 1;
            state.next_token
        };
        frame.software.r4 = token;
        // SAFETY: a frame that has never been resumed holds the entry point
        // and exit trampoline `build_initial_frame` was given
        let (entry, exit) = unsafe {
            (
                core::mem::transmute::<usize, TaskEntry>(frame.hardware.pc),
                core::mem::transmute::<usize, TaskEntry>(frame.hardware.lr),
            )
        };
        let stack = stack as usize;

        thread::spawn(move || {
            SCHEDULER.set(Some(scheduler));
            CONTEXT.set(Context::Task(token));
            STACK.set(stack);
            let port = scheduler.port();
            port.wait_for_turn(port.lock(), Context::Task(token));
            entry();
            exit();
            Hosted::halt();
        });
        Context::Task(token)
    }
}

impl Default for Hosted {
    fn default() -> Self {
        Hosted::new()
    }
}

impl Port for Hosted {
    const INITIAL_XPSR: usize = 1 << 24;

    const INITIAL_EXC_RETURN: usize = 0;

    fn scheduler() -> Option<&'static dyn Schedule<Self>> {
        SCHEDULER.get()
    }

    fn trigger_switch(scheduler: &'static dyn Schedule<Self>) {
        scheduler.port().switch_from(scheduler, CONTEXT.get());
    }

    fn starved(scheduler: &'static dyn Schedule<Self>, _laps: usize) {
        let port = scheduler.port();
        let state = port.lock();
        let switches = state.switches;
        port.halt_with(state, RunOutcome::Deadlock { switches });
    }

    fn halt() -> ! {
        loop {
            thread::park();
        }
    }
}

impl<const MAX_TASKS: usize, const STACK_SIZE: usize> Scheduler<Hosted, MAX_TASKS, STACK_SIZE> {
    /// Run the scheduler until `max_switches` context switches have happened,
    /// or until no task can run
    ///
    /// The first switch happens on a new boot thread, which is never resumed,
    /// just like the main stack on a real target. The calling thread only
    /// waits for the outcome. Threads belonging to tasks stay parked
    /// afterwards.
    ///
    /// You may only call this once per scheduler.
    pub fn run_for(&'static self, max_switches: usize) -> RunOutcome {
        {
            let mut state = self.port().lock();
            if state.started {
                panic!("Tried to re-start scheduler!");
            }
            state.started = true;
            state.budget = max_switches;
        }

        let scheduler: &'static dyn Schedule<Hosted> = self;
        thread::spawn(move || {
            SCHEDULER.set(Some(scheduler));
            CONTEXT.set(Context::Boot);
            self.yield_now();
        });

        let port = self.port();
        let mut state = port.lock();
        loop {
            if let Some(outcome) = state.outcome {
                return outcome;
            }
            state = port.wait(state);
        }
    }
}


// End of File
