//! Contains the [`Scheduler`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicIsize, Ordering};

use crate::{
    DEFAULT_MAX_TASKS, DEFAULT_STACK_SIZE, Error, TaskEntry, TaskId, TaskState,
    config,
    port::Port,
    stack::StackArena,
    task::{TaskControlBlock, TaskFlags},
    tick::Clock,
};

/// A cooperative task-switching scheduler
///
/// Tasks run until they call [`Scheduler::yield_now`], [`Scheduler::sleep`]
/// or [`Scheduler::pause`], or return. Whenever that happens the next
/// runnable task, in round-robin order of its slot in the task table, gets
/// the processor. There are no priorities and no time slicing.
///
/// The task table has `MAX_TASKS` slots, and each owns a stack region of
/// `STACK_SIZE` bytes. Both are fixed at compile time, and a bad pair (no
/// slots, or stacks too small or misaligned) fails the build.
///
/// There is one of these per program, usually in a `static`. The [`Port`]
/// decides how registers are saved and restored, and how it finds this
/// object again from inside an interrupt handler.
#[repr(C)]
pub struct Scheduler<
    P: Port,
    const MAX_TASKS: usize = { DEFAULT_MAX_TASKS },
    const STACK_SIZE: usize = { DEFAULT_STACK_SIZE },
> {
    /// Which task is currently running, or -1 if we are still on the boot
    /// context and no task has run yet
    pub(crate) current_task: AtomicIsize,
    /// A fixed, static list of all our task slots
    tasks: [TaskControlBlock; MAX_TASKS],
    /// One stack region per task slot
    arena: StackArena<MAX_TASKS, STACK_SIZE>,
    /// Time source for `sleep`
    clock: &'static dyn Clock,
    /// State belonging to the architecture port
    port: P,
}

/// SAFETY: The stack arena is only written by `create_task`, for a slot that
/// no task is using, and by the task living in each region. Everything else
/// is atomic.
unsafe impl<P: Port, const MAX_TASKS: usize, const STACK_SIZE: usize> Sync
    for Scheduler<P, MAX_TASKS, STACK_SIZE>
{
}

/// The value of `current_task` before the first task switch
const BOOT_CONTEXT: isize = -1;

impl<P: Port, const MAX_TASKS: usize, const STACK_SIZE: usize> Scheduler<P, MAX_TASKS, STACK_SIZE> {
    /// Fails to evaluate, and so fails the build, for a bad size pair
    const SIZES_OK: () = config::check_sizes(MAX_TASKS, STACK_SIZE);

    /// Build the scheduler
    pub const fn new(port: P, clock: &'static dyn Clock) -> Self {
        let () = Self::SIZES_OK;
        Scheduler {
            current_task: AtomicIsize::new(BOOT_CONTEXT),
            tasks: [const { TaskControlBlock::new() }; MAX_TASKS],
            arena: StackArena::new(),
            clock,
            port,
        }
    }

    /// Get the architecture port's state
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Create a task in the first free slot of the task table
    ///
    /// The task's stack region is wiped and given a synthetic frame, so the
    /// first switch into it starts `entry`. If `entry` ever returns, the
    /// slot is released again.
    ///
    /// If every slot holds a live task, nothing changes and you get
    /// [`Error::TableFull`].
    pub fn create_task(&self, entry: TaskEntry) -> Result<TaskId, Error> {
        let Some(index) = self
            .tasks
            .iter()
            .position(|task| !task.flags().contains(TaskFlags::IN_USE))
        else {
            warn!("Task table full, no task created");
            return Err(Error::TableFull);
        };

        // SAFETY: The slot is free, so nothing is running on this region and
        // nothing will ever resume from the state saved there. The region is
        // at least MIN_STACK_SIZE, and its top is 8-byte aligned.
        let stack_pointer = unsafe {
            self.arena.clear(index);
            P::build_initial_frame(self.arena.top(index), entry, task_exit::<P>)
        };

        let task = &self.tasks[index];
        // SAFETY: We just built a complete frame at this address
        unsafe {
            task.set_stack(stack_pointer);
        }
        task.store_flags(TaskFlags::IN_USE);

        let task_id = TaskId::new(index);
        debug!(
            "Created task {}, with stack @ 0x{=usize:08x}",
            task_id, stack_pointer as usize
        );
        Ok(task_id)
    }

    /// Get the current Task ID
    ///
    /// This is the invalid Task ID until the first task switch.
    pub fn current_task(&self) -> TaskId {
        match self.current_task.load(Ordering::Relaxed) {
            BOOT_CONTEXT => TaskId::invalid(),
            index => TaskId::new(index as usize),
        }
    }

    /// Report what the given slot of the task table is doing
    ///
    /// IDs outside the table are reported as [`TaskState::Free`].
    pub fn task_state(&self, task_id: TaskId) -> TaskState {
        self.task(task_id)
            .map(|task| TaskState::from(task.flags()))
            .unwrap_or(TaskState::Free)
    }

    /// How many bytes of a live task's stack have been used since it was
    /// created
    ///
    /// This is a high-water mark, and includes the frame the task was
    /// created with. Overflowing the stack is not detected.
    pub fn stack_high_water(&self, task_id: TaskId) -> Option<usize> {
        let index = task_id.index()?;
        match self.task_state(task_id) {
            TaskState::Free => None,
            _ => Some(self.arena.high_water(index)),
        }
    }

    /// Get current tick count
    pub fn now(&self) -> u32 {
        self.clock.now()
    }

    /// Switch to another task, returning when this one is picked again
    pub fn yield_now(&'static self) {
        P::trigger_switch(self);
    }

    /// Yield until at least `ticks` ticks have passed
    ///
    /// We yield at least once on every check, so other tasks keep running.
    /// How late we wake up depends on how long they take to yield back.
    pub fn sleep(&'static self, ticks: u32) {
        let start = self.clock.now();
        while self.clock.elapsed_since(start) < ticks {
            self.yield_now();
        }
    }

    /// Stop the current task being picked, and yield
    ///
    /// It stays paused until some other task calls [`Scheduler::resume`]
    /// with its ID.
    pub fn pause(&'static self) {
        if let Some(task) = self.task(self.current_task()) {
            task.modify_flags(|flags| flags | TaskFlags::PAUSED);
        }
        self.yield_now();
    }

    /// Allow a paused task to be picked again
    ///
    /// Can be called from any task, or from an interrupt. Resuming a task
    /// that is not paused does nothing. You get [`Error::NoSuchTask`] if the
    /// slot holds no live task, and then nothing changes.
    pub fn resume(&self, task_id: TaskId) -> Result<(), Error> {
        let task = self.task(task_id).ok_or(Error::NoSuchTask(task_id))?;
        critical_section::with(|_cs| {
            let flags = task.flags();
            if !flags.contains(TaskFlags::IN_USE) {
                return Err(Error::NoSuchTask(task_id));
            }
            task.store_flags(flags - TaskFlags::PAUSED);
            Ok(())
        })
        .inspect_err(|_e| warn!("Cannot resume {}", task_id))
    }

    /// The context switch itself
    ///
    /// Save the outgoing stack pointer (unless we are leaving the boot
    /// context), pick the next runnable task, and hand back the stack pointer
    /// to restore. The port saves and restores the registers around this.
    ///
    /// If nothing is runnable, the port's [`Port::starved`] hook is called
    /// after every full lap of the task table, and we keep looking.
    ///
    /// # Safety
    ///
    /// Only the port may call this, from its switch handler, which must not
    /// be re-entered. `outgoing` must point at the complete frame just saved
    /// for the current task.
    pub unsafe fn switch_context(&'static self, outgoing: *mut usize) -> *mut usize {
        if let Some(task) = self.task(self.current_task()) {
            // SAFETY: the caller saved a complete frame at this address
            unsafe {
                task.set_stack(outgoing);
            }
        }

        let mut laps = 0;
        loop {
            match self.pick_next_task() {
                TaskSelection::Task(task_id) => {
                    if let Some(task) = self.task(task_id) {
                        return task.stack();
                    }
                }
                TaskSelection::Starved => {
                    laps += 1;
                    P::starved(self, laps);
                }
            }
        }
    }

    /// Release the current task's slot and never run again
    ///
    /// Reached through the trampoline a new frame's link register points at,
    /// when a task's entry function returns.
    pub fn exit_current(&'static self) -> ! {
        let task_id = self.current_task();
        if let Some(task) = self.task(task_id) {
            task.modify_flags(|_| TaskFlags::empty());
        }
        info!("Task {} finished", task_id);
        self.yield_now();
        // Nobody will pick a free slot, so we cannot get here
        P::halt()
    }

    /// Look up the control block for a task, if the ID is in range
    fn task(&self, task_id: TaskId) -> Option<&TaskControlBlock> {
        self.tasks.get(task_id.index()?)
    }

    /// Select the next task in the round-robin
    ///
    /// Steps `current_task` forward, wrapping at the end of the table, until
    /// it lands on a runnable task. Gives up after one full lap.
    fn pick_next_task(&self) -> TaskSelection {
        let mut index = self.current_task.load(Ordering::Relaxed);
        for _ in 0..MAX_TASKS {
            index += 1;
            if index >= MAX_TASKS as isize {
                index = 0;
            }
            self.current_task.store(index, Ordering::Relaxed);
            if self.tasks[index as usize].flags().is_runnable() {
                let task_sel = TaskSelection::Task(TaskId::new(index as usize));
                trace!("picked {}", task_sel);
                return task_sel;
            }
        }
        TaskSelection::Starved
    }
}

/// The calls a port, or a task, can make on a scheduler of any size
///
/// Ports only ever see a scheduler through this trait, so one port serves
/// every choice of `MAX_TASKS` and `STACK_SIZE`. Each method does the same
/// as the [`Scheduler`] method of the same name.
pub trait Schedule<P: Port>: Sync {
    /// See [`Scheduler::port`]
    fn port(&self) -> &P;

    /// See [`Scheduler::current_task`]
    fn current_task(&self) -> TaskId;

    /// See [`Scheduler::now`]
    fn now(&self) -> u32;

    /// See [`Scheduler::yield_now`]
    fn yield_now(&'static self);

    /// See [`Scheduler::sleep`]
    fn sleep(&'static self, ticks: u32);

    /// See [`Scheduler::pause`]
    fn pause(&'static self);

    /// See [`Scheduler::resume`]
    fn resume(&self, task_id: TaskId) -> Result<(), Error>;

    /// See [`Scheduler::switch_context`]
    ///
    /// # Safety
    ///
    /// As for [`Scheduler::switch_context`].
    unsafe fn switch_context(&'static self, outgoing: *mut usize) -> *mut usize;

    /// See [`Scheduler::exit_current`]
    fn exit_current(&'static self) -> !;
}

impl<P: Port, const MAX_TASKS: usize, const STACK_SIZE: usize> Schedule<P>
    for Scheduler<P, MAX_TASKS, STACK_SIZE>
{
    fn port(&self) -> &P {
        Scheduler::port(self)
    }

    fn current_task(&self) -> TaskId {
        Scheduler::current_task(self)
    }

    fn now(&self) -> u32 {
        Scheduler::now(self)
    }

    fn yield_now(&'static self) {
        Scheduler::yield_now(self)
    }

    fn sleep(&'static self, ticks: u32) {
        Scheduler::sleep(self, ticks)
    }

    fn pause(&'static self) {
        Scheduler::pause(self)
    }

    fn resume(&self, task_id: TaskId) -> Result<(), Error> {
        Scheduler::resume(self, task_id)
    }

    unsafe fn switch_context(&'static self, outgoing: *mut usize) -> *mut usize {
        // SAFETY: passed on from our caller
        unsafe { Scheduler::switch_context(self, outgoing) }
    }

    fn exit_current(&'static self) -> ! {
        Scheduler::exit_current(self)
    }
}

/// Where a task goes when its entry function returns
extern "C" fn task_exit<P: Port>() {
    if let Some(scheduler) = P::scheduler() {
        scheduler.exit_current();
    }
    P::halt()
}

/// Describes which task we picked
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum TaskSelection {
    /// This task is runnable - switch to it
    Task(TaskId),
    /// No task is runnable, and none will be unless an interrupt resumes one
    Starved,
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU32, AtomicUsize};
    use std::sync::Mutex;

    use super::*;
    use crate::{
        MillisCounter,
        frame::StackFrame,
        port::hosted::{Hosted, RunOutcome},
    };

    const MAX_TASKS: usize = DEFAULT_MAX_TASKS;
    const STACK_SIZE: usize = DEFAULT_STACK_SIZE;

    extern "C" fn nothing() {}

    /// Run the switch handler's bookkeeping once, from the test thread
    fn switch<P: Port, const N: usize, const S: usize>(
        scheduler: &'static Scheduler<P, N, S>,
    ) -> TaskId {
        let current = scheduler.current_task();
        let outgoing = scheduler
            .task(current)
            .map(|task| task.stack())
            .unwrap_or(core::ptr::null_mut());
        // SAFETY: nothing is really running, so no registers need saving
        unsafe { scheduler.switch_context(outgoing) };
        scheduler.current_task()
    }

    #[test]
    fn create_until_full() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);

        let mut stacks = [core::ptr::null_mut(); MAX_TASKS];
        for (index, stack) in stacks.iter_mut().enumerate() {
            assert_eq!(SCHEDULER.create_task(nothing), Ok(TaskId::new(index)));
            *stack = SCHEDULER.tasks[index].stack();
        }
        // every task got a distinct region, with a frame at its top
        for (index, stack) in stacks.iter().enumerate() {
            let expected = SCHEDULER.arena.top(index).wrapping_sub(StackFrame::WORDS);
            assert_eq!(*stack, expected);
        }

        assert_eq!(SCHEDULER.create_task(nothing), Err(Error::TableFull));
        for (index, stack) in stacks.iter().enumerate() {
            assert_eq!(SCHEDULER.tasks[index].stack(), *stack);
            assert_eq!(SCHEDULER.tasks[index].flags(), TaskFlags::IN_USE);
        }
        assert!(SCHEDULER.current_task().is_invalid());
    }

    #[test]
    fn small_table_fills_up() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted, 2, 512> = Scheduler::new(Hosted::new(), &CLOCK);

        assert_eq!(SCHEDULER.create_task(crate::idle), Ok(TaskId::new(0)));
        assert_eq!(SCHEDULER.create_task(crate::idle), Ok(TaskId::new(1)));
        assert_eq!(SCHEDULER.create_task(crate::idle), Err(Error::TableFull));
        for index in 0..2 {
            assert_eq!(SCHEDULER.tasks[index].flags(), TaskFlags::IN_USE);
        }
        assert_eq!(SCHEDULER.task_state(TaskId::new(2)), TaskState::Free);
        assert_eq!(
            SCHEDULER.arena.top(1) as usize - SCHEDULER.arena.top(0) as usize,
            512
        );

        // the free functions find a scheduler of any size
        assert_eq!(
            SCHEDULER.run_for(4),
            RunOutcome::BudgetExhausted { switches: 4 }
        );
        assert_eq!(SCHEDULER.current_task(), TaskId::new(1));
    }

    #[test]
    fn freed_slot_is_reused_and_wiped() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);

        let first = SCHEDULER.create_task(nothing).unwrap();
        SCHEDULER.create_task(nothing).unwrap();
        let fresh = SCHEDULER.stack_high_water(first).unwrap();
        assert!(fresh > 0 && fresh <= StackFrame::SIZE);

        // the old tenant scribbles all over its stack, then finishes
        // SAFETY: no task is running on this region
        unsafe {
            let bottom = SCHEDULER.arena.top(0).cast::<u8>().sub(STACK_SIZE);
            bottom.write_bytes(0x55, STACK_SIZE);
        }
        assert_eq!(SCHEDULER.stack_high_water(first), Some(STACK_SIZE));
        SCHEDULER.tasks[0].store_flags(TaskFlags::empty());
        assert_eq!(SCHEDULER.stack_high_water(first), None);

        assert_eq!(SCHEDULER.create_task(nothing), Ok(first));
        assert_eq!(SCHEDULER.stack_high_water(first), Some(fresh));
        assert_eq!(SCHEDULER.create_task(nothing), Ok(TaskId::new(2)));
    }

    #[test]
    fn round_robin_order() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);

        for _ in 0..3 {
            SCHEDULER.create_task(nothing).unwrap();
        }
        let order: [usize; 7] = core::array::from_fn(|_| switch(&SCHEDULER).index().unwrap());
        assert_eq!(order, [0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn paused_tasks_leave_the_cycle() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);

        for _ in 0..3 {
            SCHEDULER.create_task(nothing).unwrap();
        }
        SCHEDULER.tasks[1].modify_flags(|flags| flags | TaskFlags::PAUSED);
        assert_eq!(SCHEDULER.task_state(TaskId::new(1)), TaskState::Paused);
        let order: [usize; 4] = core::array::from_fn(|_| switch(&SCHEDULER).index().unwrap());
        assert_eq!(order, [0, 2, 0, 2]);

        SCHEDULER.resume(TaskId::new(1)).unwrap();
        assert_eq!(SCHEDULER.task_state(TaskId::new(1)), TaskState::Ready);
        let order: [usize; 4] = core::array::from_fn(|_| switch(&SCHEDULER).index().unwrap());
        assert_eq!(order, [0, 1, 2, 0]);
    }

    #[test]
    fn switch_saves_the_outgoing_stack_pointer() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);

        SCHEDULER.create_task(nothing).unwrap();
        SCHEDULER.create_task(nothing).unwrap();
        switch(&SCHEDULER);
        let pretend_saved = SCHEDULER.tasks[0].stack().wrapping_sub(4);
        // SAFETY: nothing ever resumes from this pointer
        let next = unsafe { SCHEDULER.switch_context(pretend_saved) };
        assert_eq!(SCHEDULER.tasks[0].stack(), pretend_saved);
        assert_eq!(next, SCHEDULER.tasks[1].stack());
    }

    #[test]
    fn resume_rejects_free_slots() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);

        let free = TaskId::new(3);
        assert_eq!(SCHEDULER.resume(free), Err(Error::NoSuchTask(free)));
        assert_eq!(SCHEDULER.tasks[3].flags(), TaskFlags::empty());
        let outside = TaskId::new(MAX_TASKS);
        assert_eq!(SCHEDULER.resume(outside), Err(Error::NoSuchTask(outside)));
        assert_eq!(
            SCHEDULER.resume(TaskId::invalid()),
            Err(Error::NoSuchTask(TaskId::invalid()))
        );
        assert_eq!(SCHEDULER.task_state(outside), TaskState::Free);
    }

    #[test]
    fn two_yielding_tasks_alternate() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);
        static A: AtomicU32 = AtomicU32::new(0);
        static B: AtomicU32 = AtomicU32::new(0);

        extern "C" fn task_a() {
            loop {
                A.fetch_add(1, Ordering::Relaxed);
                SCHEDULER.yield_now();
            }
        }

        extern "C" fn task_b() {
            loop {
                B.fetch_add(1, Ordering::Relaxed);
                SCHEDULER.yield_now();
            }
        }

        SCHEDULER.create_task(task_a).unwrap();
        SCHEDULER.create_task(task_b).unwrap();
        let n = 25;
        assert_eq!(
            SCHEDULER.run_for(2 * n),
            RunOutcome::BudgetExhausted { switches: 2 * n }
        );
        assert_eq!(A.load(Ordering::Relaxed), n as u32);
        assert_eq!(B.load(Ordering::Relaxed), n as u32);
    }

    #[test]
    fn lone_paused_task_deadlocks() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);
        static RUNS: AtomicU32 = AtomicU32::new(0);

        extern "C" fn lonely() {
            loop {
                RUNS.fetch_add(1, Ordering::Relaxed);
                crate::pause();
            }
        }

        let task_id = SCHEDULER.create_task(lonely).unwrap();
        assert_eq!(
            SCHEDULER.run_for(100),
            RunOutcome::Deadlock { switches: 2 }
        );
        assert_eq!(RUNS.load(Ordering::Relaxed), 1);
        assert_eq!(SCHEDULER.task_state(task_id), TaskState::Paused);
    }

    #[test]
    fn no_tasks_at_all_deadlocks() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);

        assert_eq!(SCHEDULER.run_for(10), RunOutcome::Deadlock { switches: 1 });
    }

    #[test]
    fn pause_until_resumed() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);
        static TRACE: Mutex<Vec<usize>> = Mutex::new(Vec::new());

        fn record() {
            let index = crate::current_task().index().unwrap();
            TRACE.lock().unwrap().push(index);
        }

        extern "C" fn worker() {
            loop {
                record();
                crate::pause();
            }
        }

        extern "C" fn controller() {
            let mut runs = 0;
            loop {
                record();
                runs += 1;
                if runs % 3 == 0 {
                    crate::resume(TaskId::new(0)).unwrap();
                }
                crate::yield_now();
            }
        }

        SCHEDULER.create_task(worker).unwrap();
        SCHEDULER.create_task(controller).unwrap();
        assert_eq!(
            SCHEDULER.run_for(9),
            RunOutcome::BudgetExhausted { switches: 9 }
        );

        // the worker runs once at the start, then once after every resume
        assert_eq!(*TRACE.lock().unwrap(), [0, 1, 1, 1, 0, 1, 1, 1, 0]);
    }

    #[test]
    fn starving_counts_laps_afresh_each_time() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Interrupted> = Scheduler::new(Interrupted, &CLOCK);
        static LAPS: Mutex<Vec<usize>> = Mutex::new(Vec::new());

        /// Pretends an interrupt resumes the first task on the third empty lap
        struct Interrupted;

        impl Port for Interrupted {
            const INITIAL_XPSR: usize = 0;
            const INITIAL_EXC_RETURN: usize = 0;

            fn scheduler() -> Option<&'static dyn Schedule<Self>> {
                None
            }

            fn trigger_switch(_scheduler: &'static dyn Schedule<Self>) {}

            fn starved(scheduler: &'static dyn Schedule<Self>, laps: usize) {
                LAPS.lock().unwrap().push(laps);
                if laps == 3 {
                    scheduler.resume(TaskId::new(0)).unwrap();
                }
            }

            fn halt() -> ! {
                loop {
                    std::thread::park();
                }
            }
        }

        SCHEDULER.create_task(nothing).unwrap();
        for _ in 0..2 {
            SCHEDULER.tasks[0].modify_flags(|flags| flags | TaskFlags::PAUSED);
            assert_eq!(switch(&SCHEDULER), TaskId::new(0));
        }
        assert_eq!(*LAPS.lock().unwrap(), [1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn sleep_yields_until_enough_ticks() {
        // start just before the counter wraps
        static CLOCK: MillisCounter = MillisCounter::starting_at(u32::MAX - 2);
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);
        static SLEPT: AtomicU32 = AtomicU32::new(0);
        static WOKEN: AtomicU32 = AtomicU32::new(0);

        extern "C" fn sleeper() {
            let start = crate::now();
            crate::sleep(5);
            SLEPT.store(crate::tick::elapsed(start, crate::now()), Ordering::Relaxed);
            WOKEN.fetch_add(1, Ordering::Relaxed);
            loop {
                crate::yield_now();
            }
        }

        // the clock only moves when the sleeper lets this task run
        extern "C" fn ticker() {
            loop {
                CLOCK.tick();
                crate::yield_now();
            }
        }

        SCHEDULER.create_task(sleeper).unwrap();
        SCHEDULER.create_task(ticker).unwrap();
        SCHEDULER.run_for(40);

        assert_eq!(WOKEN.load(Ordering::Relaxed), 1);
        assert_eq!(SLEPT.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn returning_task_frees_its_slot() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);
        static SHORT_RUNS: AtomicU32 = AtomicU32::new(0);
        static REPLACEMENT_RUNS: AtomicU32 = AtomicU32::new(0);
        static REPLACEMENT_ID: AtomicUsize = AtomicUsize::new(usize::MAX);

        extern "C" fn short_lived() {
            SHORT_RUNS.fetch_add(1, Ordering::Relaxed);
        }

        extern "C" fn replacement() {
            loop {
                REPLACEMENT_RUNS.fetch_add(1, Ordering::Relaxed);
                crate::yield_now();
            }
        }

        extern "C" fn spawner() {
            crate::yield_now();
            let task_id = SCHEDULER.create_task(replacement).unwrap();
            REPLACEMENT_ID.store(task_id.index().unwrap(), Ordering::Relaxed);
            loop {
                crate::yield_now();
            }
        }

        let short = SCHEDULER.create_task(short_lived).unwrap();
        SCHEDULER.create_task(spawner).unwrap();
        SCHEDULER.run_for(20);

        assert_eq!(SHORT_RUNS.load(Ordering::Relaxed), 1);
        assert_eq!(REPLACEMENT_ID.load(Ordering::Relaxed), short.index().unwrap());
        assert!(REPLACEMENT_RUNS.load(Ordering::Relaxed) > 1);
        assert_eq!(SCHEDULER.task_state(short), TaskState::Ready);
    }

    #[test]
    fn tasks_know_who_they_are() {
        static CLOCK: MillisCounter = MillisCounter::new();
        static SCHEDULER: Scheduler<Hosted> = Scheduler::new(Hosted::new(), &CLOCK);
        static SEEN: [AtomicUsize; 2] = [const { AtomicUsize::new(usize::MAX) }; 2];

        extern "C" fn first() {
            SEEN[0].store(crate::current_task().index().unwrap(), Ordering::Relaxed);
            crate::idle();
        }

        extern "C" fn second() {
            SEEN[1].store(crate::current_task().index().unwrap(), Ordering::Relaxed);
            crate::idle();
        }

        SCHEDULER.create_task(first).unwrap();
        SCHEDULER.create_task(second).unwrap();
        SCHEDULER.run_for(6);

        assert_eq!(SEEN[0].load(Ordering::Relaxed), 0);
        assert_eq!(SEEN[1].load(Ordering::Relaxed), 1);
        // once it has run, the whole synthetic frame is in use
        assert_eq!(
            SCHEDULER.stack_high_water(TaskId::new(0)),
            Some(StackFrame::SIZE)
        );
    }
}

// End of File
