//! Armv7-M EABIHF code

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::port::cortex_m;

/// PendSV Handler for Armv7-M or Armv8-M Mainline EABIHF
///
/// This is the task switch code. It is called by hardware when the PendSV bit
/// is set and all other interrupts have finished.
///
/// On entry, we will find that PC, LR, R12, R3, R2, R1 and R0 will have been
/// pushed onto the PSP, along with either the low FPU registers, or space for
/// the low FPU registers. We thus push the remaining registers (which are as
/// the running task left them) and inspect LR to see if we also need to push
/// the high FPU registers (because LR is set by the hardware on exception
/// entry to tell us the FPU state of the task we interrupted). The scheduler
/// then picks another task, and we restore its registers (including the high
/// FPU registers if required). Exiting from this function will cause the
/// hardware to restore PC, LR, R12, R3, R2, R1, and R0 from the new task's
/// PSP (along with the low FPU state, if required), and so the new task will
/// resume.
///
/// It is a naked function because we do not want the compiler pushing
/// anything else to the stack and re-using registers containing precious task
/// state.
#[unsafe(no_mangle)]
#[unsafe(naked)]
unsafe extern "C" fn PendSV() {
    // NOTE: Until the registers are saved, this code must NOT touch r4-r11.
    // It can ONLY touch r0-r3 and r12, because those registers were stacked
    // by the hardware on exception entry.

    core::arch::naked_asm!(r#"
    // Workaround https://github.com/rust-lang/rust/issues/127269
    .fpu vfpv3

    // r1 = the address of the current task ID
    ldr      r1, ={current_task_ptr}
    ldr      r1, [r1]

    // r2 = the current task ID
    ldr      r2, [r1]

    // r0 = the current task stack pointer
    mrs      r0, psp

    // if current task ID is -1, we are leaving the boot context, which is
    // never resumed, so skip the stacking
    cmp      r2, #-1
    beq      1f

    // Did the task we just interrupted use the FPU? (i.e. is bit 4 clear in LR?)
    tst      lr, #0x10

    // If FPU was used, stack the high FPU registers. Armv7-M exception entry handled the low ones.
    it       eq
    vstmdbeq r0!, {{ s16 - s31 }}

    // Push the additional state into stack at r0
    stmdb    r0!, {{ r4 - r11, lr }}

    1:

    // r0 = the stack pointer of the next task, given the saved one in r0
    bl       {switch_context}

    // Pop the additional state from it
    ldmia    r0!, {{ r4 - r11, lr }}

    // Did the task we just resumed use the FPU? (i.e. is bit 4 clear in LR?)
    tst      lr, #0x10

    // If FPU was used, unstack the high FPU registers
    it       eq
    vldmiaeq r0!, {{ s16 - s31 }}

    // Set the current task stack pointer
    msr      psp, r0

    // return to the task
    bx       lr
    "#,
    current_task_ptr = sym cortex_m::CURRENT_TASK_PTR,
    switch_context = sym cortex_m::switch_context,
    );
}

// End of File
