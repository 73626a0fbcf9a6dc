//! Armv7-M EABI code

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::port::cortex_m;

/// PendSV Handler for Armv7-M or Armv8-M Mainline EABI
///
/// This is the task switch code. It is called by hardware when the PendSV bit
/// is set and all other interrupts have finished.
///
/// On entry, we will find that PC, LR, R12, R3, R2, R1 and R0 will have been
/// pushed onto the PSP. We thus push the remaining registers (which are as
/// the running task left them), let the scheduler pick another task, and then
/// restore the registers from that task's stack. Exiting from this function
/// will cause the hardware to restore PC, LR, R12, R3, R2, R1, and R0 from
/// the new task's PSP, and so the new task will resume.
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
    // r1 = the address of the current task ID
    ldr     r1, ={current_task_ptr}
    ldr     r1, [r1]

    // r2 = the current task ID
    ldr     r2, [r1]

    // r0 = the current task stack pointer
    mrs     r0, psp

    // if current task ID is -1, we are leaving the boot context, which is
    // never resumed, so skip the stacking
    cmp     r2, #-1
    beq     1f

    // Push the additional state into stack at r0
    stmdb   r0!, {{ r4 - r11, lr }}

    1:

    // r0 = the stack pointer of the next task, given the saved one in r0
    bl      {switch_context}

    // Pop the additional state from it
    ldmia   r0!, {{ r4 - r11, lr }}

    // Set the current task stack pointer
    msr     psp, r0

    // return to the task
    bx      lr
    "#,
    current_task_ptr = sym cortex_m::CURRENT_TASK_PTR,
    switch_context = sym cortex_m::switch_context,
    );
}

// End of File
