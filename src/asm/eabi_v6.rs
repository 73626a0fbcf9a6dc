//! Armv6-M EABI code

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::port::cortex_m;

/// PendSV Handler for Armv6-M or Armv8-M Baseline EABI
///
/// This is the task switch code. It is called by hardware when the PendSV bit
/// is set and all other interrupts have finished. It uses only the Armv6-M
/// subset instructions, which can only load and store the low registers, so
/// r8-r11 go through r4-r7 once those are safely stacked.
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
    movs    r3, #1
    cmn     r2, r3
    beq     1f

    // r0 = the bottom of the nine words we are about to stack, which is
    // also where the saved stack pointer will point
    subs    r0, #36
    mov     r1, r0

    // Push the additional state, lowest address first
    stmia   r1!, {{ r4 - r7 }}
    mov     r4, r8
    mov     r5, r9
    mov     r6, r10
    mov     r7, r11
    stmia   r1!, {{ r4 - r7 }}
    mov     r4, lr
    stmia   r1!, {{ r4 }}

    1:

    // r0 = the stack pointer of the next task, given the saved one in r0
    bl      {switch_context}

    // Pop r8-r11 and EXC_RETURN first, while r4-r7 are free to use
    mov     r1, r0
    adds    r1, #16
    ldmia   r1!, {{ r4 - r7 }}
    mov     r8, r4
    mov     r9, r5
    mov     r10, r6
    mov     r11, r7
    ldmia   r1!, {{ r4 }}
    mov     lr, r4

    // r1 now points at the hardware frame, so that is the task stack pointer
    msr     psp, r1

    // Then pop the real r4-r7
    ldmia   r0!, {{ r4 - r7 }}

    // return to the task
    bx      lr
    "#,
    current_task_ptr = sym cortex_m::CURRENT_TASK_PTR,
    switch_context = sym cortex_m::switch_context,
    );
}

// End of File
