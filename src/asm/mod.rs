//! Appropriate PendSV handler for the architecture
//!
//! Every variant saves the outgoing task's registers into a
//! [`crate::frame::StackFrame`] on its Process stack, calls
//! [`crate::port::cortex_m::switch_context`] with the result, then restores
//! the frame it gets back.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#[cfg(all(
    arm_abi = "eabi",
    any(arm_architecture = "v6-m", arm_architecture = "v8-m.base")
))]
mod eabi_v6;

#[cfg(all(
    arm_abi = "eabi",
    not(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base"))
))]
mod eabi;

#[cfg(arm_abi = "eabihf")]
mod eabihf;

// End of File
