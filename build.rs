//! Build script for coops
//!
//! Sets the `arm_abi` and `arm_architecture` cfgs, which pick the PendSV
//! handler variant for the target.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// Entry point to the build script
fn main() {
    arm_targets::process();
}

// End of File
