//! Logging macros
//!
//! We log with `defmt`, which needs a global logger from the application and
//! only links on the embedded target. On a hosted build these expand to
//! nothing, and their arguments are not evaluated.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        defmt::trace!($($arg)*);
    }};
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        defmt::debug!($($arg)*);
    }};
}

macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        defmt::info!($($arg)*);
    }};
}

macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        defmt::warn!($($arg)*);
    }};
}

// End of File
