//! Holds the [`Error`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::TaskId;

/// The ways a scheduler call can be refused
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Error {
    /// Every slot in the task table holds a live task
    TableFull,
    /// The given ID does not refer to a live task
    NoSuchTask(TaskId),
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::TableFull => write!(fmt, "task table is full"),
            Error::NoSuchTask(task_id) => write!(fmt, "no live task {}", task_id),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Error::TableFull.to_string(), "task table is full");
        assert_eq!(
            Error::NoSuchTask(TaskId::new(3)).to_string(),
            "no live task T003"
        );
    }
}

// End of File
