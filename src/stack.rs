//! Holds the [`StackArena`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::cell::UnsafeCell;

/// The memory for every task stack, one region of `STACK_SIZE` bytes for each
/// of the `MAX_TASKS` slots in the task table.
///
/// We align stacks on 8-byte boundaries, as required by AAPCS.
#[repr(C, align(8))]
pub(crate) struct StackArena<const MAX_TASKS: usize, const STACK_SIZE: usize> {
    /// The memory reserved for the task stacks
    contents: UnsafeCell<[[u8; STACK_SIZE]; MAX_TASKS]>,
}

impl<const MAX_TASKS: usize, const STACK_SIZE: usize> StackArena<MAX_TASKS, STACK_SIZE> {
    /// Create a new arena
    pub(crate) const fn new() -> Self {
        Self {
            contents: UnsafeCell::new([[0u8; STACK_SIZE]; MAX_TASKS]),
        }
    }

    /// Get the lowest address of the given region
    fn bottom(&self, index: usize) -> *mut u8 {
        assert!(index < MAX_TASKS);
        // SAFETY: the index is in bounds, so the result points into our array
        unsafe { self.contents.get().cast::<u8>().add(index * STACK_SIZE) }
    }

    /// Get the top of the given region
    pub(crate) fn top(&self, index: usize) -> *mut usize {
        // SAFETY: Pointing one past the region is allowed, as this is a full
        // descending stack and we never write to the 'top' address - only
        // below it
        unsafe { self.bottom(index).add(STACK_SIZE).cast::<usize>() }
    }

    /// Fill the given region with zeroes
    ///
    /// # Safety
    ///
    /// Nothing may be running on, or have state saved in, this region.
    pub(crate) unsafe fn clear(&self, index: usize) {
        // SAFETY: the caller guarantees nobody else is using the region
        unsafe { self.bottom(index).write_bytes(0, STACK_SIZE) }
    }

    /// How many bytes, counted down from the top, have been written to since
    /// the region was last cleared
    ///
    /// Only values the task wrote as zero escape this measurement, so it is a
    /// lower bound.
    pub(crate) fn high_water(&self, index: usize) -> usize {
        let bottom = self.bottom(index);
        let first_used = (0..STACK_SIZE)
            // SAFETY: every offset is inside the region
            .position(|offset| unsafe { bottom.add(offset).read_volatile() } != 0)
            .unwrap_or(STACK_SIZE);
        STACK_SIZE - first_used
    }
}

/// SAFETY: Our arena only exposes pointers to itself; the scheduler decides
/// who may write through them.
unsafe impl<const MAX_TASKS: usize, const STACK_SIZE: usize> Sync
    for StackArena<MAX_TASKS, STACK_SIZE>
{
}


// End of File
