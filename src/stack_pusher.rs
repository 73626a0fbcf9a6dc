//! Holds the [`StackPusher`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// A helper for pushing machine words into a full-descending Arm EABI stack
pub(crate) struct StackPusher(*mut usize);

impl StackPusher {
    /// Make a new full-descending stack from the given pointer
    ///
    /// It will not write to the given pointer, but it will write immediately
    /// below it - because this is a Full Descending stack.
    ///
    /// # Safety
    ///
    /// There must be enough free space below the given pointer to accept all
    /// the items you are going to push.
    pub(crate) unsafe fn new(stack_top: *mut usize) -> StackPusher {
        StackPusher(stack_top)
    }

    /// Push something onto the stack, decrementing the pointer
    pub(crate) fn push(&mut self, value: usize) {
        // SAFETY: the constructor's caller promised us the space
        unsafe {
            self.0 = self.0.offset(-1);
            self.0.write_volatile(value);
        }
    }

    /// Push the same value several times
    pub(crate) fn push_repeated(&mut self, value: usize, count: usize) {
        for _ in 0..count {
            self.push(value);
        }
    }

    /// Get the current stack value
    pub(crate) fn current(&self) -> *mut usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushes_grow_downwards() {
        let mut memory = [0usize; 6];
        let top = memory.as_mut_ptr_range().end;
        // SAFETY: six words of space, and we push five
        let mut stack_pusher = unsafe { StackPusher::new(top) };
        stack_pusher.push(1);
        stack_pusher.push_repeated(7, 3);
        stack_pusher.push(2);
        // SAFETY: both point into `memory`
        assert_eq!(unsafe { top.offset_from(stack_pusher.current()) }, 5);
        assert_eq!(memory, [0, 2, 7, 7, 7, 1]);
    }
}

// End of File
