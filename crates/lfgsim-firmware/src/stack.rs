//! Call-frame and return-frame stacks.
//!
//! Firmware routines never call each other natively. A caller pushes a
//! [`CallFrame`] naming itself and a resume label, and the callee (which may
//! run for many ticks) eventually pushes a [`ReturnFrame`] carrying that label
//! and its result. The caller pops the return frame on its next tick and
//! branches on the label and value.

use crate::FirmwareFunction;

/// A suspended caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallFrame {
    /// Function to resume when the callee returns.
    pub caller: FirmwareFunction,
    /// Which call site in the caller to resume at.
    pub return_label: u8,
}

/// A completed call waiting to be consumed by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnFrame {
    /// Function that returned.
    pub from: FirmwareFunction,
    /// Label copied from the matching call frame.
    pub return_label: u8,
    /// Returned value.
    pub value: i32,
}

/// LIFO stack of suspended callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallFrameStack {
    frames: Vec<CallFrame>,
}

impl CallFrameStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new topmost frame.
    pub fn push(&mut self, caller: FirmwareFunction, return_label: u8) {
        self.frames.push(CallFrame { caller, return_label });
    }

    /// Remove the topmost frame. `None` means the stack underflowed.
    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// Topmost frame.
    pub fn peek(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Number of suspended callers.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames from bottom to top.
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }
}

/// LIFO stack of unconsumed return values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnFrameStack {
    frames: Vec<ReturnFrame>,
}

impl ReturnFrameStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new topmost frame.
    pub fn push(&mut self, from: FirmwareFunction, return_label: u8, value: i32) {
        self.frames.push(ReturnFrame { from, return_label, value });
    }

    /// Remove the topmost frame. `None` means nothing is pending.
    pub fn pop(&mut self) -> Option<ReturnFrame> {
        self.frames.pop()
    }

    /// Topmost frame.
    pub fn peek(&self) -> Option<&ReturnFrame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_stack_lifo() {
        let mut stack = CallFrameStack::new();
        stack.push(FirmwareFunction::Main, 1);
        stack.push(FirmwareFunction::BroadcastLfg, 0);
        stack.push(FirmwareFunction::FindClearChannel, 0);
        assert_eq!(stack.depth(), 3);
        assert_eq!(stack.peek().map(|f| f.caller), Some(FirmwareFunction::FindClearChannel));

        assert_eq!(
            stack.pop(),
            Some(CallFrame { caller: FirmwareFunction::FindClearChannel, return_label: 0 })
        );
        assert_eq!(
            stack.pop(),
            Some(CallFrame { caller: FirmwareFunction::BroadcastLfg, return_label: 0 })
        );
        assert_eq!(
            stack.pop(),
            Some(CallFrame { caller: FirmwareFunction::Main, return_label: 1 })
        );
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_empty_reports_underflow() {
        let mut calls = CallFrameStack::new();
        assert_eq!(calls.pop(), None);
        let mut returns = ReturnFrameStack::new();
        assert_eq!(returns.pop(), None);
    }

    #[test]
    fn test_return_stack_carries_value() {
        let mut stack = ReturnFrameStack::new();
        stack.push(FirmwareFunction::FindClearChannel, 0, -1);
        assert_eq!(stack.depth(), 1);
        let frame = stack.pop().unwrap();
        assert_eq!(frame.from, FirmwareFunction::FindClearChannel);
        assert_eq!(frame.return_label, 0);
        assert_eq!(frame.value, -1);
        assert!(stack.is_empty());
    }
}
