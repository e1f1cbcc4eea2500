use crate::error::Fault;
use crate::value::Value;

use super::vm::STACK_MAX;

/// Trait for operand-stack operations
pub trait StackOps {
    fn push(&mut self, value: Value) -> Result<(), Fault>;
    fn pop(&mut self) -> Result<Value, Fault>;
    /// Stack index the current frame may not pop below.
    fn floor(&self) -> usize;
}

impl StackOps for super::vm::Machine {
    fn push(&mut self, value: Value) -> Result<(), Fault> {
        if self.stack.len() >= STACK_MAX {
            return Err(Fault::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, Fault> {
        if self.stack.len() <= self.floor() {
            return Err(Fault::StackUnderflow);
        }
        self.stack.pop().ok_or(Fault::StackUnderflow)
    }

    fn floor(&self) -> usize {
        self.frames.last().map(|f| f.base).unwrap_or(0)
    }
}
