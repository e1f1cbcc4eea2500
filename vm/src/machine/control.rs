use crate::error::Fault;
use crate::link::Target;
use crate::value::Value;

use super::frame::Frame;
use super::stack::StackOps;
use super::vm::FRAMES_MAX;

/// Trait for call/return instruction handlers
pub trait ControlFlowOps {
    fn handle_call(&mut self, num_usings: i8, num_returnings: i8) -> Result<(), Fault>;
    fn handle_return(&mut self, num_returnings: i8) -> Result<(), Fault>;

    /// Transfer control to a resolved target with `num_usings` values on
    /// top of the stack. Code targets push a frame for the interpret loop;
    /// foreign targets are bridged immediately.
    fn invoke(&mut self, target: Target, num_usings: u32, num_returnings: u32)
        -> Result<(), Fault>;

    fn call_foreign(
        &mut self,
        index: u32,
        num_usings: u32,
        num_returnings: u32,
    ) -> Result<(), Fault>;
}

impl ControlFlowOps for super::vm::Machine {
    fn handle_call(&mut self, num_usings: i8, num_returnings: i8) -> Result<(), Fault> {
        if num_usings < 0 || num_returnings < 0 {
            return Err(Fault::InvalidOperand("negative call arity".to_string()));
        }
        let k = num_usings as usize;

        // Stack shape: [..., target, u1..uk]
        let len = self.stack.len();
        if len < k + 1 || len - k - 1 < self.floor() {
            return Err(Fault::StackUnderflow);
        }
        let target = match self.stack.remove(len - k - 1) {
            Value::Program(t) => t,
            _ => return Err(Fault::NotAProgram),
        };

        self.invoke(target, k as u32, num_returnings as u32)
    }

    fn handle_return(&mut self, num_returnings: i8) -> Result<(), Fault> {
        if num_returnings < 0 {
            return Err(Fault::InvalidOperand("negative return arity".to_string()));
        }
        let r = num_returnings as usize;

        let frame = self.frames.pop().ok_or(Fault::StackUnderflow)?;
        if frame.num_returnings != r as u32 {
            // Restore so a trapped fault leaves depths consistent.
            self.frames.push(frame.clone());
            return Err(Fault::ArityMismatch {
                expected: frame.num_returnings,
                actual: r as u32,
            });
        }

        if self.stack.len() < frame.base + r {
            self.frames.push(frame);
            return Err(Fault::StackUnderflow);
        }

        // Keep the top r values, discard everything else above the base
        // (leftover usings and scratch).
        let returnings = self.stack.split_off(self.stack.len() - r);
        self.stack.truncate(frame.base);
        self.stack.extend(returnings);
        Ok(())
    }

    fn invoke(
        &mut self,
        target: Target,
        num_usings: u32,
        num_returnings: u32,
    ) -> Result<(), Fault> {
        match target {
            Target::Code { chunk, entry } => {
                if self.frames.len() >= FRAMES_MAX {
                    return Err(Fault::StackOverflow);
                }
                let base = self.stack.len() - num_usings as usize;
                self.frames
                    .push(Frame::new(chunk, entry, base, num_usings, num_returnings));
                Ok(())
            }
            Target::Foreign(index) => self.call_foreign(index, num_usings, num_returnings),
        }
    }

    fn call_foreign(
        &mut self,
        index: u32,
        num_usings: u32,
        num_returnings: u32,
    ) -> Result<(), Fault> {
        // Copy the callable out of the registry first so the callback can
        // re-enter the machine.
        let func = self
            .foreigns
            .get(index as usize)
            .map(|obj| obj.func.clone())
            .ok_or(Fault::NotAProgram)?;

        let k = num_usings as usize;
        if self.stack.len() < k {
            return Err(Fault::StackUnderflow);
        }
        let args = self.stack.split_off(self.stack.len() - k);

        let returnings = func(self, &args)?;
        if returnings.len() != num_returnings as usize {
            return Err(Fault::ArityMismatch {
                expected: num_returnings,
                actual: returnings.len() as u32,
            });
        }
        for value in returnings {
            self.push(value)?;
        }
        Ok(())
    }
}
