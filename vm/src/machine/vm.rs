use crate::error::{Fault, RegisterError};
use crate::foreign::{ForeignFn, ForeignRegistry};
use crate::link::Target;
use crate::loader::{Chunk, FieldValue};
use crate::opcode::OpCode;
use crate::slots::{SlotTable, SlotType};
use crate::value::Value;
use memory::{Alloc, Comp4};
use std::collections::HashMap;
use std::rc::Rc;

use super::arith::ArithmeticOps;
use super::control::ControlFlowOps;
use super::frame::Frame;
use super::stack::StackOps;

pub const STACK_MAX: usize = 65_536;
pub const FRAMES_MAX: usize = 1_024;

/// The virtual machine: loaded chunks, link state, the global slot table,
/// the foreign registry, and the execution stacks.
///
/// Strictly single-threaded; all entry points run synchronously to
/// completion on the calling thread, including re-entrant invocation from
/// foreign callbacks.
pub struct Machine {
    pub(crate) alloc: Alloc,
    pub(crate) chunks: Vec<Chunk>,
    pub(crate) exports: HashMap<(String, String), Target>,
    pub(crate) foreigns: ForeignRegistry,
    pub(crate) slots: SlotTable,
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) linked: bool,
    display_sink: Option<Box<dyn FnMut(&[u8])>>,
}

impl Machine {
    pub fn new(alloc: &Alloc) -> Self {
        Self {
            alloc: alloc.clone(),
            chunks: Vec::new(),
            exports: HashMap::new(),
            foreigns: ForeignRegistry::new(),
            slots: SlotTable::new(alloc),
            stack: Vec::with_capacity(64),
            frames: Vec::with_capacity(16),
            linked: false,
            display_sink: None,
        }
    }

    /// Redirect `Display` output; defaults to stdout.
    pub fn set_display_sink(&mut self, sink: impl FnMut(&[u8]) + 'static) {
        self.display_sink = Some(Box::new(sink));
    }

    /// Bind a (module, program) key to a host callable. Duplicate keys are
    /// rejected; already-resolved imports keep their binding either way.
    pub fn register_foreign(
        &mut self,
        module: &str,
        program: &str,
        func: ForeignFn,
    ) -> Result<(), RegisterError> {
        self.foreigns.register(module, program, func).map(|_| ())
    }

    // --- Slot table, host-facing ---

    pub fn ensure_slots(&mut self, n: usize) {
        self.slots.ensure(n);
    }

    pub fn num_slots(&self) -> usize {
        self.slots.count()
    }

    pub fn slot_type(&self, i: usize) -> Result<SlotType, Fault> {
        self.slots.slot_type(i)
    }

    pub fn set_slot_comp2(&mut self, i: usize, value: f64) -> Result<(), Fault> {
        self.slots.set_comp2(i, value)
    }

    pub fn get_slot_comp2(&self, i: usize) -> Result<f64, Fault> {
        self.slots.get_comp2(i)
    }

    pub fn set_slot_comp4(&mut self, i: usize, value: Comp4) -> Result<(), Fault> {
        self.slots.set_comp4(i, value)
    }

    pub fn get_slot_comp4(&self, i: usize) -> Result<Comp4, Fault> {
        self.slots.get_comp4(i)
    }

    pub fn reserve_slot_display(&mut self, i: usize, len: usize) -> Result<&mut [u8], Fault> {
        self.slots.reserve_display(i, len)
    }

    pub fn set_slot_display(&mut self, i: usize, bytes: &[u8]) -> Result<(), Fault> {
        self.slots.set_display(i, bytes)
    }

    pub fn get_slot_display(&self, i: usize) -> Result<&[u8], Fault> {
        self.slots.get_display(i)
    }

    /// Bind a slot to a linked program by name. Requires a successful
    /// `link` beforehand; the slot stores a direct target, not the name.
    pub fn set_slot_program(&mut self, i: usize, module: &str, program: &str) -> Result<(), Fault> {
        if !self.linked {
            return Err(Fault::NotLinked);
        }
        let target = self
            .lookup_program(module, program)
            .ok_or_else(|| Fault::UnknownProgram {
                module: module.to_string(),
                program: program.to_string(),
            })?;
        self.slots.set_program(i, target)
    }

    pub fn slot_copy(&mut self, dst: usize, src: usize) -> Result<(), Fault> {
        self.slots.copy(dst, src)
    }

    // --- Execution ---

    /// Invoke the program bound to slot 0 with the values of slots
    /// `1..=num_usings` as usings; returnings land back in slots
    /// `1..=num_returnings`. A machine fault is fatal.
    pub fn call(&mut self, num_usings: usize, num_returnings: usize) {
        if let Err(fault) = self.call_inner(num_usings, num_returnings) {
            panic!("machine fault: {}", fault);
        }
    }

    /// Identical contract to `call`, but machine faults are trapped and
    /// returned; the stacks are restored to their pre-call depths so the
    /// machine stays usable.
    pub fn protected_call(
        &mut self,
        num_usings: usize,
        num_returnings: usize,
    ) -> Result<(), Fault> {
        let stack_depth = self.stack.len();
        let frame_depth = self.frames.len();
        let result = self.call_inner(num_usings, num_returnings);
        if result.is_err() {
            self.frames.truncate(frame_depth);
            self.stack.truncate(stack_depth);
        }
        result
    }

    fn call_inner(&mut self, num_usings: usize, num_returnings: usize) -> Result<(), Fault> {
        if !self.linked {
            return Err(Fault::NotLinked);
        }
        let target = self.slots.get_program(0)?;

        for i in 1..=num_usings {
            let value = self.slots.load_value(i)?;
            self.push(value)?;
        }

        let floor = self.frames.len();
        self.invoke(target, num_usings as u32, num_returnings as u32)?;
        self.run(floor)?;

        // Top of stack is the last returning.
        for i in (1..=num_returnings).rev() {
            let value = self.pop()?;
            self.slots.store_value(i, &value)?;
        }
        Ok(())
    }

    /// Main interpretation loop; executes until the frame stack returns to
    /// `floor` depth.
    fn run(&mut self, floor: usize) -> Result<(), Fault> {
        while self.frames.len() > floor {
            let frame_idx = self.frames.len() - 1;
            let (chunk_idx, pc) = {
                let f = &self.frames[frame_idx];
                (f.chunk as usize, f.pc)
            };

            let instr = {
                let chunk = self.chunks.get(chunk_idx).ok_or(Fault::CodeOutOfBounds)?;
                if pc >= chunk.code.len() {
                    // Running off the end is an implicit `Return 0`.
                    self.handle_return(0)?;
                    continue;
                }
                chunk.code[pc]
            };
            self.frames[frame_idx].pc += 1;

            match instr.op {
                OpCode::Nop => {}

                OpCode::Pop => {
                    self.pop()?;
                }

                OpCode::Push => {
                    let value = self.field_constant(chunk_idx, instr.a)?;
                    self.push(value)?;
                }

                OpCode::NumUsings => {
                    let n = self.frames[frame_idx].num_usings;
                    self.push(Value::Comp4(Comp4::count(n)))?;
                }

                OpCode::Replace => {
                    let depth = operand_index(instr.a)?;
                    let value = self.pop()?;
                    let len = self.stack.len();
                    if depth >= len || len - 1 - depth < self.floor() {
                        return Err(Fault::StackUnderflow);
                    }
                    self.stack[len - 1 - depth] = value;
                }

                OpCode::Load => {
                    let slot = operand_index(instr.a)?;
                    let value = self.slots.load_value(slot)?;
                    self.push(value)?;
                }

                OpCode::Store => {
                    let slot = operand_index(instr.a)?;
                    let value = self.pop()?;
                    self.slots.store_value(slot, &value)?;
                }

                OpCode::Import => {
                    let index = operand_index(instr.a)?;
                    let chunk = self.chunks.get(chunk_idx).ok_or(Fault::CodeOutOfBounds)?;
                    let target = *chunk
                        .targets
                        .get(index)
                        .ok_or_else(|| Fault::InvalidOperand(format!("import {}", index)))?;
                    self.push(Value::Program(target))?;
                }

                OpCode::Jump => {
                    self.branch(frame_idx, chunk_idx, instr.a, instr.b)?;
                }

                OpCode::JumpIfNot => {
                    let condition = self.pop()?;
                    let truthy = match condition {
                        Value::Comp4(v) => !v.is_zero(),
                        Value::Comp2(v) => v != 0.0,
                        other => {
                            return Err(Fault::TypeMismatch(format!(
                                "branch condition is {}",
                                other.kind_name()
                            )));
                        }
                    };
                    if !truthy {
                        self.branch(frame_idx, chunk_idx, instr.a, instr.b)?;
                    }
                }

                OpCode::Call => {
                    self.handle_call(instr.a, instr.b)?;
                }

                OpCode::Return => {
                    self.handle_return(instr.a)?;
                }

                OpCode::BinaryOp => {
                    self.handle_binary(instr.a)?;
                }

                OpCode::Display => {
                    let value = self.pop()?;
                    let bytes = match value {
                        Value::Display(bytes) => bytes,
                        other => {
                            return Err(Fault::TypeMismatch(format!(
                                "display of {}",
                                other.kind_name()
                            )));
                        }
                    };
                    match &mut self.display_sink {
                        Some(sink) => sink(&bytes),
                        None => {
                            use std::io::Write;
                            let _ = std::io::stdout().write_all(&bytes);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Signed 16-bit pc-relative branch; offset is measured from the
    /// instruction after the branch.
    fn branch(&mut self, frame_idx: usize, chunk_idx: usize, hi: i8, lo: i8) -> Result<(), Fault> {
        let offset = ((hi as i16) << 8) | (lo as u8 as i16);
        let code_len = self
            .chunks
            .get(chunk_idx)
            .ok_or(Fault::CodeOutOfBounds)?
            .code
            .len();
        let pc = self.frames[frame_idx].pc as i64 + offset as i64;
        if pc < 0 || pc as usize > code_len {
            return Err(Fault::CodeOutOfBounds);
        }
        self.frames[frame_idx].pc = pc as usize;
        Ok(())
    }

    fn field_constant(&self, chunk_idx: usize, operand: i8) -> Result<Value, Fault> {
        let index = operand_index(operand)?;
        let chunk = self.chunks.get(chunk_idx).ok_or(Fault::CodeOutOfBounds)?;
        let field = chunk
            .fields
            .get(index)
            .ok_or_else(|| Fault::InvalidOperand(format!("field {}", index)))?;
        Ok(match field {
            FieldValue::Comp2(v) => Value::Comp2(*v),
            FieldValue::Comp4(v) => Value::Comp4(*v),
            FieldValue::Display(Some(bytes)) => Value::Display(bytes.clone()),
            FieldValue::Display(None) => Value::Display(Rc::from(&[][..])),
        })
    }
}

fn operand_index(operand: i8) -> Result<usize, Fault> {
    if operand < 0 {
        return Err(Fault::InvalidOperand(format!("negative index {}", operand)));
    }
    Ok(operand as usize)
}
