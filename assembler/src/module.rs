//! Append-only module builder.

use crate::error::AsmError;
use memory::{Alloc, ChunkBuf, Comp4};
use vm::{Instr, OpCode};

/// Constant declared in the module's field table.
#[derive(Debug, Clone)]
pub(crate) enum FieldDecl {
    Comp2(f64),
    Comp4(Comp4),
    Display(Option<Vec<u8>>),
}

/// Prototype scope, recorded at push time. `parent` is the enclosing
/// scope's index; `entry` is the pc the body starts at.
#[derive(Debug, Clone)]
pub(crate) struct ProtoDecl {
    pub name: Option<String>,
    pub parent: Option<u32>,
    pub entry: u32,
}

/// One-module builder. Every declaration category hands out dense indices
/// in emission order; those indices are what instruction operands and the
/// linker refer to.
pub struct Assembler {
    pub(crate) alloc: Alloc,
    pub(crate) name: String,
    pub(crate) tag: [u8; 16],
    pub(crate) fields: Vec<FieldDecl>,
    pub(crate) protos: Vec<ProtoDecl>,
    pub(crate) imports: Vec<(String, String)>,
    pub(crate) code: Vec<Instr>,
    open: Vec<u32>,
}

impl Assembler {
    pub fn new(alloc: &Alloc, module: &str, tag: [u8; 16]) -> Self {
        Self {
            alloc: alloc.clone(),
            name: module.to_string(),
            tag,
            fields: Vec::new(),
            protos: Vec::new(),
            imports: Vec::new(),
            code: Vec::new(),
            open: Vec::new(),
        }
    }

    // --- Field table ---

    pub fn field_comp2(&mut self, value: f64) -> u32 {
        self.fields.push(FieldDecl::Comp2(value));
        (self.fields.len() - 1) as u32
    }

    pub fn field_comp4(&mut self, signed: bool, scale: u8, raw: i64) -> Result<u32, AsmError> {
        let value = Comp4::new(signed, scale, raw)?;
        self.fields.push(FieldDecl::Comp4(value));
        Ok((self.fields.len() - 1) as u32)
    }

    /// `None` declares the anonymous no-value formal.
    pub fn field_display(&mut self, value: Option<&str>) -> u32 {
        self.fields
            .push(FieldDecl::Display(value.map(|s| s.as_bytes().to_vec())));
        (self.fields.len() - 1) as u32
    }

    // --- Import table ---

    /// Duplicates are permitted; each call gets its own index.
    pub fn import(&mut self, module: &str, program: &str) -> u32 {
        self.imports
            .push((module.to_string(), program.to_string()));
        (self.imports.len() - 1) as u32
    }

    // --- Code ---

    /// Emit a zero-operand instruction; returns its pc.
    pub fn emit_a(&mut self, op: OpCode) -> u32 {
        debug_assert_eq!(op.operands(), 0, "{} takes operands", op);
        self.code.push(Instr { op, a: 0, b: 0 });
        (self.code.len() - 1) as u32
    }

    /// Emit a one-operand instruction. The operand is truncated to i8;
    /// wider immediates belong in the field table.
    pub fn emit_b(&mut self, op: OpCode, b0: i32) -> u32 {
        debug_assert_eq!(op.operands(), 1, "{} does not take one operand", op);
        self.code.push(Instr {
            op,
            a: b0 as i8,
            b: 0,
        });
        (self.code.len() - 1) as u32
    }

    /// Emit a two-operand instruction, both operands truncated to i8.
    pub fn emit_c(&mut self, op: OpCode, c0: i32, c1: i32) -> u32 {
        debug_assert_eq!(op.operands(), 2, "{} does not take two operands", op);
        self.code.push(Instr {
            op,
            a: c0 as i8,
            b: c1 as i8,
        });
        (self.code.len() - 1) as u32
    }

    /// Emit a branch with a placeholder offset; patch it later with
    /// `patch_jump` once the target pc is known.
    pub fn emit_jump(&mut self, op: OpCode) -> u32 {
        assert!(
            matches!(op, OpCode::Jump | OpCode::JumpIfNot),
            "{} is not a branch",
            op
        );
        self.emit_c(op, 0, 0)
    }

    /// Point a previously emitted branch at `target_pc`. The offset is
    /// relative to the instruction after the branch. Patching a
    /// non-branch pc or an offset outside i16 range is a programming
    /// error and panics.
    pub fn patch_jump(&mut self, pc: u32, target_pc: u32) {
        let instr = &mut self.code[pc as usize];
        assert!(
            matches!(instr.op, OpCode::Jump | OpCode::JumpIfNot),
            "pc {} holds {}, not a branch",
            pc,
            instr.op
        );
        let offset = i64::from(target_pc) - (i64::from(pc) + 1);
        let offset = i16::try_from(offset).unwrap_or_else(|_| {
            panic!("branch offset {} out of range at pc {}", offset, pc)
        });
        instr.a = (offset >> 8) as i8;
        instr.b = offset as i8;
    }

    /// Current pc, the index the next emitted instruction will get.
    pub fn pc(&self) -> u32 {
        self.code.len() as u32
    }

    // --- Prototype scopes ---

    /// Open a prototype scope starting at the current pc. A named scope
    /// opened at top level becomes one of the module's exported programs.
    pub fn prototype_push(&mut self, name: Option<&str>) -> u32 {
        let parent = self.open.last().copied();
        let index = self.protos.len() as u32;
        self.protos.push(ProtoDecl {
            name: name.map(str::to_string),
            parent,
            entry: self.pc(),
        });
        self.open.push(index);
        index
    }

    /// Close the innermost open scope. Popping with no scope open is a
    /// programming error and panics.
    pub fn prototype_pop(&mut self) {
        assert!(
            self.open.pop().is_some(),
            "prototype_pop without matching push"
        );
    }

    pub(crate) fn balanced(&self) -> bool {
        self.open.is_empty()
    }

    /// Serialize into an owned, allocation-audited buffer ready for
    /// `Machine::add_chunk`.
    pub fn chunk(&self) -> Result<ChunkBuf, AsmError> {
        let mut bytes = Vec::new();
        self.serialize(&mut bytes)?;
        Ok(ChunkBuf::without_hook(&self.alloc, bytes))
    }
}
