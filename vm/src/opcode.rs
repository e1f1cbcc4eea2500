//! OpCode definitions for the BVM executor.
//!
//! Instructions carry one opcode byte and zero, one, or two signed-byte
//! operands; the operand count is fixed per opcode. Wider immediates are
//! routed through constant field prototypes, with one exception: the two
//! operand bytes of a branch form a signed 16-bit pc-relative offset.

use std::fmt;

/// Virtual machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// No operation
    Nop = 0,
    /// Drop the top of the operand stack
    Pop = 1,
    /// Push the constant value of field prototype `b0`
    Push = 2,
    /// Push the current frame's usings count as an unsigned scale-0 comp-4
    NumUsings = 3,
    /// Pop the top value, then overwrite the entry `b0` positions below
    /// the new top with it (`b0 = 0` replaces the new top)
    Replace = 4,
    /// Push the value of global slot `b0`
    Load = 5,
    /// Pop the top value into global slot `b0`
    Store = 6,
    /// Push the resolved call target of import-table entry `b0`
    Import = 7,
    /// Branch by the signed 16-bit offset `(c0 << 8) | c1`
    Jump = 8,
    /// Pop a numeric condition; branch when it is zero
    JumpIfNot = 9,
    /// Pop `c0` usings and a target beneath them; invoke expecting `c1` returnings
    Call = 10,
    /// Leave the top `b0` values as returnings and pop the frame
    Return = 11,
    /// Pop rhs then lhs, apply the operation selected by `b0`
    BinaryOp = 12,
    /// Pop a display value and write its bytes to the machine's sink
    Display = 13,
}

impl OpCode {
    /// Get opcode from byte value
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(OpCode::Nop),
            1 => Some(OpCode::Pop),
            2 => Some(OpCode::Push),
            3 => Some(OpCode::NumUsings),
            4 => Some(OpCode::Replace),
            5 => Some(OpCode::Load),
            6 => Some(OpCode::Store),
            7 => Some(OpCode::Import),
            8 => Some(OpCode::Jump),
            9 => Some(OpCode::JumpIfNot),
            10 => Some(OpCode::Call),
            11 => Some(OpCode::Return),
            12 => Some(OpCode::BinaryOp),
            13 => Some(OpCode::Display),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Declared operand count; the loader rejects instructions whose
    /// encoded count differs.
    pub fn operands(self) -> u8 {
        match self {
            OpCode::Nop | OpCode::Pop | OpCode::NumUsings | OpCode::Display => 0,
            OpCode::Push
            | OpCode::Replace
            | OpCode::Load
            | OpCode::Store
            | OpCode::Import
            | OpCode::Return
            | OpCode::BinaryOp => 1,
            OpCode::Jump | OpCode::JumpIfNot | OpCode::Call => 2,
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Nop => "NOP",
            OpCode::Pop => "POP",
            OpCode::Push => "PUSH",
            OpCode::NumUsings => "NUM_USINGS",
            OpCode::Replace => "REPLACE",
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::Import => "IMPORT",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfNot => "JUMP_IF_NOT",
            OpCode::Call => "CALL",
            OpCode::Return => "RETURN",
            OpCode::BinaryOp => "BINARY_OP",
            OpCode::Display => "DISPLAY",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Operation selector carried in the operand byte of `BinaryOp`.
/// Comparisons push an unsigned scale-0 comp-4 truth value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BinOp {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    Eq = 4,
    Ne = 5,
    Lt = 6,
    Le = 7,
    Gt = 8,
    Ge = 9,
}

impl BinOp {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(BinOp::Add),
            1 => Some(BinOp::Sub),
            2 => Some(BinOp::Mul),
            3 => Some(BinOp::Div),
            4 => Some(BinOp::Eq),
            5 => Some(BinOp::Ne),
            6 => Some(BinOp::Lt),
            7 => Some(BinOp::Le),
            8 => Some(BinOp::Gt),
            9 => Some(BinOp::Ge),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }
}
