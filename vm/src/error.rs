use memory::Comp4Error;
use std::fmt;

/// Chunk ingestion status.
#[derive(Debug, PartialEq, Eq)]
pub enum LoadError {
    Malformed(String),
    VersionMismatch { found: u8 },
    Duplicate { module: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Malformed(msg) => write!(f, "malformed chunk: {}", msg),
            LoadError::VersionMismatch { found } => {
                write!(f, "chunk version {} not supported", found)
            }
            LoadError::Duplicate { module } => {
                write!(f, "chunk {} already loaded", module)
            }
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(_: std::io::Error) -> Self {
        LoadError::Malformed("unexpected end of chunk".to_string())
    }
}

/// Link resolution status. Recoverable: the host may add chunks or
/// register foreign programs and call `link` again.
#[derive(Debug, PartialEq, Eq)]
pub enum LinkError {
    Unresolved { module: String, program: String },
    DuplicateSymbol { module: String, program: String },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Unresolved { module, program } => {
                write!(f, "unresolved symbol {}::{}", module, program)
            }
            LinkError::DuplicateSymbol { module, program } => {
                write!(f, "duplicate symbol {}::{}", module, program)
            }
        }
    }
}

/// Foreign-program registration status.
#[derive(Debug, PartialEq, Eq)]
pub enum RegisterError {
    Duplicate { module: String, program: String },
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::Duplicate { module, program } => {
                write!(f, "foreign program {}::{} already registered", module, program)
            }
        }
    }
}

/// Machine-level execution fault. Fatal under `call`; trapped and returned
/// under `protected_call`.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    StackUnderflow,
    StackOverflow,
    InvalidOperand(String),
    CodeOutOfBounds,
    SlotOutOfBounds(usize),
    TypeMismatch(String),
    ArityMismatch { expected: u32, actual: u32 },
    Arithmetic(Comp4Error),
    NotLinked,
    NotAProgram,
    UnknownProgram { module: String, program: String },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::StackUnderflow => write!(f, "operand stack underflow"),
            Fault::StackOverflow => write!(f, "operand stack overflow"),
            Fault::InvalidOperand(msg) => write!(f, "invalid operand: {}", msg),
            Fault::CodeOutOfBounds => write!(f, "branch outside program code"),
            Fault::SlotOutOfBounds(i) => write!(f, "slot {} out of bounds", i),
            Fault::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            Fault::ArityMismatch { expected, actual } => {
                write!(f, "arity mismatch: expected {}, got {}", expected, actual)
            }
            Fault::Arithmetic(e) => write!(f, "arithmetic fault: {}", e),
            Fault::NotLinked => write!(f, "machine is not linked"),
            Fault::NotAProgram => write!(f, "call target is not a program"),
            Fault::UnknownProgram { module, program } => {
                write!(f, "unknown program {}::{}", module, program)
            }
        }
    }
}

impl From<Comp4Error> for Fault {
    fn from(e: Comp4Error) -> Self {
        Fault::Arithmetic(e)
    }
}
