use memory::Comp4Error;
use std::fmt;
use std::io;

/// Assembly-time failures. Construction errors surface at the call that
/// caused them; structural errors surface at serialization.
#[derive(Debug)]
pub enum AsmError {
    /// A comp-4 field declared unsigned with a negative raw value.
    NegativeUnsigned,
    /// A comp-4 field with a scale past the representable range.
    ScaleTooLarge(u8),
    /// A module, prototype, or import name longer than the loader accepts.
    NameTooLong(usize),
    /// A display field longer than its length prefix can carry.
    DisplayTooLong(usize),
    /// Serialization attempted while prototype scopes were still open.
    UnbalancedPrototypes,
    Io(io::Error),
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmError::NegativeUnsigned => {
                write!(f, "unsigned comp-4 field with negative value")
            }
            AsmError::ScaleTooLarge(scale) => {
                write!(f, "comp-4 scale {} out of range", scale)
            }
            AsmError::NameTooLong(len) => {
                write!(f, "name of {} bytes exceeds the loadable limit", len)
            }
            AsmError::DisplayTooLong(len) => {
                write!(f, "display field of {} bytes exceeds the loadable limit", len)
            }
            AsmError::UnbalancedPrototypes => {
                write!(f, "prototype stack not empty at serialization")
            }
            AsmError::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl From<io::Error> for AsmError {
    fn from(e: io::Error) -> Self {
        AsmError::Io(e)
    }
}

impl From<Comp4Error> for AsmError {
    fn from(e: Comp4Error) -> Self {
        match e {
            Comp4Error::NegativeUnsigned(_) => AsmError::NegativeUnsigned,
            Comp4Error::ScaleTooLarge(scale) => AsmError::ScaleTooLarge(scale),
            // The remaining variants are arithmetic-only and cannot come
            // out of field construction.
            other => AsmError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                other.to_string(),
            )),
        }
    }
}
