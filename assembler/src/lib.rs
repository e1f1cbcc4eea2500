//! Module assembler: builds one chunk append-only and serializes it into
//! the wire format the machine loads.
//!
//! The builder is host-facing plumbing for tests and embedders; programs
//! reference constants and imports by the dense indices these methods
//! return, so emission order is the only source of truth for numbering.

pub mod error;
pub mod module;
mod serialize;

pub use error::AsmError;
pub use module::Assembler;
