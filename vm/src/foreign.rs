//! Host-implemented subroutines ("foreign programs").
//!
//! A foreign program is registered under a (module, program) key and
//! resolved by the linker into a direct registry index, so execution never
//! performs a name lookup. The callback receives the machine itself and
//! may re-enter it (`protected_call`) recursively.

use crate::error::{Fault, RegisterError};
use crate::machine::Machine;
use crate::value::Value;
use std::rc::Rc;

/// The unified signature for all foreign programs. The slice holds the
/// usings, first-pushed first; the returned vector must hold exactly the
/// caller-declared number of returnings.
pub type ForeignFn = Rc<dyn Fn(&mut Machine, &[Value]) -> Result<Vec<Value>, Fault>>;

#[derive(Clone)]
pub struct ForeignObj {
    pub module: String,
    pub program: String,
    pub func: ForeignFn,
}

#[derive(Default)]
pub(crate) struct ForeignRegistry {
    entries: Vec<ForeignObj>,
}

impl ForeignRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a key to a callable. A duplicate key is rejected: a resolved
    /// import holds a direct index into this registry, and an overwrite
    /// would silently retarget already-linked code.
    pub fn register(
        &mut self,
        module: &str,
        program: &str,
        func: ForeignFn,
    ) -> Result<usize, RegisterError> {
        if self.lookup(module, program).is_some() {
            return Err(RegisterError::Duplicate {
                module: module.to_string(),
                program: program.to_string(),
            });
        }
        self.entries.push(ForeignObj {
            module: module.to_string(),
            program: program.to_string(),
            func,
        });
        Ok(self.entries.len() - 1)
    }

    pub fn lookup(&self, module: &str, program: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.module == module && e.program == program)
    }

    pub fn get(&self, index: usize) -> Option<&ForeignObj> {
        self.entries.get(index)
    }
}
