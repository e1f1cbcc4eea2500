//! Symbol resolution across loaded chunks and the foreign registry.
//!
//! Linking turns every (module, program) import into a direct [`Target`]
//! so execution never performs a name lookup. The contract is
//! all-or-nothing and idempotent: every `link` call rebuilds the export
//! table and re-resolves all imports of all chunks from scratch; a failed
//! link leaves the machine unlinked.

use crate::error::LinkError;
use crate::machine::Machine;
use std::collections::HashMap;

/// A resolved call target: an exported entry inside a loaded chunk, or an
/// index into the foreign registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Code { chunk: u32, entry: u32 },
    Foreign(u32),
}

impl Machine {
    /// Resolve every import of every loaded chunk.
    ///
    /// Exported entries are the top-level named prototypes of each chunk,
    /// keyed by (chunk module name, prototype name). A key exported twice,
    /// or shadowing a registered foreign program, is a duplicate-symbol
    /// error.
    pub fn link(&mut self) -> Result<(), LinkError> {
        self.linked = false;
        self.exports.clear();

        let mut exports: HashMap<(String, String), Target> = HashMap::new();
        for (ci, chunk) in self.chunks.iter().enumerate() {
            for proto in &chunk.protos {
                let name = match (&proto.parent, &proto.name) {
                    (None, Some(name)) => name,
                    _ => continue,
                };
                let key = (chunk.name.clone(), name.clone());
                if self.foreigns.lookup(&key.0, &key.1).is_some() {
                    return Err(LinkError::DuplicateSymbol {
                        module: key.0,
                        program: key.1,
                    });
                }
                let target = Target::Code {
                    chunk: ci as u32,
                    entry: proto.entry,
                };
                if exports.insert(key.clone(), target).is_some() {
                    return Err(LinkError::DuplicateSymbol {
                        module: key.0,
                        program: key.1,
                    });
                }
            }
        }

        // Resolve before committing anything.
        let mut resolved: Vec<Vec<Target>> = Vec::with_capacity(self.chunks.len());
        for chunk in &self.chunks {
            let mut targets = Vec::with_capacity(chunk.imports.len());
            for (module, program) in &chunk.imports {
                let target = exports
                    .get(&(module.clone(), program.clone()))
                    .copied()
                    .or_else(|| {
                        self.foreigns
                            .lookup(module, program)
                            .map(|i| Target::Foreign(i as u32))
                    })
                    .ok_or_else(|| LinkError::Unresolved {
                        module: module.clone(),
                        program: program.clone(),
                    })?;
                targets.push(target);
            }
            resolved.push(targets);
        }

        for (chunk, targets) in self.chunks.iter_mut().zip(resolved) {
            chunk.targets = targets;
        }
        self.exports = exports;
        self.linked = true;
        Ok(())
    }

    /// Direct target for a linked symbol: chunk exports first, then the
    /// foreign registry.
    pub(crate) fn lookup_program(&self, module: &str, program: &str) -> Option<Target> {
        self.exports
            .get(&(module.to_string(), program.to_string()))
            .copied()
            .or_else(|| {
                self.foreigns
                    .lookup(module, program)
                    .map(|i| Target::Foreign(i as u32))
            })
    }
}
