//! The machine-global typed slot table.
//!
//! Slots are created vacant by `ensure`; the first typed write fixes a
//! slot's type (and, for comp-4, its signedness and scale). Every later
//! access must conform — the wrong accessor kind is a type-mismatch
//! fault, and the table never rescales a comp-4 write.

use crate::error::Fault;
use crate::link::Target;
use crate::value::Value;
use memory::{Alloc, Comp4, DisplayBuf};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotType {
    Vacant,
    Comp2,
    Comp4 { signed: bool, scale: u8 },
    Display,
    Program,
}

#[derive(Debug)]
enum Slot {
    Vacant,
    Comp2(f64),
    Comp4(Comp4),
    Display(DisplayBuf),
    Program(Target),
}

impl Slot {
    fn kind_name(&self) -> &'static str {
        match self {
            Slot::Vacant => "vacant",
            Slot::Comp2(_) => "comp-2",
            Slot::Comp4(_) => "comp-4",
            Slot::Display(_) => "display",
            Slot::Program(_) => "program",
        }
    }
}

pub struct SlotTable {
    slots: Vec<Slot>,
    alloc: Alloc,
}

fn mismatch(expected: &str, slot: &Slot) -> Fault {
    Fault::TypeMismatch(format!("expected {} slot, found {}", expected, slot.kind_name()))
}

impl SlotTable {
    pub fn new(alloc: &Alloc) -> Self {
        Self {
            slots: Vec::new(),
            alloc: alloc.clone(),
        }
    }

    /// Grow to at least `n` slots. Never shrinks; existing indices stay
    /// valid.
    pub fn ensure(&mut self, n: usize) {
        while self.slots.len() < n {
            self.slots.push(Slot::Vacant);
        }
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }

    fn get(&self, i: usize) -> Result<&Slot, Fault> {
        self.slots.get(i).ok_or(Fault::SlotOutOfBounds(i))
    }

    fn get_mut(&mut self, i: usize) -> Result<&mut Slot, Fault> {
        self.slots.get_mut(i).ok_or(Fault::SlotOutOfBounds(i))
    }

    pub fn slot_type(&self, i: usize) -> Result<SlotType, Fault> {
        Ok(match self.get(i)? {
            Slot::Vacant => SlotType::Vacant,
            Slot::Comp2(_) => SlotType::Comp2,
            Slot::Comp4(v) => SlotType::Comp4 {
                signed: v.is_signed(),
                scale: v.scale(),
            },
            Slot::Display(_) => SlotType::Display,
            Slot::Program(_) => SlotType::Program,
        })
    }

    pub fn set_comp2(&mut self, i: usize, value: f64) -> Result<(), Fault> {
        let slot = self.get_mut(i)?;
        match slot {
            Slot::Vacant | Slot::Comp2(_) => {
                *slot = Slot::Comp2(value);
                Ok(())
            }
            other => Err(mismatch("comp-2", other)),
        }
    }

    pub fn get_comp2(&self, i: usize) -> Result<f64, Fault> {
        match self.get(i)? {
            Slot::Comp2(v) => Ok(*v),
            other => Err(mismatch("comp-2", other)),
        }
    }

    pub fn set_comp4(&mut self, i: usize, value: Comp4) -> Result<(), Fault> {
        let slot = self.get_mut(i)?;
        match slot {
            Slot::Vacant => {
                *slot = Slot::Comp4(value);
                Ok(())
            }
            Slot::Comp4(current) => {
                if !current.conforms_to(&value) {
                    return Err(Fault::TypeMismatch(format!(
                        "comp-4 slot declared (signed={}, scale={}), write has (signed={}, scale={})",
                        current.is_signed(),
                        current.scale(),
                        value.is_signed(),
                        value.scale()
                    )));
                }
                *slot = Slot::Comp4(value);
                Ok(())
            }
            other => Err(mismatch("comp-4", other)),
        }
    }

    pub fn get_comp4(&self, i: usize) -> Result<Comp4, Fault> {
        match self.get(i)? {
            Slot::Comp4(v) => Ok(*v),
            other => Err(mismatch("comp-4", other)),
        }
    }

    /// Phase one of a display write: storage sized exactly to `len`,
    /// returned for the caller to fill in place.
    pub fn reserve_display(&mut self, i: usize, len: usize) -> Result<&mut [u8], Fault> {
        let alloc = self.alloc.clone();
        let slot = self.get_mut(i)?;
        match slot {
            Slot::Vacant | Slot::Display(_) => {
                *slot = Slot::Display(DisplayBuf::reserve(&alloc, len));
                match slot {
                    Slot::Display(buf) => Ok(buf.as_mut_slice()),
                    _ => unreachable!(),
                }
            }
            other => Err(mismatch("display", other)),
        }
    }

    pub fn set_display(&mut self, i: usize, bytes: &[u8]) -> Result<(), Fault> {
        self.reserve_display(i, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// View of the slot's bytes, valid until the next mutation of the slot.
    pub fn get_display(&self, i: usize) -> Result<&[u8], Fault> {
        match self.get(i)? {
            Slot::Display(buf) => Ok(buf.as_bytes()),
            other => Err(mismatch("display", other)),
        }
    }

    pub fn set_program(&mut self, i: usize, target: Target) -> Result<(), Fault> {
        let slot = self.get_mut(i)?;
        match slot {
            Slot::Vacant | Slot::Program(_) => {
                *slot = Slot::Program(target);
                Ok(())
            }
            other => Err(mismatch("program", other)),
        }
    }

    pub fn get_program(&self, i: usize) -> Result<Target, Fault> {
        match self.get(i)? {
            Slot::Program(t) => Ok(*t),
            other => Err(mismatch("program", other)),
        }
    }

    /// Type-conforming slot copy; the destination adopts the source type
    /// only if still vacant.
    pub fn copy(&mut self, dst: usize, src: usize) -> Result<(), Fault> {
        let value = self.load_value(src)?;
        self.store_value(dst, &value)
    }

    /// Read a slot as an operand-stack value.
    pub(crate) fn load_value(&self, i: usize) -> Result<Value, Fault> {
        Ok(match self.get(i)? {
            Slot::Vacant => {
                return Err(Fault::TypeMismatch(format!("slot {} is vacant", i)));
            }
            Slot::Comp2(v) => Value::Comp2(*v),
            Slot::Comp4(v) => Value::Comp4(*v),
            Slot::Display(buf) => Value::Display(Rc::from(buf.as_bytes())),
            Slot::Program(t) => Value::Program(*t),
        })
    }

    /// Write an operand-stack value into a slot, conforming to its type.
    pub(crate) fn store_value(&mut self, i: usize, value: &Value) -> Result<(), Fault> {
        match value {
            Value::Comp2(v) => self.set_comp2(i, *v),
            Value::Comp4(v) => self.set_comp4(i, *v),
            Value::Display(bytes) => self.set_display(i, bytes),
            Value::Program(t) => self.set_program(i, *t),
        }
    }
}
