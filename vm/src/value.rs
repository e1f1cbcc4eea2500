use crate::link::Target;
use memory::Comp4;
use std::rc::Rc;

/// A value on the operand stack: one of the three storage kinds, or a
/// resolved call target pushed by `Import` or loaded from a program slot.
#[derive(Debug, Clone)]
pub enum Value {
    Comp2(f64),
    Comp4(Comp4),
    Display(Rc<[u8]>),
    Program(Target),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Comp2(_) => "comp-2",
            Value::Comp4(_) => "comp-4",
            Value::Display(_) => "display",
            Value::Program(_) => "program",
        }
    }
}
