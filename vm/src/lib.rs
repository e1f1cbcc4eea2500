pub mod error;
pub mod foreign;
pub mod link;
pub mod loader;
pub mod machine;
pub mod opcode;
pub mod slots;
pub mod specs;
pub mod value;

pub use error::{Fault, LinkError, LoadError, RegisterError};
pub use foreign::{ForeignFn, ForeignObj};
pub use link::Target;
pub use loader::{Chunk, FieldValue, Instr, Proto};
pub use machine::{Frame, Machine, FRAMES_MAX, STACK_MAX};
pub use opcode::{BinOp, OpCode};
pub use slots::{SlotTable, SlotType};
pub use value::Value;
