pub mod alloc;
pub mod comp;
pub mod display;

pub use alloc::{Alloc, ChunkBuf};
pub use comp::{Comp4, Comp4Error};
pub use display::DisplayBuf;
