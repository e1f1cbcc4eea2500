// --- SERIALIZATION CONTRACT ---
// The chunk format is a single-pass streaming format: the assembler emits
// it front to back and the loader consumes it front to back, neither side
// buffering the whole chunk. Layout (all multi-byte values little-endian):
//
//   magic           3 bytes "BVM"
//   version         u8
//   module name     u16 length + bytes
//   identity tag    16 bytes
//   field table     u32 count, then per field a tag byte:
//                     FIELD_COMP2   f64
//                     FIELD_COMP4   u8 flags (bit 0 = signed), u8 scale, i64 raw
//                     FIELD_DISPLAY u8 present, then u16 length + bytes
//   prototypes      u32 count, then per entry:
//                     u8 named, then u16 length + bytes
//                     u32 parent index + 1 (0 = top level)
//                     u32 entry pc
//   import table    u32 count, then per entry two (u16 length + bytes)
//   code            u32 count, then per instruction:
//                     u8 opcode, u8 operand count, operand bytes (i8)
//
// The operand count of every instruction must match the opcode's declared
// count (`OpCode::operands`); the loader rejects anything else.

pub const CHUNK_MAGIC: [u8; 3] = *b"BVM";
pub const CHUNK_VERSION: u8 = 1;

// Field-table tags
pub const FIELD_COMP2: u8 = 0;
pub const FIELD_COMP4: u8 = 1;
pub const FIELD_DISPLAY: u8 = 2;

// Allocation-bomb guards applied while parsing. A malformed count must
// never translate into a massive pre-allocation.
pub const MAX_NAME: usize = 256;
// The u16 length prefix caps what a display field can carry.
pub const MAX_DISPLAY: usize = u16::MAX as usize;
pub const MAX_FIELDS: u32 = 65_536;
pub const MAX_PROTOS: u32 = 65_536;
pub const MAX_IMPORTS: u32 = 65_536;
pub const MAX_CODE: u32 = 1_000_000;
