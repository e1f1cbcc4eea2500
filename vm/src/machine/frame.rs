/// Represents a single activation of a linked program.
///
/// Each frame tracks:
/// - `chunk`: index of the chunk the program lives in
/// - `pc`: current instruction index in that chunk's code
/// - `base`: operand-stack index of the frame's first using; the frame
///   may not pop below it
/// - `num_usings` / `num_returnings`: the caller-declared arities
#[derive(Debug, Clone)]
pub struct Frame {
    pub chunk: u32,
    pub pc: usize,
    pub base: usize,
    pub num_usings: u32,
    pub num_returnings: u32,
}

impl Frame {
    pub fn new(chunk: u32, entry: u32, base: usize, num_usings: u32, num_returnings: u32) -> Self {
        Self {
            chunk,
            pc: entry as usize,
            base,
            num_usings,
            num_returnings,
        }
    }
}
