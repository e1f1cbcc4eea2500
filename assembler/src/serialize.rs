//! Streaming chunk emission. The layout mirrors the loader's single
//! ordered pass; see `vm::specs` for the authoritative contract.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::error::AsmError;
use crate::module::{Assembler, FieldDecl};
use vm::specs::{
    CHUNK_MAGIC, CHUNK_VERSION, FIELD_COMP2, FIELD_COMP4, FIELD_DISPLAY, MAX_DISPLAY, MAX_NAME,
};

fn write_string<W: Write>(sink: &mut W, s: &str) -> Result<(), AsmError> {
    if s.len() > MAX_NAME {
        return Err(AsmError::NameTooLong(s.len()));
    }
    sink.write_u16::<LittleEndian>(s.len() as u16)?;
    sink.write_all(s.as_bytes())?;
    Ok(())
}

impl Assembler {
    /// Emit the complete chunk in one pass, header to code.
    pub fn serialize<W: Write>(&self, sink: &mut W) -> Result<(), AsmError> {
        if !self.balanced() {
            return Err(AsmError::UnbalancedPrototypes);
        }

        sink.write_all(&CHUNK_MAGIC)?;
        sink.write_u8(CHUNK_VERSION)?;
        write_string(sink, &self.name)?;
        sink.write_all(&self.tag)?;

        sink.write_u32::<LittleEndian>(self.fields.len() as u32)?;
        for field in &self.fields {
            match field {
                FieldDecl::Comp2(v) => {
                    sink.write_u8(FIELD_COMP2)?;
                    sink.write_f64::<LittleEndian>(*v)?;
                }
                FieldDecl::Comp4(v) => {
                    sink.write_u8(FIELD_COMP4)?;
                    sink.write_u8(v.is_signed() as u8)?;
                    sink.write_u8(v.scale())?;
                    sink.write_i64::<LittleEndian>(v.raw())?;
                }
                FieldDecl::Display(value) => {
                    sink.write_u8(FIELD_DISPLAY)?;
                    match value {
                        None => sink.write_u8(0)?,
                        Some(bytes) => {
                            if bytes.len() > MAX_DISPLAY {
                                return Err(AsmError::DisplayTooLong(bytes.len()));
                            }
                            sink.write_u8(1)?;
                            sink.write_u16::<LittleEndian>(bytes.len() as u16)?;
                            sink.write_all(bytes)?;
                        }
                    }
                }
            }
        }

        sink.write_u32::<LittleEndian>(self.protos.len() as u32)?;
        for proto in &self.protos {
            match &proto.name {
                Some(name) => {
                    sink.write_u8(1)?;
                    write_string(sink, name)?;
                }
                None => sink.write_u8(0)?,
            }
            sink.write_u32::<LittleEndian>(proto.parent.map_or(0, |p| p + 1))?;
            sink.write_u32::<LittleEndian>(proto.entry)?;
        }

        sink.write_u32::<LittleEndian>(self.imports.len() as u32)?;
        for (module, program) in &self.imports {
            write_string(sink, module)?;
            write_string(sink, program)?;
        }

        sink.write_u32::<LittleEndian>(self.code.len() as u32)?;
        for instr in &self.code {
            sink.write_u8(instr.op.as_u8())?;
            let count = instr.op.operands();
            sink.write_u8(count)?;
            if count >= 1 {
                sink.write_i8(instr.a)?;
            }
            if count >= 2 {
                sink.write_i8(instr.b)?;
            }
        }
        Ok(())
    }
}
