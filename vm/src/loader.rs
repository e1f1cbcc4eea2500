//! Chunk ingestion: one ordered pass over a serialized module.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;
use std::rc::Rc;

use crate::error::LoadError;
use crate::link::Target;
use crate::machine::Machine;
use crate::opcode::OpCode;
use crate::specs::{
    CHUNK_MAGIC, CHUNK_VERSION, FIELD_COMP2, FIELD_COMP4, FIELD_DISPLAY, MAX_CODE, MAX_DISPLAY,
    MAX_FIELDS, MAX_IMPORTS, MAX_NAME, MAX_PROTOS,
};
use memory::{ChunkBuf, Comp4};

/// A decoded instruction: opcode plus up to two signed-byte operands.
#[derive(Debug, Clone, Copy)]
pub struct Instr {
    pub op: OpCode,
    pub a: i8,
    pub b: i8,
}

/// Constant value of a field prototype. An absent display value is the
/// anonymous "no value" formal.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Comp2(f64),
    Comp4(Comp4),
    Display(Option<Rc<[u8]>>),
}

/// Declared callable signature scope. Top-level named prototypes are the
/// chunk's exported programs; `entry` is the pc their body starts at.
#[derive(Debug, Clone)]
pub struct Proto {
    pub name: Option<String>,
    pub parent: Option<u32>,
    pub entry: u32,
}

/// A loaded module. `targets` stays empty until `link` resolves the
/// import table; `buf` keeps the original bytes alive so the host's
/// release hook fires at image teardown, not before.
#[derive(Debug)]
pub struct Chunk {
    pub name: String,
    pub tag: [u8; 16],
    pub fields: Vec<FieldValue>,
    pub protos: Vec<Proto>,
    pub imports: Vec<(String, String)>,
    pub code: Vec<Instr>,
    pub(crate) targets: Vec<Target>,
    #[allow(dead_code)]
    buf: ChunkBuf,
}

fn read_string<R: Read>(reader: &mut R, what: &str) -> Result<String, LoadError> {
    let len = reader.read_u16::<LittleEndian>()? as usize;
    if len > MAX_NAME {
        return Err(LoadError::Malformed(format!(
            "{} length {} exceeds limit of {}",
            what, len, MAX_NAME
        )));
    }
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| LoadError::Malformed(format!("invalid UTF-8 in {}", what)))
}

impl Machine {
    /// Ingest a serialized chunk, taking ownership of its bytes.
    ///
    /// On success the buffer is retained inside the image and the host's
    /// release hook fires at teardown; on any failure the buffer is
    /// dropped (and the hook fires) before this returns. Loading a chunk
    /// invalidates the linked state.
    pub fn add_chunk(&mut self, buf: ChunkBuf) -> Result<(), LoadError> {
        let mut reader = buf.as_slice();

        let mut magic = [0u8; 3];
        reader.read_exact(&mut magic)?;
        if magic != CHUNK_MAGIC {
            return Err(LoadError::Malformed("bad chunk magic".to_string()));
        }
        let version = reader.read_u8()?;
        if version != CHUNK_VERSION {
            return Err(LoadError::VersionMismatch { found: version });
        }

        let name = read_string(&mut reader, "module name")?;
        let mut tag = [0u8; 16];
        reader.read_exact(&mut tag)?;

        if self.chunks.iter().any(|c| c.name == name && c.tag == tag) {
            return Err(LoadError::Duplicate { module: name });
        }

        // --- Field table ---
        let field_count = reader.read_u32::<LittleEndian>()?;
        if field_count > MAX_FIELDS {
            return Err(LoadError::Malformed(format!(
                "field count too large: {}",
                field_count
            )));
        }
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let tag = reader.read_u8()?;
            match tag {
                FIELD_COMP2 => {
                    let v = reader.read_f64::<LittleEndian>()?;
                    fields.push(FieldValue::Comp2(v));
                }
                FIELD_COMP4 => {
                    let flags = reader.read_u8()?;
                    let scale = reader.read_u8()?;
                    let raw = reader.read_i64::<LittleEndian>()?;
                    let value = Comp4::new(flags & 1 != 0, scale, raw)
                        .map_err(|e| LoadError::Malformed(format!("bad comp-4 field: {}", e)))?;
                    fields.push(FieldValue::Comp4(value));
                }
                FIELD_DISPLAY => {
                    let present = reader.read_u8()?;
                    if present == 0 {
                        fields.push(FieldValue::Display(None));
                    } else {
                        let len = reader.read_u16::<LittleEndian>()? as usize;
                        if len > MAX_DISPLAY {
                            return Err(LoadError::Malformed(format!(
                                "display field length too large: {}",
                                len
                            )));
                        }
                        let mut bytes = vec![0u8; len];
                        reader.read_exact(&mut bytes)?;
                        fields.push(FieldValue::Display(Some(Rc::from(bytes.as_slice()))));
                    }
                }
                _ => {
                    return Err(LoadError::Malformed(format!("unknown field tag: {}", tag)));
                }
            }
        }

        // --- Prototypes ---
        let proto_count = reader.read_u32::<LittleEndian>()?;
        if proto_count > MAX_PROTOS {
            return Err(LoadError::Malformed(format!(
                "prototype count too large: {}",
                proto_count
            )));
        }
        let mut protos = Vec::with_capacity(proto_count as usize);
        for i in 0..proto_count {
            let named = reader.read_u8()?;
            let proto_name = if named != 0 {
                Some(read_string(&mut reader, "prototype name")?)
            } else {
                None
            };
            let parent_plus_one = reader.read_u32::<LittleEndian>()?;
            let parent = if parent_plus_one == 0 {
                None
            } else {
                let p = parent_plus_one - 1;
                if p >= i {
                    return Err(LoadError::Malformed(format!(
                        "prototype {} has forward parent {}",
                        i, p
                    )));
                }
                Some(p)
            };
            let entry = reader.read_u32::<LittleEndian>()?;
            protos.push(Proto {
                name: proto_name,
                parent,
                entry,
            });
        }

        // --- Import table ---
        let import_count = reader.read_u32::<LittleEndian>()?;
        if import_count > MAX_IMPORTS {
            return Err(LoadError::Malformed(format!(
                "import count too large: {}",
                import_count
            )));
        }
        let mut imports = Vec::with_capacity(import_count as usize);
        for _ in 0..import_count {
            let module = read_string(&mut reader, "import module")?;
            let program = read_string(&mut reader, "import program")?;
            imports.push((module, program));
        }

        // --- Code ---
        let code_count = reader.read_u32::<LittleEndian>()?;
        if code_count > MAX_CODE {
            return Err(LoadError::Malformed(format!(
                "code length too large: {}",
                code_count
            )));
        }
        let mut code = Vec::with_capacity(code_count as usize);
        for _ in 0..code_count {
            let op_byte = reader.read_u8()?;
            let op = OpCode::from_u8(op_byte)
                .ok_or_else(|| LoadError::Malformed(format!("unknown opcode: {}", op_byte)))?;
            let count = reader.read_u8()?;
            if count != op.operands() {
                return Err(LoadError::Malformed(format!(
                    "{} encoded with {} operands, expects {}",
                    op,
                    count,
                    op.operands()
                )));
            }
            let mut operands = [0i8; 2];
            for slot in operands.iter_mut().take(count as usize) {
                *slot = reader.read_i8()?;
            }
            code.push(Instr {
                op,
                a: operands[0],
                b: operands[1],
            });
        }

        // Entry pcs must land inside (or exactly at the end of) the code.
        for proto in &protos {
            if proto.entry as usize > code.len() {
                return Err(LoadError::Malformed(format!(
                    "prototype entry pc {} outside code of length {}",
                    proto.entry,
                    code.len()
                )));
            }
        }

        self.chunks.push(Chunk {
            name,
            tag,
            fields,
            protos,
            imports,
            code,
            targets: Vec::new(),
            buf,
        });
        self.linked = false;
        Ok(())
    }
}
