use assembler::Assembler;
use memory::{Alloc, ChunkBuf};
use std::cell::Cell;
use std::rc::Rc;
use vm::{LoadError, Machine, OpCode};

fn well_formed(alloc: &Alloc, tag: u8) -> Vec<u8> {
    let mut asm = Assembler::new(alloc, "m", [tag; 16]);
    asm.prototype_push(Some("main"));
    asm.emit_b(OpCode::Return, 0);
    asm.prototype_pop();
    let mut bytes = Vec::new();
    asm.serialize(&mut bytes).unwrap();
    bytes
}

#[test]
fn bad_magic_is_malformed() {
    let alloc = Alloc::new();
    {
        let mut bytes = well_formed(&alloc, 0);
        bytes[0] = b'X';
        let mut machine = Machine::new(&alloc);
        let err = machine
            .add_chunk(ChunkBuf::without_hook(&alloc, bytes))
            .unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn truncated_chunk_is_malformed() {
    let alloc = Alloc::new();
    {
        let mut bytes = well_formed(&alloc, 0);
        bytes.truncate(bytes.len() - 3);
        let mut machine = Machine::new(&alloc);
        let err = machine
            .add_chunk(ChunkBuf::without_hook(&alloc, bytes))
            .unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn future_version_is_rejected() {
    let alloc = Alloc::new();
    {
        let mut bytes = well_formed(&alloc, 0);
        bytes[3] = 9;
        let mut machine = Machine::new(&alloc);
        let err = machine
            .add_chunk(ChunkBuf::without_hook(&alloc, bytes))
            .unwrap_err();
        assert_eq!(err, LoadError::VersionMismatch { found: 9 });
    }
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn same_name_and_tag_is_a_duplicate() {
    let alloc = Alloc::new();
    {
        let mut machine = Machine::new(&alloc);
        machine
            .add_chunk(ChunkBuf::without_hook(&alloc, well_formed(&alloc, 0)))
            .unwrap();
        let err = machine
            .add_chunk(ChunkBuf::without_hook(&alloc, well_formed(&alloc, 0)))
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::Duplicate {
                module: "m".to_string(),
            }
        );

        // Same name under a different tag is a distinct module.
        machine
            .add_chunk(ChunkBuf::without_hook(&alloc, well_formed(&alloc, 1)))
            .unwrap();
    }
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn release_hook_fires_once_at_image_teardown() {
    let alloc = Alloc::new();
    let released = Rc::new(Cell::new(0u32));
    {
        let mut machine = Machine::new(&alloc);
        let hook = released.clone();
        machine
            .add_chunk(ChunkBuf::new(&alloc, well_formed(&alloc, 0), move || {
                hook.set(hook.get() + 1)
            }))
            .unwrap();

        // Retained by the image while the machine lives.
        assert_eq!(released.get(), 0);
        assert_eq!(alloc.outstanding(), 1);
    }
    assert_eq!(released.get(), 1);
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn release_hook_fires_before_a_failed_load_returns() {
    let alloc = Alloc::new();
    {
        let released = Rc::new(Cell::new(0u32));
        let mut bytes = well_formed(&alloc, 0);
        bytes[0] = b'X';

        let mut machine = Machine::new(&alloc);
        let hook = released.clone();
        let err = machine
            .add_chunk(ChunkBuf::new(&alloc, bytes, move || {
                hook.set(hook.get() + 1)
            }))
            .unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
        assert_eq!(released.get(), 1);
    }
    assert_eq!(alloc.outstanding(), 0);
}
