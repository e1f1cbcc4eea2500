use assembler::Assembler;
use memory::Alloc;
use std::rc::Rc;
use vm::{Fault, LinkError, Machine, OpCode};

fn exporter(alloc: &Alloc, module: &str, tag: u8, program: &str) -> Assembler {
    let mut asm = Assembler::new(alloc, module, [tag; 16]);
    asm.prototype_push(Some(program));
    asm.emit_b(OpCode::Return, 0);
    asm.prototype_pop();
    asm
}

#[test]
fn link_resolves_imports_across_chunks() {
    let alloc = Alloc::new();
    {
        let mut provider = Assembler::new(&alloc, "lib", [0u8; 16]);
        let one = provider.field_comp2(1.0);
        provider.prototype_push(Some("one"));
        provider.emit_b(OpCode::Push, one as i32);
        provider.emit_b(OpCode::Return, 1);
        provider.prototype_pop();

        let mut consumer = Assembler::new(&alloc, "app", [1u8; 16]);
        let import = consumer.import("lib", "one");
        consumer.prototype_push(Some("main"));
        consumer.emit_b(OpCode::Import, import as i32);
        consumer.emit_c(OpCode::Call, 0, 1);
        consumer.emit_b(OpCode::Return, 1);
        consumer.prototype_pop();

        let mut machine = Machine::new(&alloc);
        machine.add_chunk(provider.chunk().unwrap()).unwrap();
        machine.add_chunk(consumer.chunk().unwrap()).unwrap();
        machine.link().unwrap();

        machine.ensure_slots(2);
        machine.set_slot_program(0, "app", "main").unwrap();
        machine.call(0, 1);
        assert_eq!(machine.get_slot_comp2(1).unwrap(), 1.0);
    }
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn unresolved_import_fails_the_whole_link() {
    let alloc = Alloc::new();
    {
        let mut asm = Assembler::new(&alloc, "app", [0u8; 16]);
        asm.import("nowhere", "missing");
        asm.prototype_push(Some("main"));
        asm.emit_b(OpCode::Return, 0);
        asm.prototype_pop();

        let mut machine = Machine::new(&alloc);
        machine.add_chunk(asm.chunk().unwrap()).unwrap();
        assert_eq!(
            machine.link().unwrap_err(),
            LinkError::Unresolved {
                module: "nowhere".to_string(),
                program: "missing".to_string(),
            }
        );

        // The failed link leaves the machine unlinked.
        machine.ensure_slots(1);
        assert_eq!(
            machine.set_slot_program(0, "app", "main").unwrap_err(),
            Fault::NotLinked
        );
    }
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn colliding_exports_are_a_duplicate_symbol() {
    let alloc = Alloc::new();
    {
        let mut machine = Machine::new(&alloc);
        machine
            .add_chunk(exporter(&alloc, "m", 0, "main").chunk().unwrap())
            .unwrap();
        machine
            .add_chunk(exporter(&alloc, "m", 1, "main").chunk().unwrap())
            .unwrap();
        assert_eq!(
            machine.link().unwrap_err(),
            LinkError::DuplicateSymbol {
                module: "m".to_string(),
                program: "main".to_string(),
            }
        );
    }
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn chunk_export_cannot_shadow_a_foreign() {
    let alloc = Alloc::new();
    {
        let mut machine = Machine::new(&alloc);
        machine
            .register_foreign("m", "main", Rc::new(|_, _| Ok(vec![])))
            .unwrap();
        machine
            .add_chunk(exporter(&alloc, "m", 0, "main").chunk().unwrap())
            .unwrap();
        assert_eq!(
            machine.link().unwrap_err(),
            LinkError::DuplicateSymbol {
                module: "m".to_string(),
                program: "main".to_string(),
            }
        );
    }
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn relinking_after_a_new_chunk_is_idempotent() {
    let alloc = Alloc::new();
    {
        let mut machine = Machine::new(&alloc);
        machine
            .add_chunk(exporter(&alloc, "a", 0, "main").chunk().unwrap())
            .unwrap();
        machine.link().unwrap();
        machine.link().unwrap();

        // A newly loaded chunk drops the linked state until relinked.
        machine
            .add_chunk(exporter(&alloc, "b", 0, "main").chunk().unwrap())
            .unwrap();
        machine.ensure_slots(1);
        assert_eq!(
            machine.set_slot_program(0, "a", "main").unwrap_err(),
            Fault::NotLinked
        );
        machine.link().unwrap();
        machine.set_slot_program(0, "b", "main").unwrap();
    }
    assert_eq!(alloc.outstanding(), 0);
}
