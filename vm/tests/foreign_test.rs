use assembler::Assembler;
use memory::Alloc;
use std::cell::Cell;
use std::rc::Rc;
use vm::{Fault, Machine, OpCode, RegisterError, Value};

/// One exported program that forwards slot 1 through an imported foreign.
fn sqrt_caller(alloc: &Alloc) -> Assembler {
    let mut asm = Assembler::new(alloc, "calc", [0u8; 16]);
    let sqrt = asm.import("mathlib", "sqrt");
    asm.prototype_push(Some("main"));
    asm.emit_b(OpCode::Import, sqrt as i32);
    asm.emit_b(OpCode::Load, 1);
    asm.emit_c(OpCode::Call, 1, 1);
    asm.emit_b(OpCode::Return, 1);
    asm.prototype_pop();
    asm
}

#[test]
fn foreign_program_runs_exactly_once_with_its_usings() {
    let alloc = Alloc::new();
    {
        let calls = Rc::new(Cell::new(0u32));
        let seen = Rc::new(Cell::new(0.0f64));

        let mut machine = Machine::new(&alloc);
        let counter = calls.clone();
        let args_seen = seen.clone();
        machine
            .register_foreign(
                "mathlib",
                "sqrt",
                Rc::new(move |_machine, usings| {
                    counter.set(counter.get() + 1);
                    let v = match usings {
                        [Value::Comp2(v)] => *v,
                        _ => return Err(Fault::TypeMismatch("comp-2 using".to_string())),
                    };
                    args_seen.set(v);
                    Ok(vec![Value::Comp2(v.sqrt())])
                }),
            )
            .unwrap();

        machine.add_chunk(sqrt_caller(&alloc).chunk().unwrap()).unwrap();
        machine.link().unwrap();

        machine.ensure_slots(2);
        machine.set_slot_comp2(1, 9.0).unwrap();
        machine.set_slot_program(0, "calc", "main").unwrap();
        machine.call(0, 1);

        assert_eq!(calls.get(), 1);
        assert_eq!(seen.get(), 9.0);
        assert_eq!(machine.get_slot_comp2(1).unwrap(), 3.0);
    }
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn duplicate_foreign_registration_is_rejected() {
    let alloc = Alloc::new();
    {
        let mut machine = Machine::new(&alloc);
        machine
            .register_foreign("mathlib", "sqrt", Rc::new(|_, _| Ok(vec![])))
            .unwrap();

        let err = machine
            .register_foreign("mathlib", "sqrt", Rc::new(|_, _| Ok(vec![])))
            .unwrap_err();
        assert_eq!(
            err,
            RegisterError::Duplicate {
                module: "mathlib".to_string(),
                program: "sqrt".to_string(),
            }
        );
    }
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn foreign_returning_count_is_enforced() {
    let alloc = Alloc::new();
    {
        let mut machine = Machine::new(&alloc);
        // Declared with one returning at the call site, hands back two.
        machine
            .register_foreign(
                "mathlib",
                "sqrt",
                Rc::new(|_, _| Ok(vec![Value::Comp2(1.0), Value::Comp2(2.0)])),
            )
            .unwrap();

        machine.add_chunk(sqrt_caller(&alloc).chunk().unwrap()).unwrap();
        machine.link().unwrap();

        machine.ensure_slots(2);
        machine.set_slot_comp2(1, 9.0).unwrap();
        machine.set_slot_program(0, "calc", "main").unwrap();

        let err = machine.protected_call(0, 1).unwrap_err();
        assert_eq!(
            err,
            Fault::ArityMismatch {
                expected: 1,
                actual: 2,
            }
        );
    }
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
#[should_panic(expected = "machine fault")]
fn foreign_arity_fault_is_fatal_without_protection() {
    let alloc = Alloc::new();
    let mut machine = Machine::new(&alloc);
    machine
        .register_foreign("mathlib", "sqrt", Rc::new(|_, _| Ok(vec![])))
        .unwrap();

    machine.add_chunk(sqrt_caller(&alloc).chunk().unwrap()).unwrap();
    machine.link().unwrap();

    machine.ensure_slots(2);
    machine.set_slot_comp2(1, 9.0).unwrap();
    machine.set_slot_program(0, "calc", "main").unwrap();
    machine.call(0, 1);
}

#[test]
fn foreign_can_reenter_the_machine() {
    let alloc = Alloc::new();
    {
        let mut inner = Assembler::new(&alloc, "m", [0u8; 16]);
        let two = inner.field_comp2(2.0);
        inner.prototype_push(Some("double"));
        inner.emit_b(OpCode::Load, 1);
        inner.emit_b(OpCode::Push, two as i32);
        inner.emit_b(OpCode::BinaryOp, vm::BinOp::Mul.as_u8() as i32);
        inner.emit_b(OpCode::Return, 1);
        inner.prototype_pop();

        let mut machine = Machine::new(&alloc);
        machine
            .register_foreign(
                "host",
                "twice",
                Rc::new(|machine: &mut Machine, _usings: &[Value]| {
                    machine.set_slot_program(0, "m", "double")?;
                    machine.protected_call(0, 1)?;
                    machine.protected_call(0, 1)?;
                    Ok(vec![])
                }),
            )
            .unwrap();

        let mut outer = Assembler::new(&alloc, "n", [1u8; 16]);
        let twice = outer.import("host", "twice");
        outer.prototype_push(Some("main"));
        outer.emit_b(OpCode::Import, twice as i32);
        outer.emit_c(OpCode::Call, 0, 0);
        outer.emit_b(OpCode::Return, 0);
        outer.prototype_pop();

        machine.add_chunk(inner.chunk().unwrap()).unwrap();
        machine.add_chunk(outer.chunk().unwrap()).unwrap();
        machine.link().unwrap();

        machine.ensure_slots(2);
        machine.set_slot_comp2(1, 3.0).unwrap();
        machine.set_slot_program(0, "n", "main").unwrap();
        machine.call(0, 0);

        // The foreign re-entered twice, doubling slot 1 each time.
        assert_eq!(machine.get_slot_comp2(1).unwrap(), 12.0);
    }
    assert_eq!(alloc.outstanding(), 0);
}
