use assembler::Assembler;
use memory::Alloc;
use proptest::prelude::*;
use vm::OpCode;

#[derive(Debug, Clone)]
enum Decl {
    Comp2(f64),
    Comp4 { signed: bool, scale: u8, raw: i64 },
    Display(Option<String>),
    Import(String, String),
    Emit0,
    Emit1(i32),
    Emit2(i32, i32),
}

fn decl_strategy() -> impl Strategy<Value = Decl> {
    prop_oneof![
        any::<f64>().prop_map(Decl::Comp2),
        (any::<bool>(), 0u8..=18, any::<i64>()).prop_map(|(signed, scale, raw)| {
            Decl::Comp4 { signed, scale, raw }
        }),
        proptest::option::of("[a-z]{0,12}").prop_map(Decl::Display),
        ("[a-z]{1,8}", "[a-z]{1,8}").prop_map(|(m, p)| Decl::Import(m, p)),
        Just(Decl::Emit0),
        any::<i32>().prop_map(Decl::Emit1),
        (any::<i32>(), any::<i32>()).prop_map(|(a, b)| Decl::Emit2(a, b)),
    ]
}

proptest! {
    // Each category hands out 0, 1, 2, ... no matter how declarations of
    // the other categories interleave.
    #[test]
    fn indices_dense_per_category(decls in proptest::collection::vec(decl_strategy(), 0..64)) {
        let alloc = Alloc::new();
        let mut asm = Assembler::new(&alloc, "m", [0u8; 16]);
        let mut next_field = 0u32;
        let mut next_import = 0u32;
        let mut next_pc = 0u32;

        for decl in decls {
            match decl {
                Decl::Comp2(v) => {
                    prop_assert_eq!(asm.field_comp2(v), next_field);
                    next_field += 1;
                }
                Decl::Comp4 { signed, scale, raw } => {
                    if let Ok(index) = asm.field_comp4(signed, scale, raw) {
                        prop_assert_eq!(index, next_field);
                        next_field += 1;
                    } else {
                        // Rejected declarations must not burn an index.
                        prop_assert!(!signed && raw < 0);
                    }
                }
                Decl::Display(v) => {
                    prop_assert_eq!(asm.field_display(v.as_deref()), next_field);
                    next_field += 1;
                }
                Decl::Import(m, p) => {
                    prop_assert_eq!(asm.import(&m, &p), next_import);
                    next_import += 1;
                }
                Decl::Emit0 => {
                    prop_assert_eq!(asm.emit_a(OpCode::Nop), next_pc);
                    next_pc += 1;
                }
                Decl::Emit1(b0) => {
                    prop_assert_eq!(asm.emit_b(OpCode::Load, b0), next_pc);
                    next_pc += 1;
                }
                Decl::Emit2(c0, c1) => {
                    prop_assert_eq!(asm.emit_c(OpCode::Call, c0, c1), next_pc);
                    next_pc += 1;
                }
            }
        }
        prop_assert_eq!(asm.pc(), next_pc);
    }
}
