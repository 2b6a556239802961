mod common;

use common::*;
use tolgen::ast::*;
use tolgen::codegen::{Instruction, MethodBody};

/// `switch (x)` with one section per key, each calling `s<i>()` and breaking
fn int_switch(keys: &[i32]) -> MethodBody {
    let x = int_local(1, "x");
    let sections = keys
        .iter()
        .enumerate()
        .map(|(i, &k)| SwitchSection::cases(vec![Expr::int(k)], vec![call_stmt(&format!("s{}", i)), Stmt::break_(None)]))
        .collect();
    let class = compile(vec![static_method(
        "m",
        vec![x.clone()],
        vec![Stmt::switch(Expr::local(&x), SwitchKind::Integral, sections)],
    )]);
    method_body(&class, "m").clone()
}

fn section_starts(body: &MethodBody, count: usize) -> Vec<usize> {
    (0..count).map(|i| call_sites(body, &format!("s{}", i))[0]).collect()
}

#[test]
fn test_sparse_keys_use_lookup_switch() {
    let body = int_switch(&[2, 4, 6, 8]);
    let pc = body
        .instructions
        .iter()
        .position(|i| matches!(i, Instruction::LookupSwitch { .. }))
        .expect("lookupswitch");
    let Instruction::LookupSwitch { pairs, .. } = &body.instructions[pc] else { unreachable!() };
    let keys: Vec<i32> = pairs.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![2, 4, 6, 8]);

    let starts = section_starts(&body, 4);
    assert!(starts.windows(2).all(|w| w[0] < w[1]), "sections out of source order");
    // default goes past the switch, then one target per key
    assert_eq!(body.jump_offsets(pc)[1..].to_vec(), starts);
}

#[test]
fn test_dense_keys_use_table_switch() {
    let body = int_switch(&[5, 3, 2, 4]);
    let pc = body
        .instructions
        .iter()
        .position(|i| matches!(i, Instruction::TableSwitch { .. }))
        .expect("tableswitch");
    let Instruction::TableSwitch { low, high, .. } = &body.instructions[pc] else { unreachable!() };
    assert_eq!((*low, *high), (2, 5));

    let starts = section_starts(&body, 4);
    assert!(starts.windows(2).all(|w| w[0] < w[1]), "sections out of source order");
    // keys 2, 3, 4, 5 belong to sections 2, 1, 3, 0
    assert_eq!(body.jump_offsets(pc)[1..].to_vec(), vec![starts[2], starts[1], starts[3], starts[0]]);
}

#[test]
fn test_missing_default_falls_out_of_switch() {
    let body = int_switch(&[1, 2]);
    let pc = body
        .instructions
        .iter()
        .position(|i| matches!(i, Instruction::TableSwitch { .. }))
        .expect("tableswitch");
    let default = body.jump_offsets(pc)[0];
    assert_eq!(body.instructions[default], Instruction::Op(tolgen::codegen::Opcode::Return));
}

#[test]
fn test_string_switch_strategies() {
    fn string_switch(sections: usize) -> Stmt {
        let s = LocalDecl::new(1, "s", TypeRef::string());
        let sections = (0..sections)
            .map(|i| SwitchSection::cases(vec![Expr::string(&format!("k{}", i))], vec![Stmt::break_(None)]))
            .collect();
        Stmt::switch(Expr::local(&s), SwitchKind::String, sections)
    }
    let s = LocalDecl::new(1, "s", TypeRef::string());
    let class = compile(vec![
        static_method("short", vec![s.clone()], vec![string_switch(6)]),
        static_method("long", vec![s.clone()], vec![string_switch(7)]),
    ]);

    let short = method_body(&class, "short");
    assert_eq!(calls(short, "equals"), 6);
    assert_eq!(calls(short, "get"), 0);

    let long = method_body(&class, "long");
    assert_eq!(calls(long, "equals"), 0);
    assert_eq!(calls(long, "put"), 7);
    // one cached map for the whole class
    assert_eq!(class.fields.len(), 1);
    assert!(class.fields[0].name.starts_with("$switch$map$"));
}

#[test]
fn test_enum_switch_dispatches_on_ordinal() {
    let e = LocalDecl::new(1, "e", TypeRef::class("Color"));
    let ordinal = MethodRef::new("Color", "ordinal", vec![], TypeRef::int(), InvokeKind::Virtual);
    let class = compile(vec![static_method(
        "m",
        vec![e.clone()],
        vec![Stmt::switch(
            Expr::local(&e),
            SwitchKind::Enum { ordinal },
            vec![
                SwitchSection::cases(vec![Expr::int(0)], vec![call_stmt("red"), Stmt::break_(None)]),
                SwitchSection::default(vec![call_stmt("other")]),
            ],
        )],
    )]);
    let body = method_body(&class, "m");
    let ord = call_sites(body, "ordinal")[0];
    assert!(matches!(body.instructions[ord + 1], Instruction::TableSwitch { low: 0, high: 0, .. }));
    // the default section is the switch's default target
    assert_eq!(body.jump_offsets(ord + 1)[0], call_sites(body, "other")[0]);
}

#[test]
fn test_case_label_from_constant_field() {
    let x = int_local(1, "x");
    let limit = FieldRef::new("Limits", "MAX", TypeRef::int(), true);
    let case = Expr::field(None, limit).with_constant(ConstValue::Int(4));
    let class = compile(vec![static_method(
        "m",
        vec![x.clone()],
        vec![Stmt::switch(
            Expr::local(&x),
            SwitchKind::Integral,
            vec![SwitchSection::cases(vec![case], vec![call_stmt("s0"), Stmt::break_(None)])],
        )],
    )]);
    let body = method_body(&class, "m");
    assert!(matches!(body.instructions[1], Instruction::TableSwitch { low: 4, high: 4, .. }));
    assert_eq!(body.count(|i| matches!(i, Instruction::GetField(_))), 0);
}
