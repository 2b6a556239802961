mod common;

use common::*;
use tolgen::ast::*;
use tolgen::codegen::{Instruction, Opcode};

fn monitor_exits(body: &tolgen::codegen::MethodBody) -> usize {
    body.count(|i| *i == Instruction::Op(Opcode::Monitorexit))
}

#[test]
fn test_return_value_survives_finally() {
    let mut method = MethodDecl::new(
        "compute",
        vec![],
        TypeRef::int(),
        Some(Stmt::block(vec![Stmt::try_(
            Stmt::block(vec![Stmt::return_(Some(static_call("value", TypeRef::int())))]),
            vec![],
            Some(Stmt::block(vec![call_stmt("fin")])),
        )])),
    );
    method.modifiers = vec![Modifier::Public, Modifier::Static];
    let class = compile(vec![method]);
    let body = method_body(&class, "compute");

    // value, istore, fin, iload, ireturn
    let fin = call_sites(body, "fin")[0];
    assert!(matches!(body.instructions[fin - 1], Instruction::Store { kind: ValueKind::Int, .. }));
    assert!(matches!(body.instructions[fin + 1], Instruction::Load { kind: ValueKind::Int, .. }));
    assert_eq!(body.instructions[fin + 2], Instruction::Op(Opcode::Ireturn));
    assert_eq!(calls(body, "fin"), 2);

    // the inlined finally is not protected by its own handler
    assert_eq!(body.exception_table.len(), 1);
    let entry = &body.exception_table[0];
    assert_eq!((entry.start_pc, entry.end_pc), (0, fin));
    assert_eq!(entry.catch_type, None);
}

#[test]
fn test_return_inside_synchronized_releases_monitor() {
    let lock = LocalDecl::new(1, "lock", TypeRef::object());
    let class = compile(vec![static_method(
        "m",
        vec![lock.clone()],
        vec![Stmt::synchronized(
            Expr::local(&lock),
            Stmt::block(vec![Stmt::if_(cond("done"), Stmt::return_(None), None), call_stmt("work")]),
        )],
    )]);
    let body = method_body(&class, "m");
    assert_eq!(body.count(|i| *i == Instruction::Op(Opcode::Monitorenter)), 1);
    // early return, normal exit, handler
    assert_eq!(monitor_exits(body), 3);

    let early = body
        .instructions
        .iter()
        .position(|i| *i == Instruction::Op(Opcode::Return))
        .expect("return");
    assert_eq!(body.instructions[early - 1], Instruction::Op(Opcode::Monitorexit));
    assert_eq!(body.exception_table.len(), 2);
    assert!(body
        .exception_table
        .iter()
        .all(|e| !(e.start_pc..e.end_pc).contains(&(early - 1))));
}

#[test]
fn test_catch_clauses_share_protected_range() {
    let io = LocalDecl::new(1, "e", TypeRef::class("java/io/IOException"));
    let any = LocalDecl::new(2, "t", TypeRef::class("java/lang/RuntimeException"));
    let clause = |decl: &LocalDecl, marker: &str| CatchClause {
        exception_type: Some(decl.ty.clone()),
        variable: Some(decl.clone()),
        body: Box::new(Stmt::block(vec![call_stmt(marker)])),
    };
    let body = compile_body(vec![Stmt::try_(
        Stmt::block(vec![call_stmt("risky")]),
        vec![clause(&io, "io"), clause(&any, "rt")],
        None,
    )]);
    let types: Vec<Option<&str>> = body.exception_table.iter().map(|e| e.catch_type.as_deref()).collect();
    assert_eq!(types, vec![Some("java/io/IOException"), Some("java/lang/RuntimeException")]);
    assert_eq!(body.exception_table[0].start_pc, body.exception_table[1].start_pc);
    assert_eq!(body.exception_table[0].end_pc, body.exception_table[1].end_pc);
    assert_eq!(body.exception_table[0].handler_pc + 1, call_sites(&body, "io")[0]);
}
