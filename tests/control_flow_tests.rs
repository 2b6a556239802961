mod common;

use common::*;
use tolgen::ast::*;
use tolgen::codegen::{Instruction, Opcode};

#[test]
fn test_constant_conditions_emit_no_conditional_branch() {
    let folded = Expr::binary(BinaryOp::Lt, Expr::int(1), Expr::int(2), TypeRef::boolean());
    let body = compile_body(vec![
        Stmt::if_(Expr::bool(true), call_stmt("a"), Some(call_stmt("b"))),
        Stmt::while_(Expr::bool(false), call_stmt("c")),
        Stmt::do_(Stmt::block(vec![call_stmt("d")]), Expr::bool(false)),
        Stmt::if_(folded, call_stmt("e"), None),
    ]);

    assert_eq!(body.count(Instruction::is_conditional_jump), 0);
    assert_eq!(calls(&body, "a"), 1);
    assert_eq!(calls(&body, "b"), 0);
    assert_eq!(calls(&body, "c"), 0);
    assert_eq!(calls(&body, "d"), 1);
    assert_eq!(calls(&body, "e"), 1);
}

#[test]
fn test_break_through_finally_in_for_in_while() {
    let body = compile_body(vec![Stmt::labeled(
        "outer",
        Stmt::while_(
            cond("more"),
            Stmt::block(vec![Stmt::for_(
                vec![],
                None,
                vec![],
                Stmt::block(vec![Stmt::try_(
                    Stmt::block(vec![Stmt::break_(Some("outer"))]),
                    vec![],
                    Some(Stmt::block(vec![call_stmt("fin")])),
                )]),
            )]),
        ),
    )]);

    // once on the way out, once in the exception handler
    let sites = call_sites(&body, "fin");
    assert_eq!(sites.len(), 2);

    let inline = sites[0];
    assert!(matches!(body.instructions[inline + 1], Instruction::Jump { op: Opcode::Goto, .. }));
    let ret = body
        .instructions
        .iter()
        .position(|i| *i == Instruction::Op(Opcode::Return))
        .expect("implicit return");
    assert_eq!(body.jump_offsets(inline + 1), vec![ret]);
}

#[test]
fn test_constant_true_loops_jump_back_unconditionally() {
    let body = compile_body(vec![
        Stmt::while_(
            Expr::bool(true),
            Stmt::block(vec![Stmt::if_(cond("stop"), Stmt::break_(None), None), call_stmt("work")]),
        ),
        call_stmt("after"),
        Stmt::do_(
            Stmt::block(vec![Stmt::if_(cond("halt"), Stmt::break_(None), None), call_stmt("spin")]),
            Expr::bool(true),
        ),
        call_stmt("done"),
    ]);

    // only the two `if`s test anything
    assert_eq!(body.count(Instruction::is_conditional_jump), 2);

    for (head, last, end) in [("stop", "work", "after"), ("halt", "spin", "done")] {
        let begin = call_sites(&body, head)[0];
        let back = call_sites(&body, last)[0] + 1;
        let end = call_sites(&body, end)[0];
        assert!(matches!(body.instructions[back], Instruction::Jump { op: Opcode::Goto, .. }));
        assert_eq!(body.jump_offsets(back), vec![begin]);
        assert_eq!(back + 1, end);

        let backward: Vec<usize> = (begin..end)
            .filter(|&pc| matches!(body.instructions[pc], Instruction::Jump { op: Opcode::Goto, .. }))
            .filter(|&pc| body.jump_offsets(pc)[0] <= pc)
            .collect();
        assert_eq!(backward, vec![back]);

        // the break leaves through the loop end
        assert!((begin..back).any(|pc| body.instructions[pc].targets().len() == 1 && body.jump_offsets(pc) == vec![end]));
    }
}

#[test]
fn test_break_to_while_from_for_inside_try_runs_finally_once() {
    let body = compile_body(vec![
        Stmt::labeled(
            "outer",
            Stmt::while_(
                cond("more"),
                Stmt::block(vec![Stmt::try_(
                    Stmt::block(vec![Stmt::for_(
                        vec![],
                        None,
                        vec![],
                        Stmt::block(vec![
                            Stmt::if_(cond("stop"), Stmt::break_(Some("outer")), None),
                            call_stmt("step"),
                        ]),
                    )]),
                    vec![],
                    Some(Stmt::block(vec![call_stmt("fin")])),
                )]),
            ),
        ),
        call_stmt("after"),
    ]);

    let stop = call_sites(&body, "stop")[0];
    let after = call_sites(&body, "after")[0];
    let sites = call_sites(&body, "fin");
    let inline = sites[0];
    assert!(stop < inline);
    assert!(inline < call_sites(&body, "step")[0]);

    // one finally copy between the test and the jump out of the while
    assert_eq!(sites.iter().filter(|&&pc| pc > stop && pc <= inline).count(), 1);
    assert!(matches!(body.instructions[inline + 1], Instruction::Jump { op: Opcode::Goto, .. }));
    assert_eq!(body.jump_offsets(inline + 1), vec![after]);

    // the handler still covers the loop body
    assert!(body.exception_table.iter().any(|e| e.catch_type.is_none()));
}

#[test]
fn test_finally_copies_get_distinct_labels() {
    let body = compile_body(vec![Stmt::while_(
        cond("more"),
        Stmt::block(vec![Stmt::try_(
            Stmt::block(vec![
                Stmt::if_(cond("a"), Stmt::return_(None), None),
                Stmt::if_(cond("b"), Stmt::break_(None), None),
                call_stmt("step"),
            ]),
            vec![],
            Some(Stmt::block(vec![Stmt::while_(cond("drain"), Stmt::block(vec![]))])),
        )]),
    )]);

    // return, break, normal completion and the catch-all handler
    let sites = call_sites(&body, "drain");
    assert_eq!(sites.len(), 4);

    let mut loop_heads: Vec<usize> = sites
        .iter()
        .map(|&pc| {
            assert!(body.instructions[pc + 1].is_conditional_jump());
            body.jump_offsets(pc + 1)[0]
        })
        .collect();
    loop_heads.sort_unstable();
    loop_heads.dedup();
    assert_eq!(loop_heads.len(), 4);
}

#[test]
fn test_goto_jumps_back_to_label() {
    let body = compile_body(vec![
        Stmt::labeled("again", call_stmt("work")),
        Stmt::if_(cond("retry"), Stmt::goto("again"), None),
    ]);
    let work = call_sites(&body, "work")[0];
    let back = body
        .instructions
        .iter()
        .position(|i| matches!(i, Instruction::Jump { op: Opcode::Goto, .. }))
        .expect("goto");
    assert_eq!(body.jump_offsets(back), vec![work]);
}

#[test]
fn test_return_inside_disposing_foreach_disposes_first() {
    let coll = TypeRef::class("Coll");
    let it = TypeRef::class("It");
    let x = LocalDecl::new(1, "x", TypeRef::object());
    let source = ForeachSource::Iterable {
        iterator: MethodRef::new("Coll", "iterator", vec![], it.clone(), InvokeKind::Interface),
        has_next: MethodRef::new("It", "hasNext", vec![], TypeRef::boolean(), InvokeKind::Interface),
        next: MethodRef::new("It", "next", vec![], TypeRef::object(), InvokeKind::Interface),
        dispose: Some(MethodRef::new("It", "close", vec![], TypeRef::void(), InvokeKind::Interface)),
    };
    let consume = MethodRef::new(CLASS, "consume", vec![TypeRef::object()], TypeRef::void(), InvokeKind::Static);
    let body = compile_body(vec![Stmt::foreach(
        x.clone(),
        static_call("items", coll),
        source,
        Stmt::block(vec![
            Stmt::if_(cond("stop"), Stmt::return_(None), None),
            Stmt::expr(Expr::call(None, consume, vec![Expr::local(&x)])),
        ]),
    )]);

    // early return, normal exit and the exception handler
    assert_eq!(calls(&body, "close"), 3);
    let ret = call_sites(&body, "close")[0] + 1;
    assert_eq!(body.instructions[ret], Instruction::Op(Opcode::Return));
    assert!(!body.exception_table.is_empty());
    assert!(body.exception_table.iter().all(|e| e.catch_type.is_none()));
}

#[test]
fn test_nested_loops_continue_outer() {
    let body = compile_body(vec![Stmt::labeled(
        "rows",
        Stmt::while_(
            cond("row"),
            Stmt::block(vec![Stmt::while_(
                cond("col"),
                Stmt::block(vec![Stmt::if_(cond("skip"), Stmt::continue_(Some("rows")), None), call_stmt("cell")]),
            )]),
        ),
    )]);
    // continue lands on the outer loop's test
    let row = call_sites(&body, "row")[0];
    let skip = call_sites(&body, "skip")[0];
    let jump = body.instructions[skip + 2].clone();
    assert!(matches!(jump, Instruction::Jump { op: Opcode::Goto, .. }));
    assert_eq!(body.jump_offsets(skip + 2), vec![row]);
}
