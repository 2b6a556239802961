mod common;

use common::*;
use tolgen::ast::*;
use tolgen::codegen::{access_flags::*, Instruction};

const RUNNABLE: &str = "java/lang/Runnable";

fn lambda(id: u32, body: Vec<Stmt>) -> Expr {
    Expr::lambda(LambdaExpr {
        id: LambdaId(id),
        parameters: vec![],
        return_type: TypeRef::void(),
        body: Box::new(Stmt::block(body)),
        interface: MethodRef::new(RUNNABLE, "run", vec![], TypeRef::void(), InvokeKind::Interface),
    })
}

/// `Foo.submit(lambda)`
fn submit(lambda: Expr) -> Stmt {
    let submit = MethodRef::new(CLASS, "submit", vec![TypeRef::class(RUNNABLE)], TypeRef::void(), InvokeKind::Static);
    Stmt::expr(Expr::call(None, submit, vec![lambda]))
}

/// `Foo.use(x)`
fn use_local(x: &LocalDecl) -> Stmt {
    let sink = MethodRef::new(CLASS, "use", vec![TypeRef::int()], TypeRef::void(), InvokeKind::Static);
    Stmt::expr(Expr::call(None, sink, vec![Expr::local(x)]))
}

#[test]
fn test_capture_free_lambda_is_private_static() {
    let class = compile(vec![static_method("m", vec![], vec![submit(lambda(1, vec![call_stmt("tick")]))])]);
    assert!(class.nested.is_empty());
    let lambda = class.method("lambda$m$0").expect("lambda method");
    assert_eq!(lambda.access_flags, ACC_PRIVATE | ACC_STATIC | ACC_SYNTHETIC);
    let body = method_body(&class, "m");
    assert!(matches!(&body.instructions[0], Instruction::Closure { target, .. } if target.name == "lambda$m$0"));
}

#[test]
fn test_lambdas_share_one_scope() {
    let x = int_local(1, "x");
    let class = compile(vec![static_method(
        "m",
        vec![],
        vec![
            Stmt::local(x.clone(), Some(Expr::int(7))),
            submit(lambda(1, vec![use_local(&x)])),
            submit(lambda(2, vec![use_local(&x)])),
        ],
    )]);
    assert_eq!(class.nested.len(), 1);
    let scope = &class.nested[0];
    assert_eq!(scope.name, "Foo$Scope$0");
    assert_eq!(scope.fields.len(), 1);
    assert!(scope.method("lambda$m$0").is_some());
    assert!(scope.method("lambda$m$1").is_some());
    assert!(class.method("lambda$m$0").is_none());

    // the scope is created once, before any statement runs
    let body = method_body(&class, "m");
    assert_eq!(body.instructions[0], Instruction::New("Foo$Scope$0".to_string()));
    assert_eq!(body.count(|i| matches!(i, Instruction::New(_))), 1);
}

#[test]
fn test_nested_lambda_reads_through_scope_receiver() {
    let x = int_local(1, "x");
    let inner = lambda(2, vec![use_local(&x)]);
    let outer = lambda(1, vec![submit(inner)]);
    let class = compile(vec![static_method(
        "m",
        vec![],
        vec![Stmt::local(x.clone(), Some(Expr::int(7))), submit(outer)],
    )]);
    assert_eq!(class.nested.len(), 1);
    let scope = &class.nested[0];
    let outer_body = method_body(scope, "lambda$m$0");
    let inner_body = method_body(scope, "lambda$m$1");

    // the inner closure is bound to the scope instance
    assert_eq!(outer_body.instructions[0], Instruction::Load { kind: ValueKind::Reference, slot: 0 });
    assert!(matches!(&outer_body.instructions[1], Instruction::Closure { target, .. } if target.owner == "Foo$Scope$0"));
    assert_eq!(inner_body.instructions[0], Instruction::Load { kind: ValueKind::Reference, slot: 0 });
    assert!(matches!(&inner_body.instructions[1], Instruction::GetField(f) if f.name == "x"));
}

#[test]
fn test_instance_lambda_capturing_local_and_this() {
    let x = int_local(1, "x");
    let tick = MethodRef::new(CLASS, "tick", vec![], TypeRef::void(), InvokeKind::Virtual);
    let body = vec![
        Stmt::local(x.clone(), Some(Expr::int(1))),
        submit(lambda(1, vec![use_local(&x), Stmt::expr(Expr::call(Some(Expr::this(CLASS)), tick, vec![]))])),
    ];
    let class = compile(vec![instance_method("m", vec![], body)]);
    let scope = &class.nested[0];
    let names: Vec<&str> = scope.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["x", "this$0"]);
    assert!(scope.method("lambda$m$0").is_some());

    // `this` inside the lambda is reached through the back reference
    let lambda_body = method_body(scope, "lambda$m$0");
    assert!(lambda_body
        .instructions
        .iter()
        .any(|i| matches!(i, Instruction::GetField(f) if f.name == "this$0")));
}
