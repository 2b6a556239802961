// Common test utilities
#![allow(dead_code)]

use tolgen::ast::*;
use tolgen::codegen::{ClassDef, Instruction, MethodBody, StackExprGen};
use tolgen::{generate_class, Config};

pub const CLASS: &str = "Foo";

/// `Foo.<name>()` returning `ret`, dispatched statically
pub fn static_call(name: &str, ret: TypeRef) -> Expr {
    Expr::call(None, MethodRef::new(CLASS, name, vec![], ret, InvokeKind::Static), vec![])
}

/// Side-effecting `Foo.<name>()` statement
pub fn call_stmt(name: &str) -> Stmt {
    Stmt::expr(static_call(name, TypeRef::void()))
}

/// Opaque boolean condition `Foo.<name>()`
pub fn cond(name: &str) -> Expr {
    static_call(name, TypeRef::boolean())
}

pub fn int_local(id: u32, name: &str) -> LocalDecl {
    LocalDecl::new(id, name, TypeRef::int())
}

/// Public static void method
pub fn static_method(name: &str, params: Vec<LocalDecl>, body: Vec<Stmt>) -> MethodDecl {
    MethodDecl::new(name, params, TypeRef::void(), Some(Stmt::block(body)))
        .with_modifiers(vec![Modifier::Public, Modifier::Static])
}

/// Public instance void method
pub fn instance_method(name: &str, params: Vec<LocalDecl>, body: Vec<Stmt>) -> MethodDecl {
    MethodDecl::new(name, params, TypeRef::void(), Some(Stmt::block(body)))
}

pub fn try_compile_with(methods: Vec<MethodDecl>, config: &Config) -> tolgen::Result<ClassDef> {
    let mut class = ClassDecl::new(CLASS, methods);
    for m in &mut class.methods {
        info::annotate_method(m);
    }
    let mut exprs = StackExprGen::new();
    generate_class(&class, &mut exprs, config)
}

pub fn compile(methods: Vec<MethodDecl>) -> ClassDef {
    try_compile_with(methods, &Config::default()).expect("generation failed")
}

/// Compile a single static method and return its body
pub fn compile_body(body: Vec<Stmt>) -> MethodBody {
    let class = compile(vec![static_method("m", vec![], body)]);
    method_body(&class, "m").clone()
}

pub fn method_body<'a>(class: &'a ClassDef, name: &str) -> &'a MethodBody {
    class
        .method(name)
        .and_then(|m| m.body.as_ref())
        .unwrap_or_else(|| panic!("no body for {}", name))
}

pub fn is_call(insn: &Instruction, name: &str) -> bool {
    matches!(insn, Instruction::Invoke(m) if m.name == name)
}

pub fn calls(body: &MethodBody, name: &str) -> usize {
    body.count(|i| is_call(i, name))
}

/// Positions of every call to `name`
pub fn call_sites(body: &MethodBody, name: &str) -> Vec<usize> {
    body.instructions
        .iter()
        .enumerate()
        .filter(|(_, i)| is_call(i, name))
        .map(|(pc, _)| pc)
        .collect()
}
