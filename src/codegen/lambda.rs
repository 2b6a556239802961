//! Closure scope materialization and lambda body compilation.
//!
//! Before a body is lowered, every lambda directly inside it is analysed for
//! the locals it captures. Captured locals move into fields of a synthetic
//! scope class (`<Outer>$Scope$<n>`) created on the first capture; the
//! enclosing method creates one scope instance at entry and reaches the
//! captured locals through it. Lambda bodies are compiled ahead of the
//! enclosing body into `lambda$<method>$<n>` methods:
//!
//! * on the scope class when they capture locals of this body,
//! * on the receiver's class when they only reach `this` or locals the
//!   receiver already holds in fields,
//! * as static methods of the enclosing class when they capture nothing.

use crate::ast::*;
use crate::codegen::class::{access_flags::*, ClassDef, FieldDef, MethodDef};
use crate::codegen::gen::{ClassContext, Gen};
use crate::codegen::method_context::{Holder, LambdaTarget, LocalAccess, MethodGenerationContext};
use crate::codegen::opcodes::Opcode;
use crate::consts;
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};

/// Fields of a closure scope type, created on first request
#[derive(Debug)]
pub struct LambdaScope {
    /// Type of the enclosing receiver, for the back reference
    outer: TypeRef,
    name: Option<String>,
    fields: Vec<FieldDef>,
    captured: Vec<(LocalId, FieldRef)>,
    this_field: Option<FieldRef>,
}

impl LambdaScope {
    pub fn new(outer: &str) -> Self {
        Self {
            outer: TypeRef::class(outer),
            name: None,
            fields: Vec::new(),
            captured: Vec::new(),
            this_field: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn owner(&mut self, class: &mut ClassContext) -> String {
        self.name.get_or_insert_with(|| class.next_scope_name()).clone()
    }

    fn field_name(&self, base: &str, id: LocalId) -> String {
        if self.fields.iter().any(|f| f.name == base) {
            format!("{}${}", base, id.0)
        } else {
            base.to_string()
        }
    }

    /// Field holding `local`; every lambda capturing it shares the field
    pub fn capture(&mut self, class: &mut ClassContext, local: &LocalDecl) -> FieldRef {
        if let Some(field) = self.field_of(local.id) {
            return field.clone();
        }
        let owner = self.owner(class);
        let name = self.field_name(&local.name, local.id);
        let ty = local.ty.erasure();
        self.fields.push(FieldDef::new(&name, ty.clone(), ACC_SYNTHETIC));
        let field = FieldRef::new(&owner, &name, ty, false);
        self.captured.push((local.id, field.clone()));
        field
    }

    /// Back reference to the enclosing receiver
    pub fn capture_this(&mut self, class: &mut ClassContext) -> FieldRef {
        if let Some(field) = &self.this_field {
            return field.clone();
        }
        let owner = self.owner(class);
        self.fields
            .push(FieldDef::new(consts::OUTER_THIS_FIELD, self.outer.clone(), ACC_FINAL | ACC_SYNTHETIC));
        let field = FieldRef::new(&owner, consts::OUTER_THIS_FIELD, self.outer.clone(), false);
        self.this_field = Some(field.clone());
        field
    }

    pub fn field_of(&self, local: LocalId) -> Option<&FieldRef> {
        self.captured.iter().find(|(id, _)| *id == local).map(|(_, f)| f)
    }

    fn into_class(self) -> Result<Option<ClassDef>> {
        let Some(name) = self.name else { return Ok(None) };
        let mut def = ClassDef::new(&name, OBJECT, ACC_FINAL | ACC_SUPER | ACC_SYNTHETIC);
        def.fields = self.fields;
        def.methods.push(MethodDef::default_constructor()?);
        Ok(Some(def))
    }
}

/// Lambdas in `body` that are not nested in another lambda
pub(crate) fn direct_lambdas(body: &Stmt) -> Vec<&LambdaExpr> {
    fn in_expr<'a>(expr: &'a Expr, out: &mut Vec<&'a LambdaExpr>) {
        if let ExprKind::Lambda(lambda) = &expr.kind {
            out.push(lambda);
            return;
        }
        for operand in expr.operands() {
            in_expr(operand, out);
        }
    }
    fn in_stmt<'a>(stmt: &'a Stmt, out: &mut Vec<&'a LambdaExpr>) {
        for expr in stmt.expressions() {
            in_expr(expr, out);
        }
        for child in stmt.children() {
            in_stmt(child, out);
        }
    }
    let mut out = Vec::new();
    in_stmt(body, &mut out);
    out
}

/// Locals declared in `body` outside of lambdas
pub(crate) fn declared_locals(body: &Stmt) -> HashMap<LocalId, LocalDecl> {
    struct Decls(HashMap<LocalId, LocalDecl>);
    impl Visitor for Decls {
        fn visit_local_decl(&mut self, decl: &LocalDecl) {
            self.0.insert(decl.id, decl.clone());
        }
        fn visit_lambda(&mut self, _lambda: &LambdaExpr) {}
    }
    let mut decls = Decls(HashMap::new());
    decls.visit_stmt(body);
    decls.0
}

/// Locals a lambda (or anything nested in it) uses but does not declare
pub(crate) fn free_locals(lambda: &LambdaExpr) -> BTreeSet<LocalId> {
    #[derive(Default)]
    struct Uses {
        used: BTreeSet<LocalId>,
        declared: BTreeSet<LocalId>,
    }
    impl Visitor for Uses {
        fn visit_expr(&mut self, expr: &Expr) {
            match &expr.kind {
                ExprKind::Local(id) | ExprKind::Assign { target: id, .. } => {
                    self.used.insert(*id);
                }
                _ => {}
            }
            walk_expr(self, expr);
        }
        fn visit_local_decl(&mut self, decl: &LocalDecl) {
            self.declared.insert(decl.id);
        }
    }
    let mut uses = Uses::default();
    walk_lambda(&mut uses, lambda);
    uses.used.difference(&uses.declared).copied().collect()
}

/// Free locals of every lambda in `body`
pub(crate) fn captured_by_lambdas(body: &Stmt) -> BTreeSet<LocalId> {
    direct_lambdas(body).into_iter().flat_map(free_locals).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Host {
    Scope,
    Receiver,
    Static,
}

struct Plan<'a> {
    lambda: &'a LambdaExpr,
    host: Host,
    /// Locals of the enclosing body, captured into the scope
    locals: Vec<(LocalId, FieldRef)>,
    /// Locals the enclosing receiver already holds, with their paths
    outer: Vec<(LocalId, Vec<FieldRef>)>,
}

impl<'g> Gen<'g> {
    /// Capture analysis and compilation of the lambdas directly in `body`.
    /// Must run before `body` is lowered: it emits the scope creation and
    /// rebinds captured locals.
    pub(crate) fn prepare_lambdas<'a>(
        &mut self,
        cx: &mut MethodGenerationContext<'a>,
        body: &'a Stmt,
        params: &[LocalDecl],
    ) -> Result<()> {
        let lambdas = direct_lambdas(body);
        if lambdas.is_empty() {
            return Ok(());
        }

        let mut decls = declared_locals(body);
        for p in params {
            decls.insert(p.id, p.clone());
        }

        let mut scope = LambdaScope::new(&cx.class_name);
        let mut plans = Vec::with_capacity(lambdas.len());
        for lambda in lambdas {
            let span = lambda.body.span;
            let mut locals = Vec::new();
            let mut outer = Vec::new();
            for id in free_locals(lambda) {
                if let Ok(LocalAccess::Captured { holder: Holder::This, path }) = cx.local_access(id, span) {
                    outer.push((id, path.clone()));
                    continue;
                }
                let decl = decls.get(&id).ok_or(Error::UnknownLocal { local: id.0, span })?;
                locals.push((id, scope.capture(self.class, decl)));
            }

            let needs_outer = uses_this(&lambda.body) || !outer.is_empty();
            let host = if !locals.is_empty() {
                if needs_outer {
                    scope.capture_this(self.class);
                }
                Host::Scope
            } else if needs_outer {
                if cx.is_static {
                    return Err(Error::internal(format!(
                        "lambda at {} reaches an enclosing instance from static {}",
                        span, cx.method_name
                    )));
                }
                Host::Receiver
            } else {
                Host::Static
            };
            plans.push(Plan { lambda, host, locals, outer });
        }

        let scope_slot = match scope.name() {
            Some(_) => Some(self.materialize_scope(cx, &scope, params)?),
            None => None,
        };
        let scope_name = scope.name().map(str::to_string);
        let this_field = scope.this_field.clone();

        for plan in plans {
            let (owner, is_static, receiver, prefix) = match plan.host {
                Host::Scope => {
                    let owner = scope_name.clone().ok_or_else(|| Error::internal("scope-hosted lambda without a scope"))?;
                    (owner, false, scope_slot, this_field.iter().cloned().collect::<Vec<_>>())
                }
                Host::Receiver => (cx.class_name.clone(), false, Some(0), Vec::new()),
                Host::Static => (self.class.name.clone(), true, None, Vec::new()),
            };
            let mut this_path = prefix.clone();
            this_path.extend(cx.this_path().iter().cloned());

            let mut accesses: Vec<(LocalId, LocalAccess)> = plan
                .locals
                .into_iter()
                .map(|(id, field)| (id, LocalAccess::Captured { holder: Holder::This, path: vec![field] }))
                .collect();
            for (id, path) in plan.outer {
                let mut full = prefix.clone();
                full.extend(path);
                accesses.push((id, LocalAccess::Captured { holder: Holder::This, path: full }));
            }

            let target = self.compile_lambda(cx, plan.lambda, &owner, is_static, accesses, this_path)?;
            cx.register_lambda(plan.lambda.id, LambdaTarget { method: target, receiver });
        }

        if let Some(def) = scope.into_class()? {
            log::debug!("closure scope {} with {} fields", def.name, def.fields.len());
            self.class.nested.push(def);
        }
        Ok(())
    }

    /// `new Scope`, back reference and captured parameters; rebinds every
    /// captured local to its field
    fn materialize_scope(
        &mut self,
        cx: &mut MethodGenerationContext<'_>,
        scope: &LambdaScope,
        params: &[LocalDecl],
    ) -> Result<u16> {
        let name = scope.name().ok_or_else(|| Error::internal("materializing an empty scope"))?;
        let ty = TypeRef::class(name);
        let ctor = MethodRef::new(name, consts::CONSTRUCTOR_NAME, vec![], TypeRef::void(), InvokeKind::Special);

        let slot = cx.new_temp(&ty);
        cx.code.emit_new(name);
        cx.code.emitop(Opcode::Dup);
        cx.code.emit_invoke(&ctor);
        cx.code.emit_store(ValueKind::Reference, slot);

        if let Some(field) = &scope.this_field {
            cx.code.emit_load(ValueKind::Reference, slot);
            cx.code.emit_load(ValueKind::Reference, 0);
            cx.code.emit_putfield(field);
        }
        for p in params {
            let Some(field) = scope.field_of(p.id) else { continue };
            if let LocalAccess::Slot { slot: param_slot, kind } = cx.local_access(p.id, Span::synthetic())?.clone() {
                cx.code.emit_load(ValueKind::Reference, slot);
                cx.code.emit_load(kind, param_slot);
                cx.code.emit_putfield(field);
            }
        }
        for (id, field) in &scope.captured {
            cx.set_access(*id, LocalAccess::Captured { holder: Holder::Slot(slot), path: vec![field.clone()] });
        }
        Ok(slot)
    }

    fn compile_lambda<'a>(
        &mut self,
        cx: &MethodGenerationContext<'_>,
        lambda: &'a LambdaExpr,
        owner: &str,
        is_static: bool,
        accesses: Vec<(LocalId, LocalAccess)>,
        this_path: Vec<FieldRef>,
    ) -> Result<MethodRef> {
        let name = self.class.next_lambda_name(&cx.method_name);
        log::debug!("compiling lambda #{} as {}.{}", lambda.id.0, owner, name);

        let mut lcx = MethodGenerationContext::new(
            owner,
            &cx.method_name,
            is_static,
            lambda.return_type.clone(),
            self.class.config.var_debug_info,
        );
        lcx.reserve_this();
        for p in &lambda.parameters {
            lcx.declare_local(p);
        }
        for (id, access) in accesses {
            lcx.set_access(id, access);
        }
        lcx.set_this_path(this_path);

        self.prepare_lambdas(&mut lcx, &lambda.body, &lambda.parameters)?;
        self.gen_method_body(&mut lcx, &lambda.body)?;
        let body = lcx.code.finish()?;

        let params: Vec<TypeRef> = lambda.parameters.iter().map(|p| p.ty.erasure()).collect();
        let ret = lambda.return_type.erasure();
        let access_flags = if is_static { ACC_PRIVATE | ACC_STATIC | ACC_SYNTHETIC } else { ACC_SYNTHETIC };
        self.class.add_method(
            owner,
            MethodDef {
                name: name.clone(),
                access_flags,
                params: params.clone(),
                return_type: ret.clone(),
                body: Some(body),
            },
        );
        let invoke = if is_static { InvokeKind::Static } else { InvokeKind::Virtual };
        Ok(MethodRef::new(owner, &name, params, ret, invoke))
    }
}
