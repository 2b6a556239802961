//! Statement lowering.
//!
//! `Gen` walks an annotated method body and appends instructions to the
//! context's `Code`. Every construct is a match arm of [`Gen::gen_stat`];
//! try/using/synchronized live in `gen_try`, switches in `gen_switch`,
//! `yield` in `iterator`. Expressions are delegated to the configured
//! [`ExpressionGenerator`].

use crate::ast::*;
use crate::codegen::class::{access_flags, ClassDef, FieldDef, MethodDef};
use crate::codegen::expr::{CondTargets, ExpressionGenerator};
use crate::codegen::label::Label;
use crate::codegen::method_context::{FrameKind, LocalAccess, MethodGenerationContext};
use crate::codegen::opcodes::Opcode;
use crate::config::Config;
use crate::consts;
use crate::error::{Error, Result};

/// Per-class state shared by every method compiled into the class
#[derive(Debug)]
pub struct ClassContext {
    pub name: String,
    pub config: Config,
    /// Synthetic fields (string switch maps)
    pub fields: Vec<FieldDef>,
    /// Synthetic methods (compiled lambda bodies), by owning class
    pub methods: Vec<(String, MethodDef)>,
    /// Synthetic classes (closure scopes, iterator states)
    pub nested: Vec<ClassDef>,
    switch_maps: u32,
    iterators: u32,
    scopes: u32,
    lambdas: u32,
}

impl ClassContext {
    pub fn new(name: &str, config: Config) -> Self {
        Self {
            name: name.to_string(),
            config,
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
            switch_maps: 0,
            iterators: 0,
            scopes: 0,
            lambdas: 0,
        }
    }

    /// Declare a fresh static field for a string switch map
    pub fn new_switch_map(&mut self) -> FieldRef {
        let name = format!("{}{}", consts::SWITCH_MAP_PREFIX, self.switch_maps);
        self.switch_maps += 1;
        let ty = TypeRef::class(consts::HASH_MAP);
        self.fields.push(FieldDef::new(
            &name,
            ty.clone(),
            access_flags::ACC_PRIVATE | access_flags::ACC_STATIC | access_flags::ACC_SYNTHETIC,
        ));
        FieldRef::new(&self.name, &name, ty, true)
    }

    pub fn add_method(&mut self, owner: &str, method: MethodDef) {
        self.methods.push((owner.to_string(), method));
    }

    pub fn next_iterator_name(&mut self) -> String {
        let name = format!("{}{}{}", self.name, consts::ITERATOR_CLASS_INFIX, self.iterators);
        self.iterators += 1;
        name
    }

    pub fn next_scope_name(&mut self) -> String {
        let name = format!("{}{}{}", self.name, consts::SCOPE_CLASS_INFIX, self.scopes);
        self.scopes += 1;
        name
    }

    pub fn next_lambda_name(&mut self, method: &str) -> String {
        let name = format!("{}{}${}", consts::LAMBDA_METHOD_PREFIX, method, self.lambdas);
        self.lambdas += 1;
        name
    }
}

/// Statement code generator
pub struct Gen<'g> {
    pub exprs: &'g mut dyn ExpressionGenerator,
    pub class: &'g mut ClassContext,
}

impl<'g> Gen<'g> {
    pub fn new(exprs: &'g mut dyn ExpressionGenerator, class: &'g mut ClassContext) -> Self {
        Self { exprs, class }
    }

    /// Lower a whole method body, closing it with an implicit `return`
    /// when its end point is reachable
    pub fn gen_method_body<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, body: &'a Stmt) -> Result<()> {
        cx.set_parents(body);
        self.gen_stat(cx, body)?;
        if body.completes_normally() {
            if !cx.return_type.is_void() {
                return Err(Error::internal(format!(
                    "end of non-void method {}.{} is reachable",
                    cx.class_name, cx.method_name
                )));
            }
            cx.code.emit_return(ValueKind::Void);
        }
        Ok(())
    }

    // ----- expressions -----

    /// Push the value of `expr`
    pub(crate) fn gen_expr(&mut self, cx: &mut MethodGenerationContext<'_>, expr: &Expr) -> Result<()> {
        self.exprs.emit_expression(cx, expr, None, true)
    }

    pub(crate) fn gen_cond(&mut self, cx: &mut MethodGenerationContext<'_>, expr: &Expr, targets: CondTargets) -> Result<()> {
        self.exprs.emit_expression(cx, expr, Some(targets), true)
    }

    fn gen_expr_stat(&mut self, cx: &mut MethodGenerationContext<'_>, expr: &Expr) -> Result<()> {
        self.exprs.emit_expression(cx, expr, None, false)
    }

    // ----- statements -----

    pub fn gen_stats<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, stats: &'a [Stmt]) -> Result<()> {
        for stat in stats {
            self.gen_stat(cx, stat)?;
        }
        Ok(())
    }

    /// Lower one statement. Unreachable statements emit nothing.
    pub fn gen_stat<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, stmt: &'a Stmt) -> Result<()> {
        if !stmt.is_reachable() {
            return Ok(());
        }
        match &stmt.kind {
            StmtKind::Block(block) => {
                cx.enter_scope();
                self.gen_stats(cx, &block.statements)?;
                cx.exit_scope()
            }
            StmtKind::If(s) => self.gen_if(cx, s),
            StmtKind::While(s) => self.gen_while(cx, stmt, s),
            StmtKind::Do(s) => self.gen_do(cx, stmt, s),
            StmtKind::For(s) => self.gen_for(cx, stmt, s),
            StmtKind::Foreach(s) => self.gen_foreach(cx, stmt, s),
            StmtKind::Switch(s) => self.gen_switch(cx, stmt, s),
            StmtKind::Try(s) => self.gen_try(cx, stmt, s),
            StmtKind::Using(s) => {
                cx.enter_scope();
                self.gen_using(cx, stmt, s, 0)?;
                cx.exit_scope()
            }
            StmtKind::Synchronized(s) => self.gen_synchronized(cx, stmt, s),
            StmtKind::Labeled(s) => {
                let labels = cx.labels_for(stmt.id);
                cx.push_frame(stmt.id, FrameKind::Labeled);
                cx.code.mark(labels.begin)?;
                self.gen_stat(cx, &s.statement)?;
                cx.pop_frame();
                cx.code.mark(labels.end)
            }
            StmtKind::Break(_) => {
                let target = Self::jump_target(stmt)?;
                let label = cx.labels_for(target).end;
                self.gen_jump(cx, target, label)
            }
            StmtKind::Continue(_) => {
                let target = Self::jump_target(stmt)?;
                let label = cx.labels_for(target).continue_;
                self.gen_jump(cx, target, label)
            }
            StmtKind::Goto(_) => {
                let target = Self::jump_target(stmt)?;
                let label = cx.labels_for(target).begin;
                self.gen_jump(cx, target, label)
            }
            StmtKind::GotoCase(g) => self.gen_goto_case(cx, stmt, g),
            StmtKind::Return(r) => self.gen_return(cx, r),
            StmtKind::Throw(t) => match &t.exception {
                Some(e) => {
                    self.gen_expr(cx, e)?;
                    cx.code.emitop(Opcode::Athrow);
                    Ok(())
                }
                None => {
                    let slot = cx.current_catch_var().ok_or(Error::RethrowOutsideCatch { span: stmt.span })?;
                    cx.code.emit_load(ValueKind::Reference, slot);
                    cx.code.emitop(Opcode::Athrow);
                    Ok(())
                }
            },
            StmtKind::Yield(y) => self.gen_yield(cx, stmt, y),
            StmtKind::Expression(e) => self.gen_expr_stat(cx, e),
            StmtKind::Empty => Ok(()),
            StmtKind::LocalDecl(d) => {
                for (decl, init) in &d.declarators {
                    cx.declare_local(decl);
                    match init {
                        Some(init) => self.gen_expr(cx, init)?,
                        // a promoted slot is saved at every yield, so it must hold a value
                        None if cx.is_promoted(decl.id) => Self::emit_zero(cx, decl.ty.value_kind()),
                        None => continue,
                    }
                    cx.emit_store_local(decl.id, &decl.ty, stmt.span)?;
                }
                Ok(())
            }
        }
    }

    fn jump_target(stmt: &Stmt) -> Result<StmtId> {
        stmt.target().ok_or(Error::UnresolvedTarget { construct: stmt.kind_name(), span: stmt.span })
    }

    /// Run the cleanup of every frame between here and `target`, then jump
    fn gen_jump(&mut self, cx: &mut MethodGenerationContext<'_>, target: StmtId, label: Label) -> Result<()> {
        let passed = self.gen_exit_cleanup(cx, Some(target))?;
        cx.code.emit_goto(label);
        Self::resume_regions(cx, &passed)
    }

    fn gen_goto_case(&mut self, cx: &mut MethodGenerationContext<'_>, stmt: &Stmt, g: &GotoCaseStmt) -> Result<()> {
        use crate::codegen::method_context::CaseKey;

        let switch = Self::jump_target(stmt)?;
        let key = match &g.case {
            Some(case) => case
                .constant()
                .and_then(CaseKey::of)
                .ok_or(Error::NonConstantCaseLabel { span: case.span })?,
            None => CaseKey::Default,
        };
        let label = cx
            .switch_label(switch, &key)
            .ok_or_else(|| Error::MissingCaseLabel { key: key.to_string(), span: stmt.span })?;
        self.gen_jump(cx, switch, label)
    }

    fn gen_return(&mut self, cx: &mut MethodGenerationContext<'_>, r: &ReturnStmt) -> Result<()> {
        let kind = cx.return_type.value_kind();
        match &r.value {
            Some(value) if cx.has_pending_cleanup() => {
                self.gen_expr(cx, value)?;
                let ty = cx.return_type.clone();
                let tmp = cx.new_temp(&ty);
                cx.code.emit_store(kind, tmp);
                let passed = self.gen_exit_cleanup(cx, None)?;
                cx.code.emit_load(kind, tmp);
                cx.code.emit_return(kind);
                Self::resume_regions(cx, &passed)
            }
            Some(value) => {
                self.gen_expr(cx, value)?;
                cx.code.emit_return(kind);
                Ok(())
            }
            None => {
                let passed = self.gen_exit_cleanup(cx, None)?;
                cx.code.emit_return(ValueKind::Void);
                Self::resume_regions(cx, &passed)
            }
        }
    }

    // ----- conditionals and loops -----

    fn gen_if<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, s: &'a IfStmt) -> Result<()> {
        match s.condition.constant_bool() {
            Some(true) => return self.gen_stat(cx, &s.then_branch),
            Some(false) => {
                if let Some(else_branch) = &s.else_branch {
                    self.gen_stat(cx, else_branch)?;
                }
                return Ok(());
            }
            None => {}
        }

        let then_label = cx.new_label();
        let else_label = cx.new_label();
        self.gen_cond(cx, &s.condition, CondTargets::fall_true(then_label, else_label))?;
        cx.code.mark(then_label)?;
        self.gen_stat(cx, &s.then_branch)?;
        match &s.else_branch {
            Some(else_branch) => {
                let end = cx.new_label();
                let then_completes = s.then_branch.completes_normally();
                if then_completes {
                    cx.code.emit_goto(end);
                }
                cx.code.mark(else_label)?;
                self.gen_stat(cx, else_branch)?;
                if then_completes {
                    cx.code.mark(end)?;
                }
                Ok(())
            }
            None => cx.code.mark(else_label),
        }
    }

    fn gen_while<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, stmt: &'a Stmt, s: &'a WhileStmt) -> Result<()> {
        let constant = s.condition.constant_bool();
        if constant == Some(false) {
            return Ok(());
        }
        let labels = cx.labels_for(stmt.id);
        cx.push_frame(stmt.id, FrameKind::Loop);
        if constant.is_none() {
            cx.code.emit_goto(labels.continue_);
        }
        cx.code.mark(labels.begin)?;
        self.gen_stat(cx, &s.body)?;
        cx.code.mark(labels.continue_)?;
        match constant {
            Some(_) => cx.code.emit_goto(labels.begin),
            None => self.gen_cond(cx, &s.condition, CondTargets::fall_false(labels.begin, labels.end))?,
        }
        cx.pop_frame();
        cx.code.mark(labels.end)
    }

    fn gen_do<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, stmt: &'a Stmt, s: &'a DoStmt) -> Result<()> {
        let labels = cx.labels_for(stmt.id);
        cx.push_frame(stmt.id, FrameKind::Loop);
        cx.code.mark(labels.begin)?;
        self.gen_stat(cx, &s.body)?;
        cx.code.mark(labels.continue_)?;
        match s.condition.constant_bool() {
            Some(true) => cx.code.emit_goto(labels.begin),
            Some(false) => {}
            None => self.gen_cond(cx, &s.condition, CondTargets::fall_false(labels.begin, labels.end))?,
        }
        cx.pop_frame();
        cx.code.mark(labels.end)
    }

    fn gen_for<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, stmt: &'a Stmt, s: &'a ForStmt) -> Result<()> {
        cx.enter_scope();
        self.gen_stats(cx, &s.init)?;

        let condition = s.condition.as_ref().filter(|c| c.constant_bool() != Some(true));
        if condition.map_or(false, |c| c.constant_bool() == Some(false)) {
            return cx.exit_scope();
        }

        let labels = cx.labels_for(stmt.id);
        let test = cx.new_label();
        cx.push_frame(stmt.id, FrameKind::Loop);
        if condition.is_some() {
            cx.code.emit_goto(test);
        }
        cx.code.mark(labels.begin)?;
        self.gen_stat(cx, &s.body)?;
        cx.code.mark(labels.continue_)?;
        for update in &s.update {
            self.gen_expr_stat(cx, update)?;
        }
        match condition {
            Some(c) => {
                cx.code.mark(test)?;
                self.gen_cond(cx, c, CondTargets::fall_false(labels.begin, labels.end))?;
            }
            None => cx.code.emit_goto(labels.begin),
        }
        cx.pop_frame();
        cx.code.mark(labels.end)?;
        cx.exit_scope()
    }

    fn array_load_op(element: &TypeRef) -> Opcode {
        match element {
            TypeRef::Primitive(PrimitiveType::Boolean | PrimitiveType::Byte) => Opcode::Baload,
            TypeRef::Primitive(PrimitiveType::Char) => Opcode::Caload,
            TypeRef::Primitive(PrimitiveType::Short) => Opcode::Saload,
            other => match other.value_kind() {
                ValueKind::Int => Opcode::Iaload,
                ValueKind::Long => Opcode::Laload,
                ValueKind::Float => Opcode::Faload,
                ValueKind::Double => Opcode::Daload,
                _ => Opcode::Aaload,
            },
        }
    }

    /// Declare the loop variable for one iteration and store the element on the stack into it
    fn bind_element(cx: &mut MethodGenerationContext<'_>, decl: &LocalDecl, span: Span) -> Result<()> {
        cx.declare_local(decl);
        cx.emit_store_local(decl.id, &decl.ty, span)
    }

    fn gen_foreach<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, stmt: &'a Stmt, s: &'a ForeachStmt) -> Result<()> {
        let spans_yield = stmt.info.as_ref().map_or(false, |i| i.yield_count > 0);
        cx.enter_scope();
        let labels = cx.labels_for(stmt.id);

        match &s.source {
            ForeachSource::Array => {
                let array_ty = s.iterable.ty().clone();
                let element = array_ty
                    .element_type()
                    .cloned()
                    .ok_or_else(|| Error::internal(format!("foreach over non-array type {}", array_ty)))?;

                self.gen_expr(cx, &s.iterable)?;
                let array = cx.new_spill_temp(&array_ty, spans_yield);
                cx.code.emit_store(ValueKind::Reference, array);
                let index = cx.new_spill_temp(&TypeRef::int(), spans_yield);
                cx.code.emit_int(0);
                cx.code.emit_store(ValueKind::Int, index);

                let test = cx.new_label();
                cx.push_frame(stmt.id, FrameKind::Loop);
                cx.code.emit_goto(test);
                cx.code.mark(labels.begin)?;
                cx.enter_scope();
                cx.code.emit_load(ValueKind::Reference, array);
                cx.code.emit_load(ValueKind::Int, index);
                cx.code.emitop(Self::array_load_op(&element));
                Self::bind_element(cx, &s.variable, stmt.span)?;
                self.gen_stat(cx, &s.body)?;
                cx.exit_scope()?;
                cx.code.mark(labels.continue_)?;
                cx.code.emit_iinc(index, 1);
                cx.code.mark(test)?;
                cx.code.emit_load(ValueKind::Int, index);
                cx.code.emit_load(ValueKind::Reference, array);
                cx.code.emitop(Opcode::Arraylength);
                cx.code.emit_jump(Opcode::IfIcmplt, labels.begin);
                cx.pop_frame();
                cx.code.mark(labels.end)?;
            }
            ForeachSource::Iterable { iterator, has_next, next, dispose } => {
                if !s.variable.ty.is_reference() {
                    return Err(Error::unsupported(
                        format!("primitive loop variable `{}` over an iterable", s.variable.name),
                        stmt.span,
                    ));
                }
                self.gen_expr(cx, &s.iterable)?;
                cx.code.emit_invoke(iterator);
                let it = cx.new_spill_temp(&iterator.ret, spans_yield);
                cx.code.emit_store(ValueKind::Reference, it);

                let region = match dispose {
                    Some(d) => {
                        let region = cx.open_region()?;
                        cx.push_frame(stmt.id, FrameKind::Dispose { slot: it, dispose: d, region });
                        Some(region)
                    }
                    None => None,
                };

                cx.push_frame(stmt.id, FrameKind::Loop);
                cx.code.emit_goto(labels.continue_);
                cx.code.mark(labels.begin)?;
                cx.enter_scope();
                cx.code.emit_load(ValueKind::Reference, it);
                cx.code.emit_invoke(next);
                let erased = s.variable.ty.erasure();
                if erased != next.ret.erasure() {
                    cx.code.emit_checkcast(&erased);
                }
                Self::bind_element(cx, &s.variable, stmt.span)?;
                self.gen_stat(cx, &s.body)?;
                cx.exit_scope()?;
                cx.code.mark(labels.continue_)?;
                cx.code.emit_load(ValueKind::Reference, it);
                cx.code.emit_invoke(has_next);
                cx.code.emit_jump(Opcode::Ifne, labels.begin);
                cx.pop_frame();
                cx.code.mark(labels.end)?;

                if let (Some(d), Some(region)) = (dispose, region) {
                    cx.pop_frame();
                    let segments = cx.close_region(region)?;
                    let after = cx.new_label();
                    cx.code.emit_load(ValueKind::Reference, it);
                    cx.code.emit_invoke(d);
                    cx.code.emit_goto(after);
                    let handler = cx.code.entry_point()?;
                    for (start, end) in segments {
                        cx.code.add_region(start, end, handler, None);
                    }
                    self.gen_rethrow_after(cx, |_, cx| {
                        cx.code.emit_load(ValueKind::Reference, it);
                        cx.code.emit_invoke(d);
                        Ok(())
                    })?;
                    cx.code.mark(after)?;
                }
            }
        }
        cx.exit_scope()
    }

    /// Storage of a local that must be reloadable by slot (catch variables,
    /// using resources); captured locals get a shadow temporary
    pub(crate) fn store_into_slot(cx: &mut MethodGenerationContext<'_>, decl: &LocalDecl, span: Span) -> Result<u16> {
        match cx.declare_local(decl) {
            LocalAccess::Slot { slot, kind } => {
                cx.code.emit_store(kind, slot);
                Ok(slot)
            }
            LocalAccess::Captured { .. } => {
                cx.code.emitop(Opcode::Dup);
                let tmp = cx.new_temp(&decl.ty);
                cx.code.emit_store(ValueKind::Reference, tmp);
                cx.emit_store_local(decl.id, &decl.ty, span)?;
                Ok(tmp)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::code::Instruction;
    use crate::codegen::expr::StackExprGen;

    fn lower(body: Stmt, ret: TypeRef) -> crate::codegen::code::MethodBody {
        let mut body = body;
        info::annotate_body(&mut body);
        let mut exprs = StackExprGen::new();
        let mut class = ClassContext::new("Foo", Config::default());
        let mut gen = Gen::new(&mut exprs, &mut class);
        let mut cx = MethodGenerationContext::new("Foo", "run", true, ret, false);
        gen.gen_method_body(&mut cx, &body).unwrap();
        cx.code.finish().unwrap()
    }

    #[test]
    fn test_if_without_else_has_single_branch() {
        let x = LocalDecl::new(1, "x", TypeRef::boolean());
        let body = Stmt::block(vec![
            Stmt::local(x.clone(), Some(Expr::bool(false))),
            Stmt::if_(Expr::local(&x), Stmt::return_(None), None),
        ]);
        let code = lower(body, TypeRef::void());
        assert_eq!(code.count(Instruction::is_conditional_jump), 1);
        assert_eq!(code.count(|i| matches!(i, Instruction::Jump { op: Opcode::Goto, .. })), 0);
    }

    #[test]
    fn test_constant_false_while_emits_nothing() {
        let body = Stmt::block(vec![Stmt::while_(Expr::bool(false), Stmt::block(vec![]))]);
        let code = lower(body, TypeRef::void());
        assert_eq!(code.instructions, vec![Instruction::Op(Opcode::Return)]);
    }

    #[test]
    fn test_while_tests_at_bottom() {
        let x = LocalDecl::new(1, "x", TypeRef::boolean());
        let body = Stmt::block(vec![
            Stmt::local(x.clone(), None),
            Stmt::while_(Expr::local(&x), Stmt::block(vec![])),
        ]);
        let code = lower(body, TypeRef::void());
        // goto test; begin: ; test: iload x; ifne begin; return
        assert!(matches!(code.instructions[0], Instruction::Jump { op: Opcode::Goto, .. }));
        assert!(matches!(code.instructions[2], Instruction::Jump { op: Opcode::Ifne, .. }));
        assert_eq!(code.jump_offsets(2), vec![1]);
    }

    #[test]
    fn test_for_continue_lands_on_update() {
        let i = LocalDecl::new(1, "i", TypeRef::int());
        let inc = Expr::assign(&i, Expr::binary(BinaryOp::Add, Expr::local(&i), Expr::int(1), TypeRef::int()));
        let body = Stmt::block(vec![Stmt::for_(
            vec![Stmt::local(i.clone(), Some(Expr::int(0)))],
            Some(Expr::binary(BinaryOp::Lt, Expr::local(&i), Expr::int(10), TypeRef::boolean())),
            vec![inc],
            Stmt::block(vec![Stmt::continue_(None)]),
        )]);
        let code = lower(body, TypeRef::void());
        let gotos: Vec<usize> = (0..code.instructions.len())
            .filter(|&pc| matches!(code.instructions[pc], Instruction::Jump { op: Opcode::Goto, .. }))
            .collect();
        // the continue is the second goto; it targets the update (`iload i`), right after itself
        let cont = gotos[1];
        assert_eq!(code.jump_offsets(cont), vec![cont + 1]);
        assert!(matches!(code.instructions[cont + 1], Instruction::Load { kind: ValueKind::Int, slot: 0 }));
    }

    #[test]
    fn test_bare_throw_outside_catch_fails() {
        let mut body = Stmt::block(vec![Stmt::throw(None)]);
        info::annotate_body(&mut body);
        let mut exprs = StackExprGen::new();
        let mut class = ClassContext::new("Foo", Config::default());
        let mut gen = Gen::new(&mut exprs, &mut class);
        let mut cx = MethodGenerationContext::new("Foo", "run", true, TypeRef::void(), false);
        assert!(matches!(gen.gen_method_body(&mut cx, &body), Err(Error::RethrowOutsideCatch { .. })));
    }

    #[test]
    fn test_array_foreach_binds_continue_to_increment() {
        let arr = LocalDecl::new(1, "arr", TypeRef::array_of(TypeRef::int()));
        let v = LocalDecl::new(2, "v", TypeRef::int());
        let body = Stmt::block(vec![
            Stmt::local(arr.clone(), None),
            Stmt::foreach(v, Expr::local(&arr), ForeachSource::Array, Stmt::block(vec![Stmt::continue_(None)])),
        ]);
        let code = lower(body, TypeRef::void());
        let iinc = code
            .instructions
            .iter()
            .position(|i| matches!(i, Instruction::Iinc { delta: 1, .. }))
            .unwrap();
        let cont = iinc - 1;
        assert_eq!(code.jump_offsets(cont), vec![iinc]);
        assert!(code.instructions.contains(&Instruction::Op(Opcode::Iaload)));
    }
}
