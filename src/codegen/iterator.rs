//! Iterator methods compiled to explicit state machines.
//!
//! A method whose body yields is split in two. Its own body only creates a
//! state object (`<Outer>$Iterator$<n>`), copies `this` and the parameters
//! into it and returns it. The statements move into the state class's
//! `moveNext()`, which dispatches on `state` through a table of resume
//! points. Locals that must survive a suspension are promoted to fields:
//! they still live in slots while `moveNext` runs, are saved before every
//! `return true` and reloaded at every resume point.

use crate::ast::*;
use crate::codegen::class::{access_flags::*, ClassDef, FieldDef, MethodDef};
use crate::codegen::code::{Instruction, MethodBody};
use crate::codegen::gen::Gen;
use crate::codegen::lambda::{captured_by_lambdas, declared_locals};
use crate::codegen::method_context::{Holder, LocalAccess, MethodGenerationContext, YieldStates};
use crate::codegen::opcodes::Opcode;
use crate::consts;
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};

/// Locals of an iterator body that need a field in the state class
#[derive(Debug, Default, PartialEq)]
pub struct Promotion {
    /// Cached in slots, saved and reloaded around suspensions
    pub promoted: BTreeSet<LocalId>,
    /// Captured by lambdas; always accessed through the field
    pub resident: BTreeSet<LocalId>,
}

#[derive(Debug, Clone, Copy)]
struct FirstUse {
    epoch: u32,
    loop_depth: usize,
}

/// Walks the body in source order. `epoch` advances after every
/// `yield value`; `loops` records whether each enclosing loop yields.
struct Liveness<'p> {
    params: &'p BTreeSet<LocalId>,
    epoch: u32,
    loops: Vec<bool>,
    first: HashMap<LocalId, FirstUse>,
    used_params: BTreeSet<LocalId>,
    promoted: BTreeSet<LocalId>,
}

impl Liveness<'_> {
    fn touch(&mut self, id: LocalId) {
        if self.params.contains(&id) {
            self.used_params.insert(id);
            return;
        }
        let now = FirstUse { epoch: self.epoch, loop_depth: self.loops.len() };
        let first = *self.first.entry(id).or_insert(now);
        let crosses_yield = first.epoch != self.epoch;
        let loops_back = self.loops.get(first.loop_depth..).map_or(false, |l| l.iter().any(|&y| y));
        if crosses_yield || loops_back {
            self.promoted.insert(id);
        }
    }
}

impl Visitor for Liveness<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        let yields = stmt.info.as_ref().map_or(false, |i| i.yield_count > 0);
        match &stmt.kind {
            StmtKind::Yield(YieldStmt { value: Some(_) }) => {
                walk_stmt(self, stmt);
                self.epoch += 1;
            }
            _ if stmt.is_loop() => {
                self.loops.push(yields);
                walk_stmt(self, stmt);
                self.loops.pop();
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Local(id) | ExprKind::Assign { target: id, .. } => self.touch(*id),
            _ => {}
        }
        walk_expr(self, expr);
    }

    fn visit_lambda(&mut self, _lambda: &LambdaExpr) {}

    fn visit_local_decl(&mut self, decl: &LocalDecl) {
        self.touch(decl.id);
    }
}

/// Decide which locals of an iterator body become fields. A local is
/// promoted when it is used on both sides of a yield, or inside a yielding
/// loop it was declared outside of. Referenced parameters are always
/// promoted. Locals captured by lambdas stay resident in their field.
pub fn analyze_promotion(body: &Stmt, params: &[LocalDecl]) -> Promotion {
    let param_ids: BTreeSet<LocalId> = params.iter().map(|p| p.id).collect();
    let mut liveness = Liveness {
        params: &param_ids,
        epoch: 0,
        loops: Vec::new(),
        first: HashMap::new(),
        used_params: BTreeSet::new(),
        promoted: BTreeSet::new(),
    };
    liveness.visit_stmt(body);

    let resident = captured_by_lambdas(body);
    let promoted = liveness
        .promoted
        .union(&liveness.used_params)
        .filter(|id| !resident.contains(id))
        .copied()
        .collect();
    Promotion { promoted, resident }
}

fn unique_field_name(fields: &[FieldDef], decl: &LocalDecl) -> String {
    if fields.iter().any(|f| f.name == decl.name) {
        format!("{}${}", decl.name, decl.id.0)
    } else {
        decl.name.clone()
    }
}

impl<'g> Gen<'g> {
    /// Compile an iterator method. Returns the replacement body of the
    /// method itself; the state class goes to the class context.
    pub(crate) fn gen_iterator_method(&mut self, method: &MethodDecl, element: &TypeRef, body: &Stmt) -> Result<MethodBody> {
        let owner = self.class.name.clone();
        let iter_name = self.class.next_iterator_name();
        let is_static = method.is_static();
        let protocol = self.class.config.iterator_protocol;
        let iter_ty = TypeRef::class(&iter_name);
        log::debug!("iterator {}.{} -> {}", owner, method.name, iter_name);

        let mut fields = vec![
            FieldDef::new(consts::STATE_FIELD, TypeRef::int(), ACC_SYNTHETIC),
            FieldDef::new(consts::CURRENT_FIELD, element.erasure(), ACC_SYNTHETIC),
        ];
        if protocol {
            fields.push(FieldDef::new(consts::HAS_NEXT_FIELD, TypeRef::int(), ACC_SYNTHETIC));
        }
        let outer_field = if is_static || !uses_this(body) {
            None
        } else {
            let outer = TypeRef::class(&owner);
            fields.push(FieldDef::new(consts::OUTER_THIS_FIELD, outer.clone(), ACC_FINAL | ACC_SYNTHETIC));
            Some(FieldRef::new(&iter_name, consts::OUTER_THIS_FIELD, outer, false))
        };

        let promotion = analyze_promotion(body, &method.parameters);
        let mut decls = declared_locals(body);
        for p in &method.parameters {
            decls.insert(p.id, p.clone());
        }
        let mut local_fields: HashMap<LocalId, FieldRef> = HashMap::new();
        for id in promotion.promoted.iter().chain(&promotion.resident) {
            let decl = decls
                .get(id)
                .ok_or(Error::UnknownLocal { local: id.0, span: method.span })?;
            let name = unique_field_name(&fields, decl);
            let ty = decl.ty.erasure();
            fields.push(FieldDef::new(&name, ty.clone(), ACC_SYNTHETIC));
            local_fields.insert(*id, FieldRef::new(&iter_name, &name, ty, false));
        }
        log::debug!(
            "{}: {} promoted, {} lambda-resident locals",
            iter_name,
            promotion.promoted.len(),
            promotion.resident.len()
        );

        let (move_next, spill_fields) =
            self.gen_move_next(&iter_name, method, element, body, &promotion, &local_fields, outer_field.clone())?;
        fields.extend(spill_fields);

        let mut def = ClassDef::new(&iter_name, OBJECT, ACC_FINAL | ACC_SUPER | ACC_SYNTHETIC);
        def.fields = fields;
        def.methods.push(MethodDef::default_constructor()?);
        def.methods.push(move_next);
        if protocol {
            def.interfaces = vec![consts::ITERATOR.to_string(), consts::ITERABLE.to_string()];
            def.methods.push(Self::has_next_method(&iter_name)?);
            def.methods.push(Self::next_method(&iter_name, element)?);
            if let Some(bridge) = Self::next_bridge_method(&iter_name, element)? {
                def.methods.push(bridge);
            }
            def.methods.push(Self::iterator_method()?);
        }
        self.class.nested.push(def);

        // the method itself only builds the state object
        let mut cx = MethodGenerationContext::new(
            &owner,
            &method.name,
            is_static,
            method.return_type.clone(),
            self.class.config.var_debug_info,
        );
        cx.reserve_this();
        for p in &method.parameters {
            cx.declare_local(p);
        }
        let state = cx.new_temp(&iter_ty);
        cx.code.emit_new(&iter_name);
        cx.code.emitop(Opcode::Dup);
        cx.code.emit_invoke(&MethodRef::new(
            &iter_name,
            consts::CONSTRUCTOR_NAME,
            vec![],
            TypeRef::void(),
            InvokeKind::Special,
        ));
        cx.code.emit_store(ValueKind::Reference, state);
        if let Some(field) = &outer_field {
            cx.code.emit_load(ValueKind::Reference, state);
            cx.code.emit_load(ValueKind::Reference, 0);
            cx.code.emit_putfield(&field);
        }
        for p in &method.parameters {
            let Some(field) = local_fields.get(&p.id) else { continue };
            cx.code.emit_load(ValueKind::Reference, state);
            cx.emit_load_local(p.id, method.span)?;
            cx.code.emit_putfield(field);
        }
        cx.code.emit_load(ValueKind::Reference, state);
        cx.code.emit_return(ValueKind::Reference);
        cx.code.finish()
    }

    #[allow(clippy::too_many_arguments)]
    fn gen_move_next(
        &mut self,
        iter_name: &str,
        method: &MethodDecl,
        element: &TypeRef,
        body: &Stmt,
        promotion: &Promotion,
        local_fields: &HashMap<LocalId, FieldRef>,
        outer_field: Option<FieldRef>,
    ) -> Result<(MethodDef, Vec<FieldDef>)> {
        let mut cx = MethodGenerationContext::new(
            iter_name,
            &method.name,
            false,
            TypeRef::boolean(),
            self.class.config.var_debug_info,
        );
        cx.reserve_this();
        cx.set_this_path(outer_field.into_iter().collect());

        let k = info::count_yields(body) as usize;
        let resume: Vec<_> = (0..=k).map(|_| cx.new_label()).collect();
        let exhausted = cx.new_label();
        let mut states = YieldStates::new(iter_name, element, resume.clone(), exhausted);
        for id in &promotion.promoted {
            if let Some(field) = local_fields.get(id) {
                states.promoted.insert(*id, field.clone());
            }
        }
        cx.yields = Some(states);
        for id in &promotion.resident {
            if let Some(field) = local_fields.get(id) {
                cx.set_access(*id, LocalAccess::Captured { holder: Holder::This, path: vec![field.clone()] });
            }
        }

        cx.enter_scope();
        for p in &method.parameters {
            if local_fields.contains_key(&p.id) {
                cx.declare_local(p);
            }
        }

        let state_field = FieldRef::new(iter_name, consts::STATE_FIELD, TypeRef::int(), false);
        cx.code.emit_load(ValueKind::Reference, 0);
        cx.code.emit_getfield(&state_field);
        cx.code.emit(Instruction::TableSwitch { low: 0, high: k as i32, default: exhausted, targets: resume.clone() });
        cx.code.mark(resume[0])?;
        Self::reload_live(&mut cx)?;

        self.prepare_lambdas(&mut cx, body, &[])?;
        cx.set_parents(body);
        self.gen_stat(&mut cx, body)?;

        cx.code.mark(exhausted)?;
        Self::emit_finish_state(&mut cx, &state_field);
        cx.exit_scope()?;

        let spill_fields = cx.yields.take().map(|y| y.spill_fields).unwrap_or_default();
        let body = cx.code.finish()?;
        let def = MethodDef {
            name: consts::MOVE_NEXT_METHOD.to_string(),
            access_flags: ACC_PUBLIC,
            params: Vec::new(),
            return_type: TypeRef::boolean(),
            body: Some(body),
        };
        Ok((def, spill_fields))
    }

    /// `state = -1; return false`
    fn emit_finish_state(cx: &mut MethodGenerationContext<'_>, state: &FieldRef) {
        cx.code.emit_load(ValueKind::Reference, 0);
        cx.code.emit_int(-1);
        cx.code.emit_putfield(state);
        cx.code.emitop(Opcode::Iconst0);
        cx.code.emit_return(ValueKind::Int);
    }

    fn save_live(cx: &mut MethodGenerationContext<'_>) -> Result<()> {
        let live = cx.yields.as_ref().map(|y| y.live.clone()).unwrap_or_default();
        for p in live {
            cx.code.emit_load(ValueKind::Reference, 0);
            cx.code.emit_load(p.kind, p.slot);
            cx.code.emit_putfield(&p.field);
        }
        Ok(())
    }

    fn reload_live(cx: &mut MethodGenerationContext<'_>) -> Result<()> {
        let live = cx.yields.as_ref().map(|y| y.live.clone()).unwrap_or_default();
        for p in live {
            cx.code.emit_load(ValueKind::Reference, 0);
            cx.code.emit_getfield(&p.field);
            cx.code.emit_store(p.kind, p.slot);
        }
        Ok(())
    }

    /// Push the zero value of `kind`
    pub(crate) fn emit_zero(cx: &mut MethodGenerationContext<'_>, kind: ValueKind) {
        match kind {
            ValueKind::Long => cx.code.emit_const(ConstValue::Long(0)),
            ValueKind::Float => cx.code.emit_const(ConstValue::Float(0.0)),
            ValueKind::Double => cx.code.emit_const(ConstValue::Double(0.0)),
            ValueKind::Reference => cx.code.emitop(Opcode::AconstNull),
            ValueKind::Int | ValueKind::Void => cx.code.emitop(Opcode::Iconst0),
        }
    }

    pub(crate) fn gen_yield(&mut self, cx: &mut MethodGenerationContext<'_>, stmt: &Stmt, y: &YieldStmt) -> Result<()> {
        let Some(states) = cx.yields.as_ref() else {
            return Err(Error::YieldOutsideIterator { span: stmt.span });
        };
        let state_field = states.state.clone();
        let current = states.current.clone();

        let Some(value) = &y.value else {
            if cx.in_finally() {
                return Err(Error::YieldInsideRegion { region: "finally", span: stmt.span });
            }
            let passed = self.gen_exit_cleanup(cx, None)?;
            Self::emit_finish_state(cx, &state_field);
            return Self::resume_regions(cx, &passed);
        };

        if cx.in_synchronized() {
            return Err(Error::YieldInsideRegion { region: "synchronized", span: stmt.span });
        }
        if cx.current_catch_var().is_some() {
            return Err(Error::YieldInsideRegion { region: "catch", span: stmt.span });
        }
        if cx.in_finally() {
            return Err(Error::YieldInsideRegion { region: "finally", span: stmt.span });
        }
        let (state, resume) = cx
            .next_yield_state()
            .ok_or_else(|| Error::internal(format!("more yields than counted at {}", stmt.span)))?;
        log::trace!("yield state {} at {}", state, stmt.span);

        cx.code.emit_load(ValueKind::Reference, 0);
        self.gen_expr(cx, value)?;
        cx.code.emit_putfield(&current);
        cx.code.emit_load(ValueKind::Reference, 0);
        cx.code.emit_int(state);
        cx.code.emit_putfield(&state_field);
        Self::save_live(cx)?;
        cx.code.emitop(Opcode::Iconst1);
        cx.code.emit_return(ValueKind::Int);

        cx.code.mark(resume)?;
        Self::reload_live(cx)
    }

    /// `hasNext()`: run `moveNext` once per element and cache the answer.
    ///
    /// The cache is an int rather than a boolean because it has three states
    /// (0 unknown, 1 ready, -1 done). Repeated `hasNext()` calls never advance
    /// the body twice, and an exhausted iterator stays exhausted.
    fn has_next_method(iter_name: &str) -> Result<MethodDef> {
        let has_next = FieldRef::new(iter_name, consts::HAS_NEXT_FIELD, TypeRef::int(), false);
        let move_next = MethodRef::new(iter_name, consts::MOVE_NEXT_METHOD, vec![], TypeRef::boolean(), InvokeKind::Virtual);
        let mut cx = MethodGenerationContext::new(iter_name, "hasNext", false, TypeRef::boolean(), false);
        cx.reserve_this();
        let known = cx.new_label();
        let done = cx.new_label();
        let store = cx.new_label();
        let no = cx.new_label();

        cx.code.emit_load(ValueKind::Reference, 0);
        cx.code.emit_getfield(&has_next);
        cx.code.emit_jump(Opcode::Ifne, known);
        cx.code.emit_load(ValueKind::Reference, 0);
        cx.code.emit_load(ValueKind::Reference, 0);
        cx.code.emit_invoke(&move_next);
        cx.code.emit_jump(Opcode::Ifeq, done);
        cx.code.emitop(Opcode::Iconst1);
        cx.code.emit_goto(store);
        cx.code.mark(done)?;
        cx.code.emit_int(-1);
        cx.code.mark(store)?;
        cx.code.emit_putfield(&has_next);
        cx.code.mark(known)?;
        cx.code.emit_load(ValueKind::Reference, 0);
        cx.code.emit_getfield(&has_next);
        cx.code.emit_jump(Opcode::Ifle, no);
        cx.code.emitop(Opcode::Iconst1);
        cx.code.emit_return(ValueKind::Int);
        cx.code.mark(no)?;
        cx.code.emitop(Opcode::Iconst0);
        cx.code.emit_return(ValueKind::Int);

        Ok(MethodDef {
            name: "hasNext".to_string(),
            access_flags: ACC_PUBLIC,
            params: Vec::new(),
            return_type: TypeRef::boolean(),
            body: Some(cx.code.finish()?),
        })
    }

    /// `next()`: the current element, or `NoSuchElementException` when exhausted
    fn next_method(iter_name: &str, element: &TypeRef) -> Result<MethodDef> {
        let ty = element.erasure();
        let has_next = FieldRef::new(iter_name, consts::HAS_NEXT_FIELD, TypeRef::int(), false);
        let current = FieldRef::new(iter_name, consts::CURRENT_FIELD, ty.clone(), false);
        let has_next_call = MethodRef::new(iter_name, "hasNext", vec![], TypeRef::boolean(), InvokeKind::Virtual);
        let mut cx = MethodGenerationContext::new(iter_name, "next", false, ty.clone(), false);
        cx.reserve_this();
        let ready = cx.new_label();

        cx.code.emit_load(ValueKind::Reference, 0);
        cx.code.emit_invoke(&has_next_call);
        cx.code.emit_jump(Opcode::Ifne, ready);
        cx.code.emit_new(consts::NO_SUCH_ELEMENT);
        cx.code.emitop(Opcode::Dup);
        cx.code.emit_invoke(&consts::NO_SUCH_ELEMENT_INIT);
        cx.code.emitop(Opcode::Athrow);
        cx.code.mark(ready)?;
        cx.code.emit_load(ValueKind::Reference, 0);
        cx.code.emitop(Opcode::Iconst0);
        cx.code.emit_putfield(&has_next);
        cx.code.emit_load(ValueKind::Reference, 0);
        cx.code.emit_getfield(&current);
        cx.code.emit_return(ty.value_kind());

        Ok(MethodDef {
            name: "next".to_string(),
            access_flags: ACC_PUBLIC,
            params: Vec::new(),
            return_type: ty,
            body: Some(cx.code.finish()?),
        })
    }

    /// `next()Ljava/lang/Object;` implementing `Iterator.next`, forwarding to
    /// the typed `next` and boxing primitive elements. `None` when the typed
    /// `next` already returns `Object`.
    fn next_bridge_method(iter_name: &str, element: &TypeRef) -> Result<Option<MethodDef>> {
        let ty = element.erasure();
        if ty == TypeRef::object() {
            return Ok(None);
        }
        let mut code = crate::codegen::code::Code::new(false);
        let this = code.new_temp(&TypeRef::class(iter_name));
        code.emit_load(ValueKind::Reference, this);
        code.emit_invoke(&MethodRef::new(iter_name, "next", vec![], ty.clone(), InvokeKind::Virtual));
        if let TypeRef::Primitive(prim) = &ty {
            let boxing = consts::box_method(*prim)
                .ok_or_else(|| Error::internal(format!("{} yields no value", iter_name)))?;
            code.emit_invoke(&boxing);
        }
        code.emit_return(ValueKind::Reference);
        log::trace!("{}: next bridge for {}", iter_name, ty);

        Ok(Some(MethodDef {
            name: "next".to_string(),
            access_flags: ACC_PUBLIC | ACC_BRIDGE | ACC_SYNTHETIC,
            params: Vec::new(),
            return_type: TypeRef::object(),
            body: Some(code.finish()?),
        }))
    }

    fn iterator_method() -> Result<MethodDef> {
        let mut code = crate::codegen::code::Code::new(false);
        let this = code.new_temp(&TypeRef::object());
        code.emit_load(ValueKind::Reference, this);
        code.emit_return(ValueKind::Reference);
        Ok(MethodDef {
            name: "iterator".to_string(),
            access_flags: ACC_PUBLIC,
            params: Vec::new(),
            return_type: TypeRef::class(consts::ITERATOR),
            body: Some(code.finish()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::expr::StackExprGen;
    use crate::codegen::gen::ClassContext;
    use crate::config::Config;

    fn sink() -> MethodRef {
        MethodRef::new("Foo", "use", vec![TypeRef::int()], TypeRef::void(), InvokeKind::Static)
    }

    fn iterator_decl(params: Vec<LocalDecl>, body: Vec<Stmt>) -> MethodDecl {
        let mut m = MethodDecl::new("items", params, TypeRef::class(consts::ITERATOR), Some(Stmt::block(body)));
        m.iterator_element = Some(TypeRef::int());
        info::annotate_method(&mut m);
        m
    }

    fn compile(m: &MethodDecl) -> Result<(MethodBody, ClassContext)> {
        let mut exprs = StackExprGen::new();
        let mut class = ClassContext::new("Foo", Config::default());
        let body = {
            let mut gen = Gen::new(&mut exprs, &mut class);
            let element = m.iterator_element.clone().unwrap_or_else(TypeRef::object);
            gen.gen_iterator_method(m, &element, m.body.as_ref().unwrap())?
        };
        Ok((body, class))
    }

    fn move_next(class: &ClassContext) -> &MethodBody {
        class.nested[0].method("moveNext").unwrap().body.as_ref().unwrap()
    }

    #[test]
    fn test_three_yields_make_four_states() {
        let m = iterator_decl(
            vec![],
            vec![
                Stmt::yield_(Some(Expr::int(10))),
                Stmt::yield_(Some(Expr::int(20))),
                Stmt::yield_(Some(Expr::int(30))),
            ],
        );
        let (_, class) = compile(&m).unwrap();
        let code = move_next(&class);
        let Instruction::TableSwitch { low, high, targets, .. } = &code.instructions[2] else {
            panic!("dispatch expected, got {:?}", code.instructions[2]);
        };
        assert_eq!((*low, *high, targets.len()), (0, 3, 4));

        // states stored in source order
        let states: Vec<i32> = code
            .instructions
            .windows(2)
            .filter_map(|w| match (&w[0], &w[1]) {
                (Instruction::Const(ConstValue::Int(n)), Instruction::PutField(f)) if f.name == "state" => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![1, 2, 3, -1]);
    }

    #[test]
    fn test_replacement_body_builds_state_object() {
        let n = LocalDecl::new(1, "n", TypeRef::int());
        let tick = MethodRef::new("Foo", "tick", vec![], TypeRef::void(), InvokeKind::Virtual);
        let m = iterator_decl(
            vec![n.clone()],
            vec![Stmt::expr(Expr::call(Some(Expr::this("Foo")), tick, vec![])), Stmt::yield_(Some(Expr::local(&n)))],
        );
        let (body, class) = compile(&m).unwrap();
        let iter = &class.nested[0];
        assert_eq!(iter.name, "Foo$Iterator$0");
        assert!(iter.field("this$0").is_some());
        assert!(iter.field("n").is_some());
        assert!(iter.interfaces.contains(&consts::ITERATOR.to_string()));
        for name in ["<init>", "moveNext", "hasNext", "next", "iterator"] {
            assert!(iter.method(name).is_some(), "missing {}", name);
        }
        assert_eq!(body.instructions[0], Instruction::New("Foo$Iterator$0".to_string()));
        assert_eq!(
            body.count(|i| matches!(i, Instruction::PutField(f) if f.name == "this$0" || f.name == "n")),
            2
        );
        assert_eq!(body.instructions.last(), Some(&Instruction::Op(Opcode::Areturn)));
    }

    #[test]
    fn test_object_next_boxes_primitive_element() {
        let m = iterator_decl(vec![], vec![Stmt::yield_(Some(Expr::int(7)))]);
        let (_, class) = compile(&m).unwrap();
        let iter = &class.nested[0];
        let nexts: Vec<&MethodDef> = iter.methods.iter().filter(|m| m.name == "next").collect();
        assert_eq!(nexts.len(), 2);
        assert_eq!(nexts[0].descriptor(), "()I");
        assert!(!nexts[0].is_bridge());

        let bridge = nexts[1];
        assert_eq!(bridge.descriptor(), "()Ljava/lang/Object;");
        assert_eq!(bridge.access_flags, ACC_PUBLIC | ACC_BRIDGE | ACC_SYNTHETIC);
        let code = bridge.body.as_ref().unwrap();
        assert!(matches!(&code.instructions[1], Instruction::Invoke(m) if m.name == "next" && m.descriptor() == "()I"));
        assert_eq!(code.instructions[2], Instruction::Invoke(consts::INTEGER_VALUE_OF.clone()));
        assert_eq!(code.instructions.last(), Some(&Instruction::Op(Opcode::Areturn)));
    }

    #[test]
    fn test_local_across_yield_is_promoted() {
        let a = LocalDecl::new(1, "a", TypeRef::int());
        let b = LocalDecl::new(2, "b", TypeRef::int());
        let body = Stmt::block(vec![
            Stmt::local(a.clone(), Some(Expr::int(1))),
            Stmt::local(b.clone(), Some(Expr::int(2))),
            Stmt::expr(Expr::call(None, sink(), vec![Expr::local(&b)])),
            Stmt::yield_(Some(Expr::int(0))),
            Stmt::expr(Expr::call(None, sink(), vec![Expr::local(&a)])),
        ]);
        let promotion = analyze_promotion(&body, &[]);
        assert!(promotion.promoted.contains(&a.id));
        assert!(!promotion.promoted.contains(&b.id));
    }

    #[test]
    fn test_local_used_in_yielding_loop_is_promoted() {
        let i = LocalDecl::new(1, "i", TypeRef::int());
        let mut body = Stmt::block(vec![
            Stmt::local(i.clone(), Some(Expr::int(0))),
            Stmt::while_(
                Expr::bool(true),
                Stmt::block(vec![
                    Stmt::expr(Expr::call(None, sink(), vec![Expr::local(&i)])),
                    Stmt::yield_(Some(Expr::int(1))),
                ]),
            ),
        ]);
        info::annotate_body(&mut body);
        assert!(analyze_promotion(&body, &[]).promoted.contains(&i.id));
    }

    #[test]
    fn test_promoted_local_saved_and_reloaded() {
        let a = LocalDecl::new(1, "a", TypeRef::int());
        let m = iterator_decl(
            vec![],
            vec![
                Stmt::local(a.clone(), Some(Expr::int(5))),
                Stmt::yield_(Some(Expr::int(0))),
                Stmt::yield_(Some(Expr::local(&a))),
            ],
        );
        let (_, class) = compile(&m).unwrap();
        let code = move_next(&class);
        let saves = code.count(|i| matches!(i, Instruction::PutField(f) if f.name == "a"));
        let reloads = code.count(|i| matches!(i, Instruction::GetField(f) if f.name == "a"));
        // saved at both yields, reloaded at both resume points
        assert_eq!((saves, reloads), (2, 2));
    }

    #[test]
    fn test_yield_inside_synchronized_fails() {
        let m = iterator_decl(
            vec![],
            vec![Stmt::synchronized(Expr::this("Foo"), Stmt::block(vec![Stmt::yield_(Some(Expr::int(1)))]))],
        );
        assert!(matches!(
            compile(&m),
            Err(Error::YieldInsideRegion { region: "synchronized", .. })
        ));
    }

    #[test]
    fn test_yield_break_runs_finally() {
        let fin = MethodRef::new("Foo", "fin", vec![], TypeRef::void(), InvokeKind::Static);
        let m = iterator_decl(
            vec![],
            vec![Stmt::try_(
                Stmt::block(vec![Stmt::yield_(Some(Expr::int(1))), Stmt::yield_(None)]),
                vec![],
                Some(Stmt::block(vec![Stmt::expr(Expr::call(None, fin, vec![]))])),
            )],
        );
        let (_, class) = compile(&m).unwrap();
        let code = move_next(&class);
        let calls = code.count(|i| matches!(i, Instruction::Invoke(m) if m.name == "fin"));
        // yield break and the exceptional handler
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_yield_outside_iterator_fails() {
        let mut body = Stmt::block(vec![Stmt::yield_(Some(Expr::int(1)))]);
        info::annotate_body(&mut body);
        let mut exprs = StackExprGen::new();
        let mut class = ClassContext::new("Foo", Config::default());
        let mut gen = Gen::new(&mut exprs, &mut class);
        let mut cx = MethodGenerationContext::new("Foo", "run", true, TypeRef::void(), false);
        assert!(matches!(
            gen.gen_method_body(&mut cx, &body),
            Err(Error::YieldOutsideIterator { .. })
        ));
    }
}
