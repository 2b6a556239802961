//! Method-level generation state.
//!
//! One `MethodGenerationContext` exists per method being compiled. It owns
//! the instruction sink and every stack the statement lowering threads
//! through its recursion: enclosing constructs, bound catch variables,
//! switch label maps and the per-emission label table. Nested compilation
//! (lambda bodies, `moveNext`) gets a context of its own.

use crate::ast::*;
use crate::codegen::class::{access_flags, FieldDef};
use crate::codegen::code::Code;
use crate::codegen::label::{Label, LabelTable, StatementLabels};
use crate::codegen::opcodes::Opcode;
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};

/// An enclosing construct the lowering is currently inside
#[derive(Debug, Clone, Copy)]
pub enum FrameKind<'a> {
    Loop,
    Switch,
    Labeled,
    /// Try block or catch body of a try with a finally clause
    TryFinally { finally: &'a Stmt, region: usize },
    Synchronized { lock_slot: u16, region: usize },
    Using { slot: u16, dispose: &'a MethodRef, region: usize },
    /// Foreach over an iterator with a disposal contract
    Dispose { slot: u16, dispose: &'a MethodRef, region: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub stmt: StmtId,
    pub kind: FrameKind<'a>,
}

impl Frame<'_> {
    /// Leaving this frame early requires emitted cleanup code
    pub fn needs_cleanup(&self) -> bool {
        self.region().is_some()
    }

    /// Protected region this frame's handler covers
    pub fn region(&self) -> Option<usize> {
        match self.kind {
            FrameKind::Loop | FrameKind::Switch | FrameKind::Labeled => None,
            FrameKind::TryFinally { region, .. }
            | FrameKind::Synchronized { region, .. }
            | FrameKind::Using { region, .. }
            | FrameKind::Dispose { region, .. } => Some(region),
        }
    }
}

/// A protected range being built. Cleanup code inlined for an early exit
/// is cut out of the range, so a region may end up with several segments.
#[derive(Debug, Default)]
struct OpenRegion {
    segments: Vec<(Label, Label)>,
    open: Option<Label>,
}

/// Key of a switch label map
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaseKey {
    Int(i32),
    Str(String),
    Default,
}

impl CaseKey {
    pub fn of(value: &ConstValue) -> Option<CaseKey> {
        match value {
            ConstValue::String(s) => Some(CaseKey::Str(s.clone())),
            other => other.as_switch_key().map(CaseKey::Int),
        }
    }
}

impl std::fmt::Display for CaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseKey::Int(v) => write!(f, "{}", v),
            CaseKey::Str(s) => write!(f, "{:?}", s),
            CaseKey::Default => write!(f, "default"),
        }
    }
}

/// Where a local variable lives
#[derive(Debug, Clone, PartialEq)]
pub enum LocalAccess {
    Slot { slot: u16, kind: ValueKind },
    /// Stored in a field reached from `holder` through `path`
    Captured { holder: Holder, path: Vec<FieldRef> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holder {
    /// The method's own receiver
    This,
    /// An object held in a local slot (a closure scope instance)
    Slot(u16),
}

/// Compiled form of a lambda, looked up when the lambda expression is emitted
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaTarget {
    pub method: MethodRef,
    /// Slot holding the scope instance the method is invoked on;
    /// `None` for lambdas compiled as static methods
    pub receiver: Option<u16>,
}

/// A promoted local or temporary cached in a slot across a suspension
#[derive(Debug, Clone)]
pub struct PromotedSlot {
    pub slot: u16,
    pub kind: ValueKind,
    pub field: FieldRef,
}

/// Yield bookkeeping for a `moveNext` body
#[derive(Debug)]
pub struct YieldStates {
    pub state: FieldRef,
    pub current: FieldRef,
    /// Resume labels; index 0 is the start state
    pub resume: Vec<Label>,
    pub exhausted: Label,
    /// Promoted locals in yield order of declaration, that are currently live
    pub live: Vec<PromotedSlot>,
    scope_marks: Vec<usize>,
    /// Promotion decisions, by local
    pub promoted: HashMap<LocalId, FieldRef>,
    /// Fields added to the state class while compiling
    pub spill_fields: Vec<FieldDef>,
    pub class_name: String,
}

impl YieldStates {
    pub fn new(class_name: &str, element: &TypeRef, resume: Vec<Label>, exhausted: Label) -> Self {
        Self {
            state: FieldRef::new(class_name, crate::consts::STATE_FIELD, TypeRef::int(), false),
            current: FieldRef::new(class_name, crate::consts::CURRENT_FIELD, element.erasure(), false),
            resume,
            exhausted,
            live: Vec::new(),
            scope_marks: Vec::new(),
            promoted: HashMap::new(),
            spill_fields: Vec::new(),
            class_name: class_name.to_string(),
        }
    }
}

pub struct MethodGenerationContext<'a> {
    pub code: Code,
    pub class_name: String,
    pub method_name: String,
    pub is_static: bool,
    pub return_type: TypeRef,
    frames: Vec<Frame<'a>>,
    catch_vars: Vec<u16>,
    switch_maps: Vec<(StmtId, HashMap<CaseKey, Label>)>,
    labels: LabelTable,
    locals: HashMap<LocalId, LocalAccess>,
    /// Field path from the receiver to the source-level `this`
    this_path: Vec<FieldRef>,
    parents: HashMap<StmtId, StmtId>,
    lambdas: HashMap<LambdaId, LambdaTarget>,
    pub yields: Option<YieldStates>,
    finally_depth: u32,
    next_yield: usize,
    regions: Vec<OpenRegion>,
}

impl<'a> MethodGenerationContext<'a> {
    pub fn new(class_name: &str, method_name: &str, is_static: bool, return_type: TypeRef, var_debug_info: bool) -> Self {
        Self {
            code: Code::new(var_debug_info),
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            is_static,
            return_type,
            frames: Vec::new(),
            catch_vars: Vec::new(),
            switch_maps: Vec::new(),
            labels: LabelTable::new(),
            locals: HashMap::new(),
            this_path: Vec::new(),
            parents: HashMap::new(),
            lambdas: HashMap::new(),
            yields: None,
            finally_depth: 0,
            next_yield: 0,
            regions: Vec::new(),
        }
    }

    /// Reserve slot 0 for the receiver of an instance method
    pub fn reserve_this(&mut self) {
        if !self.is_static {
            self.code.new_local("this", &TypeRef::class(&self.class_name));
        }
    }

    // ----- enclosing constructs -----

    pub fn push_frame(&mut self, stmt: StmtId, kind: FrameKind<'a>) {
        self.frames.push(Frame { stmt, kind });
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn frames(&self) -> &[Frame<'a>] {
        &self.frames
    }

    /// Detach the frames from `depth` up, for emitting code that runs
    /// outside them (cleanup of those very frames)
    pub fn take_frames_from(&mut self, depth: usize) -> Vec<Frame<'a>> {
        self.frames.split_off(depth)
    }

    pub fn restore_frames(&mut self, frames: Vec<Frame<'a>>) {
        self.frames.extend(frames);
    }

    pub fn has_pending_cleanup(&self) -> bool {
        self.frames.iter().any(Frame::needs_cleanup)
    }

    pub fn in_synchronized(&self) -> bool {
        self.frames.iter().any(|f| matches!(f.kind, FrameKind::Synchronized { .. }))
    }

    // ----- protected regions -----

    /// Start a protected range here
    pub fn open_region(&mut self) -> Result<usize> {
        let start = self.code.entry_point()?;
        self.regions.push(OpenRegion { segments: Vec::new(), open: Some(start) });
        Ok(self.regions.len() - 1)
    }

    fn region_mut(&mut self, region: usize) -> Result<&mut OpenRegion> {
        self.regions
            .get_mut(region)
            .ok_or_else(|| Error::internal(format!("unknown protected region {}", region)))
    }

    /// Cut the range here; code up to `resume_region` is unprotected
    pub fn suspend_region(&mut self, region: usize) -> Result<()> {
        let end = self.code.entry_point()?;
        let r = self.region_mut(region)?;
        if let Some(start) = r.open.take() {
            r.segments.push((start, end));
        }
        Ok(())
    }

    pub fn resume_region(&mut self, region: usize) -> Result<()> {
        let start = self.code.entry_point()?;
        let r = self.region_mut(region)?;
        if r.open.is_none() {
            r.open = Some(start);
        }
        Ok(())
    }

    /// End the range here and return its segments
    pub fn close_region(&mut self, region: usize) -> Result<Vec<(Label, Label)>> {
        self.suspend_region(region)?;
        Ok(std::mem::take(&mut self.region_mut(region)?.segments))
    }

    // ----- catch variables -----

    pub fn push_catch_var(&mut self, slot: u16) {
        self.catch_vars.push(slot);
    }

    pub fn pop_catch_var(&mut self) {
        self.catch_vars.pop();
    }

    /// Slot of the innermost bound catch variable
    pub fn current_catch_var(&self) -> Option<u16> {
        self.catch_vars.last().copied()
    }

    // ----- finally bodies -----

    pub fn enter_finally(&mut self) {
        self.finally_depth += 1;
    }

    pub fn exit_finally(&mut self) {
        self.finally_depth = self.finally_depth.saturating_sub(1);
    }

    pub fn in_finally(&self) -> bool {
        self.finally_depth > 0
    }

    // ----- switch label maps -----

    pub fn push_switch_map(&mut self, switch: StmtId, map: HashMap<CaseKey, Label>) {
        self.switch_maps.push((switch, map));
    }

    pub fn pop_switch_map(&mut self) {
        self.switch_maps.pop();
    }

    pub fn switch_label(&self, switch: StmtId, key: &CaseKey) -> Option<Label> {
        self.switch_maps
            .iter()
            .rev()
            .find(|(id, _)| *id == switch)
            .and_then(|(_, map)| map.get(key).copied())
    }

    // ----- labels -----

    pub fn new_label(&mut self) -> Label {
        self.code.new_label()
    }

    /// Labels of a loop, switch or labeled statement in the current emission
    pub fn labels_for(&mut self, stmt: StmtId) -> StatementLabels {
        let code = &mut self.code;
        self.labels.get_or_alloc(stmt, || code.new_label())
    }

    /// Re-emit the statements of `subtree` with fresh labels
    pub fn push_label_layer(&mut self, subtree: &Stmt) {
        self.labels.push_layer(collect_stmt_ids(subtree));
    }

    pub fn pop_label_layer(&mut self) {
        self.labels.pop_layer();
    }

    // ----- statement ancestry -----

    pub fn set_parents(&mut self, body: &Stmt) {
        fn walk(stmt: &Stmt, parents: &mut HashMap<StmtId, StmtId>) {
            for child in stmt.children() {
                parents.insert(child.id, stmt.id);
                walk(child, parents);
            }
        }
        self.parents.clear();
        walk(body, &mut self.parents);
    }

    /// `stmt` and all statements enclosing it
    pub fn ancestors_inclusive(&self, stmt: StmtId) -> HashSet<StmtId> {
        let mut out = HashSet::new();
        let mut cur = Some(stmt);
        while let Some(id) = cur {
            if !out.insert(id) {
                break;
            }
            cur = self.parents.get(&id).copied();
        }
        out
    }

    // ----- scopes -----

    pub fn enter_scope(&mut self) {
        self.code.enter_scope();
        if let Some(y) = self.yields.as_mut() {
            y.scope_marks.push(y.live.len());
        }
    }

    pub fn exit_scope(&mut self) -> Result<()> {
        self.code.end_scopes()?;
        if let Some(y) = self.yields.as_mut() {
            let mark = y.scope_marks.pop().ok_or(Error::ScopeUnderflow)?;
            y.live.truncate(mark);
        }
        Ok(())
    }

    pub fn new_temp(&mut self, ty: &TypeRef) -> u16 {
        self.code.new_temp(ty)
    }

    /// A temporary that must survive suspension when `spans_yield`
    /// (foreach iterators and indices, using resources in `moveNext`)
    pub fn new_spill_temp(&mut self, ty: &TypeRef, spans_yield: bool) -> u16 {
        let slot = self.code.new_temp(ty);
        if let (true, Some(y)) = (spans_yield, self.yields.as_mut()) {
            let name = format!("$tmp${}", y.spill_fields.len());
            let field = FieldRef::new(&y.class_name, &name, ty.erasure(), false);
            y.spill_fields.push(FieldDef::new(&name, ty.erasure(), access_flags::ACC_PRIVATE | access_flags::ACC_SYNTHETIC));
            y.live.push(PromotedSlot { slot, kind: ty.value_kind(), field });
        }
        slot
    }

    // ----- locals -----

    pub fn set_access(&mut self, local: LocalId, access: LocalAccess) {
        self.locals.insert(local, access);
    }

    pub fn local_access(&self, local: LocalId, span: Span) -> Result<&LocalAccess> {
        self.locals.get(&local).ok_or(Error::UnknownLocal { local: local.0, span })
    }

    /// Cached in a slot but saved to a state field around yields
    pub fn is_promoted(&self, local: LocalId) -> bool {
        self.yields.as_ref().map_or(false, |y| y.promoted.contains_key(&local))
    }

    /// Give a declared local its storage. Locals already mapped to a
    /// captured field keep it; everything else gets a slot in the current
    /// scope (and joins the live promoted set when promoted).
    pub fn declare_local(&mut self, decl: &LocalDecl) -> LocalAccess {
        if let Some(access @ LocalAccess::Captured { .. }) = self.locals.get(&decl.id) {
            return access.clone();
        }
        let slot = self.code.new_local(&decl.name, &decl.ty);
        let access = LocalAccess::Slot { slot, kind: decl.ty.value_kind() };
        if let Some(y) = self.yields.as_mut() {
            if let Some(field) = y.promoted.get(&decl.id) {
                y.live.push(PromotedSlot { slot, kind: decl.ty.value_kind(), field: field.clone() });
            }
        }
        self.locals.insert(decl.id, access.clone());
        access
    }

    fn emit_load_holder(&mut self, holder: Holder, path: &[FieldRef]) {
        match holder {
            Holder::This => self.code.emit_load(ValueKind::Reference, 0),
            Holder::Slot(slot) => self.code.emit_load(ValueKind::Reference, slot),
        }
        for field in path {
            self.code.emit_getfield(field);
        }
    }

    /// Push the value of a local
    pub fn emit_load_local(&mut self, local: LocalId, span: Span) -> Result<()> {
        match self.local_access(local, span)?.clone() {
            LocalAccess::Slot { slot, kind } => self.code.emit_load(kind, slot),
            LocalAccess::Captured { holder, path } => self.emit_load_holder(holder, &path),
        }
        Ok(())
    }

    /// Store the value on top of the stack into a local
    pub fn emit_store_local(&mut self, local: LocalId, ty: &TypeRef, span: Span) -> Result<()> {
        match self.local_access(local, span)?.clone() {
            LocalAccess::Slot { slot, kind } => self.code.emit_store(kind, slot),
            LocalAccess::Captured { holder, path } => {
                let (last, prefix) = path
                    .split_last()
                    .ok_or_else(|| Error::internal(format!("empty capture path for local #{}", local.0)))?;
                if ty.value_kind().width() == 1 {
                    self.emit_load_holder(holder, prefix);
                    self.code.emitop(Opcode::Swap);
                } else {
                    let tmp = self.code.new_temp(ty);
                    self.code.emit_store(ty.value_kind(), tmp);
                    self.emit_load_holder(holder, prefix);
                    self.code.emit_load(ty.value_kind(), tmp);
                }
                self.code.emit_putfield(last);
            }
        }
        Ok(())
    }

    pub fn this_path(&self) -> &[FieldRef] {
        &self.this_path
    }

    pub fn set_this_path(&mut self, path: Vec<FieldRef>) {
        self.this_path = path;
    }

    /// Push the source-level `this`
    pub fn emit_load_this(&mut self) {
        let path = self.this_path.clone();
        self.emit_load_holder(Holder::This, &path);
    }

    // ----- lambdas -----

    pub fn register_lambda(&mut self, id: LambdaId, target: LambdaTarget) {
        self.lambdas.insert(id, target);
    }

    pub fn lambda_target(&self, id: LambdaId) -> Option<&LambdaTarget> {
        self.lambdas.get(&id)
    }

    // ----- yields -----

    /// Claim the next resume point, in source order
    pub fn next_yield_state(&mut self) -> Option<(i32, Label)> {
        let y = self.yields.as_ref()?;
        self.next_yield += 1;
        y.resume.get(self.next_yield).map(|l| (self.next_yield as i32, *l))
    }
}
