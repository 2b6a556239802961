//! Code generation buffer for one method.
//!
//! `Code` collects symbolic instructions, binds labels to instruction
//! positions, tracks exception regions and brackets local slot lifetimes
//! with a LIFO scope stack. `finish` resolves every label and hands back a
//! [`MethodBody`]. Offsets in the finished body are instruction indices.

use crate::ast::{ConstValue, FieldRef, MethodRef, TypeRef, ValueKind};
use crate::codegen::label::Label;
use crate::codegen::opcodes::Opcode;
use crate::error::{Error, Result};
use std::fmt;

/// A symbolic instruction. Jump operands are labels until `finish`.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Op(Opcode),
    /// Push a constant (`iconst`/`bipush`/`ldc` selection is the writer's job)
    Const(ConstValue),
    Load { kind: ValueKind, slot: u16 },
    Store { kind: ValueKind, slot: u16 },
    Iinc { slot: u16, delta: i16 },
    Jump { op: Opcode, target: Label },
    TableSwitch { low: i32, high: i32, default: Label, targets: Vec<Label> },
    LookupSwitch { default: Label, pairs: Vec<(i32, Label)> },
    Invoke(MethodRef),
    GetField(FieldRef),
    PutField(FieldRef),
    New(String),
    CheckCast(String),
    InstanceOf(String),
    /// Create a function object implementing `interface` by calling
    /// `target`; an instance target consumes its receiver from the stack
    Closure { target: MethodRef, interface: MethodRef },
}

impl Instruction {
    /// Labels this instruction may transfer control to
    pub fn targets(&self) -> Vec<Label> {
        match self {
            Instruction::Jump { target, .. } => vec![*target],
            Instruction::TableSwitch { default, targets, .. } => {
                let mut v = vec![*default];
                v.extend(targets.iter().copied());
                v
            }
            Instruction::LookupSwitch { default, pairs } => {
                let mut v = vec![*default];
                v.extend(pairs.iter().map(|(_, l)| *l));
                v
            }
            _ => Vec::new(),
        }
    }

    pub fn is_conditional_jump(&self) -> bool {
        matches!(self, Instruction::Jump { op, .. } if op.is_conditional_branch())
    }
}

fn kind_prefix(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Int => "i",
        ValueKind::Long => "l",
        ValueKind::Float => "f",
        ValueKind::Double => "d",
        ValueKind::Reference | ValueKind::Void => "a",
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Op(op) => write!(f, "{}", op),
            Instruction::Const(c) => write!(f, "ldc {}", c),
            Instruction::Load { kind, slot } => write!(f, "{}load {}", kind_prefix(*kind), slot),
            Instruction::Store { kind, slot } => write!(f, "{}store {}", kind_prefix(*kind), slot),
            Instruction::Iinc { slot, delta } => write!(f, "iinc {} {}", slot, delta),
            Instruction::Jump { op, target } => write!(f, "{} {}", op, target),
            Instruction::TableSwitch { low, high, default, targets } => {
                let t: Vec<String> = targets.iter().map(|l| l.to_string()).collect();
                write!(f, "tableswitch {}..{} [{}] default {}", low, high, t.join(", "), default)
            }
            Instruction::LookupSwitch { default, pairs } => {
                let p: Vec<String> = pairs.iter().map(|(k, l)| format!("{}: {}", k, l)).collect();
                write!(f, "lookupswitch [{}] default {}", p.join(", "), default)
            }
            Instruction::Invoke(m) => {
                let op = match m.invoke {
                    crate::ast::InvokeKind::Static => "invokestatic",
                    crate::ast::InvokeKind::Virtual => "invokevirtual",
                    crate::ast::InvokeKind::Interface => "invokeinterface",
                    crate::ast::InvokeKind::Special => "invokespecial",
                };
                write!(f, "{} {}", op, m)
            }
            Instruction::GetField(fr) => {
                write!(f, "{} {}", if fr.is_static { "getstatic" } else { "getfield" }, fr)
            }
            Instruction::PutField(fr) => {
                write!(f, "{} {}", if fr.is_static { "putstatic" } else { "putfield" }, fr)
            }
            Instruction::New(c) => write!(f, "new {}", c),
            Instruction::CheckCast(c) => write!(f, "checkcast {}", c),
            Instruction::InstanceOf(c) => write!(f, "instanceof {}", c),
            Instruction::Closure { target, interface } => {
                write!(f, "invokedynamic {}.{} -> {}", interface.owner, interface.name, target)
            }
        }
    }
}

/// Exception table entry; `catch_type == None` catches everything
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTableEntry {
    pub start_pc: usize,
    pub end_pc: usize,
    pub handler_pc: usize,
    pub catch_type: Option<String>,
}

/// Local variable table entry
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarEntry {
    pub start_pc: usize,
    pub length: usize,
    pub name: String,
    pub descriptor: String,
    pub index: u16,
}

/// A finished method body
#[derive(Debug, Clone, Default)]
pub struct MethodBody {
    pub instructions: Vec<Instruction>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub local_variables: Vec<LocalVarEntry>,
    pub max_locals: u16,
    /// Resolved position of every label, indexed by label id
    pub labels: Vec<usize>,
}

impl MethodBody {
    /// Instruction index a label resolved to
    pub fn offset(&self, label: Label) -> usize {
        self.labels[label.0 as usize]
    }

    /// Jump targets of the instruction at `pc`, as instruction indices
    pub fn jump_offsets(&self, pc: usize) -> Vec<usize> {
        self.instructions[pc].targets().into_iter().map(|l| self.offset(l)).collect()
    }

    pub fn count(&self, pred: impl Fn(&Instruction) -> bool) -> usize {
        self.instructions.iter().filter(|i| pred(i)).count()
    }
}

impl fmt::Display for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pc, insn) in self.instructions.iter().enumerate() {
            let targets = insn.targets();
            if targets.is_empty() {
                writeln!(f, "{:>4}: {}", pc, insn)?;
            } else {
                let resolved: Vec<String> = targets.iter().map(|l| format!("{}={}", l, self.offset(*l))).collect();
                writeln!(f, "{:>4}: {}    // {}", pc, insn, resolved.join(" "))?;
            }
        }
        for e in &self.exception_table {
            writeln!(
                f,
                "  [{}, {}) -> {} {}",
                e.start_pc,
                e.end_pc,
                e.handler_pc,
                e.catch_type.as_deref().unwrap_or("any")
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Region {
    start: Label,
    end: Label,
    handler: Label,
    catch_type: Option<String>,
}

#[derive(Debug, Clone)]
struct LiveLocal {
    name: Option<String>,
    descriptor: String,
    slot: u16,
    start: usize,
}

#[derive(Debug, Clone, Copy)]
struct ScopeMark {
    live: usize,
    next_slot: u16,
}

/// Instruction sink for one method
#[derive(Debug)]
pub struct Code {
    instructions: Vec<Instruction>,
    /// Position of each label, `None` until marked
    labels: Vec<Option<usize>>,
    regions: Vec<Region>,
    live: Vec<LiveLocal>,
    scopes: Vec<ScopeMark>,
    next_slot: u16,
    max_locals: u16,
    local_vars: Vec<LocalVarEntry>,
    /// Switch: emit variable debug info
    var_debug_info: bool,
}

impl Code {
    pub fn new(var_debug_info: bool) -> Self {
        Self {
            instructions: Vec::new(),
            labels: Vec::new(),
            regions: Vec::new(),
            live: Vec::new(),
            scopes: vec![ScopeMark { live: 0, next_slot: 0 }],
            next_slot: 0,
            max_locals: 0,
            local_vars: Vec::new(),
            var_debug_info,
        }
    }

    /// Current code pointer
    pub fn cur_cp(&self) -> usize {
        self.instructions.len()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    // ----- labels -----

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);
        label
    }

    /// Bind `label` to the next instruction position
    pub fn mark(&mut self, label: Label) -> Result<()> {
        let cp = self.cur_cp();
        let slot = self
            .labels
            .get_mut(label.0 as usize)
            .ok_or_else(|| Error::internal(format!("label {} was not allocated by this method", label)))?;
        if let Some(first) = *slot {
            return Err(Error::LabelMarkedTwice { label: label.0, first, second: cp });
        }
        *slot = Some(cp);
        Ok(())
    }

    /// Allocate a label and bind it here
    pub fn entry_point(&mut self) -> Result<Label> {
        let label = self.new_label();
        self.mark(label)?;
        Ok(label)
    }

    // ----- emission -----

    pub fn emit(&mut self, insn: Instruction) {
        self.instructions.push(insn);
    }

    pub fn emitop(&mut self, op: Opcode) {
        self.emit(Instruction::Op(op));
    }

    pub fn emit_const(&mut self, value: ConstValue) {
        self.emit(Instruction::Const(value));
    }

    pub fn emit_int(&mut self, value: i32) {
        self.emit_const(ConstValue::Int(value));
    }

    pub fn emit_load(&mut self, kind: ValueKind, slot: u16) {
        self.emit(Instruction::Load { kind, slot });
    }

    pub fn emit_store(&mut self, kind: ValueKind, slot: u16) {
        self.emit(Instruction::Store { kind, slot });
    }

    pub fn emit_iinc(&mut self, slot: u16, delta: i16) {
        self.emit(Instruction::Iinc { slot, delta });
    }

    pub fn emit_jump(&mut self, op: Opcode, target: Label) {
        self.emit(Instruction::Jump { op, target });
    }

    pub fn emit_goto(&mut self, target: Label) {
        self.emit_jump(Opcode::Goto, target);
    }

    pub fn emit_invoke(&mut self, method: &MethodRef) {
        self.emit(Instruction::Invoke(method.clone()));
    }

    pub fn emit_getfield(&mut self, field: &FieldRef) {
        self.emit(Instruction::GetField(field.clone()));
    }

    pub fn emit_putfield(&mut self, field: &FieldRef) {
        self.emit(Instruction::PutField(field.clone()));
    }

    pub fn emit_new(&mut self, class: &str) {
        self.emit(Instruction::New(class.to_string()));
    }

    pub fn emit_checkcast(&mut self, ty: &TypeRef) {
        self.emit(Instruction::CheckCast(ty.internal_name()));
    }

    /// Typed return; `Void` emits a plain `return`
    pub fn emit_return(&mut self, kind: ValueKind) {
        let op = match kind {
            ValueKind::Int => Opcode::Ireturn,
            ValueKind::Long => Opcode::Lreturn,
            ValueKind::Float => Opcode::Freturn,
            ValueKind::Double => Opcode::Dreturn,
            ValueKind::Reference => Opcode::Areturn,
            ValueKind::Void => Opcode::Return,
        };
        self.emitop(op);
    }

    /// Discard a value of the given kind from the stack
    pub fn emit_pop(&mut self, kind: ValueKind) {
        match kind.width() {
            0 => {}
            1 => self.emitop(Opcode::Pop),
            _ => self.emitop(Opcode::Pop2),
        }
    }

    // ----- exception regions -----

    /// Register a protected range `[start, end)` handled at `handler`
    pub fn add_region(&mut self, start: Label, end: Label, handler: Label, catch_type: Option<&TypeRef>) {
        self.regions.push(Region {
            start,
            end,
            handler,
            catch_type: catch_type.map(|t| t.internal_name()),
        });
    }

    // ----- local scopes -----

    pub fn enter_scope(&mut self) {
        self.scopes.push(ScopeMark { live: self.live.len(), next_slot: self.next_slot });
    }

    /// Leave the innermost scope, freeing its slots for siblings
    pub fn end_scopes(&mut self) -> Result<()> {
        if self.scopes.len() <= 1 {
            return Err(Error::ScopeUnderflow);
        }
        let mark = self.scopes.pop().ok_or(Error::ScopeUnderflow)?;
        let cp = self.cur_cp();
        for local in self.live.drain(mark.live..).rev() {
            if let (true, Some(name)) = (self.var_debug_info, local.name) {
                self.local_vars.push(LocalVarEntry {
                    start_pc: local.start,
                    length: cp.saturating_sub(local.start),
                    name,
                    descriptor: local.descriptor,
                    index: local.slot,
                });
            }
        }
        self.next_slot = mark.next_slot;
        Ok(())
    }

    fn alloc_slot(&mut self, name: Option<&str>, ty: &TypeRef) -> u16 {
        let slot = self.next_slot;
        let width = ty.value_kind().width().max(1);
        self.next_slot += width;
        self.max_locals = self.max_locals.max(self.next_slot);
        self.live.push(LiveLocal {
            name: name.map(str::to_string),
            descriptor: ty.descriptor(),
            slot,
            start: self.cur_cp(),
        });
        slot
    }

    /// Allocate a named local in the current scope
    pub fn new_local(&mut self, name: &str, ty: &TypeRef) -> u16 {
        self.alloc_slot(Some(name), ty)
    }

    /// Allocate an anonymous temporary in the current scope
    pub fn new_temp(&mut self, ty: &TypeRef) -> u16 {
        self.alloc_slot(None, ty)
    }

    pub fn next_slot(&self) -> u16 {
        self.next_slot
    }

    // ----- finish -----

    /// Resolve labels and regions; every referenced label must be marked
    pub fn finish(mut self) -> Result<MethodBody> {
        while self.scopes.len() > 1 {
            self.end_scopes()?;
        }
        // Method-level locals (parameters) live until the end.
        let cp = self.cur_cp();
        for local in std::mem::take(&mut self.live) {
            if let (true, Some(name)) = (self.var_debug_info, local.name) {
                self.local_vars.push(LocalVarEntry {
                    start_pc: local.start,
                    length: cp - local.start,
                    name,
                    descriptor: local.descriptor,
                    index: local.slot,
                });
            }
        }

        let resolve = |labels: &[Option<usize>], l: Label| -> Result<usize> {
            labels
                .get(l.0 as usize)
                .copied()
                .flatten()
                .ok_or(Error::UnmarkedLabel { label: l.0 })
        };

        for insn in &self.instructions {
            for target in insn.targets() {
                resolve(&self.labels, target)?;
            }
        }

        let mut exception_table = Vec::new();
        for region in &self.regions {
            let start_pc = resolve(&self.labels, region.start)?;
            let end_pc = resolve(&self.labels, region.end)?;
            let handler_pc = resolve(&self.labels, region.handler)?;
            if start_pc >= end_pc {
                continue;
            }
            exception_table.push(ExceptionTableEntry {
                start_pc,
                end_pc,
                handler_pc,
                catch_type: region.catch_type.clone(),
            });
        }

        // Labels nobody jumps to may stay unmarked; park them at the end.
        let labels = self.labels.iter().map(|l| l.unwrap_or(cp)).collect();

        Ok(MethodBody {
            instructions: self.instructions,
            exception_table,
            local_variables: self.local_vars,
            max_locals: self.max_locals,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_twice_is_fatal() {
        let mut code = Code::new(true);
        let l = code.new_label();
        code.mark(l).unwrap();
        code.emitop(Opcode::Nop);
        assert!(matches!(code.mark(l), Err(Error::LabelMarkedTwice { first: 0, second: 1, .. })));
    }

    #[test]
    fn test_unmarked_jump_target_fails_finish() {
        let mut code = Code::new(true);
        let l = code.new_label();
        code.emit_goto(l);
        assert!(matches!(code.finish(), Err(Error::UnmarkedLabel { .. })));
    }

    #[test]
    fn test_scopes_reuse_slots() {
        let mut code = Code::new(true);
        code.enter_scope();
        let a = code.new_local("a", &TypeRef::long());
        assert_eq!(a, 0);
        assert_eq!(code.next_slot(), 2);
        code.end_scopes().unwrap();

        code.enter_scope();
        let b = code.new_local("b", &TypeRef::int());
        assert_eq!(b, 0);
        code.end_scopes().unwrap();

        let body = code.finish().unwrap();
        assert_eq!(body.max_locals, 2);
        assert_eq!(body.local_variables.len(), 2);
    }

    #[test]
    fn test_scope_underflow() {
        let mut code = Code::new(false);
        assert!(matches!(code.end_scopes(), Err(Error::ScopeUnderflow)));
    }

    #[test]
    fn test_empty_regions_are_dropped() {
        let mut code = Code::new(false);
        let start = code.entry_point().unwrap();
        let end = code.entry_point().unwrap();
        let handler = code.entry_point().unwrap();
        code.add_region(start, end, handler, None);
        code.emitop(Opcode::Athrow);
        let body = code.finish().unwrap();
        assert!(body.exception_table.is_empty());
    }
}
