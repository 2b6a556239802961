//! Switch lowering: table/lookup dispatch for integral and enum selectors,
//! chained `equals` tests or a cached name-to-ordinal map for strings.

use crate::ast::*;
use crate::codegen::code::Instruction;
use crate::codegen::gen::Gen;
use crate::codegen::label::Label;
use crate::codegen::method_context::{CaseKey, FrameKind, MethodGenerationContext};
use crate::codegen::opcodes::Opcode;
use crate::consts::{self, STRING_SWITCH_THRESHOLD};
use crate::error::{Error, Result};
use std::collections::HashMap;

fn case_constant(case: &Expr) -> Result<&ConstValue> {
    case.constant().ok_or(Error::NonConstantCaseLabel { span: case.span })
}

impl<'g> Gen<'g> {
    pub(crate) fn gen_switch<'a>(&mut self, cx: &mut MethodGenerationContext<'a>, stmt: &'a Stmt, s: &'a SwitchStmt) -> Result<()> {
        cx.enter_scope();
        let labels = cx.labels_for(stmt.id);
        let section_labels: Vec<Label> = s.sections.iter().map(|_| cx.new_label()).collect();
        let default = s
            .sections
            .iter()
            .position(SwitchSection::is_default)
            .map_or(labels.end, |i| section_labels[i]);

        // goto case / goto default targets
        let mut case_map = HashMap::new();
        for (section, &label) in s.sections.iter().zip(&section_labels) {
            for case in &section.labels {
                let key = match case {
                    CaseLabel::Default => CaseKey::Default,
                    CaseLabel::Case(e) => {
                        CaseKey::of(case_constant(e)?).ok_or(Error::NonConstantCaseLabel { span: e.span })?
                    }
                };
                case_map.insert(key, label);
            }
        }

        match &s.kind {
            SwitchKind::Integral | SwitchKind::Enum { .. } => {
                self.gen_expr(cx, &s.selector)?;
                if let SwitchKind::Enum { ordinal } = &s.kind {
                    cx.code.emit_invoke(ordinal);
                }
                let mut pairs = Vec::new();
                for (section, &label) in s.sections.iter().zip(&section_labels) {
                    for case in &section.labels {
                        if let CaseLabel::Case(e) = case {
                            let key = case_constant(e)?
                                .as_switch_key()
                                .ok_or(Error::NonConstantCaseLabel { span: e.span })?;
                            pairs.push((key, label));
                        }
                    }
                }
                pairs.sort_by_key(|&(key, _)| key);
                Self::emit_dispatch(cx, pairs, default);
            }
            SwitchKind::String if s.sections.len() < STRING_SWITCH_THRESHOLD => {
                self.gen_string_chain(cx, s, &section_labels, default)?;
            }
            SwitchKind::String => {
                self.gen_string_map(cx, s, &section_labels, default)?;
            }
        }

        cx.push_switch_map(stmt.id, case_map);
        cx.push_frame(stmt.id, FrameKind::Switch);
        for (section, &label) in s.sections.iter().zip(&section_labels) {
            cx.code.mark(label)?;
            self.gen_stats(cx, &section.statements)?;
        }
        cx.pop_frame();
        cx.pop_switch_map();
        cx.code.mark(labels.end)?;
        cx.exit_scope()
    }

    /// Dense key sets get a jump table, everything else a sorted lookup
    fn emit_dispatch(cx: &mut MethodGenerationContext<'_>, pairs: Vec<(i32, Label)>, default: Label) {
        let bounds = pairs.first().zip(pairs.last()).map(|(&(lo, _), &(hi, _))| (lo, hi));
        match bounds {
            Some((low, high)) if i64::from(high) - i64::from(low) == pairs.len() as i64 - 1 => {
                let targets = pairs.into_iter().map(|(_, l)| l).collect();
                cx.code.emit(Instruction::TableSwitch { low, high, default, targets });
            }
            _ => cx.code.emit(Instruction::LookupSwitch { default, pairs }),
        }
    }

    /// `"a".equals(tmp) | "b".equals(tmp)` per section, one branch each
    fn gen_string_chain(
        &mut self,
        cx: &mut MethodGenerationContext<'_>,
        s: &SwitchStmt,
        section_labels: &[Label],
        default: Label,
    ) -> Result<()> {
        self.gen_expr(cx, &s.selector)?;
        let tmp = cx.new_temp(&TypeRef::string());
        cx.code.emit_store(ValueKind::Reference, tmp);

        for (section, &label) in s.sections.iter().zip(section_labels) {
            let mut tests = 0;
            for case in &section.labels {
                let CaseLabel::Case(e) = case else { continue };
                let text = case_constant(e)?.as_str().ok_or(Error::NonConstantCaseLabel { span: e.span })?;
                cx.code.emit_const(ConstValue::String(text.to_string()));
                cx.code.emit_load(ValueKind::Reference, tmp);
                cx.code.emit_invoke(&consts::STRING_EQUALS);
                if tests > 0 {
                    cx.code.emitop(Opcode::Ior);
                }
                tests += 1;
            }
            if tests > 0 {
                cx.code.emit_jump(Opcode::Ifne, label);
            }
        }
        cx.code.emit_goto(default);
        Ok(())
    }

    /// Look the selector up in a lazily built `String -> Integer` map held
    /// in a synthetic static field; a miss yields the section count
    fn gen_string_map(
        &mut self,
        cx: &mut MethodGenerationContext<'_>,
        s: &SwitchStmt,
        section_labels: &[Label],
        default: Label,
    ) -> Result<()> {
        let field = self.class.new_switch_map();
        log::debug!("string switch with {} sections uses {}", s.sections.len(), field);

        let ready = cx.new_label();
        cx.code.emit_getfield(&field);
        cx.code.emit_jump(Opcode::Ifnonnull, ready);
        cx.code.emit_new(consts::HASH_MAP);
        cx.code.emitop(Opcode::Dup);
        cx.code.emit_invoke(&consts::HASH_MAP_INIT);
        for (ordinal, section) in s.sections.iter().enumerate() {
            for case in &section.labels {
                let CaseLabel::Case(e) = case else { continue };
                let text = case_constant(e)?.as_str().ok_or(Error::NonConstantCaseLabel { span: e.span })?;
                cx.code.emitop(Opcode::Dup);
                cx.code.emit_const(ConstValue::String(text.to_string()));
                cx.code.emit_int(ordinal as i32);
                cx.code.emit_invoke(&consts::INTEGER_VALUE_OF);
                cx.code.emit_invoke(&consts::HASH_MAP_PUT);
                cx.code.emitop(Opcode::Pop);
            }
        }
        cx.code.emit_putfield(&field);
        cx.code.mark(ready)?;

        let found = cx.new_label();
        let dispatch = cx.new_label();
        let miss = s.sections.len() as i32;
        cx.code.emit_getfield(&field);
        self.gen_expr(cx, &s.selector)?;
        cx.code.emit_invoke(&consts::HASH_MAP_GET);
        cx.code.emitop(Opcode::Dup);
        cx.code.emit_jump(Opcode::Ifnonnull, found);
        cx.code.emitop(Opcode::Pop);
        cx.code.emit_int(miss);
        cx.code.emit_goto(dispatch);
        cx.code.mark(found)?;
        cx.code.emit_checkcast(&TypeRef::class(consts::INTEGER));
        cx.code.emit_invoke(&consts::INTEGER_INT_VALUE);
        cx.code.mark(dispatch)?;

        let mut targets = section_labels.to_vec();
        targets.push(default);
        cx.code.emit(Instruction::TableSwitch { low: 0, high: miss, default, targets });
        Ok(())
    }
}
