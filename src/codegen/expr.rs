//! Expression generator contract and the reference stack emitter.
//!
//! The statement lowering never emits operands itself: it hands every
//! expression to an [`ExpressionGenerator`], either for its value or, with
//! [`CondTargets`], as a branch.

use crate::ast::*;
use crate::codegen::label::Label;
use crate::codegen::method_context::MethodGenerationContext;
use crate::codegen::opcodes::Opcode;
use crate::error::{Error, Result};

/// Branch targets for a condition.
///
/// With `negate` the emitted test jumps to `when_false` when the condition
/// is false and falls through into `when_true`; without it the test jumps
/// to `when_true` when the condition is true and falls through into
/// `when_false`. The caller marks both labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CondTargets {
    pub when_true: Label,
    pub when_false: Label,
    pub negate: bool,
}

impl CondTargets {
    /// Falls into `when_true`
    pub fn fall_true(when_true: Label, when_false: Label) -> Self {
        Self { when_true, when_false, negate: true }
    }

    /// Falls into `when_false`
    pub fn fall_false(when_true: Label, when_false: Label) -> Self {
        Self { when_true, when_false, negate: false }
    }

    /// Same jumps for the logical complement
    fn inverted(self) -> Self {
        Self { when_true: self.when_false, when_false: self.when_true, negate: !self.negate }
    }
}

pub trait ExpressionGenerator {
    /// Emit `expr`. With `targets` the expression is a condition and
    /// control leaves through the targets; otherwise its value is pushed,
    /// and discarded again when `is_nested` is false (expression statements).
    fn emit_expression(
        &mut self,
        cx: &mut MethodGenerationContext<'_>,
        expr: &Expr,
        targets: Option<CondTargets>,
        is_nested: bool,
    ) -> Result<()>;
}

/// Reference emitter covering the expression forms of the annotated tree
#[derive(Debug, Default)]
pub struct StackExprGen;

impl StackExprGen {
    pub fn new() -> Self {
        Self
    }

    fn emit_cond(&mut self, cx: &mut MethodGenerationContext<'_>, expr: &Expr, t: CondTargets) -> Result<()> {
        if let Some(value) = expr.constant_bool() {
            match (value, t.negate) {
                (false, true) => cx.code.emit_goto(t.when_false),
                (true, false) => cx.code.emit_goto(t.when_true),
                _ => {}
            }
            return Ok(());
        }

        match &expr.kind {
            ExprKind::Unary { op: UnaryOp::Not, operand } => self.emit_cond(cx, operand, t.inverted()),
            ExprKind::Binary { op: BinaryOp::And, lhs, rhs } => {
                self.emit_cond(cx, lhs, CondTargets { negate: true, ..t })?;
                self.emit_cond(cx, rhs, t)
            }
            ExprKind::Binary { op: BinaryOp::Or, lhs, rhs } => {
                self.emit_cond(cx, lhs, CondTargets { negate: false, ..t })?;
                self.emit_cond(cx, rhs, t)
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_comparison() => {
                let jump = self.emit_compare(cx, *op, lhs, rhs)?;
                if t.negate {
                    let neg = jump.negate().ok_or_else(|| Error::internal("comparison without a branch opcode"))?;
                    cx.code.emit_jump(neg, t.when_false);
                } else {
                    cx.code.emit_jump(jump, t.when_true);
                }
                Ok(())
            }
            _ => {
                self.emit_value(cx, expr)?;
                if t.negate {
                    cx.code.emit_jump(Opcode::Ifeq, t.when_false);
                } else {
                    cx.code.emit_jump(Opcode::Ifne, t.when_true);
                }
                Ok(())
            }
        }
    }

    /// Push the operands of a comparison; returns the branch taken when it holds
    fn emit_compare(&mut self, cx: &mut MethodGenerationContext<'_>, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Opcode> {
        let kind = lhs.ty().value_kind();
        if kind == ValueKind::Reference {
            let null_rhs = matches!(rhs.constant(), Some(ConstValue::Null));
            self.emit_value(cx, lhs)?;
            if null_rhs {
                return Ok(if op == BinaryOp::Eq { Opcode::Ifnull } else { Opcode::Ifnonnull });
            }
            self.emit_value(cx, rhs)?;
            return Ok(if op == BinaryOp::Eq { Opcode::IfAcmpeq } else { Opcode::IfAcmpne });
        }

        self.emit_value(cx, lhs)?;
        self.emit_value(cx, rhs)?;
        let (icmp, zero) = match op {
            BinaryOp::Eq => (Opcode::IfIcmpeq, Opcode::Ifeq),
            BinaryOp::Ne => (Opcode::IfIcmpne, Opcode::Ifne),
            BinaryOp::Lt => (Opcode::IfIcmplt, Opcode::Iflt),
            BinaryOp::Le => (Opcode::IfIcmple, Opcode::Ifle),
            BinaryOp::Gt => (Opcode::IfIcmpgt, Opcode::Ifgt),
            _ => (Opcode::IfIcmpge, Opcode::Ifge),
        };
        let nan_false = matches!(op, BinaryOp::Lt | BinaryOp::Le);
        match kind {
            ValueKind::Long => cx.code.emitop(Opcode::Lcmp),
            ValueKind::Float => cx.code.emitop(if nan_false { Opcode::Fcmpg } else { Opcode::Fcmpl }),
            ValueKind::Double => cx.code.emitop(if nan_false { Opcode::Dcmpg } else { Opcode::Dcmpl }),
            _ => return Ok(icmp),
        }
        Ok(zero)
    }

    fn emit_value(&mut self, cx: &mut MethodGenerationContext<'_>, expr: &Expr) -> Result<()> {
        self.emit_expression(cx, expr, None, true)
    }

    fn emit_literal(cx: &mut MethodGenerationContext<'_>, value: &ConstValue) {
        match value {
            ConstValue::Boolean(true) => cx.code.emitop(Opcode::Iconst1),
            ConstValue::Boolean(false) => cx.code.emitop(Opcode::Iconst0),
            ConstValue::Null => cx.code.emitop(Opcode::AconstNull),
            other => cx.code.emit_const(other.clone()),
        }
    }

    fn arith_op(op: BinaryOp, kind: ValueKind) -> Option<Opcode> {
        use Opcode::*;
        let row = match op {
            BinaryOp::Add => [Iadd, Ladd, Fadd, Dadd],
            BinaryOp::Sub => [Isub, Lsub, Fsub, Dsub],
            BinaryOp::Mul => [Imul, Lmul, Fmul, Dmul],
            BinaryOp::Div => [Idiv, Ldiv, Fdiv, Ddiv],
            BinaryOp::Rem => [Irem, Lrem, Frem, Drem],
            BinaryOp::Shl => [Ishl, Lshl, Nop, Nop],
            BinaryOp::Shr => [Ishr, Lshr, Nop, Nop],
            BinaryOp::UShr => [Iushr, Lushr, Nop, Nop],
            BinaryOp::BitAnd => [Iand, Land, Nop, Nop],
            BinaryOp::BitOr => [Ior, Lor, Nop, Nop],
            BinaryOp::BitXor => [Ixor, Lxor, Nop, Nop],
            _ => return None,
        };
        let op = match kind {
            ValueKind::Int => row[0],
            ValueKind::Long => row[1],
            ValueKind::Float => row[2],
            ValueKind::Double => row[3],
            _ => return None,
        };
        (op != Nop).then_some(op)
    }

    fn primitive_conversion(from: ValueKind, to: &TypeRef) -> Vec<Opcode> {
        use Opcode::*;
        let to_kind = to.value_kind();
        let mut ops = match (from, to_kind) {
            (ValueKind::Int, ValueKind::Long) => vec![I2l],
            (ValueKind::Int, ValueKind::Float) => vec![I2f],
            (ValueKind::Int, ValueKind::Double) => vec![I2d],
            (ValueKind::Long, ValueKind::Int) => vec![L2i],
            (ValueKind::Long, ValueKind::Float) => vec![L2f],
            (ValueKind::Long, ValueKind::Double) => vec![L2d],
            (ValueKind::Float, ValueKind::Int) => vec![F2i],
            (ValueKind::Float, ValueKind::Long) => vec![F2l],
            (ValueKind::Float, ValueKind::Double) => vec![F2d],
            (ValueKind::Double, ValueKind::Int) => vec![D2i],
            (ValueKind::Double, ValueKind::Long) => vec![D2l],
            (ValueKind::Double, ValueKind::Float) => vec![D2f],
            _ => vec![],
        };
        if to_kind == ValueKind::Int {
            match to {
                TypeRef::Primitive(PrimitiveType::Byte) => ops.push(I2b),
                TypeRef::Primitive(PrimitiveType::Char) => ops.push(I2c),
                TypeRef::Primitive(PrimitiveType::Short) => ops.push(I2s),
                _ => {}
            }
        }
        ops
    }

    fn emit_conversion(cx: &mut MethodGenerationContext<'_>, from: &TypeRef, conversion: &Conversion) {
        match conversion {
            Conversion::Box(m) | Conversion::Unbox(m) => cx.code.emit_invoke(m),
            Conversion::Cast(to) if to.is_reference() => cx.code.emit_checkcast(to),
            Conversion::Cast(to) => {
                for op in Self::primitive_conversion(from.value_kind(), to) {
                    cx.code.emitop(op);
                }
            }
        }
    }

    fn result_type(expr: &Expr) -> TypeRef {
        match &expr.info.conversion {
            Some(Conversion::Cast(to)) => to.clone(),
            Some(Conversion::Box(m)) | Some(Conversion::Unbox(m)) => m.ret.clone(),
            None => expr.ty().clone(),
        }
    }

    /// Push `expr`'s value; returns false when the value was already consumed
    /// (assignment used as a statement)
    fn emit_plain(&mut self, cx: &mut MethodGenerationContext<'_>, expr: &Expr, is_nested: bool) -> Result<bool> {
        let has_effects = matches!(
            expr.kind,
            ExprKind::Assign { .. } | ExprKind::Call { .. } | ExprKind::New { .. } | ExprKind::Lambda(_)
        );
        let folded = expr.constant().filter(|_| !has_effects);

        match &expr.kind {
            _ if folded.is_some() => {
                if let Some(value) = folded {
                    Self::emit_literal(cx, value);
                }
            }
            ExprKind::Literal(value) => Self::emit_literal(cx, value),
            ExprKind::Local(id) => cx.emit_load_local(*id, expr.span)?,
            ExprKind::This => cx.emit_load_this(),
            ExprKind::Assign { target, value } => {
                self.emit_value(cx, value)?;
                if is_nested {
                    cx.code.emitop(if value.ty().value_kind().width() == 2 { Opcode::Dup2 } else { Opcode::Dup });
                }
                cx.emit_store_local(*target, expr.ty(), expr.span)?;
                return Ok(is_nested);
            }
            ExprKind::Unary { op, operand } => {
                self.emit_value(cx, operand)?;
                let kind = expr.ty().value_kind();
                match op {
                    UnaryOp::Plus => {}
                    UnaryOp::Neg => cx.code.emitop(match kind {
                        ValueKind::Long => Opcode::Lneg,
                        ValueKind::Float => Opcode::Fneg,
                        ValueKind::Double => Opcode::Dneg,
                        _ => Opcode::Ineg,
                    }),
                    UnaryOp::BitNot if kind == ValueKind::Long => {
                        cx.code.emit_const(ConstValue::Long(-1));
                        cx.code.emitop(Opcode::Lxor);
                    }
                    UnaryOp::BitNot => {
                        cx.code.emit_int(-1);
                        cx.code.emitop(Opcode::Ixor);
                    }
                    UnaryOp::Not => {
                        cx.code.emitop(Opcode::Iconst1);
                        cx.code.emitop(Opcode::Ixor);
                    }
                }
            }
            ExprKind::Binary { op, .. } if op.is_comparison() || matches!(op, BinaryOp::And | BinaryOp::Or) => {
                let when_true = cx.new_label();
                let when_false = cx.new_label();
                let end = cx.new_label();
                self.emit_cond(cx, expr, CondTargets::fall_true(when_true, when_false))?;
                cx.code.mark(when_true)?;
                cx.code.emitop(Opcode::Iconst1);
                cx.code.emit_goto(end);
                cx.code.mark(when_false)?;
                cx.code.emitop(Opcode::Iconst0);
                cx.code.mark(end)?;
            }
            ExprKind::Binary { op, lhs, rhs } => {
                if *op == BinaryOp::Add && expr.ty().is_string() {
                    return Err(Error::unsupported("non-constant string concatenation", expr.span));
                }
                self.emit_value(cx, lhs)?;
                self.emit_value(cx, rhs)?;
                let kind = if op.is_shift() { lhs.ty().value_kind() } else { expr.ty().value_kind() };
                let opcode = Self::arith_op(*op, kind)
                    .ok_or_else(|| Error::unsupported(format!("operator {:?} on {:?}", op, kind), expr.span))?;
                cx.code.emitop(opcode);
            }
            ExprKind::Call { receiver, method, args } => {
                match receiver {
                    Some(r) => self.emit_value(cx, r)?,
                    None if method.invoke != InvokeKind::Static => cx.emit_load_this(),
                    None => {}
                }
                for a in args {
                    self.emit_value(cx, a)?;
                }
                cx.code.emit_invoke(method);
            }
            ExprKind::Field { receiver, field } => {
                if !field.is_static {
                    match receiver {
                        Some(r) => self.emit_value(cx, r)?,
                        None => cx.emit_load_this(),
                    }
                }
                cx.code.emit_getfield(field);
            }
            ExprKind::New { ctor, args } => {
                cx.code.emit_new(&ctor.owner);
                cx.code.emitop(Opcode::Dup);
                for a in args {
                    self.emit_value(cx, a)?;
                }
                cx.code.emit_invoke(ctor);
            }
            ExprKind::Lambda(lambda) => {
                let target = cx
                    .lambda_target(lambda.id)
                    .cloned()
                    .ok_or_else(|| Error::internal(format!("lambda #{} was not compiled", lambda.id.0)))?;
                if let Some(slot) = target.receiver {
                    cx.code.emit_load(ValueKind::Reference, slot);
                }
                cx.code.emit(crate::codegen::code::Instruction::Closure {
                    target: target.method,
                    interface: lambda.interface.clone(),
                });
            }
        }

        if let Some(conversion) = &expr.info.conversion {
            Self::emit_conversion(cx, expr.ty(), conversion);
        }
        Ok(true)
    }
}

impl ExpressionGenerator for StackExprGen {
    fn emit_expression(
        &mut self,
        cx: &mut MethodGenerationContext<'_>,
        expr: &Expr,
        targets: Option<CondTargets>,
        is_nested: bool,
    ) -> Result<()> {
        if let Some(t) = targets {
            return self.emit_cond(cx, expr, t);
        }
        let pushed = self.emit_plain(cx, expr, is_nested)?;
        if pushed && !is_nested {
            cx.code.emit_pop(Self::result_type(expr).value_kind());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::code::Instruction;

    fn cx() -> MethodGenerationContext<'static> {
        MethodGenerationContext::new("Foo", "bar", true, TypeRef::void(), false)
    }

    #[test]
    fn test_and_condition_short_circuits() {
        let mut cx = cx();
        let a = LocalDecl::new(1, "a", TypeRef::boolean());
        let b = LocalDecl::new(2, "b", TypeRef::boolean());
        cx.declare_local(&a);
        cx.declare_local(&b);
        let t = cx.new_label();
        let f = cx.new_label();
        let cond = Expr::binary(BinaryOp::And, Expr::local(&a), Expr::local(&b), TypeRef::boolean());
        StackExprGen::new()
            .emit_expression(&mut cx, &cond, Some(CondTargets::fall_true(t, f)), true)
            .unwrap();
        let jumps: Vec<_> = cx
            .code
            .instructions()
            .iter()
            .filter_map(|i| match i {
                Instruction::Jump { op, target } => Some((*op, *target)),
                _ => None,
            })
            .collect();
        assert_eq!(jumps, vec![(Opcode::Ifeq, f), (Opcode::Ifeq, f)]);
    }

    #[test]
    fn test_constant_condition_emits_no_branch() {
        let mut cx = cx();
        let t = cx.new_label();
        let f = cx.new_label();
        StackExprGen::new()
            .emit_expression(&mut cx, &Expr::bool(true), Some(CondTargets::fall_true(t, f)), true)
            .unwrap();
        assert!(cx.code.instructions().is_empty());
    }

    #[test]
    fn test_expression_statement_pops_call_result() {
        let mut cx = cx();
        let m = MethodRef::new("Foo", "size", vec![], TypeRef::int(), InvokeKind::Static);
        StackExprGen::new()
            .emit_expression(&mut cx, &Expr::call(None, m, vec![]), None, false)
            .unwrap();
        assert_eq!(cx.code.instructions().last(), Some(&Instruction::Op(Opcode::Pop)));
    }

    #[test]
    fn test_long_comparison_uses_lcmp() {
        let mut cx = cx();
        let x = LocalDecl::new(1, "x", TypeRef::long());
        cx.declare_local(&x);
        let t = cx.new_label();
        let f = cx.new_label();
        let cond = Expr::binary(BinaryOp::Lt, Expr::local(&x), Expr::literal(ConstValue::Long(3)), TypeRef::boolean());
        StackExprGen::new()
            .emit_expression(&mut cx, &cond, Some(CondTargets::fall_false(t, f)), true)
            .unwrap();
        let insns = cx.code.instructions();
        assert_eq!(insns[2], Instruction::Op(Opcode::Lcmp));
        assert_eq!(insns[3], Instruction::Jump { op: Opcode::Iflt, target: t });
    }
}
