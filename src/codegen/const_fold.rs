//! Constant folding.
//!
//! Operands are promoted the JVM way: byte, short and char widen to int,
//! and a binary operation is carried out in the widest kind present among
//! int, long, float and double. Shift operands are promoted independently
//! and the distance is masked to 31 or 63. Integer division or remainder
//! by zero does not fold.

use crate::ast::{BinaryOp, ConstValue, UnaryOp};

/// Promoted arithmetic kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumericKind {
    Int,
    Long,
    Float,
    Double,
}

impl NumericKind {
    /// Unary promotion of a constant; `None` for non-numeric values
    pub fn of(value: &ConstValue) -> Option<NumericKind> {
        match value {
            ConstValue::Byte(_) | ConstValue::Short(_) | ConstValue::Char(_) | ConstValue::Int(_) => Some(NumericKind::Int),
            ConstValue::Long(_) => Some(NumericKind::Long),
            ConstValue::Float(_) => Some(NumericKind::Float),
            ConstValue::Double(_) => Some(NumericKind::Double),
            _ => None,
        }
    }

    /// Binary promotion: the widest of the two
    pub fn promote(a: NumericKind, b: NumericKind) -> NumericKind {
        a.max(b)
    }
}

fn as_i32(v: &ConstValue) -> Option<i32> {
    v.as_switch_key()
}

fn as_i64(v: &ConstValue) -> Option<i64> {
    match v {
        ConstValue::Long(x) => Some(*x),
        other => as_i32(other).map(i64::from),
    }
}

fn as_f32(v: &ConstValue) -> Option<f32> {
    match v {
        ConstValue::Float(x) => Some(*x),
        ConstValue::Long(x) => Some(*x as f32),
        other => as_i32(other).map(|x| x as f32),
    }
}

fn as_f64(v: &ConstValue) -> Option<f64> {
    match v {
        ConstValue::Double(x) => Some(*x),
        ConstValue::Float(x) => Some(f64::from(*x)),
        ConstValue::Long(x) => Some(*x as f64),
        other => as_i32(other).map(f64::from),
    }
}

/// Arithmetic shared by the four promoted kinds
trait Numeric: Copy + PartialOrd {
    fn add(self, o: Self) -> Self;
    fn sub(self, o: Self) -> Self;
    fn mul(self, o: Self) -> Self;
    fn div(self, o: Self) -> Option<Self>;
    fn rem(self, o: Self) -> Option<Self>;
    fn bitwise(self, op: BinaryOp, o: Self) -> Option<Self>;
    fn neg(self) -> Self;
    fn into_const(self) -> ConstValue;
}

macro_rules! integral {
    ($t:ty, $variant:ident) => {
        impl Numeric for $t {
            fn add(self, o: Self) -> Self {
                self.wrapping_add(o)
            }
            fn sub(self, o: Self) -> Self {
                self.wrapping_sub(o)
            }
            fn mul(self, o: Self) -> Self {
                self.wrapping_mul(o)
            }
            fn div(self, o: Self) -> Option<Self> {
                if o == 0 { None } else { Some(self.wrapping_div(o)) }
            }
            fn rem(self, o: Self) -> Option<Self> {
                if o == 0 { None } else { Some(self.wrapping_rem(o)) }
            }
            fn bitwise(self, op: BinaryOp, o: Self) -> Option<Self> {
                match op {
                    BinaryOp::BitAnd => Some(self & o),
                    BinaryOp::BitOr => Some(self | o),
                    BinaryOp::BitXor => Some(self ^ o),
                    _ => None,
                }
            }
            fn neg(self) -> Self {
                self.wrapping_neg()
            }
            fn into_const(self) -> ConstValue {
                ConstValue::$variant(self)
            }
        }
    };
}

macro_rules! floating {
    ($t:ty, $variant:ident) => {
        impl Numeric for $t {
            fn add(self, o: Self) -> Self {
                self + o
            }
            fn sub(self, o: Self) -> Self {
                self - o
            }
            fn mul(self, o: Self) -> Self {
                self * o
            }
            fn div(self, o: Self) -> Option<Self> {
                Some(self / o)
            }
            fn rem(self, o: Self) -> Option<Self> {
                Some(self % o)
            }
            fn bitwise(self, _op: BinaryOp, _o: Self) -> Option<Self> {
                None
            }
            fn neg(self) -> Self {
                -self
            }
            fn into_const(self) -> ConstValue {
                ConstValue::$variant(self)
            }
        }
    };
}

integral!(i32, Int);
integral!(i64, Long);
floating!(f32, Float);
floating!(f64, Double);

fn eval<T: Numeric>(op: BinaryOp, a: T, b: T) -> Option<ConstValue> {
    let v = match op {
        BinaryOp::Add => a.add(b),
        BinaryOp::Sub => a.sub(b),
        BinaryOp::Mul => a.mul(b),
        BinaryOp::Div => a.div(b)?,
        BinaryOp::Rem => a.rem(b)?,
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => a.bitwise(op, b)?,
        BinaryOp::Eq => return Some(ConstValue::Boolean(a == b)),
        BinaryOp::Ne => return Some(ConstValue::Boolean(a != b)),
        BinaryOp::Lt => return Some(ConstValue::Boolean(a < b)),
        BinaryOp::Le => return Some(ConstValue::Boolean(a <= b)),
        BinaryOp::Gt => return Some(ConstValue::Boolean(a > b)),
        BinaryOp::Ge => return Some(ConstValue::Boolean(a >= b)),
        _ => return None,
    };
    Some(v.into_const())
}

fn fold_shift(op: BinaryOp, lhs: &ConstValue, rhs: &ConstValue) -> Option<ConstValue> {
    let distance = as_i64(rhs)?;
    match NumericKind::of(lhs)? {
        NumericKind::Int => {
            let v = as_i32(lhs)?;
            let n = (distance & 31) as u32;
            Some(ConstValue::Int(match op {
                BinaryOp::Shl => v.wrapping_shl(n),
                BinaryOp::Shr => v.wrapping_shr(n),
                _ => ((v as u32) >> n) as i32,
            }))
        }
        NumericKind::Long => {
            let v = as_i64(lhs)?;
            let n = (distance & 63) as u32;
            Some(ConstValue::Long(match op {
                BinaryOp::Shl => v.wrapping_shl(n),
                BinaryOp::Shr => v.wrapping_shr(n),
                _ => ((v as u64) >> n) as i64,
            }))
        }
        _ => None,
    }
}

/// Text a constant contributes to a string concatenation
fn concat_text(value: &ConstValue) -> String {
    match value {
        ConstValue::String(s) => s.clone(),
        ConstValue::Char(c) => char::from_u32(u32::from(*c)).map(String::from).unwrap_or_default(),
        ConstValue::Long(v) => v.to_string(),
        ConstValue::Float(v) if v.is_finite() => float_text(&format!("{:e}", v)),
        ConstValue::Double(v) if v.is_finite() => float_text(&format!("{:e}", v)),
        ConstValue::Float(v) => non_finite_text(f64::from(*v)),
        ConstValue::Double(v) => non_finite_text(*v),
        other => other.to_string(),
    }
}

fn non_finite_text(v: f64) -> String {
    if v.is_nan() {
        "NaN"
    } else if v > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
    .to_string()
}

/// `Float.toString`/`Double.toString` layout of the shortest round-trip
/// digits in `sci` (Rust's `{:e}` form, e.g. `-1.25e-4`). Plain decimal for
/// magnitudes in [1e-3, 1e7), computerized scientific notation otherwise.
fn float_text(sci: &str) -> String {
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(m) => ("-", m),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let digits = match digits.trim_end_matches('0') {
        "" => "0",
        d => d,
    };

    if !(-3..7).contains(&exp) {
        let (first, rest) = digits.split_at(1);
        let rest = if rest.is_empty() { "0" } else { rest };
        return format!("{}{}.{}E{}", sign, first, rest, exp);
    }
    if exp < 0 {
        return format!("{}0.{}{}", sign, "0".repeat((-exp - 1) as usize), digits);
    }
    let point = exp as usize + 1;
    if digits.len() > point {
        let (int, frac) = digits.split_at(point);
        format!("{}{}.{}", sign, int, frac)
    } else {
        format!("{}{}{}.0", sign, digits, "0".repeat(point - digits.len()))
    }
}

/// Fold `lhs op rhs`; `None` when the operation does not fold
pub fn fold_binary(op: BinaryOp, lhs: &ConstValue, rhs: &ConstValue) -> Option<ConstValue> {
    if op == BinaryOp::Add && (lhs.as_str().is_some() || rhs.as_str().is_some()) {
        return Some(ConstValue::String(format!("{}{}", concat_text(lhs), concat_text(rhs))));
    }

    if let (Some(a), Some(b)) = (lhs.as_bool(), rhs.as_bool()) {
        return Some(ConstValue::Boolean(match op {
            BinaryOp::And | BinaryOp::BitAnd => a && b,
            BinaryOp::Or | BinaryOp::BitOr => a || b,
            BinaryOp::BitXor | BinaryOp::Ne => a != b,
            BinaryOp::Eq => a == b,
            _ => return None,
        }));
    }

    if op.is_shift() {
        return fold_shift(op, lhs, rhs);
    }

    match NumericKind::promote(NumericKind::of(lhs)?, NumericKind::of(rhs)?) {
        NumericKind::Int => eval(op, as_i32(lhs)?, as_i32(rhs)?),
        NumericKind::Long => eval(op, as_i64(lhs)?, as_i64(rhs)?),
        NumericKind::Float => eval(op, as_f32(lhs)?, as_f32(rhs)?),
        NumericKind::Double => eval(op, as_f64(lhs)?, as_f64(rhs)?),
    }
}

/// Fold a unary operator applied to a constant
pub fn fold_unary(op: UnaryOp, value: &ConstValue) -> Option<ConstValue> {
    if op == UnaryOp::Not {
        return value.as_bool().map(|b| ConstValue::Boolean(!b));
    }
    let kind = NumericKind::of(value)?;
    match (op, kind) {
        (UnaryOp::Plus, NumericKind::Int) => Some(ConstValue::Int(as_i32(value)?)),
        (UnaryOp::Plus, _) => Some(value.clone()),
        (UnaryOp::Neg, NumericKind::Int) => Some(as_i32(value)?.neg().into_const()),
        (UnaryOp::Neg, NumericKind::Long) => Some(as_i64(value)?.neg().into_const()),
        (UnaryOp::Neg, NumericKind::Float) => Some(as_f32(value)?.neg().into_const()),
        (UnaryOp::Neg, NumericKind::Double) => Some(as_f64(value)?.neg().into_const()),
        (UnaryOp::BitNot, NumericKind::Int) => Some(ConstValue::Int(!as_i32(value)?)),
        (UnaryOp::BitNot, NumericKind::Long) => Some(ConstValue::Long(!as_i64(value)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion() {
        let b = ConstValue::Byte(3);
        let s = ConstValue::Short(4);
        assert_eq!(fold_binary(BinaryOp::Add, &b, &s), Some(ConstValue::Int(7)));
        assert_eq!(
            fold_binary(BinaryOp::Mul, &ConstValue::Int(3), &ConstValue::Long(5)),
            Some(ConstValue::Long(15))
        );
        assert_eq!(
            fold_binary(BinaryOp::Add, &ConstValue::Long(1), &ConstValue::Float(0.5)),
            Some(ConstValue::Float(1.5))
        );
        assert_eq!(
            fold_binary(BinaryOp::Add, &ConstValue::Char(97), &ConstValue::Int(1)),
            Some(ConstValue::Int(98))
        );
    }

    #[test]
    fn test_integer_division_by_zero_does_not_fold() {
        assert_eq!(fold_binary(BinaryOp::Div, &ConstValue::Int(1), &ConstValue::Int(0)), None);
        assert_eq!(fold_binary(BinaryOp::Rem, &ConstValue::Long(1), &ConstValue::Long(0)), None);
        assert_eq!(
            fold_binary(BinaryOp::Div, &ConstValue::Double(1.0), &ConstValue::Double(0.0)),
            Some(ConstValue::Double(f64::INFINITY))
        );
        assert_eq!(
            fold_binary(BinaryOp::Div, &ConstValue::Int(i32::MIN), &ConstValue::Int(-1)),
            Some(ConstValue::Int(i32::MIN))
        );
    }

    #[test]
    fn test_shift_masks_distance() {
        assert_eq!(fold_binary(BinaryOp::Shl, &ConstValue::Int(1), &ConstValue::Int(33)), Some(ConstValue::Int(2)));
        assert_eq!(
            fold_binary(BinaryOp::Shl, &ConstValue::Long(1), &ConstValue::Int(33)),
            Some(ConstValue::Long(1 << 33))
        );
        // the left operand keeps its own kind even with a long distance
        assert_eq!(fold_binary(BinaryOp::Shl, &ConstValue::Int(1), &ConstValue::Long(2)), Some(ConstValue::Int(4)));
        assert_eq!(
            fold_binary(BinaryOp::UShr, &ConstValue::Int(-1), &ConstValue::Int(28)),
            Some(ConstValue::Int(15))
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            fold_binary(BinaryOp::Add, &ConstValue::String("a".into()), &ConstValue::Int(1)),
            Some(ConstValue::String("a1".into()))
        );
        assert_eq!(
            fold_binary(BinaryOp::Add, &ConstValue::Double(2.0), &ConstValue::String("x".into())),
            Some(ConstValue::String("2.0x".into()))
        );
    }

    fn concat(value: ConstValue) -> Option<ConstValue> {
        fold_binary(BinaryOp::Add, &ConstValue::String("x".into()), &value)
    }

    #[test]
    fn test_float_concatenation_uses_float_digits() {
        assert_eq!(concat(ConstValue::Float(0.1)), Some(ConstValue::String("x0.1".into())));
        assert_eq!(concat(ConstValue::Float(1.5)), Some(ConstValue::String("x1.5".into())));
        assert_eq!(concat(ConstValue::Double(0.1)), Some(ConstValue::String("x0.1".into())));
    }

    #[test]
    fn test_float_concatenation_switches_to_exponent_form() {
        assert_eq!(concat(ConstValue::Double(1.0e10)), Some(ConstValue::String("x1.0E10".into())));
        assert_eq!(concat(ConstValue::Double(1.0e-4)), Some(ConstValue::String("x1.0E-4".into())));
        assert_eq!(concat(ConstValue::Double(1.0e7)), Some(ConstValue::String("x1.0E7".into())));
        assert_eq!(concat(ConstValue::Double(-1.25e-5)), Some(ConstValue::String("x-1.25E-5".into())));
        assert_eq!(concat(ConstValue::Float(3.0e10)), Some(ConstValue::String("x3.0E10".into())));
    }

    #[test]
    fn test_float_concatenation_decimal_range() {
        assert_eq!(concat(ConstValue::Double(0.001)), Some(ConstValue::String("x0.001".into())));
        assert_eq!(concat(ConstValue::Double(100.0)), Some(ConstValue::String("x100.0".into())));
        assert_eq!(concat(ConstValue::Double(1234567.0)), Some(ConstValue::String("x1234567.0".into())));
        assert_eq!(concat(ConstValue::Double(12.25)), Some(ConstValue::String("x12.25".into())));
        assert_eq!(concat(ConstValue::Double(0.0)), Some(ConstValue::String("x0.0".into())));
        assert_eq!(concat(ConstValue::Double(-0.0)), Some(ConstValue::String("x-0.0".into())));
        assert_eq!(concat(ConstValue::Float(f32::NAN)), Some(ConstValue::String("xNaN".into())));
        assert_eq!(concat(ConstValue::Double(f64::NEG_INFINITY)), Some(ConstValue::String("x-Infinity".into())));
    }

    #[test]
    fn test_comparisons_and_booleans() {
        assert_eq!(fold_binary(BinaryOp::Lt, &ConstValue::Int(1), &ConstValue::Long(2)), Some(ConstValue::Boolean(true)));
        assert_eq!(
            fold_binary(BinaryOp::And, &ConstValue::Boolean(true), &ConstValue::Boolean(false)),
            Some(ConstValue::Boolean(false))
        );
        assert_eq!(fold_unary(UnaryOp::Not, &ConstValue::Boolean(false)), Some(ConstValue::Boolean(true)));
        assert_eq!(fold_unary(UnaryOp::Neg, &ConstValue::Short(5)), Some(ConstValue::Int(-5)));
        assert_eq!(fold_unary(UnaryOp::BitNot, &ConstValue::Float(1.0)), None);
    }
}
