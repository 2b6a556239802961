//! Resolved type and member references attached to the tree by the validator.

use std::fmt;

/// Primitive JVM types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveType {
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Short => 'S',
            PrimitiveType::Char => 'C',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
            PrimitiveType::Void => 'V',
        }
    }
}

/// Computational kind of a value on the operand stack or in a local slot.
/// Selects the typed load/store/return opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
    Void,
}

impl ValueKind {
    /// Number of local slots / stack words a value of this kind occupies
    pub fn width(self) -> u16 {
        match self {
            ValueKind::Long | ValueKind::Double => 2,
            ValueKind::Void => 0,
            _ => 1,
        }
    }
}

/// A resolved type.
///
/// Class names use the internal slash form (`java/lang/String`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(PrimitiveType),
    Class { name: String, args: Vec<TypeRef> },
    TypeVar { name: String, bound: Option<Box<TypeRef>> },
    Array(Box<TypeRef>),
}

pub const OBJECT: &str = "java/lang/Object";
pub const STRING: &str = "java/lang/String";

impl TypeRef {
    pub fn int() -> Self {
        TypeRef::Primitive(PrimitiveType::Int)
    }

    pub fn long() -> Self {
        TypeRef::Primitive(PrimitiveType::Long)
    }

    pub fn boolean() -> Self {
        TypeRef::Primitive(PrimitiveType::Boolean)
    }

    pub fn void() -> Self {
        TypeRef::Primitive(PrimitiveType::Void)
    }

    pub fn object() -> Self {
        Self::class(OBJECT)
    }

    pub fn string() -> Self {
        Self::class(STRING)
    }

    pub fn class(name: &str) -> Self {
        TypeRef::Class { name: name.to_string(), args: Vec::new() }
    }

    pub fn generic(name: &str, args: Vec<TypeRef>) -> Self {
        TypeRef::Class { name: name.to_string(), args }
    }

    pub fn type_var(name: &str, bound: Option<TypeRef>) -> Self {
        TypeRef::TypeVar { name: name.to_string(), bound: bound.map(Box::new) }
    }

    pub fn array_of(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Primitive(PrimitiveType::Void))
    }

    pub fn is_reference(&self) -> bool {
        !matches!(self, TypeRef::Primitive(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, TypeRef::Class { name, .. } if name == STRING)
    }

    pub fn element_type(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(e) => Some(e),
            _ => None,
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            TypeRef::Primitive(p) => match p {
                PrimitiveType::Long => ValueKind::Long,
                PrimitiveType::Float => ValueKind::Float,
                PrimitiveType::Double => ValueKind::Double,
                PrimitiveType::Void => ValueKind::Void,
                _ => ValueKind::Int,
            },
            _ => ValueKind::Reference,
        }
    }

    /// Type erasure: type variables become the erasure of their bound
    /// (or `Object`), parameterized classes lose their arguments.
    pub fn erasure(&self) -> TypeRef {
        match self {
            TypeRef::Primitive(_) => self.clone(),
            TypeRef::Class { name, .. } => TypeRef::class(name),
            TypeRef::TypeVar { bound, .. } => match bound {
                Some(b) => b.erasure(),
                None => TypeRef::object(),
            },
            TypeRef::Array(e) => TypeRef::Array(Box::new(e.erasure())),
        }
    }

    /// Field descriptor of the erased type
    pub fn descriptor(&self) -> String {
        match self.erasure() {
            TypeRef::Primitive(p) => p.descriptor().to_string(),
            TypeRef::Class { name, .. } => format!("L{};", name),
            TypeRef::Array(e) => format!("[{}", e.descriptor()),
            TypeRef::TypeVar { .. } => unreachable!("erasure never yields a type variable"),
        }
    }

    /// Internal name used by `checkcast`/`new`/`anewarray`
    pub fn internal_name(&self) -> String {
        match self.erasure() {
            TypeRef::Class { name, .. } => name,
            other => other.descriptor(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(p) => write!(f, "{}", format!("{:?}", p).to_lowercase()),
            TypeRef::Class { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
            TypeRef::TypeVar { name, .. } => write!(f, "{}", name),
            TypeRef::Array(e) => write!(f, "{}[]", e),
        }
    }
}

/// How a method is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Static,
    Virtual,
    Interface,
    Special,
}

/// A resolved method binding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
    pub params: Vec<TypeRef>,
    pub ret: TypeRef,
    pub invoke: InvokeKind,
}

impl MethodRef {
    pub fn new(owner: &str, name: &str, params: Vec<TypeRef>, ret: TypeRef, invoke: InvokeKind) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            params,
            ret,
            invoke,
        }
    }

    /// Erased method descriptor, e.g. `(Ljava/lang/Object;I)V`
    pub fn descriptor(&self) -> String {
        method_descriptor(&self.params, &self.ret)
    }

    /// Stack words consumed by the arguments (receiver excluded)
    pub fn arg_words(&self) -> u16 {
        self.params.iter().map(|p| p.value_kind().width()).sum()
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor())
    }
}

pub fn method_descriptor(params: &[TypeRef], ret: &TypeRef) -> String {
    let mut d = String::from("(");
    for p in params {
        d.push_str(&p.descriptor());
    }
    d.push(')');
    d.push_str(&ret.descriptor());
    d
}

/// A resolved field binding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
    pub ty: TypeRef,
    pub is_static: bool,
}

impl FieldRef {
    pub fn new(owner: &str, name: &str, ty: TypeRef, is_static: bool) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            ty,
            is_static,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.ty.descriptor())
    }
}

/// A compile-time constant value
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Boolean(bool),
    Char(u16),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Null,
}

impl ConstValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value usable as a switch key (byte/short/char/int)
    pub fn as_switch_key(&self) -> Option<i32> {
        match *self {
            ConstValue::Byte(v) => Some(v as i32),
            ConstValue::Short(v) => Some(v as i32),
            ConstValue::Char(v) => Some(v as i32),
            ConstValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            ConstValue::Long(_) => ValueKind::Long,
            ConstValue::Float(_) => ValueKind::Float,
            ConstValue::Double(_) => ValueKind::Double,
            ConstValue::String(_) | ConstValue::Null => ValueKind::Reference,
            _ => ValueKind::Int,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Boolean(b) => write!(f, "{}", b),
            ConstValue::Char(c) => match char::from_u32(*c as u32) {
                Some(ch) => write!(f, "'{}'", ch),
                None => write!(f, "'\\u{:04x}'", c),
            },
            ConstValue::Byte(v) => write!(f, "{}", v),
            ConstValue::Short(v) => write!(f, "{}", v),
            ConstValue::Int(v) => write!(f, "{}", v),
            ConstValue::Long(v) => write!(f, "{}L", v),
            ConstValue::Float(v) => write!(f, "{}f", v),
            ConstValue::Double(v) => write!(f, "{}d", v),
            ConstValue::String(s) => write!(f, "{:?}", s),
            ConstValue::Null => write!(f, "null"),
        }
    }
}
