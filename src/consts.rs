//! Shared constants and well-known runtime members

use crate::ast::{InvokeKind, MethodRef, PrimitiveType, TypeRef};
use once_cell::sync::Lazy;

/// A string switch with at least this many sections dispatches through a
/// cached name-to-ordinal map instead of chained `equals` tests.
pub const STRING_SWITCH_THRESHOLD: usize = 7;

// Synthetic member and class names

/// Static field caching a string switch map: `$switch$map$<n>`
pub const SWITCH_MAP_PREFIX: &str = "$switch$map$";
/// Iterator state class: `<Outer>$Iterator$<n>`
pub const ITERATOR_CLASS_INFIX: &str = "$Iterator$";
/// Closure scope class: `<Outer>$Scope$<n>`
pub const SCOPE_CLASS_INFIX: &str = "$Scope$";
/// Compiled lambda body: `lambda$<method>$<n>`
pub const LAMBDA_METHOD_PREFIX: &str = "lambda$";
/// Back reference to the enclosing instance
pub const OUTER_THIS_FIELD: &str = "this$0";

pub const STATE_FIELD: &str = "state";
pub const CURRENT_FIELD: &str = "current";
pub const HAS_NEXT_FIELD: &str = "hasNext";
pub const MOVE_NEXT_METHOD: &str = "moveNext";

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const CLASS_INIT_NAME: &str = "<clinit>";

pub const HASH_MAP: &str = "java/util/HashMap";
pub const INTEGER: &str = "java/lang/Integer";
pub const ITERATOR: &str = "java/util/Iterator";
pub const ITERABLE: &str = "java/lang/Iterable";
pub const NO_SUCH_ELEMENT: &str = "java/util/NoSuchElementException";
pub const THROWABLE: &str = "java/lang/Throwable";

pub static OBJECT_INIT: Lazy<MethodRef> =
    Lazy::new(|| MethodRef::new(crate::ast::OBJECT, CONSTRUCTOR_NAME, vec![], TypeRef::void(), InvokeKind::Special));

pub static STRING_EQUALS: Lazy<MethodRef> = Lazy::new(|| {
    MethodRef::new(crate::ast::STRING, "equals", vec![TypeRef::object()], TypeRef::boolean(), InvokeKind::Virtual)
});

pub static HASH_MAP_INIT: Lazy<MethodRef> =
    Lazy::new(|| MethodRef::new(HASH_MAP, CONSTRUCTOR_NAME, vec![], TypeRef::void(), InvokeKind::Special));

pub static HASH_MAP_GET: Lazy<MethodRef> =
    Lazy::new(|| MethodRef::new(HASH_MAP, "get", vec![TypeRef::object()], TypeRef::object(), InvokeKind::Virtual));

pub static HASH_MAP_PUT: Lazy<MethodRef> = Lazy::new(|| {
    MethodRef::new(
        HASH_MAP,
        "put",
        vec![TypeRef::object(), TypeRef::object()],
        TypeRef::object(),
        InvokeKind::Virtual,
    )
});

pub static INTEGER_VALUE_OF: Lazy<MethodRef> =
    Lazy::new(|| MethodRef::new(INTEGER, "valueOf", vec![TypeRef::int()], TypeRef::class(INTEGER), InvokeKind::Static));

/// `valueOf` of the wrapper class that boxes `prim`
pub fn box_method(prim: PrimitiveType) -> Option<MethodRef> {
    let wrapper = match prim {
        PrimitiveType::Boolean => "java/lang/Boolean",
        PrimitiveType::Byte => "java/lang/Byte",
        PrimitiveType::Short => "java/lang/Short",
        PrimitiveType::Char => "java/lang/Character",
        PrimitiveType::Int => INTEGER,
        PrimitiveType::Long => "java/lang/Long",
        PrimitiveType::Float => "java/lang/Float",
        PrimitiveType::Double => "java/lang/Double",
        PrimitiveType::Void => return None,
    };
    Some(MethodRef::new(wrapper, "valueOf", vec![TypeRef::Primitive(prim)], TypeRef::class(wrapper), InvokeKind::Static))
}

pub static INTEGER_INT_VALUE: Lazy<MethodRef> =
    Lazy::new(|| MethodRef::new(INTEGER, "intValue", vec![], TypeRef::int(), InvokeKind::Virtual));

pub static NO_SUCH_ELEMENT_INIT: Lazy<MethodRef> =
    Lazy::new(|| MethodRef::new(NO_SUCH_ELEMENT, CONSTRUCTOR_NAME, vec![], TypeRef::void(), InvokeKind::Special));
