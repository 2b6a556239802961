//! Erasure bridges.
//!
//! An override whose erased signature differs from the erasure of the
//! method it overrides needs a forwarding method carrying the overridden
//! erased signature. Each bridge loads the receiver and the arguments
//! (casting where the erased reference types differ), invokes the
//! overriding method and returns its result.

use crate::ast::*;
use crate::codegen::class::{access_flags::*, modifiers_to_flags, MethodDef};
use crate::codegen::code::Code;
use crate::error::{Error, Result};

/// The parts of a method that decide whether two methods clash under erasure
#[derive(Debug, Clone, PartialEq)]
struct ErasedKey {
    name: String,
    params: Vec<TypeRef>,
    ret: TypeRef,
    /// Accessibility and varargs bits
    flags: u16,
}

impl ErasedKey {
    fn of(name: &str, params: Vec<TypeRef>, ret: TypeRef, flags: u16) -> Self {
        Self { name: name.to_string(), params, ret, flags: flags & (ACCESS_MASK | ACC_VARARGS) }
    }
}

fn method_flags(method: &MethodDecl) -> u16 {
    let flags = modifiers_to_flags(&method.modifiers);
    if method.is_varargs {
        flags | ACC_VARARGS
    } else {
        flags
    }
}

fn erased_params(method: &MethodDecl) -> Vec<TypeRef> {
    method.parameters.iter().map(|p| p.ty.erasure()).collect()
}

/// Bridges `class` needs, in declaration order of the overriding methods.
/// At most one bridge is produced per distinct erased signature.
pub fn synthesize_bridges(class: &ClassDecl) -> Result<Vec<MethodDef>> {
    let mut existing: Vec<ErasedKey> = class
        .methods
        .iter()
        .map(|m| ErasedKey::of(&m.name, erased_params(m), m.return_type.erasure(), method_flags(m)))
        .collect();
    let mut bridges = Vec::new();

    for method in &class.methods {
        if method.is_static() || method.modifiers.contains(&Modifier::Private) {
            continue;
        }
        let params = erased_params(method);
        let ret = method.return_type.erasure();
        let flags = method_flags(method);

        for overridden in &method.overrides {
            let bridge_params: Vec<TypeRef> = overridden.params.iter().map(TypeRef::erasure).collect();
            let bridge_ret = overridden.ret.erasure();
            if bridge_params.len() != params.len() {
                return Err(Error::internal(format!(
                    "{}.{} overrides {}.{} with a different arity",
                    class.name, method.name, overridden.owner, overridden.name
                )));
            }
            if bridge_params == params && bridge_ret == ret {
                continue;
            }
            let key = ErasedKey::of(&method.name, bridge_params.clone(), bridge_ret.clone(), flags);
            if existing.contains(&key) {
                log::trace!("{}.{}{}: bridge already present", class.name, method.name, method_descriptor(&bridge_params, &bridge_ret));
                continue;
            }

            let bridge = gen_bridge(&class.name, method, &params, &ret, bridge_params, bridge_ret, flags)?;
            log::debug!(
                "bridge {}.{}{} -> {}",
                class.name,
                bridge.name,
                bridge.descriptor(),
                method_descriptor(&params, &ret)
            );
            existing.push(key);
            bridges.push(bridge);
        }
    }
    Ok(bridges)
}

fn gen_bridge(
    owner: &str,
    method: &MethodDecl,
    params: &[TypeRef],
    ret: &TypeRef,
    bridge_params: Vec<TypeRef>,
    bridge_ret: TypeRef,
    flags: u16,
) -> Result<MethodDef> {
    let mut code = Code::new(false);
    let this = code.new_temp(&TypeRef::class(owner));
    let slots: Vec<u16> = bridge_params.iter().map(|t| code.new_temp(t)).collect();

    code.emit_load(ValueKind::Reference, this);
    for ((from, to), slot) in bridge_params.iter().zip(params).zip(slots) {
        code.emit_load(from.value_kind(), slot);
        if from != to {
            if !to.is_reference() {
                return Err(Error::internal(format!(
                    "bridge for {}.{} would convert {} to primitive {}",
                    owner, method.name, from, to
                )));
            }
            code.emit_checkcast(to);
        }
    }
    code.emit_invoke(&MethodRef::new(owner, &method.name, params.to_vec(), ret.clone(), InvokeKind::Virtual));
    code.emit_return(bridge_ret.value_kind());

    Ok(MethodDef {
        name: method.name.clone(),
        access_flags: (flags & (ACCESS_MASK | ACC_VARARGS)) | ACC_BRIDGE | ACC_SYNTHETIC,
        params: bridge_params,
        return_type: bridge_ret,
        body: Some(code.finish()?),
    })
}
