//! Code generation for the annotated tree.
//!
//! [`generate_class`] is the entry point: it synthesizes erasure bridges,
//! lowers every method body to a linear instruction stream and collects the
//! synthetic members (switch maps, closure scopes, iterator state classes)
//! produced along the way.

pub mod class;
pub mod code;
pub mod const_fold;
pub mod expr;
pub mod gen;
pub mod gen_switch;
pub mod gen_try;
pub mod iterator;
pub mod label;
pub mod lambda;
pub mod method_context;
pub mod opcodes;
pub mod trans_types;

pub use class::{access_flags, ClassDef, FieldDef, MethodDef};
pub use code::{ExceptionTableEntry, Instruction, LocalVarEntry, MethodBody};
pub use expr::{CondTargets, ExpressionGenerator, StackExprGen};
pub use label::Label;
pub use method_context::MethodGenerationContext;
pub use opcodes::Opcode;

use crate::ast::*;
use crate::config::Config;
use crate::error::{Error, Result};
use class::{access_flags::*, modifiers_to_flags};
use gen::{ClassContext, Gen};

/// Generate a class and its synthetic companions from a validated declaration
pub fn generate_class(class: &ClassDecl, exprs: &mut dyn ExpressionGenerator, config: &Config) -> Result<ClassDef> {
    log::debug!("generating class {} ({} methods)", class.name, class.methods.len());

    let bridges = trans_types::synthesize_bridges(class)?;
    let mut cc = ClassContext::new(&class.name, config.clone());
    let mut def = ClassDef::new(&class.name, &class.super_name, modifiers_to_flags(&class.modifiers) | ACC_SUPER);
    def.interfaces = class.interfaces.clone();

    {
        let mut gen = Gen::new(exprs, &mut cc);
        for method in &class.methods {
            def.methods.push(generate_method(&mut gen, class, method, config)?);
        }
    }
    def.methods.extend(bridges);
    def.fields.extend(cc.fields);

    // lambda bodies go to whichever class hosts them
    def.nested = cc.nested;
    for (owner, method) in cc.methods {
        if owner == def.name {
            def.methods.push(method);
            continue;
        }
        let host = def
            .nested
            .iter_mut()
            .find(|c| c.name == owner)
            .ok_or_else(|| Error::internal(format!("synthetic method {} has no host class {}", method.name, owner)))?;
        host.methods.push(method);
    }

    if config.debug_code {
        dump_class(&def);
    }
    Ok(def)
}

fn generate_method(gen: &mut Gen<'_>, class: &ClassDecl, method: &MethodDecl, config: &Config) -> Result<MethodDef> {
    let mut access_flags = modifiers_to_flags(&method.modifiers);
    if method.is_varargs {
        access_flags |= ACC_VARARGS;
    }
    let params = method.parameters.iter().map(|p| p.ty.erasure()).collect();
    let return_type = method.return_type.erasure();

    let body = match (&method.body, &method.iterator_element) {
        (None, _) => None,
        (Some(body), Some(element)) => Some(gen.gen_iterator_method(method, element, body)?),
        (Some(body), None) => {
            log::trace!("lowering {}.{}", class.name, method.name);
            let mut cx = MethodGenerationContext::new(
                &class.name,
                &method.name,
                method.is_static(),
                method.return_type.clone(),
                config.var_debug_info,
            );
            cx.reserve_this();
            for p in &method.parameters {
                cx.declare_local(p);
            }
            gen.prepare_lambdas(&mut cx, body, &method.parameters)?;
            gen.gen_method_body(&mut cx, body)?;
            Some(cx.code.finish()?)
        }
    };

    Ok(MethodDef { name: method.name.clone(), access_flags, params, return_type, body })
}

fn dump_class(def: &ClassDef) {
    for method in &def.methods {
        if let Some(body) = &method.body {
            log::debug!("{}.{}{}\n{}", def.name, method.name, method.descriptor(), body);
        }
    }
    for nested in &def.nested {
        dump_class(nested);
    }
}
