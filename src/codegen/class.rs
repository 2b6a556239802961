//! Generated class model handed to the class-file writer.

use crate::ast::{method_descriptor, Modifier, TypeRef, ValueKind};
use crate::codegen::code::{Code, MethodBody};
use crate::consts;
use crate::error::Result;

/// Access flags
pub mod access_flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_PROTECTED: u16 = 0x0004;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_SUPER: u16 = 0x0020;
    pub const ACC_SYNCHRONIZED: u16 = 0x0020;
    pub const ACC_BRIDGE: u16 = 0x0040;
    pub const ACC_VARARGS: u16 = 0x0080;
    pub const ACC_NATIVE: u16 = 0x0100;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;

    /// Mask of the accessibility bits
    pub const ACCESS_MASK: u16 = ACC_PUBLIC | ACC_PRIVATE | ACC_PROTECTED;
}

use access_flags::*;

pub fn modifiers_to_flags(modifiers: &[Modifier]) -> u16 {
    let mut flags = 0;
    for modifier in modifiers {
        match modifier {
            Modifier::Public => flags |= ACC_PUBLIC,
            Modifier::Private => flags |= ACC_PRIVATE,
            Modifier::Protected => flags |= ACC_PROTECTED,
            Modifier::Static => flags |= ACC_STATIC,
            Modifier::Final => flags |= ACC_FINAL,
            Modifier::Abstract => flags |= ACC_ABSTRACT,
            Modifier::Native => flags |= ACC_NATIVE,
            Modifier::Synchronized => flags |= ACC_SYNCHRONIZED,
        }
    }
    flags
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub access_flags: u16,
}

impl FieldDef {
    pub fn new(name: &str, ty: TypeRef, access_flags: u16) -> Self {
        Self { name: name.to_string(), ty, access_flags }
    }
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub access_flags: u16,
    pub params: Vec<TypeRef>,
    pub return_type: TypeRef,
    /// `None` for abstract and native methods
    pub body: Option<MethodBody>,
}

impl MethodDef {
    pub fn descriptor(&self) -> String {
        method_descriptor(&self.params, &self.return_type)
    }

    pub fn is_bridge(&self) -> bool {
        self.access_flags & ACC_BRIDGE != 0
    }

    /// No-arg constructor of a synthetic class
    pub fn default_constructor() -> Result<MethodDef> {
        let mut code = Code::new(false);
        let this = code.new_temp(&TypeRef::object());
        code.emit_load(ValueKind::Reference, this);
        code.emit_invoke(&consts::OBJECT_INIT);
        code.emit_return(ValueKind::Void);
        Ok(MethodDef {
            name: consts::CONSTRUCTOR_NAME.to_string(),
            access_flags: ACC_PUBLIC,
            params: Vec::new(),
            return_type: TypeRef::void(),
            body: Some(code.finish()?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub super_name: String,
    pub interfaces: Vec<String>,
    pub access_flags: u16,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    /// Synthetic classes produced while compiling this one
    pub nested: Vec<ClassDef>,
}

impl ClassDef {
    pub fn new(name: &str, super_name: &str, access_flags: u16) -> Self {
        Self {
            name: name.to_string(),
            super_name: super_name.to_string(),
            interfaces: Vec::new(),
            access_flags,
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodDef> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn nested_class(&self, name: &str) -> Option<&ClassDef> {
        self.nested.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_to_flags() {
        let flags = modifiers_to_flags(&[Modifier::Public, Modifier::Static, Modifier::Final]);
        assert_eq!(flags, ACC_PUBLIC | ACC_STATIC | ACC_FINAL);
        assert_eq!(flags & ACCESS_MASK, ACC_PUBLIC);
    }

    #[test]
    fn test_default_constructor_chains_to_object() {
        let ctor = MethodDef::default_constructor().unwrap();
        assert_eq!(ctor.descriptor(), "()V");
        let body = ctor.body.unwrap();
        assert_eq!(body.instructions.len(), 3);
        assert_eq!(body.max_locals, 1);
    }
}
