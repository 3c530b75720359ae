//! Class-level emission: header, field declarations, the synthesized
//! default constructor, and per-method lowering in declaration order.

use crate::ir::{ClassUnit, Type};

use super::codegen::MethodGenerator;
use super::{GenError, TAB};

const DEFAULT_SUPER: &str = "java/lang/Object";

/// Read-only class context shared by every lowering stage: the class name,
/// the import table, and descriptor rendering.
#[derive(Clone, Copy)]
pub(crate) struct ClassContext<'a> {
    pub unit: &'a ClassUnit,
}

impl<'a> ClassContext<'a> {
    /// Resolve the owner class used in call and field instructions.
    ///
    /// `this` and the class's own name resolve to the compiled class; a
    /// simple name in the import table resolves to its qualified form.
    /// Anything else is emitted as written, which is only valid if the
    /// upstream pass already supplied an internal name.
    pub fn resolve_owner(&self, name: &str) -> String {
        if name == "this" || name == self.unit.name {
            return self.unit.name.clone();
        }
        if let Some(qualified) = self.unit.imports.get(name) {
            return qualified.replace('.', "/");
        }
        name.to_string()
    }

    /// Render a type as its field/parameter descriptor.
    pub fn descriptor(&self, ty: &Type) -> Result<String, GenError> {
        match ty {
            Type::Int => Ok("I".to_string()),
            Type::Boolean => Ok("Z".to_string()),
            Type::Str => Ok("Ljava/lang/String;".to_string()),
            Type::Void => Ok("V".to_string()),
            Type::Array(inner) => match inner.as_ref() {
                Type::Array(_) => Err(GenError::descriptor(
                    "multi-dimensional arrays are not supported",
                )),
                Type::Void => Err(GenError::descriptor("array of void")),
                element => Ok(format!("[{}", self.descriptor(element)?)),
            },
            Type::Object(name) => Ok(format!("L{};", self.resolve_owner(name))),
            Type::This => Ok(format!("L{};", self.unit.name)),
        }
    }
}

pub(crate) struct ClassEmitter<'a> {
    ctx: ClassContext<'a>,
    /// Class-scoped counter for boolean-materialization labels. Strictly
    /// increasing across the methods of one class, never shared between
    /// classes.
    jump_index: u32,
}

impl<'a> ClassEmitter<'a> {
    pub fn new(unit: &'a ClassUnit) -> Self {
        ClassEmitter {
            ctx: ClassContext { unit },
            jump_index: 0,
        }
    }

    pub fn emit(mut self) -> Result<String, GenError> {
        let unit = self.ctx.unit;
        let superclass = unit.super_name.as_deref().unwrap_or(DEFAULT_SUPER);

        let mut out = String::new();
        out.push_str(&format!(".class public {}\n", unit.name));
        out.push_str(&format!(".super {}\n\n", superclass));

        for field in &unit.fields {
            let desc = self.ctx.descriptor(&field.ty)?;
            out.push_str(&format!(
                ".field {}{} {}\n",
                field.flags.keywords(),
                field.name,
                desc
            ));
        }
        if !unit.fields.is_empty() {
            out.push('\n');
        }

        out.push_str(&default_constructor(superclass));

        // Constructor-flagged IR methods are replaced by the synthesized
        // default constructor above.
        for method in &unit.methods {
            if method.is_constructor {
                continue;
            }
            let code = MethodGenerator::new(self.ctx, method, &mut self.jump_index).generate()?;
            out.push_str(&code);
        }

        Ok(out)
    }
}

fn default_constructor(superclass: &str) -> String {
    let mut out = String::new();
    out.push_str(";default constructor\n");
    out.push_str(".method public <init>()V\n");
    out.push_str(&format!("{}.limit stack 1\n", TAB));
    out.push_str(&format!("{}.limit locals 1\n", TAB));
    out.push_str(&format!("{}aload_0\n", TAB));
    out.push_str(&format!("{}invokespecial {}/<init>()V\n", TAB, superclass));
    out.push_str(&format!("{}return\n", TAB));
    out.push_str(".end method\n");
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn unit_with_imports(imports: &[(&str, &str)]) -> ClassUnit {
        ClassUnit {
            name: "Test".into(),
            super_name: None,
            fields: Vec::new(),
            methods: Vec::new(),
            imports: imports
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn this_and_own_name_resolve_to_the_class() {
        let unit = unit_with_imports(&[]);
        let ctx = ClassContext { unit: &unit };
        assert_eq!(ctx.resolve_owner("this"), "Test");
        assert_eq!(ctx.resolve_owner("Test"), "Test");
    }

    #[test]
    fn imported_simple_names_qualify() {
        let unit = unit_with_imports(&[("List", "java.util.List")]);
        let ctx = ClassContext { unit: &unit };
        assert_eq!(ctx.resolve_owner("List"), "java/util/List");
    }

    #[test]
    fn unknown_names_pass_through() {
        let unit = unit_with_imports(&[]);
        let ctx = ClassContext { unit: &unit };
        assert_eq!(ctx.resolve_owner("Foo"), "Foo");
    }

    #[test]
    fn descriptors_cover_the_type_set() {
        let unit = unit_with_imports(&[("Other", "pkg.Other")]);
        let ctx = ClassContext { unit: &unit };
        assert_eq!(ctx.descriptor(&Type::Int).unwrap(), "I");
        assert_eq!(ctx.descriptor(&Type::Boolean).unwrap(), "Z");
        assert_eq!(ctx.descriptor(&Type::Str).unwrap(), "Ljava/lang/String;");
        assert_eq!(ctx.descriptor(&Type::Void).unwrap(), "V");
        assert_eq!(
            ctx.descriptor(&Type::Array(Box::new(Type::Int))).unwrap(),
            "[I"
        );
        assert_eq!(
            ctx.descriptor(&Type::Object("Other".into())).unwrap(),
            "Lpkg/Other;"
        );
    }

    #[test]
    fn nested_array_descriptor_is_rejected() {
        let unit = unit_with_imports(&[]);
        let ctx = ClassContext { unit: &unit };
        let nested = Type::Array(Box::new(Type::Array(Box::new(Type::Int))));
        assert!(matches!(
            ctx.descriptor(&nested),
            Err(GenError::MalformedDescriptor { .. })
        ));
    }
}
