use north_ast as ast;
use north_diagnostics::{Diagnostic, Span};
use north_ir as ir;
use north_lexer::Position;

/// A semantic type: either a primitive wrapper (no declaration behind it) or
/// a user-defined wrapper naming its declaration, with the IR type resolved.
#[derive(Debug, Clone)]
pub struct Type {
    pub decl: Option<String>,
    pub ir: ir::Type,
}

impl Type {
    pub fn primitive(ir: ir::Type) -> Self {
        Self { decl: None, ir }
    }

    pub fn named(name: impl Into<String>, ir: ir::Type) -> Self {
        Self {
            decl: Some(name.into()),
            ir,
        }
    }

    pub fn void() -> Self {
        Self::primitive(ir::Type::Void)
    }

    pub fn i32() -> Self {
        Self::primitive(ir::Type::I32)
    }

    /// Name used when mangling generic instantiations.
    pub fn mangle_name(&self) -> String {
        match &self.decl {
            Some(name) => name.clone(),
            None => self
                .ir
                .to_string()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect(),
        }
    }
}

/// Two user-defined types are equal when their declaration identifiers match;
/// primitives compare by IR type. A primitive compared against a defined type
/// falls back to the IR comparison, so an alias is interchangeable with its
/// target.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        let decls_agree = match (&self.decl, &other.decl) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => true,
        };
        decls_agree && self.ir == other.ir
    }
}

fn span_of(pos: Position) -> Span {
    Span::new(pos.offset, pos.length.max(1))
}

/// The module's type registry: the primitive seed set plus lazily-resolved
/// user declarations.
pub struct TypeTable<'m> {
    module: &'m ast::Module,
}

impl<'m> TypeTable<'m> {
    pub fn new(module: &'m ast::Module) -> Self {
        Self { module }
    }

    pub fn primitive_ir(name: &str) -> Option<ir::Type> {
        Some(match name {
            "void" => ir::Type::Void,
            "i8" => ir::Type::I8,
            "i16" => ir::Type::I16,
            "i32" => ir::Type::I32,
            "i64" => ir::Type::I64,
            "float" => ir::Type::Float,
            "double" => ir::Type::Double,
            "char" => ir::Type::I8,
            _ => return None,
        })
    }

    /// Resolve a type by name, at `pos` for diagnostics.
    pub fn lookup(&self, name: &str, pos: Position) -> Result<Type, Diagnostic> {
        self.lookup_inner(name, pos, 0)
    }

    fn lookup_inner(&self, name: &str, pos: Position, depth: u32) -> Result<Type, Diagnostic> {
        if depth > 32 {
            return Err(Diagnostic::error(
                "E0301",
                format!("recursive type alias involving '{}'", name),
            )
            .with_span(span_of(pos)));
        }

        if let Some(ir) = Self::primitive_ir(name) {
            return Ok(Type::primitive(ir));
        }

        let Some(def) = self.module.types.get(name) else {
            return Err(
                Diagnostic::error("E0301", format!("the type '{}' is undefined", name))
                    .with_span(span_of(pos)),
            );
        };

        let mut ir = match &def.body {
            ast::TypeDefBody::Struct(_) => ir::Type::Struct(def.name.clone()),
            ast::TypeDefBody::Enum(_) => ir::Type::I32,
            ast::TypeDefBody::Alias(target) => {
                let mut inner = self
                    .lookup_inner(&target.name, target.pos, depth + 1)?
                    .ir;
                if target.is_ptr {
                    inner = inner.ptr_to();
                }
                inner
            }
            ast::TypeDefBody::Union(_) | ast::TypeDefBody::Tuple(_) | ast::TypeDefBody::Range(_) => {
                return Err(Diagnostic::error(
                    "E0901",
                    format!(
                        "internal: lowering for the type '{}' is not implemented",
                        name
                    ),
                )
                .with_span(span_of(pos)));
            }
        };
        if def.is_ptr {
            ir = ir.ptr_to();
        }

        Ok(Type::named(name, ir))
    }

    /// Resolve a written type reference, honoring its `*` modifier.
    pub fn type_expr(&self, te: &ast::TypeExpr) -> Result<Type, Diagnostic> {
        let mut ty = self.lookup(&te.name, te.pos)?;
        if te.is_ptr {
            ty.ir = ty.ir.ptr_to();
        }
        Ok(ty)
    }

    /// The struct declaration behind a type name, if it is a struct.
    pub fn struct_decl(&self, name: &str) -> Option<&'m ast::StructDecl> {
        match &self.module.types.get(name)?.body {
            ast::TypeDefBody::Struct(decl) => Some(decl),
            _ => None,
        }
    }

    /// The enum declaration behind a type name, if it is an enum.
    pub fn enum_decl(&self, name: &str) -> Option<&'m ast::EnumDecl> {
        match &self.module.types.get(name)?.body {
            ast::TypeDefBody::Enum(decl) => Some(decl),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_equality_is_by_ir() {
        let a = Type::primitive(ir::Type::I32);
        let b = Type::primitive(ir::Type::I32);
        let c = Type::primitive(ir::Type::I64);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_named_equality_is_by_declaration() {
        let point = Type::named("Point", ir::Type::Struct("Point".into()));
        let point2 = Type::named("Point", ir::Type::Struct("Point".into()));
        let size = Type::named("Size", ir::Type::Struct("Size".into()));
        assert_eq!(point, point2);
        assert_ne!(point, size);
    }

    #[test]
    fn test_alias_is_interchangeable_with_target() {
        let meters = Type::named("Meters", ir::Type::I32);
        let plain = Type::primitive(ir::Type::I32);
        assert_eq!(meters, plain);
        assert_eq!(plain, meters);
    }

    #[test]
    fn test_mangle_names() {
        assert_eq!(Type::primitive(ir::Type::I32).mangle_name(), "i32");
        assert_eq!(
            Type::named("Point", ir::Type::Struct("Point".into())).mangle_name(),
            "Point"
        );
    }
}
