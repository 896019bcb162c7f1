//! Assigns a semantic [`Type`] to every expression. Literal rules are fixed
//! (`INT` is `i32`, `CHAR` is `i8`, `STRING` is `*i8`), identifiers resolve
//! through the scope chain and then the module type table, and a binary
//! expression takes the type of its right operand.

use crate::scope::ScopeStack;
use crate::types::{Type, TypeTable};
use north_ast as ast;
use north_diagnostics::{find_similar_name, Diagnostic, Span};
use north_ir as ir;
use north_lexer::Position;

fn span_of(pos: Position) -> Span {
    Span::new(pos.offset, pos.length.max(1))
}

pub struct InferCx<'a> {
    pub module: &'a ast::Module,
    pub types: &'a TypeTable<'a>,
    pub scopes: &'a ScopeStack,
}

impl<'a> InferCx<'a> {
    pub fn infer_expr(&self, expr: &ast::Expr) -> Result<Type, Diagnostic> {
        match expr {
            ast::Expr::Literal(literal) => self.infer_literal(literal),

            // A binary expression is typed by its right operand.
            ast::Expr::Binary(binary) => self.infer_expr(&binary.rhs),

            ast::Expr::Unary(unary) => {
                let operand = self.infer_expr(&unary.operand)?;
                if unary.op == north_lexer::Token::Mult {
                    if let Some(pointee) = operand.ir.pointee() {
                        return Ok(Type::primitive(pointee.clone()));
                    }
                }
                Ok(operand)
            }

            ast::Expr::Assign(assign) => self.infer_expr(&assign.rhs),

            ast::Expr::Call(call) => self.infer_call(call),

            ast::Expr::Array(array) => {
                let elem = self.infer_expr(&array.values[0])?;
                Ok(Type::primitive(
                    elem.ir.array_of(array.values.len() as u64),
                ))
            }

            ast::Expr::StructInit(init) => self.types.lookup(&init.name, init.pos),

            ast::Expr::ArrayIndex(index) => {
                let target = self.infer_expr(&index.target)?;
                match target.ir.element() {
                    Some(elem) => Ok(Type::primitive(elem.clone())),
                    None => Err(Diagnostic::error(
                        "E0301",
                        "only arrays can be indexed",
                    )
                    .with_span(span_of(index.pos))),
                }
            }

            ast::Expr::Qualified(qualified) => self.infer_qualified(qualified),

            // An if-expression evaluates to the comparison fed into its phi.
            ast::Expr::If(_) => Ok(Type::primitive(ir::Type::I1)),
            ast::Expr::For(_) | ast::Expr::While(_) => Ok(Type::i32()),

            ast::Expr::Var(var) => self.infer_var(var),

            ast::Expr::Range(range) => Err(Diagnostic::error(
                "E0108",
                "a range is only valid inside a for expression",
            )
            .with_span(span_of(range.pos))),
        }
    }

    /// A variable declaration is typed by its initializer when it has one,
    /// by its annotation otherwise; the declared-versus-inferred agreement
    /// check happens when the declaration is lowered.
    pub fn infer_var(&self, var: &ast::VarDecl) -> Result<Type, Diagnostic> {
        if let Some(value) = &var.value {
            return self.infer_expr(value);
        }
        if let Some(ty) = &var.ty {
            return self.types.type_expr(ty);
        }
        Err(Diagnostic::error(
            "E0301",
            format!("cannot infer a type for `{}`", var.name),
        )
        .with_span(span_of(var.pos)))
    }

    fn infer_literal(&self, literal: &ast::Literal) -> Result<Type, Diagnostic> {
        match literal {
            ast::Literal::Int { .. } => Ok(Type::i32()),
            ast::Literal::Char { .. } => Ok(Type::primitive(ir::Type::I8)),
            ast::Literal::Str { .. } => Ok(Type::primitive(ir::Type::I8.ptr_to())),
            ast::Literal::Nil { .. } => Ok(Type::i32()),
            ast::Literal::Ident { pos, name } => {
                if let Some(binding) = self.scopes.lookup(name) {
                    return Ok(binding.ty.clone());
                }
                if let Ok(ty) = self.types.lookup(name, *pos) {
                    return Ok(ty);
                }
                Err(self.unknown_symbol(name, *pos))
            }
        }
    }

    fn infer_call(&self, call: &ast::CallExpr) -> Result<Type, Diagnostic> {
        let Some(decl) = self.module.get_fn(call) else {
            return Err(Diagnostic::error("E0401", "unknown function referenced")
                .with_span(span_of(call.pos)));
        };

        let Some(ret) = &decl.ret else {
            return Ok(Type::void());
        };

        // A generic return type is resolved from the call site: find an
        // argument declared with the same type parameter and take the type
        // of the matching call expression.
        if decl.generics.iter().any(|g| g.name == ret.name) {
            for (i, arg) in decl.args.iter().enumerate() {
                let arg_ty = arg.ty.as_ref().map(|t| t.name.as_str());
                if arg_ty == Some(ret.name.as_str()) {
                    if let Some(call_arg) = call.args.get(i) {
                        return self.infer_expr(&call_arg.value);
                    }
                }
            }
            return Err(Diagnostic::error("E0501", "can't infer type")
                .with_span(span_of(call.pos)));
        }

        self.types.type_expr(ret)
    }

    fn infer_qualified(&self, qualified: &ast::QualifiedIdent) -> Result<Type, Diagnostic> {
        let first = &qualified.parts[0];

        if let Some(binding) = self.scopes.lookup(&first.name) {
            // Walk the field path through nested struct declarations.
            let mut current = binding.ty.clone();
            for part in &qualified.parts[1..] {
                let Some(struct_name) = current.decl.clone() else {
                    return Err(self.no_field(&struct_name_of(&current), part));
                };
                let Some(decl) = self.types.struct_decl(&struct_name) else {
                    return Err(self.no_field(&struct_name, part));
                };
                let Some(index) = decl.field_index(&part.name) else {
                    return Err(self.no_field(&struct_name, part));
                };
                let field = &decl.fields[index];
                let Some(field_ty) = &field.ty else {
                    return Err(self.no_field(&struct_name, part));
                };
                current = self.types.type_expr(field_ty)?;
            }
            return Ok(current);
        }

        if self.types.enum_decl(&first.name).is_some() {
            return self.types.lookup(&first.name, first.pos);
        }

        Err(self.unknown_symbol(&first.name, first.pos))
    }

    pub(crate) fn unknown_symbol(&self, name: &str, pos: Position) -> Diagnostic {
        let mut diag = Diagnostic::error("E0201", format!("unknown symbol `{}`", name))
            .with_span(span_of(pos));

        let mut candidates = self.scopes.visible_names();
        candidates.extend(self.module.functions.keys().map(|k| k.as_str()));
        candidates.extend(self.module.types.keys().map(|k| k.as_str()));
        if let Some(similar) = find_similar_name(name, candidates) {
            diag = diag.with_help(format!("did you mean `{}`?", similar));
        }
        diag
    }

    fn no_field(&self, struct_name: &str, part: &ast::IdentPart) -> Diagnostic {
        Diagnostic::error(
            "E0302",
            format!(
                "structure `{}` doesn't have field `{}`",
                struct_name, part.name
            ),
        )
        .with_span(span_of(part.pos))
    }
}

fn struct_name_of(ty: &Type) -> String {
    ty.decl.clone().unwrap_or_else(|| ty.ir.to_string())
}
