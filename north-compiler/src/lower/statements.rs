use super::{span_of, Lowering, Mode};
use crate::scope::Binding;
use north_ast as ast;
use north_diagnostics::Diagnostic;
use north_ir as ir;

impl<'m> Lowering<'m> {
    /// Lower a block: fresh scope, the enclosing function's arguments bound
    /// on entry, children in order, scope restored on exit.
    pub(crate) fn lower_block(&mut self, block: &ast::Block) -> Result<(), Diagnostic> {
        self.scopes.push();

        let args = self
            .fncx
            .as_ref()
            .map(|cx| cx.args.clone())
            .unwrap_or_default();
        for (i, (name, ty, pos)) in args.into_iter().enumerate() {
            self.scopes.add(
                name,
                Binding {
                    value: ir::Value::Arg(i),
                    ty,
                    is_slot: false,
                },
                pos,
            )?;
        }

        for node in &block.nodes {
            match node {
                ast::Stmt::Expr(expr) => {
                    self.lower_expr(expr, Mode::Value)?;
                }
                ast::Stmt::Return(ret) => self.lower_return(ret)?,
            }
        }

        self.scopes.pop();
        Ok(())
    }

    /// `ret <expr>` or `ret void`. Every return is checked against the
    /// function's declared type with the scopes that are live here.
    fn lower_return(&mut self, ret: &ast::ReturnStmt) -> Result<(), Diagnostic> {
        let expected = self.fncx.as_ref().and_then(|cx| cx.ret.clone());
        let fn_name = self
            .fncx
            .as_ref()
            .map(|cx| cx.name.clone())
            .unwrap_or_default();

        match (&ret.value, expected) {
            (Some(expr), Some(expected)) => {
                let inferred = self.infer(expr)?;
                if inferred != expected {
                    return Err(Diagnostic::error(
                        "E0303",
                        format!(
                            "return value type of `{}` doesn't match the function type",
                            fn_name
                        ),
                    )
                    .with_span(span_of(ret.pos)));
                }
                let value = self.lower_expr(expr, Mode::Value)?;
                self.emit(
                    ir::InstKind::Ret { value: Some(value) },
                    ret.pos,
                )?;
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(Diagnostic::error(
                    "E0303",
                    format!(
                        "return value type of `{}` doesn't match the function type",
                        fn_name
                    ),
                )
                .with_span(span_of(ret.pos)));
            }
            (None, None) => {
                self.emit(ir::InstKind::Ret { value: None }, ret.pos)?;
            }
        }

        Ok(())
    }
}
