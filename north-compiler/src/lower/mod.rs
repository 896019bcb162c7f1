//! Lowering from the AST to typed SSA. The walk state — current function,
//! insertion block, and value-versus-address mode — is passed explicitly, so
//! the visitor can re-enter itself when a call site forces a generic
//! instantiation.

use crate::generics::Instantiator;
use crate::inference::InferCx;
use crate::scope::{Binding, ScopeStack};
use crate::types::{Type, TypeTable};
use north_ast as ast;
use north_diagnostics::{Diagnostic, Span};
use north_ir as ir;
use north_lexer::Position;

mod expressions;
mod statements;

pub(crate) fn span_of(pos: Position) -> Span {
    Span::new(pos.offset, pos.length.max(1))
}

/// How an expression's result is wanted: as a loaded value, as an address
/// (assignment targets, field projections), or as a call argument (loaded,
/// but aggregates stay addressable so arrays can decay to pointers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Value,
    Address,
    Argument,
}

/// Context of the function currently being lowered.
#[derive(Debug, Clone)]
pub(crate) struct FnCx {
    pub name: String,
    pub args: Vec<(String, Type, Position)>,
    pub ret: Option<Type>,
}

pub(crate) struct Lowering<'m> {
    pub(crate) module: &'m ast::Module,
    pub(crate) types: TypeTable<'m>,
    pub(crate) ir: ir::Module,
    pub(crate) instances: Instantiator,
    pub(crate) scopes: ScopeStack,
    pub(crate) cur_fn: ir::FuncId,
    pub(crate) cur_block: ir::BlockId,
    pub(crate) fncx: Option<FnCx>,
}

/// Lower a parsed module to IR: struct types first, then function
/// signatures, then bodies in declaration order. Generic functions are not
/// lowered here; they are specialized on demand from call sites.
pub fn lower_module(module: &ast::Module) -> Result<ir::Module, Diagnostic> {
    let mut lowering = Lowering {
        module,
        types: TypeTable::new(module),
        ir: ir::Module::new(&module.name),
        instances: Instantiator::new(),
        scopes: ScopeStack::new(),
        cur_fn: 0,
        cur_block: 0,
        fncx: None,
    };

    lowering.declare_types()?;
    lowering.declare_functions()?;
    lowering.lower_items()?;

    Ok(lowering.ir)
}

impl<'m> Lowering<'m> {
    /// Register opaque struct handles first, then attach bodies, so
    /// self-referential structures resolve.
    fn declare_types(&mut self) -> Result<(), Diagnostic> {
        let module = self.module;
        for item in &module.items {
            if let ast::Item::Type(name) = item {
                if matches!(module.types[name].body, ast::TypeDefBody::Struct(_)) {
                    self.ir.add_struct(name);
                }
            }
        }

        for item in &module.items {
            let ast::Item::Type(name) = item else {
                continue;
            };
            let def = &module.types[name];
            let ast::TypeDefBody::Struct(decl) = &def.body else {
                continue;
            };

            let mut fields = Vec::with_capacity(decl.fields.len());
            for field in &decl.fields {
                let Some(te) = &field.ty else {
                    return Err(Diagnostic::error(
                        "E0301",
                        format!("field `{}` of `{}` must have a type", field.name, name),
                    )
                    .with_span(span_of(field.pos)));
                };
                fields.push(self.types.type_expr(te)?.ir);
            }
            self.ir.set_struct_body(name, fields);
        }

        Ok(())
    }

    /// Create IR signatures for every non-generic function so calls resolve
    /// independently of declaration order. Bodyless declarations become
    /// externs.
    fn declare_functions(&mut self) -> Result<(), Diagnostic> {
        let module = self.module;
        for item in &module.items {
            if let ast::Item::Function(name) = item {
                let decl = &module.functions[name];
                if decl.is_generic() {
                    continue;
                }
                let overrides = vec![None; decl.args.len()];
                self.declare_fn_ir(decl, &overrides, &None)?;
            }
        }
        Ok(())
    }

    /// Build and register the IR function for a declaration, substituting
    /// `arg_overrides`/`ret_override` where generic instantiation resolved a
    /// concrete type. Returns the id plus the semantic signature.
    pub(crate) fn declare_fn_ir(
        &mut self,
        decl: &ast::FunctionDecl,
        arg_overrides: &[Option<Type>],
        ret_override: &Option<Type>,
    ) -> Result<(ir::FuncId, Vec<Type>, Option<Type>), Diagnostic> {
        let (arg_types, ret) = self.signature_types(decl, arg_overrides, ret_override)?;

        let params = decl
            .args
            .iter()
            .zip(arg_types.iter())
            .map(|(arg, ty)| ir::Param {
                name: arg.name.clone(),
                ty: ty.ir.clone(),
            })
            .collect();
        let ret_ir = ret.as_ref().map_or(ir::Type::Void, |t| t.ir.clone());

        let func = ir::Function::new(&decl.name, params, ret_ir, decl.variadic);
        let id = self.ir.declare_function(func);

        Ok((id, arg_types, ret))
    }

    fn lower_items(&mut self) -> Result<(), Diagnostic> {
        let module = self.module;
        for item in &module.items {
            match item {
                ast::Item::Function(name) => {
                    let decl = &module.functions[name];
                    if decl.is_generic() || decl.body.is_none() {
                        continue;
                    }
                    let Some(fn_id) = self.ir.get_function(name) else {
                        return Err(Diagnostic::error(
                            "E0901",
                            format!("internal: function `{}` was never declared", name),
                        ));
                    };
                    // Recompute the semantic signature for the body walk.
                    let overrides = vec![None; decl.args.len()];
                    let (arg_types, ret) = self.signature_types(decl, &overrides, &None)?;
                    self.lower_function(decl, fn_id, arg_types, ret)?;
                }
                ast::Item::Var(var) => {
                    return Err(Diagnostic::error(
                        "E0101",
                        format!("global variable `{}` is not supported yet", var.name),
                    )
                    .with_span(span_of(var.pos)));
                }
                ast::Item::Type(_) | ast::Item::Interface(_) | ast::Item::Open(_) => {}
            }
        }
        Ok(())
    }

    fn signature_types(
        &self,
        decl: &ast::FunctionDecl,
        arg_overrides: &[Option<Type>],
        ret_override: &Option<Type>,
    ) -> Result<(Vec<Type>, Option<Type>), Diagnostic> {
        let mut arg_types = Vec::with_capacity(decl.args.len());
        for (i, arg) in decl.args.iter().enumerate() {
            let ty = match arg_overrides.get(i).and_then(|o| o.as_ref()) {
                Some(ty) => ty.clone(),
                None => {
                    let te = arg.ty.as_ref().ok_or_else(|| {
                        Diagnostic::error(
                            "E0301",
                            format!(
                                "argument `{}` of `{}` must have a type",
                                arg.name, decl.name
                            ),
                        )
                        .with_span(span_of(arg.pos))
                    })?;
                    self.types.type_expr(te)?
                }
            };
            arg_types.push(ty);
        }
        let ret = match ret_override {
            Some(ty) => Some(ty.clone()),
            None => decl
                .ret
                .as_ref()
                .map(|te| self.types.type_expr(te))
                .transpose()?,
        };
        Ok((arg_types, ret))
    }

    /// Lower one function body. The walk state is saved and restored around
    /// the call so instantiation can recurse from an expression.
    pub(crate) fn lower_function(
        &mut self,
        decl: &ast::FunctionDecl,
        fn_id: ir::FuncId,
        arg_types: Vec<Type>,
        ret: Option<Type>,
    ) -> Result<(), Diagnostic> {
        let Some(body) = &decl.body else {
            return Ok(());
        };

        let saved_scopes = std::mem::take(&mut self.scopes);
        let saved_fn = self.cur_fn;
        let saved_block = self.cur_block;
        let saved_fncx = self.fncx.take();

        let entry = self.ir.function_mut(fn_id).append_block("entry");
        self.cur_fn = fn_id;
        self.cur_block = entry;
        self.fncx = Some(FnCx {
            name: decl.name.clone(),
            args: decl
                .args
                .iter()
                .zip(arg_types)
                .map(|(arg, ty)| (arg.name.clone(), ty, arg.pos))
                .collect(),
            ret,
        });

        log::debug!("lowering function {}", decl.name);
        self.lower_block(body)?;

        // A function without a declared return type falls off the end into
        // `ret void`; a typed one must have returned on every path.
        if !self.ir.function(self.cur_fn).block_terminated(self.cur_block) {
            let has_ret = self.fncx.as_ref().is_some_and(|cx| cx.ret.is_some());
            if has_ret {
                return Err(Diagnostic::error(
                    "E0303",
                    format!("function `{}` must return a value", decl.name),
                )
                .with_span(span_of(decl.pos)));
            }
            self.emit(ir::InstKind::Ret { value: None }, decl.pos)?;
        }

        self.scopes = saved_scopes;
        self.cur_fn = saved_fn;
        self.cur_block = saved_block;
        self.fncx = saved_fncx;

        Ok(())
    }

    // ==================== Emission helpers ====================

    pub(crate) fn emit(
        &mut self,
        kind: ir::InstKind,
        pos: Position,
    ) -> Result<ir::Value, Diagnostic> {
        self.ir
            .push_inst(self.cur_fn, self.cur_block, kind)
            .map_err(|err| {
                Diagnostic::error("E0901", format!("internal: {}", err)).with_span(span_of(pos))
            })
    }

    pub(crate) fn vtype(&self, value: &ir::Value) -> ir::Type {
        self.ir.value_type(self.cur_fn, value)
    }

    pub(crate) fn infer(&self, expr: &ast::Expr) -> Result<Type, Diagnostic> {
        InferCx {
            module: self.module,
            types: &self.types,
            scopes: &self.scopes,
        }
        .infer_expr(expr)
    }

    /// `icmp eq value, 1` — the truthiness coercion used by conditions and
    /// the bit-style logical operators.
    pub(crate) fn cmp_with_true(
        &mut self,
        value: ir::Value,
        pos: Position,
    ) -> Result<ir::Value, Diagnostic> {
        let ty = self.vtype(&value);
        self.emit(
            ir::InstKind::Icmp {
                pred: ir::Predicate::Eq,
                lhs: value,
                rhs: ir::Value::ConstInt { ty, value: 1 },
            },
            pos,
        )
    }

    pub(crate) fn const_i32(value: i64) -> ir::Value {
        ir::Value::ConstInt {
            ty: ir::Type::I32,
            value,
        }
    }

    pub(crate) fn bind_slot(
        &mut self,
        name: &str,
        slot: ir::Value,
        ty: Type,
        pos: Position,
    ) -> Result<(), Diagnostic> {
        self.scopes.add(
            name,
            Binding {
                value: slot,
                ty,
                is_slot: true,
            },
            pos,
        )
    }
}
