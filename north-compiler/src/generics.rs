//! Call-site instantiation of generic functions. Type parameters are
//! resolved in declaration order by scanning the argument list left to
//! right; each distinct tuple of concrete types is specialized once and
//! cached.

use crate::inference::InferCx;
use crate::types::Type;
use north_ast as ast;
use north_diagnostics::{Diagnostic, Span};
use std::collections::HashMap;

/// One cached specialization of a generic function.
#[derive(Debug)]
struct Instance {
    type_args: Vec<Type>,
    symbol: String,
}

/// The outcome of instantiating at a call site. `decl` is the concrete
/// clone only for freshly created specializations; cache hits return the
/// existing symbol.
pub struct Instantiation {
    pub symbol: String,
    pub created: Option<CreatedInstance>,
}

pub struct CreatedInstance {
    pub decl: ast::FunctionDecl,
    /// Concrete types for arguments whose declared type was a generic
    /// parameter, by argument index.
    pub arg_overrides: Vec<Option<Type>>,
    pub ret_override: Option<Type>,
}

#[derive(Default)]
pub struct Instantiator {
    cache: HashMap<String, Vec<Instance>>,
}

impl Instantiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instantiate(
        &mut self,
        generic: &ast::FunctionDecl,
        call: &ast::CallExpr,
        cx: &InferCx<'_>,
    ) -> Result<Instantiation, Diagnostic> {
        // Resolve each type parameter, in declaration order, from the first
        // argument declared with it.
        let mut resolved: Vec<(String, Type)> = Vec::new();
        for param in &generic.generics {
            for (i, arg) in generic.args.iter().enumerate() {
                let declared = arg.ty.as_ref().map(|t| t.name.as_str());
                if declared == Some(param.name.as_str()) {
                    if let Some(call_arg) = call.args.get(i) {
                        let concrete = cx.infer_expr(&call_arg.value)?;
                        resolved.push((param.name.clone(), concrete));
                        break;
                    }
                }
            }
        }

        if resolved.len() < generic.generics.len() {
            return Err(Diagnostic::error("E0501", "can't infer type")
                .with_span(args_span(call)));
        }

        // Linear cache lookup over previously built type tuples.
        let instances = self.cache.entry(generic.name.clone()).or_default();
        if let Some(hit) = instances.iter().find(|instance| {
            instance.type_args.len() == resolved.len()
                && instance
                    .type_args
                    .iter()
                    .zip(resolved.iter())
                    .all(|(cached, (_, fresh))| cached == fresh)
        }) {
            return Ok(Instantiation {
                symbol: hit.symbol.clone(),
                created: None,
            });
        }

        let symbol = mangle(&generic.name, &resolved);

        // Clone the declaration; the body is shared structure re-walked with
        // a fresh scope, so a plain clone is sufficient.
        let mut decl = generic.clone();
        decl.name = symbol.clone();
        decl.generics.clear();

        let arg_overrides = generic
            .args
            .iter()
            .map(|arg| {
                let declared = arg.ty.as_ref().map(|t| t.name.as_str());
                resolved
                    .iter()
                    .find(|(name, _)| declared == Some(name.as_str()))
                    .map(|(_, ty)| ty.clone())
            })
            .collect();

        let ret_override = generic.ret.as_ref().and_then(|ret| {
            resolved
                .iter()
                .find(|(name, _)| *name == ret.name)
                .map(|(_, ty)| ty.clone())
        });

        instances.push(Instance {
            type_args: resolved.into_iter().map(|(_, ty)| ty).collect(),
            symbol: symbol.clone(),
        });

        log::debug!("instantiated {} as {}", generic.name, symbol);

        Ok(Instantiation {
            symbol,
            created: Some(CreatedInstance {
                decl,
                arg_overrides,
                ret_override,
            }),
        })
    }
}

fn mangle(name: &str, resolved: &[(String, Type)]) -> String {
    let mut symbol = name.to_string();
    for (_, ty) in resolved {
        symbol.push('_');
        symbol.push_str(&ty.mangle_name());
    }
    symbol
}

fn args_span(call: &ast::CallExpr) -> Span {
    match call.args_span() {
        Some((first, last)) => {
            Span::new(first.offset, first.length.max(1)).to(Span::new(last.offset, last.length.max(1)))
        }
        None => Span::new(call.pos.offset, call.pos.length.max(1)),
    }
}
