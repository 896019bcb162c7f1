//! The North compiler middle end: semantic types, scopes, inference, generic
//! instantiation and lowering to typed SSA.
//!
//! The pipeline is a single pass: [`compile`] parses the source into a
//! module registry, lowers every declaration to IR (instantiating generic
//! functions on demand at call sites) and verifies the result. The first
//! semantic error aborts the pipeline with a [`Diagnostic`].

mod generics;
mod inference;
mod lower;
mod scope;
mod types;

pub use lower::lower_module;
pub use types::{Type, TypeTable};

use north_ast as ast;
use north_diagnostics::Diagnostic;
use north_ir as ir;

/// Everything the driver needs after a successful compilation.
#[derive(Debug)]
pub struct Compilation {
    pub module: ast::Module,
    pub ir: ir::Module,
}

/// Front end plus middle end: source text to verified IR.
pub fn compile(source: &str, file_name: &str) -> Result<Compilation, Diagnostic> {
    let module = north_parser::parse_module(source, file_name)?;
    log::debug!(
        "parsed {}: {} functions, {} types",
        module.name,
        module.functions.len(),
        module.types.len()
    );

    let ir = lower_module(&module)?;

    ir.verify().map_err(|err| {
        Diagnostic::error("E0900", format!("internal: IR verification failed: {}", err))
    })?;

    Ok(Compilation { module, ir })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_smoke() {
        let compilation =
            compile("def add(_ a: i32, _ b: i32) -> i32:\n  return a + b\n", "t.n")
                .expect("compile failed");
        assert!(compilation.ir.get_function("add").is_some());
    }
}
