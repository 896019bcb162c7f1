// Parser for the North language: a recursive-descent declaration parser with
// a Pratt expression core, driving the indentation-sensitive lexer directly.

mod parser;
pub use parser::Parser;

use north_ast::Module;
use north_diagnostics::Diagnostic;

/// Parse a whole source file into a populated module registry.
pub fn parse_module(source: &str, file_name: &str) -> Result<Module, Diagnostic> {
    Parser::new(source, file_name).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use north_ast::{Expr, Literal, Stmt};

    #[test]
    fn test_parse_simple_function() {
        let module = parse_module("def add(_ a: i32, _ b: i32) -> i32:\n  return a + b\n", "t.n")
            .expect("parse failed");

        let add = &module.functions["add"];
        assert_eq!(add.args.len(), 2);
        assert_eq!(add.args[0].label(), "_");
        assert_eq!(add.args[0].name, "a");
        assert_eq!(add.ret.as_ref().map(|t| t.name.as_str()), Some("i32"));

        let body = add.body.as_ref().expect("missing body");
        assert_eq!(body.nodes.len(), 1);
        assert!(matches!(
            &body.nodes[0],
            Stmt::Return(ret) if matches!(ret.value, Some(Expr::Binary(_)))
        ));
    }

    #[test]
    fn test_duplicate_function_is_fatal() {
        let err = parse_module("def f():\n  return 1\ndef f():\n  return 2\n", "t.n")
            .expect_err("expected duplicate error");
        assert!(err.message.contains("duplicate definition of function 'f'"));
    }

    #[test]
    fn test_else_without_if() {
        let err = parse_module("def f():\n  else:\n    return 1\n", "t.n")
            .expect_err("expected else error");
        assert!(err.message.contains("else without if"));
    }

    #[test]
    fn test_labeled_call_arguments() {
        let module = parse_module(
            "def mult[T](_ lhs: T, rhs: T) -> T:\n  return lhs * rhs\ndef main():\n  mult(5, rhs: 5)\n",
            "t.n",
        )
        .expect("parse failed");

        let main = &module.functions["main"];
        let body = main.body.as_ref().expect("missing body");
        let Stmt::Expr(Expr::Call(call)) = &body.nodes[0] else {
            panic!("expected a call statement");
        };
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args[0].label, None);
        assert_eq!(call.args[1].label.as_deref(), Some("rhs"));
        assert!(matches!(
            call.args[1].value,
            Expr::Literal(Literal::Int { value: 5, .. })
        ));
    }
}
