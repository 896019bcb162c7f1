// Mirrors the shape of a small but complete program: an import, an extern
// variadic declaration, a generic function with labeled arguments, and a
// main that exercises labels at the call site.

use north_ast::{Expr, Literal, Stmt};
use north_parser::parse_module;

const PROGRAM: &str = "\
open Test

def printf(_: *i8, ...)

def mult[T](_ lhs: T, rhs: T) -> T:
  return lhs * rhs

def main():
  printf(\"%d\", random_vararg_label: mult(5, rhs: 5), 7)
";

#[test]
fn test_open_statement_registers_import() {
    let module = parse_module(PROGRAM, "001.n").expect("parse failed");
    assert_eq!(module.imports, vec!["Test".to_string()]);
}

#[test]
fn test_variadic_declaration() {
    let module = parse_module(PROGRAM, "001.n").expect("parse failed");

    let printf = &module.functions["printf"];
    assert!(printf.variadic);
    assert!(printf.body.is_none());
    assert_eq!(printf.args.len(), 1);
    assert_eq!(printf.args[0].name, "_");
    assert_eq!(printf.args[0].label(), "_");
    let ty = printf.args[0].ty.as_ref().expect("missing type");
    assert_eq!(ty.name, "i8");
    assert!(ty.is_ptr);
}

#[test]
fn test_generic_function_signature() {
    let module = parse_module(PROGRAM, "001.n").expect("parse failed");

    let mult = &module.functions["mult"];
    assert_eq!(mult.generics.len(), 1);
    assert_eq!(mult.generics[0].name, "T");
    assert!(!mult.variadic);

    assert_eq!(mult.args[0].name, "lhs");
    assert_eq!(mult.args[0].named_arg.as_deref(), Some("_"));
    assert_eq!(mult.args[1].name, "rhs");
    assert_eq!(mult.args[1].label(), "rhs");
    assert_eq!(mult.args[1].ty.as_ref().map(|t| t.name.as_str()), Some("T"));
    assert_eq!(mult.ret.as_ref().map(|t| t.name.as_str()), Some("T"));

    let body = mult.body.as_ref().expect("missing body");
    assert!(matches!(
        &body.nodes[0],
        Stmt::Return(ret) if matches!(ret.value, Some(Expr::Binary(_)))
    ));
}

#[test]
fn test_call_argument_labels() {
    let module = parse_module(PROGRAM, "001.n").expect("parse failed");

    let main = &module.functions["main"];
    let body = main.body.as_ref().expect("missing body");
    let Stmt::Expr(Expr::Call(call)) = &body.nodes[0] else {
        panic!("expected a call statement");
    };

    assert_eq!(call.target.first(), "printf");
    assert_eq!(call.args.len(), 3);
    assert_eq!(call.args[0].label, None);
    assert_eq!(call.args[1].label.as_deref(), Some("random_vararg_label"));
    assert_eq!(call.args[2].label, None);
    assert!(matches!(
        call.args[0].value,
        Expr::Literal(Literal::Str { .. })
    ));
    assert!(matches!(call.args[1].value, Expr::Call(_)));
}

#[test]
fn test_reparse_is_stable() {
    let first = parse_module(PROGRAM, "001.n").expect("parse failed");
    let second = parse_module(PROGRAM, "001.n").expect("parse failed");
    assert_eq!(first, second);
}

#[test]
fn test_multiline_array_literal() {
    let source = "\
def f():
  var xs = [1,
            2,
            3]
  return
";
    let module = parse_module(source, "t.n").expect("parse failed");
    let f = &module.functions["f"];
    let body = f.body.as_ref().expect("missing body");
    let Stmt::Expr(Expr::Var(var)) = &body.nodes[0] else {
        panic!("expected a var declaration");
    };
    let Some(Expr::Array(array)) = &var.value else {
        panic!("expected an array initializer");
    };
    assert_eq!(array.values.len(), 3);
}

#[test]
fn test_else_if_chain() {
    let source = "\
def f(_ x: i32):
  if x == 1:
    printf(\"one\")
  else if x == 2:
    printf(\"two\")
  else:
    printf(\"many\")
";
    let module = parse_module(source, "t.n").expect("parse failed");
    let f = &module.functions["f"];
    let body = f.body.as_ref().expect("missing body");
    assert_eq!(body.nodes.len(), 1);

    let Stmt::Expr(Expr::If(if_expr)) = &body.nodes[0] else {
        panic!("expected an if statement");
    };
    assert!(if_expr.cond.is_some());

    let elif = if_expr.else_branch.as_ref().expect("missing else if");
    assert!(elif.cond.is_some());

    let last = elif.else_branch.as_ref().expect("missing else");
    assert!(last.cond.is_none());
    assert!(last.else_branch.is_none());
}

#[test]
fn test_interface_declaration() {
    let source = "\
interface Shape =
  def area(_ self: i32) -> i32
  def name(_ self: i32) -> *i8

def f():
  return
";
    let module = parse_module(source, "t.n").expect("parse failed");
    let shape = &module.interfaces["Shape"];
    assert_eq!(shape.methods.len(), 2);
    assert_eq!(shape.methods[0].name, "area");
    assert_eq!(shape.methods[1].name, "name");
    assert!(module.functions.contains_key("f"));
}

#[test]
fn test_type_definitions() {
    let source = "\
type Byte = i8
type Handle = *i8
type Color = Red, Green, Blue
type Point = {
  x: i32,
  y: i32
}
";
    let module = parse_module(source, "t.n").expect("parse failed");
    assert_eq!(module.types.len(), 4);
    assert!(matches!(
        module.types["Byte"].body,
        north_ast::TypeDefBody::Alias(_)
    ));
    assert!(module.types["Handle"].is_ptr);
    assert!(matches!(
        &module.types["Color"].body,
        north_ast::TypeDefBody::Enum(e) if e.members.len() == 3
    ));
    assert!(matches!(
        &module.types["Point"].body,
        north_ast::TypeDefBody::Struct(s) if s.fields.len() == 2
    ));
}
