use north_lexer::{Position, Token};
use serde::{Deserialize, Serialize};

mod module;
pub use module::{Item, Module, ModuleError};

/// A reference to a type by name, as written in source: `i32`, `*i8`, `T`,
/// `Matrix[T]`. The `Ptr` modifier comes from a leading `*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeExpr {
    pub pos: Position,
    pub name: String,
    pub is_ptr: bool,
    pub generics: Vec<GenericParam>,
}

/// One entry of a `[T, U]` generic parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericParam {
    pub pos: Position,
    pub name: String,
}

/// Variable declaration. Doubles as a function argument and a struct field;
/// arguments may carry a public label distinct from the internal name, in the
/// style `_ lhs: T` (label `_`, name `lhs`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub pos: Position,
    pub name: String,
    pub named_arg: Option<String>,
    pub ty: Option<TypeExpr>,
    pub value: Option<Expr>,
    pub is_arg: bool,
}

impl VarDecl {
    /// The label a caller must use for this argument. Defaults to the
    /// internal name; `_` means the argument must be passed unlabeled.
    pub fn label(&self) -> &str {
        self.named_arg.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub pos: Position,
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub args: Vec<VarDecl>,
    pub ret: Option<TypeExpr>,
    pub body: Option<Block>,
    pub variadic: bool,
}

impl FunctionDecl {
    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub pos: Position,
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub parent: Option<String>,
    pub methods: Vec<FunctionDecl>,
}

/// `type Name [T]? = <body>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub pos: Position,
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub is_ptr: bool,
    pub body: TypeDefBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDefBody {
    Alias(TypeExpr),
    Struct(StructDecl),
    Union(UnionDecl),
    Enum(EnumDecl),
    Tuple(TupleDecl),
    Range(RangeDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub pos: Position,
    pub fields: Vec<VarDecl>,
}

impl StructDecl {
    /// Index of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionDecl {
    pub pos: Position,
    pub variants: Vec<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub pos: Position,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub pos: Position,
    pub name: String,
}

impl EnumDecl {
    /// 1-based ordinal of a member.
    pub fn ordinal(&self, name: &str) -> Option<i64> {
        self.members
            .iter()
            .position(|m| m.name == name)
            .map(|i| i as i64 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleDecl {
    pub pos: Position,
    pub members: Vec<VarDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeDecl {
    pub pos: Position,
    pub ranges: Vec<RangeExpr>,
}

/// `open Name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenStmt {
    pub pos: Position,
    pub module: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub pos: Position,
    pub nodes: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Expr),
    Return(ReturnStmt),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub pos: Position,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Assign(AssignExpr),
    Range(Box<RangeExpr>),
    Call(CallExpr),
    ArrayIndex(ArrayIndexExpr),
    Qualified(QualifiedIdent),
    If(Box<IfExpr>),
    For(Box<ForExpr>),
    While(Box<WhileExpr>),
    StructInit(StructInitExpr),
    Array(ArrayExpr),
    Var(Box<VarDecl>),
}

impl Expr {
    pub fn pos(&self) -> Position {
        match self {
            Expr::Literal(l) => l.pos(),
            Expr::Unary(e) => e.pos,
            Expr::Binary(e) => e.pos,
            Expr::Assign(e) => e.pos,
            Expr::Range(e) => e.pos,
            Expr::Call(e) => e.pos,
            Expr::ArrayIndex(e) => e.pos,
            Expr::Qualified(e) => e.pos,
            Expr::If(e) => e.pos,
            Expr::For(e) => e.pos,
            Expr::While(e) => e.pos,
            Expr::StructInit(e) => e.pos,
            Expr::Array(e) => e.pos,
            Expr::Var(v) => v.pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int { pos: Position, value: i64 },
    Char { pos: Position, value: char },
    Str { pos: Position, value: String },
    Nil { pos: Position },
    Ident { pos: Position, name: String },
}

impl Literal {
    pub fn pos(&self) -> Position {
        match self {
            Literal::Int { pos, .. }
            | Literal::Char { pos, .. }
            | Literal::Str { pos, .. }
            | Literal::Nil { pos }
            | Literal::Ident { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub pos: Position,
    pub op: Token,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub pos: Position,
    pub op: Token,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignExpr {
    pub pos: Position,
    pub op: Token,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

/// `begin..end`, end-exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeExpr {
    pub pos: Position,
    pub begin: Box<Expr>,
    pub end: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub pos: Position,
    pub target: QualifiedIdent,
    pub args: Vec<CallArg>,
}

impl CallExpr {
    /// Span covering the whole argument list, for diagnostics.
    pub fn args_span(&self) -> Option<(Position, Position)> {
        let first = self.args.first()?.value.pos();
        let last = self.args.last()?.value.pos();
        Some((first, last))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallArg {
    pub label: Option<String>,
    pub label_pos: Option<Position>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayIndexExpr {
    pub pos: Position,
    pub target: Box<Expr>,
    pub index: Box<Expr>,
}

/// `a.b.c` — struct-field projection or enum-constant access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifiedIdent {
    pub pos: Position,
    pub parts: Vec<IdentPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentPart {
    pub pos: Position,
    pub name: String,
}

impl QualifiedIdent {
    pub fn single(pos: Position, name: impl Into<String>) -> Self {
        Self {
            pos,
            parts: vec![IdentPart {
                pos,
                name: name.into(),
            }],
        }
    }

    pub fn first(&self) -> &str {
        &self.parts[0].name
    }

    pub fn is_single(&self) -> bool {
        self.parts.len() == 1
    }
}

/// `if cond: block` with an optional chained `else [if]` branch. A branch
/// with no condition is a bare `else`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfExpr {
    pub pos: Position,
    pub cond: Option<Expr>,
    pub block: Block,
    pub else_branch: Option<Box<IfExpr>>,
}

/// `for i in 0..n: block` or `for x in xs: block`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForExpr {
    pub pos: Position,
    pub iter_pos: Position,
    pub iter_name: String,
    pub range: Expr,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileExpr {
    pub pos: Position,
    pub cond: Expr,
    pub block: Block,
}

/// `Point{x, y}` — field values in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructInitExpr {
    pub pos: Position,
    pub name: String,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayExpr {
    pub pos: Position,
    pub values: Vec<Expr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position {
            line: 1,
            column: 1,
            offset: 0,
            length: 1,
        }
    }

    #[test]
    fn test_argument_labels() {
        let unlabeled = VarDecl {
            pos: pos(),
            name: "lhs".into(),
            named_arg: Some("_".into()),
            ty: None,
            value: None,
            is_arg: true,
        };
        assert_eq!(unlabeled.label(), "_");

        let defaulted = VarDecl {
            pos: pos(),
            name: "rhs".into(),
            named_arg: None,
            ty: None,
            value: None,
            is_arg: true,
        };
        assert_eq!(defaulted.label(), "rhs");
    }

    #[test]
    fn test_enum_ordinals_are_one_based() {
        let colors = EnumDecl {
            pos: pos(),
            members: ["Red", "Green", "Blue"]
                .into_iter()
                .map(|name| EnumMember {
                    pos: pos(),
                    name: name.into(),
                })
                .collect(),
        };
        assert_eq!(colors.ordinal("Red"), Some(1));
        assert_eq!(colors.ordinal("Green"), Some(2));
        assert_eq!(colors.ordinal("Blue"), Some(3));
        assert_eq!(colors.ordinal("Mauve"), None);
    }

    #[test]
    fn test_serialization_round_trip() {
        let expr = Expr::Binary(BinaryExpr {
            pos: pos(),
            op: Token::Plus,
            lhs: Box::new(Expr::Literal(Literal::Int { pos: pos(), value: 1 })),
            rhs: Box::new(Expr::Literal(Literal::Ident {
                pos: pos(),
                name: "a".into(),
            })),
        });

        let json = serde_json::to_string(&expr).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(expr, back);
    }
}
