use serde::{Deserialize, Serialize};
use std::fmt;

/// Token kinds of the North language.
///
/// The set is closed and ordered the way the expression parser's precedence
/// table expects: structural tokens, literals, keywords, delimiters, then
/// operators grouped by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    // Structural
    Eof,
    Comment,
    Indent,
    Dedent,

    // Literals
    Identifier,
    Int,
    Char,
    String,

    // Keywords
    Def,
    Nil,
    Open,
    Interface,
    Type,
    Var,
    Let,
    If,
    In,
    Else,
    For,
    While,
    Switch,
    Return,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Dot,
    DotDot,
    Ellipsis,

    // Assignment operators
    Assign,
    DivAssign,
    MultAssign,
    PlusAssign,
    MinusAssign,
    AndAssign,
    OrAssign,
    RShiftAssign,
    LShiftAssign,

    // Comparison
    Eq,
    NotEq,
    GreaterEq,
    LessEq,

    Colon,
    Comma,
    Semicolon,

    // Arithmetic
    Div,
    Mult,
    Plus,
    Minus,
    Increment,
    Decrement,

    Not,
    And,
    Or,
    GreaterThan,
    LessThan,
    Wildcard,

    AndAnd,
    OrOr,
    RShift,
    LShift,

    RightArrow,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Token::Eof => "end of file",
            Token::Comment => "comment",
            Token::Indent => "indent",
            Token::Dedent => "dedent",
            Token::Identifier => "identifier",
            Token::Int => "integer",
            Token::Char => "char",
            Token::String => "string",
            Token::Def => "`def`",
            Token::Nil => "`nil`",
            Token::Open => "`open`",
            Token::Interface => "`interface`",
            Token::Type => "`type`",
            Token::Var => "`var`",
            Token::Let => "`let`",
            Token::If => "`if`",
            Token::In => "`in`",
            Token::Else => "`else`",
            Token::For => "`for`",
            Token::While => "`while`",
            Token::Switch => "`switch`",
            Token::Return => "`return`",
            Token::LParen => "`(`",
            Token::RParen => "`)`",
            Token::LBrace => "`{`",
            Token::RBrace => "`}`",
            Token::LBracket => "`[`",
            Token::RBracket => "`]`",
            Token::Dot => "`.`",
            Token::DotDot => "`..`",
            Token::Ellipsis => "`...`",
            Token::Assign => "`=`",
            Token::DivAssign => "`/=`",
            Token::MultAssign => "`*=`",
            Token::PlusAssign => "`+=`",
            Token::MinusAssign => "`-=`",
            Token::AndAssign => "`&=`",
            Token::OrAssign => "`|=`",
            Token::RShiftAssign => "`>>=`",
            Token::LShiftAssign => "`<<=`",
            Token::Eq => "`==`",
            Token::NotEq => "`!=`",
            Token::GreaterEq => "`>=`",
            Token::LessEq => "`<=`",
            Token::Colon => "`:`",
            Token::Comma => "`,`",
            Token::Semicolon => "`;`",
            Token::Div => "`/`",
            Token::Mult => "`*`",
            Token::Plus => "`+`",
            Token::Minus => "`-`",
            Token::Increment => "`++`",
            Token::Decrement => "`--`",
            Token::Not => "`!`",
            Token::And => "`&`",
            Token::Or => "`|`",
            Token::GreaterThan => "`>`",
            Token::LessThan => "`<`",
            Token::Wildcard => "`_`",
            Token::AndAnd => "`&&`",
            Token::OrOr => "`||`",
            Token::RShift => "`>>`",
            Token::LShift => "`<<`",
            Token::RightArrow => "`->`",
        };
        f.write_str(name)
    }
}
