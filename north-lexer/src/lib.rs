use logos::Logos;
use serde::{Deserialize, Serialize};

mod token;
pub use token::Token;

/// Source location of a token. `line` and `column` are 1-based; `offset` and
/// `length` are byte-accurate so the lexeme is always `source[offset..offset + length]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
    pub length: usize,
}

impl Position {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// A token kind paired with its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub token: Token,
    pub pos: Position,
}

impl TokenInfo {
    /// The lexeme as written in the source. String and char literals lose
    /// their enclosing quotes.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        let raw = &source[self.pos.offset..self.pos.end()];
        match self.token {
            Token::String | Token::Char if raw.len() >= 2 => &raw[1..raw.len() - 1],
            _ => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, pos: Position },
}

/// Lexer behavior toggles. The parser turns `IndentationSensitive` on when it
/// enters a block and off again at top level; `YieldComments` is used by
/// tooling that wants to see `#` comments as tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    YieldComments,
    IndentationSensitive,
}

/// Raw lexical grammar. Indentation bracketing is layered on top by [`Lexer`],
/// which also decides whether newlines and comments are significant.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+")]
enum RawToken {
    #[regex(r"\n+")]
    Newline,

    #[regex(r"#[^\n]*")]
    Comment,

    // Keywords
    #[token("def")]
    Def,
    #[token("nil")]
    Nil,
    #[token("open")]
    Open,
    #[token("interface")]
    Interface,
    #[token("type")]
    Type,
    #[token("var")]
    Var,
    #[token("let")]
    Let,
    #[token("if")]
    If,
    #[token("in")]
    In,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("switch")]
    Switch,
    #[token("return")]
    Return,

    // Literals
    #[regex(r"[A-Za-z][A-Za-z0-9_]*")]
    Identifier,
    // `_x` and `__` are ordinary identifiers; a lone `_` is the wildcard.
    #[regex(r"_[A-Za-z0-9_]+")]
    UnderscoreIdentifier,
    #[token("_")]
    Wildcard,
    #[regex(r"[0-9]+")]
    Int,
    #[regex(r#""[^"]*""#)]
    String,
    #[regex(r"'[^']'")]
    Char,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("...")]
    Ellipsis,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    // Assignment operators
    #[token("=")]
    Assign,
    #[token("/=")]
    DivAssign,
    #[token("*=")]
    MultAssign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token(">>=")]
    RShiftAssign,
    #[token("<<=")]
    LShiftAssign,

    // Comparison
    #[token("==")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token(">=")]
    GreaterEq,
    #[token("<=")]
    LessEq,

    // Arithmetic and bitwise
    #[token("/")]
    Div,
    #[token("*")]
    Mult,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("++")]
    Increment,
    #[token("--")]
    Decrement,
    #[token("!")]
    Not,
    #[token("&")]
    And,
    #[token("|")]
    Or,
    #[token(">")]
    GreaterThan,
    #[token("<")]
    LessThan,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token(">>")]
    RShift,
    #[token("<<")]
    LShift,

    #[token("->")]
    RightArrow,
}

impl RawToken {
    fn to_token(self) -> Token {
        match self {
            RawToken::Newline => unreachable!("newlines are consumed by the indentation layer"),
            RawToken::Comment => Token::Comment,
            RawToken::Def => Token::Def,
            RawToken::Nil => Token::Nil,
            RawToken::Open => Token::Open,
            RawToken::Interface => Token::Interface,
            RawToken::Type => Token::Type,
            RawToken::Var => Token::Var,
            RawToken::Let => Token::Let,
            RawToken::If => Token::If,
            RawToken::In => Token::In,
            RawToken::Else => Token::Else,
            RawToken::For => Token::For,
            RawToken::While => Token::While,
            RawToken::Switch => Token::Switch,
            RawToken::Return => Token::Return,
            RawToken::Identifier | RawToken::UnderscoreIdentifier => Token::Identifier,
            RawToken::Wildcard => Token::Wildcard,
            RawToken::Int => Token::Int,
            RawToken::String => Token::String,
            RawToken::Char => Token::Char,
            RawToken::LParen => Token::LParen,
            RawToken::RParen => Token::RParen,
            RawToken::LBrace => Token::LBrace,
            RawToken::RBrace => Token::RBrace,
            RawToken::LBracket => Token::LBracket,
            RawToken::RBracket => Token::RBracket,
            RawToken::Dot => Token::Dot,
            RawToken::DotDot => Token::DotDot,
            RawToken::Ellipsis => Token::Ellipsis,
            RawToken::Colon => Token::Colon,
            RawToken::Comma => Token::Comma,
            RawToken::Semicolon => Token::Semicolon,
            RawToken::Assign => Token::Assign,
            RawToken::DivAssign => Token::DivAssign,
            RawToken::MultAssign => Token::MultAssign,
            RawToken::PlusAssign => Token::PlusAssign,
            RawToken::MinusAssign => Token::MinusAssign,
            RawToken::AndAssign => Token::AndAssign,
            RawToken::OrAssign => Token::OrAssign,
            RawToken::RShiftAssign => Token::RShiftAssign,
            RawToken::LShiftAssign => Token::LShiftAssign,
            RawToken::Eq => Token::Eq,
            RawToken::NotEq => Token::NotEq,
            RawToken::GreaterEq => Token::GreaterEq,
            RawToken::LessEq => Token::LessEq,
            RawToken::Div => Token::Div,
            RawToken::Mult => Token::Mult,
            RawToken::Plus => Token::Plus,
            RawToken::Minus => Token::Minus,
            RawToken::Increment => Token::Increment,
            RawToken::Decrement => Token::Decrement,
            RawToken::Not => Token::Not,
            RawToken::And => Token::And,
            RawToken::Or => Token::Or,
            RawToken::GreaterThan => Token::GreaterThan,
            RawToken::LessThan => Token::LessThan,
            RawToken::AndAnd => Token::AndAnd,
            RawToken::OrOr => Token::OrOr,
            RawToken::RShift => Token::RShift,
            RawToken::LShift => Token::LShift,
            RawToken::RightArrow => Token::RightArrow,
        }
    }
}

/// Indentation-sensitive lexer.
///
/// The raw token scan is delegated to [`logos`]; this wrapper owns the
/// indentation protocol: after a newline it measures the fresh line's leading
/// spaces against `indent_level * 2` (the indentation unit is two spaces) and
/// yields a single `Indent` on a match or one zero-length `Dedent` per missing
/// level. `indent_level` itself is advanced and reduced by the parser, not
/// here. At end of input any open levels are flushed as `Dedent`s before `Eof`.
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, RawToken>,
    source: &'src str,
    line_starts: Vec<usize>,
    indent_level: u32,
    new_line_pending: bool,
    pending_offset: usize,
    yield_comments: bool,
    indentation_sensitive: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );

        Self {
            inner: RawToken::lexer(source),
            source,
            line_starts,
            indent_level: 0,
            new_line_pending: false,
            pending_offset: 0,
            yield_comments: false,
            indentation_sensitive: false,
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn set_flag(&mut self, flag: Flag, on: bool) {
        match flag {
            Flag::YieldComments => self.yield_comments = on,
            Flag::IndentationSensitive => self.indentation_sensitive = on,
        }
    }

    pub fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::YieldComments => self.yield_comments,
            Flag::IndentationSensitive => self.indentation_sensitive,
        }
    }

    pub fn indent_level(&self) -> u32 {
        self.indent_level
    }

    pub fn increment_indent_level(&mut self) {
        self.indent_level += 1;
    }

    pub fn decrement_indent_level(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn position(&self, offset: usize, length: usize) -> Position {
        let line = self.line_starts.partition_point(|&s| s <= offset) - 1;
        Position {
            line: line as u32 + 1,
            column: (offset - self.line_starts[line]) as u32 + 1,
            offset,
            length,
        }
    }

    fn make(&self, token: Token, offset: usize, length: usize) -> TokenInfo {
        TokenInfo {
            token,
            pos: self.position(offset, length),
        }
    }

    /// True when the first `indent_level * 2` bytes of the fresh line are all
    /// spaces. A zero expectation never matches.
    fn indent_matches(&self) -> bool {
        let needed = self.indent_level as usize * 2;
        if needed == 0 {
            return false;
        }
        self.source
            .as_bytes()
            .get(self.pending_offset..self.pending_offset + needed)
            .is_some_and(|lead| lead.iter().all(|&b| b == b' '))
    }

    fn make_eof(&mut self) -> TokenInfo {
        let end = self.source.len();
        if self.indent_level > 0 {
            // The parser consumes one Dedent per open block and lowers the
            // level itself, so blocks auto-close at end of input.
            return self.make(Token::Dedent, end, 0);
        }
        self.make(Token::Eof, end, 0)
    }

    pub fn next_token(&mut self) -> Result<TokenInfo, LexError> {
        loop {
            if self.new_line_pending {
                if self.indent_matches() {
                    self.new_line_pending = false;
                    if self.indentation_sensitive {
                        let needed = self.indent_level as usize * 2;
                        return Ok(self.make(Token::Indent, self.pending_offset, needed));
                    }
                } else if self.indent_level > 0 {
                    // One Dedent per call; the flag stays raised so the next
                    // call re-measures against the level the parser left us.
                    return Ok(self.make(Token::Dedent, self.pending_offset, 0));
                } else {
                    self.new_line_pending = false;
                }
                continue;
            }

            let Some(raw) = self.inner.next() else {
                return Ok(self.make_eof());
            };
            let span = self.inner.span();

            match raw {
                Ok(RawToken::Newline) => {
                    if self.indentation_sensitive {
                        self.new_line_pending = true;
                        self.pending_offset = span.end;
                    }
                }
                Ok(RawToken::Comment) => {
                    if self.yield_comments {
                        return Ok(self.make(Token::Comment, span.start, span.len()));
                    }
                }
                Ok(raw) => return Ok(self.make(raw.to_token(), span.start, span.len())),
                Err(()) => {
                    let rest = &self.source[span.start..];
                    if rest.starts_with('"') {
                        // Unterminated string literal: report end of input.
                        return Ok(self.make_eof());
                    }
                    let ch = rest.chars().next().unwrap_or('\0');
                    return Err(LexError::UnexpectedCharacter {
                        ch,
                        pos: self.position(span.start, ch.len_utf8()),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let info = lexer.next_token().unwrap();
            tokens.push(info.token);
            if info.token == Token::Eof {
                break;
            }
        }
        tokens
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = collect("def mult interface opened");
        assert_eq!(
            tokens,
            vec![
                Token::Def,
                Token::Identifier,
                Token::Interface,
                Token::Identifier,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_function_header() {
        let source = "def add(_ a: i32, _ b: i32) -> i32:";
        let tokens = collect(source);
        assert_eq!(
            tokens,
            vec![
                Token::Def,
                Token::Identifier,
                Token::LParen,
                Token::Wildcard,
                Token::Identifier,
                Token::Colon,
                Token::Identifier,
                Token::Comma,
                Token::Wildcard,
                Token::Identifier,
                Token::Colon,
                Token::Identifier,
                Token::RParen,
                Token::RightArrow,
                Token::Identifier,
                Token::Colon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_wildcard_vs_identifier() {
        let mut lexer = Lexer::new("_ _x __ x_1");
        assert_eq!(lexer.next_token().unwrap().token, Token::Wildcard);
        assert_eq!(lexer.next_token().unwrap().token, Token::Identifier);
        assert_eq!(lexer.next_token().unwrap().token, Token::Identifier);
        assert_eq!(lexer.next_token().unwrap().token, Token::Identifier);
    }

    #[test]
    fn test_longest_match_operators() {
        let tokens = collect(">>= >> > <<= << <= ... .. . ++ += +");
        assert_eq!(
            tokens,
            vec![
                Token::RShiftAssign,
                Token::RShift,
                Token::GreaterThan,
                Token::LShiftAssign,
                Token::LShift,
                Token::LessEq,
                Token::Ellipsis,
                Token::DotDot,
                Token::Dot,
                Token::Increment,
                Token::PlusAssign,
                Token::Plus,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_literals_and_text() {
        let source = "42 'c' \"hello\"";
        let mut lexer = Lexer::new(source);

        let int = lexer.next_token().unwrap();
        assert_eq!(int.token, Token::Int);
        assert_eq!(int.text(source), "42");

        let ch = lexer.next_token().unwrap();
        assert_eq!(ch.token, Token::Char);
        assert_eq!(ch.text(source), "c");

        let s = lexer.next_token().unwrap();
        assert_eq!(s.token, Token::String);
        assert_eq!(s.text(source), "hello");
    }

    #[test]
    fn test_unterminated_string_is_eof() {
        let mut lexer = Lexer::new("\"oops");
        assert_eq!(lexer.next_token().unwrap().token, Token::Eof);
    }

    #[test]
    fn test_unexpected_character() {
        let mut lexer = Lexer::new("@");
        assert!(matches!(
            lexer.next_token(),
            Err(LexError::UnexpectedCharacter { ch: '@', .. })
        ));
    }

    #[test]
    fn test_comments_skipped_or_yielded() {
        let source = "x # trailing\ny";
        let mut lexer = Lexer::new(source);
        assert_eq!(lexer.next_token().unwrap().token, Token::Identifier);
        assert_eq!(lexer.next_token().unwrap().token, Token::Identifier);

        let mut lexer = Lexer::new(source);
        lexer.set_flag(Flag::YieldComments, true);
        assert_eq!(lexer.next_token().unwrap().token, Token::Identifier);
        let comment = lexer.next_token().unwrap();
        assert_eq!(comment.token, Token::Comment);
        assert_eq!(comment.text(source), "# trailing");
    }

    #[test]
    fn test_indent_per_line_and_dedent() {
        // The parser raises the level after `:` and consumes one Indent per
        // statement line; every line of the block yields its own Indent.
        let source = "def f():\n  x\n  y\nz";
        let mut lexer = Lexer::new(source);
        for _ in 0..5 {
            lexer.next_token().unwrap();
        }
        lexer.set_flag(Flag::IndentationSensitive, true);
        lexer.increment_indent_level();

        assert_eq!(lexer.next_token().unwrap().token, Token::Indent);
        assert_eq!(lexer.next_token().unwrap().token, Token::Identifier);
        assert_eq!(lexer.next_token().unwrap().token, Token::Indent);
        assert_eq!(lexer.next_token().unwrap().token, Token::Identifier);

        let dedent = lexer.next_token().unwrap();
        assert_eq!(dedent.token, Token::Dedent);
        assert_eq!(dedent.pos.length, 0);
        lexer.decrement_indent_level();
        lexer.set_flag(Flag::IndentationSensitive, false);

        assert_eq!(lexer.next_token().unwrap().token, Token::Identifier);
        assert_eq!(lexer.next_token().unwrap().token, Token::Eof);
    }

    #[test]
    fn test_dedent_flush_at_eof() {
        let source = "x\n    y";
        let mut lexer = Lexer::new(source);
        assert_eq!(lexer.next_token().unwrap().token, Token::Identifier);

        lexer.set_flag(Flag::IndentationSensitive, true);
        lexer.increment_indent_level();
        lexer.increment_indent_level();

        assert_eq!(lexer.next_token().unwrap().token, Token::Indent);
        assert_eq!(lexer.next_token().unwrap().token, Token::Identifier);

        // Two open levels must flush as two Dedents before Eof.
        assert_eq!(lexer.next_token().unwrap().token, Token::Dedent);
        lexer.decrement_indent_level();
        assert_eq!(lexer.next_token().unwrap().token, Token::Dedent);
        lexer.decrement_indent_level();
        assert_eq!(lexer.next_token().unwrap().token, Token::Eof);
    }

    #[test]
    fn test_positions() {
        let source = "ab\n  cd";
        let mut lexer = Lexer::new(source);

        let ab = lexer.next_token().unwrap();
        assert_eq!((ab.pos.line, ab.pos.column, ab.pos.offset), (1, 1, 0));

        let cd = lexer.next_token().unwrap();
        assert_eq!((cd.pos.line, cd.pos.column, cd.pos.offset), (2, 3, 5));
        assert_eq!(cd.text(source), "cd");
    }
}
