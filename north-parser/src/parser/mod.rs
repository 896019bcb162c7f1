use north_ast::{Module, ModuleError, OpenStmt};
use north_diagnostics::{Diagnostic, Span};
use north_lexer::{Flag, Lexer, Position, Token, TokenInfo};
use std::collections::VecDeque;
use std::path::Path;

mod expressions;
mod items;
mod statements;

pub(crate) fn span_of(pos: Position) -> Span {
    Span::new(pos.offset, pos.length.max(1))
}

/// toplevel = { openStmt
///            | typeDefinition
///            | functionDecl
///            | interfaceDecl
///            | varDecl };
pub struct Parser<'src> {
    pub(crate) lexer: Lexer<'src>,
    pub(crate) source: &'src str,
    pub(crate) module: Module,
    lookahead: VecDeque<TokenInfo>,
    pub(crate) current: TokenInfo,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, file_name: &str) -> Self {
        let module_name = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);

        Self {
            lexer: Lexer::new(source),
            source,
            module: Module::new(module_name),
            lookahead: VecDeque::new(),
            current: TokenInfo {
                token: Token::Eof,
                pos: Position {
                    line: 1,
                    column: 1,
                    offset: 0,
                    length: 0,
                },
            },
        }
    }

    pub fn parse(mut self) -> Result<Module, Diagnostic> {
        loop {
            match self.next_token()?.token {
                Token::Open => self.parse_open_stmt()?,
                Token::Type => self.parse_type_definition()?,
                Token::Def => self.parse_function_decl()?,
                Token::Interface => self.parse_interface_decl()?,
                Token::Var => {
                    let pos = self.current.pos;
                    let var = self.parse_var_decl(false)?.ok_or_else(|| {
                        self.error_at("E0101", "invalid variable declaration", pos)
                    })?;
                    self.module.add_global(var);
                }
                Token::Eof => return Ok(self.module),
                other => {
                    return Err(self.error_here(
                        "E0102",
                        format!("unexpected {} at top level", other),
                    ));
                }
            }
        }
    }

    /// openStmt = 'open' IDENTIFIER;
    fn parse_open_stmt(&mut self) -> Result<(), Diagnostic> {
        self.expect(Token::Identifier)?;
        let open = OpenStmt {
            pos: self.current.pos,
            module: self.text().to_string(),
        };
        self.module.add_import(open);
        Ok(())
    }

    // ==================== Token plumbing ====================

    fn pull(&mut self) -> Result<TokenInfo, Diagnostic> {
        self.lexer.next_token().map_err(|err| match err {
            north_lexer::LexError::UnexpectedCharacter { ch, pos } => {
                Diagnostic::error("E0001", format!("unexpected character '{}'", ch))
                    .with_span(span_of(pos))
            }
        })
    }

    pub(crate) fn next_token(&mut self) -> Result<TokenInfo, Diagnostic> {
        self.current = match self.lookahead.pop_front() {
            Some(info) => info,
            None => self.pull()?,
        };
        Ok(self.current)
    }

    pub(crate) fn peek(&mut self) -> Result<Token, Diagnostic> {
        if self.lookahead.is_empty() {
            let info = self.pull()?;
            self.lookahead.push_back(info);
        }
        Ok(self.lookahead[0].token)
    }

    pub(crate) fn peek2(&mut self) -> Result<Token, Diagnostic> {
        while self.lookahead.len() < 2 {
            let info = self.pull()?;
            self.lookahead.push_back(info);
        }
        Ok(self.lookahead[1].token)
    }

    pub(crate) fn match_token(&mut self, token: Token) -> Result<bool, Diagnostic> {
        if self.peek()? == token {
            self.next_token()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn expect(&mut self, token: Token) -> Result<TokenInfo, Diagnostic> {
        if self.match_token(token)? {
            return Ok(self.current);
        }
        let found = self.next_token()?;
        Err(self.error_at(
            "E0100",
            format!("expected {}, found {}", token, found.token),
            found.pos,
        ))
    }

    /// Lexeme of the most recently consumed token.
    pub(crate) fn text(&self) -> &'src str {
        self.current.text(self.source)
    }

    pub(crate) fn error_at(
        &self,
        code: &'static str,
        message: impl Into<String>,
        pos: Position,
    ) -> Diagnostic {
        Diagnostic::error(code, message).with_span(span_of(pos))
    }

    pub(crate) fn error_here(
        &self,
        code: &'static str,
        message: impl Into<String>,
    ) -> Diagnostic {
        self.error_at(code, message, self.current.pos)
    }

    pub(crate) fn register_error(&self, err: ModuleError) -> Diagnostic {
        let pos = err.pos();
        self.error_at("E0200", err.to_string(), pos)
    }

    pub(crate) fn set_indentation(&mut self, on: bool) {
        self.lexer.set_flag(Flag::IndentationSensitive, on);
    }
}
