use super::Parser;
use north_ast::{
    ArrayExpr, ArrayIndexExpr, AssignExpr, BinaryExpr, CallArg, CallExpr, Expr, ForExpr,
    IdentPart, IfExpr, Literal, QualifiedIdent, RangeExpr, StructInitExpr, UnaryExpr, WhileExpr,
};
use north_diagnostics::Diagnostic;
use north_lexer::{Flag, Token};

// Precedence levels, weakest to strongest.
pub(crate) const PREC_NONE: u8 = 0;
pub(crate) const PREC_ASSIGN: u8 = 1;
pub(crate) const PREC_COND: u8 = 2;
pub(crate) const PREC_OROR: u8 = 3;
pub(crate) const PREC_ANDAND: u8 = 4;
pub(crate) const PREC_EQ: u8 = 5;
pub(crate) const PREC_COMPARE: u8 = 6;
pub(crate) const PREC_OP: u8 = 7;
pub(crate) const PREC_BINARY: u8 = 8;
pub(crate) const PREC_UNARY: u8 = 9;
pub(crate) const PREC_CALL: u8 = 10;

pub(crate) fn token_prec(token: Token) -> u8 {
    match token {
        Token::LParen | Token::LBrace | Token::LBracket | Token::Dot => PREC_CALL,
        Token::Not | Token::Increment | Token::Decrement => PREC_UNARY,
        Token::Div | Token::Mult | Token::And | Token::RShift | Token::LShift => PREC_BINARY,
        Token::Plus | Token::Minus | Token::Or => PREC_OP,
        Token::GreaterThan | Token::LessThan | Token::GreaterEq | Token::LessEq => PREC_COMPARE,
        Token::Eq | Token::NotEq => PREC_EQ,
        Token::AndAnd => PREC_ANDAND,
        Token::OrOr => PREC_OROR,
        Token::If => PREC_COND,
        Token::Assign
        | Token::DivAssign
        | Token::MultAssign
        | Token::PlusAssign
        | Token::MinusAssign
        | Token::AndAssign
        | Token::OrAssign
        | Token::RShiftAssign
        | Token::LShiftAssign => PREC_ASSIGN,
        _ => PREC_NONE,
    }
}

impl<'src> Parser<'src> {
    pub(crate) fn parse_expression(&mut self, prec: u8) -> Result<Expr, Diagnostic> {
        self.next_token()?;
        let mut result = self.parse_prefix()?;

        while prec < token_prec(self.peek()?) {
            self.next_token()?;
            result = self.parse_infix(result)?;
        }

        Ok(result)
    }

    fn parse_prefix(&mut self) -> Result<Expr, Diagnostic> {
        let info = self.current;
        match info.token {
            Token::Mult | Token::Not | Token::Minus | Token::Increment | Token::Decrement => {
                Ok(Expr::Unary(UnaryExpr {
                    pos: info.pos,
                    op: info.token,
                    operand: Box::new(self.parse_expression(PREC_UNARY)?),
                }))
            }

            Token::Identifier => {
                if self.peek()? == Token::Dot {
                    return Ok(Expr::Qualified(self.parse_qualified_identifier()?));
                }
                Ok(Expr::Literal(Literal::Ident {
                    pos: info.pos,
                    name: self.text().to_string(),
                }))
            }

            Token::Int => {
                let value = self.text().parse::<i64>().map_err(|_| {
                    self.error_here("E0103", "integer literal is too large")
                })?;
                Ok(Expr::Literal(Literal::Int {
                    pos: info.pos,
                    value,
                }))
            }

            Token::Char => {
                let value = self.text().chars().next().unwrap_or('\0');
                Ok(Expr::Literal(Literal::Char {
                    pos: info.pos,
                    value,
                }))
            }

            Token::String => Ok(Expr::Literal(Literal::Str {
                pos: info.pos,
                value: self.text().to_string(),
            })),

            Token::Nil => Ok(Expr::Literal(Literal::Nil { pos: info.pos })),

            Token::If => Ok(Expr::If(Box::new(self.parse_if_expr(false)?))),

            // A well-placed `else` is stitched onto its `if` by the block
            // parser; reaching it here means there was no `if` before it.
            Token::Else => Err(self.error_at("E0104", "else without if", info.pos)),

            Token::Var => {
                let var = self.parse_var_decl(false)?.ok_or_else(|| {
                    self.error_here("E0101", "invalid variable declaration")
                })?;
                Ok(Expr::Var(Box::new(var)))
            }

            Token::For => Ok(Expr::For(Box::new(self.parse_for_expr()?))),
            Token::While => Ok(Expr::While(Box::new(self.parse_while_expr()?))),

            Token::LParen => {
                let inner = self.parse_expression(PREC_NONE)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }

            Token::LBracket => self.parse_array_expr(),

            other => Err(self.error_at(
                "E0105",
                format!("expected expression, found {}", other),
                info.pos,
            )),
        }
    }

    fn parse_infix(&mut self, lhs: Expr) -> Result<Expr, Diagnostic> {
        let info = self.current;
        match info.token {
            Token::LParen => Ok(Expr::Call(self.parse_call_expr(lhs)?)),
            Token::LBracket => Ok(Expr::ArrayIndex(self.parse_array_index_expr(lhs)?)),
            Token::LBrace => Ok(Expr::StructInit(self.parse_struct_init_expr(lhs)?)),

            Token::OrOr
            | Token::AndAnd
            | Token::Eq
            | Token::NotEq
            | Token::LessThan
            | Token::LessEq
            | Token::GreaterThan
            | Token::GreaterEq
            | Token::Mult
            | Token::Div
            | Token::LShift
            | Token::RShift
            | Token::And
            | Token::Plus
            | Token::Minus
            | Token::Or => Ok(Expr::Binary(BinaryExpr {
                pos: info.pos,
                op: info.token,
                lhs: Box::new(lhs),
                rhs: Box::new(self.parse_expression(token_prec(info.token))?),
            })),

            Token::Assign
            | Token::DivAssign
            | Token::MultAssign
            | Token::PlusAssign
            | Token::MinusAssign
            | Token::AndAssign
            | Token::OrAssign
            | Token::RShiftAssign
            | Token::LShiftAssign => Ok(Expr::Assign(AssignExpr {
                pos: info.pos,
                op: info.token,
                lhs: Box::new(lhs),
                rhs: Box::new(self.parse_expression(token_prec(info.token))?),
            })),

            other => Err(self.error_at(
                "E0105",
                format!("{} cannot be used as an infix operator", other),
                info.pos,
            )),
        }
    }

    /// qualifiedIdentifier = IDENTIFIER '.' IDENTIFIER { '.' IDENTIFIER };
    fn parse_qualified_identifier(&mut self) -> Result<QualifiedIdent, Diagnostic> {
        let mut ident = QualifiedIdent::single(self.current.pos, self.text());

        while self.match_token(Token::Dot)? {
            self.expect(Token::Identifier)?;
            ident.parts.push(IdentPart {
                pos: self.current.pos,
                name: self.text().to_string(),
            });
        }

        Ok(ident)
    }

    /// callExpr = target '(' [ [IDENTIFIER ':'] expr { ',' [IDENTIFIER ':'] expr } ] ')';
    ///
    /// Labels are recognized by two-token lookahead so a plain identifier
    /// argument is not mistaken for a label.
    fn parse_call_expr(&mut self, target: Expr) -> Result<CallExpr, Diagnostic> {
        let target = match target {
            Expr::Qualified(qualified) => qualified,
            Expr::Literal(Literal::Ident { pos, name }) => QualifiedIdent::single(pos, name),
            other => {
                return Err(self.error_at("E0106", "invalid call expression", other.pos()));
            }
        };
        let pos = target.pos;

        let mut args = Vec::new();
        if self.peek()? != Token::RParen {
            loop {
                if self.peek()? == Token::Identifier && self.peek2()? == Token::Colon {
                    self.next_token()?;
                    let label = self.text().to_string();
                    let label_pos = self.current.pos;
                    self.next_token()?;
                    args.push(CallArg {
                        label: Some(label),
                        label_pos: Some(label_pos),
                        value: self.parse_expression(PREC_NONE)?,
                    });
                } else {
                    args.push(CallArg {
                        label: None,
                        label_pos: None,
                        value: self.parse_expression(PREC_NONE)?,
                    });
                }

                if !self.match_token(Token::Comma)? {
                    break;
                }
            }
        }

        self.expect(Token::RParen)?;

        Ok(CallExpr { pos, target, args })
    }

    /// arrayIndexExpr = target '[' expr ']';
    fn parse_array_index_expr(&mut self, target: Expr) -> Result<ArrayIndexExpr, Diagnostic> {
        let pos = self.current.pos;
        let index = self.parse_expression(PREC_NONE)?;
        self.expect(Token::RBracket)?;
        Ok(ArrayIndexExpr {
            pos,
            target: Box::new(target),
            index: Box::new(index),
        })
    }

    /// structInitExpr = IDENTIFIER '{' expr { ',' expr } '}';
    fn parse_struct_init_expr(&mut self, target: Expr) -> Result<StructInitExpr, Diagnostic> {
        let name = match target {
            Expr::Literal(Literal::Ident { name, .. }) => name,
            other => {
                return Err(self.error_at("E0106", "invalid struct initializer", other.pos()));
            }
        };
        let pos = self.current.pos;

        let mut values = Vec::new();
        loop {
            values.push(self.parse_expression(PREC_NONE)?);
            if !self.match_token(Token::Comma)? {
                break;
            }
        }

        self.expect(Token::RBrace)?;

        Ok(StructInitExpr { pos, name, values })
    }

    /// ifExpr = 'if' expr ':' blockStmt;
    /// An `else [if]` branch arrives with `cond` absent for the bare form.
    pub(crate) fn parse_if_expr(&mut self, is_else: bool) -> Result<IfExpr, Diagnostic> {
        let pos = self.current.pos;

        let cond = if is_else {
            if self.match_token(Token::If)? {
                Some(self.parse_expression(PREC_NONE)?)
            } else {
                None
            }
        } else {
            Some(self.parse_expression(PREC_NONE)?)
        };

        self.expect(Token::Colon)?;
        let block = self.parse_block_stmt()?;

        Ok(IfExpr {
            pos,
            cond,
            block,
            else_branch: None,
        })
    }

    /// forExpr = 'for' literal 'in' (rangeExpr | IDENTIFIER) ':' blockStmt;
    fn parse_for_expr(&mut self) -> Result<ForExpr, Diagnostic> {
        let pos = self.current.pos;

        if !matches!(self.peek()?, Token::Int | Token::Identifier | Token::Char) {
            let found = self.next_token()?;
            return Err(self.error_at(
                "E0107",
                format!("invalid for expression: unexpected {}", found.token),
                found.pos,
            ));
        }
        self.next_token()?;
        let iter_pos = self.current.pos;
        let iter_name = self.text().to_string();

        self.expect(Token::In)?;

        let range = match self.peek()? {
            Token::Int | Token::Identifier | Token::Char => {
                self.next_token()?;
                if self.peek()? == Token::DotDot {
                    Expr::Range(Box::new(self.parse_range_expr()?))
                } else if self.current.token == Token::Identifier {
                    Expr::Literal(Literal::Ident {
                        pos: self.current.pos,
                        name: self.text().to_string(),
                    })
                } else {
                    return Err(self.error_here(
                        "E0107",
                        format!("invalid for expression: unexpected {}", self.current.token),
                    ));
                }
            }
            other => {
                return Err(self.error_here(
                    "E0107",
                    format!("invalid for expression: unexpected {}", other),
                ));
            }
        };

        self.expect(Token::Colon)?;
        let block = self.parse_block_stmt()?;

        Ok(ForExpr {
            pos,
            iter_pos,
            iter_name,
            range,
            block,
        })
    }

    /// whileExpr = 'while' expr ':' blockStmt;
    fn parse_while_expr(&mut self) -> Result<WhileExpr, Diagnostic> {
        let pos = self.current.pos;
        let cond = self.parse_expression(PREC_NONE)?;
        self.expect(Token::Colon)?;
        let block = self.parse_block_stmt()?;

        Ok(WhileExpr { pos, cond, block })
    }

    /// rangeExpr = literal '..' literal;
    /// The begin literal is the current token.
    pub(crate) fn parse_range_expr(&mut self) -> Result<RangeExpr, Diagnostic> {
        let pos = self.current.pos;
        let begin = self.literal_from_current()?;

        self.expect(Token::DotDot)?;

        if !matches!(self.peek()?, Token::Int | Token::Identifier | Token::Char) {
            let found = self.next_token()?;
            return Err(self.error_at(
                "E0108",
                format!("invalid range expression: unexpected {}", found.token),
                found.pos,
            ));
        }
        self.next_token()?;
        let end = self.literal_from_current()?;

        Ok(RangeExpr {
            pos,
            begin: Box::new(begin),
            end: Box::new(end),
        })
    }

    fn literal_from_current(&mut self) -> Result<Expr, Diagnostic> {
        let pos = self.current.pos;
        match self.current.token {
            Token::Int => {
                let value = self.text().parse::<i64>().map_err(|_| {
                    self.error_here("E0103", "integer literal is too large")
                })?;
                Ok(Expr::Literal(Literal::Int { pos, value }))
            }
            Token::Char => Ok(Expr::Literal(Literal::Char {
                pos,
                value: self.text().chars().next().unwrap_or('\0'),
            })),
            Token::Identifier => Ok(Expr::Literal(Literal::Ident {
                pos,
                name: self.text().to_string(),
            })),
            other => Err(self.error_here(
                "E0108",
                format!("invalid range expression: unexpected {}", other),
            )),
        }
    }

    /// arrayExpr = '[' expr { ',' expr } ']';
    ///
    /// Indentation sensitivity is suspended inside the brackets so literals
    /// may span lines.
    fn parse_array_expr(&mut self) -> Result<Expr, Diagnostic> {
        let pos = self.current.pos;

        let was_sensitive = self.lexer.flag(Flag::IndentationSensitive);
        self.set_indentation(false);

        let mut values = Vec::new();
        if self.peek()? != Token::RBracket {
            loop {
                values.push(self.parse_expression(PREC_NONE)?);
                if !self.match_token(Token::Comma)? {
                    break;
                }
            }
        }
        self.expect(Token::RBracket)?;

        self.set_indentation(was_sensitive);

        if values.is_empty() {
            return Err(self.error_at("E0109", "unimplemented: empty array", pos));
        }

        Ok(Expr::Array(ArrayExpr { pos, values }))
    }
}
