use super::expressions::PREC_NONE;
use super::Parser;
use north_ast::{Block, Expr, IfExpr, ReturnStmt, Stmt};
use north_diagnostics::Diagnostic;
use north_lexer::Token;

impl<'src> Parser<'src> {
    /// blockStmt = INDENT primary { INDENT primary } DEDENT;
    ///
    /// Entering a block turns indentation sensitivity on and raises the
    /// expected level; the lexer then yields one `Indent` per statement line
    /// and a `Dedent` when the block closes (or input ends).
    pub(crate) fn parse_block_stmt(&mut self) -> Result<Block, Diagnostic> {
        self.set_indentation(true);
        self.lexer.increment_indent_level();

        let pos = self.current.pos;
        let mut nodes = Vec::new();

        while self.match_token(Token::Indent)? {
            if self.peek()? == Token::Else {
                self.next_token()?;
                self.attach_else_branch(&mut nodes)?;
                continue;
            }
            nodes.push(self.parse_primary()?);
        }

        self.expect(Token::Dedent)?;
        self.lexer.decrement_indent_level();

        if self.lexer.indent_level() == 0 {
            self.set_indentation(false);
        }

        Ok(Block { pos, nodes })
    }

    /// primary = returnStmt | expr;
    fn parse_primary(&mut self) -> Result<Stmt, Diagnostic> {
        if self.match_token(Token::Return)? {
            let pos = self.current.pos;
            let value = match self.peek()? {
                Token::Dedent | Token::Indent | Token::Eof => None,
                _ => Some(self.parse_expression(PREC_NONE)?),
            };
            return Ok(Stmt::Return(ReturnStmt { pos, value }));
        }

        Ok(Stmt::Expr(self.parse_expression(PREC_NONE)?))
    }

    /// An `else [if expr]: block` line. It belongs to the most recent `if`
    /// statement of the same block; anything else is an error.
    fn attach_else_branch(&mut self, nodes: &mut [Stmt]) -> Result<(), Diagnostic> {
        let else_pos = self.current.pos;
        let branch = self.parse_if_expr(true)?;

        let Some(Stmt::Expr(Expr::If(if_expr))) = nodes.last_mut() else {
            return Err(self.error_at("E0104", "else without if", else_pos));
        };

        fn attach(node: &mut IfExpr, branch: IfExpr) -> Result<(), ()> {
            if let Some(next) = node.else_branch.as_mut() {
                return attach(next, branch);
            }
            if node.cond.is_none() {
                // The chain already ends in a bare else.
                return Err(());
            }
            node.else_branch = Some(Box::new(branch));
            Ok(())
        }

        attach(if_expr, branch)
            .map_err(|()| self.error_at("E0104", "else without if", else_pos))
    }
}
