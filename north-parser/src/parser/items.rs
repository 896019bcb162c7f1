use super::Parser;
use north_ast::{
    EnumDecl, EnumMember, FunctionDecl, GenericParam, InterfaceDecl, RangeDecl, StructDecl,
    TupleDecl, TypeDef, TypeDefBody, TypeExpr, UnionDecl, VarDecl,
};
use north_diagnostics::Diagnostic;
use north_lexer::Token;

impl<'src> Parser<'src> {
    /// typeDefinition =
    ///     'type' IDENTIFIER genericTypeList '='
    ///         ( aliasDecl | structDecl | unionDecl
    ///         | enumDecl | tupleDecl | rangeExpr );
    pub(crate) fn parse_type_definition(&mut self) -> Result<(), Diagnostic> {
        self.expect(Token::Identifier)?;
        let pos = self.current.pos;
        let name = self.text().to_string();
        let generics = self.parse_generic_list()?;

        self.expect(Token::Assign)?;

        let mut is_ptr = false;
        let body = match self.next_token()?.token {
            Token::Mult => {
                // The pointer modifier lives on the definition itself.
                is_ptr = true;
                self.expect(Token::Identifier)?;
                if self.peek()? == Token::Comma {
                    TypeDefBody::Enum(self.parse_enum_decl()?)
                } else {
                    TypeDefBody::Alias(self.parse_alias_decl(false)?)
                }
            }
            Token::Identifier => {
                if self.peek()? == Token::Comma {
                    TypeDefBody::Enum(self.parse_enum_decl()?)
                } else {
                    TypeDefBody::Alias(self.parse_alias_decl(false)?)
                }
            }
            Token::LBrace => TypeDefBody::Struct(self.parse_struct_decl()?),
            Token::Or => TypeDefBody::Union(self.parse_union_decl()?),
            Token::Int | Token::String => {
                if self.peek()? == Token::DotDot {
                    TypeDefBody::Range(self.parse_range_decl()?)
                } else {
                    TypeDefBody::Enum(self.parse_enum_decl()?)
                }
            }
            Token::LParen => TypeDefBody::Tuple(self.parse_tuple_decl()?),
            _ => return Err(self.error_here("E0101", "invalid type declaration")),
        };

        let decl = TypeDef {
            pos,
            name,
            generics,
            is_ptr,
            body,
        };
        self.module.add_type(decl).map_err(|e| self.register_error(e))
    }

    /// A type reference: `i32`, `*i8`, `T`, `List[T]`. The current token is
    /// not yet part of the type.
    pub(crate) fn parse_type_expr(&mut self) -> Result<TypeExpr, Diagnostic> {
        match self.next_token()?.token {
            Token::Mult => {
                self.expect(Token::Identifier)?;
                self.parse_alias_decl(true)
            }
            Token::Identifier => self.parse_alias_decl(false),
            _ => Err(self.error_here("E0101", "invalid type declaration")),
        }
    }

    /// aliasDecl = IDENTIFIER genericTypeList;
    /// The identifier has already been consumed.
    fn parse_alias_decl(&mut self, is_ptr: bool) -> Result<TypeExpr, Diagnostic> {
        let pos = self.current.pos;
        let name = self.text().to_string();
        let generics = self.parse_generic_list()?;
        Ok(TypeExpr {
            pos,
            name,
            is_ptr,
            generics,
        })
    }

    /// structDecl = '{' varDecl { ',' varDecl } '}';
    fn parse_struct_decl(&mut self) -> Result<StructDecl, Diagnostic> {
        let pos = self.current.pos;
        let mut fields = Vec::new();

        while let Some(field) = self.parse_var_decl(false)? {
            fields.push(field);
            if !self.match_token(Token::Comma)? {
                break;
            }
        }

        self.expect(Token::RBrace)?;
        Ok(StructDecl { pos, fields })
    }

    /// unionDecl = '|' typeDecl { '|' typeDecl };
    fn parse_union_decl(&mut self) -> Result<UnionDecl, Diagnostic> {
        let pos = self.current.pos;
        let mut variants = Vec::new();

        loop {
            let variant = self.parse_type_expr().map_err(|_| {
                self.error_here(
                    "E0101",
                    format!("invalid union declaration: unexpected {}", self.current.token),
                )
            })?;
            variants.push(variant);
            if !self.match_token(Token::Or)? {
                break;
            }
        }

        Ok(UnionDecl { pos, variants })
    }

    /// enumDecl = IDENTIFIER { ',' IDENTIFIER };
    /// The first member is the current token.
    fn parse_enum_decl(&mut self) -> Result<EnumDecl, Diagnostic> {
        let pos = self.current.pos;
        let mut members = vec![EnumMember {
            pos: self.current.pos,
            name: self.text().to_string(),
        }];

        while self.match_token(Token::Comma)? {
            self.expect(Token::Identifier)?;
            members.push(EnumMember {
                pos: self.current.pos,
                name: self.text().to_string(),
            });
        }

        Ok(EnumDecl { pos, members })
    }

    /// tupleDecl = '(' varDecl { ',' varDecl } ')';
    fn parse_tuple_decl(&mut self) -> Result<TupleDecl, Diagnostic> {
        let pos = self.current.pos;
        let mut members = Vec::new();

        loop {
            let member = self.parse_var_decl(false)?.ok_or_else(|| {
                self.error_here(
                    "E0101",
                    format!("invalid tuple declaration: unexpected {}", self.current.token),
                )
            })?;
            members.push(member);
            if !self.match_token(Token::Comma)? {
                break;
            }
        }

        self.expect(Token::RParen)?;
        Ok(TupleDecl { pos, members })
    }

    /// rangeDecl = rangeExpr { ',' rangeExpr };
    /// The current token is the first range's begin literal.
    fn parse_range_decl(&mut self) -> Result<RangeDecl, Diagnostic> {
        let pos = self.current.pos;
        let mut ranges = Vec::new();

        loop {
            ranges.push(self.parse_range_expr()?);
            if !self.match_token(Token::Comma)? {
                break;
            }
            // Another range only follows if a literal leads into `..`.
            if !matches!(
                self.peek()?,
                Token::Int | Token::Identifier | Token::Char
            ) || self.peek2()? != Token::DotDot
            {
                break;
            }
            self.next_token()?;
        }

        Ok(RangeDecl { pos, ranges })
    }

    /// interfaceDecl = 'interface' IDENTIFIER [genericTypeList]
    ///     [':' IDENTIFIER [genericTypeList]] '='
    ///         INDENT functionSignature { INDENT functionSignature } DEDENT;
    pub(crate) fn parse_interface_decl(&mut self) -> Result<(), Diagnostic> {
        self.expect(Token::Identifier)?;
        let pos = self.current.pos;
        let name = self.text().to_string();
        let generics = self.parse_generic_list()?;

        let parent = if self.match_token(Token::Colon)? {
            self.expect(Token::Identifier)?;
            let parent = self.text().to_string();
            self.parse_generic_list()?;
            Some(parent)
        } else {
            None
        };

        self.expect(Token::Assign)?;

        self.lexer.increment_indent_level();
        self.set_indentation(true);

        let mut methods = Vec::new();
        while self.match_token(Token::Indent)? {
            self.expect(Token::Def)?;
            methods.push(self.parse_function_signature()?);
        }

        self.expect(Token::Dedent)?;
        self.lexer.decrement_indent_level();
        self.set_indentation(false);

        let decl = InterfaceDecl {
            pos,
            name,
            generics,
            parent,
            methods,
        };
        self.module
            .add_interface(decl)
            .map_err(|e| self.register_error(e))
    }

    /// functionDecl = functionSignature [':' blockStmt];
    pub(crate) fn parse_function_decl(&mut self) -> Result<(), Diagnostic> {
        let mut decl = self.parse_function_signature()?;

        if self.match_token(Token::Colon)? {
            decl.body = Some(self.parse_block_stmt()?);
        }

        self.module
            .add_function(decl)
            .map_err(|e| self.register_error(e))
    }

    /// functionSignature = 'def' IDENTIFIER [genericTypeList] argumentList
    ///     ['->' typeDecl];
    pub(crate) fn parse_function_signature(&mut self) -> Result<FunctionDecl, Diagnostic> {
        self.expect(Token::Identifier)?;
        let pos = self.current.pos;
        let name = self.text().to_string();

        let generics = self.parse_generic_list()?;

        let mut decl = FunctionDecl {
            pos,
            name,
            generics,
            args: Vec::new(),
            ret: None,
            body: None,
            variadic: false,
        };
        self.parse_argument_list(&mut decl)?;

        if self.match_token(Token::RightArrow)? {
            decl.ret = Some(self.parse_type_expr()?);
        }

        Ok(decl)
    }

    /// argumentList = '(' [ varDecl { ',' varDecl } ] ['...'] ')';
    fn parse_argument_list(&mut self, decl: &mut FunctionDecl) -> Result<(), Diagnostic> {
        self.expect(Token::LParen)?;
        if self.match_token(Token::RParen)? {
            return Ok(());
        }

        loop {
            if self.match_token(Token::Ellipsis)? {
                decl.variadic = true;
                break;
            }
            let arg = self.parse_var_decl(true)?.ok_or_else(|| {
                self.error_here(
                    "E0100",
                    format!("expected identifier or `_`, found {}", self.current.token),
                )
            })?;
            decl.args.push(arg);
            if !self.match_token(Token::Comma)? {
                break;
            }
        }

        self.expect(Token::RParen)?;
        Ok(())
    }

    /// varDecl = [WILDCARD | IDENTIFIER] IDENTIFIER [':' typeDecl] ['=' expr];
    ///
    /// For arguments the leading identifier (or `_`) may be a public label;
    /// the following identifier is then the internal name.
    pub(crate) fn parse_var_decl(&mut self, is_arg: bool) -> Result<Option<VarDecl>, Diagnostic> {
        if !self.match_token(Token::Identifier)? && !self.match_token(Token::Wildcard)? {
            return Ok(None);
        }

        let pos = self.current.pos;
        let mut name = self.text().to_string();
        let mut named_arg = None;

        if is_arg && self.match_token(Token::Identifier)? {
            named_arg = Some(name);
            name = self.text().to_string();
        }

        let ty = if self.match_token(Token::Colon)? {
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        let value = if self.match_token(Token::Assign)? {
            Some(self.parse_expression(super::expressions::PREC_NONE)?)
        } else {
            None
        };

        Ok(Some(VarDecl {
            pos,
            name,
            named_arg,
            ty,
            value,
            is_arg,
        }))
    }

    /// genericTypeList = [ '[' IDENTIFIER { ',' IDENTIFIER } ']' ];
    pub(crate) fn parse_generic_list(&mut self) -> Result<Vec<GenericParam>, Diagnostic> {
        let mut generics = Vec::new();
        if !self.match_token(Token::LBracket)? {
            return Ok(generics);
        }

        loop {
            self.expect(Token::Identifier)?;
            generics.push(GenericParam {
                pos: self.current.pos,
                name: self.text().to_string(),
            });
            if !self.match_token(Token::Comma)? {
                break;
            }
        }

        self.expect(Token::RBracket)?;
        Ok(generics)
    }
}
