use super::{span_of, Lowering, Mode};
use crate::inference::InferCx;
use crate::scope::Binding;
use crate::types::Type;
use north_ast as ast;
use north_diagnostics::{find_similar_name, Diagnostic};
use north_ir as ir;
use north_lexer::{Position, Token};

/// Escape processing for string literals: the lexeme is kept raw until
/// lowering turns it into a global constant.
pub(crate) fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0B'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

impl<'m> Lowering<'m> {
    pub(crate) fn lower_expr(
        &mut self,
        expr: &ast::Expr,
        mode: Mode,
    ) -> Result<ir::Value, Diagnostic> {
        match expr {
            ast::Expr::Literal(literal) => self.lower_literal(literal, mode),
            ast::Expr::Unary(unary) => self.lower_unary(unary),
            ast::Expr::Binary(binary) => self.lower_binary(binary),
            ast::Expr::Assign(assign) => self.lower_assign(assign),
            ast::Expr::Call(call) => self.lower_call(call),
            ast::Expr::ArrayIndex(index) => self.lower_array_index(index, mode),
            ast::Expr::Qualified(qualified) => self.lower_qualified(qualified, mode),
            ast::Expr::If(if_expr) => self.lower_if(if_expr),
            ast::Expr::For(for_expr) => self.lower_for(for_expr),
            ast::Expr::While(while_expr) => self.lower_while(while_expr),
            ast::Expr::StructInit(init) => self.lower_struct_init(init),
            ast::Expr::Array(array) => self.lower_array(array),
            ast::Expr::Var(var) => self.lower_var_decl(var),
            ast::Expr::Range(range) => Err(Diagnostic::error(
                "E0108",
                "a range is only valid inside a for expression",
            )
            .with_span(span_of(range.pos))),
        }
    }

    fn lower_literal(
        &mut self,
        literal: &ast::Literal,
        mode: Mode,
    ) -> Result<ir::Value, Diagnostic> {
        match literal {
            ast::Literal::Int { value, .. } => Ok(Self::const_i32(*value)),
            ast::Literal::Char { value, .. } => Ok(ir::Value::ConstInt {
                ty: ir::Type::I8,
                value: *value as i64,
            }),
            ast::Literal::Nil { .. } => Ok(ir::Value::ConstNull(ir::Type::I32)),
            ast::Literal::Str { value, .. } => {
                let index = self.ir.add_string(unescape(value));
                Ok(ir::Value::Str(index))
            }
            ast::Literal::Ident { pos, name } => {
                let Some(binding) = self.scopes.lookup(name) else {
                    return Err(self.unknown_symbol(name, *pos));
                };
                let binding = binding.clone();

                // Arguments and induction variables hold their value
                // directly; only stack slots go through a load.
                if !binding.is_slot {
                    return Ok(binding.value);
                }
                match mode {
                    Mode::Address => Ok(binding.value),
                    Mode::Value | Mode::Argument => {
                        if binding.ty.ir.is_aggregate() {
                            // Structs and arrays stay addressable; arrays
                            // decay at call sites instead.
                            return Ok(binding.value);
                        }
                        self.emit(ir::InstKind::Load { ptr: binding.value }, *pos)
                    }
                }
            }
        }
    }

    fn lower_unary(&mut self, unary: &ast::UnaryExpr) -> Result<ir::Value, Diagnostic> {
        let pos = unary.pos;
        match unary.op {
            Token::Mult => {
                let value = self.lower_expr(&unary.operand, Mode::Value)?;
                self.emit(ir::InstKind::Load { ptr: value }, pos)
            }
            Token::Not => {
                let value = self.lower_expr(&unary.operand, Mode::Value)?;
                self.emit(ir::InstKind::Not { value }, pos)
            }
            Token::Minus => {
                let value = self.lower_expr(&unary.operand, Mode::Value)?;
                self.emit(ir::InstKind::Neg { value }, pos)
            }
            Token::Increment | Token::Decrement => {
                let slot = self.lower_expr(&unary.operand, Mode::Address)?;
                let loaded = self.emit(ir::InstKind::Load { ptr: slot.clone() }, pos)?;
                let one = ir::Value::ConstInt {
                    ty: self.vtype(&loaded),
                    value: 1,
                };
                let op = if unary.op == Token::Increment {
                    ir::BinOp::Add
                } else {
                    ir::BinOp::Sub
                };
                let next = self.emit(
                    ir::InstKind::Binary {
                        op,
                        lhs: loaded,
                        rhs: one,
                    },
                    pos,
                )?;
                self.emit(
                    ir::InstKind::Store {
                        value: next.clone(),
                        ptr: slot,
                    },
                    pos,
                )?;
                Ok(next)
            }
            other => Err(Diagnostic::error(
                "E0901",
                format!("internal: unsupported unary operator {}", other),
            )
            .with_span(span_of(pos))),
        }
    }

    fn lower_binary(&mut self, binary: &ast::BinaryExpr) -> Result<ir::Value, Diagnostic> {
        let pos = binary.pos;
        let lhs = self.lower_expr(&binary.lhs, Mode::Value)?;
        let rhs = self.lower_expr(&binary.rhs, Mode::Value)?;

        // The logical operators are emitted bitwise over truthiness
        // comparisons, not as short-circuit control flow.
        if matches!(binary.op, Token::OrOr | Token::AndAnd) {
            let op = if binary.op == Token::OrOr {
                ir::BinOp::Or
            } else {
                ir::BinOp::And
            };
            let lhs = self.cmp_with_true(lhs, pos)?;
            let rhs = self.cmp_with_true(rhs, pos)?;
            return self.emit(ir::InstKind::Binary { op, lhs, rhs }, pos);
        }

        let kind = match binary.op {
            Token::Mult => ir::InstKind::Binary {
                op: ir::BinOp::Mul,
                lhs,
                rhs,
            },
            Token::Div => ir::InstKind::Binary {
                op: ir::BinOp::SDiv,
                lhs,
                rhs,
            },
            // Adding to a pointer is pointer arithmetic.
            Token::Plus if self.vtype(&lhs).is_pointer() => ir::InstKind::GetElementPtr {
                base: lhs,
                indices: vec![rhs],
                in_bounds: false,
            },
            Token::Plus => ir::InstKind::Binary {
                op: ir::BinOp::Add,
                lhs,
                rhs,
            },
            Token::Minus => ir::InstKind::Binary {
                op: ir::BinOp::Sub,
                lhs,
                rhs,
            },
            Token::LShift => ir::InstKind::Binary {
                op: ir::BinOp::Shl,
                lhs,
                rhs,
            },
            Token::RShift => ir::InstKind::Binary {
                op: ir::BinOp::LShr,
                lhs,
                rhs,
            },
            Token::And => ir::InstKind::Binary {
                op: ir::BinOp::And,
                lhs,
                rhs,
            },
            Token::Or => ir::InstKind::Binary {
                op: ir::BinOp::Or,
                lhs,
                rhs,
            },
            Token::Eq => ir::InstKind::Icmp {
                pred: ir::Predicate::Eq,
                lhs,
                rhs,
            },
            Token::NotEq => ir::InstKind::Icmp {
                pred: ir::Predicate::Ne,
                lhs,
                rhs,
            },
            Token::LessThan => ir::InstKind::Icmp {
                pred: ir::Predicate::Slt,
                lhs,
                rhs,
            },
            Token::LessEq => ir::InstKind::Icmp {
                pred: ir::Predicate::Sle,
                lhs,
                rhs,
            },
            Token::GreaterThan => ir::InstKind::Icmp {
                pred: ir::Predicate::Sgt,
                lhs,
                rhs,
            },
            Token::GreaterEq => ir::InstKind::Icmp {
                pred: ir::Predicate::Sge,
                lhs,
                rhs,
            },
            other => {
                return Err(Diagnostic::error(
                    "E0901",
                    format!("internal: unsupported binary operator {}", other),
                )
                .with_span(span_of(pos)));
            }
        };

        self.emit(kind, pos)
    }

    fn lower_assign(&mut self, assign: &ast::AssignExpr) -> Result<ir::Value, Diagnostic> {
        let pos = assign.pos;
        let lhs = self.lower_expr(&assign.lhs, Mode::Address)?;
        let rhs = self.lower_expr(&assign.rhs, Mode::Value)?;

        if !self.vtype(&lhs).is_pointer() {
            return Err(
                Diagnostic::error("E0306", "invalid assign expression").with_span(span_of(pos))
            );
        }

        let op = match assign.op {
            Token::Assign => {
                self.emit(
                    ir::InstKind::Store {
                        value: rhs.clone(),
                        ptr: lhs,
                    },
                    pos,
                )?;
                return Ok(rhs);
            }
            Token::DivAssign => ir::BinOp::SDiv,
            Token::MultAssign => ir::BinOp::Mul,
            Token::PlusAssign => ir::BinOp::Add,
            Token::MinusAssign => ir::BinOp::Sub,
            Token::RShiftAssign => ir::BinOp::LShr,
            Token::LShiftAssign => ir::BinOp::Shl,
            Token::AndAssign => ir::BinOp::And,
            Token::OrAssign => ir::BinOp::Or,
            other => {
                return Err(Diagnostic::error(
                    "E0901",
                    format!("internal: unsupported assign operator {}", other),
                )
                .with_span(span_of(pos)));
            }
        };

        let loaded = self.emit(ir::InstKind::Load { ptr: lhs.clone() }, pos)?;
        let rhs = if self.vtype(&rhs).is_pointer() {
            self.emit(ir::InstKind::Load { ptr: rhs }, pos)?
        } else {
            rhs
        };
        let result = self.emit(
            ir::InstKind::Binary {
                op,
                lhs: loaded,
                rhs,
            },
            pos,
        )?;
        self.emit(
            ir::InstKind::Store {
                value: result.clone(),
                ptr: lhs,
            },
            pos,
        )?;
        Ok(result)
    }

    fn lower_call(&mut self, call: &ast::CallExpr) -> Result<ir::Value, Diagnostic> {
        let pos = call.pos;
        let module = self.module;
        let Some(decl) = module.get_fn(call) else {
            let mut diag = Diagnostic::error("E0401", "unknown function referenced")
                .with_span(span_of(pos));
            if call.target.is_single() {
                let candidates = self.module.functions.keys().map(|k| k.as_str());
                if let Some(similar) = find_similar_name(call.target.first(), candidates) {
                    diag = diag.with_help(format!("did you mean `{}`?", similar));
                }
            }
            return Err(diag);
        };

        // Arity, honoring variadics: a variadic callee accepts any number of
        // extra arguments, including none.
        let argc = call.args.len();
        if decl.variadic {
            if argc < decl.args.len() {
                return Err(Diagnostic::error(
                    "E0402",
                    format!("expected at least {} args, not {}", decl.args.len(), argc),
                )
                .with_span(span_of(pos)));
            }
        } else if argc != decl.args.len() {
            return Err(Diagnostic::error(
                "E0402",
                format!("expected {} args, not {}", decl.args.len(), argc),
            )
            .with_span(span_of(pos)));
        }

        // Labels: a `_`-labeled parameter takes an unlabeled argument, any
        // other label must be spelled out by the caller.
        for (call_arg, param) in call.args.iter().zip(decl.args.iter()) {
            let label = param.label();
            if label != "_" {
                match &call_arg.label {
                    None => {
                        return Err(Diagnostic::error(
                            "E0403",
                            format!("expected label `{}`", label),
                        )
                        .with_span(span_of(call_arg.value.pos())));
                    }
                    Some(given) if given != label => {
                        return Err(Diagnostic::error(
                            "E0403",
                            format!("expected label `{}`", label),
                        )
                        .with_span(span_of(
                            call_arg.label_pos.unwrap_or_else(|| call_arg.value.pos()),
                        )));
                    }
                    _ => {}
                }
            } else if let Some(given) = &call_arg.label {
                return Err(Diagnostic::error(
                    "E0403",
                    format!("unexpected label `{}`", given),
                )
                .with_span(span_of(
                    call_arg.label_pos.unwrap_or_else(|| call_arg.value.pos()),
                )));
            }
        }

        // Modules without generic declarations skip instantiation entirely.
        let symbol = if module.has_generic_declarations && decl.is_generic() {
            let instantiation = self.instances.instantiate(
                decl,
                call,
                &InferCx {
                    module: self.module,
                    types: &self.types,
                    scopes: &self.scopes,
                },
            )?;
            if let Some(created) = instantiation.created {
                let (fn_id, arg_types, ret) = self.declare_fn_ir(
                    &created.decl,
                    &created.arg_overrides,
                    &created.ret_override,
                )?;
                self.lower_function(&created.decl, fn_id, arg_types, ret)?;
            }
            instantiation.symbol
        } else {
            decl.name.clone()
        };

        let mut args = Vec::with_capacity(call.args.len());
        for call_arg in &call.args {
            let mut value = self.lower_expr(&call_arg.value, Mode::Argument)?;
            // An array argument decays to a pointer to its first element.
            let ty = self.vtype(&value);
            if let Some(ir::Type::Array(elem, _)) = ty.pointee() {
                let to = (**elem).clone().ptr_to();
                value = self.emit(ir::InstKind::Bitcast { value, to }, pos)?;
            }
            args.push(value);
        }

        self.emit(ir::InstKind::Call {
            callee: symbol,
            args,
        }, pos)
    }

    fn lower_array_index(
        &mut self,
        index: &ast::ArrayIndexExpr,
        mode: Mode,
    ) -> Result<ir::Value, Diagnostic> {
        let pos = index.pos;
        let base = self.lower_expr(&index.target, Mode::Address)?;
        let mut idx = self.lower_expr(&index.index, Mode::Value)?;
        if self.vtype(&idx).is_pointer() {
            idx = self.emit(ir::InstKind::Load { ptr: idx }, pos)?;
        }

        let base_ty = self.vtype(&base);
        let gep = match base_ty.pointee() {
            Some(ir::Type::Array(..)) => self.emit(
                ir::InstKind::GetElementPtr {
                    base,
                    indices: vec![Self::const_i32(0), idx],
                    in_bounds: true,
                },
                pos,
            )?,
            Some(_) => self.emit(
                ir::InstKind::GetElementPtr {
                    base,
                    indices: vec![idx],
                    in_bounds: true,
                },
                pos,
            )?,
            None => {
                return Err(Diagnostic::error("E0301", "only arrays can be indexed")
                    .with_span(span_of(pos)));
            }
        };

        if mode == Mode::Address {
            return Ok(gep);
        }

        // Unwind the pointer indirections stacked up by allocas.
        let mut result = gep;
        while self.vtype(&result).is_pointer() {
            result = self.emit(ir::InstKind::Load { ptr: result }, pos)?;
        }
        Ok(result)
    }

    /// `a.b.c` — a struct-field projection through a chain of constant GEP
    /// indices, or an enum-constant access.
    fn lower_qualified(
        &mut self,
        qualified: &ast::QualifiedIdent,
        mode: Mode,
    ) -> Result<ir::Value, Diagnostic> {
        let first = &qualified.parts[0];

        if let Some(binding) = self.scopes.lookup(&first.name) {
            let binding = binding.clone();
            let Some(mut struct_name) = binding.ty.decl.clone() else {
                return Err(self.no_field(&binding.ty.ir.to_string(), &qualified.parts[1]));
            };
            if !binding.is_slot {
                return Err(Diagnostic::error(
                    "E0307",
                    format!("cannot take a field of `{}`", first.name),
                )
                .with_span(span_of(first.pos)));
            }

            let mut indices = vec![Self::const_i32(0)];
            for part in &qualified.parts[1..] {
                let Some(decl) = self.types.struct_decl(&struct_name) else {
                    return Err(self.no_field(&struct_name, part));
                };
                let Some(field_index) = decl.field_index(&part.name) else {
                    return Err(self.no_field(&struct_name, part));
                };
                indices.push(Self::const_i32(field_index as i64));
                struct_name = decl.fields[field_index]
                    .ty
                    .as_ref()
                    .map(|t| t.name.clone())
                    .unwrap_or_default();
            }

            let gep = self.emit(
                ir::InstKind::GetElementPtr {
                    base: binding.value,
                    indices,
                    in_bounds: true,
                },
                first.pos,
            )?;
            return match mode {
                Mode::Address => Ok(gep),
                Mode::Value | Mode::Argument => {
                    self.emit(ir::InstKind::Load { ptr: gep }, first.pos)
                }
            };
        }

        if let Some(enum_decl) = self.types.enum_decl(&first.name) {
            let Some(member) = qualified.parts.get(1) else {
                return Err(Diagnostic::error(
                    "E0302",
                    format!("enum `{}` needs a member name", first.name),
                )
                .with_span(span_of(first.pos)));
            };
            let Some(ordinal) = enum_decl.ordinal(&member.name) else {
                return Err(Diagnostic::error(
                    "E0302",
                    format!(
                        "enum `{}` doesn't have member `{}`",
                        first.name, member.name
                    ),
                )
                .with_span(span_of(member.pos)));
            };
            return Ok(Self::const_i32(ordinal));
        }

        Err(self.unknown_symbol(&first.name, first.pos))
    }

    /// Three-block CFG: then / (else) / merge, with the if-expression's
    /// value an `i1` phi — the condition compared against one from the then
    /// side, the inverted comparison from the else side.
    fn lower_if(&mut self, if_expr: &ast::IfExpr) -> Result<ir::Value, Diagnostic> {
        let pos = if_expr.pos;
        let Some(cond_expr) = &if_expr.cond else {
            return Err(Diagnostic::error(
                "E0901",
                "internal: a bare else branch cannot be lowered on its own",
            )
            .with_span(span_of(pos)));
        };

        let raw = self.lower_expr(cond_expr, Mode::Value)?;
        let cond = self.cmp_with_true(raw, pos)?;

        let func = self.ir.function_mut(self.cur_fn);
        let then_bb = func.append_block("then");
        let else_bb = if_expr
            .else_branch
            .as_ref()
            .map(|_| func.append_block("else"));
        let merge_bb = func.append_block("ifcont");

        self.emit(
            ir::InstKind::CondBr {
                cond: cond.clone(),
                then_dest: then_bb,
                else_dest: else_bb.unwrap_or(merge_bb),
            },
            pos,
        )?;

        self.cur_block = then_bb;
        self.lower_block(&if_expr.block)?;
        if !self.ir.function(self.cur_fn).block_terminated(self.cur_block) {
            self.emit(ir::InstKind::Br { dest: merge_bb }, pos)?;
        }
        let then_end = self.cur_block;

        let mut else_incoming = None;
        if let Some(branch) = &if_expr.else_branch {
            self.cur_block = else_bb.unwrap_or(merge_bb);
            let inverted = self.emit(
                ir::InstKind::Icmp {
                    pred: ir::Predicate::Ne,
                    lhs: cond.clone(),
                    rhs: ir::Value::ConstInt {
                        ty: ir::Type::I1,
                        value: 1,
                    },
                },
                pos,
            )?;

            if branch.cond.is_some() {
                // `else if` nests a fresh three-block region here.
                self.lower_if(branch)?;
            } else {
                self.lower_block(&branch.block)?;
            }

            if !self.ir.function(self.cur_fn).block_terminated(self.cur_block) {
                self.emit(ir::InstKind::Br { dest: merge_bb }, pos)?;
            }
            else_incoming = Some((inverted, self.cur_block));
        }

        self.cur_block = merge_bb;
        let phi = self.emit(
            ir::InstKind::Phi {
                ty: ir::Type::I1,
                incomings: Vec::new(),
            },
            pos,
        )?;
        self.phi_add(&phi, cond, then_end, pos)?;
        if let Some((value, block)) = else_incoming {
            self.phi_add(&phi, value, block, pos)?;
        }

        Ok(phi)
    }

    /// Counting loop: preheader, a body block with the induction variable as
    /// a phi seeded from the preheader, increment, signed-less-than back
    /// edge. A literal array iterates `0..len`; a range iterates begin
    /// inclusive to end exclusive.
    fn lower_for(&mut self, for_expr: &ast::ForExpr) -> Result<ir::Value, Diagnostic> {
        let pos = for_expr.pos;

        let (start, end) = match &for_expr.range {
            ast::Expr::Literal(ast::Literal::Ident { pos: rpos, name }) => {
                let Some(binding) = self.scopes.lookup(name) else {
                    return Err(self.unknown_symbol(name, *rpos));
                };
                match &binding.ty.ir {
                    ir::Type::Array(_, len) => {
                        (Self::const_i32(0), Self::const_i32(*len as i64))
                    }
                    _ => {
                        return Err(Diagnostic::error("E0108", "invalid range")
                            .with_span(span_of(*rpos)));
                    }
                }
            }
            ast::Expr::Range(range) => {
                let start = self.lower_expr(&range.begin, Mode::Value)?;
                let end = self.lower_expr(&range.end, Mode::Value)?;
                (start, end)
            }
            other => {
                return Err(
                    Diagnostic::error("E0108", "invalid range").with_span(span_of(other.pos()))
                );
            }
        };

        let preheader = self.cur_block;
        let loop_bb = self.ir.function_mut(self.cur_fn).append_block("for_loop");
        self.emit(ir::InstKind::Br { dest: loop_bb }, pos)?;
        self.cur_block = loop_bb;

        let phi = self.emit(
            ir::InstKind::Phi {
                ty: ir::Type::I32,
                incomings: Vec::new(),
            },
            pos,
        )?;
        self.phi_add(&phi, start, preheader, pos)?;

        self.scopes.push();
        self.scopes.add(
            &for_expr.iter_name,
            Binding {
                value: phi.clone(),
                ty: Type::i32(),
                is_slot: false,
            },
            for_expr.iter_pos,
        )?;
        self.lower_block(&for_expr.block)?;
        self.scopes.pop();

        let next = self.emit(
            ir::InstKind::Binary {
                op: ir::BinOp::Add,
                lhs: phi.clone(),
                rhs: Self::const_i32(1),
            },
            pos,
        )?;
        let loop_end = self.cur_block;
        let after = self.ir.function_mut(self.cur_fn).append_block("afterloop");

        let cmp = self.emit(
            ir::InstKind::Icmp {
                pred: ir::Predicate::Slt,
                lhs: next.clone(),
                rhs: end,
            },
            pos,
        )?;
        self.emit(
            ir::InstKind::CondBr {
                cond: cmp,
                then_dest: loop_bb,
                else_dest: after,
            },
            pos,
        )?;
        self.cur_block = after;
        self.phi_add(&phi, next, loop_end, pos)?;

        Ok(ir::Value::ConstNull(ir::Type::I32))
    }

    /// The condition is evaluated once in the preheader and again at the
    /// loop bottom; both values feed the loop-header phi.
    fn lower_while(&mut self, while_expr: &ast::WhileExpr) -> Result<ir::Value, Diagnostic> {
        let pos = while_expr.pos;

        let cond = self.lower_expr(&while_expr.cond, Mode::Value)?;
        let preheader = self.cur_block;
        let loop_bb = self.ir.function_mut(self.cur_fn).append_block("while_loop");
        self.emit(ir::InstKind::Br { dest: loop_bb }, pos)?;
        self.cur_block = loop_bb;

        let phi = self.emit(
            ir::InstKind::Phi {
                ty: self.vtype(&cond),
                incomings: Vec::new(),
            },
            pos,
        )?;
        self.phi_add(&phi, cond, preheader, pos)?;

        self.lower_block(&while_expr.block)?;

        let bottom = self.lower_expr(&while_expr.cond, Mode::Value)?;
        let loop_end = self.cur_block;
        let after = self.ir.function_mut(self.cur_fn).append_block("afterloop");

        let branch_cond = if self.vtype(&bottom) == ir::Type::I1 {
            bottom.clone()
        } else {
            self.cmp_with_true(bottom.clone(), pos)?
        };
        self.emit(
            ir::InstKind::CondBr {
                cond: branch_cond,
                then_dest: loop_bb,
                else_dest: after,
            },
            pos,
        )?;
        self.cur_block = after;
        self.phi_add(&phi, bottom, loop_end, pos)?;

        Ok(ir::Value::ConstNull(ir::Type::I32))
    }

    fn lower_struct_init(&mut self, init: &ast::StructInitExpr) -> Result<ir::Value, Diagnostic> {
        let Some(decl) = self.types.struct_decl(&init.name) else {
            // Distinguish "no such type" from "not a structure".
            self.types.lookup(&init.name, init.pos)?;
            return Err(Diagnostic::error(
                "E0304",
                format!("the type `{}` is not a structure", init.name),
            )
            .with_span(span_of(init.pos)));
        };

        if decl.fields.len() != init.values.len() {
            return Err(Diagnostic::error(
                "E0304",
                format!(
                    "structure `{}` expects {} fields, found {}",
                    init.name,
                    decl.fields.len(),
                    init.values.len()
                ),
            )
            .with_span(span_of(init.pos)));
        }

        let mut fields = Vec::with_capacity(init.values.len());
        for value in &init.values {
            fields.push(self.lower_expr(value, Mode::Value)?);
        }

        Ok(ir::Value::ConstStruct {
            ty: ir::Type::Struct(init.name.clone()),
            fields,
        })
    }

    fn lower_array(&mut self, array: &ast::ArrayExpr) -> Result<ir::Value, Diagnostic> {
        let elem = self.infer(&array.values[0])?.ir;

        let mut values = Vec::with_capacity(array.values.len());
        for value in &array.values {
            let lowered = self.lower_expr(value, Mode::Value)?;
            if !self.vtype(&lowered).castable_to(&elem) {
                return Err(Diagnostic::error(
                    "E0305",
                    "array elements can't have different types",
                )
                .with_span(span_of(array.pos)));
            }
            values.push(lowered);
        }

        Ok(ir::Value::ConstArray { elem, values })
    }

    /// Materialize a stack slot, store the initializer if present, register
    /// the variable. A declared type and an inferred initializer type must
    /// agree.
    fn lower_var_decl(&mut self, var: &ast::VarDecl) -> Result<ir::Value, Diagnostic> {
        let declared = var
            .ty
            .as_ref()
            .map(|te| self.types.type_expr(te))
            .transpose()?;
        let inferred = var
            .value
            .as_ref()
            .map(|value| self.infer(value))
            .transpose()?;

        let ty = match (declared, inferred) {
            (Some(declared), Some(inferred)) => {
                if declared != inferred {
                    return Err(Diagnostic::error(
                        "E0303",
                        format!(
                            "type of value `{}` doesn't match the variable type",
                            var.name
                        ),
                    )
                    .with_span(span_of(var.pos)));
                }
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(inferred)) => inferred,
            (None, None) => {
                return Err(Diagnostic::error(
                    "E0301",
                    format!("cannot infer a type for `{}`", var.name),
                )
                .with_span(span_of(var.pos)));
            }
        };

        let slot = self.emit(ir::InstKind::Alloca(ty.ir.clone()), var.pos)?;
        self.bind_slot(&var.name, slot.clone(), ty, var.pos)?;

        if let Some(value) = &var.value {
            let lowered = self.lower_expr(value, Mode::Value)?;
            self.emit(
                ir::InstKind::Store {
                    value: lowered,
                    ptr: slot.clone(),
                },
                var.pos,
            )?;
        }

        Ok(slot)
    }

    // ==================== Shared helpers ====================

    fn phi_add(
        &mut self,
        phi: &ir::Value,
        value: ir::Value,
        block: ir::BlockId,
        pos: Position,
    ) -> Result<(), Diagnostic> {
        self.ir
            .add_phi_incoming(self.cur_fn, phi, value, block)
            .map_err(|err| {
                Diagnostic::error("E0901", format!("internal: {}", err)).with_span(span_of(pos))
            })
    }

    fn unknown_symbol(&self, name: &str, pos: Position) -> Diagnostic {
        InferCx {
            module: self.module,
            types: &self.types,
            scopes: &self.scopes,
        }
        .unknown_symbol(name, pos)
    }

    fn no_field(&self, struct_name: &str, part: &ast::IdentPart) -> Diagnostic {
        Diagnostic::error(
            "E0302",
            format!(
                "structure `{}` doesn't have field `{}`",
                struct_name, part.name
            ),
        )
        .with_span(span_of(part.pos))
    }
}
