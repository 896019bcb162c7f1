//! Deterministic LLVM-flavoured textual form of a module. Printing the same
//! module twice yields byte-identical output.

use crate::{BinOp, Function, InstKind, Linkage, Module, Predicate, Type, Value};
use std::fmt::{self, Write};

fn escape_bytes(text: &str) -> String {
    let mut out = String::new();
    for &b in text.as_bytes() {
        match b {
            b'"' | b'\\' => {
                let _ = write!(out, "\\{:02X}", b);
            }
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:02X}", b);
            }
        }
    }
    out
}

impl Module {
    fn fmt_value(&self, f: usize, value: &Value, out: &mut String) {
        match value {
            Value::Inst(id) => {
                let _ = write!(out, "%t{}", id);
            }
            Value::Arg(i) => {
                let _ = write!(out, "%{}", self.function(f).params[*i].name);
            }
            Value::ConstInt { value, .. } => {
                let _ = write!(out, "{}", value);
            }
            Value::ConstNull(ty) => {
                if ty.is_pointer() {
                    out.push_str("null");
                } else {
                    out.push('0');
                }
            }
            Value::Str(i) => {
                let _ = write!(out, "@.str.{}", i);
            }
            Value::ConstStruct { fields, .. } => {
                out.push_str("{ ");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{} ", self.value_type(f, field));
                    self.fmt_value(f, field, out);
                }
                out.push_str(" }");
            }
            Value::ConstArray { elem, values } => {
                out.push_str("[ ");
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{} ", elem);
                    self.fmt_value(f, v, out);
                }
                out.push_str(" ]");
            }
        }
    }

    fn fmt_typed(&self, f: usize, value: &Value, out: &mut String) {
        let _ = write!(out, "{} ", self.value_type(f, value));
        self.fmt_value(f, value, out);
    }

    fn fmt_function(&self, f: usize, func: &Function, out: &mut String) {
        let keyword = if func.is_declaration() {
            "declare"
        } else {
            "define"
        };
        let linkage = match func.linkage {
            Linkage::Internal => "internal ",
            Linkage::External => "",
        };

        let _ = write!(out, "{} {}{} @{}(", keyword, linkage, func.ret, func.name);
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{} %{}", param.ty, param.name);
        }
        if func.variadic {
            if !func.params.is_empty() {
                out.push_str(", ");
            }
            out.push_str("...");
        }
        out.push(')');

        if func.is_declaration() {
            out.push('\n');
            return;
        }

        out.push_str(" {\n");
        for block in &func.blocks {
            let _ = writeln!(out, "{}:", block.label);
            for &id in &block.insts {
                out.push_str("  ");
                self.fmt_inst(f, func, id, out);
                out.push('\n');
            }
        }
        out.push_str("}\n");
    }

    fn fmt_inst(&self, f: usize, func: &Function, id: usize, out: &mut String) {
        let inst = &func.insts[id];
        if !inst.ty.is_void() {
            let _ = write!(out, "%t{} = ", id);
        }

        match &inst.kind {
            InstKind::Alloca(ty) => {
                let _ = write!(out, "alloca {}", ty);
            }
            InstKind::Load { ptr } => {
                let _ = write!(out, "load {}, ", inst.ty);
                self.fmt_typed(f, ptr, out);
            }
            InstKind::Store { value, ptr } => {
                out.push_str("store ");
                self.fmt_typed(f, value, out);
                out.push_str(", ");
                self.fmt_typed(f, ptr, out);
            }
            InstKind::GetElementPtr {
                base,
                indices,
                in_bounds,
            } => {
                let base_ty = self.value_type(f, base);
                let pointee = base_ty.pointee().cloned().unwrap_or(Type::Void);
                let bounds = if *in_bounds { "inbounds " } else { "" };
                let _ = write!(out, "getelementptr {}{}, ", bounds, pointee);
                self.fmt_typed(f, base, out);
                for index in indices {
                    out.push_str(", ");
                    self.fmt_typed(f, index, out);
                }
            }
            InstKind::Binary { op, lhs, rhs } => {
                let name = match op {
                    BinOp::Add => "add",
                    BinOp::Sub => "sub",
                    BinOp::Mul => "mul",
                    BinOp::SDiv => "sdiv",
                    BinOp::Shl => "shl",
                    BinOp::LShr => "lshr",
                    BinOp::And => "and",
                    BinOp::Or => "or",
                };
                let _ = write!(out, "{} {} ", name, self.value_type(f, lhs));
                self.fmt_value(f, lhs, out);
                out.push_str(", ");
                self.fmt_value(f, rhs, out);
            }
            InstKind::Icmp { pred, lhs, rhs } => {
                let name = match pred {
                    Predicate::Eq => "eq",
                    Predicate::Ne => "ne",
                    Predicate::Slt => "slt",
                    Predicate::Sle => "sle",
                    Predicate::Sgt => "sgt",
                    Predicate::Sge => "sge",
                };
                let _ = write!(out, "icmp {} {} ", name, self.value_type(f, lhs));
                self.fmt_value(f, lhs, out);
                out.push_str(", ");
                self.fmt_value(f, rhs, out);
            }
            InstKind::Not { value } => {
                let _ = write!(out, "xor {} ", self.value_type(f, value));
                self.fmt_value(f, value, out);
                out.push_str(", -1");
            }
            InstKind::Neg { value } => {
                let _ = write!(out, "sub {} 0, ", self.value_type(f, value));
                self.fmt_value(f, value, out);
            }
            InstKind::Bitcast { value, to } => {
                out.push_str("bitcast ");
                self.fmt_typed(f, value, out);
                let _ = write!(out, " to {}", to);
            }
            InstKind::Call { callee, args } => {
                let _ = write!(out, "call {} @{}(", inst.ty, callee);
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.fmt_typed(f, arg, out);
                }
                out.push(')');
            }
            InstKind::Phi { ty, incomings } => {
                let _ = write!(out, "phi {} ", ty);
                for (i, (value, block)) in incomings.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str("[ ");
                    self.fmt_value(f, value, out);
                    let _ = write!(out, ", %{} ]", func.blocks[*block].label);
                }
            }
            InstKind::Br { dest } => {
                let _ = write!(out, "br label %{}", func.blocks[*dest].label);
            }
            InstKind::CondBr {
                cond,
                then_dest,
                else_dest,
            } => {
                out.push_str("br ");
                self.fmt_typed(f, cond, out);
                let _ = write!(
                    out,
                    ", label %{}, label %{}",
                    func.blocks[*then_dest].label, func.blocks[*else_dest].label
                );
            }
            InstKind::Ret { value } => match value {
                Some(value) => {
                    out.push_str("ret ");
                    self.fmt_typed(f, value, out);
                }
                None => out.push_str("ret void"),
            },
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        let _ = writeln!(out, "; ModuleID = '{}'", self.name);

        if !self.structs().is_empty() {
            out.push('\n');
            for (name, body) in self.structs() {
                match body {
                    Some(fields) => {
                        let _ = write!(out, "%{} = type {{ ", name);
                        for (i, field) in fields.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            let _ = write!(out, "{}", field);
                        }
                        out.push_str(" }\n");
                    }
                    None => {
                        let _ = writeln!(out, "%{} = type opaque", name);
                    }
                }
            }
        }

        if !self.strings().is_empty() {
            out.push('\n');
            for (i, text) in self.strings().iter().enumerate() {
                let _ = writeln!(
                    out,
                    "@.str.{} = private constant [{} x i8] c\"{}\\00\"",
                    i,
                    text.len() + 1,
                    escape_bytes(text)
                );
            }
        }

        for (f, func) in self.functions().iter().enumerate() {
            out.push('\n');
            self.fmt_function(f, func, &mut out);
        }

        fmt.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Param;

    fn sample() -> Module {
        let mut m = Module::new("sample");
        let f = m.declare_function(Function::new(
            "add",
            vec![
                Param {
                    name: "a".into(),
                    ty: Type::I32,
                },
                Param {
                    name: "b".into(),
                    ty: Type::I32,
                },
            ],
            Type::I32,
            false,
        ));
        let entry = m.function_mut(f).append_block("entry");
        let sum = m
            .push_inst(
                f,
                entry,
                InstKind::Binary {
                    op: BinOp::Add,
                    lhs: Value::Arg(0),
                    rhs: Value::Arg(1),
                },
            )
            .unwrap();
        m.push_inst(f, entry, InstKind::Ret { value: Some(sum) })
            .unwrap();
        m
    }

    #[test]
    fn test_print_function() {
        let text = sample().to_string();
        assert!(text.contains("define i32 @add(i32 %a, i32 %b) {"));
        assert!(text.contains("%t0 = add i32 %a, %b"));
        assert!(text.contains("ret i32 %t0"));
    }

    #[test]
    fn test_printing_is_stable() {
        let m = sample();
        assert_eq!(m.to_string(), m.to_string());
    }

    #[test]
    fn test_string_escapes() {
        let mut m = Module::new("s");
        m.add_string("%d\n");
        let text = m.to_string();
        assert!(text.contains("@.str.0 = private constant [4 x i8] c\"%d\\0A\\00\""));
    }
}
