use crate::{InstKind, Module, Type};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("function '{function}': block '{block}' is empty")]
    EmptyBlock { function: String, block: String },
    #[error("function '{function}': block '{block}' does not end with a terminator")]
    MissingTerminator { function: String, block: String },
    #[error("function '{function}': block '{block}' has an instruction after its terminator")]
    InstructionAfterTerminator { function: String, block: String },
    #[error("function '{function}': branch to a block that does not exist")]
    BadBranchTarget { function: String },
    #[error("function '{function}': phi references a block that does not exist")]
    BadPhiIncoming { function: String },
    #[error("function '{function}' calls unknown function '{callee}'")]
    UnknownCallee { function: String, callee: String },
    #[error("function '{function}': ret type {found} does not match declared {declared}")]
    RetTypeMismatch {
        function: String,
        found: Type,
        declared: Type,
    },
}

impl Module {
    /// Structural sanity of the emitted SSA: every block of every defined
    /// function ends in exactly one terminator, branch and phi edges point at
    /// existing blocks, callees exist, and `ret` agrees with the signature.
    pub fn verify(&self) -> Result<(), VerifyError> {
        for (f, func) in self.functions().iter().enumerate() {
            if func.is_declaration() {
                continue;
            }

            for block in &func.blocks {
                let Some((&last, rest)) = block.insts.split_last() else {
                    return Err(VerifyError::EmptyBlock {
                        function: func.name.clone(),
                        block: block.label.clone(),
                    });
                };

                if !func.insts[last].kind.is_terminator() {
                    return Err(VerifyError::MissingTerminator {
                        function: func.name.clone(),
                        block: block.label.clone(),
                    });
                }
                if rest.iter().any(|&id| func.insts[id].kind.is_terminator()) {
                    return Err(VerifyError::InstructionAfterTerminator {
                        function: func.name.clone(),
                        block: block.label.clone(),
                    });
                }
            }

            for inst in &func.insts {
                match &inst.kind {
                    InstKind::Br { dest } => {
                        if *dest >= func.blocks.len() {
                            return Err(VerifyError::BadBranchTarget {
                                function: func.name.clone(),
                            });
                        }
                    }
                    InstKind::CondBr {
                        then_dest,
                        else_dest,
                        ..
                    } => {
                        if *then_dest >= func.blocks.len() || *else_dest >= func.blocks.len() {
                            return Err(VerifyError::BadBranchTarget {
                                function: func.name.clone(),
                            });
                        }
                    }
                    InstKind::Phi { incomings, .. } => {
                        if incomings.iter().any(|(_, b)| *b >= func.blocks.len()) {
                            return Err(VerifyError::BadPhiIncoming {
                                function: func.name.clone(),
                            });
                        }
                    }
                    InstKind::Call { callee, .. } => {
                        if self.get_function(callee).is_none() {
                            return Err(VerifyError::UnknownCallee {
                                function: func.name.clone(),
                                callee: callee.clone(),
                            });
                        }
                    }
                    InstKind::Ret { value } => {
                        let found = value
                            .as_ref()
                            .map_or(Type::Void, |v| self.value_type(f, v));
                        if found != func.ret {
                            return Err(VerifyError::RetTypeMismatch {
                                function: func.name.clone(),
                                found,
                                declared: func.ret.clone(),
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Function, Value};

    #[test]
    fn test_missing_terminator_detected() {
        let mut m = Module::new("t");
        let f = m.declare_function(Function::new("f", Vec::new(), Type::Void, false));
        let entry = m.function_mut(f).append_block("entry");
        m.push_inst(f, entry, InstKind::Alloca(Type::I32)).unwrap();

        assert!(matches!(
            m.verify(),
            Err(VerifyError::MissingTerminator { .. })
        ));

        m.push_inst(f, entry, InstKind::Ret { value: None }).unwrap();
        assert_eq!(m.verify(), Ok(()));
    }

    #[test]
    fn test_ret_type_checked() {
        let mut m = Module::new("t");
        let f = m.declare_function(Function::new("f", Vec::new(), Type::I32, false));
        let entry = m.function_mut(f).append_block("entry");
        m.push_inst(f, entry, InstKind::Ret { value: None }).unwrap();

        assert!(matches!(
            m.verify(),
            Err(VerifyError::RetTypeMismatch { .. })
        ));

        let mut m = Module::new("t");
        let f = m.declare_function(Function::new("f", Vec::new(), Type::I32, false));
        let entry = m.function_mut(f).append_block("entry");
        m.push_inst(
            f,
            entry,
            InstKind::Ret {
                value: Some(Value::ConstInt {
                    ty: Type::I32,
                    value: 0,
                }),
            },
        )
        .unwrap();
        assert_eq!(m.verify(), Ok(()));
    }
}
