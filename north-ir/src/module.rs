use crate::Type;
use std::collections::HashMap;

pub type FuncId = usize;
pub type BlockId = usize;
pub type InstId = usize;

/// A leading underscore on the source name selects internal linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    External,
    Internal,
}

impl Linkage {
    pub fn for_name(name: &str) -> Linkage {
        if name.starts_with('_') {
            Linkage::Internal
        } else {
            Linkage::External
        }
    }
}

/// An SSA value: an instruction result, a function argument, or a constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Inst(InstId),
    Arg(usize),
    ConstInt { ty: Type, value: i64 },
    ConstNull(Type),
    /// Index into the module's global string table; typed `i8*`.
    Str(usize),
    ConstStruct { ty: Type, fields: Vec<Value> },
    ConstArray { elem: Type, values: Vec<Value> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    Shl,
    LShr,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    Alloca(Type),
    Load {
        ptr: Value,
    },
    Store {
        value: Value,
        ptr: Value,
    },
    GetElementPtr {
        base: Value,
        indices: Vec<Value>,
        in_bounds: bool,
    },
    Binary {
        op: BinOp,
        lhs: Value,
        rhs: Value,
    },
    Icmp {
        pred: Predicate,
        lhs: Value,
        rhs: Value,
    },
    Not {
        value: Value,
    },
    Neg {
        value: Value,
    },
    Bitcast {
        value: Value,
        to: Type,
    },
    Call {
        callee: String,
        args: Vec<Value>,
    },
    Phi {
        ty: Type,
        incomings: Vec<(Value, BlockId)>,
    },
    Br {
        dest: BlockId,
    },
    CondBr {
        cond: Value,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    Ret {
        value: Option<Value>,
    },
}

impl InstKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Br { .. } | InstKind::CondBr { .. } | InstKind::Ret { .. }
        )
    }
}

/// An instruction together with its result type (`Void` when it produces no
/// value).
#[derive(Debug, Clone, PartialEq)]
pub struct Inst {
    pub kind: InstKind,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub insts: Vec<InstId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

/// A function. One without blocks is a declaration (an `extern` such as
/// `printf`).
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub params: Vec<Param>,
    pub ret: Type,
    pub variadic: bool,
    pub blocks: Vec<BasicBlock>,
    pub insts: Vec<Inst>,
    label_uses: HashMap<String, u32>,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        params: Vec<Param>,
        ret: Type,
        variadic: bool,
    ) -> Self {
        let name = name.into();
        Self {
            linkage: Linkage::for_name(&name),
            name,
            params,
            ret,
            variadic,
            blocks: Vec::new(),
            insts: Vec::new(),
            label_uses: HashMap::new(),
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Append a block with a unique label derived from `name`.
    pub fn append_block(&mut self, name: &str) -> BlockId {
        let n = self.label_uses.entry(name.to_string()).or_insert(0);
        let label = if *n == 0 {
            name.to_string()
        } else {
            format!("{}{}", name, n)
        };
        *n += 1;
        self.blocks.push(BasicBlock {
            label,
            insts: Vec::new(),
        });
        self.blocks.len() - 1
    }

    pub fn block_terminated(&self, block: BlockId) -> bool {
        self.blocks[block]
            .insts
            .last()
            .is_some_and(|&id| self.insts[id].kind.is_terminator())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IrError {
    #[error("load from a non-pointer value")]
    LoadFromNonPointer,
    #[error("GEP base is not a pointer")]
    GepBaseNotPointer,
    #[error("GEP index walks into a non-aggregate type")]
    GepIntoNonAggregate,
    #[error("GEP struct index must be a constant integer")]
    GepStructIndexNotConstant,
    #[error("struct type '{0}' has no body")]
    OpaqueStruct(String),
    #[error("unknown function '{0}'")]
    UnknownCallee(String),
    #[error("phi target is not a phi instruction")]
    NotAPhi,
}

/// The IR container: named struct types with deferred bodies, global string
/// constants, and functions.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    structs: Vec<(String, Option<Vec<Type>>)>,
    strings: Vec<String>,
    functions: Vec<Function>,
    by_name: HashMap<String, FuncId>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Register an opaque struct type. Idempotent.
    pub fn add_struct(&mut self, name: &str) {
        if !self.structs.iter().any(|(n, _)| n == name) {
            self.structs.push((name.to_string(), None));
        }
    }

    pub fn set_struct_body(&mut self, name: &str, fields: Vec<Type>) {
        if let Some(entry) = self.structs.iter_mut().find(|(n, _)| n == name) {
            entry.1 = Some(fields);
        } else {
            self.structs.push((name.to_string(), Some(fields)));
        }
    }

    pub fn struct_body(&self, name: &str) -> Option<&[Type]> {
        self.structs
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, body)| body.as_deref())
    }

    pub fn structs(&self) -> &[(String, Option<Vec<Type>>)] {
        &self.structs
    }

    pub fn add_string(&mut self, text: impl Into<String>) -> usize {
        self.strings.push(text.into());
        self.strings.len() - 1
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn declare_function(&mut self, function: Function) -> FuncId {
        let id = self.functions.len();
        self.by_name.insert(function.name.clone(), id);
        self.functions.push(function);
        id
    }

    pub fn get_function(&self, name: &str) -> Option<FuncId> {
        self.by_name.get(name).copied()
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id]
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// The type of a value in the context of function `f`.
    pub fn value_type(&self, f: FuncId, value: &Value) -> Type {
        match value {
            Value::Inst(id) => self.functions[f].insts[*id].ty.clone(),
            Value::Arg(i) => self.functions[f].params[*i].ty.clone(),
            Value::ConstInt { ty, .. } => ty.clone(),
            Value::ConstNull(ty) => ty.clone(),
            Value::Str(_) => Type::I8.ptr_to(),
            Value::ConstStruct { ty, .. } => ty.clone(),
            Value::ConstArray { elem, values } => {
                elem.clone().array_of(values.len() as u64)
            }
        }
    }

    fn gep_result_type(
        &self,
        f: FuncId,
        base: &Value,
        indices: &[Value],
    ) -> Result<Type, IrError> {
        let base_ty = self.value_type(f, base);
        let mut current = base_ty.pointee().ok_or(IrError::GepBaseNotPointer)?.clone();

        // The first index steps over the pointer itself, the rest walk into
        // the aggregate.
        for index in indices.iter().skip(1) {
            current = match current {
                Type::Array(elem, _) => (*elem).clone(),
                Type::Struct(name) => {
                    let Value::ConstInt { value, .. } = index else {
                        return Err(IrError::GepStructIndexNotConstant);
                    };
                    let body = self
                        .struct_body(&name)
                        .ok_or_else(|| IrError::OpaqueStruct(name.clone()))?;
                    body.get(*value as usize)
                        .cloned()
                        .ok_or(IrError::GepIntoNonAggregate)?
                }
                _ => return Err(IrError::GepIntoNonAggregate),
            };
        }

        Ok(current.ptr_to())
    }

    /// Append an instruction to `block` of function `f`, computing its result
    /// type, and return its value.
    pub fn push_inst(
        &mut self,
        f: FuncId,
        block: BlockId,
        kind: InstKind,
    ) -> Result<Value, IrError> {
        let ty = match &kind {
            InstKind::Alloca(ty) => ty.clone().ptr_to(),
            InstKind::Load { ptr } => self
                .value_type(f, ptr)
                .pointee()
                .ok_or(IrError::LoadFromNonPointer)?
                .clone(),
            InstKind::Store { .. } => Type::Void,
            InstKind::GetElementPtr { base, indices, .. } => {
                self.gep_result_type(f, base, indices)?
            }
            InstKind::Binary { lhs, .. } => self.value_type(f, lhs),
            InstKind::Icmp { .. } => Type::I1,
            InstKind::Not { value } | InstKind::Neg { value } => self.value_type(f, value),
            InstKind::Bitcast { to, .. } => to.clone(),
            InstKind::Call { callee, .. } => {
                let id = self
                    .get_function(callee)
                    .ok_or_else(|| IrError::UnknownCallee(callee.clone()))?;
                self.functions[id].ret.clone()
            }
            InstKind::Phi { ty, .. } => ty.clone(),
            InstKind::Br { .. } | InstKind::CondBr { .. } | InstKind::Ret { .. } => Type::Void,
        };

        let func = &mut self.functions[f];
        let id = func.insts.len();
        func.insts.push(Inst { kind, ty });
        func.blocks[block].insts.push(id);
        Ok(Value::Inst(id))
    }

    pub fn add_phi_incoming(
        &mut self,
        f: FuncId,
        phi: &Value,
        value: Value,
        block: BlockId,
    ) -> Result<(), IrError> {
        let Value::Inst(id) = phi else {
            return Err(IrError::NotAPhi);
        };
        match &mut self.functions[f].insts[*id].kind {
            InstKind::Phi { incomings, .. } => {
                incomings.push((value, block));
                Ok(())
            }
            _ => Err(IrError::NotAPhi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linkage_from_name() {
        assert_eq!(Linkage::for_name("_helper"), Linkage::Internal);
        assert_eq!(Linkage::for_name("main"), Linkage::External);
    }

    #[test]
    fn test_alloca_load_store_types() {
        let mut m = Module::new("t");
        let f = m.declare_function(Function::new("f", Vec::new(), Type::Void, false));
        let entry = m.function_mut(f).append_block("entry");

        let slot = m.push_inst(f, entry, InstKind::Alloca(Type::I32)).unwrap();
        assert_eq!(m.value_type(f, &slot), Type::I32.ptr_to());

        let loaded = m
            .push_inst(f, entry, InstKind::Load { ptr: slot.clone() })
            .unwrap();
        assert_eq!(m.value_type(f, &loaded), Type::I32);

        let err = m
            .push_inst(f, entry, InstKind::Load { ptr: loaded })
            .unwrap_err();
        assert_eq!(err, IrError::LoadFromNonPointer);
    }

    #[test]
    fn test_gep_through_struct_and_array() {
        let mut m = Module::new("t");
        m.set_struct_body("Pair", vec![Type::I32, Type::I32.array_of(4)]);

        let f = m.declare_function(Function::new("f", Vec::new(), Type::Void, false));
        let entry = m.function_mut(f).append_block("entry");
        let slot = m
            .push_inst(f, entry, InstKind::Alloca(Type::Struct("Pair".into())))
            .unwrap();

        let zero = Value::ConstInt {
            ty: Type::I32,
            value: 0,
        };
        let one = Value::ConstInt {
            ty: Type::I32,
            value: 1,
        };
        let gep = m
            .push_inst(
                f,
                entry,
                InstKind::GetElementPtr {
                    base: slot,
                    indices: vec![zero.clone(), one, zero],
                    in_bounds: true,
                },
            )
            .unwrap();
        assert_eq!(m.value_type(f, &gep), Type::I32.ptr_to());
    }

    #[test]
    fn test_block_labels_unique() {
        let mut func = Function::new("f", Vec::new(), Type::Void, false);
        assert_eq!(func.append_block("then"), 0);
        assert_eq!(func.append_block("then"), 1);
        assert_eq!(func.blocks[0].label, "then");
        assert_eq!(func.blocks[1].label, "then1");
    }
}
