use crate::{CallExpr, FunctionDecl, InterfaceDecl, OpenStmt, TypeDef, VarDecl};
use north_lexer::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One top-level declaration, in source order. Named declarations live in the
/// module's maps and are referenced here by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Open(OpenStmt),
    Type(String),
    Interface(String),
    Function(String),
    Var(VarDecl),
}

/// The per-file symbol registry. The parser adds declarations as it
/// recognizes them; name collisions are fatal for types, interfaces,
/// functions (no overloading) — the registry owns every declaration for the
/// lifetime of the compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub types: HashMap<String, TypeDef>,
    pub interfaces: HashMap<String, InterfaceDecl>,
    pub functions: HashMap<String, FunctionDecl>,
    pub imports: Vec<String>,
    pub items: Vec<Item>,
    /// Set when at least one registered function is generic, so lowering
    /// knows call sites may require instantiation.
    pub has_generic_declarations: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleError {
    #[error("duplicate definition of type '{name}'")]
    DuplicateType { name: String, pos: Position },
    #[error("duplicate definition of interface '{name}'")]
    DuplicateInterface { name: String, pos: Position },
    #[error("duplicate definition of function '{name}'")]
    DuplicateFunction { name: String, pos: Position },
}

impl ModuleError {
    pub fn pos(&self) -> Position {
        match self {
            ModuleError::DuplicateType { pos, .. }
            | ModuleError::DuplicateInterface { pos, .. }
            | ModuleError::DuplicateFunction { pos, .. } => *pos,
        }
    }
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_type(&mut self, decl: TypeDef) -> Result<(), ModuleError> {
        if self.types.contains_key(&decl.name) {
            return Err(ModuleError::DuplicateType {
                name: decl.name.clone(),
                pos: decl.pos,
            });
        }
        self.items.push(Item::Type(decl.name.clone()));
        self.types.insert(decl.name.clone(), decl);
        Ok(())
    }

    pub fn add_interface(&mut self, decl: InterfaceDecl) -> Result<(), ModuleError> {
        if self.interfaces.contains_key(&decl.name) {
            return Err(ModuleError::DuplicateInterface {
                name: decl.name.clone(),
                pos: decl.pos,
            });
        }
        self.items.push(Item::Interface(decl.name.clone()));
        self.interfaces.insert(decl.name.clone(), decl);
        Ok(())
    }

    pub fn add_function(&mut self, decl: FunctionDecl) -> Result<(), ModuleError> {
        if self.functions.contains_key(&decl.name) {
            return Err(ModuleError::DuplicateFunction {
                name: decl.name.clone(),
                pos: decl.pos,
            });
        }
        if decl.is_generic() {
            self.has_generic_declarations = true;
        }
        self.items.push(Item::Function(decl.name.clone()));
        self.functions.insert(decl.name.clone(), decl);
        Ok(())
    }

    pub fn add_import(&mut self, open: OpenStmt) {
        if !self.imports.contains(&open.module) {
            self.imports.push(open.module.clone());
        }
        self.items.push(Item::Open(open));
    }

    pub fn add_global(&mut self, var: VarDecl) {
        self.items.push(Item::Var(var));
    }

    /// Resolve the callee of a call expression. Only single-part names are
    /// looked up today; a multi-part target is the method-style
    /// `receiver.method(...)` form, whose rewriting (receiver injected as
    /// first argument) hooks in here once method dispatch lands.
    pub fn get_fn(&self, call: &CallExpr) -> Option<&FunctionDecl> {
        if call.target.is_single() {
            return self.functions.get(call.target.first());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Block, QualifiedIdent};
    use north_lexer::Position;

    fn pos() -> Position {
        Position {
            line: 1,
            column: 1,
            offset: 0,
            length: 1,
        }
    }

    fn function(name: &str) -> FunctionDecl {
        FunctionDecl {
            pos: pos(),
            name: name.into(),
            generics: Vec::new(),
            args: Vec::new(),
            ret: None,
            body: Some(Block {
                pos: pos(),
                nodes: Vec::new(),
            }),
            variadic: false,
        }
    }

    #[test]
    fn test_duplicate_function_is_rejected() {
        let mut module = Module::new("main");
        module.add_function(function("f")).unwrap();
        let err = module.add_function(function("f")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "duplicate definition of function 'f'"
        );
    }

    #[test]
    fn test_single_part_call_resolution() {
        let mut module = Module::new("main");
        module.add_function(function("f")).unwrap();

        let call = CallExpr {
            pos: pos(),
            target: QualifiedIdent::single(pos(), "f"),
            args: Vec::new(),
        };
        assert!(module.get_fn(&call).is_some());

        let mut method_style = QualifiedIdent::single(pos(), "value");
        method_style.parts.push(crate::IdentPart {
            pos: pos(),
            name: "f".into(),
        });
        let call = CallExpr {
            pos: pos(),
            target: method_style,
            args: Vec::new(),
        };
        assert!(module.get_fn(&call).is_none());
    }

    #[test]
    fn test_generic_registration_sets_flag() {
        let mut module = Module::new("main");
        module.add_function(function("plain")).unwrap();
        assert!(!module.has_generic_declarations);

        let mut generic = function("mult");
        generic.generics.push(crate::GenericParam {
            pos: pos(),
            name: "T".into(),
        });
        module.add_function(generic).unwrap();
        assert!(module.has_generic_declarations);
    }

    #[test]
    fn test_imports_are_ordered_and_deduplicated() {
        let mut module = Module::new("main");
        for name in ["IO", "Math", "IO"] {
            module.add_import(OpenStmt {
                pos: pos(),
                module: name.into(),
            });
        }
        assert_eq!(module.imports, vec!["IO".to_string(), "Math".to_string()]);
    }
}
