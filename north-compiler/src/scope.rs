use crate::types::Type;
use north_diagnostics::{Diagnostic, Span};
use north_ir as ir;
use north_lexer::Position;

/// What a name resolves to during lowering. `is_slot` marks stack slots
/// (the value is a pointer to the variable); arguments and loop induction
/// variables hold their value directly.
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: ir::Value,
    pub ty: Type,
    pub is_slot: bool,
}

/// The nested variable lookup chain. A scope is pushed on block entry and
/// popped on exit; lookups walk from the innermost scope outwards.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Vec<(String, Binding)>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Register a variable in the innermost scope. A name may shadow an
    /// outer scope but never collide within its own.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        binding: Binding,
        pos: Position,
    ) -> Result<(), Diagnostic> {
        let name = name.into();
        let Some(scope) = self.scopes.last_mut() else {
            return Err(Diagnostic::error(
                "E0901",
                "internal: variable registered outside any scope",
            ));
        };

        if scope.iter().any(|(n, _)| *n == name) {
            return Err(Diagnostic::error(
                "E0202",
                format!("duplicate definition of variable '{}'", name),
            )
            .with_span(Span::new(pos.offset, pos.length.max(1))));
        }

        scope.push((name, binding));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.iter().find(|(n, _)| n == name).map(|(_, b)| b))
    }

    /// All visible names, innermost first, for "did you mean" suggestions.
    pub fn visible_names(&self) -> Vec<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().map(|(n, _)| n.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position {
            line: 1,
            column: 1,
            offset: 0,
            length: 1,
        }
    }

    fn binding() -> Binding {
        Binding {
            value: ir::Value::Arg(0),
            ty: Type::i32(),
            is_slot: false,
        }
    }

    #[test]
    fn test_lookup_walks_parents() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.add("outer", binding(), pos()).unwrap();
        scopes.push();
        scopes.add("inner", binding(), pos()).unwrap();

        assert!(scopes.lookup("outer").is_some());
        assert!(scopes.lookup("inner").is_some());

        scopes.pop();
        assert!(scopes.lookup("inner").is_none());
        assert!(scopes.lookup("outer").is_some());
    }

    #[test]
    fn test_duplicate_in_same_scope_is_fatal() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.add("x", binding(), pos()).unwrap();
        let err = scopes.add("x", binding(), pos()).unwrap_err();
        assert!(err.message.contains("duplicate definition of variable 'x'"));
    }

    #[test]
    fn test_shadowing_across_scopes_is_allowed() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.add("x", binding(), pos()).unwrap();
        scopes.push();
        assert!(scopes.add("x", binding(), pos()).is_ok());
    }
}
