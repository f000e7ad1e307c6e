//! Name, kind and storage registry
//!
//! One `SymbolTable` is created per compilation or execution unit and
//! dropped with it; nothing survives across runs. The interpreter uses the
//! `(kind, value)` side, the code generators use the storage side, and both
//! share the declare-before-use invariants.

use crate::ast::Kind;
use crate::error::{ProsaError, ProsaResult};
use crate::runtime::Value;
use indexmap::IndexMap;

#[derive(Debug, Clone)]
struct Binding {
    kind: Kind,
    value: Option<Value>,
}

/// Where a variable lives in generated code: a frame offset in the
/// stack-frame dialect, an allocation index for the SSA dialect's global
/// cells. Slots are handed out monotonically and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Storage {
    pub slot: i32,
    pub kind: Kind,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    bindings: IndexMap<String, Binding>,
    storage: IndexMap<String, Storage>,
    frame_size: i32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a name with its declared kind. Each name may be declared
    /// exactly once per unit.
    pub fn declare(&mut self, name: &str, kind: Kind) -> ProsaResult<()> {
        if self.bindings.contains_key(name) {
            return Err(ProsaError::name(format!(
                "variable '{}' already declared",
                name
            )));
        }
        self.bindings
            .insert(name.to_string(), Binding { kind, value: None });
        Ok(())
    }

    /// Bind a value to a declared name of the same kind.
    pub fn set(&mut self, name: &str, value: Value) -> ProsaResult<()> {
        let binding = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| ProsaError::name(format!("variable '{}' not declared", name)))?;
        if value.kind() != binding.kind {
            return Err(ProsaError::type_error(format!(
                "type mismatch in assignment to '{}': expected '{}', got '{}'",
                name,
                binding.kind,
                value.kind()
            )));
        }
        binding.value = Some(value);
        Ok(())
    }

    /// Look up the current value of a name. Reading a declared name that
    /// was never assigned is an error.
    pub fn get(&self, name: &str) -> ProsaResult<(Value, Kind)> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| ProsaError::name(format!("variable '{}' not declared", name)))?;
        match &binding.value {
            Some(value) => Ok((value.clone(), binding.kind)),
            None => Err(ProsaError::name(format!(
                "variable '{}' used before assignment",
                name
            ))),
        }
    }

    /// Declared kind of a name, for checking without touching values.
    pub fn kind_of(&self, name: &str) -> ProsaResult<Kind> {
        self.bindings
            .get(name)
            .map(|binding| binding.kind)
            .ok_or_else(|| ProsaError::name(format!("variable '{}' not declared", name)))
    }

    /// Assign the next storage slot to a name. Slots advance in 4-byte
    /// units and are never handed out twice.
    pub fn allocate(&mut self, name: &str, kind: Kind) -> ProsaResult<i32> {
        if self.storage.contains_key(name) {
            return Err(ProsaError::name(format!(
                "variable '{}' already declared",
                name
            )));
        }
        self.frame_size += 4;
        let slot = self.frame_size;
        self.storage.insert(name.to_string(), Storage { slot, kind });
        Ok(slot)
    }

    pub fn storage(&self, name: &str) -> ProsaResult<Storage> {
        self.storage
            .get(name)
            .copied()
            .ok_or_else(|| ProsaError::name(format!("variable '{}' not declared", name)))
    }

    /// All allocated storage in allocation order.
    pub fn storages(&self) -> impl Iterator<Item = (&str, Storage)> {
        self.storage.iter().map(|(name, st)| (name.as_str(), *st))
    }

    /// Total bytes reserved so far, i.e. the frame size of the stack dialect.
    pub fn frame_size(&self) -> i32 {
        self.frame_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_twice_fails() {
        let mut table = SymbolTable::new();
        table.declare("x", Kind::Int).unwrap();
        let err = table.declare("x", Kind::Bool).unwrap_err();
        assert!(matches!(err, ProsaError::Name { .. }));
    }

    #[test]
    fn test_set_enforces_declared_kind() {
        let mut table = SymbolTable::new();
        table.declare("flag", Kind::Bool).unwrap();
        table.set("flag", Value::Bool(true)).unwrap();
        let err = table.set("flag", Value::Int(1)).unwrap_err();
        assert!(matches!(err, ProsaError::Type { .. }));
    }

    #[test]
    fn test_get_before_set_fails() {
        let mut table = SymbolTable::new();
        table.declare("x", Kind::Int).unwrap();
        let err = table.get("x").unwrap_err();
        assert!(err.to_string().contains("before assignment"));
    }

    #[test]
    fn test_get_undeclared_fails() {
        let table = SymbolTable::new();
        assert!(table.get("ghost").is_err());
    }

    #[test]
    fn test_allocation_is_monotonic() {
        let mut table = SymbolTable::new();
        assert_eq!(table.allocate("a", Kind::Int).unwrap(), 4);
        assert_eq!(table.allocate("b", Kind::Bool).unwrap(), 8);
        assert_eq!(table.allocate("c", Kind::Int).unwrap(), 12);
        assert_eq!(table.frame_size(), 12);
        let order: Vec<&str> = table.storages().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
