// SPDX-License-Identifier: MIT
// Copyright (c) 2023 Kagati Foundation

use pgl_errors::CompileError;
use pgl_symbol::{Symbol, SymbolTable};
use pgl_types::PglType;

/// Scope ID
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
pub struct ScopeId(pub usize);

#[derive(Debug)]
pub struct Scope {
    pub table: SymbolTable,
    pub parent: Option<ScopeId>,
}

/// Arena of every scope created during one compilation unit. Scopes
/// hold an index to their parent, never an owning reference; parents
/// never reference children.
#[derive(Debug, Default)]
pub struct ScopeManager {
    scopes: Vec<Scope>,
}

impl ScopeManager {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// A scope with no parent. Its first symbol sits at offset zero.
    pub fn create_root(&mut self) -> ScopeId {
        self.scopes.push(Scope {
            table: SymbolTable::new(0),
            parent: None,
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// A scope nested inside `parent`. Its offsets continue from the
    /// parent's cumulative frame end at the time of creation, so
    /// nested-block declarations live above the enclosing frame.
    pub fn create_child(&mut self, parent: ScopeId) -> ScopeId {
        let base = self.get(parent).table.frame_end();
        self.scopes.push(Scope {
            table: SymbolTable::new(base),
            parent: Some(parent),
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn register(
        &mut self,
        id: ScopeId,
        name: &str,
        ty: PglType,
    ) -> Result<&Symbol, CompileError> {
        self.scopes[id.0].table.register(name, ty)
    }

    /// Search `id`'s own bindings, then each ancestor in turn.
    pub fn deep_lookup(&self, id: ScopeId, name: &str) -> Option<&Symbol> {
        let scope = self.get(id);
        if let Some(sym) = scope.table.get(name) {
            return Some(sym);
        }
        if let Some(parent) = scope.parent {
            return self.deep_lookup(parent, name);
        }
        None
    }

    pub fn lookup(&self, id: ScopeId, name: &str) -> Result<&Symbol, CompileError> {
        self.deep_lookup(id, name)
            .ok_or_else(|| CompileError::UnknownSymbol {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgl_types::TypeRegistry;

    #[test]
    fn child_offsets_continue_from_parent_frame() {
        let registry = TypeRegistry::new(8);
        let mut scopes = ScopeManager::new();

        let root = scopes.create_root();
        scopes.register(root, "a", registry.lookup("i32").unwrap()).unwrap();
        scopes.register(root, "b", registry.lookup("i32").unwrap()).unwrap();

        let child = scopes.create_child(root);
        let sym = scopes
            .register(child, "c", registry.lookup("i64").unwrap())
            .unwrap();
        assert_eq!(sym.stack_offset, 8);
    }

    #[test]
    fn lookup_falls_through_to_ancestors() {
        let registry = TypeRegistry::new(8);
        let mut scopes = ScopeManager::new();

        let root = scopes.create_root();
        scopes.register(root, "a", registry.lookup("i32").unwrap()).unwrap();
        let child = scopes.create_child(root);
        let grandchild = scopes.create_child(child);

        let sym = scopes.lookup(grandchild, "a").unwrap();
        assert_eq!(sym.stack_offset, 0);
        assert!(scopes.lookup(grandchild, "zzz").is_err());
    }

    #[test]
    fn shadowing_resolves_to_the_inner_declaration() {
        let registry = TypeRegistry::new(8);
        let mut scopes = ScopeManager::new();

        let root = scopes.create_root();
        scopes.register(root, "x", registry.lookup("i32").unwrap()).unwrap();
        let child = scopes.create_child(root);
        scopes.register(child, "x", registry.lookup("i64").unwrap()).unwrap();

        let inner = scopes.lookup(child, "x").unwrap();
        assert_eq!(inner.ty.name(), "i64");
        assert_eq!(inner.stack_offset, 4);

        let outer = scopes.lookup(root, "x").unwrap();
        assert_eq!(outer.ty.name(), "i32");
    }
}
