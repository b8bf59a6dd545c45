//! Symbol tables (§4.1, §4.3): per-block local scopes chained to an
//! enclosing scope, and the flat global table.
//!
//! Grounded on `original_source/src/utility/Symbol.hpp`'s `LocalSymbols`
//! (vector + index map + enclosing pointer) and `GlobalSymbols` (vector of
//! types, index map, no enclosing chain — there is only ever one).

use crate::types::Type;
use std::collections::HashMap;

/// Sentinel returned by lookups that find nothing, matching
/// `LocalSymbols::noVariable`/`GlobalSymbols::noVariable`.
pub const NO_VARIABLE: usize = usize::MAX;

/// One block's local variables, chained to the scope it's nested in. Each
/// `{ ... }` block in the source owns one of these (mirroring `StmtList`
/// inheriting `LocalSymbols` in the original).
#[derive(Debug, Default)]
pub struct LocalScope {
    names: Vec<String>,
    types: Vec<Type>,
    index: HashMap<String, usize>,
}

impl LocalScope {
    pub fn new() -> Self {
        LocalScope::default()
    }

    pub fn add(&mut self, name: &str, ty: Type) -> usize {
        let slot = self.names.len();
        self.names.push(name.to_string());
        self.types.push(ty);
        self.index.insert(name.to_string(), slot);
        slot
    }

    /// Looks up `name` in this scope only (no chain walk); used by callers
    /// that have already assembled the full enclosing chain themselves.
    pub fn local_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get_type(&self, slot: usize) -> Option<&Type> {
        self.types.get(slot)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A chain of [`LocalScope`]s from the innermost block outward, the runtime
/// form of `LocalSymbols::getIndex`'s enclosing-pointer walk. `(depth,
/// slot)` addresses a variable: `depth` counts how many scopes out from the
/// innermost one it was declared in.
pub struct ScopeChain<'a> {
    scopes: Vec<&'a LocalScope>,
}

impl<'a> ScopeChain<'a> {
    pub fn new() -> Self {
        ScopeChain { scopes: Vec::new() }
    }

    pub fn push(&mut self, scope: &'a LocalScope) {
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Walks from the innermost scope outward, matching `getIndex(name,
    /// noEnclosing=false)`. Returns `(depth, slot)` where depth `0` is the
    /// innermost scope.
    pub fn find(&self, name: &str) -> Option<(usize, usize)> {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(slot) = scope.local_index(name) {
                return Some((depth, slot));
            }
        }
        None
    }

    /// `getIndex(name, noEnclosing=true)`: only the innermost scope.
    pub fn find_innermost_only(&self, name: &str) -> Option<usize> {
        self.scopes.last().and_then(|scope| scope.local_index(name))
    }
}

impl<'a> Default for ScopeChain<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// The single top-level global table (`GlobalSymbols`): flat, no enclosing
/// chain, one entry per top-level `let`.
#[derive(Debug, Default)]
pub struct GlobalScope {
    names: Vec<String>,
    types: Vec<Type>,
    index: HashMap<String, usize>,
}

impl GlobalScope {
    pub fn new() -> Self {
        GlobalScope::default()
    }

    pub fn add(&mut self, name: &str, ty: Type) -> usize {
        let slot = self.names.len();
        self.names.push(name.to_string());
        self.types.push(ty);
        self.index.insert(name.to_string(), slot);
        slot
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get_type(&self, slot: usize) -> Option<&Type> {
        self.types.get(slot)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Kind;

    #[test]
    fn chain_finds_innermost_shadowing_declaration() {
        let mut outer = LocalScope::new();
        outer.add("x", Type::scalar(Kind::Integer));
        let mut inner = LocalScope::new();
        inner.add("x", Type::scalar(Kind::Floating));

        let mut chain = ScopeChain::new();
        chain.push(&outer);
        chain.push(&inner);
        assert_eq!(chain.find("x"), Some((0, 0)));
        chain.pop();
        assert_eq!(chain.find("x"), Some((0, 0)));
    }

    #[test]
    fn global_scope_assigns_sequential_slots() {
        let mut globals = GlobalScope::new();
        let a = globals.add("a", Type::scalar(Kind::Integer));
        let b = globals.add("b", Type::scalar(Kind::String));
        assert_eq!((a, b), (0, 1));
        assert_eq!(globals.find("a"), Some(0));
        assert_eq!(globals.find("missing"), None);
    }
}
