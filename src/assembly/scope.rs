//! Lexical debug scopes.
//!
//! A scope covers a range of instructions in which a set of debug-visible locals is live;
//! scopes nest into a tree rooted at the body. Boundaries use the same id-or-sentinel
//! convention as exception handler regions: `None` as an end means the scope stays open to
//! the end of the body.

use crate::assembly::instruction::InstrId;

/// One lexical range in the debug scope tree.
#[derive(Debug, Clone, Default)]
pub struct LocalScope {
    /// First instruction covered by the scope
    pub start: Option<InstrId>,
    /// End boundary of the scope (`None` = end of body)
    pub end: Option<InstrId>,
    /// Child scopes nested within this range
    pub scopes: Vec<LocalScope>,
}

impl LocalScope {
    /// Create a scope over the given range with no children
    #[must_use]
    pub fn new(start: Option<InstrId>, end: Option<InstrId>) -> Self {
        LocalScope {
            start,
            end,
            scopes: Vec::new(),
        }
    }

    /// Visit this scope and every nested scope, depth first
    pub fn for_each<F: FnMut(&LocalScope)>(&self, f: &mut F) {
        f(self);
        for child in &self.scopes {
            child.for_each(f);
        }
    }

    /// Mutable counterpart of [`LocalScope::for_each`]
    pub fn for_each_mut<F: FnMut(&mut LocalScope)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.scopes {
            child.for_each_mut(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_visits_all_nested_scopes() {
        let mut root = LocalScope::new(None, None);
        let mut child = LocalScope::new(None, None);
        child.scopes.push(LocalScope::new(None, None));
        root.scopes.push(child);
        root.scopes.push(LocalScope::new(None, None));

        let mut count = 0;
        root.for_each(&mut |_| count += 1);
        assert_eq!(count, 4);

        let id = InstrId::next();
        root.for_each_mut(&mut |scope| scope.start = Some(id));
        root.for_each(&mut |scope| assert_eq!(scope.start, Some(id)));
    }
}
