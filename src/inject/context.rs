//! The injection context: a memoized source→target definition mapping.
//!
//! One context exists per (origin module, target module) pair and per logical injection
//! session; the caller owns it and passes it into every `inject` call that should share
//! memoization. The mapping is append-only and monotonic: entries are never removed or
//! altered for the lifetime of the context, which is precisely what makes the early
//! skeleton recording of the transplant engine safe against cycles.
//!
//! There is no ambient or global context store. Scoped nesting is plain value ownership:
//! [`InjectContext::child`] returns a derived context seeded with everything the parent
//! currently knows, and dropping the child releases it on every exit path; mappings added
//! in a child never leak back into the parent or into sibling children.

use std::collections::HashMap;

use crate::metadata::{
    member::{MemberDef, MemberKey},
    method::MethodDefRc,
    module::ModuleRc,
    types::TypeDefRc,
};

/// Scoped, append-only source→target definition mapping for one injection session.
///
/// # Examples
///
/// Injecting the same definition twice in one context yields the identical target; doing
/// it in two sibling child contexts yields two distinct targets:
///
/// ```rust,ignore
/// let mut first = ctx.child();
/// let a = inject_method(&method, &target, &mut first, &behavior)?;
/// let mut second = ctx.child();
/// let b = inject_method(&method, &target, &mut second, &behavior)?;
/// assert!(!a.mapped.same_as(&b.mapped));
/// ```
pub struct InjectContext {
    origin: ModuleRc,
    target: ModuleRc,
    map: HashMap<MemberKey, MemberDef>,
}

impl InjectContext {
    /// Create a fresh context for injecting from `origin` into `target`
    #[must_use]
    pub fn new(origin: ModuleRc, target: ModuleRc) -> Self {
        InjectContext {
            origin,
            target,
            map: HashMap::new(),
        }
    }

    /// The module definitions are copied from
    #[must_use]
    pub fn origin(&self) -> &ModuleRc {
        &self.origin
    }

    /// The module definitions are copied into
    #[must_use]
    pub fn target(&self) -> &ModuleRc {
        &self.target
    }

    /// Derive a child context seeded with all entries currently in this context.
    ///
    /// Entries are carried over by reference (the definitions themselves are shared);
    /// mappings recorded in the child afterwards are invisible to this context and to any
    /// sibling child. A child created later sees mappings the parent gained in between.
    #[must_use]
    pub fn child(&self) -> InjectContext {
        InjectContext {
            origin: self.origin.clone(),
            target: self.target.clone(),
            map: self.map.clone(),
        }
    }

    /// Record that `source` maps to `target`.
    ///
    /// Recording the same pair again is a no-op. Recording a *different* target for an
    /// already-mapped source is an internal consistency violation and panics: the engine
    /// relies on a source definition resolving to exactly one target for the lifetime of
    /// the context.
    ///
    /// # Panics
    ///
    /// Panics when `source` is already mapped to a different definition.
    pub fn record(&mut self, source: &MemberDef, target: &MemberDef) {
        if let Some(existing) = self.map.get(&source.key()) {
            assert!(
                existing.same_as(target),
                "mapping for {} overwritten with a different target",
                source.name()
            );
            return;
        }
        self.map.insert(source.key(), target.clone());
    }

    /// Resolve the target a source definition maps to, if recorded
    #[must_use]
    pub fn resolve(&self, source: &MemberDef) -> Option<MemberDef> {
        self.map.get(&source.key()).cloned()
    }

    /// Kind-typed [`InjectContext::resolve`] for types
    #[must_use]
    pub fn resolve_type(&self, source: &TypeDefRc) -> Option<TypeDefRc> {
        match self.resolve(&MemberDef::Type(source.clone())) {
            Some(MemberDef::Type(mapped)) => Some(mapped),
            _ => None,
        }
    }

    /// Kind-typed [`InjectContext::resolve`] for methods
    #[must_use]
    pub fn resolve_method(&self, source: &MethodDefRc) -> Option<MethodDefRc> {
        match self.resolve(&MemberDef::Method(source.clone())) {
            Some(MemberDef::Method(mapped)) => Some(mapped),
            _ => None,
        }
    }

    /// Number of recorded mappings
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the context has no recorded mappings
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl std::fmt::Debug for InjectContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectContext")
            .field("origin", &self.origin.name)
            .field("target", &self.target.name)
            .field("mappings", &self.map.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{module::Module, types::TypeDef};

    fn context() -> InjectContext {
        InjectContext::new(Module::new("origin.dll"), Module::new("target.dll"))
    }

    #[test]
    fn test_record_and_resolve() {
        let mut ctx = context();
        let source = MemberDef::Type(TypeDef::new("N", "A", 0));
        let target = MemberDef::Type(TypeDef::new("N", "A", 0));

        assert!(ctx.resolve(&source).is_none());
        ctx.record(&source, &target);
        assert!(ctx.resolve(&source).unwrap().same_as(&target));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_record_same_pair_is_noop() {
        let mut ctx = context();
        let source = MemberDef::Type(TypeDef::new("N", "A", 0));
        let target = MemberDef::Type(TypeDef::new("N", "A", 0));

        ctx.record(&source, &target);
        ctx.record(&source, &target);
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    #[should_panic(expected = "overwritten")]
    fn test_record_conflicting_target_panics() {
        let mut ctx = context();
        let source = MemberDef::Type(TypeDef::new("N", "A", 0));
        let target_a = MemberDef::Type(TypeDef::new("N", "A", 0));
        let target_b = MemberDef::Type(TypeDef::new("N", "B", 0));

        ctx.record(&source, &target_a);
        ctx.record(&source, &target_b);
    }

    #[test]
    fn test_child_sees_prior_entries_only() {
        let mut parent = context();
        let before = MemberDef::Type(TypeDef::new("N", "Before", 0));
        let before_target = MemberDef::Type(TypeDef::new("N", "Before", 0));
        parent.record(&before, &before_target);

        let mut child = parent.child();
        assert!(child.resolve(&before).is_some());

        // Child additions stay in the child
        let added = MemberDef::Type(TypeDef::new("N", "Added", 0));
        let added_target = MemberDef::Type(TypeDef::new("N", "Added", 0));
        child.record(&added, &added_target);
        assert!(parent.resolve(&added).is_none());

        // A parent addition after derivation is invisible to the existing child,
        // visible to a new one
        let after = MemberDef::Type(TypeDef::new("N", "After", 0));
        let after_target = MemberDef::Type(TypeDef::new("N", "After", 0));
        parent.record(&after, &after_target);
        assert!(child.resolve(&after).is_none());
        assert!(parent.child().resolve(&after).is_some());
    }

    #[test]
    fn test_sibling_children_are_isolated() {
        let parent = context();
        let mut left = parent.child();
        let mut right = parent.child();

        let source = MemberDef::Type(TypeDef::new("N", "A", 0));
        let left_target = MemberDef::Type(TypeDef::new("N", "A", 0));
        let right_target = MemberDef::Type(TypeDef::new("N", "A", 0));

        left.record(&source, &left_target);
        right.record(&source, &right_target);

        assert!(left.resolve(&source).unwrap().same_as(&left_target));
        assert!(right.resolve(&source).unwrap().same_as(&right_target));
        assert!(parent.resolve(&source).is_none());
    }
}
