//! Pluggable post-population policies for injected definitions.
//!
//! After the transplant engine fully populates a target definition, it hands the (source,
//! target) pair to an [`InjectBehavior`] exactly once; policies never observe a half-built
//! definition. Policies are small composable strategies chained by [`CompositeBehavior`]
//! rather than an inheritance tower: renaming, visibility lowering and re-parenting each
//! live in their own type, and the factory functions at the bottom assemble the usual
//! combinations.

use crate::{
    metadata::{
        event::EventDefRc,
        field::FieldDefRc,
        flags::TypeVisibility,
        method::MethodDefRc,
        module::ModuleRc,
        property::PropertyDefRc,
        types::{TypeDefRc, TypeReference},
    },
    Result,
};

/// Reference-rewrite handle passed to behaviors.
///
/// This is the transplant engine itself: rewriting a type reference through it resolves
/// origin-module definitions into their target-module equivalents, copying on demand.
pub trait ReferenceRewriter {
    /// The module definitions are copied from
    fn origin_module(&self) -> &ModuleRc;
    /// The module definitions are copied into
    fn target_module(&self) -> &ModuleRc;
    /// Rewrite a type reference so it is valid in the target module
    ///
    /// # Errors
    ///
    /// Returns a resolution error when the reference cannot be imported.
    fn rewrite_type(&mut self, reference: &TypeReference) -> Result<TypeReference>;
}

/// A policy applied to each definition after structural population.
///
/// All operations default to no-ops; implement the subset a strategy cares about.
#[allow(unused_variables)]
pub trait InjectBehavior {
    /// Process an injected type
    ///
    /// # Errors
    ///
    /// Implementations may fail with resolution errors from the rewriter.
    fn process_type(
        &self,
        source: &TypeDefRc,
        injected: &TypeDefRc,
        rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        Ok(())
    }

    /// Process an injected method
    ///
    /// # Errors
    ///
    /// Implementations may fail with resolution errors from the rewriter.
    fn process_method(
        &self,
        source: &MethodDefRc,
        injected: &MethodDefRc,
        rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        Ok(())
    }

    /// Process an injected field
    ///
    /// # Errors
    ///
    /// Implementations may fail with resolution errors from the rewriter.
    fn process_field(
        &self,
        source: &FieldDefRc,
        injected: &FieldDefRc,
        rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        Ok(())
    }

    /// Process an injected event
    ///
    /// # Errors
    ///
    /// Implementations may fail with resolution errors from the rewriter.
    fn process_event(
        &self,
        source: &EventDefRc,
        injected: &EventDefRc,
        rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        Ok(())
    }

    /// Process an injected property
    ///
    /// # Errors
    ///
    /// Implementations may fail with resolution errors from the rewriter.
    fn process_property(
        &self,
        source: &PropertyDefRc,
        injected: &PropertyDefRc,
        rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        Ok(())
    }
}

/// Chain of behaviors applied in order.
#[derive(Default)]
pub struct CompositeBehavior {
    steps: Vec<Box<dyn InjectBehavior>>,
}

impl CompositeBehavior {
    /// Create an empty chain (a no-op behavior)
    #[must_use]
    pub fn new() -> Self {
        CompositeBehavior { steps: Vec::new() }
    }

    /// Append a behavior to the chain
    #[must_use]
    pub fn then(mut self, step: impl InjectBehavior + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }
}

impl InjectBehavior for CompositeBehavior {
    fn process_type(
        &self,
        source: &TypeDefRc,
        injected: &TypeDefRc,
        rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        for step in &self.steps {
            step.process_type(source, injected, rewriter)?;
        }
        Ok(())
    }

    fn process_method(
        &self,
        source: &MethodDefRc,
        injected: &MethodDefRc,
        rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        for step in &self.steps {
            step.process_method(source, injected, rewriter)?;
        }
        Ok(())
    }

    fn process_field(
        &self,
        source: &FieldDefRc,
        injected: &FieldDefRc,
        rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        for step in &self.steps {
            step.process_field(source, injected, rewriter)?;
        }
        Ok(())
    }

    fn process_event(
        &self,
        source: &EventDefRc,
        injected: &EventDefRc,
        rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        for step in &self.steps {
            step.process_event(source, injected, rewriter)?;
        }
        Ok(())
    }

    fn process_property(
        &self,
        source: &PropertyDefRc,
        injected: &PropertyDefRc,
        rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        for step in &self.steps {
            step.process_property(source, injected, rewriter)?;
        }
        Ok(())
    }
}

/// Bump or attach a trailing `_N` counter: `Helper` becomes `Helper_0`, `Helper_0`
/// becomes `Helper_1`.
fn counter_name(original: &str) -> String {
    if let Some((stem, digits)) = original.rsplit_once('_') {
        if let Ok(counter) = digits.parse::<u32>() {
            return format!("{stem}_{}", counter + 1);
        }
    }
    format!("{original}_0")
}

/// Display name used for renaming types: nested types carry their declaring type's name.
fn type_display_name(ty: &TypeDefRc) -> String {
    match ty.declaring_type() {
        Some(declaring) => format!("{}+{}", declaring.name(), ty.name()),
        None => ty.name(),
    }
}

/// Whether renaming this method would break wiring: accessors and other special names,
/// delegate members and overrides keep their identity.
fn method_keeps_name(method: &MethodDefRc) -> bool {
    method.is_special_name()
        || method
            .declaring_type()
            .is_some_and(|declaring| declaring.is_delegate())
        || method.is_override()
}

/// Rename every injected definition with a counter suffix.
pub struct RenameAll;

impl InjectBehavior for RenameAll {
    fn process_type(
        &self,
        _source: &TypeDefRc,
        injected: &TypeDefRc,
        _rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        injected.set_name(&counter_name(&type_display_name(injected)));
        Ok(())
    }

    fn process_method(
        &self,
        _source: &MethodDefRc,
        injected: &MethodDefRc,
        _rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        if !method_keeps_name(injected) {
            injected.set_name(&counter_name(&injected.name()));
        }
        Ok(())
    }

    fn process_field(
        &self,
        _source: &FieldDefRc,
        injected: &FieldDefRc,
        _rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        if !injected.is_special_name() {
            injected.set_name(&counter_name(&injected.name()));
        }
        Ok(())
    }

    fn process_event(
        &self,
        _source: &EventDefRc,
        injected: &EventDefRc,
        _rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        if !injected.is_special_name() {
            injected.set_name(&counter_name(&injected.name()));
        }
        Ok(())
    }

    fn process_property(
        &self,
        _source: &PropertyDefRc,
        injected: &PropertyDefRc,
        _rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        if !injected.is_special_name() {
            injected.set_name(&counter_name(&injected.name()));
        }
        Ok(())
    }
}

/// Rename injected definitions only when keeping the name would collide with something
/// already in the target.
pub struct RenameDuplicates;

impl RenameDuplicates {
    fn method_clashes(injected: &MethodDefRc) -> bool {
        let Some(declaring) = injected.declaring_type() else {
            return false;
        };
        let name = injected.name();
        declaring
            .methods
            .iter()
            .any(|(_, sibling)| sibling.name() == name && !std::sync::Arc::ptr_eq(sibling, injected))
    }

    fn field_clashes(injected: &FieldDefRc) -> bool {
        let Some(declaring) = injected.declaring_type() else {
            return false;
        };
        let name = injected.name();
        declaring
            .fields
            .iter()
            .any(|(_, sibling)| sibling.name() == name && !std::sync::Arc::ptr_eq(sibling, injected))
    }
}

impl InjectBehavior for RenameDuplicates {
    fn process_type(
        &self,
        _source: &TypeDefRc,
        injected: &TypeDefRc,
        rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        // The injected type is not committed yet, so any match is a real clash
        if rewriter
            .target_module()
            .has_type_named(&injected.fullname(), true)
        {
            injected.set_name(&counter_name(&type_display_name(injected)));
        }
        Ok(())
    }

    fn process_method(
        &self,
        _source: &MethodDefRc,
        injected: &MethodDefRc,
        _rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        if !method_keeps_name(injected) && Self::method_clashes(injected) {
            injected.set_name(&counter_name(&injected.name()));
        }
        Ok(())
    }

    fn process_field(
        &self,
        _source: &FieldDefRc,
        injected: &FieldDefRc,
        _rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        if !injected.is_special_name() && Self::field_clashes(injected) {
            injected.set_name(&counter_name(&injected.name()));
        }
        Ok(())
    }
}

/// Lower public visibility to assembly visibility on everything injected.
pub struct Internalize;

impl InjectBehavior for Internalize {
    fn process_type(
        &self,
        _source: &TypeDefRc,
        injected: &TypeDefRc,
        _rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        let visibility = injected.visibility();
        if visibility == TypeVisibility::NESTED_PUBLIC {
            injected.set_visibility(TypeVisibility::NESTED_ASSEMBLY);
        } else if visibility == TypeVisibility::PUBLIC {
            injected.set_visibility(TypeVisibility::NOT_PUBLIC);
        }
        Ok(())
    }

    fn process_method(
        &self,
        _source: &MethodDefRc,
        injected: &MethodDefRc,
        _rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        if injected.is_public() && !injected.is_override() {
            injected.set_access(crate::metadata::flags::MethodAccessFlags::ASSEM);
        }
        Ok(())
    }

    fn process_field(
        &self,
        _source: &FieldDefRc,
        injected: &FieldDefRc,
        _rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        if injected.is_public() {
            injected.set_access(crate::metadata::flags::FieldAccessFlags::ASSEM);
        }
        Ok(())
    }
}

/// Re-parent injected top-level types as nested-private types of a designated host.
pub struct NestUnder {
    host: TypeDefRc,
}

impl NestUnder {
    /// Nest injected dependency types under `host`
    #[must_use]
    pub fn new(host: &TypeDefRc) -> Self {
        NestUnder { host: host.clone() }
    }
}

impl InjectBehavior for NestUnder {
    fn process_type(
        &self,
        _source: &TypeDefRc,
        injected: &TypeDefRc,
        _rewriter: &mut dyn ReferenceRewriter,
    ) -> Result<()> {
        if !injected.is_nested() && !std::sync::Arc::ptr_eq(&self.host, injected) {
            self.host.add_nested_type(injected);
            injected.set_visibility(TypeVisibility::NESTED_PRIVATE);
        }
        Ok(())
    }
}

/// A behavior that leaves everything untouched
#[must_use]
pub fn nop() -> CompositeBehavior {
    CompositeBehavior::new()
}

/// Rename everything injected
#[must_use]
pub fn rename() -> CompositeBehavior {
    CompositeBehavior::new().then(RenameAll)
}

/// Rename everything and internalize public surface
#[must_use]
pub fn rename_and_internalize() -> CompositeBehavior {
    CompositeBehavior::new().then(RenameAll).then(Internalize)
}

/// Rename everything, internalize, and nest dependency types under `host`
#[must_use]
pub fn rename_and_nest(host: &TypeDefRc) -> CompositeBehavior {
    CompositeBehavior::new()
        .then(RenameAll)
        .then(Internalize)
        .then(NestUnder::new(host))
}

/// Rename only on collision
#[must_use]
pub fn rename_duplicates() -> CompositeBehavior {
    CompositeBehavior::new().then(RenameDuplicates)
}

/// Rename only on collision and internalize public surface
#[must_use]
pub fn rename_duplicates_and_internalize() -> CompositeBehavior {
    CompositeBehavior::new()
        .then(RenameDuplicates)
        .then(Internalize)
}

/// Rename only on collision, internalize, and nest dependency types under `host`
#[must_use]
pub fn rename_duplicates_and_nest(host: &TypeDefRc) -> CompositeBehavior {
    CompositeBehavior::new()
        .then(RenameDuplicates)
        .then(Internalize)
        .then(NestUnder::new(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_name() {
        assert_eq!(counter_name("Helper"), "Helper_0");
        assert_eq!(counter_name("Helper_0"), "Helper_1");
        assert_eq!(counter_name("Helper_41"), "Helper_42");
        // A non-numeric suffix is part of the stem
        assert_eq!(counter_name("read_back"), "read_back_0");
    }

    #[test]
    fn test_type_display_name_includes_declaring() {
        use crate::metadata::types::TypeDef;

        let outer = TypeDef::new("N", "Outer", 0);
        let inner = TypeDef::new("", "Inner", 0);
        outer.add_nested_type(&inner);
        assert_eq!(type_display_name(&inner), "Outer+Inner");
        assert_eq!(type_display_name(&outer), "Outer");
    }
}
