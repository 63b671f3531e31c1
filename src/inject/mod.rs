//! Graph transplantation: copying definitions and their dependency closures across
//! modules.
//!
//! # Architecture
//!
//! A caller owns an [`InjectContext`] per logical injection session and passes it to
//! [`inject_type`] / [`inject_method`] together with the target module and an
//! [`behavior::InjectBehavior`] policy. The engine allocates skeleton twins, records the
//! source→target mapping immediately (breaking reference cycles), drains a FIFO worklist
//! to populate each definition, transplants method bodies, applies the behavior policy
//! once per fully populated definition, and commits everything into the target module.
//!
//! Injection is idempotent per context: injecting the same definition twice returns the
//! identical target definition, and the target module grows by the closure exactly once.
//! Use [`InjectContext::child`] to deliberately create independent copies.
//!
//! # Failure semantics
//!
//! A cross-module reference that resolves to neither an existing target-module definition
//! nor an importable origin-module definition aborts the whole call with
//! [`Error::Resolution`](crate::Error::Resolution). No partial-commit guarantee is made:
//! the target module may already contain part of the closure and should be discarded.
//!
//! # Example
//!
//! ```rust,ignore
//! use cilgraft::inject::{behavior, inject_method, InjectContext};
//!
//! let mut ctx = InjectContext::new(origin.clone(), target.clone());
//! let result = inject_method(&helper, &target, &mut ctx, &behavior::rename())?;
//! println!(
//!     "{} landed as {}, {} dependencies came along",
//!     result.source.name(),
//!     result.mapped.name(),
//!     result.injected.len()
//! );
//! ```

pub mod behavior;
mod context;
mod injector;
mod result;
mod transplant;

pub use context::InjectContext;
pub use result::InjectResult;

use crate::{
    metadata::{member::MemberDef, method::MethodDefRc, module::ModuleRc, types::TypeDefRc},
    Result,
};
use behavior::InjectBehavior;
use injector::Injector;

fn check_context(ctx: &InjectContext, target: &ModuleRc, source_module: Option<ModuleRc>) {
    assert!(
        ctx.target().same_as(target),
        "context targets module {} but injection targets {}",
        ctx.target().name,
        target.name
    );
    if let Some(source_module) = source_module {
        assert!(
            ctx.origin().same_as(&source_module),
            "definition originates from {} but the context covers {}",
            source_module.name,
            ctx.origin().name
        );
    }
}

/// Inject a method into the target module.
///
/// Static methods land on the target module's `<Module>` global type; instance methods
/// are injected along with their declaring type. Everything the method transitively
/// references in the origin module is copied as well, and the returned
/// [`InjectResult::injected`] lists those dependency pairs (excluding the requested
/// method itself).
///
/// # Errors
///
/// Returns a resolution error when a reference cannot be imported, or a validation error
/// when a body fails normalization. The target module is in an undefined state after an
/// error and should be discarded.
///
/// # Panics
///
/// Panics when `ctx` was created for different modules than the ones involved here
/// (precondition violation), or when recording a mapping would overwrite an existing one
/// with a different target (internal consistency violation).
pub fn inject_method(
    method: &MethodDefRc,
    target: &ModuleRc,
    ctx: &mut InjectContext,
    behavior: &dyn InjectBehavior,
) -> Result<InjectResult<MethodDefRc>> {
    check_context(ctx, target, method.module());

    if method.is_static() {
        if let Some(declaring) = method.declaring_type() {
            ctx.record(
                &MemberDef::Type(declaring),
                &MemberDef::Type(target.global_type().clone()),
            );
        }
    }

    let mut injector = Injector::new(ctx, behavior);
    let mapped = injector.inject_method(method)?;

    let requested = MemberDef::Method(method.clone()).key();
    let injected = injector
        .into_injected()
        .into_iter()
        .filter(|(source, _)| source.key() != requested)
        .collect();

    Ok(InjectResult {
        source: method.clone(),
        mapped,
        injected,
    })
}

/// Inject a type into the target module.
///
/// The type is copied with all of its declared methods, fields, events, properties and
/// nested types, plus the transitive dependency closure of everything those reference.
///
/// # Errors
///
/// Returns a resolution error when a reference cannot be imported, or a validation error
/// when a body fails normalization. The target module is in an undefined state after an
/// error and should be discarded.
///
/// # Panics
///
/// Panics when `ctx` was created for different modules than the ones involved here
/// (precondition violation), or when recording a mapping would overwrite an existing one
/// with a different target (internal consistency violation).
pub fn inject_type(
    ty: &TypeDefRc,
    target: &ModuleRc,
    ctx: &mut InjectContext,
    behavior: &dyn InjectBehavior,
) -> Result<InjectResult<TypeDefRc>> {
    check_context(ctx, target, MemberDef::Type(ty.clone()).module());

    let mut injector = Injector::new(ctx, behavior);
    let mapped = injector.inject_type(ty)?;

    let requested = MemberDef::Type(ty.clone()).key();
    let injected = injector
        .into_injected()
        .into_iter()
        .filter(|(source, _)| source.key() != requested)
        .collect();

    Ok(InjectResult {
        source: ty.clone(),
        mapped,
        injected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::module::Module;
    use crate::test::factories;

    #[test]
    fn test_static_helper_lands_on_global_type() {
        let (origin, _helpers, method) = factories::origin_with_static_method();
        let target = Module::new("app.dll");
        let mut ctx = InjectContext::new(origin, target.clone());

        let result = inject_method(&method, &target, &mut ctx, &behavior::rename()).unwrap();

        assert_eq!(target.global_type().methods.count(), 1);
        assert_eq!(result.mapped.name(), "Answer_0");
        assert!(result.mapped.has_body());
        assert!(result.injected.is_empty());
    }

    #[test]
    #[should_panic(expected = "context targets module")]
    fn test_mismatched_context_target_panics() {
        let (origin, _helpers, method) = factories::origin_with_static_method();
        let target = Module::new("app.dll");
        let unrelated = Module::new("unrelated.dll");
        let mut ctx = InjectContext::new(origin, unrelated);

        let _ = inject_method(&method, &target, &mut ctx, &behavior::nop());
    }
}
