//! The instruction body transplanter.
//!
//! Copies a method body across modules in two passes over a normalized source. Pass one
//! clones every local and every instruction in source order, building old→new identity
//! maps; pass two rewrites instruction-reference operands through the instruction map,
//! local operands through the local map and definition operands through the
//! context-backed importer, then copies each exception handler and debug scope with its
//! boundaries remapped. The result is structurally isomorphic to the source: same
//! reachable branch-target set, same try/handler nesting, same local types, differing
//! only in identity and in cross-module references resolved to their target-module
//! equivalents.

use std::collections::HashMap;

use crate::{
    assembly::{normalize, CilBody, ExceptionHandler, InstrId, LocalId, LocalScope, Operand},
    inject::injector::Injector,
    metadata::method::MethodDefRc,
    Result,
};

fn remap(map: &HashMap<InstrId, InstrId>, id: InstrId) -> Result<InstrId> {
    map.get(&id)
        .copied()
        .ok_or_else(|| validation_error!("instruction reference {id} points outside the body"))
}

fn remap_boundary(
    map: &HashMap<InstrId, InstrId>,
    boundary: Option<InstrId>,
) -> Result<Option<InstrId>> {
    boundary.map(|id| remap(map, id)).transpose()
}

fn remap_scope(scope: &LocalScope, map: &HashMap<InstrId, InstrId>) -> Result<LocalScope> {
    Ok(LocalScope {
        start: remap_boundary(map, scope.start)?,
        end: remap_boundary(map, scope.end)?,
        scopes: scope
            .scopes
            .iter()
            .map(|child| remap_scope(child, map))
            .collect::<Result<Vec<_>>>()?,
    })
}

impl Injector<'_> {
    /// Transplant the body of `source_method`, returning `None` for bodiless methods.
    ///
    /// The source body is normalized in place first (shorthand opcodes expanded to
    /// their canonical forms and the evaluation-stack depth recomputed) so the copy
    /// below never sees encoding-dependent special cases. Failing to analyze the stack
    /// aborts with a validation error rather than producing a silently broken body.
    pub(crate) fn transplant_body(
        &mut self,
        source_method: &MethodDefRc,
    ) -> Result<Option<CilBody>> {
        let mut source_guard = source_method.body_mut();
        let Some(source) = source_guard.as_mut() else {
            return Ok(None);
        };

        normalize::normalize(source)?;

        let mut body = CilBody::new();
        body.init_locals = source.init_locals;
        body.max_stack = source.max_stack;

        let mut local_map: HashMap<LocalId, LocalId> = HashMap::new();
        for local in &source.locals {
            let mut clone = local.copy_with_fresh_id();
            clone.local_type = self.import_sig(&clone.local_type)?;
            local_map.insert(local.id(), clone.id());
            body.locals.push(clone);
        }

        let mut instr_map: HashMap<InstrId, InstrId> = HashMap::new();
        for instruction in source.instructions() {
            let copy = instruction.copy_with_fresh_id();
            instr_map.insert(instruction.id(), copy.id());
            body.push(copy);
        }

        for instruction in body.instructions_mut() {
            match &mut instruction.operand {
                Operand::Target(target) => {
                    *target = remap(&instr_map, *target)?;
                }
                Operand::Switch(targets) => {
                    for target in targets {
                        *target = remap(&instr_map, *target)?;
                    }
                }
                Operand::Local(local) => {
                    *local = local_map.get(local).copied().ok_or_else(|| {
                        validation_error!("local operand points outside the body's local table")
                    })?;
                }
                Operand::Member(member) => {
                    *member = self.import_member(member)?;
                }
                Operand::Type(ty) => {
                    *ty = self.import_type(ty)?;
                }
                Operand::None
                | Operand::Immediate(_)
                | Operand::String(_)
                | Operand::Argument(_) => {}
            }
        }

        // All boundary instructions belong to the same source body, so they are in the
        // map by construction
        for handler in &source.exception_handlers {
            let catch_type = match &handler.catch_type {
                Some(catch_type) => Some(self.import_type(catch_type)?),
                None => None,
            };
            body.exception_handlers.push(ExceptionHandler {
                kind: handler.kind,
                catch_type,
                try_start: remap_boundary(&instr_map, handler.try_start)?,
                try_end: remap_boundary(&instr_map, handler.try_end)?,
                handler_start: remap_boundary(&instr_map, handler.handler_start)?,
                handler_end: remap_boundary(&instr_map, handler.handler_end)?,
                filter_start: remap_boundary(&instr_map, handler.filter_start)?,
            });
        }

        body.scope = source
            .scope
            .as_ref()
            .map(|root| remap_scope(root, &instr_map))
            .transpose()?;

        Ok(Some(body))
    }
}
