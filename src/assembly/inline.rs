//! Call-site inlining.
//!
//! [`CilBody::merge_call`] replaces a `call` instruction with the callee's entire body:
//! arguments become fresh locals stored before the inlined code, callee locals are cloned,
//! `ret` turns into a branch past the inlined region, and the callee's exception handlers
//! are spliced in. The call instruction itself degrades to `nop`, so every reference to it
//! stays valid without any boundary fixups.

use std::collections::HashMap;

use crate::{
    assembly::{
        body::{CilBody, Local},
        instruction::{InstrId, Instruction, LocalId, Operand},
        normalize, opcodes,
    },
    metadata::{
        member::{MemberDef, MemberReference},
        method::MethodDefRc,
        signatures::TypeSig,
        types::TypeReference,
    },
    Result,
};

impl CilBody {
    /// Inline the callee of the `call` instruction at `call_site` into this body.
    ///
    /// The callee must be a method definition with a body, and must not be the method this
    /// body belongs to. Its body is normalized in place before copying, as with a
    /// transplant.
    ///
    /// # Errors
    ///
    /// Returns a resolution error when the call-site operand is not a method definition,
    /// the callee has no body or no signature, or the call site is the last instruction of
    /// the body (there is nowhere to branch after the inlined code).
    ///
    /// # Panics
    ///
    /// Panics if `call_site` is not an instruction of this body.
    pub fn merge_call(&mut self, call_site: InstrId) -> Result<()> {
        let call_index = self
            .index_of(call_site)
            .unwrap_or_else(|| panic!("call instruction {call_site} not present in body"));

        let callee = self.callee_of(call_site)?;
        if call_index + 1 >= self.len() {
            return Err(resolution_error!(
                "call to {} is the last instruction, nothing follows the inlined region",
                callee.name()
            ));
        }
        let after_id = self.instructions()[call_index + 1].id();

        // Argument slots become locals, implicit this first
        let signature = callee
            .signature()
            .ok_or_else(|| resolution_error!("callee {} has no signature", callee.name()))?;
        let mut param_types: Vec<TypeSig> = Vec::with_capacity(signature.arg_slot_count());
        if signature.has_this {
            let declaring = callee
                .declaring_type()
                .ok_or_else(|| resolution_error!("callee {} has no declaring type", callee.name()))?;
            param_types.push(TypeSig::Class(TypeReference::to_def(&declaring)));
        }
        param_types.extend(signature.params.iter().cloned());

        let param_locals: Vec<LocalId> = param_types
            .into_iter()
            .map(|ty| self.add_local(Local::new(ty)))
            .collect();

        {
            let mut callee_body = callee.body_mut();
            let callee_body = callee_body
                .as_mut()
                .ok_or_else(|| resolution_error!("callee {} has no body", callee.name()))?;
            normalize::simplify_macros(callee_body)?;

            let mut local_map: HashMap<LocalId, LocalId> = HashMap::new();
            for local in &callee_body.locals {
                let clone = local.copy_with_fresh_id();
                local_map.insert(local.id(), clone.id());
                self.locals.push(clone);
            }

            // The call itself degrades to nop; references to it keep pointing at the
            // boundary of the inlined region
            let call = self.instruction_mut(call_site).expect("checked above");
            call.opcode = opcodes::NOP;
            call.operand = Operand::None;

            let mut instr_map: HashMap<InstrId, InstrId> = HashMap::new();
            let mut inlined: Vec<Instruction> = Vec::with_capacity(callee_body.len());
            for instruction in callee_body.instructions() {
                let new = match instruction.opcode {
                    opcodes::RET => Instruction::new(opcodes::BR, Operand::Target(after_id)),
                    opcodes::LDARG | opcodes::LDARGA => {
                        let slot = argument_slot(&instruction.operand, &param_locals)?;
                        let opcode = if instruction.opcode == opcodes::LDARG {
                            opcodes::LDLOC
                        } else {
                            opcodes::LDLOCA
                        };
                        Instruction::new(opcode, Operand::Local(slot))
                    }
                    opcodes::STARG => {
                        let slot = argument_slot(&instruction.operand, &param_locals)?;
                        Instruction::new(opcodes::STLOC, Operand::Local(slot))
                    }
                    _ => {
                        let mut copy = instruction.copy_with_fresh_id();
                        if let Operand::Local(local) = copy.operand {
                            let mapped = local_map.get(&local).copied().ok_or_else(|| {
                                resolution_error!("callee local operand not in local table")
                            })?;
                            copy.operand = Operand::Local(mapped);
                        }
                        copy
                    }
                };
                instr_map.insert(instruction.id(), new.id());
                inlined.push(new);
            }

            // Branch targets inside the inlined code move through the clone map
            for instruction in &mut inlined {
                match &mut instruction.operand {
                    Operand::Target(target) => {
                        if let Some(mapped) = instr_map.get(target) {
                            *target = *mapped;
                        }
                    }
                    Operand::Switch(targets) => {
                        for target in targets {
                            if let Some(mapped) = instr_map.get(target) {
                                *target = *mapped;
                            }
                        }
                    }
                    _ => {}
                }
            }

            // Store arguments into the parameter locals, last argument first
            let insert_at = call_index + 1;
            let mut prefix: Vec<Instruction> = Vec::with_capacity(param_locals.len());
            for slot in param_locals.iter().rev() {
                prefix.push(Instruction::new(opcodes::STLOC, Operand::Local(*slot)));
            }
            self.instructions_mut()
                .splice(insert_at..insert_at, prefix.into_iter().chain(inlined));

            // Callee handlers nest after the handlers already protecting the call site
            let mut handler_insert = 0;
            for (position, handler) in self.exception_handlers.iter().enumerate() {
                let covers_call = handler
                    .try_start
                    .and_then(|start| self.index_of(start))
                    .is_some_and(|start_index| start_index < call_index);
                if covers_call {
                    handler_insert = position + 1;
                }
            }

            for handler in &callee_body.exception_handlers {
                let map_boundary = |boundary: Option<InstrId>| match boundary {
                    Some(id) => instr_map.get(&id).copied(),
                    // Open callee regions close at the first instruction after the
                    // inlined code
                    None => Some(after_id),
                };
                let mut copy = handler.clone();
                copy.try_start = handler.try_start.and_then(|id| instr_map.get(&id).copied());
                copy.try_end = map_boundary(handler.try_end);
                copy.handler_start = handler
                    .handler_start
                    .and_then(|id| instr_map.get(&id).copied());
                copy.handler_end = map_boundary(handler.handler_end);
                copy.filter_start = handler
                    .filter_start
                    .and_then(|id| instr_map.get(&id).copied());
                self.exception_handlers.insert(handler_insert, copy);
                handler_insert += 1;
            }
        }

        Ok(())
    }

    fn callee_of(&self, call_site: InstrId) -> Result<MethodDefRc> {
        let instruction = self.instruction(call_site).expect("checked by caller");
        if instruction.opcode != opcodes::CALL {
            return Err(resolution_error!(
                "merge_call expects a call instruction, found {}",
                instruction.opcode.mnemonic()
            ));
        }
        let Operand::Member(MemberReference::Def(weak)) = &instruction.operand else {
            return Err(resolution_error!(
                "call instruction has no method-definition operand"
            ));
        };
        match weak.upgrade() {
            Some(MemberDef::Method(method)) => Ok(method),
            Some(other) => Err(resolution_error!(
                "call operand {} is not a method",
                other.name()
            )),
            None => Err(crate::Error::DanglingReference),
        }
    }
}

fn argument_slot(operand: &Operand, param_locals: &[LocalId]) -> Result<LocalId> {
    let Operand::Argument(index) = operand else {
        return Err(resolution_error!("argument opcode without argument operand"));
    };
    param_locals
        .get(*index as usize)
        .copied()
        .ok_or_else(|| resolution_error!("argument index {index} out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::flags::{MethodAccessFlags, MethodModifiers};
    use crate::metadata::method::MethodDef;
    use crate::metadata::signatures::MethodSignature;
    use crate::metadata::types::TypeDef;

    fn static_callee() -> MethodDefRc {
        // static int Add(int a, int b) => a + b;
        let method = MethodDef::new(
            "Add",
            MethodAccessFlags::PUBLIC.bits() | MethodModifiers::STATIC.bits(),
            0,
        );
        method.set_signature(MethodSignature {
            has_this: false,
            return_type: TypeSig::I4,
            params: vec![TypeSig::I4, TypeSig::I4],
        });
        let ty = TypeDef::new("N", "Helpers", 0);
        ty.add_method(&method);

        let mut body = CilBody::new();
        body.push(Instruction::new(opcodes::LDARG_0, Operand::None));
        body.push(Instruction::new(opcodes::LDARG_1, Operand::None));
        body.push(Instruction::new(opcodes::ADD, Operand::None));
        body.push(Instruction::new(opcodes::RET, Operand::None));
        method.set_body(body);
        method
    }

    #[test]
    fn test_merge_call_inlines_static_callee() {
        let callee = static_callee();

        let mut body = CilBody::new();
        body.push(Instruction::new(opcodes::LDC_I4_1, Operand::None));
        body.push(Instruction::new(opcodes::LDC_I4_2, Operand::None));
        let call = body.push(Instruction::new(
            opcodes::CALL,
            Operand::Member(MemberReference::to_def(&MemberDef::Method(callee.clone()))),
        ));
        body.push(Instruction::new(opcodes::RET, Operand::None));

        body.merge_call(call).unwrap();

        // The call became nop, two parameter locals were added, the ret became a branch
        assert_eq!(body.instruction(call).unwrap().opcode, opcodes::NOP);
        assert_eq!(body.locals.len(), 2);
        let mnemonics: Vec<&str> = body
            .instructions()
            .iter()
            .map(|i| i.opcode.mnemonic())
            .collect();
        assert_eq!(
            mnemonics,
            vec![
                "ldc.i4.1", "ldc.i4.2", "nop", "stloc", "stloc", "ldloc", "ldloc", "add", "br",
                "ret"
            ]
        );

        // The branch replacing ret targets the instruction after the call site
        let last_ret_id = body.instructions().last().unwrap().id();
        let br = &body.instructions()[8];
        assert!(matches!(br.operand, Operand::Target(t) if t == last_ret_id));
    }

    #[test]
    fn test_merge_call_rejects_non_call() {
        let mut body = CilBody::new();
        let nop = body.push(Instruction::new(opcodes::NOP, Operand::None));
        body.push(Instruction::new(opcodes::RET, Operand::None));
        assert!(body.merge_call(nop).is_err());
    }

    #[test]
    fn test_merge_call_rejects_trailing_call() {
        let callee = static_callee();
        let mut body = CilBody::new();
        let call = body.push(Instruction::new(
            opcodes::CALL,
            Operand::Member(MemberReference::to_def(&MemberDef::Method(callee))),
        ));
        assert!(body.merge_call(call).is_err());
    }
}
