//! Body normalization: shorthand expansion and evaluation-stack validation.
//!
//! Normalization rewrites a body so that every instruction uses its canonical long-form
//! opcode (`br.s` becomes `br`, `ldloc.2` becomes `ldloc` with an explicit local operand,
//! `ldc.i4.m1` becomes `ldc.i4 -1`) and then recomputes the body's maximum evaluation
//! stack depth. Removing the encoding-dependent special cases up front is what keeps the
//! body transplanter a plain structural copy. A body whose stack behavior cannot be
//! analyzed is reported as a validation error instead of being passed on silently.

use std::collections::HashMap;

use crate::{
    assembly::{
        body::CilBody,
        instruction::{FlowType, Immediate, InstrId, LocalId, Operand},
        opcodes::{self, OpCode},
    },
    metadata::{member::MemberReference, signatures::ExternalSignature},
    Result,
};

/// Expand every shorthand and macro opcode to its canonical long form, in place.
///
/// # Errors
///
/// Returns a validation error when a local-slot macro (`ldloc.2`, …) names a slot the
/// body does not declare.
pub fn simplify_macros(body: &mut CilBody) -> Result<()> {
    let local_ids: Vec<LocalId> = body.locals.iter().map(super::body::Local::id).collect();

    let local_at = |index: usize| -> Result<LocalId> {
        local_ids.get(index).copied().ok_or_else(|| {
            validation_error!("macro opcode references local slot {index}, body declares {}", local_ids.len())
        })
    };

    for instruction in body.instructions_mut() {
        let (opcode, operand) = match instruction.opcode {
            opcodes::LDARG_0 => (opcodes::LDARG, Some(Operand::Argument(0))),
            opcodes::LDARG_1 => (opcodes::LDARG, Some(Operand::Argument(1))),
            opcodes::LDARG_2 => (opcodes::LDARG, Some(Operand::Argument(2))),
            opcodes::LDARG_3 => (opcodes::LDARG, Some(Operand::Argument(3))),
            opcodes::LDLOC_0 => (opcodes::LDLOC, Some(Operand::Local(local_at(0)?))),
            opcodes::LDLOC_1 => (opcodes::LDLOC, Some(Operand::Local(local_at(1)?))),
            opcodes::LDLOC_2 => (opcodes::LDLOC, Some(Operand::Local(local_at(2)?))),
            opcodes::LDLOC_3 => (opcodes::LDLOC, Some(Operand::Local(local_at(3)?))),
            opcodes::STLOC_0 => (opcodes::STLOC, Some(Operand::Local(local_at(0)?))),
            opcodes::STLOC_1 => (opcodes::STLOC, Some(Operand::Local(local_at(1)?))),
            opcodes::STLOC_2 => (opcodes::STLOC, Some(Operand::Local(local_at(2)?))),
            opcodes::STLOC_3 => (opcodes::STLOC, Some(Operand::Local(local_at(3)?))),
            opcodes::LDC_I4_M1 => (opcodes::LDC_I4, Some(Operand::Immediate(Immediate::Int32(-1)))),
            opcodes::LDC_I4_0 => (opcodes::LDC_I4, Some(Operand::Immediate(Immediate::Int32(0)))),
            opcodes::LDC_I4_1 => (opcodes::LDC_I4, Some(Operand::Immediate(Immediate::Int32(1)))),
            opcodes::LDC_I4_2 => (opcodes::LDC_I4, Some(Operand::Immediate(Immediate::Int32(2)))),
            opcodes::LDC_I4_3 => (opcodes::LDC_I4, Some(Operand::Immediate(Immediate::Int32(3)))),
            opcodes::LDC_I4_4 => (opcodes::LDC_I4, Some(Operand::Immediate(Immediate::Int32(4)))),
            opcodes::LDC_I4_5 => (opcodes::LDC_I4, Some(Operand::Immediate(Immediate::Int32(5)))),
            opcodes::LDC_I4_6 => (opcodes::LDC_I4, Some(Operand::Immediate(Immediate::Int32(6)))),
            opcodes::LDC_I4_7 => (opcodes::LDC_I4, Some(Operand::Immediate(Immediate::Int32(7)))),
            opcodes::LDC_I4_8 => (opcodes::LDC_I4, Some(Operand::Immediate(Immediate::Int32(8)))),
            opcodes::LDC_I4_S => {
                let value = match instruction.operand {
                    Operand::Immediate(imm) => imm.as_i64().unwrap_or(0),
                    _ => 0,
                };
                #[allow(clippy::cast_possible_truncation)]
                let value = value as i32;
                (
                    opcodes::LDC_I4,
                    Some(Operand::Immediate(Immediate::Int32(value))),
                )
            }
            opcodes::LDARG_S => (opcodes::LDARG, None),
            opcodes::LDARGA_S => (opcodes::LDARGA, None),
            opcodes::STARG_S => (opcodes::STARG, None),
            opcodes::LDLOC_S => (opcodes::LDLOC, None),
            opcodes::LDLOCA_S => (opcodes::LDLOCA, None),
            opcodes::STLOC_S => (opcodes::STLOC, None),
            opcodes::BR_S => (opcodes::BR, None),
            opcodes::BRFALSE_S => (opcodes::BRFALSE, None),
            opcodes::BRTRUE_S => (opcodes::BRTRUE, None),
            opcodes::BEQ_S => (opcodes::BEQ, None),
            opcodes::BGE_S => (opcodes::BGE, None),
            opcodes::BGT_S => (opcodes::BGT, None),
            opcodes::BLE_S => (opcodes::BLE, None),
            opcodes::BLT_S => (opcodes::BLT, None),
            opcodes::BNE_UN_S => (opcodes::BNE_UN, None),
            opcodes::BGE_UN_S => (opcodes::BGE_UN, None),
            opcodes::BGT_UN_S => (opcodes::BGT_UN, None),
            opcodes::BLE_UN_S => (opcodes::BLE_UN, None),
            opcodes::BLT_UN_S => (opcodes::BLT_UN, None),
            opcodes::LEAVE_S => (opcodes::LEAVE, None),
            _ => continue,
        };

        instruction.opcode = opcode;
        if let Some(operand) = operand {
            instruction.operand = operand;
        }
    }

    Ok(())
}

/// Pops and pushes of one instruction, resolving signature-dependent effects.
fn stack_effect(opcode: OpCode, operand: &Operand) -> Result<(u16, u16)> {
    match opcode {
        opcodes::CALL | opcodes::CALLVIRT => {
            let Operand::Member(member) = operand else {
                return Err(validation_error!(
                    "{} carries a non-member operand",
                    opcode.mnemonic()
                ));
            };
            let (args, pushes) = call_site_effect(member)?;
            Ok((args, pushes))
        }
        opcodes::NEWOBJ => {
            let Operand::Member(member) = operand else {
                return Err(validation_error!("newobj carries a non-member operand"));
            };
            let (args, _) = call_site_effect(member)?;
            // The constructor's implicit this is produced, not consumed
            Ok((args.saturating_sub(1), 1))
        }
        opcodes::CALLI => Err(validation_error!(
            "calli stack behavior cannot be derived from the operand"
        )),
        _ => {
            let behavior = opcode.stack_behavior().ok_or_else(|| {
                validation_error!("{} has no fixed stack behavior", opcode.mnemonic())
            })?;
            Ok((u16::from(behavior.pops), u16::from(behavior.pushes)))
        }
    }
}

/// Argument-slot and return-value effect of calling `member`.
fn call_site_effect(member: &MemberReference) -> Result<(u16, u16)> {
    let (slots, pushes_return) = match member {
        MemberReference::Def(weak) => {
            let def = weak
                .upgrade()
                .ok_or(crate::Error::DanglingReference)?;
            let method = def
                .as_method()
                .ok_or_else(|| validation_error!("call target {} is not a method", def.name()))?
                .clone();
            let signature = method.signature().ok_or_else(|| {
                validation_error!("call target {} has no signature", method.name())
            })?;
            (signature.arg_slot_count(), signature.pushes_return())
        }
        MemberReference::External(external) => match &external.signature {
            ExternalSignature::Method(signature) => {
                (signature.arg_slot_count(), signature.pushes_return())
            }
            ExternalSignature::Field(_) => {
                return Err(validation_error!(
                    "call target {} is a field reference",
                    external.name
                ))
            }
        },
    };
    #[allow(clippy::cast_possible_truncation)]
    let slots = slots as u16;
    Ok((slots, u16::from(pushes_return)))
}

/// Compute the maximum evaluation-stack depth of a body.
///
/// Walks the control flow graph from the method entry and every handler entry, tracking
/// the stack depth along each path.
///
/// # Errors
///
/// Returns a validation error when the stack underflows, two paths join with different
/// depths, `ret` is reached with more than one value on the stack, or a call site's
/// signature is unavailable.
pub fn compute_max_stack(body: &CilBody) -> Result<u16> {
    if body.is_empty() {
        return Ok(0);
    }

    let index_of: HashMap<InstrId, usize> = body
        .instructions()
        .iter()
        .enumerate()
        .map(|(index, instruction)| (instruction.id(), index))
        .collect();
    let resolve = |id: InstrId| -> Result<usize> {
        index_of
            .get(&id)
            .copied()
            .ok_or_else(|| validation_error!("branch target {id} not present in body"))
    };

    let mut depths: Vec<Option<u16>> = vec![None; body.len()];
    let mut worklist: Vec<(usize, u16)> = Vec::new();
    let mut max_depth: u16 = 0;

    let schedule =
        |index: usize, depth: u16, depths: &mut Vec<Option<u16>>, worklist: &mut Vec<(usize, u16)>| -> Result<()> {
            match depths[index] {
                Some(existing) if existing != depth => Err(validation_error!(
                    "stack depth mismatch at instruction index {index}: {existing} vs {depth}"
                )),
                Some(_) => Ok(()),
                None => {
                    depths[index] = Some(depth);
                    worklist.push((index, depth));
                    Ok(())
                }
            }
        };

    schedule(0, 0, &mut depths, &mut worklist)?;
    for handler in &body.exception_handlers {
        if let Some(try_start) = handler.try_start {
            schedule(resolve(try_start)?, 0, &mut depths, &mut worklist)?;
        }
        if let Some(filter_start) = handler.filter_start {
            schedule(resolve(filter_start)?, 1, &mut depths, &mut worklist)?;
        }
        if let Some(handler_start) = handler.handler_start {
            let entry_depth = if handler
                .kind
                .intersects(super::exceptions::HandlerKind::FINALLY | super::exceptions::HandlerKind::FAULT)
            {
                0
            } else {
                1
            };
            schedule(resolve(handler_start)?, entry_depth, &mut depths, &mut worklist)?;
        }
    }

    while let Some((index, depth)) = worklist.pop() {
        let instruction = &body.instructions()[index];
        max_depth = max_depth.max(depth);

        if instruction.opcode == opcodes::RET {
            if depth > 1 {
                return Err(validation_error!(
                    "ret reached with {depth} values on the stack"
                ));
            }
            continue;
        }

        let (pops, pushes) = stack_effect(instruction.opcode, &instruction.operand)?;
        let after = depth
            .checked_sub(pops)
            .ok_or_else(|| {
                validation_error!(
                    "stack underflow at {} (depth {depth}, pops {pops})",
                    instruction.opcode.mnemonic()
                )
            })?
            + pushes;
        max_depth = max_depth.max(after);

        match instruction.flow_type() {
            FlowType::Sequential | FlowType::Call => {
                if index + 1 < body.len() {
                    schedule(index + 1, after, &mut depths, &mut worklist)?;
                }
            }
            FlowType::ConditionalBranch => {
                for target in instruction.targets() {
                    schedule(resolve(target)?, after, &mut depths, &mut worklist)?;
                }
                if index + 1 < body.len() {
                    schedule(index + 1, after, &mut depths, &mut worklist)?;
                }
            }
            FlowType::UnconditionalBranch => {
                for target in instruction.targets() {
                    schedule(resolve(target)?, after, &mut depths, &mut worklist)?;
                }
            }
            FlowType::Switch => {
                for target in instruction.targets() {
                    schedule(resolve(target)?, after, &mut depths, &mut worklist)?;
                }
                if index + 1 < body.len() {
                    schedule(index + 1, after, &mut depths, &mut worklist)?;
                }
            }
            // Leaving a protected region empties the evaluation stack
            FlowType::Leave => {
                for target in instruction.targets() {
                    schedule(resolve(target)?, 0, &mut depths, &mut worklist)?;
                }
            }
            FlowType::Return | FlowType::Throw | FlowType::EndFinally => {}
        }
    }

    Ok(max_depth)
}

/// Normalize a body: expand shorthand opcodes, then recompute and store `max_stack`.
///
/// # Errors
///
/// Propagates the validation errors of [`simplify_macros`] and [`compute_max_stack`].
pub fn normalize(body: &mut CilBody) -> Result<()> {
    simplify_macros(body)?;
    body.max_stack = compute_max_stack(body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{body::Local, instruction::Instruction, opcodes};
    use crate::metadata::signatures::TypeSig;

    #[test]
    fn test_simplify_macros_expands_shorthand() {
        let mut body = CilBody::new();
        let slot = body.add_local(Local::new(TypeSig::I4));
        body.push(Instruction::new(opcodes::LDC_I4_3, Operand::None));
        body.push(Instruction::new(opcodes::STLOC_0, Operand::None));
        body.push(Instruction::new(opcodes::LDLOC_0, Operand::None));
        body.push(Instruction::new(
            opcodes::LDC_I4_S,
            Operand::Immediate(Immediate::Int8(-5)),
        ));
        body.push(Instruction::new(opcodes::RET, Operand::None));

        simplify_macros(&mut body).unwrap();

        let instructions = body.instructions();
        assert_eq!(instructions[0].opcode, opcodes::LDC_I4);
        assert!(matches!(
            instructions[0].operand,
            Operand::Immediate(Immediate::Int32(3))
        ));
        assert_eq!(instructions[1].opcode, opcodes::STLOC);
        assert!(matches!(instructions[1].operand, Operand::Local(id) if id == slot));
        assert_eq!(instructions[2].opcode, opcodes::LDLOC);
        assert!(matches!(
            instructions[3].operand,
            Operand::Immediate(Immediate::Int32(-5))
        ));
    }

    #[test]
    fn test_simplify_macros_expands_short_branches() {
        let mut body = CilBody::new();
        let ret = Instruction::new(opcodes::RET, Operand::None);
        let ret_id = ret.id();
        body.push(Instruction::new(opcodes::BR_S, Operand::Target(ret_id)));
        body.push(ret);

        simplify_macros(&mut body).unwrap();

        let first = &body.instructions()[0];
        assert_eq!(first.opcode, opcodes::BR);
        assert!(matches!(first.operand, Operand::Target(t) if t == ret_id));
    }

    #[test]
    fn test_simplify_macros_rejects_missing_local() {
        let mut body = CilBody::new();
        body.push(Instruction::new(opcodes::LDLOC_2, Operand::None));
        body.push(Instruction::new(opcodes::RET, Operand::None));
        assert!(simplify_macros(&mut body).is_err());
    }

    #[test]
    fn test_max_stack_linear() {
        let mut body = CilBody::new();
        body.push(Instruction::new(
            opcodes::LDC_I4,
            Operand::Immediate(Immediate::Int32(1)),
        ));
        body.push(Instruction::new(
            opcodes::LDC_I4,
            Operand::Immediate(Immediate::Int32(2)),
        ));
        body.push(Instruction::new(opcodes::ADD, Operand::None));
        body.push(Instruction::new(opcodes::RET, Operand::None));

        assert_eq!(compute_max_stack(&body).unwrap(), 2);
    }

    #[test]
    fn test_max_stack_through_branch_join() {
        // Both paths reach ret with one value: the join is consistent
        let mut body = CilBody::new();
        let load_else = Instruction::new(
            opcodes::LDC_I4,
            Operand::Immediate(Immediate::Int32(2)),
        );
        let load_else_id = load_else.id();
        let ret = Instruction::new(opcodes::RET, Operand::None);
        let ret_id = ret.id();

        body.push(Instruction::new(
            opcodes::LDC_I4,
            Operand::Immediate(Immediate::Int32(0)),
        ));
        body.push(Instruction::new(opcodes::BRTRUE, Operand::Target(load_else_id)));
        body.push(Instruction::new(
            opcodes::LDC_I4,
            Operand::Immediate(Immediate::Int32(1)),
        ));
        body.push(Instruction::new(opcodes::BR, Operand::Target(ret_id)));
        body.push(load_else);
        body.push(ret);

        assert_eq!(compute_max_stack(&body).unwrap(), 1);
    }

    #[test]
    fn test_max_stack_underflow_is_validation_error() {
        let mut body = CilBody::new();
        body.push(Instruction::new(opcodes::ADD, Operand::None));
        body.push(Instruction::new(opcodes::RET, Operand::None));

        let err = compute_max_stack(&body).unwrap_err();
        assert!(matches!(err, crate::Error::Validation { .. }));
    }

    #[test]
    fn test_max_stack_join_mismatch_is_validation_error() {
        // One path leaves a value, the other does not
        let mut body = CilBody::new();
        let extra = Instruction::new(
            opcodes::LDC_I4,
            Operand::Immediate(Immediate::Int32(7)),
        );
        let join = Instruction::new(opcodes::NOP, Operand::None);
        let join_id = join.id();

        body.push(Instruction::new(
            opcodes::LDC_I4,
            Operand::Immediate(Immediate::Int32(0)),
        ));
        body.push(Instruction::new(opcodes::BRTRUE, Operand::Target(join_id)));
        body.push(extra);
        body.push(join);
        body.push(Instruction::new(opcodes::POP, Operand::None));
        body.push(Instruction::new(opcodes::RET, Operand::None));

        assert!(compute_max_stack(&body).is_err());
    }

    #[test]
    fn test_handler_entry_depths() {
        use crate::assembly::exceptions::ExceptionHandler;

        // try { nop } catch { pop }: the catch entry starts with the exception object
        let mut body = CilBody::new();
        let try_start = body.push(Instruction::new(opcodes::NOP, Operand::None));
        let leave_target = Instruction::new(opcodes::RET, Operand::None);
        let leave_target_id = leave_target.id();
        body.push(Instruction::new(
            opcodes::LEAVE,
            Operand::Target(leave_target_id),
        ));
        let handler_start = body.push(Instruction::new(opcodes::POP, Operand::None));
        body.push(Instruction::new(
            opcodes::LEAVE,
            Operand::Target(leave_target_id),
        ));
        body.push(leave_target);

        body.exception_handlers.push(ExceptionHandler::catch(
            None,
            try_start,
            Some(handler_start),
            handler_start,
            Some(leave_target_id),
        ));

        assert_eq!(compute_max_stack(&body).unwrap(), 1);
    }

    #[test]
    fn test_normalize_updates_max_stack() {
        let mut body = CilBody::new();
        body.max_stack = 0;
        body.push(Instruction::new(opcodes::LDC_I4_1, Operand::None));
        body.push(Instruction::new(opcodes::LDC_I4_2, Operand::None));
        body.push(Instruction::new(opcodes::ADD, Operand::None));
        body.push(Instruction::new(opcodes::RET, Operand::None));

        normalize(&mut body).unwrap();
        assert_eq!(body.max_stack, 2);
        assert_eq!(body.instructions()[0].opcode, opcodes::LDC_I4);
    }
}
