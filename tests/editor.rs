//! Integration tests for the instruction sequence editor.
//!
//! Exercises the splice invariant: after any sequence of `insert_before` / `remove` /
//! `replace_reference` calls, every exception handler and debug scope boundary refers to
//! an instruction present in the body, or to the end-of-body sentinel exactly where a
//! sentinel is valid.

use cilgraft::prelude::*;

/// Assert the splice invariant over all handler and scope boundaries.
fn assert_boundaries_consistent(body: &CilBody) {
    for handler in &body.exception_handlers {
        for boundary in handler.boundaries() {
            assert!(
                body.contains(boundary),
                "handler boundary {boundary} points outside the body"
            );
        }
        // Starts are never the sentinel in a well-formed region
        assert!(handler.try_start.is_some());
        assert!(handler.handler_start.is_some());
    }
    if let Some(root) = &body.scope {
        root.for_each(&mut |scope| {
            if let Some(start) = scope.start {
                assert!(body.contains(start));
            }
            if let Some(end) = scope.end {
                assert!(body.contains(end));
            }
        });
    }
}

fn three_nops_and_ret() -> (CilBody, Vec<InstrId>) {
    let mut body = CilBody::new();
    let ids = vec![
        body.push(Instruction::new(opcodes::NOP, Operand::None)),
        body.push(Instruction::new(opcodes::NOP, Operand::None)),
        body.push(Instruction::new(opcodes::NOP, Operand::None)),
        body.push(Instruction::new(opcodes::RET, Operand::None)),
    ];
    (body, ids)
}

#[test]
fn removing_a_region_start_moves_it_to_the_next_instruction() {
    // A 3-instruction body [I0, I1, I2] with try_start = I0
    let mut body = CilBody::new();
    let i0 = body.push(Instruction::new(opcodes::NOP, Operand::None));
    let i1 = body.push(Instruction::new(opcodes::NOP, Operand::None));
    let i2 = body.push(Instruction::new(opcodes::RET, Operand::None));
    body.exception_handlers
        .push(ExceptionHandler::finally(i0, Some(i2), i1, None));

    body.remove(i0);

    assert_eq!(body.len(), 2);
    assert_eq!(body.index_of(i1), Some(0));
    assert_eq!(body.index_of(i2), Some(1));
    assert_eq!(body.exception_handlers[0].try_start, Some(i1));
    assert_boundaries_consistent(&body);
}

#[test]
fn replacing_redirects_branch_operands() {
    let mut body = CilBody::new();
    let i1 = {
        let instr = Instruction::new(opcodes::NOP, Operand::None);
        let id = instr.id();
        body.push(Instruction::new(opcodes::BR, Operand::Target(id)));
        body.push(instr);
        id
    };
    let inew = body.push(Instruction::new(opcodes::NOP, Operand::None));
    body.push(Instruction::new(opcodes::RET, Operand::None));

    body.replace_reference(i1, inew);

    match body.instructions()[0].operand {
        Operand::Target(target) => assert_eq!(target, inew),
        _ => panic!("expected a branch operand"),
    }
    assert_boundaries_consistent(&body);
}

#[test]
fn inserted_prologue_intercepts_control_flow() {
    let (mut body, ids) = three_nops_and_ret();
    let anchor = ids[2];
    // A back-edge onto the anchor
    body.push(Instruction::new(opcodes::BR, Operand::Target(anchor)));

    let probe = Instruction::new(opcodes::NOP, Operand::None);
    let probe_id = probe.id();
    body.insert_before(Some(anchor), vec![probe]);

    // The branch now reaches the probe first
    let branch = body
        .instructions()
        .iter()
        .find(|i| matches!(i.operand, Operand::Target(_)))
        .unwrap();
    match branch.operand {
        Operand::Target(target) => assert_eq!(target, probe_id),
        _ => unreachable!(),
    }
    assert_eq!(body.index_of(probe_id), Some(2));
}

#[test]
fn splice_invariant_survives_a_mixed_edit_sequence() {
    let (mut body, ids) = three_nops_and_ret();
    body.exception_handlers
        .push(ExceptionHandler::finally(ids[0], Some(ids[2]), ids[2], None));
    body.scope = Some({
        let mut root = LocalScope::new(Some(ids[0]), None);
        root.scopes.push(LocalScope::new(Some(ids[1]), Some(ids[2])));
        root
    });
    assert_boundaries_consistent(&body);

    // Insert before a region start
    let first = Instruction::new(opcodes::NOP, Operand::None);
    body.insert_before(Some(ids[0]), vec![first]);
    assert_boundaries_consistent(&body);

    // Append at the end sentinel, closing the open ends
    let tail = Instruction::new(opcodes::NOP, Operand::None);
    body.insert_before(None, vec![tail]);
    assert_boundaries_consistent(&body);

    // Remove interior and boundary instructions one by one
    body.remove(ids[1]);
    assert_boundaries_consistent(&body);
    body.remove(ids[2]);
    assert_boundaries_consistent(&body);
    body.remove(ids[0]);
    assert_boundaries_consistent(&body);

    // Replace a reference between the survivors
    let survivors: Vec<InstrId> = body.instructions().iter().map(|i| i.id()).collect();
    body.replace_reference(survivors[0], survivors[1]);
    assert_boundaries_consistent(&body);
}

#[test]
fn removing_the_tail_reopens_region_ends() {
    let (mut body, ids) = three_nops_and_ret();
    body.exception_handlers
        .push(ExceptionHandler::finally(ids[0], Some(ids[3]), ids[1], Some(ids[3])));

    body.remove(ids[3]);

    let handler = &body.exception_handlers[0];
    assert_eq!(handler.try_end, None);
    assert_eq!(handler.handler_end, None);
    assert_boundaries_consistent(&body);
}

#[test]
fn sequence_points_survive_removal_chains() {
    let mut body = CilBody::new();
    let marked = Instruction::with_sequence_point(
        opcodes::NOP,
        Operand::None,
        SequencePoint {
            document: "Program.cs".to_string(),
            start_line: 7,
            start_column: 5,
            end_line: 7,
            end_column: 20,
        },
    );
    let marked_id = body.push(marked);
    let plain = body.push(Instruction::new(opcodes::NOP, Operand::None));
    body.push(Instruction::new(opcodes::RET, Operand::None));

    body.remove(marked_id);

    let receiver = body.instruction(plain).unwrap();
    assert_eq!(
        receiver.sequence_point.as_ref().map(|s| s.start_line),
        Some(7)
    );
}

#[test]
fn merge_call_produces_a_consistent_body() -> Result<()> {
    let origin = Module::new("payload.dll");
    let helpers = TypeDef::new("Payload", "Helpers", TypeVisibility::PUBLIC.bits());
    origin.add_type(&helpers);
    origin.issue_token(&MemberDef::Type(helpers.clone()));

    // static int Twice(int x) => x + x;
    let twice = MethodDef::new(
        "Twice",
        MethodAccessFlags::PUBLIC.bits() | MethodModifiers::STATIC.bits(),
        0,
    );
    twice.set_signature(MethodSignature {
        has_this: false,
        return_type: TypeSig::I4,
        params: vec![TypeSig::I4],
    });
    let mut twice_body = CilBody::new();
    twice_body.push(Instruction::new(opcodes::LDARG_0, Operand::None));
    twice_body.push(Instruction::new(opcodes::LDARG_0, Operand::None));
    twice_body.push(Instruction::new(opcodes::ADD, Operand::None));
    twice_body.push(Instruction::new(opcodes::RET, Operand::None));
    twice.set_body(twice_body);
    helpers.add_method(&twice);

    // Caller: push 21, call Twice, return
    let mut body = CilBody::new();
    body.push(Instruction::new(
        opcodes::LDC_I4,
        Operand::Immediate(Immediate::Int32(21)),
    ));
    let call = body.push(Instruction::new(
        opcodes::CALL,
        Operand::Member(MemberReference::to_def(&MemberDef::Method(twice.clone()))),
    ));
    body.push(Instruction::new(opcodes::RET, Operand::None));

    body.merge_call(call)?;

    // One parameter local, the call degraded to nop, a branch replaced the callee ret
    assert_eq!(body.locals.len(), 1);
    assert_eq!(body.instruction(call).unwrap().opcode, opcodes::NOP);
    let mnemonics: Vec<&str> = body
        .instructions()
        .iter()
        .map(|i| i.opcode.mnemonic())
        .collect();
    assert_eq!(
        mnemonics,
        vec!["ldc.i4", "nop", "stloc", "ldloc", "ldloc", "add", "br", "ret"]
    );

    // The merged body still stack-checks
    assert_eq!(normalize::compute_max_stack(&body)?, 2);
    assert_boundaries_consistent(&body);
    Ok(())
}
