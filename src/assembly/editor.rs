//! In-place splice primitives for method bodies.
//!
//! These operations mutate an existing body while keeping every structural cross-reference
//! consistent: branch operands (including switch target lists), exception handler
//! boundaries, debug scope boundaries and sequence points. The invariant before and after
//! every single call: each handler and scope boundary refers to an instruction present in
//! the body, or is the end-of-body sentinel where a sentinel is valid (open handler/scope
//! ends).
//!
//! Misuse (operating on an empty body, or naming an instruction the body does not
//! contain) is a broken caller invariant and panics rather than returning an error.

use crate::assembly::{
    body::CilBody,
    instruction::{InstrId, Instruction, Operand},
};

impl CilBody {
    /// Splice `new_instructions` immediately before `anchor`, or append them at the end
    /// when `anchor` is `None` (the end-of-body sentinel).
    ///
    /// Every existing reference that pointed at the anchor (branch operands, handler and
    /// scope *start* boundaries) is redirected to the first inserted instruction, so
    /// control flow that used to land on the anchor now executes the inserted code first.
    /// References to the anchor as a region *end* are left untouched. Appending at the
    /// sentinel instead closes previously open (sentinel) handler and scope ends at the
    /// first appended instruction, keeping the appended tail outside those regions.
    ///
    /// # Panics
    ///
    /// Panics if the body has no instructions, or if `anchor` names an instruction that is
    /// not part of this body.
    pub fn insert_before(&mut self, anchor: Option<InstrId>, new_instructions: Vec<Instruction>) {
        assert!(!self.is_empty(), "insert_before on a body with no instructions");

        if new_instructions.is_empty() {
            return;
        }

        let index = match anchor {
            Some(id) => self
                .index_of(id)
                .unwrap_or_else(|| panic!("anchor instruction {id} not present in body")),
            None => self.len(),
        };

        self.instructions_mut()
            .splice(index..index, new_instructions);
        let first_inserted = self.instructions()[index].id();

        match anchor {
            Some(anchor) => {
                self.update_branch_operands(anchor, first_inserted);
                self.fix_region_starts(anchor, first_inserted);
            }
            None => {
                self.fix_region_ends(None, Some(first_inserted));
            }
        }
    }

    /// Delete one instruction, redirecting every reference to it.
    ///
    /// Branch operands and region/scope *start* boundaries move to the following
    /// instruction, or to the preceding one when the removed instruction was last. *End*
    /// boundaries redirect the same way, except that removing the last instruction turns
    /// them into the end-of-body sentinel. A sequence point on the removed instruction is
    /// transferred to its redirect target when that target carries none, so line-mapping
    /// information survives the removal.
    ///
    /// # Panics
    ///
    /// Panics if the body has no instructions, or if `instruction` is not part of this
    /// body.
    pub fn remove(&mut self, instruction: InstrId) {
        assert!(!self.is_empty(), "remove on a body with no instructions");

        let index = self
            .index_of(instruction)
            .unwrap_or_else(|| panic!("instruction {instruction} not present in body"));
        let last_index = self.len() - 1;

        let forward = (index < last_index).then(|| self.instructions()[index + 1].id());
        let backward = (index > 0).then(|| self.instructions()[index - 1].id());

        if let Some(target) = forward.or(backward) {
            self.update_branch_operands(instruction, target);
            self.fix_region_starts(instruction, target);
        }
        self.fix_region_ends(Some(instruction), forward);

        let sequence_point = self.instructions()[index].sequence_point.clone();
        if let Some(sequence_point) = sequence_point {
            if let Some(receiver) = forward.or(backward) {
                let receiver = self
                    .instruction_mut(receiver)
                    .expect("redirect target is in the body");
                if receiver.sequence_point.is_none() {
                    receiver.sequence_point = Some(sequence_point);
                }
            }
        }

        self.instructions_mut().remove(index);
    }

    /// Redirect every reference to `old` (branch operands, handler try/handler/filter
    /// starts and ends, scope starts and ends) to `new`, transferring `old`'s sequence
    /// point when `new` carries none. Both instructions stay in the body.
    ///
    /// # Panics
    ///
    /// Panics if the body has no instructions, or if either instruction is not part of
    /// this body.
    pub fn replace_reference(&mut self, old: InstrId, new: InstrId) {
        assert!(
            !self.is_empty(),
            "replace_reference on a body with no instructions"
        );
        assert!(
            self.contains(old),
            "replaced instruction {old} not present in body"
        );
        assert!(
            self.contains(new),
            "replacement instruction {new} not present in body"
        );

        self.update_branch_operands(old, new);
        self.fix_region_starts(old, new);
        self.fix_region_ends(Some(old), Some(new));

        let sequence_point = self
            .instruction(old)
            .and_then(|i| i.sequence_point.clone());
        if let Some(sequence_point) = sequence_point {
            let new = self.instruction_mut(new).expect("checked above");
            if new.sequence_point.is_none() {
                new.sequence_point = Some(sequence_point);
            }
        }
    }

    fn update_branch_operands(&mut self, old: InstrId, new: InstrId) {
        for instruction in self.instructions_mut() {
            match &mut instruction.operand {
                Operand::Target(target) => {
                    if *target == old {
                        *target = new;
                    }
                }
                Operand::Switch(targets) => {
                    for target in targets {
                        if *target == old {
                            *target = new;
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn fix_region_starts(&mut self, old: InstrId, new: InstrId) {
        for handler in &mut self.exception_handlers {
            if handler.try_start == Some(old) {
                handler.try_start = Some(new);
            }
            if handler.handler_start == Some(old) {
                handler.handler_start = Some(new);
            }
            if handler.filter_start == Some(old) {
                handler.filter_start = Some(new);
            }
        }

        self.for_each_scope_mut(&mut |scope| {
            if scope.start == Some(old) {
                scope.start = Some(new);
            }
        });
    }

    fn fix_region_ends(&mut self, old: Option<InstrId>, new: Option<InstrId>) {
        for handler in &mut self.exception_handlers {
            match old {
                None => {
                    if handler.try_end.is_none() {
                        handler.try_end = new;
                    }
                    if handler.handler_end.is_none() && handler.handler_start.is_some() {
                        handler.handler_end = new;
                    }
                }
                Some(_) => {
                    if handler.try_end == old {
                        handler.try_end = new;
                    }
                    if handler.handler_end == old {
                        handler.handler_end = new;
                    }
                }
            }
        }

        self.for_each_scope_mut(&mut |scope| {
            if scope.end == old {
                scope.end = new;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{
        exceptions::ExceptionHandler,
        instruction::{Operand, SequencePoint},
        opcodes,
        scope::LocalScope,
    };

    fn sequence_point(line: u32) -> SequencePoint {
        SequencePoint {
            document: "Program.cs".to_string(),
            start_line: line,
            start_column: 1,
            end_line: line,
            end_column: 10,
        }
    }

    fn three_instruction_body() -> (CilBody, InstrId, InstrId, InstrId) {
        let mut body = CilBody::new();
        let i0 = body.push(Instruction::new(opcodes::NOP, Operand::None));
        let i1 = body.push(Instruction::new(opcodes::NOP, Operand::None));
        let i2 = body.push(Instruction::new(opcodes::RET, Operand::None));
        (body, i0, i1, i2)
    }

    #[test]
    fn test_insert_before_redirects_branches_and_starts() {
        let (mut body, i0, i1, _i2) = three_instruction_body();
        body.instruction_mut(i0).unwrap().operand = Operand::Target(i1);
        body.exception_handlers
            .push(ExceptionHandler::finally(i1, None, i1, None));

        let inserted = Instruction::new(opcodes::NOP, Operand::None);
        let inserted_id = inserted.id();
        body.insert_before(Some(i1), vec![inserted]);

        assert_eq!(body.len(), 4);
        assert_eq!(body.index_of(inserted_id), Some(1));
        // Branch that pointed at the anchor lands on the inserted code
        match body.instruction(i0).unwrap().operand {
            Operand::Target(t) => assert_eq!(t, inserted_id),
            _ => panic!("expected a branch operand"),
        }
        // Region starts follow, ends stay open
        let handler = &body.exception_handlers[0];
        assert_eq!(handler.try_start, Some(inserted_id));
        assert_eq!(handler.handler_start, Some(inserted_id));
        assert!(handler.try_end.is_none());
    }

    #[test]
    fn test_insert_at_end_closes_open_ends() {
        let (mut body, i0, i1, _i2) = three_instruction_body();
        body.exception_handlers
            .push(ExceptionHandler::finally(i0, None, i1, None));
        body.scope = Some(LocalScope::new(Some(i0), None));

        let tail = Instruction::new(opcodes::RET, Operand::None);
        let tail_id = tail.id();
        body.insert_before(None, vec![tail]);

        assert_eq!(body.index_of(tail_id), Some(3));
        let handler = &body.exception_handlers[0];
        // The appended tail stays outside previously open regions
        assert_eq!(handler.try_end, Some(tail_id));
        assert_eq!(handler.handler_end, Some(tail_id));
        assert_eq!(body.scope.as_ref().unwrap().end, Some(tail_id));
    }

    #[test]
    fn test_insert_before_leaves_matching_ends_alone() {
        let (mut body, i0, i1, i2) = three_instruction_body();
        body.exception_handlers
            .push(ExceptionHandler::finally(i0, Some(i1), i1, Some(i2)));

        let inserted = Instruction::new(opcodes::NOP, Operand::None);
        body.insert_before(Some(i1), vec![inserted]);

        let handler = &body.exception_handlers[0];
        // An end boundary denotes "up to and including"; inserting before a start must
        // not move it
        assert_eq!(handler.try_end, Some(i1));
    }

    #[test]
    fn test_remove_redirects_to_following() {
        let (mut body, i0, i1, i2) = three_instruction_body();
        body.exception_handlers
            .push(ExceptionHandler::finally(i0, Some(i0), i1, Some(i2)));
        body.instruction_mut(i2).unwrap().operand = Operand::Target(i0);

        body.remove(i0);

        assert_eq!(body.len(), 2);
        assert!(!body.contains(i0));
        let handler = &body.exception_handlers[0];
        assert_eq!(handler.try_start, Some(i1));
        assert_eq!(handler.try_end, Some(i1));
        match body.instruction(i2).unwrap().operand {
            Operand::Target(t) => assert_eq!(t, i1),
            _ => panic!("expected a branch operand"),
        }
    }

    #[test]
    fn test_remove_last_turns_ends_into_sentinel() {
        let (mut body, i0, i1, i2) = three_instruction_body();
        body.exception_handlers
            .push(ExceptionHandler::finally(i0, Some(i2), i1, Some(i2)));

        body.remove(i2);

        let handler = &body.exception_handlers[0];
        assert_eq!(handler.try_end, None);
        assert_eq!(handler.handler_end, None);
        // Starts redirect backward instead
        assert_eq!(handler.try_start, Some(i0));
        assert_eq!(handler.handler_start, Some(i1));
    }

    #[test]
    fn test_remove_transfers_sequence_point_forward() {
        let (mut body, i0, i1, _i2) = three_instruction_body();
        body.instruction_mut(i0).unwrap().sequence_point = Some(sequence_point(10));

        body.remove(i0);

        assert_eq!(
            body.instruction(i1)
                .unwrap()
                .sequence_point
                .as_ref()
                .unwrap()
                .start_line,
            10
        );
    }

    #[test]
    fn test_remove_keeps_existing_sequence_point() {
        let (mut body, i0, i1, _i2) = three_instruction_body();
        body.instruction_mut(i0).unwrap().sequence_point = Some(sequence_point(10));
        body.instruction_mut(i1).unwrap().sequence_point = Some(sequence_point(20));

        body.remove(i0);

        assert_eq!(
            body.instruction(i1)
                .unwrap()
                .sequence_point
                .as_ref()
                .unwrap()
                .start_line,
            20
        );
    }

    #[test]
    fn test_replace_reference_switch_lists_and_ends() {
        let (mut body, i0, i1, i2) = three_instruction_body();
        body.instruction_mut(i0).unwrap().operand = Operand::Switch(vec![i1, i2, i1]);
        body.exception_handlers
            .push(ExceptionHandler::finally(i0, Some(i1), i1, Some(i1)));
        body.scope = Some(LocalScope::new(Some(i1), Some(i1)));

        body.replace_reference(i1, i2);

        match &body.instruction(i0).unwrap().operand {
            Operand::Switch(targets) => assert_eq!(targets, &vec![i2, i2, i2]),
            _ => panic!("expected a switch operand"),
        }
        let handler = &body.exception_handlers[0];
        assert_eq!(handler.try_end, Some(i2));
        assert_eq!(handler.handler_start, Some(i2));
        assert_eq!(handler.handler_end, Some(i2));
        let scope = body.scope.as_ref().unwrap();
        assert_eq!(scope.start, Some(i2));
        assert_eq!(scope.end, Some(i2));
    }

    #[test]
    #[should_panic(expected = "not present in body")]
    fn test_remove_foreign_instruction_panics() {
        let (mut body, _i0, _i1, _i2) = three_instruction_body();
        let foreign = Instruction::new(opcodes::NOP, Operand::None);
        body.remove(foreign.id());
    }

    #[test]
    #[should_panic(expected = "no instructions")]
    fn test_insert_into_empty_body_panics() {
        let mut body = CilBody::new();
        body.insert_before(None, vec![Instruction::new(opcodes::RET, Operand::None)]);
    }
}
