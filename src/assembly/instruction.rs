//! CIL instruction representation and operand types.
//!
//! Bodies in this crate are object graphs, not byte streams: a branch operand is a stable
//! instruction id, a member operand is a reference into the definition graph. Offsets,
//! encodings and operand widths never appear; the canonical/shorthand distinction survives
//! only as opcode identity until normalization erases it.
//!
//! # Key Components
//!
//! - [`Instruction`] - An opcode, an operand and an optional sequence point, under a stable id
//! - [`InstrId`] - Process-unique instruction identity, the unit branch operands point at
//! - [`Operand`] - Type-safe operand representation
//! - [`Immediate`] - Numeric literal operands
//! - [`FlowType`] - Control flow classification, driving branch-target bookkeeping
//! - [`StackBehavior`] - Fixed stack effects, where the opcode alone determines them

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{
    assembly::opcodes::OpCode,
    metadata::{member::MemberReference, types::TypeReference},
};

/// Stable identity of an instruction.
///
/// Ids are allocated from a process-wide counter and never reused, so a branch operand
/// keeps denoting "that instruction" across splices, transplants and body rewrites: the
/// arena-plus-index equivalent of reference identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrId(u32);

static NEXT_INSTR_ID: AtomicU32 = AtomicU32::new(1);

impl InstrId {
    pub(crate) fn next() -> Self {
        InstrId(NEXT_INSTR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable identity of a local variable slot, allocated like [`InstrId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(u32);

static NEXT_LOCAL_ID: AtomicU32 = AtomicU32::new(1);

impl LocalId {
    pub(crate) fn next() -> Self {
        LocalId(NEXT_LOCAL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

/// Represents a numeric literal embedded in an instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit immediate value
    Int8(i8),
    /// Signed 32-bit immediate value
    Int32(i32),
    /// Signed 64-bit immediate value
    Int64(i64),
    /// 32-bit floating point immediate value
    Float32(f32),
    /// 64-bit floating point immediate value
    Float64(f64),
}

impl Immediate {
    /// Widen to `i64`, if this is an integer immediate
    #[must_use]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Immediate::Int8(v) => Some(i64::from(v)),
            Immediate::Int32(v) => Some(i64::from(v)),
            Immediate::Int64(v) => Some(v),
            Immediate::Float32(_) | Immediate::Float64(_) => None,
        }
    }
}

/// The operand of an instruction.
///
/// Exactly one of these shapes is legal for any given opcode; see
/// [`OperandKind`](crate::assembly::opcodes::OperandKind) for the expectation the opcode
/// declares.
#[derive(Debug, Clone)]
pub enum Operand {
    /// No operand present
    None,
    /// Numeric literal
    Immediate(Immediate),
    /// String literal (`ldstr`)
    String(String),
    /// A type position (`castclass`, `box`, `newarr`, …)
    Type(TypeReference),
    /// A member position (`call`, `ldfld`, `newobj`, …)
    Member(MemberReference),
    /// A local variable slot
    Local(LocalId),
    /// A method argument, by index
    Argument(u16),
    /// Branch target
    Target(InstrId),
    /// Multi-way branch target list (`switch`)
    Switch(Vec<InstrId>),
}

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Normal execution continues to the next instruction
    Sequential,
    /// Conditional branch to another location
    ConditionalBranch,
    /// Always branches to another location
    UnconditionalBranch,
    /// Call to another method
    Call,
    /// Returns from the current method
    Return,
    /// Multi-way branch
    Switch,
    /// Exception throwing
    Throw,
    /// End of a finally or filter block
    EndFinally,
    /// Leave a protected region
    Leave,
}

/// Fixed stack effect of an opcode.
///
/// Only meaningful for opcodes whose effect does not depend on an operand signature;
/// calls, `newobj` and `ret` report their effect through the signature instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBehavior {
    /// Number of items popped from the stack
    pub pops: u8,
    /// Number of items pushed onto the stack
    pub pushes: u8,
    /// Net effect on stack depth (pushes - pops)
    pub net_effect: i8,
}

/// A debug sequence point mapping an instruction to a source location.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencePoint {
    /// Source document path
    pub document: String,
    /// First line of the statement
    pub start_line: u32,
    /// First column of the statement
    pub start_column: u16,
    /// Last line of the statement
    pub end_line: u32,
    /// Last column of the statement
    pub end_column: u16,
}

/// A single CIL instruction inside a [`CilBody`](crate::assembly::CilBody).
///
/// Instructions are created with [`Instruction::new`], which assigns a fresh [`InstrId`].
/// There is deliberately no `Clone`: duplicating an instruction with its id would plant two
/// instructions claiming the same identity in a body. Copies for transplanting or inlining
/// go through [`Instruction::copy_with_fresh_id`].
pub struct Instruction {
    id: InstrId,
    /// The opcode
    pub opcode: OpCode,
    /// The operand
    pub operand: Operand,
    /// Optional debug source mapping
    pub sequence_point: Option<SequencePoint>,
}

impl Instruction {
    /// Create a new instruction with a fresh id
    #[must_use]
    pub fn new(opcode: OpCode, operand: Operand) -> Self {
        Instruction {
            id: InstrId::next(),
            opcode,
            operand,
            sequence_point: None,
        }
    }

    /// Create a new instruction carrying a sequence point
    #[must_use]
    pub fn with_sequence_point(
        opcode: OpCode,
        operand: Operand,
        sequence_point: SequencePoint,
    ) -> Self {
        Instruction {
            id: InstrId::next(),
            opcode,
            operand,
            sequence_point: Some(sequence_point),
        }
    }

    /// The stable id of this instruction
    #[must_use]
    pub fn id(&self) -> InstrId {
        self.id
    }

    /// Duplicate opcode, operand and sequence point under a fresh id.
    ///
    /// Branch operands still point at the *source* body's instructions afterwards; the
    /// copier that called this is responsible for remapping them.
    #[must_use]
    pub fn copy_with_fresh_id(&self) -> Instruction {
        Instruction {
            id: InstrId::next(),
            opcode: self.opcode,
            operand: self.operand.clone(),
            sequence_point: self.sequence_point.clone(),
        }
    }

    /// How this instruction affects control flow
    #[must_use]
    pub fn flow_type(&self) -> FlowType {
        self.opcode.flow_type()
    }

    /// Check if this instruction is a branch instruction
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self.flow_type(),
            FlowType::ConditionalBranch | FlowType::UnconditionalBranch | FlowType::Switch
        )
    }

    /// Check if this instruction ends a basic block
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.flow_type(),
            FlowType::ConditionalBranch
                | FlowType::UnconditionalBranch
                | FlowType::Return
                | FlowType::Switch
                | FlowType::Throw
                | FlowType::Leave
        )
    }

    /// The branch targets of this instruction, in operand order
    #[must_use]
    pub fn targets(&self) -> Vec<InstrId> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::Switch(targets) => targets.clone(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {:<12}", self.id, self.opcode.mnemonic())?;

        match &self.operand {
            Operand::None => {}
            Operand::Immediate(imm) => write!(f, " {imm:?}")?,
            Operand::String(s) => write!(f, " {s:?}")?,
            Operand::Type(ty) => write!(
                f,
                " type:{}",
                ty.fullname().unwrap_or_else(|| "<dropped>".to_string())
            )?,
            Operand::Member(member) => match member.as_def() {
                Some(def) => write!(f, " member:{}", def.name())?,
                None => write!(f, " member:<external>")?,
            },
            Operand::Local(local) => write!(f, " local:{}", local.value())?,
            Operand::Argument(arg) => write!(f, " arg:{arg}")?,
            Operand::Target(target) => write!(f, " -> {target}")?,
            Operand::Switch(targets) => {
                write!(f, " switch[{}]:(", targets.len())?;
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{target}")?;
                }
                write!(f, ")")?;
            }
        }

        if self.flow_type() != FlowType::Sequential {
            write!(f, " | {:?}", self.flow_type())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::opcodes;

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = Instruction::new(opcodes::NOP, Operand::None);
        let b = Instruction::new(opcodes::NOP, Operand::None);
        assert_ne!(a.id(), b.id());

        let copy = a.copy_with_fresh_id();
        assert_ne!(copy.id(), a.id());
        assert_eq!(copy.opcode, a.opcode);
    }

    #[test]
    fn test_branch_classification() {
        let nop = Instruction::new(opcodes::NOP, Operand::None);
        assert!(!nop.is_branch());
        assert!(!nop.is_terminal());
        assert!(nop.targets().is_empty());

        let ret = Instruction::new(opcodes::RET, Operand::None);
        assert!(!ret.is_branch());
        assert!(ret.is_terminal());

        let target = InstrId::next();
        let br = Instruction::new(opcodes::BR, Operand::Target(target));
        assert!(br.is_branch());
        assert!(br.is_terminal());
        assert_eq!(br.targets(), vec![target]);
    }

    #[test]
    fn test_switch_targets() {
        let t1 = InstrId::next();
        let t2 = InstrId::next();
        let switch = Instruction::new(opcodes::SWITCH, Operand::Switch(vec![t1, t2]));
        assert!(switch.is_branch());
        assert_eq!(switch.targets(), vec![t1, t2]);
    }

    #[test]
    fn test_immediate_as_i64() {
        assert_eq!(Immediate::Int8(-3).as_i64(), Some(-3));
        assert_eq!(Immediate::Int32(70000).as_i64(), Some(70000));
        assert_eq!(Immediate::Int64(i64::MIN).as_i64(), Some(i64::MIN));
        assert_eq!(Immediate::Float64(1.5).as_i64(), None);
    }

    #[test]
    fn test_debug_format() {
        let target = InstrId::next();
        let br = Instruction::new(opcodes::BR, Operand::Target(target));
        let formatted = format!("{br:?}");
        assert!(formatted.contains("br"));
        assert!(formatted.contains(&format!("{target}")));
        assert!(formatted.contains("UnconditionalBranch"));
    }
}
