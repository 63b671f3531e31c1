//! Instruction-level representation and in-place editing of method bodies.
//!
//! This module owns everything below the definition graph: opcodes, instructions, bodies,
//! exception handler regions, debug scopes, and the operations that mutate them while
//! preserving structural consistency.
//!
//! # Key Types
//! - [`CilBody`] - An editable method body (instructions, locals, handlers, scopes)
//! - [`Instruction`] / [`InstrId`] - Instructions under stable identities
//! - [`OpCode`] - Opcode values with decoding metadata
//! - [`ExceptionHandler`] / [`LocalScope`] - Regions anchored to instruction identities
//!
//! # Main Operations
//! - [`CilBody::insert_before`] / [`CilBody::remove`] / [`CilBody::replace_reference`] -
//!   reference-preserving splice primitives
//! - [`CilBody::merge_call`] - call-site inlining
//! - [`normalize::simplify_macros`] / [`normalize::compute_max_stack`] - canonicalization
//!   and stack validation
//!
//! # Example
//! ```rust
//! use cilgraft::assembly::{CilBody, Instruction, Operand, opcodes};
//!
//! let mut body = CilBody::new();
//! let ret = body.push(Instruction::new(opcodes::RET, Operand::None));
//! let nop = Instruction::new(opcodes::NOP, Operand::None);
//! body.insert_before(Some(ret), vec![nop]);
//! assert_eq!(body.len(), 2);
//! ```

mod body;
mod editor;
mod exceptions;
mod inline;
mod instruction;
pub mod normalize;
pub mod opcodes;
mod scope;

pub use body::{CilBody, Local};
pub use exceptions::{ExceptionHandler, HandlerKind};
pub use instruction::{
    FlowType, Immediate, InstrId, Instruction, LocalId, Operand, SequencePoint, StackBehavior,
};
pub use opcodes::{OpCode, OperandKind};
pub use scope::LocalScope;
