//! # cilgraft Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the cilgraft library. Import this module to get quick access to the essential
//! types for building, transplanting and patching definition graphs.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilgraft operations
pub use crate::Error;

/// The result type used throughout cilgraft
pub use crate::Result;

// ================================================================================================
// Definition Graph
// ================================================================================================

/// Modules and foreign assembly references
pub use crate::metadata::module::{AssemblyRef, AssemblyRefRc, Module, ModuleRc};

/// Metadata token type for stable per-module identities
pub use crate::metadata::token::Token;

/// The five definition kinds
pub use crate::metadata::{
    event::{EventDef, EventDefRc, EventDefRef},
    field::{FieldDef, FieldDefRc, FieldDefRef},
    method::{MethodDef, MethodDefRc, MethodDefRef, ParamDef},
    property::{PropertyDef, PropertyDefRc, PropertyDefRef},
    types::{ExternalTypeRef, GenericParam, TypeDef, TypeDefRc, TypeDefRef, TypeReference},
};

/// Kind-erased member handles and custom attributes
pub use crate::metadata::member::{
    CustomAttribute, CustomAttributeArg, CustomAttributeNamedArg, CustomAttributeValue,
    MemberDef, MemberKey, MemberKind, MemberRef, MemberReference,
};

/// Signature shapes
pub use crate::metadata::signatures::{
    ExternalMember, ExternalSignature, FieldSignature, MethodSignature, PropertySignature, TypeSig,
};

/// Attribute flag groups
pub use crate::metadata::flags::{
    EventFlags, FieldAccessFlags, FieldModifiers, MethodAccessFlags, MethodImplFlags,
    MethodModifiers, MethodVtableFlags, PropertyFlags, TypeModifiers, TypeVisibility,
};

// ================================================================================================
// Instruction Level
// ================================================================================================

/// Bodies, instructions and the auxiliary regions anchored to them
pub use crate::assembly::{
    CilBody, ExceptionHandler, FlowType, HandlerKind, Immediate, InstrId, Instruction, Local,
    LocalId, LocalScope, OpCode, Operand, OperandKind, SequencePoint, StackBehavior,
};

/// Opcode constants and descriptor lookups
pub use crate::assembly::opcodes;

/// Normalization entry points
pub use crate::assembly::normalize;

// ================================================================================================
// Transplant Engine
// ================================================================================================

/// Injection entry points and session state
pub use crate::inject::{inject_method, inject_type, InjectContext, InjectResult};

/// Inject behavior policies
pub use crate::inject::behavior::{self, CompositeBehavior, InjectBehavior, ReferenceRewriter};
