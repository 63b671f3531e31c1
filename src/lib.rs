// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # cilgraft
//!
//! A framework for transplanting CIL definition graphs between .NET modules and patching
//! method bodies in place. `cilgraft` models modules, types, methods, fields, events and
//! properties as an editable object graph and provides two tightly coupled engines on top
//! of it:
//!
//! - **Graph transplantation** ([`inject`]) - copy a definition and its full transitive
//!   dependency closure from one module into another, memoized and cycle-safe, with
//!   pluggable rename/internalize/nest policies applied to every copied definition.
//! - **In-place body editing** ([`assembly`]) - splice instructions into and out of
//!   existing method bodies while keeping branch targets, exception handler regions,
//!   debug scopes and sequence points consistent.
//!
//! ## Quick Start
//!
//! Build a payload module, then graft a static helper into a target module:
//!
//! ```rust
//! use cilgraft::prelude::*;
//!
//! // A source module carrying one static helper method
//! let origin = Module::new("payload.dll");
//! let helpers = TypeDef::new("Payload", "Helpers", TypeVisibility::PUBLIC.bits());
//! origin.add_type(&helpers);
//! origin.issue_token(&MemberDef::Type(helpers.clone()));
//!
//! let answer = MethodDef::new(
//!     "Answer",
//!     MethodAccessFlags::PUBLIC.bits() | MethodModifiers::STATIC.bits(),
//!     0,
//! );
//! answer.set_signature(MethodSignature {
//!     has_this: false,
//!     return_type: TypeSig::I4,
//!     params: vec![],
//! });
//! helpers.add_method(&answer);
//!
//! let mut body = CilBody::new();
//! body.push(Instruction::new(
//!     opcodes::LDC_I4,
//!     Operand::Immediate(Immediate::Int32(42)),
//! ));
//! body.push(Instruction::new(opcodes::RET, Operand::None));
//! answer.set_body(body);
//!
//! // Transplant it; static methods land on the target's <Module> type
//! let target = Module::new("app.dll");
//! let mut ctx = InjectContext::new(origin.clone(), target.clone());
//! let result = inject_method(&answer, &target, &mut ctx, &behavior::rename())?;
//!
//! assert!(result.mapped.has_body());
//! assert_eq!(target.global_type().methods.count(), 1);
//! # Ok::<(), cilgraft::Error>(())
//! ```
//!
//! Patch an existing body in place:
//!
//! ```rust
//! use cilgraft::assembly::{CilBody, Instruction, Operand, opcodes};
//!
//! let mut body = CilBody::new();
//! let ret = body.push(Instruction::new(opcodes::RET, Operand::None));
//!
//! // Every reference that pointed at `ret` now reaches the new prologue first
//! body.insert_before(Some(ret), vec![Instruction::new(opcodes::NOP, Operand::None)]);
//! assert_eq!(body.len(), 2);
//! ```
//!
//! ## Architecture
//!
//! `cilgraft` is organized into three modules:
//!
//! - [`metadata`] - the definition graph: [`metadata::module::Module`] containers, the
//!   five definition kinds, kind-erased member handles, signatures and attribute flags
//! - [`assembly`] - the instruction level: opcodes, bodies, exception handler regions,
//!   debug scopes, the splice editor, normalization and call-site inlining
//! - [`inject`] - the transplant engine: injection contexts, the worklist copier, the
//!   body transplanter and composable inject behaviors
//!
//! The crate performs no I/O: reading and writing on-disk modules, locating definitions
//! by name, and compiling payload sources belong to the surrounding tooling.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use cilgraft::prelude::*;
///
/// let module = Module::new("app.dll");
/// assert_eq!(module.global_type().name(), "<Module>");
/// ```
pub mod prelude;

/// Instruction-level representation and in-place editing of method bodies.
pub mod assembly;

/// Graph transplantation across modules.
pub mod inject;

/// The definition graph model: modules, definitions, references, signatures and flags.
pub mod metadata;

pub use error::{Error, Result};
