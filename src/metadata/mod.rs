//! The definition graph model: modules, definitions and the references between them.
//!
//! # Architecture
//!
//! Strong ownership flows strictly downwards: a [`module::Module`] owns its top-level
//! [`types::TypeDef`]s, a type owns its declared methods, fields, events, properties and
//! nested types. Every other edge (base types, interfaces, declaring types, accessor
//! wiring, instruction operands) is a weak reference (`XxxRef` wrapper around
//! [`std::sync::Weak`]), which is what lets recursive and mutually referential definition
//! graphs exist without leaking.
//!
//! Identity comes in two forms:
//! - [`token::Token`]: stable per-module row identity, issued when a definition is
//!   committed into a module
//! - [`member::MemberKey`]: allocation identity, used by the injection machinery to
//!   memoize "have I seen this definition" independent of names and tokens
//!
//! # Key Types
//!
//! - [`module::Module`] - the container, with token issuing and assembly-ref resolution
//! - [`types::TypeDef`] / [`method::MethodDef`] / [`field::FieldDef`] /
//!   [`event::EventDef`] / [`property::PropertyDef`] - the five definition kinds
//! - [`member::MemberDef`] / [`member::MemberRef`] - kind-erased strong/weak handles
//! - [`types::TypeReference`] / [`member::MemberReference`] - def-or-external positions,
//!   the unit the injection importer rewrites
//! - [`signatures::TypeSig`] and friends - signature shapes

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod event;
pub mod field;
pub mod flags;
pub mod member;
pub mod method;
pub mod module;
pub mod property;
pub mod signatures;
pub mod token;
pub mod types;

/// Read a lock, recovering the value if a previous holder panicked.
///
/// All mutation behind these locks is plain field assignment that cannot leave the value
/// in a torn state, so a poisoned lock still guards a valid value.
pub(crate) fn lock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Write counterpart of [`lock_read`].
pub(crate) fn lock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
