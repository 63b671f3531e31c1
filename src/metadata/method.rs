//! Method definitions.
//!
//! A [`MethodDef`] carries its attribute flags, signature, named parameters, generic
//! parameters and, when the method has an implementation, a [`CilBody`] behind a lock so
//! it can be edited in place. The body lock is the seam between the two halves of the
//! crate: the transplant engine replaces whole bodies, the sequence editor mutates one
//! under the write guard.

use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::{
    assembly::CilBody,
    metadata::{
        flags::{MethodAccessFlags, MethodModifiers, MethodVtableFlags},
        lock_read, lock_write,
        member::CustomAttribute,
        module::Module,
        signatures::MethodSignature,
        token::Token,
        types::{GenericParam, TypeDefRc, TypeDefRef},
    },
};

/// A reference counted [`MethodDef`]
pub type MethodDefRc = Arc<MethodDef>;

/// Named parameter record of a method.
///
/// Parameter *types* live in the method signature; these records add the surface-level
/// name, position and flags.
#[derive(Debug, Clone)]
pub struct ParamDef {
    /// The parameter name
    pub name: String,
    /// 1-based parameter position (0 designates the return value)
    pub sequence: u16,
    /// Parameter attribute flags
    pub flags: u32,
}

/// A smart reference to a [`MethodDef`] that automatically handles weak references
#[derive(Clone)]
pub struct MethodDefRef {
    weak_ref: Weak<MethodDef>,
}

impl MethodDefRef {
    /// Create a new `MethodDefRef` from a strong reference
    pub fn new(strong_ref: &MethodDefRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the method, returning None if it has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<MethodDefRc> {
        self.weak_ref.upgrade()
    }

    /// Check if the referenced method is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }

    /// Whether this and `other` refer to the same method definition
    #[must_use]
    pub fn same_as(&self, other: &MethodDefRc) -> bool {
        self.weak_ref.as_ptr() == Arc::as_ptr(other)
    }
}

impl From<MethodDefRc> for MethodDefRef {
    fn from(strong_ref: MethodDefRc) -> Self {
        Self::new(&strong_ref)
    }
}

impl std::fmt::Debug for MethodDefRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(m) => write!(f, "MethodDefRef({})", m.name()),
            None => write!(f, "MethodDefRef(<dropped>)"),
        }
    }
}

/// A method definition.
pub struct MethodDef {
    pub(crate) token: OnceLock<Token>,
    name: RwLock<String>,
    flags: RwLock<u32>,
    /// Implementation flags (code type, inlining, synchronization)
    pub impl_flags: u32,
    declaring_type: RwLock<Option<TypeDefRef>>,
    signature: OnceLock<MethodSignature>,
    /// Named parameter records, in sequence order
    pub params: Arc<boxcar::Vec<ParamDef>>,
    /// All generic parameters this method declares
    pub generic_params: Arc<boxcar::Vec<GenericParam>>,
    /// All custom attributes attached to this method
    pub custom_attributes: Arc<boxcar::Vec<CustomAttribute>>,
    body: RwLock<Option<CilBody>>,
}

impl MethodDef {
    /// Create a new method definition skeleton.
    ///
    /// The signature and body are set during population; the method has no token until the
    /// owning module issues one.
    #[must_use]
    pub fn new(name: &str, flags: u32, impl_flags: u32) -> MethodDefRc {
        Arc::new(MethodDef {
            token: OnceLock::new(),
            name: RwLock::new(name.to_string()),
            flags: RwLock::new(flags),
            impl_flags,
            declaring_type: RwLock::new(None),
            signature: OnceLock::new(),
            params: Arc::new(boxcar::Vec::new()),
            generic_params: Arc::new(boxcar::Vec::new()),
            custom_attributes: Arc::new(boxcar::Vec::new()),
            body: RwLock::new(None),
        })
    }

    /// The token issued by the owning module, if the method has been committed
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        self.token.get().copied()
    }

    /// The method name
    #[must_use]
    pub fn name(&self) -> String {
        lock_read(&self.name).clone()
    }

    /// Rename the method
    pub fn set_name(&self, name: &str) {
        *lock_write(&self.name) = name.to_string();
    }

    /// The raw attribute flags
    #[must_use]
    pub fn flags(&self) -> u32 {
        *lock_read(&self.flags)
    }

    /// Replace the raw attribute flags
    pub fn set_flags(&self, flags: u32) {
        *lock_write(&self.flags) = flags;
    }

    /// The access group of the attribute flags
    #[must_use]
    pub fn access(&self) -> MethodAccessFlags {
        MethodAccessFlags::from_method_flags(self.flags())
    }

    /// Rewrite the access group, leaving all other attribute bits untouched
    pub fn set_access(&self, access: MethodAccessFlags) {
        let mut flags = lock_write(&self.flags);
        *flags = access.apply_to(*flags);
    }

    /// Whether the method is static
    #[must_use]
    pub fn is_static(&self) -> bool {
        MethodModifiers::from_method_flags(self.flags()).contains(MethodModifiers::STATIC)
    }

    /// Whether the method name is special (`.ctor`, accessors, operators)
    #[must_use]
    pub fn is_special_name(&self) -> bool {
        MethodModifiers::from_method_flags(self.flags()).contains(MethodModifiers::SPECIAL_NAME)
    }

    /// Whether the runtime attaches special behavior to the name
    #[must_use]
    pub fn is_rt_special_name(&self) -> bool {
        MethodModifiers::from_method_flags(self.flags()).contains(MethodModifiers::RTSPECIAL_NAME)
    }

    /// Whether the method is publicly accessible
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.access() == MethodAccessFlags::PUBLIC
    }

    /// Whether the method overrides a base slot (virtual without a fresh vtable slot)
    #[must_use]
    pub fn is_override(&self) -> bool {
        let flags = self.flags();
        MethodModifiers::from_method_flags(flags).contains(MethodModifiers::VIRTUAL)
            && MethodVtableFlags::from_method_flags(flags) == MethodVtableFlags::REUSE_SLOT
    }

    /// The method signature, once populated
    #[must_use]
    pub fn signature(&self) -> Option<&MethodSignature> {
        self.signature.get()
    }

    /// Set the signature. Only the first call has an effect.
    pub fn set_signature(&self, signature: MethodSignature) {
        self.signature.set(signature).ok();
    }

    /// The declaring type, once the method is attached to one
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        lock_read(&self.declaring_type)
            .as_ref()
            .and_then(TypeDefRef::upgrade)
    }

    /// Attach the method to a declaring type (or detach it with `None`)
    pub fn set_declaring_type(&self, declaring: Option<&TypeDefRc>) {
        *lock_write(&self.declaring_type) = declaring.map(TypeDefRef::new);
    }

    /// The module owning this method, through its declaring type
    #[must_use]
    pub fn module(&self) -> Option<Arc<Module>> {
        self.declaring_type().and_then(|t| t.module())
    }

    /// Whether the method has an implementation body
    #[must_use]
    pub fn has_body(&self) -> bool {
        lock_read(&self.body).is_some()
    }

    /// Read access to the method body
    pub fn body(&self) -> RwLockReadGuard<'_, Option<CilBody>> {
        lock_read(&self.body)
    }

    /// Write access to the method body, for in-place editing
    pub fn body_mut(&self) -> RwLockWriteGuard<'_, Option<CilBody>> {
        lock_write(&self.body)
    }

    /// Install (or replace) the method body
    pub fn set_body(&self, body: CilBody) {
        *lock_write(&self.body) = Some(body);
    }
}

impl std::fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name())
            .field("token", &self.token())
            .field("flags", &self.flags())
            .field("has_body", &self.has_body())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::flags::{MethodAccessFlags, MethodModifiers, MethodVtableFlags};
    use crate::metadata::signatures::TypeSig;

    fn flags(access: MethodAccessFlags, modifiers: MethodModifiers) -> u32 {
        access.bits() | modifiers.bits()
    }

    #[test]
    fn test_static_and_access() {
        let m = MethodDef::new(
            "Run",
            flags(MethodAccessFlags::PUBLIC, MethodModifiers::STATIC),
            0,
        );
        assert!(m.is_static());
        assert!(m.is_public());
        m.set_access(MethodAccessFlags::ASSEM);
        assert!(!m.is_public());
        assert!(m.is_static());
    }

    #[test]
    fn test_override_detection() {
        let reuse = MethodDef::new(
            "ToString",
            flags(MethodAccessFlags::PUBLIC, MethodModifiers::VIRTUAL),
            0,
        );
        assert!(reuse.is_override());

        let fresh = MethodDef::new(
            "ToString",
            flags(MethodAccessFlags::PUBLIC, MethodModifiers::VIRTUAL)
                | MethodVtableFlags::NEW_SLOT.bits(),
            0,
        );
        assert!(!fresh.is_override());

        let plain = MethodDef::new("Run", MethodAccessFlags::PUBLIC.bits(), 0);
        assert!(!plain.is_override());
    }

    #[test]
    fn test_signature_set_once() {
        let m = MethodDef::new("Run", 0, 0);
        assert!(m.signature().is_none());
        m.set_signature(MethodSignature {
            has_this: false,
            return_type: TypeSig::Void,
            params: vec![TypeSig::I4],
        });
        m.set_signature(MethodSignature {
            has_this: true,
            return_type: TypeSig::I8,
            params: vec![],
        });
        let sig = m.signature().unwrap();
        assert!(!sig.has_this);
        assert_eq!(sig.params.len(), 1);
    }
}
