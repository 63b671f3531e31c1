//! Field definitions.

use std::sync::{Arc, OnceLock, RwLock, Weak};

use crate::metadata::{
    flags::{FieldAccessFlags, FieldModifiers},
    lock_read, lock_write,
    member::CustomAttribute,
    module::Module,
    signatures::FieldSignature,
    token::Token,
    types::{TypeDefRc, TypeDefRef},
};

/// A reference counted [`FieldDef`]
pub type FieldDefRc = Arc<FieldDef>;

/// A smart reference to a [`FieldDef`] that automatically handles weak references
#[derive(Clone)]
pub struct FieldDefRef {
    weak_ref: Weak<FieldDef>,
}

impl FieldDefRef {
    /// Create a new `FieldDefRef` from a strong reference
    pub fn new(strong_ref: &FieldDefRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the field, returning None if it has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<FieldDefRc> {
        self.weak_ref.upgrade()
    }

    /// Check if the referenced field is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }
}

impl From<FieldDefRc> for FieldDefRef {
    fn from(strong_ref: FieldDefRc) -> Self {
        Self::new(&strong_ref)
    }
}

impl std::fmt::Debug for FieldDefRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(fld) => write!(f, "FieldDefRef({})", fld.name()),
            None => write!(f, "FieldDefRef(<dropped>)"),
        }
    }
}

/// A field definition.
pub struct FieldDef {
    pub(crate) token: OnceLock<Token>,
    name: RwLock<String>,
    flags: RwLock<u32>,
    declaring_type: RwLock<Option<TypeDefRef>>,
    signature: OnceLock<FieldSignature>,
    initial_value: OnceLock<Vec<u8>>,
    /// All custom attributes attached to this field
    pub custom_attributes: Arc<boxcar::Vec<CustomAttribute>>,
}

impl FieldDef {
    /// Create a new field definition skeleton. The signature is set during population.
    #[must_use]
    pub fn new(name: &str, flags: u32) -> FieldDefRc {
        Arc::new(FieldDef {
            token: OnceLock::new(),
            name: RwLock::new(name.to_string()),
            flags: RwLock::new(flags),
            declaring_type: RwLock::new(None),
            signature: OnceLock::new(),
            initial_value: OnceLock::new(),
            custom_attributes: Arc::new(boxcar::Vec::new()),
        })
    }

    /// The token issued by the owning module, if the field has been committed
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        self.token.get().copied()
    }

    /// The field name
    #[must_use]
    pub fn name(&self) -> String {
        lock_read(&self.name).clone()
    }

    /// Rename the field
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
    pub fn access(&self) -> FieldAccessFlags {
        FieldAccessFlags::from_field_flags(self.flags())
    }

    /// Rewrite the access group, leaving all other attribute bits untouched
    pub fn set_access(&self, access: FieldAccessFlags) {
        let mut flags = lock_write(&self.flags);
        *flags = access.apply_to(*flags);
    }

    /// Whether the field is static
    #[must_use]
    pub fn is_static(&self) -> bool {
        FieldModifiers::from_field_flags(self.flags()).contains(FieldModifiers::STATIC)
    }

    /// Whether the field name is special
    #[must_use]
    pub fn is_special_name(&self) -> bool {
        FieldModifiers::from_field_flags(self.flags()).contains(FieldModifiers::SPECIAL_NAME)
    }

    /// Whether the field is publicly accessible
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.access() == FieldAccessFlags::PUBLIC
    }

    /// The field signature, once populated
    #[must_use]
    pub fn signature(&self) -> Option<&FieldSignature> {
        self.signature.get()
    }

    /// Set the signature. Only the first call has an effect.
    pub fn set_signature(&self, signature: FieldSignature) {
        self.signature.set(signature).ok();
    }

    /// Raw initial value bytes for fields with mapped data
    #[must_use]
    pub fn initial_value(&self) -> Option<&[u8]> {
        self.initial_value.get().map(Vec::as_slice)
    }

    /// Set the raw initial value bytes. Only the first call has an effect.
    pub fn set_initial_value(&self, value: Vec<u8>) {
        self.initial_value.set(value).ok();
    }

    /// The declaring type, once the field is attached to one
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        lock_read(&self.declaring_type)
            .as_ref()
            .and_then(TypeDefRef::upgrade)
    }

    /// Attach the field to a declaring type (or detach it with `None`)
    pub fn set_declaring_type(&self, declaring: Option<&TypeDefRc>) {
        *lock_write(&self.declaring_type) = declaring.map(TypeDefRef::new);
    }

    /// The module owning this field, through its declaring type
    #[must_use]
    pub fn module(&self) -> Option<Arc<Module>> {
        self.declaring_type().and_then(|t| t.module())
    }
}

impl std::fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name())
            .field("token", &self.token())
            .field("flags", &self.flags())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_rewrite_keeps_modifiers() {
        let f = FieldDef::new(
            "counter",
            FieldAccessFlags::PUBLIC.bits() | FieldModifiers::STATIC.bits(),
        );
        assert!(f.is_public());
        f.set_access(FieldAccessFlags::ASSEM);
        assert!(!f.is_public());
        assert!(f.is_static());
    }

    #[test]
    fn test_initial_value_set_once() {
        let f = FieldDef::new("data", FieldModifiers::HAS_FIELD_RVA.bits());
        assert!(f.initial_value().is_none());
        f.set_initial_value(vec![1, 2, 3]);
        f.set_initial_value(vec![9]);
        assert_eq!(f.initial_value().unwrap(), &[1, 2, 3]);
    }
}
