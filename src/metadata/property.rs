//! Property definitions.

use std::sync::{Arc, OnceLock, RwLock, Weak};

use crate::metadata::{
    flags::PropertyFlags,
    lock_read, lock_write,
    member::CustomAttribute,
    method::{MethodDefRc, MethodDefRef},
    module::Module,
    signatures::PropertySignature,
    token::Token,
    types::{TypeDefRc, TypeDefRef},
};

/// A reference counted [`PropertyDef`]
pub type PropertyDefRc = Arc<PropertyDef>;

/// A smart reference to a [`PropertyDef`] that automatically handles weak references
#[derive(Clone)]
pub struct PropertyDefRef {
    weak_ref: Weak<PropertyDef>,
}

impl PropertyDefRef {
    /// Create a new `PropertyDefRef` from a strong reference
    pub fn new(strong_ref: &PropertyDefRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the property, returning None if it has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<PropertyDefRc> {
        self.weak_ref.upgrade()
    }

    /// Check if the referenced property is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }
}

impl From<PropertyDefRc> for PropertyDefRef {
    fn from(strong_ref: PropertyDefRc) -> Self {
        Self::new(&strong_ref)
    }
}

impl std::fmt::Debug for PropertyDefRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(p) => write!(f, "PropertyDefRef({})", p.name()),
            None => write!(f, "PropertyDefRef(<dropped>)"),
        }
    }
}

/// A property definition with its accessor method wiring.
///
/// Accessor references are weak; the methods themselves are owned by the declaring type's
/// method list.
pub struct PropertyDef {
    pub(crate) token: OnceLock<Token>,
    name: RwLock<String>,
    flags: RwLock<u32>,
    declaring_type: RwLock<Option<TypeDefRef>>,
    signature: OnceLock<PropertySignature>,
    /// Getter accessor methods
    pub get_methods: Arc<boxcar::Vec<MethodDefRef>>,
    /// Setter accessor methods
    pub set_methods: Arc<boxcar::Vec<MethodDefRef>>,
    /// Additional accessor methods
    pub other_methods: Arc<boxcar::Vec<MethodDefRef>>,
    /// All custom attributes attached to this property
    pub custom_attributes: Arc<boxcar::Vec<CustomAttribute>>,
}

impl PropertyDef {
    /// Create a new property definition skeleton
    #[must_use]
    pub fn new(name: &str, flags: u32) -> PropertyDefRc {
        Arc::new(PropertyDef {
            token: OnceLock::new(),
            name: RwLock::new(name.to_string()),
            flags: RwLock::new(flags),
            declaring_type: RwLock::new(None),
            signature: OnceLock::new(),
            get_methods: Arc::new(boxcar::Vec::new()),
            set_methods: Arc::new(boxcar::Vec::new()),
            other_methods: Arc::new(boxcar::Vec::new()),
            custom_attributes: Arc::new(boxcar::Vec::new()),
        })
    }

    /// The token issued by the owning module, if the property has been committed
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        self.token.get().copied()
    }

    /// The property name
    #[must_use]
    pub fn name(&self) -> String {
        lock_read(&self.name).clone()
    }

    /// Rename the property
    pub fn set_name(&self, name: &str) {
        *lock_write(&self.name) = name.to_string();
    }

    /// The raw attribute flags
    #[must_use]
    pub fn flags(&self) -> u32 {
        *lock_read(&self.flags)
    }

    /// Whether the property name is special
    #[must_use]
    pub fn is_special_name(&self) -> bool {
        PropertyFlags::from_bits_truncate(self.flags()).contains(PropertyFlags::SPECIAL_NAME)
    }

    /// The property signature, once populated
    #[must_use]
    pub fn signature(&self) -> Option<&PropertySignature> {
        self.signature.get()
    }

    /// Set the signature. Only the first call has an effect.
    pub fn set_signature(&self, signature: PropertySignature) {
        self.signature.set(signature).ok();
    }

    /// All wired accessors that are still alive
    #[must_use]
    pub fn accessors(&self) -> Vec<MethodDefRc> {
        self.get_methods
            .iter()
            .chain(self.set_methods.iter())
            .chain(self.other_methods.iter())
            .filter_map(|(_, m)| m.upgrade())
            .collect()
    }

    /// Whether `method` is one of this property's getters or setters
    #[must_use]
    pub fn has_accessor(&self, method: &MethodDefRc) -> bool {
        self.get_methods
            .iter()
            .chain(self.set_methods.iter())
            .any(|(_, m)| m.same_as(method))
    }

    /// The declaring type, once the property is attached to one
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        lock_read(&self.declaring_type)
            .as_ref()
            .and_then(TypeDefRef::upgrade)
    }

    /// Attach the property to a declaring type (or detach it with `None`)
    pub fn set_declaring_type(&self, declaring: Option<&TypeDefRc>) {
        *lock_write(&self.declaring_type) = declaring.map(TypeDefRef::new);
    }

    /// The module owning this property, through its declaring type
    #[must_use]
    pub fn module(&self) -> Option<Arc<Module>> {
        self.declaring_type().and_then(|t| t.module())
    }
}

impl std::fmt::Debug for PropertyDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyDef")
            .field("name", &self.name())
            .field("token", &self.token())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::method::MethodDef;

    #[test]
    fn test_accessors_and_lookup() {
        let p = PropertyDef::new("Count", 0);
        let getter = MethodDef::new("get_Count", 0, 0);
        let setter = MethodDef::new("set_Count", 0, 0);
        let unrelated = MethodDef::new("Run", 0, 0);
        p.get_methods.push(MethodDefRef::new(&getter));
        p.set_methods.push(MethodDefRef::new(&setter));

        assert_eq!(p.accessors().len(), 2);
        assert!(p.has_accessor(&getter));
        assert!(p.has_accessor(&setter));
        assert!(!p.has_accessor(&unrelated));
    }
}
