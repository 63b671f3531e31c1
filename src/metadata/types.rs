//! Type definitions and type references.
//!
//! [`TypeDef`] is the richest node of the definition graph: it owns its declared methods,
//! fields, events, properties and nested types, and points (weakly) at its base type,
//! interfaces and declaring type. Strong ownership flows strictly downwards, module to
//! top-level type to members, while every upward or sideways edge is a [`TypeDefRef`]
//! weak reference, so recursive type graphs do not leak.
//!
//! [`TypeReference`] is the type position used everywhere a type is *named* rather than
//! owned: base types, interface lists, signatures, catch clauses. It either points at a
//! definition in one of the modules under edit or names a type in a foreign assembly.

use std::sync::{Arc, OnceLock, RwLock, Weak};

use crate::metadata::{
    event::EventDefRc,
    field::FieldDefRc,
    flags::{TypeModifiers, TypeVisibility},
    lock_read, lock_write,
    member::CustomAttribute,
    method::MethodDefRc,
    module::{AssemblyRefRc, Module},
    property::PropertyDefRc,
    token::Token,
};

/// A reference counted [`TypeDef`]
pub type TypeDefRc = Arc<TypeDef>;

/// A vector that holds [`TypeDefRef`] instances (weak references)
pub type TypeDefRefList = Arc<boxcar::Vec<TypeDefRef>>;

/// Generic parameter declared by a type or method.
///
/// Injected copies keep number and flags but anonymize the name, matching the source
/// behavior of the transplant engine.
#[derive(Debug, Clone)]
pub struct GenericParam {
    /// Position of the parameter, starting at 0
    pub number: u16,
    /// Variance and constraint flags
    pub flags: u32,
    /// The parameter name
    pub name: String,
}

/// A smart reference to a [`TypeDef`] that automatically handles weak references
/// to prevent circular reference memory leaks while providing a clean API
#[derive(Clone)]
pub struct TypeDefRef {
    weak_ref: Weak<TypeDef>,
}

impl TypeDefRef {
    /// Create a new `TypeDefRef` from a strong reference
    pub fn new(strong_ref: &TypeDefRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the type, returning None if the type has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<TypeDefRc> {
        self.weak_ref.upgrade()
    }

    /// Check if the referenced type is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }

    /// Get the name of the referenced type (if still alive)
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.upgrade().map(|t| t.name())
    }

    /// Whether this and `other` refer to the same type definition
    #[must_use]
    pub fn same_as(&self, other: &TypeDefRc) -> bool {
        self.weak_ref.as_ptr() == Arc::as_ptr(other)
    }
}

impl From<TypeDefRc> for TypeDefRef {
    fn from(strong_ref: TypeDefRc) -> Self {
        Self::new(&strong_ref)
    }
}

impl std::fmt::Debug for TypeDefRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(ty) => write!(f, "TypeDefRef({})", ty.fullname()),
            None => write!(f, "TypeDefRef(<dropped>)"),
        }
    }
}

/// A reference to a type in a foreign assembly, outside the modules under edit.
#[derive(Clone)]
pub struct ExternalTypeRef {
    /// The assembly the type lives in
    pub assembly: AssemblyRefRc,
    /// The type namespace (can be empty)
    pub namespace: String,
    /// The type name
    pub name: String,
}

impl ExternalTypeRef {
    /// Returns the full name (Namespace.Name) of the referenced type
    #[must_use]
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{0}.{1}", self.namespace, self.name)
        }
    }
}

impl std::fmt::Debug for ExternalTypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExternalTypeRef([{}]{})", self.assembly.name, self.fullname())
    }
}

/// A type position: either a definition in one of the modules under edit, or a type in a
/// foreign assembly.
///
/// This is the unit the injection importer rewrites: `Def` references into the origin
/// module become `Def` references into the target module (copying on demand), `External`
/// references have their assembly reference retargeted when needed.
#[derive(Debug, Clone)]
pub enum TypeReference {
    /// A type definition in a module under edit
    Def(TypeDefRef),
    /// A type in a foreign assembly
    External(ExternalTypeRef),
}

impl TypeReference {
    /// Build a `Def` reference from a strong type definition
    #[must_use]
    pub fn to_def(ty: &TypeDefRc) -> Self {
        TypeReference::Def(TypeDefRef::new(ty))
    }

    /// Resolve to a strong type definition, if this references one that is still alive
    #[must_use]
    pub fn as_def(&self) -> Option<TypeDefRc> {
        match self {
            TypeReference::Def(weak) => weak.upgrade(),
            TypeReference::External(_) => None,
        }
    }

    /// Returns the full name of the referenced type, if it can still be resolved
    #[must_use]
    pub fn fullname(&self) -> Option<String> {
        match self {
            TypeReference::Def(weak) => weak.upgrade().map(|t| t.fullname()),
            TypeReference::External(ext) => Some(ext.fullname()),
        }
    }
}

/// A type definition: a named node of the definition graph owning its declared members.
///
/// `TypeDef` follows the lifecycle the transplant engine relies on: a freshly created value
/// is a *skeleton* (name, namespace and flags set, relations empty), relations are filled in
/// during population, and the owning module stamps a token when the definition is committed.
/// Fields that inject behaviors may rewrite after population (name, namespace, flags,
/// declaring type) sit behind locks; set-once relations use [`OnceLock`].
pub struct TypeDef {
    pub(crate) token: OnceLock<Token>,
    pub(crate) module: OnceLock<Weak<Module>>,
    namespace: RwLock<String>,
    name: RwLock<String>,
    flags: RwLock<u32>,
    base: OnceLock<TypeReference>,
    declaring_type: RwLock<Option<TypeDefRef>>,
    /// All interfaces this type implements
    pub interfaces: Arc<boxcar::Vec<TypeReference>>,
    /// All types nested inside this type
    pub nested_types: Arc<boxcar::Vec<TypeDefRc>>,
    /// All methods this type declares
    pub methods: Arc<boxcar::Vec<MethodDefRc>>,
    /// All fields this type declares
    pub fields: Arc<boxcar::Vec<FieldDefRc>>,
    /// All events this type declares
    pub events: Arc<boxcar::Vec<EventDefRc>>,
    /// All properties this type declares
    pub properties: Arc<boxcar::Vec<PropertyDefRc>>,
    /// All generic parameters this type declares
    pub generic_params: Arc<boxcar::Vec<GenericParam>>,
    /// All custom attributes attached to this type
    pub custom_attributes: Arc<boxcar::Vec<CustomAttribute>>,
    /// Field alignment, when the type carries an explicit class layout
    pub packing_size: OnceLock<u16>,
    /// Explicit class size, when the type carries an explicit class layout
    pub class_size: OnceLock<u32>,
}

impl TypeDef {
    /// Create a new type definition skeleton with the given name and attributes.
    ///
    /// Relations (base type, members, declaring type) start empty; the type has no token
    /// and no owning module until a [`Module`] issues one.
    #[must_use]
    pub fn new(namespace: &str, name: &str, flags: u32) -> TypeDefRc {
        Arc::new(TypeDef {
            token: OnceLock::new(),
            module: OnceLock::new(),
            namespace: RwLock::new(namespace.to_string()),
            name: RwLock::new(name.to_string()),
            flags: RwLock::new(flags),
            base: OnceLock::new(),
            declaring_type: RwLock::new(None),
            interfaces: Arc::new(boxcar::Vec::new()),
            nested_types: Arc::new(boxcar::Vec::new()),
            methods: Arc::new(boxcar::Vec::new()),
            fields: Arc::new(boxcar::Vec::new()),
            events: Arc::new(boxcar::Vec::new()),
            properties: Arc::new(boxcar::Vec::new()),
            generic_params: Arc::new(boxcar::Vec::new()),
            custom_attributes: Arc::new(boxcar::Vec::new()),
            packing_size: OnceLock::new(),
            class_size: OnceLock::new(),
        })
    }

    /// The token issued by the owning module, if the type has been committed
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        self.token.get().copied()
    }

    /// The module owning this type, if it has been committed to one
    #[must_use]
    pub fn module(&self) -> Option<Arc<Module>> {
        self.module.get().and_then(Weak::upgrade)
    }

    /// The type namespace (can be empty)
    #[must_use]
    pub fn namespace(&self) -> String {
        lock_read(&self.namespace).clone()
    }

    /// The type name
    #[must_use]
    pub fn name(&self) -> String {
        lock_read(&self.name).clone()
    }

    /// Rename the type
    pub fn set_name(&self, name: &str) {
        *lock_write(&self.name) = name.to_string();
    }

    /// Change the type namespace
    pub fn set_namespace(&self, namespace: &str) {
        *lock_write(&self.namespace) = namespace.to_string();
    }

    /// Returns the full name (Namespace.Name) of the type
    #[must_use]
    pub fn fullname(&self) -> String {
        let namespace = self.namespace();
        if namespace.is_empty() {
            self.name()
        } else {
            format!("{0}.{1}", namespace, self.name())
        }
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

    /// The visibility group of the attribute flags
    #[must_use]
    pub fn visibility(&self) -> TypeVisibility {
        TypeVisibility::from_type_flags(self.flags())
    }

    /// Rewrite the visibility group, leaving all other attribute bits untouched
    pub fn set_visibility(&self, visibility: TypeVisibility) {
        let mut flags = lock_write(&self.flags);
        *flags = visibility.apply_to(*flags);
    }

    /// Access the base type of this type, if set
    #[must_use]
    pub fn base(&self) -> Option<TypeReference> {
        self.base.get().cloned()
    }

    /// Set the base type. Only the first call has an effect.
    pub fn set_base(&self, base: TypeReference) {
        self.base.set(base).ok();
    }

    /// The declaring type, when this type is nested
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        lock_read(&self.declaring_type)
            .as_ref()
            .and_then(TypeDefRef::upgrade)
    }

    /// Re-parent the type under `declaring` (or detach it with `None`)
    pub fn set_declaring_type(&self, declaring: Option<&TypeDefRc>) {
        *lock_write(&self.declaring_type) = declaring.map(TypeDefRef::new);
    }

    /// Whether this type is nested inside another type
    #[must_use]
    pub fn is_nested(&self) -> bool {
        lock_read(&self.declaring_type).is_some()
    }

    /// Whether this type is an interface
    #[must_use]
    pub fn is_interface(&self) -> bool {
        TypeModifiers::from_type_flags(self.flags()).contains(TypeModifiers::INTERFACE)
    }

    /// Whether this type is an enumeration (derives from `System.Enum`)
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.base_fullname_is("System.Enum")
    }

    /// Whether this type is a delegate (derives from `System.MulticastDelegate` or
    /// `System.Delegate`)
    #[must_use]
    pub fn is_delegate(&self) -> bool {
        self.base_fullname_is("System.MulticastDelegate")
            || self.base_fullname_is("System.Delegate")
    }

    fn base_fullname_is(&self, fullname: &str) -> bool {
        self.base()
            .and_then(|b| b.fullname())
            .is_some_and(|n| n == fullname)
    }

    /// Declare a method on this type, wiring the method's declaring-type backlink
    pub fn add_method(self: &Arc<Self>, method: &MethodDefRc) {
        method.set_declaring_type(Some(self));
        self.methods.push(method.clone());
    }

    /// Declare a field on this type, wiring the field's declaring-type backlink
    pub fn add_field(self: &Arc<Self>, field: &FieldDefRc) {
        field.set_declaring_type(Some(self));
        self.fields.push(field.clone());
    }

    /// Declare an event on this type, wiring the event's declaring-type backlink
    pub fn add_event(self: &Arc<Self>, event: &EventDefRc) {
        event.set_declaring_type(Some(self));
        self.events.push(event.clone());
    }

    /// Declare a property on this type, wiring the property's declaring-type backlink
    pub fn add_property(self: &Arc<Self>, property: &PropertyDefRc) {
        property.set_declaring_type(Some(self));
        self.properties.push(property.clone());
    }

    /// Nest `nested` inside this type, wiring its declaring-type backlink
    pub fn add_nested_type(self: &Arc<Self>, nested: &TypeDefRc) {
        nested.set_declaring_type(Some(self));
        self.nested_types.push(nested.clone());
    }

    /// Find the parameterless instance constructor, if the type declares one
    #[must_use]
    pub fn find_default_constructor(&self) -> Option<MethodDefRc> {
        self.methods.iter().map(|(_, m)| m).find(|m| {
            m.is_rt_special_name()
                && !m.is_static()
                && m.name() == ".ctor"
                && m.signature().is_none_or(|s| s.params.is_empty())
        }).cloned()
    }

    /// Find the static constructor, if the type declares one
    #[must_use]
    pub fn find_static_constructor(&self) -> Option<MethodDefRc> {
        self.methods
            .iter()
            .map(|(_, m)| m)
            .find(|m| m.is_static() && m.name() == ".cctor")
            .cloned()
    }
}

impl std::fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDef")
            .field("fullname", &self.fullname())
            .field("token", &self.token())
            .field("flags", &self.flags())
            .field("methods", &self.methods.count())
            .field("fields", &self.fields.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::flags::TypeVisibility;
    use crate::test::factories;

    #[test]
    fn test_skeleton_starts_empty() {
        let ty = TypeDef::new("My.Ns", "Thing", TypeVisibility::PUBLIC.bits());
        assert_eq!(ty.fullname(), "My.Ns.Thing");
        assert!(ty.base().is_none());
        assert!(ty.token().is_none());
        assert!(ty.module().is_none());
        assert!(!ty.is_nested());
        assert_eq!(ty.methods.count(), 0);
    }

    #[test]
    fn test_rename_and_visibility_rewrite() {
        let ty = TypeDef::new("", "Helper", TypeVisibility::PUBLIC.bits());
        ty.set_name("Helper_0");
        ty.set_visibility(TypeVisibility::NOT_PUBLIC);
        assert_eq!(ty.name(), "Helper_0");
        assert_eq!(ty.visibility(), TypeVisibility::NOT_PUBLIC);
    }

    #[test]
    fn test_nesting_backlink() {
        let outer = TypeDef::new("N", "Outer", TypeVisibility::PUBLIC.bits());
        let inner = TypeDef::new("", "Inner", TypeVisibility::NESTED_PRIVATE.bits());
        outer.add_nested_type(&inner);
        assert!(inner.is_nested());
        assert_eq!(inner.declaring_type().unwrap().name(), "Outer");
        assert_eq!(outer.nested_types.count(), 1);
    }

    #[test]
    fn test_base_set_once() {
        let ty = TypeDef::new("N", "T", 0);
        let object = factories::external_type_ref("System", "Object");
        let string = factories::external_type_ref("System", "String");
        ty.set_base(TypeReference::External(object));
        ty.set_base(TypeReference::External(string));
        assert_eq!(ty.base().unwrap().fullname().unwrap(), "System.Object");
    }

    #[test]
    fn test_enum_and_delegate_detection() {
        let e = TypeDef::new("N", "Color", 0);
        e.set_base(TypeReference::External(factories::external_type_ref(
            "System", "Enum",
        )));
        assert!(e.is_enum());
        assert!(!e.is_delegate());

        let d = TypeDef::new("N", "Callback", 0);
        d.set_base(TypeReference::External(factories::external_type_ref(
            "System",
            "MulticastDelegate",
        )));
        assert!(d.is_delegate());
    }

    #[test]
    fn test_type_def_ref_same_as() {
        let a = TypeDef::new("N", "A", 0);
        let b = TypeDef::new("N", "A", 0);
        let r = TypeDefRef::new(&a);
        assert!(r.same_as(&a));
        assert!(!r.same_as(&b));
    }
}
