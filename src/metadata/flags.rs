//! Attribute flags and bitmask groups for all definition kinds.
//!
//! Definitions store their attributes as a raw `u32` exactly as they appear in metadata; the
//! bitflags groups in this module carve that raw value into logical pieces (visibility,
//! vtable layout, modifiers) with `from_*` extraction helpers and `apply_to` composition
//! helpers for the masked groups. Inject behaviors use the latter to rewrite visibility
//! without touching the rest of a definition's flags.

use bitflags::bitflags;

/// Bitmask for type visibility extraction
pub const TYPE_VISIBILITY_MASK: u32 = 0x0000_0007;
/// Bitmask for method access extraction
pub const METHOD_ACCESS_MASK: u32 = 0x0007;
/// Bitmask for method vtable layout extraction
pub const METHOD_VTABLE_LAYOUT_MASK: u32 = 0x0100;
/// Bitmask for field access extraction
pub const FIELD_ACCESS_MASK: u32 = 0x0007;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Type visibility flags (masked group within type attributes)
    pub struct TypeVisibility: u32 {
        /// Type is not visible outside its assembly
        const NOT_PUBLIC = 0x0000_0000;
        /// Type is visible outside its assembly
        const PUBLIC = 0x0000_0001;
        /// Nested type with public visibility
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested type with private visibility
        const NESTED_PRIVATE = 0x0000_0003;
        /// Nested type visible to the declaring type and sub-types
        const NESTED_FAMILY = 0x0000_0004;
        /// Nested type visible within the assembly
        const NESTED_ASSEMBLY = 0x0000_0005;
        /// Nested type visible to family and assembly
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        /// Nested type visible to family or assembly
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;
    }
}

impl TypeVisibility {
    /// Extract the visibility group from raw type attributes
    #[must_use]
    pub fn from_type_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & TYPE_VISIBILITY_MASK)
    }

    /// Compose this visibility into `flags`, leaving every other bit untouched
    #[must_use]
    pub fn apply_to(self, flags: u32) -> u32 {
        (flags & !TYPE_VISIBILITY_MASK) | self.bits()
    }

    /// Whether this is one of the nested visibilities
    #[must_use]
    pub fn is_nested(self) -> bool {
        self.bits() >= Self::NESTED_PUBLIC.bits()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Type semantics and special-handling modifiers
    pub struct TypeModifiers: u32 {
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Type is abstract
        const ABSTRACT = 0x0000_0080;
        /// Type cannot be derived from
        const SEALED = 0x0000_0100;
        /// Name is special, the name describes how
        const SPECIAL_NAME = 0x0000_0400;
        /// Runtime provides special behavior based on the name
        const RT_SPECIAL_NAME = 0x0000_0800;
        /// Type is imported from another module
        const IMPORT = 0x0000_1000;
        /// Type can be serialized
        const SERIALIZABLE = 0x0000_2000;
        /// Initialize the type before first access to a static field
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

impl TypeModifiers {
    /// Extract the modifier group from raw type attributes
    #[must_use]
    pub fn from_type_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !TYPE_VISIBILITY_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method access flags (masked group within method attributes)
    pub struct MethodAccessFlags: u32 {
        /// Member not referenceable
        const COMPILER_CONTROLLED = 0x0000;
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible only by sub-types in this assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly
        const ASSEM = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in the assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
    }
}

impl MethodAccessFlags {
    /// Extract access flags from raw method attributes
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & METHOD_ACCESS_MASK)
    }

    /// Compose this access level into `flags`, leaving every other bit untouched
    #[must_use]
    pub fn apply_to(self, flags: u32) -> u32 {
        (flags & !METHOD_ACCESS_MASK) | self.bits()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method vtable layout flags
    pub struct MethodVtableFlags: u32 {
        /// Method reuses an existing slot in the vtable
        const REUSE_SLOT = 0x0000;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
    }
}

impl MethodVtableFlags {
    /// Extract vtable layout flags from raw method attributes
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & METHOD_VTABLE_LAYOUT_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method modifiers and properties
    pub struct MethodModifiers: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method can only be overridden if also accessible
        const STRICT = 0x0200;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Name is special, the name describes how
        const SPECIAL_NAME = 0x0800;
        /// Runtime provides special behavior based on the name
        const RTSPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through P/Invoke
        const PINVOKE_IMPL = 0x2000;
        /// Method has security associated with it
        const HAS_SECURITY = 0x4000;
        /// Method calls another method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

impl MethodModifiers {
    /// Extract method modifiers from raw method attributes
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !METHOD_ACCESS_MASK & !METHOD_VTABLE_LAYOUT_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method implementation flags
    pub struct MethodImplFlags: u32 {
        /// Implementation is native
        const NATIVE = 0x0001;
        /// Implementation is OPTIL
        const OPTIL = 0x0002;
        /// Implementation is provided by the runtime
        const RUNTIME = 0x0003;
        /// Implementation is unmanaged
        const UNMANAGED = 0x0004;
        /// Method cannot be inlined
        const NO_INLINING = 0x0008;
        /// Method is defined; used primarily in merge scenarios
        const FORWARD_REF = 0x0010;
        /// Method is synchronized
        const SYNCHRONIZED = 0x0020;
        /// Signature is exported exactly as declared
        const PRESERVE_SIG = 0x0080;
        /// Implemented inside the runtime itself
        const INTERNAL_CALL = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Field access flags (masked group within field attributes)
    pub struct FieldAccessFlags: u32 {
        /// Member not referenceable
        const COMPILER_CONTROLLED = 0x0000;
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible only by sub-types in this assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly
        const ASSEM = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in the assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
    }
}

impl FieldAccessFlags {
    /// Extract access flags from raw field attributes
    #[must_use]
    pub fn from_field_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & FIELD_ACCESS_MASK)
    }

    /// Compose this access level into `flags`, leaving every other bit untouched
    #[must_use]
    pub fn apply_to(self, flags: u32) -> u32 {
        (flags & !FIELD_ACCESS_MASK) | self.bits()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Field modifiers and properties
    pub struct FieldModifiers: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Field can only be initialized, not written after init
        const INIT_ONLY = 0x0020;
        /// Value is a compile-time constant
        const LITERAL = 0x0040;
        /// Field does not have to be serialized
        const NOT_SERIALIZED = 0x0080;
        /// Field maps to data laid out at a fixed location
        const HAS_FIELD_RVA = 0x0100;
        /// Name is special, the name describes how
        const SPECIAL_NAME = 0x0200;
        /// Runtime provides special behavior based on the name
        const RT_SPECIAL_NAME = 0x0400;
        /// Field has marshalling information
        const HAS_FIELD_MARSHAL = 0x1000;
        /// Field has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

impl FieldModifiers {
    /// Extract field modifiers from raw field attributes
    #[must_use]
    pub fn from_field_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !FIELD_ACCESS_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Event attribute flags
    pub struct EventFlags: u32 {
        /// Name is special, the name describes how
        const SPECIAL_NAME = 0x0200;
        /// Runtime provides special behavior based on the name
        const RT_SPECIAL_NAME = 0x0400;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Property attribute flags
    pub struct PropertyFlags: u32 {
        /// Name is special, the name describes how
        const SPECIAL_NAME = 0x0200;
        /// Runtime provides special behavior based on the name
        const RT_SPECIAL_NAME = 0x0400;
        /// Property has a default value
        const HAS_DEFAULT = 0x1000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_visibility_extraction() {
        let flags = TypeVisibility::NESTED_ASSEMBLY.bits() | TypeModifiers::SEALED.bits();
        assert_eq!(
            TypeVisibility::from_type_flags(flags),
            TypeVisibility::NESTED_ASSEMBLY
        );
        assert!(TypeModifiers::from_type_flags(flags).contains(TypeModifiers::SEALED));
    }

    #[test]
    fn test_type_visibility_apply_preserves_other_bits() {
        let flags = TypeVisibility::PUBLIC.bits()
            | TypeModifiers::ABSTRACT.bits()
            | TypeModifiers::BEFORE_FIELD_INIT.bits();
        let rewritten = TypeVisibility::NOT_PUBLIC.apply_to(flags);
        assert_eq!(
            TypeVisibility::from_type_flags(rewritten),
            TypeVisibility::NOT_PUBLIC
        );
        assert!(TypeModifiers::from_type_flags(rewritten).contains(TypeModifiers::ABSTRACT));
        assert!(
            TypeModifiers::from_type_flags(rewritten).contains(TypeModifiers::BEFORE_FIELD_INIT)
        );
    }

    #[test]
    fn test_type_visibility_is_nested() {
        assert!(!TypeVisibility::NOT_PUBLIC.is_nested());
        assert!(!TypeVisibility::PUBLIC.is_nested());
        assert!(TypeVisibility::NESTED_PUBLIC.is_nested());
        assert!(TypeVisibility::NESTED_FAM_OR_ASSEM.is_nested());
    }

    #[test]
    fn test_method_access_apply() {
        let flags = MethodAccessFlags::PUBLIC.bits()
            | MethodModifiers::STATIC.bits()
            | MethodModifiers::HIDE_BY_SIG.bits();
        let rewritten = MethodAccessFlags::ASSEM.apply_to(flags);
        assert_eq!(
            MethodAccessFlags::from_method_flags(rewritten),
            MethodAccessFlags::ASSEM
        );
        assert!(MethodModifiers::from_method_flags(rewritten).contains(MethodModifiers::STATIC));
    }

    #[test]
    fn test_method_vtable_extraction() {
        let flags = MethodModifiers::VIRTUAL.bits() | MethodVtableFlags::NEW_SLOT.bits();
        assert_eq!(
            MethodVtableFlags::from_method_flags(flags),
            MethodVtableFlags::NEW_SLOT
        );
        // Vtable bit must not leak into the modifier group
        assert!(!MethodModifiers::from_method_flags(flags)
            .intersects(MethodModifiers::from_bits_truncate(0x0100)));
    }

    #[test]
    fn test_field_access_apply() {
        let flags = FieldAccessFlags::PUBLIC.bits() | FieldModifiers::STATIC.bits();
        let rewritten = FieldAccessFlags::ASSEM.apply_to(flags);
        assert_eq!(
            FieldAccessFlags::from_field_flags(rewritten),
            FieldAccessFlags::ASSEM
        );
        assert!(FieldModifiers::from_field_flags(rewritten).contains(FieldModifiers::STATIC));
    }
}
