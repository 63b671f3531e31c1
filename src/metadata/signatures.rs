//! Signature representations for methods, fields, properties and locals.
//!
//! Signatures describe the types a definition exposes: parameter and return types for
//! methods, the value type for fields. Type positions inside a signature are [`TypeSig`]
//! values, which bottom out either in primitives or in [`TypeReference`]s; the latter are the
//! positions the transplant engine rewrites when a signature crosses a module boundary.

use crate::metadata::types::TypeReference;

/// A type occurring inside a signature.
///
/// Primitive element types are encoded directly; everything that names a type definition or
/// a foreign type goes through [`TypeReference`] so the injection importer can rewrite it.
#[derive(Debug, Clone)]
pub enum TypeSig {
    /// No value (return type position only)
    Void,
    /// System.Boolean
    Boolean,
    /// System.Char
    Char,
    /// Signed 8-bit integer
    I1,
    /// Unsigned 8-bit integer
    U1,
    /// Signed 16-bit integer
    I2,
    /// Unsigned 16-bit integer
    U2,
    /// Signed 32-bit integer
    I4,
    /// Unsigned 32-bit integer
    U4,
    /// Signed 64-bit integer
    I8,
    /// Unsigned 64-bit integer
    U8,
    /// 32-bit floating point
    R4,
    /// 64-bit floating point
    R8,
    /// Native signed integer
    I,
    /// Native unsigned integer
    U,
    /// System.Object
    Object,
    /// System.String
    String,
    /// A reference type
    Class(TypeReference),
    /// A value type
    ValueType(TypeReference),
    /// Single-dimensional, zero-based array of the element type
    SzArray(Box<TypeSig>),
    /// Managed reference to the element type
    ByRef(Box<TypeSig>),
    /// Unmanaged pointer to the element type
    Ptr(Box<TypeSig>),
    /// Generic parameter of the declaring type, by index
    Var(u16),
    /// Generic parameter of the method, by index
    MVar(u16),
}

impl TypeSig {
    /// Whether this signature element is `void`
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, TypeSig::Void)
    }
}

/// Signature of a method: calling shape, return type and parameter types.
#[derive(Debug, Clone)]
pub struct MethodSignature {
    /// Instance method (`this` is passed implicitly)
    pub has_this: bool,
    /// The return type
    pub return_type: TypeSig,
    /// The parameter types, in declaration order
    pub params: Vec<TypeSig>,
}

impl MethodSignature {
    /// Number of values a call site pops for arguments, including the implicit `this`
    #[must_use]
    pub fn arg_slot_count(&self) -> usize {
        self.params.len() + usize::from(self.has_this)
    }

    /// Whether a call site pushes a return value
    #[must_use]
    pub fn pushes_return(&self) -> bool {
        !self.return_type.is_void()
    }
}

/// Signature of a field: the type of the stored value.
#[derive(Debug, Clone)]
pub struct FieldSignature {
    /// The value type of the field
    pub field_type: TypeSig,
}

/// Signature of a property: the accessor shape.
#[derive(Debug, Clone)]
pub struct PropertySignature {
    /// Accessors are instance methods
    pub has_this: bool,
    /// The property value type
    pub return_type: TypeSig,
    /// Index parameter types for indexed properties
    pub params: Vec<TypeSig>,
}

/// Signature carried by an external member reference.
#[derive(Debug, Clone)]
pub enum ExternalSignature {
    /// The referenced member is a method
    Method(MethodSignature),
    /// The referenced member is a field
    Field(FieldSignature),
}

/// A member of a type that lives outside the modules under edit, e.g.
/// `System.Console::WriteLine` from the runtime library.
///
/// External members are kept as (parent type, name, signature) triples. The transplant
/// engine never copies them; it only retargets the parent's assembly reference when the
/// target module resolves the same simple name to a different assembly identity.
#[derive(Debug, Clone)]
pub struct ExternalMember {
    /// The type declaring the member
    pub parent: TypeReference,
    /// The member name
    pub name: String,
    /// The member signature
    pub signature: ExternalSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_slot_count() {
        let sig = MethodSignature {
            has_this: false,
            return_type: TypeSig::Void,
            params: vec![TypeSig::I4, TypeSig::String],
        };
        assert_eq!(sig.arg_slot_count(), 2);
        assert!(!sig.pushes_return());

        let sig = MethodSignature {
            has_this: true,
            return_type: TypeSig::I4,
            params: vec![],
        };
        assert_eq!(sig.arg_slot_count(), 1);
        assert!(sig.pushes_return());
    }

    #[test]
    fn test_type_sig_is_void() {
        assert!(TypeSig::Void.is_void());
        assert!(!TypeSig::SzArray(Box::new(TypeSig::Void)).is_void());
    }
}
