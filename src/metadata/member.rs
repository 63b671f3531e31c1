//! Kind-erased member handles and identity keys.
//!
//! The transplant engine works uniformly over all five definition kinds: its worklist,
//! its mapping store and its result sets all hold [`MemberDef`] values. Identity is `Arc`
//! pointer identity, surfaced as an explicit [`MemberKey`] so maps never depend on names or
//! tokens: the same source definition always yields the same key no matter how it was
//! reached.

use std::sync::Arc;

use strum::Display;

use crate::metadata::{
    event::{EventDefRc, EventDefRef},
    field::{FieldDefRc, FieldDefRef},
    method::{MethodDefRc, MethodDefRef},
    module::Module,
    property::{PropertyDefRc, PropertyDefRef},
    signatures::{ExternalMember, TypeSig},
    token::Token,
    types::{TypeDefRc, TypeDefRef},
};

/// The kind of a definition node.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// A type definition
    Type,
    /// A method definition
    Method,
    /// A field definition
    Field,
    /// An event definition
    Event,
    /// A property definition
    Property,
}

impl MemberKind {
    /// The metadata table tag used for tokens of this kind
    #[must_use]
    pub fn table_tag(self) -> u8 {
        match self {
            MemberKind::Type => 0x02,
            MemberKind::Field => 0x04,
            MemberKind::Method => 0x06,
            MemberKind::Event => 0x14,
            MemberKind::Property => 0x17,
        }
    }
}

/// Identity key of a definition: the address of its `Arc` allocation.
///
/// Stable for as long as the definition is alive; never reused while any strong or weak
/// reference exists. Keys from definitions of different kinds never collide because the
/// allocations are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberKey(usize);

/// A strong, kind-erased handle on a definition.
#[derive(Clone)]
pub enum MemberDef {
    /// A type definition
    Type(TypeDefRc),
    /// A method definition
    Method(MethodDefRc),
    /// A field definition
    Field(FieldDefRc),
    /// An event definition
    Event(EventDefRc),
    /// A property definition
    Property(PropertyDefRc),
}

impl MemberDef {
    /// The kind of this definition
    #[must_use]
    pub fn kind(&self) -> MemberKind {
        match self {
            MemberDef::Type(_) => MemberKind::Type,
            MemberDef::Method(_) => MemberKind::Method,
            MemberDef::Field(_) => MemberKind::Field,
            MemberDef::Event(_) => MemberKind::Event,
            MemberDef::Property(_) => MemberKind::Property,
        }
    }

    /// The identity key of this definition
    #[must_use]
    pub fn key(&self) -> MemberKey {
        let addr = match self {
            MemberDef::Type(t) => Arc::as_ptr(t) as usize,
            MemberDef::Method(m) => Arc::as_ptr(m) as usize,
            MemberDef::Field(f) => Arc::as_ptr(f) as usize,
            MemberDef::Event(e) => Arc::as_ptr(e) as usize,
            MemberDef::Property(p) => Arc::as_ptr(p) as usize,
        };
        MemberKey(addr)
    }

    /// The definition name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            MemberDef::Type(t) => t.name(),
            MemberDef::Method(m) => m.name(),
            MemberDef::Field(f) => f.name(),
            MemberDef::Event(e) => e.name(),
            MemberDef::Property(p) => p.name(),
        }
    }

    /// The token issued by the owning module, if committed
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match self {
            MemberDef::Type(t) => t.token(),
            MemberDef::Method(m) => m.token(),
            MemberDef::Field(f) => f.token(),
            MemberDef::Event(e) => e.token(),
            MemberDef::Property(p) => p.token(),
        }
    }

    /// The module this definition belongs to, resolved through the declaring chain
    #[must_use]
    pub fn module(&self) -> Option<Arc<Module>> {
        match self {
            MemberDef::Type(t) => t.module().or_else(|| {
                t.declaring_type()
                    .and_then(|d| MemberDef::Type(d).module())
            }),
            MemberDef::Method(m) => m.module(),
            MemberDef::Field(f) => f.module(),
            MemberDef::Event(e) => e.module(),
            MemberDef::Property(p) => p.module(),
        }
    }

    /// This definition as a type, if it is one
    #[must_use]
    pub fn as_type(&self) -> Option<&TypeDefRc> {
        match self {
            MemberDef::Type(t) => Some(t),
            _ => None,
        }
    }

    /// This definition as a method, if it is one
    #[must_use]
    pub fn as_method(&self) -> Option<&MethodDefRc> {
        match self {
            MemberDef::Method(m) => Some(m),
            _ => None,
        }
    }

    /// This definition as a field, if it is one
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldDefRc> {
        match self {
            MemberDef::Field(f) => Some(f),
            _ => None,
        }
    }

    /// Downgrade to a weak handle
    #[must_use]
    pub fn downgrade(&self) -> MemberRef {
        match self {
            MemberDef::Type(t) => MemberRef::Type(TypeDefRef::new(t)),
            MemberDef::Method(m) => MemberRef::Method(MethodDefRef::new(m)),
            MemberDef::Field(f) => MemberRef::Field(FieldDefRef::new(f)),
            MemberDef::Event(e) => MemberRef::Event(EventDefRef::new(e)),
            MemberDef::Property(p) => MemberRef::Property(PropertyDefRef::new(p)),
        }
    }

    /// Whether this and `other` are the same definition
    #[must_use]
    pub fn same_as(&self, other: &MemberDef) -> bool {
        self.key() == other.key()
    }
}

impl std::fmt::Debug for MemberDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemberDef::{}({})", self.kind(), self.name())
    }
}

impl From<TypeDefRc> for MemberDef {
    fn from(value: TypeDefRc) -> Self {
        MemberDef::Type(value)
    }
}

impl From<MethodDefRc> for MemberDef {
    fn from(value: MethodDefRc) -> Self {
        MemberDef::Method(value)
    }
}

impl From<FieldDefRc> for MemberDef {
    fn from(value: FieldDefRc) -> Self {
        MemberDef::Field(value)
    }
}

impl From<EventDefRc> for MemberDef {
    fn from(value: EventDefRc) -> Self {
        MemberDef::Event(value)
    }
}

impl From<PropertyDefRc> for MemberDef {
    fn from(value: PropertyDefRc) -> Self {
        MemberDef::Property(value)
    }
}

/// A weak, kind-erased handle on a definition.
///
/// Instruction operands and accessor wiring hold these so bodies referencing their own
/// declaring type (or methods referencing themselves) do not create reference cycles.
#[derive(Clone)]
pub enum MemberRef {
    /// A weak type reference
    Type(TypeDefRef),
    /// A weak method reference
    Method(MethodDefRef),
    /// A weak field reference
    Field(FieldDefRef),
    /// A weak event reference
    Event(EventDefRef),
    /// A weak property reference
    Property(PropertyDefRef),
}

impl MemberRef {
    /// Upgrade to a strong handle, returning None if the definition has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<MemberDef> {
        match self {
            MemberRef::Type(t) => t.upgrade().map(MemberDef::Type),
            MemberRef::Method(m) => m.upgrade().map(MemberDef::Method),
            MemberRef::Field(f) => f.upgrade().map(MemberDef::Field),
            MemberRef::Event(e) => e.upgrade().map(MemberDef::Event),
            MemberRef::Property(p) => p.upgrade().map(MemberDef::Property),
        }
    }
}

impl std::fmt::Debug for MemberRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(def) => write!(f, "MemberRef::{}({})", def.kind(), def.name()),
            None => write!(f, "MemberRef(<dropped>)"),
        }
    }
}

/// A member position in instruction operands and custom-attribute constructors: either a
/// definition in a module under edit, or a member of a foreign assembly.
#[derive(Debug, Clone)]
pub enum MemberReference {
    /// A definition in a module under edit
    Def(MemberRef),
    /// A member of a foreign assembly
    External(ExternalMember),
}

impl MemberReference {
    /// Build a `Def` reference from a strong definition handle
    #[must_use]
    pub fn to_def(member: &MemberDef) -> Self {
        MemberReference::Def(member.downgrade())
    }

    /// Resolve to a strong definition handle, if this references one that is still alive
    #[must_use]
    pub fn as_def(&self) -> Option<MemberDef> {
        match self {
            MemberReference::Def(weak) => weak.upgrade(),
            MemberReference::External(_) => None,
        }
    }
}

/// A constant argument value inside a custom attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomAttributeValue {
    /// Boolean constant
    Bool(bool),
    /// 32-bit integer constant
    I4(i32),
    /// 64-bit integer constant
    I8(i64),
    /// Floating point constant
    R8(f64),
    /// String constant
    Str(String),
    /// Serialized type name
    TypeName(String),
}

/// A positional custom-attribute argument: a typed constant.
#[derive(Debug, Clone)]
pub struct CustomAttributeArg {
    /// The argument type (rewritten on import)
    pub arg_type: TypeSig,
    /// The constant value
    pub value: CustomAttributeValue,
}

/// A named custom-attribute argument targeting a field or property of the attribute type.
#[derive(Debug, Clone)]
pub struct CustomAttributeNamedArg {
    /// Targets a field when true, a property otherwise
    pub is_field: bool,
    /// Name of the targeted field or property
    pub name: String,
    /// The argument itself
    pub arg: CustomAttributeArg,
}

/// A custom attribute attached to a definition.
#[derive(Debug, Clone)]
pub struct CustomAttribute {
    /// The attribute constructor
    pub constructor: MemberReference,
    /// Positional constructor arguments
    pub constructor_args: Vec<CustomAttributeArg>,
    /// Named field/property arguments
    pub named_args: Vec<CustomAttributeNamedArg>,
}

impl CustomAttribute {
    /// Full name of the attribute type, resolved through the constructor parent
    #[must_use]
    pub fn type_fullname(&self) -> Option<String> {
        match &self.constructor {
            MemberReference::Def(weak) => weak
                .upgrade()?
                .as_method()?
                .declaring_type()
                .map(|t| t.fullname()),
            MemberReference::External(ext) => ext.parent.fullname(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{field::FieldDef, method::MethodDef, types::TypeDef};

    #[test]
    fn test_member_key_identity() {
        let a = TypeDef::new("N", "A", 0);
        let b = TypeDef::new("N", "A", 0);

        let def_a1 = MemberDef::Type(a.clone());
        let def_a2 = MemberDef::Type(a.clone());
        let def_b = MemberDef::Type(b);

        assert_eq!(def_a1.key(), def_a2.key());
        assert_ne!(def_a1.key(), def_b.key());
        assert!(def_a1.same_as(&def_a2));
    }

    #[test]
    fn test_kind_and_table_tag() {
        let m = MemberDef::Method(MethodDef::new("Run", 0, 0));
        assert_eq!(m.kind(), MemberKind::Method);
        assert_eq!(m.kind().table_tag(), 0x06);
        assert_eq!(MemberKind::Property.table_tag(), 0x17);
    }

    #[test]
    fn test_downgrade_upgrade_round_trip() {
        let f = FieldDef::new("counter", 0);
        let def = MemberDef::Field(f);
        let weak = def.downgrade();
        let back = weak.upgrade().unwrap();
        assert!(back.same_as(&def));
    }

    #[test]
    fn test_weak_ref_drops() {
        let weak = {
            let m = MethodDef::new("Run", 0, 0);
            MemberDef::Method(m).downgrade()
        };
        assert!(weak.upgrade().is_none());
    }
}
