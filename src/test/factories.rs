//! Factory helpers building small definition graphs for tests.

use crate::{
    assembly::{CilBody, Immediate, Instruction, Operand, opcodes},
    metadata::{
        flags::{MethodAccessFlags, MethodModifiers, TypeVisibility},
        member::MemberDef,
        method::{MethodDef, MethodDefRc},
        module::{AssemblyRef, Module, ModuleRc},
        signatures::{MethodSignature, TypeSig},
        types::{ExternalTypeRef, TypeDef, TypeDefRc, TypeReference},
    },
};

/// An external type reference into a synthetic `mscorlib`
pub(crate) fn external_type_ref(namespace: &str, name: &str) -> ExternalTypeRef {
    ExternalTypeRef {
        assembly: AssemblyRef::new("mscorlib", [4, 0, 0, 0]),
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

/// `System.Object` as a base-type reference
pub(crate) fn system_object() -> TypeReference {
    TypeReference::External(external_type_ref("System", "Object"))
}

/// A committed public type inside `module`
pub(crate) fn committed_type(module: &ModuleRc, namespace: &str, name: &str) -> TypeDefRc {
    let ty = TypeDef::new(namespace, name, TypeVisibility::PUBLIC.bits());
    ty.set_base(system_object());
    module.add_type(&ty);
    module.issue_token(&MemberDef::Type(ty.clone()));
    ty
}

/// A static method `fn(): i4 => 42` attached to `declaring`
pub(crate) fn static_method(declaring: &TypeDefRc, name: &str) -> MethodDefRc {
    let method = MethodDef::new(
        name,
        MethodAccessFlags::PUBLIC.bits() | MethodModifiers::STATIC.bits(),
        0,
    );
    method.set_signature(MethodSignature {
        has_this: false,
        return_type: TypeSig::I4,
        params: vec![],
    });

    let mut body = CilBody::new();
    body.push(Instruction::new(
        opcodes::LDC_I4,
        Operand::Immediate(Immediate::Int32(42)),
    ));
    body.push(Instruction::new(opcodes::RET, Operand::None));
    method.set_body(body);

    declaring.add_method(&method);
    method
}

/// An origin module with one helper type carrying one static method
pub(crate) fn origin_with_static_method() -> (ModuleRc, TypeDefRc, MethodDefRc) {
    let origin = Module::new("payload.dll");
    let helpers = committed_type(&origin, "Payload", "Helpers");
    let method = static_method(&helpers, "Answer");
    (origin, helpers, method)
}
