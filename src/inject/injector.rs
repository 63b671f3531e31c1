//! The worklist-driven graph copier.
//!
//! The injector copies a definition and its full transitive dependency closure from the
//! origin module into the target module. The algorithm is skeleton-first: the moment a
//! definition is discovered, a minimally initialized target twin is allocated and the
//! (source, target) pair is recorded in the context *before* any relation is resolved.
//! Every later path that reaches the same definition (a recursive base type, a method
//! referencing its own declaring type, a mutually recursive pair) resolves to that
//! skeleton through the context instead of recursing, which is what keeps self-referential
//! graphs from looping. A FIFO worklist then drains pending skeletons, populating their
//! relations, transplanting method bodies, applying the behavior policy and committing
//! each definition into the target module.
//!
//! The injector doubles as the reference importer: every cross-module reference
//! encountered during population is intercepted here and redirected into copy-on-demand
//! injection instead of being left pointing at the origin module.

use std::collections::{HashSet, VecDeque};

use crate::{
    inject::{
        behavior::{InjectBehavior, ReferenceRewriter},
        context::InjectContext,
    },
    metadata::{
        event::{EventDef, EventDefRc},
        field::{FieldDef, FieldDefRc},
        member::{
            CustomAttribute, CustomAttributeArg, CustomAttributeNamedArg, MemberDef, MemberKey,
            MemberReference,
        },
        method::{MethodDef, MethodDefRc, MethodDefRef},
        module::ModuleRc,
        property::{PropertyDef, PropertyDefRc},
        signatures::{
            ExternalMember, ExternalSignature, FieldSignature, MethodSignature, PropertySignature,
            TypeSig,
        },
        types::{GenericParam, TypeDef, TypeDefRc, TypeReference},
    },
    Result,
};

/// Attributes of this type are not copied into injected definitions.
const SUPPRESSION_ATTRIBUTE: &str = "System.Diagnostics.CodeAnalysis.SuppressMessageAttribute";

pub(crate) struct Injector<'a> {
    ctx: &'a mut InjectContext,
    behavior: &'a dyn InjectBehavior,
    pending: VecDeque<MemberDef>,
    populated: HashSet<MemberKey>,
    injected: Vec<(MemberDef, MemberDef)>,
}

impl<'a> Injector<'a> {
    pub(crate) fn new(ctx: &'a mut InjectContext, behavior: &'a dyn InjectBehavior) -> Self {
        Injector {
            ctx,
            behavior,
            pending: VecDeque::new(),
            populated: HashSet::new(),
            injected: Vec::new(),
        }
    }

    /// Every (source, target) pair this injector created, in discovery order
    pub(crate) fn into_injected(self) -> Vec<(MemberDef, MemberDef)> {
        self.injected
    }

    /// Inject a method and its dependency closure
    pub(crate) fn inject_method(&mut self, method: &MethodDefRc) -> Result<MethodDefRc> {
        if let Some(mapped) = self.ctx.resolve_method(method) {
            return Ok(mapped);
        }
        let mapped = self.copy_method(method);
        self.drain()?;
        Ok(mapped)
    }

    /// Inject a type with all its declared members, nested types, and the dependency
    /// closure of everything reached from them
    pub(crate) fn inject_type(&mut self, ty: &TypeDefRc) -> Result<TypeDefRc> {
        let mapped = self.seed_type(ty);
        self.drain()?;
        Ok(mapped)
    }

    /// Seed a type and all of its declared members onto the worklist, recursing into
    /// nested types
    fn seed_type(&mut self, ty: &TypeDefRc) -> TypeDefRc {
        let mapped = self.copy_type(ty);
        for (_, method) in ty.methods.iter() {
            self.copy_method(method);
        }
        for (_, field) in ty.fields.iter() {
            self.copy_field(field);
        }
        for (_, event) in ty.events.iter() {
            self.copy_event(event);
        }
        for (_, property) in ty.properties.iter() {
            self.copy_property(property);
        }
        for (_, nested) in ty.nested_types.iter() {
            self.seed_type(nested);
        }
        mapped
    }

    /// Drain the worklist until no definition is pending population
    fn drain(&mut self) -> Result<()> {
        while let Some(member) = self.pending.pop_front() {
            match &member {
                MemberDef::Type(ty) => {
                    self.populate_type(&ty.clone())?;
                }
                MemberDef::Method(method) => {
                    self.populate_method(&method.clone())?;
                }
                MemberDef::Field(field) => {
                    self.populate_field(&field.clone())?;
                }
                MemberDef::Event(event) => {
                    self.populate_event(&event.clone())?;
                }
                MemberDef::Property(property) => {
                    self.populate_property(&property.clone())?;
                }
            }
        }
        Ok(())
    }

    // ── Skeleton allocation ────────────────────────────────────────────────
    //
    // Each copy_* allocates the target twin, records the mapping immediately and
    // enqueues the source for later population. Reaching an already-mapped source
    // returns the existing twin, whatever lifecycle stage it is in.

    fn record_skeleton(&mut self, source: MemberDef, target: MemberDef) {
        self.ctx.record(&source, &target);
        self.injected.push((source.clone(), target));
        self.pending.push_back(source);
    }

    fn copy_member(&mut self, member: &MemberDef) -> MemberDef {
        match member {
            MemberDef::Type(ty) => MemberDef::Type(self.copy_type(ty)),
            MemberDef::Method(method) => MemberDef::Method(self.copy_method(method)),
            MemberDef::Field(field) => MemberDef::Field(self.copy_field(field)),
            MemberDef::Event(event) => MemberDef::Event(self.copy_event(event)),
            MemberDef::Property(property) => MemberDef::Property(self.copy_property(property)),
        }
    }

    fn copy_type(&mut self, source: &TypeDefRc) -> TypeDefRc {
        if let Some(mapped) = self.ctx.resolve_type(source) {
            return mapped;
        }

        let skeleton = TypeDef::new(&source.namespace(), &source.name(), source.flags());
        if let Some(packing_size) = source.packing_size.get() {
            skeleton.packing_size.set(*packing_size).ok();
        }
        if let Some(class_size) = source.class_size.get() {
            skeleton.class_size.set(*class_size).ok();
        }
        clone_generic_params(&source.generic_params, &skeleton.generic_params);

        self.record_skeleton(
            MemberDef::Type(source.clone()),
            MemberDef::Type(skeleton.clone()),
        );

        if source.is_delegate() {
            for (_, method) in source.methods.iter() {
                self.copy_method(method);
            }
        }
        if source.is_enum() {
            // The backing value field of an enum is required
            for (_, field) in source.fields.iter() {
                if !field.is_static() {
                    self.copy_field(field);
                }
            }
        }

        skeleton
    }

    fn copy_method(&mut self, source: &MethodDefRc) -> MethodDefRc {
        if let Some(mapped) = self.ctx.resolve_method(source) {
            return mapped;
        }

        let skeleton = MethodDef::new(&source.name(), source.flags(), source.impl_flags);
        clone_generic_params(&source.generic_params, &skeleton.generic_params);

        self.record_skeleton(
            MemberDef::Method(source.clone()),
            MemberDef::Method(skeleton.clone()),
        );
        skeleton
    }

    fn copy_field(&mut self, source: &FieldDefRc) -> FieldDefRc {
        if let Some(MemberDef::Field(mapped)) = self.ctx.resolve(&MemberDef::Field(source.clone()))
        {
            return mapped;
        }

        let skeleton = FieldDef::new(&source.name(), source.flags());
        self.record_skeleton(
            MemberDef::Field(source.clone()),
            MemberDef::Field(skeleton.clone()),
        );
        skeleton
    }

    fn copy_event(&mut self, source: &EventDefRc) -> EventDefRc {
        if let Some(MemberDef::Event(mapped)) = self.ctx.resolve(&MemberDef::Event(source.clone()))
        {
            return mapped;
        }

        let skeleton = EventDef::new(&source.name(), source.flags());
        self.record_skeleton(
            MemberDef::Event(source.clone()),
            MemberDef::Event(skeleton.clone()),
        );
        skeleton
    }

    fn copy_property(&mut self, source: &PropertyDefRc) -> PropertyDefRc {
        if let Some(MemberDef::Property(mapped)) =
            self.ctx.resolve(&MemberDef::Property(source.clone()))
        {
            return mapped;
        }

        let skeleton = PropertyDef::new(&source.name(), source.flags());
        self.record_skeleton(
            MemberDef::Property(source.clone()),
            MemberDef::Property(skeleton.clone()),
        );

        // A property is only complete with its accessors
        for accessor in source.accessors() {
            self.copy_method(&accessor);
        }

        skeleton
    }

    // ── Population ─────────────────────────────────────────────────────────

    fn populate_type(&mut self, source: &TypeDefRc) -> Result<TypeDefRc> {
        let target = self
            .ctx
            .resolve_type(source)
            .expect("skeleton is recorded before population");
        if !self.populated.insert(MemberDef::Type(source.clone()).key()) {
            return Ok(target);
        }

        if let Some(base) = source.base() {
            target.set_base(self.import_type(&base)?);
        }

        if let Some(declaring) = source.declaring_type() {
            let declaring_target = self.copy_type(&declaring);
            self.populate_type(&declaring)?;
            declaring_target.add_nested_type(&target);
        }

        for (_, interface) in source.interfaces.iter() {
            let imported = self.import_type(interface)?;
            if let Some(def) = imported.as_def() {
                if !def.is_interface() {
                    return Err(resolution_error!(
                        "type {} used as an interface is not an interface",
                        def.fullname()
                    ));
                }
            }
            target.interfaces.push(imported);
        }

        self.import_custom_attributes(&source.custom_attributes, &target.custom_attributes)?;

        let behavior = self.behavior;
        behavior.process_type(source, &target, self)?;

        if !target.is_nested() {
            self.ctx.target().add_type(&target);
        }
        self.ctx.target().issue_token(&MemberDef::Type(target.clone()));
        self.ctx
            .record(&MemberDef::Type(source.clone()), &MemberDef::Type(target.clone()));

        if let Some(constructor) = source.find_default_constructor() {
            self.copy_method(&constructor);
        }
        if let Some(constructor) = source.find_static_constructor() {
            self.copy_method(&constructor);
        }

        Ok(target)
    }

    fn populate_method(&mut self, source: &MethodDefRc) -> Result<MethodDefRc> {
        let target = self
            .ctx
            .resolve_method(source)
            .expect("skeleton is recorded before population");
        if !self
            .populated
            .insert(MemberDef::Method(source.clone()).key())
        {
            return Ok(target);
        }

        if let Some(declaring) = source.declaring_type() {
            let declaring_target = self.import_type_def(&declaring)?;
            declaring_target.add_method(&target);
        }

        if let Some(signature) = source.signature() {
            let signature = signature.clone();
            let imported = self.import_method_signature(&signature)?;
            target.set_signature(imported);
        }

        for (_, param) in source.params.iter() {
            target.params.push(param.clone());
        }

        if let Some(body) = self.transplant_body(source)? {
            target.set_body(body);
        }

        self.import_custom_attributes(&source.custom_attributes, &target.custom_attributes)?;

        let behavior = self.behavior;
        behavior.process_method(source, &target, self)?;

        self.ctx
            .target()
            .issue_token(&MemberDef::Method(target.clone()));
        self.ctx.record(
            &MemberDef::Method(source.clone()),
            &MemberDef::Method(target.clone()),
        );
        Ok(target)
    }

    fn populate_field(&mut self, source: &FieldDefRc) -> Result<FieldDefRc> {
        let mapped = self.ctx.resolve(&MemberDef::Field(source.clone()));
        let Some(MemberDef::Field(target)) = mapped else {
            unreachable!("skeleton is recorded before population");
        };
        if !self.populated.insert(MemberDef::Field(source.clone()).key()) {
            return Ok(target);
        }

        if let Some(declaring) = source.declaring_type() {
            let declaring_target = self.import_type_def(&declaring)?;
            declaring_target.add_field(&target);
        }

        if let Some(signature) = source.signature() {
            let field_type = signature.field_type.clone();
            target.set_signature(FieldSignature {
                field_type: self.import_sig(&field_type)?,
            });
        }

        if let Some(value) = source.initial_value() {
            target.set_initial_value(value.to_vec());
        }

        self.import_custom_attributes(&source.custom_attributes, &target.custom_attributes)?;

        let behavior = self.behavior;
        behavior.process_field(source, &target, self)?;

        self.ctx
            .target()
            .issue_token(&MemberDef::Field(target.clone()));
        self.ctx.record(
            &MemberDef::Field(source.clone()),
            &MemberDef::Field(target.clone()),
        );
        Ok(target)
    }

    fn populate_event(&mut self, source: &EventDefRc) -> Result<EventDefRc> {
        let mapped = self.ctx.resolve(&MemberDef::Event(source.clone()));
        let Some(MemberDef::Event(target)) = mapped else {
            unreachable!("skeleton is recorded before population");
        };
        if !self.populated.insert(MemberDef::Event(source.clone()).key()) {
            return Ok(target);
        }

        if let Some(event_type) = source.event_type() {
            target.set_event_type(self.import_type(&event_type)?);
        }

        if let Some(add) = source.add_method() {
            let copy = self.copy_method(&add);
            target.set_add_method(&copy);
        }
        if let Some(remove) = source.remove_method() {
            let copy = self.copy_method(&remove);
            target.set_remove_method(&copy);
        }
        if let Some(raise) = source.raise_method() {
            let copy = self.copy_method(&raise);
            target.set_raise_method(&copy);
        }
        for (_, other) in source.other_methods.iter() {
            if let Some(other) = other.upgrade() {
                let copy = self.copy_method(&other);
                target.other_methods.push(MethodDefRef::new(&copy));
            }
        }

        if let Some(declaring) = source.declaring_type() {
            let declaring_target = self.import_type_def(&declaring)?;
            declaring_target.add_event(&target);
        }

        self.import_custom_attributes(&source.custom_attributes, &target.custom_attributes)?;

        let behavior = self.behavior;
        behavior.process_event(source, &target, self)?;

        self.ctx
            .target()
            .issue_token(&MemberDef::Event(target.clone()));
        self.ctx.record(
            &MemberDef::Event(source.clone()),
            &MemberDef::Event(target.clone()),
        );
        Ok(target)
    }

    fn populate_property(&mut self, source: &PropertyDefRc) -> Result<PropertyDefRc> {
        let mapped = self.ctx.resolve(&MemberDef::Property(source.clone()));
        let Some(MemberDef::Property(target)) = mapped else {
            unreachable!("skeleton is recorded before population");
        };
        if !self
            .populated
            .insert(MemberDef::Property(source.clone()).key())
        {
            return Ok(target);
        }

        if let Some(signature) = source.signature() {
            let signature = signature.clone();
            let imported = self.import_property_signature(&signature)?;
            target.set_signature(imported);
        }

        for (_, getter) in source.get_methods.iter() {
            if let Some(getter) = getter.upgrade() {
                let copy = self.copy_method(&getter);
                target.get_methods.push(MethodDefRef::new(&copy));
            }
        }
        for (_, setter) in source.set_methods.iter() {
            if let Some(setter) = setter.upgrade() {
                let copy = self.copy_method(&setter);
                target.set_methods.push(MethodDefRef::new(&copy));
            }
        }
        for (_, other) in source.other_methods.iter() {
            if let Some(other) = other.upgrade() {
                let copy = self.copy_method(&other);
                target.other_methods.push(MethodDefRef::new(&copy));
            }
        }

        if let Some(declaring) = source.declaring_type() {
            let declaring_target = self.import_type_def(&declaring)?;
            declaring_target.add_property(&target);
        }

        self.import_custom_attributes(&source.custom_attributes, &target.custom_attributes)?;

        let behavior = self.behavior;
        behavior.process_property(source, &target, self)?;

        self.ctx
            .target()
            .issue_token(&MemberDef::Property(target.clone()));
        self.ctx.record(
            &MemberDef::Property(source.clone()),
            &MemberDef::Property(target.clone()),
        );
        Ok(target)
    }

    // ── Reference import ───────────────────────────────────────────────────

    /// Resolve a type definition into the target module: already-mapped and
    /// target-module definitions pass through, origin-module definitions are copied on
    /// demand.
    pub(crate) fn import_type_def(&mut self, ty: &TypeDefRc) -> Result<TypeDefRc> {
        if let Some(mapped) = self.ctx.resolve_type(ty) {
            return Ok(mapped);
        }
        match MemberDef::Type(ty.clone()).module() {
            Some(module) if module.same_as(self.ctx.origin()) => Ok(self.copy_type(ty)),
            Some(module) if module.same_as(self.ctx.target()) => Ok(ty.clone()),
            _ => Err(resolution_error!(
                "type {} belongs to neither the origin nor the target module",
                ty.fullname()
            )),
        }
    }

    /// Rewrite a type reference so it is valid in the target module.
    ///
    /// External references are retargeted when the target module resolves the same
    /// assembly simple name to a different identity: injected code built against one
    /// version of a library then binds to the version the target already references.
    pub(crate) fn import_type(&mut self, reference: &TypeReference) -> Result<TypeReference> {
        match reference {
            TypeReference::Def(weak) => {
                let def = weak.upgrade().ok_or(crate::Error::DanglingReference)?;
                let imported = self.import_type_def(&def)?;
                Ok(TypeReference::to_def(&imported))
            }
            TypeReference::External(external) => {
                if let Some(target_ref) = self
                    .ctx
                    .target()
                    .assembly_ref_by_name(&external.assembly.name)
                {
                    if target_ref.fullname() != external.assembly.fullname() {
                        let mut fixed = external.clone();
                        fixed.assembly = target_ref;
                        return Ok(TypeReference::External(fixed));
                    }
                }
                Ok(TypeReference::External(external.clone()))
            }
        }
    }

    /// Rewrite a member reference so it is valid in the target module.
    pub(crate) fn import_member(&mut self, reference: &MemberReference) -> Result<MemberReference> {
        match reference {
            MemberReference::Def(weak) => {
                let def = weak.upgrade().ok_or(crate::Error::DanglingReference)?;
                if let Some(mapped) = self.ctx.resolve(&def) {
                    return Ok(MemberReference::to_def(&mapped));
                }
                match def.module() {
                    Some(module) if module.same_as(self.ctx.origin()) => {
                        // A referenced accessor drags its property along so the injected
                        // surface does not end up with orphaned getter/setter methods
                        if let MemberDef::Method(method) = &def {
                            if let Some(declaring) = method.declaring_type() {
                                for (_, property) in declaring.properties.iter() {
                                    if property.has_accessor(method) {
                                        self.copy_property(property);
                                    }
                                }
                            }
                        }
                        let copied = self.copy_member(&def);
                        Ok(MemberReference::to_def(&copied))
                    }
                    Some(module) if module.same_as(self.ctx.target()) => {
                        Ok(reference.clone())
                    }
                    _ => Err(resolution_error!(
                        "member {} belongs to neither the origin nor the target module",
                        def.name()
                    )),
                }
            }
            MemberReference::External(external) => {
                let parent = self.import_type(&external.parent)?;
                Ok(MemberReference::External(ExternalMember {
                    parent,
                    name: external.name.clone(),
                    signature: self.import_external_signature(&external.signature)?,
                }))
            }
        }
    }

    fn import_external_signature(
        &mut self,
        signature: &ExternalSignature,
    ) -> Result<ExternalSignature> {
        Ok(match signature {
            ExternalSignature::Method(method) => {
                ExternalSignature::Method(self.import_method_signature(method)?)
            }
            ExternalSignature::Field(field) => ExternalSignature::Field(FieldSignature {
                field_type: self.import_sig(&field.field_type)?,
            }),
        })
    }

    /// Rewrite every type position inside a signature element.
    pub(crate) fn import_sig(&mut self, sig: &TypeSig) -> Result<TypeSig> {
        Ok(match sig {
            TypeSig::Class(reference) => TypeSig::Class(self.import_type(reference)?),
            TypeSig::ValueType(reference) => TypeSig::ValueType(self.import_type(reference)?),
            TypeSig::SzArray(element) => TypeSig::SzArray(Box::new(self.import_sig(element)?)),
            TypeSig::ByRef(element) => TypeSig::ByRef(Box::new(self.import_sig(element)?)),
            TypeSig::Ptr(element) => TypeSig::Ptr(Box::new(self.import_sig(element)?)),
            other => other.clone(),
        })
    }

    fn import_method_signature(&mut self, signature: &MethodSignature) -> Result<MethodSignature> {
        Ok(MethodSignature {
            has_this: signature.has_this,
            return_type: self.import_sig(&signature.return_type)?,
            params: signature
                .params
                .iter()
                .map(|param| self.import_sig(param))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    fn import_property_signature(
        &mut self,
        signature: &PropertySignature,
    ) -> Result<PropertySignature> {
        Ok(PropertySignature {
            has_this: signature.has_this,
            return_type: self.import_sig(&signature.return_type)?,
            params: signature
                .params
                .iter()
                .map(|param| self.import_sig(param))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    fn import_custom_attributes(
        &mut self,
        source: &boxcar::Vec<CustomAttribute>,
        target: &boxcar::Vec<CustomAttribute>,
    ) -> Result<()> {
        for (_, attribute) in source.iter() {
            // Nobody needs to know about suppressed messages in injected code
            if attribute
                .type_fullname()
                .is_some_and(|name| name == SUPPRESSION_ATTRIBUTE)
            {
                continue;
            }

            let constructor = self.import_member(&attribute.constructor)?;
            let constructor_args = attribute
                .constructor_args
                .iter()
                .map(|arg| self.import_custom_attribute_arg(arg))
                .collect::<Result<Vec<_>>>()?;
            let named_args = attribute
                .named_args
                .iter()
                .map(|named| {
                    Ok(CustomAttributeNamedArg {
                        is_field: named.is_field,
                        name: named.name.clone(),
                        arg: self.import_custom_attribute_arg(&named.arg)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            target.push(CustomAttribute {
                constructor,
                constructor_args,
                named_args,
            });
        }
        Ok(())
    }

    fn import_custom_attribute_arg(
        &mut self,
        arg: &CustomAttributeArg,
    ) -> Result<CustomAttributeArg> {
        Ok(CustomAttributeArg {
            arg_type: self.import_sig(&arg.arg_type)?,
            value: arg.value.clone(),
        })
    }
}

impl ReferenceRewriter for Injector<'_> {
    fn origin_module(&self) -> &ModuleRc {
        self.ctx.origin()
    }

    fn target_module(&self) -> &ModuleRc {
        self.ctx.target()
    }

    fn rewrite_type(&mut self, reference: &TypeReference) -> Result<TypeReference> {
        self.import_type(reference)
    }
}

fn clone_generic_params(
    source: &boxcar::Vec<GenericParam>,
    target: &boxcar::Vec<GenericParam>,
) {
    for (_, param) in source.iter() {
        // Injected generic parameter names are anonymized
        target.push(GenericParam {
            number: param.number,
            flags: param.flags,
            name: "-".to_string(),
        });
    }
}
