//! Modules: the containers owning definition graphs.
//!
//! A [`Module`] owns its top-level types (which in turn own their members), issues stable
//! [`Token`] identities for committed definitions, and resolves foreign assembly references
//! by simple name. The synthetic `<Module>` global type is created with the module and
//! receives module-level (static) methods injected without their declaring type.
//!
//! All container state is interior-mutable behind concurrent collections, so a `Module` is
//! only ever handled as [`ModuleRc`] and never needs `&mut`.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, OnceLock,
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use uguid::Guid;

use crate::metadata::{
    member::{MemberDef, MemberKind},
    token::Token,
    types::{TypeDef, TypeDefRc},
};

/// A reference counted [`Module`]
pub type ModuleRc = Arc<Module>;

/// A reference counted [`AssemblyRef`]
pub type AssemblyRefRc = Arc<AssemblyRef>;

/// A reference to a foreign assembly, identified by simple name plus version identity.
#[derive(Debug, Clone)]
pub struct AssemblyRef {
    /// The simple name, e.g. `System.Runtime`
    pub name: String,
    /// Major, minor, build, revision
    pub version: [u16; 4],
    /// The public key token, if the assembly is strong-named
    pub public_key_token: Option<[u8; 8]>,
    /// The culture, if not neutral
    pub culture: Option<String>,
}

impl AssemblyRef {
    /// Create a new assembly reference
    #[must_use]
    pub fn new(name: &str, version: [u16; 4]) -> AssemblyRefRc {
        Arc::new(AssemblyRef {
            name: name.to_string(),
            version,
            public_key_token: None,
            culture: None,
        })
    }

    /// The full display identity (name, version, culture, public key token)
    #[must_use]
    pub fn fullname(&self) -> String {
        let culture = self.culture.as_deref().unwrap_or("neutral");
        let token = match &self.public_key_token {
            Some(bytes) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
            None => "null".to_string(),
        };
        format!(
            "{}, Version={}.{}.{}.{}, Culture={}, PublicKeyToken={}",
            self.name,
            self.version[0],
            self.version[1],
            self.version[2],
            self.version[3],
            culture,
            token
        )
    }
}

/// A module of compiled definitions: the container both ends of a transplant operate on.
pub struct Module {
    /// The module name, e.g. `payload.dll`
    pub name: String,
    /// The module version id
    pub mvid: Guid,
    types: boxcar::Vec<TypeDefRc>,
    global_type: OnceLock<TypeDefRc>,
    members: SkipMap<Token, MemberDef>,
    assembly_refs: DashMap<String, AssemblyRefRc>,
    next_rids: [AtomicU32; 5],
}

fn kind_index(kind: MemberKind) -> usize {
    match kind {
        MemberKind::Type => 0,
        MemberKind::Method => 1,
        MemberKind::Field => 2,
        MemberKind::Event => 3,
        MemberKind::Property => 4,
    }
}

/// Derive a deterministic MVID from the module name and a process-wide counter.
fn derive_mvid(name: &str) -> Guid {
    use std::hash::{Hash, Hasher};
    static NEXT: AtomicU32 = AtomicU32::new(1);

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    name.hash(&mut hasher);
    let hash = hasher.finish();
    let salt = NEXT.fetch_add(1, Ordering::Relaxed);

    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&hash.to_le_bytes());
    bytes[8..12].copy_from_slice(&salt.to_le_bytes());
    bytes[12..].copy_from_slice(&(name.len() as u32).to_le_bytes());
    Guid::from_bytes(bytes)
}

impl Module {
    /// Create a new empty module.
    ///
    /// The synthetic `<Module>` global type is created and committed immediately.
    #[must_use]
    pub fn new(name: &str) -> ModuleRc {
        let module = Arc::new(Module {
            name: name.to_string(),
            mvid: derive_mvid(name),
            types: boxcar::Vec::new(),
            global_type: OnceLock::new(),
            members: SkipMap::new(),
            assembly_refs: DashMap::new(),
            next_rids: Default::default(),
        });

        let global = TypeDef::new("", "<Module>", 0);
        module.issue_token(&MemberDef::Type(global.clone()));
        module.types.push(global.clone());
        module.global_type.set(global).ok();
        module
    }

    /// The synthetic `<Module>` type holding module-level members
    #[must_use]
    pub fn global_type(&self) -> &TypeDefRc {
        self.global_type
            .get()
            .expect("global type is created with the module")
    }

    /// The top-level types of this module, including the global type
    #[must_use]
    pub fn types(&self) -> &boxcar::Vec<TypeDefRc> {
        &self.types
    }

    /// Add a top-level type to this module.
    ///
    /// The type keeps whatever token it already has; committing it is a separate
    /// [`Module::issue_token`] step, mirroring the two-phase add-then-identify contract.
    pub fn add_type(&self, ty: &TypeDefRc) {
        self.types.push(ty.clone());
    }

    /// Issue a stable identity for a definition committed to this module.
    ///
    /// Allocates the next row in the table matching the definition kind, stamps the token
    /// onto the definition, registers it in the token registry and (for types) records the
    /// owning-module backlink. A definition that already carries a token keeps it, making
    /// the operation idempotent.
    pub fn issue_token(self: &Arc<Self>, member: &MemberDef) -> Token {
        if let Some(existing) = member.token() {
            return existing;
        }

        let kind = member.kind();
        let rid = self.next_rids[kind_index(kind)].fetch_add(1, Ordering::Relaxed) + 1;
        let token = Token::from_parts(kind.table_tag(), rid);

        match member {
            MemberDef::Type(t) => {
                t.token.set(token).ok();
                t.module.set(Arc::downgrade(self)).ok();
            }
            MemberDef::Method(m) => {
                m.token.set(token).ok();
            }
            MemberDef::Field(f) => {
                f.token.set(token).ok();
            }
            MemberDef::Event(e) => {
                e.token.set(token).ok();
            }
            MemberDef::Property(p) => {
                p.token.set(token).ok();
            }
        }

        self.members.insert(token, member.clone());
        token
    }

    /// Look up a committed definition by its token
    #[must_use]
    pub fn member_by_token(&self, token: Token) -> Option<MemberDef> {
        self.members.get(&token).map(|entry| entry.value().clone())
    }

    /// Number of definitions committed to this module
    #[must_use]
    pub fn definition_count(&self) -> usize {
        self.members.len()
    }

    /// Number of committed definitions of the given kind
    #[must_use]
    pub fn definition_count_of(&self, kind: MemberKind) -> usize {
        self.next_rids[kind_index(kind)].load(Ordering::Relaxed) as usize
    }

    /// Whether a type with the given full name exists in this module, optionally searching
    /// nested types
    #[must_use]
    pub fn has_type_named(&self, fullname: &str, include_nested: bool) -> bool {
        fn search(types: &boxcar::Vec<TypeDefRc>, fullname: &str, nested: bool) -> bool {
            types.iter().any(|(_, ty)| {
                ty.fullname() == fullname
                    || (nested && search(&ty.nested_types, fullname, nested))
            })
        }
        search(&self.types, fullname, include_nested)
    }

    /// Register a foreign assembly reference, keyed by simple name
    pub fn add_assembly_ref(&self, assembly_ref: &AssemblyRefRc) {
        self.assembly_refs
            .insert(assembly_ref.name.clone(), assembly_ref.clone());
    }

    /// Resolve a foreign assembly reference by simple name
    #[must_use]
    pub fn assembly_ref_by_name(&self, name: &str) -> Option<AssemblyRefRc> {
        self.assembly_refs.get(name).map(|entry| entry.value().clone())
    }

    /// Whether this and `other` are the same module instance
    #[must_use]
    pub fn same_as(self: &Arc<Self>, other: &Arc<Self>) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("mvid", &self.mvid)
            .field("types", &self.types.count())
            .field("definitions", &self.members.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::method::MethodDef;

    #[test]
    fn test_new_module_has_global_type() {
        let module = Module::new("test.dll");
        assert_eq!(module.global_type().name(), "<Module>");
        assert_eq!(module.types().count(), 1);
        assert_eq!(module.definition_count(), 1);
        assert!(module.global_type().module().unwrap().same_as(&module));
    }

    #[test]
    fn test_issue_token_is_idempotent_and_sequential() {
        let module = Module::new("test.dll");
        let a = MemberDef::Type(TypeDef::new("N", "A", 0));
        let b = MemberDef::Type(TypeDef::new("N", "B", 0));

        let token_a = module.issue_token(&a);
        let token_b = module.issue_token(&b);
        assert_eq!(token_a.table(), 0x02);
        // Row 1 went to the global type
        assert_eq!(token_a.row(), 2);
        assert_eq!(token_b.row(), 3);

        // Re-issuing keeps the original identity
        assert_eq!(module.issue_token(&a), token_a);
        assert_eq!(module.definition_count_of(MemberKind::Type), 3);
    }

    #[test]
    fn test_tokens_partition_by_kind() {
        let module = Module::new("test.dll");
        let ty = MemberDef::Type(TypeDef::new("N", "A", 0));
        let method = MemberDef::Method(MethodDef::new("Run", 0, 0));

        let type_token = module.issue_token(&ty);
        let method_token = module.issue_token(&method);
        assert_eq!(type_token.table(), 0x02);
        assert_eq!(method_token.table(), 0x06);
        assert_eq!(method_token.row(), 1);

        assert!(module.member_by_token(method_token).unwrap().same_as(&method));
    }

    #[test]
    fn test_has_type_named() {
        let module = Module::new("test.dll");
        let outer = TypeDef::new("My.Ns", "Outer", 0);
        let inner = TypeDef::new("", "Inner", 0);
        outer.add_nested_type(&inner);
        module.add_type(&outer);

        assert!(module.has_type_named("My.Ns.Outer", false));
        assert!(!module.has_type_named("Inner", false));
        assert!(module.has_type_named("Inner", true));
        assert!(!module.has_type_named("My.Ns.Missing", true));
    }

    #[test]
    fn test_assembly_ref_lookup() {
        let module = Module::new("test.dll");
        let mscorlib = AssemblyRef::new("mscorlib", [4, 0, 0, 0]);
        module.add_assembly_ref(&mscorlib);

        assert!(module.assembly_ref_by_name("mscorlib").is_some());
        assert!(module.assembly_ref_by_name("System.Core").is_none());
    }

    #[test]
    fn test_distinct_mvids() {
        let a = Module::new("a.dll");
        let b = Module::new("a.dll");
        assert_ne!(a.mvid, b.mvid);
    }
}
