//! Method body representation.
//!
//! A [`CilBody`] owns an ordered instruction sequence, its local variable slots, its
//! exception handler regions and an optional debug scope tree, plus the init-locals flag
//! and max-stack hint every body carries. All cross-references inside a body (branch
//! operands, region boundaries, scope boundaries, local operands) are expressed through
//! the stable [`InstrId`]/[`LocalId`] identities, never through positions, so reordering
//! the sequence does not invalidate them.

use crate::{
    assembly::{
        exceptions::ExceptionHandler,
        instruction::{InstrId, Instruction, LocalId},
        scope::LocalScope,
    },
    metadata::signatures::TypeSig,
};

/// A local variable slot of a method body.
#[derive(Debug)]
pub struct Local {
    id: LocalId,
    /// Debug name, if any
    pub name: Option<String>,
    /// The variable type
    pub local_type: TypeSig,
    /// Whether the object the variable points at is pinned
    pub is_pinned: bool,
}

impl Local {
    /// Create a new local slot with a fresh id
    #[must_use]
    pub fn new(local_type: TypeSig) -> Self {
        Local {
            id: LocalId::next(),
            name: None,
            local_type,
            is_pinned: false,
        }
    }

    /// Create a new named local slot with a fresh id
    #[must_use]
    pub fn named(local_type: TypeSig, name: &str) -> Self {
        Local {
            id: LocalId::next(),
            name: Some(name.to_string()),
            local_type,
            is_pinned: false,
        }
    }

    /// The stable id of this slot
    #[must_use]
    pub fn id(&self) -> LocalId {
        self.id
    }

    /// Duplicate type, name and pinning under a fresh id
    #[must_use]
    pub fn copy_with_fresh_id(&self) -> Local {
        Local {
            id: LocalId::next(),
            name: self.name.clone(),
            local_type: self.local_type.clone(),
            is_pinned: self.is_pinned,
        }
    }
}

/// The instruction-level body of a method.
pub struct CilBody {
    instructions: Vec<Instruction>,
    /// Local variable slots, in signature order
    pub locals: Vec<Local>,
    /// Exception handler regions
    pub exception_handlers: Vec<ExceptionHandler>,
    /// Root of the lexical debug scope tree, if debug information is present
    pub scope: Option<LocalScope>,
    /// Whether locals are zero-initialized on entry
    pub init_locals: bool,
    /// Maximum operand stack depth hint
    pub max_stack: u16,
}

impl CilBody {
    /// Create a new empty body
    #[must_use]
    pub fn new() -> Self {
        CilBody {
            instructions: Vec::new(),
            locals: Vec::new(),
            exception_handlers: Vec::new(),
            scope: None,
            init_locals: true,
            max_stack: 8,
        }
    }

    /// The instruction sequence, in execution order
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the body has no instructions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Append an instruction, returning its id
    pub fn push(&mut self, instruction: Instruction) -> InstrId {
        let id = instruction.id();
        self.instructions.push(instruction);
        id
    }

    /// Position of an instruction in the sequence
    #[must_use]
    pub fn index_of(&self, id: InstrId) -> Option<usize> {
        self.instructions.iter().position(|i| i.id() == id)
    }

    /// Whether the body contains the instruction
    #[must_use]
    pub fn contains(&self, id: InstrId) -> bool {
        self.index_of(id).is_some()
    }

    /// Look up an instruction by id
    #[must_use]
    pub fn instruction(&self, id: InstrId) -> Option<&Instruction> {
        self.instructions.iter().find(|i| i.id() == id)
    }

    /// Mutable lookup of an instruction by id
    pub fn instruction_mut(&mut self, id: InstrId) -> Option<&mut Instruction> {
        self.instructions.iter_mut().find(|i| i.id() == id)
    }

    pub(crate) fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    /// Add a local variable slot, returning its id
    pub fn add_local(&mut self, local: Local) -> LocalId {
        let id = local.id();
        self.locals.push(local);
        id
    }

    /// Look up a local slot by id
    #[must_use]
    pub fn local(&self, id: LocalId) -> Option<&Local> {
        self.locals.iter().find(|l| l.id() == id)
    }

    /// Position of a local slot in the locals list
    #[must_use]
    pub fn local_index(&self, id: LocalId) -> Option<usize> {
        self.locals.iter().position(|l| l.id() == id)
    }

    /// Visit every scope in the debug scope tree, depth first
    pub fn for_each_scope_mut<F: FnMut(&mut LocalScope)>(&mut self, f: &mut F) {
        if let Some(root) = &mut self.scope {
            root.for_each_mut(f);
        }
    }
}

impl Default for CilBody {
    fn default() -> Self {
        CilBody::new()
    }
}

impl std::fmt::Debug for CilBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "CilBody (locals: {}, handlers: {}, max_stack: {}, init_locals: {})",
            self.locals.len(),
            self.exception_handlers.len(),
            self.max_stack,
            self.init_locals
        )?;
        for instruction in &self.instructions {
            writeln!(f, "  {instruction:?}")?;
        }
        Ok(())
    }
}
