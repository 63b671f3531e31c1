//! Event definitions.

use std::sync::{Arc, OnceLock, RwLock, Weak};

use crate::metadata::{
    flags::EventFlags,
    lock_read, lock_write,
    member::CustomAttribute,
    method::{MethodDefRc, MethodDefRef},
    module::Module,
    token::Token,
    types::{TypeDefRc, TypeDefRef, TypeReference},
};

/// A reference counted [`EventDef`]
pub type EventDefRc = Arc<EventDef>;

/// A smart reference to an [`EventDef`] that automatically handles weak references
#[derive(Clone)]
pub struct EventDefRef {
    weak_ref: Weak<EventDef>,
}

impl EventDefRef {
    /// Create a new `EventDefRef` from a strong reference
    pub fn new(strong_ref: &EventDefRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the event, returning None if it has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<EventDefRc> {
        self.weak_ref.upgrade()
    }

    /// Check if the referenced event is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }
}

impl From<EventDefRc> for EventDefRef {
    fn from(strong_ref: EventDefRc) -> Self {
        Self::new(&strong_ref)
    }
}

impl std::fmt::Debug for EventDefRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(e) => write!(f, "EventDefRef({})", e.name()),
            None => write!(f, "EventDefRef(<dropped>)"),
        }
    }
}

/// An event definition with its accessor method wiring.
///
/// Accessor references are weak; the methods themselves are owned by the declaring type's
/// method list.
pub struct EventDef {
    pub(crate) token: OnceLock<Token>,
    name: RwLock<String>,
    flags: RwLock<u32>,
    declaring_type: RwLock<Option<TypeDefRef>>,
    event_type: OnceLock<TypeReference>,
    add_method: OnceLock<MethodDefRef>,
    remove_method: OnceLock<MethodDefRef>,
    raise_method: OnceLock<MethodDefRef>,
    /// Additional accessor methods beyond add/remove/raise
    pub other_methods: Arc<boxcar::Vec<MethodDefRef>>,
    /// All custom attributes attached to this event
    pub custom_attributes: Arc<boxcar::Vec<CustomAttribute>>,
}

impl EventDef {
    /// Create a new event definition skeleton
    #[must_use]
    pub fn new(name: &str, flags: u32) -> EventDefRc {
        Arc::new(EventDef {
            token: OnceLock::new(),
            name: RwLock::new(name.to_string()),
            flags: RwLock::new(flags),
            declaring_type: RwLock::new(None),
            event_type: OnceLock::new(),
            add_method: OnceLock::new(),
            remove_method: OnceLock::new(),
            raise_method: OnceLock::new(),
            other_methods: Arc::new(boxcar::Vec::new()),
            custom_attributes: Arc::new(boxcar::Vec::new()),
        })
    }

    /// The token issued by the owning module, if the event has been committed
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        self.token.get().copied()
    }

    /// The event name
    #[must_use]
    pub fn name(&self) -> String {
        lock_read(&self.name).clone()
    }

    /// Rename the event
    pub fn set_name(&self, name: &str) {
        *lock_write(&self.name) = name.to_string();
    }

    /// The raw attribute flags
    #[must_use]
    pub fn flags(&self) -> u32 {
        *lock_read(&self.flags)
    }

    /// Whether the event name is special
    #[must_use]
    pub fn is_special_name(&self) -> bool {
        EventFlags::from_bits_truncate(self.flags()).contains(EventFlags::SPECIAL_NAME)
    }

    /// The delegate type of the event, once populated
    #[must_use]
    pub fn event_type(&self) -> Option<TypeReference> {
        self.event_type.get().cloned()
    }

    /// Set the delegate type. Only the first call has an effect.
    pub fn set_event_type(&self, event_type: TypeReference) {
        self.event_type.set(event_type).ok();
    }

    /// The `add` accessor, if wired and alive
    #[must_use]
    pub fn add_method(&self) -> Option<MethodDefRc> {
        self.add_method.get().and_then(MethodDefRef::upgrade)
    }

    /// Wire the `add` accessor. Only the first call has an effect.
    pub fn set_add_method(&self, method: &MethodDefRc) {
        self.add_method.set(MethodDefRef::new(method)).ok();
    }

    /// The `remove` accessor, if wired and alive
    #[must_use]
    pub fn remove_method(&self) -> Option<MethodDefRc> {
        self.remove_method.get().and_then(MethodDefRef::upgrade)
    }

    /// Wire the `remove` accessor. Only the first call has an effect.
    pub fn set_remove_method(&self, method: &MethodDefRc) {
        self.remove_method.set(MethodDefRef::new(method)).ok();
    }

    /// The `raise` accessor, if wired and alive
    #[must_use]
    pub fn raise_method(&self) -> Option<MethodDefRc> {
        self.raise_method.get().and_then(MethodDefRef::upgrade)
    }

    /// Wire the `raise` accessor. Only the first call has an effect.
    pub fn set_raise_method(&self, method: &MethodDefRc) {
        self.raise_method.set(MethodDefRef::new(method)).ok();
    }

    /// All wired accessors that are still alive
    #[must_use]
    pub fn accessors(&self) -> Vec<MethodDefRc> {
        let mut accessors = Vec::new();
        accessors.extend(self.add_method());
        accessors.extend(self.remove_method());
        accessors.extend(self.raise_method());
        accessors.extend(
            self.other_methods
                .iter()
                .filter_map(|(_, m)| m.upgrade()),
        );
        accessors
    }

    /// The declaring type, once the event is attached to one
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        lock_read(&self.declaring_type)
            .as_ref()
            .and_then(TypeDefRef::upgrade)
    }

    /// Attach the event to a declaring type (or detach it with `None`)
    pub fn set_declaring_type(&self, declaring: Option<&TypeDefRc>) {
        *lock_write(&self.declaring_type) = declaring.map(TypeDefRef::new);
    }

    /// The module owning this event, through its declaring type
    #[must_use]
    pub fn module(&self) -> Option<Arc<Module>> {
        self.declaring_type().and_then(|t| t.module())
    }
}

impl std::fmt::Debug for EventDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDef")
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
    fn test_accessor_wiring() {
        let e = EventDef::new("Changed", 0);
        let add = MethodDef::new("add_Changed", 0, 0);
        let remove = MethodDef::new("remove_Changed", 0, 0);
        e.set_add_method(&add);
        e.set_remove_method(&remove);
        assert_eq!(e.accessors().len(), 2);
        assert_eq!(e.add_method().unwrap().name(), "add_Changed");
    }

    #[test]
    fn test_accessor_weakness() {
        let e = EventDef::new("Changed", 0);
        {
            let add = MethodDef::new("add_Changed", 0, 0);
            e.set_add_method(&add);
        }
        // Accessor dropped, the weak wiring must not keep it alive
        assert!(e.add_method().is_none());
        assert!(e.accessors().is_empty());
    }
}
