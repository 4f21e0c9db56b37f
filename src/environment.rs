use crate::runtime::Value;
use log::trace;
use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    rc::Rc,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("Redeclaration of '{0}'")]
    AlreadyDeclared(String),
    #[error("Scope frame is already borrowed while accessing '{0}'")]
    Borrowed(String),
}

/// A single mutable value cell owned by a frame.
#[derive(Debug, Default)]
pub struct Slot {
    value: RefCell<Value>,
}

impl Slot {
    pub fn new(value: Value) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }
}

struct Frame {
    slots: RefCell<HashMap<String, Rc<Slot>>>,
    // declaration order, for reporting newly bound names
    order: RefCell<Vec<String>>,
    parent: Option<Environment>,
}

/// A handle to one frame of the scope chain. Cloning the handle shares the
/// frame; children hold their parent, never the other way round.
#[derive(Clone)]
pub struct Environment {
    frame: Rc<Frame>,
}

impl Environment {
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<Environment>) -> Self {
        Self {
            frame: Rc::new(Frame {
                slots: RefCell::new(HashMap::new()),
                order: RefCell::new(Vec::new()),
                parent,
            }),
        }
    }

    /// Creates a fresh frame chained to this one.
    pub fn extend(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.frame.parent.as_ref()
    }

    /// Only the current frame matters here, which is what lets a child shadow
    /// an ancestor's name.
    pub fn can_declare(&self, name: &str) -> bool {
        !self.frame.slots.borrow().contains_key(name)
    }

    pub fn declare(&self, name: &str, value: Value) -> Result<Rc<Slot>, ScopeError> {
        let mut slots = self
            .frame
            .slots
            .try_borrow_mut()
            .map_err(|_| ScopeError::Borrowed(name.to_string()))?;

        if slots.contains_key(name) {
            return Err(ScopeError::AlreadyDeclared(name.to_string()));
        }

        trace!("declare {} = {}", name, value);
        let slot = Rc::new(Slot::new(value));
        slots.insert(name.to_string(), slot.clone());
        self.frame.order.borrow_mut().push(name.to_string());

        Ok(slot)
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Slot>> {
        let mut env = Some(self);
        while let Some(current) = env {
            if let Some(slot) = current.frame.slots.borrow().get(name) {
                return Some(slot.clone());
            }
            env = current.parent();
        }
        None
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.lookup(name).map(|slot| slot.get())
    }

    /// Overwrites the nearest existing slot named `name`. Returns false when no
    /// frame in the chain declares it.
    pub fn set(&self, name: &str, value: Value) -> bool {
        match self.lookup(name) {
            Some(slot) => {
                slot.set(value);
                true
            }
            None => false,
        }
    }

    /// Names declared directly in this frame, in declaration order.
    pub fn local_names(&self) -> Vec<String> {
        self.frame.order.borrow().clone()
    }

    /// True when both handles point at the same frame.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }

    /// True when `ancestor` is this frame or one of its parents.
    pub fn is_within(&self, ancestor: &Environment) -> bool {
        let mut env = Some(self);
        while let Some(current) = env {
            if current.ptr_eq(ancestor) {
                return true;
            }
            env = current.parent();
        }
        false
    }

    /// Drops every slot of this frame. A function declared in a frame holds
    /// that frame, so a finished call or block frame must be emptied to be
    /// freed.
    pub fn release(&self) {
        let slots = match self.frame.slots.try_borrow_mut() {
            Ok(mut slots) => std::mem::take(&mut *slots),
            Err(_) => return,
        };
        if let Ok(mut order) = self.frame.order.try_borrow_mut() {
            order.clear();
        }
        trace!("release frame with {} slots", slots.len());

        // dropped after the borrow ends, since values may own other frames
        drop(slots);
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut env = self.parent();
        while let Some(current) = env {
            depth += 1;
            env = current.parent();
        }
        depth
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.frame.order.borrow())
            .field("depth", &self.depth())
            .finish()
    }
}
