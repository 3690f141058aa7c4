#![forbid(unsafe_code)]

//! Reversible handles returned by every mutating or subscribing call.
//!
//! A [`Registration`] undoes the thing that produced it when `remove` is
//! called. Dropping a registration without calling `remove` keeps the effect
//! in place, so callers that never intend to undo can simply ignore it.

use std::cell::RefCell;
use std::fmt;

use crate::observable::Subscription;

/// A handle that undoes one registration or mutation.
#[must_use = "dropping a Registration keeps the effect; call remove() to undo it"]
pub struct Registration {
    remover: Option<Box<dyn FnOnce()>>,
}

impl Registration {
    /// Build a registration from its undo action.
    pub fn new(remover: impl FnOnce() + 'static) -> Self {
        Self {
            remover: Some(Box::new(remover)),
        }
    }

    /// A registration whose removal does nothing.
    pub fn empty() -> Self {
        Self { remover: None }
    }

    /// Tie an observable subscription to a registration.
    pub fn from_subscription(subscription: Subscription) -> Self {
        Self::new(move || drop(subscription))
    }

    /// Whether removing this registration is a no-op.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remover.is_none()
    }

    /// Undo the registration.
    pub fn remove(mut self) {
        if let Some(remover) = self.remover.take() {
            remover();
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("empty", &self.is_empty())
            .finish()
    }
}

impl Default for Registration {
    fn default() -> Self {
        Self::empty()
    }
}

/// A group of registrations removed together, newest first.
///
/// Removal is idempotent: the entries are taken out before they run, so a
/// second `remove` (even one triggered from inside an entry) finds nothing.
#[derive(Default)]
pub struct CompositeRegistration {
    entries: RefCell<Vec<Registration>>,
}

impl CompositeRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration to the group.
    pub fn add(&self, registration: Registration) {
        self.entries.borrow_mut().push(registration);
    }

    /// Number of pending registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Remove every pending registration in reverse order of addition.
    pub fn remove(&self) {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        for registration in entries.into_iter().rev() {
            registration.remove();
        }
    }
}

impl fmt::Debug for CompositeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeRegistration")
            .field("len", &self.len())
            .finish()
    }
}
