#![forbid(unsafe_code)]

//! Ordered listener lists.
//!
//! `fire` works on a snapshot, so listeners may add or remove listeners
//! (including themselves) while being notified. Removals take effect for the
//! next `fire`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::registration::Registration;

struct ListenersInner<L: ?Sized> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Rc<L>)>>,
}

/// A shared list of listeners of type `L` (usually `dyn SomeListener`).
pub struct Listeners<L: ?Sized> {
    inner: Rc<ListenersInner<L>>,
}

impl<L: ?Sized> Clone for Listeners<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<L: ?Sized> Default for Listeners<L> {
    fn default() -> Self {
        Self {
            inner: Rc::new(ListenersInner {
                next_id: Cell::new(0),
                entries: RefCell::new(Vec::new()),
            }),
        }
    }
}

impl<L: ?Sized + 'static> Listeners<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener. Removing the registration detaches it.
    pub fn add(&self, listener: Rc<L>) -> Registration {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.entries.borrow_mut().push((id, listener));

        let weak: Weak<ListenersInner<L>> = Rc::downgrade(&self.inner);
        Registration::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.entries.borrow_mut().retain(|(entry, _)| *entry != id);
            }
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// Call `f` for each listener registered at the time of the call.
    pub fn fire(&self, mut f: impl FnMut(&L)) {
        let snapshot: Vec<Rc<L>> = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in &snapshot {
            f(listener);
        }
    }
}

impl<L: ?Sized> fmt::Debug for Listeners<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.inner.entries.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Probe {
        fn hit(&self, log: &RefCell<Vec<u32>>);
    }

    struct Tagged(u32);

    impl Probe for Tagged {
        fn hit(&self, log: &RefCell<Vec<u32>>) {
            log.borrow_mut().push(self.0);
        }
    }

    #[test]
    fn fires_in_order_and_removes() {
        let listeners: Listeners<dyn Probe> = Listeners::new();
        let log = RefCell::new(Vec::new());
        let first = listeners.add(Rc::new(Tagged(1)));
        let _second = listeners.add(Rc::new(Tagged(2)));

        listeners.fire(|l| l.hit(&log));
        first.remove();
        listeners.fire(|l| l.hit(&log));

        assert_eq!(*log.borrow(), vec![1, 2, 2]);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn registration_outlives_list() {
        let listeners: Listeners<dyn Probe> = Listeners::new();
        let reg = listeners.add(Rc::new(Tagged(1)));
        drop(listeners);
        reg.remove();
    }

    #[test]
    fn add_during_fire_is_deferred() {
        let listeners: Listeners<dyn Fn()> = Listeners::new();
        let count = Rc::new(Cell::new(0));
        let inner_list = listeners.clone();
        let count_clone = Rc::clone(&count);
        let _reg = listeners.add(Rc::new(move || {
            count_clone.set(count_clone.get() + 1);
            let _ = inner_list.add(Rc::new(|| {}));
        }));

        listeners.fire(|l| l());
        assert_eq!(count.get(), 1);
        assert_eq!(listeners.len(), 2);
    }
}
