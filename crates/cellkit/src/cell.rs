#![forbid(unsafe_code)]

//! The cell tree.
//!
//! A [`Cell`] is a cheap handle to a node. A node owns its ordered children
//! and, through the four popup properties, up to four popup cells. Parent and
//! container links are weak bookkeeping, updated only alongside structural
//! mutation.
//!
//! # Invariants
//!
//! 1. A cell occupies at most one slot: one position of one children list or
//!    one popup slot of one parent.
//! 2. A cell is attached iff its parent is attached (or it is a container
//!    root). Attaching and detaching propagate to children and popups.
//! 3. The property bag never stores a value equal to the resolved default.
//! 4. No `RefCell` borrow is held while traits or listeners run.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use cellkit_core::{Color, Consumable, Listeners, Rect, Registration, Vector};
use smallvec::SmallVec;
use tracing::trace;

use crate::cell_trait::{self, CellTrait};
use crate::container::{CellContainer, CellContainerPeer, ContainerInner};
use crate::error::{CellError, fatal};
use crate::event::{CellEvent, CellTraitEventSpec, EventPriority};
use crate::property::{
    CellPropertySpec, CellTraitPropertySpec, Lookup, PropertyChange, PropertyKey, downcast_value,
};

pub static VISIBLE: CellPropertySpec<bool> = CellPropertySpec::new("visible", |_| true);
pub static FOCUSABLE: CellPropertySpec<bool> = CellPropertySpec::new("focusable", |_| false);
/// Maintained by the container; true only on the focused cell.
pub static FOCUSED: CellPropertySpec<bool> = CellPropertySpec::new("focused", |_| false);
pub static SELECTED: CellPropertySpec<bool> = CellPropertySpec::new("selected", |_| false);
pub static HIGHLIGHTED: CellPropertySpec<bool> = CellPropertySpec::new("highlighted", |_| false);
pub static BACKGROUND: CellPropertySpec<Option<Color>> =
    CellPropertySpec::new("background", |_| None);
pub static BORDER_COLOR: CellPropertySpec<Option<Color>> =
    CellPropertySpec::new("borderColor", |_| None);

pub static LEFT_POPUP: CellPropertySpec<Option<Cell>> =
    CellPropertySpec::new("leftPopup", |_| None);
pub static RIGHT_POPUP: CellPropertySpec<Option<Cell>> =
    CellPropertySpec::new("rightPopup", |_| None);
pub static BOTTOM_POPUP: CellPropertySpec<Option<Cell>> =
    CellPropertySpec::new("bottomPopup", |_| None);
pub static FRONT_POPUP: CellPropertySpec<Option<Cell>> =
    CellPropertySpec::new("frontPopup", |_| None);

pub static POPUP_SPECS: [&CellPropertySpec<Option<Cell>>; 4] =
    [&LEFT_POPUP, &RIGHT_POPUP, &BOTTOM_POPUP, &FRONT_POPUP];

#[must_use]
pub fn is_popup_key(key: PropertyKey) -> bool {
    POPUP_SPECS.iter().any(|spec| spec.is(key))
}

/// Layout family a renderer uses for the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Generic,
    Horizontal,
    Vertical,
    Text,
}

/// A child insertion or removal.
#[derive(Debug, Clone)]
pub struct ChildEvent {
    pub child: Cell,
    pub index: usize,
}

/// Per-cell observer.
#[allow(unused_variables)]
pub trait CellListener {
    fn on_property_changed(&self, cell: &Cell, change: &PropertyChange<'_>) {}
    fn on_before_child_added(&self, cell: &Cell, event: &ChildEvent) {}
    fn on_child_added(&self, cell: &Cell, event: &ChildEvent) {}
    fn on_before_child_removed(&self, cell: &Cell, event: &ChildEvent) {}
    fn on_child_removed(&self, cell: &Cell, event: &ChildEvent) {}
    fn on_parent_changed(&self, cell: &Cell, old: Option<&Cell>, new: Option<&Cell>) {}
}

pub(crate) struct CellInner {
    kind: CellKind,
    traits: RefCell<SmallVec<[Rc<dyn CellTrait>; 4]>>,
    children: RefCell<Vec<Cell>>,
    parent: RefCell<Weak<CellInner>>,
    container: RefCell<Weak<ContainerInner>>,
    properties: RefCell<AHashMap<PropertyKey, Box<dyn Any>>>,
    listeners: Listeners<dyn CellListener>,
}

/// Handle to a node of the cell tree. Equality is identity.
#[derive(Clone)]
pub struct Cell {
    inner: Rc<CellInner>,
}

/// Non-owning handle, for closures stored inside the tree.
#[derive(Clone)]
pub struct WeakCell {
    inner: Weak<CellInner>,
}

impl WeakCell {
    #[must_use]
    pub fn upgrade(&self) -> Option<Cell> {
        self.inner.upgrade().map(|inner| Cell { inner })
    }
}

impl fmt::Debug for WeakCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakCell")
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.inner).hash(state);
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell({:?}@{:p})", self.inner.kind, Rc::as_ptr(&self.inner))
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new(CellKind::Generic)
    }
}

impl Cell {
    /// Create a detached cell.
    #[must_use]
    pub fn new(kind: CellKind) -> Self {
        Self {
            inner: Rc::new(CellInner {
                kind,
                traits: RefCell::new(SmallVec::new()),
                children: RefCell::new(Vec::new()),
                parent: RefCell::new(Weak::new()),
                container: RefCell::new(Weak::new()),
                properties: RefCell::new(AHashMap::new()),
                listeners: Listeners::new(),
            }),
        }
    }

    #[must_use]
    pub fn horizontal() -> Self {
        Self::new(CellKind::Horizontal)
    }

    #[must_use]
    pub fn vertical() -> Self {
        Self::new(CellKind::Vertical)
    }

    #[must_use]
    pub fn kind(&self) -> CellKind {
        self.inner.kind
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakCell {
        WeakCell {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Resolve a property: stored value, then the trait chain, then the
    /// spec default.
    pub fn get<T>(&self, spec: &'static CellPropertySpec<T>) -> T
    where
        T: Clone + PartialEq + Default + 'static,
    {
        let key = spec.key();
        let stored = {
            let props = self.inner.properties.borrow();
            props.get(&key).map(|v| downcast_value::<T>(&**v, key))
        };
        match stored {
            Some(value) => value,
            None => self.default_value(spec),
        }
    }

    /// Resolve a trait property: the trait chain, then the spec default.
    pub fn get_trait<T>(&self, spec: &'static CellTraitPropertySpec<T>) -> T
    where
        T: Clone + Default + 'static,
    {
        let key = spec.key();
        match self.trait_lookup(key) {
            Lookup::Value(v) => downcast_value::<T>(&*v, key),
            Lookup::Null => T::default(),
            Lookup::Unset => spec.default_for(self),
        }
    }

    fn default_value<T>(&self, spec: &'static CellPropertySpec<T>) -> T
    where
        T: Clone + PartialEq + Default + 'static,
    {
        let key = spec.key();
        match self.trait_lookup(key) {
            Lookup::Value(v) => downcast_value::<T>(&*v, key),
            Lookup::Null => T::default(),
            Lookup::Unset => spec.default_for(self),
        }
    }

    fn trait_lookup(&self, key: PropertyKey) -> Lookup {
        for t in self.traits() {
            let answer = cell_trait::lookup(&t, self, key);
            if !answer.is_unset() {
                return answer;
            }
        }
        Lookup::Unset
    }

    /// Whether a value for `spec` is stored on the cell itself.
    #[must_use]
    pub fn is_stored<T>(&self, spec: &'static CellPropertySpec<T>) -> bool
    where
        T: Clone + PartialEq + Default + 'static,
    {
        self.inner.properties.borrow().contains_key(&spec.key())
    }

    /// Set a property. Setting the current value is a no-op; otherwise
    /// traits, cell listeners and the container are notified in that order.
    /// The returned registration restores the previous value.
    pub fn set<T>(&self, spec: &'static CellPropertySpec<T>, value: T) -> Registration
    where
        T: Clone + PartialEq + Default + 'static,
    {
        let old = self.get(spec);
        if old == value {
            return Registration::empty();
        }
        let key = spec.key();

        let popup_change = if is_popup_key(key) {
            let old_popup = (&old as &dyn Any).downcast_ref::<Option<Cell>>().cloned().flatten();
            let new_popup = (&value as &dyn Any).downcast_ref::<Option<Cell>>().cloned().flatten();
            self.before_popup_set(old_popup.as_ref(), new_popup.as_ref());
            Some((old_popup, new_popup))
        } else {
            None
        };

        let default = self.default_value(spec);
        {
            let mut props = self.inner.properties.borrow_mut();
            if value == default {
                props.remove(&key);
            } else {
                props.insert(key, Box::new(value.clone()));
            }
        }

        if let Some((old_popup, new_popup)) = popup_change {
            self.popup_set(old_popup.as_ref(), new_popup.as_ref());
        }

        trace!(property = key.name(), kind = ?self.kind(), "property set");
        self.fire_property_changed(&PropertyChange {
            key,
            old: &old,
            new: &value,
        });

        let weak = self.downgrade();
        Registration::new(move || {
            if let Some(cell) = weak.upgrade() {
                let _ = cell.set(spec, old);
            }
        })
    }

    /// Report a change of a value that traits compute rather than store,
    /// such as a colour derived from the text. Observers see it exactly as
    /// a [`Cell::set`] change. Equal values are not reported.
    pub fn notify_computed<T>(&self, spec: &'static CellPropertySpec<T>, old: T, new: T)
    where
        T: Clone + PartialEq + Default + 'static,
    {
        if old == new {
            return;
        }
        trace!(property = spec.name(), kind = ?self.kind(), "computed property changed");
        self.fire_property_changed(&PropertyChange {
            key: spec.key(),
            old: &old,
            new: &new,
        });
    }

    /// Traits first, then cell listeners, then the container.
    fn fire_property_changed(&self, change: &PropertyChange<'_>) {
        for t in self.traits() {
            cell_trait::notify_property_changed(&t, self, change);
        }
        self.inner
            .listeners
            .fire(|l| l.on_property_changed(self, change));
        if let Some(container) = self.container() {
            container.property_changed(self, change);
        }
    }

    fn before_popup_set(&self, old: Option<&Cell>, new: Option<&Cell>) {
        if let Some(new) = new
            && new.parent().is_some()
        {
            fatal(CellError::AlreadyParented);
        }

        let container = self.container();
        if let Some(old) = old {
            if let Some(container) = &container {
                if let Some(focused) = container.focused_cell()
                    && old.is_ancestor_of(&focused)
                {
                    container.set_focused(None);
                }
                container.popup_removed(old);
            }
            old.change_parent(None);
        }
        if let Some(new) = new {
            if let Some(container) = &container {
                container.popup_added(new);
            }
            new.change_parent(Some(self));
        }
    }

    fn popup_set(&self, old: Option<&Cell>, new: Option<&Cell>) {
        let Some(container) = self.container() else {
            return;
        };
        if let Some(old) = old {
            old.detach();
        }
        if let Some(new) = new {
            new.attach(&container);
        }
    }

    // ------------------------------------------------------------------
    // Traits
    // ------------------------------------------------------------------

    /// Prepend a trait to the chain. Removing the registration removes
    /// exactly this instance.
    pub fn add_trait(&self, t: Rc<dyn CellTrait>) -> Registration {
        self.inner.traits.borrow_mut().insert(0, Rc::clone(&t));
        let weak = self.downgrade();
        Registration::new(move || {
            if let Some(cell) = weak.upgrade() {
                let mut traits = cell.inner.traits.borrow_mut();
                if let Some(index) = traits.iter().position(|other| Rc::ptr_eq(other, &t)) {
                    traits.remove(index);
                }
            }
        })
    }

    /// Snapshot of the trait chain, most recently added first.
    #[must_use]
    pub fn traits(&self) -> SmallVec<[Rc<dyn CellTrait>; 4]> {
        self.inner.traits.borrow().clone()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Dispatch a fixed-family event here, bubbling to ancestors until a
    /// trait consumes it.
    pub fn dispatch(&self, mut event: CellEvent<'_>) {
        let mut current = Some(self.clone());
        while let Some(cell) = current {
            trace!(event = event.name(), kind = ?cell.kind(), "dispatch step");
            cell.dispatch_step(&mut event);
            if event.is_consumed() {
                return;
            }
            current = cell.parent();
        }
    }

    fn dispatch_step(&self, event: &mut CellEvent<'_>) {
        let priorities: &[EventPriority] = if event.is_key() {
            &[EventPriority::Low, EventPriority::Normal]
        } else {
            &[EventPriority::Normal]
        };
        let traits = self.traits();
        for &priority in priorities {
            for t in &traits {
                cell_trait::offer(t, self, event, priority);
                if event.is_consumed() {
                    return;
                }
            }
        }
    }

    /// Dispatch a trait-scoped event; it reaches ancestors only if the spec
    /// is bubbling.
    pub fn dispatch_trait_event<E>(&self, spec: &'static CellTraitEventSpec<E>, event: &mut E)
    where
        E: Consumable + 'static,
    {
        let key = spec.key();
        let consumed = |e: &dyn Any| e.downcast_ref::<E>().is_some_and(|e| e.is_consumed());
        let mut current = Some(self.clone());
        while let Some(cell) = current {
            for t in cell.traits() {
                cell_trait::offer_trait_event(&t, &cell, key, &mut *event, &consumed);
                if event.is_consumed() {
                    return;
                }
            }
            if !spec.is_bubbling() {
                return;
            }
            current = cell.parent();
        }
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    #[must_use]
    pub fn parent(&self) -> Option<Cell> {
        self.inner.parent.borrow().upgrade().map(|inner| Cell { inner })
    }

    #[must_use]
    pub fn container(&self) -> Option<CellContainer> {
        CellContainer::from_weak(&self.inner.container.borrow())
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.container().is_some()
    }

    /// Snapshot of the ordered children.
    #[must_use]
    pub fn children(&self) -> Vec<Cell> {
        self.inner.children.borrow().clone()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<Cell> {
        self.inner.children.borrow().get(index).cloned()
    }

    #[must_use]
    pub fn index_of(&self, child: &Cell) -> Option<usize> {
        self.inner.children.borrow().iter().position(|c| c == child)
    }

    /// Popup cells currently set on this cell, in left/right/bottom/front
    /// order.
    #[must_use]
    pub fn popups(&self) -> Vec<Cell> {
        let props = self.inner.properties.borrow();
        POPUP_SPECS
            .iter()
            .filter_map(|spec| {
                let key = spec.key();
                props
                    .get(&key)
                    .and_then(|v| downcast_value::<Option<Cell>>(&**v, key))
            })
            .collect()
    }

    #[must_use]
    pub fn front_popup(&self) -> Option<Cell> {
        self.get(&FRONT_POPUP)
    }

    #[must_use]
    pub fn bottom_popup(&self) -> Option<Cell> {
        self.get(&BOTTOM_POPUP)
    }

    pub fn add_child(&self, child: Cell) {
        self.insert_child(self.child_count(), child);
    }

    /// Insert `child` at `index`. Panics if the child already has a parent.
    pub fn insert_child(&self, index: usize, child: Cell) {
        if let Err(err) = self.try_insert_child(index, child) {
            fatal(err);
        }
    }

    pub fn try_insert_child(&self, index: usize, child: Cell) -> Result<(), CellError> {
        if child.parent().is_some() {
            return Err(CellError::AlreadyParented);
        }
        if child.is_attached() {
            return Err(CellError::AlreadyAttached);
        }
        let len = self.child_count();
        if index > len {
            return Err(CellError::ChildIndex { index, len });
        }

        let event = ChildEvent { child, index };
        self.inner
            .listeners
            .fire(|l| l.on_before_child_added(self, &event));

        event.child.change_parent(Some(self));
        self.inner
            .children
            .borrow_mut()
            .insert(index, event.child.clone());

        let container = self.container();
        if let Some(container) = &container {
            event.child.attach(container);
        }

        trace!(kind = ?self.kind(), index, "child added");
        self.inner.listeners.fire(|l| l.on_child_added(self, &event));
        if let Some(container) = &container {
            container.child_added(self, &event);
        }
        Ok(())
    }

    /// Remove and return the child at `index`.
    pub fn remove_child_at(&self, index: usize) -> Cell {
        let Some(child) = self.child(index) else {
            fatal(CellError::ChildIndex {
                index,
                len: self.child_count(),
            });
        };
        let event = ChildEvent { child, index };

        let container = self.container();
        if let Some(container) = &container
            && let Some(focused) = container.focused_cell()
            && event.child.is_ancestor_of(&focused)
        {
            container.set_focused(None);
        }

        self.inner
            .listeners
            .fire(|l| l.on_before_child_removed(self, &event));

        event.child.change_parent(None);
        self.inner.children.borrow_mut().remove(index);

        if container.is_some() {
            event.child.detach();
        }

        trace!(kind = ?self.kind(), index, "child removed");
        self.inner
            .listeners
            .fire(|l| l.on_child_removed(self, &event));
        if let Some(container) = &container {
            container.child_removed(self, &event);
        }
        event.child
    }

    pub fn remove_child(&self, child: &Cell) {
        match self.index_of(child) {
            Some(index) => {
                self.remove_child_at(index);
            }
            None => fatal(CellError::NotAChild),
        }
    }

    /// Remove every child, last first.
    pub fn clear_children(&self) {
        while self.child_count() > 0 {
            self.remove_child_at(self.child_count() - 1);
        }
    }

    /// Detach the cell from its parent's children list or popup slot.
    pub fn remove_from_parent(&self) {
        let Some(parent) = self.parent() else {
            fatal(CellError::NotAChild);
        };
        if let Some(index) = parent.index_of(self) {
            parent.remove_child_at(index);
            return;
        }
        for spec in POPUP_SPECS {
            if parent.get(spec).as_ref() == Some(self) {
                let _ = parent.set(spec, None);
                return;
            }
        }
        fatal(CellError::NotAChild);
    }

    /// Whether `self` is `other` or one of its ancestors (popup hosts
    /// included).
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Cell) -> bool {
        let mut current = Some(other.clone());
        while let Some(cell) = current {
            if &cell == self {
                return true;
            }
            current = cell.parent();
        }
        false
    }

    fn change_parent(&self, new: Option<&Cell>) {
        let old = self.parent();
        *self.inner.parent.borrow_mut() = match new {
            Some(parent) => Rc::downgrade(&parent.inner),
            None => Weak::new(),
        };
        self.inner
            .listeners
            .fire(|l| l.on_parent_changed(self, old.as_ref(), new));
    }

    pub(crate) fn attach(&self, container: &CellContainer) {
        if self.is_attached() {
            fatal(CellError::AlreadyAttached);
        }
        *self.inner.container.borrow_mut() = container.downgrade();
        container.cell_attached(self);

        for child in self.children() {
            child.attach(container);
        }
        for popup in self.popups() {
            popup.attach(container);
        }
    }

    pub(crate) fn detach(&self) {
        let Some(container) = self.container() else {
            fatal(CellError::Detached);
        };
        container.cell_detached(self);
        *self.inner.container.borrow_mut() = Weak::new();

        for child in self.children() {
            child.detach();
        }
        for popup in self.popups() {
            popup.detach();
        }
    }

    // ------------------------------------------------------------------
    // Focus
    // ------------------------------------------------------------------

    #[must_use]
    pub fn is_focused(&self) -> bool {
        self.get(&FOCUSED)
    }

    /// Focusable, visible and attached.
    #[must_use]
    pub fn can_focus(&self) -> bool {
        self.is_attached() && self.get(&FOCUSABLE) && self.get(&VISIBLE)
    }

    /// Make this cell the container's focused cell. Panics unless the cell
    /// is focusable, visible and attached.
    pub fn focus(&self) {
        if let Err(err) = self.try_focus() {
            fatal(err);
        }
    }

    pub fn try_focus(&self) -> Result<(), CellError> {
        let Some(container) = self.container() else {
            return Err(CellError::Detached);
        };
        container.try_set_focused(Some(self.clone()))
    }

    // ------------------------------------------------------------------
    // Listeners and geometry
    // ------------------------------------------------------------------

    pub fn add_listener(&self, listener: Rc<dyn CellListener>) -> Registration {
        self.inner.listeners.add(listener)
    }

    fn peer(&self) -> Rc<dyn CellContainerPeer> {
        match self.container() {
            Some(container) => container.peer(),
            None => fatal(CellError::Detached),
        }
    }

    /// Bounds reported by the rendering peer. Panics when detached.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.peer().bounds(self)
    }

    #[must_use]
    pub fn origin(&self) -> Vector {
        self.bounds().origin
    }

    #[must_use]
    pub fn dimension(&self) -> Vector {
        self.bounds().dimension
    }

    pub fn scroll_to(&self) {
        self.peer().scroll_to(self);
    }
}
