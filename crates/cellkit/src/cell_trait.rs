#![forbid(unsafe_code)]

//! Behaviour traits attached to cells.
//!
//! A cell holds an ordered chain of [`CellTrait`] objects, most recently
//! added first. Property lookups ask each trait in order until one has an
//! opinion; events are offered to each trait in order until one consumes
//! them. Every trait may declare base traits which act as its fallback
//! layer: they are asked after the trait itself, before the chain moves on
//! to the next trait.

use std::any::Any;
use std::rc::Rc;

use cellkit_core::{KeyEvent, MouseEvent};

use crate::cell::Cell;
use crate::event::{
    CellEvent, CompletionEvent, CopyCutEvent, EventPriority, FocusEvent, PasteEvent,
    TraitEventKey,
};
use crate::property::{Lookup, PropertyChange, PropertyKey};

/// A behaviour layer. Every hook has a no-op default.
#[allow(unused_variables)]
pub trait CellTrait {
    /// Fallback layers consulted after this trait.
    fn base_traits(&self) -> &[Rc<dyn CellTrait>] {
        &[]
    }

    /// Answer a property lookup for `cell`.
    fn property(&self, cell: &Cell, key: PropertyKey) -> Lookup {
        Lookup::Unset
    }

    fn on_property_changed(&self, cell: &Cell, change: &PropertyChange<'_>) {}

    fn on_key_pressed(&self, cell: &Cell, event: &mut KeyEvent) {}
    fn on_key_pressed_low_priority(&self, cell: &Cell, event: &mut KeyEvent) {}
    fn on_key_released(&self, cell: &Cell, event: &mut KeyEvent) {}
    fn on_key_released_low_priority(&self, cell: &Cell, event: &mut KeyEvent) {}
    fn on_key_typed(&self, cell: &Cell, event: &mut KeyEvent) {}
    fn on_key_typed_low_priority(&self, cell: &Cell, event: &mut KeyEvent) {}

    fn on_focus_gained(&self, cell: &Cell, event: &mut FocusEvent) {}
    fn on_focus_lost(&self, cell: &Cell, event: &mut FocusEvent) {}

    fn on_mouse_pressed(&self, cell: &Cell, event: &mut MouseEvent) {}
    fn on_mouse_released(&self, cell: &Cell, event: &mut MouseEvent) {}
    fn on_mouse_moved(&self, cell: &Cell, event: &mut MouseEvent) {}
    fn on_mouse_dragged(&self, cell: &Cell, event: &mut MouseEvent) {}

    fn on_copy(&self, cell: &Cell, event: &mut CopyCutEvent) {}
    fn on_cut(&self, cell: &Cell, event: &mut CopyCutEvent) {}
    fn on_paste(&self, cell: &Cell, event: &mut PasteEvent) {}
    fn on_complete(&self, cell: &Cell, event: &mut CompletionEvent) {}

    /// A trait-scoped event; use [`crate::CellTraitEventSpec::matches`] to
    /// recover the typed value.
    fn on_trait_event(&self, cell: &Cell, key: TraitEventKey, event: &mut dyn Any) {}
}

/// Resolve `key` against one trait and its base layers.
pub(crate) fn lookup(t: &Rc<dyn CellTrait>, cell: &Cell, key: PropertyKey) -> Lookup {
    let answer = t.property(cell, key);
    if !answer.is_unset() {
        return answer;
    }
    for base in t.base_traits() {
        let answer = lookup(base, cell, key);
        if !answer.is_unset() {
            return answer;
        }
    }
    Lookup::Unset
}

pub(crate) fn notify_property_changed(
    t: &Rc<dyn CellTrait>,
    cell: &Cell,
    change: &PropertyChange<'_>,
) {
    t.on_property_changed(cell, change);
    for base in t.base_traits() {
        notify_property_changed(base, cell, change);
    }
}

/// Offer a fixed-family event to one trait, then to its base layers while
/// the event stays unconsumed.
pub(crate) fn offer(
    t: &Rc<dyn CellTrait>,
    cell: &Cell,
    event: &mut CellEvent<'_>,
    priority: EventPriority,
) {
    match (&mut *event, priority) {
        (CellEvent::KeyPressed(e), EventPriority::Low) => t.on_key_pressed_low_priority(cell, e),
        (CellEvent::KeyPressed(e), EventPriority::Normal) => t.on_key_pressed(cell, e),
        (CellEvent::KeyReleased(e), EventPriority::Low) => t.on_key_released_low_priority(cell, e),
        (CellEvent::KeyReleased(e), EventPriority::Normal) => t.on_key_released(cell, e),
        (CellEvent::KeyTyped(e), EventPriority::Low) => t.on_key_typed_low_priority(cell, e),
        (CellEvent::KeyTyped(e), EventPriority::Normal) => t.on_key_typed(cell, e),
        (CellEvent::FocusGained(e), _) => t.on_focus_gained(cell, e),
        (CellEvent::FocusLost(e), _) => t.on_focus_lost(cell, e),
        (CellEvent::MousePressed(e), _) => t.on_mouse_pressed(cell, e),
        (CellEvent::MouseReleased(e), _) => t.on_mouse_released(cell, e),
        (CellEvent::MouseMoved(e), _) => t.on_mouse_moved(cell, e),
        (CellEvent::MouseDragged(e), _) => t.on_mouse_dragged(cell, e),
        (CellEvent::Copy(e), _) => t.on_copy(cell, e),
        (CellEvent::Cut(e), _) => t.on_cut(cell, e),
        (CellEvent::Paste(e), _) => t.on_paste(cell, e),
        (CellEvent::Complete(e), _) => t.on_complete(cell, e),
    }
    for base in t.base_traits() {
        if event.is_consumed() {
            return;
        }
        offer(base, cell, event, priority);
    }
}

/// Offer a trait-scoped event to one trait and its base layers.
pub(crate) fn offer_trait_event(
    t: &Rc<dyn CellTrait>,
    cell: &Cell,
    key: TraitEventKey,
    event: &mut dyn Any,
    consumed: &dyn Fn(&dyn Any) -> bool,
) {
    t.on_trait_event(cell, key, event);
    for base in t.base_traits() {
        if consumed(event) {
            return;
        }
        offer_trait_event(base, cell, key, event, consumed);
    }
}
