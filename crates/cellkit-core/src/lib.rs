#![forbid(unsafe_code)]

//! Core: input events, geometry and observable primitives for cellkit.
//!
//! # Role in cellkit
//! `cellkit-core` holds the vocabulary shared by the cell tree and whatever
//! drives it: canonical input events with their consumption protocol,
//! renderer geometry, reversible [`Registration`] handles, listener lists and
//! the [`Observable`] value slot.
//!
//! # How it fits in the system
//! An input-translation layer produces [`event::KeyEvent`] and
//! [`event::MouseEvent`] values and hands them to a cell container in the
//! `cellkit` crate. Every subscription in the editor returns a
//! [`Registration`]; observables carry model-side state such as completion
//! text and selection ranges.

pub mod color;
pub mod event;
pub mod geometry;
pub mod listeners;
pub mod observable;
pub mod registration;

pub use color::Color;
pub use event::{
    ClipboardContent, Consumable, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent,
};
pub use geometry::{Rect, Vector};
pub use listeners::Listeners;
pub use observable::{Observable, Subscription};
pub use registration::{CompositeRegistration, Registration};
