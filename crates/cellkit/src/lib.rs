#![forbid(unsafe_code)]

//! cellkit
//!
//! The core of a projectional structure editor: an editable tree of visual
//! cells whose behaviour is composed from traits, driven by keyboard, mouse
//! and clipboard input, and turned into structural edits through completion.
//!
//! # Key Components
//!
//! - [`Cell`] - Tree node with typed properties, children and popup slots
//! - [`CellTrait`] - Layered behaviour: property answers and event hooks
//! - [`CellContainer`] - Owns the root, the focused cell and the peer
//! - [`TextCell`] - Text with a grapheme caret, plus editing traits
//! - [`completion`] - Completion items, menus and side transforms
//! - [`SelectionSupport`] - Shift+Arrow range selection over siblings
//! - [`TokenEditor`] - Token list editing with token-position completion
//!
//! # Role in cellkit
//! `cellkit` holds all editor semantics. It consumes input values and
//! observables from `cellkit-core` and talks to a renderer only through
//! [`CellContainerPeer`] and the container and cell listener traits.
//!
//! # How it fits in the system
//! An input layer calls the [`CellContainer`] input surface; dispatch walks
//! the trait chain of the focused cell and bubbles to its ancestors. Traits
//! mutate properties and structure, listeners observe the changes, and
//! completion commits return a [`CellAction`] that places the caret.

pub mod action;
pub mod cell;
pub mod cell_trait;
pub mod completion;
pub mod composites;
pub mod config;
pub mod container;
pub mod error;
pub mod event;
pub mod position;
pub mod property;
pub mod selection;
pub mod text;
pub mod token;

pub use action::CellAction;
pub use cell::{Cell, CellKind, CellListener, ChildEvent, WeakCell};
pub use cell_trait::CellTrait;
pub use config::{EditorConfig, EditorConfigError};
pub use container::{
    CellContainer, CellContainerListener, CellContainerPeer, CellStateHandler, ContainerState,
    NullPeer,
};
pub use error::CellError;
pub use event::{
    CellEvent, CellTraitEventSpec, CompletionEvent, CopyCutEvent, FocusEvent, PasteEvent,
};
pub use property::{CellPropertySpec, CellTraitPropertySpec, Lookup, PropertyChange, PropertyKey};
pub use selection::SelectionSupport;
pub use text::TextCell;
pub use token::{Token, TokenEditor, TokenKind};
