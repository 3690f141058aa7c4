#![forbid(unsafe_code)]

//! Invariant violations of the cell tree, focus, completion and selection
//! APIs.
//!
//! None of these are user-facing conditions. Public calls documented as
//! panicking report the violation through [`fatal`], which logs the error
//! before aborting the call. The `try_*` variants hand the same values back
//! to callers that want to check first.

use std::fmt;

/// A structural or precondition violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    /// The cell already occupies a child or popup slot.
    AlreadyParented,
    /// The cell is neither a child nor a popup of its recorded parent.
    NotAChild,
    /// Child insertion index past the end of the children list.
    ChildIndex { index: usize, len: usize },
    /// The cell is not focusable or not visible.
    NotFocusable,
    /// The cell belongs to another container.
    DifferentContainer,
    /// The cell is not attached to any container.
    Detached,
    /// Already attached cells cannot be attached again.
    AlreadyAttached,
    /// A geometry query reached a container without a rendering peer.
    PeerUnavailable,
    /// A selection change was requested while one is in progress.
    SelectionReentered,
    /// `select` endpoints missing or out of order.
    SelectionRange { from: Option<usize>, to: Option<usize> },
    /// The focused cell lies outside the selection region or its range.
    FocusOutsideSelection,
    /// Menu navigation without a selected item.
    NoSelectedItem,
    /// A popup slot that must be empty is occupied.
    PopupOccupied,
    /// The operation requires the cell to hold focus.
    NotFocused,
    /// A stored or trait-provided value does not have the property's type.
    TypeMismatch { property: &'static str },
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyParented => write!(f, "cell already has a parent"),
            Self::NotAChild => write!(f, "cell is not a child of its parent"),
            Self::ChildIndex { index, len } => {
                write!(f, "child index {index} out of bounds for {len} children")
            }
            Self::NotFocusable => write!(f, "cell is not focusable or not visible"),
            Self::DifferentContainer => write!(f, "cell belongs to a different container"),
            Self::Detached => write!(f, "cell is not attached to a container"),
            Self::AlreadyAttached => write!(f, "cell is already attached"),
            Self::PeerUnavailable => write!(f, "no rendering peer attached"),
            Self::SelectionReentered => write!(f, "selection changed while changing selection"),
            Self::SelectionRange { from, to } => {
                write!(f, "invalid selection range {from:?}..={to:?}")
            }
            Self::FocusOutsideSelection => write!(f, "focus is outside the selection range"),
            Self::NoSelectedItem => write!(f, "no completion item selected"),
            Self::PopupOccupied => write!(f, "popup slot is occupied"),
            Self::NotFocused => write!(f, "cell is not focused"),
            Self::TypeMismatch { property } => {
                write!(f, "value of property `{property}` has the wrong type")
            }
        }
    }
}

impl std::error::Error for CellError {}

/// Log an invariant violation and abort the current call.
#[track_caller]
pub fn fatal(error: CellError) -> ! {
    tracing::error!(error = %error, "cellkit invariant violated");
    panic!("{error}")
}
