#![forbid(unsafe_code)]

//! Cell-level event values and the fixed dispatch families.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use cellkit_core::{ClipboardContent, Consumable, KeyEvent, MouseEvent};

use crate::cell::Cell;

macro_rules! consumable {
    ($ty:ty) => {
        impl Consumable for $ty {
            fn consume(&mut self) {
                self.consumed = true;
            }

            fn is_consumed(&self) -> bool {
                self.consumed
            }
        }
    };
}

/// Focus moved from `old` to `new`.
#[derive(Debug, Clone)]
pub struct FocusEvent {
    pub old: Option<Cell>,
    pub new: Option<Cell>,
    consumed: bool,
}

impl FocusEvent {
    #[must_use]
    pub fn new(old: Option<Cell>, new: Option<Cell>) -> Self {
        Self {
            old,
            new,
            consumed: false,
        }
    }
}

consumable!(FocusEvent);

/// A copy or cut request; the handler leaves its clipboard content in
/// `result`.
#[derive(Debug, Clone, Default)]
pub struct CopyCutEvent {
    pub result: Option<ClipboardContent>,
    consumed: bool,
}

impl CopyCutEvent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the produced content and consume the event.
    pub fn set_result(&mut self, content: ClipboardContent) {
        self.result = Some(content);
        self.consumed = true;
    }
}

consumable!(CopyCutEvent);

#[derive(Debug, Clone)]
pub struct PasteEvent {
    pub content: ClipboardContent,
    consumed: bool,
}

impl PasteEvent {
    #[must_use]
    pub fn new(content: ClipboardContent) -> Self {
        Self {
            content,
            consumed: false,
        }
    }
}

consumable!(PasteEvent);

/// A completion request; `menu` is set when the user asked for the full menu.
#[derive(Debug, Clone)]
pub struct CompletionEvent {
    pub menu: bool,
    consumed: bool,
}

impl CompletionEvent {
    #[must_use]
    pub fn new(menu: bool) -> Self {
        Self {
            menu,
            consumed: false,
        }
    }
}

consumable!(CompletionEvent);

/// The fixed event families dispatched through trait chains.
///
/// Key families get a low-priority pass followed by a normal pass at every
/// cell; all other families get a single pass.
#[derive(Debug)]
pub enum CellEvent<'a> {
    KeyPressed(&'a mut KeyEvent),
    KeyReleased(&'a mut KeyEvent),
    KeyTyped(&'a mut KeyEvent),
    FocusGained(&'a mut FocusEvent),
    FocusLost(&'a mut FocusEvent),
    MousePressed(&'a mut MouseEvent),
    MouseReleased(&'a mut MouseEvent),
    MouseMoved(&'a mut MouseEvent),
    MouseDragged(&'a mut MouseEvent),
    Copy(&'a mut CopyCutEvent),
    Cut(&'a mut CopyCutEvent),
    Paste(&'a mut PasteEvent),
    Complete(&'a mut CompletionEvent),
}

impl CellEvent<'_> {
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        match self {
            CellEvent::KeyPressed(e) | CellEvent::KeyReleased(e) | CellEvent::KeyTyped(e) => {
                e.is_consumed()
            }
            CellEvent::FocusGained(e) | CellEvent::FocusLost(e) => e.is_consumed(),
            CellEvent::MousePressed(e)
            | CellEvent::MouseReleased(e)
            | CellEvent::MouseMoved(e)
            | CellEvent::MouseDragged(e) => e.is_consumed(),
            CellEvent::Copy(e) | CellEvent::Cut(e) => e.is_consumed(),
            CellEvent::Paste(e) => e.is_consumed(),
            CellEvent::Complete(e) => e.is_consumed(),
        }
    }

    /// Whether the family gets a low-priority pass.
    #[must_use]
    pub fn is_key(&self) -> bool {
        matches!(
            self,
            CellEvent::KeyPressed(_) | CellEvent::KeyReleased(_) | CellEvent::KeyTyped(_)
        )
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CellEvent::KeyPressed(_) => "key_pressed",
            CellEvent::KeyReleased(_) => "key_released",
            CellEvent::KeyTyped(_) => "key_typed",
            CellEvent::FocusGained(_) => "focus_gained",
            CellEvent::FocusLost(_) => "focus_lost",
            CellEvent::MousePressed(_) => "mouse_pressed",
            CellEvent::MouseReleased(_) => "mouse_released",
            CellEvent::MouseMoved(_) => "mouse_moved",
            CellEvent::MouseDragged(_) => "mouse_dragged",
            CellEvent::Copy(_) => "copy",
            CellEvent::Cut(_) => "cut",
            CellEvent::Paste(_) => "paste",
            CellEvent::Complete(_) => "complete",
        }
    }
}

/// Dispatch pass for key families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPriority {
    Low,
    Normal,
}

/// Identity of a [`CellTraitEventSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraitEventKey(usize);

/// A cell-internal signal outside the fixed families.
///
/// Bubbling events continue at the parent cell when no trait consumes them.
pub struct CellTraitEventSpec<E: 'static> {
    name: &'static str,
    bubbling: bool,
    _event: PhantomData<fn() -> E>,
}

impl<E: Consumable + 'static> CellTraitEventSpec<E> {
    pub const fn new(name: &'static str, bubbling: bool) -> Self {
        Self {
            name,
            bubbling,
            _event: PhantomData,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is_bubbling(&self) -> bool {
        self.bubbling
    }

    #[must_use]
    pub fn key(&'static self) -> TraitEventKey {
        TraitEventKey(self as *const Self as *const () as usize)
    }

    /// The typed event if `key` identifies this spec.
    pub fn matches<'e>(
        &'static self,
        key: TraitEventKey,
        event: &'e mut dyn Any,
    ) -> Option<&'e mut E> {
        if key != self.key() {
            return None;
        }
        event.downcast_mut::<E>()
    }
}

impl<E> fmt::Debug for CellTraitEventSpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellTraitEventSpec")
            .field("name", &self.name)
            .field("bubbling", &self.bubbling)
            .finish()
    }
}
