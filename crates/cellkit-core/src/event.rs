#![forbid(unsafe_code)]

//! Canonical input event values.
//!
//! These are the raw values an input-translation layer hands to a cell
//! container. Every event carries a `consumed` flag: dispatch stops as soon
//! as a handler consumes the event, and an unconsumed event keeps bubbling.
//!
//! # Design Notes
//!
//! - Mouse coordinates are renderer pixels and may be negative.
//! - `Modifiers` use bitflags for easy combination.
//! - Typed characters arrive as [`KeyCode::Char`] on a key-typed event.

use bitflags::bitflags;

/// Shared protocol of every dispatchable event: it can be consumed once a
/// handler takes responsibility for it.
pub trait Consumable {
    /// Mark the event as handled. Dispatch stops after the current handler.
    fn consume(&mut self);

    /// Whether some handler already consumed the event.
    fn is_consumed(&self) -> bool;
}

/// A keyboard event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code that was pressed.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,

    consumed: bool,
}

impl KeyEvent {
    /// Create a new key event without modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            consumed: false,
        }
    }

    /// Create a key-typed event for a character.
    #[must_use]
    pub const fn typed(ch: char) -> Self {
        Self::new(KeyCode::Char(ch))
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Exact match on key code and modifier set.
    #[must_use]
    pub fn is(&self, code: KeyCode, modifiers: Modifiers) -> bool {
        self.code == code && self.modifiers == modifiers
    }

    /// Match a key code pressed without any modifier.
    #[must_use]
    pub fn is_plain(&self, code: KeyCode) -> bool {
        self.is(code, Modifiers::NONE)
    }

    /// The character carried by the event, if any.
    #[must_use]
    pub const fn char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch) => Some(ch),
            _ => None,
        }
    }

    /// Check if this is a specific character key.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch == c)
    }

    /// Check if Ctrl modifier is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// Check if Alt modifier is held.
    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    /// Check if Shift modifier is held.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Check if Super/Meta/Cmd modifier is held.
    #[must_use]
    pub const fn super_key(&self) -> bool {
        self.modifiers.contains(Modifiers::SUPER)
    }
}

impl Consumable for KeyEvent {
    fn consume(&mut self) {
        self.consumed = true;
    }

    fn is_consumed(&self) -> bool {
        self.consumed
    }
}

/// Key codes for keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A regular character key.
    Char(char),

    /// Enter/Return key.
    Enter,

    /// Escape key.
    Escape,

    /// Backspace key.
    Backspace,

    /// Tab key.
    Tab,

    /// Delete key.
    Delete,

    /// Insert key.
    Insert,

    /// Home key.
    Home,

    /// End key.
    End,

    /// Page Up key.
    PageUp,

    /// Page Down key.
    PageDown,

    /// Up arrow key.
    Up,

    /// Down arrow key.
    Down,

    /// Left arrow key.
    Left,

    /// Right arrow key.
    Right,

    /// Function key (F1-F24).
    F(u8),

    /// A key the input layer could not name.
    Unknown,
}

bitflags! {
    /// Modifier keys that can be held during a key or mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// A mouse event located in renderer coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseEvent {
    /// X coordinate.
    pub x: i32,

    /// Y coordinate.
    pub y: i32,

    /// Button involved in a press/release/drag, if any.
    pub button: Option<MouseButton>,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,

    consumed: bool,
}

impl MouseEvent {
    /// Create a new mouse event at a location.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            button: None,
            modifiers: Modifiers::NONE,
            consumed: false,
        }
    }

    /// Attach the button that triggered the event.
    #[must_use]
    pub const fn with_button(mut self, button: MouseButton) -> Self {
        self.button = Some(button);
        self
    }

    /// Create a mouse event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Get the position as a tuple.
    #[must_use]
    pub const fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

impl Consumable for MouseEvent {
    fn consume(&mut self) {
        self.consumed = true;
    }

    fn is_consumed(&self) -> bool {
        self.consumed
    }
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button.
    Left,

    /// Right mouse button.
    Right,

    /// Middle mouse button (scroll wheel click).
    Middle,
}

/// Content moved through copy, cut and paste.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClipboardContent {
    /// Plain-text payload.
    pub text: String,
}

impl ClipboardContent {
    /// Create plain-text clipboard content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
