#![forbid(unsafe_code)]

//! Navigation and editing behaviour for text cells.
//!
//! The traits layer through base traits:
//!
//! ```text
//! valid_text_editing(validator)
//!   └─ text_editing()
//!        └─ text_navigation(true, true)
//! ```
//!
//! Navigation moves the caret by grapheme cluster and keeps `CARET_VISIBLE`
//! in sync with focus. Editing inserts typed characters, deletes with
//! Backspace/Delete, handles the clipboard and turns Ctrl+Space into a
//! completion request. Validated editing refuses to grow a valid text into
//! an invalid one at its boundaries and opens a side transform instead.

use std::any::Any;
use std::rc::Rc;

use cellkit_core::{
    ClipboardContent, Color, Consumable, KeyCode, KeyEvent, Modifiers, MouseEvent,
};
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;

use crate::action::{self, CellAction};
use crate::cell::{Cell, FOCUSABLE};
use crate::cell_trait::CellTrait;
use crate::completion::{
    COMPLETION, CompletionHelper, CompletionParameters, Side, show_side_transform_popup,
};
use crate::container::{CellStateHandler, STATE_HANDLER};
use crate::event::{CellEvent, CompletionEvent, CopyCutEvent, FocusEvent, PasteEvent};
use crate::property::{CellTraitPropertySpec, Lookup, PropertyChange, PropertyKey};
use crate::text::{CARET_POSITION, CARET_VISIBLE, TEXT, TEXT_COLOR, TextCell, byte_offset};

/// Opens a side transform seeded with the typed text.
pub type Expansion = Rc<dyn Fn(&str) -> CellAction>;
/// Runs after a character was typed; true when it took over the keystroke.
pub type AfterType = Rc<dyn Fn() -> bool>;
pub type Validator = Rc<dyn Fn(&str) -> bool>;

/// Whether the caret may rest before the first grapheme.
pub static FIRST_ALLOWED: CellTraitPropertySpec<bool> =
    CellTraitPropertySpec::new("firstAllowed", |_| true);
/// Whether the caret may rest after the last grapheme.
pub static LAST_ALLOWED: CellTraitPropertySpec<bool> =
    CellTraitPropertySpec::new("lastAllowed", |_| true);

pub static EXPAND_LEFT: CellTraitPropertySpec<Option<Expansion>> =
    CellTraitPropertySpec::new("expandLeft", |cell| Some(expansion(Side::Left, cell)));
pub static EXPAND_RIGHT: CellTraitPropertySpec<Option<Expansion>> =
    CellTraitPropertySpec::new("expandRight", |cell| Some(expansion(Side::Right, cell)));
pub static AFTER_TYPE: CellTraitPropertySpec<Option<AfterType>> =
    CellTraitPropertySpec::new("afterType", |_| None);
pub static VALIDATOR: CellTraitPropertySpec<Option<Validator>> =
    CellTraitPropertySpec::new("validator", |_| None);
/// Colour of text that passes validation; `None` keeps the cell's own.
pub static VALID_TEXT_COLOR: CellTraitPropertySpec<Option<Color>> =
    CellTraitPropertySpec::new("validTextColor", |_| None);
/// Commit a single exact match without waiting for more input. Defaults to
/// the container's configuration.
pub static EAGER_COMPLETION: CellTraitPropertySpec<bool> =
    CellTraitPropertySpec::new("eagerCompletion", |cell| {
        cell.container()
            .is_some_and(|container| container.config().eager_completion)
    });

/// Default expansion: a side-transform popup fed by the side's transform
/// supplier, with the caret after the seeded text.
fn expansion(side: Side, cell: &Cell) -> Expansion {
    let cell = cell.clone();
    Rc::new(move |side_text: &str| {
        let params = CompletionParameters::default();
        let helper = CompletionHelper::completion_for(&cell, &params, side.transform_spec());
        let field = show_side_transform_popup(&cell, side.popup_spec(), helper.into_items());
        let _ = field.set_text(side_text);
        action::to_end(&field)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextState {
    caret: usize,
    text: Option<String>,
}

struct TextStateHandler {
    save_text: bool,
}

impl CellStateHandler for TextStateHandler {
    fn save_state(&self, cell: &Cell) -> Box<dyn Any> {
        let text = TextCell::from_cell(cell);
        Box::new(TextState {
            caret: text.as_ref().map_or(0, TextCell::caret),
            text: text.filter(|_| self.save_text).map(|t| t.text()),
        })
    }

    fn restore_state(&self, cell: &Cell, state: &dyn Any) {
        let Some(text) = TextCell::from_cell(cell) else {
            return;
        };
        let Some(state) = state.downcast_ref::<TextState>() else {
            return;
        };
        if let Some(saved) = &state.text {
            let _ = text.set_text(saved.clone());
        }
        let _ = text.set_caret(state.caret);
    }
}

fn state_handler(save_text: bool) -> Lookup {
    let handler: Rc<dyn CellStateHandler> = Rc::new(TextStateHandler { save_text });
    Lookup::value(Some(handler))
}

/// Caret range allowed by `FIRST_ALLOWED` / `LAST_ALLOWED`.
fn caret_bounds(cell: &TextCell) -> (usize, usize) {
    let len = cell.len();
    let min = if cell.get_trait(&FIRST_ALLOWED) { 0 } else { len.min(1) };
    let max = if cell.get_trait(&LAST_ALLOWED) {
        len
    } else {
        len.saturating_sub(1).max(min)
    };
    (min, max)
}

/// Focusable text with caret movement.
#[must_use]
pub fn text_navigation(first_allowed: bool, last_allowed: bool) -> Rc<dyn CellTrait> {
    Rc::new(TextNavigation {
        first_allowed,
        last_allowed,
    })
}

struct TextNavigation {
    first_allowed: bool,
    last_allowed: bool,
}

impl CellTrait for TextNavigation {
    fn property(&self, _cell: &Cell, key: PropertyKey) -> Lookup {
        if FOCUSABLE.is(key) {
            return Lookup::value(true);
        }
        if FIRST_ALLOWED.is(key) {
            return Lookup::value(self.first_allowed);
        }
        if LAST_ALLOWED.is(key) {
            return Lookup::value(self.last_allowed);
        }
        if STATE_HANDLER.is(key) {
            return state_handler(false);
        }
        Lookup::Unset
    }

    fn on_property_changed(&self, cell: &Cell, change: &PropertyChange<'_>) {
        if change.of(&TEXT).is_some()
            && let Some(text) = TextCell::from_cell(cell)
            && text.caret() > text.len()
        {
            let _ = text.set_caret(text.len());
        }
    }

    fn on_focus_gained(&self, cell: &Cell, event: &mut FocusEvent) {
        if event.new.as_ref() != Some(cell) {
            return;
        }
        let Some(text) = TextCell::from_cell(cell) else {
            return;
        };
        let _ = text.set(&CARET_VISIBLE, true);
        let (min, max) = caret_bounds(&text);
        let _ = text.set_caret(text.caret().clamp(min, max));
    }

    fn on_focus_lost(&self, cell: &Cell, event: &mut FocusEvent) {
        if event.old.as_ref() == Some(cell) {
            let _ = cell.set(&CARET_VISIBLE, false);
        }
    }

    fn on_key_pressed(&self, cell: &Cell, event: &mut KeyEvent) {
        let Some(text) = TextCell::from_cell(cell) else {
            return;
        };
        if !event.modifiers.is_empty() {
            return;
        }
        let caret = text.caret();
        let (min, max) = caret_bounds(&text);
        let target = match event.code {
            KeyCode::Left if caret > min => caret - 1,
            KeyCode::Right if caret < max => caret + 1,
            KeyCode::Home if caret != min => min,
            KeyCode::End if caret != max => max,
            _ => return,
        };
        let _ = text.set_caret(target);
        event.consume();
    }

    fn on_mouse_pressed(&self, cell: &Cell, event: &mut MouseEvent) {
        let Some(text) = TextCell::from_cell(cell) else {
            return;
        };
        if !text.can_focus() {
            return;
        }
        text.focus();
        if let Some(container) = text.container() {
            let peer = container.peer();
            if !peer.is_null() {
                let x = event.x - peer.bounds(cell).left();
                let (min, max) = caret_bounds(&text);
                let _ = text.set_caret(peer.caret_at(&text, x).clamp(min, max));
            }
        }
        event.consume();
    }
}

/// Editable text: navigation plus typing, deletion, clipboard and the
/// completion shortcut.
#[must_use]
pub fn text_editing() -> Rc<dyn CellTrait> {
    Rc::new(TextEditing {
        base: [text_navigation(true, true)],
    })
}

struct TextEditing {
    base: [Rc<dyn CellTrait>; 1],
}

/// Newlines and tabs become spaces; other control characters are dropped.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect()
}

/// Insert `inserted` at the caret and move the caret past the new graphemes.
fn insert_at_caret(text: &TextCell, inserted: &str) {
    let mut value = text.text();
    let old_count = text.len();
    let caret = text.caret();
    value.insert_str(byte_offset(&value, caret), inserted);
    let new_count = value.graphemes(true).count();
    let _ = text.set_text(value);
    let _ = text.set_caret(caret + new_count.saturating_sub(old_count));
    trace!(caret = text.caret(), graphemes = new_count, "text inserted");
}

fn remove_grapheme(text: &TextCell, index: usize) {
    let mut value = text.text();
    let start = byte_offset(&value, index);
    let end = byte_offset(&value, index + 1);
    value.replace_range(start..end, "");
    let _ = text.set_text(value);
}

/// Commit the only item matching the text, if there is exactly one.
fn complete_single_match(text: &TextCell) -> bool {
    let value = text.text();
    let params = CompletionParameters::default();
    let helper = CompletionHelper::completion_for(text, &params, &COMPLETION);
    if !helper.has_single_match(&value, true) {
        return false;
    }
    if let Some(item) = helper.matches(&value).first() {
        item.complete(&value).execute();
    }
    true
}

/// The after-type hook, else eager completion of a single exact match.
fn after_type(text: &TextCell) -> bool {
    if let Some(hook) = text.get_trait(&AFTER_TYPE) {
        return hook();
    }
    text.get_trait(&EAGER_COMPLETION) && text.is_end() && complete_single_match(text)
}

impl CellTrait for TextEditing {
    fn base_traits(&self) -> &[Rc<dyn CellTrait>] {
        &self.base
    }

    fn property(&self, _cell: &Cell, key: PropertyKey) -> Lookup {
        if FOCUSABLE.is(key) {
            return Lookup::value(true);
        }
        if STATE_HANDLER.is(key) {
            return state_handler(false);
        }
        Lookup::Unset
    }

    fn on_key_typed(&self, cell: &Cell, event: &mut KeyEvent) {
        let Some(text) = TextCell::from_cell(cell) else {
            return;
        };
        let Some(ch) = event.char() else {
            return;
        };
        if ch.is_control() || event.ctrl() || event.alt() || event.super_key() {
            return;
        }
        let mut buf = [0u8; 4];
        insert_at_caret(&text, ch.encode_utf8(&mut buf));
        event.consume();
        after_type(&text);
    }

    fn on_key_pressed(&self, cell: &Cell, event: &mut KeyEvent) {
        let Some(text) = TextCell::from_cell(cell) else {
            return;
        };
        if event.is(KeyCode::Char(' '), Modifiers::CTRL) {
            let mut request = CompletionEvent::new(true);
            cell.dispatch(CellEvent::Complete(&mut request));
            if request.is_consumed() {
                event.consume();
            }
            return;
        }
        if event.is_plain(KeyCode::Enter) {
            if complete_single_match(&text) {
                event.consume();
            }
            return;
        }
        let caret = text.caret();
        if event.is_plain(KeyCode::Backspace) && caret > 0 {
            remove_grapheme(&text, caret - 1);
            let _ = text.set_caret(caret - 1);
            event.consume();
        } else if event.is_plain(KeyCode::Delete) && caret < text.len() {
            remove_grapheme(&text, caret);
            event.consume();
        }
    }

    fn on_copy(&self, cell: &Cell, event: &mut CopyCutEvent) {
        if let Some(text) = TextCell::from_cell(cell) {
            event.set_result(ClipboardContent::text(text.text()));
        }
    }

    fn on_cut(&self, cell: &Cell, event: &mut CopyCutEvent) {
        if let Some(text) = TextCell::from_cell(cell) {
            event.set_result(ClipboardContent::text(text.text()));
            let _ = text.set_text(String::new());
            let _ = text.set_caret(0);
        }
    }

    fn on_paste(&self, cell: &Cell, event: &mut PasteEvent) {
        let Some(text) = TextCell::from_cell(cell) else {
            return;
        };
        let clean = sanitize(&event.content.text);
        if clean.is_empty() {
            return;
        }
        insert_at_caret(&text, &clean);
        event.consume();
    }
}

/// Editing that keeps `validator` satisfied at the text's boundaries:
/// a character that would turn valid text invalid at the end (or start)
/// goes to `EXPAND_RIGHT` (or `EXPAND_LEFT`) instead. Invalid text is
/// shown in red.
#[must_use]
pub fn valid_text_editing(validator: impl Fn(&str) -> bool + 'static) -> Rc<dyn CellTrait> {
    Rc::new(ValidTextEditing {
        validator: Rc::new(validator),
        base: [text_editing()],
    })
}

struct ValidTextEditing {
    validator: Validator,
    base: [Rc<dyn CellTrait>; 1],
}

impl ValidTextEditing {
    /// Red for invalid text, else `VALID_TEXT_COLOR` if one is set.
    fn color_for(&self, cell: &Cell, text: &str) -> Option<Color> {
        if (self.validator)(text) {
            cell.get_trait(&VALID_TEXT_COLOR)
        } else {
            Some(Color::RED)
        }
    }
}

impl CellTrait for ValidTextEditing {
    fn base_traits(&self) -> &[Rc<dyn CellTrait>] {
        &self.base
    }

    fn property(&self, cell: &Cell, key: PropertyKey) -> Lookup {
        if VALIDATOR.is(key) {
            return Lookup::value(Some(Rc::clone(&self.validator)));
        }
        if STATE_HANDLER.is(key) {
            return state_handler(true);
        }
        if TEXT_COLOR.is(key)
            && let Some(color) = self.color_for(cell, &cell.get(&TEXT))
        {
            return Lookup::value(Some(color));
        }
        Lookup::Unset
    }

    fn on_property_changed(&self, cell: &Cell, change: &PropertyChange<'_>) {
        if let Some(text) = change.of(&TEXT)
            && !cell.is_stored(&TEXT_COLOR)
        {
            let old = self.color_for(cell, text.old);
            let new = self.color_for(cell, text.new);
            cell.notify_computed(&TEXT_COLOR, old, new);
        }
    }

    fn on_key_typed(&self, cell: &Cell, event: &mut KeyEvent) {
        let Some(text) = TextCell::from_cell(cell) else {
            return;
        };
        let Some(ch) = event.char() else {
            return;
        };
        if ch.is_control() || event.ctrl() || event.alt() || event.super_key() {
            return;
        }
        let current = text.text();
        if !(self.validator)(&current) {
            return;
        }
        let caret = text.caret();
        let mut candidate = current.clone();
        candidate.insert(byte_offset(&current, caret), ch);
        if (self.validator)(&candidate) {
            return;
        }

        let spec = if caret >= text.len() {
            &EXPAND_RIGHT
        } else if caret == 0 {
            &EXPAND_LEFT
        } else {
            return;
        };
        if let Some(expand) = cell.get_trait(spec) {
            trace!(side = spec.name(), "expanding side transform");
            expand(&ch.to_string()).execute();
            event.consume();
        }
    }
}
