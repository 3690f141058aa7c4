#![forbid(unsafe_code)]

//! Completion: turning typed text into a menu of structural edits.
//!
//! A cell offers completion by answering the [`COMPLETION`] trait property
//! with a [`CompletionSupplier`]. [`support::completion_support`] turns a
//! completion request into a front popup with a text field and a menu; side
//! transforms ([`support::show_side_transform_popup`]) do the same at a
//! token boundary and commit eagerly once the typed text is unambiguous.
//!
//! Every item commit returns a [`CellAction`] that places the caret after
//! the edit; the caller executes it.

pub mod helper;
pub mod menu;
pub mod support;

use std::fmt;
use std::rc::Rc;

use crate::action::CellAction;
use crate::cell::{Cell, LEFT_POPUP, RIGHT_POPUP};
use crate::property::{CellPropertySpec, CellTraitPropertySpec};

pub use helper::CompletionHelper;
pub use menu::CompletionMenuModel;
pub use support::{
    HIDE_COMPLETION, completion_support, show_completion, show_popup, show_side_transform_popup,
};

/// A candidate completion.
pub trait CompletionItem {
    /// Menu label for the current typed text.
    fn visible_text(&self, text: &str) -> String;

    /// `text` is a proper prefix of the item.
    fn is_strict_match_prefix(&self, text: &str) -> bool;

    /// The item should be listed while `text` is typed.
    fn is_match_prefix(&self, text: &str) -> bool;

    /// `text` selects exactly this item.
    fn is_match(&self, text: &str) -> bool;

    fn is_low_priority(&self) -> bool {
        false
    }

    /// Apply the edit for `text` and return where the caret goes.
    fn complete(&self, text: &str) -> CellAction;
}

pub type CompletionItemRef = Rc<dyn CompletionItem>;

pub(crate) fn same_item(a: &CompletionItemRef, b: &CompletionItemRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// An item matching one canonical text.
pub struct SimpleCompletionItem {
    text: String,
    visible_text: Option<String>,
    ignore_case: bool,
    low_priority: bool,
    handler: Rc<dyn Fn(&str) -> CellAction>,
}

impl SimpleCompletionItem {
    pub fn new(text: impl Into<String>, handler: impl Fn(&str) -> CellAction + 'static) -> Self {
        Self {
            text: text.into(),
            visible_text: None,
            ignore_case: false,
            low_priority: false,
            handler: Rc::new(handler),
        }
    }

    #[must_use]
    pub fn with_visible_text(mut self, visible: impl Into<String>) -> Self {
        self.visible_text = Some(visible.into());
        self
    }

    #[must_use]
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    #[must_use]
    pub fn low_priority(mut self) -> Self {
        self.low_priority = true;
        self
    }

    #[must_use]
    pub fn into_ref(self) -> CompletionItemRef {
        Rc::new(self)
    }

    fn normalize<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str> {
        if self.ignore_case {
            text.to_lowercase().into()
        } else {
            text.into()
        }
    }
}

impl CompletionItem for SimpleCompletionItem {
    fn visible_text(&self, _text: &str) -> String {
        self.visible_text.clone().unwrap_or_else(|| self.text.clone())
    }

    fn is_strict_match_prefix(&self, text: &str) -> bool {
        self.is_match_prefix(text) && !self.is_match(text)
    }

    fn is_match_prefix(&self, text: &str) -> bool {
        self.normalize(&self.text).starts_with(&*self.normalize(text))
    }

    fn is_match(&self, text: &str) -> bool {
        self.normalize(&self.text) == self.normalize(text)
    }

    fn is_low_priority(&self) -> bool {
        self.low_priority
    }

    fn complete(&self, text: &str) -> CellAction {
        (self.handler)(text)
    }
}

impl fmt::Debug for SimpleCompletionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleCompletionItem")
            .field("text", &self.text)
            .field("ignore_case", &self.ignore_case)
            .field("low_priority", &self.low_priority)
            .finish_non_exhaustive()
    }
}

/// What kind of completion is being requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionParameters {
    /// The full menu was asked for, not just an inline match.
    pub menu: bool,
    /// A right transform at the end of a token.
    pub end_right_transform: bool,
}

impl CompletionParameters {
    #[must_use]
    pub const fn menu() -> Self {
        Self {
            menu: true,
            end_right_transform: false,
        }
    }
}

/// Produces completion items for a set of parameters.
#[derive(Clone)]
pub struct CompletionSupplier {
    supply: Rc<dyn Fn(&CompletionParameters) -> Vec<CompletionItemRef>>,
}

impl CompletionSupplier {
    pub fn new(supply: impl Fn(&CompletionParameters) -> Vec<CompletionItemRef> + 'static) -> Self {
        Self {
            supply: Rc::new(supply),
        }
    }

    /// A supplier that never offers anything.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(|_| Vec::new())
    }

    /// A supplier returning the same items for every request.
    #[must_use]
    pub fn from_items(items: Vec<CompletionItemRef>) -> Self {
        Self::new(move |_| items.clone())
    }

    #[must_use]
    pub fn get(&self, params: &CompletionParameters) -> Vec<CompletionItemRef> {
        (self.supply)(params)
    }
}

impl Default for CompletionSupplier {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for CompletionSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSupplier").finish_non_exhaustive()
    }
}

/// Programmatic control over a cell's completion popup.
pub trait CompletionController {
    fn is_active(&self) -> bool;
    fn can_activate(&self) -> bool;
    fn set_active(&self, active: bool);
    fn has_ambiguous_matches(&self) -> bool;
}

pub static COMPLETION: CellTraitPropertySpec<CompletionSupplier> =
    CellTraitPropertySpec::new("completion", |_| CompletionSupplier::empty());
pub static LEFT_TRANSFORM: CellTraitPropertySpec<CompletionSupplier> =
    CellTraitPropertySpec::new("leftTransform", |_| CompletionSupplier::empty());
pub static RIGHT_TRANSFORM: CellTraitPropertySpec<CompletionSupplier> =
    CellTraitPropertySpec::new("rightTransform", |_| CompletionSupplier::empty());
pub static COMPLETION_CONTROLLER: CellTraitPropertySpec<Option<Rc<dyn CompletionController>>> =
    CellTraitPropertySpec::new("completionController", |_| None);

/// Boundary of a cell a side transform attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Supplier spec consulted for transforms on this side.
    #[must_use]
    pub fn transform_spec(self) -> &'static CellTraitPropertySpec<CompletionSupplier> {
        match self {
            Side::Left => &LEFT_TRANSFORM,
            Side::Right => &RIGHT_TRANSFORM,
        }
    }

    /// Popup slot the side-transform field occupies.
    #[must_use]
    pub fn popup_spec(self) -> &'static CellPropertySpec<Option<Cell>> {
        match self {
            Side::Left => &LEFT_POPUP,
            Side::Right => &RIGHT_POPUP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str) -> SimpleCompletionItem {
        SimpleCompletionItem::new(text, |_| CellAction::empty())
    }

    #[test]
    fn simple_item_matching() {
        let abc = item("abc");
        assert!(abc.is_match_prefix(""));
        assert!(abc.is_match_prefix("ab"));
        assert!(abc.is_strict_match_prefix("ab"));
        assert!(!abc.is_strict_match_prefix("abc"));
        assert!(abc.is_match("abc"));
        assert!(!abc.is_match("ab"));
        assert!(!abc.is_match_prefix("x"));
    }

    #[test]
    fn ignore_case_policy() {
        let item = item("Var").ignore_case();
        assert!(item.is_match("var"));
        assert!(item.is_match_prefix("VA"));
        assert_eq!(item.visible_text("v"), "Var");
    }

    #[test]
    fn supplier_from_items() {
        let items = vec![item("a").into_ref(), item("b").into_ref()];
        let supplier = CompletionSupplier::from_items(items);
        assert_eq!(supplier.get(&CompletionParameters::menu()).len(), 2);
        assert!(CompletionSupplier::default().get(&CompletionParameters::default()).is_empty());
    }

    #[test]
    fn item_identity() {
        let a = item("a").into_ref();
        let b = item("a").into_ref();
        assert!(same_item(&a, &Rc::clone(&a)));
        assert!(!same_item(&a, &b));
    }

    #[test]
    fn sides_map_to_specs() {
        assert_eq!(Side::Left.popup_spec().name(), "leftPopup");
        assert_eq!(Side::Right.transform_spec().name(), "rightTransform");
    }
}
