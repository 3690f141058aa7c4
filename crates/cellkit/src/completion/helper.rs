#![forbid(unsafe_code)]

//! Queries over a fixed list of completion items.

use crate::cell::Cell;
use crate::completion::{CompletionItemRef, CompletionParameters, CompletionSupplier};
use crate::property::CellTraitPropertySpec;

#[derive(Clone, Default)]
pub struct CompletionHelper {
    items: Vec<CompletionItemRef>,
}

impl CompletionHelper {
    #[must_use]
    pub fn new(items: Vec<CompletionItemRef>) -> Self {
        Self { items }
    }

    /// Items `cell` supplies through `spec` for `params`.
    #[must_use]
    pub fn completion_for(
        cell: &Cell,
        params: &CompletionParameters,
        spec: &'static CellTraitPropertySpec<CompletionSupplier>,
    ) -> Self {
        Self::new(cell.get_trait(spec).get(params))
    }

    #[must_use]
    pub fn items(&self) -> &[CompletionItemRef] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<CompletionItemRef> {
        self.items
    }

    /// Items that `text` selects exactly.
    #[must_use]
    pub fn matches(&self, text: &str) -> Vec<CompletionItemRef> {
        self.items
            .iter()
            .filter(|item| item.is_match(text))
            .cloned()
            .collect()
    }

    /// Items that strictly extend `text`.
    #[must_use]
    pub fn prefixed_by(&self, text: &str) -> Vec<CompletionItemRef> {
        self.items
            .iter()
            .filter(|item| item.is_strict_match_prefix(text))
            .cloned()
            .collect()
    }

    /// Exactly one item matches `text` and, unless completion is eager, no
    /// other item could still be reached by typing more.
    #[must_use]
    pub fn has_single_match(&self, text: &str, eager: bool) -> bool {
        self.matches(text).len() == 1 && (eager || self.prefixed_by(text).is_empty())
    }
}

impl std::fmt::Debug for CompletionHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHelper")
            .field("items", &self.items.len())
            .finish()
    }
}
