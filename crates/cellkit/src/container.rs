#![forbid(unsafe_code)]

//! The cell container: root cell, focus slot, rendering peer and the input
//! surface.
//!
//! A container is the single entry point for input. Key, clipboard and
//! completion events start at the focused cell (or the root when nothing is
//! focused); mouse events start at the deepest visible cell under the
//! pointer when a rendering peer is attached, else at the root.
//!
//! # Focus invariant
//!
//! The focused cell, if any, is focusable, visible and attached to this
//! container. Moving focus sets [`FOCUSED`] to false on the old cell and
//! dispatches `FocusLost` there, then sets it to true on the new cell and
//! dispatches `FocusGained`, then notifies container listeners.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use cellkit_core::{
    ClipboardContent, Consumable, KeyEvent, Listeners, MouseEvent, Rect, Registration, Vector,
};
use tracing::debug;

use crate::cell::{Cell, CellKind, ChildEvent, FOCUSED, VISIBLE};
use crate::config::EditorConfig;
use crate::error::{CellError, fatal};
use crate::event::{CellEvent, CompletionEvent, CopyCutEvent, FocusEvent, PasteEvent};
use crate::property::{CellTraitPropertySpec, PropertyChange};
use crate::text::TextCell;

/// Geometry services a renderer provides to the core.
pub trait CellContainerPeer {
    /// On-screen bounds of a cell.
    fn bounds(&self, cell: &Cell) -> Rect;

    /// Bring a cell into view.
    fn scroll_to(&self, cell: &Cell);

    /// Caret index closest to horizontal offset `x` inside a text cell.
    fn caret_at(&self, cell: &TextCell, x: i32) -> usize;

    /// Horizontal offset of caret index `caret` inside a text cell.
    fn caret_offset(&self, cell: &TextCell, caret: usize) -> i32;

    /// Whether this is the placeholder used before a renderer attaches.
    fn is_null(&self) -> bool {
        false
    }
}

/// Placeholder peer: geometry queries are fatal, scrolling does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPeer;

impl CellContainerPeer for NullPeer {
    fn bounds(&self, _cell: &Cell) -> Rect {
        fatal(CellError::PeerUnavailable)
    }

    fn scroll_to(&self, _cell: &Cell) {}

    fn caret_at(&self, _cell: &TextCell, _x: i32) -> usize {
        fatal(CellError::PeerUnavailable)
    }

    fn caret_offset(&self, _cell: &TextCell, _caret: usize) -> i32 {
        fatal(CellError::PeerUnavailable)
    }

    fn is_null(&self) -> bool {
        true
    }
}

/// Aggregated observer for every cell of a container.
#[allow(unused_variables)]
pub trait CellContainerListener {
    fn on_cell_attached(&self, cell: &Cell) {}
    fn on_cell_detached(&self, cell: &Cell) {}
    fn on_property_changed(&self, cell: &Cell, change: &PropertyChange<'_>) {}
    fn on_child_added(&self, parent: &Cell, event: &ChildEvent) {}
    fn on_child_removed(&self, parent: &Cell, event: &ChildEvent) {}
    fn on_popup_added(&self, popup: &Cell) {}
    fn on_popup_removed(&self, popup: &Cell) {}
    fn on_focus_changed(&self, old: Option<&Cell>, new: Option<&Cell>) {}
}

/// Saves and restores the editing state of a cell (caret, text, ...).
pub trait CellStateHandler {
    fn save_state(&self, cell: &Cell) -> Box<dyn Any>;
    fn restore_state(&self, cell: &Cell, state: &dyn Any);
}

/// State handler a cell's traits expose for [`CellContainer::save_state`].
pub static STATE_HANDLER: CellTraitPropertySpec<Option<Rc<dyn CellStateHandler>>> =
    CellTraitPropertySpec::new("stateHandler", |_| None);

pub(crate) struct ContainerInner {
    root: Cell,
    focused: RefCell<Option<Cell>>,
    peer: RefCell<Rc<dyn CellContainerPeer>>,
    listeners: Listeners<dyn CellContainerListener>,
    config: RefCell<EditorConfig>,
}

/// Owner of one editable cell tree. Cloning yields another handle to the
/// same container.
#[derive(Clone)]
pub struct CellContainer {
    inner: Rc<ContainerInner>,
}

impl PartialEq for CellContainer {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for CellContainer {}

impl fmt::Debug for CellContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellContainer")
            .field("root", &self.inner.root)
            .field("focused", &*self.inner.focused.borrow())
            .finish_non_exhaustive()
    }
}

impl Default for CellContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl CellContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    #[must_use]
    pub fn with_config(config: EditorConfig) -> Self {
        let container = Self {
            inner: Rc::new(ContainerInner {
                root: Cell::new(CellKind::Generic),
                focused: RefCell::new(None),
                peer: RefCell::new(Rc::new(NullPeer)),
                listeners: Listeners::new(),
                config: RefCell::new(config.validated()),
            }),
        };
        container.inner.root.attach(&container);
        container
    }

    pub(crate) fn from_weak(weak: &Weak<ContainerInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn downgrade(&self) -> Weak<ContainerInner> {
        Rc::downgrade(&self.inner)
    }

    #[must_use]
    pub fn root(&self) -> Cell {
        self.inner.root.clone()
    }

    #[must_use]
    pub fn config(&self) -> EditorConfig {
        self.inner.config.borrow().clone()
    }

    pub fn set_config(&self, config: EditorConfig) {
        *self.inner.config.borrow_mut() = config.validated();
    }

    #[must_use]
    pub fn peer(&self) -> Rc<dyn CellContainerPeer> {
        Rc::clone(&self.inner.peer.borrow())
    }

    /// Install a rendering peer. The returned registration reinstalls the
    /// null peer.
    pub fn set_peer(&self, peer: Rc<dyn CellContainerPeer>) -> Registration {
        *self.inner.peer.borrow_mut() = peer;
        let weak = self.downgrade();
        Registration::new(move || {
            if let Some(container) = Self::from_weak(&weak) {
                *container.inner.peer.borrow_mut() = Rc::new(NullPeer);
            }
        })
    }

    pub fn add_listener(&self, listener: Rc<dyn CellContainerListener>) -> Registration {
        self.inner.listeners.add(listener)
    }

    // ------------------------------------------------------------------
    // Focus
    // ------------------------------------------------------------------

    #[must_use]
    pub fn focused_cell(&self) -> Option<Cell> {
        self.inner.focused.borrow().clone()
    }

    /// Move focus. Panics if `cell` cannot be focused in this container.
    pub fn set_focused(&self, cell: Option<Cell>) {
        if let Err(err) = self.try_set_focused(cell) {
            fatal(err);
        }
    }

    pub fn try_set_focused(&self, cell: Option<Cell>) -> Result<(), CellError> {
        if let Some(cell) = &cell {
            match cell.container() {
                None => return Err(CellError::Detached),
                Some(other) if other != *self => return Err(CellError::DifferentContainer),
                Some(_) => {}
            }
            if !cell.can_focus() {
                return Err(CellError::NotFocusable);
            }
        }

        let old = self.inner.focused.replace(cell.clone());
        if old == cell {
            return Ok(());
        }
        debug!(old = ?old, new = ?cell, "focus changed");

        if let Some(old_cell) = &old {
            let _ = old_cell.set(&FOCUSED, false);
            let mut event = FocusEvent::new(old.clone(), cell.clone());
            old_cell.dispatch(CellEvent::FocusLost(&mut event));
        }
        if let Some(new_cell) = &cell {
            let _ = new_cell.set(&FOCUSED, true);
            let mut event = FocusEvent::new(old.clone(), cell.clone());
            new_cell.dispatch(CellEvent::FocusGained(&mut event));
        }
        self.inner
            .listeners
            .fire(|l| l.on_focus_changed(old.as_ref(), cell.as_ref()));
        Ok(())
    }

    /// Snapshot focus and the focused cell's editing state.
    #[must_use]
    pub fn save_state(&self) -> ContainerState {
        let focused = self.focused_cell();
        let saved = focused.as_ref().and_then(|cell| {
            cell.get_trait(&STATE_HANDLER)
                .map(|handler| {
                    let state = handler.save_state(cell);
                    (handler, state)
                })
        });
        ContainerState {
            container: self.downgrade(),
            focused,
            saved,
        }
    }

    // ------------------------------------------------------------------
    // Input surface
    // ------------------------------------------------------------------

    fn focus_target(&self) -> Cell {
        self.focused_cell().unwrap_or_else(|| self.root())
    }

    pub fn key_pressed(&self, mut event: KeyEvent) -> bool {
        self.focus_target().dispatch(CellEvent::KeyPressed(&mut event));
        event.is_consumed()
    }

    pub fn key_released(&self, mut event: KeyEvent) -> bool {
        self.focus_target()
            .dispatch(CellEvent::KeyReleased(&mut event));
        event.is_consumed()
    }

    pub fn key_typed(&self, mut event: KeyEvent) -> bool {
        self.focus_target().dispatch(CellEvent::KeyTyped(&mut event));
        event.is_consumed()
    }

    pub fn mouse_pressed(&self, mut event: MouseEvent) -> bool {
        self.mouse_target(&event)
            .dispatch(CellEvent::MousePressed(&mut event));
        event.is_consumed()
    }

    pub fn mouse_released(&self, mut event: MouseEvent) -> bool {
        self.mouse_target(&event)
            .dispatch(CellEvent::MouseReleased(&mut event));
        event.is_consumed()
    }

    pub fn mouse_moved(&self, mut event: MouseEvent) -> bool {
        self.mouse_target(&event)
            .dispatch(CellEvent::MouseMoved(&mut event));
        event.is_consumed()
    }

    pub fn mouse_dragged(&self, mut event: MouseEvent) -> bool {
        self.mouse_target(&event)
            .dispatch(CellEvent::MouseDragged(&mut event));
        event.is_consumed()
    }

    /// Content produced by a copy handler, if any.
    pub fn copy(&self) -> Option<ClipboardContent> {
        let mut event = CopyCutEvent::new();
        self.focus_target().dispatch(CellEvent::Copy(&mut event));
        event.result
    }

    pub fn cut(&self) -> Option<ClipboardContent> {
        let mut event = CopyCutEvent::new();
        self.focus_target().dispatch(CellEvent::Cut(&mut event));
        event.result
    }

    pub fn paste(&self, content: ClipboardContent) -> bool {
        let mut event = PasteEvent::new(content);
        self.focus_target().dispatch(CellEvent::Paste(&mut event));
        event.is_consumed()
    }

    /// Request completion at the focused cell.
    pub fn complete(&self, menu: bool) -> bool {
        let mut event = CompletionEvent::new(menu);
        self.focus_target().dispatch(CellEvent::Complete(&mut event));
        event.is_consumed()
    }

    fn mouse_target(&self, event: &MouseEvent) -> Cell {
        let peer = self.peer();
        if peer.is_null() {
            return self.root();
        }
        let point = Vector::new(event.x, event.y);
        find_cell(peer.as_ref(), &self.root(), point).unwrap_or_else(|| self.root())
    }

    // ------------------------------------------------------------------
    // Notifications from the cell tree
    // ------------------------------------------------------------------

    pub(crate) fn cell_attached(&self, cell: &Cell) {
        self.inner.listeners.fire(|l| l.on_cell_attached(cell));
    }

    pub(crate) fn cell_detached(&self, cell: &Cell) {
        self.inner.listeners.fire(|l| l.on_cell_detached(cell));
    }

    pub(crate) fn property_changed(&self, cell: &Cell, change: &PropertyChange<'_>) {
        self.inner
            .listeners
            .fire(|l| l.on_property_changed(cell, change));
    }

    pub(crate) fn child_added(&self, parent: &Cell, event: &ChildEvent) {
        self.inner
            .listeners
            .fire(|l| l.on_child_added(parent, event));
    }

    pub(crate) fn child_removed(&self, parent: &Cell, event: &ChildEvent) {
        self.inner
            .listeners
            .fire(|l| l.on_child_removed(parent, event));
    }

    pub(crate) fn popup_added(&self, popup: &Cell) {
        self.inner.listeners.fire(|l| l.on_popup_added(popup));
    }

    pub(crate) fn popup_removed(&self, popup: &Cell) {
        self.inner.listeners.fire(|l| l.on_popup_removed(popup));
    }
}

/// Deepest visible cell whose bounds contain `point`; popups are searched
/// before children since they render on top.
fn find_cell(peer: &dyn CellContainerPeer, cell: &Cell, point: Vector) -> Option<Cell> {
    if !cell.get(&VISIBLE) {
        return None;
    }
    for popup in cell.popups().iter().rev() {
        if let Some(found) = find_cell(peer, popup, point) {
            return Some(found);
        }
    }
    if !peer.bounds(cell).contains(point) {
        return None;
    }
    for child in cell.children() {
        if let Some(found) = find_cell(peer, &child, point) {
            return Some(found);
        }
    }
    Some(cell.clone())
}

/// Focus and editing state captured by [`CellContainer::save_state`].
pub struct ContainerState {
    container: Weak<ContainerInner>,
    focused: Option<Cell>,
    saved: Option<(Rc<dyn CellStateHandler>, Box<dyn Any>)>,
}

impl ContainerState {
    #[must_use]
    pub fn focused(&self) -> Option<&Cell> {
        self.focused.as_ref()
    }

    /// Refocus the saved cell if it can still take focus, then restore its
    /// editing state.
    pub fn restore(&self) {
        let Some(container) = CellContainer::from_weak(&self.container) else {
            return;
        };
        match &self.focused {
            Some(cell) if cell.can_focus() && cell.container().as_ref() == Some(&container) => {
                container.set_focused(Some(cell.clone()));
            }
            Some(_) => {}
            None => container.set_focused(None),
        }
        if let (Some(cell), Some((handler, state))) = (&self.focused, &self.saved) {
            handler.restore_state(cell, state.as_ref());
        }
    }
}

impl fmt::Debug for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerState")
            .field("focused", &self.focused)
            .field("has_cell_state", &self.saved.is_some())
            .finish()
    }
}
