#![forbid(unsafe_code)]

//! Property specs: identity tokens for the values a cell exposes.
//!
//! A spec is declared as a `static`; its identity is its address, so two
//! specs with the same name and type are still distinct. Cell property specs
//! ([`CellPropertySpec`]) name values that can be stored in a cell's sparse
//! property bag. Trait property specs ([`CellTraitPropertySpec`]) name values
//! that only traits answer, such as completion suppliers or hooks.
//!
//! Traits answer lookups through [`crate::CellTrait::property`], returning a
//! [`Lookup`]:
//!
//! | Lookup            | Meaning                                             |
//! |-------------------|-----------------------------------------------------|
//! | `Unset`           | no opinion, ask the next trait                      |
//! | `Null`            | force the type's empty value, skip the spec default |
//! | `Value(v)`        | use `v`                                             |

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::cell::Cell;
use crate::error::{CellError, fatal};

/// Identity of a property spec, comparable across spec types.
#[derive(Clone, Copy)]
pub struct PropertyKey {
    addr: usize,
    name: &'static str,
}

impl PropertyKey {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for PropertyKey {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl Eq for PropertyKey {}

impl Hash for PropertyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyKey({})", self.name)
    }
}

/// A trait's answer to a property lookup.
pub enum Lookup {
    Unset,
    Null,
    Value(Box<dyn Any>),
}

impl Lookup {
    pub fn value<T: 'static>(value: T) -> Self {
        Lookup::Value(Box::new(value))
    }

    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Lookup::Unset)
    }
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Unset => write!(f, "Unset"),
            Lookup::Null => write!(f, "Null"),
            Lookup::Value(_) => write!(f, "Value(..)"),
        }
    }
}

/// A named, typed value a cell can store.
///
/// The default is computed from the cell, so it may depend on the cell's
/// container or other properties.
pub struct CellPropertySpec<T: 'static> {
    name: &'static str,
    default: fn(&Cell) -> T,
}

impl<T: Clone + PartialEq + Default + 'static> CellPropertySpec<T> {
    pub const fn new(name: &'static str, default: fn(&Cell) -> T) -> Self {
        Self { name, default }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn key(&'static self) -> PropertyKey {
        PropertyKey {
            addr: self as *const Self as *const () as usize,
            name: self.name,
        }
    }

    /// Whether `key` identifies this spec.
    #[must_use]
    pub fn is(&'static self, key: PropertyKey) -> bool {
        self.key() == key
    }

    pub(crate) fn default_for(&self, cell: &Cell) -> T {
        (self.default)(cell)
    }
}

impl<T> fmt::Debug for CellPropertySpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellPropertySpec({})", self.name)
    }
}

/// A named value answered only by traits, never stored on the cell.
pub struct CellTraitPropertySpec<T: 'static> {
    name: &'static str,
    default: fn(&Cell) -> T,
}

impl<T: Clone + Default + 'static> CellTraitPropertySpec<T> {
    pub const fn new(name: &'static str, default: fn(&Cell) -> T) -> Self {
        Self { name, default }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn key(&'static self) -> PropertyKey {
        PropertyKey {
            addr: self as *const Self as *const () as usize,
            name: self.name,
        }
    }

    #[must_use]
    pub fn is(&'static self, key: PropertyKey) -> bool {
        self.key() == key
    }

    pub(crate) fn default_for(&self, cell: &Cell) -> T {
        (self.default)(cell)
    }
}

impl<T> fmt::Debug for CellTraitPropertySpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellTraitPropertySpec({})", self.name)
    }
}

/// Downcast a type-erased property value, treating a mismatch as fatal.
pub(crate) fn downcast_value<T: Clone + 'static>(value: &dyn Any, key: PropertyKey) -> T {
    match value.downcast_ref::<T>() {
        Some(v) => v.clone(),
        None => fatal(CellError::TypeMismatch { property: key.name }),
    }
}

/// A property change as seen by traits and listeners.
pub struct PropertyChange<'a> {
    pub key: PropertyKey,
    pub old: &'a dyn Any,
    pub new: &'a dyn Any,
}

/// Typed view of a [`PropertyChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyChangeEvent<'a, T> {
    pub old: &'a T,
    pub new: &'a T,
}

impl<'a> PropertyChange<'a> {
    /// The typed change if it concerns `spec`.
    #[must_use]
    pub fn of<T>(&self, spec: &'static CellPropertySpec<T>) -> Option<PropertyChangeEvent<'a, T>>
    where
        T: Clone + PartialEq + Default + 'static,
    {
        if !spec.is(self.key) {
            return None;
        }
        match (self.old.downcast_ref::<T>(), self.new.downcast_ref::<T>()) {
            (Some(old), Some(new)) => Some(PropertyChangeEvent { old, new }),
            _ => fatal(CellError::TypeMismatch { property: spec.name() }),
        }
    }
}

impl fmt::Debug for PropertyChange<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChange")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
