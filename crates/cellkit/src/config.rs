#![forbid(unsafe_code)]

//! Per-container editor configuration.
//!
//! Every [`crate::CellContainer`] carries an [`EditorConfig`]. Trait
//! properties that have a container-wide default (eager completion, menu
//! length) read it from the container of the cell being asked.
//!
//! # Loading
//!
//! ```toml
//! eager_completion = true
//! menu_max_items = 20
//! ```
//!
//! ```rust,ignore
//! let config = EditorConfig::from_toml_str(text)?;
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Default number of rows a completion menu renders.
pub const DEFAULT_MENU_MAX_ITEMS: usize = 50;

/// Tunables shared by every cell of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct EditorConfig {
    /// Commit side-transform completions as soon as exactly one item
    /// matches, even if longer items still extend the typed text.
    pub eager_completion: bool,

    /// Maximum number of rows the completion menu renders.
    pub menu_max_items: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            eager_completion: false,
            menu_max_items: DEFAULT_MENU_MAX_ITEMS,
        }
    }
}

impl EditorConfig {
    #[must_use]
    pub fn with_eager_completion(mut self, eager: bool) -> Self {
        self.eager_completion = eager;
        self
    }

    #[must_use]
    pub fn with_menu_max_items(mut self, max: usize) -> Self {
        self.menu_max_items = max;
        self
    }

    /// Clamp fields into their valid ranges.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.menu_max_items = self.menu_max_items.max(1);
        self
    }

    /// Validation errors; empty when the config is usable as-is.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.menu_max_items == 0 {
            errors.push("menu_max_items must be > 0".into());
        }
        errors
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, EditorConfigError> {
        let config: Self = toml::from_str(s).map_err(EditorConfigError::Toml)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(EditorConfigError::Validation(errors))
        }
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, EditorConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(EditorConfigError::Io)?;
        Self::from_toml_str(&content)
    }
}

/// Failure to load an [`EditorConfig`].
#[derive(Debug)]
pub enum EditorConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for EditorConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for EditorConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
