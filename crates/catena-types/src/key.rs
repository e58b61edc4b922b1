//! Structured content keys.
//!
//! A [`StoreKey`] identifies a logical catalog entry (e.g. a table path
//! like `analytics/sales/orders`). Keys are ordered element-wise, which is
//! the order diffs are produced in and the unit at which merge conflicts
//! are detected.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A structured, orderable key identifying a logical content entry.
///
/// A key is a non-empty sequence of non-empty path elements. Ordering is
/// lexicographic over the elements, so `a/b` sorts before `a/b/c` and
/// before `ab`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreKey {
    elements: Vec<String>,
}

impl StoreKey {
    /// Create a key from path elements.
    ///
    /// Elements must be non-empty and must not contain `/` or NUL.
    pub fn new<I, S>(elements: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let elements: Vec<String> = elements.into_iter().map(Into::into).collect();
        if elements.is_empty() {
            return Err(TypeError::InvalidKey("key must have at least one element".into()));
        }
        for element in &elements {
            if element.is_empty() {
                return Err(TypeError::InvalidKey("key elements must not be empty".into()));
            }
            if element.contains('/') || element.contains('\0') {
                return Err(TypeError::InvalidKey(format!(
                    "key element contains forbidden character: {element:?}"
                )));
            }
        }
        Ok(Self { elements })
    }

    /// Parse a key from its canonical `/`-joined form.
    pub fn from_path(path: &str) -> Result<Self, TypeError> {
        Self::new(path.split('/'))
    }

    /// The path elements of this key.
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Canonical `/`-joined representation.
    pub fn canonical(&self) -> String {
        self.elements.join("/")
    }
}

impl fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreKey({})", self.canonical())
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}
