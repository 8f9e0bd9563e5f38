//! Column symbols.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A named reference to a single output column of some plan subtree.
///
/// Equality, hashing and ordering are by name. A symbol carries no type;
/// resolving types is the job of whoever holds the symbol-to-type table.
///
/// # Example
///
/// ```
/// use quarry_core::Symbol;
///
/// let a = Symbol::new("custkey");
/// let b: Symbol = "custkey".into();
/// assert_eq!(a, b);
/// assert_eq!(a.name(), "custkey");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol with the given name.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The symbol name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    #[inline]
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}
