//! Symbol type lookup.
//!
//! Symbols carry no type of their own. Checks that need types, such as the
//! copartitioning type check, ask a [`TypeProvider`] instead.

use std::collections::HashMap;
use std::fmt;

use quarry_core::Symbol;
use serde::{Deserialize, Serialize};

/// Resolves the type name of a symbol.
pub trait TypeProvider: fmt::Debug + Send + Sync {
    /// Returns the type name of `symbol`, or `None` if it is unknown.
    fn type_of(&self, symbol: &Symbol) -> Option<&str>;
}

/// A [`TypeProvider`] backed by an in-memory map.
///
/// Serializes as a JSON object from symbol name to type name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTypes {
    types: HashMap<Symbol, String>,
}

impl SymbolTypes {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the type of `symbol`, returning the previous type if any.
    pub fn insert(&mut self, symbol: Symbol, type_name: impl Into<String>) -> Option<String> {
        self.types.insert(symbol, type_name.into())
    }

    /// Builder form of [`SymbolTypes::insert`].
    #[must_use]
    pub fn with(mut self, symbol: impl Into<Symbol>, type_name: impl Into<String>) -> Self {
        self.insert(symbol.into(), type_name);
        self
    }

    /// Number of typed symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no symbol is typed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeProvider for SymbolTypes {
    fn type_of(&self, symbol: &Symbol) -> Option<&str> {
        self.types.get(symbol).map(String::as_str)
    }
}

impl<S: Into<Symbol>, T: Into<String>> FromIterator<(S, T)> for SymbolTypes {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        Self { types: iter.into_iter().map(|(s, t)| (s.into(), t.into())).collect() }
    }
}
