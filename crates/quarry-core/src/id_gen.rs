//! Allocation of plan node ids and symbol names.
//!
//! Both allocators are owned by whoever builds or rewrites a plan. The id
//! allocator is thread-safe and can be shared across optimizer threads; the
//! symbol allocator tracks every issued name and needs `&mut self`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{PlanNodeId, Symbol};

/// Name used when a caller passes an empty hint.
const DEFAULT_HINT: &str = "expr";

/// A monotonic plan node id generator.
///
/// Ids start from 0. Use [`PlanNodeIdAllocator::with_start`] to resume after
/// loading a plan that already contains ids.
///
/// # Example
///
/// ```
/// use quarry_core::PlanNodeIdAllocator;
///
/// let ids = PlanNodeIdAllocator::new();
/// assert_eq!(ids.next_id().as_u64(), 0);
/// assert_eq!(ids.next_id().as_u64(), 1);
/// ```
#[derive(Debug)]
pub struct PlanNodeIdAllocator {
    next_id: AtomicU64,
}

impl PlanNodeIdAllocator {
    /// Create a new allocator starting from 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { next_id: AtomicU64::new(0) }
    }

    /// Create an allocator whose first id is `start`.
    #[must_use]
    pub const fn with_start(start: u64) -> Self {
        Self { next_id: AtomicU64::new(start) }
    }

    /// Generate the next id.
    ///
    /// This operation is atomic and thread-safe.
    pub fn next_id(&self) -> PlanNodeId {
        PlanNodeId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// The next id to be assigned.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

impl Default for PlanNodeIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Mints symbols whose names are unique among everything this allocator has
/// seen.
///
/// A fresh hint is returned unchanged. Once a name is taken, further requests
/// for it get `hint_N` where `N` comes from a counter shared by all hints. A
/// trailing `_N` on the hint itself is stripped first, so re-deriving a
/// symbol from `orderkey_3` yields another `orderkey_*` name instead of
/// `orderkey_3_0`.
#[derive(Debug, Default)]
pub struct SymbolAllocator {
    used: HashSet<String>,
    next_suffix: u64,
}

impl SymbolAllocator {
    /// Create an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator that will never hand out any of `existing`.
    #[must_use]
    pub fn with_existing<'a>(existing: impl IntoIterator<Item = &'a Symbol>) -> Self {
        let mut allocator = Self::new();
        for symbol in existing {
            allocator.register(symbol);
        }
        allocator
    }

    /// Mark `symbol` as taken. Returns `false` if it already was.
    pub fn register(&mut self, symbol: &Symbol) -> bool {
        self.used.insert(symbol.name().to_string())
    }

    /// Returns true if the name has been issued or registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// Number of names issued or registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.used.len()
    }

    /// Returns true if nothing has been issued or registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Mint a new symbol derived from `hint`.
    pub fn new_symbol(&mut self, hint: &str) -> Symbol {
        let base = strip_numeric_suffix(hint);
        let base = if base.is_empty() { DEFAULT_HINT } else { base };

        let mut candidate = base.to_string();
        while self.used.contains(&candidate) {
            candidate = format!("{base}_{}", self.next_suffix);
            self.next_suffix += 1;
        }
        self.used.insert(candidate.clone());
        Symbol::new(candidate)
    }

    /// Mint a new symbol derived from an existing one.
    pub fn new_symbol_from(&mut self, symbol: &Symbol) -> Symbol {
        self.new_symbol(symbol.name())
    }
}

fn strip_numeric_suffix(hint: &str) -> &str {
    match hint.rsplit_once('_') {
        Some((head, tail))
            if !head.is_empty() && !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) =>
        {
            head
        }
        _ => hint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_allocator_starts_at_zero() {
        let ids = PlanNodeIdAllocator::new();
        assert_eq!(ids.next_id(), PlanNodeId::new(0));
        assert_eq!(ids.next_id(), PlanNodeId::new(1));
        assert_eq!(ids.current(), 2);
    }

    #[test]
    fn id_allocator_with_start() {
        let ids = PlanNodeIdAllocator::with_start(100);
        assert_eq!(ids.next_id().as_u64(), 100);
    }

    #[test]
    fn id_allocator_is_shareable() {
        let ids = std::sync::Arc::new(PlanNodeIdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = std::sync::Arc::clone(&ids);
                std::thread::spawn(move || (0..100).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<PlanNodeId> =
            handles.into_iter().flat_map(|h| h.join().expect("thread panicked")).collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 400);
    }

    #[test]
    fn fresh_hint_is_returned_unchanged() {
        let mut symbols = SymbolAllocator::new();
        assert_eq!(symbols.new_symbol("orderkey"), Symbol::new("orderkey"));
    }

    #[test]
    fn taken_hint_gets_suffix() {
        let mut symbols = SymbolAllocator::new();
        symbols.new_symbol("orderkey");
        assert_eq!(symbols.new_symbol("orderkey"), Symbol::new("orderkey_0"));
        assert_eq!(symbols.new_symbol("orderkey"), Symbol::new("orderkey_1"));
        assert_eq!(symbols.new_symbol("custkey"), Symbol::new("custkey"));
        assert_eq!(symbols.new_symbol("custkey"), Symbol::new("custkey_2"));
    }

    #[test]
    fn numeric_suffix_is_stripped() {
        let mut symbols = SymbolAllocator::new();
        let first = symbols.new_symbol("orderkey");
        let second = symbols.new_symbol("orderkey");
        let third = symbols.new_symbol_from(&second);
        assert_eq!(first, Symbol::new("orderkey"));
        assert_eq!(second, Symbol::new("orderkey_0"));
        assert_eq!(third, Symbol::new("orderkey_1"));
    }

    #[test]
    fn non_numeric_suffix_is_kept() {
        let mut symbols = SymbolAllocator::new();
        assert_eq!(symbols.new_symbol("order_key"), Symbol::new("order_key"));
    }

    #[test]
    fn empty_hint_uses_default() {
        let mut symbols = SymbolAllocator::new();
        assert_eq!(symbols.new_symbol(""), Symbol::new("expr"));
        assert_eq!(symbols.new_symbol(""), Symbol::new("expr_0"));
    }

    #[test]
    fn existing_symbols_are_never_reissued() {
        let existing = [Symbol::new("a"), Symbol::new("a_0")];
        let mut symbols = SymbolAllocator::with_existing(&existing);
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols.new_symbol("a"), Symbol::new("a_1"));
        assert!(symbols.contains("a_1"));
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn minted_symbols_are_distinct(hints in prop::collection::vec("[a-z]{0,3}(_[0-9]{1,2})?", 0..40)) {
                let mut symbols = SymbolAllocator::new();
                let minted: Vec<Symbol> = hints.iter().map(|hint| symbols.new_symbol(hint)).collect();
                let distinct: HashSet<&Symbol> = minted.iter().collect();
                prop_assert_eq!(distinct.len(), minted.len());
                prop_assert_eq!(symbols.len(), minted.len());
            }
        }
    }
}
