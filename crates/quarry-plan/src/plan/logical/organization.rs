//! Partitioning and ordering of table-function inputs.

use std::fmt;

use indexmap::IndexMap;
use quarry_core::Symbol;
use serde::{Deserialize, Serialize};

use super::validate::{PlanError, PlanResult};

/// Sort direction and null placement of one ordering column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    /// Ascending, nulls first.
    AscNullsFirst,
    /// Ascending, nulls last.
    AscNullsLast,
    /// Descending, nulls first.
    DescNullsFirst,
    /// Descending, nulls last.
    DescNullsLast,
}

impl SortOrder {
    /// Returns true for ascending orders.
    #[must_use]
    pub const fn is_ascending(self) -> bool {
        matches!(self, Self::AscNullsFirst | Self::AscNullsLast)
    }

    /// Returns true if nulls sort before non-null values.
    #[must_use]
    pub const fn is_nulls_first(self) -> bool {
        matches!(self, Self::AscNullsFirst | Self::DescNullsFirst)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AscNullsFirst => "ASC NULLS FIRST",
            Self::AscNullsLast => "ASC NULLS LAST",
            Self::DescNullsFirst => "DESC NULLS FIRST",
            Self::DescNullsLast => "DESC NULLS LAST",
        };
        write!(f, "{name}")
    }
}

/// Ordered list of sort keys with their directions.
///
/// A symbol appears at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawOrderingScheme")]
pub struct OrderingScheme {
    order_by: Vec<Symbol>,
    orderings: IndexMap<Symbol, SortOrder>,
}

impl OrderingScheme {
    /// Creates an ordering scheme from `(symbol, order)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidSpecification`] if the list is empty or a
    /// symbol is repeated.
    pub fn new(keys: Vec<(Symbol, SortOrder)>) -> PlanResult<Self> {
        if keys.is_empty() {
            return Err(PlanError::InvalidSpecification("ordering scheme is empty".to_string()));
        }
        let mut order_by = Vec::with_capacity(keys.len());
        let mut orderings = IndexMap::with_capacity(keys.len());
        for (symbol, order) in keys {
            if orderings.insert(symbol.clone(), order).is_some() {
                return Err(PlanError::InvalidSpecification(format!(
                    "symbol {symbol} appears more than once in ordering scheme"
                )));
            }
            order_by.push(symbol);
        }
        Ok(Self { order_by, orderings })
    }

    /// Sort keys in order.
    #[must_use]
    pub fn order_by(&self) -> &[Symbol] {
        &self.order_by
    }

    /// The order of `symbol`, if it is a sort key.
    #[must_use]
    pub fn ordering(&self, symbol: &Symbol) -> Option<SortOrder> {
        self.orderings.get(symbol).copied()
    }

    /// Iterates `(symbol, order)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, SortOrder)> + '_ {
        self.orderings.iter().map(|(symbol, order)| (symbol, *order))
    }
}

impl fmt::Display for OrderingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (symbol, order)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{symbol} {order}")?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderingScheme {
    order_by: Vec<Symbol>,
    orderings: IndexMap<Symbol, SortOrder>,
}

impl TryFrom<RawOrderingScheme> for OrderingScheme {
    type Error = PlanError;

    fn try_from(raw: RawOrderingScheme) -> PlanResult<Self> {
        if raw.order_by.len() != raw.orderings.len() {
            return Err(PlanError::InvalidSpecification(format!(
                "ordering scheme lists {} keys but {} orderings",
                raw.order_by.len(),
                raw.orderings.len()
            )));
        }
        let keys = raw
            .order_by
            .into_iter()
            .map(|symbol| match raw.orderings.get(&symbol) {
                Some(order) => Ok((symbol, *order)),
                None => Err(PlanError::InvalidSpecification(format!(
                    "no ordering for sort key {symbol}"
                ))),
            })
            .collect::<PlanResult<Vec<_>>>()?;
        Self::new(keys)
    }
}

/// How the rows of one table argument are organized: the partition-by
/// columns and the optional within-partition ordering.
///
/// The partition-by list is never empty. An argument without partitioning
/// has no specification at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSpecification")]
pub struct DataOrganizationSpecification {
    partition_by: Vec<Symbol>,
    ordering_scheme: Option<OrderingScheme>,
}

impl DataOrganizationSpecification {
    /// Creates a specification.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidSpecification`] if `partition_by` is empty.
    pub fn new(
        partition_by: Vec<Symbol>,
        ordering_scheme: Option<OrderingScheme>,
    ) -> PlanResult<Self> {
        if partition_by.is_empty() {
            return Err(PlanError::InvalidSpecification(
                "partition by list must not be empty".to_string(),
            ));
        }
        Ok(Self { partition_by, ordering_scheme })
    }

    /// Partitioning columns, in comparison order.
    #[must_use]
    pub fn partition_by(&self) -> &[Symbol] {
        &self.partition_by
    }

    /// Within-partition ordering, if any.
    #[must_use]
    pub fn ordering_scheme(&self) -> Option<&OrderingScheme> {
        self.ordering_scheme.as_ref()
    }

    /// Every symbol the specification references: partition columns first,
    /// then sort keys not already listed.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols = self.partition_by.clone();
        if let Some(scheme) = &self.ordering_scheme {
            for symbol in scheme.order_by() {
                if !symbols.contains(symbol) {
                    symbols.push(symbol.clone());
                }
            }
        }
        symbols
    }
}

impl fmt::Display for DataOrganizationSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PARTITION BY ")?;
        for (i, symbol) in self.partition_by.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{symbol}")?;
        }
        if let Some(scheme) = &self.ordering_scheme {
            write!(f, " ORDER BY {scheme}")?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpecification {
    partition_by: Vec<Symbol>,
    #[serde(default)]
    ordering_scheme: Option<OrderingScheme>,
}

impl TryFrom<RawSpecification> for DataOrganizationSpecification {
    type Error = PlanError;

    fn try_from(raw: RawSpecification) -> PlanResult<Self> {
        Self::new(raw.partition_by, raw.ordering_scheme)
    }
}
