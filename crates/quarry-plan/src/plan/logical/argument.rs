//! Table-function invocation arguments.
//!
//! An [`Argument`] is what the analyzer bound to one named parameter of a
//! table function. Scalar and descriptor arguments carry their value inline.
//! A table argument only marks that one of the node's positional sources
//! supplies the rows; how those rows are organized lives in the matching
//! [`TableArgumentProperties`](super::TableArgumentProperties).

use serde::{Deserialize, Serialize};

use super::expr::ConstantValue;

/// A named invocation argument of a table function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type", rename_all = "camelCase")]
pub enum Argument {
    /// A constant scalar value.
    Scalar(ScalarArgument),
    /// A table-shaped input supplied by a source of the node.
    Table(TableArgument),
    /// A list of column names with optional types.
    Descriptor(DescriptorArgument),
}

impl Argument {
    /// Creates a scalar argument.
    #[must_use]
    pub fn scalar(type_name: impl Into<String>, value: impl Into<ConstantValue>) -> Self {
        Self::Scalar(ScalarArgument { type_name: type_name.into(), value: value.into() })
    }

    /// Creates a table argument with the given row type.
    #[must_use]
    pub fn table(row_type: Vec<Field>) -> Self {
        Self::Table(TableArgument { row_type, partition_by: Vec::new(), order_by: Vec::new() })
    }

    /// Creates a descriptor argument.
    #[must_use]
    pub fn descriptor(fields: Vec<Field>) -> Self {
        Self::Descriptor(DescriptorArgument { fields })
    }

    /// Returns true for table arguments.
    #[must_use]
    pub const fn is_table(&self) -> bool {
        matches!(self, Self::Table(_))
    }
}

/// A scalar argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarArgument {
    /// Name of the SQL type of the value.
    pub type_name: String,
    /// The value.
    pub value: ConstantValue,
}

/// The analyzer's view of a table argument.
///
/// Column names here are the names visible to the function, not plan
/// symbols.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableArgument {
    /// Columns of the input relation.
    pub row_type: Vec<Field>,
    /// Partitioning columns named in the invocation.
    pub partition_by: Vec<String>,
    /// Ordering columns named in the invocation.
    pub order_by: Vec<String>,
}

impl TableArgument {
    /// Sets the partitioning columns.
    #[must_use]
    pub fn with_partition_by(mut self, columns: Vec<String>) -> Self {
        self.partition_by = columns;
        self
    }

    /// Sets the ordering columns.
    #[must_use]
    pub fn with_order_by(mut self, columns: Vec<String>) -> Self {
        self.order_by = columns;
        self
    }
}

/// A descriptor argument, e.g. `DESCRIPTOR(a, b BIGINT)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorArgument {
    /// The described fields.
    pub fields: Vec<Field>,
}

/// A named column with an optional type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Column name. Absent for anonymous row fields.
    pub name: Option<String>,
    /// Name of the column type, if declared.
    pub type_name: Option<String>,
}

impl Field {
    /// A named field with a declared type.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), type_name: Some(type_name.into()) }
    }

    /// A named field without a type.
    #[must_use]
    pub fn untyped(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), type_name: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_argument_wire_shape() {
        let arg = Argument::scalar("bigint", 10i64);
        let json = serde_json::to_value(&arg).expect("serialize");
        assert_eq!(json["@type"], "scalar");
        assert_eq!(json["typeName"], "bigint");
        assert_eq!(json["value"]["integer"], 10);
    }

    #[test]
    fn table_argument_is_table() {
        let arg = Argument::Table(
            TableArgument { row_type: vec![Field::new("a", "bigint")], ..Default::default() }
                .with_partition_by(vec!["a".to_string()]),
        );
        assert!(arg.is_table());
        assert!(!Argument::descriptor(vec![Field::untyped("x")]).is_table());
    }
}
