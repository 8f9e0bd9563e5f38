//! Plan expressions.
//!
//! This module defines the small scalar expression language carried by
//! filter and projection nodes, and the constant values used by scalar
//! table-function arguments.

// Allow comparison builder names that match std traits - they return new
// expressions, not bool
#![allow(clippy::should_implement_trait)]

use std::fmt;

use quarry_core::Symbol;
use serde::{Deserialize, Serialize};

/// A constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstantValue {
    /// SQL NULL.
    Null,
    /// A boolean.
    Boolean(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A double precision float. NaN and the infinities are written as
    /// the strings `"NaN"`, `"Infinity"` and `"-Infinity"`.
    Double(#[serde(with = "double")] f64),
    /// A character string.
    Varchar(String),
}

impl ConstantValue {
    /// Returns true if this is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Double(n) => write!(f, "{n}"),
            Self::Varchar(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<bool> for ConstantValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for ConstantValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for ConstantValue {
    fn from(n: f64) -> Self {
        Self::Double(n)
    }
}

impl From<&str> for ConstantValue {
    fn from(s: &str) -> Self {
        Self::Varchar(s.to_string())
    }
}

impl From<String> for ConstantValue {
    fn from(s: String) -> Self {
        Self::Varchar(s)
    }
}

/// Wire form of doubles. JSON numbers cannot hold non-finite values.
mod double {
    use serde::{Deserialize, Deserializer, Serializer};

    const NAN: &str = "NaN";
    const INFINITY: &str = "Infinity";
    const NEG_INFINITY: &str = "-Infinity";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { INFINITY } else { NEG_INFINITY })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(serde::de::Error::invalid_value(
                    serde::de::Unexpected::Str(other),
                    &"a number, \"NaN\", \"Infinity\" or \"-Infinity\"",
                )),
            },
        }
    }
}

/// A scalar expression in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Expr {
    /// A reference to a column produced by the node's source.
    Symbol(Symbol),

    /// A constant.
    Constant(ConstantValue),

    /// A function call, including comparison and boolean operators
    /// (`$eq`, `$and`, ...).
    Call {
        /// Resolved function name.
        function: String,
        /// Call arguments.
        arguments: Vec<Expr>,
    },
}

impl Expr {
    /// Creates a symbol reference.
    #[must_use]
    pub fn symbol(symbol: impl Into<Symbol>) -> Self {
        Self::Symbol(symbol.into())
    }

    /// Creates a constant.
    #[must_use]
    pub fn constant(value: impl Into<ConstantValue>) -> Self {
        Self::Constant(value.into())
    }

    /// Creates a function call.
    #[must_use]
    pub fn call(function: impl Into<String>, arguments: Vec<Expr>) -> Self {
        Self::Call { function: function.into(), arguments }
    }

    /// Creates `self = other`.
    #[must_use]
    pub fn eq(self, other: Expr) -> Self {
        Self::call("$eq", vec![self, other])
    }

    /// Creates `self > other`.
    #[must_use]
    pub fn gt(self, other: Expr) -> Self {
        Self::call("$gt", vec![self, other])
    }

    /// Creates `self AND other`.
    #[must_use]
    pub fn and(self, other: Expr) -> Self {
        Self::call("$and", vec![self, other])
    }

    /// Symbols referenced by this expression, in order of first appearance.
    #[must_use]
    pub fn referenced_symbols(&self) -> Vec<Symbol> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut Vec<Symbol>) {
        match self {
            Self::Symbol(symbol) => {
                if !out.contains(symbol) {
                    out.push(symbol.clone());
                }
            }
            Self::Constant(_) => {}
            Self::Call { arguments, .. } => {
                for argument in arguments {
                    argument.collect_symbols(out);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol(symbol) => write!(f, "{symbol}"),
            Self::Constant(value) => write!(f, "{value}"),
            Self::Call { function, arguments } => {
                let operator = match function.as_str() {
                    "$eq" => Some("="),
                    "$gt" => Some(">"),
                    "$and" => Some("AND"),
                    _ => None,
                };
                match (operator, arguments.as_slice()) {
                    (Some(op), [left, right]) => write!(f, "({left} {op} {right})"),
                    _ => {
                        write!(f, "{function}(")?;
                        for (i, argument) in arguments.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{argument}")?;
                        }
                        write!(f, ")")
                    }
                }
            }
        }
    }
}
