//! Query predicates over declared entity fields.
//!
//! A [`Filter`] is a small expression tree of field comparisons. It is
//! evaluated directly against the JSON form of an entity by the in-memory
//! store and translated to parameterised SQL by the `PostgreSQL` store; both
//! follow the same rules:
//!
//! - a missing field compares as `null`
//! - numbers compare numerically, strings lexicographically, booleans as
//!   `false < true`
//! - range comparisons between values of different JSON types are false

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;

/// Comparison operator of a single predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// SQL spelling of the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    #[must_use]
    pub const fn is_range(self) -> bool {
        matches!(self, Self::Gt | Self::Ge | Self::Lt | Self::Le)
    }
}

/// Errors raised when a filter does not fit the queried entity kind.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("field `{field}` is not queryable on {kind}")]
    UndeclaredField { kind: &'static str, field: String },
}

/// A predicate over entity fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Matches every record.
    All,
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ge, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Le, value)
    }

    /// Conjunction with another filter.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::All => other,
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Check every referenced field is declared by `T`.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::UndeclaredField` for the first unknown field.
    pub fn validate_for<T: Entity>(&self) -> Result<(), FilterError> {
        match self {
            Self::All => Ok(()),
            Self::Compare { field, .. } => {
                if T::is_declared_field(field) {
                    Ok(())
                } else {
                    Err(FilterError::UndeclaredField {
                        kind: T::KIND,
                        field: field.clone(),
                    })
                }
            }
            Self::And(parts) | Self::Or(parts) => {
                parts.iter().try_for_each(Self::validate_for::<T>)
            }
        }
    }

    /// Evaluate against the JSON form of an entity.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Compare { field, op, value } => {
                let actual = document.get(field).unwrap_or(&Value::Null);
                compare(actual, *op, value)
            }
            Self::And(parts) => parts.iter().all(|f| f.matches(document)),
            Self::Or(parts) => parts.iter().any(|f| f.matches(document)),
        }
    }
}

/// JSON form of a timestamp as entities store it, for use in filters.
#[must_use]
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    serde_json::to_value(at).unwrap_or(Value::Null)
}

fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    let ordering = order(actual, expected);
    match op {
        CompareOp::Eq => ordering == Some(Ordering::Equal) || actual == expected,
        CompareOp::Ne => !(ordering == Some(Ordering::Equal) || actual == expected),
        CompareOp::Gt => ordering == Some(Ordering::Greater),
        CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::Lt => ordering == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
    }
}

fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
