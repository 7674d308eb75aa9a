//! The engine's atomic column types and runtime values.
//!
//! Every value inserted into a column is coerced to that column's declared
//! [`ColumnType`]; coercion failure aborts the insert (spec §3).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{RelError, RelResult};

/// One of the five atomic column types a table's schema may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Str,
    Int,
    Real,
    Bool,
    List,
}

impl ColumnType {
    /// Parses a type descriptor as it appears in a table's `column_types` list.
    pub fn parse(s: &str) -> RelResult<Self> {
        match s.trim() {
            "str" | "string" => Ok(ColumnType::Str),
            "int" | "integer" => Ok(ColumnType::Int),
            "real" | "float" => Ok(ColumnType::Real),
            "bool" | "boolean" => Ok(ColumnType::Bool),
            "list" => Ok(ColumnType::List),
            other => Err(RelError::TypeCoercion {
                value: other.to_string(),
                target: ColumnType::Str,
            }),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Str => "str",
            ColumnType::Int => "int",
            ColumnType::Real => "real",
            ColumnType::Bool => "bool",
            ColumnType::List => "list",
        };
        f.write_str(name)
    }
}

/// A runtime value held in a row slot or used as a condition literal.
///
/// `Null` only ever appears as the placeholder slot of a [`crate::table::RowSlot::Tombstone`]
/// row, or as the result of an absent equi-join / B-tree probe — live rows
/// never carry it in a non-nullable position (spec §3 invariants).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Str(String),
    Int(i64),
    Real(f64),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    /// Coerces a raw textual token (as read from an insert row, CSV cell, or
    /// condition literal) into a value of the given column type.
    pub fn coerce(raw: &str, ty: ColumnType) -> RelResult<Value> {
        let trimmed = raw.trim();
        match ty {
            ColumnType::Str => Ok(Value::Str(trimmed.to_string())),
            ColumnType::Int => trimmed
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| RelError::TypeCoercion {
                    value: raw.to_string(),
                    target: ty,
                }),
            ColumnType::Real => trimmed
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|_| RelError::TypeCoercion {
                    value: raw.to_string(),
                    target: ty,
                }),
            ColumnType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(RelError::TypeCoercion {
                    value: raw.to_string(),
                    target: ty,
                }),
            },
            ColumnType::List => {
                let inner = trimmed
                    .strip_prefix('[')
                    .and_then(|s| s.strip_suffix(']'))
                    .ok_or_else(|| RelError::TypeCoercion {
                        value: raw.to_string(),
                        target: ty,
                    })?;
                if inner.is_empty() {
                    return Ok(Value::List(Vec::new()));
                }
                let items = inner
                    .split(';')
                    .map(|item| Value::Str(item.trim().to_string()))
                    .collect();
                Ok(Value::List(items))
            }
        }
    }

    /// Re-coerces a value already in memory to a new column type, used by
    /// `cast_column`. Only atomic (non-list) values may be cast.
    pub fn cast(&self, ty: ColumnType) -> RelResult<Value> {
        if matches!(self, Value::Null) {
            return Ok(Value::Null);
        }
        let text = match self {
            Value::Str(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Real(r) => r.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::List(_) => {
                return Err(RelError::TypeCoercion {
                    value: self.to_string(),
                    target: ty,
                });
            }
            Value::Null => unreachable!(),
        };
        Value::coerce(&text, ty)
    }

    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Str(_) => Some(ColumnType::Str),
            Value::Int(_) => Some(ColumnType::Int),
            Value::Real(_) => Some(ColumnType::Real),
            Value::Bool(_) => Some(ColumnType::Bool),
            Value::List(_) => Some(ColumnType::List),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A stable rank used to order values across differing variants, so that
    /// `Value` has a total order even though that situation should not arise
    /// for well-typed columns (all values in one column share a type).
    fn variant_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Real(_) => 3,
            Value::Str(_) => 4,
            Value::List(_) => 5,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ";")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    /// Orders values by their natural ordering, with nulls sorting last
    /// (spec §8 boundary case: "order_by on a column containing nulls").
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Real(a), Value::Real(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_int_roundtrip() {
        let v = Value::coerce("42", ColumnType::Int).unwrap();
        assert!(matches!(v, Value::Int(42)));
    }

    #[test]
    fn coerce_int_rejects_garbage() {
        assert!(Value::coerce("abc", ColumnType::Int).is_err());
    }

    #[test]
    fn coerce_bool_variants() {
        assert!(matches!(
            Value::coerce("True", ColumnType::Bool).unwrap(),
            Value::Bool(true)
        ));
        assert!(matches!(
            Value::coerce("0", ColumnType::Bool).unwrap(),
            Value::Bool(false)
        ));
    }

    #[test]
    fn coerce_list() {
        let v = Value::coerce("[a;b;c]", ColumnType::List).unwrap();
        match v {
            Value::List(items) => assert_eq!(items.len(), 3),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn nulls_sort_last() {
        let mut values = vec![Value::Int(5), Value::Null, Value::Int(1)];
        values.sort();
        assert_eq!(values, vec![Value::Int(1), Value::Int(5), Value::Null]);
    }

    #[test]
    fn cast_lossy_int_to_real() {
        let v = Value::Int(7).cast(ColumnType::Real).unwrap();
        assert!(matches!(v, Value::Real(r) if r == 7.0));
    }
}
