//! The condition grammar shared by select/update/delete filtering and by
//! join conditions (spec §4.1, §6).
//!
//! ```text
//! condition := operand operator operand
//! operator  := "<=" | ">=" | "<" | ">" | "=" | "=="
//! operand   := identifier | literal
//! ```
//!
//! The parser only splits the string into its three pieces; it is up to the
//! caller to decide which operand is a column name and which is a literal
//! (select/update/delete expect exactly one of each; join conditions expect
//! both operands to be column names).

use crate::error::{RelError, RelResult};
use std::cmp::Ordering;

/// A normalized comparison operator. `=` and `==` both normalize to `Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Le,
    Ge,
    Lt,
    Gt,
    Eq,
}

impl Op {
    /// True if `ord` (the comparison of the condition's left operand against
    /// its right operand) satisfies this operator.
    pub fn matches(self, ord: Ordering) -> bool {
        match self {
            Op::Le => ord != Ordering::Greater,
            Op::Ge => ord != Ordering::Less,
            Op::Lt => ord == Ordering::Less,
            Op::Gt => ord == Ordering::Greater,
            Op::Eq => ord == Ordering::Equal,
        }
    }
}

/// A parsed `operand operator operand` triple, with each operand still an
/// unclassified trimmed string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub left: String,
    pub op: Op,
    pub right: String,
}

/// Operators tried longest-first so `<=`/`>=`/`==` are not mistaken for a
/// prefix match against `<`/`>`/`=`.
const OPERATORS: &[(&str, Op)] = &[
    ("<=", Op::Le),
    (">=", Op::Ge),
    ("==", Op::Eq),
    ("<", Op::Lt),
    (">", Op::Gt),
    ("=", Op::Eq),
];

/// Parses a condition string into its three components.
pub fn parse(raw: &str) -> RelResult<Condition> {
    for pos in 0..raw.len() {
        // Only attempt a match at a UTF-8 char boundary.
        if !raw.is_char_boundary(pos) {
            continue;
        }
        let rest = &raw[pos..];
        for (symbol, op) in OPERATORS {
            if rest.starts_with(symbol) {
                let left = raw[..pos].trim();
                let right = raw[pos + symbol.len()..].trim();
                if left.is_empty() || right.is_empty() {
                    continue;
                }
                return Ok(Condition {
                    left: left.to_string(),
                    op: *op,
                    right: right.to_string(),
                });
            }
        }
    }
    Err(RelError::MalformedCondition(raw.to_string()))
}
