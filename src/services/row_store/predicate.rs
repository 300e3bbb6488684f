//! Row predicates passed to the row store.
//!
//! The planner only ever combines predicates with AND / NOT and adds equality
//! conditions; everything else comes from configuration.

use serde::{Deserialize, Serialize};

use crate::utils::quote_literal;

/// Comparison operator of a single column condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Boolean expression over row fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every row
    #[default]
    True,
    Compare { column: String, op: CompareOp, value: String },
    And(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Pre-rendered SQL condition, only understood by SQL-backed stores
    Raw(String),
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Compare { column: column.into(), op: CompareOp::Eq, value: value.into() }
    }

    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<String>) -> Self {
        Predicate::Compare { column: column.into(), op, value: value.into() }
    }

    /// Conjunction of `self` and `other`, flattening nested ANDs and dropping `True`.
    pub fn and(self, other: Predicate) -> Self {
        let mut parts = Vec::new();
        for part in [self, other] {
            match part {
                Predicate::True => {},
                Predicate::And(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        match parts.len() {
            0 => Predicate::True,
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// Conjunction of `column = value` for every pair.
    pub fn all_equal<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        pairs
            .into_iter()
            .fold(Predicate::True, |acc, (column, value)| acc.and(Predicate::eq(column, value)))
    }

    /// Columns referenced by structured conditions (raw SQL is opaque).
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Predicate::True | Predicate::Raw(_) => Vec::new(),
            Predicate::Compare { column, .. } => vec![column.as_str()],
            Predicate::And(parts) => parts.iter().flat_map(|p| p.columns()).collect(),
            Predicate::Not(inner) => inner.columns(),
        }
    }

    /// Renders the predicate as a SQL condition. Column names are emitted as-is;
    /// callers validate them beforehand.
    pub fn to_sql(&self) -> String {
        match self {
            Predicate::True => "1 = 1".to_string(),
            Predicate::Compare { column, op, value } => {
                format!("{} {} {}", column, op.as_sql(), quote_literal(value))
            },
            Predicate::And(parts) => {
                let rendered: Vec<String> =
                    parts.iter().map(|p| format!("({})", p.to_sql())).collect();
                rendered.join(" AND ")
            },
            Predicate::Not(inner) => format!("NOT ({})", inner.to_sql()),
            Predicate::Raw(sql) => sql.clone(),
        }
    }
}
