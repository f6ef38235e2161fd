use crate::lexical::{contains_keyword, normalize};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static AGGREGATE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(COUNT|SUM|AVG|MIN|MAX)\s*\(").unwrap());

pub(crate) static SUBQUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*SELECT\b").unwrap());

pub(crate) static WINDOW_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bOVER\s*\(|\bWINDOW\b").unwrap());

/// Number of complex features at which a query counts as [`QueryClass::Complex`].
pub const COMPLEX_FEATURE_THRESHOLD: usize = 3;

/// Shape of a query, used to pick its cache TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryClass {
    /// No joins, grouping, ordering, unions or subqueries.
    Simple,
    /// None of the other shapes.
    Standard,
    /// Aggregate functions or GROUP BY.
    Aggregation,
    /// At least three of JOIN, UNION, GROUP BY, HAVING, subquery, WITH, window.
    Complex,
}

impl fmt::Display for QueryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryClass::Simple => "simple",
            QueryClass::Standard => "standard",
            QueryClass::Aggregation => "aggregation",
            QueryClass::Complex => "complex",
        };
        f.write_str(s)
    }
}

/// Precedence: complex, then aggregation, then simple.
pub fn classify(sql: &str) -> QueryClass {
    let normalized = normalize(sql);
    if complex_feature_count(&normalized) >= COMPLEX_FEATURE_THRESHOLD {
        QueryClass::Complex
    } else if is_aggregation(&normalized) {
        QueryClass::Aggregation
    } else if is_simple(&normalized) {
        QueryClass::Simple
    } else {
        QueryClass::Standard
    }
}

pub fn is_aggregation(normalized: &str) -> bool {
    AGGREGATE_CALL.is_match(normalized) || contains_keyword(normalized, "GROUP BY")
}

pub fn is_simple(normalized: &str) -> bool {
    !(contains_keyword(normalized, "JOIN")
        || contains_keyword(normalized, "GROUP BY")
        || contains_keyword(normalized, "ORDER BY")
        || contains_keyword(normalized, "UNION")
        || SUBQUERY.is_match(normalized))
}

/// Distinct complex features present, each counted once.
pub fn complex_feature_count(normalized: &str) -> usize {
    [
        contains_keyword(normalized, "JOIN"),
        contains_keyword(normalized, "UNION"),
        contains_keyword(normalized, "GROUP BY"),
        contains_keyword(normalized, "HAVING"),
        SUBQUERY.is_match(normalized),
        contains_keyword(normalized, "WITH"),
        WINDOW_CALL.is_match(normalized),
    ]
    .iter()
    .filter(|present| **present)
    .count()
}
