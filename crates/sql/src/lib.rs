//! SQL text handling for sluice.
//!
//! Everything here is lexical: statements are normalized and tokenized, never parsed into
//! an AST. The crate provides:
//! - **Security**: keyword, function and injection-pattern screening (`security`).
//! - **Classification**: the query shape that drives cache TTLs (`classify`).
//! - **Analysis**: complexity scoring, suggestions and index recommendations (`analyzer`).
pub mod analyzer;
pub mod classify;
pub mod lexical;
pub mod security;

pub use analyzer::{
    Benefit, ColumnRef, Complexity, IndexSuggestion, JoinInfo, OptimizationStats, QueryAnalyzer,
    QueryPlan,
};
pub use classify::{classify, QueryClass};
pub use security::{
    validate_column_name, validate_table_name, CommentMode, IdentifierMode, Rejection,
    SqlValidator, ValidatorConfig,
};
