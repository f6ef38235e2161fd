//! Lexical SQL security validation.
//!
//! [`SqlValidator::validate`] runs the checks below in order and stops at the first failure:
//!
//! 1. empty input
//! 2. blocked keywords (write, DDL, DCL, transaction control, introspection statements)
//! 3. blocked functions followed by `(`
//! 4. suspicious patterns (tautologies, terminator sequences, `UNION SELECT`, system catalogs,
//!    stacked statements)
//! 5. unbalanced parentheses
//! 6. comment sequences (`--`, `/* */`, `#`)
//!
//! This is a defense-in-depth layer over normalized text, not a parser. Keywords inside
//! string literals are still keywords here.

use crate::lexical::{find_phrase, normalize, words};
use once_cell::sync::Lazy;
use regex::Regex;
use sluice_error::{ErrorCode, ErrorContext, SluiceError};
use std::collections::HashSet;
use thiserror::Error;

/// Maximum identifier length accepted by [`validate_table_name`] / [`validate_column_name`].
pub const MAX_IDENTIFIER_LEN: usize = 128;

pub const BLOCKED_KEYWORDS: &[&str] = &[
    "INSERT",
    "UPDATE",
    "DELETE",
    "DROP",
    "CREATE",
    "ALTER",
    "TRUNCATE",
    "MERGE",
    "UPSERT",
    "GRANT",
    "REVOKE",
    "EXEC",
    "EXECUTE",
    "CALL",
    "UNION",
    "BEGIN",
    "COMMIT",
    "ROLLBACK",
    "SAVEPOINT",
    "START TRANSACTION",
    "SET",
    "SHOW",
    "DESCRIBE",
    "EXPLAIN",
    "USE",
    "LOCK",
    "UNLOCK",
    "LOAD",
    "HANDLER",
    "RENAME",
    "PREPARE",
    "DEALLOCATE",
    "DECLARE",
    "KILL",
    "SHUTDOWN",
    "ATTACH",
    "DETACH",
    "PRAGMA",
    "VACUUM",
    "COPY",
    "INTO",
    "OUTFILE",
    "DUMPFILE",
];

pub const BLOCKED_FUNCTIONS: &[&str] = &[
    "SLEEP",
    "BENCHMARK",
    "LOAD_FILE",
    "PG_SLEEP",
    "PG_READ_FILE",
    "PG_READ_BINARY_FILE",
    "PG_LS_DIR",
    "LO_IMPORT",
    "LO_EXPORT",
    "DBLINK",
    "DBLINK_EXEC",
    "XP_CMDSHELL",
    "SP_EXECUTESQL",
    "OPENROWSET",
    "OPENQUERY",
    "LOAD_EXTENSION",
    "VERSION",
    "DATABASE",
    "USER",
    "CURRENT_USER",
    "SYSTEM_USER",
    "SESSION_USER",
];

/// Keywords that make a statement not read-only, checked by [`SqlValidator::ensure_read_only`].
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "MERGE", "UPSERT",
    "GRANT", "REVOKE", "EXEC", "EXECUTE", "CALL", "INTO", "SET", "LOCK", "ATTACH", "PRAGMA",
    "COPY",
];

/// Words an identifier may not be equal to.
const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "TABLE", "INDEX", "VIEW", "SCHEMA", "JOIN", "INNER", "OUTER",
    "LEFT", "RIGHT", "FULL", "CROSS", "ON", "AND", "OR", "NOT", "NULL", "IS", "IN", "LIKE",
    "BETWEEN", "EXISTS", "AS", "ORDER", "GROUP", "BY", "HAVING", "LIMIT", "OFFSET", "DISTINCT",
    "CASE", "WHEN", "THEN", "ELSE", "END", "VALUES", "WITH", "ALL", "ANY", "PRIMARY", "FOREIGN",
    "KEY", "REFERENCES", "CONSTRAINT", "DEFAULT", "CHECK", "UNIQUE", "TRUE", "FALSE", "DATABASE",
];

static BLOCKED_FUNCTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b({})\s*\(", BLOCKED_FUNCTIONS.join("|"))).unwrap()
});

struct SuspiciousPattern {
    label: &'static str,
    regex: Regex,
}

fn pattern(label: &'static str, re: &str) -> SuspiciousPattern {
    SuspiciousPattern {
        label,
        regex: Regex::new(re).unwrap(),
    }
}

// Matched against normalized (uppercase) text.
static SUSPICIOUS_PATTERNS: Lazy<Vec<SuspiciousPattern>> = Lazy::new(|| {
    vec![
        pattern("';--", r"'\s*;\s*--"),
        pattern("';/*", r"'\s*;\s*/\*"),
        pattern("';#", r"'\s*;\s*#"),
        pattern("1=1", r"\b1\s*=\s*1\b"),
        pattern("'1'='1'", r"'1'\s*=\s*'1'"),
        pattern("OR 1", r"\bOR\s+1\b"),
        pattern("OR 'x'='x'", r"\bOR\s+'[^']*'\s*=\s*'[^']*'"),
        pattern("UNION SELECT", r"\bUNION\s+(ALL\s+)?SELECT\b"),
        pattern(
            "system catalog",
            r"\b(INFORMATION_SCHEMA|PG_CATALOG|PG_SHADOW|PG_AUTHID|PG_USER|MYSQL\.USER|PERFORMANCE_SCHEMA|SYSOBJECTS|SYSCOLUMNS|SQLITE_MASTER|SQLITE_SCHEMA|SQLITE_TEMP_MASTER)\b",
        ),
        pattern("CHAR() obfuscation", r"\bCHA?R\s*\(\s*\d+\s*(,\s*\d+\s*){3,}\)"),
        pattern("long hex literal", r"\b0X[0-9A-F]{16,}\b"),
        pattern("stacked statements", r";\s*\S"),
    ]
});

static STRICT_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").unwrap());

static SMART_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_\[][A-Za-z0-9_. \[\]]*$").unwrap());

const COMMENT_MARKERS: &[&str] = &["--", "/*", "*/", "#"];
const IDENTIFIER_FORBIDDEN: &[&str] = &["<", ">", "\"", "'", ";", "--", "/*", "*/", "#"];

/// Why a statement or identifier was rejected. Every variant names the rule and the
/// offending fragment so callers can report it precisely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("empty query")]
    Empty,

    #[error("blocked keyword '{0}'")]
    BlockedKeyword(String),

    #[error("blocked function '{0}'")]
    BlockedFunction(String),

    #[error("suspicious pattern '{0}'")]
    SuspiciousPattern(String),

    #[error("unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("comment sequence '{0}' is not allowed")]
    DisallowedComment(String),

    #[error("statement is not read-only{}", .0.as_ref().map(|k| format!(" ({})", k)).unwrap_or_default())]
    NotReadOnly(Option<String>),

    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        name: String,
        reason: String,
    },
}

impl Rejection {
    pub fn rule(&self) -> &'static str {
        match self {
            Rejection::Empty => "empty_query",
            Rejection::BlockedKeyword(_) => "blocked_keyword",
            Rejection::BlockedFunction(_) => "blocked_function",
            Rejection::SuspiciousPattern(_) => "suspicious_pattern",
            Rejection::UnbalancedParentheses => "unbalanced_parentheses",
            Rejection::DisallowedComment(_) => "disallowed_comment",
            Rejection::NotReadOnly(_) => "read_only",
            Rejection::InvalidIdentifier { .. } => "invalid_identifier",
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Rejection::Empty => ErrorCode::EmptyQuery,
            Rejection::BlockedKeyword(_) => ErrorCode::BlockedKeyword,
            Rejection::BlockedFunction(_) => ErrorCode::BlockedFunction,
            Rejection::SuspiciousPattern(_) => ErrorCode::SuspiciousPattern,
            Rejection::UnbalancedParentheses => ErrorCode::UnbalancedParentheses,
            Rejection::DisallowedComment(_) => ErrorCode::DisallowedComment,
            Rejection::NotReadOnly(_) => ErrorCode::NotReadOnly,
            Rejection::InvalidIdentifier { .. } => ErrorCode::InvalidIdentifier,
        }
    }

    pub fn offending(&self) -> Option<String> {
        match self {
            Rejection::Empty | Rejection::UnbalancedParentheses => None,
            Rejection::BlockedKeyword(s)
            | Rejection::BlockedFunction(s)
            | Rejection::SuspiciousPattern(s)
            | Rejection::DisallowedComment(s) => Some(s.clone()),
            Rejection::NotReadOnly(s) => s.clone(),
            Rejection::InvalidIdentifier { name, .. } => Some(name.clone()),
        }
    }
}

impl From<Rejection> for SluiceError {
    fn from(rejection: Rejection) -> Self {
        SluiceError::new(rejection.code(), format!("Query rejected: {}", rejection)).with_context(
            ErrorContext::Validation {
                rule: rejection.rule().to_string(),
                offending: rejection.offending(),
            },
        )
    }
}

/// How comment markers are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentMode {
    /// Any comment marker rejects the statement.
    #[default]
    Strict,
    /// Markers preceded by an odd number of single quotes are assumed to sit inside a
    /// string literal and are allowed. Backslash-escaped quotes and quotes inside quoted
    /// identifiers fool this count in both directions.
    Loose,
}

/// Identifier pattern used by [`validate_table_name`] and [`validate_column_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierMode {
    /// `^[A-Za-z_][A-Za-z0-9_.]*$`
    #[default]
    Strict,
    /// Also allows spaces and square brackets, e.g. `[Order Details]`.
    Smart,
}

#[derive(Debug, Clone, Default)]
pub struct ValidatorConfig {
    pub comment_mode: CommentMode,
    /// Blocked in addition to [`BLOCKED_KEYWORDS`]. Case-insensitive; may be multi-word.
    pub extra_blocked_keywords: Vec<String>,
}

/// Stateless apart from its read-only configuration; share freely across tasks.
#[derive(Debug, Clone)]
pub struct SqlValidator {
    config: ValidatorConfig,
    single_keywords: HashSet<String>,
    phrase_keywords: Vec<Vec<String>>,
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl SqlValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        let mut single_keywords = HashSet::new();
        let mut phrase_keywords = Vec::new();

        let extra = config.extra_blocked_keywords.iter().map(|k| k.to_uppercase());
        for keyword in BLOCKED_KEYWORDS.iter().map(|k| k.to_string()).chain(extra) {
            let parts: Vec<String> = words(&keyword).into_iter().map(String::from).collect();
            match parts.len() {
                0 => {}
                1 => {
                    single_keywords.insert(keyword);
                }
                _ => phrase_keywords.push(parts),
            }
        }

        Self {
            config,
            single_keywords,
            phrase_keywords,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn validate(&self, sql: &str) -> Result<(), Rejection> {
        self.validate_with_mode(sql, self.config.comment_mode)
    }

    pub fn validate_with_mode(&self, sql: &str, comment_mode: CommentMode) -> Result<(), Rejection> {
        if sql.trim().is_empty() {
            return Err(Rejection::Empty);
        }

        let normalized = normalize(sql);

        self.check_keywords(&normalized)?;
        check_functions(&normalized)?;
        check_patterns(&normalized)?;
        check_parentheses(&normalized)?;
        check_comments(&normalized, comment_mode)?;

        Ok(())
    }

    fn check_keywords(&self, normalized: &str) -> Result<(), Rejection> {
        let tokens = words(normalized);

        if let Some(token) = tokens.iter().find(|t| self.single_keywords.contains(**t)) {
            return Err(Rejection::BlockedKeyword(token.to_string()));
        }

        for phrase in &self.phrase_keywords {
            let phrase_refs: Vec<&str> = phrase.iter().map(String::as_str).collect();
            if find_phrase(&tokens, &phrase_refs).is_some() {
                return Err(Rejection::BlockedKeyword(phrase.join(" ")));
            }
        }
        Ok(())
    }

    /// True when the statement starts as a read (`SELECT`, `WITH`, or a parenthesized
    /// `SELECT`) and contains no write keyword.
    pub fn is_read_only(&self, sql: &str) -> bool {
        self.ensure_read_only(sql).is_ok()
    }

    /// Read-only check that runs even when full validation is skipped.
    pub fn ensure_read_only(&self, sql: &str) -> Result<(), Rejection> {
        let normalized = normalize(sql);
        if normalized.is_empty() {
            return Err(Rejection::Empty);
        }

        let tokens = words(&normalized);
        let first = tokens.first().copied().unwrap_or_default();
        let starts_as_read = matches!(first, "SELECT" | "WITH")
            && normalized.trim_start_matches(['(', ' ']).starts_with(first);
        if !starts_as_read {
            return Err(Rejection::NotReadOnly(Some(first.to_string())));
        }

        if let Some(keyword) = tokens.iter().find(|t| WRITE_KEYWORDS.contains(*t)) {
            return Err(Rejection::NotReadOnly(Some(keyword.to_string())));
        }
        Ok(())
    }
}

fn check_functions(normalized: &str) -> Result<(), Rejection> {
    match BLOCKED_FUNCTION_REGEX.captures(normalized) {
        Some(caps) => Err(Rejection::BlockedFunction(caps[1].to_string())),
        None => Ok(()),
    }
}

fn check_patterns(normalized: &str) -> Result<(), Rejection> {
    match SUSPICIOUS_PATTERNS.iter().find(|p| p.regex.is_match(normalized)) {
        Some(p) => Err(Rejection::SuspiciousPattern(p.label.to_string())),
        None => Ok(()),
    }
}

fn check_parentheses(normalized: &str) -> Result<(), Rejection> {
    let mut depth: i64 = 0;
    for c in normalized.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(Rejection::UnbalancedParentheses);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Rejection::UnbalancedParentheses);
    }
    Ok(())
}

fn check_comments(normalized: &str, mode: CommentMode) -> Result<(), Rejection> {
    for marker in COMMENT_MARKERS {
        for (pos, _) in normalized.match_indices(marker) {
            let allowed = match mode {
                CommentMode::Strict => false,
                CommentMode::Loose => inside_string_literal(normalized, pos),
            };
            if !allowed {
                return Err(Rejection::DisallowedComment(marker.to_string()));
            }
        }
    }
    Ok(())
}

/// Odd number of single quotes before `pos`.
fn inside_string_literal(text: &str, pos: usize) -> bool {
    text[..pos].matches('\'').count() % 2 == 1
}

/// Validate a table name. Also accepts `schema.table`.
pub fn validate_table_name(name: &str, mode: IdentifierMode) -> Result<(), Rejection> {
    validate_identifier("table", name, mode)
}

pub fn validate_column_name(name: &str, mode: IdentifierMode) -> Result<(), Rejection> {
    validate_identifier("column", name, mode)
}

fn validate_identifier(kind: &'static str, name: &str, mode: IdentifierMode) -> Result<(), Rejection> {
    let invalid = |reason: String| Rejection::InvalidIdentifier {
        kind,
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("empty".to_string()));
    }
    if name.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(invalid(format!("longer than {} characters", MAX_IDENTIFIER_LEN)));
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '\0' | '\\' | '`')) {
        return Err(invalid(format!("forbidden character {:?}", c)));
    }
    if let Some(seq) = IDENTIFIER_FORBIDDEN.iter().find(|s| name.contains(*s)) {
        return Err(invalid(format!("forbidden sequence '{}'", seq)));
    }

    let upper = name.to_uppercase();
    let is_keyword = SQL_KEYWORDS.contains(&upper.as_str())
        || BLOCKED_KEYWORDS.contains(&upper.as_str());
    if is_keyword {
        return Err(invalid("reserved SQL keyword".to_string()));
    }

    let pattern = match mode {
        IdentifierMode::Strict => &*STRICT_IDENTIFIER,
        IdentifierMode::Smart => &*SMART_IDENTIFIER,
    };
    if !pattern.is_match(name) {
        return Err(invalid("does not match the identifier pattern".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SqlValidator {
        SqlValidator::default()
    }

    #[test]
    fn test_plain_select_accepted() {
        let v = validator();
        assert!(v.validate("SELECT * FROM users WHERE id = 1").is_ok());
        assert!(v.is_read_only("SELECT * FROM users WHERE id = 1"));
    }

    #[test]
    fn test_drop_rejected_with_keyword() {
        let err = validator().validate("DROP TABLE users").unwrap_err();
        assert_eq!(err, Rejection::BlockedKeyword("DROP".to_string()));
        assert_eq!(err.code(), ErrorCode::BlockedKeyword);
    }

    #[test]
    fn test_union_rejected_as_keyword() {
        let v = validator();
        for sql in [
            "SELECT a FROM t UNION SELECT b FROM u",
            "SELECT a FROM t union all SELECT b FROM u",
            "SELECT a FROM t UNION (SELECT b FROM u)",
        ] {
            assert_eq!(
                v.validate(sql).unwrap_err(),
                Rejection::BlockedKeyword("UNION".to_string()),
                "{}",
                sql
            );
        }
        assert!(v.validate("SELECT communion FROM rites").is_ok());
    }

    #[test]
    fn test_tautology_rejected() {
        let err = validator()
            .validate("SELECT * FROM users WHERE 1=1")
            .unwrap_err();
        assert_eq!(err, Rejection::SuspiciousPattern("1=1".to_string()));
    }

    #[test]
    fn test_keyword_substrings_are_not_keywords() {
        let v = validator();
        assert!(v
            .validate("SELECT updated_at, deleted FROM settings_history ORDER BY updated_at DESC")
            .is_ok());
    }

    #[test]
    fn test_multi_word_keyword() {
        let err = validator().validate("START  TRANSACTION").unwrap_err();
        assert_eq!(err, Rejection::BlockedKeyword("START TRANSACTION".to_string()));
    }

    #[test]
    fn test_extra_blocked_keyword() {
        let v = SqlValidator::new(ValidatorConfig {
            extra_blocked_keywords: vec!["listen".to_string()],
            ..Default::default()
        });
        assert_eq!(
            v.validate("SELECT 1 FROM t WHERE listen = 2").unwrap_err(),
            Rejection::BlockedKeyword("LISTEN".to_string())
        );
    }

    #[test]
    fn test_blocked_functions() {
        let v = validator();
        assert_eq!(
            v.validate("SELECT pg_sleep (10)").unwrap_err(),
            Rejection::BlockedFunction("PG_SLEEP".to_string())
        );
        assert_eq!(
            v.validate("SELECT version()").unwrap_err(),
            Rejection::BlockedFunction("VERSION".to_string())
        );
        // Only a call is blocked, not a column with the same name.
        assert!(v.validate("SELECT user, version FROM accounts").is_ok());
    }

    #[test]
    fn test_terminator_sequences() {
        let v = validator();
        assert_eq!(
            v.validate("SELECT * FROM t WHERE name = 'x';--'").unwrap_err(),
            Rejection::SuspiciousPattern("';--".to_string())
        );
        assert_eq!(
            v.validate("SELECT * FROM t WHERE name = 'x'; /* */").unwrap_err(),
            Rejection::SuspiciousPattern("';/*".to_string())
        );
    }

    #[test]
    fn test_system_catalog_rejected() {
        let err = validator()
            .validate("SELECT table_name FROM information_schema.tables")
            .unwrap_err();
        assert_eq!(err, Rejection::SuspiciousPattern("system catalog".to_string()));
    }

    #[test]
    fn test_or_tautologies() {
        let v = validator();
        assert!(matches!(
            v.validate("SELECT * FROM t WHERE a = 2 OR 1"),
            Err(Rejection::SuspiciousPattern(_))
        ));
        assert!(matches!(
            v.validate("SELECT * FROM t WHERE a = '' OR 'a'='a'"),
            Err(Rejection::SuspiciousPattern(_))
        ));
    }

    #[test]
    fn test_stacked_statements() {
        let v = validator();
        assert_eq!(
            v.validate("SELECT 1 FROM t; SELECT 2 FROM t").unwrap_err(),
            Rejection::SuspiciousPattern("stacked statements".to_string())
        );
        assert!(v.validate("SELECT 1 FROM t;").is_ok());
    }

    #[test]
    fn test_parentheses_balance() {
        let v = validator();
        assert_eq!(
            v.validate("SELECT COUNT(* FROM t").unwrap_err(),
            Rejection::UnbalancedParentheses
        );
        assert_eq!(
            v.validate("SELECT a) FROM (t").unwrap_err(),
            Rejection::UnbalancedParentheses
        );
        assert!(v.validate("SELECT COUNT(*) FROM (SELECT a FROM t) s").is_ok());
    }

    #[test]
    fn test_comments_strict_and_loose() {
        let v = validator();
        assert_eq!(
            v.validate("SELECT a FROM t -- trailing").unwrap_err(),
            Rejection::DisallowedComment("--".to_string())
        );
        assert_eq!(
            v.validate("SELECT a FROM t WHERE tag = '#1'").unwrap_err(),
            Rejection::DisallowedComment("#".to_string())
        );

        assert!(v
            .validate_with_mode("SELECT a FROM t WHERE tag = '#1'", CommentMode::Loose)
            .is_ok());
        assert!(v
            .validate_with_mode("SELECT a FROM t WHERE note = 'a--b'", CommentMode::Loose)
            .is_ok());
        assert!(v
            .validate_with_mode("SELECT a FROM t /* hidden */", CommentMode::Loose)
            .is_err());
    }

    #[test]
    fn test_loose_mode_quote_heuristic_limitation() {
        // A backslash-escaped quote flips the parity: the marker is really inside the
        // literal but counts as outside.
        let v = validator();
        assert!(v
            .validate_with_mode(
                "SELECT a FROM t WHERE s = 'O\\'Brien -- x'",
                CommentMode::Loose
            )
            .is_err());
        assert!(v
            .validate_with_mode("SELECT a FROM t WHERE s = 'it''s -- fine'", CommentMode::Loose)
            .is_ok());
    }

    #[test]
    fn test_read_only_check() {
        let v = validator();
        assert!(v.is_read_only("with recent as (select * from t) select * from recent"));
        assert!(v.is_read_only("(SELECT a FROM t)"));
        assert!(!v.is_read_only("DELETE FROM t"));
        assert!(!v.is_read_only("SELECT * INTO backup FROM t"));
        assert!(!v.is_read_only("WITH x AS (DELETE FROM t RETURNING *) SELECT * FROM x"));
        assert_eq!(
            v.ensure_read_only("   ").unwrap_err(),
            Rejection::Empty
        );
    }

    #[test]
    fn test_rejection_into_error() {
        let err: SluiceError = Rejection::BlockedKeyword("DROP".to_string()).into();
        assert_eq!(err.code, ErrorCode::BlockedKeyword);
        assert!(err.message.contains("DROP"));
        match err.context {
            Some(ErrorContext::Validation { rule, offending }) => {
                assert_eq!(rule, "blocked_keyword");
                assert_eq!(offending.as_deref(), Some("DROP"));
            }
            other => panic!("unexpected context {:?}", other),
        }
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_table_name("users", IdentifierMode::Strict).is_ok());
        assert!(validate_table_name("public.users", IdentifierMode::Strict).is_ok());
        assert!(validate_column_name("_created_at", IdentifierMode::Strict).is_ok());

        assert!(validate_table_name("", IdentifierMode::Strict).is_err());
        assert!(validate_table_name("select", IdentifierMode::Strict).is_err());
        assert!(validate_table_name("Order", IdentifierMode::Strict).is_err());
        assert!(validate_table_name("users; DROP", IdentifierMode::Smart).is_err());
        assert!(validate_column_name("a--b", IdentifierMode::Strict).is_err());
        assert!(validate_column_name("1st", IdentifierMode::Strict).is_err());
        assert!(validate_column_name("we`ird", IdentifierMode::Smart).is_err());
        assert!(validate_column_name(&"c".repeat(129), IdentifierMode::Strict).is_err());

        assert!(validate_table_name("Order Details", IdentifierMode::Strict).is_err());
        assert!(validate_table_name("[Order Details]", IdentifierMode::Smart).is_ok());
    }
}
