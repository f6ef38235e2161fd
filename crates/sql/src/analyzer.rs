//! Advisory query analysis.
//!
//! [`QueryAnalyzer::analyze`] scores a statement's complexity from keyword weights, pulls
//! out referenced tables, joins and filtered columns with token heuristics, and attaches a
//! fixed set of suggestions. Every analysis also bumps per-(table, column) usage counters;
//! pairs that reach the usage threshold become [`IndexSuggestion`]s with engine-specific DDL.
//!
//! Plan history, usage counters and statistics live behind one `RwLock` so readers never
//! see a partial update.

use crate::classify::{classify, QueryClass, SUBQUERY, WINDOW_CALL};
use crate::lexical::{clean_identifier, collapse_whitespace, contains_keyword, count_keyword, normalize, paren_delta};
use crate::security::{validate_column_name, validate_table_name, IdentifierMode};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use sluice_common::config::AnalyzerSettings;
use sluice_common::EngineKind;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Row width assumed when estimating memory and network volume.
pub const ASSUMED_ROW_BYTES: u64 = 256;
/// Row count assumed before a query has run.
pub const DEFAULT_ROW_ESTIMATE: u64 = 1000;

const HIGH_COMPLEXITY_SCORE: u32 = 5;
const MEDIUM_COMPLEXITY_SCORE: u32 = 2;

// Words that end a FROM/JOIN target and therefore cannot be an alias.
const CLAUSE_WORDS: &[&str] = &[
    "WHERE", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "OUTER", "NATURAL", "ON",
    "USING", "GROUP", "ORDER", "LIMIT", "HAVING", "UNION", "OFFSET", "WINDOW", "FETCH", "FOR",
    "EXCEPT", "INTERSECT", "RETURNING",
];

const JOIN_MODIFIERS: &[&str] = &["LEFT", "RIGHT", "FULL", "INNER", "CROSS", "OUTER", "NATURAL"];

static ALIAS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*[,;)]*$").unwrap());

static WHERE_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bWHERE\b").unwrap());

static WHERE_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(GROUP\s+BY|ORDER\s+BY|LIMIT|HAVING|UNION|OFFSET|WINDOW|FETCH)\b").unwrap()
});

static BOOLEAN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+(AND|OR)\s+").unwrap());

static PREDICATE_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:NOT\s+)?\(*\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?)\s*(?:=|<>|!=|<=|>=|<|>|\bLIKE\b|\bILIKE\b|\bIN\b|\bIS\b|\bBETWEEN\b|\bNOT\b)",
    )
    .unwrap()
});

static SELECT_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bSELECT\s+(DISTINCT\s+)?\*").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn from_score(score: u32) -> Self {
        if score >= HIGH_COMPLEXITY_SCORE {
            Complexity::High
        } else if score >= MEDIUM_COMPLEXITY_SCORE {
            Complexity::Medium
        } else {
            Complexity::Low
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinInfo {
    /// e.g. `INNER JOIN`, `LEFT OUTER JOIN`
    pub kind: String,
    pub table: String,
}

/// A column used in a WHERE predicate, attributed to a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

/// Advisory analysis record. Not an engine execution plan.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPlan {
    /// Stable id derived from the SQL text.
    pub query_id: String,
    pub sql: String,
    pub engine: Option<EngineKind>,
    #[serde(serialize_with = "serialize_millis")]
    pub execution_time: Duration,
    pub row_count: u64,
    pub tables: Vec<String>,
    pub joins: Vec<JoinInfo>,
    pub complexity: Complexity,
    pub complexity_score: u32,
    pub classification: QueryClass,
    pub where_columns: Vec<ColumnRef>,
    pub suggestions: Vec<String>,
    pub estimated_memory_bytes: u64,
    pub estimated_network_bytes: u64,
    pub analyzed_at: DateTime<Utc>,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

impl QueryPlan {
    fn apply_estimates(&mut self) {
        let rows = if self.row_count > 0 {
            self.row_count
        } else {
            DEFAULT_ROW_ESTIMATE
        };
        self.estimated_network_bytes = rows.saturating_mul(ASSUMED_ROW_BYTES);
        self.estimated_memory_bytes = self
            .estimated_network_bytes
            .saturating_mul(1 + self.joins.len() as u64);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Benefit {
    High,
    Medium,
    Low,
}

impl Benefit {
    fn from_usage(count: u64) -> Self {
        if count >= 10 {
            Benefit::High
        } else if count >= 5 {
            Benefit::Medium
        } else {
            Benefit::Low
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexSuggestion {
    pub table: String,
    pub columns: Vec<String>,
    pub index_name: String,
    pub index_type: String,
    /// Number of analyzed queries that filtered on these columns.
    pub priority: u64,
    pub rationale: String,
    pub create_statement: String,
    pub estimated_benefit: Benefit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimizationStats {
    pub queries_analyzed: u64,
    pub executions_recorded: u64,
    pub slow_queries: u64,
    /// (table, column) pairs currently at or above the usage threshold.
    pub indexes_suggested: u64,
    pub indexes_created: u64,
    pub avg_execution_ms: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ColumnUsage {
    count: u64,
    engine: Option<EngineKind>,
}

#[derive(Debug, Default)]
struct AnalyzerState {
    history: HashMap<String, QueryPlan>,
    // insertion order of history ids, oldest first
    order: VecDeque<String>,
    usage: HashMap<(String, String), ColumnUsage>,
    stats: OptimizationStats,
}

impl AnalyzerState {
    fn store(&mut self, plan: QueryPlan, max_history: usize) {
        let id = plan.query_id.clone();
        if self.history.insert(id.clone(), plan).is_none() {
            self.order.push_back(id);
        }
        while self.history.len() > max_history {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.history.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

pub struct QueryAnalyzer {
    settings: AnalyzerSettings,
    state: RwLock<AnalyzerState>,
}

impl Default for QueryAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerSettings::default())
    }
}

impl QueryAnalyzer {
    pub fn new(settings: AnalyzerSettings) -> Self {
        Self {
            settings,
            state: RwLock::new(AnalyzerState::default()),
        }
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    /// Analyze `sql`, store the plan in history and count its filtered columns.
    pub fn analyze(&self, sql: &str, engine: Option<EngineKind>) -> QueryPlan {
        let plan = inspect(sql, engine);

        {
            let mut state = self.state.write();
            for col in &plan.where_columns {
                let key = (col.table.to_lowercase(), col.column.to_lowercase());
                let usage = state.usage.entry(key).or_default();
                usage.count += 1;
                if engine.is_some() {
                    usage.engine = engine;
                }
            }
            state.stats.queries_analyzed += 1;
            state.store(plan.clone(), self.settings.max_history);
        }

        debug!(
            target: "analyzer",
            query_id = %plan.query_id,
            complexity = %plan.complexity,
            score = plan.complexity_score,
            tables = plan.tables.len(),
            suggestions = plan.suggestions.len(),
            "Analyzed query"
        );
        plan
    }

    /// Enrich the stored plan with measured timing. Returns the updated plan, or `None`
    /// if the plan has already been evicted from history.
    pub fn record_execution(
        &self,
        query_id: &str,
        elapsed: Duration,
        row_count: u64,
    ) -> Option<QueryPlan> {
        let mut state = self.state.write();

        let stats = &mut state.stats;
        stats.executions_recorded += 1;
        let n = stats.executions_recorded as f64;
        let latest = elapsed.as_secs_f64() * 1000.0;
        stats.avg_execution_ms = (stats.avg_execution_ms * (n - 1.0) + latest) / n;
        if elapsed > Duration::from_millis(self.settings.slow_query_ms) {
            stats.slow_queries += 1;
        }

        let plan = state.history.get_mut(query_id)?;
        plan.execution_time = elapsed;
        plan.row_count = row_count;
        plan.apply_estimates();
        Some(plan.clone())
    }

    pub fn get(&self, query_id: &str) -> Option<QueryPlan> {
        self.state.read().history.get(query_id).cloned()
    }

    pub fn history_len(&self) -> usize {
        self.state.read().history.len()
    }

    /// Plans whose recorded execution time exceeds `threshold`, slowest first.
    pub fn slow_queries(&self, threshold: Duration) -> Vec<QueryPlan> {
        let state = self.state.read();
        let mut slow: Vec<QueryPlan> = state
            .history
            .values()
            .filter(|p| p.execution_time > threshold)
            .cloned()
            .collect();
        slow.sort_by(|a, b| b.execution_time.cmp(&a.execution_time));
        slow
    }

    /// Index suggestions for every (table, column) pair at or above the usage threshold,
    /// most used first. Pairs whose names fail identifier validation are skipped.
    pub fn suggest_indexes(&self) -> Vec<IndexSuggestion> {
        let candidates: Vec<((String, String), ColumnUsage)> = {
            let state = self.state.read();
            state
                .usage
                .iter()
                .filter(|(_, u)| u.count >= self.settings.index_usage_threshold)
                .map(|(k, u)| (k.clone(), *u))
                .collect()
        };

        let mut suggestions: Vec<IndexSuggestion> = candidates
            .into_iter()
            .filter_map(|((table, column), usage)| build_suggestion(table, column, usage))
            .collect();

        suggestions.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.table.cmp(&b.table))
                .then_with(|| a.columns.cmp(&b.columns))
        });
        suggestions
    }

    pub fn record_index_created(&self) {
        self.state.write().stats.indexes_created += 1;
    }

    pub fn stats(&self) -> OptimizationStats {
        let state = self.state.read();
        let mut stats = state.stats.clone();
        stats.indexes_suggested = state
            .usage
            .values()
            .filter(|u| u.count >= self.settings.index_usage_threshold)
            .count() as u64;
        stats
    }

    /// Zero all counters and clear history and usage in one step.
    pub fn reset(&self) {
        *self.state.write() = AnalyzerState::default();
    }
}

fn build_suggestion(table: String, column: String, usage: ColumnUsage) -> Option<IndexSuggestion> {
    if let Err(e) = validate_table_name(&table, IdentifierMode::Strict)
        .and_then(|_| validate_column_name(&column, IdentifierMode::Strict))
    {
        debug!(target: "analyzer", %table, %column, error = %e, "Skipping index suggestion");
        return None;
    }

    let engine = usage.engine.unwrap_or(EngineKind::Postgres);
    let index_name = format!("idx_{}_{}", table.replace('.', "_"), column);
    let columns = vec![column.clone()];
    let create_statement = engine
        .dialect()
        .create_index_ddl(&table, &columns, &index_name);

    Some(IndexSuggestion {
        rationale: format!(
            "Column '{}' of '{}' is filtered on in {} analyzed queries",
            column, table, usage.count
        ),
        table,
        columns,
        index_name,
        index_type: "btree".to_string(),
        priority: usage.count,
        create_statement,
        estimated_benefit: Benefit::from_usage(usage.count),
    })
}

/// Deterministic id for `sql`: whitespace-insensitive, case-sensitive.
pub fn query_id(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(collapse_whitespace(sql).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Build a plan for `sql` without touching any analyzer state.
pub fn inspect(sql: &str, engine: Option<EngineKind>) -> QueryPlan {
    let normalized = normalize(sql);
    let (refs, joins) = extract_tables(sql);
    let tables: Vec<String> = refs.iter().map(|t| t.name.clone()).collect();
    let where_columns = resolve_columns(&extract_where_columns(sql), &refs);

    let score = complexity_score(&normalized, tables.len());
    let complexity = Complexity::from_score(score);
    let suggestions = suggestions_for(&normalized, &tables, joins.len(), complexity);

    let mut plan = QueryPlan {
        query_id: query_id(sql),
        sql: sql.to_string(),
        engine,
        execution_time: Duration::ZERO,
        row_count: 0,
        tables,
        joins,
        complexity,
        complexity_score: score,
        classification: classify(sql),
        where_columns,
        suggestions,
        estimated_memory_bytes: 0,
        estimated_network_bytes: 0,
        analyzed_at: Utc::now(),
    };
    plan.apply_estimates();
    plan
}

/// Weighted feature count over normalized SQL, plus one per table beyond three.
pub fn complexity_score(normalized: &str, table_count: usize) -> u32 {
    let weighted = [
        (count_keyword(normalized, "JOIN"), 2),
        (count_keyword(normalized, "UNION"), 3),
        (count_keyword(normalized, "GROUP BY"), 2),
        (count_keyword(normalized, "HAVING"), 2),
        (SUBQUERY.find_iter(normalized).count(), 3),
        (count_keyword(normalized, "EXISTS"), 2),
        (count_keyword(normalized, "WITH"), 3),
        (WINDOW_CALL.find_iter(normalized).count(), 3),
        (count_keyword(normalized, "ORDER BY"), 1),
        (count_keyword(normalized, "DISTINCT"), 1),
    ];

    let features: usize = weighted.iter().map(|(count, weight)| count * weight).sum();
    let table_penalty = table_count.saturating_sub(3);
    u32::try_from(features + table_penalty).unwrap_or(u32::MAX)
}

fn suggestions_for(
    normalized: &str,
    tables: &[String],
    join_count: usize,
    complexity: Complexity,
) -> Vec<String> {
    let has_limit = contains_keyword(normalized, "LIMIT");
    let mut suggestions = Vec::new();

    if SELECT_STAR.is_match(normalized) {
        suggestions.push("Avoid SELECT *; list only the columns you need".to_string());
    }
    if complexity == Complexity::Low && !has_limit {
        suggestions.push("Add a LIMIT clause to bound the result size".to_string());
    }
    if !tables.is_empty() && !contains_keyword(normalized, "WHERE") {
        suggestions.push(format!(
            "No WHERE clause: every row of {} is read",
            tables.join(", ")
        ));
    }
    if contains_keyword(normalized, "ORDER BY") && !has_limit {
        suggestions.push("ORDER BY without LIMIT sorts the entire result; add a LIMIT".to_string());
    }
    if complexity == Complexity::High && join_count > 2 {
        suggestions.push(format!(
            "High complexity with {} joins; index the join columns",
            join_count
        ));
    }
    if contains_keyword(normalized, "GROUP BY") {
        suggestions.push("GROUP BY present; consider indexing the grouped columns".to_string());
    }
    suggestions
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TableRef {
    name: String,
    alias: Option<String>,
}

/// Tables after top-level FROM (including comma lists) and JOIN tokens. Subquery targets
/// and anything nested inside parentheses are skipped.
fn extract_tables(sql: &str) -> (Vec<TableRef>, Vec<JoinInfo>) {
    let tokens: Vec<&str> = sql.split_whitespace().collect();
    let mut tables: Vec<TableRef> = Vec::new();
    let mut joins = Vec::new();
    let mut seen = HashSet::new();
    let mut depth = 0;

    for (i, token) in tokens.iter().enumerate() {
        let upper = token.to_uppercase();
        if depth == 0 && (upper == "FROM" || upper == "JOIN") {
            let is_join = upper == "JOIN";
            let mut j = i + 1;
            while let Some(target) = tokens.get(j) {
                if target.starts_with('(') {
                    break;
                }
                let name = clean_identifier(target);
                if name.is_empty() {
                    break;
                }

                let (alias, last) = alias_after(&tokens, j);
                if is_join {
                    joins.push(JoinInfo {
                        kind: join_kind(&tokens[..i]),
                        table: name.clone(),
                    });
                }
                if seen.insert(name.to_lowercase()) {
                    tables.push(TableRef { name, alias });
                }

                let continues_list = !is_join
                    && tokens[last].ends_with(',')
                    && !target.ends_with(')');
                if !continues_list {
                    break;
                }
                j = last + 1;
            }
        }
        depth += paren_delta(token);
    }

    (tables, joins)
}

/// Alias following the table token at `j`, and the index of the last token consumed.
fn alias_after(tokens: &[&str], j: usize) -> (Option<String>, usize) {
    let target = tokens[j];
    if target.ends_with([',', ';', ')']) {
        return (None, j);
    }
    match tokens.get(j + 1) {
        Some(next) if next.eq_ignore_ascii_case("AS") => match tokens.get(j + 2) {
            Some(alias) => (Some(clean_identifier(alias)), j + 2),
            None => (None, j + 1),
        },
        Some(next) if ALIAS_TOKEN.is_match(next) => {
            let word = clean_identifier(next);
            if CLAUSE_WORDS.contains(&word.to_uppercase().as_str()) {
                (None, j)
            } else {
                (Some(word), j + 1)
            }
        }
        _ => (None, j),
    }
}

fn join_kind(preceding: &[&str]) -> String {
    let modifiers: Vec<String> = preceding
        .iter()
        .rev()
        .take(2)
        .map(|t| t.to_uppercase())
        .take_while(|t| JOIN_MODIFIERS.contains(&t.as_str()))
        .collect();

    if modifiers.is_empty() {
        return "INNER JOIN".to_string();
    }
    let mut parts: Vec<String> = modifiers.into_iter().rev().collect();
    parts.push("JOIN".to_string());
    parts.join(" ")
}

/// Left-hand sides of the first WHERE clause's predicates, as written (`b`, `u.id`).
fn extract_where_columns(sql: &str) -> Vec<String> {
    let Some(start) = WHERE_CLAUSE.find(sql) else {
        return Vec::new();
    };
    let rest = &sql[start.end()..];
    let clause = match WHERE_END.find(rest) {
        Some(end) => &rest[..end.start()],
        None => rest,
    };

    let mut columns: Vec<String> = Vec::new();
    for predicate in BOOLEAN_SPLIT.split(clause) {
        if let Some(caps) = PREDICATE_COLUMN.captures(predicate) {
            let col = caps[1].to_string();
            let upper = col.to_uppercase();
            if matches!(upper.as_str(), "NULL" | "TRUE" | "FALSE" | "NOT" | "EXISTS") {
                continue;
            }
            if !columns.contains(&col) {
                columns.push(col);
            }
        }
    }
    columns
}

/// Attribute raw column references to tables. Qualified references resolve through
/// aliases; unqualified ones go to the first table.
fn resolve_columns(raw: &[String], tables: &[TableRef]) -> Vec<ColumnRef> {
    let mut resolved = Vec::new();
    for col in raw {
        let column_ref = match col.rsplit_once('.') {
            Some((qualifier, column)) => {
                let table = tables
                    .iter()
                    .find(|t| {
                        t.alias
                            .as_deref()
                            .is_some_and(|a| a.eq_ignore_ascii_case(qualifier))
                            || t.name.eq_ignore_ascii_case(qualifier)
                    })
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| qualifier.to_string());
                ColumnRef {
                    table,
                    column: column.to_string(),
                }
            }
            None => match tables.first() {
                Some(first) => ColumnRef {
                    table: first.name.clone(),
                    column: col.clone(),
                },
                None => continue,
            },
        };
        if !resolved.contains(&column_ref) {
            resolved.push(column_ref);
        }
    }
    resolved
}
