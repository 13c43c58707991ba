//! Public and internal types for the curator API and collection engine.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

use crate::engine::tools::sanitize_key;
use crate::utils::config::{DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_FORMAT, ProgressConsts};

/// One record as returned by a repository: a string-keyed map of scalar or nested values.
pub type Record = Map<String, Value>;

/// Provenance column every fetched row carries: the page cursor it came from.
pub const PAGE_COLUMN: &str = "page";

/// One unit of search work.
///
/// Compared structurally and used as the key of a [`ResultSet`]. Display renders the
/// human-readable form used in status messages (`"cats"`, `"cats articles"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Query {
    Term(String),
    Type(String),
    TermType(String, String),
}

impl Query {
    pub fn term(&self) -> Option<&str> {
        match self {
            Query::Term(term) | Query::TermType(term, _) => Some(term),
            Query::Type(_) => None,
        }
    }

    pub fn search_type(&self) -> Option<&str> {
        match self {
            Query::Type(search_type) | Query::TermType(_, search_type) => Some(search_type),
            Query::Term(_) => None,
        }
    }

    /// Underscore-joined parts, before sanitizing (`cats_articles`).
    fn stem_parts(&self) -> String {
        match self {
            Query::Term(term) => term.clone(),
            Query::Type(search_type) => search_type.clone(),
            Query::TermType(term, search_type) => format!("{term}_{search_type}"),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term(term) => write!(f, "{term}"),
            Query::Type(search_type) => write!(f, "{search_type}"),
            Query::TermType(term, search_type) => write!(f, "{term} {search_type}"),
        }
    }
}

/// Key of a merged/metadata table: the query plus an optional metadata category.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TableKey {
    pub query: Query,
    pub category: Option<String>,
}

impl TableKey {
    pub fn new(query: Query, category: Option<String>) -> Self {
        Self { query, category }
    }

    pub fn categorized(query: Query, category: impl Into<String>) -> Self {
        Self {
            query,
            category: Some(category.into()),
        }
    }

    /// String-safe key handed to persistence sinks: quotes stripped, spaces replaced by `_`.
    /// Composite keys render as `term_type_category`.
    pub fn file_stem(&self) -> String {
        let stem = match &self.category {
            None => self.query.stem_parts(),
            Some(category) => format!("{}_{category}", self.query.stem_parts()),
        };
        sanitize_key(&stem)
    }
}

impl From<Query> for TableKey {
    fn from(query: Query) -> Self {
        Self {
            query,
            category: None,
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.category {
            None => write!(f, "{}", self.query),
            Some(category) => write!(f, "{} {category}", self.query),
        }
    }
}

/// Ordered sequence of records for one query. Rows keep the order they were fetched in.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<Record>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Record) {
        self.rows.push(row);
    }

    pub fn extend(&mut self, other: ResultTable) {
        self.rows.extend(other.rows);
    }

    /// Append one page of records, tagging each with [`PAGE_COLUMN`] and the echo columns.
    pub fn append_page(&mut self, records: Vec<Record>, page: u64, echo: &[(String, Value)]) {
        self.rows.reserve(records.len());
        for mut record in records {
            record.insert(PAGE_COLUMN.to_string(), Value::from(page));
            for (column, value) in echo {
                record.insert(column.clone(), value.clone());
            }
            self.rows.push(record);
        }
    }

    /// Column names in order of first appearance across rows.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    /// Values of `column` for rows that have it.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().filter_map(move |row| row.get(column))
    }
}

/// Mapping from key to table (or absent), in insertion order.
///
/// Absent (`None`) and present-but-empty are distinct values, but both mean "nothing to merge".
#[derive(Clone, Debug, PartialEq)]
pub struct ResultSet<K = Query> {
    entries: Vec<(K, Option<ResultTable>)>,
}

impl<K> Default for ResultSet<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialEq> ResultSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the table for `key`. A replaced key keeps its original position.
    pub fn insert(&mut self, key: K, table: Option<ResultTable>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = table,
            None => self.entries.push((key, table)),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// `Some(None)` when the key is present with an absent table; `None` when the key is missing.
    pub fn entry(&self, key: &K) -> Option<Option<&ResultTable>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, table)| table.as_ref())
    }

    /// Table for `key`, or `None` when the key or its table is absent.
    pub fn table(&self, key: &K) -> Option<&ResultTable> {
        self.entry(key).flatten()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, Option<&ResultTable>)> {
        self.entries.iter().map(|(k, table)| (k, table.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every table is absent or has no rows.
    pub fn all_empty(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, table)| table.as_ref().is_none_or(ResultTable::is_empty))
    }

    /// Total row count across present tables.
    pub fn row_count(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|(_, table)| table.as_ref())
            .map(ResultTable::len)
            .sum()
    }
}

impl<K: PartialEq> FromIterator<(K, Option<ResultTable>)> for ResultSet<K> {
    fn from_iter<I: IntoIterator<Item = (K, Option<ResultTable>)>>(iter: I) -> Self {
        let mut set = ResultSet::new();
        for (key, table) in iter {
            set.insert(key, table);
        }
        set
    }
}

impl<K> IntoIterator for ResultSet<K> {
    type Item = (K, Option<ResultTable>);
    type IntoIter = std::vec::IntoIter<(K, Option<ResultTable>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Whether the total number of work units is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressMode {
    Determinate,
    Indeterminate,
}

/// One status update from the collection worker. Append-only, consumed in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    Message(String),
    Progress {
        current_ref: String,
        mode: ProgressMode,
        completed: Option<usize>,
        total: Option<usize>,
    },
}

impl ProgressEvent {
    pub fn message(&self) -> Option<&str> {
        match self {
            ProgressEvent::Message(text) => Some(text),
            ProgressEvent::Progress { .. } => None,
        }
    }
}

/// Opaque credential attached to outgoing requests. Debug output never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialToken(String);

impl CredentialToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CredentialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialToken(<redacted>)")
    }
}

/// Full options (CLI and `.curator.toml`).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Repository (adapter registry name) to collect from.
    pub repository: Option<String>,
    /// Search terms, for adapters that take them.
    pub terms: Vec<String>,
    /// Search types, for adapters that take them.
    pub types: Vec<String>,
    /// JSON file mapping repository name to credential string.
    pub credentials: Option<PathBuf>,
    /// Directory the JSON sink writes into.
    pub output_dir: PathBuf,
    /// Output format identifier handed to the sink (`json`, `jsonl`).
    pub output_format: String,
    /// Cap on consecutive rate-limit retries per request. None retries until the limit clears.
    pub max_rate_limit_retries: Option<u32>,
    /// Observer poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// When false, collect and report but never invoke the sink.
    pub save: bool,
    /// Render progress with bars instead of log lines.
    pub bars: bool,
    /// Debug-level logging.
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            repository: None,
            terms: Vec::new(),
            types: Vec::new(),
            credentials: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            max_rate_limit_retries: None,
            poll_interval_ms: ProgressConsts::POLL_INTERVAL_MS,
            save: true,
            bars: false,
            verbose: false,
        }
    }
}
