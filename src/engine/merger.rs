//! Keyed outer join of search and metadata tables, plus the pluggable merge strategies.
//!
//! All functions are pure: inputs are borrowed, outputs are new tables.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::engine::tools::value_as_text;
use crate::{CollectError, CollectResult, Query, Record, ResultSet, ResultTable, TableKey};

/// Suffix for colliding columns that came from the search table.
pub const SEARCH_SUFFIX: &str = "_search";
/// Suffix for colliding columns that came from the metadata table.
pub const METADATA_SUFFIX: &str = "_metadata";

/// Column(s) the two tables are joined on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinKey {
    /// Same column name on both sides; kept once, unsuffixed.
    On(String),
    /// Different columns on each side; both are kept.
    Split { left: String, right: String },
}

impl JoinKey {
    pub fn on(column: impl Into<String>) -> Self {
        JoinKey::On(column.into())
    }

    pub fn split(left: impl Into<String>, right: impl Into<String>) -> Self {
        JoinKey::Split {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn left(&self) -> &str {
        match self {
            JoinKey::On(column) => column,
            JoinKey::Split { left, .. } => left,
        }
    }

    pub fn right(&self) -> &str {
        match self {
            JoinKey::On(column) => column,
            JoinKey::Split { right, .. } => right,
        }
    }
}

/// Join text for one row. Missing and null keys never match; nested keys are a type error.
fn key_text(row: &Record, column: &str) -> CollectResult<Option<String>> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(_)) | Some(Value::Object(_)) => Err(CollectError::Merge(format!(
            "key column '{column}' holds a nested value"
        ))),
        Some(value) => Ok(value_as_text(value)),
    }
}

fn require_column(table: &ResultTable, column: &str, side: &str) -> CollectResult<()> {
    if table.rows().iter().any(|row| row.contains_key(column)) {
        Ok(())
    } else {
        Err(CollectError::Merge(format!(
            "{side} table has no '{column}' column"
        )))
    }
}

/// Copy `row` into `out`, suffixing columns listed in `colliding`.
fn write_side(out: &mut Record, row: &Record, colliding: &HashSet<String>, suffix: &str) {
    for (column, value) in row {
        let name = if colliding.contains(column) {
            format!("{column}{suffix}")
        } else {
            column.clone()
        };
        out.insert(name, value.clone());
    }
}

/// Outer join of `left` (search) and `right` (metadata) on `key`.
///
/// Every left row appears once per matching right row, or once alone when unmatched; right
/// rows that matched nothing follow in their original order. Non-key columns present on both
/// sides get [`SEARCH_SUFFIX`] / [`METADATA_SUFFIX`]. An empty side yields the other unchanged.
pub fn outer_join(left: &ResultTable, right: &ResultTable, key: &JoinKey) -> CollectResult<ResultTable> {
    if right.is_empty() {
        return Ok(left.clone());
    }
    if left.is_empty() {
        return Ok(right.clone());
    }
    require_column(left, key.left(), "search")?;
    require_column(right, key.right(), "metadata")?;

    let right_columns: HashSet<String> = right.columns().into_iter().collect();
    let mut colliding: HashSet<String> = left
        .columns()
        .into_iter()
        .filter(|column| right_columns.contains(column))
        .collect();
    if let JoinKey::On(column) = key {
        colliding.remove(column);
    }

    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if let Some(text) = key_text(row, key.right())? {
            index.entry(text).or_default().push(i);
        }
    }

    let mut matched = vec![false; right.len()];
    let mut joined = ResultTable::new();
    for left_row in left.rows() {
        let hits = match key_text(left_row, key.left())? {
            Some(text) => index.get(&text).map(Vec::as_slice).unwrap_or(&[]),
            None => &[],
        };
        if hits.is_empty() {
            let mut out = Record::new();
            write_side(&mut out, left_row, &colliding, SEARCH_SUFFIX);
            joined.push(out);
            continue;
        }
        for &i in hits {
            matched[i] = true;
            let mut out = Record::new();
            write_side(&mut out, &right.rows()[i], &colliding, METADATA_SUFFIX);
            write_side(&mut out, left_row, &colliding, SEARCH_SUFFIX);
            joined.push(out);
        }
    }
    for (row, _) in right.rows().iter().zip(&matched).filter(|(_, m)| !**m) {
        let mut out = Record::new();
        write_side(&mut out, row, &colliding, METADATA_SUFFIX);
        joined.push(out);
    }
    Ok(joined)
}

/// Search tables re-keyed as [`TableKey`]s, untouched.
pub fn passthrough(search: &ResultSet<Query>) -> ResultSet<TableKey> {
    search
        .iter()
        .map(|(query, table)| (TableKey::from(query.clone()), table.cloned()))
        .collect()
}

/// Join every search table with the uncategorized metadata table of the same query.
///
/// Queries without a non-empty metadata table pass through unchanged, so the output key space
/// equals the search key space.
pub fn merge(
    search: &ResultSet<Query>,
    metadata: &ResultSet<TableKey>,
    key: &JoinKey,
) -> CollectResult<ResultSet<TableKey>> {
    merge_by(search, metadata, |_| key.clone())
}

/// [`merge`] with the join key chosen per query.
pub fn merge_by(
    search: &ResultSet<Query>,
    metadata: &ResultSet<TableKey>,
    key_for: impl Fn(&Query) -> JoinKey,
) -> CollectResult<ResultSet<TableKey>> {
    let mut merged = ResultSet::new();
    for (query, table) in search.iter() {
        let table_key = TableKey::from(query.clone());
        let joined = match (table, metadata.table(&table_key)) {
            (Some(left), Some(right)) if !left.is_empty() && !right.is_empty() => {
                Some(outer_join(left, right, &key_for(query))?)
            }
            (table, _) => table.cloned(),
        };
        merged.insert(table_key, joined);
    }
    Ok(merged)
}

/// How an adapter's search and metadata result sets are combined.
pub trait MergeStrategy {
    fn merge(
        &self,
        search: &ResultSet<Query>,
        metadata: &ResultSet<TableKey>,
    ) -> CollectResult<ResultSet<TableKey>>;
}

/// Single metadata table per query, joined with [`merge`].
#[derive(Clone, Debug)]
pub struct OuterJoin {
    key: JoinKey,
}

impl OuterJoin {
    pub fn new(key: JoinKey) -> Self {
        Self { key }
    }
}

impl MergeStrategy for OuterJoin {
    fn merge(
        &self,
        search: &ResultSet<Query>,
        metadata: &ResultSet<TableKey>,
    ) -> CollectResult<ResultSet<TableKey>> {
        merge(search, metadata, &self.key)
    }
}

/// Like [`OuterJoin`], for repositories whose record id column differs by search type.
#[derive(Clone, Copy, Debug)]
pub struct KeyPerQuery {
    key_for: fn(&Query) -> JoinKey,
}

impl KeyPerQuery {
    pub fn new(key_for: fn(&Query) -> JoinKey) -> Self {
        Self { key_for }
    }
}

impl MergeStrategy for KeyPerQuery {
    fn merge(
        &self,
        search: &ResultSet<Query>,
        metadata: &ResultSet<TableKey>,
    ) -> CollectResult<ResultSet<TableKey>> {
        merge_by(search, metadata, self.key_for)
    }
}

/// Several metadata categories per query: each category table is joined with the query's
/// search table and stored under `(query, category)`. Queries with no category tables pass
/// through under their plain key.
#[derive(Clone, Debug)]
pub struct CategoryJoin {
    key: JoinKey,
}

impl CategoryJoin {
    pub fn new(key: JoinKey) -> Self {
        Self { key }
    }
}

impl MergeStrategy for CategoryJoin {
    fn merge(
        &self,
        search: &ResultSet<Query>,
        metadata: &ResultSet<TableKey>,
    ) -> CollectResult<ResultSet<TableKey>> {
        let mut merged = ResultSet::new();
        for (query, table) in search.iter() {
            let categories: Vec<(&String, &ResultTable)> = metadata
                .iter()
                .filter(|(key, _)| key.query == *query)
                .filter_map(|(key, meta)| Some((key.category.as_ref()?, meta?)))
                .filter(|(_, meta)| !meta.is_empty())
                .collect();

            match table {
                Some(left) if !left.is_empty() && !categories.is_empty() => {
                    for (category, meta) in categories {
                        let joined = outer_join(left, meta, &self.key)?;
                        merged.insert(TableKey::categorized(query.clone(), category.as_str()), Some(joined));
                    }
                }
                _ => merged.insert(TableKey::from(query.clone()), table.cloned()),
            }
        }
        Ok(merged)
    }
}
