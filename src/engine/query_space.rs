//! Query enumeration from the term and type dimensions.

use log::warn;

use crate::adapters::{Adapter, Dimensions};
use crate::{CollectError, CollectResult, Query};

/// Ordered, duplicate-free list of queries for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuerySpace {
    queries: Vec<Query>,
}

/// Trim, reject blanks, drop repeats (first occurrence wins).
fn normalize(dimension: &str, values: &[String]) -> CollectResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            return Err(CollectError::Validation(format!(
                "blank search {dimension} given"
            )));
        }
        if out.iter().any(|v| v == value) {
            warn!("Duplicate search {dimension} '{value}' ignored");
            continue;
        }
        out.push(value.to_string());
    }
    if out.is_empty() {
        return Err(CollectError::Validation(format!(
            "at least one search {dimension} is required"
        )));
    }
    Ok(out)
}

impl QuerySpace {
    /// Build the query list for `dimensions`.
    ///
    /// Single-dimension adapters get one query per value in input order; two-dimension
    /// adapters get the term-major cross product. A required dimension that is empty, a blank
    /// value, or a type outside a non-empty `type_options` is a validation error. A dimension
    /// the adapter does not use is ignored with a warning.
    pub fn build(
        dimensions: Dimensions,
        terms: &[String],
        types: &[String],
        type_options: &[&str],
    ) -> CollectResult<Self> {
        if !dimensions.uses_terms() && !terms.is_empty() {
            warn!("Search terms ignored: this repository searches by type only");
        }
        if !dimensions.uses_types() && !types.is_empty() {
            warn!("Search types ignored: this repository searches by term only");
        }

        let terms = if dimensions.uses_terms() {
            normalize("term", terms)?
        } else {
            Vec::new()
        };
        let types = if dimensions.uses_types() {
            normalize("type", types)?
        } else {
            Vec::new()
        };
        if !type_options.is_empty()
            && let Some(bad) = types.iter().find(|t| !type_options.contains(&t.as_str()))
        {
            return Err(CollectError::Validation(format!(
                "unknown search type '{bad}', expected one of: {}",
                type_options.join(", ")
            )));
        }

        let queries = match dimensions {
            Dimensions::Terms => terms.into_iter().map(Query::Term).collect(),
            Dimensions::Types => types.into_iter().map(Query::Type).collect(),
            Dimensions::TermsAndTypes => terms
                .iter()
                .flat_map(|term| {
                    types
                        .iter()
                        .map(move |search_type| Query::TermType(term.clone(), search_type.clone()))
                })
                .collect(),
        };
        Ok(Self { queries })
    }

    pub fn for_adapter(adapter: &dyn Adapter, terms: &[String], types: &[String]) -> CollectResult<Self> {
        Self::build(adapter.dimensions(), terms, types, adapter.type_options())
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Query> {
        self.queries.iter()
    }
}
