//! Papers With Code: term × type queries with categorized, paginated metadata per object.
//!
//! Each search type has a fixed list of metadata categories (`papers` → `datasets`,
//! `methods`, ...). Every object id is fetched once per category at
//! `{base}/{type}/{id}/{category}` and the rows are tagged with the parent `id`, so the
//! category tables join back onto the search table under `(query, category)` keys.

use super::{
    Adapter, CursorScheme, Dimensions, Endpoint, MetadataRef, MetadataSource, PageRequest,
    expect_term_type, object_ids,
};
use crate::engine::merger::{CategoryJoin, JoinKey, MergeStrategy};
use crate::{CollectResult, Query, ResultTable};

const BASE_URL: &str = "https://paperswithcode.com/api/v1";
const PAGE_SIZE: u64 = 500;
const ID_COLUMN: &str = "id";

/// Search types and the metadata categories each one exposes.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("conferences", &["proceedings"]),
    ("datasets", &["evaluations"]),
    ("evaluations", &["metrics", "results"]),
    (
        "papers",
        &["datasets", "methods", "repositories", "results", "tasks"],
    ),
    ("tasks", &["children", "evaluations", "papers", "parents"]),
];

const TYPE_OPTIONS: &[&str] = &["conferences", "datasets", "evaluations", "papers", "tasks"];

#[derive(Debug, Default)]
pub struct PapersWithCodeAdapter;

impl PapersWithCodeAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Metadata categories for `search_type`; empty for unknown types.
    pub fn categories(search_type: &str) -> &'static [&'static str] {
        CATEGORIES
            .iter()
            .find(|(t, _)| *t == search_type)
            .map(|(_, categories)| *categories)
            .unwrap_or(&[])
    }
}

impl Adapter for PapersWithCodeAdapter {
    fn name(&self) -> &str {
        "paperswithcode"
    }

    fn display_name(&self) -> String {
        "Papers With Code".to_string()
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions::TermsAndTypes
    }

    fn type_options(&self) -> &[&'static str] {
        TYPE_OPTIONS
    }

    fn search_endpoint(&self, query: &Query) -> CollectResult<Endpoint> {
        let (term, search_type) = expect_term_type(self.name(), query)?;
        let request = PageRequest::new(format!("{BASE_URL}/{search_type}"))
            .param("q", term)
            .param("items_per_page", PAGE_SIZE);
        Ok(Endpoint::new(request, CursorScheme::page("page", 1)).unwrap(&["results"]))
    }

    fn metadata(&self) -> Option<&dyn MetadataSource> {
        Some(self)
    }
}

impl MetadataSource for PapersWithCodeAdapter {
    fn derive_refs(&self, query: &Query, table: &ResultTable) -> CollectResult<Vec<MetadataRef>> {
        let (_, search_type) = expect_term_type(self.name(), query)?;
        let ids = object_ids(table, ID_COLUMN)?;
        let mut refs = Vec::new();
        for category in Self::categories(search_type) {
            for id in &ids {
                let request = PageRequest::new(format!("{BASE_URL}/{search_type}/{id}/{category}"));
                let endpoint = Endpoint::new(request, CursorScheme::page("page", 1))
                    .unwrap(&["results"])
                    .echo(ID_COLUMN, id.as_str());
                refs.push(MetadataRef::paged(
                    Some(category.to_string()),
                    format!("{id} {category}"),
                    endpoint,
                ));
            }
        }
        Ok(refs)
    }

    fn join_key(&self) -> JoinKey {
        JoinKey::on(ID_COLUMN)
    }

    fn merge_strategy(&self) -> Box<dyn MergeStrategy> {
        Box::new(CategoryJoin::new(self.join_key()))
    }
}
