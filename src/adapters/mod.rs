//! Adapter contract and registry.
//!
//! An adapter describes one repository: which query dimensions it takes, how a query maps
//! onto a paginated [`Endpoint`], and optionally how to derive and fetch per-record metadata.
//! All network I/O, pagination, backoff and cancellation stay in the engine.

pub mod dataverse;
pub mod dryad;
pub mod endpoint;
pub mod figshare;
pub mod openml;
pub mod papers_with_code;
pub mod zenodo;

pub use dataverse::DataverseAdapter;
pub use dryad::DryadAdapter;
pub use endpoint::{CursorScheme, DeriveFn, Endpoint, Page, PageCursor, PageRequest, ParamPlacement};
pub use figshare::FigshareAdapter;
pub use openml::OpenMlAdapter;
pub use papers_with_code::PapersWithCodeAdapter;
pub use zenodo::ZenodoAdapter;

use crate::engine::merger::{JoinKey, MergeStrategy, OuterJoin};
use crate::engine::tools::{title_case, value_as_text};
use crate::{CollectResult, CredentialToken, Query, ResultTable};

/// Which query dimensions an adapter is driven by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimensions {
    Terms,
    Types,
    TermsAndTypes,
}

impl Dimensions {
    pub fn uses_terms(self) -> bool {
        matches!(self, Dimensions::Terms | Dimensions::TermsAndTypes)
    }

    pub fn uses_types(self) -> bool {
        matches!(self, Dimensions::Types | Dimensions::TermsAndTypes)
    }
}

/// Repository-specific plugin.
pub trait Adapter: Send {
    /// Registry / credential-file name (`figshare`).
    fn name(&self) -> &str;

    /// Name used in status messages (`Figshare`).
    fn display_name(&self) -> String {
        title_case(self.name())
    }

    fn dimensions(&self) -> Dimensions;

    /// Allowed search types. Empty means any type is accepted.
    fn type_options(&self) -> &[&'static str] {
        &[]
    }

    fn supports_credentials(&self) -> bool {
        false
    }

    /// Attach the credential to this adapter's request headers. Called once, before the run.
    fn set_credential(&mut self, _token: CredentialToken) {}

    /// The paginated search endpoint for `query`.
    fn search_endpoint(&self, query: &Query) -> CollectResult<Endpoint>;

    /// Metadata capability, when the repository has one.
    fn metadata(&self) -> Option<&dyn MetadataSource> {
        None
    }
}

/// How to fetch the metadata behind one reference.
#[derive(Clone, Debug)]
pub enum MetadataFetch {
    /// One GET; the payload at `unwrap_path` (object or array) becomes the rows.
    Single {
        request: PageRequest,
        unwrap_path: Vec<String>,
    },
    /// A paginated endpoint, driven like a search.
    Paged(Endpoint),
}

/// One metadata reference derived from a search row.
#[derive(Clone, Debug)]
pub struct MetadataRef {
    /// Metadata category this reference feeds; `None` for single-category adapters.
    pub category: Option<String>,
    /// Progress label (object id or path).
    pub label: String,
    pub fetch: MetadataFetch,
}

impl MetadataRef {
    pub fn single(label: impl Into<String>, request: PageRequest) -> Self {
        Self::single_at(label, request, &[])
    }

    /// Single GET whose record sits under `unwrap_path` (`{"task": {...}}`).
    pub fn single_at(label: impl Into<String>, request: PageRequest, unwrap_path: &[&str]) -> Self {
        Self {
            category: None,
            label: label.into(),
            fetch: MetadataFetch::Single {
                request,
                unwrap_path: unwrap_path.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    pub fn paged(category: Option<String>, label: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            category,
            label: label.into(),
            fetch: MetadataFetch::Paged(endpoint),
        }
    }
}

/// Metadata capability of an adapter.
pub trait MetadataSource {
    /// Project a query's primary table onto the references to fetch.
    fn derive_refs(&self, query: &Query, table: &ResultTable) -> CollectResult<Vec<MetadataRef>>;

    /// Key (or left/right keys) the search and metadata tables are joined on.
    fn join_key(&self) -> JoinKey;

    /// Merge strategy. Defaults to a plain outer join on [`Self::join_key`].
    fn merge_strategy(&self) -> Box<dyn MergeStrategy> {
        Box::new(OuterJoin::new(self.join_key()))
    }
}

/// Registry names, sorted.
pub const REPOSITORIES: &[&str] = &[
    "dataverse",
    "dryad",
    "figshare",
    "openml",
    "paperswithcode",
    "zenodo",
];

/// Look up an adapter by registry name (case-insensitive).
pub fn by_name(name: &str) -> Option<Box<dyn Adapter>> {
    let adapter: Box<dyn Adapter> = match name.to_ascii_lowercase().as_str() {
        "dataverse" => Box::new(DataverseAdapter::new()),
        "dryad" => Box::new(DryadAdapter::new()),
        "figshare" => Box::new(FigshareAdapter::new()),
        "openml" => Box::new(OpenMlAdapter::new()),
        "paperswithcode" | "papers_with_code" => Box::new(PapersWithCodeAdapter::new()),
        "zenodo" => Box::new(ZenodoAdapter::new()),
        _ => return None,
    };
    Some(adapter)
}

/// Term of a term query, or a validation error naming the adapter.
pub(crate) fn expect_term<'a>(adapter: &str, query: &'a Query) -> CollectResult<&'a str> {
    match query {
        Query::Term(term) => Ok(term),
        other => Err(crate::CollectError::Validation(format!(
            "{adapter} takes term queries, got '{other}'"
        ))),
    }
}

/// Type of a type query, or a validation error naming the adapter.
pub(crate) fn expect_type<'a>(adapter: &str, query: &'a Query) -> CollectResult<&'a str> {
    match query {
        Query::Type(search_type) => Ok(search_type),
        other => Err(crate::CollectError::Validation(format!(
            "{adapter} takes type queries, got '{other}'"
        ))),
    }
}

/// Term and type of a term+type query, or a validation error naming the adapter.
pub(crate) fn expect_term_type<'a>(
    adapter: &str,
    query: &'a Query,
) -> CollectResult<(&'a str, &'a str)> {
    match query {
        Query::TermType(term, search_type) => Ok((term, search_type)),
        other => Err(crate::CollectError::Validation(format!(
            "{adapter} takes term and type queries, got '{other}'"
        ))),
    }
}

/// Distinct textual values of `column`, in first-appearance order. A non-empty table without
/// the column cannot feed a metadata phase.
pub(crate) fn object_ids(table: &ResultTable, column: &str) -> CollectResult<Vec<String>> {
    let mut ids: Vec<String> = Vec::new();
    for value in table.column_values(column) {
        if let Some(id) = value_as_text(value)
            && !ids.contains(&id)
        {
            ids.push(id);
        }
    }
    if ids.is_empty() && !table.is_empty() {
        return Err(crate::CollectError::Capability(format!(
            "search rows carry no '{column}' column"
        )));
    }
    Ok(ids)
}
