//! OpenML: type queries over the JSON REST API, one metadata GET per listed object.
//!
//! Listings page through `/{entity}/list/limit/{n}/offset/{k}`; past the last item the API
//! answers 412 ("No results") instead of an empty list. The id column differs per type
//! (`did`, `run_id`, `task_id`), so the join key is chosen per query. Evaluations have no
//! per-object endpoint and pass through unmerged.

use super::{
    Adapter, CursorScheme, Dimensions, Endpoint, MetadataRef, MetadataSource, PageRequest,
    expect_type, object_ids,
};
use crate::engine::merger::{JoinKey, KeyPerQuery, MergeStrategy};
use crate::{CollectError, CollectResult, CredentialToken, Query, ResultTable};

const BASE_URL: &str = "https://www.openml.org/api/v1/json";
const PAGE_SIZE: u64 = 10_000;
const NO_RESULTS_STATUS: u16 = 412;
const TYPE_OPTIONS: &[&str] = &["datasets", "evaluations", "runs", "tasks"];

/// Where the object sits in a per-object response, and its id column there.
struct ObjectLookup {
    record_path: &'static str,
    id_column: &'static str,
}

struct TypeSpec {
    search_type: &'static str,
    entity: &'static str,
    list_path: [&'static str; 2],
    id_column: &'static str,
    lookup: Option<ObjectLookup>,
}

const TYPES: &[TypeSpec] = &[
    TypeSpec {
        search_type: "datasets",
        entity: "data",
        list_path: ["data", "dataset"],
        id_column: "did",
        lookup: Some(ObjectLookup {
            record_path: "data_set_description",
            id_column: "id",
        }),
    },
    TypeSpec {
        search_type: "evaluations",
        entity: "evaluation",
        list_path: ["evaluations", "evaluation"],
        id_column: "run_id",
        lookup: None,
    },
    TypeSpec {
        search_type: "runs",
        entity: "run",
        list_path: ["runs", "run"],
        id_column: "run_id",
        lookup: Some(ObjectLookup {
            record_path: "run",
            id_column: "run_id",
        }),
    },
    TypeSpec {
        search_type: "tasks",
        entity: "task",
        list_path: ["tasks", "task"],
        id_column: "task_id",
        lookup: Some(ObjectLookup {
            record_path: "task",
            id_column: "task_id",
        }),
    },
];

fn spec_for(search_type: &str) -> CollectResult<&'static TypeSpec> {
    TYPES
        .iter()
        .find(|spec| spec.search_type == search_type)
        .ok_or_else(|| {
            CollectError::Validation(format!(
                "unknown search type '{search_type}', expected one of: {}",
                TYPE_OPTIONS.join(", ")
            ))
        })
}

/// Search id column on the left, metadata id column on the right.
fn join_key_for(query: &Query) -> JoinKey {
    match query.search_type().and_then(|t| spec_for(t).ok()) {
        Some(TypeSpec {
            id_column,
            lookup: Some(lookup),
            ..
        }) if *id_column != lookup.id_column => JoinKey::split(*id_column, lookup.id_column),
        Some(spec) => JoinKey::on(spec.id_column),
        None => JoinKey::on("id"),
    }
}

#[derive(Debug, Default)]
pub struct OpenMlAdapter {
    api_key: Option<CredentialToken>,
}

impl OpenMlAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_key(&self, request: PageRequest) -> PageRequest {
        match &self.api_key {
            Some(key) => request.param("api_key", key.as_str()),
            None => request,
        }
    }
}

impl Adapter for OpenMlAdapter {
    fn name(&self) -> &str {
        "openml"
    }

    fn display_name(&self) -> String {
        "OpenML".to_string()
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions::Types
    }

    fn type_options(&self) -> &[&'static str] {
        TYPE_OPTIONS
    }

    fn supports_credentials(&self) -> bool {
        true
    }

    fn set_credential(&mut self, token: CredentialToken) {
        self.api_key = Some(token);
    }

    fn search_endpoint(&self, query: &Query) -> CollectResult<Endpoint> {
        let spec = spec_for(expect_type(self.name(), query)?)?;
        let request = self.with_key(PageRequest::new(format!(
            "{BASE_URL}/{}/list/limit/{PAGE_SIZE}",
            spec.entity
        )));
        Ok(Endpoint::new(request, CursorScheme::offset("offset", PAGE_SIZE))
            .cursor_in_path()
            .unwrap(&spec.list_path)
            .end_on_status(NO_RESULTS_STATUS))
    }

    fn metadata(&self) -> Option<&dyn MetadataSource> {
        Some(self)
    }
}

impl MetadataSource for OpenMlAdapter {
    fn derive_refs(&self, query: &Query, table: &ResultTable) -> CollectResult<Vec<MetadataRef>> {
        let spec = spec_for(expect_type(self.name(), query)?)?;
        let Some(lookup) = &spec.lookup else {
            return Ok(Vec::new());
        };
        let refs = object_ids(table, spec.id_column)?
            .into_iter()
            .map(|id| {
                let request =
                    self.with_key(PageRequest::new(format!("{BASE_URL}/{}/{id}", spec.entity)));
                MetadataRef::single_at(id, request, &[lookup.record_path])
            })
            .collect();
        Ok(refs)
    }

    /// Key for datasets; the merge strategy picks the key per search type.
    fn join_key(&self) -> JoinKey {
        join_key_for(&Query::Type("datasets".to_string()))
    }

    fn merge_strategy(&self) -> Box<dyn MergeStrategy> {
        Box::new(KeyPerQuery::new(join_key_for))
    }
}
