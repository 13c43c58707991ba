//! Dryad: term queries over the dataset search, with paginated file listings per dataset
//! version as metadata.
//!
//! Search rows carry their version only as a link (`_links.stash:version.href`), so the
//! endpoint derives a `version` column from it. The file listings echo the same column and
//! the two sides join on it.

use serde_json::Value;

use super::{
    Adapter, CursorScheme, Dimensions, Endpoint, MetadataRef, MetadataSource, PageRequest,
    expect_term, object_ids,
};
use crate::engine::merger::JoinKey;
use crate::{CollectResult, CredentialToken, Query, Record, ResultTable};

const BASE_URL: &str = "https://datadryad.org/api/v2";
const PAGE_SIZE: u64 = 100;
const VERSION_COLUMN: &str = "version";

#[derive(Debug, Default)]
pub struct DryadAdapter {
    headers: Vec<(String, String)>,
}

impl DryadAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Last path segment of the row's version link, or null.
fn version_id(record: &Record) -> Value {
    record
        .get("_links")
        .and_then(|links| links.get("stash:version"))
        .and_then(|version| version.get("href"))
        .and_then(Value::as_str)
        .and_then(|href| href.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map_or(Value::Null, Value::from)
}

impl Adapter for DryadAdapter {
    fn name(&self) -> &str {
        "dryad"
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions::Terms
    }

    fn supports_credentials(&self) -> bool {
        true
    }

    fn set_credential(&mut self, token: CredentialToken) {
        self.headers
            .push(("Authorization".into(), format!("Bearer {}", token.as_str())));
    }

    fn search_endpoint(&self, query: &Query) -> CollectResult<Endpoint> {
        let term = expect_term(self.name(), query)?;
        let request = PageRequest::new(format!("{BASE_URL}/search"))
            .param("q", term)
            .param("per_page", PAGE_SIZE)
            .headers(&self.headers);
        Ok(Endpoint::new(request, CursorScheme::page("page", 1))
            .unwrap(&["_embedded", "stash:datasets"])
            .derive(VERSION_COLUMN, version_id))
    }

    fn metadata(&self) -> Option<&dyn MetadataSource> {
        Some(self)
    }
}

impl MetadataSource for DryadAdapter {
    fn derive_refs(&self, _query: &Query, table: &ResultTable) -> CollectResult<Vec<MetadataRef>> {
        let refs = object_ids(table, VERSION_COLUMN)?
            .into_iter()
            .map(|version| {
                let request = PageRequest::new(format!("{BASE_URL}/versions/{version}/files"))
                    .headers(&self.headers);
                let endpoint = Endpoint::new(request, CursorScheme::page("page", 1))
                    .unwrap(&["_embedded", "stash:files"])
                    .echo(VERSION_COLUMN, version.as_str());
                MetadataRef::paged(None, version, endpoint)
            })
            .collect();
        Ok(refs)
    }

    fn join_key(&self) -> JoinKey {
        JoinKey::on(VERSION_COLUMN)
    }
}
