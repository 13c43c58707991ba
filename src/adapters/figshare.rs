//! Figshare: term × type queries, one metadata GET per returned object, joined on `id`.

use super::{
    Adapter, CursorScheme, Dimensions, Endpoint, MetadataRef, MetadataSource, PageRequest,
    expect_term_type, object_ids,
};
use crate::engine::merger::JoinKey;
use crate::{CollectResult, CredentialToken, Query, ResultTable};

const BASE_URL: &str = "https://api.figshare.com/v2";
const PAGE_SIZE: u64 = 1000;
const PUBLISHED_SINCE: &str = "1950-01-01";
const TYPE_OPTIONS: &[&str] = &["articles", "collections", "projects"];
const ID_COLUMN: &str = "id";

#[derive(Debug, Default)]
pub struct FigshareAdapter {
    headers: Vec<(String, String)>,
}

impl FigshareAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Adapter for FigshareAdapter {
    fn name(&self) -> &str {
        "figshare"
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions::TermsAndTypes
    }

    fn type_options(&self) -> &[&'static str] {
        TYPE_OPTIONS
    }

    fn supports_credentials(&self) -> bool {
        true
    }

    fn set_credential(&mut self, token: CredentialToken) {
        self.headers
            .push(("Authorization".into(), format!("token {}", token.as_str())));
    }

    fn search_endpoint(&self, query: &Query) -> CollectResult<Endpoint> {
        let (term, search_type) = expect_term_type(self.name(), query)?;
        let request = PageRequest::new(format!("{BASE_URL}/{search_type}"))
            .param("search_for", term)
            .param("published_since", PUBLISHED_SINCE)
            .param("order_direction", "asc")
            .param("page_size", PAGE_SIZE)
            .headers(&self.headers);
        Ok(Endpoint::new(request, CursorScheme::page("page", 1))
            .echo("publish_query", PUBLISHED_SINCE))
    }

    fn metadata(&self) -> Option<&dyn MetadataSource> {
        Some(self)
    }
}

impl MetadataSource for FigshareAdapter {
    fn derive_refs(&self, query: &Query, table: &ResultTable) -> CollectResult<Vec<MetadataRef>> {
        let (_, search_type) = expect_term_type(self.name(), query)?;
        let refs = object_ids(table, ID_COLUMN)?
            .into_iter()
            .map(|id| {
                let request =
                    PageRequest::new(format!("{BASE_URL}/{search_type}/{id}")).headers(&self.headers);
                MetadataRef::single(id, request)
            })
            .collect();
        Ok(refs)
    }

    fn join_key(&self) -> JoinKey {
        JoinKey::on(ID_COLUMN)
    }
}
