//! Harvard Dataverse: term × type queries over the search API, offset pagination.

use super::{Adapter, CursorScheme, Dimensions, Endpoint, PageRequest, expect_term_type};
use crate::{CollectResult, CredentialToken, Query};

const API_URL: &str = "https://dataverse.harvard.edu/api";
const PAGE_SIZE: u64 = 100;
const TYPE_OPTIONS: &[&str] = &["dataset", "file"];

#[derive(Debug, Default)]
pub struct DataverseAdapter {
    headers: Vec<(String, String)>,
}

impl DataverseAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Adapter for DataverseAdapter {
    fn name(&self) -> &str {
        "dataverse"
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
            .push(("X-Dataverse-key".into(), token.as_str().to_string()));
    }

    fn search_endpoint(&self, query: &Query) -> CollectResult<Endpoint> {
        let (term, search_type) = expect_term_type(self.name(), query)?;
        let request = PageRequest::new(format!("{API_URL}/search"))
            .param("q", term)
            .param("type", search_type)
            .param("per_page", PAGE_SIZE)
            .headers(&self.headers);
        Ok(
            Endpoint::new(request, CursorScheme::offset("start", PAGE_SIZE))
                .unwrap(&["data", "items"]),
        )
    }
}
