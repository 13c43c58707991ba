//! Zenodo: term queries over the records API. No metadata endpoint.

use super::{Adapter, CursorScheme, Dimensions, Endpoint, PageRequest, expect_term};
use crate::{CollectResult, CredentialToken, Query};

const BASE_URL: &str = "https://zenodo.org/api/records";
const PAGE_SIZE: u64 = 1000;

#[derive(Debug, Default)]
pub struct ZenodoAdapter {
    headers: Vec<(String, String)>,
}

impl ZenodoAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Adapter for ZenodoAdapter {
    fn name(&self) -> &str {
        "zenodo"
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
        let request = PageRequest::new(BASE_URL)
            .param("q", term)
            .param("size", PAGE_SIZE)
            .headers(&self.headers);
        Ok(Endpoint::new(request, CursorScheme::page("page", 1)).unwrap(&["hits", "hits"]))
    }
}
