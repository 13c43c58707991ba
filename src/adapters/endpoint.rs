//! Declarative description of one paginated endpoint: base request, cursor scheme, unwrap path.

use serde_json::Value;

use crate::Record;
use crate::engine::tools::{records_at, value_at_path};

/// One GET: URL, query parameters and headers, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl PageRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set_param(name, value);
        self
    }

    pub fn headers(mut self, headers: &[(String, String)]) -> Self {
        self.headers.extend(headers.iter().cloned());
        self
    }

    /// Set `name`, replacing an existing value in place.
    pub fn set_param(&mut self, name: impl Into<String>, value: impl ToString) {
        let name = name.into();
        let value = value.to_string();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(param) => param.1 = value,
            None => self.params.push((name, value)),
        }
    }

    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Position in a paginated listing. `page_number` is the provenance value tagged on rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageCursor {
    Page(u64),
    Offset { offset: u64, index: u64 },
    Token { token: Option<String>, index: u64 },
}

impl PageCursor {
    pub fn page_number(&self) -> u64 {
        match self {
            PageCursor::Page(page) => *page,
            PageCursor::Offset { index, .. } | PageCursor::Token { index, .. } => *index,
        }
    }
}

/// How an endpoint paginates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CursorScheme {
    /// Page-number parameter, starting at `start` and incremented by one.
    Page { param: String, start: u64 },
    /// Offset parameter starting at 0 and advanced by `page_size`.
    Offset { param: String, page_size: u64 },
    /// Continuation token read from `next_path` in each body; no token means no next page.
    Token { param: String, next_path: Vec<String> },
}

impl CursorScheme {
    pub fn page(param: impl Into<String>, start: u64) -> Self {
        CursorScheme::Page {
            param: param.into(),
            start,
        }
    }

    pub fn offset(param: impl Into<String>, page_size: u64) -> Self {
        CursorScheme::Offset {
            param: param.into(),
            page_size,
        }
    }

    pub fn token(param: impl Into<String>, next_path: &[&str]) -> Self {
        CursorScheme::Token {
            param: param.into(),
            next_path: next_path.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn first(&self) -> PageCursor {
        match self {
            CursorScheme::Page { start, .. } => PageCursor::Page(*start),
            CursorScheme::Offset { .. } => PageCursor::Offset {
                offset: 0,
                index: 1,
            },
            CursorScheme::Token { .. } => PageCursor::Token {
                token: None,
                index: 1,
            },
        }
    }

    /// Parameter name and value the cursor contributes to a request, if any.
    fn param_for(&self, cursor: &PageCursor) -> Option<(&str, String)> {
        match (self, cursor) {
            (CursorScheme::Page { param, .. }, PageCursor::Page(page)) => {
                Some((param.as_str(), page.to_string()))
            }
            (CursorScheme::Offset { param, .. }, PageCursor::Offset { offset, .. }) => {
                Some((param.as_str(), offset.to_string()))
            }
            (
                CursorScheme::Token { param, .. },
                PageCursor::Token {
                    token: Some(token), ..
                },
            ) => Some((param.as_str(), token.clone())),
            _ => None,
        }
    }

    fn advance(&self, cursor: &PageCursor, body: &Value) -> Option<PageCursor> {
        match (self, cursor) {
            (CursorScheme::Page { .. }, PageCursor::Page(page)) => Some(PageCursor::Page(page + 1)),
            (CursorScheme::Offset { page_size, .. }, PageCursor::Offset { offset, index }) => {
                Some(PageCursor::Offset {
                    offset: offset + page_size,
                    index: index + 1,
                })
            }
            (CursorScheme::Token { next_path, .. }, PageCursor::Token { index, .. }) => {
                value_at_path(body, next_path)
                    .and_then(Value::as_str)
                    .filter(|token| !token.is_empty())
                    .map(|token| PageCursor::Token {
                        token: Some(token.to_string()),
                        index: index + 1,
                    })
            }
            _ => None,
        }
    }
}

/// Records unwrapped from one response plus the cursor for the next request, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub next: Option<PageCursor>,
}

/// Where the cursor parameter goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParamPlacement {
    /// `?page=2`
    #[default]
    Query,
    /// `/offset/200` appended to the URL path.
    Path,
}

/// Computes a column from the record it is added to.
pub type DeriveFn = fn(&Record) -> Value;

/// A paginated endpoint with the query (term/type) already baked into `request`.
#[derive(Clone, Debug)]
pub struct Endpoint {
    pub request: PageRequest,
    pub cursor: CursorScheme,
    pub placement: ParamPlacement,
    /// Object keys leading to the record list (`["data", "items"]`). Empty means the body itself.
    pub unwrap_path: Vec<String>,
    /// Columns appended to every row (parent query echo).
    pub echo: Vec<(String, Value)>,
    /// Columns computed per row from the row itself.
    pub derived: Vec<(String, DeriveFn)>,
    /// Statuses the API answers with once the listing is exhausted. Treated as an empty page.
    pub end_statuses: Vec<u16>,
}

impl Endpoint {
    pub fn new(request: PageRequest, cursor: CursorScheme) -> Self {
        Self {
            request,
            cursor,
            placement: ParamPlacement::Query,
            unwrap_path: Vec::new(),
            echo: Vec::new(),
            derived: Vec::new(),
            end_statuses: Vec::new(),
        }
    }

    pub fn cursor_in_path(mut self) -> Self {
        self.placement = ParamPlacement::Path;
        self
    }

    pub fn unwrap(mut self, path: &[&str]) -> Self {
        self.unwrap_path = path.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn echo(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.echo.push((column.into(), value.into()));
        self
    }

    pub fn derive(mut self, column: impl Into<String>, f: DeriveFn) -> Self {
        self.derived.push((column.into(), f));
        self
    }

    pub fn end_on_status(mut self, status: u16) -> Self {
        self.end_statuses.push(status);
        self
    }

    pub fn ends_on(&self, status: u16) -> bool {
        self.end_statuses.contains(&status)
    }

    pub fn first_cursor(&self) -> PageCursor {
        self.cursor.first()
    }

    /// The request for `cursor`: base request with the cursor parameter set.
    pub fn request_for(&self, cursor: &PageCursor) -> PageRequest {
        let mut request = self.request.clone();
        if let Some((name, value)) = self.cursor.param_for(cursor) {
            match self.placement {
                ParamPlacement::Query => request.set_param(name, value),
                ParamPlacement::Path => {
                    request.url = format!("{}/{name}/{value}", request.url.trim_end_matches('/'))
                }
            }
        }
        request
    }

    pub fn parse(&self, cursor: &PageCursor, body: &Value) -> Page {
        let mut records = records_at(body, &self.unwrap_path);
        for record in &mut records {
            for (column, f) in &self.derived {
                let value = f(record);
                record.insert(column.clone(), value);
            }
        }
        Page {
            records,
            next: self.cursor.advance(cursor, body),
        }
    }
}
