// HTTP request and response types

use crate::{Error, HandlerId, HttpMethod, QueryDict};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP request wrapper
///
/// `query` and `form` are the two mutable parameter stores the binding
/// engine reads from (and consumes from). `resolved` is the identity of the
/// view the router selected for this request, if any.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub path_params: HashMap<String, String>,
    pub query: QueryDict,
    pub form: QueryDict,
    pub resolved: Option<HandlerId>,
}

impl HttpRequest {
    /// Build a request from a path that may carry a query string.
    ///
    /// A query string that cannot be decoded leaves the query store empty;
    /// use [`HttpRequest::try_new`] to reject it instead.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        let path = path.into();
        match Self::try_new(method, &path) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "Ignoring malformed query string");
                let path = path.split_once('?').map_or(path.as_str(), |(p, _)| p);
                Self::with_query(method, path.to_string(), QueryDict::new())
            }
        }
    }

    /// Build a request, failing with `Error::BadRequest` when the query
    /// string cannot be decoded
    pub fn try_new(method: HttpMethod, path: &str) -> Result<Self, Error> {
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p, QueryDict::parse(q)?),
            None => (path, QueryDict::new()),
        };
        Ok(Self::with_query(method, path.to_string(), query))
    }

    fn with_query(method: HttpMethod, path: String, query: QueryDict) -> Self {
        Self {
            method,
            path,
            headers: HashMap::new(),
            body: Vec::new(),
            path_params: HashMap::new(),
            query,
            form: QueryDict::new(),
            resolved: None,
        }
    }

    /// Get a header value, ignoring ASCII case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Media type of the body, without parameters such as `charset`
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
    }

    pub fn is_json(&self) -> bool {
        self.content_type() == Some("application/json")
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Get a path parameter by name
    pub fn param(&self, name: &str) -> Option<&String> {
        self.path_params.get(name)
    }

    /// Populate the body parameter store from the raw body.
    ///
    /// Url-encoded bodies are decoded for every method (PUT and PATCH
    /// included); multipart bodies contribute their text fields.
    pub fn parse_body(&mut self) -> Result<(), Error> {
        match self.content_type() {
            Some("application/x-www-form-urlencoded") => {
                let parsed = QueryDict::parse_bytes(&self.body)?;
                self.form.merge(&parsed);
            }
            Some("multipart/form-data") => {
                let content_type = self.header("Content-Type").unwrap_or_default().to_string();
                let parser = crate::form::MultipartParser::from_content_type(&content_type)?;
                let fields = parser.parse(&self.body)?;
                let parsed = crate::form::MultipartParser::to_query_dict(fields);
                self.form.merge(&parsed);
            }
            _ => {}
        }
        Ok(())
    }
}

/// HTTP response wrapper
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub streaming: bool,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
            streaming: false,
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn no_content() -> Self {
        Self::new(204)
    }

    pub fn bad_request() -> Self {
        Self::new(400)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    /// `text/html` response with the given markup
    pub fn html(markup: impl Into<String>) -> Self {
        Self::ok()
            .content_type("text/html; charset=utf-8")
            .with_body(markup.into().into_bytes())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::ok()
            .content_type("text/plain; charset=utf-8")
            .with_body(text.into().into_bytes())
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, Error> {
        Self::ok().with_json(value)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn content_type(self, content_type: &str) -> Self {
        self.with_header("Content-Type", content_type)
    }

    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    /// Get a header value, ignoring ASCII case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the payload is HTML markup.
    ///
    /// A response without a content type is treated as HTML, since that is
    /// what view handlers produce unless told otherwise.
    pub fn is_html(&self) -> bool {
        self.header("Content-Type")
            .map(|ct| ct.starts_with("text/html"))
            .unwrap_or(true)
    }

    /// Body as text, replacing invalid UTF-8 sequences
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
