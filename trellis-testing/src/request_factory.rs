// Test request construction

use trellis_core::{Error, HandlerId, HttpMethod, HttpRequest, QueryDict, RequestContext, Settings, View};
use serde::Serialize;
use std::sync::Arc;

/// Entry point for building test requests
#[derive(Debug, Clone, Default)]
pub struct RequestFactory {
    settings: Option<Arc<Settings>>,
}

impl RequestFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contexts built from this factory carry `settings`
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Some(Arc::new(settings)),
        }
    }

    pub fn get(&self, path: &str) -> TestRequestBuilder {
        self.request(HttpMethod::GET, path)
    }

    pub fn head(&self, path: &str) -> TestRequestBuilder {
        self.request(HttpMethod::HEAD, path)
    }

    pub fn post(&self, path: &str) -> TestRequestBuilder {
        self.request(HttpMethod::POST, path)
    }

    pub fn put(&self, path: &str) -> TestRequestBuilder {
        self.request(HttpMethod::PUT, path)
    }

    pub fn patch(&self, path: &str) -> TestRequestBuilder {
        self.request(HttpMethod::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> TestRequestBuilder {
        self.request(HttpMethod::DELETE, path)
    }

    pub fn request(&self, method: HttpMethod, path: &str) -> TestRequestBuilder {
        TestRequestBuilder {
            request: HttpRequest::new(method, path),
            settings: self.settings.clone(),
        }
    }
}

/// Builder for one test request
#[derive(Debug, Clone)]
pub struct TestRequestBuilder {
    request: HttpRequest,
    settings: Option<Arc<Settings>>,
}

impl TestRequestBuilder {
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.headers.insert(key.to_string(), value.to_string());
        self
    }

    /// Append a query string parameter
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.request.query.append(key, value);
        self
    }

    /// Append a URL-encoded body parameter
    pub fn form(mut self, key: &str, value: &str) -> Self {
        self.request.form.append(key, value);
        self.request.body = self.request.form.urlencode().into_bytes();
        if self.request.content_type() != Some("application/json") {
            self.request
                .headers
                .insert("Content-Type".to_string(), "application/x-www-form-urlencoded".to_string());
        }
        self
    }

    /// Replace the body parameters
    pub fn form_data(mut self, data: QueryDict) -> Self {
        self.request.body = data.urlencode().into_bytes();
        self.request.form = data;
        self.request
            .headers
            .insert("Content-Type".to_string(), "application/x-www-form-urlencoded".to_string());
        self
    }

    /// Set a JSON body
    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.request.body = serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
        self.request
            .headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Mark the request as routed to `id`
    pub fn resolved(mut self, id: impl Into<HandlerId>) -> Self {
        self.request.resolved = Some(id.into());
        self
    }

    /// Mark the request as routed to `view`
    pub fn resolved_to(self, view: &View) -> Self {
        let id = view.id().clone();
        self.resolved(id)
    }

    pub fn build(self) -> HttpRequest {
        self.request
    }

    /// A fresh request context for the built request
    pub fn context(self) -> RequestContext {
        let cx = RequestContext::new(self.request);
        match self.settings {
            Some(settings) => cx.with_settings(settings),
            None => cx,
        }
    }
}
