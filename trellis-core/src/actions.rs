//! Dispatch on named request parameters.
//!
//! A page with several buttons can give each one a `name`; the submitted
//! request then carries exactly one of those names. [`Actions`] picks the
//! callback registered under the name that was sent.

use crate::{Error, HttpMethod, QueryDict, RequestContext};

type ActionFn<T> = Box<dyn Fn(&str) -> Option<T> + Send + Sync>;

pub struct Actions<T> {
    actions: Vec<(String, ActionFn<T>)>,
    params: QueryDict,
    value: Option<T>,
}

impl<T> Actions<T> {
    /// Read parameters from the current request: the query string for a GET
    /// aimed at the current view, the body for a POST aimed at it
    pub fn new(cx: &RequestContext) -> Result<Self, Error> {
        let params = if cx.method_is(HttpMethod::GET, true)? {
            cx.request().query.clone()
        } else if cx.is_post()? {
            cx.request().form.clone()
        } else {
            QueryDict::new()
        };
        Ok(Self::from_params(params))
    }

    pub fn from_params(params: QueryDict) -> Self {
        Self {
            actions: Vec::new(),
            params,
            value: None,
        }
    }

    /// Register `action` under `name`; later registrations with the same name
    /// replace earlier ones
    pub fn add<F>(&mut self, name: impl Into<String>, action: F) -> &mut Self
    where
        F: Fn(&str) -> Option<T> + Send + Sync + 'static,
    {
        let name = name.into();
        self.actions.retain(|(n, _)| *n != name);
        self.actions.push((name, Box::new(action)));
        self
    }

    /// Run the first registered action whose name was submitted.
    ///
    /// True when an action ran and returned a value.
    pub fn matched(&mut self) -> bool {
        self.value = self.check();
        self.value.is_some()
    }

    fn check(&self) -> Option<T> {
        let (name, action) = self
            .actions
            .iter()
            .find(|(name, _)| self.params.contains(name))?;
        tracing::debug!(action = %name, "Matched action");
        action(self.params.get(name)?)
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn take_value(&mut self) -> Option<T> {
        self.value.take()
    }
}
