//! Per-request state: the call stack of active views, the response hook
//! chain and the queue of pending out-of-band fragments.
//!
//! A [`RequestContext`] is created for each incoming request, threaded by
//! `&mut` through every nested view invocation and dropped when the request
//! completes. It is never shared between requests.

use crate::config::Settings;
use crate::hooks::{HookChain, ResponseHook};
use crate::oob::{self, OobEntry};
use crate::traits::DataAccess;
use crate::{Error, HttpMethod, HttpRequest, Reply};
use std::fmt;
use std::sync::Arc;

/// Stable identity of a view, e.g. `contacts::list_element`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(Arc<str>);

impl HandlerId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, i.e. the function name
    pub fn fn_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    /// Everything before the function name, if any
    pub fn module_path(&self) -> Option<&str> {
        self.0.rsplit_once("::").map(|(module, _)| module)
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandlerId {
    fn from(name: &str) -> Self {
        HandlerId::new(name)
    }
}

/// One active view invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallFrame {
    pub handler: HandlerId,
    pub depth: usize,
}

/// LIFO stack of active view invocations for one request
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame and return its depth (1 for the outermost view)
    pub fn push(&mut self, handler: HandlerId) -> usize {
        let depth = self.frames.len() + 1;
        tracing::trace!(handler = %handler, depth, "Entering view");
        self.frames.push(CallFrame { handler, depth });
        depth
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        let frame = self.frames.pop();
        if let Some(frame) = &frame {
            tracing::trace!(handler = %frame.handler, depth = frame.depth, "Leaving view");
        }
        frame
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The innermost active frame
    pub fn current(&self) -> Result<&CallFrame, Error> {
        self.frames
            .last()
            .ok_or_else(|| Error::not_in_context("current view"))
    }

    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    /// True only when exactly one view is active and it is the one the
    /// router resolved for the request
    pub fn is_resolved_target(&self, resolved: Option<&HandlerId>) -> Result<bool, Error> {
        if self.frames.is_empty() {
            return Err(Error::not_in_context("is_resolved_target"));
        }
        if self.frames.len() != 1 {
            return Ok(false);
        }
        Ok(resolved == Some(&self.frames[0].handler))
    }
}

/// Mutable state bag for one request
pub struct RequestContext {
    request: HttpRequest,
    stack: CallStack,
    hooks: HookChain,
    oob: Vec<OobEntry>,
    settings: Arc<Settings>,
    data: Option<Arc<dyn DataAccess>>,
}

impl RequestContext {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            stack: CallStack::new(),
            hooks: HookChain::new(),
            oob: Vec::new(),
            settings: Arc::new(Settings::default()),
            data: None,
        }
    }

    pub fn with_settings(mut self, settings: Arc<Settings>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_data_access(mut self, data: Arc<dyn DataAccess>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut HttpRequest {
        &mut self.request
    }

    pub fn into_request(self) -> HttpRequest {
        self.request
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn data_access(&self) -> Option<&dyn DataAccess> {
        self.data.as_deref()
    }

    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }

    fn require_active(&self, operation: &str) -> Result<(), Error> {
        if self.stack.is_empty() {
            return Err(Error::not_in_context(operation));
        }
        Ok(())
    }

    /// Whether the innermost active view is the router's resolved target
    pub fn is_resolved_target(&self) -> Result<bool, Error> {
        self.stack.is_resolved_target(self.request.resolved.as_ref())
    }

    /// Compare the request method, optionally only when the current view is
    /// the resolved target
    pub fn method_is(&self, method: HttpMethod, require_target: bool) -> Result<bool, Error> {
        if require_target && !self.is_resolved_target()? {
            return Ok(false);
        }
        Ok(self.request.method == method)
    }

    pub fn is_get(&self) -> Result<bool, Error> {
        self.method_is(HttpMethod::GET, false)
    }

    pub fn is_head(&self) -> Result<bool, Error> {
        self.method_is(HttpMethod::HEAD, false)
    }

    pub fn is_post(&self) -> Result<bool, Error> {
        self.method_is(HttpMethod::POST, true)
    }

    pub fn is_put(&self) -> Result<bool, Error> {
        self.method_is(HttpMethod::PUT, true)
    }

    pub fn is_patch(&self) -> Result<bool, Error> {
        self.method_is(HttpMethod::PATCH, true)
    }

    pub fn is_delete(&self) -> Result<bool, Error> {
        self.method_is(HttpMethod::DELETE, true)
    }

    /// Register a hook to run after the outermost view returns
    pub fn add_response_handler<F>(&mut self, hook: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Reply) -> Option<Reply> + Send + 'static,
    {
        self.require_active("add_response_handler")?;
        self.hooks.register(Box::new(hook) as ResponseHook);
        Ok(())
    }

    /// Queue `fragment` as an out-of-band swap using the configured mode
    pub fn swap_oob(&mut self, fragment: Reply) -> Result<(), Error> {
        let mode = self.settings.oob_swap.clone();
        self.swap_oob_with(fragment, &mode)
    }

    /// Queue `fragment` as an out-of-band swap with an explicit swap mode.
    ///
    /// The fragment is validated immediately; it is appended to the
    /// response once, after the outermost view returns.
    pub fn swap_oob_with(&mut self, fragment: Reply, swap_mode: &str) -> Result<(), Error> {
        self.require_active("swap_oob")?;
        let (response, pending) = fragment.into_parts();
        self.oob.extend(pending);
        let entry = oob::tag_fragment(&response.body_str(), swap_mode)?;
        tracing::debug!(id = %entry.id, swap = %entry.swap, "Queued out-of-band fragment");
        self.oob.push(entry);
        Ok(())
    }

    /// Render a nested view's reply into markup for composition.
    ///
    /// Out-of-band entries the reply still carries are moved to the request
    /// queue so they reach the final response exactly once.
    pub fn embed(&mut self, reply: Reply) -> String {
        let (response, pending) = reply.into_parts();
        self.oob.extend(pending);
        response.body_str()
    }

    pub fn pending_oob(&self) -> &[OobEntry] {
        &self.oob
    }

    pub(crate) fn enter(&mut self, handler: &HandlerId) -> usize {
        self.stack.push(handler.clone())
    }

    /// Pop the innermost frame; true when the stack is now empty
    pub(crate) fn exit(&mut self) -> bool {
        self.stack.pop();
        self.stack.is_empty()
    }

    /// Finalize the outermost view's result: drain hooks, then append the
    /// queued out-of-band fragments.
    pub(crate) fn finish(&mut self, result: Result<Reply, Error>) -> Result<Reply, Error> {
        let queued = std::mem::take(&mut self.oob);
        let mut reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                self.hooks.clear();
                return Err(e);
            }
        };

        reply = self.hooks.drain(reply);
        reply.queue_oob(queued);
        reply.flush_oob();
        Ok(reply)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("stack", &self.stack)
            .field("hooks", &self.hooks)
            .field("oob", &self.oob.len())
            .finish()
    }
}
