//! Views: handlers wrapped with argument binding, call-stack tracking and
//! optional element wrapping.
//!
//! Views call each other directly through [`View::call`], passing the same
//! [`RequestContext`]. Only the outermost invocation finalizes the reply:
//! it runs the registered response hooks and appends queued out-of-band
//! fragments exactly once.
//!
//! ```
//! use trellis_core::prelude::*;
//!
//! let greet = View::builder("pages::greet")
//!     .signature(Signature::new().param(Param::both("name").default("world")))
//!     .element()
//!     .build(|_cx, args| Ok(Reply::html(format!("Hello {}", args.get::<String>("name")?))))
//!     .unwrap();
//!
//! let response = greet.handle(HttpRequest::new(HttpMethod::GET, "/?name=Ada")).unwrap();
//! assert_eq!(
//!     response.body_str(),
//!     r#"<div id="greet" hx-target="this" hx-swap="outerHTML">Hello Ada</div>"#
//! );
//! ```

use crate::binding::{bind, Args, Bound};
use crate::config::Settings;
use crate::context::{HandlerId, RequestContext};
use crate::descriptor::{ParamDescriptor, Signature};
use crate::fragment::{wrap, ElementMeta};
use crate::{Error, HttpRequest, HttpResponse, Reply};
use std::fmt;
use std::sync::Arc;

/// A handler body: receives the bound arguments
pub type HandlerFn = Arc<dyn Fn(&mut RequestContext, Args) -> Result<Reply, Error> + Send + Sync>;

/// Around-advice applied to a view's bound handler
pub type Decorator = Arc<dyn Fn(HandlerFn) -> HandlerFn + Send + Sync>;

#[derive(Clone)]
pub struct View {
    id: HandlerId,
    signature: Arc<Signature>,
    descriptors: Arc<[ParamDescriptor]>,
    element: Option<ElementMeta>,
    handler: HandlerFn,
}

impl View {
    pub fn builder(id: impl Into<HandlerId>) -> ViewBuilder {
        ViewBuilder::new(id.into())
    }

    pub fn id(&self) -> &HandlerId {
        &self.id
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn descriptors(&self) -> &[ParamDescriptor] {
        &self.descriptors
    }

    pub fn element(&self) -> Option<&ElementMeta> {
        self.element.as_ref()
    }

    /// Invoke this view within an existing request.
    ///
    /// Pushes a call frame, binds and runs the handler, wraps the reply when
    /// the view is an element, then pops the frame whether or not the
    /// handler failed.
    pub fn call(&self, cx: &mut RequestContext, args: Args) -> Result<Reply, Error> {
        let depth = cx.enter(&self.id);
        let result = (self.handler)(cx, args).map(|reply| match &self.element {
            Some(meta) => wrap(reply, meta),
            None => reply,
        });
        if let Err(e) = &result {
            tracing::debug!(view = %self.id, depth, error = %e, "View failed");
        }

        if cx.exit() {
            cx.finish(result)
        } else {
            result
        }
    }

    /// Serve `request` with this view as the resolved target
    pub fn handle(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        self.handle_in(RequestContext::new(request), Args::new())
    }

    /// Serve a request from a prepared context
    pub fn handle_in(&self, mut cx: RequestContext, args: Args) -> Result<HttpResponse, Error> {
        if cx.request().resolved.is_none() {
            cx.request_mut().resolved = Some(self.id.clone());
        }
        let reply = self.call(&mut cx, args)?;
        Ok(reply.into_response())
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("descriptors", &self.descriptors)
            .field("element", &self.element)
            .finish()
    }
}

/// Container requested through [`ViewBuilder::element`] or
/// [`ViewBuilder::element_with`]
enum ElementChoice {
    Configured,
    Explicit(ElementMeta),
}

pub struct ViewBuilder {
    id: HandlerId,
    signature: Signature,
    element: Option<ElementChoice>,
    element_defaults: ElementMeta,
    consume_by_default: Option<bool>,
    decorators: Vec<Decorator>,
    handle_args: bool,
}

impl ViewBuilder {
    fn new(id: HandlerId) -> Self {
        Self {
            id,
            signature: Signature::new(),
            element: None,
            element_defaults: ElementMeta::default(),
            consume_by_default: None,
            decorators: Vec::new(),
            handle_args: true,
        }
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Wrap the output in the configured default container, identified by
    /// the handler's function name
    pub fn element(mut self) -> Self {
        self.element = Some(ElementChoice::Configured);
        self
    }

    /// Wrap the output in exactly this container; configured defaults do
    /// not apply to it
    pub fn element_with(mut self, meta: ElementMeta) -> Self {
        self.element = Some(ElementChoice::Explicit(meta));
        self
    }

    /// Take the default container and default parameter consumption from
    /// `settings`. May be called before or after the other builder methods.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.element_defaults = ElementMeta::from_settings(settings);
        self.consume_by_default = Some(settings.consume_by_default);
        self
    }

    /// Add around-advice; the first decorator added is the outermost
    pub fn decorate<F>(mut self, decorator: F) -> Self
    where
        F: Fn(HandlerFn) -> HandlerFn + Send + Sync + 'static,
    {
        self.decorators.push(Arc::new(decorator));
        self
    }

    /// Pass caller arguments straight to the handler without binding
    pub fn handle_args(mut self, enabled: bool) -> Self {
        self.handle_args = enabled;
        self
    }

    pub fn build<F>(self, handler: F) -> Result<View, Error>
    where
        F: Fn(&mut RequestContext, Args) -> Result<Reply, Error> + Send + Sync + 'static,
    {
        let signature = match self.consume_by_default {
            Some(consume) => self.signature.or_consume_by_default(consume),
            None => self.signature,
        };
        let descriptors = signature.extract()?;
        let defaults = self.element_defaults;
        let element = self.element.map(|choice| {
            let mut meta = match choice {
                ElementChoice::Configured => defaults,
                ElementChoice::Explicit(meta) => meta,
            };
            if meta.element_id.is_none() {
                meta.element_id = Some(self.id.fn_name().to_string());
            }
            meta
        });

        let mut bound: HandlerFn = if self.handle_args {
            let descriptors = descriptors.clone();
            Arc::new(move |cx: &mut RequestContext, args: Args| {
                match bind(&descriptors, args, cx)? {
                    Bound::Args(args) => handler(cx, args),
                    Bound::Replace(reply) => Ok(reply),
                }
            }) as HandlerFn
        } else {
            Arc::new(handler) as HandlerFn
        };
        for decorator in self.decorators.iter().rev() {
            bound = decorator(bound);
        }

        tracing::debug!(
            view = %self.id,
            inputs = descriptors.len(),
            element = element.is_some(),
            "Built view"
        );

        Ok(View {
            id: self.id,
            signature: Arc::new(signature),
            descriptors,
            element,
            handler: bound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Param;
    use crate::HttpMethod;
    use parking_lot::Mutex;

    fn get(path: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::GET, path)
    }

    #[test]
    fn test_element_id_defaults_to_fn_name() {
        let view = View::builder("app::views::counter")
            .element()
            .build(|_, _| Ok(Reply::html("0")))
            .unwrap();
        assert_eq!(view.element().unwrap().element_id.as_deref(), Some("counter"));

        let body = view.handle(get("/")).unwrap().body_str();
        assert_eq!(body, r#"<div id="counter" hx-target="this" hx-swap="outerHTML">0</div>"#);
    }

    #[test]
    fn test_stack_unwinds_on_error() {
        let failing = View::builder("v::failing")
            .signature(Signature::new().param(Param::both("required")))
            .build(|_, _| Ok(Reply::html("unreachable")))
            .unwrap();

        let mut cx = RequestContext::new(get("/"));
        assert!(failing.call(&mut cx, Args::new()).is_err());
        assert_eq!(cx.depth(), 0);
    }

    #[test]
    fn test_decorators_outermost_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (order.clone(), order.clone());
        let inner = order.clone();

        let view = View::builder("v::decorated")
            .decorate(move |next: HandlerFn| {
                let a = a.clone();
                Arc::new(move |cx: &mut RequestContext, args: Args| {
                    a.lock().push("a");
                    next(cx, args)
                }) as HandlerFn
            })
            .decorate(move |next: HandlerFn| {
                let b = b.clone();
                Arc::new(move |cx: &mut RequestContext, args: Args| {
                    b.lock().push("b");
                    next(cx, args)
                }) as HandlerFn
            })
            .build(move |_, _| {
                inner.lock().push("handler");
                Ok(Reply::html(""))
            })
            .unwrap();

        view.handle(get("/")).unwrap();
        assert_eq!(*order.lock(), vec!["a", "b", "handler"]);
    }

    #[test]
    fn test_handle_args_disabled_passes_through() {
        let view = View::builder("v::raw")
            .signature(Signature::new().param(Param::both("x")))
            .handle_args(false)
            .build(|_, args| Ok(Reply::html(format!("{}", args.len()))))
            .unwrap();
        assert_eq!(view.handle(get("/?x=1")).unwrap().body_str(), "0");
    }

    #[test]
    fn test_settings_apply_element_defaults() {
        let settings = Settings::from_toml_str("[element]\ntag = \"span\"").unwrap();
        let view = View::builder("v::badge")
            .element()
            .settings(&settings)
            .build(|_, _| Ok(Reply::html("1")))
            .unwrap();
        let meta = view.element().unwrap();
        assert_eq!(meta.tag, "span");
        assert_eq!(meta.element_id.as_deref(), Some("badge"));

        // Order does not matter
        let view = View::builder("v::badge")
            .settings(&settings)
            .element()
            .build(|_, _| Ok(Reply::html("1")))
            .unwrap();
        assert_eq!(view.element().unwrap().tag, "span");
    }

    #[test]
    fn test_explicit_element_wins_over_settings() {
        let settings = Settings::from_toml_str("[element]\ntag = \"span\"").unwrap();
        let explicit = ElementMeta::default().tag("tr").hx_target("closest table");
        for view in [
            View::builder("v::row")
                .element_with(explicit.clone())
                .settings(&settings),
            View::builder("v::row")
                .settings(&settings)
                .element_with(explicit.clone()),
        ] {
            let view = view.build(|_, _| Ok(Reply::html("1"))).unwrap();
            let meta = view.element().unwrap();
            assert_eq!(meta.tag, "tr");
            assert_eq!(meta.hx_target, "closest table");
            assert_eq!(meta.element_id.as_deref(), Some("row"));
        }
    }

    #[test]
    fn test_settings_consumption_survives_later_signature() {
        let settings = Settings::from_toml_str("consume_by_default = false").unwrap();
        let view = View::builder("v::list")
            .settings(&settings)
            .signature(Signature::new().param(Param::both("q")))
            .build(|_, _| Ok(Reply::html("")))
            .unwrap();
        assert!(!view.descriptors()[0].consumes());
    }
}
