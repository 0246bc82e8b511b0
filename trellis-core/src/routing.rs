// Routing of requests to views

use crate::coerce::coerce;
use crate::config::Settings;
use crate::context::{HandlerId, RequestContext};
use crate::traits::DataAccess;
use crate::value::TypeTag;
use crate::{Args, Error, HttpRequest, HttpResponse, View};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Converter applied to one path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Int,
    Uuid,
    Str,
}

impl PathKind {
    fn from_target(target: &TypeTag) -> Option<Self> {
        match target {
            TypeTag::Int => Some(PathKind::Int),
            TypeTag::Uuid => Some(PathKind::Uuid),
            TypeTag::Str => Some(PathKind::Str),
            _ => None,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "int" => Some(PathKind::Int),
            "uuid" => Some(PathKind::Uuid),
            "str" => Some(PathKind::Str),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PathKind::Int => "int",
            PathKind::Uuid => "uuid",
            PathKind::Str => "str",
        }
    }

    fn accepts(&self, segment: &str) -> bool {
        match self {
            PathKind::Int => !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()),
            PathKind::Uuid => Uuid::parse_str(segment).is_ok(),
            PathKind::Str => !segment.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param { name: String, kind: PathKind },
}

/// A parsed URL pattern such as `contacts/<int:id>/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, Error> {
        let mut segments = Vec::new();
        for part in source.split('/').filter(|s| !s.is_empty()) {
            let segment = match part.strip_prefix('<').and_then(|p| p.strip_suffix('>')) {
                Some(spec) => {
                    let (kind, name) = match spec.split_once(':') {
                        Some((kind, name)) => (
                            PathKind::parse(kind).ok_or_else(|| {
                                Error::InvalidSignature(format!("unknown path converter '{}'", kind))
                            })?,
                            name,
                        ),
                        None => (PathKind::Str, spec),
                    };
                    Segment::Param {
                        name: name.to_string(),
                        kind,
                    }
                }
                None => Segment::Static(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match a request path, returning the raw path parameters
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(s) if s == part => {}
                Segment::Static(_) => return None,
                Segment::Param { name, kind } => {
                    if !kind.accepts(part) {
                        return None;
                    }
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }

    /// Build a URL from this pattern
    pub fn reverse(&self, args: &[(&str, &str)]) -> Result<String, Error> {
        let mut url = String::from("/");
        for segment in &self.segments {
            match segment {
                Segment::Static(s) => url.push_str(s),
                Segment::Param { name, kind } => {
                    let value = args
                        .iter()
                        .find(|(k, _)| k == name)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| {
                            Error::InvalidArguments(format!("missing path argument '{}'", name))
                        })?;
                    if !kind.accepts(value) || value.contains('/') {
                        return Err(Error::InvalidArguments(format!(
                            "'{}' is not a valid {} for path argument '{}'",
                            value,
                            kind.as_str(),
                            name
                        )));
                    }
                    url.push_str(value);
                }
            }
            url.push('/');
        }
        if !self.source.ends_with('/') && url.len() > 1 {
            url.pop();
        }
        Ok(url)
    }
}

/// `<module-path-with-dashes>-<fn>`, or just the function name
pub fn route_name(id: &HandlerId, include_module: bool) -> String {
    match id.module_path() {
        Some(module) if include_module => format!("{}-{}", module.replace("::", "-"), id.fn_name()),
        _ => id.fn_name().to_string(),
    }
}

/// Path segments for a view's path inputs, e.g. `<int:id>/<str:slug>/`
pub fn path_params_pattern(view: &View) -> Result<String, Error> {
    let mut pattern = String::new();
    for (name, target) in view.signature().path_inputs() {
        let kind = PathKind::from_target(target).ok_or_else(|| {
            Error::InvalidSignature(format!("can not handle type {} in a URL path", target))
        })?;
        pattern.push_str(&format!("<{}:{}>/", kind.as_str(), name));
    }
    Ok(pattern)
}

/// Registration options for [`Router::add_with`]
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    /// Explicit URL pattern; an empty string means path parameters only
    pub url: Option<String>,
    pub name: Option<String>,
    pub exclude_module_name: bool,
}

/// A registered view
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub pattern: Pattern,
    pub view: View,
}

/// Routes requests to views and builds URLs back to them
pub struct Router {
    routes: Vec<Route>,
    settings: Arc<Settings>,
    data: Option<Arc<dyn DataAccess>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
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

    /// Register `view` under `<fn_name>/<path params>`
    pub fn add(&mut self, view: View) -> Result<&mut Self, Error> {
        self.add_with(view, RouteOptions::default())
    }

    pub fn add_with(&mut self, view: View, options: RouteOptions) -> Result<&mut Self, Error> {
        let params = path_params_pattern(&view)?;
        let url = match options.url {
            Some(url) if url.is_empty() => params,
            Some(url) => url,
            None => format!("{}/{}", view.id().fn_name(), params),
        };
        let name = options
            .name
            .unwrap_or_else(|| route_name(view.id(), !options.exclude_module_name));

        if self.routes.iter().any(|r| r.name == name) {
            return Err(Error::InvalidSignature(format!("duplicate route name '{}'", name)));
        }

        tracing::debug!(route = %name, pattern = %url, view = %view.id(), "Registered route");
        self.routes.push(Route {
            name,
            pattern: Pattern::parse(&url)?,
            view,
        });
        Ok(self)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route whose pattern matches `path`
    pub fn resolve(&self, path: &str) -> Option<(&Route, HashMap<String, String>)> {
        self.routes
            .iter()
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }

    /// Dispatch a request to the matching view
    pub fn handle(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let (route, params) = self
            .resolve(&request.path)
            .ok_or_else(|| Error::RouteNotFound(format!("{} {}", request.method, request.path)))?;

        let mut args = Args::new();
        for (name, target) in route.view.signature().path_inputs() {
            if let Some(raw) = params.get(name) {
                let value = coerce(std::slice::from_ref(raw), target, self.data.as_deref())?;
                args = args.with(name, value);
            }
        }

        tracing::debug!(route = %route.name, method = %request.method, path = %request.path, "Dispatching");
        request.path_params = params;
        request.resolved = Some(route.view.id().clone());

        let mut cx = RequestContext::new(request).with_settings(self.settings.clone());
        if let Some(data) = &self.data {
            cx = cx.with_data_access(data.clone());
        }
        route.view.handle_in(cx, args)
    }

    /// URL of the route named `name`
    pub fn reverse(&self, name: &str, args: &[(&str, &str)]) -> Result<String, Error> {
        let route = self
            .routes
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::ReverseNotFound(name.to_string()))?;
        route.pattern.reverse(args)
    }

    /// URL of the route serving `view`
    pub fn reverse_view(&self, view: &View, args: &[(&str, &str)]) -> Result<String, Error> {
        let route = self
            .routes
            .iter()
            .find(|r| r.view.id() == view.id())
            .ok_or_else(|| Error::ReverseNotFound(view.id().to_string()))?;
        route.pattern.reverse(args)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
