//! Parameter descriptors and the descriptor extractor.
//!
//! A view declares its inputs once, as a [`Signature`]. [`Signature::extract`]
//! turns that declaration into an ordered, immutable list of
//! [`ParamDescriptor`]s which is then shared by every invocation of the view.

use crate::form::FormFactory;
use crate::value::{TypeTag, Value};
use crate::{Error, HttpMethod};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Parameter store(s) a descriptor reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    /// Query string parameters
    Query,
    /// Submitted body parameters
    Body,
    /// Both; body values take priority
    Both,
}

impl ParamSource {
    pub fn reads_query(&self) -> bool {
        matches!(self, ParamSource::Query | ParamSource::Both)
    }

    pub fn reads_body(&self) -> bool {
        matches!(self, ParamSource::Body | ParamSource::Both)
    }
}

/// HTTP methods for which a descriptor is eligible
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MethodSet {
    #[default]
    All,
    Only(Vec<HttpMethod>),
}

impl MethodSet {
    pub fn allows(&self, method: HttpMethod) -> bool {
        match self {
            MethodSet::All => true,
            MethodSet::Only(methods) => methods.contains(&method),
        }
    }
}

/// How a descriptor obtains its value
#[derive(Clone)]
pub enum Binding {
    /// Looked up in the request's parameter stores
    Request {
        source: ParamSource,
        lookup: String,
        consume: bool,
    },
    /// Built from the submitted body by a form factory
    Form(FormFactory),
    /// Never looked up; must be supplied by the caller or fall back to the
    /// default
    Explicit,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Request {
                source,
                lookup,
                consume,
            } => f
                .debug_struct("Request")
                .field("source", source)
                .field("lookup", lookup)
                .field("consume", consume)
                .finish(),
            Binding::Form(_) => write!(f, "Form"),
            Binding::Explicit => write!(f, "Explicit"),
        }
    }
}

/// Immutable specification of one handler input
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub name: String,
    pub target: TypeTag,
    pub binding: Binding,
    pub methods: MethodSet,
    pub default: Option<Value>,
}

impl ParamDescriptor {
    pub fn source(&self) -> Option<ParamSource> {
        match &self.binding {
            Binding::Request { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn consumes(&self) -> bool {
        matches!(self.binding, Binding::Request { consume: true, .. })
    }
}

/// Builder for a request-bound input, mirroring `param()`, `param_get()`
/// and `param_post()` declarations
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    lookup: Option<String>,
    source: ParamSource,
    target: Option<TypeTag>,
    default: Option<Value>,
    consume: Option<bool>,
    methods: MethodSet,
}

impl Param {
    fn new(name: impl Into<String>, source: ParamSource) -> Self {
        Self {
            name: name.into(),
            lookup: None,
            source,
            target: None,
            default: None,
            consume: None,
            methods: MethodSet::All,
        }
    }

    /// Read from body parameters, falling back to the query string
    pub fn both(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Both)
    }

    /// Read from query parameters only
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Query)
    }

    /// Read from submitted body parameters only
    pub fn body(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Body)
    }

    pub fn typed(mut self, target: TypeTag) -> Self {
        self.target = Some(target);
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn consume(mut self, consume: bool) -> Self {
        self.consume = Some(consume);
        self
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        self.methods = MethodSet::Only(methods.into_iter().collect());
        self
    }

    /// Parameter name in the request, when it differs from the input name
    pub fn lookup(mut self, key: impl Into<String>) -> Self {
        self.lookup = Some(key.into());
        self
    }

    fn into_descriptor(self, consume_by_default: bool) -> ParamDescriptor {
        let target = resolve_target(self.target, self.default.as_ref());
        ParamDescriptor {
            binding: Binding::Request {
                source: self.source,
                lookup: self.lookup.unwrap_or_else(|| self.name.clone()),
                consume: self.consume.unwrap_or(consume_by_default),
            },
            name: self.name,
            target,
            methods: self.methods,
            default: self.default,
        }
    }
}

/// Declared type wins; otherwise the default's runtime type; otherwise str
fn resolve_target(declared: Option<TypeTag>, default: Option<&Value>) -> TypeTag {
    declared
        .or_else(|| default.and_then(Value::type_tag))
        .unwrap_or(TypeTag::Str)
}

/// What to do with plain (undecorated) inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoParam {
    /// Plain inputs must be supplied by the caller
    #[default]
    Off,
    Both,
    Query,
    Body,
}

/// One declared handler input
#[derive(Clone)]
pub enum Input {
    Param(Param),
    Plain {
        name: String,
        target: Option<TypeTag>,
        default: Option<Value>,
    },
    Form {
        name: String,
        factory: FormFactory,
        optional: bool,
    },
    /// Supplied by the router from the URL path
    Path { name: String, target: TypeTag },
}

impl Input {
    pub fn name(&self) -> &str {
        match self {
            Input::Param(p) => &p.name,
            Input::Plain { name, .. } | Input::Form { name, .. } | Input::Path { name, .. } => name,
        }
    }
}

/// Ordered declaration of a handler's inputs
#[derive(Clone, Default)]
pub struct Signature {
    inputs: Vec<Input>,
    auto_param: AutoParam,
    consume_by_default: Option<bool>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, param: Param) -> Self {
        self.inputs.push(Input::Param(param));
        self
    }

    /// An undecorated input; how it is bound depends on [`AutoParam`]
    pub fn plain(mut self, name: impl Into<String>, target: Option<TypeTag>) -> Self {
        self.inputs.push(Input::Plain {
            name: name.into(),
            target,
            default: None,
        });
        self
    }

    pub fn plain_with_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.inputs.push(Input::Plain {
            name: name.into(),
            target: None,
            default: Some(default.into()),
        });
        self
    }

    pub fn form(mut self, name: impl Into<String>, factory: FormFactory) -> Self {
        self.inputs.push(Input::Form {
            name: name.into(),
            factory,
            optional: false,
        });
        self
    }

    /// A form input that binds as absent when the request carries no form data
    pub fn optional_form(mut self, name: impl Into<String>, factory: FormFactory) -> Self {
        self.inputs.push(Input::Form {
            name: name.into(),
            factory,
            optional: true,
        });
        self
    }

    pub fn path(mut self, name: impl Into<String>, target: TypeTag) -> Self {
        self.inputs.push(Input::Path {
            name: name.into(),
            target,
        });
        self
    }

    pub fn auto_param(mut self, auto_param: AutoParam) -> Self {
        self.auto_param = auto_param;
        self
    }

    pub fn consume_by_default(mut self, consume: bool) -> Self {
        self.consume_by_default = Some(consume);
        self
    }

    /// Use `consume` unless the signature already chose
    pub(crate) fn or_consume_by_default(mut self, consume: bool) -> Self {
        self.consume_by_default.get_or_insert(consume);
        self
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Inputs filled from the URL path, in declaration order
    pub fn path_inputs(&self) -> impl Iterator<Item = (&str, &TypeTag)> {
        self.inputs.iter().filter_map(|input| match input {
            Input::Path { name, target } => Some((name.as_str(), target)),
            _ => None,
        })
    }

    /// Build the descriptor list for this signature.
    ///
    /// Called once when the view is built. Rejects duplicate input names and
    /// more than one form input.
    pub fn extract(&self) -> Result<Arc<[ParamDescriptor]>, Error> {
        let consume_by_default = self.consume_by_default.unwrap_or(true);
        let mut seen = HashSet::new();
        let mut found_form = false;
        let mut descriptors = Vec::with_capacity(self.inputs.len());

        for input in &self.inputs {
            if !seen.insert(input.name().to_string()) {
                return Err(Error::InvalidSignature(format!(
                    "duplicate input '{}'",
                    input.name()
                )));
            }

            let descriptor = match input.clone() {
                Input::Param(param) => param.into_descriptor(consume_by_default),
                Input::Plain {
                    name,
                    target,
                    default,
                } => {
                    let param = match self.auto_param {
                        AutoParam::Off => None,
                        AutoParam::Both => Some(Param::both(name.clone())),
                        AutoParam::Query => Some(Param::query(name.clone())),
                        AutoParam::Body => Some(Param::body(name.clone())),
                    };
                    match param {
                        Some(mut param) => {
                            param.target = target;
                            param.default = default;
                            param.into_descriptor(consume_by_default)
                        }
                        None => ParamDescriptor {
                            target: resolve_target(target, default.as_ref()),
                            name,
                            binding: Binding::Explicit,
                            methods: MethodSet::All,
                            default,
                        },
                    }
                }
                Input::Form {
                    name,
                    factory,
                    optional,
                } => {
                    if found_form {
                        return Err(Error::InvalidSignature(
                            "You can only have one Form argument in a view function.".to_string(),
                        ));
                    }
                    found_form = true;
                    ParamDescriptor {
                        name,
                        target: if optional {
                            TypeTag::optional(TypeTag::Form)
                        } else {
                            TypeTag::Form
                        },
                        binding: Binding::Form(factory),
                        methods: MethodSet::All,
                        default: None,
                    }
                }
                Input::Path { name, target } => ParamDescriptor {
                    name,
                    target,
                    binding: Binding::Explicit,
                    methods: MethodSet::All,
                    default: None,
                },
            };

            tracing::debug!(
                input = %descriptor.name,
                target = %descriptor.target,
                binding = ?descriptor.binding,
                "Extracted parameter descriptor"
            );
            descriptors.push(descriptor);
        }

        Ok(descriptors.into())
    }
}
