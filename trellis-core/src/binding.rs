//! The binding engine: turns a view's descriptors plus caller-supplied
//! arguments into the full argument set for one invocation.

use crate::coerce::coerce;
use crate::descriptor::{Binding, ParamDescriptor, ParamSource};
use crate::error::BindError;
use crate::form::{form_data, Form};
use crate::validation;
use crate::value::{FromValue, Value};
use crate::{Error, HttpRequest, Reply, RequestContext};
use std::any::Any;
use std::sync::Arc;

/// Arguments passed to a view, positionally or by name
#[derive(Debug, Clone, Default)]
pub struct Args {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: String, value: Value) {
        match self.named.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.named.push((name, value)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.named.iter().any(|(k, _)| k == name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.named.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.iter().map(|(k, _)| k.as_str())
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed access to a bound argument
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, Error> {
        let value = self
            .value(name)
            .ok_or_else(|| Error::InvalidArguments(format!("no argument named '{}'", name)))?;
        T::from_value(value).ok_or_else(|| Error::ArgumentType {
            name: name.to_string(),
            expected: T::expected(),
        })
    }

    /// The object a model argument resolved to
    pub fn model<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, Error> {
        match self.value(name) {
            Some(Value::Model(model)) => model.downcast::<T>().ok_or_else(|| Error::ArgumentType {
                name: name.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            }),
            Some(_) => Err(Error::ArgumentType {
                name: name.to_string(),
                expected: "model".to_string(),
            }),
            None => Err(Error::InvalidArguments(format!("no argument named '{}'", name))),
        }
    }

    /// The form object bound to a form argument
    pub fn form<F: Form>(&self, name: &str) -> Result<&F, Error> {
        let mismatch = || Error::ArgumentType {
            name: name.to_string(),
            expected: std::any::type_name::<F>().to_string(),
        };
        match self.value(name) {
            Some(Value::Form(form)) => {
                let any: &dyn Any = form.as_ref();
                any.downcast_ref::<F>().ok_or_else(mismatch)
            }
            Some(_) => Err(mismatch()),
            None => Err(Error::InvalidArguments(format!("no argument named '{}'", name))),
        }
    }
}

/// Outcome of binding a view's arguments
#[derive(Debug)]
pub enum Bound {
    /// Run the handler with these arguments
    Args(Args),
    /// Answer with this reply without running the handler
    Replace(Reply),
}

/// Resolve every declared input for one invocation.
///
/// Positional values map onto declaration order. Inputs the caller supplied
/// are never looked up. Keyword arguments that match no input pass through.
pub fn bind(descriptors: &[ParamDescriptor], supplied: Args, cx: &mut RequestContext) -> Result<Bound, Error> {
    let Args { positional, named } = supplied;
    let mut args = Args {
        positional: Vec::new(),
        named,
    };

    if positional.len() > descriptors.len() {
        return Err(Error::InvalidArguments(format!(
            "takes {} arguments but {} were given positionally",
            descriptors.len(),
            positional.len()
        )));
    }
    for (descriptor, value) in descriptors.iter().zip(positional) {
        if args.contains(&descriptor.name) {
            return Err(Error::InvalidArguments(format!(
                "got multiple values for argument '{}'",
                descriptor.name
            )));
        }
        args.insert(descriptor.name.clone(), value);
    }

    for descriptor in descriptors {
        if args.contains(&descriptor.name) {
            tracing::trace!(input = %descriptor.name, "Supplied by caller");
            continue;
        }

        let value = resolve(descriptor, cx)?;
        if let Value::Form(form) = &value
            && validation::is_validation_request(cx)?
        {
            let report = validation::report(cx, form.as_ref());
            return Ok(Bound::Replace(report.into_reply()?));
        }
        args.insert(descriptor.name.clone(), value);
    }

    Ok(Bound::Args(args))
}

fn resolve(descriptor: &ParamDescriptor, cx: &mut RequestContext) -> Result<Value, Error> {
    match &descriptor.binding {
        Binding::Explicit => fallback(descriptor),
        Binding::Form(factory) => {
            let data = form_data(cx)?;
            if data.is_none() && descriptor.target.accepts_absent() {
                return Ok(Value::Absent);
            }
            Ok(Value::Form(factory(data.as_ref())))
        }
        Binding::Request {
            source,
            lookup,
            consume,
        } => {
            if !descriptor.methods.allows(cx.request().method) {
                tracing::trace!(
                    input = %descriptor.name,
                    method = %cx.request().method,
                    "Method not allowed for parameter, treating as absent"
                );
                return fallback(descriptor);
            }

            let Some(raw) = lookup_raw(cx.request(), *source, lookup) else {
                return fallback(descriptor);
            };
            if *consume {
                consume_key(cx.request_mut(), *source, lookup);
            }

            let value = coerce(&raw, &descriptor.target, cx.data_access())?;
            tracing::trace!(input = %descriptor.name, key = %lookup, "Bound from request");
            Ok(value)
        }
    }
}

/// Body parameters win over query parameters
fn lookup_raw(request: &HttpRequest, source: ParamSource, key: &str) -> Option<Vec<String>> {
    let body = source.reads_body().then(|| request.form.getlist(key)).flatten();
    let query = || source.reads_query().then(|| request.query.getlist(key)).flatten();
    body.or_else(query).map(<[String]>::to_vec)
}

fn consume_key(request: &mut HttpRequest, source: ParamSource, key: &str) {
    if source.reads_body() {
        request.form.remove(key);
    }
    if source.reads_query() {
        request.query.remove(key);
    }
}

fn fallback(descriptor: &ParamDescriptor) -> Result<Value, Error> {
    if let Some(default) = &descriptor.default {
        return Ok(default.clone());
    }
    if descriptor.target.accepts_absent() {
        return Ok(Value::Absent);
    }
    Err(BindError::missing(&descriptor.name).into())
}
