//! Type vocabulary and bound values.
//!
//! [`TypeTag`] is the closed set of target types a descriptor may declare.
//! [`Value`] is what the binding engine produces for each declared input.

use crate::error::BindError;
use crate::form::Form;
use crate::traits::Record;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Which binding errors a [`TypeTag::Catching`] target accepts as its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catch {
    /// Malformed scalar input
    Conversion,
    /// Unknown primary key for a model reference
    NotFound,
    /// Either of the above
    Any,
}

impl Catch {
    pub fn accepts(&self, error: &BindError) -> bool {
        match (self, error) {
            (Catch::Any, BindError::TypeConversion { .. } | BindError::NotFound { .. }) => true,
            (Catch::Conversion, BindError::TypeConversion { .. }) => true,
            (Catch::NotFound, BindError::NotFound { .. }) => true,
            _ => false,
        }
    }
}

/// Declared target type of a handler input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    Str,
    Int,
    Float,
    Bool,
    Uuid,
    /// Domain object looked up by primary key through `DataAccess`
    Model(String),
    /// Form object built from the submitted body
    Form,
    Optional(Box<TypeTag>),
    List(Box<TypeTag>),
    /// `T | Error`: the listed binding errors become the bound value
    Catching(Box<TypeTag>, Catch),
}

impl TypeTag {
    pub fn model(name: impl Into<String>) -> Self {
        TypeTag::Model(name.into())
    }

    pub fn optional(inner: TypeTag) -> Self {
        TypeTag::Optional(Box::new(inner))
    }

    pub fn list(element: TypeTag) -> Self {
        TypeTag::List(Box::new(element))
    }

    pub fn catching(inner: TypeTag, catch: Catch) -> Self {
        TypeTag::Catching(Box::new(inner), catch)
    }

    /// Whether a missing value may bind as [`Value::Absent`]
    pub fn accepts_absent(&self) -> bool {
        match self {
            TypeTag::Optional(_) => true,
            TypeTag::Catching(inner, _) => inner.accepts_absent(),
            _ => false,
        }
    }

    pub fn is_form(&self) -> bool {
        match self {
            TypeTag::Form => true,
            TypeTag::Optional(inner) | TypeTag::Catching(inner, _) => inner.is_form(),
            _ => false,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Str => write!(f, "str"),
            TypeTag::Int => write!(f, "int"),
            TypeTag::Float => write!(f, "float"),
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::Uuid => write!(f, "uuid"),
            TypeTag::Model(name) => write!(f, "{}", name),
            TypeTag::Form => write!(f, "form"),
            TypeTag::Optional(inner) => write!(f, "{} | None", inner),
            TypeTag::List(inner) => write!(f, "list[{}]", inner),
            TypeTag::Catching(inner, _) => write!(f, "{} | Error", inner),
        }
    }
}

/// A domain object resolved from its primary key
#[derive(Clone)]
pub struct ModelRef {
    pub model: String,
    pub pk: String,
    pub object: Record,
}

impl ModelRef {
    /// Downcast the fetched object to its concrete type
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.object.clone().downcast::<T>().ok()
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRef")
            .field("model", &self.model)
            .field("pk", &self.pk)
            .finish()
    }
}

/// A bound (or caller-supplied) handler argument
#[derive(Clone)]
pub enum Value {
    Absent,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    Model(ModelRef),
    List(Vec<Value>),
    Form(Arc<dyn Form>),
    /// A binding error the declared type chose to receive
    Error(BindError),
}

impl Value {
    /// Runtime type of the value, used to infer a descriptor's target type
    /// from its default
    pub fn type_tag(&self) -> Option<TypeTag> {
        match self {
            Value::Absent | Value::Error(_) => None,
            Value::Str(_) => Some(TypeTag::Str),
            Value::Int(_) => Some(TypeTag::Int),
            Value::Float(_) => Some(TypeTag::Float),
            Value::Bool(_) => Some(TypeTag::Bool),
            Value::Uuid(_) => Some(TypeTag::Uuid),
            Value::Model(m) => Some(TypeTag::Model(m.model.clone())),
            Value::Form(_) => Some(TypeTag::Form),
            Value::List(items) => Some(TypeTag::list(
                items
                    .first()
                    .and_then(Value::type_tag)
                    .unwrap_or(TypeTag::Str),
            )),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Render scalar values back to their textual form
    pub fn to_param_string(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(x) => Some(x.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Uuid(u) => Some(u.to_string()),
            Value::Model(m) => Some(m.pk.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => write!(f, "Absent"),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Uuid(u) => f.debug_tuple("Uuid").field(u).finish(),
            Value::Model(m) => m.fmt(f),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Form(_) => write!(f, "Form"),
            Value::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Absent, Value::Absent) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Model(a), Value::Model(b)) => a.model == b.model && a.pk == b.pk,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Form(a), Value::Form(b)) => Arc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<ModelRef> for Value {
    fn from(v: ModelRef) -> Self {
        Value::Model(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Absent)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

/// Typed access to a bound [`Value`]
pub trait FromValue: Sized {
    /// Human readable name of the expected type, for error messages
    fn expected() -> String;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for String {
    fn expected() -> String {
        "str".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn expected() -> String {
        "int".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn expected() -> String {
        "float".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn expected() -> String {
        "bool".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for Uuid {
    fn expected() -> String {
        "uuid".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }
}

impl FromValue for ModelRef {
    fn expected() -> String {
        "model reference".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Model(m) => Some(m.clone()),
            _ => None,
        }
    }
}

impl FromValue for Value {
    fn expected() -> String {
        "value".into()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn expected() -> String {
        format!("{} | None", T::expected())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Absent => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn expected() -> String {
        format!("list[{}]", T::expected())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Result<T, BindError> {
    fn expected() -> String {
        format!("{} | Error", T::expected())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Error(e) => Some(Err(e.clone())),
            other => T::from_value(other).map(Ok),
        }
    }
}
