// Core library for the trellis view framework
// Parameter binding, nested view invocation and htmx fragment composition

pub mod actions;
pub mod binding;
pub mod coerce;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod form;
pub mod fragment;
pub mod hooks;
pub mod http;
pub mod logging;
pub mod markup;
pub mod oob;
pub mod query_dict;
pub mod routing;
pub mod traits;
pub mod validation;
pub mod value;
pub mod view;

// Re-export commonly used types
pub use actions::Actions;
pub use binding::{bind, Args, Bound};
pub use coerce::{coerce, parse_bool};
pub use config::Settings;
pub use context::{CallFrame, CallStack, HandlerId, RequestContext};
pub use descriptor::{AutoParam, Binding, Input, MethodSet, Param, ParamDescriptor, ParamSource, Signature};
pub use error::*;
pub use form::{create_form, form_data, form_factory, is_valid_submit, parse_form, Form, FormFactory};
pub use fragment::{body_response, wrap, ElementMeta, Envelope, Reply};
pub use hooks::{HookChain, ResponseHook};
pub use http::{HttpRequest, HttpResponse};
pub use oob::{merge, tag_fragment, OobEntry};
pub use query_dict::QueryDict;
pub use routing::{Route, RouteOptions, Router};
pub use traits::{DataAccess, HttpMethod, Record};
pub use validation::{FieldState, ValidationReport};
pub use value::{Catch, FromValue, ModelRef, TypeTag, Value};
pub use view::{Decorator, HandlerFn, View, ViewBuilder};

/// Everything needed to declare and compose views
pub mod prelude {
    pub use crate::{
        body_response, create_form, form_factory, is_valid_submit, merge, Actions, Args, AutoParam,
        BindError, Catch, ElementMeta, Error, FieldState, Form, HttpMethod, HttpRequest,
        HttpResponse, Param, QueryDict, Reply, RequestContext, Router, Settings, Signature,
        TypeTag, Value, View,
    };
}
