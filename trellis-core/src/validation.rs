//! Incremental form validation.
//!
//! A PATCH aimed at a view with a JSON body is a validation request: the
//! view's form input is bound from the JSON and, instead of running the
//! handler, the view answers with a [`ValidationReport`].

use crate::form::Form;
use crate::{Error, HttpResponse, Reply, RequestContext};
use serde::Serialize;
use std::collections::BTreeMap;

/// Validated state of one form field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldState {
    pub name: String,
    pub valid: bool,
    pub errors: Vec<String>,
    /// Widget attributes the client may apply to the input
    pub attrs: BTreeMap<String, String>,
}

impl FieldState {
    pub fn valid(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            valid: true,
            ..Self::default()
        }
    }

    pub fn invalid(name: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            name: name.into(),
            valid: false,
            errors,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub attrs: BTreeMap<String, String>,
}

/// Per-field validity of a submitted form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// The field the client asked about, from the validate-field header
    pub name: Option<String>,
    pub fields: BTreeMap<String, FieldReport>,
    pub non_field_errors: Vec<String>,
    pub form_valid: bool,
}

impl ValidationReport {
    pub fn from_form(form: &dyn Form, name: Option<String>) -> Self {
        let fields = form
            .fields()
            .into_iter()
            .map(|field| {
                (
                    field.name,
                    FieldReport {
                        valid: field.valid,
                        errors: field.errors,
                        attrs: field.attrs,
                    },
                )
            })
            .collect();

        Self {
            name,
            fields,
            non_field_errors: form.non_field_errors(),
            form_valid: form.is_valid(),
        }
    }

    pub fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::raw(HttpResponse::json(&self)?))
    }
}

/// Whether the current request asks the current view to validate its form
pub fn is_validation_request(cx: &RequestContext) -> Result<bool, Error> {
    Ok(cx.is_patch()? && cx.request().is_json())
}

/// Build the report for `form` using the configured validate-field header
pub fn report(cx: &RequestContext, form: &dyn Form) -> ValidationReport {
    let name = cx
        .request()
        .header(&cx.settings().validate_field_header)
        .map(str::to_string);
    tracing::debug!(field = ?name, "Answering validation request");
    ValidationReport::from_form(form, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Signup {
        bound: bool,
    }

    impl Form for Signup {
        fn is_bound(&self) -> bool {
            self.bound
        }

        fn fields(&self) -> Vec<FieldState> {
            vec![
                FieldState::valid("email").with_attr("type", "email"),
                FieldState::invalid("age", vec!["Enter a whole number.".into()]),
            ]
        }
    }

    #[test]
    fn test_report_from_form() {
        let report = ValidationReport::from_form(&Signup { bound: true }, Some("age".into()));
        assert!(!report.form_valid);
        assert!(report.fields["email"].valid);
        assert_eq!(report.fields["email"].attrs["type"], "email");
        assert_eq!(report.fields["age"].errors, vec!["Enter a whole number."]);
    }

    #[test]
    fn test_report_json_shape() {
        let report = ValidationReport::from_form(&Signup { bound: true }, None);
        let reply = report.into_reply().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&reply.response().body).unwrap();

        assert_eq!(json["name"], serde_json::Value::Null);
        assert_eq!(json["form_valid"], false);
        assert_eq!(json["fields"]["age"]["valid"], false);
        assert_eq!(json["non_field_errors"], serde_json::json!([]));
        assert_eq!(reply.response().header("Content-Type"), Some("application/json"));
    }
}
