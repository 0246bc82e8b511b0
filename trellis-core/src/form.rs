//! Form processing: body parsing, form objects and form binding helpers

use crate::validation::FieldState;
use crate::{Error, HttpMethod, QueryDict, RequestContext};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::sync::Arc;

/// Parse URL-encoded form data into a typed structure
pub fn parse_form<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::BadRequest(format!("Failed to parse form data: {}", e)))
}

/// A form object a view can declare as one of its inputs.
///
/// Field-level validation logic belongs to the implementation; the
/// framework only needs the per-field outcome to drive the validation
/// sub-protocol.
pub trait Form: Any + Send + Sync {
    /// Whether the form was constructed with submitted data
    fn is_bound(&self) -> bool;

    /// Validated state of every declared field, in declaration order
    fn fields(&self) -> Vec<FieldState>;

    /// Errors not tied to a single field
    fn non_field_errors(&self) -> Vec<String> {
        Vec::new()
    }

    fn is_valid(&self) -> bool {
        self.is_bound()
            && self.non_field_errors().is_empty()
            && self.fields().iter().all(|f| f.valid)
    }
}

/// Builds a form, bound to `data` when present
pub type FormFactory = Arc<dyn Fn(Option<&QueryDict>) -> Arc<dyn Form> + Send + Sync>;

/// Wrap a constructor into a [`FormFactory`]
pub fn form_factory<F, C>(construct: C) -> FormFactory
where
    F: Form,
    C: Fn(Option<&QueryDict>) -> F + Send + Sync + 'static,
{
    Arc::new(move |data| Arc::new(construct(data)) as Arc<dyn Form>)
}

/// Submitted data a form should be bound with, if any.
///
/// A POST aimed at the current view binds the body parameters. A JSON
/// request aimed at it (other than GET or HEAD) binds the JSON object's
/// fields merged over the body parameters. Everything else is unbound.
pub fn form_data(cx: &RequestContext) -> Result<Option<QueryDict>, Error> {
    let request = cx.request();
    if matches!(request.method, HttpMethod::GET | HttpMethod::HEAD) || !cx.is_resolved_target()? {
        return Ok(None);
    }

    if request.method == HttpMethod::POST {
        return Ok(Some(request.form.clone()));
    }
    if request.is_json() {
        let mut data = request.form.clone();
        data.merge(&json_object_fields(&request.body)?);
        return Ok(Some(data));
    }
    Ok(None)
}

/// Create a form for the current request, bound when the request submits it
pub fn create_form(cx: &RequestContext, factory: &FormFactory) -> Result<Arc<dyn Form>, Error> {
    let data = form_data(cx)?;
    Ok(factory(data.as_ref()))
}

/// A POST aimed at this view carrying a valid form
pub fn is_valid_submit(cx: &RequestContext, form: &dyn Form) -> Result<bool, Error> {
    Ok(cx.is_post()? && form.is_valid())
}

fn json_object_fields(body: &[u8]) -> Result<QueryDict, Error> {
    if body.is_empty() {
        return Ok(QueryDict::new());
    }
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| Error::Deserialization(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::BadRequest("JSON form data must be an object".to_string()))?;

    let mut dict = QueryDict::new();
    for (key, value) in object {
        match value {
            serde_json::Value::Array(items) => {
                for item in items {
                    dict.append(key.clone(), json_scalar(item));
                }
            }
            other => dict.append(key.clone(), json_scalar(other)),
        }
    }
    Ok(dict)
}

fn json_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Multipart form field
#[derive(Debug, Clone)]
pub struct FormField {
    /// Field name
    pub name: String,

    /// Field value (for text fields)
    pub value: Option<String>,

    /// Original filename (for file fields)
    pub filename: Option<String>,
}

/// Multipart form data parser
pub struct MultipartParser {
    boundary: String,
}

impl MultipartParser {
    /// Create a new multipart parser from Content-Type header
    pub fn from_content_type(content_type: &str) -> Result<Self, Error> {
        // Example: "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW"
        let boundary = content_type
            .split(';')
            .find_map(|part| {
                part.trim()
                    .strip_prefix("boundary=")
                    .map(|b| b.trim_matches('"').to_string())
            })
            .ok_or_else(|| Error::BadRequest("Missing boundary in Content-Type".to_string()))?;

        Ok(Self { boundary })
    }

    /// Parse multipart form data
    pub fn parse(&self, body: &[u8]) -> Result<Vec<FormField>, Error> {
        let boundary_marker = format!("--{}", self.boundary);
        let body_str = String::from_utf8_lossy(body);

        let mut fields = Vec::new();
        for part in body_str.split(&boundary_marker).skip(1) {
            let trimmed = part.trim();
            if trimmed == "--" || trimmed.is_empty() {
                continue;
            }
            if let Some(field) = self.parse_part(part)? {
                fields.push(field);
            }
        }

        Ok(fields)
    }

    fn parse_part(&self, part: &str) -> Result<Option<FormField>, Error> {
        let lines: Vec<&str> = part.lines().collect();
        if lines.is_empty() {
            return Ok(None);
        }

        let mut name = None;
        let mut filename = None;
        let mut content_start = lines.len();

        // The part starts with the line break that followed the boundary
        for (i, line) in lines.iter().enumerate().skip(1) {
            if line.trim().is_empty() {
                content_start = i + 1;
                break;
            }

            if let Some(disposition) = line.strip_prefix("Content-Disposition:") {
                for attr in disposition.split(';').map(str::trim) {
                    if let Some(v) = attr.strip_prefix("name=") {
                        name = Some(v.trim_matches('"').to_string());
                    } else if let Some(v) = attr.strip_prefix("filename=") {
                        filename = Some(v.trim_matches('"').to_string());
                    }
                }
            }
        }

        let name = name.ok_or_else(|| Error::BadRequest("Missing field name".to_string()))?;
        let content = lines[content_start.min(lines.len())..].join("\n").trim().to_string();

        Ok(Some(match filename {
            Some(filename) => FormField {
                name,
                value: None,
                filename: Some(filename),
            },
            None => FormField {
                name,
                value: Some(content),
                filename: None,
            },
        }))
    }

    /// Collect the text fields into a parameter store
    pub fn to_query_dict(fields: Vec<FormField>) -> QueryDict {
        fields
            .into_iter()
            .filter_map(|field| field.value.map(|value| (field.name, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_parse_form_typed() {
        #[derive(Deserialize)]
        struct Login {
            username: String,
            age: u32,
        }

        let login: Login = parse_form(b"username=jo&age=30").unwrap();
        assert_eq!(login.username, "jo");
        assert_eq!(login.age, 30);
    }

    #[test]
    fn test_multipart_parser_from_content_type() {
        let content_type = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW";
        let parser = MultipartParser::from_content_type(content_type).unwrap();

        assert_eq!(parser.boundary, "----WebKitFormBoundary7MA4YWxkTrZu0gW");
    }

    #[test]
    fn test_multipart_parser_missing_boundary() {
        let result = MultipartParser::from_content_type("multipart/form-data");
        assert!(result.is_err());
    }

    #[test]
    fn test_multipart_text_fields() {
        let parser = MultipartParser::from_content_type("multipart/form-data; boundary=XYZ").unwrap();
        let body = "--XYZ\r\nContent-Disposition: form-data; name=\"first\"\r\n\r\nAda\r\n\
                    --XYZ\r\nContent-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
                    Content-Type: text/plain\r\n\r\nhello\r\n--XYZ--\r\n";
        let fields = parser.parse(body.as_bytes()).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].filename.as_deref(), Some("a.txt"));

        let dict = MultipartParser::to_query_dict(fields);
        assert_eq!(dict.get("first"), Some("Ada"));
        assert!(!dict.contains("doc"));
    }

    #[test]
    fn test_json_object_fields() {
        let dict = json_object_fields(br#"{"a": "x", "n": 3, "tags": ["p", "q"], "z": null}"#).unwrap();
        assert_eq!(dict.get("a"), Some("x"));
        assert_eq!(dict.get("n"), Some("3"));
        assert_eq!(dict.getlist("tags").map(|t| t.len()), Some(2));
        assert_eq!(dict.get("z"), Some(""));
        assert!(json_object_fields(b"[1]").is_err());
    }
}
