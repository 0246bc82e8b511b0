// Error types for the trellis framework

use std::fmt;
use thiserror::Error;

/// Errors raised while binding a descriptor to the live request.
///
/// These are the only errors a handler can opt into receiving as a bound
/// value (see [`TypeTag::Catching`](crate::TypeTag::Catching)), which is why
/// they are `Clone` and comparable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("No value found for request parameter '{name}'")]
    MissingParameter { name: String },

    #[error("Cannot convert '{raw_value}' to {target_type}")]
    TypeConversion {
        target_type: String,
        raw_value: String,
    },

    #[error("Object with pk {key} does not exist")]
    NotFound { key: String },
}

impl BindError {
    pub fn missing(name: impl Into<String>) -> Self {
        BindError::MissingParameter { name: name.into() }
    }

    pub fn conversion(target_type: impl fmt::Display, raw_value: impl Into<String>) -> Self {
        BindError::TypeConversion {
            target_type: target_type.to_string(),
            raw_value: raw_value.into(),
        }
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        BindError::NotFound { key: key.into() }
    }
}

/// The markup rule an out-of-band fragment violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentRule {
    ExactlyOneRoot,
    IdentifiedRoot,
}

impl fmt::Display for FragmentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentRule::ExactlyOneRoot => write!(f, "must contain exactly one root element"),
            FragmentRule::IdentifiedRoot => write!(f, "must carry an identifier attribute"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("Malformed fragment: the additional response {rule}")]
    MalformedFragment { rule: FragmentRule },

    #[error("{operation} can only be called from within a trellis view")]
    NotInContext { operation: String },

    #[error("Invalid view signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid call arguments: {0}")]
    InvalidArguments(String),

    #[error("Argument '{name}' is not a {expected}")]
    ArgumentType { name: String, expected: String },

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("No route named '{0}'")]
    ReverseNotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Data access error: {0}")]
    DataAccess(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_in_context(operation: impl Into<String>) -> Self {
        Error::NotInContext {
            operation: operation.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Bind(BindError::NotFound { .. }) => 404,
            Error::Bind(_) => 400,
            Error::BadRequest(_) => 400,
            Error::Deserialization(_) => 400,
            Error::RouteNotFound(_) => 404,
            Error::ReverseNotFound(_) => 500,
            Error::MethodNotAllowed(_) => 405,
            _ => 500,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// The binding error, if this error was raised while binding arguments
    pub fn as_bind_error(&self) -> Option<&BindError> {
        match self {
            Error::Bind(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_messages() {
        assert_eq!(
            BindError::missing("p1").to_string(),
            "No value found for request parameter 'p1'"
        );
        assert_eq!(
            BindError::conversion("int", "abc").to_string(),
            "Cannot convert 'abc' to int"
        );
        assert_eq!(
            BindError::not_found("42").to_string(),
            "Object with pk 42 does not exist"
        );
    }

    #[test]
    fn test_fragment_rule_messages() {
        let err = Error::MalformedFragment {
            rule: FragmentRule::ExactlyOneRoot,
        };
        assert!(err.to_string().contains("exactly one root element"));

        let err = Error::MalformedFragment {
            rule: FragmentRule::IdentifiedRoot,
        };
        assert!(err.to_string().contains("identifier attribute"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::from(BindError::missing("x")).status_code(), 400);
        assert_eq!(Error::from(BindError::not_found("1")).status_code(), 404);
        assert_eq!(Error::not_in_context("register").status_code(), 500);
        assert!(Error::RouteNotFound("/x".into()).is_client_error());
        assert!(Error::Internal("boom".into()).is_server_error());
    }

    #[test]
    fn test_not_in_context_message() {
        let err = Error::not_in_context("add_response_handler");
        assert_eq!(
            err.to_string(),
            "add_response_handler can only be called from within a trellis view"
        );
    }
}
