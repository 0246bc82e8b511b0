//! Conversion of raw request strings into typed [`Value`]s.
//!
//! Every function here is pure apart from the data-access lookup used for
//! [`TypeTag::Model`] targets.

use crate::error::BindError;
use crate::traits::DataAccess;
use crate::value::{ModelRef, TypeTag, Value};
use crate::Error;
use uuid::Uuid;

/// Convert the raw values found for one parameter into `target`.
///
/// `raw` holds every submitted value in source order and is never empty
/// when called from the binding engine. Scalar targets use the first value.
pub fn coerce(raw: &[String], target: &TypeTag, store: Option<&dyn DataAccess>) -> Result<Value, Error> {
    match target {
        TypeTag::List(element) => raw
            .iter()
            .map(|v| coerce(std::slice::from_ref(v), element, store))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        TypeTag::Optional(inner) => {
            if raw.is_empty() {
                Ok(Value::Absent)
            } else {
                coerce(raw, inner, store)
            }
        }
        TypeTag::Catching(inner, catch) => match coerce(raw, inner, store) {
            Err(Error::Bind(e)) if catch.accepts(&e) => Ok(Value::Error(e)),
            other => other,
        },
        scalar => {
            let value = raw
                .first()
                .ok_or_else(|| BindError::conversion(scalar, ""))?;
            coerce_scalar(value, scalar, store)
        }
    }
}

fn coerce_scalar(raw: &str, target: &TypeTag, store: Option<&dyn DataAccess>) -> Result<Value, Error> {
    match target {
        TypeTag::Str => Ok(Value::Str(raw.to_string())),
        TypeTag::Int => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| BindError::conversion(target, raw).into()),
        TypeTag::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| BindError::conversion(target, raw).into()),
        TypeTag::Bool => Ok(Value::Bool(parse_bool(raw))),
        TypeTag::Uuid => Uuid::parse_str(raw)
            .map(Value::Uuid)
            .map_err(|_| BindError::conversion(target, raw).into()),
        TypeTag::Model(model) => fetch_model(model, raw, store),
        TypeTag::Form => Err(Error::InvalidSignature(
            "form inputs are built from the request body, not from a single parameter".to_string(),
        )),
        TypeTag::Optional(_) | TypeTag::List(_) | TypeTag::Catching(..) => {
            coerce(&[raw.to_string()], target, store)
        }
    }
}

/// `""` and `"false"` in any letter case are false; every other value is true
pub fn parse_bool(raw: &str) -> bool {
    !(raw.is_empty() || raw.eq_ignore_ascii_case("false"))
}

fn fetch_model(model: &str, pk: &str, store: Option<&dyn DataAccess>) -> Result<Value, Error> {
    let store = store.ok_or_else(|| {
        Error::DataAccess(format!(
            "no data access configured to resolve '{}' parameters",
            model
        ))
    })?;

    match store.fetch(model, pk)? {
        Some(object) => Ok(Value::Model(ModelRef {
            model: model.to_string(),
            pk: pk.to_string(),
            object,
        })),
        None => Err(BindError::not_found(pk).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Catch;

    fn raw(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(coerce(&raw(&["a"]), &TypeTag::Str, None).unwrap(), Value::from("a"));
        assert_eq!(coerce(&raw(&["42"]), &TypeTag::Int, None).unwrap(), Value::Int(42));
        assert_eq!(coerce(&raw(&["1.1"]), &TypeTag::Float, None).unwrap(), Value::Float(1.1));

        let id = Uuid::new_v4();
        assert_eq!(
            coerce(&raw(&[&id.to_string()]), &TypeTag::Uuid, None).unwrap(),
            Value::Uuid(id)
        );
    }

    #[test]
    fn test_bool_rules() {
        for falsy in ["", "false", "False", "FALSE"] {
            assert_eq!(coerce(&raw(&[falsy]), &TypeTag::Bool, None).unwrap(), Value::Bool(false));
        }
        for truthy in ["true", "1", "on", "no"] {
            assert_eq!(coerce(&raw(&[truthy]), &TypeTag::Bool, None).unwrap(), Value::Bool(true));
        }
    }

    #[test]
    fn test_malformed_int_raises() {
        let err = coerce(&raw(&["abc"]), &TypeTag::Int, None).unwrap_err();
        assert_eq!(
            err.as_bind_error(),
            Some(&BindError::TypeConversion {
                target_type: "int".into(),
                raw_value: "abc".into()
            })
        );
    }

    #[test]
    fn test_catching_returns_error_as_value() {
        let target = TypeTag::catching(TypeTag::Int, Catch::Conversion);
        let value = coerce(&raw(&["abc"]), &target, None).unwrap();
        assert_eq!(value, Value::Error(BindError::conversion("int", "abc")));

        let value = coerce(&raw(&["7"]), &target, None).unwrap();
        assert_eq!(value, Value::Int(7));
    }

    #[test]
    fn test_list_preserves_order_and_duplicates() {
        let target = TypeTag::list(TypeTag::Int);
        let value = coerce(&raw(&["2", "1", "2"]), &target, None).unwrap();
        assert_eq!(value, Value::from(vec![2, 1, 2]));
    }

    #[test]
    fn test_list_element_error_propagates() {
        let target = TypeTag::list(TypeTag::Int);
        assert!(coerce(&raw(&["1", "x"]), &target, None).is_err());
    }

    #[test]
    fn test_optional_with_value() {
        let target = TypeTag::optional(TypeTag::Int);
        assert_eq!(coerce(&raw(&["1"]), &target, None).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_model_without_store() {
        let err = coerce(&raw(&["1"]), &TypeTag::model("person"), None).unwrap_err();
        assert!(matches!(err, Error::DataAccess(_)));
    }
}
