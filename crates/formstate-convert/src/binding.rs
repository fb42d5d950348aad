//! Ready-made field bindings built on the text converters.
//!
//! Each binding's initializer turns the wire value into the string an input
//! shows, and its finalizer turns the input string back into the wire value.
//! During background validation an unparseable input is passed through
//! unchanged so the validator can report on it; on submit it is an error.

use anyhow::bail;
use formstate_store::{FieldBinding, finalizer, initializer};
use serde_json::Value;

use crate::text;

fn input_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// JSON number for `n`, integral when it has no fraction.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// Date input holding `YYYY-MM-DD`.
pub fn date_field() -> FieldBinding {
    FieldBinding::new()
        .initialize(initializer(|value| {
            let date = input_text(&value).and_then(text::date_deserialize);
            Ok(Value::String(text::date_serialize(date)))
        }))
        .finalize(finalizer(|value, is_submit| {
            let Some(raw) = input_text(&value) else {
                return Ok(Value::Null);
            };
            match text::date_deserialize(raw) {
                Some(date) => Ok(Value::String(text::date_serialize(Some(date)))),
                None if is_submit => bail!("'{raw}' is not a valid date"),
                None => Ok(value),
            }
        }))
}

/// Datetime input holding `YYYY-MM-DDTHH:MM`; submitted with seconds.
pub fn datetime_field() -> FieldBinding {
    FieldBinding::new()
        .initialize(initializer(|value| {
            let datetime = input_text(&value).and_then(text::datetime_deserialize);
            Ok(Value::String(text::datetime_serialize(datetime)))
        }))
        .finalize(finalizer(|value, is_submit| {
            let Some(raw) = input_text(&value) else {
                return Ok(Value::Null);
            };
            match text::datetime_deserialize(raw) {
                Some(dt) => Ok(Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())),
                None if is_submit => bail!("'{raw}' is not a valid date and time"),
                None => Ok(value),
            }
        }))
}

/// Text input whose empty string means "no value".
pub fn nullable_text_field() -> FieldBinding {
    FieldBinding::new()
        .initialize(initializer(|value| {
            Ok(Value::String(text::nullable_serialize(value.as_str())))
        }))
        .finalize(finalizer(|value, _| {
            Ok(value
                .as_str()
                .and_then(text::nullable_deserialize)
                .map_or(Value::Null, Value::String))
        }))
}

/// Numeric input; empty or unparseable input submits `0`.
pub fn number_field() -> FieldBinding {
    FieldBinding::new()
        .initialize(initializer(|value| Ok(number_input(value))))
        .finalize(finalizer(|value, _| {
            Ok(match value {
                Value::String(s) => number_value(text::number_deserialize(&s)),
                Value::Number(_) => value,
                _ => number_value(0.0),
            })
        }))
}

/// Numeric input; empty or unparseable input submits `null`.
pub fn nullable_number_field() -> FieldBinding {
    FieldBinding::new()
        .initialize(initializer(|value| Ok(number_input(value))))
        .finalize(finalizer(|value, _| {
            Ok(match value {
                Value::String(s) => text::number_nullable_deserialize(Some(s.as_str()))
                    .map_or(Value::Null, number_value),
                Value::Number(_) => value,
                _ => Value::Null,
            })
        }))
}

fn number_input(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(text::number_serialize(n.as_f64())),
        Value::String(_) => value,
        _ => Value::String(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn initialize(binding: &FieldBinding, value: Value) -> Value {
        let f = binding.initialize.as_ref().unwrap();
        f(value).await.unwrap()
    }

    async fn finalize(
        binding: &FieldBinding,
        value: Value,
        is_submit: bool,
    ) -> anyhow::Result<Value> {
        let f = binding.finalize.as_ref().unwrap();
        f(value, is_submit).await
    }

    #[test]
    fn test_number_value_prefers_integers() {
        assert_eq!(number_value(3.0), json!(3));
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(number_value(f64::INFINITY), Value::Null);
    }

    #[tokio::test]
    async fn test_date_field_round_trip() {
        let binding = date_field();
        let shown = initialize(&binding, json!("1990-05-01T00:00:00Z")).await;
        assert_eq!(shown, json!("1990-05-01"));
        assert_eq!(initialize(&binding, Value::Null).await, json!(""));

        assert_eq!(finalize(&binding, shown, true).await.unwrap(), json!("1990-05-01"));
        assert_eq!(finalize(&binding, json!(""), true).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_date_fails_only_on_submit() {
        let binding = date_field();
        assert_eq!(
            finalize(&binding, json!("31/31/2020"), false).await.unwrap(),
            json!("31/31/2020")
        );
        let err = finalize(&binding, json!("31/31/2020"), true).await.unwrap_err();
        assert!(err.to_string().contains("not a valid date"));
    }

    #[tokio::test]
    async fn test_datetime_field_adds_seconds() {
        let binding = datetime_field();
        let shown = initialize(&binding, json!("2024-01-15T09:05:42")).await;
        assert_eq!(shown, json!("2024-01-15T09:05"));
        assert_eq!(
            finalize(&binding, shown, true).await.unwrap(),
            json!("2024-01-15T09:05:00")
        );
    }

    #[tokio::test]
    async fn test_nullable_text_field() {
        let binding = nullable_text_field();
        assert_eq!(initialize(&binding, Value::Null).await, json!(""));
        assert_eq!(finalize(&binding, json!(""), true).await.unwrap(), Value::Null);
        assert_eq!(finalize(&binding, json!("x"), true).await.unwrap(), json!("x"));
    }

    #[tokio::test]
    async fn test_number_fields() {
        let binding = number_field();
        assert_eq!(initialize(&binding, json!(4)).await, json!("4"));
        assert_eq!(initialize(&binding, Value::Null).await, json!(""));
        assert_eq!(finalize(&binding, json!("4.5"), true).await.unwrap(), json!(4.5));
        assert_eq!(finalize(&binding, json!("four"), true).await.unwrap(), json!(0));

        let nullable = nullable_number_field();
        assert_eq!(finalize(&nullable, json!(""), true).await.unwrap(), Value::Null);
        assert_eq!(finalize(&nullable, json!("12"), true).await.unwrap(), json!(12));
    }
}
