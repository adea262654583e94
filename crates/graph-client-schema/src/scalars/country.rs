use super::{mismatch, NativeType, NativeValue, ScalarCodec};
use crate::ScalarError;

/// An ISO 3166-1 alpha-2 country code, carried as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountryScalar;

impl ScalarCodec for CountryScalar {
    fn name(&self) -> &str {
        "Country"
    }

    fn native_type(&self) -> NativeType {
        NativeType::String
    }

    fn description(&self) -> Option<&str> {
        Some("An ISO 3166-1 alpha-2 country code, such as FR or US.")
    }

    fn specified_by(&self) -> Option<&str> {
        Some("https://www.iso.org/iso-3166-country-codes.html")
    }

    fn decode(&self, value: serde_json::Value) -> Result<NativeValue, ScalarError> {
        match value {
            serde_json::Value::String(code) => parse(&code).map(NativeValue::String),
            _ => Err(ScalarError::new("Country", "countries should be provided as string")),
        }
    }

    fn encode(&self, value: &NativeValue) -> Result<serde_json::Value, ScalarError> {
        match value {
            NativeValue::String(code) => parse(code).map(serde_json::Value::String),
            other => Err(mismatch(self, other)),
        }
    }
}

/// Codes are accepted in any case and stored upper-cased.
fn parse(code: &str) -> Result<String, ScalarError> {
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(ScalarError::new(
            "Country",
            format!("'{code}' is not a two-letter country code"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_succeed() {
        let scalar = CountryScalar.decode(json!("FR"));
        assert_eq!(scalar, Ok(NativeValue::String("FR".to_string())));
    }

    #[test]
    fn should_upper_case() {
        assert_eq!(CountryScalar.normalize(json!("de")), Ok(json!("DE")));
    }

    #[test]
    fn should_fail_too_long() {
        let scalar = CountryScalar.decode(json!("FRA"));
        assert!(scalar.is_err());
    }

    #[test]
    fn should_fail_not_a_string() {
        let scalar = CountryScalar.decode(json!(33));
        assert_eq!(
            scalar.unwrap_err().to_string(),
            "invalid Country value: countries should be provided as string"
        );
    }
}
