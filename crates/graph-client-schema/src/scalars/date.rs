use chrono::NaiveDate;

use super::{mismatch, NativeType, NativeValue, ScalarCodec};
use crate::ScalarError;

const FORMAT: &str = "%Y-%m-%d";

/// A calendar date without time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateScalar;

impl ScalarCodec for DateScalar {
    fn name(&self) -> &str {
        "Date"
    }

    fn native_type(&self) -> NativeType {
        NativeType::Date
    }

    fn description(&self) -> Option<&str> {
        Some("A date string, such as 2007-12-03, compliant with the full-date format of RFC 3339.")
    }

    fn specified_by(&self) -> Option<&str> {
        Some("https://tools.ietf.org/html/rfc3339")
    }

    fn decode(&self, value: serde_json::Value) -> Result<NativeValue, ScalarError> {
        match value {
            serde_json::Value::String(date) => NaiveDate::parse_from_str(&date, FORMAT)
                .map(NativeValue::Date)
                .map_err(|e| ScalarError::new("Date", format!("could not parse date: {e}"))),
            _ => Err(ScalarError::new("Date", "dates should be provided as string")),
        }
    }

    fn encode(&self, value: &NativeValue) -> Result<serde_json::Value, ScalarError> {
        match value {
            NativeValue::Date(date) => Ok(serde_json::Value::String(date.format(FORMAT).to_string())),
            other => Err(mismatch(self, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_succeed() {
        let scalar = DateScalar.decode(json!("2024-02-29"));
        assert_eq!(
            scalar,
            Ok(NativeValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
    }

    #[test]
    fn should_fail_invalid_day() {
        assert!(DateScalar.decode(json!("2023-02-29")).is_err());
    }

    #[test]
    fn should_fail_with_time() {
        assert!(DateScalar.decode(json!("2023-02-28T10:00:00Z")).is_err());
    }

    #[test]
    fn should_refuse_other_native_types() {
        let error = DateScalar.encode(&NativeValue::Long(1)).unwrap_err();
        assert_eq!(error.to_string(), "invalid Date value: expected a Date value, got Long");
    }
}
