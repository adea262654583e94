use chrono::{DateTime, SecondsFormat};

use super::{mismatch, NativeType, NativeValue, ScalarCodec};
use crate::ScalarError;

/// An RFC 3339 timestamp, keeping the offset it was sent with.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeScalar;

impl ScalarCodec for DateTimeScalar {
    fn name(&self) -> &str {
        "DateTime"
    }

    fn native_type(&self) -> NativeType {
        NativeType::DateTime
    }

    fn description(&self) -> Option<&str> {
        Some("An RFC 3339 date-time string, such as 2007-12-03T10:15:30+01:00.")
    }

    fn specified_by(&self) -> Option<&str> {
        Some("https://tools.ietf.org/html/rfc3339")
    }

    fn decode(&self, value: serde_json::Value) -> Result<NativeValue, ScalarError> {
        match value {
            serde_json::Value::String(datetime) => DateTime::parse_from_rfc3339(&datetime)
                .map(NativeValue::DateTime)
                .map_err(|e| ScalarError::new("DateTime", format!("could not parse date-time: {e}"))),
            _ => Err(ScalarError::new("DateTime", "date-times should be provided as string")),
        }
    }

    fn encode(&self, value: &NativeValue) -> Result<serde_json::Value, ScalarError> {
        match value {
            NativeValue::DateTime(datetime) => Ok(serde_json::Value::String(
                datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            )),
            other => Err(mismatch(self, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_keep_offset() {
        let normalized = DateTimeScalar.normalize(json!("2007-12-03T10:15:30+01:00"));
        assert_eq!(normalized, Ok(json!("2007-12-03T10:15:30+01:00")));
    }

    #[test]
    fn should_use_z_for_utc() {
        let normalized = DateTimeScalar.normalize(json!("2007-12-03T10:15:30.500+00:00"));
        assert_eq!(normalized, Ok(json!("2007-12-03T10:15:30.500Z")));
    }

    #[test]
    fn should_fail_without_offset() {
        assert!(DateTimeScalar.decode(json!("2007-12-03T10:15:30")).is_err());
    }
}
