use super::{mismatch, NativeType, NativeValue, ScalarCodec};
use crate::ScalarError;

/// A signed 64-bit integer. Also backs `ID`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongScalar;

impl ScalarCodec for LongScalar {
    fn name(&self) -> &str {
        "Long"
    }

    fn native_type(&self) -> NativeType {
        NativeType::Long
    }

    fn description(&self) -> Option<&str> {
        Some("A signed 64-bit integer.")
    }

    /// Numbers and numeric strings are both accepted, as servers commonly send 64-bit values as strings.
    fn decode(&self, value: serde_json::Value) -> Result<NativeValue, ScalarError> {
        match value {
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(NativeValue::Long)
                .ok_or_else(|| ScalarError::new("Long", format!("{number} does not fit in 64 bits"))),
            serde_json::Value::String(number) => number
                .trim()
                .parse()
                .map(NativeValue::Long)
                .map_err(|e| ScalarError::new("Long", format!("could not parse '{number}': {e}"))),
            _ => Err(ScalarError::new("Long", "longs should be provided as number or string")),
        }
    }

    fn encode(&self, value: &NativeValue) -> Result<serde_json::Value, ScalarError> {
        match value {
            NativeValue::Long(number) => Ok(serde_json::Value::from(*number)),
            other => Err(mismatch(self, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(json!(9_007_199_254_740_993_i64), 9_007_199_254_740_993)]
    #[case(json!("-42"), -42)]
    #[case(json!(" 7 "), 7)]
    fn should_succeed(#[case] input: serde_json::Value, #[case] expected: i64) {
        assert_eq!(LongScalar.decode(input), Ok(NativeValue::Long(expected)));
    }

    #[rstest]
    #[case(json!(1.5))]
    #[case(json!(u64::MAX))]
    #[case(json!("12a"))]
    #[case(json!(true))]
    fn should_fail(#[case] input: serde_json::Value) {
        assert!(LongScalar.decode(input).is_err());
    }

    #[test]
    fn should_encode_as_number() {
        assert_eq!(LongScalar.normalize(json!("12")), Ok(json!(12)));
    }
}
