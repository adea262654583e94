use super::{mismatch, NativeType, NativeValue, ScalarCodec};
use crate::ScalarError;

/// An International Standard Serial Number, `NNNN-NNNC`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssnScalar;

impl ScalarCodec for IssnScalar {
    fn name(&self) -> &str {
        "ISSN"
    }

    fn native_type(&self) -> NativeType {
        NativeType::String
    }

    fn description(&self) -> Option<&str> {
        Some("An International Standard Serial Number, such as 2049-3630.")
    }

    fn specified_by(&self) -> Option<&str> {
        Some("https://www.issn.org/understanding-the-issn/what-is-an-issn/")
    }

    fn decode(&self, value: serde_json::Value) -> Result<NativeValue, ScalarError> {
        match value {
            serde_json::Value::String(issn) => parse(&issn).map(NativeValue::String),
            _ => Err(ScalarError::new("ISSN", "ISSNs should be provided as string")),
        }
    }

    fn encode(&self, value: &NativeValue) -> Result<serde_json::Value, ScalarError> {
        match value {
            NativeValue::String(issn) => parse(issn).map(serde_json::Value::String),
            other => Err(mismatch(self, other)),
        }
    }
}

/// Checks the layout and the mod 11 check digit. A lower-case `x` check digit is upper-cased.
fn parse(issn: &str) -> Result<String, ScalarError> {
    let invalid = |reason: &str| ScalarError::new("ISSN", format!("'{issn}' {reason}"));

    let bytes = issn.as_bytes();
    if bytes.len() != 9 || bytes[4] != b'-' {
        return Err(invalid("is not of the form NNNN-NNNC"));
    }

    let digits = bytes[..4].iter().chain(&bytes[5..8]);
    let mut sum = 0;
    for (digit, weight) in digits.zip((2..=8).rev()) {
        if !digit.is_ascii_digit() {
            return Err(invalid("is not of the form NNNN-NNNC"));
        }
        sum += u32::from(digit - b'0') * weight;
    }

    let check = match bytes[8] {
        b'x' | b'X' => 10,
        digit if digit.is_ascii_digit() => u32::from(digit - b'0'),
        _ => return Err(invalid("is not of the form NNNN-NNNC")),
    };

    if (sum + check) % 11 != 0 {
        return Err(invalid("has an invalid check digit"));
    }

    Ok(issn.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case("0317-8471")]
    #[case("2049-3630")]
    #[case("0000-006X")]
    fn should_succeed(#[case] issn: &str) {
        assert_eq!(IssnScalar.decode(json!(issn)), Ok(NativeValue::String(issn.to_string())));
    }

    #[test]
    fn should_upper_case_check_digit() {
        assert_eq!(IssnScalar.normalize(json!("0000-006x")), Ok(json!("0000-006X")));
    }

    #[rstest]
    #[case("0317-8472")]
    #[case("03178471")]
    #[case("0317-84A1")]
    #[case("2049-36300")]
    fn should_fail(#[case] issn: &str) {
        assert!(IssnScalar.decode(json!(issn)).is_err());
    }

    #[test]
    fn should_report_check_digit() {
        let error = IssnScalar.decode(json!("0317-8472")).unwrap_err();
        assert_eq!(error.to_string(), "invalid ISSN value: '0317-8472' has an invalid check digit");
    }
}
