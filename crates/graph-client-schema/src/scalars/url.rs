use ::url::Url;

use super::{mismatch, NativeType, NativeValue, ScalarCodec};
use crate::ScalarError;

/// An absolute URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlScalar;

impl ScalarCodec for UrlScalar {
    fn name(&self) -> &str {
        "URL"
    }

    fn native_type(&self) -> NativeType {
        NativeType::Url
    }

    fn description(&self) -> Option<&str> {
        Some("An absolute URL, such as https://grafbase.com/docs.")
    }

    fn specified_by(&self) -> Option<&str> {
        Some("https://url.spec.whatwg.org/")
    }

    fn decode(&self, value: serde_json::Value) -> Result<NativeValue, ScalarError> {
        match value {
            serde_json::Value::String(url) => Url::parse(&url)
                .map(NativeValue::Url)
                .map_err(|e| ScalarError::new("URL", format!("could not parse '{url}': {e}"))),
            _ => Err(ScalarError::new("URL", "URLs should be provided as string")),
        }
    }

    fn encode(&self, value: &NativeValue) -> Result<serde_json::Value, ScalarError> {
        match value {
            NativeValue::Url(url) => Ok(serde_json::Value::String(url.to_string())),
            other => Err(mismatch(self, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_normalize() {
        assert_eq!(UrlScalar.normalize(json!("HTTPS://Example.com")), Ok(json!("https://example.com/")));
    }

    #[test]
    fn should_fail_relative() {
        assert!(UrlScalar.decode(json!("/graphql")).is_err());
    }
}
