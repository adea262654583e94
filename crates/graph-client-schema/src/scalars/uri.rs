use super::{mismatch, NativeType, NativeValue, ScalarCodec};
use crate::ScalarError;

/// An RFC 3986 URI reference, relative references included.
#[derive(Debug, Clone, Copy, Default)]
pub struct UriScalar;

impl ScalarCodec for UriScalar {
    fn name(&self) -> &str {
        "URI"
    }

    fn native_type(&self) -> NativeType {
        NativeType::Uri
    }

    fn specified_by(&self) -> Option<&str> {
        Some("https://tools.ietf.org/html/rfc3986")
    }

    fn decode(&self, value: serde_json::Value) -> Result<NativeValue, ScalarError> {
        match value {
            serde_json::Value::String(uri) => uri
                .parse::<http::Uri>()
                .map(NativeValue::Uri)
                .map_err(|e| ScalarError::new("URI", format!("could not parse '{uri}': {e}"))),
            _ => Err(ScalarError::new("URI", "URIs should be provided as string")),
        }
    }

    fn encode(&self, value: &NativeValue) -> Result<serde_json::Value, ScalarError> {
        match value {
            NativeValue::Uri(uri) => Ok(serde_json::Value::String(uri.to_string())),
            other => Err(mismatch(self, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_accept_relative_references() {
        assert_eq!(UriScalar.normalize(json!("/graphql?x=1")), Ok(json!("/graphql?x=1")));
    }

    #[test]
    fn should_fail_with_spaces() {
        assert!(UriScalar.decode(json!("not a uri")).is_err());
    }
}
