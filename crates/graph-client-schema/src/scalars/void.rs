use super::{mismatch, NativeType, NativeValue, ScalarCodec};
use crate::ScalarError;

/// The result of fields that return nothing. Always `null` on the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidScalar;

impl ScalarCodec for VoidScalar {
    fn name(&self) -> &str {
        "Void"
    }

    fn native_type(&self) -> NativeType {
        NativeType::Void
    }

    fn decode(&self, value: serde_json::Value) -> Result<NativeValue, ScalarError> {
        match value {
            serde_json::Value::Null => Ok(NativeValue::Void),
            other => Err(ScalarError::new("Void", format!("expected null, got {other}"))),
        }
    }

    fn encode(&self, value: &NativeValue) -> Result<serde_json::Value, ScalarError> {
        match value {
            NativeValue::Void => Ok(serde_json::Value::Null),
            other => Err(mismatch(self, other)),
        }
    }
}
