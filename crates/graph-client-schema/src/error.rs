use thiserror::Error;

use crate::DirectiveLocations;

/// A request that cannot be matched against the schema.
///
/// Always a caller error, detected before any network I/O.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestPreparationError {
    /// returned if a type is not part of the field table
    #[error("the type '{0}' does not exist in the schema")]
    UnknownType(String),

    /// returned if no field, method or getter matches on the type or its supertypes
    #[error("could not find the field '{field}' on '{type_name}'")]
    UnknownField { type_name: String, field: String },

    /// returned if a field is selected as a scalar but is an object, or the other way around
    #[error("the field '{field}' on '{type_name}' {}", scalar_hint(.expected_scalar))]
    ScalarMismatch {
        type_name: String,
        field: String,
        expected_scalar: bool,
    },

    /// returned if an argument is not declared on the field
    #[error("the field '{field}' on '{type_name}' has no argument '{argument}'")]
    UnknownArgument {
        type_name: String,
        field: String,
        argument: String,
    },

    #[error("unknown directive '@{0}'")]
    UnknownDirective(String),

    #[error("the directive '@{directive}' is not allowed on {location}")]
    DirectiveLocation {
        directive: String,
        location: DirectiveLocations,
    },

    #[error("the directive '@{directive}' has no argument '{argument}'")]
    UnknownDirectiveArgument { directive: String, argument: String },

    #[error("the directive '@{directive}' requires the argument '{argument}'")]
    MissingDirectiveArgument { directive: String, argument: String },

    /// returned if the request text is not valid GraphQL
    #[error("could not parse the request: {0}")]
    Parse(String),

    #[error("{0} operations are not supported")]
    UnsupportedOperation(String),

    /// returned if a document contains no operation, or more than one
    #[error("the request must contain exactly one operation")]
    MissingOperation,

    #[error("unknown fragment '{0}'")]
    UnknownFragment(String),

    /// returned if a bind variable is nested in a list or object value
    #[error("the bind variable '{0}' must be used as a direct argument value")]
    MisplacedBindVariable(String),

    /// returned if a bind variable is used for arguments of different types
    #[error("the bind variable '{name}' is used both as '{first}' and as '{second}'")]
    ConflictingBindVariable {
        name: String,
        first: String,
        second: String,
    },

    /// returned if a schema document could not be turned into a field table
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

fn scalar_hint(expected_scalar: &bool) -> &'static str {
    if *expected_scalar {
        "is not a scalar and requires a sub-selection"
    } else {
        "is a scalar and cannot have a sub-selection"
    }
}

/// A value that does not fit a scalar's wire or native representation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid {scalar} value: {message}")]
pub struct ScalarError {
    pub scalar: String,
    pub message: String,
}

impl ScalarError {
    pub fn new(scalar: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scalar: scalar.into(),
            message: message.into(),
        }
    }
}
