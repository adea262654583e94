//! Schema-side metadata of the GraphQL client: scalar codecs, directive descriptors and
//! the field table requests are validated against.

#![cfg_attr(test, allow(unused_crate_dependencies))]

mod directives;
mod error;
pub mod scalars;
mod sdl;
mod types;

pub use directives::{DirectiveArgument, DirectiveDescriptor, DirectiveLocations, DirectiveRegistry};
pub use error::{RequestPreparationError, ScalarError};
pub use scalars::{NativeType, NativeValue, ScalarCodec, ScalarRegistry, BUILTIN_SCALARS};
pub use types::{
    ArgumentDescriptor, FieldDescriptor, FieldShape, OperationKind, TypeBuilder, TypeDescriptor, TypeKind, TypeTable,
    TypeTableBuilder,
};
