use std::{fmt, fmt::Write, sync::Arc};

use chrono::{DateTime, FixedOffset, NaiveDate};
use indexmap::IndexMap;
use ::url::Url;

use crate::ScalarError;

mod country;
pub use country::CountryScalar;
mod date;
pub use date::DateScalar;
mod datetime;
pub use datetime::DateTimeScalar;
mod issn;
pub use issn::IssnScalar;
mod long;
pub use long::LongScalar;
mod uri;
pub use uri::UriScalar;
mod url;
pub use self::url::UrlScalar;
mod void;
pub use void::VoidScalar;

/// The scalars every GraphQL schema has, whether or not a codec is registered for them.
pub static BUILTIN_SCALARS: &[&str] = &["Boolean", "Float", "ID", "Int", "String"];

/// Type tag of a [`NativeValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    String,
    Date,
    DateTime,
    Long,
    Uri,
    Url,
    Void,
}

/// The decoded form of a custom scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Long(i64),
    Uri(http::Uri),
    Url(Url),
    Void,
}

impl NativeValue {
    pub fn native_type(&self) -> NativeType {
        match self {
            NativeValue::String(_) => NativeType::String,
            NativeValue::Date(_) => NativeType::Date,
            NativeValue::DateTime(_) => NativeType::DateTime,
            NativeValue::Long(_) => NativeType::Long,
            NativeValue::Uri(_) => NativeType::Uri,
            NativeValue::Url(_) => NativeType::Url,
            NativeValue::Void => NativeType::Void,
        }
    }
}

/// Encode/decode pair of a custom scalar, mapping wire JSON values to and from native values.
pub trait ScalarCodec: fmt::Debug + Send + Sync {
    /// Name of the scalar in the schema
    fn name(&self) -> &str;

    /// The variant of [`NativeValue`] produced by [`ScalarCodec::decode`]
    fn native_type(&self) -> NativeType;

    fn description(&self) -> Option<&str> {
        None
    }

    /// Url to describe the scalar if needed
    fn specified_by(&self) -> Option<&str> {
        None
    }

    /// Wire value to native value.
    fn decode(&self, value: serde_json::Value) -> Result<NativeValue, ScalarError>;

    /// Native value to wire value. Fails if the value is not of [`ScalarCodec::native_type`].
    fn encode(&self, value: &NativeValue) -> Result<serde_json::Value, ScalarError>;

    /// Decode then re-encode a wire value, producing its canonical wire form.
    fn normalize(&self, value: serde_json::Value) -> Result<serde_json::Value, ScalarError> {
        let native = self.decode(value)?;
        self.encode(&native)
    }

    /// Write the scalar into SDL
    fn sdl(&self) -> String {
        let mut sdl = String::new();
        if let Some(desc) = self.description() {
            writeln!(sdl, "\"\"\"\n{desc}\n\"\"\"").ok();
        }
        let directive = self
            .specified_by()
            .map(|url| format!(" @specifiedBy(url: \"{url}\")"))
            .unwrap_or_default();
        writeln!(sdl, "scalar {}{directive}", self.name()).ok();
        sdl
    }
}

fn mismatch(codec: &dyn ScalarCodec, value: &NativeValue) -> ScalarError {
    ScalarError::new(
        codec.name(),
        format!("expected a {:?} value, got {:?}", codec.native_type(), value.native_type()),
    )
}

/// Scalar codecs by schema name.
///
/// Owned by the caller, built once at start-up and shared read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct ScalarRegistry {
    codecs: IndexMap<String, Arc<dyn ScalarCodec>>,
}

impl ScalarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in codecs.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.init_builtins();
        registry
    }

    /// Registers the built-in codecs. Calling it again is a no-op.
    pub fn init_builtins(&mut self) {
        let registered = [
            self.register("ID", LongScalar),
            self.register("Country", CountryScalar),
            self.register("Date", DateScalar),
            self.register("DateTime", DateTimeScalar),
            self.register("ISSN", IssnScalar),
            self.register("Long", LongScalar),
            self.register("URI", UriScalar),
            self.register("URL", UrlScalar),
            self.register("Void", VoidScalar),
        ];

        if registered.iter().any(|registered| *registered) {
            tracing::debug!(scalars = self.codecs.len(), "registered built-in scalar codecs");
        }
    }

    /// Registers `codec` under `name`. Returns `false`, leaving the registry untouched,
    /// if the name is already taken.
    pub fn register(&mut self, name: impl Into<String>, codec: impl ScalarCodec + 'static) -> bool {
        let name = name.into();
        if self.codecs.contains_key(&name) {
            return false;
        }

        self.codecs.insert(name, Arc::new(codec));
        true
    }

    pub fn get(&self, name: &str) -> Option<&dyn ScalarCodec> {
        self.codecs.get(name).map(|codec| &**codec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    /// Whether `name` is a scalar: built into GraphQL or backed by a codec.
    pub fn is_scalar(&self, name: &str) -> bool {
        BUILTIN_SCALARS.contains(&name) || self.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.codecs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}
