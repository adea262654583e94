use std::fmt;

use indexmap::IndexMap;

use crate::RequestPreparationError;

bitflags::bitflags! {
    /// Where a directive may appear. A subset of
    /// https://spec.graphql.org/October2021/#sec-The-__Directive-Type
    #[derive(Default, PartialEq, Eq, Clone, Copy, Debug)]
    pub struct DirectiveLocations: u16 {
        const FIELD = 0b1 << 0;
        const FRAGMENT_SPREAD = 0b1 << 1;
        const INLINE_FRAGMENT = 0b1 << 2;
        const FIELD_DEFINITION = 0b1 << 3;
        const ENUM_VALUE = 0b1 << 4;
        const OBJECT = 0b1 << 5;
        const SCALAR = 0b1 << 6;
    }
}

impl fmt::Display for DirectiveLocations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut locations = self.iter().peekable();

        while let Some(location) = locations.next() {
            let name = match location {
                DirectiveLocations::FIELD => "FIELD",
                DirectiveLocations::FRAGMENT_SPREAD => "FRAGMENT_SPREAD",
                DirectiveLocations::INLINE_FRAGMENT => "INLINE_FRAGMENT",
                DirectiveLocations::FIELD_DEFINITION => "FIELD_DEFINITION",
                DirectiveLocations::ENUM_VALUE => "ENUM_VALUE",
                DirectiveLocations::OBJECT => "OBJECT",
                DirectiveLocations::SCALAR => "SCALAR",
                _ => "UNKNOWN",
            };

            f.write_str(name)?;

            if locations.peek().is_some() {
                f.write_str(" | ")?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveArgument {
    pub name: String,
    /// Named type, without list or non-null wrapping
    pub ty: String,
    pub required: bool,
    pub is_list: bool,
}

impl DirectiveArgument {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            required: false,
            is_list: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// The argument type in GraphQL notation, e.g. `[String!]!`.
    ///
    /// List items are non-null.
    pub fn type_ref(&self) -> String {
        let inner = if self.is_list {
            format!("[{}!]", self.ty)
        } else {
            self.ty.clone()
        };

        if self.required {
            format!("{inner}!")
        } else {
            inner
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveDescriptor {
    pub name: String,
    /// `graphql` for the directives of the GraphQL specification, `schema` for the ones
    /// declared by the API schema
    pub declaring_module: String,
    pub arguments: Vec<DirectiveArgument>,
    pub locations: DirectiveLocations,
}

impl DirectiveDescriptor {
    pub fn new(name: impl Into<String>, declaring_module: impl Into<String>, locations: DirectiveLocations) -> Self {
        Self {
            name: name.into(),
            declaring_module: declaring_module.into(),
            arguments: Vec::new(),
            locations,
        }
    }

    pub fn with_argument(mut self, argument: DirectiveArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn argument(&self, name: &str) -> Option<&DirectiveArgument> {
        self.arguments.iter().find(|argument| argument.name == name)
    }
}

/// Directive descriptors by name, consulted while preparing requests.
#[derive(Debug, Default, Clone)]
pub struct DirectiveRegistry {
    directives: IndexMap<String, DirectiveDescriptor>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh registry with the directives the client supports.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.add(
            DirectiveDescriptor::new(
                "skip",
                "graphql",
                DirectiveLocations::FIELD | DirectiveLocations::FRAGMENT_SPREAD | DirectiveLocations::INLINE_FRAGMENT,
            )
            .with_argument(DirectiveArgument::new("if", "Boolean").required()),
        );

        registry.add(
            DirectiveDescriptor::new(
                "include",
                "graphql",
                DirectiveLocations::FIELD | DirectiveLocations::FRAGMENT_SPREAD | DirectiveLocations::INLINE_FRAGMENT,
            )
            .with_argument(DirectiveArgument::new("if", "Boolean").required()),
        );

        registry.add(
            DirectiveDescriptor::new(
                "defer",
                "graphql",
                DirectiveLocations::FRAGMENT_SPREAD | DirectiveLocations::INLINE_FRAGMENT,
            )
            .with_argument(DirectiveArgument::new("if", "Boolean"))
            .with_argument(DirectiveArgument::new("label", "String")),
        );

        registry.add(
            DirectiveDescriptor::new(
                "deprecated",
                "graphql",
                DirectiveLocations::FIELD_DEFINITION | DirectiveLocations::ENUM_VALUE,
            )
            .with_argument(DirectiveArgument::new("reason", "String")),
        );

        registry.add(
            DirectiveDescriptor::new("specifiedBy", "graphql", DirectiveLocations::SCALAR)
                .with_argument(DirectiveArgument::new("url", "String").required()),
        );

        registry.add(
            DirectiveDescriptor::new(
                "auth",
                "schema",
                DirectiveLocations::OBJECT | DirectiveLocations::FIELD_DEFINITION,
            )
            .with_argument(DirectiveArgument::new("roles", "String").required().list()),
        );

        registry.add(
            DirectiveDescriptor::new(
                "label",
                "schema",
                DirectiveLocations::OBJECT | DirectiveLocations::FIELD_DEFINITION | DirectiveLocations::ENUM_VALUE,
            )
            .with_argument(DirectiveArgument::new("value", "String").required()),
        );

        tracing::debug!(directives = registry.directives.len(), "registered built-in directives");

        registry
    }

    /// Adds or replaces a descriptor.
    pub fn add(&mut self, directive: DirectiveDescriptor) {
        self.directives.insert(directive.name.clone(), directive);
    }

    pub fn get(&self, name: &str) -> Option<&DirectiveDescriptor> {
        self.directives.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectiveDescriptor> + '_ {
        self.directives.values()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Checks one use of a directive in a request: the directive exists, is allowed at
    /// `location`, and gets exactly its declared arguments with every required one present.
    pub fn validate_usage<'a>(
        &self,
        name: &str,
        location: DirectiveLocations,
        arguments: impl IntoIterator<Item = &'a str>,
    ) -> Result<&DirectiveDescriptor, RequestPreparationError> {
        let directive = self
            .get(name)
            .ok_or_else(|| RequestPreparationError::UnknownDirective(name.to_string()))?;

        if !directive.locations.contains(location) {
            return Err(RequestPreparationError::DirectiveLocation {
                directive: name.to_string(),
                location,
            });
        }

        let mut provided = Vec::new();
        for argument in arguments {
            if directive.argument(argument).is_none() {
                return Err(RequestPreparationError::UnknownDirectiveArgument {
                    directive: name.to_string(),
                    argument: argument.to_string(),
                });
            }
            provided.push(argument);
        }

        if let Some(missing) = directive
            .arguments
            .iter()
            .find(|argument| argument.required && !provided.contains(&argument.name.as_str()))
        {
            return Err(RequestPreparationError::MissingDirectiveArgument {
                directive: name.to_string(),
                argument: missing.name.clone(),
            });
        }

        Ok(directive)
    }
}
