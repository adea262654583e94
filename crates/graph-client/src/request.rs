//! Turns partial or complete GraphQL operations into validated, reusable requests.
//!
//! Requests may carry bind placeholders in argument position: `?name` for an optional value
//! and `&name` for a mandatory one. Both become the GraphQL variable `$name`, declared with
//! the type of the argument they are bound to.

use std::{collections::HashMap, sync::Arc};

use async_graphql_parser::{
    parse_query,
    types::{
        Directive, DocumentOperations, ExecutableDocument, Field, FragmentDefinition, OperationDefinition,
        OperationType, Selection, SelectionSet,
    },
    Pos, Positioned,
};
use async_graphql_value::{Name, Value};
use graph_client_schema::{
    DirectiveLocations, DirectiveRegistry, OperationKind, RequestPreparationError, ScalarCodec, ScalarError,
    ScalarRegistry, TypeTable,
};
use indexmap::IndexMap;

use crate::errors::RequestExecutionError;

/// The schema metadata requests are prepared against.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub types: Arc<TypeTable>,
    pub scalars: Arc<ScalarRegistry>,
    pub directives: Arc<DirectiveRegistry>,
}

impl RequestContext {
    /// A context with the built-in scalars and directives.
    pub fn new(types: TypeTable) -> Self {
        Self::with_registries(
            types,
            Arc::new(ScalarRegistry::with_builtins()),
            Arc::new(DirectiveRegistry::builtin()),
        )
    }

    pub fn with_registries(types: TypeTable, scalars: Arc<ScalarRegistry>, directives: Arc<DirectiveRegistry>) -> Self {
        Self {
            types: Arc::new(types),
            scalars,
            directives,
        }
    }
}

/// Values for the bind variables of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindValues {
    values: IndexMap<String, serde_json::Value>,
}

impl BindValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Binds any serializable value, e.g. an input object.
    pub fn insert_serialized(
        &mut self,
        name: impl Into<String>,
        value: &impl serde::Serialize,
    ) -> Result<(), serde_json::Error> {
        self.values.insert(name.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for BindValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindVariable {
    pub name: String,
    /// GraphQL type of the variable, e.g. `[ID!]!`
    pub ty: String,
    pub mandatory: bool,
}

/// Where custom scalars sit in a response, keyed by response key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseShape {
    fields: IndexMap<String, ShapeNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ShapeNode {
    /// Scalar type of a leaf, when a codec exists for it
    scalar: Option<String>,
    children: ResponseShape,
}

impl ResponseShape {
    fn leaf(&mut self, key: &str, scalar: Option<String>) {
        let node = self.fields.entry(key.to_string()).or_default();
        if node.scalar.is_none() {
            node.scalar = scalar;
        }
    }

    fn object(&mut self, key: &str) -> &mut ResponseShape {
        &mut self.fields.entry(key.to_string()).or_default().children
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Rewrites every custom scalar of `value` into its canonical wire form.
    pub fn normalize(&self, value: &mut serde_json::Value, scalars: &ScalarRegistry) -> Result<(), ScalarError> {
        match value {
            serde_json::Value::Object(object) => {
                for (key, node) in &self.fields {
                    if let Some(value) = object.get_mut(key) {
                        node.normalize(value, scalars)?;
                    }
                }
                Ok(())
            }
            serde_json::Value::Array(items) => items.iter_mut().try_for_each(|item| self.normalize(item, scalars)),
            _ => Ok(()),
        }
    }
}

impl ShapeNode {
    fn normalize(&self, value: &mut serde_json::Value, scalars: &ScalarRegistry) -> Result<(), ScalarError> {
        match self.scalar.as_deref().and_then(|scalar| scalars.get(scalar)) {
            Some(codec) => normalize_scalar(codec, value),
            None => self.children.normalize(value, scalars),
        }
    }
}

fn normalize_scalar(codec: &dyn ScalarCodec, value: &mut serde_json::Value) -> Result<(), ScalarError> {
    match value {
        serde_json::Value::Null => Ok(()),
        serde_json::Value::Array(items) => items.iter_mut().try_for_each(|item| normalize_scalar(codec, item)),
        value => {
            *value = codec.normalize(value.take())?;
            Ok(())
        }
    }
}

/// A validated operation, ready to be executed any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    operation: OperationKind,
    document: String,
    root_field: Option<String>,
    variables: Vec<BindVariable>,
    shape: ResponseShape,
}

impl PreparedRequest {
    /// Prepares the root field `field` of `operation` with the selection set `partial`, which
    /// is empty for scalar fields.
    ///
    /// The arguments of the root field are bound to the bind variables of the same name,
    /// mandatory when the argument is non-null.
    pub fn partial(
        ctx: &RequestContext,
        operation: OperationKind,
        field: &str,
        partial: &str,
    ) -> Result<Self, RequestPreparationError> {
        let root = ctx
            .types
            .root(operation)
            .ok_or_else(|| RequestPreparationError::UnsupportedOperation(operation.keyword().to_string()))?;

        let descriptor = ctx.types.resolve_schema_field(&root.name, field, None)?;
        let (selection, mut placeholders) = rewrite_placeholders(partial);

        let arguments = descriptor
            .arguments
            .iter()
            .map(|argument| format!("{0}: ${0}", argument.name))
            .collect::<Vec<_>>();

        let mut source = format!("{} {{ {}", operation.keyword(), descriptor.name);
        if !arguments.is_empty() {
            source.push('(');
            source.push_str(&arguments.join(", "));
            source.push(')');
        }
        let selection = selection.trim();
        if !selection.is_empty() {
            source.push(' ');
            source.push_str(selection);
        }
        // a trailing comment runs to the end of its line
        if selection.lines().last().is_some_and(|line| line.contains('#')) {
            source.push_str("\n}");
        } else {
            source.push_str(" }");
        }

        for argument in &descriptor.arguments {
            let mandatory = argument.ty.ends_with('!');
            *placeholders.entry(argument.name.clone()).or_default() |= mandatory;
        }

        Self::build(ctx, &source, Some(descriptor.name.clone()), &placeholders)
    }

    /// Prepares a complete `query` or `mutation` document. A document starting with `{` is a query.
    pub fn full(ctx: &RequestContext, document: &str) -> Result<Self, RequestPreparationError> {
        let (source, placeholders) = rewrite_placeholders(document);

        Self::build(ctx, &source, None, &placeholders)
    }

    fn build(
        ctx: &RequestContext,
        source: &str,
        root_field: Option<String>,
        placeholders: &IndexMap<String, bool>,
    ) -> Result<Self, RequestPreparationError> {
        let document = parse_query(source).map_err(|error| RequestPreparationError::Parse(error.to_string()))?;
        let (name, operation) = single_operation(&document)?;

        let kind = match operation.node.ty {
            OperationType::Query => OperationKind::Query,
            OperationType::Mutation => OperationKind::Mutation,
            OperationType::Subscription => {
                return Err(RequestPreparationError::UnsupportedOperation("subscription".to_string()))
            }
        };

        if !operation.node.directives.is_empty() {
            return Err(RequestPreparationError::UnsupportedOperation(format!(
                "directives on {}",
                kind.keyword()
            )));
        }

        let root = ctx
            .types
            .root(kind)
            .ok_or_else(|| RequestPreparationError::UnsupportedOperation(kind.keyword().to_string()))?;

        let declared = operation
            .node
            .variable_definitions
            .iter()
            .map(|definition| {
                (
                    definition.node.name.node.to_string(),
                    definition.node.var_type.node.to_string(),
                )
            })
            .collect::<IndexMap<_, _>>();

        let mut validator = Validator {
            ctx,
            fragments: &document.fragments,
            declared: &declared,
            usages: IndexMap::new(),
            spreading: Vec::new(),
        };

        let mut shape = ResponseShape::default();
        validator.selection_set(&root.name, &operation.node.selection_set.node, &mut shape)?;

        let mandatory = |name: &str| placeholders.get(name).copied().unwrap_or_default();

        let variables = declared
            .iter()
            .chain(validator.usages.iter())
            .map(|(name, ty)| BindVariable {
                name: name.clone(),
                ty: ty.clone(),
                mandatory: mandatory(name),
            })
            .collect::<Vec<_>>();

        let document = render(source, name, kind, operation, &variables)?;

        tracing::debug!(
            operation = kind.keyword(),
            root_field = root_field.as_deref(),
            variables = variables.len(),
            "prepared request"
        );

        Ok(Self {
            operation: kind,
            document,
            root_field,
            variables,
            shape,
        })
    }

    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    /// The document sent to the server.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// The root field of a partial request, whose value is the result of the request.
    pub fn root_field(&self) -> Option<&str> {
        self.root_field.as_deref()
    }

    pub fn variables(&self) -> &[BindVariable] {
        &self.variables
    }

    pub fn shape(&self) -> &ResponseShape {
        &self.shape
    }

    /// The `variables` object of the request: bound values in their canonical wire form.
    pub fn encode_variables(
        &self,
        bind: &BindValues,
        scalars: &ScalarRegistry,
    ) -> Result<serde_json::Map<String, serde_json::Value>, RequestExecutionError> {
        let mut encoded = serde_json::Map::new();

        for variable in &self.variables {
            let Some(value) = bind.get(&variable.name) else {
                if variable.mandatory {
                    return Err(RequestExecutionError::MissingBindVariable(variable.name.clone()));
                }
                continue;
            };

            let mut value = value.clone();
            if let Some(codec) = scalars.get(named_type(&variable.ty)) {
                normalize_scalar(codec, &mut value).map_err(|source| RequestExecutionError::InvalidBindValue {
                    name: variable.name.clone(),
                    source,
                })?;
            }

            encoded.insert(variable.name.clone(), value);
        }

        if encoded.len() < bind.len() {
            tracing::debug!(
                ignored = bind.len() - encoded.len(),
                "some bind values match no variable of the request"
            );
        }

        Ok(encoded)
    }
}

fn single_operation(
    document: &ExecutableDocument,
) -> Result<(Option<&Name>, &Positioned<OperationDefinition>), RequestPreparationError> {
    match &document.operations {
        DocumentOperations::Single(operation) => Ok((None, operation)),
        DocumentOperations::Multiple(operations) if operations.len() == 1 => operations
            .iter()
            .next()
            .map(|(name, operation)| (Some(name), operation))
            .ok_or(RequestPreparationError::MissingOperation),
        DocumentOperations::Multiple(_) => Err(RequestPreparationError::MissingOperation),
    }
}

struct Validator<'a> {
    ctx: &'a RequestContext,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    /// Variables declared in the operation header
    declared: &'a IndexMap<String, String>,
    /// Undeclared variables, with the type of the first argument they are bound to
    usages: IndexMap<String, String>,
    /// Fragments being expanded, to stop on cycles
    spreading: Vec<&'a str>,
}

impl<'a> Validator<'a> {
    fn selection_set(
        &mut self,
        type_name: &str,
        selection_set: &'a SelectionSet,
        shape: &mut ResponseShape,
    ) -> Result<(), RequestPreparationError> {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => self.field(type_name, &field.node, shape)?,
                Selection::InlineFragment(fragment) => {
                    self.directives(&fragment.node.directives, DirectiveLocations::INLINE_FRAGMENT)?;

                    let type_name = match &fragment.node.type_condition {
                        Some(condition) => self.type_condition(&condition.node.on.node)?,
                        None => type_name,
                    };

                    self.selection_set(type_name, &fragment.node.selection_set.node, shape)?;
                }
                Selection::FragmentSpread(spread) => {
                    self.directives(&spread.node.directives, DirectiveLocations::FRAGMENT_SPREAD)?;

                    let name = spread.node.fragment_name.node.as_str();
                    let fragment = self
                        .fragments
                        .get(name)
                        .ok_or_else(|| RequestPreparationError::UnknownFragment(name.to_string()))?;

                    if self.spreading.contains(&name) {
                        continue;
                    }

                    let type_name = self.type_condition(&fragment.node.type_condition.node.on.node)?;

                    self.spreading.push(name);
                    let result = self.selection_set(type_name, &fragment.node.selection_set.node, shape);
                    self.spreading.pop();
                    result?;
                }
            }
        }

        Ok(())
    }

    fn type_condition<'n>(&self, name: &'n Name) -> Result<&'n str, RequestPreparationError> {
        match self.ctx.types.get(name.as_str()) {
            Some(_) => Ok(name.as_str()),
            None => Err(RequestPreparationError::UnknownType(name.to_string())),
        }
    }

    fn field(&mut self, type_name: &str, field: &'a Field, shape: &mut ResponseShape) -> Result<(), RequestPreparationError> {
        let ctx = self.ctx;
        let name = field.name.node.as_str();
        let key = field.response_key().node.as_str();
        let has_selection = !field.selection_set.node.items.is_empty();

        self.directives(&field.directives, DirectiveLocations::FIELD)?;

        if name == "__typename" {
            if let Some((argument, _)) = field.arguments.first() {
                return Err(RequestPreparationError::UnknownArgument {
                    type_name: type_name.to_string(),
                    field: name.to_string(),
                    argument: argument.node.to_string(),
                });
            }
            if has_selection {
                return Err(RequestPreparationError::ScalarMismatch {
                    type_name: type_name.to_string(),
                    field: name.to_string(),
                    expected_scalar: false,
                });
            }

            shape.leaf(key, None);
            return Ok(());
        }

        let descriptor = ctx.types.resolve_schema_field(type_name, name, Some(!has_selection))?;

        for (argument, value) in &field.arguments {
            let declared =
                descriptor
                    .argument(argument.node.as_str())
                    .ok_or_else(|| RequestPreparationError::UnknownArgument {
                        type_name: type_name.to_string(),
                        field: name.to_string(),
                        argument: argument.node.to_string(),
                    })?;

            self.argument(&value.node, &declared.ty)?;
        }

        if has_selection {
            self.selection_set(&descriptor.type_name, &field.selection_set.node, shape.object(key))
        } else {
            let scalar = ctx
                .scalars
                .contains(&descriptor.type_name)
                .then(|| descriptor.type_name.clone());

            shape.leaf(key, scalar);
            Ok(())
        }
    }

    fn directives(
        &mut self,
        directives: &'a [Positioned<Directive>],
        location: DirectiveLocations,
    ) -> Result<(), RequestPreparationError> {
        let ctx = self.ctx;

        for directive in directives {
            let descriptor = ctx.directives.validate_usage(
                directive.node.name.node.as_str(),
                location,
                directive.node.arguments.iter().map(|(name, _)| name.node.as_str()),
            )?;

            for (name, value) in &directive.node.arguments {
                if let Some(argument) = descriptor.argument(name.node.as_str()) {
                    self.argument(&value.node, &argument.type_ref())?;
                }
            }
        }

        Ok(())
    }

    /// Records the variable bound to an argument of type `ty`.
    fn argument(&mut self, value: &Value, ty: &str) -> Result<(), RequestPreparationError> {
        match value {
            Value::Variable(name) => self.bind(name, ty),
            Value::List(items) => items.iter().try_for_each(|item| self.nested(item)),
            Value::Object(fields) => fields.values().try_for_each(|field| self.nested(field)),
            _ => Ok(()),
        }
    }

    /// Nested variables carry no argument type, so they must be declared by the operation.
    fn nested(&self, value: &Value) -> Result<(), RequestPreparationError> {
        match value {
            Value::Variable(name) if self.declared.contains_key(name.as_str()) => Ok(()),
            Value::Variable(name) => Err(RequestPreparationError::MisplacedBindVariable(name.to_string())),
            Value::List(items) => items.iter().try_for_each(|item| self.nested(item)),
            Value::Object(fields) => fields.values().try_for_each(|field| self.nested(field)),
            _ => Ok(()),
        }
    }

    fn bind(&mut self, name: &Name, ty: &str) -> Result<(), RequestPreparationError> {
        if self.declared.contains_key(name.as_str()) {
            return Ok(());
        }

        match self.usages.get_mut(name.as_str()) {
            None => {
                self.usages.insert(name.to_string(), ty.to_string());
                Ok(())
            }
            Some(first) if nullable(first.as_str()) == nullable(ty) => {
                // a non-null variable fits nullable positions too
                if ty.ends_with('!') {
                    *first = ty.to_string();
                }
                Ok(())
            }
            Some(first) => Err(RequestPreparationError::ConflictingBindVariable {
                name: name.to_string(),
                first: first.clone(),
                second: ty.to_string(),
            }),
        }
    }
}

fn nullable(ty: &str) -> &str {
    ty.strip_suffix('!').unwrap_or(ty)
}

/// `[ID!]!` to `ID`.
fn named_type(ty: &str) -> &str {
    ty.trim_matches(|c| matches!(c, '[' | ']' | '!'))
}

/// Rewrites `?name` and `&name` into `$name`, outside of strings and comments.
///
/// Returns the rewritten text and, per placeholder name, whether any use of it is mandatory.
fn rewrite_placeholders(source: &str) -> (String, IndexMap<String, bool>) {
    let chars = source.chars().collect::<Vec<_>>();
    let mut rewritten = String::with_capacity(source.len());
    let mut placeholders: IndexMap<String, bool> = IndexMap::new();
    let mut index = 0;

    while index < chars.len() {
        let current = chars[index];

        match current {
            '#' => {
                while index < chars.len() && chars[index] != '\n' {
                    rewritten.push(chars[index]);
                    index += 1;
                }
                continue;
            }
            '"' if chars[index..].starts_with(&['"', '"', '"']) => {
                rewritten.push_str("\"\"\"");
                index += 3;

                while index < chars.len() {
                    if chars[index..].starts_with(&['\\', '"', '"', '"']) {
                        rewritten.push_str("\\\"\"\"");
                        index += 4;
                    } else if chars[index..].starts_with(&['"', '"', '"']) {
                        rewritten.push_str("\"\"\"");
                        index += 3;
                        break;
                    } else {
                        rewritten.push(chars[index]);
                        index += 1;
                    }
                }
                continue;
            }
            '"' => {
                rewritten.push('"');
                index += 1;

                while index < chars.len() {
                    let c = chars[index];
                    rewritten.push(c);
                    index += 1;

                    match c {
                        '\\' if index < chars.len() => {
                            rewritten.push(chars[index]);
                            index += 1;
                        }
                        '"' | '\n' => break,
                        _ => {}
                    }
                }
                continue;
            }
            '?' | '&' if chars.get(index + 1).is_some_and(|c| c.is_ascii_alphabetic() || *c == '_') => {
                let start = index + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }

                let name = chars[start..end].iter().collect::<String>();
                *placeholders.entry(name.clone()).or_default() |= current == '&';

                rewritten.push('$');
                rewritten.push_str(&name);
                index = end;
                continue;
            }
            _ => {}
        }

        rewritten.push(current);
        index += 1;
    }

    (rewritten, placeholders)
}

/// The document sent to the server: `source` with the operation header redeclared to cover
/// every variable.
fn render(
    source: &str,
    name: Option<&Name>,
    kind: OperationKind,
    operation: &Positioned<OperationDefinition>,
    variables: &[BindVariable],
) -> Result<String, RequestPreparationError> {
    let locate = |pos: Pos| {
        offset(source, pos)
            .ok_or_else(|| RequestPreparationError::Parse(format!("could not locate line {} column {}", pos.line, pos.column)))
    };

    let start = locate(operation.pos)?;
    let body = locate(operation.node.selection_set.pos)?;

    let defaults = operation
        .node
        .variable_definitions
        .iter()
        .filter_map(|definition| {
            definition
                .node
                .default_value
                .as_ref()
                .map(|value| (definition.node.name.node.as_str(), value.node.to_string()))
        })
        .collect::<HashMap<_, _>>();

    let mut header = kind.keyword().to_string();
    if let Some(name) = name {
        header.push(' ');
        header.push_str(name.as_str());
    }

    if !variables.is_empty() {
        let definitions = variables
            .iter()
            .map(|variable| match defaults.get(variable.name.as_str()) {
                Some(default) => format!("${}: {} = {default}", variable.name, variable.ty),
                None => format!("${}: {}", variable.name, variable.ty),
            })
            .collect::<Vec<_>>();

        header.push('(');
        header.push_str(&definitions.join(", "));
        header.push(')');
    }

    Ok(format!("{}{header} {}", &source[..start], &source[body..]))
}

/// Byte offset of a parser position.
fn offset(source: &str, pos: Pos) -> Option<usize> {
    let (mut line, mut column) = (1, 1);

    for (index, c) in source.char_indices() {
        if line == pos.line && column == pos.column {
            return Some(index);
        }

        match c {
            '\n' => {
                line += 1;
                column = 1;
            }
            '\r' => column = 1,
            _ => column += 1,
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use graph_client_schema::FieldDescriptor;
    use indoc::indoc;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn context() -> RequestContext {
        let types = TypeTable::builder()
            .interface("Tracked")
            .field(FieldDescriptor::scalar("createdAt", "DateTime"))
            .field(FieldDescriptor::object("createdBy", "User"))
            .done()
            .object("Book")
            .extends("Tracked")
            .field(FieldDescriptor::scalar("id", "ID").non_null())
            .field(FieldDescriptor::scalar("title", "String").non_null())
            .field(FieldDescriptor::scalar("issn", "ISSN"))
            .field(FieldDescriptor::scalar("published", "Date"))
            .field(
                FieldDescriptor::scalar("tags", "String")
                    .list()
                    .with_argument("first", "Int"),
            )
            .done()
            .object("User")
            .field(FieldDescriptor::scalar("id", "ID").non_null())
            .field(FieldDescriptor::scalar("username", "String"))
            .done()
            .root("Query", OperationKind::Query)
            .method(
                FieldDescriptor::object("books", "Book")
                    .list()
                    .with_argument("first", "Int")
                    .with_argument("publishedAfter", "Date"),
            )
            .method(FieldDescriptor::object("book", "Book").with_argument("id", "ID!"))
            .method(FieldDescriptor::scalar("bookCount", "Long"))
            .done()
            .root("Mutation", OperationKind::Mutation)
            .method(FieldDescriptor::scalar("deleteBook", "Void").with_argument("id", "ID!"))
            .build()
            .unwrap();

        RequestContext::new(types)
    }

    #[test]
    fn partial_request_binds_root_arguments() {
        let ctx = context();

        let request = PreparedRequest::partial(&ctx, OperationKind::Query, "book", "{ id title createdBy { username } }")
            .unwrap();

        insta::assert_snapshot!(request.document(), @"query($id: ID!) { book(id: $id) { id title createdBy { username } } }");
        assert_eq!(request.root_field(), Some("book"));
        assert_eq!(
            request.variables(),
            [BindVariable {
                name: "id".to_string(),
                ty: "ID!".to_string(),
                mandatory: true,
            }]
        );
    }

    #[test]
    fn partial_request_of_a_scalar_field() {
        let ctx = context();

        let request = PreparedRequest::partial(&ctx, OperationKind::Mutation, "deleteBook", "").unwrap();

        insta::assert_snapshot!(request.document(), @"mutation($id: ID!) { deleteBook(id: $id) }");
    }

    #[test]
    fn partial_request_ending_with_a_comment() {
        let ctx = context();

        let request = PreparedRequest::partial(&ctx, OperationKind::Query, "book", "{ id } # only the id").unwrap();

        assert_eq!(request.document(), "query($id: ID!) { book(id: $id) { id } # only the id\n}");
    }

    #[test]
    fn optional_root_arguments() {
        let ctx = context();

        let request = PreparedRequest::partial(&ctx, OperationKind::Query, "books", "{ title tags(first: ?tagCount) }")
            .unwrap();

        insta::assert_snapshot!(
            request.document(),
            @"query($first: Int, $publishedAfter: Date, $tagCount: Int) { books(first: $first, publishedAfter: $publishedAfter) { title tags(first: $tagCount) } }"
        );
        assert!(request.variables().iter().all(|variable| !variable.mandatory));
    }

    #[test]
    fn placeholders_in_full_documents() {
        let ctx = context();

        let request = PreparedRequest::full(
            &ctx,
            indoc! {r#"
                query Shelf {
                    books(first: &first, publishedAfter: ?after) {
                        title
                        tags(first: 3) @include(if: ?withTags)
                    }
                }
            "#},
        )
        .unwrap();

        insta::assert_snapshot!(request.document(), @r###"
        query Shelf($first: Int, $after: Date, $withTags: Boolean!) {
            books(first: $first, publishedAfter: $after) {
                title
                tags(first: 3) @include(if: $withTags)
            }
        }
        "###);

        let mandatory = request
            .variables()
            .iter()
            .filter(|variable| variable.mandatory)
            .map(|variable| variable.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(mandatory, ["first"]);
    }

    #[test]
    fn strings_and_comments_are_left_alone() {
        let (rewritten, placeholders) = rewrite_placeholders(indoc! {r#"
            # who wrote ?this
            { search(text: "a & b ?c", mode: ?mode, raw: """?x""") }
        "#});

        assert_eq!(
            rewritten,
            "# who wrote ?this\n{ search(text: \"a & b ?c\", mode: $mode, raw: \"\"\"?x\"\"\") }\n"
        );
        assert_eq!(placeholders.into_iter().collect::<Vec<_>>(), [("mode".to_string(), false)]);
    }

    #[test]
    fn declared_variables_are_kept() {
        let ctx = context();

        let request = PreparedRequest::full(&ctx, "query($first: Int = 10) { books(first: $first) { id } }").unwrap();

        insta::assert_snapshot!(request.document(), @"query($first: Int = 10) { books(first: $first) { id } }");
        assert!(!request.variables()[0].mandatory);
    }

    #[test]
    fn shorthand_queries() {
        let ctx = context();

        let request = PreparedRequest::full(&ctx, "{ bookCount }").unwrap();

        assert_eq!(request.operation(), OperationKind::Query);
        assert_eq!(request.document(), "query { bookCount }");
        assert_eq!(request.root_field(), None);
    }

    #[test]
    fn fragments_are_validated_where_spread() {
        let ctx = context();

        let request = PreparedRequest::full(
            &ctx,
            indoc! {r#"
                fragment Audit on Tracked { createdAt createdBy { id } }

                query {
                    books { __typename ...Audit ... on Book { published } }
                }
            "#},
        )
        .unwrap();

        assert!(request.document().starts_with("fragment Audit on Tracked"));

        let error = PreparedRequest::full(
            &ctx,
            "fragment Broken on Book { pages } query { books { ...Broken } }",
        )
        .unwrap_err();
        assert_eq!(error.to_string(), "could not find the field 'pages' on 'Book'");
    }

    #[test]
    fn recursive_fragments_terminate() {
        let ctx = context();

        let request = PreparedRequest::full(
            &ctx,
            "fragment A on Book { title ...B } fragment B on Book { id ...A } query { books { ...A } }",
        );

        assert!(request.is_ok());
    }

    #[rstest]
    #[case::unknown_field("{ books { pages } }", "could not find the field 'pages' on 'Book'")]
    #[case::object_without_selection("{ books }", "the field 'books' on 'Query' is not a scalar and requires a sub-selection")]
    #[case::scalar_with_selection("{ bookCount { id } }", "the field 'bookCount' on 'Query' is a scalar and cannot have a sub-selection")]
    #[case::unknown_argument("{ books(last: 3) { id } }", "the field 'books' on 'Query' has no argument 'last'")]
    #[case::defer_on_field("{ books { title @defer } }", "the directive '@defer' is not allowed on FIELD")]
    #[case::unknown_directive("{ books { title @cached } }", "unknown directive '@cached'")]
    #[case::missing_directive_argument("{ books { title @skip } }", "the directive '@skip' requires the argument 'if'")]
    #[case::unknown_fragment("{ books { ...Missing } }", "unknown fragment 'Missing'")]
    #[case::unknown_type("{ books { ... on Magazine { id } } }", "the type 'Magazine' does not exist in the schema")]
    #[case::subscription("subscription { books { id } }", "subscription operations are not supported")]
    #[case::two_operations("query A { bookCount } query B { bookCount }", "the request must contain exactly one operation")]
    #[case::nested_placeholder("{ books(first: [?n]) { id } }", "the bind variable 'n' must be used as a direct argument value")]
    #[case::conflicting_placeholder(
        "{ books(first: ?n) { tags(first: ?n) } book(id: ?n) { id } }",
        "the bind variable 'n' is used both as 'Int' and as 'ID!'"
    )]
    fn invalid_requests(#[case] document: &str, #[case] message: &str) {
        let ctx = context();

        let error = PreparedRequest::full(&ctx, document).unwrap_err();
        assert_eq!(error.to_string(), message);
    }

    #[test]
    fn deferred_fragments() {
        let ctx = context();

        let request = PreparedRequest::full(&ctx, "{ books { id ... @defer(label: \"slow\") { tags } } }");

        assert!(request.is_ok());
    }

    #[test]
    fn parse_errors() {
        let ctx = context();

        let error = PreparedRequest::full(&ctx, "{ books { id }").unwrap_err();
        assert!(matches!(error, RequestPreparationError::Parse(_)));
    }

    #[test]
    fn bind_values_are_normalized() {
        let ctx = context();
        let request = PreparedRequest::partial(&ctx, OperationKind::Query, "books", "{ id }").unwrap();

        let bind = BindValues::new().with("first", 10).with("publishedAfter", "2024-02-29");
        let variables = request.encode_variables(&bind, &ctx.scalars).unwrap();
        assert_eq!(
            serde_json::Value::Object(variables),
            json!({ "first": 10, "publishedAfter": "2024-02-29" })
        );

        let bind = BindValues::new().with("publishedAfter", "2023-02-29");
        let error = request.encode_variables(&bind, &ctx.scalars).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid value for the bind variable 'publishedAfter': invalid Date value: could not parse date: input is out of range"
        );
    }

    #[test]
    fn mandatory_bind_values() {
        let ctx = context();
        let request = PreparedRequest::partial(&ctx, OperationKind::Query, "book", "{ id }").unwrap();

        let error = request.encode_variables(&BindValues::new(), &ctx.scalars).unwrap_err();
        assert_eq!(error.to_string(), "the mandatory bind variable 'id' has no value");

        let variables = request
            .encode_variables(&BindValues::new().with("id", "7").with("unused", true), &ctx.scalars)
            .unwrap();
        assert_eq!(serde_json::Value::Object(variables), json!({ "id": 7 }));
    }

    #[test]
    fn response_scalars_are_normalized() {
        let ctx = context();
        let request = PreparedRequest::full(
            &ctx,
            "{ books { id issn published latest: createdAt createdBy { id } } bookCount }",
        )
        .unwrap();

        let mut data = json!({
            "books": [
                {
                    "id": "1",
                    "issn": "1050-124x",
                    "published": "2024-02-29",
                    "latest": "2024-02-29T10:00:00.000+00:00",
                    "createdBy": { "id": "12" }
                },
                { "id": 2, "issn": null, "published": null, "latest": null, "createdBy": null }
            ],
            "bookCount": "9007199254740993"
        });

        request.shape().normalize(&mut data, &ctx.scalars).unwrap();

        assert_eq!(
            data,
            json!({
                "books": [
                    {
                        "id": 1,
                        "issn": "1050-124X",
                        "published": "2024-02-29",
                        "latest": "2024-02-29T10:00:00Z",
                        "createdBy": { "id": 12 }
                    },
                    { "id": 2, "issn": null, "published": null, "latest": null, "createdBy": null }
                ],
                "bookCount": 9_007_199_254_740_993_i64
            })
        );
    }
}
