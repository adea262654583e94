//! The field table: every type of the schema with its fields, methods and supertypes.
//!
//! Fields are keyed by their native (snake_case) name. A type only holds the fields it
//! declares itself; fields shared by several types live on a common supertype and are
//! found by walking the supertype chain.

use std::collections::HashSet;

use indexmap::IndexMap;
use inflector::Inflector;

use crate::RequestPreparationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    pub fn keyword(self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object,
    Interface,
    /// The query or mutation root. Its fields are dispatcher methods.
    Root(OperationKind),
}

impl TypeKind {
    fn is_concrete(self) -> bool {
        !matches!(self, TypeKind::Interface)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Scalar,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDescriptor {
    pub name: String,
    /// Full GraphQL type, e.g. `[ID!]!`
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Name in the schema
    pub name: String,
    /// Native name, snake_case
    pub accessor: String,
    /// Named type, without list or non-null wrapping
    pub type_name: String,
    pub shape: FieldShape,
    pub is_list: bool,
    pub non_null: bool,
    pub arguments: Vec<ArgumentDescriptor>,
}

impl FieldDescriptor {
    pub fn scalar(name: &str, type_name: &str) -> Self {
        Self::new(name, type_name, FieldShape::Scalar)
    }

    pub fn object(name: &str, type_name: &str) -> Self {
        Self::new(name, type_name, FieldShape::Object)
    }

    fn new(name: &str, type_name: &str, shape: FieldShape) -> Self {
        Self {
            name: name.to_string(),
            accessor: name.to_snake_case(),
            type_name: type_name.to_string(),
            shape,
            is_list: false,
            non_null: false,
            arguments: Vec::new(),
        }
    }

    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    pub fn non_null(mut self) -> Self {
        self.non_null = true;
        self
    }

    /// Overrides the accessor derived from the name.
    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = accessor.into();
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.arguments.push(ArgumentDescriptor {
            name: name.into(),
            ty: ty.into(),
        });
        self
    }

    pub fn is_scalar(&self) -> bool {
        self.shape == FieldShape::Scalar
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentDescriptor> {
        self.arguments.iter().find(|argument| argument.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    /// Searched in order, depth first, after the type's own fields
    pub supertypes: Vec<String>,
    pub fields: IndexMap<String, FieldDescriptor>,
    pub methods: IndexMap<String, FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            supertypes: Vec::new(),
            fields: IndexMap::new(),
            methods: IndexMap::new(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TypeTable {
    types: IndexMap<String, TypeDescriptor>,
    query_type: Option<String>,
    mutation_type: Option<String>,
}

impl TypeTable {
    pub fn builder() -> TypeTableBuilder {
        TypeTableBuilder::default()
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        self.types.values()
    }

    /// The root type for an operation.
    pub fn root(&self, operation: OperationKind) -> Option<&TypeDescriptor> {
        let name = match operation {
            OperationKind::Query => self.query_type.as_deref(),
            OperationKind::Mutation => self.mutation_type.as_deref(),
        }?;

        self.get(name)
    }

    fn descriptor(&self, type_name: &str) -> Result<&TypeDescriptor, RequestPreparationError> {
        self.get(type_name)
            .ok_or_else(|| RequestPreparationError::UnknownType(type_name.to_string()))
    }

    /// Finds the field declared as `name` on `type_name` or, failing that, on its supertypes.
    ///
    /// When nothing is found, returns `Ok(None)` unless `must_exist` is set.
    pub fn find_field(
        &self,
        type_name: &str,
        name: &str,
        must_exist: bool,
    ) -> Result<Option<&FieldDescriptor>, RequestPreparationError> {
        let ty = self.descriptor(type_name)?;

        let mut visited = HashSet::new();
        let found = self.search_fields(ty, name, &mut visited);

        match found {
            None if must_exist => Err(RequestPreparationError::UnknownField {
                type_name: type_name.to_string(),
                field: name.to_string(),
            }),
            found => Ok(found),
        }
    }

    fn search_fields<'a>(
        &'a self,
        ty: &'a TypeDescriptor,
        name: &str,
        visited: &mut HashSet<&'a str>,
    ) -> Option<&'a FieldDescriptor> {
        if !visited.insert(ty.name.as_str()) {
            return None;
        }

        if let Some(field) = ty.fields.get(name) {
            return Some(field);
        }

        ty.supertypes
            .iter()
            .filter_map(|supertype| self.types.get(supertype))
            .find_map(|supertype| self.search_fields(supertype, name, visited))
    }

    /// Resolves `name` on `type_name`, as a field, then as a method on concrete types or as
    /// a `get_` accessor on interfaces.
    ///
    /// `expect_scalar` checks the shape of the result: `Some(true)` requires a scalar,
    /// `Some(false)` a non-scalar.
    pub fn resolve_field_type(
        &self,
        type_name: &str,
        name: &str,
        expect_scalar: Option<bool>,
    ) -> Result<&FieldDescriptor, RequestPreparationError> {
        let ty = self.descriptor(type_name)?;

        let field = match self.find_field(type_name, name, false)? {
            Some(field) => Some(field),
            None if ty.kind.is_concrete() => ty.methods.get(name),
            None => ty.methods.get(&format!("get_{}", name.to_snake_case())),
        };

        let field = field.ok_or_else(|| RequestPreparationError::UnknownField {
            type_name: type_name.to_string(),
            field: name.to_string(),
        })?;

        match expect_scalar {
            Some(expected_scalar) if field.is_scalar() != expected_scalar => {
                Err(RequestPreparationError::ScalarMismatch {
                    type_name: type_name.to_string(),
                    field: name.to_string(),
                    expected_scalar,
                })
            }
            _ => Ok(field),
        }
    }

    /// Same as [`TypeTable::resolve_field_type`], for a field named as in the schema.
    pub fn resolve_schema_field(
        &self,
        type_name: &str,
        schema_name: &str,
        expect_scalar: Option<bool>,
    ) -> Result<&FieldDescriptor, RequestPreparationError> {
        self.resolve_field_type(type_name, &schema_name.to_snake_case(), expect_scalar)
            .map_err(|error| match error {
                RequestPreparationError::UnknownField { type_name, .. } => RequestPreparationError::UnknownField {
                    type_name,
                    field: schema_name.to_string(),
                },
                RequestPreparationError::ScalarMismatch {
                    type_name,
                    expected_scalar,
                    ..
                } => RequestPreparationError::ScalarMismatch {
                    type_name,
                    field: schema_name.to_string(),
                    expected_scalar,
                },
                other => other,
            })
    }

    /// Whether `candidate` is `type_name` or one of its transitive supertypes.
    pub fn is_subtype_of(&self, type_name: &str, candidate: &str) -> bool {
        if type_name == candidate {
            return true;
        }

        let mut stack = vec![type_name];
        let mut visited = HashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }

            let Some(ty) = self.types.get(current) else {
                continue;
            };

            for supertype in &ty.supertypes {
                if supertype == candidate {
                    return true;
                }
                stack.push(supertype);
            }
        }

        false
    }
}

/// Builds a [`TypeTable`] from code generation metadata, or from a schema document.
#[derive(Debug, Default)]
pub struct TypeTableBuilder {
    types: IndexMap<String, TypeDescriptor>,
    query_type: Option<String>,
    mutation_type: Option<String>,
}

impl TypeTableBuilder {
    pub fn object(self, name: &str) -> TypeBuilder {
        TypeBuilder::new(self, TypeDescriptor::new(name, TypeKind::Object))
    }

    pub fn interface(self, name: &str) -> TypeBuilder {
        TypeBuilder::new(self, TypeDescriptor::new(name, TypeKind::Interface))
    }

    pub fn root(mut self, name: &str, operation: OperationKind) -> TypeBuilder {
        match operation {
            OperationKind::Query => self.query_type = Some(name.to_string()),
            OperationKind::Mutation => self.mutation_type = Some(name.to_string()),
        }

        TypeBuilder::new(self, TypeDescriptor::new(name, TypeKind::Root(operation)))
    }

    pub fn add_type(&mut self, ty: TypeDescriptor) {
        if let TypeKind::Root(operation) = ty.kind {
            match operation {
                OperationKind::Query => self.query_type = Some(ty.name.clone()),
                OperationKind::Mutation => self.mutation_type = Some(ty.name.clone()),
            }
        }

        self.types.insert(ty.name.clone(), ty);
    }

    /// Fails if a supertype is not part of the table.
    pub fn build(self) -> Result<TypeTable, RequestPreparationError> {
        for ty in self.types.values() {
            if let Some(missing) = ty.supertypes.iter().find(|name| !self.types.contains_key(*name)) {
                return Err(RequestPreparationError::InvalidSchema(format!(
                    "'{}' extends the unknown type '{missing}'",
                    ty.name
                )));
            }
        }

        Ok(TypeTable {
            types: self.types,
            query_type: self.query_type,
            mutation_type: self.mutation_type,
        })
    }
}

pub struct TypeBuilder {
    table: TypeTableBuilder,
    ty: TypeDescriptor,
}

impl TypeBuilder {
    fn new(table: TypeTableBuilder, ty: TypeDescriptor) -> Self {
        Self { table, ty }
    }

    pub fn extends(mut self, supertype: &str) -> Self {
        self.ty.supertypes.push(supertype.to_string());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.ty.fields.insert(field.accessor.clone(), field);
        self
    }

    pub fn method(mut self, method: FieldDescriptor) -> Self {
        self.ty.methods.insert(method.accessor.clone(), method);
        self
    }

    /// Back to the table, to declare the next type.
    pub fn done(mut self) -> TypeTableBuilder {
        self.table.types.insert(self.ty.name.clone(), self.ty);
        self.table
    }

    pub fn build(self) -> Result<TypeTable, RequestPreparationError> {
        self.done().build()
    }
}
