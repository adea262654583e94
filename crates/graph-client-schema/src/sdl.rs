use std::collections::{HashMap, HashSet};

use async_graphql_parser::{
    parse_schema,
    types::{BaseType, FieldDefinition, Type, TypeKind as AstTypeKind, TypeSystemDefinition},
    Positioned,
};

use crate::{
    FieldDescriptor, OperationKind, RequestPreparationError, ScalarRegistry, TypeDescriptor, TypeKind,
    TypeTable, TypeTableBuilder,
};

impl TypeTable {
    /// Builds the field table of a schema document.
    ///
    /// Enums, scalars declared in the document and scalars known to `scalars` are leaves. A
    /// field an object redeclares from one of its interfaces, with the same type, is only kept
    /// on the interface.
    pub fn from_sdl(sdl: &str, scalars: &ScalarRegistry) -> Result<Self, RequestPreparationError> {
        let document = parse_schema(sdl).map_err(|error| RequestPreparationError::InvalidSchema(error.to_string()))?;

        let mut query_type = String::from("Query");
        let mut mutation_type = String::from("Mutation");
        let mut leaves = HashSet::new();
        let mut definitions = Vec::new();

        for definition in &document.definitions {
            match definition {
                TypeSystemDefinition::Schema(schema) => {
                    if let Some(query) = &schema.node.query {
                        query_type = query.node.to_string();
                    }
                    if let Some(mutation) = &schema.node.mutation {
                        mutation_type = mutation.node.to_string();
                    }
                }
                TypeSystemDefinition::Type(ty) => {
                    if matches!(ty.node.kind, AstTypeKind::Scalar | AstTypeKind::Enum(_)) {
                        leaves.insert(ty.node.name.node.to_string());
                    }
                    definitions.push(&ty.node);
                }
                TypeSystemDefinition::Directive(_) => {}
            }
        }

        let is_scalar = |name: &str| scalars.is_scalar(name) || leaves.contains(name);

        // Field types as written in the document, to tell which object fields an interface declares.
        let mut interface_fields: HashMap<&str, HashMap<&str, String>> = HashMap::new();
        for definition in definitions.iter().copied() {
            if let AstTypeKind::Interface(interface) = &definition.kind {
                interface_fields.entry(definition.name.node.as_str()).or_default().extend(
                    interface
                        .fields
                        .iter()
                        .map(|field| (field.node.name.node.as_str(), field.node.ty.node.to_string())),
                );
            }
        }

        let mut types: Vec<TypeDescriptor> = Vec::new();
        let mut union_members: Vec<(String, String)> = Vec::new();

        for definition in definitions {
            let name = definition.name.node.as_str();

            let (kind, implements, fields) = match &definition.kind {
                AstTypeKind::Object(object) if name == query_type => {
                    (TypeKind::Root(OperationKind::Query), &object.implements, &object.fields)
                }
                AstTypeKind::Object(object) if name == mutation_type => {
                    (TypeKind::Root(OperationKind::Mutation), &object.implements, &object.fields)
                }
                AstTypeKind::Object(object) => (TypeKind::Object, &object.implements, &object.fields),
                AstTypeKind::Interface(interface) => (TypeKind::Interface, &interface.implements, &interface.fields),
                AstTypeKind::Union(union) => {
                    union_members.extend(
                        union
                            .members
                            .iter()
                            .map(|member| (member.node.to_string(), name.to_string())),
                    );
                    upsert(&mut types, name, TypeKind::Interface);
                    continue;
                }
                AstTypeKind::Scalar | AstTypeKind::Enum(_) | AstTypeKind::InputObject(_) => continue,
            };

            let supertypes = implements.iter().map(|name| name.node.to_string()).collect::<Vec<_>>();
            let ty = upsert(&mut types, name, kind);

            for supertype in &supertypes {
                if !ty.supertypes.contains(supertype) {
                    ty.supertypes.push(supertype.clone());
                }
            }

            for field in fields {
                let hoisted = matches!(kind, TypeKind::Object)
                    && supertypes.iter().any(|supertype| {
                        interface_fields
                            .get(supertype.as_str())
                            .and_then(|fields| fields.get(field.node.name.node.as_str()))
                            .is_some_and(|ty| *ty == field.node.ty.node.to_string())
                    });

                if hoisted {
                    continue;
                }

                let descriptor = field_descriptor(field, &is_scalar);

                if matches!(kind, TypeKind::Root(_)) {
                    ty.methods.insert(descriptor.accessor.clone(), descriptor);
                } else {
                    ty.fields.insert(descriptor.accessor.clone(), descriptor);
                }
            }
        }

        for (member, union) in union_members {
            if let Some(ty) = types.iter_mut().find(|ty| ty.name == member) {
                ty.supertypes.push(union);
            }
        }

        let mut builder = TypeTableBuilder::default();
        for ty in types {
            builder.add_type(ty);
        }

        let table = builder.build()?;
        tracing::debug!(types = table.types().count(), "built field table from schema");

        Ok(table)
    }
}

fn upsert<'a>(types: &'a mut Vec<TypeDescriptor>, name: &str, kind: TypeKind) -> &'a mut TypeDescriptor {
    let index = match types.iter().position(|ty| ty.name == name) {
        Some(index) => index,
        None => {
            types.push(TypeDescriptor::new(name, kind));
            types.len() - 1
        }
    };

    &mut types[index]
}

fn field_descriptor(field: &Positioned<FieldDefinition>, is_scalar: &impl Fn(&str) -> bool) -> FieldDescriptor {
    let (type_name, is_list) = named_type(&field.node.ty.node);

    let mut descriptor = if is_scalar(type_name) {
        FieldDescriptor::scalar(field.node.name.node.as_str(), type_name)
    } else {
        FieldDescriptor::object(field.node.name.node.as_str(), type_name)
    };

    descriptor.is_list = is_list;
    descriptor.non_null = !field.node.ty.node.nullable;

    for argument in &field.node.arguments {
        descriptor = descriptor.with_argument(argument.node.name.node.to_string(), argument.node.ty.node.to_string());
    }

    descriptor
}

/// The innermost named type, and whether any list wraps it.
fn named_type(ty: &Type) -> (&str, bool) {
    match &ty.base {
        BaseType::Named(name) => (name.as_str(), false),
        BaseType::List(inner) => (named_type(inner).0, true),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    const SCHEMA: &str = indoc! {r#"
        schema {
            query: QueryRoot
            mutation: MutationRoot
        }

        scalar DateTime

        enum Format {
            SHORT
            LONG
        }

        interface Tracked {
            createdAt: DateTime
            createdBy: User
        }

        type Book implements Tracked {
            id: ID!
            title: String!
            createdAt: DateTime
            createdBy: User
            tags(format: Format): [String!]!
        }

        type User {
            id: ID!
            username: String!
        }

        union SearchResult = Book | User

        type QueryRoot {
            books(first: Int, after: String): [Book!]!
            search(text: String!): [SearchResult!]!
        }

        type MutationRoot {
            deleteBook(id: ID!): Boolean
        }
    "#};

    #[test]
    fn roots_hold_methods() {
        let table = TypeTable::from_sdl(SCHEMA, &ScalarRegistry::with_builtins()).unwrap();

        let query = table.root(OperationKind::Query).unwrap();
        assert_eq!(query.name, "QueryRoot");
        assert!(query.fields.is_empty());

        let books = table.resolve_field_type("QueryRoot", "books", Some(false)).unwrap();
        assert!(books.is_list);
        assert!(books.non_null);
        assert_eq!(books.argument("first").unwrap().ty, "Int");

        let delete = table.resolve_schema_field("MutationRoot", "deleteBook", Some(true)).unwrap();
        assert_eq!(delete.argument("id").unwrap().ty, "ID!");
    }

    #[test]
    fn interface_fields_are_hoisted() {
        let table = TypeTable::from_sdl(SCHEMA, &ScalarRegistry::with_builtins()).unwrap();

        let book = table.get("Book").unwrap();
        assert!(!book.fields.contains_key("created_at"));
        assert_eq!(book.supertypes, ["Tracked", "SearchResult"]);

        let created_at = table.find_field("Book", "created_at", true).unwrap().unwrap();
        assert_eq!(created_at.type_name, "DateTime");
        assert!(created_at.is_scalar());
    }

    #[test]
    fn enums_and_declared_scalars_are_leaves() {
        let table = TypeTable::from_sdl(SCHEMA, &ScalarRegistry::new()).unwrap();

        assert!(table.resolve_field_type("Book", "created_at", Some(true)).is_ok());
        assert!(table.resolve_field_type("Book", "tags", Some(true)).is_ok());
        assert!(table.resolve_field_type("Book", "created_by", Some(false)).is_ok());
    }

    #[test]
    fn union_members_extend_the_union() {
        let table = TypeTable::from_sdl(SCHEMA, &ScalarRegistry::new()).unwrap();

        assert_eq!(table.get("SearchResult").unwrap().kind, TypeKind::Interface);
        assert!(table.is_subtype_of("User", "SearchResult"));
    }

    #[test]
    fn default_root_names() {
        let table = TypeTable::from_sdl("type Query { ping: String }", &ScalarRegistry::new()).unwrap();

        assert_eq!(table.root(OperationKind::Query).unwrap().kind, TypeKind::Root(OperationKind::Query));
        assert!(table.root(OperationKind::Mutation).is_none());
    }

    #[test]
    fn invalid_documents_are_rejected() {
        let error = TypeTable::from_sdl("type Query {", &ScalarRegistry::new()).unwrap_err();

        assert!(matches!(error, RequestPreparationError::InvalidSchema(_)));
    }
}
