#![allow(unused_crate_dependencies)]

use graph_client_schema::{
    DirectiveLocations, DirectiveRegistry, OperationKind, RequestPreparationError, ScalarRegistry, TypeTable,
};
use indoc::indoc;

const SCHEMA: &str = indoc! {r#"
    scalar Country
    scalar ISSN
    scalar Long

    interface Publication {
        id: ID!
        title: String!
        issn: ISSN
    }

    type Journal implements Publication {
        id: ID!
        title: String!
        issn: ISSN
        country: Country
        editor: Person
    }

    type Person {
        id: ID!
        name: String!
        publications: [Publication!]!
    }

    type Query {
        journal(id: ID!): Journal
        people(first: Long): [Person!]!
    }
"#};

fn table() -> TypeTable {
    TypeTable::from_sdl(SCHEMA, &ScalarRegistry::with_builtins()).unwrap()
}

#[test]
fn inherited_fields_resolve_through_the_interface() {
    let table = table();

    let issn = table.resolve_schema_field("Journal", "issn", Some(true)).unwrap();
    assert_eq!(issn.type_name, "ISSN");
    assert!(table.get("Journal").unwrap().fields.get("issn").is_none());
    assert!(table.get("Publication").unwrap().fields.get("issn").is_some());
}

#[test]
fn own_fields_stay_on_the_object() {
    let table = table();

    let editor = table.resolve_schema_field("Journal", "editor", Some(false)).unwrap();
    assert_eq!(editor.type_name, "Person");
    assert!(!editor.is_list);
}

#[test]
fn unknown_fields_name_the_requested_type() {
    let table = table();

    assert_eq!(table.find_field("Journal", "volume", false), Ok(None));
    assert_eq!(
        table.resolve_schema_field("Journal", "volume", None),
        Err(RequestPreparationError::UnknownField {
            type_name: "Journal".to_string(),
            field: "volume".to_string(),
        })
    );
}

#[test]
fn root_methods_carry_argument_types() {
    let table = table();

    let query = table.root(OperationKind::Query).unwrap();
    let people = query.methods.get("people").unwrap();
    assert_eq!(people.argument("first").unwrap().ty, "Long");
    assert!(people.is_list);
}

#[test]
fn registries_are_independent_per_caller() {
    let mut first = DirectiveRegistry::builtin();
    first.add(graph_client_schema::DirectiveDescriptor::new(
        "cached",
        "schema",
        DirectiveLocations::FIELD,
    ));

    let second = DirectiveRegistry::builtin();

    assert_eq!(first.len(), 8);
    assert_eq!(second.len(), 7);
    assert!(second.get("cached").is_none());
}
