use crate::normalize;
use crate::schema;
use crate::try_normalize;
use crate::variables;
use apollo_compiler::executable::OperationType;
use apollo_compiler::validation::Valid;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Schema;
use apollo_normalizer::JsonMap;
use apollo_normalizer::NormalizationError;
use apollo_normalizer::Normalizer;
use expect_test::expect;
use pretty_assertions::assert_eq;
use serde_json_bytes::json;

#[test]
fn duplicate_selections_are_merged() {
    let operation = normalize(
        r#"
        {
            user { name }
            user { friends { name } }
            ...F
        }
        fragment F on Query {
            user { name id }
        }
        "#,
    );
    expect![[r#"
        query
          [Query].user
            [User].name
            [User].friends(first: 10)
              [User].name
            [User].id
    "#]]
    .assert_eq(&operation.to_string());
    assert_eq!(operation.root_fields().len(), 1);
    assert_eq!(operation.field_count(), 5);
    assert_eq!(operation.depth(), 3);
}

#[test]
fn skip_and_include() {
    let query = r#"
        query($skip: Boolean!, $include: Boolean!) {
            user {
                id
                name @skip(if: $skip) @include(if: $include)
            }
        }
    "#;
    for skip in [false, true] {
        for include in [false, true] {
            let raw_variables = json!({"skip": skip, "include": include});
            let operation = try_normalize(query, raw_variables).unwrap();
            let names: Vec<_> = operation
                .walk()
                .map(|field| field.qualified_name().to_owned())
                .collect();
            let expected = if !skip && include {
                vec!["user", "user/id", "user/name"]
            } else {
                vec!["user", "user/id"]
            };
            assert_eq!(names, expected, "skip: {skip}, include: {include}");
        }
    }

    let operation = normalize(
        r#"
        {
            user {
                a: id @skip(if: true) @include(if: true)
                b: id @skip(if: true) @include(if: false)
                c: id @skip(if: false) @include(if: false)
                d: id @skip(if: false) @include(if: true)
                ... @skip(if: true) { e: id }
                ... @include(if: true) { f: id }
            }
        }
        "#,
    );
    expect![[r#"
        query
          [Query].user
            d: [User].id
            f: [User].id
    "#]]
    .assert_eq(&operation.to_string());
}

#[test]
fn interface_field_bound_to_each_object_type() {
    let schema = schema();
    let query = r#"
        {
            pets {
                ... on Dog { name }
                ... on Cat { name }
            }
        }
    "#;
    let document = ExecutableDocument::parse_and_validate(&schema, query, "query.graphql").unwrap();
    let operation = Normalizer::new()
        .normalize_operation(&schema, &document, None, &JsonMap::new())
        .unwrap();
    expect![[r#"
        query
          [Query].pets
            [Dog, Cat].name
    "#]]
    .assert_eq(&operation.to_string());

    let pets = operation.root_fields().next().unwrap();
    let name = pets.children().next().unwrap();
    let bound: Vec<_> = name.object_type_names().map(|n| n.as_str()).collect();
    assert_eq!(bound, ["Dog", "Cat"]);
    for object_type in ["Dog", "Cat"] {
        let definition = name.field_definition(object_type).unwrap();
        let expected = &schema.type_field(object_type, "name").unwrap().node;
        assert!(definition.ptr_eq(expected), "{object_type}");
    }
    assert!(!name.is_conditional());
}

#[test]
fn abstract_types_in_sub_selections() {
    let operation = normalize(
        r#"
        {
            search {
                ... on Dog { name }
                ... on User { name friends { id } }
            }
            pets {
                name
                ... on Dog { name barkVolume }
                ... on Cat { owner { name } }
                ... on Dog { owner { id } }
            }
        }
        "#,
    );
    expect![[r#"
        query
          [Query].search(term: "all")
            [Dog, User].name
            [User].friends(first: 10)
              [User].id
          [Query].pets
            [Dog, Cat].name
            [Dog].barkVolume
            [Cat].owner
              [User].name
            [Dog].owner
              [User].id
    "#]]
    .assert_eq(&operation.to_string());

    let conditional: Vec<_> = operation
        .walk()
        .filter(|field| field.is_conditional())
        .map(|field| field.to_string())
        .collect();
    assert_eq!(
        conditional,
        ["[User].friends", "[Dog].barkVolume", "[Cat].owner", "[Dog].owner"]
    );
    assert!(operation
        .walk()
        .all(|field| !field.object_type_bindings().is_empty()));
}

#[test]
fn interface_without_implementations_selects_nothing() {
    let schema = Schema::parse_and_validate(
        "type Query { node: Node } interface Node { id: ID! child: Node }",
        "schema.graphql",
    )
    .unwrap();
    let query = "{ node { id child { id } } }";
    let document = ExecutableDocument::parse_and_validate(&schema, query, "query.graphql").unwrap();
    let operation = Normalizer::new()
        .normalize_operation(&schema, &document, None, &JsonMap::new())
        .unwrap();
    expect![[r#"
        query
          [Query].node
    "#]]
    .assert_eq(&operation.to_string());
    assert_eq!(operation.field_count(), 1);

    let node = operation.root_fields().next().unwrap();
    assert!(!node.has_children());
    assert_eq!(node.output_type(), "Node");
    let selection_set = node.selection_set();
    assert_eq!(selection_set.output_type(), "Node");
    assert!(selection_set.immediate_fields().is_empty());
    assert!(selection_set.fields(&[]).is_empty());
    assert!(!selection_set.contains("**"));
}

#[test]
fn type_conditions_narrow_possible_types() {
    let operation = normalize(
        r#"
        {
            node(id: "1") {
                id
                ... on SearchResult {
                    ... on User { name }
                    ... on Dog { barkVolume }
                }
            }
            user {
                id
                ... on SearchResult {
                    ... on Dog { barkVolume }
                }
            }
        }
        "#,
    );
    expect![[r#"
        query
          [Query].node(id: "1")
            [Dog, Cat, User].id
            [User].name
            [Dog].barkVolume
          [Query].user
            [User].id
    "#]]
    .assert_eq(&operation.to_string());
}

#[test]
fn tree_structure() {
    let operation = normalize("{ __typename user { friends { name } } }");
    let fields: Vec<_> = operation.walk().collect();
    let [typename, user, friends, name] = fields.as_slice() else {
        panic!("expected 4 fields, got {fields:?}")
    };
    assert!(typename.is_introspection_field());
    assert!(!user.is_introspection_field());
    assert_eq!(typename.level(), 1);
    assert_eq!(name.level(), 3);
    assert_eq!(name.qualified_name(), "user/friends/name");
    assert_eq!(name.parent(), Some(*friends));
    assert_eq!(friends.parent(), Some(*user));
    assert_eq!(user.parent(), None);
    assert!(user.has_children());
    assert!(!name.has_children());
    let descendants: Vec<_> = user.walk().collect();
    assert_eq!(descendants, [*friends, *name]);
    assert_eq!(operation.field(friends.id()), Some(*friends));
    assert_eq!(operation.fields_for_coordinate("User", "name"), vec![*name]);
    assert!(operation.fields_for_coordinate("Dog", "name").is_empty());
}

#[test]
fn argument_values() {
    let query = r#"
        query($first: Int) {
            user { friends(first: $first) { id } }
        }
    "#;
    let first_argument = |raw| {
        let operation = try_normalize(query, raw).unwrap();
        let friends = operation.walk().nth(1).unwrap();
        friends.arguments().get("first").cloned()
    };
    // Absent variable: the argument default applies
    assert_eq!(first_argument(json!({})), Some(json!(10)));
    assert_eq!(first_argument(json!({"first": 3})), Some(json!(3)));
    assert_eq!(first_argument(json!({"first": null})), Some(json!(null)));

    let operation = normalize(r#"mutation { rename(id: 4, name: "Rex") { name } }"#);
    assert_eq!(operation.operation_type(), OperationType::Mutation);
    expect![[r#"
        mutation
          [Mutation].rename(id: 4, name: "Rex")
            [User].name
    "#]]
    .assert_eq(&operation.to_string());
}

#[test]
fn equal_coerced_arguments_are_merged() {
    let schema = schema();
    let query = r#"
        query($first: Int = 10) {
            user {
                friends { id }
                friends(first: 10) { name }
                friends(first: $first) { id }
            }
        }
    "#;
    // Validation rejects overlapping fields with syntactically different arguments
    let document = ExecutableDocument::parse(&schema, query, "query.graphql").unwrap();
    let document = Valid::assume_valid(document);
    let operation = Normalizer::new()
        .normalize_operation(&schema, &document, None, &JsonMap::new())
        .unwrap();
    expect![[r#"
        query
          [Query].user
            [User].friends(first: 10)
              [User].id
              [User].name
    "#]]
    .assert_eq(&operation.to_string());
}

#[test]
fn different_arguments_are_an_error() {
    let schema = schema();
    let query = "{ user { friends(first: 1) { id } friends(first: 2) { id } } }";
    let document = ExecutableDocument::parse(&schema, query, "query.graphql").unwrap();
    let document = Valid::assume_valid(document);
    let error = Normalizer::new()
        .normalize_operation(&schema, &document, None, &JsonMap::new())
        .unwrap_err();
    let NormalizationError::AmbiguousFieldMerge {
        response_key,
        object_type,
        ..
    } = &error
    else {
        panic!("unexpected error {error:?}")
    };
    assert_eq!(response_key, "friends");
    assert_eq!(object_type, "User");
    expect!["cannot merge selections for `friends` on type `User`: `friends` is selected with different arguments"]
        .assert_eq(&error.to_string());
}

#[test]
fn operation_selection() {
    let schema = schema();
    let query = r#"
        query A { user { id } }
        query B { pets { name } }
    "#;
    let document = ExecutableDocument::parse_and_validate(&schema, query, "query.graphql").unwrap();
    let normalizer = Normalizer::new();
    let raw_variables = variables(json!({}));

    let b = normalizer
        .normalize_operation(&schema, &document, Some("B"), &raw_variables)
        .unwrap();
    assert_eq!(b.name().unwrap(), "B");

    let error = normalizer
        .normalize_operation(&schema, &document, None, &raw_variables)
        .unwrap_err();
    assert_eq!(error, NormalizationError::UnknownOperation { name: None });
    let error = normalizer
        .normalize_operation(&schema, &document, Some("C"), &raw_variables)
        .unwrap_err();
    expect!["no operation named `C`"].assert_eq(&error.to_string());

    let normalized = normalizer
        .normalize_document(&schema, &document, &raw_variables)
        .unwrap();
    assert_eq!(normalized.operations().len(), 2);
    assert!(normalized.single_operation().is_none());
    let a = normalized.get_operation(Some("A")).unwrap();
    assert_eq!(a.root_fields().next().unwrap().name(), "user");
    assert!(normalized.get_operation(None).is_err());
}

#[test]
fn limits() {
    let schema = schema();
    let query = "{ user { id friends { name } } }";
    let document = ExecutableDocument::parse_and_validate(&schema, query, "query.graphql").unwrap();
    let raw_variables = JsonMap::new();

    let error = Normalizer::new()
        .max_depth(2)
        .normalize_operation(&schema, &document, None, &raw_variables)
        .unwrap_err();
    assert_eq!(error, NormalizationError::MaxDepthExceeded { limit: 2 });
    let operation = Normalizer::new()
        .max_depth(3)
        .normalize_operation(&schema, &document, None, &raw_variables)
        .unwrap();
    assert_eq!(operation.depth(), 3);

    let error = Normalizer::new()
        .max_field_count(3)
        .normalize_operation(&schema, &document, None, &raw_variables)
        .unwrap_err();
    assert_eq!(error, NormalizationError::MaxFieldCountExceeded { limit: 3 });
    let operation = Normalizer::new()
        .max_field_count(4)
        .normalize_operation(&schema, &document, None, &raw_variables)
        .unwrap();
    assert_eq!(operation.field_count(), 4);
}
