use apollo_compiler::schema::ExtendedType;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use indexmap::IndexSet;
use std::collections::HashMap;

/// Concrete object types of named output types, computed on demand and memoized.
///
/// A `PossibleTypes` is meant to live for one normalization call:
/// it borrows the schema and never invalidates its cache.
pub struct PossibleTypes<'schema> {
    schema: &'schema Schema,
    cache: HashMap<Name, IndexSet<Name>>,
}

impl<'schema> PossibleTypes<'schema> {
    pub fn new(schema: &'schema Schema) -> Self {
        Self {
            schema,
            cache: HashMap::new(),
        }
    }

    /// Returns the object types that a value of type `type_name` can have at runtime.
    ///
    /// * For an object type, the type itself
    /// * For an interface, the object types that implement it, in schema declaration order
    /// * For a union, its members
    /// * Otherwise (leaf or input type, or undefined name), an empty set
    pub fn of(&mut self, type_name: &Name) -> &IndexSet<Name> {
        let schema = self.schema;
        self.cache
            .entry(type_name.clone())
            .or_insert_with(|| match schema.types.get(type_name) {
                Some(ExtendedType::Object(_)) => IndexSet::from([type_name.clone()]),
                Some(ExtendedType::Interface(_)) => schema
                    .types
                    .iter()
                    .filter_map(|(name, def)| match def {
                        ExtendedType::Object(def)
                            if def.implements_interfaces.contains(type_name.as_str()) =>
                        {
                            Some(name.clone())
                        }
                        _ => None,
                    })
                    .collect(),
                Some(ExtendedType::Union(def)) => def
                    .members
                    .iter()
                    .map(|member| member.name.clone())
                    .collect(),
                _ => IndexSet::new(),
            })
    }

    /// Restricts a set of concrete object types by an optional type condition.
    ///
    /// Without a condition the whole context applies.
    /// A condition that selects none of the context yields an empty set, not an error:
    /// such a fragment contributes no selections.
    pub fn narrow(&mut self, context: &IndexSet<Name>, condition: Option<&Name>) -> IndexSet<Name> {
        let Some(condition) = condition else {
            return context.clone();
        };
        let possible = self.of(condition);
        let narrowed: IndexSet<Name> = context
            .iter()
            .filter(|ty| possible.contains(*ty))
            .cloned()
            .collect();
        if narrowed.is_empty() {
            tracing::trace!(
                type_condition = %condition,
                "type condition matches none of the possible types, ignoring fragment"
            );
        }
        narrowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apollo_compiler::name;

    const SCHEMA: &str = r#"
        type Query { node: Node }
        interface Node { id: ID! }
        type B implements Node { id: ID! }
        type A implements Node { id: ID! }
        type C { id: ID! }
        union AOrC = A | C
    "#;

    fn names(set: &IndexSet<Name>) -> Vec<&str> {
        set.iter().map(|name| name.as_str()).collect()
    }

    #[test]
    fn possible_types() {
        let schema = Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap();
        let mut possible = PossibleTypes::new(&schema);
        assert_eq!(names(possible.of(&name!("Node"))), ["B", "A"]);
        assert_eq!(names(possible.of(&name!("AOrC"))), ["A", "C"]);
        assert_eq!(names(possible.of(&name!("C"))), ["C"]);
        assert!(possible.of(&name!("ID")).is_empty());
        assert!(possible.of(&name!("Undefined")).is_empty());
    }

    #[test]
    fn narrowing() {
        let schema = Schema::parse_and_validate(SCHEMA, "schema.graphql").unwrap();
        let mut possible = PossibleTypes::new(&schema);
        let context = possible.of(&name!("Node")).clone();
        assert_eq!(names(&possible.narrow(&context, None)), ["B", "A"]);
        assert_eq!(names(&possible.narrow(&context, Some(&name!("A")))), ["A"]);
        assert_eq!(names(&possible.narrow(&context, Some(&name!("AOrC")))), ["A"]);
        assert!(possible.narrow(&context, Some(&name!("C"))).is_empty());
    }
}
