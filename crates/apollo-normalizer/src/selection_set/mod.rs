//! Querying which fields a [`NormalizedField`] selects, for use by resolvers.
//!
//! ```
//! use apollo_compiler::{ExecutableDocument, Schema};
//! use apollo_normalizer::{JsonMap, Normalizer};
//!
//! let schema = Schema::parse_and_validate(
//!     "type Query { user: User } type User { name: String, friends: [User] }",
//!     "schema.graphql",
//! )
//! .unwrap();
//! let query = "{ user { name friends { name } } }";
//! let document = ExecutableDocument::parse_and_validate(&schema, query, "query.graphql").unwrap();
//! let operation = Normalizer::new()
//!     .normalize_operation(&schema, &document, None, &JsonMap::new())
//!     .unwrap();
//!
//! let user = operation.root_fields().next().unwrap();
//! let selection_set = user.selection_set();
//! assert!(selection_set.contains("friends/name"));
//! let paths: Vec<_> = selection_set
//!     .fields(&["**/name"])
//!     .iter()
//!     .map(|field| field.qualified_name())
//!     .collect();
//! assert_eq!(paths, ["name", "friends/name"]);
//! ```

mod pattern;

use self::pattern::Pattern;
use crate::FieldId;
use crate::JsonMap;
use crate::NormalizedField;
use crate::NormalizedOperation;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::Name;
use apollo_compiler::Node;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

/// The fields selected under a normalized field, or the root fields of an operation.
///
/// Paths given to [`fields`][Self::fields] are relative to this selection set
/// and made of response keys separated by `/`:
///
/// * `*` matches exactly one path segment
/// * `**` matches zero or more path segments
/// * Within a segment, `*` matches any characters and `?` any one character
/// * A leading `TypeName.` only matches fields for that concrete object type
///
/// Since `**` can match nothing, `a/**` matches `a` itself as well as all of its descendants.
/// Use `a/*/**` to only get descendants.
///
/// The subtree is flattened on first query and the result kept for later queries.
/// Flattened entries are unique by path and object type:
/// when per-type fields of one response key have children with the same path and type,
/// the first one in depth-first order is kept.
pub struct SelectionSet<'op> {
    operation: &'op NormalizedOperation,
    parent: Option<NormalizedField<'op>>,
    flattened: OnceLock<Vec<SelectedField<'op>>>,
}

impl<'op> SelectionSet<'op> {
    pub fn for_operation(operation: &'op NormalizedOperation) -> Self {
        Self {
            operation,
            parent: None,
            flattened: OnceLock::new(),
        }
    }

    pub fn for_field(field: NormalizedField<'op>) -> Self {
        Self {
            operation: field.operation(),
            parent: Some(field),
            flattened: OnceLock::new(),
        }
    }

    /// The named type that selected fields belong to:
    /// the root operation type, or the field’s [output type][NormalizedField::output_type].
    pub fn output_type(&self) -> &'op Name {
        match self.parent {
            Some(field) => field.output_type(),
            None => self.operation.root_type(),
        }
    }

    /// Returns direct children only, each once per object type binding.
    pub fn immediate_fields(&self) -> Vec<SelectedField<'op>> {
        let children: Vec<NormalizedField<'op>> = match self.parent {
            Some(field) => field.children().collect(),
            None => self.operation.root_fields().collect(),
        };
        children
            .into_iter()
            .flat_map(|field| self.selected(field))
            .collect()
    }

    /// Returns fields of the subtree matching any of the patterns, in depth-first order.
    ///
    /// A field with several object type bindings has one entry per type.
    /// With no pattern at all, returns every field of the subtree.
    pub fn fields(&self, patterns: &[&str]) -> Vec<SelectedField<'op>> {
        let all = self.flattened();
        if patterns.is_empty() {
            return all.to_vec();
        }
        let patterns: Vec<Pattern> = patterns.iter().map(|p| Pattern::parse(p)).collect();
        all.iter()
            .filter(|selected| {
                patterns
                    .iter()
                    .any(|pattern| pattern.matches(selected.qualified_name, selected.object_type))
            })
            .cloned()
            .collect()
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.contains_any_of(&[pattern])
    }

    pub fn contains_any_of(&self, patterns: &[&str]) -> bool {
        let patterns: Vec<Pattern> = patterns.iter().map(|p| Pattern::parse(p)).collect();
        self.flattened().iter().any(|selected| {
            patterns
                .iter()
                .any(|pattern| pattern.matches(selected.qualified_name, selected.object_type))
        })
    }

    /// Whether each pattern matches at least one field
    pub fn contains_all_of(&self, patterns: &[&str]) -> bool {
        let patterns: Vec<Pattern> = patterns.iter().map(|p| Pattern::parse(p)).collect();
        let mut found = vec![false; patterns.len()];
        for selected in self.flattened() {
            for (pattern, is_found) in patterns.iter().zip(&mut found) {
                if !*is_found {
                    *is_found = pattern.matches(selected.qualified_name, selected.object_type)
                }
            }
            if found.iter().all(|&found| found) {
                return true;
            }
        }
        patterns.is_empty()
    }

    /// Like [`fields`][Self::fields], grouped by response key in order of first appearance
    pub fn fields_grouped_by_response_key(
        &self,
        patterns: &[&str],
    ) -> IndexMap<&'op Name, Vec<SelectedField<'op>>> {
        let mut grouped = IndexMap::<_, Vec<_>>::new();
        for selected in self.fields(patterns) {
            grouped
                .entry(selected.response_key())
                .or_default()
                .push(selected)
        }
        grouped
    }

    fn flattened(&self) -> &[SelectedField<'op>] {
        self.flattened.get_or_init(|| {
            let descendants = match self.parent {
                Some(field) => field.walk(),
                None => self.operation.walk(),
            };
            let mut seen = HashSet::new();
            descendants
                .flat_map(|field| self.selected(field))
                .filter(|selected| seen.insert((selected.qualified_name, selected.object_type)))
                .collect()
        })
    }

    fn selected(&self, field: NormalizedField<'op>) -> impl Iterator<Item = SelectedField<'op>> {
        // Paths are relative: strip the parent’s qualified name and the following `/`
        let prefix_len = self
            .parent
            .map_or(0, |parent| parent.qualified_name().len() + 1);
        let qualified_name = &field.qualified_name()[prefix_len..];
        field
            .object_type_bindings()
            .iter()
            .map(move |(object_type, definition)| SelectedField {
                field,
                object_type,
                definition,
                qualified_name,
            })
    }
}

impl fmt::Debug for SelectionSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionSet")
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

/// A field of a [`SelectionSet`], for one of its object types.
#[derive(Clone, Copy)]
pub struct SelectedField<'op> {
    field: NormalizedField<'op>,
    object_type: &'op Name,
    definition: &'op Node<FieldDefinition>,
    qualified_name: &'op str,
}

impl<'op> SelectedField<'op> {
    pub fn name(&self) -> &'op Name {
        self.field.name()
    }

    pub fn alias(&self) -> Option<&'op Name> {
        self.field.alias()
    }

    pub fn response_key(&self) -> &'op Name {
        self.field.response_key()
    }

    /// Response keys from the selection set to this field, separated by `/`
    pub fn qualified_name(&self) -> &'op str {
        self.qualified_name
    }

    pub fn object_type_name(&self) -> &'op Name {
        self.object_type
    }

    /// Definition of the field on [`object_type_name`][Self::object_type_name]
    pub fn definition(&self) -> &'op Node<FieldDefinition> {
        self.definition
    }

    pub fn arguments(&self) -> &'op JsonMap {
        self.field.arguments()
    }

    /// Level in the whole operation, where root fields are at level 1
    pub fn level(&self) -> usize {
        self.field.level()
    }

    pub fn is_conditional(&self) -> bool {
        self.field.is_conditional()
    }

    pub fn normalized_field(&self) -> NormalizedField<'op> {
        self.field
    }

    pub fn parent_field(&self) -> Option<NormalizedField<'op>> {
        self.field.parent()
    }

    pub fn selection_set(&self) -> SelectionSet<'op> {
        self.field.selection_set()
    }

    /// Id of the underlying normalized field
    pub fn id(&self) -> FieldId {
        self.field.id()
    }
}

impl fmt::Debug for SelectedField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object_type, self.qualified_name)
    }
}
