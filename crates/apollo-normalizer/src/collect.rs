use crate::coercion::Coercion;
use crate::directives::selection_survives;
use crate::error::NormalizationError;
use crate::possible_types::PossibleTypes;
use crate::JsonMap;
use crate::VariableValues;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::Selection;
use apollo_compiler::executable::SelectionSet;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use indexmap::IndexMap;
use indexmap::IndexSet;

/// A merged field before it is frozen into a [`NormalizedOperation`][crate::NormalizedOperation].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldBuilder {
    pub(crate) response_key: Name,
    pub(crate) name: Name,
    pub(crate) alias: Option<Name>,
    pub(crate) bindings: IndexMap<Name, Node<FieldDefinition>>,
    /// Named return type, from the definition of the first occurrence
    pub(crate) output_type: Name,
    pub(crate) arguments: JsonMap,
    pub(crate) children: Vec<FieldBuilder>,
    /// Number of object types possible at this position
    pub(crate) possible_type_count: usize,
}

impl FieldBuilder {
    /// Whether `other` can be folded into `self`, extending its bindings
    fn has_same_shape(&self, other: &Self) -> bool {
        self.name == other.name
            && self.alias == other.alias
            && self.arguments == other.arguments
            && self.children == other.children
    }
}

/// A field selection found in a selection set, after fragment expansion.
struct CollectedField<'doc> {
    field: &'doc Node<Field>,
    /// Type of the selection set that directly contains `field`
    parent_type: &'doc Name,
    /// Concrete object types this selection applies to
    object_types: IndexSet<Name>,
}

pub(crate) struct Limits {
    pub(crate) max_depth: Option<usize>,
    pub(crate) max_field_count: usize,
}

pub(crate) struct FieldMerger<'a, 'doc> {
    schema: &'a Schema,
    document: &'doc ExecutableDocument,
    variables: &'a VariableValues,
    coercion: Coercion<'a>,
    possible_types: PossibleTypes<'a>,
    limits: Limits,
    field_count: usize,
}

impl<'a, 'doc> FieldMerger<'a, 'doc> {
    pub(crate) fn new(
        schema: &'a Schema,
        document: &'doc ExecutableDocument,
        variables: &'a VariableValues,
        coercion: Coercion<'a>,
        limits: Limits,
    ) -> Self {
        Self {
            schema,
            document,
            variables,
            coercion,
            possible_types: PossibleTypes::new(schema),
            limits,
            field_count: 0,
        }
    }

    /// Merges fields of `selection_sets`, all evaluated at the `context` object types.
    ///
    /// Recurses into sub-selections, so this returns complete subtrees at `level`.
    pub(crate) fn merge(
        &mut self,
        context: &IndexSet<Name>,
        selection_sets: &[&'doc SelectionSet],
        level: usize,
    ) -> Result<Vec<FieldBuilder>, NormalizationError> {
        let mut grouped_fields = IndexMap::new();
        for selection_set in selection_sets {
            self.collect_fields(context, selection_set, &mut grouped_fields);
        }
        if grouped_fields.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(limit) = self.limits.max_depth {
            if level > limit {
                return Err(NormalizationError::MaxDepthExceeded { limit });
            }
        }
        let mut fields = Vec::with_capacity(grouped_fields.len());
        for (response_key, occurrences) in grouped_fields {
            let first_types = &occurrences[0].object_types;
            if occurrences
                .iter()
                .all(|occurrence| occurrence.object_types == *first_types)
            {
                let occurrences: Vec<_> = occurrences.iter().collect();
                let object_types = first_types.clone();
                fields.push(self.merge_field(
                    response_key,
                    object_types,
                    context,
                    &occurrences,
                    level,
                )?);
                continue;
            }
            // Occurrences apply to different type sets: merge each concrete type independently
            let all_types: IndexSet<&Name> = occurrences
                .iter()
                .flat_map(|occurrence| &occurrence.object_types)
                .collect();
            let mut per_type: Vec<FieldBuilder> = Vec::new();
            for object_type in all_types {
                let applicable: Vec<_> = occurrences
                    .iter()
                    .filter(|occurrence| occurrence.object_types.contains(object_type))
                    .collect();
                let object_types = IndexSet::from([object_type.clone()]);
                let field =
                    self.merge_field(response_key, object_types, context, &applicable, level)?;
                if let Some(existing) = per_type.iter_mut().find(|f| f.has_same_shape(&field)) {
                    existing.bindings.extend(field.bindings)
                } else {
                    per_type.push(field)
                }
            }
            fields.extend(per_type)
        }
        Ok(fields)
    }

    /// <https://spec.graphql.org/October2021/#CollectFields()>
    ///
    /// Unlike execution, this collects for a set of object types at once,
    /// tagging each field with the subset it applies to.
    fn collect_fields(
        &mut self,
        context: &IndexSet<Name>,
        selection_set: &'doc SelectionSet,
        grouped_fields: &mut IndexMap<&'doc Name, Vec<CollectedField<'doc>>>,
    ) {
        // No object type can reach these selections
        if context.is_empty() {
            return;
        }
        let document = self.document;
        for selection in &selection_set.selections {
            if !selection_survives(selection.directives(), self.variables) {
                continue;
            }
            match selection {
                Selection::Field(field) => grouped_fields
                    .entry(field.response_key())
                    .or_default()
                    .push(CollectedField {
                        field,
                        parent_type: &selection_set.ty,
                        object_types: context.clone(),
                    }),
                Selection::FragmentSpread(spread) => {
                    let Some(fragment) = document.fragments.get(&spread.fragment_name) else {
                        continue;
                    };
                    let narrowed = self
                        .possible_types
                        .narrow(context, Some(fragment.type_condition()));
                    if !narrowed.is_empty() {
                        self.collect_fields(&narrowed, &fragment.selection_set, grouped_fields)
                    }
                }
                Selection::InlineFragment(inline) => {
                    let narrowed = self
                        .possible_types
                        .narrow(context, inline.type_condition.as_ref());
                    if !narrowed.is_empty() {
                        self.collect_fields(&narrowed, &inline.selection_set, grouped_fields)
                    }
                }
            }
        }
    }

    fn merge_field(
        &mut self,
        response_key: &Name,
        object_types: IndexSet<Name>,
        context: &IndexSet<Name>,
        occurrences: &[&CollectedField<'doc>],
        level: usize,
    ) -> Result<FieldBuilder, NormalizationError> {
        self.field_count += 1;
        if self.field_count > self.limits.max_field_count {
            return Err(NormalizationError::MaxFieldCountExceeded {
                limit: self.limits.max_field_count,
            });
        }
        let first = occurrences[0];
        let arguments = self.argument_values(first)?;
        for other in &occurrences[1..] {
            let ambiguous = |message| NormalizationError::AmbiguousFieldMerge {
                response_key: response_key.clone(),
                object_type: object_types[0].clone(),
                message,
            };
            if other.field.name != first.field.name {
                return Err(ambiguous(format!(
                    "`{}` and `{}` are different fields",
                    first.field.name, other.field.name
                )));
            }
            // Identical literals coerce identically
            if other.field.arguments != first.field.arguments
                && self.argument_values(other)? != arguments
            {
                return Err(ambiguous(format!(
                    "`{}` is selected with different arguments",
                    first.field.name
                )));
            }
        }

        let name = &first.field.name;
        let bindings: IndexMap<Name, Node<FieldDefinition>> = object_types
            .iter()
            .map(|object_type| {
                let definition = match self.schema.type_field(object_type, name) {
                    Ok(component) => component.node.clone(),
                    Err(_) => first.field.definition.clone(),
                };
                (object_type.clone(), definition)
            })
            .collect();

        let sub_selections: Vec<&'doc SelectionSet> = occurrences
            .iter()
            .map(|occurrence| &occurrence.field.selection_set)
            .filter(|selection_set| !selection_set.selections.is_empty())
            .collect();
        let mut child_context = IndexSet::new();
        if !sub_selections.is_empty() {
            for definition in bindings.values() {
                let inner = definition.ty.inner_named_type();
                child_context.extend(self.possible_types.of(inner).iter().cloned())
            }
        }
        // An abstract return type without implementations selects nothing
        let children = if child_context.is_empty() {
            Vec::new()
        } else {
            self.merge(&child_context, &sub_selections, level + 1)?
        };

        Ok(FieldBuilder {
            response_key: response_key.clone(),
            name: name.clone(),
            alias: first.field.alias.clone(),
            bindings,
            output_type: first.field.definition.ty.inner_named_type().clone(),
            arguments,
            children,
            possible_type_count: context.len(),
        })
    }

    fn argument_values(
        &self,
        collected: &CollectedField<'doc>,
    ) -> Result<JsonMap, NormalizationError> {
        self.coercion.argument_values(
            self.variables,
            collected.parent_type,
            &collected.field.definition,
            collected.field,
        )
    }
}
