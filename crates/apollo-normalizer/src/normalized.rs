use crate::collect::FieldBuilder;
use crate::selection_set::SelectionSet;
use crate::JsonMap;
use crate::VariableValues;
use apollo_compiler::executable::OperationType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::Name;
use apollo_compiler::Node;
use indexmap::IndexMap;
use std::fmt;
use std::ops::Range;

/// Identifies a field within its [`NormalizedOperation`].
///
/// Ids are assigned in depth-first pre-order, so the fields of a subtree have consecutive ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct FieldData {
    response_key: Name,
    name: Name,
    alias: Option<Name>,
    bindings: IndexMap<Name, Node<FieldDefinition>>,
    output_type: Name,
    arguments: JsonMap,
    children: Vec<FieldId>,
    parent: Option<FieldId>,
    level: usize,
    /// Exclusive end of this field’s subtree in the arena
    subtree_end: usize,
    is_conditional: bool,
    /// Response keys from the root, separated by `/`
    qualified_name: String,
}

/// An operation as a tree of merged fields.
///
/// Fields selected several times (directly or through fragments) under the same response key
/// are merged, fragments are expanded, and `@skip`/`@include` are applied.
/// Each field knows which concrete object types it applies to.
///
/// Immutable once built. Fields are accessed through [`NormalizedField`] handles.
#[derive(Debug, Clone)]
pub struct NormalizedOperation {
    operation_type: OperationType,
    name: Option<Name>,
    root_type: Name,
    variables: VariableValues,
    fields: Vec<FieldData>,
    root_fields: Vec<FieldId>,
    depth: usize,
}

impl NormalizedOperation {
    pub(crate) fn new(
        operation_type: OperationType,
        name: Option<Name>,
        root_type: Name,
        variables: VariableValues,
        root_fields: Vec<FieldBuilder>,
    ) -> Self {
        let mut operation = Self {
            operation_type,
            name,
            root_type,
            variables,
            fields: Vec::new(),
            root_fields: Vec::new(),
            depth: 0,
        };
        for builder in root_fields {
            let id = operation.freeze(builder, None, 1);
            operation.root_fields.push(id)
        }
        operation
    }

    fn freeze(&mut self, builder: FieldBuilder, parent: Option<FieldId>, level: usize) -> FieldId {
        let id = FieldId(self.fields.len());
        let qualified_name = match parent {
            Some(parent) => format!(
                "{}/{}",
                self.fields[parent.0].qualified_name, builder.response_key
            ),
            None => builder.response_key.to_string(),
        };
        self.depth = self.depth.max(level);
        self.fields.push(FieldData {
            is_conditional: builder.bindings.len() < builder.possible_type_count,
            response_key: builder.response_key,
            name: builder.name,
            alias: builder.alias,
            bindings: builder.bindings,
            output_type: builder.output_type,
            arguments: builder.arguments,
            children: Vec::with_capacity(builder.children.len()),
            parent,
            level,
            subtree_end: 0,
            qualified_name,
        });
        for child in builder.children {
            let child_id = self.freeze(child, Some(id), level + 1);
            self.fields[id.0].children.push(child_id)
        }
        self.fields[id.0].subtree_end = self.fields.len();
        id
    }

    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    /// The root object type for this operation’s type
    pub fn root_type(&self) -> &Name {
        &self.root_type
    }

    /// Coerced values of the variables this operation was normalized with
    pub fn variables(&self) -> &VariableValues {
        &self.variables
    }

    pub fn root_fields(&self) -> impl ExactSizeIterator<Item = NormalizedField<'_>> {
        self.root_fields.iter().map(move |&id| self.handle(id))
    }

    /// Level of the deepest field. Zero if there are no fields.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Total number of normalized fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the field with this id, or `None` if the id is from another operation
    pub fn field(&self, id: FieldId) -> Option<NormalizedField<'_>> {
        (id.0 < self.fields.len()).then(|| self.handle(id))
    }

    /// Iterates over all fields in depth-first pre-order
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            operation: self,
            range: 0..self.fields.len(),
        }
    }

    /// Returns fields for the `Type.field` schema coordinate:
    /// fields named `field_name` that have a binding for `type_name`.
    pub fn fields_for_coordinate(
        &self,
        type_name: &str,
        field_name: &str,
    ) -> Vec<NormalizedField<'_>> {
        self.walk()
            .filter(|field| {
                field.name() == field_name && field.data().bindings.contains_key(type_name)
            })
            .collect()
    }

    /// A selection set of the root fields
    pub fn selection_set(&self) -> SelectionSet<'_> {
        SelectionSet::for_operation(self)
    }

    fn handle(&self, id: FieldId) -> NormalizedField<'_> {
        NormalizedField {
            operation: self,
            id,
        }
    }
}

/// A merged field of a [`NormalizedOperation`].
#[derive(Clone, Copy)]
pub struct NormalizedField<'op> {
    operation: &'op NormalizedOperation,
    id: FieldId,
}

impl<'op> NormalizedField<'op> {
    fn data(&self) -> &'op FieldData {
        &self.operation.fields[self.id.0]
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn operation(&self) -> &'op NormalizedOperation {
        self.operation
    }

    /// The alias if there is one, or the field name
    pub fn response_key(&self) -> &'op Name {
        &self.data().response_key
    }

    pub fn name(&self) -> &'op Name {
        &self.data().name
    }

    pub fn alias(&self) -> Option<&'op Name> {
        self.data().alias.as_ref()
    }

    /// Concrete object types this field applies to,
    /// each with the definition of the field on that type. Never empty.
    pub fn object_type_bindings(&self) -> &'op IndexMap<Name, Node<FieldDefinition>> {
        &self.data().bindings
    }

    pub fn object_type_names(&self) -> impl ExactSizeIterator<Item = &'op Name> {
        self.data().bindings.keys()
    }

    /// The definition of this field on the given concrete object type
    pub fn field_definition(&self, object_type: &str) -> Option<&'op Node<FieldDefinition>> {
        self.data().bindings.get(object_type)
    }

    /// The named type this field returns, without list or non-null wrappers.
    ///
    /// When bindings disagree (covariant interface implementations),
    /// this is the type of the first selection of the field.
    pub fn output_type(&self) -> &'op Name {
        &self.data().output_type
    }

    /// Coerced argument values, with defaults applied and variables replaced
    pub fn arguments(&self) -> &'op JsonMap {
        &self.data().arguments
    }

    pub fn children(&self) -> impl ExactSizeIterator<Item = NormalizedField<'op>> + 'op {
        let operation = self.operation;
        self.data()
            .children
            .iter()
            .map(move |&id| operation.handle(id))
    }

    pub fn has_children(&self) -> bool {
        !self.data().children.is_empty()
    }

    pub fn parent(&self) -> Option<NormalizedField<'op>> {
        self.data().parent.map(|id| self.operation.handle(id))
    }

    /// Root fields are at level 1
    pub fn level(&self) -> usize {
        self.data().level
    }

    /// Whether this is a meta-field: `__typename`, `__schema`, or `__type`
    pub fn is_introspection_field(&self) -> bool {
        self.data().name.starts_with("__")
    }

    /// Whether this field only applies to some of the object types possible at its position,
    /// for example because it was selected in a fragment with a type condition.
    pub fn is_conditional(&self) -> bool {
        self.data().is_conditional
    }

    /// Response keys from the root of the operation to this field, separated by `/`
    pub fn qualified_name(&self) -> &'op str {
        &self.data().qualified_name
    }

    pub fn selection_set(&self) -> SelectionSet<'op> {
        SelectionSet::for_field(*self)
    }

    /// Iterates over descendants of this field (not including itself) in depth-first pre-order
    pub fn walk(&self) -> Walk<'op> {
        Walk {
            operation: self.operation,
            range: self.id.0 + 1..self.data().subtree_end,
        }
    }
}

impl PartialEq for NormalizedField<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.operation, other.operation) && self.id == other.id
    }
}

impl Eq for NormalizedField<'_> {}

/// Formats as `[Type1, Type2].name`, prefixed with `alias: ` if the field has an alias
impl fmt::Display for NormalizedField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        if let Some(alias) = &data.alias {
            write!(f, "{alias}: ")?
        }
        f.write_str("[")?;
        for (i, object_type) in data.bindings.keys().enumerate() {
            if i > 0 {
                f.write_str(", ")?
            }
            f.write_str(object_type)?
        }
        write!(f, "].{}", data.name)
    }
}

impl fmt::Debug for NormalizedField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Indented tree of fields with their arguments, one per line.
impl fmt::Display for NormalizedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation_type.name())?;
        if let Some(name) = &self.name {
            write!(f, " {name}")?
        }
        writeln!(f)?;
        for field in self.walk() {
            let indent = "  ".repeat(field.level());
            write!(f, "{indent}{field}")?;
            let arguments = field.arguments();
            if !arguments.is_empty() {
                f.write_str("(")?;
                for (i, (name, value)) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?
                    }
                    write!(f, "{}: {value}", name.as_str())?
                }
                f.write_str(")")?
            }
            writeln!(f)?
        }
        Ok(())
    }
}

/// Depth-first pre-order iterator over normalized fields,
/// returned by [`NormalizedOperation::walk`] and [`NormalizedField::walk`].
#[derive(Clone)]
pub struct Walk<'op> {
    operation: &'op NormalizedOperation,
    range: Range<usize>,
}

impl<'op> Iterator for Walk<'op> {
    type Item = NormalizedField<'op>;

    fn next(&mut self) -> Option<Self::Item> {
        self.range.next().map(|i| self.operation.handle(FieldId(i)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl ExactSizeIterator for Walk<'_> {}
