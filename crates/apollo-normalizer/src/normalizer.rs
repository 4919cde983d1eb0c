use crate::coercion::Coercion;
use crate::collect::FieldMerger;
use crate::collect::Limits;
use crate::JsonMap;
use crate::JsonValue;
use crate::NormalizationError;
use crate::NormalizedDocument;
use crate::NormalizedOperation;
use crate::ScalarCoercion;
use apollo_compiler::executable::Operation;
use apollo_compiler::validation::Valid;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use indexmap::IndexMap;
use indexmap::IndexSet;
use std::fmt;
use std::sync::Arc;

/// Default for [`Normalizer::max_field_count`]
pub const DEFAULT_MAX_FIELD_COUNT: usize = 100_000;

/// Configuration for normalizing operations.
///
/// ```
/// use apollo_compiler::{ExecutableDocument, Schema};
/// use apollo_normalizer::{JsonMap, Normalizer};
///
/// let schema = Schema::parse_and_validate("type Query { a: Int }", "schema.graphql").unwrap();
/// let document = ExecutableDocument::parse_and_validate(&schema, "{ a a }", "query.graphql").unwrap();
/// let operation = Normalizer::new()
///     .max_depth(10)
///     .normalize_operation(&schema, &document, None, &JsonMap::new())
///     .unwrap();
/// assert_eq!(operation.field_count(), 1);
/// ```
#[derive(Clone)]
pub struct Normalizer {
    max_depth: Option<usize>,
    max_field_count: usize,
    custom_scalars: IndexMap<Name, ScalarCoercion>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_field_count: DEFAULT_MAX_FIELD_COUNT,
            custom_scalars: IndexMap::new(),
        }
    }
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer")
            .field("max_depth", &self.max_depth)
            .field("max_field_count", &self.max_field_count)
            .field("custom_scalars", &self.custom_scalars.keys())
            .finish()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the maximum level of normalized fields, where root fields are at level 1.
    /// Deeper operations fail with [`NormalizationError::MaxDepthExceeded`].
    pub fn max_depth(mut self, value: usize) -> Self {
        self.max_depth = Some(value);
        self
    }

    /// Configure the maximum number of merged fields built for one operation.
    /// Larger operations fail with [`NormalizationError::MaxFieldCountExceeded`].
    ///
    /// Defaults to [`DEFAULT_MAX_FIELD_COUNT`]
    pub fn max_field_count(mut self, value: usize) -> Self {
        self.max_field_count = value;
        self
    }

    /// Register input coercion for a custom scalar type,
    /// applied to variable values and argument literals of that type.
    pub fn scalar_coercion(
        mut self,
        scalar_name: Name,
        coercion: impl Fn(&JsonValue) -> Result<JsonValue, String> + Send + Sync + 'static,
    ) -> Self {
        self.custom_scalars.insert(scalar_name, Arc::new(coercion));
        self
    }

    /// Normalize one operation of `document`.
    ///
    /// `operation_name` selects the operation like in a GraphQL request:
    /// it can be omitted if the document contains exactly one operation.
    pub fn normalize_operation(
        &self,
        schema: &Valid<Schema>,
        document: &Valid<ExecutableDocument>,
        operation_name: Option<&str>,
        variables: &JsonMap,
    ) -> Result<NormalizedOperation, NormalizationError> {
        let operation = document.operations.get(operation_name).map_err(|_| {
            NormalizationError::UnknownOperation {
                name: operation_name.map(ToOwned::to_owned),
            }
        })?;
        self.normalize(schema, document, operation, variables)
    }

    /// Normalize every operation of `document` with the same variable values.
    pub fn normalize_document(
        &self,
        schema: &Valid<Schema>,
        document: &Valid<ExecutableDocument>,
        variables: &JsonMap,
    ) -> Result<NormalizedDocument, NormalizationError> {
        let operations = document
            .operations
            .iter()
            .map(|operation| self.normalize(schema, document, operation, variables))
            .collect::<Result<_, _>>()?;
        Ok(NormalizedDocument::new(operations))
    }

    fn normalize(
        &self,
        schema: &Schema,
        document: &ExecutableDocument,
        operation: &Operation,
        variables: &JsonMap,
    ) -> Result<NormalizedOperation, NormalizationError> {
        let _span = tracing::debug_span!(
            "normalize_operation",
            operation_type = operation.operation_type.name(),
            operation_name = operation.name.as_ref().map(|name| name.as_str()),
        )
        .entered();

        let root_type = &operation.selection_set.ty;
        if schema.get_object(root_type).is_none() {
            return Err(NormalizationError::UndefinedRootType {
                operation_type: operation.operation_type,
            });
        }
        let coercion = Coercion::new(schema, &self.custom_scalars);
        let variables = coercion.variable_values(operation, variables)?;
        let limits = Limits {
            max_depth: self.max_depth,
            max_field_count: self.max_field_count,
        };
        let root_fields = {
            let mut merger = FieldMerger::new(schema, document, &variables, coercion, limits);
            let context = IndexSet::from([root_type.clone()]);
            merger.merge(&context, &[&operation.selection_set], 1)?
        };
        let normalized = NormalizedOperation::new(
            operation.operation_type,
            operation.name.clone(),
            root_type.clone(),
            variables,
            root_fields,
        );
        tracing::debug!(
            field_count = normalized.field_count(),
            depth = normalized.depth(),
            "normalized operation"
        );
        Ok(normalized)
    }
}
