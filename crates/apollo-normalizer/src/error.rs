use apollo_compiler::executable::OperationType;
use apollo_compiler::Name;

/// An error that aborts normalization of an operation.
///
/// No partial [`NormalizedOperation`][crate::NormalizedOperation] is produced
/// when one of these is returned.
/// The type is cheap to clone so that a single failure can be handed
/// to every waiter of a [coalescing provider][crate::provider::CoalescingDocumentProvider].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NormalizationError {
    /// A raw variable value is incompatible with the declared variable type,
    /// or a required variable is missing and has no default value.
    #[error("invalid value for variable `${variable}`: {message}")]
    VariableCoercion { variable: Name, message: String },

    /// A field argument could not be coerced to the type of its definition.
    #[error("invalid value for argument `{argument}` of `{coordinate}`: {message}")]
    ArgumentCoercion {
        /// `Type.field` of the definition the argument belongs to
        coordinate: String,
        argument: Name,
        message: String,
    },

    /// Two selections share a response key and an object type
    /// but cannot be merged into one field.
    #[error("cannot merge selections for `{response_key}` on type `{object_type}`: {message}")]
    AmbiguousFieldMerge {
        response_key: Name,
        object_type: Name,
        message: String,
    },

    /// The requested operation does not exist in the document,
    /// or no name was given and the document has several operations.
    #[error("{}", describe_unknown_operation(.name.as_deref()))]
    UnknownOperation { name: Option<String> },

    /// The schema has no object type for the root of this operation type.
    #[error(
        "the schema does not define a root object type for {} operations",
        .operation_type.name()
    )]
    UndefinedRootType { operation_type: OperationType },

    #[error("the operation exceeds the maximum depth of {limit}")]
    MaxDepthExceeded { limit: usize },

    #[error("the operation exceeds the maximum number of normalized fields ({limit})")]
    MaxFieldCountExceeded { limit: usize },
}

fn describe_unknown_operation(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("no operation named `{name}`"),
        None => "multiple operations but no operation name, or no operation at all".to_owned(),
    }
}

impl NormalizationError {
    pub(crate) fn variable(variable: &Name, message: impl Into<String>) -> Self {
        Self::VariableCoercion {
            variable: variable.clone(),
            message: message.into(),
        }
    }
}
