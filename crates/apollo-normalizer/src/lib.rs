//! Normalization of executable GraphQL operations.
//!
//! A [`Normalizer`] turns one operation of a validated document into a tree of merged fields.
//! Fragments are inlined, `@skip` and `@include` are applied with the request's variables,
//! and each field is bound to the concrete object types it applies to.
//! The resulting [`NormalizedOperation`] can be queried with glob patterns
//! through [`SelectionSet`].
//!
//! Example usage:
//!
//! ```
#![doc = include_str!("../tests/doc_example.rs")]
//! ```

mod coercion;
mod collect;
mod directives;
mod document;
mod error;
mod normalized;
mod normalizer;
mod possible_types;
pub mod provider;
pub mod selection_set;

pub use self::coercion::ScalarCoercion;
pub use self::coercion::VariableValues;
pub use self::directives::selection_survives;
pub use self::document::NormalizedDocument;
pub use self::error::NormalizationError;
pub use self::normalized::FieldId;
pub use self::normalized::NormalizedField;
pub use self::normalized::NormalizedOperation;
pub use self::normalized::Walk;
pub use self::normalizer::Normalizer;
pub use self::normalizer::DEFAULT_MAX_FIELD_COUNT;
pub use self::possible_types::PossibleTypes;
pub use self::selection_set::SelectedField;
pub use self::selection_set::SelectionSet;
/// Re-export of the version of the `serde_json_bytes` crate used for [`JsonValue`] and [`JsonMap`]
pub use serde_json_bytes;

/// A JSON-compatible dynamically-typed value.
///
/// Used for raw and coerced variable values, and for coerced field arguments.
pub type JsonValue = serde_json_bytes::Value;

/// A JSON-compatible object/map with string keys and dynamically-typed values.
pub type JsonMap = serde_json_bytes::Map<serde_json_bytes::ByteString, JsonValue>;
