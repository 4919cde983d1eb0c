use crate::NormalizationError;
use crate::NormalizedOperation;

/// Every operation of an executable document, normalized with the same variable values.
#[derive(Debug, Clone, Default)]
pub struct NormalizedDocument {
    operations: Vec<NormalizedOperation>,
}

impl NormalizedDocument {
    pub(crate) fn new(operations: Vec<NormalizedOperation>) -> Self {
        Self { operations }
    }

    /// <https://spec.graphql.org/October2021/#GetOperation()>
    ///
    /// Without a name, succeeds only if the document has exactly one operation.
    pub fn get_operation(
        &self,
        operation_name: Option<&str>,
    ) -> Result<&NormalizedOperation, NormalizationError> {
        let found = match operation_name {
            Some(name) => self
                .operations
                .iter()
                .find(|operation| operation.name().is_some_and(|n| n == name)),
            None => self.single_operation(),
        };
        found.ok_or_else(|| NormalizationError::UnknownOperation {
            name: operation_name.map(ToOwned::to_owned),
        })
    }

    /// Returns the only operation, if there is exactly one
    pub fn single_operation(&self) -> Option<&NormalizedOperation> {
        match self.operations.as_slice() {
            [operation] => Some(operation),
            _ => None,
        }
    }

    pub fn operations(&self) -> &[NormalizedOperation] {
        &self.operations
    }
}
