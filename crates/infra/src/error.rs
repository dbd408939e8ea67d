use thiserror::Error;

use globalsourcing_core::DomainError;

use crate::store::StoreError;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Failure of a workflow operation. Either way, nothing was committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            WorkflowError::Store(StoreError::Conflict(_))
                | WorkflowError::Domain(DomainError::Conflict(_))
        )
    }

    /// The domain error, if this is one.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            WorkflowError::Domain(e) => Some(e),
            WorkflowError::Store(_) => None,
        }
    }
}
