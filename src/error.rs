use thiserror::Error;

/// Errors raised when a gesture or layout request references the workflow
/// inconsistently.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanvasError {
    #[error("Step '{0}' not found in workflow")]
    UnknownStep(String),

    #[error("Block group '{0}' not found in workflow")]
    UnknownGroup(String),

    #[error("Step '{step_id}' belongs to block group '{group_id}', which does not exist")]
    DanglingMembership { step_id: String, group_id: String },

    #[error("Failed to parse workflow document: {0}")]
    InvalidDocument(String),
}

/// Errors reported by a [`crate::persist::WorkflowStore`] for a single update call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{kind} '{id}' was rejected by the store: {message}")]
    Rejected {
        kind: &'static str,
        id: String,
        message: String,
    },

    #[error("{kind} '{id}' no longer exists")]
    Missing { kind: &'static str, id: String },
}
