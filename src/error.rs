use thiserror::Error;

/// Failures reported by the tree's mutating operations.
///
/// Both are routine outcomes rather than faults: the tree is left exactly as
/// it was before the call.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// The key is already stored in the tree, live or tombstoned.
    #[error("key already present in tree")]
    DuplicateKey,
    /// The key was never inserted, or has already been removed.
    #[error("key not found in tree")]
    KeyNotFound,
}
