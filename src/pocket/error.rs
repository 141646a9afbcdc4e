use thiserror::Error;

/// The single failure kind of the Pocket client.
///
/// Transport errors, non-success statuses and undecodable bodies all collapse
/// into this; the reason is kept for logs only.
#[derive(Error, Debug)]
#[error("Pocket {operation} request failed: {reason}")]
pub struct PocketError {
    operation: &'static str,
    reason: String,
}

impl PocketError {
    pub fn new(operation: &'static str, reason: impl ToString) -> Self {
        Self {
            operation,
            reason: reason.to_string(),
        }
    }

    /// The Pocket operation that failed.
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}
