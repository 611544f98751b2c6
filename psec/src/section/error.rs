//! Section error types

use thiserror::Error;

/// Errors raised by the parallel section itself.
///
/// Failures of the work an item runs are not represented here; they are
/// collected per item in the drain report.
#[derive(Debug, Error)]
pub enum SectionError {
    #[error("Concurrency limit must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("Dispatch found no pending item although a permit was granted")]
    EmptyQueue,

    #[error("Permit semaphore closed: {0}")]
    PermitsClosed(String),

    #[error("Tracked task failed to join: {0}")]
    TaskJoin(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_concurrency_message() {
        let err = SectionError::InvalidConcurrency(0);
        assert!(err.to_string().contains("got 0"));
    }

    #[test]
    fn test_empty_queue_message() {
        let err = SectionError::EmptyQueue;
        assert!(err.to_string().contains("no pending item"));
    }
}
