use thiserror::Error;

/// Input rejected before anything is written.
///
/// Repository and service methods return `anyhow::Result`; callers that need
/// to tell bad input apart from storage failures can `downcast_ref` to this.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Name must not be empty")]
    EmptyName,
    #[error("Invalid calories '{0}'. Must be a whole number of 0 or more")]
    InvalidCalories(String),
    #[error("Invalid weight '{0}'. Must be a number greater than 0")]
    InvalidWeight(String),
    #[error("Invalid date '{0}'. Use YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid direction '{0}'. Use 'up' or 'down'")]
    InvalidDirection(String),
    #[error("Invalid daily goal {0}. Must not be negative")]
    InvalidGoal(i64),
    #[error("Window must cover at least one day (got {0})")]
    InvalidWindow(i64),
    #[error("Invalid {field} '{value}'")]
    InvalidAttribute { field: &'static str, value: String },
}

/// True when `err` (or anything it wraps) is a [`ValidationError`].
#[must_use]
pub fn is_validation_error(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<ValidationError>().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_validation_error_through_context() {
        let err = anyhow::Error::new(ValidationError::EmptyName).context("adding entry");
        assert!(is_validation_error(&err));
    }

    #[test]
    fn test_storage_error_is_not_validation() {
        let err = anyhow::anyhow!("disk I/O error");
        assert!(!is_validation_error(&err));
    }
}
