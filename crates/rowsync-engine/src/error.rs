//! Reconciliation error types.

use thiserror::Error;

use rowsync_store::{StoreError, Value};

/// Boxed error produced by caller-supplied default and hook functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error raised during a reconciliation run.
///
/// Uniqueness-constraint violations on updates and inserts never reach
/// the caller: the executors catch them per row, log once, and
/// continue. Everything below aborts the remaining pipeline.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Current and desired values for a field are both non-null but of
    /// different types.
    #[error(
        "cannot reconcile field={field}; types differ for desired={desired} ({desired_type}) \
         and current={current} ({current_type})",
        desired_type = .desired.type_name(),
        current_type = .current.type_name()
    )]
    TypeMismatch {
        field: String,
        current: Value,
        desired: Value,
    },

    /// A store operation failed with something other than a caught
    /// constraint violation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A caller-supplied default function failed.
    #[error("default function failed for field {field}")]
    Default {
        field: String,
        #[source]
        source: BoxError,
    },

    /// The caller-supplied pre-insert hook failed.
    #[error("before-insert hook failed")]
    Hook(#[source] BoxError),
}

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_names_field_values_and_types() {
        let err = ReconcileError::TypeMismatch {
            field: "age".to_string(),
            current: Value::from("5"),
            desired: Value::from(5i64),
        };
        let msg = err.to_string();
        assert!(msg.contains("field=age"));
        assert!(msg.contains("desired=5 (integer)"));
        assert!(msg.contains("current=5 (text)"));
    }
}
