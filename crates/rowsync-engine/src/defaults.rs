//! Default value resolution and the pre-insert hook.
//!
//! Both take a caller-supplied function plus an argument list whose
//! entries are either literal values or back-references to fields of
//! the row being processed. Back-references resolve at call time, so a
//! default declared earlier in the same pass is visible to later ones.

use std::fmt;
use std::sync::Arc;

use rowsync_store::{Row, Value};

use crate::error::{BoxError, ReconcileError, ReconcileResult};

/// An argument to a default function or hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSpec {
    /// Back-reference: the current value of a field on the same row.
    /// An absent field resolves to null.
    Field(String),
    /// A literal value, passed through unchanged.
    Literal(Value),
}

impl ArgSpec {
    /// Create a back-reference argument.
    pub fn field(name: impl Into<String>) -> Self {
        ArgSpec::Field(name.into())
    }

    /// Create a literal argument.
    pub fn literal(value: impl Into<Value>) -> Self {
        ArgSpec::Literal(value.into())
    }
}

/// Resolve an argument list against a row at call time.
pub(crate) fn resolve_args(args: &[ArgSpec], row: &Row) -> Vec<Value> {
    args.iter()
        .map(|arg| match arg {
            ArgSpec::Field(name) => row.get(name).cloned().unwrap_or(Value::Null),
            ArgSpec::Literal(value) => value.clone(),
        })
        .collect()
}

/// Caller-supplied function computing a default value.
pub type DefaultFn = Arc<dyn Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// A default declaration: a function plus its argument list.
///
/// Re-applied once per match record sharing the desired row, so the
/// function must be idempotent for the same inputs.
#[derive(Clone)]
pub struct DefaultSpec {
    func: DefaultFn,
    args: Vec<ArgSpec>,
}

impl DefaultSpec {
    /// Create a default from a function.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            args: Vec::new(),
        }
    }

    /// Append a literal argument.
    #[must_use]
    pub fn literal(mut self, value: impl Into<Value>) -> Self {
        self.args.push(ArgSpec::literal(value));
        self
    }

    /// Append a back-reference argument.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.args.push(ArgSpec::field(name));
        self
    }

    fn resolve(&self, row: &Row) -> Result<Value, BoxError> {
        let args = resolve_args(&self.args, row);
        (self.func)(&args)
    }
}

impl fmt::Debug for DefaultSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSpec")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Apply declared defaults to a row in declaration order, writing each
/// computed value back into the row. Function errors propagate with the
/// field name attached.
pub(crate) fn apply_defaults(
    defaults: &[(String, DefaultSpec)],
    row: &mut Row,
) -> ReconcileResult<()> {
    for (field, spec) in defaults {
        let value = spec
            .resolve(row)
            .map_err(|source| ReconcileError::Default {
                field: field.clone(),
                source,
            })?;
        row.set(field.clone(), value);
    }
    Ok(())
}

/// Caller-supplied pre-insert hook function.
pub type HookFn = Arc<dyn Fn(&[Value]) -> Result<(), BoxError> + Send + Sync>;

/// A hook invoked once per inserted row, strictly before the insert.
/// Skipped entirely in dry-run mode.
#[derive(Clone)]
pub struct InsertHook {
    func: HookFn,
    args: Vec<ArgSpec>,
}

impl InsertHook {
    /// Create a hook from a function.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            args: Vec::new(),
        }
    }

    /// Append a literal argument.
    #[must_use]
    pub fn literal(mut self, value: impl Into<Value>) -> Self {
        self.args.push(ArgSpec::literal(value));
        self
    }

    /// Append a back-reference argument.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.args.push(ArgSpec::field(name));
        self
    }

    pub(crate) fn invoke(&self, row: &Row) -> ReconcileResult<()> {
        let args = resolve_args(&self.args, row);
        (self.func)(&args).map_err(ReconcileError::Hook)
    }
}

impl fmt::Debug for InsertHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertHook")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_args_pass_through() {
        let spec = DefaultSpec::new(|args| Ok(args[0].clone())).literal("fixed");
        let mut row = Row::new().with("id", 1i64);
        apply_defaults(&[("status".to_string(), spec)], &mut row).unwrap();
        assert_eq!(row.get("status"), Some(&Value::from("fixed")));
    }

    #[test]
    fn test_back_reference_resolves_at_call_time() {
        let upper = DefaultSpec::new(|args| {
            Ok(match &args[0] {
                Value::Text(s) => Value::Text(s.to_uppercase()),
                other => other.clone(),
            })
        })
        .field("name");
        let mut row = Row::new().with("name", "ada");
        apply_defaults(&[("display".to_string(), upper)], &mut row).unwrap();
        assert_eq!(row.get("display"), Some(&Value::from("ADA")));
    }

    #[test]
    fn test_earlier_default_visible_to_later_one() {
        let defaults = vec![
            (
                "a".to_string(),
                DefaultSpec::new(|_| Ok(Value::from(1i64))),
            ),
            (
                "b".to_string(),
                DefaultSpec::new(|args| Ok(args[0].clone())).field("a"),
            ),
        ];
        let mut row = Row::new();
        apply_defaults(&defaults, &mut row).unwrap();
        assert_eq!(row.get("b"), Some(&Value::from(1i64)));
    }

    #[test]
    fn test_absent_back_reference_resolves_to_null() {
        let row = Row::new();
        let args = resolve_args(&[ArgSpec::field("missing")], &row);
        assert_eq!(args, vec![Value::Null]);
    }

    #[test]
    fn test_default_error_carries_field_name() {
        let failing = DefaultSpec::new(|_| Err("boom".into()));
        let mut row = Row::new();
        let err = apply_defaults(&[("x".to_string(), failing)], &mut row).unwrap_err();
        assert!(matches!(err, ReconcileError::Default { ref field, .. } if field == "x"));
    }

    #[test]
    fn test_hook_error_propagates() {
        let hook = InsertHook::new(|_| Err("refused".into()));
        let err = hook.invoke(&Row::new()).unwrap_err();
        assert!(matches!(err, ReconcileError::Hook(_)));
    }
}
