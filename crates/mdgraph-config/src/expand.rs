//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references from the process environment.
///
/// Bare `$VAR` is left alone, so paths and URLs containing `$` stay intact.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    expand_with(value, field, |var| std::env::var(var).ok())
}

/// Expand references using `lookup` to resolve variable names.
///
/// An unset variable without a default is an error naming `field`.
fn expand_with<F>(value: &str, field: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| match lookup(var) {
        Some(found) => Ok(Some(found)),
        None => Err(UnsetVar),
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} is not set", e.var_name),
    })
}

/// Lookup failure for a variable that is not set.
struct UnsetVar;
