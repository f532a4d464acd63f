//! Home directory and environment variable expansion for config strings.

use crate::ConfigError;

/// Expand `~`, `$VAR`, `${VAR}` and `${VAR:-default}` in a config value.
///
/// # Arguments
///
/// * `value` - Raw string from the config file
/// * `field` - Config field path, used in error messages
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::full(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}
