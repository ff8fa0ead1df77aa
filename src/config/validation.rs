use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::sync::LazyLock;

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env reference pattern is valid"));

/// Expand environment variables in a string using ${VAR_NAME} syntax.
/// Unset variables are left as-is.
pub fn expand_env_var_in_string(value: &str) -> String {
    ENV_REFERENCE
        .replace_all(value, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

pub fn expand_env_vars(env: &HashMap<String, String>) -> HashMap<String, String> {
    env.iter()
        .map(|(key, value)| (key.clone(), expand_env_var_in_string(value)))
        .collect()
}
