//! Read-only access to environment variables.

use std::collections::HashMap;

/// Key/value lookup for environment variables.
///
/// The process environment is the default. Tests and embedders can supply a
/// `HashMap` instead of mutating global state.
pub trait Environment: Send + Sync {
    /// Look up a variable. Unset and non-unicode values are both `None`.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_environment() {
        let mut env = HashMap::new();
        env.insert("CONFIG_SERVER_URLS".to_string(), "http://a".to_string());
        assert_eq!(env.var("CONFIG_SERVER_URLS").as_deref(), Some("http://a"));
        assert_eq!(env.var("MISSING"), None);
    }

    #[test]
    fn test_process_environment_unset() {
        assert_eq!(
            ProcessEnvironment.var("CLOUDCONFIG_TEST_SURELY_UNSET_VARIABLE"),
            None
        );
    }
}
