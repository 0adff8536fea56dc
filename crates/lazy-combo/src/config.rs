//! Declarative widget configuration.
//!
//! # Example
//!
//! ```
//! use lazy_combo::ComboConfig;
//!
//! let config = ComboConfig::from_toml_str(
//!     r#"
//!     text_member = "Name"
//!     editable = false
//!     lookup_threads = 2
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.text_member.as_deref(), Some("Name"));
//! assert!(!config.editable);
//! assert_eq!(config.thread_pool_config().unwrap().num_threads, Some(2));
//! ```

use lazy_combo_core::ThreadPoolConfig;
use serde::Deserialize;

use crate::error::ConfigError;

/// Settings for a [`LazyComboBox`](crate::LazyComboBox).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComboConfig {
    /// Member of each item shown as its text.
    pub text_member: Option<String>,
    /// Whether the user may type into the widget.
    pub editable: bool,
    /// Worker threads for a dedicated lookup pool. `None` uses the global pool.
    pub lookup_threads: Option<usize>,
    /// Thread name prefix for a dedicated lookup pool.
    pub lookup_thread_name: String,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            text_member: None,
            editable: true,
            lookup_threads: None,
            lookup_thread_name: ThreadPoolConfig::default().thread_name,
        }
    }
}

impl ComboConfig {
    /// Parse a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: ComboConfig = toml::from_str(source)?;
        if config.lookup_threads == Some(0) {
            return Err(ConfigError::ZeroLookupThreads);
        }
        Ok(config)
    }

    /// The pool configuration for a dedicated lookup pool, if one is requested.
    pub fn thread_pool_config(&self) -> Option<ThreadPoolConfig> {
        self.lookup_threads.map(|threads| {
            ThreadPoolConfig::with_threads(threads).with_thread_name(self.lookup_thread_name.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(ComboConfig::from_toml_str("").unwrap(), ComboConfig::default());
        assert!(ComboConfig::default().editable);
        assert!(ComboConfig::default().thread_pool_config().is_none());
    }

    #[test]
    fn test_thread_name_override() {
        let config = ComboConfig::from_toml_str(
            "lookup_threads = 1\nlookup_thread_name = \"people-search\"",
        )
        .unwrap();
        let pool = config.thread_pool_config().unwrap();
        assert_eq!(pool.thread_name, "people-search");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ComboConfig::from_toml_str("text_membr = \"Name\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let err = ComboConfig::from_toml_str("lookup_threads = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroLookupThreads));
    }
}
