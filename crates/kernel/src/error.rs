//! Navigation error types with clear, actionable messages.
//!
//! Configuration errors are fatal and surface at startup. Data errors in
//! menu output (duplicate ids, orphans, foreign domains) never reach this
//! type: the tree builder drops the offending branch and logs it instead.

use thiserror::Error;

/// Errors that can occur while configuring or running the menu engine.
#[derive(Debug, Error)]
pub enum MenuError {
    /// One or more menu configurations failed validation.
    #[error("menus improperly configured:\n{}", .0.join("\n"))]
    ImproperlyConfigured(Vec<String>),

    /// A menuconf name was requested that is not configured.
    #[error("menus menuconf invalid name ({0})")]
    UnknownMenuConf(String),

    /// A modifier group was requested that the menuconf does not declare.
    #[error("menuconf '{menuconf}': unknown modifiers group '{group}'")]
    UnknownModifierGroup { menuconf: String, group: String },

    /// A menu was referenced by namespace but never registered.
    #[error("menu '{0}' is not registered")]
    UnknownMenu(String),

    /// Two menus were registered under the same namespace.
    #[error("menu with namespace '{0}' is already registered")]
    NamespaceAlreadyRegistered(String),

    /// Two modifiers were registered under the same name.
    #[error("modifier with name '{0}' is already registered")]
    ModifierAlreadyRegistered(String),

    /// A menu source failed while producing nodes.
    #[error("menu '{namespace}': failed to get nodes: {source}")]
    MenuSource {
        namespace: String,
        #[source]
        source: anyhow::Error,
    },

    /// A modifier failed while transforming nodes.
    #[error("modifier '{modifier}': {source}")]
    Modifier {
        modifier: String,
        #[source]
        source: anyhow::Error,
    },

    /// Selection kept requesting rebuilds past the configured bound.
    #[error("menuconf '{menuconf}': too deep rebuild cycle (limit {limit})")]
    RebuildLoop { menuconf: String, limit: usize },

    /// Registry discovery did not finish within the allowed wait.
    #[error("menu registry discovery did not complete within {timeout_secs}s")]
    DiscoveryTimeout { timeout_secs: u64 },

    /// Registry discovery itself failed.
    #[error("menu registry discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Settings could not be read or parsed.
    #[error("menu settings: {0}")]
    Settings(String),

    /// A cached tree could not be serialized.
    #[error("cache serialization failed: {0}")]
    Cache(#[from] serde_json::Error),
}

impl MenuError {
    /// Wrap a menu source failure.
    pub fn menu_source(namespace: impl Into<String>, source: anyhow::Error) -> Self {
        Self::MenuSource {
            namespace: namespace.into(),
            source,
        }
    }

    /// Wrap a modifier failure.
    pub fn modifier(modifier: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Modifier {
            modifier: modifier.into(),
            source,
        }
    }

    /// Whether this error comes from configuration rather than runtime data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ImproperlyConfigured(_)
                | Self::UnknownMenuConf(_)
                | Self::UnknownModifierGroup { .. }
                | Self::UnknownMenu(_)
                | Self::NamespaceAlreadyRegistered(_)
                | Self::ModifierAlreadyRegistered(_)
                | Self::RebuildLoop { .. }
                | Self::Settings(_)
        )
    }
}

/// Result type alias using MenuError.
pub type MenuResult<T> = Result<T, MenuError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_improperly_configured_joins_messages() {
        let err = MenuError::ImproperlyConfigured(vec![
            "first problem".to_string(),
            "second problem".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "menus improperly configured:\nfirst problem\nsecond problem"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_source_errors_keep_context() {
        let err = MenuError::menu_source("PageMenu", anyhow::anyhow!("db down"));
        assert_eq!(err.to_string(), "menu 'PageMenu': failed to get nodes: db down");
        assert!(!err.is_configuration());
    }
}
