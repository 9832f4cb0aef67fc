//! Per-request state for menu processing.
//!
//! A [`MenuRequest`] is created by the web layer for each incoming request.
//! It carries the visitor context the modifiers need, the metadata
//! accumulator templates read from, and the processor's request-scoped
//! memo so repeated template calls reuse one stabilised tree.

use std::collections::HashMap;

use super::data::NodesData;
use super::metadata::MetaData;

/// Visitor context for the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    /// Whether the visitor is authenticated.
    pub authenticated: bool,
    /// Permissions granted to the visitor.
    pub permissions: Vec<String>,
}

impl UserContext {
    /// Context for an anonymous visitor.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for an authenticated visitor.
    pub fn authenticated(permissions: Vec<String>) -> Self {
        Self {
            authenticated: true,
            permissions,
        }
    }

    /// Check if the visitor has a specific permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Processor state scoped to one request.
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestMenus {
    /// Menuconf chosen by the router, resolved once per request.
    pub(crate) routed: Option<String>,
    /// Stabilised (post-selection) data per menuconf name.
    pub(crate) menus: HashMap<String, NodesData>,
}

/// One request as seen by the menu engine.
#[derive(Debug, Clone)]
pub struct MenuRequest {
    /// Request path, e.g. `/blog/2024/post-1/`.
    pub path: String,
    pub user: UserContext,
    /// Language code used in cache keys.
    pub language: String,
    /// Site identifier used in cache keys.
    pub site_id: String,
    /// Extra cache key discriminators (e.g. a visitor group).
    pub cache_extra: Vec<String>,
    /// Title, breadcrumb and meta tag accumulator.
    pub meta: MetaData,
    pub(crate) menus: RequestMenus,
}

impl MenuRequest {
    /// Create a request for an anonymous visitor with default language and site.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            user: UserContext::anonymous(),
            language: "en".to_string(),
            site_id: "1".to_string(),
            cache_extra: Vec::new(),
            meta: MetaData::new(),
            menus: RequestMenus::default(),
        }
    }

    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = user;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_site(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = site_id.into();
        self
    }

    /// Add a cache key discriminator.
    pub fn with_cache_extra(mut self, extra: impl Into<String>) -> Self {
        self.cache_extra.push(extra.into());
        self
    }

    /// Menuconf name the router chose, once routing has happened.
    pub fn routed_menuconf(&self) -> Option<&str> {
        self.menus.routed.as_deref()
    }

    /// Whether a menuconf was already prepared for this request.
    pub fn has_menu(&self, menuconf: &str) -> bool {
        self.menus.menus.contains_key(menuconf)
    }
}
