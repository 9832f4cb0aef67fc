//! Built-in modifiers.
//!
//! Each modifier is a unit struct registered under its type name. The
//! default modifier scheme lists them in the order a menuconf without an
//! explicit `modifiers` entry runs them.

use std::sync::Arc;

use super::modifier::Modifier;

mod auth;
mod cut_levels;
mod extender;
mod jump;
mod level;
mod metadata;
mod namespace;
mod permission;
mod positional;
mod root;

pub use auth::AuthVisibility;
pub use cut_levels::CutLevels;
pub use extender::NavigationExtender;
pub use jump::Jump;
pub use level::Level;
pub use metadata::MetaDataProcessor;
pub use namespace::Namespace;
pub use permission::PermissionVisibility;
pub use positional::PositionalMarker;
pub use root::Root;

/// Modifier names used when a menuconf declares no modifiers.
pub const DEFAULT_SCHEME: &[&str] = &[
    NavigationExtender::NAME,
    AuthVisibility::NAME,
    Jump::NAME,
    Root::NAME,
    Namespace::NAME,
    Level::NAME,
    MetaDataProcessor::NAME,
    PositionalMarker::NAME,
    CutLevels::NAME,
];

/// One instance of every built-in modifier.
pub fn builtin() -> Vec<Arc<dyn Modifier>> {
    vec![
        Arc::new(NavigationExtender),
        Arc::new(AuthVisibility),
        Arc::new(PermissionVisibility),
        Arc::new(Jump),
        Arc::new(Root),
        Arc::new(Namespace),
        Arc::new(Level),
        Arc::new(MetaDataProcessor),
        Arc::new(PositionalMarker),
        Arc::new(CutLevels),
    ]
}
