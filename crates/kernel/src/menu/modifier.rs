//! Modifier contract and lifecycle events.
//!
//! A modifier transforms [`NodesData`] in place. Each one declares the
//! lifecycle events it takes part in; the processor runs the modifiers of
//! a menuconf group in configured order, skipping those that do not
//! declare the current event.

use anyhow::Result;
use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::data::NodesData;
use super::request::MenuRequest;

/// Lifecycle stage a modifier can participate in.
#[derive(EnumSetType, Debug)]
pub enum ModifyEvent {
    /// Once per cache build, before the tree is stored.
    Once,
    /// Once per request, after the cached tree is loaded.
    PerRequest,
    /// Once per request, after the selected node is known.
    PostSelect,
    /// On every `get_nodes` call, against a private copy.
    Default,
}

/// Runtime hints shared between modifiers during one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifyMeta {
    /// Event this pass runs for.
    pub event: ModifyEvent,
    /// The pass repeats after a menu rebuilt content below a selected node.
    pub rebuild_mode: bool,
    /// Some parent link changed; levels are stale.
    pub modified_ancestors: bool,
    /// Some children list changed.
    pub modified_descendants: bool,
}

impl ModifyMeta {
    pub fn new(event: ModifyEvent) -> Self {
        Self {
            event,
            rebuild_mode: false,
            modified_ancestors: false,
            modified_descendants: false,
        }
    }

    pub fn rebuilding(mut self, rebuild_mode: bool) -> Self {
        self.rebuild_mode = rebuild_mode;
        self
    }
}

/// A node tree transformation.
pub trait Modifier: Send + Sync {
    /// Registry name, referenced from menuconf modifier groups.
    fn name(&self) -> &str;

    /// Events this modifier runs for.
    fn modify_events(&self) -> EnumSet<ModifyEvent>;

    /// Transform `data` in place.
    fn modify(
        &self,
        request: &mut MenuRequest,
        data: &mut NodesData,
        meta: &mut ModifyMeta,
        args: &ModifyArgs,
    ) -> Result<()>;
}

/// Call-specific parameters for DEFAULT-event modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyArgs {
    /// Keep only nodes of this namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Restrict the tree to the branch whose `reverse_id` matches.
    #[serde(default)]
    pub root_id: Option<String>,
    /// Level cutting parameters.
    #[serde(default)]
    pub cut_levels: Option<CutLevelsArgs>,
    /// Parameters for custom modifiers.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl ModifyArgs {
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    pub fn root(root_id: impl Into<String>) -> Self {
        Self {
            root_id: Some(root_id.into()),
            ..Self::default()
        }
    }

    pub fn cut(cut_levels: CutLevelsArgs) -> Self {
        Self {
            cut_levels: Some(cut_levels),
            ..Self::default()
        }
    }
}

/// How the active branch depth relates to the selected chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ExtraActiveMode {
    /// Apply `extra_active` regardless of the chain depth; where the chain
    /// is cut, inactive children of the cut point stay within
    /// `extra_inactive`.
    #[default]
    IgnoreChain,
    /// Never show less than the chain down to the selected node.
    KeepChain,
    /// Never show more than `extra_active`, even if that truncates the chain.
    Strict,
}

impl TryFrom<u8> for ExtraActiveMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::IgnoreChain),
            1 => Ok(Self::KeepChain),
            2 => Ok(Self::Strict),
            other => Err(format!("invalid extra_active_mode {other}, expected 0, 1 or 2")),
        }
    }
}

impl From<ExtraActiveMode> for u8 {
    fn from(mode: ExtraActiveMode) -> Self {
        match mode {
            ExtraActiveMode::IgnoreChain => 0,
            ExtraActiveMode::KeepChain => 1,
            ExtraActiveMode::Strict => 2,
        }
    }
}

/// A level number, or an expression relative to the selected node.
///
/// Expressions may use `{s}` (level of the deepest chain node still in the
/// tree) and `{so}` (original level of the selected node), digits and
/// `+`/`-` signs, without spaces: `{s}+1`, `{so}-2`. Invalid expressions
/// and negative results resolve to 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelParam {
    Level(i64),
    Expr(String),
}

impl LevelParam {
    /// Resolve against the selected levels.
    pub fn resolve(&self, selected: i64, selected_original: i64) -> usize {
        let value = match self {
            Self::Level(level) if *level >= 0 => return usize::try_from(*level).unwrap_or(0),
            Self::Level(level) => evaluate(&level.to_string()),
            Self::Expr(expr) => {
                let expr = expr
                    .replace("{so}", &selected_original.to_string())
                    .replace("{s}", &selected.to_string());
                if expr.is_empty() { Some(0) } else { evaluate(&expr) }
            }
        };
        value.and_then(|v| usize::try_from(v).ok()).unwrap_or(0)
    }
}

impl From<usize> for LevelParam {
    fn from(level: usize) -> Self {
        Self::Level(i64::try_from(level).unwrap_or(i64::MAX))
    }
}

impl From<i32> for LevelParam {
    fn from(level: i32) -> Self {
        Self::Level(i64::from(level))
    }
}

impl From<&str> for LevelParam {
    fn from(expr: &str) -> Self {
        Self::Expr(expr.to_string())
    }
}

/// Evaluate a sum of signed integers such as `3+-1` or `-2+5`.
fn evaluate(expr: &str) -> Option<i64> {
    let mut total: i64 = 0;
    let mut sign: i64 = 1;
    let mut digits = String::new();

    for c in expr.chars() {
        match c {
            '0'..='9' => digits.push(c),
            '+' | '-' => {
                if !digits.is_empty() {
                    total = total.checked_add(sign.checked_mul(digits.parse::<i64>().ok()?)?)?;
                    digits.clear();
                    sign = 1;
                }
                if c == '-' {
                    sign = -sign;
                }
            }
            _ => return None,
        }
    }

    if digits.is_empty() {
        return None;
    }
    total.checked_add(sign.checked_mul(digits.parse::<i64>().ok()?)?)
}

/// Parameters of the CutLevels modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutLevelsArgs {
    pub from_level: LevelParam,
    pub to_level: LevelParam,
    pub extra_inactive: LevelParam,
    pub extra_active: LevelParam,
    #[serde(default)]
    pub extra_active_mode: ExtraActiveMode,
    #[serde(default)]
    pub show_invisible: bool,
    #[serde(default)]
    pub show_inactive_branch: bool,
}

impl Default for CutLevelsArgs {
    fn default() -> Self {
        Self {
            from_level: LevelParam::Level(0),
            to_level: LevelParam::Level(100),
            extra_inactive: LevelParam::Level(0),
            extra_active: LevelParam::Level(100),
            extra_active_mode: ExtraActiveMode::IgnoreChain,
            show_invisible: false,
            show_inactive_branch: false,
        }
    }
}

impl CutLevelsArgs {
    pub fn levels(
        from_level: impl Into<LevelParam>,
        to_level: impl Into<LevelParam>,
        extra_inactive: impl Into<LevelParam>,
        extra_active: impl Into<LevelParam>,
    ) -> Self {
        Self {
            from_level: from_level.into(),
            to_level: to_level.into(),
            extra_inactive: extra_inactive.into(),
            extra_active: extra_active.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: ExtraActiveMode) -> Self {
        self.extra_active_mode = mode;
        self
    }

    pub fn show_invisible(mut self, show: bool) -> Self {
        self.show_invisible = show;
        self
    }

    pub fn show_inactive_branch(mut self, show: bool) -> Self {
        self.show_inactive_branch = show;
        self
    }
}
