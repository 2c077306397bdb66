//! Wrapper configuration.
//!
//! # Configuration
//!
//! - `order`: chain order policy (default: newest outermost)
//! - `callback_exempt`: methods that refuse callback-style calls (default: `changes`)
//! - `await_readiness`: wait for the readiness collaborator before composed calls (default: true)
//!
//! ```
//! use method_wrappers::{ChainOrder, WrapConfig};
//!
//! let config = WrapConfig::from_json(r#"{ "order": "newest_innermost" }"#).unwrap();
//! assert_eq!(config.order, ChainOrder::NewestInnermost);
//! assert!(config.is_callback_exempt("changes"));
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WrapError};

/// Methods exempt from callback conversion by default.
pub const DEFAULT_CALLBACK_EXEMPT: &[&str] = &["changes"];

/// Order in which registered handlers are composed around the original.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainOrder {
    /// The most recently installed handler runs first.
    #[default]
    NewestOutermost,
    /// The most recently installed handler runs last, next to the original.
    NewestInnermost,
}

/// Configuration applied to a target's composed methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapConfig {
    /// Handler composition order.
    pub order: ChainOrder,
    /// Methods that cannot be called in callback style.
    pub callback_exempt: BTreeSet<String>,
    /// Wait for readiness before running a composed call.
    pub await_readiness: bool,
}

impl WrapConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| WrapError::Config(e.to_string()))
    }

    /// Check if a method is listed in the callback exemption table.
    pub fn is_callback_exempt(&self, method: &str) -> bool {
        self.callback_exempt.contains(method)
    }
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            order: ChainOrder::default(),
            callback_exempt: DEFAULT_CALLBACK_EXEMPT
                .iter()
                .map(|s| s.to_string())
                .collect(),
            await_readiness: true,
        }
    }
}
