//! Property fallback schema.
//!
//! Fallbacks fill context properties an item left unset: per base property
//! name, an ordered rule list evaluated first-match-wins. A rule without a
//! condition always matches.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Fallback rules keyed by base property name, in schema order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(default)]
    pub fallbacks: IndexMap<String, PropertyFallback>,
}

/// Ordered rule list for one base property.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyFallback {
    #[serde(default)]
    pub rules: Vec<FallbackRule>,
}

/// One condition→value fallback rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackRule {
    #[serde(default)]
    pub condition: String,
    pub value: String,
}
