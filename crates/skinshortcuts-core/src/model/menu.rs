//! Menu records: the data side of a build.

use serde::{Deserialize, Serialize};

use super::PropertyMap;

/// A menu containing menu items.
///
/// Submenus are separate `Menu` records named `{parentItemName}.{suffix}`,
/// which is how items iteration finds them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub name: String,
    #[serde(default)]
    pub items: Vec<MenuItem>,
    #[serde(default)]
    pub defaults: MenuDefaults,
}

/// Default properties applied under every item of a menu.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenuDefaults {
    #[serde(default)]
    pub properties: PropertyMap,
}

/// A single item in a menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub disabled: bool,
}

impl Menu {
    /// Item lookup by name.
    pub fn item(&self, name: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.name == name)
    }
}
