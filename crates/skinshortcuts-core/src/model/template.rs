//! Template schema: the name-indexed registry of reusable fragments.
//!
//! All markup fragments (template controls, include bodies, items content,
//! variable bodies) live in one arena owned by the schema; definitions hold
//! [`NodeId`]s into it. The schema is read-only for the duration of a build.

use indexmap::IndexMap;

use super::PropertyMap;
use crate::markup::{MarkupTree, NodeId};

/// Reusable named condition fragment.
///
/// With `nosuffix` set the expansion is exempt from suffix rewriting
/// (wrapped in a `{NOSUFFIX:...}` marker until final evaluation).
#[derive(Debug, Clone, Default)]
pub struct Expression {
    pub value: String,
    pub nosuffix: bool,
}

/// Property assignment in a template, items definition or property group.
///
/// Either a literal `value`, or a `from_source` lookup against the context
/// and item; `condition` gates the assignment.
#[derive(Debug, Clone, Default)]
pub struct TemplateProperty {
    pub name: String,
    pub value: String,
    pub from_source: String,
    pub condition: String,
}

/// One branch of a multi-branch var: `value` applies when `condition` holds.
/// A branch without a condition always matches.
#[derive(Debug, Clone, Default)]
pub struct VarValue {
    pub condition: String,
    pub value: String,
}

/// Multi-branch property: ordered branches, the first matching one wins.
#[derive(Debug, Clone, Default)]
pub struct TemplateVar {
    pub name: String,
    pub values: Vec<VarValue>,
}

/// A single row in a preset lookup table.
#[derive(Debug, Clone, Default)]
pub struct PresetValues {
    pub condition: String,
    pub values: PropertyMap,
}

/// Lookup table returning an attribute set; first matching row wins.
#[derive(Debug, Clone, Default)]
pub struct Preset {
    pub name: String,
    pub rows: Vec<PresetValues>,
}

/// Child of a preset group: a named preset or inline values.
#[derive(Debug, Clone)]
pub enum PresetGroupChild {
    PresetRef { name: String, condition: String },
    Inline { values: PropertyMap, condition: String },
}

impl PresetGroupChild {
    pub fn condition(&self) -> &str {
        match self {
            PresetGroupChild::PresetRef { condition, .. } => condition,
            PresetGroupChild::Inline { condition, .. } => condition,
        }
    }
}

/// Conditional preset selection: children in order, first match wins.
#[derive(Debug, Clone, Default)]
pub struct PresetGroup {
    pub name: String,
    pub children: Vec<PresetGroupChild>,
}

/// Reusable bundle of properties and vars.
#[derive(Debug, Clone, Default)]
pub struct PropertyGroup {
    pub name: String,
    pub properties: Vec<TemplateProperty>,
    pub vars: Vec<TemplateVar>,
}

/// Reference to a named definition with an optional suffix override and
/// gating condition. Shared by preset, preset-group, property-group and
/// variable-group references.
#[derive(Debug, Clone, Default)]
pub struct Reference {
    pub name: String,
    pub suffix: String,
    pub condition: String,
}

/// Reusable markup fragment inserted via a marker node.
#[derive(Debug, Clone)]
pub struct IncludeDefinition {
    pub name: String,
    /// Absent when the definition was authored empty; behaves as unresolved.
    pub controls: Option<NodeId>,
}

/// A skin variable: markup body plus build condition and output-name
/// override. The body is the eventual `<variable>` node, copied as
/// authored.
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub name: String,
    pub condition: String,
    pub output: String,
    pub content: NodeId,
}

/// Reference to a variable definition from within a variable group.
#[derive(Debug, Clone, Default)]
pub struct VariableRef {
    pub name: String,
    pub condition: String,
}

/// Named set of variable references, composable through nested group
/// references (which resolve before the group's own references).
#[derive(Debug, Clone, Default)]
pub struct VariableGroup {
    pub name: String,
    pub references: Vec<VariableRef>,
    pub group_refs: Vec<Reference>,
}

/// One output of a template: include name, id prefix for computed control
/// ids, and the suffix applied to conditions and references.
#[derive(Debug, Clone, Default)]
pub struct TemplateOutput {
    pub include: String,
    pub id_prefix: String,
    pub suffix: String,
}

/// Emission policy for a template's includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemplateOnly {
    /// Attribute absent: emit normally.
    #[default]
    Off,
    /// `templateOnly="true"`: never emit.
    Never,
    /// `templateOnly="auto"`: emit only when some item property references
    /// the include by name.
    Auto,
}

/// Expansion rule for `insert="name"` markers: which submenu to iterate and
/// what to generate per submenu item.
#[derive(Debug, Clone)]
pub struct ItemsDefinition {
    pub name: String,
    /// Submenu name suffix; looks up `{parent item name}.{source}`.
    pub source: String,
    /// Evaluated against the parent item; false skips the whole insert.
    pub condition: String,
    /// Evaluated against each submenu item; non-matching items are skipped.
    pub filter: String,
    pub properties: Vec<TemplateProperty>,
    pub vars: Vec<TemplateVar>,
    pub preset_refs: Vec<Reference>,
    pub property_groups: Vec<Reference>,
    pub controls: Option<NodeId>,
}

impl ItemsDefinition {
    /// The submenu source, defaulting to the definition name.
    pub fn effective_source(&self) -> &str {
        if self.source.is_empty() {
            &self.name
        } else {
            &self.source
        }
    }
}

/// Main template definition: context declarations plus a control subtree,
/// emitted once per output.
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub template_only: TemplateOnly,
    /// When set, only menus with this exact name are iterated.
    pub menu: String,
    pub outputs: Vec<TemplateOutput>,
    /// ANDed together, evaluated per item.
    pub conditions: Vec<String>,
    pub properties: Vec<TemplateProperty>,
    pub vars: Vec<TemplateVar>,
    pub property_groups: Vec<Reference>,
    pub preset_refs: Vec<Reference>,
    pub preset_group_refs: Vec<Reference>,
    pub controls: Option<NodeId>,
    pub variables: Vec<VariableDefinition>,
    pub variable_groups: Vec<Reference>,
}

/// Complete template schema.
#[derive(Debug, Clone, Default)]
pub struct TemplateSchema {
    /// Arena holding every markup fragment the definitions point into.
    pub markup: MarkupTree,
    pub expressions: IndexMap<String, Expression>,
    pub property_groups: IndexMap<String, PropertyGroup>,
    pub includes: IndexMap<String, IncludeDefinition>,
    pub presets: IndexMap<String, Preset>,
    pub preset_groups: IndexMap<String, PresetGroup>,
    pub variable_definitions: IndexMap<String, VariableDefinition>,
    pub variable_groups: IndexMap<String, VariableGroup>,
    pub items_definitions: IndexMap<String, ItemsDefinition>,
    pub templates: Vec<Template>,
}

impl TemplateSchema {
    pub fn new() -> Self {
        TemplateSchema::default()
    }

    pub fn expression(&self, name: &str) -> Option<&Expression> {
        self.expressions.get(name)
    }

    pub fn property_group(&self, name: &str) -> Option<&PropertyGroup> {
        self.property_groups.get(name)
    }

    pub fn include(&self, name: &str) -> Option<&IncludeDefinition> {
        self.includes.get(name)
    }

    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    pub fn preset_group(&self, name: &str) -> Option<&PresetGroup> {
        self.preset_groups.get(name)
    }

    pub fn variable_definition(&self, name: &str) -> Option<&VariableDefinition> {
        self.variable_definitions.get(name)
    }

    pub fn variable_group(&self, name: &str) -> Option<&VariableGroup> {
        self.variable_groups.get(name)
    }

    pub fn items_definition(&self, name: &str) -> Option<&ItemsDefinition> {
        self.items_definitions.get(name)
    }
}
