//! Template builder - expands a template schema against menu data.
//!
//! The builder walks every template in the schema, filters menu items
//! through template conditions, resolves a property context per item and
//! instantiates the template controls once per matching item. Includes
//! with the same output name merge into one `<include>`; variables merge
//! by name and sit next to the includes under the `<includes>` root.
//!
//! ## Markers
//!
//! Inside template controls, `<skinshortcuts>` elements drive structural
//! expansion:
//!
//! - `<skinshortcuts>visibility</skinshortcuts>` becomes a `<visible>`
//!   condition bound to the focused menu item
//! - `<skinshortcuts include="name" [condition] [wrap]/>` splices (or
//!   wraps) another template include's controls
//! - `<skinshortcuts insert="name"/>` repeats an items definition over a
//!   submenu
//!
//! Text content goes through `$EXP`, `$PARENT`, `$PROPERTY`, `$MATH` and
//! `$IF` substitution, in that order.

mod context;
mod controls;
mod expand;
mod variables;

use std::collections::HashSet;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Result, SkinshortcutsError};
use crate::markup::{MarkupTree, NodeId};
use crate::model::menu::Menu;
use crate::model::property::PropertySchema;
use crate::model::template::{Template, TemplateOnly, TemplateOutput, TemplateSchema};

use context::combine_suffixes;

/// Container id used in generated visibility conditions when none is given.
const DEFAULT_CONTAINER: &str = "9000";

/// Text of the placeholder `<description>` inserted into includes that end
/// up with no generated content.
const EMPTY_INCLUDE_NOTE: &str = "Automatically generated - no menu items matched this template";

lazy_static! {
    static ref ASSIGNED_TEMPLATE_PATTERN: Regex =
        Regex::new(r"\$INCLUDE\[skinshortcuts-template-([^\]]+)\]").unwrap();
}

/// Result of a build: an arena holding the generated tree and the id of
/// its `<includes>` root.
#[derive(Debug)]
pub struct BuildOutput {
    pub tree: MarkupTree,
    pub root: NodeId,
}

/// Expands templates against menus into a Kodi include tree.
///
/// Construction borrows the schema and menus; [`TemplateBuilder::build`]
/// can run repeatedly and always produces the same tree for the same
/// inputs.
pub struct TemplateBuilder<'a> {
    schema: &'a TemplateSchema,
    menus: &'a [Menu],
    container: String,
    property_schema: Option<&'a PropertySchema>,
    menu_map: IndexMap<&'a str, &'a Menu>,
    assigned_templates: HashSet<String>,
}

impl<'a> TemplateBuilder<'a> {
    pub fn new(schema: &'a TemplateSchema, menus: &'a [Menu]) -> Self {
        let menu_map = menus.iter().map(|m| (m.name.as_str(), m)).collect();
        let assigned_templates = collect_assigned_templates(menus);
        TemplateBuilder {
            schema,
            menus,
            container: DEFAULT_CONTAINER.to_string(),
            property_schema: None,
            menu_map,
            assigned_templates,
        }
    }

    /// Use `container` instead of the default in generated visibility
    /// conditions.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Enable property fallbacks from a property schema.
    pub fn with_property_schema(mut self, property_schema: &'a PropertySchema) -> Self {
        self.property_schema = Some(property_schema);
        self
    }

    /// Build all template includes and variables.
    ///
    /// Same-named includes merge into a single `<include>`; same-named
    /// variables merge by appending children. Variables come first under
    /// the root, then includes. Includes gated off by `templateOnly`
    /// settings are skipped; includes that stay empty get a placeholder
    /// `<description>`.
    pub fn build(&self) -> Result<BuildOutput> {
        self.validate_schema()?;

        let mut out = MarkupTree::new();
        let root = out.alloc("includes");

        let mut include_map: IndexMap<String, NodeId> = IndexMap::new();
        let mut variable_map: IndexMap<String, NodeId> = IndexMap::new();
        // templateOnly: Never = never emit, Auto = skip when unassigned
        let mut template_only: IndexMap<String, TemplateOnly> = IndexMap::new();

        for template in &self.schema.templates {
            for output in &template.outputs {
                let include_name = format!("skinshortcuts-template-{}", output.include);

                if template.template_only != TemplateOnly::Off {
                    template_only.insert(include_name.clone(), template.template_only);
                }

                let include_id = match include_map.get(&include_name) {
                    Some(&id) => id,
                    None => {
                        let id = out.alloc("include");
                        out.node_mut(id).set_attr("name", include_name.as_str());
                        include_map.insert(include_name.clone(), id);
                        id
                    }
                };

                self.build_template_into(&mut out, template, output, include_id, &mut variable_map);
            }
        }

        for &var_id in variable_map.values() {
            out.append_child(root, var_id);
        }

        for (include_name, &include_id) in &include_map {
            match template_only.get(include_name) {
                Some(TemplateOnly::Never) => continue,
                Some(TemplateOnly::Auto) if !self.assigned_templates.contains(include_name) => {
                    continue
                }
                _ => {}
            }
            if out.node(include_id).children().is_empty() {
                let desc = out.alloc("description");
                out.node_mut(desc).text = Some(EMPTY_INCLUDE_NOTE.to_string());
                out.append_child(include_id, desc);
            }
            out.append_child(root, include_id);
        }

        Ok(BuildOutput { tree: out, root })
    }

    /// Build one template/output pair into its include element.
    ///
    /// Generated controls land in the include; variables merge into
    /// `variable_map`. The output's suffix rides along into conditions
    /// and references so one template can fill several widget slots.
    fn build_template_into(
        &self,
        out: &mut MarkupTree,
        template: &Template,
        output: &TemplateOutput,
        include_id: NodeId,
        variable_map: &mut IndexMap<String, NodeId>,
    ) {
        for menu in self.menus {
            if !template.menu.is_empty() && menu.name != template.menu {
                continue;
            }

            for (idx, item) in menu.items.iter().enumerate() {
                let idx = idx + 1;
                if item.disabled {
                    continue;
                }

                if !self.check_conditions(&template.conditions, item, &output.suffix) {
                    continue;
                }

                let context = self.build_context(template, output, item, idx, menu);

                if let Some(controls_id) = template.controls {
                    let processed = self.process_controls(out, controls_id, &context, item);
                    let children: Vec<NodeId> = out.node(processed).children().to_vec();
                    for child in children {
                        out.append_child(include_id, child);
                    }
                }

                for var_def in &template.variables {
                    if let Some(var_id) = self.build_variable(out, var_def, &context, item) {
                        variables::add_variable(out, var_id, variable_map);
                    }
                }

                for group_ref in &template.variable_groups {
                    let effective = combine_suffixes(&output.suffix, &group_ref.suffix);
                    self.build_variable_group(out, group_ref, &context, item, variable_map, effective);
                }
            }
        }
    }

    /// Reject schemas whose expression or variable-group graphs loop.
    ///
    /// Both are expanded recursively during a build, so a cycle would
    /// never terminate. Checked once up front; after this every expansion
    /// is guaranteed to bottom out.
    fn validate_schema(&self) -> Result<()> {
        for name in self.schema.expressions.keys() {
            self.check_expression_cycle(name, &mut Vec::new())?;
        }
        for name in self.schema.variable_groups.keys() {
            self.check_variable_group_cycle(name, &mut Vec::new())?;
        }
        Ok(())
    }

    fn check_expression_cycle(&self, name: &str, stack: &mut Vec<String>) -> Result<()> {
        if stack.iter().any(|seen| seen == name) {
            return Err(SkinshortcutsError::ExpressionCycle {
                name: name.to_string(),
            });
        }
        let Some(expr) = self.schema.expression(name) else {
            return Ok(());
        };
        stack.push(name.to_string());
        for caps in expand::EXP_PATTERN.captures_iter(&expr.value) {
            self.check_expression_cycle(&caps[1], stack)?;
        }
        stack.pop();
        Ok(())
    }

    fn check_variable_group_cycle(&self, name: &str, stack: &mut Vec<String>) -> Result<()> {
        if stack.iter().any(|seen| seen == name) {
            return Err(SkinshortcutsError::VariableGroupCycle {
                name: name.to_string(),
            });
        }
        let Some(group) = self.schema.variable_group(name) else {
            return Ok(());
        };
        stack.push(name.to_string());
        for nested in &group.group_refs {
            self.check_variable_group_cycle(&nested.name, stack)?;
        }
        stack.pop();
        Ok(())
    }
}

/// Scan menu item properties for `$INCLUDE[skinshortcuts-template-*]`
/// references. Templates with `templateOnly="auto"` emit only when their
/// include name shows up here.
fn collect_assigned_templates(menus: &[Menu]) -> HashSet<String> {
    let mut assigned = HashSet::new();
    for menu in menus {
        for item in &menu.items {
            for value in item.properties.values() {
                if value.is_empty() {
                    continue;
                }
                for caps in ASSIGNED_TEMPLATE_PATTERN.captures_iter(value) {
                    assigned.insert(format!("skinshortcuts-template-{}", &caps[1]));
                }
            }
        }
    }
    assigned
}

#[cfg(test)]
mod tests;
