//! Include generation, merging and gating tests

use super::helpers::*;
use super::*;
use crate::model::template::{TemplateOnly, VariableDefinition};

#[test]
fn test_single_item_include() {
    let schema = probe_schema("$PROPERTY[name] - $PROPERTY[widget]");
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[("widget", "poster")])])];
    let built = build(&schema, &menus);
    assert_eq!(
        render(&built.tree, built.root),
        "<includes>\
         <include name=\"skinshortcuts-template-Probe\">\
         <label>movies - poster</label>\
         </include>\
         </includes>"
    );
}

#[test]
fn test_items_instantiate_in_menu_order_skipping_disabled() {
    let schema = probe_schema("$PROPERTY[index]:$PROPERTY[name]");
    let menus = vec![menu(
        "mainmenu",
        vec![
            menu_item("movies", &[]),
            disabled_item("hidden"),
            menu_item("music", &[]),
        ],
    )];
    let built = build(&schema, &menus);
    // Disabled items keep their slot in the index numbering
    assert_eq!(probe_texts(&built), vec!["1:movies", "3:music"]);
}

#[test]
fn test_template_menu_filter() {
    let mut schema = probe_schema("$PROPERTY[name]");
    schema.templates[0].menu = "powermenu".to_string();
    let menus = vec![
        menu("mainmenu", vec![menu_item("home", &[])]),
        menu("powermenu", vec![menu_item("power", &[])]),
    ];
    let built = build(&schema, &menus);
    assert_eq!(probe_texts(&built), vec!["power"]);
}

#[test]
fn test_builtin_context_values() {
    let mut schema =
        probe_schema("$PROPERTY[index]/$PROPERTY[id]/$PROPERTY[menu]/$PROPERTY[idprefix]");
    schema.templates[0].outputs[0].id_prefix = "home".to_string();
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];
    let built = build(&schema, &menus);
    assert_eq!(probe_text(&built), "1/home1/mainmenu/home");
}

#[test]
fn test_id_without_prefix_is_bare_index() {
    let schema = probe_schema("$PROPERTY[id]");
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];
    let built = build(&schema, &menus);
    assert_eq!(probe_text(&built), "1");
}

#[test]
fn test_math_and_if_in_text() {
    let schema =
        probe_schema("$MATH[id * 100 + 5000]|$IF[widget=poster THEN Poster ELSE Plain]");
    let menus = vec![menu(
        "mainmenu",
        vec![
            menu_item("movies", &[("widget", "poster")]),
            menu_item("music", &[("widget", "albums")]),
        ],
    )];
    let built = build(&schema, &menus);
    assert_eq!(probe_texts(&built), vec!["5100|Poster", "5200|Plain"]);
}

#[test]
fn test_visibility_marker() {
    let mut schema = TemplateSchema::new();
    let controls = schema.markup.alloc("controls");
    child_elem(&mut schema.markup, controls, "skinshortcuts", Some("visibility"));
    schema.templates.push(template_for("Probe", Some(controls)));
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];

    let built = build(&schema, &menus);
    assert_eq!(
        probe_text(&built),
        "String.IsEqual(Container(9000).ListItem.Property(name),movies)"
    );

    let built = TemplateBuilder::new(&schema, &menus)
        .with_container("8000")
        .build()
        .unwrap();
    assert_eq!(
        probe_text(&built),
        "String.IsEqual(Container(8000).ListItem.Property(name),movies)"
    );
}

#[test]
fn test_conditions_gate_per_item() {
    let mut schema = probe_schema("$PROPERTY[name]");
    schema.templates[0].conditions = vec!["widget=poster".to_string()];
    let menus = vec![menu(
        "mainmenu",
        vec![
            menu_item("movies", &[("widget", "poster")]),
            menu_item("music", &[("widget", "albums")]),
        ],
    )];
    let built = build(&schema, &menus);
    assert_eq!(probe_texts(&built), vec!["movies"]);
}

#[test]
fn test_conditions_see_only_item_properties() {
    // Template-level properties are resolved after condition checks, so a
    // condition can never match against them.
    let mut schema = probe_schema("$PROPERTY[name]");
    schema.templates[0].conditions = vec!["color=red".to_string()];
    schema.templates[0].properties = vec![crate::model::template::TemplateProperty {
        name: "color".to_string(),
        value: "red".to_string(),
        ..Default::default()
    }];
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];
    let built = build(&schema, &menus);
    assert_eq!(probe_text(&built), EMPTY_INCLUDE_NOTE);
}

#[test]
fn test_empty_include_gets_placeholder_description() {
    let schema = probe_schema("$PROPERTY[name]");
    let menus = vec![menu("mainmenu", vec![])];
    let built = build(&schema, &menus);
    assert_eq!(
        render(&built.tree, built.root),
        format!(
            "<includes>\
             <include name=\"skinshortcuts-template-Probe\">\
             <description>{}</description>\
             </include>\
             </includes>",
            EMPTY_INCLUDE_NOTE
        )
    );
}

#[test]
fn test_same_output_include_merges() {
    let mut schema = TemplateSchema::new();
    let first = label_controls(&mut schema.markup, "one");
    let second = label_controls(&mut schema.markup, "two");
    schema.templates.push(template_for("Shared", Some(first)));
    schema.templates.push(template_for("Shared", Some(second)));
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];
    let built = build(&schema, &menus);
    assert_eq!(probe_texts(&built), vec!["one", "two"]);
}

#[test]
fn test_template_only_never_skips_include_but_keeps_variables() {
    let mut schema = probe_schema("$PROPERTY[name]");
    let content = schema.markup.alloc("variable");
    schema.markup.node_mut(content).set_attr("name", "V");
    child_elem(&mut schema.markup, content, "value", Some("x"));
    schema.templates[0].template_only = TemplateOnly::Never;
    schema.templates[0].variables = vec![VariableDefinition {
        name: "V".to_string(),
        condition: String::new(),
        output: String::new(),
        content,
    }];
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];
    let built = build(&schema, &menus);
    assert_eq!(
        render(&built.tree, built.root),
        "<includes><variable name=\"V\"><value>x</value></variable></includes>"
    );
}

#[test]
fn test_template_only_auto_requires_assignment() {
    let mut schema = probe_schema("$PROPERTY[name]");
    schema.templates[0].template_only = TemplateOnly::Auto;

    let unassigned = vec![menu("mainmenu", vec![menu_item("movies", &[])])];
    let built = build(&schema, &unassigned);
    assert_eq!(render(&built.tree, built.root), "<includes/>");

    let assigned = vec![menu(
        "mainmenu",
        vec![menu_item(
            "movies",
            &[("widgetPath", "$INCLUDE[skinshortcuts-template-Probe]")],
        )],
    )];
    let built = build(&schema, &assigned);
    assert_eq!(probe_texts(&built), vec!["movies"]);
}

#[test]
fn test_output_suffix_gates_conditions_per_output() {
    let mut schema = probe_schema("$PROPERTY[name]");
    schema.templates[0].outputs = vec![output("Probe", "", ""), output("Second", "", ".2")];
    schema.templates[0].conditions = vec!["widgetPath=special".to_string()];
    let menus = vec![menu(
        "mainmenu",
        vec![menu_item(
            "movies",
            &[("widgetPath", "special"), ("widgetPath.2", "other")],
        )],
    )];
    let built = build(&schema, &menus);
    let rendered = render(&built.tree, built.root);
    assert!(rendered.contains(
        "<include name=\"skinshortcuts-template-Probe\"><label>movies</label></include>"
    ));
    // The suffixed output sees widgetPath.2 and stays empty
    assert_eq!(probe_text(&built), EMPTY_INCLUDE_NOTE);
}

#[test]
fn test_build_is_repeatable() {
    let schema = probe_schema("$PROPERTY[name] $MATH[index + 1]");
    let menus = vec![menu(
        "mainmenu",
        vec![
            menu_item("movies", &[("widget", "poster")]),
            menu_item("music", &[]),
        ],
    )];
    let first = build(&schema, &menus);
    let second = build(&schema, &menus);
    assert!(first.tree.subtree_eq(first.root, &second.tree, second.root));
}
