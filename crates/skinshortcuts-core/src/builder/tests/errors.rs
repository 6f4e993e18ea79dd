//! Schema validation and degraded lookup tests

use super::helpers::*;
use super::*;
use crate::error::SkinshortcutsError;
use crate::model::template::{Expression, Reference, VariableGroup};

fn expression(value: &str) -> Expression {
    Expression {
        value: value.to_string(),
        nosuffix: false,
    }
}

fn group(name: &str, nested: &[&str]) -> VariableGroup {
    VariableGroup {
        name: name.to_string(),
        references: Vec::new(),
        group_refs: nested
            .iter()
            .map(|nested_name| Reference {
                name: nested_name.to_string(),
                ..Reference::default()
            })
            .collect(),
    }
}

#[test]
fn test_expression_cycle_rejected() {
    let mut schema = probe_schema("x");
    schema.expressions.insert("a".to_string(), expression("$EXP[b]"));
    schema.expressions.insert("b".to_string(), expression("$EXP[a]"));
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];

    let err = TemplateBuilder::new(&schema, &menus).build().unwrap_err();
    match err {
        SkinshortcutsError::ExpressionCycle { name } => assert_eq!(name, "a"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_self_referencing_expression_rejected() {
    let mut schema = probe_schema("x");
    schema
        .expressions
        .insert("solo".to_string(), expression("left=1 + $EXP[solo]"));
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];

    let err = TemplateBuilder::new(&schema, &menus).build().unwrap_err();
    assert!(err.to_string().contains("EXPRESSION_CYCLE"));
}

#[test]
fn test_variable_group_cycle_rejected() {
    let mut schema = probe_schema("x");
    schema.variable_groups.insert("g1".to_string(), group("g1", &["g2"]));
    schema.variable_groups.insert("g2".to_string(), group("g2", &["g1"]));
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];

    let err = TemplateBuilder::new(&schema, &menus).build().unwrap_err();
    match err {
        SkinshortcutsError::VariableGroupCycle { name } => assert_eq!(name, "g1"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_diamond_references_are_not_cycles() {
    let mut schema = probe_schema("x");
    schema
        .expressions
        .insert("a".to_string(), expression("$EXP[b] + $EXP[c]"));
    schema.expressions.insert("b".to_string(), expression("$EXP[c]"));
    schema.expressions.insert("c".to_string(), expression("widget=poster"));
    schema.variable_groups.insert("top".to_string(), group("top", &["left", "right"]));
    schema.variable_groups.insert("left".to_string(), group("left", &["shared"]));
    schema.variable_groups.insert("right".to_string(), group("right", &["shared"]));
    schema.variable_groups.insert("shared".to_string(), group("shared", &[]));
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];

    assert!(TemplateBuilder::new(&schema, &menus).build().is_ok());
}

#[test]
fn test_unknown_expression_reference_degrades() {
    // In a condition the unresolved reference evaluates false
    let mut schema = probe_schema("$PROPERTY[name]");
    schema.templates[0].conditions = vec!["$EXP[nope]".to_string()];
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];
    let built = build(&schema, &menus);
    assert_eq!(probe_text(&built), EMPTY_INCLUDE_NOTE);

    // In markup text it stays as written
    let schema = probe_schema("$EXP[nope]");
    let built = build(&schema, &menus);
    assert_eq!(probe_text(&built), "$EXP[nope]");
}

#[test]
fn test_unknown_references_are_ignored() {
    let mut schema = probe_schema("$PROPERTY[name]");
    schema.templates[0].preset_refs = vec![Reference {
        name: "ghost-preset".to_string(),
        ..Reference::default()
    }];
    schema.templates[0].preset_group_refs = vec![Reference {
        name: "ghost-group".to_string(),
        ..Reference::default()
    }];
    schema.templates[0].property_groups = vec![Reference {
        name: "ghost-properties".to_string(),
        ..Reference::default()
    }];
    schema.templates[0].variable_groups = vec![Reference {
        name: "ghost-variables".to_string(),
        ..Reference::default()
    }];
    let menus = vec![menu("mainmenu", vec![menu_item("movies", &[])])];
    let built = build(&schema, &menus);
    assert_eq!(probe_texts(&built), vec!["movies"]);
}
