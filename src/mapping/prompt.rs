//! Prompt and response-schema construction for the two AI call sites.
//!
//! The classifier prompt enumerates every target object with its definition
//! and constrains the response to those names via a dynamic enum in the
//! schema. The matcher prompt carries only the narrowed context: the batch
//! of legacy requirements and the applicable controls for the pair.

use crate::catalog::types::{Control, LegacyModule, LegacyRequirement, TargetObject};
use serde_json::{json, Value};

pub fn classification_prompt(module: &LegacyModule, targets: &[TargetObject]) -> String {
    let choices = targets
        .iter()
        .map(|t| format!("* {}: {}", t.name, t.definition))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Select the single best-matching target object for the following \
         legacy module.\n\n\
         **Legacy module to match:**\n\
         * Title: {}\n\
         * Description: {}\n\n\
         **Available target objects:**\n{}\n\n\
         Based on the information above, which is the best match?",
        module.title, module.description, choices
    )
}

pub fn classification_schema(targets: &[TargetObject]) -> Value {
    let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "matched_target_object": {
                "type": "string",
                "enum": names,
            }
        },
        "required": ["matched_target_object"],
        "additionalProperties": false
    })
}

pub fn matching_prompt(
    module: &LegacyModule,
    requirements: &[&LegacyRequirement],
    controls: &[&Control],
) -> String {
    format!(
        "Produce an exhaustive one-to-one mapping from the legacy \
         requirements below to the modern controls below. Map each \
         requirement to the single control that best covers it; a control \
         may cover several requirements. List requirements with no suitable \
         control under \"unmatched_requirements\"; every requirement must \
         appear either as a mapping key or in that list. Never invent \
         identifiers.\n\n\
         Legacy module: {} ({})\n\n\
         Legacy requirements:\n{}\n\n\
         Modern controls:\n{}",
        module.id,
        module.title,
        requirement_table(requirements),
        control_table(controls)
    )
}

pub fn matching_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "mapping": {
                "type": "object",
                "additionalProperties": {"type": "string"}
            },
            "unmatched_requirements": {
                "type": "array",
                "items": {"type": "string"}
            },
            "unmatched_controls": {
                "type": "array",
                "items": {"type": "string"}
            }
        },
        "required": ["mapping", "unmatched_requirements"],
        "additionalProperties": false
    })
}

fn requirement_table(requirements: &[&LegacyRequirement]) -> String {
    let mut lines = vec![
        "| Requirement-ID | Title | Statement |".to_string(),
        "| :--- | :--- | :--- |".to_string(),
    ];
    for requirement in requirements {
        lines.push(format!(
            "| {} | {} | {} |",
            requirement.id,
            requirement.title,
            single_line(&requirement.prose)
        ));
    }
    lines.join("\n")
}

fn control_table(controls: &[&Control]) -> String {
    let mut lines = vec![
        "| Control-ID | Title | Statement |".to_string(),
        "| :--- | :--- | :--- |".to_string(),
    ];
    for control in controls {
        lines.push(format!(
            "| {} | {} | {} |",
            control.id,
            control.title,
            single_line(&control.statement)
        ));
    }
    lines.join("\n")
}

fn single_line(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}
