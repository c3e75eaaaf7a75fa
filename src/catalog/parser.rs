//! Catalog flattening
//!
//! The reference catalogs arrive in a nested, OSCAL-like group structure.
//! This module walks that structure and produces the flat records the
//! pipeline consumes: modern controls with applicability tags, and legacy
//! modules with their requirements, split by the group allow-list.

use super::types::{Control, ControlParameter, LegacyModule, LegacyRequirement};
use crate::catalog::types::{ASSET_GROUPS, PROCESS_GROUPS};
use serde::Deserialize;
use tracing::{debug, info};

/// Titles occasionally arrive as a one-element list in the source data.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TitleValue {
    One(String),
    Many(Vec<String>),
}

impl TitleValue {
    fn into_string(self) -> String {
        match self {
            TitleValue::One(s) => s,
            TitleValue::Many(items) => items.into_iter().next().unwrap_or_default(),
        }
    }
}

impl Default for TitleValue {
    fn default() -> Self {
        TitleValue::One(String::new())
    }
}

#[derive(Debug, Deserialize)]
pub struct RawCatalog {
    pub catalog: RawCatalogBody,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCatalogBody {
    #[serde(default)]
    pub groups: Vec<RawGroup>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawGroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<TitleValue>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub groups: Vec<RawGroup>,
    #[serde(default)]
    pub controls: Vec<RawControl>,
    #[serde(default)]
    pub parts: Vec<RawPart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawControl {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<TitleValue>,
    #[serde(default)]
    pub params: Vec<RawParam>,
    #[serde(default)]
    pub parts: Vec<RawPart>,
    #[serde(default)]
    pub props: Vec<RawProp>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawParam {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawPart {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub prose: Option<String>,
    #[serde(default)]
    pub parts: Vec<RawPart>,
    #[serde(default)]
    pub props: Vec<RawProp>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawProp {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// The wrapped target-object hierarchy table.
#[derive(Debug, Deserialize)]
pub struct RawTargetObjectTable {
    pub target_objects: Vec<crate::catalog::types::TargetObject>,
}

fn title_of(title: Option<TitleValue>) -> String {
    title.unwrap_or_default().into_string()
}

/// Flattens the modern catalog into controls. Applicability tags come from
/// `target_objects` props (comma-separated target-object names); the
/// statement prose comes from the first `statement` part.
pub fn parse_modern_controls(raw: &RawCatalog) -> Vec<Control> {
    let mut controls = Vec::new();
    for group in &raw.catalog.groups {
        collect_modern_controls(group, &mut controls);
    }
    info!("Parsed {} modern controls", controls.len());
    controls
}

fn collect_modern_controls(group: &RawGroup, out: &mut Vec<Control>) {
    for control in &group.controls {
        if control.id.is_empty() {
            debug!("Skipping modern control without an id");
            continue;
        }
        out.push(convert_modern_control(control));
    }
    for sub in &group.groups {
        collect_modern_controls(sub, out);
    }
}

fn convert_modern_control(raw: &RawControl) -> Control {
    let mut statement = String::new();
    let mut target_objects = Vec::new();

    for part in &raw.parts {
        if part.name == "statement" {
            if let Some(prose) = &part.prose {
                statement = prose.clone();
            }
        }
        for prop in &part.props {
            if prop.name == "target_objects" {
                target_objects.extend(
                    prop.value
                        .split(',')
                        .map(|name| name.trim().to_string())
                        .filter(|name| !name.is_empty()),
                );
            }
        }
    }

    Control {
        id: raw.id.clone(),
        title: title_of(raw.title.clone()),
        statement,
        parameters: raw
            .params
            .iter()
            .map(|p| ControlParameter {
                id: p.id.clone(),
                label: p.label.clone(),
            })
            .collect(),
        target_objects,
    }
}

/// Flattens the legacy catalog into modules. The first-level groups carry
/// the main group tag; second-level groups with class `module` are the
/// modules themselves. Modules are split into those whose group is
/// allow-listed (asset or process groups) and the remainder.
pub fn parse_legacy_modules(raw: &RawCatalog) -> (Vec<LegacyModule>, Vec<LegacyModule>) {
    let mut eligible = Vec::new();
    let mut filtered = Vec::new();

    for main_group in &raw.catalog.groups {
        let allowed = ASSET_GROUPS.contains(&main_group.id.as_str())
            || PROCESS_GROUPS.contains(&main_group.id.as_str());
        for module_group in &main_group.groups {
            if module_group.class.as_deref() != Some("module") {
                continue;
            }
            let module = convert_legacy_module(module_group, &main_group.id);
            if allowed {
                eligible.push(module);
            } else {
                filtered.push(module);
            }
        }
    }

    info!(
        "Parsed {} legacy modules for processing, {} filtered out",
        eligible.len(),
        filtered.len()
    );
    (eligible, filtered)
}

fn convert_legacy_module(raw: &RawGroup, group_id: &str) -> LegacyModule {
    let description = raw
        .parts
        .iter()
        .find(|part| part.name == "description")
        .and_then(|part| part.prose.clone())
        .unwrap_or_default();

    let requirements = raw
        .controls
        .iter()
        .filter(|c| !c.id.is_empty())
        .map(convert_legacy_requirement)
        .collect();

    LegacyModule {
        id: raw.id.clone(),
        title: title_of(raw.title.clone()),
        description,
        group: group_id.to_string(),
        requirements,
    }
}

/// The requirement statement sits under the maturity-level part, and the
/// level itself is a prop on that part.
fn convert_legacy_requirement(raw: &RawControl) -> LegacyRequirement {
    let mut prose = String::new();
    let mut level = None;

    for part in &raw.parts {
        if part.class.as_deref() == Some("maturity-level-defined") {
            for sub in &part.parts {
                if sub.name == "statement" {
                    if let Some(text) = &sub.prose {
                        prose = text.clone();
                    }
                    break;
                }
            }
            for prop in &part.props {
                if prop.name == "level" {
                    level = Some(prop.value.clone());
                }
            }
            break;
        }
    }

    LegacyRequirement {
        id: raw.id.clone(),
        title: title_of(raw.title.clone()),
        prose,
        level,
    }
}
