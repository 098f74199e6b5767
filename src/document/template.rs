use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{Node, NodeRole, VisualTree};

pub const SECTION_CLASS: &str = "resume-section";
pub const HEADING_CLASS: &str = "section-title";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSpec {
    pub regions: Vec<RegionSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionSpec {
    pub name: String,
    #[serde(default)]
    pub slots: Vec<SlotSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotSpec {
    pub kind: String,
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub draggable: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TemplateError {
    #[error("template parse failed: {0}")]
    Parse(String),

    #[error("template declares no regions")]
    NoRegions,

    #[error("template region name cannot be empty")]
    EmptyRegionName,

    #[error("template region `{name}` is declared twice")]
    DuplicateRegion { name: String },

    #[error("template region `{region}` has a slot with an empty kind")]
    EmptySlotKind { region: String },

    #[error("template slot kind `{kind}` is declared twice")]
    DuplicateSlot { kind: String },
}

impl SlotSpec {
    fn new(kind: &str, heading: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            heading: Some(heading.to_owned()),
            visible: true,
            draggable: true,
        }
    }

    fn heading_text(&self) -> String {
        self.heading.clone().unwrap_or_else(|| title_case(&self.kind))
    }
}

impl Default for TemplateSpec {
    fn default() -> Self {
        Self {
            regions: vec![
                RegionSpec {
                    name: "sidebar".to_owned(),
                    slots: vec![
                        SlotSpec::new("skills", "Skills"),
                        SlotSpec::new("languages", "Languages"),
                        SlotSpec::new("certifications", "Certifications"),
                        SlotSpec::new("interests", "Interests"),
                    ],
                },
                RegionSpec {
                    name: "main".to_owned(),
                    slots: vec![
                        SlotSpec {
                            draggable: false,
                            ..SlotSpec::new("header", "Contact")
                        },
                        SlotSpec::new("summary", "Professional Summary"),
                        SlotSpec::new("experience", "Work Experience"),
                        SlotSpec::new("education", "Education"),
                        SlotSpec::new("accomplishments", "Accomplishments"),
                    ],
                },
            ],
        }
    }
}

impl TemplateSpec {
    pub fn from_yaml_str(raw: &str) -> Result<Self, TemplateError> {
        let template = serde_yaml::from_str::<Self>(raw)
            .map_err(|error| TemplateError::Parse(error.to_string()))?;
        template.validate()?;
        Ok(template)
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.regions.is_empty() {
            return Err(TemplateError::NoRegions);
        }

        let mut region_names = BTreeSet::new();
        let mut slot_kinds = BTreeSet::new();
        for region in &self.regions {
            let name = region.name.trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyRegionName);
            }
            if !region_names.insert(name.to_owned()) {
                return Err(TemplateError::DuplicateRegion {
                    name: name.to_owned(),
                });
            }

            for slot in &region.slots {
                let kind = slot.kind.trim();
                if kind.is_empty() {
                    return Err(TemplateError::EmptySlotKind {
                        region: name.to_owned(),
                    });
                }
                if !slot_kinds.insert(kind.to_ascii_lowercase()) {
                    return Err(TemplateError::DuplicateSlot {
                        kind: kind.to_owned(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn build_tree(&self) -> VisualTree {
        let mut tree = VisualTree::new();
        let root = tree.root();

        for region in &self.regions {
            let region_node = Node::new(NodeRole::Region)
                .named(region.name.trim())
                .with_class("region")
                .with_class(&format!("region-{}", region.name.trim()))
                .container();
            let Some(region_id) = tree.append(root, region_node) else {
                continue;
            };

            for slot in &region.slots {
                let kind = slot.kind.trim().to_ascii_lowercase();
                let mut section = Node::new(NodeRole::Section)
                    .with_section(kind.as_str())
                    .with_class(SECTION_CLASS)
                    .container()
                    .hidden(!slot.visible);
                if slot.draggable {
                    section = section.draggable();
                }
                let Some(section_id) = tree.append(region_id, section) else {
                    continue;
                };
                let _ = tree.append(
                    section_id,
                    Node::new(NodeRole::Heading)
                        .with_class(HEADING_CLASS)
                        .with_text(slot.heading_text()),
                );
            }
        }

        tree
    }
}

pub fn load_template(path: &Path) -> Result<TemplateSpec> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read template file `{}`", path.display()))?;
    TemplateSpec::from_yaml_str(&raw)
        .with_context(|| format!("failed to load template file `{}`", path.display()))
}

fn title_case(kind: &str) -> String {
    let mut chars = kind.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::document::NodeRole;
    use crate::test_support::{remove_dir_if_exists, temp_path};

    use super::{TemplateError, TemplateSpec, load_template};

    #[test]
    fn default_template_builds_two_regions_with_headings() {
        let tree = TemplateSpec::default().build_tree();
        let sidebar = tree.region("sidebar").expect("sidebar should exist");
        let main = tree.region("main").expect("main should exist");
        assert_eq!(tree.children(sidebar).len(), 4);
        assert_eq!(tree.children(main).len(), 5);

        let skills = tree.section_slot("skills").expect("skills slot should exist");
        let heading = tree.children(skills)[0];
        assert_eq!(tree.role_of(heading), Some(NodeRole::Heading));
        assert_eq!(tree.get(heading).map(|node| node.text.as_str()), Some("Skills"));
    }

    #[test]
    fn header_slot_is_not_draggable_by_default() {
        let tree = TemplateSpec::default().build_tree();
        let header = tree.section_slot("header").expect("header slot should exist");
        assert!(!tree.draggable_nodes().contains(&header));
        assert_eq!(tree.draggable_nodes().len(), 8);
    }

    #[test]
    fn yaml_template_applies_defaults_and_static_visibility() {
        let spec = TemplateSpec::from_yaml_str(
            r#"
regions:
  - name: main
    slots:
      - kind: experience
      - kind: projects
        heading: Side Projects
        visible: false
"#,
        )
        .expect("template should parse");
        let tree = spec.build_tree();
        let experience = tree.section_slot("experience").expect("slot should exist");
        let heading = tree.children(experience)[0];
        assert_eq!(
            tree.get(heading).map(|node| node.text.as_str()),
            Some("Experience")
        );
        let projects = tree.section_slot("projects").expect("slot should exist");
        assert!(tree.is_hidden(projects));
    }

    #[test]
    fn duplicate_slot_kinds_are_rejected() {
        let error = TemplateSpec::from_yaml_str(
            r#"
regions:
  - name: sidebar
    slots: [{ kind: skills }]
  - name: main
    slots: [{ kind: Skills }]
"#,
        )
        .expect_err("duplicate slot should fail");
        assert_eq!(
            error,
            TemplateError::DuplicateSlot {
                kind: "Skills".to_owned()
            }
        );
    }

    #[test]
    fn unknown_fields_fail_to_parse() {
        let error = TemplateSpec::from_yaml_str("regions: []\nlayout: a4\n")
            .expect_err("unknown field should fail");
        assert!(matches!(error, TemplateError::Parse(_)));
    }

    #[test]
    fn empty_region_list_is_rejected() {
        let error =
            TemplateSpec::from_yaml_str("regions: []\n").expect_err("no regions should fail");
        assert_eq!(error, TemplateError::NoRegions);
    }

    #[test]
    fn load_template_reports_path_on_failure() {
        let root = temp_path("template-load");
        fs::create_dir_all(&root).expect("temp dir should be created");
        let path = root.join("broken.yaml");
        fs::write(&path, "regions: [").expect("template should be written");

        let error = load_template(&path).expect_err("broken yaml should fail");
        assert!(format!("{error:#}").contains("broken.yaml"));

        remove_dir_if_exists(&root);
    }
}
