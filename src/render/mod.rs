use tracing::{debug, warn};

use crate::document::{Node, NodeId, NodeRole, VisualTree};
use crate::profile::CanonicalProfile;
use crate::section::{SectionKind, SectionTag};

pub mod visibility;

use self::visibility::apply_visibility;

pub const ITEM_CLASS: &str = "resume-item";
pub const SKILL_BAR_CLASS: &str = "skill-bar";
pub const SKILL_PERCENTAGE_FIELD: &str = "percentage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub text: String,
}

impl FieldDescriptor {
    fn new(name: &'static str, text: &str) -> Self {
        Self {
            name,
            text: text.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemDescriptor {
    pub fields: Vec<FieldDescriptor>,
    pub bar: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionOutcome {
    Rendered {
        removed: usize,
        created: usize,
        hidden: bool,
    },
    MissingSlot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRender {
    pub kind: SectionKind,
    pub outcome: SectionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderReport {
    pub sections: Vec<SectionRender>,
    pub unrecognized: Vec<String>,
}

impl RenderReport {
    pub fn outcome(&self, kind: SectionKind) -> Option<SectionOutcome> {
        self.sections
            .iter()
            .find(|section| section.kind == kind)
            .map(|section| section.outcome)
    }

    pub fn created_items(&self) -> usize {
        self.sections
            .iter()
            .map(|section| match section.outcome {
                SectionOutcome::Rendered { created, .. } => created,
                SectionOutcome::MissingSlot => 0,
            })
            .sum()
    }
}

pub fn section_items(
    kind: SectionKind,
    profile: &CanonicalProfile,
) -> Box<dyn Iterator<Item = ItemDescriptor> + '_> {
    match kind {
        SectionKind::Header => {
            let personal = &profile.personal;
            Box::new(std::iter::once(ItemDescriptor {
                fields: vec![
                    FieldDescriptor::new("fullName", &personal.full_name),
                    FieldDescriptor::new("professionalTitle", &personal.professional_title),
                    FieldDescriptor::new("email", &personal.email),
                    FieldDescriptor::new("phone", &personal.phone),
                    FieldDescriptor::new("address", &personal.address),
                    FieldDescriptor::new("website", &personal.website),
                    FieldDescriptor::new("linkedin", &personal.linkedin),
                ],
                bar: None,
            }))
        }
        SectionKind::Summary => Box::new(std::iter::once(ItemDescriptor {
            fields: vec![FieldDescriptor::new(
                "professionalSummary",
                &profile.personal.professional_summary,
            )],
            bar: None,
        })),
        SectionKind::Experience => Box::new(profile.work_history.iter().map(|entry| {
            ItemDescriptor {
                fields: vec![
                    FieldDescriptor::new("position", &entry.position),
                    FieldDescriptor::new("company", &entry.company),
                    FieldDescriptor::new("startDate", &entry.start_date),
                    FieldDescriptor::new("endDate", &entry.end_date),
                    FieldDescriptor::new("description", &entry.description),
                ],
                bar: None,
            }
        })),
        SectionKind::Education => Box::new(profile.education.iter().map(|entry| {
            ItemDescriptor {
                fields: vec![
                    FieldDescriptor::new("degree", &entry.degree_line),
                    FieldDescriptor::new("institution", &entry.institution),
                    FieldDescriptor::new("dateRange", &entry.date_range),
                    FieldDescriptor::new("detail", &entry.detail_line),
                ],
                bar: None,
            }
        })),
        SectionKind::Skills => Box::new(profile.skills.iter().map(|skill| ItemDescriptor {
            fields: vec![FieldDescriptor::new("name", &skill.name)],
            bar: Some(skill.percentage),
        })),
        SectionKind::Certifications => {
            Box::new(profile.certifications.iter().flatten().map(|entry| {
                ItemDescriptor {
                    fields: vec![
                        FieldDescriptor::new("name", &entry.name),
                        FieldDescriptor::new("issuer", &entry.issuer),
                        FieldDescriptor::new("date", &entry.date),
                    ],
                    bar: None,
                }
            }))
        }
        SectionKind::Languages => Box::new(profile.languages.iter().flatten().map(|entry| {
            ItemDescriptor {
                fields: vec![
                    FieldDescriptor::new("language", &entry.language),
                    FieldDescriptor::new("proficiency", &entry.proficiency),
                ],
                bar: None,
            }
        })),
        SectionKind::Accomplishments => {
            Box::new(profile.accomplishments.iter().flatten().map(|entry| {
                ItemDescriptor {
                    fields: vec![
                        FieldDescriptor::new("title", &entry.title),
                        FieldDescriptor::new("description", &entry.description),
                    ],
                    bar: None,
                }
            }))
        }
        SectionKind::Interests => Box::new(profile.interests.iter().flatten().map(|entry| {
            ItemDescriptor {
                fields: vec![FieldDescriptor::new("name", &entry.name)],
                bar: None,
            }
        })),
    }
}

fn items_draggable(kind: SectionKind) -> bool {
    !matches!(kind, SectionKind::Header | SectionKind::Summary)
}

pub struct SectionRenderer;

impl SectionRenderer {
    // Nodes without the kind's marker class (the heading included) are left alone.
    pub fn render<I>(tree: &mut VisualTree, kind: SectionKind, items: I) -> SectionOutcome
    where
        I: IntoIterator<Item = ItemDescriptor>,
    {
        let Some(slot) = tree.section_slot(kind.tag()) else {
            debug!(section = %kind, "template has no slot for section; skipping");
            return SectionOutcome::MissingSlot;
        };

        let removed = tree
            .children_with_class(slot, kind.marker_class())
            .into_iter()
            .map(|item| tree.remove(item))
            .filter(|removed| *removed > 0)
            .count();

        let mut created = 0;
        for descriptor in items {
            if append_item(tree, slot, kind, descriptor).is_some() {
                created += 1;
            }
        }

        let mut hidden = created == 0;
        tree.set_hidden(slot, hidden);
        if !hidden && let Some(empty) = apply_visibility(tree, kind, slot) {
            hidden = empty;
        }

        debug!(section = %kind, removed, created, hidden, "rendered section");
        SectionOutcome::Rendered {
            removed,
            created,
            hidden,
        }
    }

    pub fn render_profile(tree: &mut VisualTree, profile: &CanonicalProfile) -> RenderReport {
        let mut report = RenderReport::default();

        for kind in SectionKind::ALL {
            let outcome = Self::render(tree, kind, section_items(kind, profile));
            report.sections.push(SectionRender { kind, outcome });
        }

        for tag in profile.section_tags() {
            if let SectionTag::Other(tag) = tag {
                warn!(section = %tag, "no renderer for section kind; ignoring");
                report.unrecognized.push(tag);
            }
        }

        report
    }
}

fn append_item(
    tree: &mut VisualTree,
    slot: NodeId,
    kind: SectionKind,
    descriptor: ItemDescriptor,
) -> Option<NodeId> {
    let mut item = Node::new(NodeRole::Item)
        .with_class(ITEM_CLASS)
        .with_class(kind.marker_class());
    if items_draggable(kind) {
        item = item.draggable();
    }
    let item_id = tree.append(slot, item)?;

    for field in descriptor.fields {
        tree.append(item_id, Node::field(field.name, field.text))?;
    }

    if let Some(percent) = descriptor.bar {
        tree.append(
            item_id,
            Node::new(NodeRole::Bar)
                .with_class(SKILL_BAR_CLASS)
                .with_percent(percent),
        )?;
        tree.append(
            item_id,
            Node::new(NodeRole::Field)
                .named(SKILL_PERCENTAGE_FIELD)
                .with_class("skill-percentage")
                .with_text(format!("{percent}%")),
        )?;
    }

    Some(item_id)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::document::NodeRole;
    use crate::document::template::{RegionSpec, SlotSpec, TemplateSpec};
    use crate::profile::normalize;
    use crate::section::SectionKind;
    use crate::test_support::sample_payload;

    use super::{SKILL_PERCENTAGE_FIELD, SectionOutcome, SectionRenderer, section_items};

    #[test]
    fn rendering_twice_matches_rendering_once() {
        let profile = normalize(&sample_payload());
        let mut once = TemplateSpec::default().build_tree();
        SectionRenderer::render_profile(&mut once, &profile);

        let mut twice = TemplateSpec::default().build_tree();
        SectionRenderer::render_profile(&mut twice, &profile);
        SectionRenderer::render_profile(&mut twice, &profile);

        assert_eq!(once.len(), twice.len());
        assert_eq!(once.outline(), twice.outline());
    }

    #[test]
    fn second_payload_leaves_no_residue() {
        let mut tree = TemplateSpec::default().build_tree();
        SectionRenderer::render_profile(&mut tree, &normalize(&sample_payload()));
        let report = SectionRenderer::render_profile(
            &mut tree,
            &normalize(&json!({ "workExperience": [{ "position": "Solo" }] })),
        );

        let experience = tree
            .section_slot("experience")
            .expect("experience slot should exist");
        let items = tree.children_with_class(experience, SectionKind::Experience.marker_class());
        assert_eq!(items.len(), 1);
        assert_eq!(tree.field_text(items[0], "position"), Some("Solo"));

        let languages = tree
            .section_slot("languages")
            .expect("languages slot should exist");
        assert!(tree.is_hidden(languages));
        assert!(matches!(
            report.outcome(SectionKind::Languages),
            Some(SectionOutcome::Rendered {
                removed: 2,
                created: 0,
                hidden: true
            })
        ));
    }

    #[test]
    fn heading_survives_render() {
        let mut tree = TemplateSpec::default().build_tree();
        SectionRenderer::render_profile(&mut tree, &normalize(&sample_payload()));
        let skills = tree.section_slot("skills").expect("skills slot should exist");
        let first = tree.children(skills)[0];
        assert_eq!(tree.role_of(first), Some(NodeRole::Heading));
    }

    #[test]
    fn skills_render_bar_and_numeric_label() {
        let mut tree = TemplateSpec::default().build_tree();
        SectionRenderer::render_profile(
            &mut tree,
            &normalize(&json!({ "skills": [{ "name": "Rust", "proficiency": 9 }] })),
        );

        let skills = tree.section_slot("skills").expect("skills slot should exist");
        let item = tree.children_with_class(skills, SectionKind::Skills.marker_class())[0];
        let bar = tree
            .descendants(item)
            .find(|id| tree.role_of(*id) == Some(NodeRole::Bar))
            .and_then(|id| tree.get(id))
            .and_then(|node| node.percent);
        assert_eq!(bar, Some(90));
        assert_eq!(tree.field_text(item, SKILL_PERCENTAGE_FIELD), Some("90%"));
    }

    #[test]
    fn missing_slot_is_a_no_op() {
        let spec = TemplateSpec {
            regions: vec![RegionSpec {
                name: "main".to_owned(),
                slots: vec![SlotSpec {
                    kind: "experience".to_owned(),
                    heading: None,
                    visible: true,
                    draggable: true,
                }],
            }],
        };
        let mut tree = spec.build_tree();
        let report =
            SectionRenderer::render_profile(&mut tree, &normalize(&sample_payload()));

        assert_eq!(
            report.outcome(SectionKind::Skills),
            Some(SectionOutcome::MissingSlot)
        );
        assert!(matches!(
            report.outcome(SectionKind::Experience),
            Some(SectionOutcome::Rendered { created: 2, .. })
        ));
    }

    #[test]
    fn unrecognized_kinds_are_reported_not_rendered() {
        let mut tree = TemplateSpec::default().build_tree();
        let report = SectionRenderer::render_profile(
            &mut tree,
            &normalize(&json!({
                "projects": [{ "name": "x" }],
                "workExperience": [{ "position": "Engineer", "company": "Acme" }]
            })),
        );
        assert_eq!(report.unrecognized, vec!["projects".to_owned()]);
        assert!(tree.section_slot("projects").is_none());

        let experience = tree
            .section_slot("experience")
            .expect("experience slot should exist");
        let items = tree.children_with_class(experience, SectionKind::Experience.marker_class());
        assert_eq!(items.len(), 1);
        assert_eq!(tree.field_text(items[0], "position"), Some("Engineer"));
        assert!(!tree.is_hidden(experience));
        assert!(matches!(
            report.outcome(SectionKind::Experience),
            Some(SectionOutcome::Rendered {
                created: 1,
                hidden: false,
                ..
            })
        ));
    }

    #[test]
    fn empty_sequence_hides_slot() {
        let mut tree = TemplateSpec::default().build_tree();
        let outcome = SectionRenderer::render(&mut tree, SectionKind::Education, Vec::new());
        assert_eq!(
            outcome,
            SectionOutcome::Rendered {
                removed: 0,
                created: 0,
                hidden: true
            }
        );
    }

    #[test]
    fn section_items_preserve_input_order() {
        let profile = normalize(&sample_payload());
        let positions = section_items(SectionKind::Experience, &profile)
            .map(|item| item.fields[0].text.clone())
            .collect::<Vec<_>>();
        assert_eq!(positions, vec!["Senior Engineer", "Staff Engineer"]);
    }
}
