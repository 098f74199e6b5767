use crate::document::{NodeId, VisualTree};
use crate::section::SectionKind;

pub fn primary_label_field(kind: SectionKind) -> Option<&'static str> {
    match kind {
        SectionKind::Skills => Some("name"),
        SectionKind::Experience => Some("position"),
        SectionKind::Education => Some("degree"),
        SectionKind::Summary => Some("professionalSummary"),
        SectionKind::Header
        | SectionKind::Certifications
        | SectionKind::Languages
        | SectionKind::Accomplishments
        | SectionKind::Interests => None,
    }
}

pub fn is_empty(tree: &VisualTree, kind: SectionKind, items: &[NodeId]) -> Option<bool> {
    let label = primary_label_field(kind)?;
    let blank = |item: &NodeId| {
        tree.field_text(*item, label)
            .is_none_or(|text| text.trim().is_empty())
    };

    match kind {
        SectionKind::Summary => Some(items.first().is_none_or(blank)),
        _ => Some(items.iter().all(blank)),
    }
}

pub fn apply_visibility(tree: &mut VisualTree, kind: SectionKind, slot: NodeId) -> Option<bool> {
    let items = tree.children_with_class(slot, kind.marker_class());
    let hidden = is_empty(tree, kind, &items)?;
    tree.set_hidden(slot, hidden);
    Some(hidden)
}

pub fn refresh_visibility(tree: &mut VisualTree) -> usize {
    let mut evaluated = 0;
    for slot in tree.section_slots() {
        let Some(kind) = tree
            .get(slot)
            .and_then(|node| node.section.as_deref())
            .and_then(SectionKind::from_tag)
        else {
            continue;
        };
        if apply_visibility(tree, kind, slot).is_some() {
            evaluated += 1;
        }
    }
    evaluated
}
