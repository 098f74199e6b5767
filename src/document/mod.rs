use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::Serialize;

pub mod template;

pub const PLACEHOLDER_CLASS: &str = "drag-placeholder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Root,
    Region,
    Section,
    Heading,
    Item,
    Field,
    Bar,
    Placeholder,
}

impl NodeRole {
    pub fn label(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Region => "region",
            Self::Section => "section",
            Self::Heading => "heading",
            Self::Item => "item",
            Self::Field => "field",
            Self::Bar => "bar",
            Self::Placeholder => "placeholder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    role: NodeRole,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub name: Option<String>,
    pub section: Option<String>,
    pub classes: BTreeSet<String>,
    pub text: String,
    pub editable: bool,
    pub draggable: bool,
    pub container: bool,
    pub hidden: bool,
    pub percent: Option<u8>,
}

impl Node {
    pub fn new(role: NodeRole) -> Self {
        Self {
            id: NodeId(0),
            role,
            parent: None,
            children: Vec::new(),
            name: None,
            section: None,
            classes: BTreeSet::new(),
            text: String::new(),
            editable: false,
            draggable: false,
            container: false,
            hidden: false,
            percent: None,
        }
    }

    pub fn field(name: &str, text: impl Into<String>) -> Self {
        Self::new(NodeRole::Field)
            .named(name)
            .with_class(&format!("field-{name}"))
            .with_text(text)
            .editable()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_section(mut self, tag: impl Into<String>) -> Self {
        self.section = Some(tag.into());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_owned());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_percent(mut self, percent: u8) -> Self {
        self.percent = Some(percent.min(100));
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn draggable(mut self) -> Self {
        self.draggable = true;
        self
    }

    pub fn container(mut self) -> Self {
        self.container = true;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

// Node ids are never reused within one tree; a stale id stops resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualTree {
    nodes: BTreeMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
}

impl Default for VisualTree {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualTree {
    pub fn new() -> Self {
        let root_id = NodeId(1);
        let mut root = Node::new(NodeRole::Root);
        root.id = root_id;
        Self {
            nodes: BTreeMap::from([(root_id, root)]),
            root: root_id,
            next_id: 2,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn append(&mut self, parent: NodeId, node: Node) -> Option<NodeId> {
        let index = self.nodes.get(&parent)?.children.len();
        self.insert(parent, index, node)
    }

    pub fn insert(&mut self, parent: NodeId, index: usize, mut node: Node) -> Option<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;
        node.id = id;
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.insert(id, node);
        self.attach(parent, index, id);
        Some(id)
    }

    pub fn move_to(&mut self, id: NodeId, parent: NodeId, index: usize) -> bool {
        if id == self.root
            || !self.contains(id)
            || !self.contains(parent)
            || self.ancestors(parent).any(|ancestor| ancestor == id)
        {
            return false;
        }

        self.detach(id);
        self.attach(parent, index, id);
        true
    }

    pub fn remove(&mut self, id: NodeId) -> usize {
        if id == self.root || !self.contains(id) {
            return 0;
        }

        self.detach(id);
        let doomed = self.descendants(id).collect::<Vec<_>>();
        for node_id in &doomed {
            self.nodes.remove(node_id);
        }
        doomed.len()
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.contains(id).then_some(id), |current| {
            self.parent(*current)
        })
    }

    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = if self.contains(id) { vec![id] } else { Vec::new() };
        std::iter::from_fn(move || {
            let current = stack.pop()?;
            stack.extend(self.children(current).iter().rev().copied());
            Some(current)
        })
    }

    pub fn enclosing(&self, id: NodeId, role: NodeRole) -> Option<NodeId> {
        self.ancestors(id)
            .skip(1)
            .find(|ancestor| self.role_of(*ancestor) == Some(role))
    }

    pub fn enclosing_or_self(&self, id: NodeId, role: NodeRole) -> Option<NodeId> {
        self.ancestors(id)
            .find(|ancestor| self.role_of(*ancestor) == Some(role))
    }

    pub fn role_of(&self, id: NodeId) -> Option<NodeRole> {
        self.nodes.get(&id).map(Node::role)
    }

    pub fn section_slot(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root).find(|id| {
            self.nodes.get(id).is_some_and(|node| {
                node.role == NodeRole::Section && node.section.as_deref() == Some(tag)
            })
        })
    }

    pub fn section_slots(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .filter(|id| self.role_of(*id) == Some(NodeRole::Section))
            .collect()
    }

    pub fn region(&self, name: &str) -> Option<NodeId> {
        self.children(self.root).iter().copied().find(|id| {
            self.nodes.get(id).is_some_and(|node| {
                node.role == NodeRole::Region && node.name.as_deref() == Some(name)
            })
        })
    }

    pub fn draggable_nodes(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .filter(|id| self.nodes.get(id).is_some_and(|node| node.draggable))
            .collect()
    }

    pub fn children_with_class(&self, id: NodeId, class: &str) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.nodes.get(child).is_some_and(|node| node.has_class(class)))
            .collect()
    }

    pub fn field_text(&self, item: NodeId, field: &str) -> Option<&str> {
        self.descendants(item)
            .filter_map(|id| self.nodes.get(&id))
            .find(|node| node.role == NodeRole::Field && node.name.as_deref() == Some(field))
            .map(|node| node.text.as_str())
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if node.editable => {
                node.text = text.into();
                true
            }
            _ => false,
        }
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.hidden = hidden;
                true
            }
            None => false,
        }
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|node| node.hidden)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.classes.insert(class.to_owned());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.classes.remove(class);
        }
    }

    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(self.root, 0, &mut out);
        out
    }

    fn write_outline(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };

        let _ = write!(out, "{}{}", "  ".repeat(depth), node.role.label());
        if let Some(name) = node.name.as_deref().or(node.section.as_deref()) {
            let _ = write!(out, " [{name}]");
        }
        if !node.text.is_empty() {
            let _ = write!(out, " {:?}", node.text);
        }
        if let Some(percent) = node.percent {
            let _ = write!(out, " {percent}%");
        }
        if node.hidden {
            out.push_str(" (hidden)");
        }
        out.push('\n');

        for child in &node.children {
            self.write_outline(*child, depth + 1, out);
        }
    }

    pub fn snapshot(&self) -> Option<NodeSnapshot> {
        self.snapshot_of(self.root)
    }

    fn snapshot_of(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.nodes.get(&id)?;
        Some(NodeSnapshot {
            id: node.id.get(),
            role: node.role,
            name: node.name.clone(),
            section: node.section.clone(),
            classes: node.classes.iter().cloned().collect(),
            text: node.text.clone(),
            hidden: node.hidden,
            draggable: node.draggable,
            percent: node.percent,
            children: node
                .children
                .iter()
                .filter_map(|child| self.snapshot_of(*child))
                .collect(),
        })
    }

    fn attach(&mut self, parent: NodeId, index: usize, id: NodeId) {
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            let index = index.min(parent_node.children.len());
            parent_node.children.insert(index, id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(parent);
        }
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.retain(|child| *child != id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub id: u64,
    pub role: NodeRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    pub hidden: bool,
    pub draggable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::{Node, NodeRole, VisualTree};

    fn list_tree() -> (VisualTree, super::NodeId, Vec<super::NodeId>) {
        let mut tree = VisualTree::new();
        let root = tree.root();
        let list = tree
            .append(root, Node::new(NodeRole::Region).named("main").container())
            .expect("region should be appended");
        let items = ["a", "b", "c"]
            .into_iter()
            .map(|text| {
                tree.append(list, Node::new(NodeRole::Item).with_text(text))
                    .expect("item should be appended")
            })
            .collect();
        (tree, list, items)
    }

    fn texts(tree: &VisualTree, parent: super::NodeId) -> Vec<String> {
        tree.children(parent)
            .iter()
            .filter_map(|id| tree.get(*id))
            .map(|node| node.text.clone())
            .collect()
    }

    #[test]
    fn move_to_reorders_within_parent() {
        let (mut tree, list, items) = list_tree();
        assert!(tree.move_to(items[0], list, 2));
        assert_eq!(texts(&tree, list), vec!["b", "c", "a"]);
        assert_eq!(tree.index_in_parent(items[0]), Some(2));
    }

    #[test]
    fn move_into_own_subtree_is_refused() {
        let (mut tree, list, items) = list_tree();
        assert!(!tree.move_to(list, items[0], 0));
        assert_eq!(tree.parent(list), Some(tree.root()));
    }

    #[test]
    fn remove_drops_whole_subtree_and_ids_are_not_reused() {
        let (mut tree, list, items) = list_tree();
        let child = tree
            .append(items[1], Node::field("name", "x"))
            .expect("field should be appended");
        assert_eq!(tree.remove(items[1]), 2);
        assert!(!tree.contains(child));
        assert_eq!(texts(&tree, list), vec!["a", "c"]);

        let fresh = tree
            .append(list, Node::new(NodeRole::Item))
            .expect("item should be appended");
        assert!(fresh > child);
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut tree = VisualTree::new();
        assert_eq!(tree.remove(tree.root()), 0);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn set_text_only_touches_editable_nodes() {
        let (mut tree, _list, items) = list_tree();
        assert!(!tree.set_text(items[0], "changed"));
        let field = tree
            .append(items[0], Node::field("name", "old"))
            .expect("field should be appended");
        assert!(tree.set_text(field, "new"));
        assert_eq!(tree.field_text(items[0], "name"), Some("new"));
    }

    #[test]
    fn enclosing_skips_self_but_enclosing_or_self_does_not() {
        let (tree, list, items) = list_tree();
        assert_eq!(tree.enclosing(items[0], NodeRole::Region), Some(list));
        assert_eq!(tree.enclosing(list, NodeRole::Region), None);
        assert_eq!(tree.enclosing_or_self(list, NodeRole::Region), Some(list));
    }

    #[test]
    fn outline_marks_hidden_nodes() {
        let (mut tree, list, _items) = list_tree();
        tree.set_hidden(list, true);
        let outline = tree.outline();
        assert!(outline.contains("region [main] (hidden)"));
        assert!(outline.contains("    item \"a\""));
    }
}
