//! Logical scene graph arena and assembler
//!
//! Elements are read into a flat object-id table first. The assembler then
//! walks the child ids depth first from the root and creates one arena node
//! per visited element. An element reached a second time (multi-instance)
//! is attached as a deep copy of the subtree built for its first parent.

use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::formats::jt::context::LoadContext;
use crate::formats::jt::guid::Guid;
use crate::formats::jt::lsg::{JtElement, LateLoadedPropertyAtom, MetaValue, PropertyTable};
use crate::formats::jt::toc::SegmentObject;

/// Deepest nesting the assembler follows
pub const MAX_GRAPH_DEPTH: usize = 1024;

/// Most nodes an assembled graph may hold, multi-instance copies included
pub const MAX_GRAPH_NODES: usize = 1 << 22;

/// Property key naming a node
pub const PROP_NAME: &str = "JT_PROP_NAME";

/// Property key of the late-loaded meta data binding
pub const PROP_LL_METADATA: &str = "JT_LLPROP_METADATA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub object_id: i32,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Attribute element ids, without duplicates
    pub attributes: Vec<i32>,
    /// Key atom id to value atom id; the first pair for a key wins
    pub properties: IndexMap<i32, i32>,
    /// Bound from the late-loaded meta data segment
    pub ll_properties: IndexMap<String, MetaValue>,
}

impl SceneNode {
    fn new(object_id: i32, parent: Option<NodeId>) -> Self {
        Self {
            object_id,
            parent,
            children: Vec::new(),
            attributes: Vec::new(),
            properties: IndexMap::new(),
            ll_properties: IndexMap::new(),
        }
    }

    pub fn add_attribute(&mut self, attribute_id: i32) {
        if !self.attributes.contains(&attribute_id) {
            self.attributes.push(attribute_id);
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneGraph {
    elements: IndexMap<i32, JtElement>,
    nodes: Vec<SceneNode>,
    root: NodeId,
}

/// Borrowed inputs of one assembly run
struct Assembler<'a, 'c, 'p> {
    graph: SceneGraph,
    property_table: &'a PropertyTable,
    segment_objects: &'a IndexMap<Guid, SegmentObject>,
    /// Object id to the node created on its first visit
    linked: HashMap<i32, NodeId>,
    stop_after_clone: bool,
    max_nodes: usize,
    ctx: &'c mut LoadContext<'p>,
}

impl SceneGraph {
    /// Wire the flat element table into a tree rooted at `root_id`
    ///
    /// Unresolvable child, attribute and property ids are warned about and
    /// dropped. With `stop_after_clone` the remaining children of a parent
    /// are ignored after its first cloned child, as older readers did.
    ///
    /// # Errors
    /// [`Error::MissingRoot`] if `root_id` is not an LSG node,
    /// [`Error::GraphTooDeep`] past [`MAX_GRAPH_DEPTH`] levels,
    /// [`Error::GraphTooLarge`] past [`MAX_GRAPH_NODES`] nodes.
    pub fn assemble(
        elements: IndexMap<i32, JtElement>,
        property_table: &PropertyTable,
        segment_objects: &IndexMap<Guid, SegmentObject>,
        root_id: i32,
        ctx: &mut LoadContext<'_>,
        stop_after_clone: bool,
    ) -> Result<Self> {
        Self::assemble_with_limit(
            elements,
            property_table,
            segment_objects,
            root_id,
            ctx,
            stop_after_clone,
            MAX_GRAPH_NODES,
        )
    }

    pub(crate) fn assemble_with_limit(
        elements: IndexMap<i32, JtElement>,
        property_table: &PropertyTable,
        segment_objects: &IndexMap<Guid, SegmentObject>,
        root_id: i32,
        ctx: &mut LoadContext<'_>,
        stop_after_clone: bool,
        max_nodes: usize,
    ) -> Result<Self> {
        if !elements.get(&root_id).is_some_and(JtElement::is_lsg_node) {
            return Err(Error::MissingRoot);
        }

        let root = NodeId(0);
        let mut assembler = Assembler {
            graph: SceneGraph {
                elements,
                nodes: vec![SceneNode::new(root_id, None)],
                root,
            },
            property_table,
            segment_objects,
            linked: HashMap::from([(root_id, root)]),
            stop_after_clone,
            max_nodes,
            ctx,
        };
        assembler.link(root, 0)?;
        Ok(assembler.graph)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Iterate `id` and its ancestors up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&n| self.parent(n))
    }

    /// The element a node was built from
    pub fn element(&self, id: NodeId) -> &JtElement {
        // Nodes are only created for ids present in the table
        &self.elements[&self.nodes[id.0].object_id]
    }

    pub fn element_by_id(&self, object_id: i32) -> Option<&JtElement> {
        self.elements.get(&object_id)
    }

    pub fn elements(&self) -> &IndexMap<i32, JtElement> {
        &self.elements
    }

    pub fn type_name(&self, id: NodeId) -> &'static str {
        self.element(id).type_name()
    }

    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = &JtElement> + '_ {
        self.nodes[id.0]
            .attributes
            .iter()
            .filter_map(|attr| self.elements.get(attr))
    }

    /// Resolved `(key, value)` property elements of a node
    pub fn properties(&self, id: NodeId) -> impl Iterator<Item = (&JtElement, &JtElement)> + '_ {
        self.nodes[id.0].properties.iter().filter_map(|(key, value)| {
            Some((self.elements.get(key)?, self.elements.get(value)?))
        })
    }

    /// Value element of the first property whose string key equals `key`
    pub fn property_value(&self, id: NodeId, key: &str) -> Option<&JtElement> {
        self.properties(id)
            .find(|(k, _)| k.as_string() == Some(key))
            .map(|(_, v)| v)
    }

    /// Display name with `.part;…` / `.asm;…` suffixes removed
    pub fn name(&self, id: NodeId) -> Option<String> {
        self.raw_name(id).map(strip_name_suffix)
    }

    /// Unmodified `JT_PROP_NAME`
    pub fn raw_name(&self, id: NodeId) -> Option<&str> {
        self.property_value(id, PROP_NAME)?.as_string()
    }

    /// Late-loaded property values in property order
    pub fn late_loaded_segments(&self, id: NodeId) -> Vec<&LateLoadedPropertyAtom> {
        self.properties(id)
            .filter_map(|(_, value)| value.as_late_loaded())
            .collect()
    }

    /// Whether no partition appears below the root
    pub fn is_monolithic(&self) -> bool {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            for &child in self.children(id) {
                if self.element(child).as_partition().is_some() {
                    return false;
                }
                stack.push(child);
            }
        }
        true
    }

    /// Copy `original` and its descendants under `new_parent`
    ///
    /// The copies share object ids and element data with the originals but
    /// own their attribute and property lists. The returned node is not yet
    /// in `new_parent`'s child list.
    pub fn clone_subtree(&mut self, original: NodeId, new_parent: NodeId) -> NodeId {
        let source = &self.nodes[original.0];
        let mut copy = SceneNode::new(source.object_id, Some(new_parent));
        copy.attributes.clone_from(&source.attributes);
        copy.properties.clone_from(&source.properties);
        copy.ll_properties.clone_from(&source.ll_properties);
        let children = source.children.clone();

        let id = NodeId(self.nodes.len());
        self.nodes.push(copy);
        for child in children {
            let child_copy = self.clone_subtree(child, id);
            self.nodes[id.0].children.push(child_copy);
        }
        id
    }

    /// Number of nodes in the subtree below and including `id`
    pub fn subtree_len(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            count += 1;
            stack.extend_from_slice(self.children(n));
        }
        count
    }

    /// Indented tree dump, one node per line: `- Type[id] "name"`
    pub fn describe(&self, with_attributes: bool, with_properties: bool) -> String {
        let mut out = String::new();
        self.describe_node(self.root, 0, with_attributes, with_properties, &mut out);
        out
    }

    fn describe_node(
        &self,
        id: NodeId,
        depth: usize,
        with_attributes: bool,
        with_properties: bool,
        out: &mut String,
    ) {
        let indent = "    ".repeat(depth);
        let node = self.node(id);
        let name = self
            .raw_name(id)
            .map_or_else(|| "<>".to_string(), |n| format!("\"{n}\""));
        let _ = writeln!(out, "{indent}- {}[{}] {name}", self.type_name(id), node.object_id);

        if with_attributes {
            for attribute in self.attributes(id) {
                let _ = writeln!(
                    out,
                    "{indent}    @ {}[{}]",
                    attribute.type_name(),
                    attribute.object_id()
                );
            }
        }
        if with_properties {
            for (key, value) in self.properties(id) {
                let key = key.property_display().unwrap_or_default();
                let value = value.property_display().unwrap_or_default();
                let _ = writeln!(out, "{indent}    {key} = {value}");
            }
            for (key, value) in &node.ll_properties {
                let _ = writeln!(out, "{indent}    {key} := {value}");
            }
        }

        for &child in self.children(id) {
            self.describe_node(child, depth + 1, with_attributes, with_properties, out);
        }
    }
}

impl Assembler<'_, '_, '_> {
    fn link(&mut self, id: NodeId, depth: usize) -> Result<()> {
        if depth > MAX_GRAPH_DEPTH {
            return Err(Error::GraphTooDeep {
                depth: MAX_GRAPH_DEPTH,
            });
        }

        let object_id = self.graph.nodes[id.0].object_id;
        let element = &self.graph.elements[&object_id];
        let type_name = element.type_name();
        let attribute_ids = element.attribute_ids().to_vec();
        let child_ids = element.child_ids().to_vec();

        self.attach_attributes(id, object_id, &attribute_ids);
        self.attach_properties(id, object_id);
        self.bind_late_loaded_metadata(id, object_id);

        for child_id in child_ids {
            if !self
                .graph
                .elements
                .get(&child_id)
                .is_some_and(JtElement::is_lsg_node)
            {
                self.ctx.warn(format!(
                    "Object {object_id} ({type_name}) references a not existing / unsupported child node: {child_id}"
                ));
                continue;
            }

            if let Some(&original) = self.linked.get(&child_id) {
                self.reserve(self.graph.subtree_len(original))?;
                let copy = self.graph.clone_subtree(original, id);
                self.graph.nodes[id.0].children.push(copy);
                if self.stop_after_clone {
                    break;
                }
                continue;
            }

            self.reserve(1)?;
            let child = NodeId(self.graph.nodes.len());
            self.graph.nodes.push(SceneNode::new(child_id, Some(id)));
            self.graph.nodes[id.0].children.push(child);
            self.linked.insert(child_id, child);
            self.link(child, depth + 1)?;
        }
        Ok(())
    }

    fn reserve(&self, additional: usize) -> Result<()> {
        if self.graph.nodes.len().saturating_add(additional) > self.max_nodes {
            return Err(Error::GraphTooLarge {
                nodes: self.max_nodes,
            });
        }
        Ok(())
    }

    fn attach_attributes(&mut self, id: NodeId, object_id: i32, attribute_ids: &[i32]) {
        for &attribute_id in attribute_ids {
            if self
                .graph
                .elements
                .get(&attribute_id)
                .is_some_and(JtElement::is_attribute)
            {
                self.graph.nodes[id.0].add_attribute(attribute_id);
            } else {
                self.ctx.warn(format!(
                    "Object {object_id} references a not existing / unsupported attribute: {attribute_id}"
                ));
            }
        }
    }

    fn attach_properties(&mut self, id: NodeId, object_id: i32) {
        for &(key, value) in self.property_table.pairs(object_id) {
            let elements = &self.graph.elements;
            if !elements.contains_key(&key) || !elements.contains_key(&value) {
                self.ctx
                    .warn(format!("Ignoring missing prop key/value: {key}->{value}"));
                continue;
            }
            self.graph.nodes[id.0].properties.entry(key).or_insert(value);
        }
    }

    fn bind_late_loaded_metadata(&mut self, id: NodeId, object_id: i32) {
        let Some(segment_id) = self
            .graph
            .property_value(id, PROP_LL_METADATA)
            .and_then(JtElement::as_late_loaded)
            .map(|ll| ll.segment_id)
        else {
            return;
        };

        match self.segment_objects.get(&segment_id) {
            Some(SegmentObject::PropertyMetaData(meta)) => {
                self.graph.nodes[id.0].ll_properties = meta.properties.clone();
            }
            _ => self.ctx.warn(format!(
                "Object {object_id} references missing meta data segment {segment_id}"
            )),
        }
    }
}

/// Remove a trailing `.part;<rev>` or `.asm;<rev>` from a node name
pub fn strip_name_suffix(raw: &str) -> String {
    if let Some(dot) = raw.rfind('.') {
        let suffix = &raw[dot + 1..];
        if dot > 0 && (suffix.starts_with("part;") || suffix.starts_with("asm;")) {
            return raw[..dot].to_string();
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::jt::lsg::{
        BaseAttributeData, BaseNodeData, BasePropertyAtomData, GroupNodeData, LineStyleAttribute,
        StringPropertyAtom,
    };

    fn group(object_id: i32, children: &[i32]) -> JtElement {
        JtElement::Group(GroupNodeData {
            base: BaseNodeData {
                object_id,
                node_flags: 0,
                attribute_ids: Vec::new(),
            },
            child_ids: children.to_vec(),
        })
    }

    fn string_atom(object_id: i32, value: &str) -> JtElement {
        JtElement::StringProperty(StringPropertyAtom {
            base: BasePropertyAtomData {
                object_id,
                state_flags: 0,
            },
            value: value.to_string(),
        })
    }

    fn line_style(object_id: i32) -> JtElement {
        JtElement::LineStyle(LineStyleAttribute {
            base: BaseAttributeData {
                object_id,
                state_flags: 0,
                field_inhibit_flags: 0,
            },
            line_type: 0,
            line_width: 1.0,
        })
    }

    fn table(elements: Vec<JtElement>) -> IndexMap<i32, JtElement> {
        elements.into_iter().map(|e| (e.object_id(), e)).collect()
    }

    fn assemble(elements: Vec<JtElement>, stop_after_clone: bool) -> (SceneGraph, LoadContext<'static>) {
        let mut ctx = LoadContext::new("test.jt", 0);
        let graph = SceneGraph::assemble(
            table(elements),
            &PropertyTable::default(),
            &IndexMap::new(),
            1,
            &mut ctx,
            stop_after_clone,
        )
        .unwrap();
        (graph, ctx)
    }

    #[test]
    fn test_multi_instance_clone() {
        let (mut graph, _) = assemble(
            vec![group(1, &[2, 2]), group(2, &[3]), group(3, &[]), line_style(9)],
            false,
        );
        let children = graph.children(graph.root()).to_vec();
        assert_eq!(children.len(), 2);
        assert_ne!(children[0], children[1]);
        assert_eq!(graph.node(children[0]).object_id, 2);
        assert_eq!(graph.node(children[1]).object_id, 2);
        assert_eq!(graph.parent(children[1]), Some(graph.root()));

        let grand0 = graph.children(children[0])[0];
        let grand1 = graph.children(children[1])[0];
        assert_ne!(grand0, grand1);
        assert_eq!(graph.parent(grand1), Some(children[1]));

        graph.node_mut(children[1]).add_attribute(9);
        assert!(graph.node(children[0]).attributes.is_empty());
        assert_eq!(graph.node(children[1]).attributes, vec![9]);
    }

    #[test]
    fn test_stop_after_clone_compatibility() {
        let (graph, _) = assemble(
            vec![group(1, &[2, 2, 3]), group(2, &[]), group(3, &[])],
            true,
        );
        assert_eq!(graph.children(graph.root()).len(), 2);

        let (graph, _) = assemble(
            vec![group(1, &[2, 2, 3]), group(2, &[]), group(3, &[])],
            false,
        );
        assert_eq!(graph.children(graph.root()).len(), 3);
    }

    #[test]
    fn test_unresolvable_child() {
        let (graph, ctx) = assemble(vec![group(1, &[2, 42]), group(2, &[])], false);
        assert_eq!(graph.children(graph.root()).len(), 1);
        assert!(ctx.has_warning("not existing / unsupported child node: 42"));
    }

    #[test]
    fn test_cycle_to_root_is_cloned() {
        let (graph, _) = assemble(vec![group(1, &[2]), group(2, &[1])], false);
        let child = graph.children(graph.root())[0];
        let back = graph.children(child)[0];
        assert_eq!(graph.node(back).object_id, 1);
        assert_ne!(back, graph.root());
    }

    #[test]
    fn test_properties_and_name() {
        let mut properties = PropertyTable::default();
        properties.insert(1, 10, 11);
        properties.insert(1, 10, 12);
        properties.insert(1, 13, 99);
        let mut ctx = LoadContext::new("test.jt", 0);
        let graph = SceneGraph::assemble(
            table(vec![
                group(1, &[]),
                string_atom(10, PROP_NAME),
                string_atom(11, "bracket.part;1"),
                string_atom(12, "other"),
                string_atom(13, "orphan"),
            ]),
            &properties,
            &IndexMap::new(),
            1,
            &mut ctx,
            false,
        )
        .unwrap();
        let root = graph.root();
        assert_eq!(graph.raw_name(root), Some("bracket.part;1"));
        assert_eq!(graph.name(root).as_deref(), Some("bracket"));
        assert!(ctx.has_warning("Ignoring missing prop key/value: 13->99"));
        assert!(graph.is_monolithic());
        assert_eq!(graph.describe(false, false), "- Group[1] \"bracket.part;1\"\n");
    }

    #[test]
    fn test_depth_limit() {
        let mut elements: Vec<JtElement> = (1..=1100).map(|id| group(id, &[id + 1])).collect();
        elements.push(group(1101, &[]));
        let mut ctx = LoadContext::new("deep.jt", 0);
        let result = SceneGraph::assemble(
            table(elements),
            &PropertyTable::default(),
            &IndexMap::new(),
            1,
            &mut ctx,
            false,
        );
        assert!(matches!(result, Err(Error::GraphTooDeep { .. })));
    }

    #[test]
    fn test_node_budget() {
        // Every level references the next one twice, doubling per level
        let mut elements: Vec<JtElement> = (1..=40).map(|id| group(id, &[id + 1, id + 1])).collect();
        elements.push(group(41, &[]));
        let mut ctx = LoadContext::new("wide.jt", 0);
        let result = SceneGraph::assemble_with_limit(
            table(elements),
            &PropertyTable::default(),
            &IndexMap::new(),
            1,
            &mut ctx,
            false,
            1000,
        );
        assert!(matches!(result, Err(Error::GraphTooLarge { nodes: 1000 })));
    }

    #[test]
    fn test_subtree_len() {
        let (graph, _) = assemble(vec![group(1, &[2, 3]), group(2, &[4]), group(3, &[]), group(4, &[])], false);
        assert_eq!(graph.subtree_len(graph.root()), 4);
        assert_eq!(graph.subtree_len(graph.children(graph.root())[0]), 2);
    }

    #[test]
    fn test_strip_name_suffix() {
        assert_eq!(strip_name_suffix("engine.asm;3"), "engine");
        assert_eq!(strip_name_suffix("engine.step"), "engine.step");
        assert_eq!(strip_name_suffix(".part;1"), ".part;1");
    }
}
