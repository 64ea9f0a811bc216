//! Lookup tables over the scene: which node is rendered where, which parent owns which child
//! list, paging cursors, and live collapsed-chain placeholders.

use crate::leg::Leg;
use crate::model::NodeId;
use crate::scene::ElementId;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeEntry {
    /// The node's own list item.
    pub item: ElementId,
    /// The list the item currently sits in.
    pub parent_list: ElementId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingState {
    pub offset: u32,
    pub page_size: u32,
    pub done: bool,
}

impl PagingState {
    pub fn new(page_size: u32) -> Self {
        Self {
            offset: 0,
            page_size,
            done: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    nodes: FxHashMap<NodeId, NodeEntry>,
    lists: FxHashMap<NodeId, ElementId>,
    paging: FxHashMap<NodeId, PagingState>,
    surrogates: FxHashMap<(NodeId, Leg), ElementId>,
}

impl TreeIndex {
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<NodeEntry> {
        self.nodes.get(id).copied()
    }

    /// Registers a node. Returns `false` (and changes nothing) if the id is already indexed.
    pub fn insert_node(&mut self, id: &str, entry: NodeEntry) -> bool {
        if self.nodes.contains_key(id) {
            return false;
        }
        self.nodes.insert(id.to_string(), entry);
        true
    }

    pub fn set_parent_list(&mut self, id: &str, parent_list: ElementId) {
        if let Some(e) = self.nodes.get_mut(id) {
            e.parent_list = parent_list;
        }
    }

    /// Drops a node together with its list and paging cursor.
    pub fn remove_node(&mut self, id: &str) -> Option<NodeEntry> {
        self.lists.remove(id);
        self.paging.remove(id);
        self.nodes.remove(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn list(&self, parent: &str) -> Option<ElementId> {
        self.lists.get(parent).copied()
    }

    pub fn set_list(&mut self, parent: &str, list: ElementId) {
        self.lists.insert(parent.to_string(), list);
    }

    pub fn paging(&self, parent: &str) -> Option<PagingState> {
        self.paging.get(parent).copied()
    }

    pub fn paging_mut(&mut self, parent: &str, page_size: u32) -> &mut PagingState {
        self.paging
            .entry(parent.to_string())
            .or_insert_with(|| PagingState::new(page_size))
    }

    pub fn reset_paging(&mut self, parent: &str) {
        self.paging.remove(parent);
    }

    pub fn surrogate(&self, ancestor: &str, leg: &Leg) -> Option<ElementId> {
        self.surrogates
            .get(&(ancestor.to_string(), leg.clone()))
            .copied()
    }

    pub fn set_surrogate(&mut self, ancestor: &str, leg: &Leg, el: ElementId) -> Option<ElementId> {
        self.surrogates
            .insert((ancestor.to_string(), leg.clone()), el)
    }

    pub fn remove_surrogate_element(&mut self, el: ElementId) {
        self.surrogates.retain(|_, v| *v != el);
    }

    pub fn retain_surrogates(&mut self, mut keep: impl FnMut(ElementId) -> bool) {
        self.surrogates.retain(|_, v| keep(*v));
    }

    pub fn surrogate_count(&self) -> usize {
        self.surrogates.len()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lists.clear();
        self.paging.clear();
        self.surrogates.clear();
    }
}
