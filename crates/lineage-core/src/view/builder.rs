use super::TreeView;
use crate::index::NodeEntry;
use crate::leg::Leg;
use crate::model::{NodeRecord, NodeSlot};
use crate::scene::{ElementId, ElementKind, Expander, NodeElement};

impl TreeView {
    /// Builds one list entry for `slot` and registers it.
    ///
    /// Returns `None` without touching anything when the node is already rendered, sits in the
    /// holding tank, has nothing to render, or the template vetoes it.
    pub(crate) fn add_child(&mut self, list: ElementId, mut slot: NodeSlot) -> Option<ElementId> {
        self.scene.list(list)?;
        if let Some(id) = slot.node_id() {
            if self.index.contains(id) {
                tracing::debug!(node = id, "duplicate insert rejected");
                return None;
            }
        }
        if slot.leg().is_some_and(|l| l.is_holding_tank()) {
            return None;
        }
        if slot.record().is_some_and(|r| r.customer.is_none()) {
            return None;
        }
        let preresolved = slot
            .record_mut()
            .map(|r| std::mem::take(&mut r.children))
            .unwrap_or_default();
        let markup = self.host.template.render(&slot)?;

        let expander = match &slot {
            NodeSlot::EmptySlot { .. } => None,
            NodeSlot::Real(r) | NodeSlot::Overflow(r) => {
                (r.may_have_children() || !preresolved.is_empty()).then_some(Expander::Collapsed)
            }
        };
        let node_id = slot.node_id().map(str::to_string);
        let item = self.scene.create(ElementKind::Node(NodeElement {
            slot,
            markup,
            expander,
            child_list: None,
        }));
        self.insert_sorted(list, item);
        if let Some(id) = &node_id {
            self.index.insert_node(
                id,
                NodeEntry {
                    item,
                    parent_list: list,
                },
            );
        }

        if let (Some(id), false) = (&node_id, preresolved.is_empty()) {
            if let Some(sub) = self.ensure_child_list(item) {
                if let Some(l) = self.scene.list_mut(sub) {
                    l.open = true;
                }
                self.set_expander(item, Some(Expander::Expanded));
                for child in preresolved {
                    let child = self.classify(child);
                    self.place_node(sub, child);
                }
                if self.legs.is_legged() {
                    self.add_empty_slots(sub, id);
                }
                let page_size = self.config.page_size;
                self.index.paging_mut(id, page_size).done = true;
            }
        }
        Some(item)
    }

    /// An empty slot for every declared leg `list` has no entry for.
    pub(super) fn add_empty_slots(&mut self, list: ElementId, parent: &str) {
        let legs: Vec<Leg> = self.legs.iter().cloned().collect();
        for leg in legs {
            if self.scene.item_with_leg(list, &leg).is_none() {
                self.add_child(
                    list,
                    NodeSlot::EmptySlot {
                        leg,
                        upline_id: Some(parent.to_string()),
                    },
                );
            }
        }
    }

    /// Adds a node unless it is already rendered; in a legged tree the empty slot it fills is
    /// removed. A node shown inside a collapsed chain is moved here instead.
    pub(super) fn place_node(&mut self, list: ElementId, slot: NodeSlot) -> Option<ElementId> {
        let held = slot
            .node_id()
            .filter(|id| self.in_surrogate(id))
            .and_then(|id| self.element_of(id));
        if let Some(item) = held {
            if !self.scene.list_owner(list).is_some_and(|o| self.scene.surrogate(o).is_some()) {
                return self.adopt_from_surrogate(list, item, slot);
            }
        }
        let leg = slot.leg();
        let placed = slot.is_placed();
        let item = self.add_child(list, slot)?;
        if placed && self.legs.is_legged() {
            if let Some(leg) = leg {
                if let Some(empty) = self.scene.empty_slot_with_leg(list, &leg) {
                    self.destroy_element(empty);
                }
            }
        }
        Some(item)
    }

    /// Reparents a node out of a collapsed chain into its true parent's list, now that the
    /// levels in between are loaded. The emptied chain is dropped.
    fn adopt_from_surrogate(
        &mut self,
        list: ElementId,
        item: ElementId,
        mut slot: NodeSlot,
    ) -> Option<ElementId> {
        let node_id = slot.node_id()?.to_string();
        let old_list = self.scene.parent(item)?;
        if let Some(r) = slot.record_mut() {
            r.children.clear();
        }
        if self.legs.is_legged() {
            if let Some(empty) = slot
                .leg()
                .and_then(|leg| self.scene.empty_slot_with_leg(list, &leg))
            {
                self.destroy_element(empty);
            }
        }
        tracing::debug!(node = %node_id, "moving node out of a collapsed chain");
        if let Some(n) = self.scene.node_mut(item) {
            n.slot = slot;
        }
        self.insert_sorted(list, item);
        self.index.set_parent_list(&node_id, list);
        self.after_child_removed(old_list, None);
        Some(item)
    }

    /// Real when the record's leg is one of the declared legs (or the tree is flat).
    pub(super) fn classify(&self, record: NodeRecord) -> NodeSlot {
        if !self.legs.is_legged() || record.leg().is_some_and(|l| self.legs.contains(&l)) {
            NodeSlot::Real(record)
        } else {
            NodeSlot::Overflow(record)
        }
    }

    /// Returns the node's child list, creating it (closed) on first use.
    pub(super) fn ensure_child_list(&mut self, item: ElementId) -> Option<ElementId> {
        let node = self.scene.node(item)?;
        if let Some(list) = node.child_list {
            return Some(list);
        }
        let node_id = node.slot.node_id().map(str::to_string);
        let list = self.scene.create_list(item, false);
        if let Some(n) = self.scene.node_mut(item) {
            n.child_list = Some(list);
        }
        if let Some(id) = node_id {
            self.index.set_list(&id, list);
        }
        Some(list)
    }

    pub(super) fn set_expander(&mut self, item: ElementId, expander: Option<Expander>) {
        if let Some(n) = self.scene.node_mut(item) {
            n.expander = expander;
        }
    }

    /// Gives a node an expander if it has none, keeping an existing state.
    pub(super) fn ensure_expander(&mut self, item: ElementId) {
        let open = self
            .scene
            .node(item)
            .and_then(|n| n.child_list)
            .and_then(|l| self.scene.list(l))
            .is_some_and(|l| l.open);
        if let Some(n) = self.scene.node_mut(item) {
            if n.slot.is_placed() {
                n.expander = Some(if open {
                    Expander::Expanded
                } else {
                    Expander::Collapsed
                });
            }
        }
    }

    pub(super) fn insert_loading(&mut self, list: ElementId, leg: Option<Leg>) -> ElementId {
        let markup = self.host.template.loading();
        let loading = self.scene.create(ElementKind::Loading { leg, markup });
        self.insert_sorted(list, loading);
        loading
    }

    fn item_rank(&self, item: ElementId) -> usize {
        match self.scene.get(item) {
            Some(el) if matches!(el.kind, ElementKind::LoadMore) => usize::MAX,
            Some(el) => self.legs.rank(el.leg().as_ref()),
            None => usize::MAX,
        }
    }

    /// Legged lists stay in declared leg order: the item goes before the first sibling whose
    /// rank is not lower. Flat lists append, keeping "load more" last.
    pub(super) fn insert_sorted(&mut self, list: ElementId, item: ElementId) {
        let items = self.scene.items(list);
        let index = if self.legs.is_legged() {
            let rank = self.item_rank(item);
            items
                .iter()
                .position(|&s| s != item && self.item_rank(s) >= rank)
                .unwrap_or(items.len())
        } else {
            items
                .iter()
                .position(|&s| matches!(self.scene.get(s).map(|e| &e.kind), Some(ElementKind::LoadMore)))
                .unwrap_or(items.len())
        };
        self.scene.insert(list, index, item);
    }

    /// Destroys an element and everything under it, dropping the nodes it held from the index.
    pub(super) fn destroy_element(&mut self, el: ElementId) {
        for id in self.scene.destroy(el) {
            self.index.remove_node(&id);
        }
        let scene = &self.scene;
        self.index.retain_surrogates(|el| scene.contains(el));
        self.clear_stale_selection();
    }

    /// True when `el` sits somewhere below `ancestor`.
    pub(super) fn is_within(&self, el: ElementId, ancestor: ElementId) -> bool {
        let mut cur = self.scene.parent(el);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.scene.parent(c);
        }
        false
    }

    /// True when the node's item sits in a collapsed-chain placeholder.
    pub(super) fn in_surrogate(&self, node_id: &str) -> bool {
        self.index
            .node(node_id)
            .and_then(|e| self.scene.list_owner(e.parent_list))
            .is_some_and(|owner| self.scene.surrogate(owner).is_some())
    }
}
