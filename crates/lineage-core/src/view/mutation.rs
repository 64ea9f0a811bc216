use super::{Pending, TreeView};
use crate::error::Result;
use crate::leg::Leg;
use crate::model::{InsertArgs, MoveArgs, NodeRecord, NodeSlot};
use crate::query::{self, Query};
use crate::scene::ElementId;
use serde_json::Value;

/// Where a moved node is headed, as far as the scene is concerned.
#[derive(Debug, Clone, Copy)]
enum Destination {
    Absent,
    Collapsed(ElementId),
    Expanded(ElementId, ElementId),
}

impl TreeView {
    fn destination(&self, parent_id: &str, moving: Option<ElementId>) -> Destination {
        let Some(item) = self.element_of(parent_id) else {
            return Destination::Absent;
        };
        if let Some(moving) = moving {
            if item == moving || self.is_within(item, moving) {
                return Destination::Absent;
            }
        }
        match self.index.list(parent_id) {
            Some(list) if self.scene.list(list).is_some_and(|l| l.open) => {
                Destination::Expanded(item, list)
            }
            _ => Destination::Collapsed(item),
        }
    }

    pub(super) fn move_node_inner(&mut self, args: MoveArgs) {
        let to_leg = Leg::parse(args.to_upline_leg.as_deref());
        let current = self.element_of(&args.node_id);
        tracing::debug!(
            node = %args.node_id,
            from = ?args.from_parent_id,
            to = %args.to_parent_id,
            leg = ?to_leg,
            "moving node"
        );

        if to_leg.as_ref().is_some_and(Leg::is_holding_tank) {
            if let Some(item) = current {
                self.remove_rendered(item);
            }
            return;
        }

        let dest = self.destination(&args.to_parent_id, current);
        match (current, dest) {
            (Some(item), Destination::Absent) => {
                tracing::debug!(node = %args.node_id, "destination not rendered, move deferred");
                self.remove_rendered(item);
            }
            (Some(item), Destination::Collapsed(parent)) => {
                self.remove_rendered(item);
                self.prepare_collapsed(&args.to_parent_id, parent);
            }
            (Some(item), Destination::Expanded(parent, list)) => {
                self.relocate(item, &args, parent, list);
            }
            (None, Destination::Absent) => {}
            (None, Destination::Collapsed(parent)) => {
                self.prepare_collapsed(&args.to_parent_id, parent);
            }
            (None, Destination::Expanded(parent, list)) => match args.node_data {
                Some(mut record) => {
                    record.node_id = args.node_id;
                    record.upline_id = Some(args.to_parent_id);
                    record.upline_leg = args.to_upline_leg.or(record.upline_leg);
                    self.insert_record(parent, list, record);
                }
                None => {
                    let loading = self.insert_loading(list, to_leg);
                    self.issue(
                        Query::Node {
                            node_id: args.node_id.clone(),
                        },
                        Pending::MoveInsert {
                            node_id: args.node_id,
                            parent: args.to_parent_id,
                            list,
                            leg: args.to_upline_leg,
                            loading,
                        },
                    );
                }
            },
        }
    }

    /// The moved node will show up through the normal load path once the destination is
    /// expanded.
    fn prepare_collapsed(&mut self, parent_id: &str, parent: ElementId) {
        self.ensure_child_list(parent);
        self.ensure_expander(parent);
        self.index.reset_paging(parent_id);
    }

    fn relocate(&mut self, item: ElementId, args: &MoveArgs, parent: ElementId, list: ElementId) {
        let Some(entry) = self.index.node(&args.node_id) else {
            return;
        };
        if let Some(leg) = Leg::parse(args.to_upline_leg.as_deref()).filter(|l| self.legs.contains(l)) {
            let occupied = self.scene.items(list).iter().any(|&i| {
                i != item
                    && self
                        .scene
                        .node(i)
                        .is_some_and(|n| n.slot.is_placed() && n.slot.leg().as_ref() == Some(&leg))
            });
            if occupied {
                tracing::warn!(node = %args.node_id, to = %args.to_parent_id, leg = %leg, "destination leg is taken, move deferred");
                self.remove_rendered(item);
                return;
            }
        }
        let Some(mut record) = self.scene.node(item).and_then(|n| n.slot.record()).cloned() else {
            return;
        };
        let old_leg = record.leg();
        if let Some(data) = &args.node_data {
            record.customer = data.customer.clone();
        }
        record.upline_id = Some(args.to_parent_id.clone());
        if args.to_upline_leg.is_some() {
            record.upline_leg = args.to_upline_leg.clone();
        }
        let slot = self.classify(record);
        self.set_slot(item, slot);

        if self.legs.is_legged() {
            if let Some(empty) = Leg::parse(args.to_upline_leg.as_deref())
                .and_then(|leg| self.scene.empty_slot_with_leg(list, &leg))
            {
                self.destroy_element(empty);
            }
        }
        self.insert_sorted(list, item);
        self.index.set_parent_list(&args.node_id, list);
        self.ensure_expander(parent);
        self.after_child_removed(entry.parent_list, old_leg);
    }

    pub(super) fn on_move_insert(
        &mut self,
        node_id: &str,
        parent: &str,
        list: ElementId,
        leg: Option<String>,
        loading: ElementId,
        result: Result<Value>,
    ) {
        if self.scene.contains(loading) {
            self.scene.destroy(loading);
        }
        let live = self.scene.contains(list) && self.index.list(parent) == Some(list);
        if !live {
            tracing::debug!(node = node_id, "move target left the tree before the node arrived");
            return;
        }
        let mut record = match result.and_then(|v| query::parse_node(&v)) {
            Ok(record) => record,
            Err(error) => {
                self.report(&error);
                return;
            }
        };
        record.upline_id = Some(parent.to_string());
        if leg.is_some() {
            record.upline_leg = leg;
        }
        if let Some(owner) = self.element_of(parent) {
            self.insert_record(owner, list, record);
        }
    }

    fn insert_record(&mut self, parent: ElementId, list: ElementId, record: NodeRecord) -> bool {
        let slot = self.classify(record);
        let placed = self.place_node(list, slot).is_some();
        if placed {
            self.ensure_expander(parent);
        }
        placed
    }

    pub(super) fn insert_node_inner(&mut self, args: InsertArgs) -> bool {
        let (Some(parent), Some(list)) = (
            self.element_of(&args.parent_id),
            self.index.list(&args.parent_id),
        ) else {
            tracing::debug!(parent = %args.parent_id, "insert under a parent without a list");
            return false;
        };
        let mut record = args.node_data;
        record.upline_id = Some(args.parent_id);
        if args.upline_leg.is_some() {
            record.upline_leg = args.upline_leg;
        }
        self.insert_record(parent, list, record)
    }

    pub(super) fn remove_node_inner(&mut self, node_id: &str) -> bool {
        match self.element_of(node_id) {
            Some(item) => {
                self.remove_rendered(item);
                true
            }
            None => false,
        }
    }

    /// Replaces a node's payload and markup in place. Position, leg and children stay.
    pub(super) fn update_node_content_inner(&mut self, node_id: &str, data: NodeRecord) -> bool {
        let Some(item) = self.element_of(node_id) else {
            return false;
        };
        let Some(mut record) = self.scene.node(item).and_then(|n| n.slot.record()).cloned() else {
            return false;
        };
        record.customer = data.customer;
        let slot = match self.scene.node(item).map(|n| &n.slot) {
            Some(NodeSlot::Overflow(_)) => NodeSlot::Overflow(record),
            _ => NodeSlot::Real(record),
        };
        self.set_slot(item, slot)
    }

    /// Swaps a node's slot and re-renders it. A template veto keeps the old markup; returns
    /// whether the markup was refreshed.
    fn set_slot(&mut self, item: ElementId, slot: NodeSlot) -> bool {
        let markup = self.host.template.render(&slot);
        let Some(n) = self.scene.node_mut(item) else {
            return false;
        };
        n.slot = slot;
        match markup {
            Some(markup) => {
                n.markup = markup;
                true
            }
            None => {
                tracing::debug!(node = ?n.slot.node_id(), "template vetoed re-render, keeping old markup");
                false
            }
        }
    }

    /// Detaches a rendered node (and its subtree) and tidies up its old parent.
    fn remove_rendered(&mut self, item: ElementId) {
        let Some(list) = self.scene.parent(item) else {
            return;
        };
        let leg = self.scene.node(item).and_then(|n| n.slot.leg());
        self.destroy_element(item);
        self.after_child_removed(list, leg);
    }

    /// Old-parent housekeeping once a child left `list`: a legged branch gets its empty slot
    /// back, a flat parent without children loses its expander, an empty surrogate goes away.
    pub(super) fn after_child_removed(&mut self, list: ElementId, leg: Option<Leg>) {
        if !self.scene.contains(list) {
            return;
        }
        let Some(owner) = self.scene.list_owner(list) else {
            return;
        };
        if self.scene.surrogate(owner).is_some() {
            if self.scene.placed_children(list).next().is_none() {
                self.destroy_element(owner);
            }
            return;
        }
        let Some(owner_id) = self
            .scene
            .node(owner)
            .and_then(|n| n.slot.node_id())
            .map(str::to_string)
        else {
            return;
        };
        if self.legs.is_legged() {
            let Some(leg) = leg.filter(|l| self.legs.contains(l)) else {
                return;
            };
            if self.scene.item_with_leg(list, &leg).is_none() {
                self.add_child(
                    list,
                    NodeSlot::EmptySlot {
                        leg,
                        upline_id: Some(owner_id),
                    },
                );
            }
        } else {
            if let Some(p) = self.index.paging(&owner_id) {
                let page_size = p.page_size;
                let paging = self.index.paging_mut(&owner_id, page_size);
                paging.offset = paging.offset.saturating_sub(1);
            }
            if self.scene.placed_children(list).next().is_none()
                && self.scene.load_more_in(list).is_none()
            {
                self.set_expander(owner, None);
            }
        }
    }
}
