use super::{Pending, TreeView};
use crate::error::Result;
use crate::geom::vector;
use crate::leg::{Leg, LegOrder};
use crate::model::{NodeRecord, NodeSlot, RootReady, TreeEvent};
use crate::query::{self, Query};
use crate::scene::{ElementId, ElementKind, Expander};
use serde_json::Value;

impl TreeView {
    /// Queues the root request behind a loading placeholder.
    pub(super) fn add_root_node(&mut self) {
        let root_list = self.scene.root();
        let loading = self.insert_loading(root_list, None);
        let node_id = self.root_id.clone();
        self.issue(Query::Root { node_id }, Pending::Root { loading });
    }

    pub(super) fn on_root(&mut self, loading: ElementId, result: Result<Value>) {
        if !self.scene.contains(loading) {
            tracing::debug!("root response arrived after teardown");
            return;
        }
        self.scene.destroy(loading);
        let (leg_names, mut root) = match result.and_then(|v| query::parse_root(&v)) {
            Ok(parsed) => parsed,
            Err(error) => {
                self.report(&error);
                return;
            }
        };
        self.legs = LegOrder::new(&leg_names);
        if self.legs.is_legged() {
            // a legged root always shows its leg slots
            root.has_children = None;
        }
        let root_list = self.scene.root();
        let Some(item) = self.add_child(root_list, NodeSlot::Real(root)) else {
            tracing::warn!(root = %self.root_id, "root node was not rendered");
            return;
        };
        // pre-resolved children are already built and open: that is the first generation
        let open_list = self
            .scene
            .node(item)
            .and_then(|n| n.child_list)
            .filter(|&l| self.scene.list(l).is_some_and(|l| l.open));
        match open_list {
            Some(list) => self.fire_ready(list),
            None => self.toggle(item),
        }
        if let Some(rect) = self.layout().rect(item) {
            let changed = self.viewport.center_horizontally(rect);
            self.redraw(changed);
        }
    }

    /// Expand/collapse control. The first expansion starts loading children.
    pub(super) fn toggle(&mut self, item: ElementId) {
        let Some(node) = self.scene.node(item) else {
            return;
        };
        if node.expander.is_none() {
            return;
        }
        let Some(list) = self.ensure_child_list(item) else {
            return;
        };
        if self.scene.list(list).is_some_and(|l| l.open) {
            if let Some(l) = self.scene.list_mut(list) {
                l.open = false;
            }
            self.set_expander(item, Some(Expander::Collapsed));
        } else {
            self.open_list(item);
        }
    }

    /// Opens a node's child list (creating it if needed) and loads it if it never was.
    pub(super) fn open_list(&mut self, item: ElementId) -> Option<ElementId> {
        let node_id = self.scene.node(item)?.slot.node_id()?.to_string();
        let list = self.ensure_child_list(item)?;
        if let Some(l) = self.scene.list_mut(list) {
            l.open = true;
        }
        if self.scene.node(item).is_some_and(|n| n.expander.is_some()) {
            self.set_expander(item, Some(Expander::Expanded));
        }
        if self.index.paging(&node_id).is_none() {
            self.add_nodes(item, false);
        }
        Some(list)
    }

    /// Fetches the next page of a node's children. Returns `false` when paging is done.
    pub(super) fn add_nodes(&mut self, item: ElementId, reset: bool) -> bool {
        let Some(parent) = self
            .scene
            .node(item)
            .and_then(|n| n.slot.node_id())
            .map(str::to_string)
        else {
            return false;
        };
        let Some(list) = self.ensure_child_list(item) else {
            return false;
        };
        if reset {
            self.index.reset_paging(&parent);
        }
        if let Some(more) = self.scene.load_more_in(list) {
            self.scene.destroy(more);
        }
        let page_size = self.config.page_size;
        let paging = *self.index.paging_mut(&parent, page_size);
        if paging.done {
            return false;
        }
        let query = if self.legs.is_legged() {
            Query::Children {
                parent_id: parent.clone(),
                offset: 0,
                count: page_size.max(self.legs.len() as u32),
            }
        } else {
            // one extra row tells whether another page exists
            Query::Children {
                parent_id: parent.clone(),
                offset: paging.offset,
                count: paging.page_size + 1,
            }
        };
        let loading = self.insert_loading(list, None);
        self.issue(
            query,
            Pending::Page {
                parent,
                node: item,
                list,
                loading,
            },
        );
        true
    }

    /// "Load more": the control removes itself before the next page is requested, so a
    /// parent never has two page loads in flight from it.
    pub(super) fn load_more(&mut self, control: ElementId) {
        if !matches!(
            self.scene.get(control).map(|e| &e.kind),
            Some(ElementKind::LoadMore)
        ) {
            return;
        }
        let owner = self.scene.owner_of_item(control);
        self.scene.destroy(control);
        if let Some(owner) = owner {
            self.add_nodes(owner, false);
        }
    }

    pub(super) fn on_page(
        &mut self,
        parent: &str,
        item: ElementId,
        list: ElementId,
        loading: ElementId,
        result: Result<Value>,
    ) {
        let live = self.scene.contains(list)
            && self.index.node(parent).map(|e| e.item) == Some(item);
        if !live {
            tracing::debug!(parent, "dropping page for a node that left the tree");
            if self.scene.contains(loading) {
                self.scene.destroy(loading);
            }
            return;
        }
        let before = self.layout().expander(item).map(|p| p.x);
        self.scene.destroy(loading);

        let children = match result.and_then(|v| query::parse_children(&v)) {
            Ok(children) => children,
            Err(error) => {
                self.report(&error);
                self.page_failed(parent, list);
                return;
            }
        };

        if self.legs.is_legged() {
            self.fill_legs(parent, list, children);
        } else {
            self.append_page(parent, item, list, children);
        }

        if let (Some(before), Some(after)) = (before, self.layout().expander(item).map(|p| p.x)) {
            let changed = self.viewport.translate_world(vector(before - after, 0.0));
            self.redraw(changed);
        }

        if parent == self.root_id && self.ready.is_none() {
            self.fire_ready(list);
        }
    }

    fn page_failed(&mut self, parent: &str, list: ElementId) {
        let offset = self.index.paging(parent).map(|p| p.offset).unwrap_or(0);
        if !self.legs.is_legged() && offset > 0 {
            let more = self.scene.create(ElementKind::LoadMore);
            self.scene.append(list, more);
        } else {
            // nothing shown yet: the next expansion retries from scratch
            self.index.reset_paging(parent);
        }
    }

    /// One entry per declared leg: the fetched occupant, or an empty slot. Children on legs the
    /// tree does not declare are kept as overflow entries after them.
    fn fill_legs(&mut self, parent: &str, list: ElementId, children: Vec<NodeRecord>) {
        let mut remaining = children;
        let legs: Vec<Leg> = self.legs.iter().cloned().collect();
        for leg in &legs {
            match remaining.iter().position(|c| c.leg().as_ref() == Some(leg)) {
                Some(pos) => {
                    let child = remaining.remove(pos);
                    self.place_node(list, NodeSlot::Real(child));
                }
                None if self.scene.item_with_leg(list, leg).is_none() => {
                    self.add_child(
                        list,
                        NodeSlot::EmptySlot {
                            leg: leg.clone(),
                            upline_id: Some(parent.to_string()),
                        },
                    );
                }
                None => {}
            }
        }
        for child in remaining {
            self.place_node(list, NodeSlot::Overflow(child));
        }
        let page_size = self.config.page_size;
        self.index.paging_mut(parent, page_size).done = true;
    }

    fn append_page(
        &mut self,
        parent: &str,
        item: ElementId,
        list: ElementId,
        mut children: Vec<NodeRecord>,
    ) {
        let page_size = self.config.page_size;
        let paging = *self.index.paging_mut(parent, page_size);
        let more = children.len() > paging.page_size as usize;
        children.truncate(paging.page_size as usize);
        let fetched = children.len() as u32;
        let mut added = 0usize;
        for child in children {
            if self.place_node(list, NodeSlot::Real(child)).is_some() {
                added += 1;
            }
        }
        let paging = self.index.paging_mut(parent, page_size);
        paging.offset += fetched;
        paging.done = !more;
        if more {
            let control = self.scene.create(ElementKind::LoadMore);
            self.scene.append(list, control);
        } else if added == 0 && self.scene.placed_children(list).next().is_none() {
            tracing::debug!(parent, "parent proven childless");
            self.set_expander(item, None);
        }
    }

    fn fire_ready(&mut self, first_generation: ElementId) {
        let legs_with_real_node_at_root = self
            .legs
            .iter()
            .filter(|leg| {
                self.scene.items(first_generation).iter().any(|&i| {
                    self.scene.node(i).is_some_and(|n| {
                        matches!(&n.slot, NodeSlot::Real(r) if r.leg().as_ref() == Some(*leg))
                    })
                })
            })
            .map(|leg| leg.to_string())
            .collect();
        let ready = RootReady {
            legs_with_real_node_at_root,
            leg_names: self.legs.declared_names(),
        };
        self.ready = Some(ready.clone());
        for subscriber in std::mem::take(&mut self.ready_subscribers) {
            subscriber(&ready);
        }
        self.events.push(TreeEvent::Ready(ready));
    }
}
