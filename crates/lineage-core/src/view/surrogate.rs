//! "Jump to the bottom of a branch" without materializing the chain in between.

use super::{Pending, TreeView};
use crate::error::Result;
use crate::leg::Leg;
use crate::model::{GoToBottomArgs, GoToBottomMode, NodeSlot, PathStep, TreeEvent};
use crate::query::{self, Query};
use crate::scene::{ElementId, ElementKind, Expander};
use serde_json::Value;

impl TreeView {
    pub(super) fn go_to_bottom_inner(&mut self, args: GoToBottomArgs) -> bool {
        let leg = Leg::new(&args.leg);
        if leg.as_str().is_empty() || leg.is_holding_tank() {
            return false;
        }
        if args.from_node_id == self.root_id && self.legs.is_legged() {
            if let Some(ready) = &self.ready {
                if !ready
                    .legs_with_real_node_at_root
                    .iter()
                    .any(|l| l == leg.as_str())
                {
                    tracing::debug!(leg = %leg, "root branch is empty, nothing to go to");
                    return false;
                }
            }
        }
        let from = args.from_node_id;
        self.issue(
            Query::BottomPath {
                node_id: from.clone(),
                leg: leg.clone(),
            },
            Pending::BottomPath {
                from,
                leg,
                mode: args.mode,
            },
        );
        true
    }

    pub(super) fn on_bottom_path(
        &mut self,
        from: &str,
        leg: Leg,
        mode: GoToBottomMode,
        result: Result<Value>,
    ) {
        let path = match result.and_then(|v| query::parse_bottom_path(&v, from)) {
            Ok(path) => path,
            Err(error) => {
                self.report(&error);
                return;
            }
        };
        self.events.push(TreeEvent::BottomPathResolved {
            from: from.to_string(),
            leg: leg.clone(),
            path: path.clone(),
        });
        let Some(dest) = path.last().map(|s| s.node_id.clone()) else {
            return;
        };

        if mode == GoToBottomMode::PathOnly {
            let deepest = path
                .iter()
                .rev()
                .find_map(|s| self.element_of(&s.node_id));
            if let Some(el) = deepest {
                self.reveal(el);
                self.focus(el);
            }
            return;
        }

        if let Some(el) = self.element_of(&dest) {
            if !self.in_surrogate(&dest) {
                self.reveal(el);
            }
            self.focus(el);
            return;
        }

        if self.index.contains(from) {
            self.place_surrogate(leg, path);
        } else {
            self.issue(
                Query::Node {
                    node_id: from.to_string(),
                },
                Pending::StartNode { leg, path },
            );
        }
    }

    /// Renders the starting node under its upline (without expanding anything), then goes on
    /// placing the surrogate.
    pub(super) fn on_start_node(&mut self, leg: Leg, path: Vec<PathStep>, result: Result<Value>) {
        let record = match result.and_then(|v| query::parse_node(&v)) {
            Ok(record) => record,
            Err(error) => {
                self.report(&error);
                return;
            }
        };
        if !self.index.contains(&record.node_id) {
            let upline = record
                .upline_id
                .as_deref()
                .and_then(|id| self.element_of(id));
            let Some(upline) = upline else {
                tracing::warn!(node = %record.node_id, "start node has no rendered upline");
                return;
            };
            let Some(list) = self.ensure_child_list(upline) else {
                return;
            };
            let slot = self.classify(record);
            self.place_node(list, slot);
            self.ensure_expander(upline);
        }
        self.place_surrogate(leg, path);
    }

    /// Opens every already existing list between the root and `el`. Creates nothing.
    pub(super) fn reveal(&mut self, el: ElementId) {
        let mut cur = self.scene.parent(el);
        while let Some(c) = cur {
            if let Some(ElementKind::ChildList(l)) = self.scene.get_mut(c).map(|e| &mut e.kind) {
                if !l.open {
                    l.open = true;
                    if let Some(owner) = self.scene.list_owner(c) {
                        if self.scene.node(owner).is_some_and(|n| n.expander.is_some()) {
                            self.set_expander(owner, Some(Expander::Expanded));
                        }
                    }
                }
            }
            cur = self.scene.parent(c);
        }
    }

    /// Index of the deepest node on `path` (destination excluded) whose child list is open and
    /// on screen.
    fn deepest_visible(&self, path: &[PathStep]) -> Option<usize> {
        let upto = path.len().saturating_sub(1);
        (0..upto).rev().find(|&i| {
            self.index
                .list(&path[i].node_id)
                .is_some_and(|list| {
                    self.scene.list(list).is_some_and(|l| l.open) && self.scene.is_visible(list)
                })
        })
    }

    fn place_surrogate(&mut self, leg: Leg, path: Vec<PathStep>) {
        let at = match self.deepest_visible(&path) {
            Some(at) => at,
            None => {
                // nothing on the path is expanded: expand the start node itself
                let Some(start) = path.first().and_then(|s| self.element_of(&s.node_id)) else {
                    return;
                };
                self.reveal(start);
                self.open_list(start);
                0
            }
        };
        let Some(list) = self.index.list(&path[at].node_id) else {
            return;
        };
        let branch = path.get(at + 1).and_then(PathStep::leg).unwrap_or(leg);
        let loading = self.insert_loading(list, Some(branch.clone()));
        self.center_on_element(loading);
        let Some(dest) = path.last().map(|s| s.node_id.clone()) else {
            return;
        };
        self.issue(
            Query::Node { node_id: dest },
            Pending::SurrogateTarget {
                list,
                leg: branch,
                path: path[at..].to_vec(),
                loading,
            },
        );
    }

    pub(super) fn on_surrogate_target(
        &mut self,
        list: ElementId,
        leg: Leg,
        path: Vec<PathStep>,
        loading: ElementId,
        result: Result<Value>,
    ) {
        if self.scene.contains(loading) {
            self.scene.destroy(loading);
        }
        if !self.scene.contains(list) {
            tracing::debug!("surrogate target arrived after its ancestor left the tree");
            return;
        }
        let record = match result.and_then(|v| query::parse_node(&v)) {
            Ok(record) => record,
            Err(error) => {
                self.report(&error);
                return;
            }
        };
        if let Some(el) = self.element_of(&record.node_id) {
            self.focus(el);
            return;
        }
        let Some(ancestor) = path.first().map(|s| s.node_id.clone()) else {
            return;
        };
        let hidden_levels = path.len().saturating_sub(2);
        if hidden_levels == 0 {
            let slot = self.classify(record);
            if let Some(el) = self.place_node(list, slot) {
                self.focus(el);
            }
            return;
        }

        if let Some(old) = self.index.surrogate(&ancestor, &leg) {
            tracing::debug!(ancestor = %ancestor, leg = %leg, "replacing collapsed chain");
            self.destroy_element(old);
        }
        let sur = self
            .scene
            .create_surrogate(ancestor.clone(), leg.clone(), path, hidden_levels);
        self.insert_sorted(list, sur);
        self.index.set_surrogate(&ancestor, &leg, sur);
        let Some(inner) = self.scene.surrogate(sur).map(|s| s.inner) else {
            return;
        };
        let slot = self.classify(record);
        match self.add_child(inner, slot) {
            Some(el) => self.focus(el),
            None => {
                self.destroy_element(sur);
            }
        }
    }

    /// Materializes a surrogate's chain node by node, then moves the destination to its true
    /// position and drops the placeholder. Returns `false` when the feature is switched off or
    /// `sur` is not a surrogate.
    pub fn expand_entire_chain(&mut self, sur: ElementId) -> bool {
        if !self.config.surrogate.expand_chain_enabled {
            tracing::debug!("chain expansion is disabled");
            return false;
        }
        if self.torn_down || self.scene.surrogate(sur).is_none() {
            return false;
        }
        self.chain_step(sur, 1);
        true
    }

    fn chain_step(&mut self, sur: ElementId, index: usize) {
        let Some(path) = self.scene.surrogate(sur).map(|s| s.path.clone()) else {
            return;
        };
        if index + 1 >= path.len() {
            self.finish_chain(sur, &path);
            return;
        }
        let Some(parent) = self.element_of(&path[index - 1].node_id) else {
            tracing::warn!(node = %path[index - 1].node_id, "chain link is not rendered");
            return;
        };
        self.reveal(parent);
        let Some(list) = self.open_list(parent) else {
            return;
        };
        if self.index.contains(&path[index].node_id) {
            self.chain_step(sur, index + 1);
            return;
        }
        let loading = self.insert_loading(list, path[index].leg());
        self.issue(
            Query::Node {
                node_id: path[index].node_id.clone(),
            },
            Pending::ChainStep {
                surrogate: sur,
                index,
                list,
                loading,
            },
        );
    }

    pub(super) fn on_chain_step(
        &mut self,
        sur: ElementId,
        index: usize,
        list: ElementId,
        loading: ElementId,
        result: Result<Value>,
    ) {
        if self.scene.contains(loading) {
            self.scene.destroy(loading);
        }
        if !self.scene.contains(sur) || !self.scene.contains(list) {
            return;
        }
        let record = match result.and_then(|v| query::parse_node(&v)) {
            Ok(record) => record,
            Err(error) => {
                self.report(&error);
                return;
            }
        };
        let node_id = record.node_id.clone();
        if !self.index.contains(&node_id) {
            let slot = self.classify(record);
            self.place_node(list, slot);
        }
        if !self.index.contains(&node_id) {
            tracing::warn!(node = %node_id, "chain link could not be rendered");
            return;
        }
        self.chain_step(sur, index + 1);
    }

    fn finish_chain(&mut self, sur: ElementId, path: &[PathStep]) {
        let (Some(dest), Some(parent)) = (path.last(), path.len().checked_sub(2).map(|i| &path[i]))
        else {
            return;
        };
        let Some(parent_el) = self.element_of(&parent.node_id) else {
            return;
        };
        let Some(list) = self.open_list(parent_el) else {
            return;
        };
        if let Some(item) = self.element_of(&dest.node_id) {
            if let Some(n) = self.scene.node_mut(item) {
                if let NodeSlot::Real(r) | NodeSlot::Overflow(r) = &mut n.slot {
                    r.upline_id = Some(parent.node_id.clone());
                }
            }
            self.insert_sorted(list, item);
            self.index.set_parent_list(&dest.node_id, list);
            if let Some(empty) = dest
                .leg()
                .and_then(|leg| self.scene.empty_slot_with_leg(list, &leg))
            {
                self.destroy_element(empty);
            }
        }
        self.destroy_element(sur);
        if let Some(item) = self.element_of(&dest.node_id) {
            self.focus(item);
        }
    }
}
