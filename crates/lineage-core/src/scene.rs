//! The rendered tree, independent of any real DOM.
//!
//! Elements live in an arena keyed by [`ElementId`]. Ids are never reused, so an id captured by
//! an in-flight request can always be checked for liveness with [`Scene::contains`].

use crate::leg::Leg;
use crate::model::{NodeId, NodeSlot, PathStep};
use rustc_hash::FxHashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(u64);

impl ElementId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Expander {
    Collapsed,
    Expanded,
}

#[derive(Debug, Clone)]
pub struct NodeElement {
    pub slot: NodeSlot,
    pub markup: String,
    pub expander: Option<Expander>,
    pub child_list: Option<ElementId>,
}

#[derive(Debug, Clone, Default)]
pub struct ListElement {
    pub open: bool,
    pub items: Vec<ElementId>,
}

#[derive(Debug, Clone)]
pub struct SurrogateElement {
    pub ancestor: NodeId,
    pub leg: Leg,
    /// Full resolved path, ancestor first, destination last.
    pub path: Vec<PathStep>,
    pub hidden_levels: usize,
    pub inner: ElementId,
}

#[derive(Debug, Clone)]
pub enum ElementKind {
    /// Top-level container holding the root node.
    RootList(ListElement),
    Node(NodeElement),
    ChildList(ListElement),
    Loading { leg: Option<Leg>, markup: String },
    LoadMore,
    Surrogate(SurrogateElement),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub kind: ElementKind,
    pub parent: Option<ElementId>,
}

impl Element {
    pub fn as_node(&self) -> Option<&NodeElement> {
        match &self.kind {
            ElementKind::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListElement> {
        match &self.kind {
            ElementKind::RootList(l) | ElementKind::ChildList(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_surrogate(&self) -> Option<&SurrogateElement> {
        match &self.kind {
            ElementKind::Surrogate(s) => Some(s),
            _ => None,
        }
    }

    /// Leg an item occupies inside its list, for ordered insertion.
    pub fn leg(&self) -> Option<Leg> {
        match &self.kind {
            ElementKind::Node(n) => n.slot.leg(),
            ElementKind::Loading { leg, .. } => leg.clone(),
            ElementKind::Surrogate(s) => Some(s.leg.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    elements: FxHashMap<ElementId, Element>,
    next_id: u64,
    root: ElementId,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut scene = Self {
            elements: FxHashMap::default(),
            next_id: 0,
            root: ElementId(0),
        };
        scene.root = scene.alloc(
            ElementKind::RootList(ListElement {
                open: true,
                items: Vec::new(),
            }),
            None,
        );
        scene
    }

    fn alloc(&mut self, kind: ElementKind, parent: Option<ElementId>) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.insert(id, Element { kind, parent });
        id
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root_items().is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    pub fn node(&self, id: ElementId) -> Option<&NodeElement> {
        self.get(id)?.as_node()
    }

    pub fn node_mut(&mut self, id: ElementId) -> Option<&mut NodeElement> {
        match &mut self.get_mut(id)?.kind {
            ElementKind::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn list(&self, id: ElementId) -> Option<&ListElement> {
        self.get(id)?.as_list()
    }

    pub fn list_mut(&mut self, id: ElementId) -> Option<&mut ListElement> {
        match &mut self.get_mut(id)?.kind {
            ElementKind::RootList(l) | ElementKind::ChildList(l) => Some(l),
            _ => None,
        }
    }

    pub fn surrogate(&self, id: ElementId) -> Option<&SurrogateElement> {
        self.get(id)?.as_surrogate()
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id)?.parent
    }

    pub fn root_items(&self) -> &[ElementId] {
        self.list(self.root).map(|l| l.items.as_slice()).unwrap_or(&[])
    }

    pub fn items(&self, list: ElementId) -> &[ElementId] {
        self.list(list).map(|l| l.items.as_slice()).unwrap_or(&[])
    }

    /// Creates a detached element. Attach it with [`Scene::insert`].
    pub fn create(&mut self, kind: ElementKind) -> ElementId {
        self.alloc(kind, None)
    }

    /// Creates an owned child list (of a node or a surrogate).
    pub fn create_list(&mut self, owner: ElementId, open: bool) -> ElementId {
        self.alloc(
            ElementKind::ChildList(ListElement {
                open,
                items: Vec::new(),
            }),
            Some(owner),
        )
    }

    /// Creates a detached collapsed-chain placeholder together with its (open) inner list.
    pub fn create_surrogate(
        &mut self,
        ancestor: NodeId,
        leg: Leg,
        path: Vec<PathStep>,
        hidden_levels: usize,
    ) -> ElementId {
        let placeholder = ElementId(u64::MAX);
        let sur = self.alloc(
            ElementKind::Surrogate(SurrogateElement {
                ancestor,
                leg,
                path,
                hidden_levels,
                inner: placeholder,
            }),
            None,
        );
        let inner = self.create_list(sur, true);
        if let Some(ElementKind::Surrogate(s)) = self.get_mut(sur).map(|e| &mut e.kind) {
            s.inner = inner;
        }
        sur
    }

    /// Inserts `item` into `list` at `index` (clamped), detaching it from wherever it was.
    pub fn insert(&mut self, list: ElementId, index: usize, item: ElementId) -> bool {
        if !self.contains(item) || self.list(list).is_none() {
            return false;
        }
        self.detach(item);
        let Some(l) = self.list_mut(list) else {
            return false;
        };
        let index = index.min(l.items.len());
        l.items.insert(index, item);
        if let Some(el) = self.get_mut(item) {
            el.parent = Some(list);
        }
        true
    }

    pub fn append(&mut self, list: ElementId, item: ElementId) -> bool {
        let len = self.items(list).len();
        self.insert(list, len, item)
    }

    /// Removes `item` from its list without destroying it. Returns the list it was in.
    pub fn detach(&mut self, item: ElementId) -> Option<ElementId> {
        let parent = self.parent(item)?;
        let l = self.list_mut(parent)?;
        let pos = l.items.iter().position(|&i| i == item)?;
        l.items.remove(pos);
        if let Some(el) = self.get_mut(item) {
            el.parent = None;
        }
        Some(parent)
    }

    /// Detaches and destroys `id` with everything below it. Returns the node ids that left the
    /// scene, so the index can drop them.
    pub fn destroy(&mut self, id: ElementId) -> Vec<NodeId> {
        self.detach(id);
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(el) = self.elements.remove(&cur) else {
                continue;
            };
            match el.kind {
                ElementKind::Node(n) => {
                    if let Some(node_id) = n.slot.node_id() {
                        removed.push(node_id.to_string());
                    }
                    stack.extend(n.child_list);
                }
                ElementKind::RootList(l) | ElementKind::ChildList(l) => stack.extend(l.items),
                ElementKind::Surrogate(s) => stack.push(s.inner),
                ElementKind::Loading { .. } | ElementKind::LoadMore => {}
            }
        }
        removed
    }

    /// Removes every element but the root list.
    pub fn clear(&mut self) {
        let items = self.root_items().to_vec();
        for item in items {
            self.destroy(item);
        }
    }

    /// The element owning a list (node or surrogate), if the list is not the root list.
    pub fn list_owner(&self, list: ElementId) -> Option<ElementId> {
        match self.get(list)?.kind {
            ElementKind::ChildList(_) => self.parent(list),
            _ => None,
        }
    }

    /// The node or surrogate an item hangs under.
    pub fn owner_of_item(&self, item: ElementId) -> Option<ElementId> {
        self.list_owner(self.parent(item)?)
    }

    /// True when the element is attached under the root and every list above it is open.
    pub fn is_visible(&self, id: ElementId) -> bool {
        let mut cur = id;
        loop {
            if cur == self.root {
                return true;
            }
            let Some(el) = self.get(cur) else {
                return false;
            };
            if let ElementKind::ChildList(l) = &el.kind {
                if !l.open {
                    return false;
                }
            }
            match el.parent {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Real or overflow nodes directly in a list.
    pub fn placed_children(&self, list: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.items(list).iter().copied().filter(|&i| {
            self.node(i).is_some_and(|n| n.slot.is_placed()) || self.surrogate(i).is_some()
        })
    }

    /// First item in `list` (node slot, surrogate or loading placeholder) occupying `leg`.
    pub fn item_with_leg(&self, list: ElementId, leg: &Leg) -> Option<ElementId> {
        self.items(list)
            .iter()
            .copied()
            .find(|&i| self.get(i).and_then(Element::leg).as_ref() == Some(leg))
    }

    pub fn empty_slot_with_leg(&self, list: ElementId, leg: &Leg) -> Option<ElementId> {
        self.items(list).iter().copied().find(|&i| {
            self.node(i)
                .is_some_and(|n| matches!(&n.slot, NodeSlot::EmptySlot { leg: l, .. } if l == leg))
        })
    }

    pub fn load_more_in(&self, list: ElementId) -> Option<ElementId> {
        self.items(list)
            .iter()
            .copied()
            .find(|&i| matches!(self.get(i).map(|e| &e.kind), Some(ElementKind::LoadMore)))
    }

    /// Depth-first walk of every attached element, starting at the root list.
    pub fn walk(&self) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(cur) = stack.pop() {
            let Some(el) = self.get(cur) else {
                continue;
            };
            out.push(cur);
            match &el.kind {
                ElementKind::RootList(l) | ElementKind::ChildList(l) => {
                    stack.extend(l.items.iter().rev())
                }
                ElementKind::Node(n) => stack.extend(n.child_list),
                ElementKind::Surrogate(s) => stack.push(s.inner),
                _ => {}
            }
        }
        out
    }

    pub fn snapshot(&self) -> Vec<SceneSnapshot> {
        self.root_items()
            .iter()
            .filter_map(|&i| self.snapshot_item(i))
            .collect()
    }

    fn snapshot_list(&self, list: Option<ElementId>) -> Option<ListSnapshot> {
        let list = list?;
        let l = self.list(list)?;
        Some(ListSnapshot {
            open: l.open,
            items: l
                .items
                .iter()
                .filter_map(|&i| self.snapshot_item(i))
                .collect(),
        })
    }

    fn snapshot_item(&self, id: ElementId) -> Option<SceneSnapshot> {
        let el = self.get(id)?;
        Some(match &el.kind {
            ElementKind::Node(n) => {
                let (kind, node_id) = match &n.slot {
                    NodeSlot::Real(r) => (SnapshotKind::Node, Some(r.node_id.clone())),
                    NodeSlot::Overflow(r) => (SnapshotKind::Overflow, Some(r.node_id.clone())),
                    NodeSlot::EmptySlot { .. } => (SnapshotKind::EmptySlot, None),
                };
                SceneSnapshot {
                    element: id,
                    kind,
                    node_id,
                    leg: n.slot.leg().map(String::from),
                    markup: n.markup.clone(),
                    expander: n.expander,
                    children: self.snapshot_list(n.child_list),
                }
            }
            ElementKind::Loading { leg, markup } => SceneSnapshot {
                element: id,
                kind: SnapshotKind::Loading,
                node_id: None,
                leg: leg.clone().map(String::from),
                markup: markup.clone(),
                expander: None,
                children: None,
            },
            ElementKind::LoadMore => SceneSnapshot {
                element: id,
                kind: SnapshotKind::LoadMore,
                node_id: None,
                leg: None,
                markup: String::new(),
                expander: None,
                children: None,
            },
            ElementKind::Surrogate(s) => SceneSnapshot {
                element: id,
                kind: SnapshotKind::Surrogate {
                    hidden_levels: s.hidden_levels,
                },
                node_id: None,
                leg: Some(s.leg.to_string()),
                markup: String::new(),
                expander: None,
                children: self.snapshot_list(Some(s.inner)),
            },
            ElementKind::RootList(_) | ElementKind::ChildList(_) => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotKind {
    Node,
    Overflow,
    EmptySlot,
    Loading,
    LoadMore,
    Surrogate {
        #[serde(rename = "hiddenLevels")]
        hidden_levels: usize,
    },
}

/// Serializable projection of one list item and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    pub element: ElementId,
    pub kind: SnapshotKind,
    pub node_id: Option<NodeId>,
    pub leg: Option<String>,
    pub markup: String,
    pub expander: Option<Expander>,
    pub children: Option<ListSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshot {
    pub open: bool,
    pub items: Vec<SceneSnapshot>,
}

impl SceneSnapshot {
    /// Node ids (or `"-"` for empty slots, `"…"` for other placeholders) of the open children.
    pub fn child_labels(&self) -> Vec<String> {
        self.children
            .iter()
            .flat_map(|l| l.items.iter())
            .map(|c| match (&c.kind, &c.node_id) {
                (_, Some(id)) => id.clone(),
                (SnapshotKind::EmptySlot, None) => "-".to_string(),
                _ => "…".to_string(),
            })
            .collect()
    }
}
