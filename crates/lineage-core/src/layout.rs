//! Tidy top-down layout of the visible part of the scene, in world units.
//!
//! Items of a list sit side by side; an item with an open child list is as wide as that list
//! and is centred above it. Closed lists contribute nothing, so hidden elements get no
//! geometry.

use crate::config::LayoutConfig;
use crate::geom::{Point, Rect, point, rect};
use crate::scene::{ElementId, ElementKind, Scene};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: ElementId,
    pub to: ElementId,
    pub start: Point,
    pub end: Point,
}

/// What a world point hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Node(ElementId),
    Expander(ElementId),
    LoadMore(ElementId),
    SurrogateExpand(ElementId),
    Background,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    boxes: FxHashMap<ElementId, Rect>,
    expanders: FxHashMap<ElementId, Point>,
    edges: Vec<Edge>,
    bounds: Option<Rect>,
}

impl Layout {
    pub fn compute(scene: &Scene, config: &LayoutConfig) -> Self {
        let mut out = Self::default();
        let mut widths = FxHashMap::default();
        let root_items = scene.root_items();
        let total = list_width(scene, root_items, config, &mut widths);
        place_list(scene, root_items, 0.0, 0.0, total, config, &widths, &mut out);
        out
    }

    pub fn rect(&self, id: ElementId) -> Option<Rect> {
        self.boxes.get(&id).copied()
    }

    /// Anchor of a node's expand control (bottom centre of the node box).
    pub fn expander(&self, id: ElementId) -> Option<Point> {
        self.expanders.get(&id).copied()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// Geometry for `id`, or for its nearest laid-out ancestor when it is hidden.
    pub fn rect_or_ancestor(&self, scene: &Scene, id: ElementId) -> Option<Rect> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if let Some(r) = self.rect(c) {
                return Some(r);
            }
            cur = scene.parent(c);
        }
        None
    }

    pub fn hit_test(&self, scene: &Scene, world: Point, expander_size: f64) -> ClickTarget {
        let half = expander_size / 2.0;
        for (&id, &anchor) in &self.expanders {
            let hit = rect(anchor.x - half, anchor.y - half, expander_size, expander_size);
            if hit.contains(world) {
                return ClickTarget::Expander(id);
            }
        }
        for (&id, r) in &self.boxes {
            if !r.contains(world) {
                continue;
            }
            return match scene.get(id).map(|e| &e.kind) {
                Some(ElementKind::Node(_)) => ClickTarget::Node(id),
                Some(ElementKind::LoadMore) => ClickTarget::LoadMore(id),
                Some(ElementKind::Surrogate(_)) => ClickTarget::SurrogateExpand(id),
                _ => ClickTarget::Background,
            };
        }
        ClickTarget::Background
    }

    fn record(&mut self, id: ElementId, r: Rect) {
        self.bounds = Some(match self.bounds {
            Some(b) => b.union(&r),
            None => r,
        });
        self.boxes.insert(id, r);
    }
}

fn item_size(scene: &Scene, id: ElementId, config: &LayoutConfig) -> (f64, f64) {
    match scene.get(id).map(|e| &e.kind) {
        Some(ElementKind::Node(_)) => (config.node_width, config.node_height),
        _ => (config.placeholder_width, config.placeholder_height),
    }
}

/// The open list hanging below an item, if any.
fn open_sublist(scene: &Scene, id: ElementId) -> Option<ElementId> {
    let list = match &scene.get(id)?.kind {
        ElementKind::Node(n) => n.child_list?,
        ElementKind::Surrogate(s) => s.inner,
        _ => return None,
    };
    let l = scene.list(list)?;
    (l.open && !l.items.is_empty()).then_some(list)
}

fn item_width(
    scene: &Scene,
    id: ElementId,
    config: &LayoutConfig,
    widths: &mut FxHashMap<ElementId, f64>,
) -> f64 {
    let own = item_size(scene, id, config).0;
    let below = open_sublist(scene, id)
        .map(|list| list_width(scene, scene.items(list), config, widths))
        .unwrap_or(0.0);
    let w = own.max(below);
    widths.insert(id, w);
    w
}

fn list_width(
    scene: &Scene,
    items: &[ElementId],
    config: &LayoutConfig,
    widths: &mut FxHashMap<ElementId, f64>,
) -> f64 {
    let mut total = 0.0;
    for (i, &item) in items.iter().enumerate() {
        if i > 0 {
            total += config.sibling_gap;
        }
        total += item_width(scene, item, config, widths);
    }
    total
}

#[allow(clippy::too_many_arguments)]
fn place_list(
    scene: &Scene,
    items: &[ElementId],
    left: f64,
    top: f64,
    width: f64,
    config: &LayoutConfig,
    widths: &FxHashMap<ElementId, f64>,
    out: &mut Layout,
) -> Vec<ElementId> {
    let used: f64 = items.iter().map(|i| widths.get(i).copied().unwrap_or(0.0)).sum::<f64>()
        + config.sibling_gap * items.len().saturating_sub(1) as f64;
    let mut x = left + (width - used).max(0.0) / 2.0;
    let mut placed = Vec::with_capacity(items.len());
    for &item in items {
        let slot = widths.get(&item).copied().unwrap_or(0.0);
        let (w, h) = item_size(scene, item, config);
        let r = rect(x + (slot - w) / 2.0, top, w, h);
        out.record(item, r);
        if matches!(scene.get(item).map(|e| &e.kind), Some(ElementKind::Node(n)) if n.expander.is_some())
        {
            out.expanders
                .insert(item, point(r.center().x, r.max_y()));
        }
        if let Some(list) = open_sublist(scene, item) {
            let child_top = top + h + config.level_gap;
            let children = place_list(
                scene,
                scene.items(list),
                x,
                child_top,
                slot,
                config,
                widths,
                out,
            );
            for child in children {
                if let Some(cr) = out.rect(child) {
                    out.edges.push(Edge {
                        from: item,
                        to: child,
                        start: point(r.center().x, r.max_y()),
                        end: point(cr.center().x, cr.min_y()),
                    });
                }
            }
        }
        placed.push(item);
        x += slot + config.sibling_gap;
    }
    placed
}
