//! The engine instance: one rendered tree, its index, viewport and in-flight requests.

mod builder;
mod loader;
mod mutation;
mod surrogate;

use crate::config::{TreeViewConfig, parse_period_date};
use crate::error::{Error, Result};
use crate::geom::{Point, Rect, Size, Transform};
use crate::host::{Host, Transport};
use crate::index::TreeIndex;
use crate::layout::{ClickTarget, Layout};
use crate::leg::{Leg, LegOrder};
use crate::model::{
    GoToBottomMode, NodeId, NodeRecord, PathStep, RootReady, Selection, TreeEvent,
};
use crate::query::Query;
use crate::scene::{ElementId, Scene, SceneSnapshot};
use crate::viewport::Viewport;
use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde_json::Value;

/// Handle for one outstanding fetch. Answer it with [`TreeView::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub ticket: Ticket,
    pub endpoint: String,
    pub body: Value,
}

/// What to do when a ticket is answered. Element ids captured here are re-checked against the
/// scene before use; the response of a torn-down or superseded operation is dropped.
#[derive(Debug, Clone)]
enum Pending {
    Root {
        loading: ElementId,
    },
    Page {
        parent: NodeId,
        node: ElementId,
        list: ElementId,
        loading: ElementId,
    },
    BottomPath {
        from: NodeId,
        leg: Leg,
        mode: GoToBottomMode,
    },
    StartNode {
        leg: Leg,
        path: Vec<PathStep>,
    },
    SurrogateTarget {
        list: ElementId,
        leg: Leg,
        path: Vec<PathStep>,
        loading: ElementId,
    },
    MoveInsert {
        node_id: NodeId,
        parent: NodeId,
        list: ElementId,
        leg: Option<String>,
        loading: ElementId,
    },
    ChainStep {
        surrogate: ElementId,
        index: usize,
        list: ElementId,
        loading: ElementId,
    },
}

type ReadyCallback = Box<dyn FnOnce(&RootReady)>;

pub struct TreeView {
    config: TreeViewConfig,
    host: Host,
    scene: Scene,
    index: TreeIndex,
    viewport: Viewport,
    legs: LegOrder,
    root_id: NodeId,
    period_date: Option<NaiveDate>,
    requests: Vec<PendingRequest>,
    inflight: FxHashMap<Ticket, Pending>,
    next_ticket: u64,
    ready: Option<RootReady>,
    ready_subscribers: Vec<ReadyCallback>,
    selected: Option<ElementId>,
    events: Vec<TreeEvent>,
    torn_down: bool,
}

impl std::fmt::Debug for TreeView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeView")
            .field("root_id", &self.root_id)
            .field("nodes", &self.index.node_count())
            .field("inflight", &self.inflight.len())
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl TreeView {
    /// Creates the engine. Nothing is fetched until [`TreeView::start`].
    pub fn setup(config: TreeViewConfig, host: Host) -> Result<Self> {
        config.validate()?;
        if config.root_id.is_empty() {
            return Err(Error::InvalidConfig {
                message: "rootId is required".to_string(),
            });
        }
        let view = Self {
            viewport: Viewport::new(config.viewport.clone()),
            root_id: config.root_id.clone(),
            period_date: config.period_date,
            config,
            host,
            scene: Scene::new(),
            index: TreeIndex::default(),
            legs: LegOrder::default(),
            requests: Vec::new(),
            inflight: FxHashMap::default(),
            next_ticket: 0,
            ready: None,
            ready_subscribers: Vec::new(),
            selected: None,
            events: Vec::new(),
            torn_down: false,
        };
        Ok(view)
    }

    /// Queues the root request. A no-op while the root is loading or loaded; after a failed
    /// root load it retries.
    pub fn start(&mut self) {
        if self.torn_down || !self.scene.is_empty() {
            return;
        }
        self.add_root_node();
    }

    /// Discards everything and starts over, optionally for another root.
    pub fn reset(&mut self, root_id: Option<NodeId>) {
        self.teardown();
        self.torn_down = false;
        if let Some(root_id) = root_id {
            self.root_id = root_id;
        }
        self.start();
    }

    /// Clears the scene, index, subscriptions and outstanding requests. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        tracing::debug!(root = %self.root_id, nodes = self.index.node_count(), "tearing down tree view");
        self.scene.clear();
        self.index.clear();
        self.legs = LegOrder::default();
        self.requests.clear();
        self.inflight.clear();
        self.ready = None;
        self.ready_subscribers.clear();
        self.selected = None;
        self.viewport.pointer_up();
        self.viewport.pinch_end();
        self.torn_down = true;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn config(&self) -> &TreeViewConfig {
        &self.config
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn index(&self) -> &TreeIndex {
        &self.index
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn legs(&self) -> &LegOrder {
        &self.legs
    }

    pub fn snapshot(&self) -> Vec<SceneSnapshot> {
        self.scene.snapshot()
    }

    pub fn layout(&self) -> Layout {
        Layout::compute(&self.scene, &self.config.layout)
    }

    pub fn period_date(&self) -> Option<NaiveDate> {
        self.period_date
    }

    /// Date used by every subsequent fetch. Reloading is up to the caller.
    pub fn set_period_date(&mut self, iso: &str) -> Result<()> {
        self.period_date = Some(parse_period_date(iso)?);
        Ok(())
    }

    pub fn selection(&self) -> Option<Selection> {
        let el = self.selected?;
        Some(self.scene.node(el)?.slot.selection())
    }

    pub fn selected_element(&self) -> Option<ElementId> {
        self.selected
    }

    /// Element of a rendered node.
    pub fn element_of(&self, node_id: &str) -> Option<ElementId> {
        self.index.node(node_id).map(|e| e.item)
    }

    pub fn take_events(&mut self) -> Vec<TreeEvent> {
        std::mem::take(&mut self.events)
    }

    // -- ready signal -------------------------------------------------------------------------

    /// Runs `f` once the root's first generation is loaded (immediately if it already is).
    pub fn on_ready(&mut self, f: impl FnOnce(&RootReady) + 'static) {
        match &self.ready {
            Some(ready) => f(ready),
            None => self.ready_subscribers.push(Box::new(f)),
        }
    }

    pub fn root_legs_with_nodes(&self) -> Option<&[String]> {
        self.ready
            .as_ref()
            .map(|r| r.legs_with_real_node_at_root.as_slice())
    }

    // -- requests -----------------------------------------------------------------------------

    fn issue(&mut self, query: Query, pending: Pending) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        tracing::debug!(ticket = ticket.0, query = query.name(), "issuing tree query");
        self.requests.push(PendingRequest {
            ticket,
            endpoint: self.config.endpoint.clone(),
            body: query.body(&self.config, self.period_date),
        });
        self.inflight.insert(ticket, pending);
        ticket
    }

    /// Requests queued since the last call, in issue order.
    pub fn take_requests(&mut self) -> Vec<PendingRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn has_inflight(&self) -> bool {
        !self.inflight.is_empty()
    }

    /// Delivers the outcome of a request (the success and error callbacks in one).
    pub fn complete(&mut self, ticket: Ticket, result: Result<Value>) {
        let Some(pending) = self.inflight.remove(&ticket) else {
            tracing::debug!(ticket = ticket.0, "dropping response for unknown or cancelled request");
            return;
        };
        match pending {
            Pending::Root { loading } => self.on_root(loading, result),
            Pending::Page {
                parent,
                node,
                list,
                loading,
            } => self.on_page(&parent, node, list, loading, result),
            Pending::BottomPath { from, leg, mode } => {
                self.on_bottom_path(&from, leg, mode, result)
            }
            Pending::StartNode { leg, path } => self.on_start_node(leg, path, result),
            Pending::SurrogateTarget {
                list,
                leg,
                path,
                loading,
            } => self.on_surrogate_target(list, leg, path, loading, result),
            Pending::MoveInsert {
                node_id,
                parent,
                list,
                leg,
                loading,
            } => self.on_move_insert(&node_id, &parent, list, leg, loading, result),
            Pending::ChainStep {
                surrogate,
                index,
                list,
                loading,
            } => self.on_chain_step(surrogate, index, list, loading, result),
        }
    }

    /// Answers queued requests through `transport` until none are left.
    pub async fn drive<T: Transport + ?Sized>(&mut self, transport: &T) {
        loop {
            let batch = self.take_requests();
            if batch.is_empty() {
                break;
            }
            for req in batch {
                let result = transport.post(&req.endpoint, &req.body).await;
                self.complete(req.ticket, result);
            }
        }
    }

    fn report(&self, error: &Error) {
        self.host.reporter.report(error);
    }

    // -- viewport -----------------------------------------------------------------------------

    fn redraw(&self, changed: bool) {
        if changed {
            self.host.scheduler.request_frame();
        }
    }

    /// Called by the host when the requested animation frame fires.
    pub fn animation_frame(&mut self) -> Option<Transform> {
        self.viewport.take_frame()
    }

    pub fn set_surface(&mut self, client_rect: Option<Rect>, pixel_size: Size) {
        self.viewport.set_surface(client_rect, pixel_size);
    }

    pub fn pointer_down(&mut self, screen: Point) {
        self.viewport.pointer_down(screen);
    }

    pub fn pointer_move(&mut self, screen: Point, buttons: u16) {
        let changed = self.viewport.pointer_move(screen, buttons);
        self.redraw(changed);
    }

    /// Ends a press; a press that did not turn into a drag is dispatched as a click.
    pub fn pointer_up(&mut self, screen: Point) -> Option<ClickTarget> {
        if !self.viewport.pointer_up() {
            return None;
        }
        let world = self.viewport.transformed_point(screen);
        let target =
            self.layout()
                .hit_test(&self.scene, world, self.config.layout.expander_size);
        self.click(target);
        Some(target)
    }

    pub fn wheel(&mut self, screen: Point, delta_y: f64) {
        let changed = self.viewport.wheel(screen, delta_y);
        self.redraw(changed);
    }

    pub fn pinch_start(&mut self, a: Point, b: Point) {
        self.viewport.pinch_start(a, b);
    }

    pub fn pinch_move(&mut self, a: Point, b: Point) {
        let changed = self.viewport.pinch_move(a, b);
        self.redraw(changed);
    }

    pub fn pinch_end(&mut self) {
        self.viewport.pinch_end();
    }

    fn center_on_element(&mut self, el: ElementId) {
        let layout = self.layout();
        let Some(rect) = layout.rect_or_ancestor(&self.scene, el) else {
            return;
        };
        let changed = self.viewport.center_on(rect);
        self.redraw(changed);
    }

    pub fn center_on_node(&mut self, node_id: &str) -> bool {
        let Some(el) = self.element_of(node_id) else {
            return false;
        };
        self.center_on_element(el);
        true
    }

    // -- clicks and selection -----------------------------------------------------------------

    pub fn click(&mut self, target: ClickTarget) {
        match target {
            ClickTarget::Node(el) if self.scene.node(el).is_some() => self.select(Some(el)),
            ClickTarget::Node(_) | ClickTarget::Background => self.select(None),
            ClickTarget::Expander(el) => self.toggle(el),
            ClickTarget::LoadMore(el) => self.load_more(el),
            ClickTarget::SurrogateExpand(el) => {
                self.expand_entire_chain(el);
            }
        }
    }

    fn select(&mut self, el: Option<ElementId>) {
        self.selected = el;
        let selection = self.selection();
        if let Some(cb) = self.host.on_select.as_mut() {
            cb(selection.as_ref());
        }
        self.events.push(TreeEvent::Selected(selection));
    }

    fn focus(&mut self, el: ElementId) {
        self.select(Some(el));
        self.center_on_element(el);
    }

    /// Tells the host its selection is gone when the selected element left the scene.
    fn clear_stale_selection(&mut self) {
        if self.selected.is_some_and(|el| !self.scene.contains(el)) {
            self.select(None);
        }
    }

    // -- public API ---------------------------------------------------------------------------

    pub fn move_node(&mut self, args: crate::model::MoveArgs) {
        if self.torn_down {
            return;
        }
        self.move_node_inner(args);
    }

    pub fn insert_node(&mut self, args: crate::model::InsertArgs) -> bool {
        !self.torn_down && self.insert_node_inner(args)
    }

    pub fn remove_node(&mut self, node_id: &str) -> bool {
        !self.torn_down && self.remove_node_inner(node_id)
    }

    pub fn update_node_content(&mut self, node_id: &str, data: NodeRecord) -> bool {
        !self.torn_down && self.update_node_content_inner(node_id, data)
    }

    pub fn go_to_bottom(&mut self, args: crate::model::GoToBottomArgs) -> bool {
        !self.torn_down && self.go_to_bottom_inner(args)
    }
}

impl Drop for TreeView {
    fn drop(&mut self) {
        self.teardown();
    }
}
