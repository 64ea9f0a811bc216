//! Engine tests against an in-memory backend.


use crate::host::{ErrorReporter, FrameScheduler, NodeTemplate, PlainTemplate, Transport};
use crate::*;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use indexmap::IndexMap;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A tree held in memory, answering the four queries the way the server does.
#[derive(Default)]
pub(crate) struct Backend {
    legs: Vec<String>,
    nodes: IndexMap<String, NodeRecord>,
    bottoms: BTreeMap<(String, String), Vec<String>>,
    failing: RefCell<BTreeSet<&'static str>>,
    log: RefCell<Vec<Value>>,
}

impl Backend {
    pub(crate) fn flat(root: &str) -> Self {
        let mut b = Self::default();
        b.add(root, None, None);
        b
    }

    pub(crate) fn legged(root: &str, legs: &[&str]) -> Self {
        let mut b = Self::flat(root);
        b.legs = legs.iter().map(|l| l.to_string()).collect();
        b
    }

    pub(crate) fn add(&mut self, id: &str, upline: Option<&str>, leg: Option<&str>) -> &mut Self {
        let mut record = NodeRecord::new(id);
        record.upline_id = upline.map(str::to_string);
        record.upline_leg = leg.map(str::to_string);
        record.customer = Some(json!({ "name": format!("Member {id}") }));
        self.nodes.insert(id.to_string(), record);
        self
    }

    pub(crate) fn add_children(&mut self, parent: &str, prefix: &str, n: usize) -> &mut Self {
        for i in 0..n {
            self.add(&format!("{prefix}{i}"), Some(parent), None);
        }
        self
    }

    /// A straight chain `ids[0] -> ids[1] -> ...` down `leg`, registered as the bottom path
    /// of every node on it.
    pub(crate) fn chain(&mut self, ids: &[&str], leg: &str) -> &mut Self {
        for pair in ids.windows(2) {
            self.add(pair[1], Some(pair[0]), Some(leg));
        }
        for (i, from) in ids.iter().enumerate() {
            self.bottoms.insert(
                (from.to_string(), leg::canonical_leg(leg)),
                ids[i..].iter().map(|s| s.to_string()).collect(),
            );
        }
        self
    }

    pub(crate) fn reparent(&mut self, id: &str, parent: &str, leg: Option<&str>) {
        if let Some(n) = self.nodes.get_mut(id) {
            n.upline_id = Some(parent.to_string());
            n.upline_leg = leg.map(str::to_string);
        }
    }

    pub(crate) fn fail(&self, query: &'static str) {
        self.failing.borrow_mut().insert(query);
    }

    pub(crate) fn heal(&self) {
        self.failing.borrow_mut().clear();
    }

    /// Number of requests seen for one query document.
    pub(crate) fn calls(&self, query: &str) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|b| b["query"] == query)
            .count()
    }

    pub(crate) fn last_variables(&self) -> Value {
        self.log
            .borrow()
            .last()
            .map(|b| b["variables"].clone())
            .unwrap_or(Value::Null)
    }

    fn children_of(&self, parent: &str) -> Vec<&NodeRecord> {
        self.nodes
            .values()
            .filter(|n| n.upline_id.as_deref() == Some(parent))
            .collect()
    }

    fn node_json(&self, record: &NodeRecord) -> Value {
        let mut v = serde_json::to_value(record).unwrap_or(Value::Null);
        v["hasChildren"] = json!(!self.children_of(&record.node_id).is_empty());
        v
    }

    fn tree(&self, nodes: Vec<Value>) -> Value {
        json!({ "data": { "trees": [{ "legNames": self.legs, "nodes": nodes }] } })
    }

    pub(crate) fn answer(&self, body: &Value) -> Result<Value> {
        let query = body["query"].as_str().unwrap_or_default().to_string();
        self.log.borrow_mut().push(body.clone());
        if self.failing.borrow().contains(query.as_str()) {
            return Err(Error::transport("/graphql", "connection reset"));
        }
        let vars = &body["variables"];
        let id = vars["nodeIds"][0].as_str().unwrap_or_default();
        let response = match query.as_str() {
            "root" | "node" => match self.nodes.get(id) {
                Some(n) => self.tree(vec![self.node_json(n)]),
                None => self.tree(vec![]),
            },
            "children" => {
                let offset = vars["offset"].as_u64().unwrap_or(0) as usize;
                let count = vars["count"].as_u64().unwrap_or(u64::MAX) as usize;
                let page = self
                    .children_of(id)
                    .into_iter()
                    .skip(offset)
                    .take(count)
                    .map(|n| self.node_json(n))
                    .collect();
                self.tree(page)
            }
            "bottomPath" => {
                let leg = vars["leg"].as_str().unwrap_or_default().to_string();
                let ids = self
                    .bottoms
                    .get(&(id.to_string(), leg))
                    .cloned()
                    .unwrap_or_else(|| vec![id.to_string()]);
                let steps: Vec<Value> = ids
                    .iter()
                    .filter_map(|i| self.nodes.get(i))
                    .map(|n| {
                        json!({ "nodeId": n.node_id, "uplineId": n.upline_id, "uplineLeg": n.upline_leg })
                    })
                    .collect();
                let mut node = self.node_json(&self.nodes[id]);
                node["bottomPath"] = json!(steps);
                self.tree(vec![node])
            }
            other => json!({ "errors": [{ "message": format!("unknown query {other}") }] }),
        };
        Ok(response)
    }
}

impl Transport for Backend {
    fn post<'a>(&'a self, _endpoint: &'a str, body: &'a Value) -> LocalBoxFuture<'a, Result<Value>> {
        futures::future::ready(self.answer(body)).boxed_local()
    }
}

#[derive(Default)]
pub(crate) struct Reports(Mutex<Vec<String>>);

impl Reports {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.0.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl ErrorReporter for Reports {
    fn report(&self, error: &Error) {
        if let Ok(mut m) = self.0.lock() {
            m.push(error.to_string());
        }
    }
}

#[derive(Default)]
pub(crate) struct Frames(AtomicUsize);

impl Frames {
    pub(crate) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl FrameScheduler for Frames {
    fn request_frame(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Plain template that refuses to render the listed ids.
pub(crate) struct Vetoing(pub(crate) Vec<&'static str>);

impl NodeTemplate for Vetoing {
    fn render(&self, slot: &NodeSlot) -> Option<String> {
        if slot.node_id().is_some_and(|id| self.0.contains(&id)) {
            return None;
        }
        PlainTemplate.render(slot)
    }

    fn loading(&self) -> String {
        PlainTemplate.loading()
    }
}

pub(crate) fn config(page_size: u32) -> TreeViewConfig {
    TreeViewConfig::from_json(&json!({
        "treeId": "T1",
        "rootId": "R",
        "pageSize": page_size,
        "queries": {
            "root": "root",
            "children": "children",
            "node": "node",
            "bottomPath": "bottomPath",
        },
    }))
    .unwrap()
}

pub(crate) struct Harness {
    pub view: TreeView,
    pub reports: Arc<Reports>,
    pub frames: Arc<Frames>,
    pub selections: std::rc::Rc<RefCell<Vec<Option<Selection>>>>,
}

pub(crate) fn harness_with(config: TreeViewConfig, template: Arc<dyn NodeTemplate>) -> Harness {
    let reports = Arc::new(Reports::default());
    let frames = Arc::new(Frames::default());
    let selections = std::rc::Rc::new(RefCell::new(Vec::new()));
    let sink = selections.clone();
    let host = Host::new(template)
        .with_reporter(reports.clone())
        .with_scheduler(frames.clone())
        .on_select(move |s| sink.borrow_mut().push(s.cloned()));
    let mut view = TreeView::setup(config, host).unwrap();
    view.start();
    Harness {
        view,
        reports,
        frames,
        selections,
    }
}

pub(crate) fn harness(page_size: u32) -> Harness {
    harness_with(config(page_size), Arc::new(PlainTemplate))
}

/// Starts a view and answers everything it asks for.
pub(crate) fn loaded(backend: &Backend, page_size: u32) -> Harness {
    let mut h = harness(page_size);
    futures::executor::block_on(h.view.drive(backend));
    h
}

pub(crate) fn settle(view: &mut TreeView, backend: &Backend) {
    futures::executor::block_on(view.drive(backend));
}

/// Ids (or `-` for empty slots) directly under a rendered node.
pub(crate) fn children(view: &TreeView, id: &str) -> Vec<String> {
    let Some(list) = view.index().list(id) else {
        return Vec::new();
    };
    view.scene()
        .items(list)
        .iter()
        .map(|&i| match view.scene().get(i).map(|e| &e.kind) {
            Some(scene::ElementKind::Node(n)) => {
                n.slot.node_id().map(str::to_string).unwrap_or_else(|| "-".to_string())
            }
            Some(scene::ElementKind::LoadMore) => "+".to_string(),
            Some(scene::ElementKind::Loading { .. }) => "…".to_string(),
            Some(scene::ElementKind::Surrogate(s)) => format!("~{}", s.hidden_levels),
            _ => "?".to_string(),
        })
        .collect()
}

pub(crate) fn is_open(view: &TreeView, id: &str) -> bool {
    view.index()
        .list(id)
        .and_then(|l| view.scene().list(l))
        .is_some_and(|l| l.open)
}

pub(crate) fn expander(view: &TreeView, id: &str) -> Option<scene::Expander> {
    let el = view.element_of(id)?;
    view.scene().node(el)?.expander
}

pub(crate) fn click_load_more(view: &mut TreeView, parent: &str) -> bool {
    let Some(more) = view
        .index()
        .list(parent)
        .and_then(|l| view.scene().load_more_in(l))
    else {
        return false;
    };
    view.click(ClickTarget::LoadMore(more));
    true
}

pub(crate) fn expand(view: &mut TreeView, id: &str) {
    let el = view.element_of(id).unwrap();
    view.click(ClickTarget::Expander(el));
}
