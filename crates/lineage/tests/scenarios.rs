use futures::FutureExt;
use futures::executor::block_on;
use futures::future::LocalBoxFuture;
use lineage::host::Transport;
use lineage::{ClickTarget, GoToBottomArgs, GoToBottomMode, Host, TreeView, TreeViewConfig};
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Server with a binary root (`Left` filled, `Right` empty) and a flat parent `P` of 250.
#[derive(Default)]
struct Server {
    requests: Cell<usize>,
}

impl Server {
    fn respond(&self, body: &Value) -> Value {
        self.requests.set(self.requests.get() + 1);
        let vars = &body["variables"];
        let id = vars["nodeIds"][0].as_str().unwrap_or_default();
        let nodes: Vec<Value> = match (body["query"].as_str().unwrap_or_default(), id) {
            ("root", "R") => vec![json!({ "nodeId": "R", "customer": {}, "hasChildren": true })],
            ("root", "P") => vec![json!({ "nodeId": "P", "customer": {}, "hasChildren": true })],
            ("children", "R") => vec![json!({
                "nodeId": "L", "uplineId": "R", "uplineLeg": "Left", "customer": {}, "hasChildren": false
            })],
            ("children", "P") => {
                let offset = vars["offset"].as_u64().unwrap_or(0);
                let count = vars["count"].as_u64().unwrap_or(0);
                (offset..(offset + count).min(250))
                    .map(|i| json!({ "nodeId": format!("p{i}"), "uplineId": "P", "customer": {}, "hasChildren": false }))
                    .collect()
            }
            _ => Vec::new(),
        };
        let legs = if id == "P" || id.starts_with('p') { json!([]) } else { json!(["Left", "Right"]) };
        json!({ "data": { "trees": [{ "legNames": legs, "nodes": nodes }] } })
    }
}

impl Transport for Server {
    fn post<'a>(&'a self, _endpoint: &'a str, body: &'a Value) -> LocalBoxFuture<'a, lineage::Result<Value>> {
        futures::future::ready(Ok(self.respond(body))).boxed_local()
    }
}

fn view(root: &str) -> TreeView {
    let config = TreeViewConfig::from_json(&json!({
        "rootId": root,
        "pageSize": 100,
        "queries": { "root": "root", "children": "children", "node": "node", "bottomPath": "bottomPath" }
    }))
    .unwrap();
    TreeView::setup(config, Host::default()).unwrap()
}

#[test]
fn empty_root_leg_short_circuits_go_to_bottom() {
    let server = Server::default();
    let mut view = view("R");
    let ready = Rc::new(RefCell::new(None));
    let sink = ready.clone();
    view.on_ready(move |r| *sink.borrow_mut() = Some(r.legs_with_real_node_at_root.clone()));
    view.start();
    block_on(view.drive(&server));

    assert_eq!(ready.borrow().as_deref(), Some(&["left".to_string()][..]));

    let before = view.snapshot();
    let requests = server.requests.get();
    assert!(!view.go_to_bottom(GoToBottomArgs {
        from_node_id: "R".to_string(),
        leg: "Right".to_string(),
        mode: GoToBottomMode::Surrogate,
    }));
    block_on(view.drive(&server));
    assert_eq!(server.requests.get(), requests);
    assert_eq!(view.snapshot(), before);
}

#[test]
fn flat_parent_with_250_children_pages_in_three_loads() {
    let server = Server::default();
    let mut view = view("P");
    view.start();
    block_on(view.drive(&server));

    let count = |view: &TreeView| {
        let list = view.index().list("P").unwrap();
        view.scene().placed_children(list).count()
    };
    let load_more = |view: &TreeView| {
        let list = view.index().list("P").unwrap();
        view.scene().load_more_in(list)
    };

    assert_eq!(count(&view), 100);
    let mut clicks = 0;
    while let Some(more) = load_more(&view) {
        view.click(ClickTarget::LoadMore(more));
        block_on(view.drive(&server));
        clicks += 1;
    }
    assert_eq!(clicks, 2);
    assert_eq!(count(&view), 250);
    assert!(view.index().paging("P").unwrap().done);

    let requests = server.requests.get();
    let p = view.element_of("P").unwrap();
    view.click(ClickTarget::LoadMore(p));
    block_on(view.drive(&server));
    assert_eq!(server.requests.get(), requests);
}

#[cfg(feature = "render")]
#[test]
fn frames_render_only_when_scheduled() {
    let server = Server::default();
    let mut view = lineage::render::start_from_json(
        &json!({ "rootId": "R", "queries": { "root": "root", "children": "children" } }),
        Host::default(),
    )
    .unwrap();
    block_on(view.drive(&server));

    let options = lineage::render::RenderOptions::default();
    let frame = lineage::render::render_frame(&mut view, &options).unwrap().unwrap();
    assert!(frame.html.contains(r#"data-node-id="L""#));
    assert!(lineage::render::render_frame(&mut view, &options).unwrap().is_none());
}
