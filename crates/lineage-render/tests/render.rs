use futures::FutureExt;
use futures::executor::block_on;
use futures::future::LocalBoxFuture;
use lineage_core::host::{NodeTemplate, Transport};
use lineage_core::{Error as CoreError, Host, NodeSlot, TreeView, TreeViewConfig};
use lineage_render::{Error, RenderOptions, render, snapshot_json};
use serde_json::{Value, json};
use std::sync::Arc;

struct Fixture;

impl Transport for Fixture {
    fn post<'a>(
        &'a self,
        _endpoint: &'a str,
        body: &'a Value,
    ) -> LocalBoxFuture<'a, Result<Value, CoreError>> {
        let id = body["variables"]["nodeIds"][0].as_str().unwrap_or_default();
        let nodes = match (body["query"].as_str(), id) {
            (Some("root"), _) => json!([{ "nodeId": "R", "customer": { "name": "Root & Co" }, "hasChildren": true }]),
            (Some("children"), "R") => json!([
                { "nodeId": "a", "uplineId": "R", "uplineLeg": "Left", "customer": { "name": "<b>A</b>" }, "hasChildren": true },
            ]),
            _ => json!([]),
        };
        let response = json!({ "data": { "trees": [{ "legNames": ["Left", "Right"], "nodes": nodes }] } });
        futures::future::ready(Ok(response)).boxed_local()
    }
}

struct Card;

impl NodeTemplate for Card {
    fn render(&self, slot: &NodeSlot) -> Option<String> {
        Some(match slot {
            NodeSlot::EmptySlot { leg, .. } => format!("<i>open {leg}</i>"),
            NodeSlot::Real(r) | NodeSlot::Overflow(r) => r.customer.as_ref()?["name"].as_str()?.to_string(),
        })
    }

    fn loading(&self) -> String {
        "<span>…</span>".to_string()
    }
}

fn view() -> TreeView {
    let config = TreeViewConfig::from_json(&json!({
        "rootId": "R",
        "queries": { "root": "root", "children": "children", "node": "node", "bottomPath": "bottomPath" }
    }))
    .unwrap();
    let mut view = TreeView::setup(config, Host::new(Arc::new(Card))).unwrap();
    view.start();
    block_on(view.drive(&Fixture));
    view
}

#[test]
fn empty_view_has_nothing_to_render() {
    let config = TreeViewConfig::from_json(&json!({ "rootId": "R" })).unwrap();
    let view = TreeView::setup(config, Host::default()).unwrap();
    assert!(matches!(
        render(&view, &RenderOptions::default()),
        Err(Error::EmptyScene)
    ));
}

#[test]
fn html_nests_lists_and_keeps_template_markup() {
    let view = view();
    let out = render(&view, &RenderOptions::default()).unwrap();

    assert!(out.html.starts_with(r#"<ul class="mlm-tree" style="transform: matrix(1, 0, 0, 1, "#));
    assert!(out.html.contains(r#"data-node-id="R""#));
    assert!(out.html.contains("Root & Co"));
    assert!(out.html.contains("<b>A</b>"));
    assert!(out.html.contains(r#"<li class="mlm-empty-slot""#));
    assert!(out.html.contains("<i>open right</i>"));
    assert!(out.html.contains(r#"<button class="mlm-expander" aria-expanded="true">"#));
    assert!(out.html.contains(r#"<button class="mlm-expander" aria-expanded="false">"#));
    assert_eq!(out.html.matches("<li").count(), 3);
    assert!(out.transform.starts_with("matrix(1, 0, 0, 1, "));
}

#[test]
fn escaped_markup_option_renders_text() {
    let view = view();
    let options = RenderOptions {
        escape_markup: true,
        class_prefix: "t-".to_string(),
        ..Default::default()
    };
    let out = render(&view, &options).unwrap();
    assert!(out.html.contains("&lt;b&gt;A&lt;/b&gt;"));
    assert!(out.html.contains("Root &amp; Co"));
    assert!(out.html.contains(r#"class="t-node""#));
}

#[test]
fn connectors_follow_layout_edges() {
    let view = view();
    let out = render(&view, &RenderOptions::default()).unwrap();
    assert_eq!(out.connectors.matches("<path ").count(), 2);
    assert!(out.connectors.starts_with("<svg "));
    assert!(out.connectors.ends_with("</svg>"));

    let layout = view.layout();
    let edge = layout.edges()[0];
    let d = lineage_render::svg::connector_path(&edge);
    assert!(d.starts_with('M'));
    assert!(out.connectors.contains(&d));
}

#[test]
fn snapshot_json_is_pretty() {
    let view = view();
    let json = snapshot_json(&view).unwrap();
    let parsed: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed[0]["nodeId"], "R");
    assert_eq!(parsed[0]["children"]["items"].as_array().unwrap().len(), 2);
}
