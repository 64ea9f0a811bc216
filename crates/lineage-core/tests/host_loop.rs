use lineage_core::{
    Error, GoToBottomArgs, GoToBottomMode, Host, NodeSlot, TreeEvent, TreeView, TreeViewConfig,
};
use serde_json::{Value, json};

fn config() -> TreeViewConfig {
    TreeViewConfig::from_json(&json!({
        "endpoint": "https://example.test/graphql",
        "treeId": "binary",
        "rootId": "1",
        "periodDate": "2024-01-31",
        "queries": { "root": "Q_ROOT", "children": "Q_CHILDREN", "node": "Q_NODE", "bottomPath": "Q_BOTTOM" }
    }))
    .unwrap()
}

fn node(id: &str, upline: Option<&str>, leg: Option<&str>, has_children: bool) -> Value {
    json!({
        "nodeId": id,
        "uplineId": upline,
        "uplineLeg": leg,
        "customer": { "name": format!("Member {id}") },
        "hasChildren": has_children,
    })
}

/// What a host's HTTP layer would do: look at the document and variables, answer.
fn server(body: &Value) -> Result<Value, Error> {
    let doc = body["query"].as_str().unwrap();
    let id = body["variables"]["nodeIds"][0].as_str().unwrap();
    let legs = json!(["Left", "Right"]);
    let nodes = match (doc, id) {
        ("Q_ROOT", "1") => vec![node("1", None, None, true)],
        ("Q_CHILDREN", "1") => vec![node("2", Some("1"), Some("Left"), true)],
        ("Q_CHILDREN", "2") => vec![
            node("3", Some("2"), Some("Right"), false),
            node("4", Some("2"), Some("Holding Tank"), false),
        ],
        ("Q_BOTTOM", "1") => {
            let mut n = node("1", None, None, true);
            n["bottomPath"] = json!([
                { "nodeId": "1" },
                { "nodeId": "2", "uplineId": "1", "uplineLeg": "Left" },
                { "nodeId": "5", "uplineId": "2", "uplineLeg": "Left" },
                { "nodeId": "6", "uplineId": "5", "uplineLeg": "Left" },
            ]);
            vec![n]
        }
        ("Q_NODE", "6") => vec![node("6", Some("5"), Some("Left"), false)],
        _ => return Err(Error::transport("https://example.test/graphql", "404")),
    };
    Ok(json!({ "data": { "trees": [{ "legNames": legs, "nodes": nodes }] } }))
}

fn pump(view: &mut TreeView) {
    loop {
        let batch = view.take_requests();
        if batch.is_empty() {
            break;
        }
        for req in batch {
            assert_eq!(req.endpoint, "https://example.test/graphql");
            view.complete(req.ticket, server(&req.body));
        }
    }
}

#[test]
fn host_answers_requests_by_hand() {
    let mut view = TreeView::setup(config(), Host::default()).unwrap();
    assert!(view.take_requests().is_empty());
    view.start();

    let first = view.take_requests();
    assert_eq!(first.len(), 1);
    assert_eq!(
        first[0].body["variables"],
        json!({ "treeId": "binary", "nodeIds": ["1"], "date": "2024-01-31" })
    );
    view.complete(first[0].ticket, server(&first[0].body));
    pump(&mut view);

    let events = view.take_events();
    let Some(TreeEvent::Ready(ready)) = events.first() else {
        panic!("expected a ready event, got {events:?}");
    };
    assert_eq!(ready.legs_with_real_node_at_root, ["left"]);

    let two = view.element_of("2").unwrap();
    view.click(lineage_core::ClickTarget::Expander(two));
    pump(&mut view);
    let list = view.index().list("2").unwrap();
    let kinds: Vec<_> = view
        .scene()
        .items(list)
        .iter()
        .map(|&i| view.scene().node(i).unwrap().slot.clone())
        .collect();
    assert!(matches!(kinds[0], NodeSlot::EmptySlot { .. }));
    assert!(matches!(&kinds[1], NodeSlot::Real(r) if r.node_id == "3"));
    assert_eq!(kinds.len(), 2);
}

#[test]
fn jump_through_the_public_api() {
    let mut view = TreeView::setup(config(), Host::default()).unwrap();
    view.start();
    pump(&mut view);

    assert!(view.go_to_bottom(GoToBottomArgs {
        from_node_id: "1".to_string(),
        leg: "LEFT".to_string(),
        mode: GoToBottomMode::default(),
    }));
    pump(&mut view);

    assert_eq!(view.selection().and_then(|s| s.id).as_deref(), Some("6"));
    let snap = serde_json::to_value(view.snapshot()).unwrap();
    let first_gen = &snap[0]["children"]["items"];
    assert_eq!(first_gen[0]["kind"], json!({ "surrogate": { "hiddenLevels": 2 } }));
    assert_eq!(first_gen[0]["children"]["items"][0]["nodeId"], "6");
}
