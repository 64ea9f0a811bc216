//! Request bodies and response shapes of the four tree queries.
//!
//! Document text is host-owned (see [`crate::config::QueryDocuments`]); this module only
//! assembles the variable bundle and decodes the `{ trees: [...] }` envelope.

use crate::config::TreeViewConfig;
use crate::error::{Error, Result};
use crate::leg::Leg;
use crate::model::{NodeId, NodeRecord, PathStep};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Root node plus the tree's declared leg names.
    Root { node_id: NodeId },
    /// One page of a parent's children.
    Children {
        parent_id: NodeId,
        offset: u32,
        count: u32,
    },
    /// Basic data of a single node.
    Node { node_id: NodeId },
    /// Chain from a node down to the deepest descendant along `leg`.
    BottomPath { node_id: NodeId, leg: Leg },
}

impl Query {
    pub fn name(&self) -> &'static str {
        match self {
            Query::Root { .. } => "root",
            Query::Children { .. } => "children",
            Query::Node { .. } => "node",
            Query::BottomPath { .. } => "bottomPath",
        }
    }

    pub fn body(&self, config: &TreeViewConfig, date: Option<NaiveDate>) -> Value {
        let docs = &config.queries;
        let date = date.map(|d| d.format("%Y-%m-%d").to_string());
        let (document, variables) = match self {
            Query::Root { node_id } => (
                &docs.root,
                json!({ "treeId": config.tree_id, "nodeIds": [node_id], "date": date }),
            ),
            Query::Children {
                parent_id,
                offset,
                count,
            } => (
                &docs.children,
                json!({
                    "treeId": config.tree_id,
                    "nodeIds": [parent_id],
                    "date": date,
                    "offset": offset,
                    "count": count,
                }),
            ),
            Query::Node { node_id } => (
                &docs.node,
                json!({ "treeId": config.tree_id, "nodeIds": [node_id], "date": date }),
            ),
            Query::BottomPath { node_id, leg } => (
                &docs.bottom_path,
                json!({
                    "treeId": config.tree_id,
                    "nodeIds": [node_id],
                    "leg": leg.as_str(),
                    "date": date,
                }),
            ),
        };
        json!({ "query": document, "variables": variables })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeResult {
    #[serde(default)]
    pub leg_names: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<ResultNode>,
}

/// A node in a query result; `bottomPath` is only present for bottom-path queries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultNode {
    #[serde(flatten)]
    pub record: NodeRecord,
    #[serde(default)]
    pub bottom_path: Vec<PathStep>,
}

#[derive(Debug, Deserialize)]
struct Trees {
    #[serde(default)]
    trees: Vec<TreeResult>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Decodes the first tree of a response. Accepts both a bare `{ trees }` body and the
/// standard `{ data: { trees }, errors }` envelope.
pub fn parse_tree(response: &Value) -> Result<TreeResult> {
    if let Some(errors) = response.get("errors").filter(|e| !e.is_null()) {
        let errors: Vec<GraphqlError> = serde_json::from_value(errors.clone())?;
        if !errors.is_empty() {
            let message = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::Query { message });
        }
    }
    let payload = response.get("data").unwrap_or(response);
    let trees: Trees = serde_json::from_value(payload.clone())?;
    trees
        .trees
        .into_iter()
        .next()
        .ok_or(Error::EmptyResponse { what: "tree" })
}

pub fn parse_root(response: &Value) -> Result<(Vec<String>, NodeRecord)> {
    let tree = parse_tree(response)?;
    let root = tree
        .nodes
        .into_iter()
        .next()
        .ok_or(Error::EmptyResponse { what: "root node" })?;
    Ok((tree.leg_names, root.record))
}

pub fn parse_children(response: &Value) -> Result<Vec<NodeRecord>> {
    let tree = parse_tree(response)?;
    Ok(tree.nodes.into_iter().map(|n| n.record).collect())
}

pub fn parse_node(response: &Value) -> Result<NodeRecord> {
    parse_tree(response)?
        .nodes
        .into_iter()
        .next()
        .map(|n| n.record)
        .ok_or(Error::EmptyResponse { what: "node" })
}

/// Returns the path with `from` as its first step.
pub fn parse_bottom_path(response: &Value, from: &str) -> Result<Vec<PathStep>> {
    let node = parse_tree(response)?
        .nodes
        .into_iter()
        .next()
        .ok_or(Error::EmptyResponse { what: "bottom path" })?;
    let mut path = node.bottom_path;
    if path.first().map(|s| s.node_id.as_str()) != Some(from) {
        path.insert(
            0,
            PathStep {
                node_id: from.to_string(),
                upline_id: node.record.upline_id.clone(),
                upline_leg: node.record.upline_leg.clone(),
            },
        );
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_body_carries_paging_and_date() {
        let mut cfg = TreeViewConfig::default();
        cfg.tree_id = "7".to_string();
        cfg.queries.children = "query Children { x }".to_string();
        let body = Query::Children {
            parent_id: "P".to_string(),
            offset: 100,
            count: 100,
        }
        .body(&cfg, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(body["query"], "query Children { x }");
        assert_eq!(
            body["variables"],
            json!({ "treeId": "7", "nodeIds": ["P"], "date": "2024-01-31", "offset": 100, "count": 100 })
        );
    }

    #[test]
    fn parses_data_envelope_and_errors() {
        let ok = json!({ "data": { "trees": [{ "legNames": ["Left", "Right"], "nodes": [
            { "nodeId": "R", "customer": { "name": "Root" } }
        ] }] } });
        let (legs, root) = parse_root(&ok).unwrap();
        assert_eq!(legs, vec!["Left", "Right"]);
        assert_eq!(root.node_id, "R");

        let failed = json!({ "errors": [{ "message": "boom" }, { "message": "again" }] });
        assert!(matches!(
            parse_children(&failed),
            Err(Error::Query { message }) if message == "boom; again"
        ));

        assert!(matches!(
            parse_node(&json!({ "trees": [] })),
            Err(Error::EmptyResponse { .. })
        ));
    }

    #[test]
    fn bottom_path_is_anchored_at_the_start_node() {
        let resp = json!({ "trees": [{ "nodes": [{
            "nodeId": "A",
            "bottomPath": [
                { "nodeId": "B", "uplineId": "A", "uplineLeg": "Right" },
                { "nodeId": "C", "uplineId": "B", "uplineLeg": "Right" }
            ]
        }] }] });
        let path = parse_bottom_path(&resp, "A").unwrap();
        let ids: Vec<_> = path.iter().map(|s| s.node_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(path[2].leg(), Some(Leg::new("right")));
    }
}
