use crate::leg::Leg;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type NodeId = String;

/// One node as returned by the tree queries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub node_id: NodeId,
    #[serde(default)]
    pub upline_id: Option<NodeId>,
    #[serde(default)]
    pub upline_leg: Option<String>,
    /// Opaque payload handed to the node template.
    #[serde(default)]
    pub customer: Option<Value>,
    /// `Some(false)` marks a proven leaf. Anything else may have children and gets an expander.
    #[serde(default)]
    pub has_children: Option<bool>,
    /// Children resolved in the same response, built immediately and shown expanded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Default::default()
        }
    }

    pub fn leg(&self) -> Option<Leg> {
        Leg::parse(self.upline_leg.as_deref())
    }

    pub fn may_have_children(&self) -> bool {
        self.has_children != Some(false) || !self.children.is_empty()
    }
}

/// What a node element in a child list stands for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeSlot {
    /// A placed node.
    Real(NodeRecord),
    /// A declared leg of a legged parent with no occupant.
    EmptySlot { leg: Leg, upline_id: Option<NodeId> },
    /// A placed node whose leg is not one of the tree's declared legs.
    Overflow(NodeRecord),
}

impl NodeSlot {
    pub fn node_id(&self) -> Option<&str> {
        match self {
            NodeSlot::Real(r) | NodeSlot::Overflow(r) => Some(r.node_id.as_str()),
            NodeSlot::EmptySlot { .. } => None,
        }
    }

    pub fn record(&self) -> Option<&NodeRecord> {
        match self {
            NodeSlot::Real(r) | NodeSlot::Overflow(r) => Some(r),
            NodeSlot::EmptySlot { .. } => None,
        }
    }

    pub fn record_mut(&mut self) -> Option<&mut NodeRecord> {
        match self {
            NodeSlot::Real(r) | NodeSlot::Overflow(r) => Some(r),
            NodeSlot::EmptySlot { .. } => None,
        }
    }

    pub fn leg(&self) -> Option<Leg> {
        match self {
            NodeSlot::Real(r) | NodeSlot::Overflow(r) => r.leg(),
            NodeSlot::EmptySlot { leg, .. } => Some(leg.clone()),
        }
    }

    pub fn upline_id(&self) -> Option<&str> {
        match self {
            NodeSlot::Real(r) | NodeSlot::Overflow(r) => r.upline_id.as_deref(),
            NodeSlot::EmptySlot { upline_id, .. } => upline_id.as_deref(),
        }
    }

    pub fn is_empty_slot(&self) -> bool {
        matches!(self, NodeSlot::EmptySlot { .. })
    }

    pub fn is_placed(&self) -> bool {
        !self.is_empty_slot()
    }

    pub fn selection(&self) -> Selection {
        Selection {
            id: self.node_id().map(str::to_string),
            upline_leg: self.leg().map(String::from),
            upline_id: self.upline_id().map(str::to_string),
        }
    }
}

/// Payload of the host's selection callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub id: Option<NodeId>,
    pub upline_leg: Option<String>,
    pub upline_id: Option<NodeId>,
}

/// One hop of a server-resolved bottom path, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    pub node_id: NodeId,
    #[serde(default)]
    pub upline_id: Option<NodeId>,
    #[serde(default)]
    pub upline_leg: Option<String>,
}

impl PathStep {
    pub fn leg(&self) -> Option<Leg> {
        Leg::parse(self.upline_leg.as_deref())
    }
}

/// Result of the root's first-generation load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootReady {
    /// Canonical legs that hold a placed node directly under the root.
    pub legs_with_real_node_at_root: Vec<String>,
    /// Every leg name the tree declares, as declared.
    pub leg_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GoToBottomMode {
    #[default]
    Surrogate,
    PathOnly,
}

impl std::str::FromStr for GoToBottomMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pathOnly" | "path_only" | "path-only" => Self::PathOnly,
            _ => Self::Surrogate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoveArgs {
    pub node_id: NodeId,
    pub to_parent_id: NodeId,
    pub to_upline_leg: Option<String>,
    pub from_parent_id: Option<NodeId>,
    pub from_upline_leg: Option<String>,
    pub node_data: Option<NodeRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertArgs {
    pub parent_id: NodeId,
    pub upline_leg: Option<String>,
    pub node_data: NodeRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoToBottomArgs {
    pub from_node_id: NodeId,
    pub leg: String,
    pub mode: GoToBottomMode,
}

/// Notifications for hosts that poll instead of registering closures.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    Ready(RootReady),
    Selected(Option<Selection>),
    BottomPathResolved { from: NodeId, leg: Leg, path: Vec<PathStep> },
}
