//! Collaborator seams: everything the engine needs from the page that embeds it.

use crate::error::{Error, Result};
use crate::model::{NodeSlot, Selection};
use futures::future::LocalBoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// Turns a node into host markup. Must be a pure function of its input.
pub trait NodeTemplate {
    /// `None` vetoes rendering of that node.
    fn render(&self, slot: &NodeSlot) -> Option<String>;

    /// Markup for transient loading placeholders.
    fn loading(&self) -> String;
}

/// Where fetch failures go. Hosts typically show a toast or an alert.
pub trait ErrorReporter {
    fn report(&self, error: &Error);
}

/// Asks the host for one animation frame; the host then calls
/// [`crate::TreeView::animation_frame`].
pub trait FrameScheduler {
    fn request_frame(&self);
}

/// The data-fetch capability: post a query document and its variables, get the parsed body.
pub trait Transport {
    fn post<'a>(&'a self, endpoint: &'a str, body: &'a Value) -> LocalBoxFuture<'a, Result<Value>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &Error) {
        tracing::error!(%error, "tree view request failed");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ManualScheduler;

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self) {}
}

/// Template that renders the customer payload's `name` field (or the node id).
#[derive(Debug, Clone, Default)]
pub struct PlainTemplate;

impl NodeTemplate for PlainTemplate {
    fn render(&self, slot: &NodeSlot) -> Option<String> {
        match slot {
            NodeSlot::EmptySlot { leg, .. } => Some(format!("(open {leg})")),
            NodeSlot::Real(r) | NodeSlot::Overflow(r) => {
                let name = r
                    .customer
                    .as_ref()
                    .and_then(|c| c.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or(r.node_id.as_str());
                Some(name.to_string())
            }
        }
    }

    fn loading(&self) -> String {
        "Loading…".to_string()
    }
}

pub type SelectCallback = Box<dyn FnMut(Option<&Selection>)>;

/// Bundle of host collaborators handed to [`crate::TreeView::setup`].
pub struct Host {
    pub template: Arc<dyn NodeTemplate>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub scheduler: Arc<dyn FrameScheduler>,
    pub on_select: Option<SelectCallback>,
}

impl Default for Host {
    fn default() -> Self {
        Self::new(Arc::new(PlainTemplate))
    }
}

impl Host {
    pub fn new(template: Arc<dyn NodeTemplate>) -> Self {
        Self {
            template,
            reporter: Arc::new(TracingReporter),
            scheduler: Arc::new(ManualScheduler),
            on_select: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn FrameScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn on_select(mut self, f: impl FnMut(Option<&Selection>) + 'static) -> Self {
        self.on_select = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("on_select", &self.on_select.is_some())
            .finish_non_exhaustive()
    }
}
