#![forbid(unsafe_code)]

//! Headless engine for large, partially loaded genealogy trees.
//!
//! Design goals:
//! - no DOM, canvas or network of its own: the host renders the [`scene::Scene`] and answers
//!   the queued [`PendingRequest`]s
//! - deterministic, testable state (scene snapshots, explicit frame state)
//! - runtime-agnostic async helpers (no specific executor required)

pub mod config;
pub mod error;
pub mod geom;
pub mod host;
pub mod index;
pub mod layout;
pub mod leg;
pub mod model;
pub mod query;
pub mod scene;
mod view;
pub mod viewport;

pub use config::TreeViewConfig;
pub use error::{Error, Result};
pub use host::{ErrorReporter, FrameScheduler, Host, NodeTemplate, Transport};
pub use layout::{ClickTarget, Layout};
pub use leg::{Leg, LegOrder};
pub use model::{
    GoToBottomArgs, GoToBottomMode, InsertArgs, MoveArgs, NodeId, NodeRecord, NodeSlot,
    PathStep, RootReady, Selection, TreeEvent,
};
pub use scene::{ElementId, Scene, SceneSnapshot};
pub use view::{PendingRequest, Ticket, TreeView};
pub use viewport::{FrameState, Viewport};

#[cfg(test)]
mod tests;
