#![forbid(unsafe_code)]

//! `lineage` is a headless engine for viewing very large genealogy trees.
//!
//! The engine owns the tree state (rendered nodes, paging cursors, collapsed chains, pan/zoom)
//! and leaves I/O and drawing to the host.
//!
//! # Features
//!
//! - `render`: HTML list and SVG connector output (`lineage::render`)

pub use lineage_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use lineage_render::html::{css_transform, render_html};
    pub use lineage_render::svg::{connector_path, render_connectors};
    pub use lineage_render::{RenderOptions, RenderedTree, render, snapshot_json};

    use lineage_core::{Host, TreeView, TreeViewConfig};

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Engine(#[from] lineage_core::Error),
        #[error(transparent)]
        Render(#[from] lineage_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Builds and starts a view from a partial JSON config.
    pub fn start_from_json(config: &serde_json::Value, host: Host) -> Result<TreeView> {
        let config = TreeViewConfig::from_json(config)?;
        let mut view = TreeView::setup(config, host)?;
        view.start();
        Ok(view)
    }

    /// Animation-frame callback for hosts: consumes the scheduled redraw and renders it.
    /// Returns `Ok(None)` when no redraw was pending.
    pub fn render_frame(view: &mut TreeView, options: &RenderOptions) -> Result<Option<RenderedTree>> {
        if view.animation_frame().is_none() {
            return Ok(None);
        }
        Ok(Some(render(view, options)?))
    }
}
