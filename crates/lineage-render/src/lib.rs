#![forbid(unsafe_code)]

//! Projection of a [`lineage_core::TreeView`] into markup a browser host can mount.

pub mod html;
pub mod svg;

use lineage_core::TreeView;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("nothing is rendered yet")]
    EmptyScene,
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Prefix for every class name emitted.
    pub class_prefix: String,
    /// Template output is trusted host markup by default; set this to render it as text.
    pub escape_markup: bool,
    /// Keep closed child lists in the output (with the `hidden` attribute).
    pub include_hidden: bool,
    pub viewbox_padding: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            class_prefix: "mlm-".to_string(),
            escape_markup: false,
            include_hidden: true,
            viewbox_padding: 8.0,
        }
    }
}

/// Everything a host needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTree {
    pub html: String,
    pub connectors: String,
    /// CSS `transform` value for the canvas element.
    pub transform: String,
}

pub fn render(view: &TreeView, options: &RenderOptions) -> Result<RenderedTree> {
    if view.scene().is_empty() {
        return Err(Error::EmptyScene);
    }
    let layout = view.layout();
    Ok(RenderedTree {
        html: html::render_html(view, options),
        connectors: svg::render_connectors(&layout, options),
        transform: html::css_transform(view),
    })
}

/// Pretty JSON of the scene snapshot, for debugging and golden files.
pub fn snapshot_json(view: &TreeView) -> Result<String> {
    Ok(serde_json::to_string_pretty(&view.snapshot())?)
}

fn fmt(v: f64) -> String {
    // avoid `-0` and float noise in attributes
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    let s = v.to_string();
    if s == "-0" { "0".to_string() } else { s }
}

#[cfg(test)]
mod tests {
    use super::fmt;

    #[test]
    fn numbers_are_stable_in_attributes() {
        assert_eq!(fmt(-0.0), "0");
        assert_eq!(fmt(12.0000001), "12");
        assert_eq!(fmt(0.5), "0.5");
        assert_eq!(fmt(f64::NAN), "0");
    }
}
