//! Connector overlay drawn under the node lists.

use crate::{RenderOptions, fmt};
use lineage_core::layout::{Edge, Layout};
use std::fmt::Write as _;

/// Elbow path from a parent's bottom centre to a child's top centre.
pub fn connector_path(edge: &Edge) -> String {
    let mid_y = (edge.start.y + edge.end.y) / 2.0;
    format!(
        "M{},{}V{}H{}V{}",
        fmt(edge.start.x),
        fmt(edge.start.y),
        fmt(mid_y),
        fmt(edge.end.x),
        fmt(edge.end.y)
    )
}

pub fn render_connectors(layout: &Layout, options: &RenderOptions) -> String {
    let p = &options.class_prefix;
    let pad = options.viewbox_padding.max(0.0);
    let (x, y, w, h) = match layout.bounds() {
        Some(b) => (
            b.origin.x - pad,
            b.origin.y - pad,
            b.size.width + pad * 2.0,
            b.size.height + pad * 2.0,
        ),
        None => (0.0, 0.0, 1.0, 1.0),
    };
    let mut out = String::new();
    let _ = write!(
        &mut out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" class="{p}connectors" viewBox="{} {} {} {}" width="{}" height="{}" style="left: {}px; top: {}px">"#,
        fmt(x),
        fmt(y),
        fmt(w.max(1.0)),
        fmt(h.max(1.0)),
        fmt(w.max(1.0)),
        fmt(h.max(1.0)),
        fmt(x),
        fmt(y)
    );
    for edge in layout.edges() {
        let _ = write!(
            &mut out,
            r#"<path class="{p}edge" data-from="{}" data-to="{}" d="{}" />"#,
            edge.from.raw(),
            edge.to.raw(),
            connector_path(edge)
        );
    }
    out.push_str("</svg>");
    out
}
