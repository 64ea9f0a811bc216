//! Nested `<ul>/<li>` projection of the scene.

use crate::{RenderOptions, fmt};
use lineage_core::TreeView;
use lineage_core::geom::css_matrix;
use lineage_core::scene::{ElementId, ElementKind, Expander, Scene};
use std::fmt::Write as _;

/// CSS `transform` value for the current viewport.
pub fn css_transform(view: &TreeView) -> String {
    let m = css_matrix(view.viewport().transform());
    format!(
        "matrix({}, {}, {}, {}, {}, {})",
        fmt(m[0]),
        fmt(m[1]),
        fmt(m[2]),
        fmt(m[3]),
        fmt(m[4]),
        fmt(m[5])
    )
}

pub fn render_html(view: &TreeView, options: &RenderOptions) -> String {
    let scene = view.scene();
    let p = &options.class_prefix;
    let selected = view.selected_element();
    let mut out = String::new();
    let _ = write!(
        &mut out,
        r#"<ul class="{p}tree" style="transform: {}; transform-origin: 0 0">"#,
        css_transform(view)
    );
    for &item in scene.root_items() {
        render_item(&mut out, scene, item, selected, options);
    }
    out.push_str("</ul>");
    out
}

fn render_list(
    out: &mut String,
    scene: &Scene,
    list: ElementId,
    selected: Option<ElementId>,
    options: &RenderOptions,
) {
    let Some(l) = scene.list(list) else {
        return;
    };
    if !l.open && !options.include_hidden {
        return;
    }
    let p = &options.class_prefix;
    let _ = write!(out, r#"<ul class="{p}children""#);
    if !l.open {
        out.push_str(" hidden");
    }
    out.push('>');
    for &item in &l.items {
        render_item(out, scene, item, selected, options);
    }
    out.push_str("</ul>");
}

fn render_item(
    out: &mut String,
    scene: &Scene,
    item: ElementId,
    selected: Option<ElementId>,
    options: &RenderOptions,
) {
    let Some(el) = scene.get(item) else {
        return;
    };
    let p = &options.class_prefix;
    let leg = el.leg();
    let leg_attr = leg
        .as_ref()
        .map(|l| format!(r#" data-leg="{}""#, htmlize::escape_attribute(l.as_str())))
        .unwrap_or_default();
    match &el.kind {
        ElementKind::Node(n) => {
            let class = if n.slot.is_empty_slot() {
                "empty-slot"
            } else if matches!(n.slot, lineage_core::NodeSlot::Overflow(_)) {
                "overflow"
            } else {
                "node"
            };
            let _ = write!(out, r#"<li class="{p}{class}""#);
            if selected == Some(item) {
                let _ = write!(out, r#" aria-selected="true""#);
            }
            let _ = write!(out, r#" data-element="{}""#, item.raw());
            if let Some(id) = n.slot.node_id() {
                let _ = write!(out, r#" data-node-id="{}""#, htmlize::escape_attribute(id));
            }
            out.push_str(&leg_attr);
            out.push('>');
            let _ = write!(out, r#"<div class="{p}card">"#);
            push_markup(out, &n.markup, options);
            out.push_str("</div>");
            if let Some(state) = n.expander {
                let expanded = state == Expander::Expanded;
                let _ = write!(
                    out,
                    r#"<button class="{p}expander" aria-expanded="{expanded}">{}</button>"#,
                    if expanded { "−" } else { "+" }
                );
            }
            if let Some(list) = n.child_list {
                render_list(out, scene, list, selected, options);
            }
            out.push_str("</li>");
        }
        ElementKind::Loading { markup, .. } => {
            let _ = write!(out, r#"<li class="{p}loading"{leg_attr}>"#);
            push_markup(out, markup, options);
            out.push_str("</li>");
        }
        ElementKind::LoadMore => {
            let _ = write!(
                out,
                r#"<li class="{p}load-more" data-element="{}"><button>Load more</button></li>"#,
                item.raw()
            );
        }
        ElementKind::Surrogate(s) => {
            let _ = write!(
                out,
                r#"<li class="{p}surrogate" data-element="{}" data-ancestor="{}"{leg_attr}>"#,
                item.raw(),
                htmlize::escape_attribute(s.ancestor.as_str())
            );
            let _ = write!(
                out,
                r#"<div class="{p}chain">… {} hidden level{} …</div>"#,
                s.hidden_levels,
                if s.hidden_levels == 1 { "" } else { "s" }
            );
            let _ = write!(out, r#"<button class="{p}expand-up">Expand up</button>"#);
            render_list(out, scene, s.inner, selected, options);
            out.push_str("</li>");
        }
        ElementKind::RootList(_) | ElementKind::ChildList(_) => {
            render_list(out, scene, item, selected, options);
        }
    }
}

fn push_markup(out: &mut String, markup: &str, options: &RenderOptions) {
    if options.escape_markup {
        out.push_str(&htmlize::escape_text(markup));
    } else {
        out.push_str(markup);
    }
}
