//! SVG serialization of a [`RetainedScene`].

use crate::retained::{RetainedScene, SceneNode};
use crate::scene::ElementKey;
use rustc_hash::FxHashMap;
use std::fmt::Write as _;

#[derive(Debug, Clone)]
pub struct SvgRenderOptions {
    /// Adds extra space around the viewBox.
    pub viewbox_padding: f64,
    /// Root element id.
    pub diagram_id: Option<String>,
    /// `[min_x, min_y, width, height]` of the content, before padding.
    pub viewbox: Option<[f64; 4]>,
    pub font_family: Option<String>,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            viewbox_padding: 8.0,
            diagram_id: None,
            viewbox: None,
            font_family: None,
        }
    }
}

pub fn render_scene_svg(scene: &RetainedScene, options: &SvgRenderOptions) -> String {
    let mut children: FxHashMap<Option<&ElementKey>, Vec<&SceneNode>> = FxHashMap::default();
    for node in scene.nodes() {
        children.entry(node.parent.as_ref()).or_default().push(node);
    }

    let mut out = String::new();
    out.push_str(r#"<svg xmlns="http://www.w3.org/2000/svg""#);
    if let Some(id) = options.diagram_id.as_deref() {
        let _ = write!(&mut out, r#" id="{}""#, escape_xml(id));
    }
    if let Some([x, y, w, h]) = options.viewbox {
        let pad = options.viewbox_padding;
        let _ = write!(
            &mut out,
            r#" viewBox="{} {} {} {}" width="{}" height="{}""#,
            fmt(x - pad),
            fmt(y - pad),
            fmt(w + pad * 2.0),
            fmt(h + pad * 2.0),
            fmt(w + pad * 2.0),
            fmt(h + pad * 2.0)
        );
    }
    if let Some(font) = options.font_family.as_deref() {
        let _ = write!(&mut out, r#" font-family="{}""#, escape_xml(font));
    }
    out.push('>');
    if let Some(roots) = children.get(&None) {
        for node in roots {
            write_node(&mut out, node, &children);
        }
    }
    out.push_str("</svg>\n");
    out
}

fn write_node(
    out: &mut String,
    node: &SceneNode,
    children: &FxHashMap<Option<&ElementKey>, Vec<&SceneNode>>,
) {
    let tag = node.key.kind.tag();
    let _ = write!(
        out,
        r#"<{tag} class="{}" data-uid="{}""#,
        node.key.kind.class(),
        escape_xml(&node.key.uid)
    );
    for (name, value) in &node.attrs {
        let _ = write!(out, r#" {name}="{}""#, escape_xml(value));
    }
    let kids = children.get(&Some(&node.key));
    if node.text.is_none() && kids.is_none_or(|k| k.is_empty()) {
        out.push_str("/>");
        return;
    }
    out.push('>');
    if let Some(text) = node.text.as_deref() {
        escape_xml_into(out, text);
    }
    for kid in kids.into_iter().flatten() {
        write_node(out, kid, children);
    }
    let _ = write!(out, "</{tag}>");
}

/// Number formatting for SVG attributes: shortest round-trip form, without `-0`, non-finite
/// values or float noise below 1e-6.
pub fn fmt(v: f64) -> String {
    let mut out = String::new();
    fmt_into(&mut out, v);
    out
}

pub fn fmt_into(out: &mut String, v: f64) {
    if !v.is_finite() {
        out.push('0');
        return;
    }

    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    if v == -0.0 {
        v = 0.0;
    }

    let _ = write!(out, "{v}");
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_xml_into(&mut out, text);
    out
}

pub fn escape_xml_into(out: &mut String, text: &str) {
    let bytes = text.as_bytes();
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        let esc = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            b'\'' => "&#39;",
            _ => continue,
        };
        if start < i {
            out.push_str(&text[start..i]);
        }
        out.push_str(esc);
        start = i + 1;
    }
    if start < text.len() {
        out.push_str(&text[start..]);
    }
}
