//! Legend, scale bar and colour bar.
//!
//! The legend sits to the right of the diagram's global extent; both bars sit below the lowest
//! cluster row.

use crate::scene::{ElementKey, ElementKind, ElementSpec, PointerEventKind, SceneBatch};
use crate::state::DiagramState;
use crate::svg::fmt;

pub const LEGEND_UID: &str = "legend";
pub const SCALE_BAR_UID: &str = "scale-bar";
pub const COLOUR_BAR_UID: &str = "colour-bar";
pub const GRADIENT_ID: &str = "cbarGradient";

/// Band layout of `entries` legend rows over `entries * entry_height` pixels, with half a step
/// of padding between rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendBands {
    pub start: f64,
    pub step: f64,
    pub bandwidth: f64,
}

impl LegendBands {
    pub fn new(entries: usize, entry_height: f64) -> Self {
        let n = entries as f64;
        let height = entry_height * n;
        let step = height / (n - 0.5).max(1.0);
        let start = ((height - step * (n - 0.5)) / 2.0).max(0.0);
        Self {
            start,
            step,
            bandwidth: step * 0.5,
        }
    }

    pub fn offset(&self, index: usize) -> f64 {
        self.start + index as f64 * self.step
    }
}

/// Y of the bottom edge of the lowest cluster row.
pub fn diagram_bottom(state: &DiagramState) -> f64 {
    state.scales.total_height() + state.config.gene.shape.bottom()
}

pub fn legend_transform(state: &DiagramState) -> String {
    let max = state
        .placement()
        .global_extent(&[])
        .map(|(_, max)| max)
        .unwrap_or(0.0);
    format!(
        "translate({}, 0)",
        fmt(max + state.config.legend.margin_left)
    )
}

pub fn scale_bar_transform(state: &DiagramState) -> String {
    format!(
        "translate(0, {})",
        fmt(diagram_bottom(state) + state.config.scale_bar.margin_top)
    )
}

pub fn colour_bar_transform(state: &DiagramState) -> String {
    let x = state.scales.x(state.config.scale_bar.base_pair as f64) + 20.0;
    format!(
        "translate({}, {})",
        fmt(x),
        fmt(diagram_bottom(state) + state.config.colour_bar.margin_top)
    )
}

/// `2500` -> `2.5kb`, `1000` -> `1kb`.
pub fn scale_bar_label(base_pair: i64) -> String {
    let kb = (base_pair as f64 / 100.0).round() / 10.0;
    format!("{}kb", fmt(kb))
}

pub fn legend(state: &DiagramState, batch: &mut SceneBatch) {
    for kind in [
        ElementKind::Legend,
        ElementKind::LegendEntry,
        ElementKind::LegendMarker,
        ElementKind::LegendLabel,
    ] {
        batch.declare(kind);
    }
    let config = &state.config.legend;
    if !config.show {
        return;
    }

    let root = ElementSpec::new(ElementKind::Legend, LEGEND_UID)
        .attr("transform", legend_transform(state));
    let root_key = root.key.clone();
    batch.push(root);

    let groups = state.legend_groups();
    let bands = LegendBands::new(groups.len(), config.entry_height);
    let half = bands.bandwidth / 2.0;
    for (index, group) in groups.into_iter().enumerate() {
        let uid = group.uid.to_string();
        let entry = ElementSpec::new(ElementKind::LegendEntry, uid.clone())
            .parent(root_key.clone())
            .attr(
                "transform",
                format!("translate(0, {})", fmt(bands.offset(index))),
            );
        let entry_key = entry.key.clone();
        batch.push(entry);
        batch.push(
            ElementSpec::new(ElementKind::LegendMarker, uid.clone())
                .parent(entry_key.clone())
                .num("cy", half)
                .num("r", half)
                .attr("fill", state.scales.colour.get(&group.uid).clone())
                .attr("cursor", "pointer")
                .on(&[PointerEventKind::Click]),
        );
        batch.push(
            ElementSpec::new(ElementKind::LegendLabel, uid)
                .parent(entry_key)
                .num("x", half + 6.0)
                .num("y", half + 1.0)
                .attr("text-anchor", "start")
                .attr("dominant-baseline", "middle")
                .attr("font-size", format!("{}px", fmt(config.font_size)))
                .attr("cursor", "pointer")
                .text(group.label.clone())
                .on(&[PointerEventKind::Click, PointerEventKind::ContextMenu]),
        );
    }
}

pub fn scale_bar(state: &DiagramState, batch: &mut SceneBatch) {
    for kind in [
        ElementKind::ScaleBar,
        ElementKind::ScaleBarLine,
        ElementKind::ScaleBarText,
    ] {
        batch.declare(kind);
    }
    let config = &state.config.scale_bar;
    if !config.show {
        return;
    }

    let root = ElementSpec::new(ElementKind::ScaleBar, SCALE_BAR_UID)
        .attr("transform", scale_bar_transform(state));
    let root_key = root.key.clone();
    batch.push(root);

    let end = state.scales.x(config.base_pair as f64);
    let middle = config.height / 2.0;
    let (e, m, h) = (fmt(end), fmt(middle), fmt(config.height));
    batch.push(
        ElementSpec::new(ElementKind::ScaleBarLine, SCALE_BAR_UID)
            .parent(root_key.clone())
            .attr(
                "d",
                format!("M0,{m} L{e},{m} M0,0 L0,{h} M{e},0 L{e},{h}"),
            )
            .attr("fill", "none")
            .attr("stroke", config.colour.clone())
            .num("stroke-width", config.stroke),
    );
    batch.push(
        ElementSpec::new(ElementKind::ScaleBarText, SCALE_BAR_UID)
            .parent(root_key)
            .num("x", end / 2.0)
            .num("y", config.height + 5.0)
            .attr("text-anchor", "middle")
            .attr("dominant-baseline", "hanging")
            .attr("font-size", format!("{}pt", fmt(config.font_size)))
            .attr("cursor", "pointer")
            .text(scale_bar_label(config.base_pair))
            .on(&[PointerEventKind::Click]),
    );
}

pub fn colour_bar(state: &DiagramState, batch: &mut SceneBatch) {
    for kind in [
        ElementKind::ColourBar,
        ElementKind::ColourBarGradient,
        ElementKind::ColourBarStop,
        ElementKind::ColourBarRect,
        ElementKind::ColourBarText,
    ] {
        batch.declare(kind);
    }
    let config = &state.config.colour_bar;
    if !config.show {
        return;
    }

    let root = ElementSpec::new(ElementKind::ColourBar, COLOUR_BAR_UID)
        .attr("transform", colour_bar_transform(state));
    let root_key = root.key.clone();
    batch.push(root);

    let gradient = ElementSpec::new(ElementKind::ColourBarGradient, COLOUR_BAR_UID)
        .parent(root_key.clone())
        .attr("id", GRADIENT_ID)
        .attr("x1", "0%")
        .attr("x2", "100%");
    let gradient_key = gradient.key.clone();
    batch.push(gradient);
    for (uid, offset, identity) in [("start", "0%", 0.0), ("end", "100%", 1.0)] {
        batch.push(
            ElementSpec::new(ElementKind::ColourBarStop, uid)
                .parent(gradient_key.clone())
                .attr("offset", offset)
                .attr("stop-color", state.scales.score.colour(identity)),
        );
    }

    for (uid, fill) in [
        ("background", "white".to_string()),
        ("fill", format!("url(#{GRADIENT_ID})")),
    ] {
        batch.push(
            ElementSpec::new(ElementKind::ColourBarRect, uid)
                .parent(root_key.clone())
                .num("width", config.width)
                .num("height", config.height)
                .attr("fill", fill)
                .attr("stroke", "black")
                .attr("stroke-width", "1px"),
        );
    }

    let y = config.height + 5.0;
    for (uid, text, x, anchor) in [
        ("start", "0", 0.0, "start"),
        ("end", "100", config.width, "end"),
        ("label", "Identity (%)", config.width / 2.0, "middle"),
    ] {
        batch.push(
            ElementSpec::new(ElementKind::ColourBarText, uid)
                .parent(root_key.clone())
                .num("x", x)
                .num("y", y)
                .attr("text-anchor", anchor)
                .attr("dominant-baseline", "hanging")
                .attr("font-size", format!("{}pt", fmt(config.font_size)))
                .text(text),
        );
    }
}

/// Key of the overlay root of `kind`, for patches.
pub fn overlay_key(kind: ElementKind) -> Option<ElementKey> {
    let uid = match kind {
        ElementKind::Legend => LEGEND_UID,
        ElementKind::ScaleBar => SCALE_BAR_UID,
        ElementKind::ColourBar => COLOUR_BAR_UID,
        _ => return None,
    };
    Some(ElementKey::new(kind, uid))
}
