//! Placement functions: gene glyphs, link anchors and paths, extents and label transforms.
//!
//! Everything here is a pure function of the entity store, the scale registry and (for live drag
//! feedback) the uncommitted transforms of the entities being dragged.

use crate::scales::{LinearScale, ScaleRegistry};
use crate::svg::fmt;
use clustermap_core::config::{GeneShape, LabelAnchor, LabelPosition, LinkConfig};
use clustermap_core::{Bp, Cluster, ClusterMapConfig, Diagram, Gene, Locus, Strand};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Arrow polygon for a gene spanning `[start, end]`.
///
/// Seven points normally. When the scaled gene is shorter than the arrow tip the shaft collapses
/// onto the base edge and the duplicate points are dropped, leaving five.
pub fn gene_polygon_points(
    start: Bp,
    end: Bp,
    strand: Strand,
    position: &LinearScale,
    shape: &GeneShape,
) -> Vec<Point> {
    let s = position.apply(start as f64);
    let e = position.apply(end as f64);
    let squeezed = e - s < shape.tip_length;

    let top = shape.tip_height;
    let third = shape.tip_height + shape.body_height;
    let bottom = shape.bottom();
    let mid = bottom / 2.0;

    let (base, tip, shaft) = match strand {
        Strand::Forward => (s, e, e - shape.tip_length),
        Strand::Reverse => (e, s, s + shape.tip_length),
    };
    if squeezed {
        return vec![
            Point::new(base, top),
            Point::new(base, 0.0),
            Point::new(tip, mid),
            Point::new(base, bottom),
            Point::new(base, third),
        ];
    }
    vec![
        Point::new(base, top),
        Point::new(shaft, top),
        Point::new(shaft, 0.0),
        Point::new(tip, mid),
        Point::new(shaft, bottom),
        Point::new(shaft, third),
        Point::new(base, third),
    ]
}

/// SVG `points` attribute value.
pub fn points_attr(points: &[Point]) -> String {
    let mut out = String::new();
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(&mut out, "{},{}", fmt(p.x), fmt(p.y));
    }
    out
}

/// Left-to-right placement of a cluster's loci.
///
/// Each locus' visible left edge starts `spacing` pixels after the previous locus' visible right
/// edge; the returned offset is that edge minus the locus' own scaled visible start.
pub fn compute_locus_layout(
    loci: &[&Locus],
    position: &LinearScale,
    spacing: f64,
) -> Vec<(String, f64)> {
    let mut left = 0.0;
    let mut out = Vec::with_capacity(loci.len());
    for locus in loci {
        let start = position.apply(locus.display.visible_start as f64);
        let end = position.apply(locus.display.visible_end as f64);
        out.push((locus.uid.clone(), left - start));
        left += end - start + spacing;
    }
    out
}

/// Comma separated `name[ (reversed)][:start-end]` for every locus of a cluster.
pub fn locus_text(diagram: &Diagram, cluster: &Cluster, hide_coordinates: bool) -> String {
    diagram
        .loci_of(cluster)
        .map(|locus| {
            let flipped = if locus.display.flipped {
                " (reversed)"
            } else {
                ""
            };
            if hide_coordinates {
                format!("{}{flipped}", locus.name)
            } else {
                format!(
                    "{}{flipped}:{}-{}",
                    locus.name, locus.display.visible_start, locus.display.visible_end
                )
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Uncommitted transforms of entities that are being dragged.
#[derive(Debug, Clone, Default)]
pub struct LiveTransforms {
    /// cluster uid -> row y currently shown.
    pub cluster_y: FxHashMap<String, f64>,
    /// locus uid -> locus offset currently shown.
    pub locus_x: FxHashMap<String, f64>,
}

impl LiveTransforms {
    pub fn is_empty(&self) -> bool {
        self.cluster_y.is_empty() && self.locus_x.is_empty()
    }

    pub fn clear(&mut self) {
        self.cluster_y.clear();
        self.locus_x.clear();
    }
}

/// Edges and row of the two genes of a link, upper gene first.
///
/// `x1`/`x2` are the 5' and 3' edges, so they are swapped for reverse-strand genes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkAnchors {
    pub ax1: f64,
    pub ax2: f64,
    pub ay: f64,
    pub bx1: f64,
    pub bx2: f64,
    pub by: f64,
}

impl LinkAnchors {
    pub fn to_array(&self) -> [f64; 6] {
        [self.ax1, self.ax2, self.ay, self.bx1, self.bx2, self.by]
    }

    fn upper_mid(&self) -> f64 {
        self.ax1 + (self.ax2 - self.ax1) / 2.0
    }

    fn lower_mid(&self) -> f64 {
        self.bx1 + (self.bx2 - self.bx1) / 2.0
    }
}

/// Path data for a link: a ribbon between the two gene spans, or a line between their
/// midpoints. Curved variants bend through the vertical midpoint.
pub fn link_path(anchors: &LinkAnchors, style: &LinkConfig) -> String {
    let LinkAnchors {
        ax1,
        ax2,
        ay,
        bx1,
        bx2,
        by,
    } = *anchors;
    let my = ay + (by - ay) / 2.0;
    let mut d = String::new();
    match (style.as_line, style.straight) {
        (true, true) => {
            let (am, bm) = (anchors.upper_mid(), anchors.lower_mid());
            let _ = write!(&mut d, "M{},{} L{},{}", fmt(am), fmt(ay), fmt(bm), fmt(by));
        }
        (true, false) => {
            let (am, bm) = (anchors.upper_mid(), anchors.lower_mid());
            let _ = write!(
                &mut d,
                "M{},{} C{},{} {},{} {},{}",
                fmt(am),
                fmt(ay),
                fmt(am),
                fmt(my),
                fmt(bm),
                fmt(my),
                fmt(bm),
                fmt(by)
            );
        }
        (false, true) => {
            let _ = write!(
                &mut d,
                "M{},{} L{},{} L{},{} L{},{} L{},{}",
                fmt(ax1),
                fmt(ay),
                fmt(ax2),
                fmt(ay),
                fmt(bx2),
                fmt(by),
                fmt(bx1),
                fmt(by),
                fmt(ax1),
                fmt(ay)
            );
        }
        (false, false) => {
            let _ = write!(
                &mut d,
                "M{},{} L{},{} C{},{} {},{} {},{} L{},{} C{},{} {},{} {},{}",
                fmt(ax1),
                fmt(ay),
                fmt(ax2),
                fmt(ay),
                fmt(ax2),
                fmt(my),
                fmt(bx2),
                fmt(my),
                fmt(bx2),
                fmt(by),
                fmt(bx1),
                fmt(by),
                fmt(bx1),
                fmt(my),
                fmt(ax1),
                fmt(my),
                fmt(ax1),
                fmt(ay)
            );
        }
    }
    d
}

/// Anchor of a link's identity label, `position` of the way from the upper gene to the lower.
pub fn link_label_position(anchors: &LinkAnchors, position: f64) -> Point {
    let (am, bm) = (anchors.upper_mid(), anchors.lower_mid());
    Point::new(
        am + (bm - am) * position,
        anchors.ay + (anchors.by - anchors.ay).abs() * position,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelTransform {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

impl std::fmt::Display for LabelTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "translate({}, {}) rotate({})",
            fmt(self.x),
            fmt(self.y),
            fmt(self.rotation)
        )
    }
}

/// Read-only view used to place entities.
#[derive(Clone, Copy)]
pub struct Placement<'a> {
    pub diagram: &'a Diagram,
    pub scales: &'a ScaleRegistry,
    pub config: &'a ClusterMapConfig,
    pub live: &'a LiveTransforms,
}

impl<'a> Placement<'a> {
    fn cluster_y(&self, uid: &str, snap: bool) -> f64 {
        let settled = *self.scales.cluster_order.get(uid);
        if snap {
            return settled;
        }
        self.live.cluster_y.get(uid).copied().unwrap_or(settled)
    }

    fn locus_x(&self, uid: &str, snap: bool) -> f64 {
        let settled = *self.scales.locus_offset.get(uid);
        if snap {
            return settled;
        }
        self.live.locus_x.get(uid).copied().unwrap_or(settled)
    }

    pub fn gene_points(&self, gene: &Gene) -> Vec<Point> {
        gene_polygon_points(
            gene.display.start,
            gene.display.end,
            gene.display.strand,
            &self.scales.position,
            &self.config.gene.shape,
        )
    }

    /// Anchors of the link between two genes, or `None` unless their clusters sit in adjacent
    /// rows.
    ///
    /// With `snap` the settled registry values are used; otherwise uncommitted drag transforms
    /// take precedence.
    pub fn link_anchors(&self, query: &str, target: &str, snap: bool) -> Option<LinkAnchors> {
        let a = self.diagram.gene(query)?;
        let b = self.diagram.gene(target)?;
        let slot_a = self.diagram.cluster(&a.cluster)?.slot;
        let slot_b = self.diagram.cluster(&b.cluster)?.slot;
        if slot_a.abs_diff(slot_b) != 1 {
            return None;
        }

        let mid = self.config.gene.shape.midpoint();
        let anchors = |g: &Gene| {
            let offset =
                *self.scales.cluster_offset.get(g.cluster.as_str()) + self.locus_x(&g.locus, snap);
            let left = self.scales.x(g.display.start as f64) + offset;
            let right = self.scales.x(g.display.end as f64) + offset;
            let y = self.cluster_y(&g.cluster, snap) + mid;
            match g.display.strand {
                Strand::Forward => (left, right, y),
                Strand::Reverse => (right, left, y),
            }
        };
        let (ax1, ax2, ay) = anchors(a);
        let (bx1, bx2, by) = anchors(b);
        Some(if ay > by {
            LinkAnchors {
                ax1: bx1,
                ax2: bx2,
                ay: by,
                bx1: ax1,
                bx2: ax2,
                by: ay,
            }
        } else {
            LinkAnchors {
                ax1,
                ax2,
                ay,
                bx1,
                bx2,
                by,
            }
        })
    }

    /// Horizontal `[min, max]` of a cluster's visible loci, following loci being dragged.
    pub fn cluster_extent(&self, cluster_uid: &str, ignore_loci: &[&str]) -> Option<(f64, f64)> {
        let cluster = self.diagram.cluster(cluster_uid)?;
        let cluster_offset = *self.scales.cluster_offset.get(cluster_uid);
        self.diagram
            .loci_of(cluster)
            .filter(|locus| !ignore_loci.contains(&locus.uid.as_str()))
            .map(|locus| {
                let offset = cluster_offset + self.locus_x(&locus.uid, false);
                (
                    self.scales.x(locus.display.visible_start as f64) + offset,
                    self.scales.x(locus.display.visible_end as f64) + offset,
                )
            })
            .reduce(|(min, max), (start, end)| (min.min(start), max.max(end)))
    }

    /// Horizontal `[min, max]` over every cluster not in `ignore_clusters`.
    pub fn global_extent(&self, ignore_clusters: &[&str]) -> Option<(f64, f64)> {
        self.extent_where(|cluster| !ignore_clusters.contains(&cluster.uid.as_str()), &[])
    }

    /// Horizontal `[min, max]` of the diagram without one locus, for drag feedback.
    pub fn global_extent_without_locus(&self, locus_uid: &str) -> Option<(f64, f64)> {
        self.extent_where(|_| true, &[locus_uid])
    }

    fn extent_where(
        &self,
        keep: impl Fn(&Cluster) -> bool,
        ignore_loci: &[&str],
    ) -> Option<(f64, f64)> {
        self.diagram
            .clusters()
            .filter(|cluster| keep(cluster))
            .filter_map(|cluster| self.cluster_extent(&cluster.uid, ignore_loci))
            .reduce(|(min, max), (start, end)| (min.min(start), max.max(end)))
    }

    /// Gene midpoint in diagram space.
    pub fn gene_midpoint(&self, gene: &Gene) -> f64 {
        let length = (gene.display.end - gene.display.start) as f64;
        self.scales.x(gene.display.start as f64 + length / 2.0)
            + *self.scales.locus_offset.get(gene.locus.as_str())
            + *self.scales.cluster_offset.get(gene.cluster.as_str())
    }

    pub fn label_transform(&self, gene: &Gene) -> LabelTransform {
        let label = &self.config.gene.label;
        let length = (gene.display.end - gene.display.start) as f64;
        let x = self.scales.x(gene.display.start as f64) + self.scales.x(length) * label.start;
        let y = match label.position {
            LabelPosition::Top => -label.spacing,
            LabelPosition::Bottom => self.config.gene.shape.bottom() + label.spacing,
        };
        let rotation = match label.anchor {
            LabelAnchor::Start | LabelAnchor::Middle => -label.rotation,
            LabelAnchor::End => label.rotation,
        };
        LabelTransform { x, y, rotation }
    }

    /// X of a cluster's name/locus text block, relative to the cluster.
    ///
    /// With aligned labels every cluster's text ends 10px left of the leftmost locus of the
    /// whole diagram; otherwise left of the cluster's own leftmost locus.
    pub fn cluster_info_x(&self, cluster_uid: &str) -> f64 {
        let extent = if self.config.cluster.align_labels {
            self.global_extent(&[])
        } else {
            self.cluster_extent(cluster_uid, &[])
        };
        let min = extent.map(|(min, _)| min).unwrap_or(0.0);
        min - 10.0 - *self.scales.cluster_offset.get(cluster_uid)
    }
}
