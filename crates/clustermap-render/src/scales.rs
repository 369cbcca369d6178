//! The scale registry: every coordinate and colour mapping the diagram is drawn with.
//!
//! Offsets (`cluster_offset`, `locus_offset`) are stored in pixels of the current position
//! scale. Whenever the position range changes they are re-expressed through the old scale's
//! inverse, so user-made layout survives zooming.

use crate::geometry::compute_locus_layout;
use crate::groups::Group;
use clustermap_core::{ClusterMapConfig, Diagram};
use indexmap::{Equivalent, IndexMap};
use serde::Serialize;
use std::hash::Hash;

/// Base pairs covered by one unit of the pixels-per-kb scale factor.
pub const POSITION_DOMAIN: [f64; 2] = [0.0, 1000.0];

/// Colour of genes and groups with no assigned group.
pub const UNGROUPED_COLOUR: &str = "#bbb";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearScale {
    domain: [f64; 2],
    range: [f64; 2],
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self { domain, range }
    }

    /// bp -> px with `px_per_kb` pixels per 1000 bp.
    pub fn position(px_per_kb: f64) -> Self {
        Self::new(POSITION_DOMAIN, [0.0, px_per_kb])
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    pub fn with_range(self, range: [f64; 2]) -> Self {
        Self { range, ..self }
    }

    pub fn apply(&self, value: f64) -> f64 {
        let [d0, d1] = self.domain;
        let [r0, r1] = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, value: f64) -> f64 {
        let [d0, d1] = self.domain;
        let [r0, r1] = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (value - r0) / (r1 - r0) * (d1 - d0)
    }
}

/// Discrete key -> value mapping with a fallback for unknown keys. Keys keep insertion order,
/// which doubles as the scale's domain order.
#[derive(Debug, Clone)]
pub struct OrdinalScale<K, V> {
    entries: IndexMap<K, V>,
    unknown: V,
}

impl<K: Hash + Eq, V> OrdinalScale<K, V> {
    pub fn new(unknown: V) -> Self {
        Self {
            entries: IndexMap::new(),
            unknown,
        }
    }

    pub fn get<Q>(&self, key: &Q) -> &V
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.get(key).unwrap_or(&self.unknown)
    }

    pub fn try_get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.get(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.contains_key(key)
    }

    /// Writes one range value, adding the key to the domain if needed.
    pub fn set(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.get_mut(key)
    }

    pub fn unknown(&self) -> &V {
        &self.unknown
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn domain(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn range(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut()
    }

    pub fn retain(&mut self, keep: impl FnMut(&K, &mut V) -> bool) {
        self.entries.retain(keep);
    }

    /// Replaces domain and range at once.
    pub fn replace(&mut self, entries: impl IntoIterator<Item = (K, V)>) {
        self.entries = entries.into_iter().collect();
    }
}

/// Identity -> greyscale fill.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreScale;

impl ScoreScale {
    pub fn colour(&self, identity: f64) -> String {
        let t = if identity.is_finite() {
            identity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        format!("#{:x}", colorous::GREYS.eval_continuous(t))
    }
}

/// Cyclic rainbow colour at `t` in `[0, 1]`.
pub fn rainbow(t: f64) -> String {
    format!("#{:x}", colorous::RAINBOW.eval_continuous(t.clamp(0.0, 1.0)))
}

/// The uid-keyed pixel scales a single gesture may write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetScale {
    ClusterOrder,
    ClusterOffset,
    LocusOffset,
}

#[derive(Debug, Clone)]
pub struct ScaleRegistry {
    pub position: LinearScale,
    /// cluster uid -> row y.
    pub cluster_order: OrdinalScale<String, f64>,
    /// cluster uid -> horizontal offset.
    pub cluster_offset: OrdinalScale<String, f64>,
    /// locus uid -> horizontal offset within its cluster.
    pub locus_offset: OrdinalScale<String, f64>,
    /// gene uid -> group uid.
    pub group: OrdinalScale<String, Option<usize>>,
    /// group uid -> colour.
    pub colour: OrdinalScale<usize, String>,
    /// group uid -> display label.
    pub name: OrdinalScale<usize, String>,
    pub score: ScoreScale,
}

impl ScaleRegistry {
    pub fn new(px_per_kb: f64) -> Self {
        Self {
            position: LinearScale::position(px_per_kb),
            cluster_order: OrdinalScale::new(0.0),
            cluster_offset: OrdinalScale::new(0.0),
            locus_offset: OrdinalScale::new(0.0),
            group: OrdinalScale::new(None),
            colour: OrdinalScale::new(UNGROUPED_COLOUR.to_string()),
            name: OrdinalScale::new("None".to_string()),
            score: ScoreScale,
        }
    }

    /// Position scale shorthand.
    pub fn x(&self, bp: f64) -> f64 {
        self.position.apply(bp)
    }

    /// Changes pixels-per-kb and re-expresses every offset against the new scale.
    ///
    /// Returns the previous position scale.
    pub fn set_position_range(&mut self, px_per_kb: f64) -> LinearScale {
        let old = self.position;
        self.position = old.with_range([0.0, px_per_kb]);
        if old != self.position {
            self.rescale_offsets(&old);
        }
        old
    }

    pub fn rescale_offsets(&mut self, old: &LinearScale) {
        let new = self.position;
        for value in self
            .cluster_offset
            .values_mut()
            .chain(self.locus_offset.values_mut())
        {
            *value = new.apply(old.invert(*value));
        }
    }

    /// Point write of one entry, leaving every other entry of the scale untouched.
    pub fn update_scale_range(&mut self, scale: OffsetScale, uid: &str, value: f64) {
        let target = match scale {
            OffsetScale::ClusterOrder => &mut self.cluster_order,
            OffsetScale::ClusterOffset => &mut self.cluster_offset,
            OffsetScale::LocusOffset => &mut self.locus_offset,
        };
        target.set(uid.to_string(), value);
    }

    /// Vertical distance between adjacent cluster rows.
    pub fn row_pitch(config: &ClusterMapConfig) -> f64 {
        config.cluster.spacing + config.gene.shape.bottom()
    }

    /// Y of the lowest cluster row.
    pub fn total_height(&self) -> f64 {
        self.cluster_order.range().copied().fold(0.0, f64::max)
    }

    /// Seeds missing cluster order, cluster offset and locus offset entries and drops entries of
    /// entities that no longer exist. Existing entries are never overwritten.
    ///
    /// Once seeded, rows follow the clusters' slots; the vertical range is refreshed and slots
    /// are renumbered densely.
    pub fn ensure_default_domains(&mut self, diagram: &mut Diagram, config: &ClusterMapConfig) {
        let order: Vec<String> = if self.cluster_order.is_empty() {
            diagram.clusters().map(|c| c.uid.clone()).collect()
        } else {
            // Slots are authoritative: a reorder drag swaps them before the domain is rebuilt.
            diagram
                .clusters_by_slot()
                .into_iter()
                .map(|c| c.uid.clone())
                .collect()
        };
        self.set_cluster_order(diagram, order, config);

        self.cluster_offset
            .retain(|uid, _| diagram.cluster(uid.as_str()).is_some());
        for cluster in diagram.clusters() {
            if !self.cluster_offset.contains(cluster.uid.as_str()) {
                self.cluster_offset.set(cluster.uid.clone(), 0.0);
            }
        }

        self.locus_offset
            .retain(|uid, _| diagram.locus(uid.as_str()).is_some());
        for cluster in diagram.clusters() {
            let missing = cluster
                .loci
                .iter()
                .any(|uid| !self.locus_offset.contains(uid.as_str()));
            if !missing {
                continue;
            }
            let loci: Vec<_> = diagram.loci_of(cluster).collect();
            for (uid, offset) in compute_locus_layout(&loci, &self.position, config.locus.spacing)
            {
                if !self.locus_offset.contains(uid.as_str()) {
                    self.locus_offset.set(uid, offset);
                }
            }
        }
    }

    /// Rebuilds the cluster order domain from the clusters' current slots.
    pub fn rebuild_cluster_order(&mut self, diagram: &mut Diagram, config: &ClusterMapConfig) {
        let order: Vec<String> = diagram
            .clusters_by_slot()
            .into_iter()
            .map(|c| c.uid.clone())
            .collect();
        self.set_cluster_order(diagram, order, config);
    }

    fn set_cluster_order(
        &mut self,
        diagram: &mut Diagram,
        order: Vec<String>,
        config: &ClusterMapConfig,
    ) {
        let pitch = Self::row_pitch(config);
        for (slot, uid) in order.iter().enumerate() {
            if let Some(cluster) = diagram.cluster_mut(uid) {
                cluster.slot = slot;
            }
        }
        self.cluster_order.replace(
            order
                .into_iter()
                .enumerate()
                .map(|(slot, uid)| (uid, slot as f64 * pitch)),
        );
    }

    /// Derives the group, colour and name scales. Hidden groups stay out of the group and
    /// colour domains, so their genes fall back to the ungrouped colour.
    pub fn apply_groups(&mut self, groups: &[Group]) {
        self.group.replace(groups.iter().filter(|g| !g.hidden).flat_map(|g| {
            g.genes.iter().map(move |gene| (gene.clone(), Some(g.uid)))
        }));
        self.colour.replace(
            groups
                .iter()
                .filter(|g| !g.hidden)
                .map(|g| (g.uid, g.colour.clone())),
        );
        self.name
            .replace(groups.iter().map(|g| (g.uid, g.label.clone())));
    }

    pub fn group_of(&self, gene: &str) -> Option<usize> {
        *self.group.get(gene)
    }

    /// Fill colour of a gene's group (or the ungrouped colour).
    pub fn group_colour(&self, gene: &str) -> &str {
        match self.group_of(gene) {
            Some(group) => self.colour.get(&group),
            None => self.colour.unknown(),
        }
    }
}
