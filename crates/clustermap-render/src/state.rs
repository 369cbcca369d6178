//! Everything an interactive diagram mutates: entities, config, scales, groups and drag feedback.

use crate::geometry::{LiveTransforms, Placement};
use crate::groups::{Group, LinkFilter, compute_groups_with, seed_groups};
use crate::scales::ScaleRegistry;
use clustermap_core::{ClusterMapConfig, Diagram, Link};
use indexmap::IndexSet;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct DiagramState {
    pub config: ClusterMapConfig,
    pub diagram: Diagram,
    pub scales: ScaleRegistry,
    pub groups: Vec<Group>,
    /// Lowest uid a new group may take; never decreases, so dropped group uids are not reused.
    pub next_group_uid: usize,
    pub live: LiveTransforms,
    /// link uid -> user-set opacity.
    pub link_opacity: FxHashMap<String, f64>,
}

impl DiagramState {
    pub fn new(diagram: Diagram, config: ClusterMapConfig) -> Self {
        let groups = seed_groups(diagram.input_groups());
        let mut state = Self {
            scales: ScaleRegistry::new(config.plot.scale_factor),
            config,
            diagram,
            groups,
            next_group_uid: 0,
            live: LiveTransforms::default(),
            link_opacity: FxHashMap::default(),
        };
        state.refresh();
        state
    }

    /// Replaces the entities while keeping scales, groups and link opacities whose uids still
    /// exist.
    pub fn replace_diagram(&mut self, mut diagram: Diagram) {
        let previous: Vec<String> = self
            .diagram
            .clusters_by_slot()
            .into_iter()
            .map(|c| c.uid.clone())
            .collect();
        let fresh: Vec<String> = diagram
            .clusters()
            .filter(|c| !previous.contains(&c.uid))
            .map(|c| c.uid.clone())
            .collect();
        let mut slot = 0;
        for uid in previous.iter().chain(&fresh) {
            if let Some(cluster) = diagram.cluster_mut(uid) {
                cluster.slot = slot;
                slot += 1;
            }
        }

        if self.groups.is_empty() {
            self.groups = seed_groups(diagram.input_groups());
        }
        self.link_opacity
            .retain(|uid, _| diagram.links().iter().any(|link| &link.uid == uid));
        self.diagram = diagram;
        self.live.clear();
        self.refresh();
    }

    /// Brings the scales and groups in line with the entities and config.
    pub fn refresh(&mut self) {
        self.scales.set_position_range(self.config.plot.scale_factor);
        self.scales
            .ensure_default_domains(&mut self.diagram, &self.config);
        let diagram = &self.diagram;
        let threshold = self.config.link.threshold;
        let links: Vec<Link> = diagram
            .links()
            .iter()
            .filter(|link| link.identity >= threshold)
            .cloned()
            .collect();
        self.groups = compute_groups_with(&links, &self.groups, self.next_group_uid, |genes| {
            shared_group_hint(diagram, genes)
        });
        self.next_group_uid = self
            .groups
            .iter()
            .map(|g| g.uid + 1)
            .fold(self.next_group_uid, usize::max);
        self.scales.apply_groups(&self.groups);
    }

    pub fn placement(&self) -> Placement<'_> {
        Placement {
            diagram: &self.diagram,
            scales: &self.scales,
            config: &self.config,
            live: &self.live,
        }
    }

    /// Links that get an element in the scene.
    pub fn visible_links(&self) -> Vec<&Link> {
        LinkFilter::from_config(&self.config.link).apply(
            self.diagram.links(),
            &self.diagram,
            &self.scales.group,
        )
    }

    /// Drawn opacity of a link: 0 when links are switched off, the genes sit in non-adjacent
    /// rows, the identity is at or below the threshold, or either gene is trimmed away.
    pub fn link_opacity(&self, link: &Link) -> f64 {
        if !self.config.link.show || link.identity <= self.config.link.threshold {
            return 0.0;
        }
        let hidden = |uid: &str| {
            self.diagram
                .gene(uid)
                .is_none_or(|gene| !gene.display.visible)
        };
        if hidden(&link.query) || hidden(&link.target) {
            return 0.0;
        }
        if self
            .placement()
            .link_anchors(&link.query, &link.target, false)
            .is_none()
        {
            return 0.0;
        }
        self.link_opacity.get(&link.uid).copied().unwrap_or(1.0)
    }

    pub fn group(&self, uid: usize) -> Option<&Group> {
        self.groups.iter().find(|g| g.uid == uid)
    }

    pub fn group_mut(&mut self, uid: usize) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.uid == uid)
    }

    /// Groups listed in the legend: not hidden, and with at least one displayed gene.
    pub fn legend_groups(&self) -> Vec<&Group> {
        self.groups
            .iter()
            .filter(|group| !group.hidden)
            .filter(|group| {
                group.genes.iter().any(|uid| {
                    self.diagram
                        .gene(uid)
                        .is_some_and(|gene| gene.display.visible)
                })
            })
            .collect()
    }

    /// Fill colour of a gene: explicit colour, else its group colour.
    pub fn gene_fill(&self, uid: &str) -> String {
        self.diagram
            .gene(uid)
            .and_then(|gene| gene.colour.clone())
            .unwrap_or_else(|| self.scales.group_colour(uid).to_string())
    }
}

/// Group name shared by every gene of a component, if they all carry the same one.
fn shared_group_hint(diagram: &Diagram, genes: &IndexSet<String>) -> Option<String> {
    let mut hints = genes
        .iter()
        .map(|uid| diagram.gene(uid).and_then(|gene| gene.group_hint.as_deref()));
    let first = hints.next().flatten()?;
    hints
        .all(|hint| hint == Some(first))
        .then(|| first.to_string())
}
