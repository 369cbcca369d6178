//! Input data shapes and the uid-indexed entity store.
//!
//! Source coordinates loaded from input are never mutated. Resize and flip operations only touch
//! the per-entity display state ([`LocusDisplay`], [`GeneDisplay`]), so
//! [`Diagram::reset_display`] can always recover the original view.

use crate::{Error, Result};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Base-pair coordinate.
pub type Bp = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

impl TryFrom<i64> for Strand {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Forward),
            -1 => Ok(Self::Reverse),
            other => Err(format!("invalid strand {other}, expected 1 or -1")),
        }
    }
}

impl From<Strand> for i64 {
    fn from(value: Strand) -> Self {
        match value {
            Strand::Forward => 1,
            Strand::Reverse => -1,
        }
    }
}

mod uid {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawUid {
        Text(String),
        Int(i64),
    }

    impl From<RawUid> for String {
        fn from(value: RawUid) -> Self {
            match value {
                RawUid::Text(s) => s,
                RawUid::Int(i) => i.to_string(),
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(RawUid::deserialize(d)?.into())
    }

    pub fn deserialize_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<RawUid>::deserialize(d)?.map(Into::into))
    }
}

/// Top-level input document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterMapData {
    pub clusters: Vec<ClusterInput>,
    #[serde(default)]
    pub links: Vec<LinkInput>,
    /// Previously saved groups (labels, colours, hidden flags) to merge with.
    #[serde(default)]
    pub groups: Vec<GroupInput>,
}

impl ClusterMapData {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterInput {
    #[serde(deserialize_with = "uid::deserialize")]
    pub uid: String,
    pub name: String,
    pub loci: Vec<LocusInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocusInput {
    #[serde(deserialize_with = "uid::deserialize")]
    pub uid: String,
    pub name: String,
    pub start: Bp,
    pub end: Bp,
    pub genes: Vec<GeneInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneInput {
    #[serde(deserialize_with = "uid::deserialize")]
    pub uid: String,
    #[serde(default)]
    pub name: Option<String>,
    pub start: Bp,
    pub end: Bp,
    pub strand: Strand,
    /// Group name hint; used as the label of a newly allocated group when every gene of the
    /// group agrees on it.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub names: IndexMap<String, String>,
    #[serde(default)]
    pub colour: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneRef {
    #[serde(deserialize_with = "uid::deserialize")]
    pub uid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkInput {
    #[serde(default, deserialize_with = "uid::deserialize_opt")]
    pub uid: Option<String>,
    pub query: GeneRef,
    pub target: GeneRef,
    pub identity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInput {
    pub uid: usize,
    pub label: String,
    pub genes: Vec<String>,
    #[serde(default)]
    pub colour: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub uid: String,
    pub name: String,
    /// Locus uids, left to right.
    pub loci: Vec<String>,
    /// Vertical rank (0-based).
    pub slot: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocusDisplay {
    pub visible_start: Bp,
    pub visible_end: Bp,
    pub flipped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Locus {
    pub uid: String,
    pub name: String,
    pub cluster: String,
    pub start: Bp,
    pub end: Bp,
    /// Gene uids in input order.
    pub genes: Vec<String>,
    pub display: LocusDisplay,
}

impl Locus {
    fn source_display(&self) -> LocusDisplay {
        LocusDisplay {
            visible_start: self.start,
            visible_end: self.end,
            flipped: false,
        }
    }

    /// Reflects a coordinate about the locus bounds.
    pub fn reflect(&self, bp: Bp) -> Bp {
        self.start + self.end - bp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeneDisplay {
    pub start: Bp,
    pub end: Bp,
    pub strand: Strand,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Gene {
    pub uid: String,
    pub name: Option<String>,
    pub locus: String,
    pub cluster: String,
    pub start: Bp,
    pub end: Bp,
    pub strand: Strand,
    pub label: Option<String>,
    pub names: IndexMap<String, String>,
    pub colour: Option<String>,
    pub group_hint: Option<String>,
    pub display: GeneDisplay,
}

impl Gene {
    fn source_display(&self) -> GeneDisplay {
        GeneDisplay {
            start: self.start,
            end: self.end,
            strand: self.strand,
            visible: true,
        }
    }

    /// Text shown next to the gene glyph. `name_key` selects the fallback identifier when no
    /// explicit label was set.
    pub fn label_text(&self, name_key: &str) -> &str {
        if let Some(label) = self.label.as_deref() {
            return label;
        }
        match name_key {
            "uid" => &self.uid,
            "name" => self.name.as_deref().unwrap_or(&self.uid),
            key => self.names.get(key).map(String::as_str).unwrap_or(&self.uid),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub uid: String,
    pub query: String,
    pub target: String,
    pub identity: f64,
}

impl Link {
    /// Uid derived from the two gene uids, sorted and joined with `-`.
    pub fn canonical_uid(a: &str, b: &str) -> String {
        if a <= b {
            format!("{a}-{b}")
        } else {
            format!("{b}-{a}")
        }
    }

    pub fn touches(&self, gene: &str) -> bool {
        self.query == gene || self.target == gene
    }

    pub fn shares_gene(&self, other: &Link) -> bool {
        self.touches(&other.query) || self.touches(&other.target)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagram {
    clusters: IndexMap<String, Cluster>,
    loci: FxHashMap<String, Locus>,
    genes: FxHashMap<String, Gene>,
    links: Vec<Link>,
    groups: Vec<GroupInput>,
}

impl Diagram {
    pub fn from_data(data: ClusterMapData) -> Result<Self> {
        let mut diagram = Self::default();

        for (slot, cluster) in data.clusters.into_iter().enumerate() {
            if diagram.clusters.contains_key(&cluster.uid) {
                return Err(Error::DuplicateUid {
                    kind: "cluster",
                    uid: cluster.uid,
                });
            }
            let mut locus_uids = Vec::with_capacity(cluster.loci.len());
            for locus in cluster.loci {
                locus_uids.push(diagram.insert_locus(&cluster.uid, locus)?);
            }
            diagram.clusters.insert(
                cluster.uid.clone(),
                Cluster {
                    uid: cluster.uid,
                    name: cluster.name,
                    loci: locus_uids,
                    slot,
                },
            );
        }

        // uid -> (index into `links`, whether the uid was derived from the gene pair).
        let mut seen_links: FxHashMap<String, (usize, bool)> = FxHashMap::default();
        for link in data.links {
            for gene in [&link.query.uid, &link.target.uid] {
                if !diagram.genes.contains_key(gene) {
                    return Err(Error::UnknownGene {
                        link: link.uid.clone().unwrap_or_else(|| {
                            Link::canonical_uid(&link.query.uid, &link.target.uid)
                        }),
                        gene: gene.clone(),
                    });
                }
            }
            let derived = link.uid.is_none();
            let uid = link
                .uid
                .unwrap_or_else(|| Link::canonical_uid(&link.query.uid, &link.target.uid));
            if !(0.0..=1.0).contains(&link.identity) {
                return Err(Error::InvalidEntity {
                    kind: "link",
                    uid,
                    message: format!("identity {} is outside [0, 1]", link.identity),
                });
            }
            match seen_links.get(&uid) {
                // The same gene pair listed in both directions: keep the better hit.
                Some(&(index, true)) if derived => {
                    let kept = &mut diagram.links[index];
                    tracing::warn!(link = %uid, "ignoring repeated link between the same genes");
                    if link.identity > kept.identity {
                        kept.query = link.query.uid;
                        kept.target = link.target.uid;
                        kept.identity = link.identity;
                    }
                    continue;
                }
                Some(_) => return Err(Error::DuplicateUid { kind: "link", uid }),
                None => {
                    seen_links.insert(uid.clone(), (diagram.links.len(), derived));
                }
            }
            diagram.links.push(Link {
                uid,
                query: link.query.uid,
                target: link.target.uid,
                identity: link.identity,
            });
        }

        diagram.groups = data.groups;
        tracing::debug!(
            clusters = diagram.clusters.len(),
            loci = diagram.loci.len(),
            genes = diagram.genes.len(),
            links = diagram.links.len(),
            "loaded diagram"
        );
        Ok(diagram)
    }

    fn insert_locus(&mut self, cluster: &str, locus: LocusInput) -> Result<String> {
        if self.loci.contains_key(&locus.uid) {
            return Err(Error::DuplicateUid {
                kind: "locus",
                uid: locus.uid,
            });
        }
        if locus.start > locus.end {
            return Err(Error::InvalidEntity {
                kind: "locus",
                uid: locus.uid,
                message: format!("start {} is after end {}", locus.start, locus.end),
            });
        }

        let mut gene_uids = Vec::with_capacity(locus.genes.len());
        for gene in locus.genes {
            if self.genes.contains_key(&gene.uid) {
                return Err(Error::DuplicateUid {
                    kind: "gene",
                    uid: gene.uid,
                });
            }
            if gene.start > gene.end {
                return Err(Error::InvalidEntity {
                    kind: "gene",
                    uid: gene.uid,
                    message: format!("start {} is after end {}", gene.start, gene.end),
                });
            }
            let entry = Gene {
                uid: gene.uid.clone(),
                name: gene.name,
                locus: locus.uid.clone(),
                cluster: cluster.to_string(),
                start: gene.start,
                end: gene.end,
                strand: gene.strand,
                label: gene.label,
                names: gene.names,
                colour: gene.colour,
                group_hint: gene.group,
                display: GeneDisplay {
                    start: gene.start,
                    end: gene.end,
                    strand: gene.strand,
                    visible: true,
                },
            };
            gene_uids.push(gene.uid.clone());
            self.genes.insert(gene.uid, entry);
        }

        let entry = Locus {
            uid: locus.uid.clone(),
            name: locus.name,
            cluster: cluster.to_string(),
            start: locus.start,
            end: locus.end,
            genes: gene_uids,
            display: LocusDisplay {
                visible_start: locus.start,
                visible_end: locus.end,
                flipped: false,
            },
        };
        self.loci.insert(locus.uid.clone(), entry);
        Ok(locus.uid)
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Clusters in input order.
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn cluster(&self, uid: &str) -> Option<&Cluster> {
        self.clusters.get(uid)
    }

    pub fn cluster_mut(&mut self, uid: &str) -> Option<&mut Cluster> {
        self.clusters.get_mut(uid)
    }

    pub fn clusters_mut(&mut self) -> impl Iterator<Item = &mut Cluster> {
        self.clusters.values_mut()
    }

    /// Clusters ordered by their current slot.
    pub fn clusters_by_slot(&self) -> Vec<&Cluster> {
        let mut clusters: Vec<&Cluster> = self.clusters.values().collect();
        clusters.sort_by_key(|c| c.slot);
        clusters
    }

    pub fn locus(&self, uid: &str) -> Option<&Locus> {
        self.loci.get(uid)
    }

    pub fn loci_of<'a>(&'a self, cluster: &'a Cluster) -> impl Iterator<Item = &'a Locus> + 'a {
        cluster.loci.iter().filter_map(|uid| self.loci.get(uid))
    }

    /// Every locus, grouped by cluster in input order.
    pub fn loci(&self) -> impl Iterator<Item = &Locus> {
        self.clusters.values().flat_map(|c| self.loci_of(c))
    }

    pub fn gene(&self, uid: &str) -> Option<&Gene> {
        self.genes.get(uid)
    }

    pub fn gene_mut(&mut self, uid: &str) -> Option<&mut Gene> {
        self.genes.get_mut(uid)
    }

    pub fn genes_of<'a>(&'a self, locus: &'a Locus) -> impl Iterator<Item = &'a Gene> + 'a {
        locus.genes.iter().filter_map(|uid| self.genes.get(uid))
    }

    pub fn gene_count(&self) -> usize {
        self.genes.len()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn input_groups(&self) -> &[GroupInput] {
        &self.groups
    }

    /// Sets the visible bounds of a locus and recomputes which of its genes are displayed.
    ///
    /// Bounds are clamped to the locus extent. Returns `false` (and changes nothing) when the
    /// locus is unknown or the bounds would cross.
    pub fn set_visible_bounds(&mut self, locus_uid: &str, start: Bp, end: Bp) -> bool {
        let Some(locus) = self.loci.get_mut(locus_uid) else {
            return false;
        };
        let start = start.clamp(locus.start, locus.end);
        let end = end.clamp(locus.start, locus.end);
        if start > end {
            return false;
        }
        locus.display.visible_start = start;
        locus.display.visible_end = end;
        for uid in &locus.genes {
            if let Some(gene) = self.genes.get_mut(uid) {
                gene.display.visible = gene.display.start >= start && gene.display.end <= end;
            }
        }
        true
    }

    /// Reflects the locus and all of its genes about the locus bounds.
    ///
    /// Returns the display state before the flip.
    pub fn flip_locus(&mut self, locus_uid: &str) -> Option<LocusDisplay> {
        let locus = self.loci.get_mut(locus_uid)?;
        let before = locus.display;
        let (vs, ve) = (before.visible_start, before.visible_end);
        locus.display = LocusDisplay {
            visible_start: locus.reflect(ve),
            visible_end: locus.reflect(vs),
            flipped: !before.flipped,
        };
        for uid in &locus.genes {
            if let Some(gene) = self.genes.get_mut(uid) {
                let (s, e) = (gene.display.start, gene.display.end);
                gene.display.start = locus.reflect(e);
                gene.display.end = locus.reflect(s);
                gene.display.strand = gene.display.strand.reversed();
            }
        }
        Some(before)
    }

    /// Restores every locus and gene to its source coordinates.
    pub fn reset_display(&mut self) {
        for locus in self.loci.values_mut() {
            locus.display = locus.source_display();
        }
        for gene in self.genes.values_mut() {
            gene.display = gene.source_display();
        }
    }
}
