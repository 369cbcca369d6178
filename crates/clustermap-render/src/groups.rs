//! Homology groups and link filtering.
//!
//! Groups are the connected components of the link graph over gene uids. They are recomputed on
//! every render and merged into the previous generation so that a renamed, recoloured or hidden
//! group keeps its identity for as long as one of its genes stays linked.

use crate::scales::{OrdinalScale, rainbow};
use clustermap_core::config::LinkConfig;
use clustermap_core::{Diagram, GroupInput, Link};
use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub uid: usize,
    pub label: String,
    pub genes: IndexSet<String>,
    pub colour: String,
    pub hidden: bool,
}

impl Group {
    pub fn contains(&self, gene: &str) -> bool {
        self.genes.contains(gene)
    }
}

/// Default colour of the `index`-th of `count` groups, evenly spaced around the rainbow.
pub fn default_group_colour(index: usize, count: usize) -> String {
    rainbow(index as f64 / count.max(1) as f64)
}

/// Converts saved groups from input data into the previous generation for [`compute_groups`].
pub fn seed_groups(inputs: &[GroupInput]) -> Vec<Group> {
    let count = inputs.len();
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| Group {
            uid: input.uid,
            label: input.label.clone(),
            genes: input.genes.iter().cloned().collect(),
            colour: input
                .colour
                .clone()
                .unwrap_or_else(|| default_group_colour(index, count)),
            hidden: input.hidden,
        })
        .collect()
}

/// Connected components of the link graph, in first-seen order.
pub fn link_components(links: &[Link]) -> Vec<IndexSet<String>> {
    let mut components: Vec<IndexSet<String>> = Vec::new();
    for link in links {
        let pair = [link.query.as_str(), link.target.as_str()];
        let hits: Vec<usize> = components
            .iter()
            .enumerate()
            .filter(|(_, c)| pair.iter().any(|gene| c.contains(*gene)))
            .map(|(i, _)| i)
            .collect();
        match hits.split_first() {
            None => components.push(pair.iter().map(|gene| gene.to_string()).collect()),
            Some((&first, rest)) => {
                for &i in rest.iter().rev() {
                    let merged = components.remove(i);
                    components[first].extend(merged);
                }
                components[first].extend(pair.iter().map(|gene| gene.to_string()));
            }
        }
    }
    components
}

pub fn compute_groups(links: &[Link], previous: &[Group]) -> Vec<Group> {
    compute_groups_with(links, previous, 0, |_| None)
}

/// Like [`compute_groups`]. New groups get uids from `next_uid` on (or past the highest
/// previous uid, whichever is larger); `label_hint` may name a new group from its genes.
pub fn compute_groups_with<F>(
    links: &[Link],
    previous: &[Group],
    next_uid: usize,
    label_hint: F,
) -> Vec<Group>
where
    F: Fn(&IndexSet<String>) -> Option<String>,
{
    let mut groups: Vec<Group> = previous
        .iter()
        .map(|g| Group {
            genes: IndexSet::new(),
            ..g.clone()
        })
        .collect();
    let mut matched = vec![false; groups.len()];
    let mut next_uid = previous
        .iter()
        .map(|g| g.uid + 1)
        .max()
        .unwrap_or(0)
        .max(next_uid);

    for component in link_components(links) {
        let owner = previous
            .iter()
            .position(|g| g.genes.iter().any(|gene| component.contains(gene)));
        match owner {
            Some(index) => {
                matched[index] = true;
                groups[index].genes.extend(component);
            }
            None => {
                let uid = next_uid;
                next_uid += 1;
                let label = label_hint(&component).unwrap_or_else(|| format!("Group {uid}"));
                groups.push(Group {
                    uid,
                    label,
                    genes: component,
                    colour: String::new(),
                    hidden: false,
                });
                matched.push(true);
            }
        }
    }

    let mut keep = matched.into_iter();
    groups.retain(|_| keep.next().unwrap_or(false));

    let count = groups.len();
    for (index, group) in groups.iter_mut().enumerate() {
        if group.colour.is_empty() {
            group.colour = default_group_colour(index, count);
        }
    }
    tracing::debug!(groups = count, next_uid, "computed groups");
    groups
}

/// Which links get joined into the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkFilter {
    pub best_only: bool,
    pub threshold: f64,
}

impl LinkFilter {
    pub fn from_config(config: &LinkConfig) -> Self {
        Self {
            best_only: config.best_only,
            threshold: config.threshold,
        }
    }

    pub fn apply<'a>(
        &self,
        links: &'a [Link],
        diagram: &Diagram,
        group: &OrdinalScale<String, Option<usize>>,
    ) -> Vec<&'a Link> {
        if self.best_only {
            filter_best_links(links, diagram, group, self.threshold)
        } else {
            links
                .iter()
                .filter(|link| is_grouped(link, group))
                .collect()
        }
    }
}

fn is_grouped(link: &Link, group: &OrdinalScale<String, Option<usize>>) -> bool {
    group.get(link.query.as_str()).is_some() && group.get(link.target.as_str()).is_some()
}

/// Keeps, for every unordered cluster pair, only links that share no gene with a better link
/// between the same two clusters, then drops links with `identity <= threshold`.
///
/// Ties keep input order; of two equal links sharing a gene, the first one wins.
pub fn filter_best_links<'a>(
    links: &'a [Link],
    diagram: &Diagram,
    group: &OrdinalScale<String, Option<usize>>,
    threshold: f64,
) -> Vec<&'a Link> {
    let mut sorted: Vec<&Link> = links.iter().filter(|l| is_grouped(l, group)).collect();
    sorted.sort_by(|a, b| b.identity.total_cmp(&a.identity));

    let mut admitted: FxHashMap<(&str, &str), Vec<&Link>> = FxHashMap::default();
    let mut out = Vec::new();
    for link in sorted {
        let (Some(query), Some(target)) = (diagram.gene(&link.query), diagram.gene(&link.target))
        else {
            continue;
        };
        let key = if query.cluster <= target.cluster {
            (query.cluster.as_str(), target.cluster.as_str())
        } else {
            (target.cluster.as_str(), query.cluster.as_str())
        };
        let kept = admitted.entry(key).or_default();
        if kept.iter().any(|other| other.shares_gene(link)) {
            continue;
        }
        kept.push(link);
        out.push(link);
    }
    out.retain(|link| link.identity > threshold);
    out
}
