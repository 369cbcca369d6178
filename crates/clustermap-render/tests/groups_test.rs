use clustermap_core::{ClusterMapConfig, ClusterMapData, Diagram, GroupInput, Link};
use clustermap_render::groups::{compute_groups_with, link_components, seed_groups};
use clustermap_render::scales::UNGROUPED_COLOUR;
use clustermap_render::{DiagramState, LinkFilter, compute_groups, filter_best_links};
use serde_json::json;

fn link(query: &str, target: &str, identity: f64) -> Link {
    Link {
        uid: Link::canonical_uid(query, target),
        query: query.to_string(),
        target: target.to_string(),
        identity,
    }
}

fn two_by_two() -> DiagramState {
    let data: ClusterMapData = serde_json::from_value(json!({
        "clusters": [
            { "uid": "A", "name": "A", "loci": [
                { "uid": "A1", "name": "a", "start": 0, "end": 2000, "genes": [
                    { "uid": "a1", "start": 0, "end": 900, "strand": 1 },
                    { "uid": "a2", "start": 1000, "end": 2000, "strand": 1 }
                ]}
            ]},
            { "uid": "B", "name": "B", "loci": [
                { "uid": "B1", "name": "b", "start": 0, "end": 2000, "genes": [
                    { "uid": "b1", "start": 0, "end": 900, "strand": 1 },
                    { "uid": "b2", "start": 1000, "end": 2000, "strand": 1 }
                ]}
            ]}
        ],
        "links": [
            { "query": { "uid": "a1" }, "target": { "uid": "b1" }, "identity": 0.9 },
            { "query": { "uid": "a1" }, "target": { "uid": "b2" }, "identity": 0.8 },
            { "query": { "uid": "a2" }, "target": { "uid": "b2" }, "identity": 0.7 },
            { "query": { "uid": "a2" }, "target": { "uid": "b1" }, "identity": 0.95 }
        ]
    }))
    .expect("parse ok");
    DiagramState::new(
        Diagram::from_data(data).expect("load ok"),
        ClusterMapConfig::default(),
    )
}

fn linked_pairs(links: serde_json::Value, threshold: f64) -> DiagramState {
    let data: ClusterMapData = serde_json::from_value(json!({
        "clusters": [
            { "uid": "A", "name": "A", "loci": [
                { "uid": "A1", "name": "a", "start": 0, "end": 2000, "genes": [
                    { "uid": "a1", "start": 0, "end": 900, "strand": 1 },
                    { "uid": "a2", "start": 1000, "end": 2000, "strand": 1 }
                ]}
            ]},
            { "uid": "B", "name": "B", "loci": [
                { "uid": "B1", "name": "b", "start": 0, "end": 2000, "genes": [
                    { "uid": "b1", "start": 0, "end": 900, "strand": 1 },
                    { "uid": "b2", "start": 1000, "end": 2000, "strand": 1 }
                ]}
            ]}
        ],
        "links": links
    }))
    .expect("parse ok");
    let mut config = ClusterMapConfig::default();
    config.link.threshold = threshold;
    DiagramState::new(Diagram::from_data(data).expect("load ok"), config)
}

#[test]
fn shared_genes_merge_transitively() {
    let links = [link("g1", "g2", 0.5), link("g2", "g3", 0.5)];
    let groups = compute_groups(&links, &[]);
    assert_eq!(groups.len(), 1);
    let genes: Vec<&str> = groups[0].genes.iter().map(String::as_str).collect();
    assert_eq!(genes, ["g1", "g2", "g3"]);
    assert_eq!(groups[0].uid, 0);
    assert_eq!(groups[0].label, "Group 0");
    assert!(groups[0].colour.starts_with('#'));
}

#[test]
fn components_bridge_previously_separate_sets() {
    let links = [
        link("a", "b", 0.5),
        link("c", "d", 0.5),
        link("e", "f", 0.5),
        link("b", "c", 0.5),
    ];
    let components = link_components(&links);
    assert_eq!(components.len(), 2);
    assert_eq!(components[0].len(), 4);
    assert!(components[1].contains("e"));
}

#[test]
fn groups_keep_identity_across_recomputation() {
    let first = compute_groups(&[link("g1", "g2", 0.5), link("g5", "g6", 0.5)], &[]);
    let mut edited = first.clone();
    edited[0].label = "PKS".to_string();
    edited[0].colour = "#ff0000".to_string();
    edited[1].hidden = true;

    let second = compute_groups(
        &[link("g1", "g4", 0.5), link("g6", "g7", 0.5), link("x", "y", 0.5)],
        &edited,
    );
    assert_eq!(second.len(), 3);

    let pks = second.iter().find(|g| g.contains("g1")).unwrap();
    assert_eq!(pks.uid, edited[0].uid);
    assert_eq!(pks.label, "PKS");
    assert_eq!(pks.colour, "#ff0000");
    assert!(pks.contains("g4"));
    assert!(!pks.contains("g2"));

    let hidden = second.iter().find(|g| g.contains("g6")).unwrap();
    assert_eq!(hidden.uid, edited[1].uid);
    assert!(hidden.hidden);

    let fresh = second.iter().find(|g| g.contains("x")).unwrap();
    assert_eq!(fresh.uid, 2);
    assert_eq!(fresh.label, "Group 2");
}

#[test]
fn groups_without_linked_genes_are_dropped() {
    let first = compute_groups(&[link("g1", "g2", 0.5), link("g3", "g4", 0.5)], &[]);
    let second = compute_groups(&[link("g3", "g9", 0.5)], &first);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].uid, first[1].uid);
}

#[test]
fn saved_groups_seed_the_first_generation() {
    let inputs = vec![GroupInput {
        uid: 4,
        label: "NRPS".to_string(),
        genes: vec!["g1".to_string()],
        colour: None,
        hidden: false,
    }];
    let seeded = seed_groups(&inputs);
    assert_eq!(seeded[0].uid, 4);
    assert!(!seeded[0].colour.is_empty());

    let groups = compute_groups(&[link("g1", "g2", 0.5), link("g8", "g9", 0.5)], &seeded);
    assert_eq!(groups[0].uid, 4);
    assert_eq!(groups[0].label, "NRPS");
    assert_eq!(groups[1].uid, 5);
}

#[test]
fn best_links_are_exclusive_per_gene_and_cluster_pair() {
    let state = two_by_two();
    let links = state.diagram.links();
    let best = filter_best_links(links, &state.diagram, &state.scales.group, 0.0);
    let uids: Vec<&str> = best.iter().map(|l| l.uid.as_str()).collect();
    assert_eq!(uids, ["a2-b1", "a1-b2"]);

    for gene in ["a1", "a2", "b1", "b2"] {
        let kept = best.iter().filter(|l| l.touches(gene)).count();
        assert!(kept <= 1, "{gene} kept by {kept} links");
    }
    for dropped in links.iter().filter(|l| !best.contains(l)) {
        assert!(
            best.iter()
                .any(|kept| kept.shares_gene(dropped) && kept.identity >= dropped.identity),
            "{} dropped without a better link sharing its genes",
            dropped.uid
        );
    }

    let strict = filter_best_links(links, &state.diagram, &state.scales.group, 0.85);
    assert_eq!(strict.len(), 1);
    assert_eq!(strict[0].uid, "a2-b1");
}

#[test]
fn link_filter_follows_config() {
    let mut state = two_by_two();
    assert_eq!(state.visible_links().len(), 4);

    state.config.link.best_only = true;
    let filter = LinkFilter::from_config(&state.config.link);
    assert!(filter.best_only);
    assert_eq!(state.visible_links().len(), 2);
}

#[test]
fn links_below_the_threshold_form_no_groups() {
    let state = linked_pairs(
        json!([{ "query": { "uid": "a1" }, "target": { "uid": "b1" }, "identity": 0.3 }]),
        0.5,
    );
    assert!(state.groups.is_empty());
    assert_eq!(state.scales.group_of("a1"), None);
    assert_eq!(state.scales.group_of("b1"), None);
    assert_eq!(state.gene_fill("a1"), UNGROUPED_COLOUR);
    assert!(state.legend_groups().is_empty());
    assert!(state.visible_links().is_empty());

    // A link exactly at the threshold still groups its genes.
    let state = linked_pairs(
        json!([{ "query": { "uid": "a1" }, "target": { "uid": "b1" }, "identity": 0.5 }]),
        0.5,
    );
    assert_eq!(state.scales.group_of("a1"), Some(0));
}

#[test]
fn dropped_group_uids_are_not_reused() {
    let groups = compute_groups_with(&[link("g1", "g2", 0.5)], &[], 7, |_| None);
    assert_eq!(groups[0].uid, 7);
    assert_eq!(groups[0].label, "Group 7");

    let mut state = linked_pairs(
        json!([
            { "query": { "uid": "a1" }, "target": { "uid": "b1" }, "identity": 0.9 },
            { "query": { "uid": "a2" }, "target": { "uid": "b2" }, "identity": 0.4 }
        ]),
        0.0,
    );
    assert_eq!(state.scales.group_of("a2"), Some(1));

    state.config.link.threshold = 0.8;
    state.refresh();
    let uids: Vec<usize> = state.groups.iter().map(|g| g.uid).collect();
    assert_eq!(uids, [0]);
    assert_eq!(state.scales.group_of("a2"), None);

    state.config.link.threshold = 0.0;
    state.refresh();
    assert_eq!(state.scales.group_of("a1"), Some(0));
    assert_eq!(state.scales.group_of("a2"), Some(2));
    assert_eq!(state.group(2).map(|g| g.label.as_str()), Some("Group 2"));
}
