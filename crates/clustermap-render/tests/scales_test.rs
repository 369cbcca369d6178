use clustermap_core::{ClusterMapConfig, ClusterMapData, Diagram};
use clustermap_render::scales::{
    LinearScale, OffsetScale, OrdinalScale, UNGROUPED_COLOUR, rainbow,
};
use clustermap_render::{DiagramState, ScaleRegistry};
use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn fixture_data() -> ClusterMapData {
    let path = workspace_root().join("fixtures").join("basic.json");
    let text = std::fs::read_to_string(&path).expect("fixture");
    ClusterMapData::from_json(&text).expect("parse ok")
}

fn fixture_state() -> DiagramState {
    DiagramState::new(
        Diagram::from_data(fixture_data()).expect("load ok"),
        ClusterMapConfig::default(),
    )
}

#[test]
fn linear_scale_maps_and_inverts() {
    let scale = LinearScale::position(15.0);
    assert_eq!(scale.domain(), [0.0, 1000.0]);
    assert_eq!(scale.apply(2000.0), 30.0);
    assert_eq!(scale.invert(30.0), 2000.0);

    let flat = LinearScale::new([5.0, 5.0], [1.0, 2.0]);
    assert_eq!(flat.apply(100.0), 1.0);
}

#[test]
fn ordinal_scale_falls_back_to_unknown() {
    let mut scale: OrdinalScale<String, f64> = OrdinalScale::new(-1.0);
    scale.set("a".to_string(), 3.0);
    assert_eq!(*scale.get("a"), 3.0);
    assert_eq!(*scale.get("missing"), -1.0);
    assert_eq!(scale.try_get("missing"), None);

    scale.set("b".to_string(), 4.0);
    scale.set("a".to_string(), 5.0);
    let domain: Vec<&str> = scale.domain().map(String::as_str).collect();
    assert_eq!(domain, ["a", "b"]);
}

#[test]
fn rescaling_round_trips_offsets_through_the_old_scale() {
    let mut scales = ScaleRegistry::new(15.0);
    scales.cluster_offset.set("A".to_string(), 37.0);
    scales.locus_offset.set("L".to_string(), -10.3);

    let old = scales.set_position_range(30.0);
    assert_eq!(old, LinearScale::position(15.0));
    assert_eq!(
        *scales.cluster_offset.get("A"),
        scales.position.apply(old.invert(37.0))
    );
    assert_eq!(
        *scales.locus_offset.get("L"),
        scales.position.apply(old.invert(-10.3))
    );
    assert!((*scales.cluster_offset.get("A") - 74.0).abs() < 1e-9);

    // Same range: no rescale.
    let before = *scales.cluster_offset.get("A");
    scales.set_position_range(30.0);
    assert_eq!(*scales.cluster_offset.get("A"), before);
}

#[test]
fn default_domains_follow_input_order() {
    let state = fixture_state();
    let pitch = ScaleRegistry::row_pitch(&state.config);
    assert_eq!(pitch, 62.0);
    assert_eq!(*state.scales.cluster_order.get("A"), 0.0);
    assert_eq!(*state.scales.cluster_order.get("B"), 62.0);
    assert_eq!(*state.scales.cluster_order.get("C"), 124.0);
    assert_eq!(state.scales.total_height(), 124.0);
    assert_eq!(*state.scales.cluster_offset.get("C"), 0.0);
    assert_eq!(*state.scales.locus_offset.get("C1"), -7.5);
}

#[test]
fn refresh_keeps_user_offsets_and_drops_stale_entries() {
    let mut state = fixture_state();
    state.scales.locus_offset.set("B1".to_string(), 42.0);
    state.scales.cluster_offset.set("A".to_string(), -5.0);
    state.refresh();
    assert_eq!(*state.scales.locus_offset.get("B1"), 42.0);
    assert_eq!(*state.scales.cluster_offset.get("A"), -5.0);

    let mut data = fixture_data();
    data.clusters.retain(|c| c.uid != "C");
    data.links.retain(|l| l.query.uid != "c1" && l.target.uid != "c1");
    data.links.retain(|l| l.query.uid != "c2" && l.target.uid != "c2");
    state.replace_diagram(Diagram::from_data(data).expect("load ok"));
    assert!(!state.scales.cluster_order.contains("C"));
    assert!(!state.scales.locus_offset.contains("C1"));
    assert_eq!(*state.scales.locus_offset.get("B1"), 42.0);
    assert_eq!(state.scales.total_height(), 62.0);
}

#[test]
fn point_writes_touch_a_single_entry() {
    let mut state = fixture_state();
    state
        .scales
        .update_scale_range(OffsetScale::LocusOffset, "B1", 12.5);
    state
        .scales
        .update_scale_range(OffsetScale::ClusterOffset, "C", -3.0);
    assert_eq!(*state.scales.locus_offset.get("B1"), 12.5);
    assert_eq!(*state.scales.locus_offset.get("A1"), 0.0);
    assert_eq!(*state.scales.locus_offset.get("C1"), -7.5);
    assert_eq!(*state.scales.cluster_offset.get("C"), -3.0);
    assert_eq!(*state.scales.cluster_offset.get("A"), 0.0);
}

#[test]
fn colours_come_from_groups() {
    let state = fixture_state();
    let group = state.scales.group_of("a1").expect("a1 is linked");
    assert_eq!(state.scales.group_of("b1"), Some(group));
    assert_eq!(state.scales.group_of("c1"), Some(group));
    assert_eq!(state.scales.group_of("a3"), None);

    assert_eq!(
        state.scales.group_colour("a1"),
        state.group(group).unwrap().colour
    );
    assert_eq!(state.scales.group_colour("a3"), UNGROUPED_COLOUR);
    assert_eq!(state.gene_fill("a3"), UNGROUPED_COLOUR);

    let colour = rainbow(0.25);
    assert!(colour.starts_with('#'));
    assert_eq!(colour.len(), 7);
    assert_ne!(state.scales.score.colour(0.0), state.scales.score.colour(1.0));
}

#[test]
fn hidden_groups_leave_the_group_scale() {
    let mut state = fixture_state();
    let group = state.scales.group_of("a2").unwrap();
    state.group_mut(group).unwrap().hidden = true;
    state.refresh();
    assert_eq!(state.scales.group_of("a2"), None);
    assert_eq!(state.gene_fill("a2"), UNGROUPED_COLOUR);
    assert_eq!(state.legend_groups().len(), 1);
    assert!(state.visible_links().iter().all(|l| !l.touches("a2")));
}
