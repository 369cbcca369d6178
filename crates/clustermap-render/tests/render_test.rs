use clustermap_core::{ClusterMapConfig, ClusterMapData};
use clustermap_render::overlays::{LegendBands, scale_bar_label};
use clustermap_render::{
    ClusterMap, ElementKey, ElementKind, Error, RetainedScene, SvgRenderOptions, Transition,
    build_scene,
};
use serde_json::json;
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

fn fixture_map() -> ClusterMap<RetainedScene> {
    let mut map = ClusterMap::headless(ClusterMapConfig::default());
    map.load(fixture_data()).expect("load ok");
    map
}

fn attr<'a>(
    map: &'a ClusterMap<RetainedScene>,
    kind: ElementKind,
    uid: &str,
    name: &str,
) -> &'a str {
    map.scene()
        .attr(kind, uid, name)
        .unwrap_or_else(|| panic!("{kind:?} {uid} has no {name}"))
}

fn text<'a>(map: &'a ClusterMap<RetainedScene>, kind: ElementKind, uid: &str) -> &'a str {
    map.scene()
        .node(kind, uid)
        .and_then(|node| node.text.as_deref())
        .unwrap_or_else(|| panic!("{kind:?} {uid} has no text"))
}

#[test]
fn fixture_renders_every_entity() {
    let map = fixture_map();
    let scene = map.scene();
    assert_eq!(scene.count(ElementKind::Cluster), 3);
    assert_eq!(scene.count(ElementKind::Locus), 3);
    assert_eq!(scene.count(ElementKind::Gene), 8);
    assert_eq!(scene.count(ElementKind::GeneLabel), 8);
    assert_eq!(scene.count(ElementKind::Link), 5);
    assert_eq!(scene.count(ElementKind::LinkLabel), 0);
    assert_eq!(scene.count(ElementKind::LegendEntry), 2);
    assert_eq!(scene.count(ElementKind::ScaleBar), 1);
    assert_eq!(scene.count(ElementKind::ColourBarStop), 2);
    assert_eq!(scene.count(ElementKind::ColourBarText), 3);
    assert_eq!(
        scene.last_transition(),
        Some(Transition { duration_ms: 250 })
    );

    let first = scene.roots().next().expect("roots");
    assert_eq!(first.key.kind, ElementKind::Link);

    let cluster = ElementKey::new(ElementKind::Cluster, "A");
    let kinds: Vec<ElementKind> = scene.children(&cluster).map(|n| n.key.kind).collect();
    assert_eq!(kinds, [ElementKind::ClusterInfo, ElementKind::Locus]);
    assert!(
        scene
            .node(ElementKind::Gene, "a1")
            .unwrap()
            .handles(clustermap_render::PointerEventKind::Click)
    );
}

#[test]
fn entities_are_placed_by_their_scales() {
    let map = fixture_map();
    assert_eq!(attr(&map, ElementKind::Cluster, "C", "transform"), "translate(0, 124)");
    assert_eq!(attr(&map, ElementKind::Locus, "C1", "transform"), "translate(-7.5, 0)");
    assert_eq!(
        attr(&map, ElementKind::ClusterInfo, "B", "transform"),
        "translate(-10, 0)"
    );
    assert_eq!(text(&map, ElementKind::ClusterName, "B"), "Cluster B");
    assert_eq!(text(&map, ElementKind::LocusText, "C"), "contig_7:500-2500");
    assert_eq!(attr(&map, ElementKind::TrackBar, "C1", "x1"), "7.5");
    assert_eq!(attr(&map, ElementKind::TrackBar, "C1", "x2"), "37.5");
    assert_eq!(
        attr(&map, ElementKind::Gene, "a1", "points"),
        "0,5 1.5,5 1.5,0 13.5,11 1.5,22 1.5,17 0,17"
    );
    assert_eq!(attr(&map, ElementKind::Gene, "a3", "fill"), "#bbb");
    assert_eq!(attr(&map, ElementKind::GeneLabel, "a1", "display"), "none");
    assert_eq!(text(&map, ElementKind::GeneLabel, "a1"), "a1");

    // Non-adjacent links are kept in the scene but not drawn.
    assert_eq!(attr(&map, ElementKind::Link, "a1-c1", "d"), "");
    assert_eq!(attr(&map, ElementKind::Link, "a1-c1", "opacity"), "0");
    assert_eq!(attr(&map, ElementKind::Link, "a1-b1", "opacity"), "1");
    assert!(attr(&map, ElementKind::Link, "a1-b1", "d").starts_with("M0,11 L13.5,11 C"));
}

#[test]
fn overlays_sit_around_the_diagram() {
    let map = fixture_map();
    assert_eq!(attr(&map, ElementKind::Legend, "legend", "transform"), "translate(65, 0)");
    assert_eq!(attr(&map, ElementKind::LegendEntry, "1", "transform"), "translate(0, 24)");
    assert_eq!(text(&map, ElementKind::LegendLabel, "0"), "Group 0");
    assert_eq!(
        attr(&map, ElementKind::ScaleBar, "scale-bar", "transform"),
        "translate(0, 166)"
    );
    assert_eq!(text(&map, ElementKind::ScaleBarText, "scale-bar"), "2.5kb");
    assert_eq!(
        attr(&map, ElementKind::ColourBar, "colour-bar", "transform"),
        "translate(57.5, 166)"
    );
    assert_eq!(
        attr(&map, ElementKind::ColourBarRect, "fill", "fill"),
        "url(#cbarGradient)"
    );
}

#[test]
fn legend_bands_and_scale_bar_labels() {
    let two = LegendBands::new(2, 18.0);
    assert_eq!((two.start, two.step, two.bandwidth), (0.0, 24.0, 12.0));
    assert_eq!(two.offset(1), 24.0);

    let one = LegendBands::new(1, 18.0);
    assert_eq!((one.start, one.step), (4.5, 18.0));

    assert_eq!(scale_bar_label(2500), "2.5kb");
    assert_eq!(scale_bar_label(1000), "1kb");
    assert_eq!(scale_bar_label(1234), "1.2kb");
}

#[test]
fn hidden_overlays_are_removed() {
    let mut map = fixture_map();
    map.update_config(&json!({
        "legend": { "show": false },
        "scaleBar": { "show": false },
        "colourBar": { "show": false }
    }))
    .unwrap();
    let scene = map.scene();
    assert_eq!(scene.count(ElementKind::Legend), 0);
    assert_eq!(scene.count(ElementKind::LegendLabel), 0);
    assert_eq!(scene.count(ElementKind::ScaleBarText), 0);
    assert_eq!(scene.count(ElementKind::ColourBarStop), 0);
}

#[test]
fn repeated_updates_only_update() {
    let mut map = fixture_map();
    let total = map.scene().len();
    let summary = map.update();
    assert_eq!(summary.entered, 0);
    assert_eq!(summary.exited, 0);
    assert_eq!(summary.updated, total);
}

#[test]
fn config_changes_rerender() {
    let mut map = fixture_map();

    map.update_config(&json!({ "link": { "threshold": 0.7, "label": { "show": true } } }))
        .unwrap();
    // c1 only links below the threshold, so it leaves every group and its links exit.
    assert!(map.scene().node(ElementKind::Link, "b1-c1").is_none());
    assert_eq!(attr(&map, ElementKind::Link, "a1-b1", "opacity"), "1");
    assert_eq!(text(&map, ElementKind::LinkLabel, "a1-b1"), "0.90");

    map.set_config_value("gene.label.show", json!(true)).unwrap();
    assert_eq!(attr(&map, ElementKind::GeneLabel, "a1", "display"), "inline");

    let before = map.config().clone();
    assert!(
        map.update_config(&json!({ "plot": { "scaleFactor": "large" } }))
            .is_err()
    );
    assert_eq!(map.config(), &before);
}

#[test]
fn zooming_rescales_offsets() {
    let mut map = fixture_map();
    map.set_scale_factor(30.0).unwrap();
    assert_eq!(*map.state().scales.locus_offset.get("C1"), -15.0);
    assert_eq!(attr(&map, ElementKind::TrackBar, "A1", "x2"), "90");
    assert!(map.set_scale_factor(f64::NAN).is_err());
    assert_eq!(map.config().plot.scale_factor, 30.0);
}

#[test]
fn set_data_keeps_groups_and_layout() {
    let mut map = fixture_map();
    map.rename_group(0, "PKS").unwrap();
    map.set_link_opacity("a1-b1", 0.5).unwrap();

    let mut data = fixture_data();
    data.clusters.retain(|c| c.uid != "C");
    let dropped = ["c1", "c2"];
    data.links.retain(|l| {
        !dropped.contains(&l.query.uid.as_str()) && !dropped.contains(&l.target.uid.as_str())
    });
    map.set_data(data).unwrap();

    assert_eq!(map.state().group(0).unwrap().label, "PKS");
    assert_eq!(map.state().link_opacity["a1-b1"], 0.5);
    assert_eq!(map.scene().count(ElementKind::Cluster), 2);
    assert!(map.scene().node(ElementKind::Gene, "c1").is_none());
    assert_eq!(text(&map, ElementKind::LegendLabel, "0"), "PKS");

    map.load(fixture_data()).unwrap();
    assert_eq!(map.state().group(0).unwrap().label, "Group 0");
    assert!(map.state().link_opacity.is_empty());
}

#[test]
fn invalid_edits_are_rejected() {
    let mut map = fixture_map();
    assert!(matches!(
        map.rename_cluster("nope", "x"),
        Err(Error::UnknownEntity { kind: "cluster", .. })
    ));
    assert!(matches!(
        map.set_link_opacity("a1-b1", 1.5),
        Err(Error::InvalidValue { .. })
    ));
    assert!(matches!(
        map.set_link_opacity("nope", 0.5),
        Err(Error::UnknownEntity { kind: "link", .. })
    ));
    assert!(map.set_group_colour(0, "not a colour!").is_err());
    assert!(map.set_scale_bar_length(0).is_err());
    assert!(map.flip_locus("nope").is_err());
    assert!(map.set_group_hidden(99, true).is_err());

    let mut data = fixture_data();
    let dup = data.clusters[0].clone();
    data.clusters.push(dup);
    assert!(matches!(map.load(data), Err(Error::Core(_))));
}

#[test]
fn reset_display_undoes_flips_trims_and_offsets() {
    let mut map = fixture_map();
    map.flip_locus("C1").unwrap();
    map.anchor_on_gene("b1").unwrap();
    map.reset_display();

    let state = map.state();
    let locus = state.diagram.locus("C1").unwrap();
    assert!(!locus.display.flipped);
    assert_eq!(*state.scales.locus_offset.get("C1"), -7.5);
    assert_eq!(*state.scales.cluster_offset.get("A"), 0.0);
    assert_eq!(text(&map, ElementKind::LocusText, "C"), "contig_7:500-2500");
}

#[test]
fn svg_output() {
    let mut map = fixture_map();
    map.rename_cluster("A", "A & <B>").unwrap();
    let svg = map.to_svg_with(&SvgRenderOptions {
        diagram_id: Some("demo".to_string()),
        ..Default::default()
    });
    assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" id="demo" viewBox=""#));
    assert!(svg.contains(r#"<polygon class="genePolygon" data-uid="a1""#));
    assert!(svg.contains(r#"<g class="cluster" data-uid="A" transform="translate(0, 0)">"#));
    assert!(svg.contains("A &amp; &lt;B&gt;"));
    assert!(svg.contains("<linearGradient"));
    assert!(svg.trim_end().ends_with("</svg>"));

    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");
    let polygons = doc
        .descendants()
        .filter(|n| n.attribute("class") == Some("genePolygon"))
        .count();
    assert_eq!(polygons, 8);
    let name = doc
        .descendants()
        .find(|n| {
            n.attribute("class") == Some("clusterText") && n.attribute("data-uid") == Some("A")
        })
        .expect("cluster name");
    assert_eq!(name.text(), Some("A & <B>"));

    let [x, y, w, h] = map.content_bounds();
    assert!(x < -10.0);
    assert_eq!(y, 0.0);
    assert!(w > 45.0);
    assert!(h > 146.0);
}

#[test]
fn scene_batch_joins_links_first() {
    let map = fixture_map();
    let batch = build_scene(map.state());
    assert_eq!(batch.get(ElementKind::Gene).len(), 8);
    let kinds: Vec<ElementKind> = batch.into_layers().map(|(kind, _)| kind).collect();
    assert_eq!(kinds[0], ElementKind::Link);
    assert_eq!(kinds[1], ElementKind::LinkLabel);
    assert!(kinds.contains(&ElementKind::ColourBarText));
}
