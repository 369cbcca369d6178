use clustermap_core::{ClusterMapConfig, ClusterMapData, Diagram};
use clustermap_render::{DiagramState, compute_groups, filter_best_links};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;
use std::time::Duration;

/// `clusters` rows of `genes` genes each, every gene linked to the two nearest genes of the next
/// row.
fn build_state(clusters: usize, genes: usize) -> DiagramState {
    let cluster_values: Vec<Value> = (0..clusters)
        .map(|c| {
            let gene_values: Vec<Value> = (0..genes)
                .map(|g| {
                    json!({
                        "uid": format!("c{c}g{g}"),
                        "start": g * 1000,
                        "end": g * 1000 + 800,
                        "strand": if g % 3 == 0 { -1 } else { 1 },
                    })
                })
                .collect();
            json!({
                "uid": format!("c{c}"),
                "name": format!("cluster {c}"),
                "loci": [{
                    "uid": format!("c{c}l0"),
                    "name": format!("scaffold_{c}"),
                    "start": 0,
                    "end": genes * 1000,
                    "genes": gene_values,
                }],
            })
        })
        .collect();

    let mut link_values = Vec::new();
    for c in 0..clusters.saturating_sub(1) {
        for g in 0..genes {
            for (offset, identity) in [(0usize, 0.9), (1, 0.6)] {
                let target = g + offset;
                if target >= genes {
                    continue;
                }
                let jitter = ((c * 31 + g * 17) % 10) as f64 / 100.0;
                link_values.push(json!({
                    "query": { "uid": format!("c{c}g{g}") },
                    "target": { "uid": format!("c{}g{target}", c + 1) },
                    "identity": identity - jitter,
                }));
            }
        }
    }

    let data: ClusterMapData =
        serde_json::from_value(json!({ "clusters": cluster_values, "links": link_values }))
            .expect("synthetic data");
    DiagramState::new(
        Diagram::from_data(data).expect("synthetic diagram"),
        ClusterMapConfig::default(),
    )
}

fn bench_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("groups");
    group.measurement_time(Duration::from_secs(5));

    let cases = [("4x20", 4usize, 20usize), ("10x50", 10, 50), ("20x100", 20, 100)];

    for (name, clusters, genes) in cases {
        let state = build_state(clusters, genes);
        group.bench_with_input(
            BenchmarkId::new("compute_groups", name),
            &state,
            |b, state| {
                b.iter(|| {
                    let groups = compute_groups(black_box(state.diagram.links()), &state.groups);
                    black_box(groups.len());
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("filter_best_links", name),
            &state,
            |b, state| {
                b.iter(|| {
                    let best = filter_best_links(
                        black_box(state.diagram.links()),
                        &state.diagram,
                        &state.scales.group,
                        0.3,
                    );
                    black_box(best.len());
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_groups);
criterion_main!(benches);
