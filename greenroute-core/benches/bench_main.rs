use criterion::{Criterion, black_box, criterion_group, criterion_main};

use greenroute_core::prelude::*;

/// Square grid of `n` x `n` nodes with 0.5 km links, open to all modes.
fn grid(n: usize) -> NetworkData {
    let deg_per_km = 0.009;
    let step_km = 0.5;
    let id = |row: usize, col: usize| (row * n + col) as NodeId + 1;

    let mut nodes = Vec::with_capacity(n * n);
    let mut edges = Vec::new();
    for row in 0..n {
        for col in 0..n {
            nodes.push(Node::new(
                id(row, col),
                col as f64 * step_km * deg_per_km,
                row as f64 * step_km * deg_per_km,
            ));
            if col + 1 < n {
                edges.push(EdgeRecord::new(id(row, col), id(row, col + 1), step_km));
            }
            if row + 1 < n {
                edges.push(EdgeRecord::new(id(row, col), id(row + 1, col), step_km));
            }
        }
    }
    NetworkData { nodes, edges }
}

fn bench_single_route(c: &mut Criterion) {
    let net = grid(30);
    let overlays = OverlaySnapshot::default();
    let corner = (30 * 30) as NodeId;
    let query = RouteQuery::new(1, corner, TravelMode::Driving, Criteria::Fastest);

    c.bench_function("find_route_fastest_30x30", |b| {
        b.iter(|| find_route(black_box(&net), black_box(&overlays), black_box(&query)))
    });
}

fn bench_alternatives(c: &mut Criterion) {
    let net = grid(20);
    let overlays = OverlaySnapshot::default();
    let corner = (20 * 20) as NodeId;
    let query = RouteQuery::new(1, corner, TravelMode::Driving, Criteria::Optimal)
        .with_alternatives(3, 0.2);

    c.bench_function("find_routes_k3_optimal_20x20", |b| {
        b.iter(|| find_routes(black_box(&net), black_box(&overlays), black_box(&query)))
    });
}

criterion_group!(benches, bench_single_route, bench_alternatives);
criterion_main!(benches);
