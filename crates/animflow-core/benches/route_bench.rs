//! Criterion benchmarks for route sampling and static layout.
//!
//! Three benchmark groups:
//! - `calc_route`: one route per line style, 100 steps
//! - `route_cache`: cold build versus cached lookup
//! - `static_layout`: 500 clients spread over a 50-station line

use std::collections::HashSet;

use animflow_core::config::AnimatorConfig;
use animflow_core::entity::ClientRef;
use animflow_core::geometry::Bounds;
use animflow_core::icons::{ActiveEntities, StaticIconBuilder};
use animflow_core::model::LineMode;
use animflow_core::route::{RouteCache, calc_route};
use animflow_core::test_utils::*;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn bench_calc_route(c: &mut Criterion) {
    let a = Bounds::new(0, 0, 100, 50);
    let b = Bounds::new(800, 400, 100, 50);
    let mut group = c.benchmark_group("calc_route");
    for mode in [LineMode::Direct, LineMode::Orthogonal, LineMode::OrthogonalRounded] {
        group.bench_function(format!("{mode:?}"), |bench| {
            bench.iter(|| calc_route(black_box(&a), black_box(&b), mode, 100, 25));
        });
    }
    group.finish();
}

fn bench_route_cache(c: &mut Criterion) {
    let model = line_model(50);
    let mut group = c.benchmark_group("route_cache");
    group.bench_function("cold", |bench| {
        bench.iter(|| {
            let mut cache = RouteCache::new(25);
            for i in 1..50 {
                black_box(cache.build_route(&model, station(i), station(i + 1), 40));
            }
        });
    });
    group.bench_function("warm", |bench| {
        let mut cache = RouteCache::new(25);
        for i in 1..50 {
            cache.build_route(&model, station(i), station(i + 1), 40);
        }
        bench.iter(|| {
            for i in 1..50 {
                black_box(cache.build_route(&model, station(i), station(i + 1), 40));
            }
        });
    });
    group.finish();
}

fn bench_static_layout(c: &mut Criterion) {
    let model = line_model(50);
    let config = AnimatorConfig::default();
    let clients: Vec<ClientRef> = (0..500u64)
        .map(|key| ClientRef {
            next_station: Some(station(key as u32 % 50 + 1)),
            ..ClientRef::new(key)
        })
        .collect();
    let excluded = HashSet::new();

    c.bench_function("static_layout", |bench| {
        let mut builder = StaticIconBuilder::new(config.icon_size, config.stack_limit, config.default_box());
        bench.iter(|| {
            let entities = ActiveEntities {
                clients: &clients,
                ..ActiveEntities::default()
            };
            black_box(builder.rebuild(&model, entities, &excluded, 0))
        });
    });
}

criterion_group!(benches, bench_calc_route, bench_route_cache, bench_static_layout);
criterion_main!(benches);
