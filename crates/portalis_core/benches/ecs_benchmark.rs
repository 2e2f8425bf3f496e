//! # ECS Benchmark
//!
//! Entity allocation, attach/get through component tables, and the
//! fixed-step dynamic value sweep.
//!
//! Run with: `cargo bench --package portalis_core`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use portalis_core::dynamic::{Animation, AnimationLifetime, DynamicValue};
use portalis_core::{component_base, Base, Component, Named, World};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Height {
    #[serde(flatten)]
    base: Base,
    #[serde(rename = "Z")]
    z: DynamicValue<f64>,
}

impl Component for Height {
    const NAME: &'static str = "bench.Height";
    component_base!();

    fn for_each_dynamic(&mut self, f: &mut dyn FnMut(&mut dyn portalis_core::Dynamic)) {
        f(&mut self.z);
    }
}

fn bench_attach(c: &mut Criterion) {
    let mut group = c.benchmark_group("attach_named");
    for count in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut world = World::new();
                for _ in 0..count {
                    let e = world.new_entity();
                    world.attach(e, Named::new("n"));
                }
                world.entity_count()
            });
        });
    }
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut world = World::new();
    let entities: Vec<_> = (0..10_000)
        .map(|_| {
            let e = world.new_entity();
            world.attach(e, Named::new("n"));
            e
        })
        .collect();

    c.bench_function("get_named_10k", |b| {
        b.iter(|| {
            let mut total = 0;
            for &e in &entities {
                total += world.get::<Named>(e).map_or(0, |n| n.name.len());
            }
            black_box(total)
        });
    });
}

fn bench_simulation_step(c: &mut Criterion) {
    let mut world = World::new();
    world.register_component::<Height>();
    for i in 0..10_000 {
        let e = world.new_entity();
        let mut height = Height::default();
        height.z.set_all(f64::from(i));
        height
            .z
            .animate_with(Animation::new(0.0, 10.0, 500.0, AnimationLifetime::Bounce));
        world.attach(e, height);
    }

    c.bench_function("step_10k_animated_values", |b| {
        b.iter(|| black_box(world.step(black_box(16.6667))));
    });
}

criterion_group!(benches, bench_attach, bench_get, bench_simulation_step);
criterion_main!(benches);
