//! # Ray Cast Benchmark
//!
//! Casts through a portal-linked grid of sectors populated with bodies.
//! Tests:
//! 1. Short rays that stay in one or two sectors
//! 2. Long rays that cross the whole grid

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use portalis::archetypes::sector_from_points;
use portalis::components::Body;
use portalis::spatial::{cast, CastOptions, Ray};
use portalis::topology::auto_portal;
use portalis::{create_world, EngineConfig};
use portalis_core::{ControllerMethod, Entity, World};
use portalis_shared::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const GRID: usize = 16;
const CELL: f64 = 64.0;

/// A `GRID` x `GRID` world of square sectors with a few bodies in each row.
fn grid_world() -> (World, Vec<Entity>) {
    let mut world = create_world(EngineConfig::default());
    let mut sectors = Vec::with_capacity(GRID * GRID);
    for row in 0..GRID {
        for col in 0..GRID {
            let (x, y) = (col as f64 * CELL, row as f64 * CELL);
            sectors.push(sector_from_points(
                &mut world,
                &[
                    Vec2::new(x, y),
                    Vec2::new(x + CELL, y),
                    Vec2::new(x + CELL, y + CELL),
                    Vec2::new(x, y + CELL),
                ],
            ));
        }
    }
    auto_portal(&mut world);

    let mut rng = ChaCha8Rng::seed_from_u64(0x5EC7);
    let extent = GRID as f64 * CELL;
    for _ in 0..GRID * 4 {
        let e = world.new_entity();
        let pos = Vec3::new(rng.gen_range(0.0..extent), rng.gen_range(0.0..extent), 20.0);
        world.attach(e, Body::new(pos, Vec2::new(8.0, 40.0)));
    }
    world.act_all(ControllerMethod::RECALCULATE);
    (world, sectors)
}

fn random_rays(count: usize, length: f64, seed: u64) -> Vec<(usize, Ray)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let (row, col) = (rng.gen_range(0..GRID), rng.gen_range(0..GRID));
            let start = Vec3::new(
                (col as f64 + 0.5) * CELL,
                (row as f64 + 0.5) * CELL,
                rng.gen_range(5.0..60.0),
            );
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            let end = start + Vec3::new(angle.cos() * length, angle.sin() * length, 0.0);
            (row * GRID + col, Ray::new(start, end))
        })
        .collect()
}

fn bench_cast(c: &mut Criterion) {
    let (world, sectors) = grid_world();
    let options = CastOptions::default();

    let mut group = c.benchmark_group("cast");
    for (name, length) in [("short", CELL), ("long", CELL * GRID as f64)] {
        let rays = random_rays(256, length, 0xA11);
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut hits = 0usize;
                for (sector, ray) in &rays {
                    let outcome = cast(&world, ray, sectors[*sector], &options);
                    hits += usize::from(outcome.hit.is_some());
                }
                black_box(hits)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cast);
criterion_main!(benches);
