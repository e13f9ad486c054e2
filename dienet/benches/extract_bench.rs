// SPDX-License-Identifier: Apache-2.0

//! Benchmarks for flood fill and full extraction over synthetic dies built
//! from tiled single-transistor cells.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dienet::circuit_grid::CircuitGrid;
use dienet::config::Method;
use dienet::fill::{flood_fill, FillTarget};
use dienet::mask::{BinaryMask, Layer};
use dienet_test_helpers::SyntheticDie;

const TILE_WIDTH: i32 = 28;
const TILE_HEIGHT: i32 = 20;

/// `tiles` x `tiles` copies of the single transistor cell.
fn tiled_die(tiles: i32) -> SyntheticDie {
    let mut die = SyntheticDie::new(
        Method::NmosPolySingleMetal,
        (TILE_WIDTH * tiles) as usize,
        (TILE_HEIGHT * tiles) as usize,
    );
    for ty in 0..tiles {
        for tx in 0..tiles {
            let (x, y) = (tx * TILE_WIDTH, ty * TILE_HEIGHT);
            die = die
                .rect(Layer::Active, x + 4, y + 4, x + 23, y + 13)
                .rect(Layer::Poly, x + 13, y + 4, x + 14, y + 17)
                .rect(Layer::Metal, x + 5, y + 6, x + 8, y + 9)
                .rect(Layer::Metal, x + 18, y + 6, x + 21, y + 9)
                .rect(Layer::Vias, x + 6, y + 7, x + 7, y + 8)
                .rect(Layer::Vias, x + 19, y + 7, x + 20, y + 8);
        }
    }
    die
}

struct MaskFill<'a> {
    mask: &'a BinaryMask,
    marks: Vec<bool>,
}

impl FillTarget for MaskFill<'_> {
    type Color = bool;

    fn width(&self) -> i32 {
        self.mask.width() as i32
    }

    fn height(&self) -> i32 {
        self.mask.height() as i32
    }

    fn read(&self, x: i32, y: i32) -> bool {
        self.mask.get(x, y)
    }

    fn mark(&mut self, x: i32, y: i32) {
        let i = y as usize * self.mask.width() + x as usize;
        self.marks[i] = true;
    }

    fn is_marked(&self, x: i32, y: i32) -> bool {
        self.marks[y as usize * self.mask.width() + x as usize]
    }
}

fn flood_fill_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood_fill_comb");
    for &size in &[256usize, 1024] {
        // A comb: one spine row with a tooth on every other column.
        let mut mask = BinaryMask::new(size, size);
        mask.fill_rect(0, 0, size as i32 - 1, 0);
        for x in (0..size as i32).step_by(2) {
            mask.fill_rect(x, 0, x, size as i32 - 1);
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &mask, |b, mask| {
            b.iter(|| {
                let mut target = MaskFill {
                    mask,
                    marks: vec![false; size * size],
                };
                black_box(flood_fill(&mut target, 0, 0, true));
            });
        });
    }
    group.finish();
}

fn extract_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_tiled_transistors");
    group.sample_size(10);
    for &tiles in &[4i32, 16] {
        let die = tiled_die(tiles);
        let masks = die.masks();
        group.bench_with_input(BenchmarkId::from_parameter(tiles), &masks, |b, masks| {
            b.iter(|| {
                let grid = CircuitGrid::anonymous(3, die.width, die.height)
                    .expect("anonymous grid should map");
                let ctx = dienet::extract(die.method, masks, vec![], grid)
                    .expect("tiled die should extract");
                black_box(ctx.transistors.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, flood_fill_benchmark, extract_benchmark);
criterion_main!(benches);
