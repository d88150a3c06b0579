//! Benchmarks for one orchestration frame.
//!
//! Performance budgets (per 60 Hz frame, 16.6ms total):
//! - Full stage tick with 200 mapped elements: < 50us
//! - Mapper evaluate, 1000 elements: < 100us
//! - Particle generation, 4000 points: < 200us (mount only)
//!
//! Run with: cargo bench -p kinetic-core --bench frame_bench

use std::cell::RefCell;
use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kinetic_core::cursor::PointerKind;
use kinetic_core::mapper::{LayoutProvider, MappedElement, ScrollSource};
use kinetic_core::particles::{FieldAssets, FieldFrame, FieldRenderer, generate_particles};
use kinetic_core::reveal::StyleSink;
use kinetic_core::stage::{SectionSpec, StageHost};
use kinetic_core::{
    Bounds, Channel, ComputedStyle, FrameClock, MotionConfig, ProgressMapping, ScrollLinkedMapper,
    ScrollState, SpringConfig, Stage, Viewport,
};

const VIEW: Viewport = Viewport::new(1440.0, 900.0);

/// Every element is a 300px block stacked down the page.
struct Column;

impl LayoutProvider for Column {
    fn bounds(&self, key: &str) -> Option<Bounds> {
        let index: f64 = key.trim_start_matches('e').parse().ok()?;
        Some(Bounds::new(0.0, index * 300.0, 1440.0, 300.0))
    }

    fn document_height(&self) -> Option<f64> {
        Some(1.0e6)
    }
}

struct NullSink;

impl StyleSink for NullSink {
    fn apply(&mut self, _target: &str, style: &ComputedStyle) {
        black_box(style);
    }
}

struct NullRenderer;

impl FieldRenderer for NullRenderer {
    fn upload(&mut self, assets: &FieldAssets<'_>) {
        black_box(assets.vertex_bytes.len());
    }

    fn submit(&mut self, frame: &FieldFrame) {
        black_box(frame);
    }

    fn release(&mut self) {}
}

fn element(i: usize) -> MappedElement {
    MappedElement::new(format!("e{i}"), ScrollSource::ON_SCREEN)
        .bind(Channel::TranslateY, ProgressMapping::new([0.0, 1.0], [100.0, -100.0]))
        .bind_smoothed(
            Channel::Opacity,
            ProgressMapping::new([0.0, 0.3], [0.0, 1.0]),
            SpringConfig::SOFT,
        )
}

// =============================================================================
// Mapper evaluation
// =============================================================================

fn bench_mapper_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapper/evaluate");
    for count in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        let mut mapper = ScrollLinkedMapper::new();
        for i in 0..count {
            mapper.register(element(i));
        }
        let mut offset = 0.0;
        group.bench_with_input(BenchmarkId::from_parameter(count), &(), |b, _| {
            b.iter(|| {
                offset = (offset + 7.0) % 10_000.0;
                let state = ScrollState {
                    raw_offset: offset,
                    virtual_offset: offset,
                    velocity: 0.0,
                };
                mapper.evaluate(&state, VIEW, &Column);
                black_box(mapper.style("e0"));
            })
        });
    }
    group.finish();
}

// =============================================================================
// Particle generation
// =============================================================================

fn bench_particle_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("particles/generate");
    for count in [1800usize, 3800, 4000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| black_box(generate_particles(count, 20.0, 42)))
        });
    }
    group.finish();
}

// =============================================================================
// Full frame
// =============================================================================

fn bench_stage_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("stage/frame");
    for count in [20usize, 200] {
        let clock = FrameClock::default();
        let host = StageHost {
            viewport: VIEW,
            pointer: PointerKind::Fine,
            layout: Rc::new(Column),
            sink: Rc::new(RefCell::new(NullSink)),
        };
        let Ok(mut stage) = Stage::new(&clock, MotionConfig::default(), host) else {
            continue;
        };
        let mut section = SectionSpec::new("e0");
        for i in 0..count {
            section = section.mapping(element(i));
        }
        stage.mount_section(section);
        stage.mount_field(Box::new(NullRenderer), 2.0, 7);
        stage.skip_loader();

        let mut now = 0.0;
        group.bench_with_input(BenchmarkId::from_parameter(count), &(), |b, _| {
            b.iter(|| {
                now += 1000.0 / 60.0;
                if (now as u64) % 1000 < 17 {
                    stage.wheel(240.0);
                }
                stage.pointer_move(now % 1440.0, 450.0);
                black_box(clock.tick(now));
            })
        });
        stage.teardown();
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_mapper_evaluate,
    bench_particle_generation,
    bench_stage_frame,
);
criterion_main!(benches);
