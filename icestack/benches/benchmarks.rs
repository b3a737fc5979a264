use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use icestack::{Extent, NanPolicy, ScatteredRegridder, TargetGrid};
use ndarray::Array3;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// A 1 km source grid roughly the size of a cropped ATL15 region.
fn source() -> (Vec<f64>, Vec<f64>, Array3<f32>) {
    let x: Vec<f64> = (0..60).map(|i| -30_000.0 + 1000.0 * f64::from(i)).collect();
    let y: Vec<f64> = (0..60).map(|i| 30_000.0 - 1000.0 * f64::from(i)).collect();
    let slices = Array3::from_shape_fn((4, 60, 60), |(t, r, c)| {
        if (r + c + t) % 37 == 0 {
            f32::NAN
        } else {
            (r as f32 * 0.1).sin() + (c as f32 * 0.07).cos() + t as f32
        }
    });
    (x, y, slices)
}

fn regrid(c: &mut Criterion) {
    let mut group = c.benchmark_group("Scattered Regrid");
    let (x, y, slices) = source();
    let extent = Extent::new(-20_000.0, -20_000.0, 20_000.0, 20_000.0).unwrap();
    let target = TargetGrid::from_extent(&extent, 100.0, 3413).unwrap();

    for policy in [NanPolicy::Propagate, NanPolicy::Drop] {
        let regridder = ScatteredRegridder::new(policy);
        group.bench_with_input(
            BenchmarkId::new("4 slices, 100 m", format!("{policy:?}")),
            &regridder,
            |b, r| b.iter(|| r.regrid(&x, &y, slices.view(), &target, |_| ()).unwrap()),
        );
    }
}

criterion_group!(benches, regrid);
criterion_main!(benches);
