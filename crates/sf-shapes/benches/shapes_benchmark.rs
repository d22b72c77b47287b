use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use sf_shapes::{
    BifurcatedCrystalBallPdf, DoubleSidedCrystalBallPdf, ExponentialTurnOnPdf, Range, ShapePdf,
};

fn bench_density(c: &mut Criterion) {
    let xs: Vec<f64> = (0..10_000).map(|i| (i as f64) * 0.002 - 10.0).collect();

    let dscb = DoubleSidedCrystalBallPdf::new("mass");
    let dscb_params = [0.0, 1.0, 1.2, 3.0, 1.5, 5.0];
    c.bench_function("dscb_density_10k", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for &x in &xs {
                acc += dscb.density(x, &dscb_params).unwrap();
            }
            black_box(acc)
        })
    });

    let bcb = BifurcatedCrystalBallPdf::new("mass");
    let bcb_params = [0.0, 0.8, 1.4, 1.2, 3.0, 1.5, 5.0];
    c.bench_function("bifurcated_cb_density_10k", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for &x in &xs {
                acc += bcb.density(x, &bcb_params).unwrap();
            }
            black_box(acc)
        })
    });

    let turn_on = ExponentialTurnOnPdf::new("mass");
    let turn_on_params = [0.0, 1.5, -0.2];
    c.bench_function("turn_on_density_10k", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for &x in &xs {
                acc += turn_on.density(x, &turn_on_params).unwrap();
            }
            black_box(acc)
        })
    });
}

fn bench_analytic_integral(c: &mut Criterion) {
    // Sub-ranges covering tail, core, and straddling intervals, as a
    // normalization cache rebuild inside a minimizer would request them.
    let ranges = [
        Range::new(-8.0, -2.0),
        Range::new(-0.5, 1.0),
        Range::new(-6.0, 6.0),
        Range::new(2.0, 7.0),
    ];

    let dscb = DoubleSidedCrystalBallPdf::new("mass");
    let dscb_params = [0.0, 1.0, 1.2, 3.0, 1.5, 5.0];
    c.bench_function("dscb_analytic_integral_4ranges", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for r in ranges {
                acc += dscb.analytic_integral("mass", r, &dscb_params).unwrap();
            }
            black_box(acc)
        })
    });

    let bcb = BifurcatedCrystalBallPdf::new("mass");
    let bcb_params = [0.0, 0.8, 1.4, 1.2, 3.0, 1.5, 5.0];
    c.bench_function("bifurcated_cb_analytic_integral_4ranges", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for r in ranges {
                acc += bcb.analytic_integral("mass", r, &bcb_params).unwrap();
            }
            black_box(acc)
        })
    });

    let turn_on = ExponentialTurnOnPdf::new("mass");
    let turn_on_params = [0.0, 1.5, -0.2];
    c.bench_function("turn_on_analytic_integral_4ranges", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for r in ranges {
                acc += turn_on.analytic_integral("mass", r, &turn_on_params).unwrap();
            }
            black_box(acc)
        })
    });
}

criterion_group!(benches, bench_density, bench_analytic_integral);
criterion_main!(benches);
