use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use scan_graph::color::{HsvImage, ProfileTable};
use scan_graph::detection::{EdgeFeatures, LineTracer, ZeroLineLocator};
use scan_graph::{GraphAnalyzer, ManualOverrides};

/// 800×500 graph with a zero line, a +30,000 gridline and a pink trace
fn synthetic_graph() -> RgbImage {
    let mut image = RgbImage::from_pixel(800, 500, Rgb([0, 0, 0]));
    for x in 0..800 {
        for y in 249..=251 {
            image.put_pixel(x, y, Rgb([110, 110, 110]));
        }
        image.put_pixel(x, 4, Rgb([90, 90, 90]));

        let top = (240.0 - 120.0 * (x as f64 / 120.0).sin().abs()) as u32;
        for y in top..top + 5 {
            image.put_pixel(x, y, Rgb([255, 60, 200]));
        }
    }
    image
}

fn benchmark_graph_analysis(c: &mut Criterion) {
    let image = synthetic_graph();
    let overrides = ManualOverrides::none();
    let analyzer = GraphAnalyzer::new();

    c.bench_function("analyze_auto_profile", |b| {
        b.iter(|| analyzer.analyze(black_box(&image), &overrides))
    });

    let pinned = ManualOverrides::none().with_profile("pink");
    c.bench_function("analyze_pinned_profile", |b| {
        b.iter(|| analyzer.analyze(black_box(&image), &pinned))
    });

    let features = EdgeFeatures::compute(&image);
    let locator = ZeroLineLocator::new();
    c.bench_function("zero_line_locate", |b| {
        b.iter(|| locator.locate_with_features(black_box(&image), &features))
    });

    let hsv = HsvImage::from_rgb(&image);
    let table = ProfileTable::builtin();
    let pink = table.get("pink").expect("builtin pink profile");
    let tracer = LineTracer::new();
    c.bench_function("trace_pink", |b| b.iter(|| tracer.trace(black_box(&hsv), pink)));
}

criterion_group!(benches, benchmark_graph_analysis);
criterion_main!(benches);
