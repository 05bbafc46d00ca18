use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use stripecode::{Engine, EngineOptions, GrayImage, Predefined};

static PATTERNS: [[u32; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// Render a clean horizontal UPC-A (module width 2) into a VGA-ish frame.
fn synthetic_frame(width: usize, height: usize) -> Vec<u8> {
    let digits = [0usize, 1, 2, 4, 5, 7, 8, 9, 0, 1, 2, 7];
    let mut runs: Vec<u32> = vec![1, 1, 1];
    for d in &digits[..6] {
        runs.extend_from_slice(&PATTERNS[*d]);
    }
    runs.extend_from_slice(&[1, 1, 1, 1, 1]);
    for d in &digits[6..] {
        runs.extend_from_slice(&PATTERNS[*d]);
    }
    runs.extend_from_slice(&[1, 1, 1]);

    let module = 2usize;
    let bar_width = 95 * module;
    let x0 = (width - bar_width) / 2;
    let (y0, y1) = (height / 4, 3 * height / 4);
    let mut data = vec![255u8; width * height];
    let mut x = x0;
    let mut dark = true;
    for run in runs {
        let value = if dark { 0 } else { 255 };
        for j in x..x + run as usize * module {
            for i in y0..y1 {
                data[i * width + j] = value;
            }
        }
        x += run as usize * module;
        dark = !dark;
    }
    data
}

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate");
    for (w, h) in [(320usize, 240usize), (640, 480)] {
        let data = synthetic_frame(w, h);
        let img = GrayImage::from_gray(&data, w as u32, h as u32).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{w}x{h}")),
            &img,
            |b, img| {
                let mut engine = Engine::new(img, EngineOptions::default()).unwrap();
                b.iter(|| black_box(engine.locate()));
            },
        );
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let data = synthetic_frame(400, 240);
    let img = GrayImage::from_gray(&data, 400, 240).unwrap();
    let mut engine = Engine::new(&img, EngineOptions::default()).unwrap();
    engine.add_predefined(Predefined::UpcA).unwrap();
    let found = engine.locate();
    assert!(!found.is_empty());
    c.bench_function("decode", |b| {
        b.iter(|| {
            let mut bc = found[0].clone();
            black_box(engine.decode(&mut bc))
        })
    });
}

criterion_group!(benches, bench_locate, bench_decode);
criterion_main!(benches);
