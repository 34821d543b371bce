use std::env;
use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use formfit_core::{
    FieldCandidate, FieldSizer, FieldType, NormBox, PageRaster, PixelRect, PreRendered,
    SizingConfig,
};

fn quick_tier() -> bool {
    !matches!(env::var("FORMFIT_BENCH_TIER").as_deref(), Ok("full"))
}

fn rect(x0: u32, y0: u32, x1: u32, y1: u32) -> PixelRect {
    PixelRect { x0, y0, x1, y1 }
}

/// Letter page at 300 dpi with `rows` underlined text fields and a checkbox
/// per row.
fn synthetic_form(rows: u32) -> (PageRaster, Vec<FieldCandidate>) {
    let (w, h) = (2550u32, 3300u32);
    let mut page = PageRaster::blank(w, h, 300).expect("page");
    let anchor = |x: f64, y: f64, bw: f64, bh: f64| {
        NormBox::new(x / f64::from(w), y / f64::from(h), bw / f64::from(w), bh / f64::from(h))
    };
    let mut candidates = Vec::new();
    let pitch = (h - 300) / rows;
    for row in 0..rows {
        let y = 150 + row * pitch;
        // label glyphs
        for x in (300..520).step_by(14) {
            page.fill_rect(rect(x, y, x + 4, y + 36), 20);
        }
        // fill-in line
        page.fill_rect(rect(300, y + 45, 1500, y + 48), 0);
        // checkbox outline
        let (bx, by) = (1800, y);
        page.fill_rect(rect(bx, by, bx + 40, by + 3), 0);
        page.fill_rect(rect(bx, by + 37, bx + 40, by + 40), 0);
        page.fill_rect(rect(bx, by, bx + 3, by + 40), 0);
        page.fill_rect(rect(bx + 37, by, bx + 40, by + 40), 0);

        let top = f64::from(y);
        candidates.push(FieldCandidate::new(
            format!("Field {row}"),
            FieldType::Text,
            1,
            anchor(300.0, top, 220.0, 40.0),
        ));
        candidates.push(FieldCandidate::new(
            format!("Check {row}"),
            FieldType::Checkbox,
            1,
            anchor(1805.0, top + 5.0, 30.0, 30.0),
        ));
    }
    (page, candidates)
}

fn bench_size_page(c: &mut Criterion) {
    let sizer = FieldSizer::new(SizingConfig::default()).expect("config");
    let mut group = c.benchmark_group("size_page");
    if quick_tier() {
        group.sample_size(20);
        group.measurement_time(Duration::from_secs(3));
    }
    for rows in [5u32, 20, 40] {
        let (page, candidates) = synthetic_form(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows * 2), &candidates, |b, cands| {
            b.iter(|| black_box(sizer.size_page(&page, cands)))
        });
    }
    group.finish();
}

fn bench_size_document(c: &mut Criterion) {
    let sizer = FieldSizer::new(SizingConfig::default()).expect("config");
    let (page, candidates) = synthetic_form(20);
    let pages = PreRendered::new(vec![page; 4]);
    let all: Vec<FieldCandidate> = (1..=4u32)
        .flat_map(|p| {
            candidates.iter().cloned().map(move |mut c| {
                c.page = p;
                c
            })
        })
        .collect();

    let mut group = c.benchmark_group("size_document");
    if quick_tier() {
        group.sample_size(10);
    }
    group.bench_function("4_pages", |b| {
        b.iter(|| black_box(sizer.size_document(&pages, all.clone()).expect("report")))
    });
    group.finish();
}

criterion_group!(sizing_benches, bench_size_page, bench_size_document);
criterion_main!(sizing_benches);
