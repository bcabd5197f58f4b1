use criterion::{criterion_group, criterion_main, Criterion};
use glider::selection::{
    DisplayInfo, MenuGeometry, PlacementMemory, Rect, ScreenPoint, SelectionSpan,
};

fn bench_placement(c: &mut Criterion) {
    let display = DisplayInfo::new(Rect::new(-1920, 0, 3840, 2160), 1.5);
    let spans: Vec<SelectionSpan> = (0..1_000)
        .map(|i| {
            let x = -1920 + (i * 37) % 3840;
            let y = (i * 53) % 2160;
            SelectionSpan::new(ScreenPoint::new(x, y), ScreenPoint::new(x + 240, y + 18))
        })
        .collect();
    let menu = MenuGeometry::default();
    c.bench_function("place_1k_selections", |b| {
        b.iter(|| {
            let mut memory = PlacementMemory::new(200);
            for span in &spans {
                let _ = memory.place(*span, &display, menu);
            }
        })
    });
}

criterion_group!(benches, bench_placement);
criterion_main!(benches);
