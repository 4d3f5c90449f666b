use aruco_watch_core::GrayImage;
use aruco_watch_markers::{builtins, render_marker, ArucoDetector, DetectorParams};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn scene(width: usize, height: usize, ids: &[u32]) -> GrayImage {
    let dict = builtins::DICT_ARUCO_ORIGINAL;
    let mut canvas = GrayImage::filled(width, height, 255);
    let mut x0 = 20;
    for &id in ids {
        let Ok(marker) = render_marker(dict, id, 12, 0) else {
            continue;
        };
        if x0 + marker.width >= width {
            break;
        }
        for y in 0..marker.height {
            for x in 0..marker.width {
                canvas.set(x0 + x, 60 + y, marker.get(x, y));
            }
        }
        x0 += marker.width + 40;
    }
    canvas
}

fn bench_detect(c: &mut Criterion) {
    let img = scene(640, 480, &[1, 17, 230, 999]);
    let view = img.view();

    let mut group = c.benchmark_group("detect_640x480");
    for (name, params) in [
        ("default", DetectorParams::default()),
        ("streaming", DetectorParams::streaming()),
    ] {
        let detector = ArucoDetector::new(builtins::DICT_ARUCO_ORIGINAL, params);
        group.bench_function(name, |b| b.iter(|| detector.detect(black_box(&view))));
    }
    group.finish();
}

criterion_group!(benches, bench_detect);
criterion_main!(benches);
