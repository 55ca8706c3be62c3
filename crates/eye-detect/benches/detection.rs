use criterion::{black_box, criterion_group, criterion_main, Criterion};
use eye_detect::{FaceRegionEstimator, PupilConfig, PupilDetector};
use frame_input::synthetic::FaceScene;

fn bench_face_estimate(c: &mut Criterion) {
    let frame = FaceScene::default().render(0);
    let estimator = FaceRegionEstimator::default();
    c.bench_function("face_estimate_640x480", |b| b.iter(|| estimator.estimate(black_box(&frame))));
}

fn bench_pupil_scan(c: &mut Criterion) {
    let scene = FaceScene::default().with_gaze(0.3, -0.2);
    let frame = scene.render(0);
    let luma = frame.to_luma();
    let face = scene.face_region();

    let mut group = c.benchmark_group("pupil_scan");
    for (name, config) in [("default", PupilConfig::default()), ("fast", PupilConfig::fast())] {
        let detector = match PupilDetector::new(config) {
            Ok(d) => d,
            Err(e) => panic!("invalid bench config: {}", e),
        };
        group.bench_function(name, |b| {
            b.iter(|| detector.detect_with_luma(frame.rgba(), black_box(&luma), black_box(&face)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_face_estimate, bench_pupil_scan);
criterion_main!(benches);
