use tm_core::{Image, Rgba8};
use tm_edge::Orientation;
use tm_measure::{
    Calibration, CameraGeometry, MeasureError, MeasureParams, MeasurementHistory,
    SharedCalibration, manual_calibration, measure, measure_width,
};

const BACKGROUND: Rgba8 = [235, 232, 228, 255];
const TIMBER: Rgba8 = [60, 45, 30, 255];

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn specimen(width: usize, height: usize, xs: (usize, usize), ys: (usize, usize)) -> Image<Rgba8> {
    Image::from_fn(width, height, |x, y| {
        if (xs.0..xs.1).contains(&x) && (ys.0..ys.1).contains(&y) {
            TIMBER
        } else {
            BACKGROUND
        }
    })
}

#[test]
fn dark_rectangle_end_to_end() {
    init_logger();
    let img = specimen(1000, 600, (100, 900), (150, 450));
    let cal = Calibration::fixed(0.05).expect("factor");
    let params = MeasureParams::default();
    assert_eq!(params.binarization.threshold, 200);
    assert_eq!(params.binarization.sigma, 0.0);

    let result = measure(&img, &cal, &params).expect("measured");
    let edges = result.edges.expect("edges attached");

    assert!((edges.width.edge_a - 100.0).abs() <= 1.0, "{:?}", edges.width);
    assert!((edges.width.edge_b - 900.0).abs() <= 1.0, "{:?}", edges.width);
    assert!((result.width_pixels - 800.0).abs() <= 1.0);
    assert!((result.width_mm - 40.0).abs() <= 0.05);

    assert!((result.height_pixels - 300.0).abs() <= 1.0);
    assert!((result.height_mm - 15.0).abs() <= 0.05);
    assert_eq!(result.calibration_factor, 0.05);
}

#[test]
fn manual_calibration_round_trip() {
    init_logger();
    let factor = manual_calibration(100.0, 10.0).expect("reference");
    assert!((factor.mm_per_px() - 0.1).abs() < 1e-12);

    let cal = Calibration::manual(100.0, 10.0).expect("reference");
    let img = specimen(400, 300, (150, 250), (100, 200));
    let width = measure_width(&img, &cal, &MeasureParams::default()).expect("width");
    assert!((width.mm - 10.0).abs() <= 0.01, "got {} mm", width.mm);
}

#[test]
fn camera_geometry_example() {
    let cal = Calibration::camera(CameraGeometry {
        sensor_width_mm: 4.8,
        focal_length_mm: 4.0,
        distance_mm: 300.0,
        image_width_px: 1280,
    })
    .expect("geometry");
    assert!((cal.mm_per_px() - 0.28125).abs() < 1e-12);
    assert_eq!(cal.camera_distance(), Some(300.0));
}

#[test]
fn two_percent_separation_is_rejected() {
    init_logger();
    // 20 px on a 1000 px line, below the 5% floor.
    let img = specimen(1000, 600, (500, 520), (0, 600));
    assert_eq!(
        measure_width(&img, &Calibration::fixed(0.1).expect("factor"), &MeasureParams::default()),
        Err(MeasureError::NoEdgesDetected {
            orientation: Orientation::Width
        })
    );
}

#[test]
fn narrow_pair_loses_to_weaker_valid_pair() {
    init_logger();
    // First scan line (row 180) crosses a narrow, very dark mark; the other
    // lines cross a wide, lighter board.
    let img = Image::from_fn(1000, 600, |x, y| -> u8 {
        if (150..210).contains(&y) {
            if (500..520).contains(&x) { 0 } else { 255 }
        } else if (200..700).contains(&x) {
            150
        } else {
            255
        }
    });
    let params = MeasureParams {
        binarize: false,
        ..MeasureParams::default()
    };

    let width = measure_width(&img, &Calibration::fixed(1.0).expect("factor"), &params)
        .expect("wide board found");
    assert!(width.edge.scan_line_index >= 1);
    assert!((width.pixels - 500.0).abs() <= 1.0);
    assert!((width.edge.edge_a - 200.0).abs() <= 1.0);
}

#[test]
fn shared_calibration_feeds_history() {
    init_logger();
    let shared = SharedCalibration::new();
    let img = specimen(400, 300, (100, 300), (50, 250));
    assert!(matches!(
        shared.snapshot(),
        Err(MeasureError::CalibrationMissingOrInvalid(_))
    ));

    shared.replace(Calibration::manual(200.0, 50.0).expect("reference"));
    let mut history = MeasurementHistory::new();
    let first = measure(&img, &shared.snapshot().expect("set"), &MeasureParams::default())
        .expect("measured");
    history.record("frame-1", first);

    shared.set_camera_distance(300.0).expect("camera mode");
    let second = measure(&img, &shared.snapshot().expect("set"), &MeasureParams::default())
        .expect("measured");
    history.record("frame-2", second);

    let entries = history.entries();
    assert_eq!(entries.len(), 2);
    assert!((entries[0].result.width_mm - 50.0).abs() <= 0.25);
    assert!((entries[1].result.calibration_factor - 0.28125).abs() < 1e-12);
    assert_eq!(entries[1].result.camera_distance, Some(300.0));
    assert_eq!(entries[0].result.width_pixels, entries[1].result.width_pixels);
}
