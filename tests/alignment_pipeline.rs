use std::io::Cursor;

use approx::assert_relative_eq;
use imu_mount_align::alignment::{estimate_batch, BatchConfig};
use imu_mount_align::kinematics::accel_series;
use imu_mount_align::quaternion::{rotate, rotate_series, Quat};
use imu_mount_align::table::parse_table;
use imu_mount_align::types::Vec3;
use ndarray::Array2;

const GRAVITY: f64 = 9.81;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mount_rotation() -> Quat {
    // Phone tilted back and yawed in its holder
    Quat::new(0.95, 0.05, -0.25, 0.18).normalize().unwrap()
}

/// One GPS fix per second with varying speed and a heading that wraps through north
fn synthetic_gps_csv(fixes: usize, slow_fixes: usize) -> String {
    let mut csv = String::from("time;lat;lng;speed;track;sats;alt\n");
    for k in 0..fixes {
        let t = 10_000 + 1000 * k;
        let speed = if k < slow_fixes {
            2.0
        } else {
            45.0 + 20.0 * (0.11 * k as f64).sin()
        };
        let track = (340.0 + 4.0 * k as f64 + 25.0 * (0.05 * k as f64).sin()).rem_euclid(360.0);
        csv.push_str(&format!("{};52.0;4.3;{};{};9;12.5\n", t, speed, track));
    }
    csv
}

/// Accelerometer rows at every GPS timestamp holding the device-frame view of the
/// vehicle acceleration, plus off-grid rows in between that must never be matched
fn synthetic_accel_csv(gps: &Array2<f64>, mount: &Quat) -> String {
    let mut csv = String::from("time;ax;ay;az\n");
    let inverse = mount.conjugate();
    let t0 = gps[[0, 0]];
    csv.push_str(&format!("{};0;0;{}\n", t0, GRAVITY));

    for sample in accel_series(gps.view()).unwrap() {
        let device = rotate(&inverse, &sample.with_vertical(GRAVITY));
        let t = sample.time_ms;
        csv.push_str(&format!("{};{};{};{}\n", t - 500.0, 5.0, -5.0, 1.0));
        csv.push_str(&format!("{};{};{};{}\n", t, device.x, device.y, device.z));
    }
    csv
}

#[test]
fn test_batch_recovers_mount_rotation_from_drive() {
    init_logging();
    let mount = mount_rotation();
    let gps = parse_table(Cursor::new(synthetic_gps_csv(120, 0))).unwrap();
    let accel = parse_table(Cursor::new(synthetic_accel_csv(&gps, &mount))).unwrap();

    assert_eq!(gps.ncols(), 7);
    assert_eq!(accel.ncols(), 4);

    let result = estimate_batch(accel.view(), gps.view(), &BatchConfig::default()).unwrap();
    let estimate = &result.estimate;

    assert_eq!(result.gps_samples, 119);
    assert_eq!(result.skipped.total(), 0);
    assert_eq!(estimate.observations, 119);
    assert!(!estimate.degenerate);
    assert!(estimate.quaternion.w >= 0.0);
    assert!(
        estimate.quaternion.dot(&mount).abs() > 1.0 - 1e-9,
        "estimated {:?}, expected {:?}",
        estimate.quaternion,
        mount
    );

    // Rotating the device-frame rows back lands on the GPS accelerations
    let rotated = rotate_series(&estimate.quaternion, accel.view()).unwrap();
    let series = accel_series(gps.view()).unwrap();
    for (i, sample) in series.iter().enumerate() {
        let row = rotated.row(2 * i + 2);
        assert_eq!(row[0], sample.time_ms);
        assert_relative_eq!(
            Vec3::new(row[1], row[2], row[3]),
            sample.with_vertical(GRAVITY),
            epsilon = 1e-8
        );
    }
}

#[test]
fn test_slow_start_is_skipped_without_biasing_estimate() {
    init_logging();
    let mount = mount_rotation();
    let gps = parse_table(Cursor::new(synthetic_gps_csv(90, 15))).unwrap();
    let accel = parse_table(Cursor::new(synthetic_accel_csv(&gps, &mount))).unwrap();

    let config = BatchConfig {
        min_speed_kmh: 7.0,
        ..BatchConfig::default()
    };
    let result = estimate_batch(accel.view(), gps.view(), &config).unwrap();

    // Pairs 0..=13 average 2 km/h; pair 14 straddles the step and averages above 7
    assert_eq!(result.skipped.below_speed, 14);
    assert_eq!(result.estimate.observations, 89 - 14);
    assert!(result.estimate.quaternion.dot(&mount).abs() > 1.0 - 1e-9);
}

#[test]
fn test_parked_car_is_degenerate() {
    init_logging();
    let mount = mount_rotation();
    let gps = parse_table(Cursor::new(synthetic_gps_csv(30, 30))).unwrap();
    let accel = parse_table(Cursor::new(synthetic_accel_csv(&gps, &mount))).unwrap();

    let result = estimate_batch(accel.view(), gps.view(), &BatchConfig::default()).unwrap();
    assert_eq!(result.estimate.observations, 0);
    assert_eq!(result.skipped.below_speed, 29);
    assert!(result.estimate.degenerate);
}
