//! GPS kinematics: planar vehicle acceleration from speed and course
//!
//! Consecutive fixes give a longitudinal acceleration from the speed change
//! and a centripetal acceleration from the heading-change rate:
//!
//!   a_lon = (v2 - v1) / dt
//!   a_c   = v2 * dθ / dt,  dθ = -Δtrack
//!
//! Track is measured clockwise from north while the math rotation angle is
//! counter-clockwise, hence the sign flip. The centripetal term is the
//! small-angle approximation and degrades as the per-step turn grows.

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::angles::delta_radians;
use crate::error::{AlignError, AlignResult};
use crate::types::{
    GpsAccel, SpeedTrack, COL_GPS_SPEED_KMH, COL_GPS_TRACK_DEG, COL_TIME, GPS_MIN_COLUMNS,
};

const KMH_PER_MS: f64 = 3.6;

/// Extract speed [m/s] and track [rad] from a `[time_ms, lat, lng, speed_kmh, track_deg, ...]` row
///
/// Returns `None` when the row is too short to carry speed and track.
pub fn speed_track_from_row(row: ArrayView1<f64>) -> Option<SpeedTrack> {
    if row.len() < GPS_MIN_COLUMNS {
        return None;
    }
    Some(SpeedTrack {
        time_ms: row[COL_TIME],
        speed: row[COL_GPS_SPEED_KMH] / KMH_PER_MS,
        track: row[COL_GPS_TRACK_DEG].to_radians(),
    })
}

/// Acceleration between two fixes, timestamped at the later one
///
/// Timestamps must be strictly increasing; equal timestamps give `dt == 0`
/// and non-finite output.
pub fn accel_from_consecutive(s1: &SpeedTrack, s2: &SpeedTrack) -> GpsAccel {
    let dt = (s2.time_ms - s1.time_ms) / 1000.0;
    let longitudinal = (s2.speed - s1.speed) / dt;
    let theta = -delta_radians(s1.track, s2.track, false);
    let centripetal = s2.speed * theta / dt;

    GpsAccel {
        time_ms: s2.time_ms,
        longitudinal,
        centripetal,
    }
}

/// Speed/track for every row of a GPS table
pub fn speed_tracks(gps: ArrayView2<f64>) -> AlignResult<Vec<SpeedTrack>> {
    if gps.ncols() < GPS_MIN_COLUMNS {
        return Err(AlignError::TableShape(format!(
            "GPS table needs at least {} columns, got {}",
            GPS_MIN_COLUMNS,
            gps.ncols()
        )));
    }
    Ok(gps
        .rows()
        .into_iter()
        .filter_map(speed_track_from_row)
        .collect())
}

/// Accelerations over every consecutive pair; `n` fixes give `n - 1` samples
pub fn accel_from_speed_tracks(tracks: &[SpeedTrack]) -> Vec<GpsAccel> {
    tracks
        .windows(2)
        .map(|pair| accel_from_consecutive(&pair[0], &pair[1]))
        .collect()
}

/// GPS table to acceleration series
pub fn accel_series(gps: ArrayView2<f64>) -> AlignResult<Vec<GpsAccel>> {
    Ok(accel_from_speed_tracks(&speed_tracks(gps)?))
}

/// `[time_ms, longitudinal, centripetal]` table for reporting
pub fn accel_table(series: &[GpsAccel]) -> Array2<f64> {
    let mut table = Array2::<f64>::zeros((series.len(), 3));
    for (mut row, sample) in table.rows_mut().into_iter().zip(series) {
        row[0] = sample.time_ms;
        row[1] = sample.longitudinal;
        row[2] = sample.centripetal;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn fix(time_ms: f64, speed: f64, track_deg: f64) -> SpeedTrack {
        SpeedTrack {
            time_ms,
            speed,
            track: track_deg.to_radians(),
        }
    }

    #[test]
    fn test_speed_track_unit_conversion() {
        let row = array![1000.0, 52.1, 4.3, 36.0, 90.0, 9.0, 120.0];
        let st = speed_track_from_row(row.view()).unwrap();

        assert_eq!(st.time_ms, 1000.0);
        assert_abs_diff_eq!(st.speed, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(st.track, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_short_row_is_rejected() {
        let row = array![1000.0, 52.1, 4.3, 36.0];
        assert!(speed_track_from_row(row.view()).is_none());
    }

    #[test]
    fn test_steady_motion_has_no_acceleration() {
        let a = accel_from_consecutive(&fix(1000.0, 12.0, 45.0), &fix(2000.0, 12.0, 45.0));
        assert_eq!(a.time_ms, 2000.0);
        assert_eq!(a.longitudinal, 0.0);
        assert_eq!(a.centripetal, 0.0);
    }

    #[test]
    fn test_longitudinal_acceleration() {
        let a = accel_from_consecutive(&fix(0.0, 10.0, 0.0), &fix(500.0, 12.0, 0.0));
        assert_abs_diff_eq!(a.longitudinal, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_right_turn_gives_negative_centripetal() {
        let a = accel_from_consecutive(&fix(0.0, 10.0, 0.0), &fix(1000.0, 10.0, 10.0));
        assert_abs_diff_eq!(a.centripetal, -10.0 * 10f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_turn_across_north_uses_short_delta() {
        let a = accel_from_consecutive(&fix(0.0, 10.0, 359.0), &fix(1000.0, 10.0, 1.0));
        assert_abs_diff_eq!(a.centripetal, -10.0 * 2f64.to_radians(), epsilon = 1e-9);
    }

    #[test]
    fn test_zero_dt_is_non_finite() {
        let a = accel_from_consecutive(&fix(1000.0, 10.0, 0.0), &fix(1000.0, 11.0, 5.0));
        assert!(!a.is_finite());
    }

    #[test]
    fn test_nan_timestamp_is_non_finite() {
        let a = accel_from_consecutive(&fix(0.0, 10.0, 0.0), &fix(f64::NAN, 10.0, 0.0));
        assert!(!a.is_finite());
        let b = accel_from_consecutive(&fix(f64::NAN, 10.0, 0.0), &fix(2000.0, 10.0, 0.0));
        assert!(b.longitudinal.is_nan());
        assert!(!b.is_finite());
    }

    #[test]
    fn test_accel_series_length_and_timestamps() {
        let gps = array![
            [0.0, 0.0, 0.0, 36.0, 0.0, 8.0, 10.0],
            [1000.0, 0.0, 0.0, 43.2, 0.0, 8.0, 10.0],
            [2000.0, 0.0, 0.0, 43.2, 0.0, 8.0, 10.0],
        ];
        let series = accel_series(gps.view()).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].time_ms, 1000.0);
        assert_eq!(series[1].time_ms, 2000.0);
        assert_abs_diff_eq!(series[0].longitudinal, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(series[1].longitudinal, 0.0, epsilon = 1e-12);

        let table = accel_table(&series);
        assert_eq!(table.dim(), (2, 3));
        assert_eq!(table[[1, 0]], 2000.0);
    }

    #[test]
    fn test_accel_series_rejects_narrow_table() {
        let gps = array![[0.0, 0.0, 0.0, 36.0]];
        assert!(matches!(
            accel_series(gps.view()),
            Err(AlignError::TableShape(_))
        ));
    }

    #[test]
    fn test_single_row_gives_empty_series() {
        let gps = array![[0.0, 0.0, 0.0, 36.0, 0.0]];
        assert!(accel_series(gps.view()).unwrap().is_empty());
    }
}
