//! Wraparound-safe angular differences

use std::f64::consts::PI;

/// Signed minimal delta `d` with `angle0 + d ≡ angle1 (mod full_turn)`
///
/// The result lies in `(-full_turn/2, full_turn/2]`. With `bidirectional`
/// set, angles half a turn apart are treated as the same axis and the result
/// is folded into `(-full_turn/4, full_turn/4]`.
pub fn angular_delta(angle0: f64, angle1: f64, full_turn: f64, bidirectional: bool) -> f64 {
    let half_turn = full_turn / 2.0;
    let mut delta = angle1 - angle0;

    if delta > half_turn {
        delta -= full_turn;
    }
    if delta <= -half_turn {
        delta += full_turn;
    }

    if bidirectional {
        if delta <= -full_turn / 4.0 {
            delta += half_turn;
        }
        if delta > full_turn / 4.0 {
            delta -= half_turn;
        }
    }

    delta
}

pub fn delta_degrees(angle0: f64, angle1: f64, bidirectional: bool) -> f64 {
    angular_delta(angle0, angle1, 360.0, bidirectional)
}

pub fn delta_radians(angle0: f64, angle1: f64, bidirectional: bool) -> f64 {
    angular_delta(angle0, angle1, 2.0 * PI, bidirectional)
}
