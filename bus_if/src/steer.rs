//! # Steering Torque Rate Limiter
//!
//! Limits how fast the commanded steering torque may move, both against the
//! previous command and against the torque the power steering motor is
//! currently applying. Exceeding either band risks faulting the rack, so the
//! limiter is the last stage before a steering command leaves the controller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Configuration of the steering torque rate limiter.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct SteerLimits {
    /// Maximum commanded torque magnitude.
    pub max: i32,

    /// Maximum per-cycle change away from zero.
    pub delta_up: i32,

    /// Maximum per-cycle change towards zero.
    pub delta_down: i32,

    /// Maximum divergence between the command and the torque the motor is
    /// actually applying.
    pub error_max: i32,
}

impl Default for SteerLimits {
    fn default() -> Self {
        Self {
            max: 261,
            delta_up: 3,
            delta_down: 3,
            error_max: 80,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Rate limit a steering torque command.
///
/// `desired` is the raw command, `last_applied` the value returned by this
/// function on the previous cycle, and `eps_torque` the torque the power
/// steering motor currently reports.
pub fn apply_steer_torque_limits(
    desired: i32,
    last_applied: i32,
    eps_torque: f64,
    limits: &SteerLimits,
) -> i32 {
    let max_f = limits.max as f64;
    let error_max_f = limits.error_max as f64;

    // Limits from comparing the command with the motor torque, exceeding
    // these is likely to fault the rack
    let max_lim = (eps_torque + error_max_f).max(error_max_f).min(max_f);
    let min_lim = (eps_torque - error_max_f).min(-error_max_f).max(-max_f);

    let mut apply = (desired as f64).max(min_lim).min(max_lim);

    // Slow the rate when the torque increases in magnitude
    if last_applied > 0 {
        apply = apply
            .max((last_applied - limits.delta_down).max(-limits.delta_up) as f64)
            .min((last_applied + limits.delta_up) as f64);
    } else {
        apply = apply
            .max((last_applied - limits.delta_up) as f64)
            .min((last_applied + limits.delta_down).min(limits.delta_up) as f64);
    }

    apply.round() as i32
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rate_limits() {
        let limits = SteerLimits::default();

        // Rising from zero is limited to delta_up per cycle
        assert_eq!(apply_steer_torque_limits(100, 0, 0.0, &limits), 3);
        assert_eq!(apply_steer_torque_limits(100, 3, 0.0, &limits), 6);

        // Falling back towards zero is limited to delta_down per cycle
        assert_eq!(apply_steer_torque_limits(0, 100, 0.0, &limits), 97);

        // Crossing zero from negative is limited to delta_down
        assert_eq!(apply_steer_torque_limits(100, -2, 0.0, &limits), 1);

        // Small steps inside the band pass through
        assert_eq!(apply_steer_torque_limits(5, 4, 0.0, &limits), 5);
        assert_eq!(apply_steer_torque_limits(-5, -4, 0.0, &limits), -5);
    }

    #[test]
    fn test_motor_torque_band() {
        let limits = SteerLimits::default();

        // The motor pulling hard one way narrows the band on the other side:
        // with eps at -100 the upper limit is error_max - 100 + 80 capped at
        // error_max, so a held command settles at 80
        assert_eq!(apply_steer_torque_limits(150, 80, -100.0, &limits), 80);
        assert_eq!(apply_steer_torque_limits(150, 78, -100.0, &limits), 80);

        // An already-high last command walks back down at delta_down per
        // cycle rather than jumping into the band
        assert_eq!(apply_steer_torque_limits(150, 150, -100.0, &limits), 147);

        // Band edges never exceed the absolute maximum
        let applied = apply_steer_torque_limits(1000, 260, 1000.0, &limits);
        assert!(applied <= limits.max);
    }

    #[test]
    fn test_magnitude_clamp() {
        let limits = SteerLimits::default();

        // No command may exceed max in either direction
        assert!(apply_steer_torque_limits(1000, 261, 300.0, &limits) <= limits.max);
        assert!(apply_steer_torque_limits(-1000, -261, -300.0, &limits) >= -limits.max);
    }
}
