//! Acceleration target hysteresis filter

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Filter small oscillations out of the upstream acceleration target.
///
/// While the target stays within `gap` of the held steady value the steady
/// value is kept, so that torque and brake decisions do not chatter on
/// planner noise. A target outside the band drags the steady value along,
/// offset by the gap. Returns `(output_accel, new_steady)`, which are always
/// equal, the caller owns the steady value between cycles.
///
/// Units: m/s^2 throughout.
pub fn accel_hysteresis(accel: f64, accel_steady: f64, gap: f64) -> (f64, f64) {
    let new_steady = if accel > accel_steady + gap {
        accel - gap
    } else if accel < accel_steady - gap {
        accel + gap
    } else {
        accel_steady
    };

    (new_steady, new_steady)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
