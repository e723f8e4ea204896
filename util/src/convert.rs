//! Unit conversion factors.
//!
//! All internal calculations use SI units (metres per second). These factors
//! are applied only at the boundaries: the cluster display and some parameter
//! files use miles or kilometres per hour.

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Miles per hour to metres per second
pub const MPH_TO_MS: f64 = 0.44704;

/// Metres per second to miles per hour
pub const MS_TO_MPH: f64 = 1.0 / MPH_TO_MS;

/// Kilometres per hour to metres per second
pub const KPH_TO_MS: f64 = 1.0 / 3.6;

/// Metres per second to kilometres per hour
pub const MS_TO_KPH: f64 = 3.6;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_trips() {
        assert!((MPH_TO_MS * MS_TO_MPH - 1.0).abs() < 1e-12);
        assert!((KPH_TO_MS * MS_TO_KPH - 1.0).abs() < 1e-12);
        assert!((20.0 * MPH_TO_MS - 8.9408).abs() < 1e-12);
    }
}
