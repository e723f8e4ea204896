//! # Vehicle Platforms
//!
//! The closed set of vehicle platforms the software can drive, and the
//! per-platform parameter row loaded from the vehicle table file. Platform
//! differences that matter to control (minimum steer speed, how the steering
//! rack gates low speed torque) are captured here so the arbiters can match
//! on an enum rather than string compare fingerprints.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

use crate::steer::SteerLimits;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Supported vehicle platforms.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Platform {
    /// 2017 minivan, hybrid drivetrain.
    Minivan2017Hybrid,

    /// 2018 minivan, combustion drivetrain.
    Minivan2018,

    /// 2018 minivan, hybrid drivetrain.
    Minivan2018Hybrid,

    /// 2019 minivan, hybrid drivetrain.
    Minivan2019Hybrid,

    /// 2020 minivan, combustion drivetrain.
    Minivan2020,

    /// 2018 crossover.
    Crossover2018,

    /// 2019 crossover.
    Crossover2019,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Per-platform parameters, one row of the vehicle table file.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VehicleParams {
    /// The platform this row describes.
    pub platform: Platform,

    /// Minimum speed at which the steering rack accepts external torque.
    ///
    /// Units: meters/second
    pub min_steer_speed_ms: f64,

    /// Steering torque rate limiter configuration.
    pub steer_limits: SteerLimits,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Platform {
    /// Platforms whose racks keep accepting torque well below the standard
    /// minimum steer speed. For these the rack's own status signals gate
    /// torque instead of a speed threshold.
    pub fn low_speed_steer(&self) -> bool {
        matches!(
            self,
            Platform::Minivan2017Hybrid
                | Platform::Minivan2018
                | Platform::Minivan2018Hybrid
                | Platform::Crossover2018
        )
    }

    /// Minimum speed at which the steering rack accepts external torque.
    ///
    /// The 2019 onwards racks refuse torque below 17.5 m/s on the way up
    /// (they stay engaged a few m/s below that once engaged, which the
    /// asymmetric latch in the steering arbiter exploits).
    ///
    /// Units: meters/second
    pub fn min_steer_speed_ms(&self) -> f64 {
        match self {
            Platform::Minivan2019Hybrid | Platform::Minivan2020 | Platform::Crossover2019 => 17.5,
            _ => 3.8,
        }
    }
}

impl VehicleParams {
    /// Build the default parameter row for a platform, used when no vehicle
    /// table file overrides it.
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            min_steer_speed_ms: platform.min_steer_speed_ms(),
            steer_limits: SteerLimits::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_platform_classification() {
        assert!(Platform::Minivan2018Hybrid.low_speed_steer());
        assert!(Platform::Crossover2018.low_speed_steer());
        assert!(!Platform::Minivan2020.low_speed_steer());
        assert!(!Platform::Crossover2019.low_speed_steer());

        assert_eq!(Platform::Minivan2017Hybrid.min_steer_speed_ms(), 3.8);
        assert_eq!(Platform::Minivan2019Hybrid.min_steer_speed_ms(), 17.5);
        assert_eq!(Platform::Crossover2019.min_steer_speed_ms(), 17.5);
    }
}
