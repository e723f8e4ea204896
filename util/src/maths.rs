//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::AddAssign
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Floor a value to two decimal places.
///
/// Used when quantising commanded values onto the bus, which carries two
/// decimals of precision. Flooring rather than rounding so that a command
/// never exceeds the value the arbiter computed.
pub fn floor_2dp<T>(value: T) -> T
where
    T: Float
{
    let hundred = T::from(100).unwrap();
    (value * hundred).floor() / hundred
}

/// Round a value to two decimal places.
pub fn round_2dp<T>(value: T) -> T
where
    T: Float
{
    let hundred = T::from(100).unwrap();
    (value * hundred).round() / hundred
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&0.5f64, &0f64, &1f64), 0.5f64);
        assert_eq!(clamp(&-0.5f64, &0f64, &1f64), 0f64);
        assert_eq!(clamp(&1.5f64, &0f64, &1f64), 1f64);
        assert_eq!(clamp(&-7.2f64, &-4f64, &0f64), -4f64);
    }

    #[test]
    fn test_floor_2dp() {
        assert_eq!(floor_2dp(1.237f64), 1.23f64);
        assert_eq!(floor_2dp(-1.237f64), -1.24f64);
        assert_eq!(floor_2dp(0.5f64), 0.5f64);
        assert_eq!(floor_2dp(0f64), 0f64);
    }

    #[test]
    fn test_round_2dp() {
        assert_eq!(round_2dp(1.237f64), 1.24f64);
        assert_eq!(round_2dp(-1.234f64), -1.23f64);
        assert_eq!(round_2dp(2.5f64), 2.5f64);
    }
}
