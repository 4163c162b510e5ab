//! Distance decay laws for attractor influence
//!
//! Each law maps a horizontal distance `d` and a rate `r > 0` to an
//! attenuation `f(d, r)` with `f(0, r) = 1`, non-increasing in `d`.
//!
//! | Function    | f(d, r)                | Applied                   |
//! |-------------|------------------------|---------------------------|
//! | linear      | 1 − r·d                | additive: dz ± r·d        |
//! | exponential | e^(−r·d)               | multiplicative: dz · f    |
//! | logistic    | (e^(−d))^r             | multiplicative            |
//! | gaussian    | e^(−d² / 2r²)          | multiplicative            |
//! | lorentz     | r² / (d² + r²)         | multiplicative            |
//! | quadratic   | e^(−r·d³)              | multiplicative            |
//! | cubic       | e^(−r·d⁶)              | multiplicative            |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use earthworks_core::{Error, Result};

/// Iterations of the bisection in [`DecayFunction::influence_radius`]
const BISECTION_STEPS: usize = 100;

/// Attenuation law applied to an attractor's vertical offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayFunction {
    #[default]
    Linear,
    Exponential,
    Logistic,
    Gaussian,
    Lorentz,
    Quadratic,
    Cubic,
}

impl DecayFunction {
    /// All supported laws
    pub const ALL: [DecayFunction; 7] = [
        DecayFunction::Linear,
        DecayFunction::Exponential,
        DecayFunction::Logistic,
        DecayFunction::Gaussian,
        DecayFunction::Lorentz,
        DecayFunction::Quadratic,
        DecayFunction::Cubic,
    ];

    /// Attenuation `f(d, r)`
    ///
    /// Linear is reported as `1 − r·d`; it is used additively and may go
    /// negative past `d = 1/r`.
    pub fn attenuation(self, d: f64, r: f64) -> f64 {
        match self {
            DecayFunction::Linear => 1.0 - r * d,
            DecayFunction::Exponential => (-r * d).exp(),
            DecayFunction::Logistic => (-d).exp().powf(r),
            DecayFunction::Gaussian => (-(d * d) / (2.0 * r * r)).exp(),
            DecayFunction::Lorentz => (r * r) / (d * d + r * r),
            DecayFunction::Quadratic => (-r * d * d * d).exp(),
            DecayFunction::Cubic => {
                let d3 = d * d * d;
                (-r * d3 * d3).exp()
            }
        }
    }

    /// Whether the law offsets `dz` instead of scaling it
    pub fn is_additive(self) -> bool {
        matches!(self, DecayFunction::Linear)
    }

    /// Vertical offset of the cut candidate at distance `d`
    #[inline]
    pub fn growth(self, dz: f64, d: f64, r: f64) -> f64 {
        if self.is_additive() {
            dz + r * d
        } else {
            dz * self.attenuation(d, r)
        }
    }

    /// Vertical offset of the fill candidate at distance `d`
    #[inline]
    pub fn decay(self, dz: f64, d: f64, r: f64) -> f64 {
        if self.is_additive() {
            dz - r * d
        } else {
            dz * self.attenuation(d, r)
        }
    }

    /// Largest deviation from the surface an attractor with `|dz| = magnitude`
    /// can still cause at distance `d`
    pub fn residual(self, magnitude: f64, d: f64, r: f64) -> f64 {
        let magnitude = magnitude.abs();
        if self.is_additive() {
            (magnitude - r * d).max(0.0)
        } else {
            magnitude * self.attenuation(d, r)
        }
    }

    /// Smallest distance beyond which the residual stays within `tolerance`,
    /// capped at `max_distance`.
    pub fn influence_radius(self, rate: f64, magnitude: f64, tolerance: f64, max_distance: f64) -> f64 {
        let magnitude = magnitude.abs();
        if magnitude <= tolerance {
            return 0.0;
        }
        if self.is_additive() {
            return ((magnitude - tolerance) / rate).clamp(0.0, max_distance);
        }
        if self.residual(magnitude, max_distance, rate) > tolerance {
            return max_distance;
        }

        let (mut lo, mut hi) = (0.0, max_distance);
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if self.residual(magnitude, mid, rate) > tolerance {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        hi
    }
}

/// Reject rates that are not strictly positive
pub fn validate_rate(rate: f64) -> Result<()> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid_parameter("rate", rate, "must be a positive number"))
    }
}

impl fmt::Display for DecayFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecayFunction::Linear => "linear",
            DecayFunction::Exponential => "exponential",
            DecayFunction::Logistic => "logistic",
            DecayFunction::Gaussian => "gaussian",
            DecayFunction::Lorentz => "lorentz",
            DecayFunction::Quadratic => "quadratic",
            DecayFunction::Cubic => "cubic",
        };
        f.write_str(name)
    }
}

impl FromStr for DecayFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(DecayFunction::Linear),
            "exponential" | "exp" => Ok(DecayFunction::Exponential),
            "logistic" => Ok(DecayFunction::Logistic),
            "gaussian" => Ok(DecayFunction::Gaussian),
            "lorentz" => Ok(DecayFunction::Lorentz),
            "quadratic" => Ok(DecayFunction::Quadratic),
            "cubic" => Ok(DecayFunction::Cubic),
            _ => Err(Error::invalid_parameter(
                "function",
                s,
                "expected one of linear, exponential, logistic, gaussian, lorentz, quadratic, cubic",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        assert_relative_eq!(DecayFunction::Exponential.attenuation(2.0, 0.5), (-1.0f64).exp());
        assert_relative_eq!(DecayFunction::Logistic.attenuation(1.0, 2.0), (-2.0f64).exp());
        assert_relative_eq!(DecayFunction::Gaussian.attenuation(2.0, 1.0), (-2.0f64).exp());
        assert_relative_eq!(DecayFunction::Lorentz.attenuation(1.0, 1.0), 0.5);
        assert_relative_eq!(DecayFunction::Quadratic.attenuation(2.0, 0.1), (-0.8f64).exp());
        assert_relative_eq!(DecayFunction::Cubic.attenuation(2.0, 0.01), (-0.64f64).exp());
    }

    #[test]
    fn test_linear_is_additive() {
        let f = DecayFunction::Linear;
        assert!(f.is_additive());
        assert_relative_eq!(f.growth(-5.0, 2.0, 1.0), -3.0);
        assert_relative_eq!(f.decay(5.0, 2.0, 1.0), 3.0);
        assert!(DecayFunction::ALL[1..].iter().all(|f| !f.is_additive()));
    }

    #[test]
    fn test_multiplicative_growth_equals_decay() {
        let f = DecayFunction::Gaussian;
        assert_relative_eq!(f.growth(4.0, 1.5, 2.0), f.decay(4.0, 1.5, 2.0));
        assert_relative_eq!(f.decay(4.0, 0.0, 2.0), 4.0);
    }

    #[test]
    fn test_validate_rate() {
        assert!(validate_rate(0.1).is_ok());
        assert!(validate_rate(0.0).is_err());
        assert!(validate_rate(-1.0).is_err());
        assert!(validate_rate(f64::NAN).is_err());
        assert!(validate_rate(f64::INFINITY).is_err());
    }

    #[test]
    fn test_influence_radius() {
        assert_relative_eq!(DecayFunction::Linear.influence_radius(1.0, 5.0, 0.0, 100.0), 5.0);
        assert_relative_eq!(DecayFunction::Linear.influence_radius(0.5, 5.0, 0.0, 4.0), 4.0);
        assert_eq!(DecayFunction::Exponential.influence_radius(1.0, 1e-12, 1e-9, 100.0), 0.0);

        let r = DecayFunction::Exponential.influence_radius(1.0, 10.0, 1e-6, 1000.0);
        assert_relative_eq!(r, (1e7f64).ln(), epsilon = 1e-6);
        // lorentz decays too slowly to reach the tolerance inside the cap
        assert_eq!(DecayFunction::Lorentz.influence_radius(1.0, 10.0, 1e-9, 50.0), 50.0);
    }

    #[test]
    fn test_parse_and_display() {
        for f in DecayFunction::ALL {
            assert_eq!(f.to_string().parse::<DecayFunction>().unwrap(), f);
        }
        assert_eq!("GAUSSIAN".parse::<DecayFunction>().unwrap(), DecayFunction::Gaussian);
        assert!("sigmoid".parse::<DecayFunction>().is_err());
    }

    proptest! {
        #[test]
        fn prop_no_attenuation_at_origin(rate in 1e-3f64..50.0) {
            for f in DecayFunction::ALL {
                prop_assert_eq!(f.attenuation(0.0, rate), 1.0);
            }
        }

        #[test]
        fn prop_non_increasing(rate in 1e-3f64..10.0, d in 0.0f64..100.0, step in 0.0f64..10.0) {
            for f in DecayFunction::ALL {
                prop_assert!(f.attenuation(d + step, rate) <= f.attenuation(d, rate));
            }
        }

        #[test]
        fn prop_residual_within_tolerance_beyond_radius(
            rate in 0.05f64..5.0,
            magnitude in 0.1f64..100.0,
            extra in 0.0f64..10.0,
        ) {
            let tolerance = 1e-9;
            for f in DecayFunction::ALL {
                let radius = f.influence_radius(rate, magnitude, tolerance, 1e6);
                if radius < 1e6 {
                    prop_assert!(f.residual(magnitude, radius + extra, rate) <= tolerance + magnitude * 1e-12);
                }
            }
        }
    }
}
