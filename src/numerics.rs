//! numerics — compile-time precision and small numeric guards.
//!
//! Purpose
//! -------
//! Fix the floating-point type used throughout the correlation core and
//! centralize the few scalar helpers every kernel shares, so that the rest
//! of the crate can be written once against [`Real`].
//!
//! Key behaviors
//! -------------
//! - [`Real`] is `f64` by default and `f32` when the `single-precision`
//!   feature is enabled. Precision is a build-time choice, never a runtime
//!   parameter.
//! - [`clamp_unit`] absorbs floating-point drift that can push a
//!   correlation slightly outside `[-1, 1]`.
//! - [`VARIANT_TOL`] is the agreement tolerance between kernel variants
//!   at the configured precision.
//!
//! Conventions
//! -----------
//! - This module never logs, allocates, or touches global state.

/// Floating-point type of input samples, statistics, and results.
#[cfg(not(feature = "single-precision"))]
pub type Real = f64;

/// Floating-point type of input samples, statistics, and results.
#[cfg(feature = "single-precision")]
pub type Real = f32;

/// π at the configured precision.
#[cfg(not(feature = "single-precision"))]
pub const PI: Real = std::f64::consts::PI;

/// π at the configured precision.
#[cfg(feature = "single-precision")]
pub const PI: Real = std::f32::consts::PI;

/// Tolerance used when comparing results across kernel variants.
#[cfg(not(feature = "single-precision"))]
pub const VARIANT_TOL: Real = 1e-12;

/// Tolerance used when comparing results across kernel variants.
#[cfg(feature = "single-precision")]
pub const VARIANT_TOL: Real = 1e-6;

/// Clamp a correlation estimate into `[-1, 1]`.
///
/// `NaN` is passed through unchanged so that non-finite input data remains
/// visible in the output instead of being silently mapped to a bound.
#[inline]
pub fn clamp_unit(x: Real) -> Real {
    if x > 1.0 {
        1.0
    } else if x < -1.0 {
        -1.0
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Verify that `clamp_unit` maps out-of-range values onto the nearest
    // bound and leaves in-range values and NaN untouched.
    //
    // Given
    // -----
    // - Values slightly above 1, slightly below -1, inside the range, and NaN.
    //
    // Expect
    // ------
    // - 1.0, -1.0, the original value, and NaN respectively.
    fn clamp_unit_bounds_drift_and_preserves_nan() {
        // Arrange
        let above: Real = 1.0 + 1e-6;
        let below: Real = -1.0 - 1e-6;
        let inside: Real = 0.25;

        // Act / Assert
        assert_eq!(clamp_unit(above), 1.0);
        assert_eq!(clamp_unit(below), -1.0);
        assert_eq!(clamp_unit(inside), inside);
        assert!(clamp_unit(Real::NAN).is_nan());
    }
}
