//! Shared test utilities for the atmo-profiles workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Temporary file helpers
//! - Synthetic atmosphere generators
//! - Common test fixtures
//! - Approximate float assertions
//!
//! It deliberately depends on no workspace crate, so any crate can use it
//! as a dev-dependency. Generators return plain arrays.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_rel_eq, synthetic_atmosphere, AtmosphereKind};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for relative floating-point equality assertions.
///
/// Passes when `|left - right| <= rtol * |right|`. Two zeros compare equal.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_rel_eq;
///
/// assert_rel_eq!(9.4045e22, 9.40e22, 1e-2); // passes
/// ```
#[macro_export]
macro_rules! assert_rel_eq {
    ($left:expr, $right:expr, $rtol:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let rtol: f64 = $rtol as f64;
        let diff = (left - right).abs();
        if diff > rtol * right.abs() {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  relative diff: `{:?}` > rtol `{:?}`",
                left,
                right,
                diff / right.abs(),
                rtol
            );
        }
    }};
}

/// Macro for element-wise approximate equality of two slices.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_all_approx_eq;
///
/// assert_all_approx_eq!(&[1.0, 2.0], &[1.0001, 2.0], 0.001);
/// ```
#[macro_export]
macro_rules! assert_all_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: &[f64] = $left;
        let right: &[f64] = $right;
        assert_eq!(left.len(), right.len(), "slice lengths differ");
        for (l, r) in left.iter().zip(right.iter()) {
            $crate::assert_approx_eq!(*l, *r, $epsilon);
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_rel_eq_passes() {
        assert_rel_eq!(9.4045e22, 9.40e22, 1e-2);
        assert_rel_eq!(0.0, 0.0, 1e-6);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_rel_eq_fails() {
        assert_rel_eq!(1.1e20, 1.0e20, 1e-3);
    }

    #[test]
    fn test_assert_all_approx_eq_passes() {
        assert_all_approx_eq!(&[1.0001, 2.0001], &[1.0, 2.0], 0.001);
    }
}
