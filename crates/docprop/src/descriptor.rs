//! # Constraint Descriptors
//!
//! Bounds `{lower, upper, step}` for constrained numeric cells. A descriptor
//! is either a process-wide static table (never freed) or owned by the cell
//! that built it from a dynamic value.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PropertyError, Result};

/// Inclusive bounds plus the editor step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub lower: T,
    pub upper: T,
    pub step: T,
}

/// Numeric types that can be constrained
pub trait Bounded: Copy + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Lower bound reported when no descriptor is installed
    const ABSOLUTE_MIN: Self;
    /// Upper bound reported when no descriptor is installed
    const ABSOLUTE_MAX: Self;
    const DEFAULT_STEP: Self;

    /// Normalise a requested step or reject it
    fn validate_step(step: Self) -> Result<Self>;
}

impl Bounded for i64 {
    const ABSOLUTE_MIN: Self = i32::MIN as i64;
    const ABSOLUTE_MAX: Self = i32::MAX as i64;
    const DEFAULT_STEP: Self = 1;

    fn validate_step(step: Self) -> Result<Self> {
        Ok(step.max(1))
    }
}

impl Bounded for f64 {
    const ABSOLUTE_MIN: Self = f64::MIN;
    const ABSOLUTE_MAX: Self = f64::MAX;
    const DEFAULT_STEP: Self = 1.0;

    fn validate_step(step: Self) -> Result<Self> {
        if step.is_nan() || step < f64::EPSILON {
            return Err(PropertyError::ValueRejected(
                "Step size must be greater than zero".to_string(),
            ));
        }
        Ok(step)
    }
}

impl<T: Bounded> Bounds<T> {
    /// Build a descriptor from untrusted input
    pub fn new(lower: T, upper: T, step: T) -> Result<Self> {
        match lower.partial_cmp(&upper) {
            Some(Ordering::Greater) => {
                return Err(PropertyError::ValueRejected(format!(
                    "Lower bound {} is greater than upper bound {}",
                    lower, upper
                )))
            }
            None => {
                return Err(PropertyError::ValueRejected(format!(
                    "Bounds {} and {} are not comparable",
                    lower, upper
                )))
            }
            _ => {}
        }
        Ok(Self {
            lower,
            upper,
            step: T::validate_step(step)?,
        })
    }

    /// A value that does not compare (NaN) becomes `lower`
    pub fn clamp(&self, value: T) -> T {
        match (value.partial_cmp(&self.lower), value.partial_cmp(&self.upper)) {
            (None, _) | (_, None) | (Some(Ordering::Less), _) => self.lower,
            (_, Some(Ordering::Greater)) => self.upper,
            _ => value,
        }
    }
}

/// 0..=100 in steps of 1
pub static PERCENT_BOUNDS: Bounds<i64> = Bounds {
    lower: 0,
    upper: 100,
    step: 1,
};

/// 0.0..=f64::MAX in steps of 0.001
pub static PRECISION_BOUNDS: Bounds<f64> = Bounds {
    lower: 0.0,
    upper: f64::MAX,
    step: 0.001,
};

/// Active descriptor of a constrained cell
#[derive(Debug, Clone, PartialEq)]
pub enum Constraints<T: 'static> {
    Shared(&'static Bounds<T>),
    Owned(Box<Bounds<T>>),
}

impl<T: 'static> Constraints<T> {
    pub fn bounds(&self) -> &Bounds<T> {
        match self {
            Constraints::Shared(bounds) => *bounds,
            Constraints::Owned(bounds) => bounds.as_ref(),
        }
    }

    /// Whether replacing this descriptor frees it
    pub fn is_deletable(&self) -> bool {
        matches!(self, Constraints::Owned(_))
    }
}

impl<T: 'static> From<Bounds<T>> for Constraints<T> {
    fn from(bounds: Bounds<T>) -> Self {
        Constraints::Owned(Box::new(bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_step_is_floored_to_one() {
        let bounds = Bounds::<i64>::new(0, 10, 0).unwrap();
        assert_eq!(bounds.step, 1);
        let bounds = Bounds::<i64>::new(0, 10, -5).unwrap();
        assert_eq!(bounds.step, 1);
    }

    #[test]
    fn test_float_step_must_be_positive() {
        let err = Bounds::<f64>::new(0.0, 1.0, 0.0).unwrap_err();
        assert_eq!(err.to_string(), "Step size must be greater than zero");
        assert!(Bounds::<f64>::new(0.0, 1.0, 0.1).is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        assert!(Bounds::<i64>::new(5, 1, 1).unwrap_err().is_value_rejected());
    }

    #[test]
    fn test_clamp() {
        assert_eq!(PERCENT_BOUNDS.clamp(150), 100);
        assert_eq!(PERCENT_BOUNDS.clamp(-3), 0);
        assert_eq!(PERCENT_BOUNDS.clamp(42), 42);
    }

    #[test]
    fn test_nan_clamps_to_lower_and_is_not_a_bound() {
        let bounds = Bounds::<f64>::new(-1.0, 1.0, 0.5).unwrap();
        assert_eq!(bounds.clamp(f64::NAN), -1.0);
        assert_eq!(PRECISION_BOUNDS.clamp(f64::NAN), 0.0);
        assert_eq!(bounds.clamp(f64::INFINITY), 1.0);

        assert!(Bounds::<f64>::new(f64::NAN, 1.0, 0.5).unwrap_err().is_value_rejected());
        assert!(Bounds::<f64>::new(0.0, 1.0, f64::NAN).unwrap_err().is_value_rejected());
    }

    #[test]
    fn test_ownership() {
        let shared = Constraints::Shared(&PRECISION_BOUNDS);
        assert!(!shared.is_deletable());
        assert_eq!(shared.bounds().step, 0.001);

        let owned: Constraints<f64> = Bounds::new(1.0, 2.0, 0.5).unwrap().into();
        assert!(owned.is_deletable());
        assert_eq!(owned.bounds().upper, 2.0);
    }
}
