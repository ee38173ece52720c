//! The core module. You don't need to import its members since all of them are part of the crate
//! namespace.
pub mod domain;
pub mod estimators;

pub use crate::core::domain::Domain;
pub use crate::core::estimators::*;

use crate::callbacks::Callback;
use crate::error::IntegrationError;
use crate::random::RandomSource;
use num_traits::{Float, FromPrimitive};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use std::fmt::{Debug, Display};
use std::iter::Sum;
use std::ops::AddAssign;

/// Numeric types the integrators can work with, for example `f32` and `f64`.
pub trait Real:
    Float + FromPrimitive + AddAssign + Sum + Debug + Display + Send + Sync + 'static
{
}

impl<T> Real for T where
    T: Float + FromPrimitive + AddAssign + Sum + Debug + Display + Send + Sync + 'static
{
}

/// Converts `n` into `T`. Counts that do not fit are mapped to infinity.
pub(crate) fn from_usize<T: Real>(n: usize) -> T {
    T::from_usize(n).unwrap_or_else(T::infinity)
}

/// Converts the constant `x` into `T`.
pub(crate) fn from_f64<T: Real>(x: f64) -> T {
    T::from_f64(x).unwrap_or_else(T::nan)
}

/// Trait which every integrand must implement.
pub trait Integrand<T>: Send + Sync {
    /// Error returned by a failing evaluation. It is handed to the caller unchanged.
    type Error;

    /// Returns the number of dimensions of the integration domain.
    fn dim(&self) -> usize;

    /// Calculates the value of the integrand at the point `x`, which has `dim()` components.
    ///
    /// # Errors
    ///
    /// Returns the integrand's own error if it cannot be evaluated at `x`.
    fn call(&self, x: &[T]) -> Result<T, Self::Error>;

    /// Evaluates the integrand for a whole batch of points and returns one value per point, in the
    /// same order. The integrators call this method once per iteration; override it if the
    /// integrand can be evaluated more efficiently in bulk.
    ///
    /// # Errors
    ///
    /// Returns the first error returned by [`Integrand::call`].
    fn call_batch(&self, points: &[Vec<T>]) -> Result<Vec<T>, Self::Error> {
        points.iter().map(|x| self.call(x)).collect()
    }
}

/// Common calling convention of all integrators in this crate.
///
/// Each family implements it independently, since the state they carry between iterations has
/// nothing in common.
pub trait Integrator<T: Real> {
    /// Result of a complete integration.
    type Output;

    /// Integrates `integrand` over `domain` using about `calls` evaluations. Random numbers are
    /// drawn from `rng` and `callback` is notified after every iteration.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::Configuration`] if the arguments are inconsistent, and
    /// [`IntegrationError::Integrand`] if the integrand fails.
    fn integrate<I, R, C>(
        &self,
        integrand: &I,
        calls: usize,
        domain: &Domain<T>,
        rng: &mut RandomSource<R>,
        callback: &C,
    ) -> Result<Self::Output, IntegrationError<I::Error>>
    where
        I: Integrand<T>,
        R: Rng,
        C: Callback<T>,
        Standard: Distribution<T>;
}

/// Evaluates `integrand` for all `points` and makes sure it returned as many values as requested.
pub(crate) fn evaluate<T, I>(
    integrand: &I,
    points: &[Vec<T>],
) -> Result<Vec<T>, IntegrationError<I::Error>>
where
    T: Real,
    I: Integrand<T>,
{
    let values = integrand
        .call_batch(points)
        .map_err(IntegrationError::Integrand)?;

    if values.len() == points.len() {
        Ok(values)
    } else {
        Err(IntegrationError::BatchSize {
            expected: points.len(),
            found: values.len(),
        })
    }
}
