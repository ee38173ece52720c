//! PLAIN Monte Carlo integrator, which samples the integration domain uniformly.
use crate::callbacks::{Callback, IterationReport};
use crate::core::estimators::*;
use crate::core::*;
use crate::error::{ConfigurationError, IntegrationError};
use crate::random::RandomSource;

use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::Add;

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Estimators for the plain integrator.
pub struct PlainEstimators<T> {
    sum: T,
    sumsq: T,
    calls: usize,
    non_finite_calls: usize,
    non_zero_calls: usize,
}

impl<T: Real> Default for PlainEstimators<T> {
    fn default() -> Self {
        Self {
            sum: T::zero(),
            sumsq: T::zero(),
            calls: 0,
            non_finite_calls: 0,
            non_zero_calls: 0,
        }
    }
}

impl<T: Real> Add for PlainEstimators<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            sumsq: self.sumsq + other.sumsq,
            calls: self.calls + other.calls,
            non_finite_calls: self.non_finite_calls + other.non_finite_calls,
            non_zero_calls: self.non_zero_calls + other.non_zero_calls,
        }
    }
}

impl<T: Real> PlainEstimators<T> {
    /// Adds the result of a single call.
    fn update(&mut self, value: T) {
        self.calls += 1;

        if value != T::zero() {
            self.non_zero_calls += 1;

            if value.is_finite() {
                self.sum += value;
                self.sumsq += value * value;
            } else {
                self.non_finite_calls += 1;
            }
        }
    }
}

impl<T: Real> BasicEstimators<T> for PlainEstimators<T> {
    fn mean(&self) -> T {
        self.sum / from_usize(self.calls)
    }

    fn var(&self) -> T {
        let calls = from_usize::<T>(self.calls);
        (self.sumsq - self.sum * self.sum / calls) / calls / (calls - T::one())
    }
}

impl<T: Real> Estimators<T> for PlainEstimators<T> {
    fn calls(&self) -> usize {
        self.calls
    }

    fn non_finite_calls(&self) -> usize {
        self.non_finite_calls
    }

    fn non_zero_calls(&self) -> usize {
        self.non_zero_calls
    }
}

/// Compute the number of calls in the iteration with index `iteration` (zero-based), if
/// `total_calls` calls are split into `iterations` iterations.
pub(crate) fn calls_for_iteration(
    iteration: usize,
    iterations: usize,
    total_calls: usize,
) -> usize {
    // make sure passed data is valid
    debug_assert!(iteration < iterations);

    let calls_per_iteration = (total_calls + iterations - 1) / iterations;

    // the last iteration might not need all of `calls_per_iteration` to reach `total_calls`
    if iterations == iteration + 1 {
        total_calls - iteration * calls_per_iteration
    } else {
        calls_per_iteration
    }
}

/// Perform a single iteration of integrating the `integrand` over `domain` using `calls` samples.
fn integrate_iteration<T, I, R>(
    integrand: &I,
    domain: &Domain<T>,
    rng: &mut RandomSource<R>,
    calls: usize,
) -> Result<PlainEstimators<T>, IntegrationError<I::Error>>
where
    T: Real,
    I: Integrand<T>,
    R: Rng,
    Standard: Distribution<T>,
{
    let volume = domain.volume();
    let points: Vec<Vec<T>> = rng
        .points::<T>(calls, domain.dim())
        .iter()
        .map(|y| domain.scale(y))
        .collect();

    let values = evaluate(integrand, &points)?;

    Ok(values
        .into_iter()
        .fold(PlainEstimators::default(), |mut acc, value| {
            acc.update(value * volume);
            acc
        }))
}

/// Integrate the `integrand` over `domain`, performing one iteration for every entry of
/// `iterations`, which holds its number of calls.
///
/// Random numbers are taken from `rng` and `callback` prints estimates after each iteration. The
/// estimators of every iteration are returned; adding them gives the combined result.
///
/// # Errors
///
/// Returns [`IntegrationError::Configuration`] if the domain does not fit the integrand or if an
/// iteration has fewer than two calls, and [`IntegrationError::Integrand`] if the integrand fails.
pub fn integrate<T, I, R, C>(
    integrand: &I,
    domain: &Domain<T>,
    rng: &mut RandomSource<R>,
    callback: &C,
    iterations: &[usize],
) -> Result<Vec<PlainEstimators<T>>, IntegrationError<I::Error>>
where
    T: Real,
    I: Integrand<T>,
    R: Rng,
    C: Callback<T>,
    Standard: Distribution<T>,
{
    domain.check_dim(integrand.dim())?;

    // two calls are needed to estimate a variance
    if iterations.is_empty() || iterations.iter().any(|&calls| calls < 2) {
        return Err(ConfigurationError::TooFewCalls {
            calls: iterations.iter().sum(),
            iterations: iterations.len(),
            minimum: 2 * iterations.len().max(1),
        }
        .into());
    }

    // storage for the results of each iteration
    let mut results = Vec::with_capacity(iterations.len());
    let mut cumulative = PlainEstimators::default();

    for (index, &calls) in iterations.iter().enumerate() {
        let estimators = integrate_iteration(integrand, domain, rng, calls)?;
        cumulative = cumulative + estimators.clone();

        callback.print(&IterationReport::new(
            index + 1,
            cumulative.calls(),
            MeanVar::new(estimators.mean(), estimators.var()),
            MeanVar::new(cumulative.mean(), cumulative.var()),
        ));

        results.push(estimators);
    }

    Ok(results)
}

/// The PLAIN integrator, implementing the common [`Integrator`] calling convention.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Plain {
    iterations: usize,
}

impl Plain {
    /// Creates an integrator that splits its calls evenly into `iterations` iterations.
    pub const fn new(iterations: usize) -> Self {
        Self { iterations }
    }

    /// Returns the number of iterations.
    pub const fn iterations(&self) -> usize {
        self.iterations
    }
}

impl Default for Plain {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<T: Real> Integrator<T> for Plain {
    type Output = PlainEstimators<T>;

    fn integrate<I, R, C>(
        &self,
        integrand: &I,
        calls: usize,
        domain: &Domain<T>,
        rng: &mut RandomSource<R>,
        callback: &C,
    ) -> Result<PlainEstimators<T>, IntegrationError<I::Error>>
    where
        I: Integrand<T>,
        R: Rng,
        C: Callback<T>,
        Standard: Distribution<T>,
    {
        if self.iterations == 0 {
            return Err(ConfigurationError::ZeroIterations.into());
        }

        let iterations: Vec<usize> = (0..self.iterations)
            .map(|iteration| calls_for_iteration(iteration, self.iterations, calls))
            .collect();

        Ok(integrate(integrand, domain, rng, callback, &iterations)?
            .into_iter()
            .fold(PlainEstimators::default(), |acc, e| acc + e))
    }
}
