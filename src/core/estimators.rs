//! This module contains everything related to estimators and how the results of several
//! iterations are combined.
use crate::core::{from_usize, Real};
use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Basic estimators, like the mean, variance, and the standard deviation.
pub trait BasicEstimators<T: Float> {
    /// Returns the mean value.
    fn mean(&self) -> T;

    /// Returns the variance, $V$.
    fn var(&self) -> T;

    /// Returns the standard deviation, $\sigma = \sqrt{V}$.
    fn std(&self) -> T {
        self.var().sqrt()
    }
}

/// More estimators.
pub trait Estimators<T: Float>: BasicEstimators<T> {
    /// Returns the number of times $N$, the integrand has been called.
    fn calls(&self) -> usize;

    /// Returns the number of times, $N_\mathrm{nf}$, the integrand has been called
    /// and its return value was non-finite.
    fn non_finite_calls(&self) -> usize;

    /// Returns the number of times, $N_\mathrm{nz}$, the integrand has been called
    /// and its return value was non-zero.
    fn non_zero_calls(&self) -> usize;
}

/// A mean together with its variance. The integrators use it to record the result of a single
/// iteration.
///
/// Adding two of them adds both means and variances, which is the estimator of the sum of two
/// independent estimates.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct MeanVar<T> {
    mean: T,
    var: T,
}

impl<T: std::ops::Add<Output = T>> Add for MeanVar<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            mean: self.mean + other.mean,
            var: self.var + other.var,
        }
    }
}

impl<T: std::ops::Add<Output = T> + AddAssign> AddAssign for MeanVar<T> {
    fn add_assign(&mut self, other: Self) {
        self.mean += other.mean;
        self.var += other.var;
    }
}

impl<T> MeanVar<T> {
    /// Constructor.
    pub const fn new(mean: T, var: T) -> Self {
        Self { mean, var }
    }
}

impl<T: Float> BasicEstimators<T> for MeanVar<T> {
    fn mean(&self) -> T {
        self.mean
    }

    fn var(&self) -> T {
        self.var
    }
}

/// Combines the results of several iterations into a single estimate.
///
/// The mean is the inverse-variance weighted mean
///
/// $$ I = \frac{\sum_k I_k / \sigma_k^2}{\sum_k 1 / \sigma_k^2} $$
///
/// and the variance is $1 / \sum_k \sigma_k^{-2}$. If some iterations have a vanishing variance the
/// weighted mean is not defined; then the arithmetic mean of all iterations is returned instead,
/// together with a vanishing variance. An empty slice gives a zero mean with infinite variance.
pub fn combine<T: Real>(records: &[MeanVar<T>]) -> MeanVar<T> {
    if records.is_empty() {
        return MeanVar::new(T::zero(), T::infinity());
    }

    let (numerator, denominator) = records
        .iter()
        .fold((T::zero(), T::zero()), |(num, den), record| {
            (num + record.mean / record.var, den + T::one() / record.var)
        });

    let weighted = numerator / denominator;
    let mean = if weighted.is_finite() {
        weighted
    } else {
        records.iter().map(|record| record.mean).sum::<T>() / from_usize(records.len())
    };

    MeanVar::new(mean, T::one() / denominator)
}

/// Computes
///
/// $$ \chi^2 = \sum_k \frac{(I_k - I)^2}{\sigma_k^2} $$
///
/// for the given `mean`, $I$. Iterations with vanishing variance that agree exactly with `mean`
/// contribute nothing.
pub fn chi_square<T: Real>(records: &[MeanVar<T>], mean: T) -> T {
    records
        .iter()
        .map(|record| {
            let term = (record.mean - mean).powi(2) / record.var;
            if term.is_nan() {
                T::zero()
            } else {
                term
            }
        })
        .sum()
}
