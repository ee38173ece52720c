//! Implementation of different callback functions.
use crate::core::estimators::{BasicEstimators, MeanVar};
use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Summary of a finished iteration that is handed to a [`Callback`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IterationReport<T> {
    iteration: usize,
    calls: usize,
    estimate: MeanVar<T>,
    cumulative: MeanVar<T>,
}

impl<T> IterationReport<T> {
    /// Constructor.
    pub(crate) const fn new(
        iteration: usize,
        calls: usize,
        estimate: MeanVar<T>,
        cumulative: MeanVar<T>,
    ) -> Self {
        Self {
            iteration,
            calls,
            estimate,
            cumulative,
        }
    }

    /// Returns the one-based index of the iteration.
    pub const fn iteration(&self) -> usize {
        self.iteration
    }

    /// Returns the number of calls accounted so far.
    pub const fn calls(&self) -> usize {
        self.calls
    }

    /// Returns the estimate of this iteration alone.
    pub const fn estimate(&self) -> &MeanVar<T> {
        &self.estimate
    }

    /// Returns the combination of this iteration with the previous ones that are still part of
    /// the result.
    pub const fn cumulative(&self) -> &MeanVar<T> {
        &self.cumulative
    }
}

/// Trait for implementing callbacks for iterative MC algorithms
pub trait Callback<T> {
    /// This method is called after each successfully finished iteration and may print information
    /// about it.
    fn print(&self, report: &IterationReport<T>);
}

/// A callback function that does nothing
pub struct SinkCallback {}

impl<T> Callback<T> for SinkCallback {
    fn print(&self, _: &IterationReport<T>) {}
}

/// A callback function that prints the result of each individual iteration
pub struct SimpleCallback {}

impl<T> Callback<T> for SimpleCallback
where
    T: Display + Float,
{
    fn print(&self, report: &IterationReport<T>) {
        println!("iteration {} finished.", report.iteration);
        println!(
            "this iteration: N={} E={} \u{b1} {}",
            report.calls,
            report.estimate.mean(),
            report.estimate.std()
        );
    }
}

/// Simple cumulative callback that shows the result of the individual integration
/// together with the cumulative result combining it with the previous iterations.
pub struct SimpleCumulativeCallback {}

impl<T> Callback<T> for SimpleCumulativeCallback
where
    T: Display + Float,
{
    fn print(&self, report: &IterationReport<T>) {
        println!(
            "[iteration {}: E={} \u{b1} {}] [Cumulative: N={}, E={} \u{b1} {}]",
            report.iteration,
            report.estimate.mean(),
            report.estimate.std(),
            report.calls,
            report.cumulative.mean(),
            report.cumulative.std()
        );
    }
}

/// Emits every report as a structured `tracing` event at the `INFO` level.
pub struct TracingCallback {}

impl<T> Callback<T> for TracingCallback
where
    T: Display + Float,
{
    fn print(&self, report: &IterationReport<T>) {
        tracing::info!(
            iteration = report.iteration,
            calls = report.calls,
            estimate = %report.estimate.mean(),
            error = %report.estimate.std(),
            cumulative = %report.cumulative.mean(),
            cumulative_error = %report.cumulative.std(),
            "iteration finished"
        );
    }
}
