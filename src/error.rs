//! Errors returned by the integrators.
use thiserror::Error;

/// Invalid arguments or options, detected before the first integrand evaluation.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The integrand or the domain has no dimensions.
    #[error("the integration domain must have at least one dimension")]
    ZeroDimension,

    /// The domain and the integrand disagree on the number of dimensions.
    #[error("the integrand has {expected} dimensions, but the domain has {found}")]
    DimensionMismatch {
        /// Dimensions of the integrand.
        expected: usize,
        /// Dimensions of the domain.
        found: usize,
    },

    /// Bounds that are not finite or where the lower bound is not smaller than the upper one.
    #[error("invalid bounds [{lower}, {upper}] in dimension {dimension}")]
    InvalidBounds {
        /// Index of the offending dimension.
        dimension: usize,
        /// The lower bound.
        lower: f64,
        /// The upper bound.
        upper: f64,
    },

    /// Not enough calls to give every hypercube of every iteration its two evaluations.
    #[error("{calls} calls are too few for {iterations} iterations, at least {minimum} are needed")]
    TooFewCalls {
        /// The requested number of calls.
        calls: usize,
        /// The requested number of iterations.
        iterations: usize,
        /// The smallest number of calls that works.
        minimum: usize,
    },

    /// At least one iteration is needed.
    #[error("the maximum number of iterations must be at least one")]
    ZeroIterations,

    /// The importance map needs at least one interval per dimension.
    #[error("the importance map needs at least one interval per dimension")]
    ZeroIntervals,

    /// An option has a value outside of its allowed range.
    #[error("invalid value for option `{name}`: {reason}")]
    InvalidOption {
        /// Name of the option.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Options could not be parsed.
    #[error("could not parse the integrator options")]
    Parse(#[from] serde_json::Error),
}

/// Errors that end an integration.
#[derive(Debug, Error)]
pub enum IntegrationError<E> {
    /// The arguments or options are inconsistent.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The integrand returned a different number of values than points were passed to it.
    #[error("the integrand returned {found} values for {expected} points")]
    BatchSize {
        /// Number of points in the batch.
        expected: usize,
        /// Number of values returned.
        found: usize,
    },

    /// The integrand failed. Failing evaluations are never retried.
    #[error("the integrand could not be evaluated")]
    Integrand(#[source] E),
}
