#![warn(clippy::all, clippy::cargo, clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

//! The crate `vegas-enhanced` provides adaptive [Monte Carlo integration] routines, which allow to
//! efficiently approximate definite multi-dimensional [integrals] of black-box functions over
//! rectangular domains. The main integrator implements the VEGAS-Enhanced algorithm (VEGAS+), see
//! [arXiv:2009.05112], which combines an adaptive importance-sampling map with adaptive stratified
//! sampling and combines the results of its iterations weighted by their inverse variances.
//!
//! # Features
//!
//! - **Generic numeric type**. The numeric type used in this library is not fixed, but instead a
//! generic parameter, so that the integration routines can be used with either `f32`, `f64`, or a
//! custom numeric type that implements the `Float` trait from the `num-traits` crate.
//! - **Generic random number generator**. Every random number generator that implements the `Rng`
//! trait from the `rand` crate can be wrapped into a [`RandomSource`] and used with every
//! integrator in this crate.
//! - **Reproducibility**. As far as the numeric type allows this, all results are completely
//! reproducible, in the sense that they only depend on the used random number generator and the
//! chosen seed.
//! - **Batched integrands**. The integrand is called once per iteration with all phase space
//! points of that iteration, so that vectorized implementations can be plugged in directly.
//! - **Non-finite number filtering**. Integrands sometimes produce `inf` or `nan` in extreme
//! regions of their integration domain due to finite numerical precision. These values are set to
//! zero to not destroy the integration and a counter keeps track of how often this happened.
//!
//! # What is ...?
//!
//! Given
//!
//! $$ I = \int_{a_1}^{b_1} \mathrm{d} x_1 \cdots \int_{a_d}^{b_d} \mathrm{d} x_d \, f(x_1, \ldots,
//! x_d) $$
//!
//! VEGAS samples points $y$ uniformly in the unit hypercube, maps them with an adaptive map $x(y)$
//! into the integration domain and estimates $I$ as the mean of $J(y) f(x(y))$, where $J$ is the
//! Jacobian of the map. We use the following terms:
//!
//! - the number of *calls* is the number of times the integrand is evaluated. We assume that this
//! is the expensive operation,
//! - an *iteration* is a batch of calls after which the map and the stratification are adapted,
//! - the *map* (or grid) is the piecewise-linear transformation $x(y)$, which becomes denser in
//! regions where $|f|$ is large,
//! - the *stratification* splits the unit hypercube into smaller hypercubes, each of which
//! receives a number of calls proportional to its standard deviation,
//! - the *chi-square per iteration* measures whether the results of the last iterations agree with
//! each other within their uncertainties. Values much larger than one signal an unreliable result.
//!
//! [Monte Carlo integration]: https://en.wikipedia.org/wiki/Monte_Carlo_integration
//! [integrals]: https://en.wikipedia.org/wiki/Integral
//! [arXiv:2009.05112]: https://arxiv.org/abs/2009.05112

pub mod callbacks;
pub mod core;
pub mod error;
pub mod integrators;
pub mod random;

pub use crate::core::*;
pub use crate::error::{ConfigurationError, IntegrationError};
pub use crate::integrators::vegas::{integrate_with_seed as integrate, VegasOptions, VegasResult};
pub use crate::random::RandomSource;
