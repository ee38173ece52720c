use vegas_enhanced::callbacks::{Callback, IterationReport, SinkCallback};
use vegas_enhanced::core::*;
use vegas_enhanced::integrators::vegas::{self, Termination, Vegas, VegasOptions};
use vegas_enhanced::{ConfigurationError, IntegrationError, RandomSource};

use assert_approx_eq::assert_approx_eq;
use rand_pcg::Pcg64;
use std::cell::Cell;
use std::convert::Infallible;

struct Constant {
    dim: usize,
    value: f64,
}

impl Integrand<f64> for Constant {
    type Error = Infallible;

    fn dim(&self) -> usize {
        self.dim
    }

    fn call(&self, _: &[f64]) -> Result<f64, Infallible> {
        Ok(self.value)
    }
}

struct Sin;

impl Integrand<f64> for Sin {
    type Error = Infallible;

    fn dim(&self) -> usize {
        1
    }

    // int_0^5 dx sin(x) = 1 - cos(5)
    fn call(&self, x: &[f64]) -> Result<f64, Infallible> {
        Ok(x[0].sin())
    }
}

struct SinSingle;

impl Integrand<f32> for SinSingle {
    type Error = Infallible;

    fn dim(&self) -> usize {
        1
    }

    fn call(&self, x: &[f32]) -> Result<f32, Infallible> {
        Ok(x[0].sin())
    }
}

/// A narrow Gaussian centered at `center` with width `sigma`, not normalized.
struct Peak {
    center: f64,
    sigma: f64,
}

impl Integrand<f64> for Peak {
    type Error = Infallible;

    fn dim(&self) -> usize {
        1
    }

    fn call(&self, x: &[f64]) -> Result<f64, Infallible> {
        let z = (x[0] - self.center) / self.sigma;
        Ok((-0.5 * z * z).exp())
    }
}

#[derive(Debug, PartialEq)]
struct OutOfRange(f64);

impl std::fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} is out of range", self.0)
    }
}

impl std::error::Error for OutOfRange {}

/// Fails for every point with `x > 0.5`.
struct Failing;

impl Integrand<f64> for Failing {
    type Error = OutOfRange;

    fn dim(&self) -> usize {
        1
    }

    fn call(&self, x: &[f64]) -> Result<f64, OutOfRange> {
        if x[0] > 0.5 {
            Err(OutOfRange(x[0]))
        } else {
            Ok(1.0)
        }
    }
}

/// Drops the last value of every batch.
struct Truncating;

impl Integrand<f64> for Truncating {
    type Error = Infallible;

    fn dim(&self) -> usize {
        1
    }

    fn call(&self, _: &[f64]) -> Result<f64, Infallible> {
        Ok(1.0)
    }

    fn call_batch(&self, points: &[Vec<f64>]) -> Result<Vec<f64>, Infallible> {
        Ok(vec![1.0; points.len().saturating_sub(1)])
    }
}

#[derive(Default)]
struct Counter {
    reports: Cell<usize>,
    last_iteration: Cell<usize>,
}

impl Callback<f64> for Counter {
    fn print(&self, report: &IterationReport<f64>) {
        self.reports.set(self.reports.get() + 1);
        self.last_iteration.set(report.iteration());
    }
}

#[test]
fn constant_integrands() {
    let options = VegasOptions::default();

    for dim in 1..=3 {
        let bounds: Vec<_> = (0..dim).map(|d| (-1.0, d as f64 + 0.5)).collect();
        let volume: f64 = bounds.iter().map(|(a, b)| b - a).product();
        let integrand = Constant { dim, value: 3.0 };

        let result =
            vegas::integrate_with_seed(&integrand, 50_000, &bounds, 42, &options).unwrap();

        assert_approx_eq!(result.value(), 3.0 * volume, 1e-12 * 3.0 * volume);
        assert!(result.error().is_finite());

        // nothing to adapt to
        let map = result.map();
        for d in 0..dim {
            let widths = map.widths(d);
            assert!(widths.iter().all(|&w| w == widths[0]));
            assert_approx_eq!(widths[0] * map.n_intervals() as f64, bounds[d].1 + 1.0, 1e-12);
        }
    }
}

#[test]
fn sine() {
    let exact = 1.0 - 5.0_f64.cos();
    let options = VegasOptions::default();
    let result =
        vegas::integrate_with_seed(&Sin, 100_000, &[(0.0, 5.0)], 0x1234_5678, &options).unwrap();

    assert_approx_eq!(result.value(), exact, 1e-2 * exact);
    assert_eq!(result.non_finite_calls(), 0);
}

#[test]
fn sine_single_precision() {
    let exact = 1.0 - 5.0_f32.cos();
    let result = vegas::integrate_with_seed(
        &SinSingle,
        50_000,
        &[(0.0_f32, 5.0_f32)],
        7,
        &VegasOptions::default(),
    )
    .unwrap();

    assert_approx_eq!(result.value(), exact, 1e-2 * exact);
}

#[test]
fn narrow_peak_attracts_intervals() {
    let peak = Peak {
        center: 5.0,
        sigma: 0.1,
    };
    let exact = (2.0 * std::f64::consts::PI).sqrt() * peak.sigma;
    let result =
        vegas::integrate_with_seed(&peak, 200_000, &[(0.0, 10.0)], 11, &VegasOptions::default())
            .unwrap();

    assert_approx_eq!(result.value(), exact, 1e-2 * exact);

    let map = result.map();
    let uniform = 10.0 / map.n_intervals() as f64;
    let edges = map.edges(0);
    let widths = map.widths(0);

    // the interval containing the peak shrank, the ones at the boundaries grew
    let peak_interval = edges.windows(2).position(|e| e[0] <= 5.0 && 5.0 < e[1]).unwrap();

    assert!(widths[peak_interval] < 0.5 * uniform);
    assert!(widths[0] > uniform);
    assert!(widths[widths.len() - 1] > uniform);

    assert_approx_eq!(edges[0], 0.0, 1e-12);
    assert_approx_eq!(edges[edges.len() - 1], 10.0, 1e-12);
}

#[test]
fn vanishing_integrand_converges() {
    let options = VegasOptions {
        eps_rel: 1e-3,
        ..VegasOptions::default()
    };
    let integrand = Constant { dim: 2, value: 0.0 };
    let result =
        vegas::integrate_with_seed(&integrand, 10_000, &[(0.0, 1.0), (0.0, 1.0)], 3, &options)
            .unwrap();

    assert_eq!(result.termination(), Termination::Converged);
    assert_eq!(result.iterations(), 5);
    assert_eq!(result.value(), 0.0);
    assert_eq!(result.non_zero_calls(), 0);
}

#[test]
fn convergence_in_the_last_iteration_counts() {
    let options = VegasOptions {
        eps_rel: 1e-3,
        max_iterations: 5,
        ..VegasOptions::default()
    };
    let integrand = Constant { dim: 1, value: 0.0 };
    let result =
        vegas::integrate_with_seed(&integrand, 10_000, &[(0.0, 1.0)], 3, &options).unwrap();

    assert_eq!(result.termination(), Termination::Converged);
    assert_eq!(result.iterations(), 5);
    assert_eq!(result.records().len(), 5);
}

#[test]
fn without_accuracy_goal_the_integration_never_converges() {
    let integrand = Constant { dim: 1, value: 0.0 };
    let result = vegas::integrate_with_seed(
        &integrand,
        10_000,
        &[(0.0, 1.0)],
        3,
        &VegasOptions::default(),
    )
    .unwrap();

    assert_ne!(result.termination(), Termination::Converged);
    assert!(result.iterations() <= 20);
}

#[test]
fn iteration_limit() {
    let options = VegasOptions {
        max_iterations: 3,
        ..VegasOptions::default()
    };
    let result = vegas::integrate_with_seed(&Sin, 30_000, &[(0.0, 5.0)], 5, &options).unwrap();

    assert!(result.iterations() <= 3);
    assert!(!result.records().is_empty());
}

#[test]
fn warmup_calls_are_reported_separately() {
    let with = vegas::integrate_with_seed(&Sin, 20_000, &[(0.0, 5.0)], 9, &VegasOptions::default())
        .unwrap();
    let without = vegas::integrate_with_seed(
        &Sin,
        20_000,
        &[(0.0, 5.0)],
        9,
        &VegasOptions {
            use_warmup: false,
            ..VegasOptions::default()
        },
    )
    .unwrap();

    // five warmup iterations with a fifth of the 1000 calls per iteration each
    assert_eq!(with.warmup_calls(), 1000);
    assert_eq!(without.warmup_calls(), 0);
}

#[test]
fn fixed_map_stays_uniform() {
    let options = VegasOptions {
        use_grid_improve: false,
        use_warmup: false,
        ..VegasOptions::default()
    };
    let peak = Peak {
        center: 0.3,
        sigma: 0.05,
    };
    let result = vegas::integrate_with_seed(&peak, 20_000, &[(0.0, 1.0)], 1, &options).unwrap();

    let widths = result.map().widths(0);
    let uniform = 1.0 / widths.len() as f64;

    for &width in widths {
        assert_approx_eq!(width, uniform, 1e-12);
    }
}

#[test]
fn same_seed_same_result() {
    let options = VegasOptions::default();
    let first = vegas::integrate_with_seed(&Sin, 20_000, &[(0.0, 5.0)], 99, &options).unwrap();
    let second = vegas::integrate_with_seed(&Sin, 20_000, &[(0.0, 5.0)], 99, &options).unwrap();
    let other = vegas::integrate_with_seed(&Sin, 20_000, &[(0.0, 5.0)], 100, &options).unwrap();

    assert_eq!(first.value().to_bits(), second.value().to_bits());
    assert_eq!(first.error().to_bits(), second.error().to_bits());
    assert_eq!(first.iterations(), second.iterations());
    assert_eq!(first.calls(), second.calls());
    assert_ne!(first.value().to_bits(), other.value().to_bits());
}

#[test]
fn callback_sees_every_iteration() {
    let domain = Domain::new(vec![(0.0, 5.0)]).unwrap();
    let mut rng = RandomSource::<Pcg64>::seed_from_u64(17);
    let counter = Counter::default();

    let result = Vegas::default()
        .integrate(&Sin, 20_000, &domain, &mut rng, &counter)
        .unwrap();

    assert_eq!(counter.reports.get(), result.iterations());
    assert_eq!(counter.last_iteration.get(), result.iterations());
}

#[test]
fn integrand_errors_are_propagated() {
    let result =
        vegas::integrate_with_seed(&Failing, 10_000, &[(0.0, 1.0)], 0, &VegasOptions::default());

    match result {
        Err(IntegrationError::Integrand(OutOfRange(x))) => assert!(x > 0.5),
        other => panic!("unexpected result: {:?}", other.map(|r| r.value())),
    }
}

#[test]
fn short_batches_are_rejected() {
    let result =
        vegas::integrate_with_seed(&Truncating, 10_000, &[(0.0, 1.0)], 0, &VegasOptions::default());

    assert!(matches!(result, Err(IntegrationError::BatchSize { .. })));
}

#[test]
fn configuration_errors() {
    let options = VegasOptions::default();

    let zero_dim = Constant { dim: 0, value: 1.0 };
    assert!(matches!(
        vegas::integrate_with_seed(&zero_dim, 10_000, &[(0.0, 1.0)], 0, &options),
        Err(IntegrationError::Configuration(
            ConfigurationError::ZeroDimension
        ))
    ));

    let two_dim = Constant { dim: 2, value: 1.0 };
    assert!(matches!(
        vegas::integrate_with_seed(&two_dim, 10_000, &[(0.0, 1.0)], 0, &options),
        Err(IntegrationError::Configuration(
            ConfigurationError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        ))
    ));

    assert!(matches!(
        vegas::integrate_with_seed(&Sin, 10_000, &[(1.0, 0.0)], 0, &options),
        Err(IntegrationError::Configuration(
            ConfigurationError::InvalidBounds { dimension: 0, .. }
        ))
    ));

    assert!(matches!(
        vegas::integrate_with_seed(&Sin, 30, &[(0.0, 1.0)], 0, &options),
        Err(IntegrationError::Configuration(
            ConfigurationError::TooFewCalls {
                calls: 30,
                iterations: 20,
                minimum: 40
            }
        ))
    ));

    let no_iterations = VegasOptions {
        max_iterations: 0,
        ..VegasOptions::default()
    };
    assert!(matches!(
        vegas::integrate_with_seed(&Sin, 10_000, &[(0.0, 1.0)], 0, &no_iterations),
        Err(IntegrationError::Configuration(
            ConfigurationError::ZeroIterations
        ))
    ));
}

#[test]
fn results_are_estimators() {
    let domain = Domain::new(vec![(0.0, 5.0)]).unwrap();
    let mut rng = RandomSource::<Pcg64>::seed_from_u64(23);
    let result = vegas::integrate(
        &Sin,
        20_000,
        &domain,
        &mut rng,
        &SinkCallback {},
        &VegasOptions::default(),
    )
    .unwrap();

    assert_eq!(result.mean(), result.value());
    assert_eq!(result.std(), result.error());
    assert!(result.chi_square_per_iteration() >= 0.0);
}
