use vegas_enhanced::callbacks::SimpleCumulativeCallback;
use vegas_enhanced::core::*;
use vegas_enhanced::integrators::vegas::{self, VegasOptions};
use vegas_enhanced::RandomSource;

use rand_pcg::Pcg64;
use std::convert::Infallible;
use tracing_subscriber::EnvFilter;

/// A narrow Gaussian in four dimensions, normalized to one over the unit hypercube (up to
/// exponentially small corrections).
struct Gaussian;

impl Integrand<f64> for Gaussian {
    type Error = Infallible;

    fn call(&self, x: &[f64]) -> Result<f64, Infallible> {
        const SIGMA: f64 = 0.05;
        let r2: f64 = x.iter().map(|xi| (xi - 0.5).powi(2)).sum();
        let norm = (2.0 * std::f64::consts::PI * SIGMA * SIGMA).powi(2);

        Ok((-0.5 * r2 / (SIGMA * SIGMA)).exp() / norm)
    }

    fn dim(&self) -> usize {
        4
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // set `RUST_LOG=vegas_enhanced=debug` to follow the adaptation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // the first argument may hold the options as JSON
    let options = match std::env::args().nth(1) {
        Some(json) => VegasOptions::from_json(&json)?,
        None => VegasOptions {
            eps_rel: 1e-3,
            ..VegasOptions::default()
        },
    };

    let domain = Domain::unit(4)?;
    let mut rng = RandomSource::<Pcg64>::seed_from_u64(0xcafe_f00d);

    let result = vegas::integrate(
        &Gaussian,
        1_000_000,
        &domain,
        &mut rng,
        &SimpleCumulativeCallback {},
        &options,
    )?;

    println!(
        "\n{} +- {} (chi2/it = {:.2}, {:?} after {} iterations)",
        result.value(),
        result.error(),
        result.chi_square_per_iteration(),
        result.termination(),
        result.iterations()
    );

    Ok(())
}
