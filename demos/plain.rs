use vegas_enhanced::callbacks::SimpleCumulativeCallback;
use vegas_enhanced::core::*;
use vegas_enhanced::integrators::plain::*;
use vegas_enhanced::RandomSource;

use rand_pcg::Pcg64;
use std::convert::Infallible;

struct MyIntegrand;

/// Integrating the function x^2
/// from x=1 to x=3
/// Which gives the result: 26/3
impl Integrand<f64> for MyIntegrand {
    type Error = Infallible;

    fn call(&self, x: &[f64]) -> Result<f64, Infallible> {
        Ok(x[0].powi(2))
    }

    /// The dimension of the integrand.
    fn dim(&self) -> usize {
        1
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the random number generator.
    let mut rng = RandomSource::new(Pcg64::new(
        0xcafef00dd15ea5e5,
        0xa02bdbf7bb3c0a7ac28fa16a64abf96,
    ));
    let domain = Domain::new(vec![(1.0, 3.0)])?;

    // print the cumulative result after each iteration
    let callback = SimpleCumulativeCallback {};

    let results_per_iteration = integrate(
        &MyIntegrand,
        &domain,
        &mut rng,
        &callback,
        &[100_000, 100_000, 100_000, 100_000],
    )?;

    // combine
    let final_result = results_per_iteration
        .into_iter()
        .fold(PlainEstimators::default(), |acc, r| acc + r);

    println!("\n{:?} +- {:?}", final_result.mean(), final_result.std());

    Ok(())
}
