//! The VEGAS-Enhanced integrator.
//!
//! Every iteration distributes its calls among the hypercubes of a [`Stratification`], maps the
//! resulting points through the [`ImportanceMap`] into the integration domain and evaluates the
//! integrand once for the whole batch. The products of the integrand and the Jacobian of the map
//! are used to estimate the integral of the iteration and to adapt both the map and the
//! stratification. The results of the iterations are combined weighted with their inverse
//! variances. Every five iterations a $\chi^2$ test checks whether they are consistent; if they are
//! not, or if the requested accuracy was not reached, the number of calls per iteration is
//! increased and the previous results are discarded.
pub mod map;
pub mod stratification;

pub use self::map::ImportanceMap;
pub use self::stratification::Stratification;

use self::stratification::MIN_CALLS_PER_CUBE;
use crate::callbacks::{Callback, IterationReport, SinkCallback};
use crate::core::estimators::{chi_square, combine, BasicEstimators, Estimators, MeanVar};
use crate::core::{evaluate, from_f64, from_usize, Domain, Integrand, Integrator, Real};
use crate::error::{ConfigurationError, IntegrationError};
use crate::random::RandomSource;
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Number of iterations between two consistency checks.
const CHECK_INTERVAL: usize = 5;

/// Options of the VEGAS integrator.
///
/// All fields have defaults, so options can be read from partial JSON documents:
///
/// ```
/// use vegas_enhanced::VegasOptions;
///
/// let options = VegasOptions::from_json(r#"{ "eps_rel": 1e-3, "max_iterations": 40 }"#).unwrap();
/// assert_eq!(options.max_iterations, 40);
/// assert!(options.use_warmup);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct VegasOptions {
    /// Adapt the importance map and the stratification after every iteration.
    pub use_grid_improve: bool,
    /// Stop once the relative error is smaller than this. Zero never stops early.
    pub eps_rel: f64,
    /// Stop once the absolute error is smaller than this. Zero never stops early.
    pub eps_abs: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Adapt the importance map with a few unstratified iterations before the actual integration.
    pub use_warmup: bool,
    /// Number of warmup iterations.
    pub warmup_iterations: usize,
    /// Damping exponent of the importance map, between zero (no adaptation) and one.
    pub alpha: f64,
    /// Damping exponent of the stratification, between zero (no adaptation) and one.
    pub beta: f64,
    /// Number of intervals of the importance map per dimension. If `None`, a tenth of the calls per
    /// iteration is used, but at least two.
    pub n_intervals: Option<usize>,
}

impl Default for VegasOptions {
    fn default() -> Self {
        Self {
            use_grid_improve: true,
            eps_rel: 0.0,
            eps_abs: 0.0,
            max_iterations: 20,
            use_warmup: true,
            warmup_iterations: 5,
            alpha: 0.5,
            beta: 0.75,
            n_intervals: None,
        }
    }
}

impl VegasOptions {
    /// Parses options from a JSON document and validates them. Missing fields take their default
    /// values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Parse`] for malformed documents and the errors of
    /// [`VegasOptions::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Checks that all options lie in their allowed ranges.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_iterations == 0 {
            return Err(ConfigurationError::ZeroIterations);
        }

        if self.n_intervals == Some(0) {
            return Err(ConfigurationError::ZeroIntervals);
        }

        for &(name, value) in &[("eps_rel", self.eps_rel), ("eps_abs", self.eps_abs)] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigurationError::InvalidOption {
                    name,
                    reason: format!("{} is not a finite, non-negative number", value),
                });
            }
        }

        for &(name, value) in &[("alpha", self.alpha), ("beta", self.beta)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::InvalidOption {
                    name,
                    reason: format!("{} is not in [0, 1]", value),
                });
            }
        }

        Ok(())
    }
}

/// Why the integration stopped.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum Termination {
    /// The requested accuracy was reached and the iterations are consistent.
    Converged,
    /// The maximum number of iterations was performed.
    MaxIterationsReached,
    /// Another iteration would have exceeded the number of calls.
    BudgetExhausted,
}

/// Result of a VEGAS integration.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VegasResult<T> {
    estimate: MeanVar<T>,
    chi_square: T,
    termination: Termination,
    iterations: usize,
    calls: usize,
    warmup_calls: usize,
    non_finite_calls: usize,
    non_zero_calls: usize,
    records: Vec<MeanVar<T>>,
    map: ImportanceMap<T>,
}

impl<T: Real> VegasResult<T> {
    /// Returns the estimate of the integral.
    pub fn value(&self) -> T {
        self.estimate.mean()
    }

    /// Returns the estimated uncertainty of [`VegasResult::value`].
    pub fn error(&self) -> T {
        self.estimate.std()
    }

    /// Returns $\chi^2$ of the iterations entering the result, divided by their number. Values
    /// much larger than one indicate that the iterations do not agree within their uncertainties.
    pub fn chi_square_per_iteration(&self) -> T {
        self.chi_square / from_usize(self.records.len().max(1))
    }

    /// Returns why the integration stopped.
    pub const fn termination(&self) -> Termination {
        self.termination
    }

    /// Returns the number of performed iterations, not counting the warmup.
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the number of calls spent in the warmup. They are not part of
    /// [`Estimators::calls`].
    pub const fn warmup_calls(&self) -> usize {
        self.warmup_calls
    }

    /// Returns the results of the iterations that were combined into the final estimate.
    pub fn records(&self) -> &[MeanVar<T>] {
        &self.records
    }

    /// Returns the importance map as adapted by the last iteration.
    pub const fn map(&self) -> &ImportanceMap<T> {
        &self.map
    }
}

impl<T: Real> BasicEstimators<T> for VegasResult<T> {
    fn mean(&self) -> T {
        self.estimate.mean()
    }

    fn var(&self) -> T {
        self.estimate.var()
    }
}

impl<T: Real> Estimators<T> for VegasResult<T> {
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

/// The VEGAS integrator, implementing the common [`Integrator`] calling convention.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Vegas {
    options: VegasOptions,
}

impl Vegas {
    /// Creates an integrator with the given `options`.
    pub const fn new(options: VegasOptions) -> Self {
        Self { options }
    }

    /// Returns the options.
    pub const fn options(&self) -> &VegasOptions {
        &self.options
    }
}

impl<T: Real> Integrator<T> for Vegas {
    type Output = VegasResult<T>;

    fn integrate<I, R, C>(
        &self,
        integrand: &I,
        calls: usize,
        domain: &Domain<T>,
        rng: &mut RandomSource<R>,
        callback: &C,
    ) -> Result<VegasResult<T>, IntegrationError<I::Error>>
    where
        I: Integrand<T>,
        R: Rng,
        C: Callback<T>,
        Standard: Distribution<T>,
    {
        integrate(integrand, calls, domain, rng, callback, &self.options)
    }
}

/// Multiplies the integrand `values` with the `jacobians`. Non-finite products are replaced by
/// zero. Also returns how many products were non-finite and how many values were non-zero.
fn weighted_values<T: Real>(values: &[T], jacobians: &[T]) -> (Vec<T>, usize, usize) {
    let mut non_finite = 0;
    let mut non_zero = 0;

    let weighted: Vec<T> = values
        .iter()
        .zip(jacobians)
        .map(|(&f, &jac)| {
            if f != T::zero() {
                non_zero += 1;
            }

            let jf = f * jac;
            if jf.is_finite() {
                jf
            } else {
                non_finite += 1;
                T::zero()
            }
        })
        .collect();

    (weighted, non_finite, non_zero)
}

/// Estimates the integral of an iteration from the per-hypercube sums.
fn iteration_estimate<T: Real>(
    cube_volume: T,
    neval: &[usize],
    sum: &[T],
    sumsq: &[T],
) -> MeanVar<T> {
    neval
        .iter()
        .zip(sum.iter().zip(sumsq))
        .map(|(&n, (&s, &s2))| {
            let n = from_usize::<T>(n);
            let integral = s / n * cube_volume;
            let var = s2 / n * cube_volume * cube_volume - integral * integral;
            MeanVar::new(integral, var.max(T::zero()) / n)
        })
        .fold(MeanVar::new(T::zero(), T::zero()), |acc, cube| acc + cube)
}

/// Everything that changes during a single integration.
struct VegasState<T> {
    iteration: usize,
    /// Calls accounted against the budget.
    evaluations: usize,
    calls_per_iteration: usize,
    increment: usize,
    warmup_calls: usize,
    non_finite_calls: usize,
    non_zero_calls: usize,
    map: ImportanceMap<T>,
    strat: Stratification<T>,
    records: Vec<MeanVar<T>>,
}

impl<T: Real> VegasState<T> {
    fn new(
        domain: &Domain<T>,
        increment: usize,
        options: &VegasOptions,
    ) -> Result<Self, ConfigurationError> {
        let n_intervals = options.n_intervals.unwrap_or_else(|| (increment / 10).max(2));

        Ok(Self {
            iteration: 0,
            evaluations: 0,
            calls_per_iteration: increment,
            increment,
            warmup_calls: 0,
            non_finite_calls: 0,
            non_zero_calls: 0,
            map: ImportanceMap::new(domain.bounds(), n_intervals, from_f64(options.alpha))?,
            strat: Stratification::new(increment, domain.dim(), from_f64(options.beta)),
            records: Vec::new(),
        })
    }

    /// Adapts the map with `iterations` unstratified iterations of `samples` calls each. Their
    /// results are only logged.
    fn warmup<I, R>(
        &mut self,
        integrand: &I,
        rng: &mut RandomSource<R>,
        iterations: usize,
        samples: usize,
    ) -> Result<(), IntegrationError<I::Error>>
    where
        I: Integrand<T>,
        R: Rng,
        Standard: Distribution<T>,
    {
        debug!(iterations, samples, "warming up the importance map");
        let n = from_usize::<T>(samples);

        for iteration in 0..iterations {
            let ys = rng.points::<T>(samples, self.map.dim());
            let (xs, jacobians) = self.map.map_batch(&ys);
            let values = evaluate(integrand, &xs)?;
            let (weighted, non_finite, _) = weighted_values(&values, &jacobians);

            if non_finite > 0 {
                warn!(
                    iteration,
                    non_finite, "non-finite values during the warmup were set to zero"
                );
            }

            let mut sum = T::zero();
            let mut sumsq = T::zero();

            for (y, &jf) in ys.iter().zip(&weighted) {
                self.map.accumulate_weight(y, jf * jf);
                sum += jf;
                sumsq += jf * jf;
            }

            self.map.update_map();
            self.warmup_calls += samples;

            let mean = sum / n;
            let var = ((sumsq / n - mean * mean) / n).max(T::zero());
            debug!(
                iteration,
                samples,
                "warmup result = {} \u{b1} {}",
                mean,
                var.sqrt()
            );
        }

        Ok(())
    }

    /// Performs a single stratified iteration and returns its estimate.
    fn run_iteration<I, R>(
        &mut self,
        integrand: &I,
        rng: &mut RandomSource<R>,
        adapt: bool,
    ) -> Result<MeanVar<T>, IntegrationError<I::Error>>
    where
        I: Integrand<T>,
        R: Rng,
        Standard: Distribution<T>,
    {
        let neval = self.strat.get_nh(self.calls_per_iteration);
        self.evaluations += neval.iter().sum::<usize>();

        let ys = self.strat.get_y(&neval, rng);
        let (xs, jacobians) = self.map.map_batch(&ys);
        let values = evaluate(integrand, &xs)?;
        let (weighted, non_finite, non_zero) = weighted_values(&values, &jacobians);

        if non_finite > 0 {
            warn!(
                iteration = self.iteration,
                non_finite, "integrand returned non-finite values, they were set to zero"
            );
        }

        self.non_finite_calls += non_finite;
        self.non_zero_calls += non_zero;

        if adapt {
            for (y, &jf) in ys.iter().zip(&weighted) {
                self.map.accumulate_weight(y, jf * jf);
            }
        }

        let (sum, sumsq) = self.strat.accumulate_weight(&neval, &weighted);
        let record = iteration_estimate(self.strat.cube_volume(), &neval, &sum, &sumsq);

        if adapt {
            self.map.update_map();
            self.strat.update_dh(&neval, &sum, &sumsq);
        }

        Ok(record)
    }

    /// Returns $\chi^2$ per iteration, the relative and the absolute error of all records.
    fn quality(&self) -> (T, T, T) {
        let combined = combine(&self.records);
        let result = combined.mean();
        let error = combined.std();
        let chi2 = chi_square(&self.records, result) / from_usize(CHECK_INTERVAL);

        let mut accuracy = error / result.abs();
        if accuracy.is_nan() {
            accuracy = T::zero();
        }

        (chi2, accuracy, error)
    }

    /// Checks whether the recorded iterations reached the requested accuracy and agree with each
    /// other.
    fn converged(&self, options: &VegasOptions) -> bool {
        let (chi2, accuracy, error) = self.quality();

        debug!(
            iteration = self.iteration,
            "chi2/it = {}, accuracy = {}", chi2, accuracy
        );

        (accuracy < from_f64(options.eps_rel) || error < from_f64(options.eps_abs))
            && chi2 < T::one()
    }

    /// Increases the calls per iteration after a failed convergence check and discards the
    /// records.
    fn restart(&mut self, options: &VegasOptions) {
        let (chi2, accuracy, _) = self.quality();

        if chi2 < T::one() {
            // grow proportional to the missing accuracy, but by at most one increment
            let scale = (accuracy / (from_f64::<T>(options.eps_rel) + from_f64(1e-8))).sqrt();
            let wanted = from_usize::<T>(self.calls_per_iteration) * scale;
            self.calls_per_iteration = wanted.to_usize().unwrap_or(usize::MAX).clamp(
                self.calls_per_iteration,
                self.calls_per_iteration + self.increment,
            );
        } else {
            self.calls_per_iteration += self.increment;
        }

        debug!(
            calls_per_iteration = self.calls_per_iteration,
            "discarding previous iterations"
        );
        self.records.clear();
    }

    fn finish(self, termination: Termination) -> VegasResult<T> {
        let estimate = combine(&self.records);

        VegasResult {
            chi_square: chi_square(&self.records, estimate.mean()),
            estimate,
            termination,
            iterations: self.iteration,
            calls: self.evaluations,
            warmup_calls: self.warmup_calls,
            non_finite_calls: self.non_finite_calls,
            non_zero_calls: self.non_zero_calls,
            records: self.records,
            map: self.map,
        }
    }
}

/// Integrates `integrand` over `domain` using roughly `calls` evaluations, not counting the
/// warmup.
///
/// The random numbers are drawn from `rng` and `callback` is notified after each iteration. The
/// integration never fails because the requested accuracy was not reached; inspect
/// [`VegasResult::termination`], [`VegasResult::error`] and
/// [`VegasResult::chi_square_per_iteration`] to judge the quality of the result.
///
/// # Errors
///
/// Returns [`IntegrationError::Configuration`] if the options are invalid, if the domain does not
/// match the dimension of the integrand, or if `calls` is too small to give each iteration at least
/// two calls. Errors of the integrand are returned unchanged as [`IntegrationError::Integrand`].
pub fn integrate<T, I, R, C>(
    integrand: &I,
    calls: usize,
    domain: &Domain<T>,
    rng: &mut RandomSource<R>,
    callback: &C,
    options: &VegasOptions,
) -> Result<VegasResult<T>, IntegrationError<I::Error>>
where
    T: Real,
    I: Integrand<T>,
    R: Rng,
    C: Callback<T>,
    Standard: Distribution<T>,
{
    options.validate()?;
    domain.check_dim(integrand.dim())?;

    // try to distribute the calls evenly over the maximum number of iterations
    let increment = calls / options.max_iterations;

    if increment < MIN_CALLS_PER_CUBE {
        return Err(ConfigurationError::TooFewCalls {
            calls,
            iterations: options.max_iterations,
            minimum: MIN_CALLS_PER_CUBE * options.max_iterations,
        }
        .into());
    }

    debug!(
        dim = domain.dim(),
        calls,
        "VEGAS integrating over {:?}",
        domain.bounds()
    );

    let mut state = VegasState::new(domain, increment, options)?;

    if options.use_warmup {
        state.warmup(
            integrand,
            rng,
            options.warmup_iterations,
            (increment / 5).max(MIN_CALLS_PER_CUBE),
        )?;
    }

    let termination = loop {
        state.iteration += 1;

        let record = state.run_iteration(integrand, rng, options.use_grid_improve)?;
        state.records.push(record);

        let cumulative = combine(&state.records);
        info!(
            iteration = state.iteration,
            calls = state.evaluations,
            "result = {} \u{b1} {}",
            record.mean(),
            record.std()
        );
        callback.print(&IterationReport::new(
            state.iteration,
            state.evaluations,
            record,
            cumulative,
        ));

        let check = state.iteration % CHECK_INTERVAL == 0;

        if check && state.converged(options) {
            break Termination::Converged;
        }

        if state.iteration >= options.max_iterations {
            break Termination::MaxIterationsReached;
        }

        if state.evaluations > calls.saturating_sub(state.calls_per_iteration) {
            break Termination::BudgetExhausted;
        }

        if check {
            state.restart(options);
        }
    };

    let result = state.finish(termination);

    info!(
        calls = result.calls,
        termination = ?result.termination,
        "integral = {} \u{b1} {}",
        result.value(),
        result.error()
    );

    Ok(result)
}

/// Integrates `integrand` over the box given by `bounds` with a [`Pcg64`] generator seeded with
/// `seed`, without a callback.
///
/// # Errors
///
/// Returns the errors of [`integrate`] and [`ConfigurationError::InvalidBounds`] for malformed
/// `bounds`.
pub fn integrate_with_seed<T, I>(
    integrand: &I,
    calls: usize,
    bounds: &[(T, T)],
    seed: u64,
    options: &VegasOptions,
) -> Result<VegasResult<T>, IntegrationError<I::Error>>
where
    T: Real,
    I: Integrand<T>,
    Standard: Distribution<T>,
{
    let domain = Domain::new(bounds.to_vec())?;
    let mut rng = RandomSource::<Pcg64>::seed_from_u64(seed);

    integrate(integrand, calls, &domain, &mut rng, &SinkCallback {}, options)
}
