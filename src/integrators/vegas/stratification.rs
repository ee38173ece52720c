//! Adaptive stratified sampling of the unit hypercube.
use crate::core::{from_usize, Real};
use crate::random::RandomSource;
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Every hypercube receives at least this many calls, so that its variance can be estimated.
pub const MIN_CALLS_PER_CUBE: usize = 2;

/// Largest number of hypercubes.
pub const MAX_CUBES: usize = 100_000_000;

/// Divides the unit hypercube into `n_strat^dim` hypercubes of equal volume and distributes the
/// calls of an iteration among them proportional to (a damped power of) their standard deviations.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Stratification<T> {
    dim: usize,
    n_strat: usize,
    n_cubes: usize,
    v_cube: T,
    beta: T,
    /// Share of the calls each hypercube receives, sums up to one.
    dh: Vec<T>,
}

impl<T: Real> Stratification<T> {
    /// Creates a stratification for `dim` dimensions that uses as many hypercubes as possible while
    /// giving each of them two of `calls` calls. The damping exponent `beta` determines how
    /// strongly the distribution of calls follows the standard deviations of the hypercubes.
    pub fn new(calls: usize, dim: usize, beta: T) -> Self {
        let n_strat = strata_per_dimension(calls / MIN_CALLS_PER_CUBE, dim);
        let n_cubes = cube_count(n_strat, dim).unwrap_or(1);

        Self {
            dim,
            n_strat,
            n_cubes,
            v_cube: T::one() / from_usize(n_cubes),
            beta,
            dh: vec![T::one() / from_usize(n_cubes); n_cubes],
        }
    }

    /// Returns the number of dimensions.
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the number of strata per dimension.
    pub const fn n_strat(&self) -> usize {
        self.n_strat
    }

    /// Returns the number of hypercubes.
    pub const fn n_cubes(&self) -> usize {
        self.n_cubes
    }

    /// Returns the volume of a single hypercube.
    pub fn cube_volume(&self) -> T {
        self.v_cube
    }

    /// Returns the share of calls each hypercube receives.
    pub fn shares(&self) -> &[T] {
        &self.dh
    }

    /// Distributes `calls` among the hypercubes. Every hypercube receives
    /// [`MIN_CALLS_PER_CUBE`] calls, the remaining ones are shared out proportionally to the
    /// shares, so the counts add up to `calls` unless it is smaller than the minimum of all cubes.
    pub fn get_nh(&self, calls: usize) -> Vec<usize> {
        let surplus = calls.saturating_sub(MIN_CALLS_PER_CUBE * self.n_cubes);
        let surplus_t = from_usize::<T>(surplus);

        let exact: Vec<T> = self.dh.iter().map(|&dh| dh * surplus_t).collect();
        let mut neval: Vec<usize> = exact
            .iter()
            .map(|&e| e.floor().to_usize().unwrap_or(0))
            .collect();

        // hand the calls lost to flooring to the cubes with the largest remainders
        let missing = surplus.saturating_sub(neval.iter().sum());
        let mut remainders: Vec<(usize, T)> = exact
            .iter()
            .zip(&neval)
            .map(|(&e, &n)| e - from_usize(n))
            .enumerate()
            .collect();
        remainders.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        for &(cube, _) in remainders.iter().take(missing) {
            neval[cube] += 1;
        }

        neval.iter_mut().for_each(|n| *n += MIN_CALLS_PER_CUBE);
        neval
    }

    /// Returns the position of hypercube `cube` along each axis.
    fn cube_position(&self, cube: usize) -> Vec<usize> {
        let mut index = cube;

        (0..self.dim)
            .map(|_| {
                let position = index % self.n_strat;
                index /= self.n_strat;
                position
            })
            .collect()
    }

    /// Draws `neval[i]` uniformly distributed points inside hypercube `i`, for every hypercube. The
    /// points are returned ordered by hypercube, see [`Stratification::cube_indices`].
    pub fn get_y<R>(&self, neval: &[usize], rng: &mut RandomSource<R>) -> Vec<Vec<T>>
    where
        R: Rng,
        Standard: Distribution<T>,
    {
        let dy = T::one() / from_usize(self.n_strat);
        let mut points = Vec::with_capacity(neval.iter().sum());

        for (cube, &n) in neval.iter().enumerate() {
            let position = self.cube_position(cube);

            for _ in 0..n {
                points.push(
                    position
                        .iter()
                        .map(|&p| (from_usize::<T>(p) + rng.uniform::<T>()) * dy)
                        .collect(),
                );
            }
        }

        points
    }

    /// Returns, for every point generated by [`Stratification::get_y`] with the same `neval`, the
    /// index of the hypercube it lies in.
    pub fn cube_indices(neval: &[usize]) -> Vec<usize> {
        neval
            .iter()
            .enumerate()
            .flat_map(|(cube, &n)| std::iter::repeat(cube).take(n))
            .collect()
    }

    /// Sums the weighted integrand values `jf`, ordered as the points of
    /// [`Stratification::get_y`], and their squares per hypercube.
    pub fn accumulate_weight(&self, neval: &[usize], jf: &[T]) -> (Vec<T>, Vec<T>) {
        let mut sum = vec![T::zero(); self.n_cubes];
        let mut sumsq = vec![T::zero(); self.n_cubes];
        let mut values = jf.iter();

        for (cube, &n) in neval.iter().enumerate() {
            for &value in values.by_ref().take(n) {
                sum[cube] += value;
                sumsq[cube] += value * value;
            }
        }

        (sum, sumsq)
    }

    /// Redistributes the shares of the hypercubes proportional to $\sigma^\beta$, where $\sigma$ is
    /// the standard deviation of a hypercube estimated from the sums returned by
    /// [`Stratification::accumulate_weight`]. If all standard deviations vanish the shares are
    /// kept.
    pub fn update_dh(&mut self, neval: &[usize], sum: &[T], sumsq: &[T]) {
        let v = self.v_cube;

        let damped: Vec<T> = neval
            .iter()
            .zip(sum.iter().zip(sumsq))
            .map(|(&n, (&s, &s2))| {
                let mean = v * s / from_usize(n);
                let var = v * v * s2 / from_usize(n) - mean * mean;
                // variances at the level of rounding errors are zero
                if var > T::epsilon() * from_usize(4 * (n + 1)) * mean * mean {
                    var.sqrt().powf(self.beta)
                } else {
                    T::zero()
                }
            })
            .collect();

        let total: T = damped.iter().copied().sum();

        if total > T::zero() && total.is_finite() {
            self.dh = damped.into_iter().map(|d| d / total).collect();
        }
    }
}

/// Number of hypercubes for `n` strata in `dim` dimensions, `None` on overflow.
fn cube_count(n: usize, dim: usize) -> Option<usize> {
    (0..dim).try_fold(1_usize, |count, _| count.checked_mul(n))
}

/// The largest `n >= 1` with `n^dim <= max_cubes` (and at most [`MAX_CUBES`]).
fn strata_per_dimension(max_cubes: usize, dim: usize) -> usize {
    if dim == 0 {
        return 1;
    }

    let limit = max_cubes.min(MAX_CUBES);
    let fits = |n: usize| cube_count(n, dim).map_or(false, |count| count <= limit);

    // the floating point root is only a first guess
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let mut n = ((limit as f64).powf(1.0 / dim as f64).floor() as usize).max(1);

    while n > 1 && !fits(n) {
        n -= 1;
    }

    while fits(n + 1) {
        n += 1;
    }

    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand_pcg::Pcg64;

    #[test]
    fn number_of_strata() {
        assert_eq!(strata_per_dimension(500, 1), 500);
        assert_eq!(strata_per_dimension(500, 2), 22);
        // 2^3 = 8 must not be lost to rounding
        assert_eq!(strata_per_dimension(8, 3), 2);
        assert_eq!(strata_per_dimension(7, 3), 1);
        assert_eq!(strata_per_dimension(0, 4), 1);
        assert_eq!(strata_per_dimension(usize::MAX, 1), MAX_CUBES);
        assert_eq!(strata_per_dimension(usize::MAX, 4), 100);
    }

    #[test]
    fn construction() {
        let strat = Stratification::<f64>::new(1000, 2, 0.75);

        assert_eq!(strat.dim(), 2);
        assert_eq!(strat.n_strat(), 22);
        assert_eq!(strat.n_cubes(), 484);
        assert_approx_eq!(strat.cube_volume(), 1.0 / 484.0, 1e-18);
        assert_approx_eq!(strat.shares().iter().sum::<f64>(), 1.0, 1e-12);

        // too few calls disable stratification
        let strat = Stratification::<f64>::new(3, 5, 0.75);
        assert_eq!(strat.n_cubes(), 1);
        assert_eq!(strat.cube_volume(), 1.0);
    }

    #[test]
    fn calls_per_cube() {
        let strat = Stratification::<f64>::new(1000, 2, 0.75);
        let neval = strat.get_nh(1000);

        assert_eq!(neval.len(), strat.n_cubes());
        assert!(neval.iter().all(|&n| n >= MIN_CALLS_PER_CUBE));

        assert_eq!(neval.iter().sum::<usize>(), 1000);

        let strat = Stratification::<f64>::new(100, 1, 0.75);
        let neval = strat.get_nh(5000);
        assert_eq!(neval.iter().sum::<usize>(), 5000);
    }

    #[test]
    fn points_lie_in_their_cubes() {
        let strat = Stratification::<f64>::new(200, 2, 0.75);
        let mut rng = RandomSource::<Pcg64>::seed_from_u64(11);
        let neval = strat.get_nh(300);
        let points = strat.get_y(&neval, &mut rng);
        let cubes = Stratification::<f64>::cube_indices(&neval);

        assert_eq!(points.len(), neval.iter().sum::<usize>());
        assert_eq!(cubes.len(), points.len());

        let n = strat.n_strat() as f64;
        for (point, &cube) in points.iter().zip(&cubes) {
            let expected = strat.cube_position(cube);
            for (&y, &position) in point.iter().zip(&expected) {
                assert!((0.0..1.0).contains(&y));
                assert_eq!((y * n).floor() as usize, position);
            }
        }
    }

    #[test]
    fn mixed_radix_positions() {
        let strat = Stratification::<f64>::new(2 * 27, 3, 0.75);

        assert_eq!(strat.n_strat(), 3);
        assert_eq!(strat.cube_position(0), vec![0, 0, 0]);
        assert_eq!(strat.cube_position(1), vec![1, 0, 0]);
        assert_eq!(strat.cube_position(3), vec![0, 1, 0]);
        assert_eq!(strat.cube_position(26), vec![2, 2, 2]);
    }

    #[test]
    fn sums_per_cube() {
        let strat = Stratification::<f64>::new(8, 1, 0.75);
        assert_eq!(strat.n_cubes(), 4);

        let neval = [2, 3, 2, 2];
        let jf = [1.0, 2.0, 1.0, 1.0, 1.0, 0.0, 0.0, 5.0, -5.0];
        let (sum, sumsq) = strat.accumulate_weight(&neval, &jf);

        assert_eq!(sum, vec![3.0, 3.0, 0.0, 0.0]);
        assert_eq!(sumsq, vec![5.0, 3.0, 0.0, 50.0]);
    }

    #[test]
    fn calls_follow_the_variance() {
        let mut strat = Stratification::<f64>::new(8, 1, 1.0);
        let neval = [2, 2, 2, 2];
        // the last cube has the largest spread, the first none
        let jf = [1.0, 1.0, 0.0, 2.0, 0.0, 4.0, -4.0, 4.0];
        let (sum, sumsq) = strat.accumulate_weight(&neval, &jf);
        strat.update_dh(&neval, &sum, &sumsq);

        let shares = strat.shares();
        assert_approx_eq!(shares.iter().sum::<f64>(), 1.0, 1e-12);
        assert_eq!(shares[0], 0.0);
        assert!(shares[1] < shares[2]);
        assert!(shares[2] < shares[3]);
        // with beta = 1 the shares are proportional to the standard deviations 0, 1, 2, 4
        assert_approx_eq!(shares[3], 4.0 / 7.0, 1e-12);

        let neval = strat.get_nh(70);
        // 62 calls on top of the minimum are shared as 0, 8.9, 17.7 and 35.4
        assert_eq!(neval, vec![2, 11, 20, 37]);
    }

    #[test]
    fn vanishing_variance_keeps_the_shares() {
        let mut strat = Stratification::<f64>::new(8, 1, 0.75);
        let neval = [2, 2, 2, 2];
        let jf = [3.0; 8];
        let (sum, sumsq) = strat.accumulate_weight(&neval, &jf);
        strat.update_dh(&neval, &sum, &sumsq);

        assert_eq!(strat.shares(), &[0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn adapted_calls_add_up() {
        let mut strat = Stratification::<f64>::new(1000, 1, 0.75);
        assert_eq!(strat.n_cubes(), 500);

        // only a single point in cube 250 contributes
        let neval = strat.get_nh(1000);
        let mut jf = vec![0.0; neval.iter().sum()];
        jf[2 * 250] = 1.0;
        let (sum, sumsq) = strat.accumulate_weight(&neval, &jf);
        strat.update_dh(&neval, &sum, &sumsq);
        assert_eq!(strat.shares()[250], 1.0);

        // nothing is left beyond the minimum
        let neval = strat.get_nh(1000);
        assert_eq!(neval.iter().sum::<usize>(), 1000);
        assert!(neval.iter().all(|&n| n == MIN_CALLS_PER_CUBE));

        // all additional calls go to the only cube with a spread
        let neval = strat.get_nh(3000);
        assert_eq!(neval.iter().sum::<usize>(), 3000);
        assert_eq!(neval[250], 2002);
        assert!(neval.iter().all(|&n| n >= MIN_CALLS_PER_CUBE));
    }

    #[test]
    fn rounding_noise_is_no_variance() {
        let mut strat = Stratification::<f64>::new(8, 1, 0.75);
        let neval = [2, 3, 2, 2];
        // 0.1 is not exactly representable, so the sums carry rounding errors
        let jf = [0.1; 9];
        let (sum, sumsq) = strat.accumulate_weight(&neval, &jf);
        strat.update_dh(&neval, &sum, &sumsq);

        assert_eq!(strat.shares(), &[0.25, 0.25, 0.25, 0.25]);
    }
}
