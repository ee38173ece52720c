//! The adaptive importance-sampling map of VEGAS.
//!
//! In every dimension the unit interval is divided into `n` intervals of equal size $1/n$, which
//! are mapped linearly onto `n` intervals of the integration domain. The intervals in the domain
//! have different widths $\Delta x_i$; the map therefore samples narrow intervals more densely, and
//! the Jacobian
//!
//! $$ J(y) = \prod_{d} n \, \Delta x_{d,i_d(y)} $$
//!
//! compensates for that. After each iteration the widths are adapted such that each interval
//! carries the same share of $J^2 f^2$, which minimizes the variance of $J f$.
use crate::core::{from_usize, Real};
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-dimension piecewise-linear map from the unit hypercube into the integration domain.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ImportanceMap<T> {
    n_intervals: usize,
    alpha: T,
    /// For each dimension the `n_intervals + 1` interval edges in the integration domain.
    edges: Vec<Vec<T>>,
    /// For each dimension the widths of the intervals.
    widths: Vec<Vec<T>>,
    /// Accumulated $J^2 f^2$ per interval.
    weights: Vec<Vec<T>>,
    /// Number of samples that fell into each interval.
    counts: Vec<Vec<usize>>,
}

impl<T: Real> ImportanceMap<T> {
    /// Creates a map that divides each dimension given by `bounds` into `n_intervals` intervals of
    /// equal width. The damping exponent `alpha` controls how aggressively the map adapts: zero
    /// turns adaptation off, one does not damp at all.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ZeroIntervals`] if `n_intervals` is zero and
    /// [`ConfigurationError::InvalidOption`] if `alpha` is not in $[0,1]$.
    pub fn new(
        bounds: &[(T, T)],
        n_intervals: usize,
        alpha: T,
    ) -> Result<Self, ConfigurationError> {
        if n_intervals == 0 {
            return Err(ConfigurationError::ZeroIntervals);
        }

        if !(alpha >= T::zero() && alpha <= T::one()) {
            return Err(ConfigurationError::InvalidOption {
                name: "alpha",
                reason: format!("{} is not in [0, 1]", alpha),
            });
        }

        let n = from_usize::<T>(n_intervals);
        let edges: Vec<Vec<T>> = bounds
            .iter()
            .map(|&(lower, upper)| {
                (0..=n_intervals)
                    .map(|i| {
                        // make sure the last edge is exactly the upper bound
                        if i == n_intervals {
                            upper
                        } else {
                            lower + (upper - lower) * from_usize::<T>(i) / n
                        }
                    })
                    .collect()
            })
            .collect();

        // identical widths give a constant Jacobian, differences of the edges would not
        let widths = bounds
            .iter()
            .map(|&(lower, upper)| vec![(upper - lower) / n; n_intervals])
            .collect();

        Ok(Self {
            n_intervals,
            alpha,
            widths,
            weights: vec![vec![T::zero(); n_intervals]; bounds.len()],
            counts: vec![vec![0; n_intervals]; bounds.len()],
            edges,
        })
    }

    /// Returns the number of dimensions.
    pub fn dim(&self) -> usize {
        self.edges.len()
    }

    /// Returns the number of intervals per dimension.
    pub const fn n_intervals(&self) -> usize {
        self.n_intervals
    }

    /// Returns the damping exponent.
    pub fn alpha(&self) -> T {
        self.alpha
    }

    /// Returns the interval edges of dimension `dim`.
    pub fn edges(&self, dim: usize) -> &[T] {
        &self.edges[dim]
    }

    /// Returns the interval widths of dimension `dim`.
    pub fn widths(&self, dim: usize) -> &[T] {
        &self.widths[dim]
    }

    /// Finds the interval `y` falls into and the relative position inside of it.
    fn locate(&self, y: T) -> (usize, T) {
        let scaled = y * from_usize(self.n_intervals);
        let interval = scaled
            .floor()
            .to_usize()
            .unwrap_or(0)
            .min(self.n_intervals - 1);

        (interval, scaled - from_usize(interval))
    }

    /// Maps the point `y` of the unit hypercube into the integration domain.
    pub fn map_point(&self, y: &[T]) -> Vec<T> {
        y.iter()
            .zip(self.edges.iter().zip(&self.widths))
            .map(|(&y, (edges, widths))| {
                let (interval, offset) = self.locate(y);
                edges[interval] + widths[interval] * offset
            })
            .collect()
    }

    /// Returns the Jacobian of the map at `y`.
    pub fn jacobian(&self, y: &[T]) -> T {
        let n = from_usize::<T>(self.n_intervals);

        y.iter()
            .zip(&self.widths)
            .fold(T::one(), |jac, (&y, widths)| {
                jac * widths[self.locate(y).0] * n
            })
    }

    /// Maps all points `ys` and returns them together with their Jacobians.
    pub fn map_batch(&self, ys: &[Vec<T>]) -> (Vec<Vec<T>>, Vec<T>) {
        ys.iter()
            .map(|y| (self.map_point(y), self.jacobian(y)))
            .unzip()
    }

    /// Adds `f2`, the square of the integrand times the Jacobian at `y`, to the weights of the
    /// intervals `y` falls into.
    pub fn accumulate_weight(&mut self, y: &[T], f2: T) {
        for (dim, &y) in y.iter().enumerate() {
            let (interval, _) = self.locate(y);
            self.weights[dim][interval] += f2;
            self.counts[dim][interval] += 1;
        }
    }

    /// Moves the interval edges according to the accumulated weights and resets them afterwards.
    ///
    /// Dimensions without any non-zero weight and dimensions of zero width stay as they are.
    pub fn update_map(&mut self) {
        for dim in 0..self.dim() {
            if let Some(edges) = self.adapted_edges(dim) {
                self.widths[dim] = widths_of(&edges);
                self.edges[dim] = edges;
            }
        }

        self.reset_weights();
    }

    fn adapted_edges(&self, dim: usize) -> Option<Vec<T>> {
        let n = self.n_intervals;
        let edges = &self.edges[dim];

        // a single interval can't be moved and a zero-width dimension has nothing to adapt
        if n < 2 || edges[n] <= edges[0] {
            return None;
        }

        let averages: Vec<T> = self.weights[dim]
            .iter()
            .zip(&self.counts[dim])
            .map(|(&weight, &count)| {
                if count == 0 {
                    T::zero()
                } else {
                    weight / from_usize(count)
                }
            })
            .collect();

        if is_flat(&averages, &self.counts[dim]) {
            debug!(dimension = dim, "importance map is already optimal");
            return None;
        }

        let smoothed = smooth(&averages);
        let total: T = smoothed.iter().copied().sum();

        if !(total > T::zero() && total.is_finite()) {
            warn!(
                dimension = dim,
                "cannot update the importance map, all weights vanish"
            );
            return None;
        }

        let damped: Vec<T> = smoothed
            .iter()
            .map(|&s| {
                let share = s / total;
                if share > T::zero() {
                    share.powf(self.alpha)
                } else {
                    T::zero()
                }
            })
            .collect();

        // the number of new intervals each old interval should contain
        let damped_total: T = damped.iter().copied().sum();
        let n_t = from_usize::<T>(n);
        let sub_intervals: Vec<T> = damped.iter().map(|&d| d * n_t / damped_total).collect();

        let mut new_edges = Vec::with_capacity(n + 1);
        new_edges.push(edges[0]);

        let mut accumulated = T::zero();
        let mut old = 0;

        for k in 1..n {
            let target = from_usize::<T>(k);

            while old + 1 < n && accumulated + sub_intervals[old] < target {
                accumulated += sub_intervals[old];
                old += 1;
            }

            // how deep the new edge lies inside the old interval
            let depth = ((target - accumulated) / sub_intervals[old])
                .min(T::one())
                .max(T::zero());
            new_edges.push(edges[old] + depth * self.widths[dim][old]);
        }

        new_edges.push(edges[n]);

        Some(new_edges)
    }

    fn reset_weights(&mut self) {
        self.weights
            .iter_mut()
            .for_each(|w| w.iter_mut().for_each(|w| *w = T::zero()));
        self.counts
            .iter_mut()
            .for_each(|c| c.iter_mut().for_each(|c| *c = 0));
    }
}

/// Checks whether the `averages` of all intervals hit at least once agree up to the rounding
/// errors of summing `counts` values.
fn is_flat<T: Real>(averages: &[T], counts: &[usize]) -> bool {
    let (min, max) = averages
        .iter()
        .zip(counts)
        .filter(|&(_, &count)| count > 0)
        .fold((T::infinity(), T::zero()), |(min, max), (&average, _)| {
            (min.min(average), max.max(average))
        });
    let total: usize = counts.iter().sum();

    max > T::zero() && max - min <= T::epsilon() * from_usize(4 * (total + averages.len())) * max
}

fn widths_of<T: Real>(edges: &[T]) -> Vec<T> {
    edges.windows(2).map(|e| e[1] - e[0]).collect()
}

/// Averages every value with its neighbours using the weights 1:6:1; the first and last value only
/// have one neighbour and use 7:1.
fn smooth<T: Real>(values: &[T]) -> Vec<T> {
    let n = values.len();
    let six = from_usize::<T>(6);
    let seven = from_usize::<T>(7);
    let eight = from_usize::<T>(8);

    (0..n)
        .map(|i| {
            if i == 0 {
                (seven * values[0] + values[1]) / eight
            } else if i == n - 1 {
                (values[n - 2] + seven * values[n - 1]) / eight
            } else {
                (values[i - 1] + six * values[i] + values[i + 1]) / eight
            }
        })
        .collect()
}
