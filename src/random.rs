//! Seedable source of uniformly distributed random numbers.
use rand::distributions::{Distribution, Standard};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

/// Wraps a random number generator and draws uniform numbers in $[0,1)$ from it.
///
/// The same generator in the same state always produces the same numbers, so that integrations
/// can be reproduced exactly. The state can be stored with `serde` and restored later.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RandomSource<R = Pcg64> {
    rng: R,
}

impl<R: SeedableRng> RandomSource<R> {
    /// Creates a generator in a state determined solely by `seed`.
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            rng: R::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RandomSource<R> {
    /// Wraps `rng`.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Returns a single uniform number in $[0,1)$.
    pub fn uniform<T>(&mut self) -> T
    where
        Standard: Distribution<T>,
    {
        self.rng.gen()
    }

    /// Overwrites every element of `out` with a uniform number.
    pub fn fill_uniform<T>(&mut self, out: &mut [T])
    where
        Standard: Distribution<T>,
    {
        let rng = &mut self.rng;
        out.iter_mut().for_each(|v| *v = rng.gen());
    }

    /// Returns `n` points uniformly distributed in the `dim`-dimensional unit hypercube.
    pub fn points<T>(&mut self, n: usize, dim: usize) -> Vec<Vec<T>>
    where
        Standard: Distribution<T>,
    {
        (0..n)
            .map(|_| (0..dim).map(|_| self.rng.gen()).collect())
            .collect()
    }

    /// Returns the wrapped generator.
    pub fn rng(&self) -> &R {
        &self.rng
    }

    /// Destructures the source and returns the wrapped generator.
    pub fn into_inner(self) -> R {
        self.rng
    }
}
