//! Rectangular integration domains.
use crate::core::Real;
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// A rectangular integration domain, given by one `(lower, upper)` pair per dimension.
///
/// A `Domain` can only be constructed from finite bounds with `lower < upper` in every dimension.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Domain<T> {
    bounds: Vec<(T, T)>,
}

impl<T: Real> Domain<T> {
    /// Constructs the domain from its `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ZeroDimension`] if `bounds` is empty and
    /// [`ConfigurationError::InvalidBounds`] for bounds that are not finite or not ordered.
    pub fn new(bounds: Vec<(T, T)>) -> Result<Self, ConfigurationError> {
        if bounds.is_empty() {
            return Err(ConfigurationError::ZeroDimension);
        }

        for (dimension, &(lower, upper)) in bounds.iter().enumerate() {
            if !(lower.is_finite() && upper.is_finite() && lower < upper) {
                return Err(ConfigurationError::InvalidBounds {
                    dimension,
                    lower: lower.to_f64().unwrap_or(f64::NAN),
                    upper: upper.to_f64().unwrap_or(f64::NAN),
                });
            }
        }

        Ok(Self { bounds })
    }

    /// The unit hypercube $[0,1)^d$.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ZeroDimension`] if `dim` is zero.
    pub fn unit(dim: usize) -> Result<Self, ConfigurationError> {
        Self::new(vec![(T::zero(), T::one()); dim])
    }

    /// The hypercube $[-1,1)^d$.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ZeroDimension`] if `dim` is zero.
    pub fn symmetric(dim: usize) -> Result<Self, ConfigurationError> {
        Self::new(vec![(-T::one(), T::one()); dim])
    }

    /// Returns the number of dimensions.
    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    /// Returns the bounds of all dimensions.
    pub fn bounds(&self) -> &[(T, T)] {
        &self.bounds
    }

    /// Returns the lower bound of dimension `dim`.
    pub fn lower(&self, dim: usize) -> T {
        self.bounds[dim].0
    }

    /// Returns the upper bound of dimension `dim`.
    pub fn upper(&self, dim: usize) -> T {
        self.bounds[dim].1
    }

    /// Returns the width of dimension `dim`.
    pub fn width(&self, dim: usize) -> T {
        self.upper(dim) - self.lower(dim)
    }

    /// Returns the volume of the domain.
    pub fn volume(&self) -> T {
        self.bounds
            .iter()
            .fold(T::one(), |volume, &(lower, upper)| volume * (upper - lower))
    }

    /// Maps the point `y` of the unit hypercube linearly into the domain.
    pub fn scale(&self, y: &[T]) -> Vec<T> {
        y.iter()
            .zip(&self.bounds)
            .map(|(&y, &(lower, upper))| lower + (upper - lower) * y)
            .collect()
    }

    /// Checks that the domain fits an integrand with `dim` dimensions.
    pub(crate) fn check_dim(&self, dim: usize) -> Result<(), ConfigurationError> {
        if dim == 0 {
            Err(ConfigurationError::ZeroDimension)
        } else if dim == self.dim() {
            Ok(())
        } else {
            Err(ConfigurationError::DimensionMismatch {
                expected: dim,
                found: self.dim(),
            })
        }
    }
}
