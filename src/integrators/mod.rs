//! The integrators. [`vegas`] adapts to the integrand, [`plain`] samples the domain uniformly and
//! is mostly useful as a reference.
pub mod plain;
pub mod vegas;
