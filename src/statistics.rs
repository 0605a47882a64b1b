//! Summary statistics of a set of repeated readings.
//!
//! These are the random-error half of the analysis: the sample mean, the unbiased sample
//! standard deviation and the standard error of the mean.

use ndarray::ArrayView1;
use num_traits::{Float, FromPrimitive};

use crate::{Error, Result};

/// The arithmetic mean of `readings`
///
/// # Errors
/// Returns [`Error::InvalidInput`] if `readings` is empty.
pub fn average<E: Float + FromPrimitive>(readings: &[E]) -> Result<E> {
    ArrayView1::from(readings)
        .mean()
        .ok_or_else(|| Error::InvalidInput("cannot average an empty set of readings".into()))
}

/// The unbiased sample standard deviation of `readings`
///
/// $$
///     s = \sqrt{\frac{1}{n - 1} \sum_i \left(x_i - \bar{x}\right)^2}
/// $$
///
/// # Errors
/// Returns [`Error::InvalidInput`] for fewer than two readings, where the `n - 1` divisor
/// vanishes.
pub fn sample_standard_deviation<E: Float + FromPrimitive>(readings: &[E]) -> Result<E> {
    if readings.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "standard deviation needs at least 2 readings, got {}",
            readings.len()
        )));
    }
    Ok(ArrayView1::from(readings).std(E::one()))
}

/// The random error, or standard error of the mean, $s / \sqrt{n}$
///
/// # Panics
/// If `n` cannot be represented in `E`, which does not happen for the primitive floats.
pub fn random_error<E: Float + FromPrimitive>(standard_deviation: E, n: usize) -> E {
    standard_deviation / E::from_usize(n).expect("usize must fit in `E`").sqrt()
}
