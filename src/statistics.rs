/// A simple statistics module with some utility functions such as calculation of percentiles.
use interp::{interp, InterpMode};
use statrs::statistics::{Data, OrderStatistics};

pub fn percentile(numbers: &[f64], percentile: usize) -> f64 {
    let mut data = Data::new(numbers.to_vec());

    data.percentile(percentile)
}

/// Median of the values, or `None` for an empty slice.
pub fn median(numbers: &[f64]) -> Option<f64> {
    if numbers.is_empty() {
        return None;
    }
    let mut data = Data::new(numbers.to_vec());

    Some(data.median())
}

/// Piecewise-linear lookup in the manner of numpy's `interp`: values outside `xs` take the value
/// at the nearest end.
pub fn np_interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }

    interp(xs, ys, x, &InterpMode::FirstLast)
}

/// Half-width of a 95% confidence interval for a mean, given a typical relative magnitude.
pub fn confidence_half_width(mean: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.;
    }

    1.96 * mean / (n as f64).sqrt()
}
