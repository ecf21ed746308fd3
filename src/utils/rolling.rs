//! Rolling-window and NaN-handling helpers shared by every feature stage.

use statrs::statistics::Statistics;

/// Divide, substituting `default` when the result would not be finite
#[inline]
pub fn safe_div(numerator: f64, denominator: f64, default: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return default;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        default
    }
}

/// Replace non-finite values with `default`
#[inline]
pub fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

/// Trailing mean over `window` bars; rows with fewer than `min_periods`
/// observations are `NaN`
pub fn rolling_mean(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        let count = (i + 1).min(window);
        if count >= min_periods.max(1) {
            out.push(sum / count as f64);
        } else {
            out.push(f64::NAN);
        }
    }

    out
}

/// Trailing sample standard deviation over a full window, `NaN` before it
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                return f64::NAN;
            }
            values[i + 1 - window..=i].iter().std_dev()
        })
        .collect()
}

/// Trailing maximum over a full window, `NaN` before it
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::max)
}

/// Trailing minimum over a full window, `NaN` before it
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::min)
}

fn rolling_extreme(values: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return f64::NAN;
            }
            values[i + 1 - window..=i]
                .iter()
                .copied()
                .fold(values[i], pick)
        })
        .collect()
}

/// Shift values forward by `periods` rows, padding the head with `NaN`
pub fn shift(values: &[f64], periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in periods..values.len() {
        out[i] = values[i - periods];
    }
    out
}

/// Forward-fill missing values, then zero-fill any leading gap
pub fn fill_forward_then_zero(values: &[f64]) -> Vec<f64> {
    let mut last = None;
    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                last = Some(v);
                v
            } else {
                last.unwrap_or(0.0)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(4.0, 2.0, 0.0), 2.0);
        assert_eq!(safe_div(4.0, 0.0, 0.0), 0.0);
        assert_eq!(safe_div(4.0, f64::NAN, 1.0), 1.0);
        assert_eq!(safe_div(f64::NAN, 2.0, 1.0), 1.0);
    }

    #[test]
    fn test_rolling_mean_min_periods() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2, 2);
        assert!(out[0].is_nan());
        assert_eq!(&out[1..], &[1.5, 2.5, 3.5]);

        let partial = rolling_mean(&[1.0, 2.0, 3.0], 3, 1);
        assert_eq!(partial, vec![1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_rolling_extremes() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0];
        let max = rolling_max(&values, 3);
        let min = rolling_min(&values, 3);
        assert!(max[1].is_nan());
        assert_eq!(&max[2..], &[4.0, 4.0, 5.0]);
        assert_eq!(&min[2..], &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rolling_std_sample() {
        let out = rolling_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        assert!(out[6].is_nan());
        assert!((out[7] - 2.138089935).abs() < 1e-6);
    }

    #[test]
    fn test_shift() {
        let out = shift(&[1.0, 2.0, 3.0], 1);
        assert!(out[0].is_nan());
        assert_eq!(&out[1..], &[1.0, 2.0]);
    }

    #[test]
    fn test_fill_forward_then_zero() {
        let out = fill_forward_then_zero(&[f64::NAN, 1.0, f64::NAN, f64::INFINITY, 3.0]);
        assert_eq!(out, vec![0.0, 1.0, 1.0, 1.0, 3.0]);
    }
}
