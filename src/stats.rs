//! Numeric helpers shared by the engines. All statistics are computed in `f64`
//! and only rounded at the output boundary.

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn round4(value: f64) -> f64 {
    round_to(value, 4)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Pearson correlation over paired samples. Saturates to `0.0` when the
/// series differ in length, hold fewer than two points, or either has no
/// variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 || is_constant(x) || is_constant(y) {
        return 0.0;
    }

    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|b| b * b).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();

    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    (numerator / denominator).clamp(-1.0, 1.0)
}

// The sum formula leaves rounding residue for repeated non-integer values
// (e.g. 80.34), so zero variance is detected on the samples themselves.
fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_odd_takes_middle() {
        assert_eq!(median(&[95.0, 88.0, 92.0]), Some(92.0));
        assert_eq!(median(&[87.0, 90.0, 85.0]), Some(87.0));
    }

    #[test]
    fn median_even_averages_middle_pair() {
        assert_eq!(median(&[70.0, 90.0, 80.0, 60.0]), Some(75.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn rounding_matches_display_precision() {
        assert_eq!(round2(88.333333), 88.33);
        assert_eq!(round2(-1.666), -1.67);
        assert_eq!(round4(0.981981), 0.982);
    }

    #[test]
    fn pearson_perfect_and_degenerate() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[6.0, 4.0, 2.0]) + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), 0.0);
        assert_eq!(pearson(&[1.0], &[2.0]), 0.0);
        assert_eq!(pearson(&[1.0, 2.0], &[2.0]), 0.0);
    }

    #[test]
    fn pearson_constant_fractional_series_is_zero() {
        let scores = [61.0, 77.5, 90.0];
        assert_eq!(pearson(&scores, &[80.34; 3]), 0.0);
        assert_eq!(pearson(&scores, &[80.21; 3]), 0.0);
        assert_eq!(pearson(&[72.15; 4], &[60.0, 70.0, 80.0, 95.5]), 0.0);
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[90.0, 80.0, 70.0, 60.0]), Some(75.0));
    }
}
