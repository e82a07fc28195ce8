//! Small descriptive statistics over result-table columns

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator), `None` below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let squares = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    let variance = squares / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Minimum and maximum of a non-empty slice.
pub fn extent(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(values.iter().fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))))
}

/// Index of the smallest value; the first one wins on ties.
pub fn argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the largest value; the first one wins on ties.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_std_dev_matches_n_minus_one() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sd = sample_std_dev(&values).unwrap();
        assert!((sd - 2.138_089_935).abs() < 1e-6);
        assert!(sample_std_dev(&[1.0]).is_none());
    }

    #[test]
    fn test_arg_extrema_take_first_tie() {
        let values = [3.0, 1.0, 1.0, 5.0, 5.0];
        assert_eq!(argmin(&values), Some(1));
        assert_eq!(argmax(&values), Some(3));
        assert_eq!(argmin(&[]), None);
    }

    #[test]
    fn test_extent() {
        assert_eq!(extent(&[2.0, -1.0, 4.0]), Some((-1.0, 4.0)));
        assert_eq!(extent(&[]), None);
    }
}
