use approx::assert_relative_eq;
use beamline_alignment::*;

fn ramp(samples: usize, stop: f64) -> Vec<f64> {
    let step = stop / (samples - 1) as f64;
    (0..samples).map(|i| i as f64 * step).collect()
}

#[test]
fn test_smoothing_constant_sequence_is_identity() {
    let constant = vec![3.25; 40];
    for (window, polyorder) in [(3, 0), (5, 2), (7, 2), (11, 3), (21, 5), (39, 4)] {
        let smoothed = smooth(&constant, window, polyorder).unwrap();
        assert_eq!(smoothed.len(), constant.len());
        for v in smoothed.iter() {
            assert_relative_eq!(*v, 3.25, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_smoothing_rejects_invalid_windows() {
    let samples = vec![1.0; 20];
    assert!(matches!(smooth(&samples, 10, 3), Err(AnalysisError::InvalidParameter(_))));
    assert!(matches!(smooth(&samples, 3, 3), Err(AnalysisError::InvalidParameter(_))));
    assert!(matches!(smooth(&samples, 21, 3), Err(AnalysisError::InvalidParameter(_))));
    assert!(matches!(smooth(&[], 3, 1), Err(AnalysisError::InvalidParameter(_))));
}

#[test]
fn test_smoothing_keeps_parameters_with_output() {
    let filter = SavitzkyGolay::new(SmoothingParams::new(7, 2)).unwrap();
    let smoothed = filter.apply(&ramp(30, 10.0)).unwrap();
    assert_eq!(smoothed.params(), SmoothingParams::new(7, 2));
}

#[test]
fn test_ramp_crosses_level_once() {
    let x = ramp(11, 10.0);
    let crossings = find_level_crossings(&x, &x, 5.0).unwrap();
    assert_eq!(crossings.len(), 1);
    assert_relative_eq!(crossings[0], 5.0, epsilon = 1e-12);
}

#[test]
fn test_ramp_crossing_between_samples() {
    let x = ramp(11, 10.0);
    let crossings = find_level_crossings(&x, &x, 4.5).unwrap();
    assert_eq!(crossings, vec![4.5]);
}

#[test]
fn test_triangular_pulse_fwhm() {
    let x = [0.0, 1.0, 2.0, 3.0, 4.0];
    let y = [0.0, 2.0, 4.0, 2.0, 0.0];

    let fwhm = fwhm_center(&x, &y).unwrap();
    assert_eq!(fwhm.max, 4.0);
    assert_eq!(fwhm.min, 0.0);
    assert_eq!(fwhm.half_level, 2.0);
    assert_relative_eq!(fwhm.left, 1.0, epsilon = 1e-12);
    assert_relative_eq!(fwhm.right, 3.0, epsilon = 1e-12);
    assert_relative_eq!(fwhm.center, 2.0, epsilon = 1e-12);
    assert_relative_eq!(fwhm.width, 2.0, epsilon = 1e-12);
}

#[test]
fn test_fwhm_uses_first_two_crossings() {
    let x: Vec<f64> = (0..9).map(|i| i as f64).collect();
    let y = [0.0, 4.0, 0.0, 4.0, 0.0, 4.0, 0.0, 4.0, 0.0];
    let fwhm = fwhm_center(&x, &y).unwrap();
    assert_relative_eq!(fwhm.left, 0.5, epsilon = 1e-12);
    assert_relative_eq!(fwhm.right, 1.5, epsilon = 1e-12);
}

#[test]
fn test_monotonic_signal_has_insufficient_crossings() {
    let x = ramp(10, 9.0);
    let y: Vec<f64> = x.iter().map(|v| v + 1.0).collect();
    assert!(matches!(
        fwhm_center(&x, &y),
        Err(AnalysisError::InsufficientCrossings { required: 2, found: 1, .. })
    ));
}

#[test]
fn test_level_below_minimum_is_never_fabricated() {
    let x = ramp(10, 9.0);
    let y: Vec<f64> = x.iter().map(|v| 10.0 + v * v).collect();
    match find_level_crossings(&x, &y, 5.0) {
        Err(AnalysisError::NoCrossingFound { target, min, max }) => {
            assert_eq!(target, 5.0);
            assert_eq!(min, 10.0);
            assert_eq!(max, 91.0);
        }
        other => panic!("expected NoCrossingFound, got {:?}", other),
    }
    assert!(matches!(
        half_max_from_levels(&x, &y, 2.0, 4.0),
        Err(AnalysisError::NoCrossingFound { .. })
    ));
}

#[test]
fn test_peak_value_interpolates_between_samples() {
    let x = [0.0, 1.0, 2.0, 3.0];
    let y = [0.0, 10.0, 30.0, 60.0];
    assert_relative_eq!(peak_value_at(&x, &y, 1.5).unwrap(), 20.0, epsilon = 1e-12);
    assert_relative_eq!(peak_value_at(&x, &y, 0.0).unwrap(), 0.0, epsilon = 1e-12);
    assert_relative_eq!(peak_value_at(&x, &y, 3.0).unwrap(), 60.0, epsilon = 1e-12);
    assert!(matches!(peak_value_at(&x, &y, 4.0), Err(AnalysisError::NoCrossingFound { .. })));
}

#[test]
fn test_half_max_between_plateaus() {
    let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let y = [100.0, 100.0, 100.0, 100.0, 80.0, 20.0, 0.0, 0.0, 0.0, 0.0];
    let reference = PlateauReference::HeadAndTail { head: 3, tail: 3 };
    let (start, end) = plateau_levels(&y, reference).unwrap();
    let crossing = half_max_from_levels(&x, &y, start, end).unwrap();
    assert_eq!(crossing.level, 50.0);
    assert_relative_eq!(crossing.position, 4.5, epsilon = 1e-12);

    let (start, end) = plateau_levels(&y, PlateauReference::HeadOnly { count: 2 }).unwrap();
    assert_eq!((start, end), (100.0, 0.0));
}

#[test]
fn test_linear_fit_exactness() {
    let x = [-2.0, 0.5, 3.0, 7.0];
    let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
    let fit = fit_line(&x, &y).unwrap();
    assert_relative_eq!(fit.slope, 3.0, epsilon = 1e-12);
    assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-12);
    assert_relative_eq!(fit.evaluate(10.0), 31.0, epsilon = 1e-10);

    let two_points = fit_line(&[1.0, 2.0], &[4.0, 7.0]).unwrap();
    assert_relative_eq!(two_points.slope, 3.0, epsilon = 1e-12);
}

#[test]
fn test_fitted_curve_for_plotting() {
    let x = [0.0, 1.0, 2.0, 4.0];
    let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
    let curve = fit_curve(&x, &y, 5).unwrap();
    assert_eq!(curve.points.len(), 5);
    assert_relative_eq!(curve.points[0].0, 0.0);
    assert_relative_eq!(curve.points[4].0, 4.0);
    assert_relative_eq!(curve.points[2].1, 7.0, epsilon = 1e-10);
}

#[test]
fn test_degenerate_fit_is_reported() {
    assert_eq!(
        fit_line(&[1.0, 1.0], &[0.0, 5.0]),
        Err(AnalysisError::DegenerateFit { distinct: 1, samples: 2 })
    );
}

#[test]
fn test_dual_region_slope_difference() {
    let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&v| if v < 10.0 { 2.0 * v } else { 40.0 - 2.0 * v })
        .collect();
    let flanks = DualRegionFit::compute(&x, &y, FitRange::Head(5), FitRange::Tail(5)).unwrap();
    assert_relative_eq!(flanks.first.slope, 2.0, epsilon = 1e-12);
    assert_relative_eq!(flanks.second.slope, -2.0, epsilon = 1e-12);
    assert_relative_eq!(flanks.slope_difference, 0.0, epsilon = 1e-12);

    assert!(DualRegionFit::compute(&x, &y, FitRange::Head(30), FitRange::Tail(5)).is_err());
}

#[test]
fn test_outlier_filter_boundary() {
    assert_eq!(
        classify(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap(),
        vec![true, true, true, true, false]
    );
    assert_eq!(classify(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(), vec![true; 5]);
}

#[test]
fn test_outlier_fence_is_configurable() {
    let values = [1.0, 2.0, 3.0, 4.0, 6.5];
    assert_eq!(classify(&values).unwrap(), vec![true; 5]);
    let strict = OutlierFilter::new(0.5).unwrap();
    assert_eq!(strict.classify(&values).unwrap(), vec![true, true, true, true, false]);
    assert!(OutlierFilter::new(-1.0).is_err());
}

#[test]
fn test_inputs_are_validated() {
    assert!(matches!(
        find_level_crossings(&[0.0, 1.0], &[0.0], 0.5),
        Err(AnalysisError::InvalidParameter(_))
    ));
    assert!(matches!(
        fwhm_center(&[0.0, 1.0, 2.0], &[0.0, f64::NAN, 0.0]),
        Err(AnalysisError::InvalidParameter(_))
    ));
}
