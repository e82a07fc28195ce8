use approx::assert_relative_eq;
use beamline_alignment::measurement::columns::{PEAK_VALUE, W_POSITION, Y_POSITION};
use beamline_alignment::*;

/// Fine W grid on which every test center falls exactly on a sample
fn fine_grid() -> SyntheticScan {
    SyntheticScan {
        start: -3.0,
        stop: 3.0,
        samples: 601,
        ..SyntheticScan::default()
    }
}

fn rocking_curve(center: f64) -> Scan {
    fine_grid().rocking_curve(center, 1000.0, 0.0, 0.5).unwrap()
}

fn tilted_peak(tilt: f64) -> Scan {
    let positions: Vec<f64> = (0..81).map(|i| -20.0 + 0.5 * i as f64).collect();
    let intensities = positions
        .iter()
        .map(|&x| 100.0 * gaussian_peak(x, 0.0, 16.0) + tilt * x)
        .collect();
    Scan::new(positions, intensities).unwrap()
}

fn run(
    procedure: &Procedure,
    scan: &Scan,
    context: &MeasurementContext<'_>,
    table: Option<ResultTable>,
) -> MeasurementReport {
    procedure.run(scan, context, table).unwrap()
}

#[test]
fn test_bending_angle_end_to_end() {
    let procedure = Procedure::BendingAngle(BendingAngle {
        crystal_thickness: 500.0,
        ..BendingAngle::default()
    });

    let mut table = None;
    let mut outcomes = Vec::new();
    for (y, w) in [(0.0, 0.0), (1.0, 0.1), (2.0, 0.2)] {
        let context = MeasurementContext::new().with_axis(Axis::Y, y);
        let report = run(&procedure, &rocking_curve(w), &context, table.take());
        outcomes.push(report.outcome);
        table = report.table;
    }

    assert_eq!(outcomes[0], Outcome::Pending { rows: 1, required: 3 });
    assert_eq!(outcomes[1], Outcome::Pending { rows: 2, required: 3 });
    match &outcomes[2] {
        Outcome::BendingAngle { slope, bending_angle } => {
            assert_relative_eq!(*slope, 0.1, epsilon = 1e-6);
            assert_relative_eq!(*bending_angle, 50.0, epsilon = 1e-3);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let table = table.unwrap();
    assert_eq!(table.columns().to_vec(), vec![PEAK_VALUE, Y_POSITION, W_POSITION]);
    assert_eq!(table.column(Y_POSITION).unwrap(), vec![0.0, 1.0, 2.0]);
}

#[test]
fn test_bending_angle_from_rows() {
    let result = bending_angle(&[0.0, 1.0, 2.0], &[0.0, 0.1, 0.2], 500.0).unwrap();
    assert_relative_eq!(result.angle, 50.0, epsilon = 1e-9);
}

#[test]
fn test_torsion_angle_needs_three_scans() {
    let procedure = Procedure::TorsionAngle(TorsionAngle::default());
    let mut table = None;
    let mut last = None;
    for (z, w) in [(-1.0, 0.3), (0.0, 0.2), (1.0, 0.1)] {
        let context = MeasurementContext::new()
            .with_axis(Axis::Y, 0.0)
            .with_axis(Axis::Z, z);
        let report = run(&procedure, &rocking_curve(w), &context, table.take());
        assert_eq!(report.appended_row.as_ref().map(Vec::len), Some(4));
        table = report.table;
        last = Some(report.outcome);
    }
    match last {
        Some(Outcome::TorsionAngle { torsion_angle }) => {
            assert_relative_eq!(torsion_angle, -0.1, epsilon = 1e-6)
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_miscut_angle_end_to_end() {
    let mut reference = ResultTable::new(&[PEAK_VALUE, Y_POSITION, W_POSITION]);
    reference.push_row(vec![1000.0, 0.0, 1.0]).unwrap();
    reference.push_row(vec![1000.0, 1.0, 1.2]).unwrap();

    let procedure = Procedure::MiscutAngle(MiscutAngle::default());
    let mut table = None;
    let mut outcomes = Vec::new();
    for (y, w) in [(0.0, 0.8), (1.0, 1.0)] {
        let context = MeasurementContext::new()
            .with_axis(Axis::Y, y)
            .with_reference(&reference);
        let report = run(&procedure, &rocking_curve(w), &context, table.take());
        outcomes.push(report.outcome);
        table = report.table;
    }

    assert_eq!(outcomes[0], Outcome::Pending { rows: 1, required: 2 });
    match &outcomes[1] {
        Outcome::MiscutAngle { per_row, mean } => {
            assert_eq!(per_row.len(), 2);
            assert_relative_eq!(per_row[0], 0.1, epsilon = 1e-6);
            assert_relative_eq!(per_row[1], 0.1, epsilon = 1e-6);
            assert_relative_eq!(*mean, 0.1, epsilon = 1e-6);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let context = MeasurementContext::new()
        .with_axis(Axis::Y, 2.0)
        .with_reference(&reference);
    let report = run(&procedure, &rocking_curve(0.5), &context, table);
    assert!(report.outcome.is_failed());
    assert_eq!(report.table.map(|t| t.len()), Some(3));
}

#[test]
fn test_miscut_from_columns() {
    let miscut = miscut_angles(&[1.0, 1.2], &[0.8, 1.0]).unwrap();
    assert_relative_eq!(miscut.mean, 0.1, epsilon = 1e-12);
}

#[test]
fn test_miscut_without_reference_is_invalid() {
    let procedure = Procedure::MiscutAngle(MiscutAngle::default());
    let context = MeasurementContext::new().with_axis(Axis::Y, 0.0);
    assert!(matches!(
        procedure.run(&rocking_curve(0.0), &context, None),
        Err(AnalysisError::InvalidParameter(_))
    ));
}

#[test]
fn test_missing_axis_position_is_invalid() {
    let procedure = Procedure::BendingAngle(BendingAngle::default());
    assert!(matches!(
        procedure.run(&rocking_curve(0.0), &MeasurementContext::new(), None),
        Err(AnalysisError::InvalidParameter(_))
    ));
}

#[test]
fn test_table_of_another_procedure_is_rejected() {
    let foreign = ResultTable::new(&["Slope1", "Slope2"]);
    let procedure = Procedure::BendingAngle(BendingAngle::default());
    let context = MeasurementContext::new().with_axis(Axis::Y, 0.0);
    assert!(matches!(
        procedure.run(&rocking_curve(0.0), &context, Some(foreign)),
        Err(AnalysisError::MissingColumn(_))
    ));
}

#[test]
fn test_permuted_table_columns_keep_their_meaning() {
    let mut persisted = ResultTable::new(&[W_POSITION, Y_POSITION, PEAK_VALUE]);
    persisted.push_row(vec![0.0, 0.0, 500.0]).unwrap();

    let procedure = Procedure::BendingAngle(BendingAngle::default());
    let context = MeasurementContext::new().with_axis(Axis::Y, 1.0);
    let report = run(&procedure, &rocking_curve(0.1), &context, Some(persisted));

    let table = report.table.unwrap();
    let w = table.column(W_POSITION).unwrap();
    assert_eq!(w[0], 0.0);
    assert_relative_eq!(w[1], 0.1, epsilon = 1e-6);
    assert_eq!(table.column(Y_POSITION).unwrap(), vec![0.0, 1.0]);
    assert!(table.column(PEAK_VALUE).unwrap()[1] > 990.0);
}

#[test]
fn test_row_survives_underivable_result() {
    let procedure = Procedure::BendingAngle(BendingAngle::default());
    let context = MeasurementContext::new().with_axis(Axis::Y, 1.0);

    let mut table = None;
    let mut outcomes = Vec::new();
    for w in [0.0, 0.1, 0.2] {
        let report = run(&procedure, &rocking_curve(w), &context, table.take());
        outcomes.push(report.outcome);
        table = report.table;
    }

    assert!(outcomes[0].is_pending());
    assert!(outcomes[1].is_pending());
    match &outcomes[2] {
        Outcome::Failed { reason } => assert!(reason.contains("1 distinct")),
        other => panic!("unexpected outcome {:?}", other),
    }
    let table = table.unwrap();
    assert_eq!(table.len(), 3);
    assert_relative_eq!(table.column(W_POSITION).unwrap()[2], 0.2, epsilon = 1e-6);
}

#[test]
fn test_fwhm_center_of_rocking_curve() {
    let procedure = Procedure::FwhmCenter(FwhmCenter::default());
    let report = run(&procedure, &rocking_curve(0.37), &MeasurementContext::new(), None);
    match report.outcome {
        Outcome::FwhmCenter {
            center,
            fwhm,
            peak_value,
            ..
        } => {
            assert_relative_eq!(center, 0.37, epsilon = 1e-6);
            // 2·sqrt(0.5·ln 2)
            assert_relative_eq!(fwhm, 1.1774, epsilon = 1e-2);
            assert!(peak_value > 990.0 && peak_value <= 1000.0);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(report.smoothed.len(), 601);
}

#[test]
fn test_knife_edge_half_max_position() {
    let scan = SyntheticScan::default().knife_edge(2.5, 100.0, 0.0, 2.0).unwrap();
    let procedure = Procedure::AsymmetricHalfMax(AsymmetricHalfMax::default());
    let report = run(&procedure, &scan, &MeasurementContext::new(), None);
    match report.outcome {
        Outcome::HalfMaxPosition {
            position,
            level_start,
            level_end,
            ..
        } => {
            assert_relative_eq!(position, 2.5, epsilon = 1e-3);
            assert_relative_eq!(level_start, 100.0, epsilon = 1e-3);
            assert_relative_eq!(level_end, 0.0, epsilon = 1e-3);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_knife_edge_against_closed_beam() {
    let scan = SyntheticScan::default().knife_edge(-4.0, 80.0, 0.0, 2.0).unwrap();
    let procedure = Procedure::AsymmetricHalfMax(AsymmetricHalfMax {
        plateau: PlateauReference::HeadOnly { count: 5 },
        ..AsymmetricHalfMax::default()
    });
    match run(&procedure, &scan, &MeasurementContext::new(), None).outcome {
        Outcome::HalfMaxPosition { position, level, .. } => {
            assert_relative_eq!(level, 40.0, epsilon = 1e-3);
            assert_relative_eq!(position, -4.0, epsilon = 1e-3);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_slope_difference_search_picks_symmetric_scan() {
    let procedure = Procedure::SlopeDifferenceSearch(SlopeDifferenceSearch::default());
    let mut table = None;
    let mut last = None;
    for (y, tilt) in [(0.0, 0.3), (1.0, 0.0), (2.0, 0.2)] {
        let context = MeasurementContext::new().with_axis(Axis::Y, y);
        let report = run(&procedure, &tilted_peak(tilt), &context, table.take());
        table = report.table;
        last = Some(report.outcome);
    }

    match last {
        Some(Outcome::SlopeDifferenceOptimum {
            secondary_position,
            center,
            slope_difference,
            std_dev,
            inliers,
        }) => {
            assert_eq!(secondary_position, 1.0);
            assert_relative_eq!(center, 0.0, epsilon = 1e-6);
            assert!(slope_difference < 1e-4);
            assert_eq!(inliers, 3);
            assert_relative_eq!(std_dev.unwrap(), 0.3055, epsilon = 1e-3);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let table = table.unwrap();
    let slope1 = table.column("Slope1").unwrap();
    assert_relative_eq!(slope1[0], 0.3, epsilon = 1e-3);
}

#[test]
fn test_monochromator_search_steps_along_x() {
    let procedure = Procedure::SlopeDifferenceSearch(SlopeDifferenceSearch::monochromator());
    let context = MeasurementContext::new().with_axis(Axis::Y, 1.0);
    assert!(matches!(
        procedure.run(&tilted_peak(0.1), &context, None),
        Err(AnalysisError::InvalidParameter(_))
    ));

    let context = MeasurementContext::new().with_axis(Axis::X, 4.0);
    let report = run(&procedure, &tilted_peak(0.1), &context, None);
    let table = report.table.unwrap();
    assert_eq!(table.columns()[3], "X-Axis Position");
    assert_eq!(table.columns()[4], "Omega-Axis Position");
}

#[test]
fn test_fine_y_alignment_closeness_modes() {
    let amplitudes = [(0.1, 150.0), (0.2, 97.0), (0.3, 80.0)];
    let grid = SyntheticScan::default();

    for (closeness, expected_y) in [(Closeness::Signed, 0.3), (Closeness::Absolute, 0.2)] {
        let procedure = Procedure::FineYAlignment(FineYAlignment {
            steps_required: 3,
            open_beam_value: 200.0,
            closeness,
            ..FineYAlignment::default()
        });
        let mut table = None;
        let mut outcomes = Vec::new();
        for (y, amplitude) in amplitudes {
            let scan = grid.rocking_curve(0.0, amplitude, 0.0, 16.0).unwrap();
            let context = MeasurementContext::new().with_axis(Axis::Y, y);
            let report = run(&procedure, &scan, &context, table.take());
            outcomes.push(report.outcome);
            table = report.table;
        }

        assert!(outcomes[0].is_pending());
        assert!(outcomes[1].is_pending());
        match &outcomes[2] {
            Outcome::FineYPosition { y_position, .. } => assert_eq!(*y_position, expected_y),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}

#[test]
fn test_fine_y_requires_open_beam_value() {
    let procedure = Procedure::FineYAlignment(FineYAlignment::default());
    let context = MeasurementContext::new().with_axis(Axis::Y, 0.0);
    assert!(matches!(
        procedure.run(&rocking_curve(0.0), &context, None),
        Err(AnalysisError::InvalidParameter(_))
    ));
}

#[test]
fn test_slit_alignment_maximizes_fwhm() {
    let procedure = Procedure::SlitMaxFwhm(SlitMaxFwhm::default());
    let grid = SyntheticScan::default();
    let mut table = None;
    let mut last = None;
    for (rotation, center, spread) in [(0.0, 1.0, 8.0), (10.0, 2.0, 32.0), (20.0, 3.0, 16.0)] {
        let scan = grid.rocking_curve(center, 500.0, 10.0, spread).unwrap();
        let context = MeasurementContext::new().with_axis(Axis::Rotation, rotation);
        let report = run(&procedure, &scan, &context, table.take());
        table = report.table;
        last = Some(report.outcome);
    }

    match last {
        Some(Outcome::SlitOptimum { x_position, rotation, .. }) => {
            assert_eq!(rotation, 10.0);
            assert_relative_eq!(x_position, 2.0, epsilon = 1e-6);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(table.map(|t| t.len()), Some(3));
}

#[test]
fn test_beam_offset_takes_flattest_scan() {
    let procedure = Procedure::BeamOffsetSearch(BeamOffsetSearch::default());
    let positions: Vec<f64> = (0..41).map(|i| i as f64 * 0.25).collect();
    let mut table = None;
    let mut last = None;
    for (slope, w, x) in [(0.5, 1.0, 4.0), (-0.2, 2.0, 5.0), (0.1, 3.0, 6.0)] {
        let intensities = positions.iter().map(|p| slope * p + 10.0).collect();
        let scan = Scan::new(positions.clone(), intensities).unwrap();
        let context = MeasurementContext::new()
            .with_axis(Axis::W, w)
            .with_axis(Axis::X, x);
        let report = run(&procedure, &scan, &context, table.take());
        table = report.table;
        last = Some(report.outcome);
    }

    match last {
        Some(Outcome::BeamOffset {
            w_position,
            x_position,
            slope,
        }) => {
            assert_eq!(w_position, 2.0);
            assert_eq!(x_position, 5.0);
            assert_relative_eq!(slope, -0.2, epsilon = 1e-9);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_open_beam_reference_feeds_fine_alignment() {
    let procedure = Procedure::OpenBeamReference(OpenBeamReference::default());
    let first = run(&procedure, &rocking_curve(0.0), &MeasurementContext::new(), None);
    let scan = fine_grid().rocking_curve(0.0, 1200.0, 0.0, 0.5).unwrap();
    let second = run(&procedure, &scan, &MeasurementContext::new(), first.table);

    let table = second.table.unwrap();
    assert_eq!(table.len(), 2);
    let latest = latest_open_beam_value(&table).unwrap();
    assert_relative_eq!(latest, 1200.0, epsilon = 1.0);
}

#[test]
fn test_report_serializes_outcome_tag() {
    let procedure = Procedure::FwhmCenter(FwhmCenter::default());
    let report = run(&procedure, &rocking_curve(0.0), &MeasurementContext::new(), None);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["procedure"], "fwhm_center");
    assert_eq!(json["outcome"]["kind"], "fwhm_center");
}
