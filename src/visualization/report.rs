use crate::data::ResultTable;
use crate::measurement::{MeasurementReport, Outcome};

pub fn print_report(report: &MeasurementReport) {
    println!("=== {} ===", report.procedure);
    println!("  Samples: {}", report.smoothed.len());
    println!(
        "  Smoothing: window {}, polyorder {}",
        report.smoothed.params().window,
        report.smoothed.params().polyorder
    );
    if let Some(row) = &report.appended_row {
        let values: Vec<String> = row.iter().map(|v| format!("{:.6}", v)).collect();
        println!("  Appended row: [{}]", values.join(", "));
    }
    print_outcome(&report.outcome);
    println!();
}

pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Pending { rows, required } => {
            println!("  Pending: {} of {} scans recorded", rows, required);
        }
        Outcome::BendingAngle { slope, bending_angle } => {
            println!("  Slope (W vs Y): {:.6}", slope);
            println!("  Bending angle: {:.6}", bending_angle);
        }
        Outcome::TorsionAngle { torsion_angle } => {
            println!("  Torsion angle: {:.6}", torsion_angle);
        }
        Outcome::MiscutAngle { per_row, mean } => {
            for (i, miscut) in per_row.iter().enumerate() {
                println!("  Miscut [{}]: {:.6}", i, miscut);
            }
            println!("  Mean miscut: {:.6}", mean);
        }
        Outcome::FwhmCenter {
            center,
            left,
            right,
            fwhm,
            peak_value,
        } => {
            println!("  Half-max crossings: {:.6} / {:.6}", left, right);
            println!("  FWHM: {:.6}", fwhm);
            println!("  Center: {:.6}", center);
            println!("  Peak value at center: {:.6}", peak_value);
        }
        Outcome::HalfMaxPosition {
            position,
            level,
            level_start,
            level_end,
        } => {
            println!("  Plateaus: {:.6} -> {:.6}", level_start, level_end);
            println!("  Half level: {:.6}", level);
            println!("  Position: {:.6}", position);
        }
        Outcome::SlopeDifferenceOptimum {
            secondary_position,
            center,
            slope_difference,
            std_dev,
            inliers,
        } => {
            println!("  Optimal secondary position: {:.6}", secondary_position);
            println!("  Center at optimum: {:.6}", center);
            println!("  Slope difference: {:.6}", slope_difference);
            match std_dev {
                Some(std_dev) => {
                    println!("  Std dev of differences: {:.6} ({} inliers)", std_dev, inliers)
                }
                None => println!("  Std dev of differences: n/a ({} inliers)", inliers),
            }
        }
        Outcome::FineYPosition { y_position, peak_value } => {
            println!("  Y position: {:.6}", y_position);
            println!("  Peak value there: {:.6}", peak_value);
        }
        Outcome::SlitOptimum {
            x_position,
            rotation,
            fwhm,
        } => {
            println!("  Slit center X: {:.6}", x_position);
            println!("  Rotational position: {:.6}", rotation);
            println!("  FWHM: {:.6}", fwhm);
        }
        Outcome::BeamOffset {
            w_position,
            x_position,
            slope,
        } => {
            println!("  W position: {:.6}", w_position);
            println!("  X position: {:.6}", x_position);
            println!("  Slope: {:.6}", slope);
        }
        Outcome::OpenBeam { value } => {
            println!("  Open beam value: {:.6}", value);
        }
        Outcome::Failed { reason } => {
            println!("  No result: {}", reason);
        }
    }
}

pub fn print_table(table: &ResultTable) {
    println!("| {} |", table.columns().join(" | "));
    let separator: Vec<String> = table.columns().iter().map(|c| "-".repeat(c.len())).collect();
    println!("|{}|", separator.iter().map(|s| format!("-{}-", s)).collect::<Vec<_>>().join("|"));

    for row in table.rows() {
        let cells: Vec<String> = row
            .iter()
            .zip(table.columns())
            .map(|(value, column)| format!("{:>width$.6}", value, width = column.len()))
            .collect();
        println!("| {} |", cells.join(" | "));
    }
}
