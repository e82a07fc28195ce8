use anyhow::Context;
use beamline_alignment::config::{load_config_or_default, Config};
use beamline_alignment::logging::{self, ScanContext};
use beamline_alignment::visualization::{print_report, print_table};
use beamline_alignment::*;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "beamalign")]
#[command(about = "Scan analysis for X-ray beamline device alignment")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (TOML, or JSON starting with '{')
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the measurement report as JSON
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    /// Scan log of one motor sweep
    #[arg(short, long)]
    scan: PathBuf,

    /// Column holding the motor positions
    #[arg(long, default_value = "HXP W-Axis")]
    position_column: String,

    /// Column holding the sensor intensities
    #[arg(long, default_value = "X-Ray Sensor Data")]
    intensity_column: String,

    #[arg(long, default_value_t = ';')]
    delimiter: char,
}

impl ScanArgs {
    fn columns(&self) -> ScanColumns {
        ScanColumns {
            position: self.position_column.clone(),
            intensity: self.intensity_column.clone(),
            delimiter: self.delimiter,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Crystal bending angle from W rocking curves at stepped Y
    Bending {
        #[command(flatten)]
        scan: ScanArgs,

        /// Result table accumulated across scans
        #[arg(short, long)]
        table: PathBuf,

        /// Y-axis position of this scan (mm)
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
    },

    /// Crystal torsion angle from W rocking curves at stepped Z
    Torsion {
        #[command(flatten)]
        scan: ScanArgs,

        #[arg(short, long)]
        table: PathBuf,

        #[arg(long, allow_hyphen_values = true)]
        y: f64,

        /// Z-axis position of this scan (mm)
        #[arg(long, allow_hyphen_values = true)]
        z: f64,
    },

    /// Crystal miscut angle of the 180° series against the 0° series
    Miscut {
        #[command(flatten)]
        scan: ScanArgs,

        /// Result table of the 180° series
        #[arg(short, long)]
        table: PathBuf,

        /// Completed result table of the 0° series
        #[arg(short, long)]
        reference: PathBuf,

        #[arg(long, allow_hyphen_values = true)]
        y: f64,
    },

    /// Center of a peaked scan from its FWHM
    Center {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Half-max position of a knife-edge scan between its plateaus
    Edge {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Secondary-axis position minimizing the rocking-curve slope difference
    SlopeSearch {
        #[command(flatten)]
        scan: ScanArgs,

        #[arg(short, long)]
        table: PathBuf,

        #[arg(long, value_enum, default_value_t = SearchTarget::Crystal)]
        target: SearchTarget,

        /// Position of the stepped axis (Y for the crystal, X for the monochromator)
        #[arg(long, allow_hyphen_values = true)]
        position: f64,
    },

    /// Crystal Y position where the beam is cut to half intensity
    FineY {
        #[command(flatten)]
        scan: ScanArgs,

        #[arg(short, long)]
        table: PathBuf,

        #[arg(long, allow_hyphen_values = true)]
        y: f64,

        /// Open-beam intensity; overrides the configuration
        #[arg(long)]
        open_beam: Option<f64>,

        /// Open-beam reference table; its latest value is used
        #[arg(long, conflicts_with = "open_beam")]
        open_beam_table: Option<PathBuf>,
    },

    /// Slit position and rotation maximizing the FWHM
    Slit {
        #[command(flatten)]
        scan: ScanArgs,

        #[arg(short, long)]
        table: PathBuf,

        /// Rotational-axis position of this scan
        #[arg(long, allow_hyphen_values = true)]
        rotation: f64,
    },

    /// Crystal W offset minimizing the slope of the whole scan
    BeamOffset {
        #[command(flatten)]
        scan: ScanArgs,

        #[arg(short, long)]
        table: PathBuf,

        #[arg(long, allow_hyphen_values = true)]
        w: f64,

        #[arg(long, allow_hyphen_values = true)]
        x: f64,
    },

    /// Record the intensity of the unobstructed beam
    OpenBeam {
        #[command(flatten)]
        scan: ScanArgs,

        #[arg(short, long)]
        table: PathBuf,
    },

    /// Write a synthetic scan log for dry runs
    Simulate {
        /// Destination scan log
        #[arg(short, long)]
        scan: PathBuf,

        #[arg(long, value_enum, default_value_t = SimulatedShape::RockingCurve)]
        shape: SimulatedShape,

        /// Peak center or edge position
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        center: f64,

        #[arg(long, default_value_t = 1000.0)]
        amplitude: f64,

        #[arg(long, default_value_t = 0.0)]
        noise: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 81)]
        samples: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SearchTarget {
    Crystal,
    Monochromator,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SimulatedShape {
    RockingCurve,
    KnifeEdge,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config_or_default(cli.config.as_deref())?;
    let logging_config = config.logging.clone().with_verbosity(cli.verbose);
    let _guard = logging::init_logging(&logging_config)?;
    let correlation_id = logging::new_correlation_id();
    tracing::debug!(%correlation_id, "beamalign started");

    let output = cli.output.as_deref();
    match cli.command {
        Commands::Bending { scan, table, y } => {
            let procedure = Procedure::BendingAngle(config.bending_angle());
            let context = MeasurementContext::new().with_axis(Axis::Y, y);
            handle_measurement(&procedure, &scan, &context, Some(&table), output)?;
        }
        Commands::Torsion { scan, table, y, z } => {
            let procedure = Procedure::TorsionAngle(config.torsion_angle());
            let context = MeasurementContext::new()
                .with_axis(Axis::Y, y)
                .with_axis(Axis::Z, z);
            handle_measurement(&procedure, &scan, &context, Some(&table), output)?;
        }
        Commands::Miscut {
            scan,
            table,
            reference,
            y,
        } => {
            let reference_table = load_table(&reference)?
                .with_context(|| format!("Reference table {:?} does not exist", reference))?;
            let procedure = Procedure::MiscutAngle(config.miscut_angle());
            let context = MeasurementContext::new()
                .with_axis(Axis::Y, y)
                .with_reference(&reference_table);
            handle_measurement(&procedure, &scan, &context, Some(&table), output)?;
        }
        Commands::Center { scan } => {
            let procedure = Procedure::FwhmCenter(config.fwhm_center());
            handle_measurement(&procedure, &scan, &MeasurementContext::new(), None, output)?;
        }
        Commands::Edge { scan } => {
            let procedure = Procedure::AsymmetricHalfMax(config.asymmetric_half_max());
            handle_measurement(&procedure, &scan, &MeasurementContext::new(), None, output)?;
        }
        Commands::SlopeSearch {
            scan,
            table,
            target,
            position,
        } => {
            let target = match target {
                SearchTarget::Crystal => SlopeSearchTarget::CrystalYW,
                SearchTarget::Monochromator => SlopeSearchTarget::MonochromatorRotational,
            };
            let procedure = Procedure::SlopeDifferenceSearch(config.slope_search(target));
            let context = MeasurementContext::new().with_axis(target.secondary_axis(), position);
            handle_measurement(&procedure, &scan, &context, Some(&table), output)?;
        }
        Commands::FineY {
            scan,
            table,
            y,
            open_beam,
            open_beam_table,
        } => {
            let open_beam_value =
                resolve_open_beam(&config, open_beam, open_beam_table.as_deref())?;
            let procedure = Procedure::FineYAlignment(config.fine_y_alignment(open_beam_value));
            let context = MeasurementContext::new().with_axis(Axis::Y, y);
            handle_measurement(&procedure, &scan, &context, Some(&table), output)?;
        }
        Commands::Slit { scan, table, rotation } => {
            let procedure = Procedure::SlitMaxFwhm(config.slit_max_fwhm());
            let context = MeasurementContext::new().with_axis(Axis::Rotation, rotation);
            handle_measurement(&procedure, &scan, &context, Some(&table), output)?;
        }
        Commands::BeamOffset { scan, table, w, x } => {
            let procedure = Procedure::BeamOffsetSearch(config.beam_offset_search());
            let context = MeasurementContext::new()
                .with_axis(Axis::W, w)
                .with_axis(Axis::X, x);
            handle_measurement(&procedure, &scan, &context, Some(&table), output)?;
        }
        Commands::OpenBeam { scan, table } => {
            let procedure = Procedure::OpenBeamReference(config.open_beam_reference());
            let context = MeasurementContext::new();
            handle_measurement(&procedure, &scan, &context, Some(&table), output)?;
        }
        Commands::Simulate {
            scan,
            shape,
            center,
            amplitude,
            noise,
            seed,
            samples,
        } => {
            handle_simulate(&scan, shape, center, amplitude, noise, seed, samples)?;
        }
    }

    logging::clear_correlation_id();
    Ok(())
}

fn handle_measurement(
    procedure: &Procedure,
    scan_args: &ScanArgs,
    context: &MeasurementContext<'_>,
    table_path: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let scan = load_scan(&scan_args.scan, &scan_args.columns())?;
    validate_scan_length(&scan, procedure.measurement().smoothing().window)?;
    logging::set_scan_context(ScanContext {
        source: scan_args.scan.display().to_string(),
        samples: scan.len(),
    });

    let table = match table_path {
        Some(path) => load_table(path)?,
        None => None,
    };

    let report = procedure
        .run(&scan, context, table)
        .with_context(|| format!("{} failed on {:?}", procedure.name(), scan_args.scan))?;
    logging::clear_scan_context();

    print_report(&report);
    if let (Some(path), Some(table)) = (table_path, &report.table) {
        print_table(table);
        save_table(path, table)?;
        println!("Result table saved to {:?}", path);
    }

    if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write report {:?}", output_path))?;
        println!("Report saved to {:?}", output_path);
    }

    if let Outcome::Failed { reason } = &report.outcome {
        anyhow::bail!("{}: scan recorded but no result: {}", procedure.name(), reason);
    }
    Ok(())
}

fn resolve_open_beam(
    config: &Config,
    value: Option<f64>,
    table: Option<&Path>,
) -> anyhow::Result<f64> {
    if let Some(value) = value {
        return Ok(value);
    }
    if let Some(path) = table {
        let table = load_table(path)?
            .with_context(|| format!("Open beam table {:?} does not exist", path))?;
        return Ok(latest_open_beam_value(&table)?);
    }
    config
        .fine_alignment
        .open_beam_value
        .context(
            "No open beam value: pass --open-beam, --open-beam-table \
             or set fine_alignment.open_beam_value",
        )
}

fn handle_simulate(
    path: &Path,
    shape: SimulatedShape,
    center: f64,
    amplitude: f64,
    noise: f64,
    seed: u64,
    samples: usize,
) -> anyhow::Result<()> {
    let grid = SyntheticScan {
        samples,
        noise_std: noise,
        seed,
        ..SyntheticScan::default()
    };
    let scan = match shape {
        SimulatedShape::RockingCurve => grid.rocking_curve(center, amplitude, 0.0, 16.0)?,
        SimulatedShape::KnifeEdge => grid.knife_edge(center, amplitude, 0.0, 2.0)?,
    };
    save_scan(path, &scan, &ScanColumns::default())?;
    println!("Synthetic {:?} scan with {} samples written to {:?}", shape, scan.len(), path);
    Ok(())
}
