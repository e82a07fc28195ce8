use crate::algorithms::{FitRange, OutlierFilter, PlateauReference, SmoothingParams};
use crate::logging::LoggingConfig;
use crate::measurement::{
    AsymmetricHalfMax, BeamOffsetSearch, BendingAngle, Closeness, FineYAlignment, FwhmCenter,
    MiscutAngle, OpenBeamReference, SlitMaxFwhm, SlopeDifferenceSearch, SlopeSearchTarget,
    TorsionAngle,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub smoothing: SmoothingConfig,
    pub regions: RegionConfig,
    pub plateau: PlateauConfig,
    pub crystal: CrystalConfig,
    pub fine_alignment: FineAlignmentConfig,
    pub outliers: OutlierConfig,
    pub logging: LoggingConfig,
}

/// Savitzky-Golay profiles for the two kinds of scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Peaked scans (rocking curves, slit and source profiles)
    pub rocking_curve: SmoothingParams,
    /// Knife-edge scans with two plateaus
    pub edge_scan: SmoothingParams,
}

/// Flank ranges of the slope-difference fits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub first: FitRange,
    pub second: FitRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateauConfig {
    pub head: usize,
    pub tail: usize,
    /// Take the end level as a fully closed (zero) beam instead of the tail mean
    pub closed_beam_end: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrystalConfig {
    pub thickness: f64,
    pub min_fit_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FineAlignmentConfig {
    pub steps_required: usize,
    pub closeness: Closeness,
    /// Open-beam intensity; when absent it is read from the open-beam table
    pub open_beam_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    pub enabled: bool,
    pub fence: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            rocking_curve: SmoothingParams::new(11, 3),
            edge_scan: SmoothingParams::new(7, 2),
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            first: FitRange::Head(12),
            second: FitRange::Tail(12),
        }
    }
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self {
            head: 5,
            tail: 5,
            closed_beam_end: false,
        }
    }
}

impl Default for CrystalConfig {
    fn default() -> Self {
        Self {
            thickness: 1.0,
            min_fit_rows: 3,
        }
    }
}

impl Default for FineAlignmentConfig {
    fn default() -> Self {
        Self {
            steps_required: 5,
            closeness: Closeness::Signed,
            open_beam_value: None,
        }
    }
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fence: 1.5,
        }
    }
}

impl PlateauConfig {
    pub fn reference(&self) -> PlateauReference {
        if self.closed_beam_end {
            PlateauReference::HeadOnly { count: self.head }
        } else {
            PlateauReference::HeadAndTail {
                head: self.head,
                tail: self.tail,
            }
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        if content.trim_start().starts_with('{') {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON config {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Invalid TOML config {}", path.display()))
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> Result<()> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn bending_angle(&self) -> BendingAngle {
        BendingAngle {
            smoothing: self.smoothing.rocking_curve,
            crystal_thickness: self.crystal.thickness,
            min_rows: self.crystal.min_fit_rows,
        }
    }

    pub fn torsion_angle(&self) -> TorsionAngle {
        TorsionAngle {
            smoothing: self.smoothing.rocking_curve,
            min_rows: self.crystal.min_fit_rows,
        }
    }

    pub fn miscut_angle(&self) -> MiscutAngle {
        MiscutAngle {
            smoothing: self.smoothing.rocking_curve,
        }
    }

    pub fn fwhm_center(&self) -> FwhmCenter {
        FwhmCenter {
            smoothing: self.smoothing.rocking_curve,
        }
    }

    pub fn asymmetric_half_max(&self) -> AsymmetricHalfMax {
        AsymmetricHalfMax {
            smoothing: self.smoothing.edge_scan,
            plateau: self.plateau.reference(),
        }
    }

    /// Crystal searches reject outliers as configured; the monochromator never does.
    pub fn slope_search(&self, target: SlopeSearchTarget) -> SlopeDifferenceSearch {
        let outlier_fence = match target {
            SlopeSearchTarget::CrystalYW if self.outliers.enabled => Some(self.outliers.fence),
            _ => None,
        };
        SlopeDifferenceSearch {
            smoothing: self.smoothing.rocking_curve,
            target,
            first: self.regions.first,
            second: self.regions.second,
            outlier_fence,
        }
    }

    pub fn fine_y_alignment(&self, open_beam_value: f64) -> FineYAlignment {
        FineYAlignment {
            smoothing: self.smoothing.rocking_curve,
            steps_required: self.fine_alignment.steps_required,
            open_beam_value,
            closeness: self.fine_alignment.closeness,
        }
    }

    pub fn slit_max_fwhm(&self) -> SlitMaxFwhm {
        SlitMaxFwhm {
            smoothing: self.smoothing.rocking_curve,
        }
    }

    pub fn beam_offset_search(&self) -> BeamOffsetSearch {
        BeamOffsetSearch {
            smoothing: self.smoothing.rocking_curve,
        }
    }

    pub fn open_beam_reference(&self) -> OpenBeamReference {
        OpenBeamReference {
            smoothing: self.smoothing.rocking_curve,
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, params) in [
            ("smoothing.rocking_curve", self.smoothing.rocking_curve),
            ("smoothing.edge_scan", self.smoothing.edge_scan),
        ] {
            if let Err(e) = params.validate() {
                errors.push(format!("{}: {}", name, e));
            }
        }

        let regions = self.regions.first.resolve(usize::MAX);
        if let Err(e) = regions.and(self.regions.second.resolve(usize::MAX)) {
            errors.push(format!("regions: {}", e));
        }

        if self.plateau.head == 0 || (!self.plateau.closed_beam_end && self.plateau.tail == 0) {
            errors.push("Plateau sample counts must be positive".to_string());
        }

        if !self.crystal.thickness.is_finite() || self.crystal.thickness <= 0.0 {
            errors.push("Crystal thickness must be positive".to_string());
        }

        if self.crystal.min_fit_rows < 2 {
            errors.push("Angle fits need at least 2 rows".to_string());
        }

        if self.fine_alignment.steps_required == 0 {
            errors.push("Fine alignment needs at least one step".to_string());
        }

        if let Some(value) = self.fine_alignment.open_beam_value {
            if !value.is_finite() || value <= 0.0 {
                errors.push("Open beam value must be positive".to_string());
            }
        }

        if let Err(e) = OutlierFilter::new(self.outliers.fence) {
            errors.push(format!("outliers: {}", e));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Format implied by a file extension, TOML unless it is `.json`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Configuration from `config_path`, or the defaults when no file is given.
///
/// A file that is given must load and validate; its errors are returned.
pub fn load_config_or_default(config_path: Option<&Path>) -> Result<Config> {
    let Some(path) = config_path else {
        return Ok(Config::default());
    };
    let config = Config::load_from_file(path)?;
    config.validate().map_err(|errors| {
        anyhow::anyhow!("Invalid config {}: {}", path.display(), errors.join("; "))
    })?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}
