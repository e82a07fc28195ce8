use super::{ResultTable, Scan};
use anyhow::Context;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column layout of a device scan log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanColumns {
    pub position: String,
    pub intensity: String,
    pub delimiter: char,
}

impl Default for ScanColumns {
    fn default() -> Self {
        Self {
            position: "HXP W-Axis".to_string(),
            intensity: "X-Ray Sensor Data".to_string(),
            delimiter: ';',
        }
    }
}

impl ScanColumns {
    pub fn new(position: &str, intensity: &str) -> Self {
        Self {
            position: position.to_string(),
            intensity: intensity.to_string(),
            ..Self::default()
        }
    }

    fn delimiter_byte(&self) -> anyhow::Result<u8> {
        u8::try_from(self.delimiter).map_err(|_| {
            anyhow::anyhow!("Delimiter {:?} is not a single-byte character", self.delimiter)
        })
    }
}

/// Reads the position and intensity columns of a scan log.
///
/// Logs written by the sensor stage end every line with a delimiter, so
/// rows may carry an empty trailing field.
pub fn load_scan<P: AsRef<Path>>(path: P, columns: &ScanColumns) -> anyhow::Result<Scan> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(columns.delimiter_byte()?)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open scan log {:?}", path))?;

    let headers = rdr.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow::anyhow!("Column '{}' not found in {:?}", name, path))
    };
    let position_idx = find(&columns.position)?;
    let intensity_idx = find(&columns.intensity)?;

    let mut positions = Vec::new();
    let mut intensities = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let field = |idx: usize, name: &str| -> anyhow::Result<f64> {
            let raw = record
                .get(idx)
                .ok_or_else(|| anyhow::anyhow!("Row {} has no '{}' field", line + 1, name))?;
            raw.parse::<f64>()
                .with_context(|| format!("Row {}: cannot parse '{}' as {}", line + 1, raw, name))
        };
        positions.push(field(position_idx, &columns.position)?);
        intensities.push(field(intensity_idx, &columns.intensity)?);
    }

    tracing::debug!(path = ?path, samples = positions.len(), "scan log loaded");
    Ok(Scan::new(positions, intensities)?)
}

/// Writes a scan in the same layout the sensor stage produces.
pub fn save_scan<P: AsRef<Path>>(
    path: P,
    scan: &Scan,
    columns: &ScanColumns,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new()
        .delimiter(columns.delimiter_byte()?)
        .from_path(path)
        .with_context(|| format!("Failed to create scan log {:?}", path))?;
    wtr.write_record([columns.position.as_str(), columns.intensity.as_str()])?;
    for (p, i) in scan.positions().iter().zip(scan.intensities()) {
        wtr.write_record(&[p.to_string(), i.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Loads a result table; a missing file is `None`, any other failure is an error.
pub fn load_table<P: AsRef<Path>>(path: P) -> anyhow::Result<Option<ResultTable>> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!(path = ?path, "no result table yet, a new one will be started");
        return Ok(None);
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open result table {:?}", path))?;
    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut table = ResultTable::with_columns(columns);

    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let row = record
            .iter()
            .map(|raw| raw.trim().parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .with_context(|| format!("Row {} of {:?} is not numeric", line + 1, path))?;
        table.push_row(row)?;
    }
    Ok(Some(table))
}

pub fn save_table<P: AsRef<Path>>(path: P, table: &ResultTable) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to write result table {:?}", path))?;
    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    tracing::debug!(path = ?path, rows = table.len(), "result table saved");
    Ok(())
}

pub fn validate_scan_length(scan: &Scan, min_samples: usize) -> anyhow::Result<()> {
    if scan.len() < min_samples {
        return Err(anyhow::anyhow!(
            "Scan too short: {} samples, minimum: {}",
            scan.len(),
            min_samples
        ));
    }
    Ok(())
}
