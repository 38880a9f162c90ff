//! Peak tables and orientation matrices on disk.
//!
//! Tables are JSON documents `{"peaks": [...], "ub": [[..], [..], [..]]}`;
//! the linked summary is a fixed-width text artifact.

use crate::domain::{LinkError, LinkResult, MillerIndex, OrientationMatrix, Peak, PeakCatalogue};
use crate::numerics::{Mat3, Vec3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What a table on disk is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Peak-search output: position and d-spacing, indices optional.
    Observed,
    /// Every row must carry an index.
    Predicted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PeakRow {
    pub q_lab: Vec3,
    pub d_spacing: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hkl: Option<MillerIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hkl_continuous: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeakTable {
    pub peaks: Vec<PeakRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ub: Option<[[f64; 3]; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrientationFile {
    ub: [[f64; 3]; 3],
}

impl From<&PeakCatalogue> for PeakTable {
    fn from(catalogue: &PeakCatalogue) -> Self {
        Self {
            peaks: catalogue
                .iter()
                .map(|peak| PeakRow {
                    q_lab: peak.q_lab,
                    d_spacing: peak.d_spacing,
                    hkl: peak.hkl,
                    hkl_continuous: peak.hkl_continuous,
                })
                .collect(),
            ub: catalogue.orientation().map(OrientationMatrix::to_rows),
        }
    }
}

impl PeakTable {
    pub fn into_catalogue(self) -> PeakCatalogue {
        let catalogue: PeakCatalogue = self
            .peaks
            .into_iter()
            .map(|row| Peak {
                q_lab: row.q_lab,
                d_spacing: row.d_spacing,
                hkl: row.hkl,
                hkl_continuous: row.hkl_continuous,
            })
            .collect();
        match self.ub {
            Some(rows) => catalogue.with_orientation(OrientationMatrix::from_rows(rows)),
            None => catalogue,
        }
    }

    pub fn validate(&self, kind: TableKind) -> LinkResult<()> {
        for (row_index, row) in self.peaks.iter().enumerate() {
            if row.q_lab.iter().any(|component| !component.is_finite()) {
                return Err(table_error(row_index, "Q-lab position must be finite"));
            }
            if !(row.d_spacing.is_finite() && row.d_spacing > 0.0) {
                return Err(table_error(
                    row_index,
                    format!("d-spacing must be positive and finite, got {}", row.d_spacing),
                ));
            }
            if kind == TableKind::Predicted && row.hkl.is_none() {
                return Err(table_error(row_index, "predicted peaks must carry H, K and L"));
            }
        }
        if let Some(rows) = self.ub {
            validate_orientation_rows(rows)?;
        }
        Ok(())
    }
}

fn table_error(row_index: usize, message: impl std::fmt::Display) -> LinkError {
    LinkError::configuration("INPUT.PEAK_TABLE", format!("row {}: {}", row_index, message))
}

fn validate_orientation_rows(rows: [[f64; 3]; 3]) -> LinkResult<()> {
    Mat3::from_rows(rows)
        .inverse()
        .map(|_| ())
        .map_err(|error| {
            LinkError::configuration("INPUT.UB_MATRIX", format!("invalid UB matrix: {}", error))
        })
}

pub fn parse_peak_table(source: &str, kind: TableKind) -> LinkResult<PeakCatalogue> {
    let table: PeakTable = serde_json::from_str(source).map_err(|error| {
        LinkError::configuration(
            "INPUT.PEAK_TABLE",
            format!("failed to parse peak table: {}", error),
        )
    })?;
    table.validate(kind)?;
    Ok(table.into_catalogue())
}

pub fn read_peak_table(path: impl AsRef<Path>, kind: TableKind) -> LinkResult<PeakCatalogue> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|error| {
        LinkError::io_system(
            "IO.TABLE_READ",
            format!("failed to read peak table '{}': {}", path.display(), error),
        )
    })?;
    parse_peak_table(&source, kind).map_err(|error| {
        LinkError::new(
            error.category(),
            error.code(),
            format!("{}: {}", path.display(), error.message()),
        )
    })
}

pub fn write_peak_table(path: impl AsRef<Path>, catalogue: &PeakCatalogue) -> LinkResult<()> {
    write_json(path.as_ref(), &PeakTable::from(catalogue))
}

pub fn read_orientation(path: impl AsRef<Path>) -> LinkResult<OrientationMatrix> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|error| {
        LinkError::io_system(
            "IO.UB_READ",
            format!("failed to read UB matrix '{}': {}", path.display(), error),
        )
    })?;
    let file: OrientationFile = serde_json::from_str(&source).map_err(|error| {
        LinkError::configuration(
            "INPUT.UB_MATRIX",
            format!("failed to parse UB matrix '{}': {}", path.display(), error),
        )
    })?;
    validate_orientation_rows(file.ub)?;
    Ok(OrientationMatrix::from_rows(file.ub))
}

pub fn write_orientation(
    path: impl AsRef<Path>,
    orientation: &OrientationMatrix,
) -> LinkResult<()> {
    write_json(
        path.as_ref(),
        &OrientationFile {
            ub: orientation.to_rows(),
        },
    )
}

fn write_json(path: &Path, value: &impl Serialize) -> LinkResult<()> {
    let mut content = serde_json::to_string_pretty(value).map_err(|error| {
        LinkError::internal(
            "SYS.JSON_ENCODE",
            format!("failed to encode '{}': {}", path.display(), error),
        )
    })?;
    content.push('\n');
    fs::write(path, content).map_err(|error| {
        LinkError::io_system(
            "IO.OUTPUT_WRITE",
            format!("failed to write '{}': {}", path.display(), error),
        )
    })
}

pub fn format_fixed_f64(value: f64, width: usize, precision: usize) -> String {
    format!(
        "{value:>width$.precision$}",
        width = width,
        precision = precision
    )
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

/// One row per linked peak: `H K L Qx Qy Qz d`.
pub fn render_linked_summary(linked: &PeakCatalogue) -> String {
    let mut lines = vec![format!(
        "{:>5}{:>5}{:>5}{:>13}{:>13}{:>13}{:>13}",
        "H", "K", "L", "Qx", "Qy", "Qz", "d"
    )];
    for peak in linked {
        let MillerIndex { h, k, l } = peak.hkl.unwrap_or_default();
        lines.push(format!(
            "{:>5}{:>5}{:>5}{}{}{}{}",
            h,
            k,
            l,
            format_fixed_f64(peak.q_lab[0], 13, 6),
            format_fixed_f64(peak.q_lab[1], 13, 6),
            format_fixed_f64(peak.q_lab[2], 13, 6),
            format_fixed_f64(peak.d_spacing, 13, 6),
        ));
    }
    lines.join("\n")
}
