//! Camera calibration handoff.
//!
//! Parsing native calibration formats is the tracker library's business.
//! This module only defines the seam that carries a loaded calibration into
//! tracker construction, plus a JSON-backed source for tests and tooling.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Calibration-derived camera description handed to tracker construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    /// Projection matrix derived from the intrinsic parameters.
    pub projection: Matrix4<f64>,
    /// Pixel width the calibration was captured at.
    pub width: u32,
    /// Pixel height the calibration was captured at.
    pub height: u32,
}

/// Errors surfaced while obtaining calibration data.
///
/// Any of these aborts session construction; there is no degraded mode
/// without a calibrated camera.
#[derive(Debug, Clone, Error)]
pub enum CalibrationError {
    #[error("failed to load calibration {locator:?}: {reason}")]
    Load { locator: String, reason: String },
    #[error("calibration {locator:?} is malformed: {reason}")]
    Malformed { locator: String, reason: String },
}

/// Source of calibration data. Hosts decide where the bytes come from
/// (file, embedded asset, network fetch).
pub trait CalibrationSource {
    /// Resource locator, used in diagnostics only.
    fn locator(&self) -> &str;

    /// Load and hand over the calibration. Called once per session build.
    fn load(&self) -> Result<CameraCalibration, CalibrationError>;
}

/// An already-loaded calibration can stand in as its own source.
impl CalibrationSource for CameraCalibration {
    fn locator(&self) -> &str {
        "inline"
    }

    fn load(&self) -> Result<CameraCalibration, CalibrationError> {
        Ok(self.clone())
    }
}

/// Calibration stored as a JSON file on disk.
pub struct JsonCalibrationFile {
    path: PathBuf,
    locator: String,
}

impl JsonCalibrationFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let locator = path.display().to_string();
        Self { path, locator }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalibrationSource for JsonCalibrationFile {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn load(&self) -> Result<CameraCalibration, CalibrationError> {
        let text = fs::read_to_string(&self.path).map_err(|e| CalibrationError::Load {
            locator: self.locator.clone(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| CalibrationError::Malformed {
            locator: self.locator.clone(),
            reason: e.to_string(),
        })
    }
}
