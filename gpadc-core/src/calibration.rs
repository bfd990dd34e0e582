/*
 * This file is part of gpadc.
 *
 * Copyright (C) 2025 gpadc contributors
 *
 * gpadc is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * gpadc is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with gpadc. If not, see <https://www.gnu.org/licenses/>.
 */

//! Factory calibration
//!
//! Variants that support it read an 8-byte blob from a non-volatile cell at
//! bind time. A blob of any other size is reported and ignored; a cell that
//! is not ready yet defers the bind. Applying the words to the hardware is
//! delegated to a [`CalibrationWriter`], which does nothing by default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::constants::limits;
use crate::error::{GpadcError, Result};
use crate::hw::RegisterPort;
use crate::variant::VariantProfile;

/// Two calibration words, in blob order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Calibration {
    pub words: [u32; 2],
}

impl Calibration {
    /// Decode a blob as two little-endian words
    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        if blob.len() != limits::CALIBRATION_BLOB_LEN {
            return Err(GpadcError::CalibrationSizeMismatch {
                expected: limits::CALIBRATION_BLOB_LEN,
                actual: blob.len(),
            });
        }
        let word = |i: usize| u32::from_le_bytes([blob[i], blob[i + 1], blob[i + 2], blob[i + 3]]);
        Ok(Self { words: [word(0), word(4)] })
    }
}

/// Why a non-volatile cell could not be read
#[derive(Debug, thiserror::Error)]
pub enum CellError {
    #[error("cell '{0}' does not exist")]
    NotFound(String),

    #[error("cell '{0}' is not ready yet")]
    NotReady(String),

    #[error("failed to read cell '{name}': {source}")]
    Io { name: String, source: io::Error },
}

/// Source of non-volatile calibration cells
#[cfg_attr(test, mockall::automock)]
pub trait CalibrationStore: Send + Sync {
    fn read_cell(&self, name: &str) -> std::result::Result<Vec<u8>, CellError>;
}

/// A platform without calibration storage
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCalibration;

impl CalibrationStore for NoCalibration {
    fn read_cell(&self, name: &str) -> std::result::Result<Vec<u8>, CellError> {
        Err(CellError::NotFound(name.to_string()))
    }
}

/// Calibration cell backed by a single file
#[derive(Debug, Clone)]
pub struct FileCalibration {
    path: PathBuf,
}

impl FileCalibration {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalibrationStore for FileCalibration {
    fn read_cell(&self, name: &str) -> std::result::Result<Vec<u8>, CellError> {
        fs::read(&self.path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CellError::NotFound(name.to_string()),
            _ => CellError::Io { name: name.to_string(), source },
        })
    }
}

/// Read the calibration cell for `profile`
///
/// Only a cell that is not ready fails the bind. Everything else leaves
/// calibration absent.
pub fn load_calibration(
    profile: &VariantProfile,
    store: &dyn CalibrationStore,
) -> Result<Option<Calibration>> {
    if !profile.supports_calibration {
        return Ok(None);
    }

    match store.read_cell(limits::CALIBRATION_CELL) {
        Ok(blob) => match Calibration::from_blob(&blob) {
            Ok(calibration) => {
                info!(
                    "Loaded calibration {:#010x} {:#010x}",
                    calibration.words[0], calibration.words[1]
                );
                Ok(Some(calibration))
            }
            Err(e) => {
                error!("Ignoring calibration data: {}", e);
                Ok(None)
            }
        },
        Err(CellError::NotReady(name)) => Err(GpadcError::DeferredBinding(name)),
        Err(CellError::NotFound(name)) => {
            debug!("No calibration cell '{}', continuing uncalibrated", name);
            Ok(None)
        }
        Err(e) => {
            warn!("Calibration unavailable: {}", e);
            Ok(None)
        }
    }
}

/// Applies calibration words to the thermal block during resume
///
/// No register sequence for the trim words has been validated on hardware,
/// so the only writer shipped is [`NoopCalibrationWriter`]. Platforms with a
/// confirmed layout plug their own in through `BindOptions`.
pub trait CalibrationWriter: Send + Sync {
    fn apply(&self, port: &dyn RegisterPort, calibration: &Calibration) -> Result<()>;
}

/// Leaves the hardware's own trim values in place
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCalibrationWriter;

impl CalibrationWriter for NoopCalibrationWriter {
    fn apply(&self, _port: &dyn RegisterPort, _calibration: &Calibration) -> Result<()> {
        Ok(())
    }
}
