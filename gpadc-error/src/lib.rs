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

//! Unified error handling for gpadc
//!
//! This crate provides the single error type shared by the measurement core
//! and the command-line front end. It uses thiserror for Display and Error
//! trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using GpadcError
pub type Result<T> = std::result::Result<T, GpadcError>;

/// Unified error type for all gpadc operations
#[derive(thiserror::Error, Debug)]
pub enum GpadcError {
    // ============================================================================
    // Measurement Errors (transient, returned to the caller as-is)
    // ============================================================================
    #[error("Timed out after {waited_ms} ms waiting for {what} sample")]
    Timeout {
        what: &'static str,
        waited_ms: u64,
    },

    #[error("Register transport failure at {reg:#06x}: {reason}")]
    RegisterTransport {
        reg: u32,
        reason: String,
    },

    // ============================================================================
    // Binding and Configuration Errors
    // ============================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown hardware variant: {0}")]
    UnknownVariant(String),

    #[error("Binding deferred: {0} is not available yet")]
    DeferredBinding(String),

    #[error("Calibration data has wrong size ({actual} bytes, expected {expected})")]
    CalibrationSizeMismatch {
        expected: usize,
        actual: usize,
    },

    // ============================================================================
    // Power Lifecycle Errors
    // ============================================================================
    #[error("Power transition failed: {0}")]
    Power(String),

    // ============================================================================
    // I/O and Configuration File Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },
}

impl GpadcError {
    /// Create a register transport error
    pub fn transport(reg: u32, reason: impl Into<String>) -> Self {
        Self::RegisterTransport {
            reg,
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error (caller programming error)
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a config file error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Hardware-transient conditions. Retry policy belongs to the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::RegisterTransport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GpadcError::Timeout { what: "voltage", waited_ms: 1000 }.is_transient());
        assert!(GpadcError::transport(0x24, "bus error").is_transient());
        assert!(!GpadcError::invalid("channel 7").is_transient());
        assert!(!GpadcError::DeferredBinding("calibration".into()).is_transient());
        assert!(!GpadcError::UnknownVariant("acme,foo".into()).is_transient());
    }

    #[test]
    fn test_display_messages() {
        let err = GpadcError::transport(0x24, "bus error");
        assert_eq!(err.to_string(), "Register transport failure at 0x0024: bus error");

        let err = GpadcError::CalibrationSizeMismatch { expected: 8, actual: 6 };
        assert!(err.to_string().contains("6 bytes"));

        let err = GpadcError::Timeout { what: "temperature", waited_ms: 1000 };
        assert_eq!(err.to_string(), "Timed out after 1000 ms waiting for temperature sample");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: GpadcError = io_err.into();
        assert!(matches!(err, GpadcError::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: GpadcError = json_err.into();
        assert!(matches!(err, GpadcError::JsonParse(_)));
    }
}
