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

//! Device configuration file
//!
//! JSON description of which block to bind and how to drive the simulated
//! peripheral. Loaded once at startup; unknown fields are rejected.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{limits, sim, timing};
use crate::error::{GpadcError, Result};
use crate::variant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Identity string of the block to bind
    pub compatible: String,
    /// File holding the 8-byte calibration cell
    #[serde(default)]
    pub calibration_path: Option<PathBuf>,
    #[serde(default = "default_autosuspend_delay_ms")]
    pub autosuspend_delay_ms: u64,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Codes reported on the voltage inputs, channel order
    pub voltage_codes: Vec<u32>,
    /// Codes reported by the thermal sensors, sensor order
    pub temperature_codes: Vec<u32>,
    pub irq_period_ms: u64,
    /// Sleep through settle delays instead of only recording them
    pub real_time_delays: bool,
}

fn default_autosuspend_delay_ms() -> u64 {
    timing::AUTOSUSPEND_DELAY_MS
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            voltage_codes: vec![sim::DEFAULT_VOLTAGE_CODE; limits::VOLTAGE_CHANNELS as usize],
            temperature_codes: vec![sim::DEFAULT_TEMPERATURE_CODE],
            irq_period_ms: sim::DEFAULT_IRQ_PERIOD_MS,
            real_time_delays: false,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            compatible: "allwinner,sun4i-a10-gpadc".to_string(),
            calibration_path: None,
            autosuspend_delay_ms: default_autosuspend_delay_ms(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Load and validate a configuration file
pub fn load_config(path: &Path) -> Result<DeviceConfig> {
    let metadata = fs::metadata(path)
        .map_err(|e| GpadcError::FileRead { path: path.to_path_buf(), source: e })?;
    if metadata.len() > limits::MAX_CONFIG_FILE_SIZE {
        return Err(GpadcError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: limits::MAX_CONFIG_FILE_SIZE,
        });
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| GpadcError::FileRead { path: path.to_path_buf(), source: e })?;
    let config: DeviceConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;

    debug!("Loaded configuration for {} from {:?}", config.compatible, path);
    Ok(config)
}

/// Check values serde cannot express
pub fn validate_config(config: &DeviceConfig) -> Result<()> {
    let profile = variant::lookup(&config.compatible)?;

    if config.autosuspend_delay_ms > limits::MAX_AUTOSUSPEND_DELAY_MS {
        return Err(GpadcError::invalid_config(
            "autosuspend_delay_ms",
            format!("must be at most {}", limits::MAX_AUTOSUSPEND_DELAY_MS),
        ));
    }

    let simulation = &config.simulation;
    if simulation.voltage_codes.len() > limits::VOLTAGE_CHANNELS as usize {
        return Err(GpadcError::invalid_config(
            "simulation.voltage_codes",
            format!("at most {} entries", limits::VOLTAGE_CHANNELS),
        ));
    }
    if simulation.temperature_codes.len() > profile.sensor_count {
        return Err(GpadcError::invalid_config(
            "simulation.temperature_codes",
            format!("{} has {} sensor(s)", profile.soc, profile.sensor_count),
        ));
    }
    if let Some(code) = simulation.voltage_codes.iter().find(|c| **c >= 1 << 12) {
        return Err(GpadcError::invalid_config(
            "simulation.voltage_codes",
            format!("{} exceeds the 12-bit range", code),
        ));
    }
    if simulation.irq_period_ms == 0 || simulation.irq_period_ms > sim::MAX_IRQ_PERIOD_MS {
        return Err(GpadcError::invalid_config(
            "simulation.irq_period_ms",
            format!("must be between 1 and {}", sim::MAX_IRQ_PERIOD_MS),
        ));
    }

    Ok(())
}
