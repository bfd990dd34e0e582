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

//! A bound device on top of the simulated peripheral

use std::sync::Arc;
use std::time::Duration;

use gpadc_core::hw::InterruptSource;
use gpadc_core::{
    load_config, lookup, validate_config, BindOptions, DeviceConfig, FileCalibration, Gpadc,
    Result, SimulatedGpadc,
};
use tracing::debug;

use crate::cli::Cli;

/// Configuration file plus command-line overrides
pub fn resolve_config(cli: &Cli) -> Result<DeviceConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DeviceConfig::default(),
    };
    if let Some(compatible) = &cli.compatible {
        config.compatible = compatible.clone();
    }
    if let Some(path) = &cli.calibration {
        config.calibration_path = Some(path.clone());
    }
    validate_config(&config)?;
    Ok(config)
}

/// Device, simulated block and the running interrupt source
pub struct Session {
    pub device: Gpadc,
    pub sim: Arc<SimulatedGpadc>,
    irq: InterruptSource,
}

impl Session {
    pub fn open(config: &DeviceConfig) -> Result<Self> {
        let profile = lookup(&config.compatible)?;
        let simulation = &config.simulation;

        let sim = Arc::new(SimulatedGpadc::new(profile));
        for (channel, code) in simulation.voltage_codes.iter().enumerate() {
            sim.set_voltage_code(channel as u32, *code);
        }
        for (sensor, code) in simulation.temperature_codes.iter().enumerate() {
            sim.set_temperature_code(sensor, *code);
        }

        let mut options = BindOptions::default()
            .with_autosuspend_delay(Duration::from_millis(config.autosuspend_delay_ms));
        if !simulation.real_time_delays {
            options = options.with_delay(sim.clone());
        }
        if let Some(path) = &config.calibration_path {
            options = options.with_calibration_store(Arc::new(FileCalibration::new(path)));
        }

        let device = Gpadc::bind(&config.compatible, sim.clone(), options)?;
        let handler = device.irq_handler();
        let irq = sim.start_interrupts(Duration::from_millis(simulation.irq_period_ms), move || {
            handler.handle();
        })?;

        debug!("Session open for {}", config.compatible);
        Ok(Self { device, sim, irq })
    }

    /// Interrupts delivered since the session opened
    pub fn interrupts_fired(&self) -> u64 {
        self.irq.fired_count()
    }

    /// Stop the interrupt source, then unbind
    pub fn close(self) -> Result<()> {
        let Session { device, irq, .. } = self;
        drop(irq);
        device.unbind()
    }
}
