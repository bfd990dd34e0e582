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

//! Command execution

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use gpadc_core::constants::voltage;
use gpadc_core::{variant, GpadcError, PowerState, VariantSummary};
use serde::Serialize;
use tracing::warn;

use crate::cli::{Cli, Commands, PowerAction};
use crate::session::{resolve_config, Session};

#[derive(Debug, Serialize)]
pub struct VoltageReading {
    pub channel: u32,
    pub raw: u32,
    pub millivolts: u32,
}

#[derive(Debug, Serialize)]
pub struct TemperatureReading {
    pub sensor: usize,
    pub raw: u32,
    pub offset: i32,
    pub scale: i32,
    /// `(raw + offset) * scale`, millidegrees Celsius
    pub value: i32,
}

#[derive(Debug, Serialize)]
pub struct MonitorRound {
    pub round: u32,
    pub voltages: Vec<VoltageReading>,
    pub temperatures: Vec<TemperatureReading>,
    pub power: PowerState,
}

#[derive(Debug, Serialize)]
pub struct RegisterDump {
    pub offset: u32,
    pub value: u32,
}

#[derive(Debug, Serialize)]
pub struct PowerReport {
    pub compatible: &'static str,
    pub state: PowerState,
    pub registers: Vec<RegisterDump>,
}

pub fn run(cli: &Cli) -> Result<()> {
    if let Commands::Variants = cli.command {
        return cmd_variants(cli.json);
    }

    let config = resolve_config(cli).context("invalid device configuration")?;
    let session = Session::open(&config)
        .with_context(|| format!("failed to bind {}", config.compatible))?;

    let result = match &cli.command {
        Commands::Variants => Ok(()),
        Commands::Voltage { channel } => cmd_voltage(&session, *channel, cli.json),
        Commands::Temp { sensor } => cmd_temp(&session, *sensor, cli.json),
        Commands::Monitor { count, interval_ms } => {
            cmd_monitor(&session, *count, Duration::from_millis(*interval_ms), cli.json)
        }
        Commands::Power { action } => cmd_power(&session, *action, cli.json),
        Commands::Dump => cmd_dump(&session, cli.json),
    };

    session.close().context("failed to unbind")?;
    result
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Variants
// ============================================================================

fn cmd_variants(json: bool) -> Result<()> {
    let summaries: Vec<VariantSummary> = variant::all().iter().map(|p| p.summary()).collect();
    if json {
        return print_json(&summaries);
    }

    println!("Supported variants ({}):", summaries.len());
    for s in &summaries {
        println!("  {} ({} {})", s.compatible, s.soc, s.family);
        println!(
            "    offset {}, scale {}, {} sensor(s), voltage inputs: {}, interrupt: {}, calibration: {}",
            s.temp_offset,
            s.temp_scale,
            s.sensor_count,
            if s.has_voltage_channel { "yes" } else { "no" },
            s.interrupt,
            if s.supports_calibration { "yes" } else { "no" }
        );
    }
    Ok(())
}

// ============================================================================
// Reads
// ============================================================================

pub fn read_voltage(session: &Session, channel: u32) -> gpadc_core::Result<VoltageReading> {
    let raw = session.device.read_voltage(channel)?;
    Ok(VoltageReading { channel, raw, millivolts: voltage::raw_to_millivolts(raw) })
}

pub fn read_temperature(session: &Session, sensor: usize) -> gpadc_core::Result<TemperatureReading> {
    let handle = session.device.sensor(sensor)?;
    let raw = handle.read_raw()?;
    let profile = session.device.profile();
    Ok(TemperatureReading {
        sensor,
        raw,
        offset: handle.offset(),
        scale: handle.scale(),
        value: profile.temperature_from_raw(raw as i32),
    })
}

fn cmd_voltage(session: &Session, channel: u32, json: bool) -> Result<()> {
    let reading = read_voltage(session, channel)?;
    if json {
        return print_json(&reading);
    }
    println!("Channel {}: {} mV (raw {})", reading.channel, reading.millivolts, reading.raw);
    Ok(())
}

fn cmd_temp(session: &Session, sensor: usize, json: bool) -> Result<()> {
    let reading = read_temperature(session, sensor)?;
    if json {
        return print_json(&reading);
    }
    println!(
        "Sensor {}: {:.1}°C (raw {}, offset {}, scale {})",
        reading.sensor,
        reading.value as f64 / 1000.0,
        reading.raw,
        reading.offset,
        reading.scale
    );
    Ok(())
}

fn cmd_monitor(session: &Session, count: u32, interval: Duration, json: bool) -> Result<()> {
    let device = &session.device;
    let channels = if device.profile().has_voltage_channel {
        gpadc_core::constants::limits::VOLTAGE_CHANNELS
    } else {
        0
    };

    for round in 1..=count {
        let mut voltages = Vec::new();
        for channel in 0..channels {
            match read_voltage(session, channel) {
                Ok(reading) => voltages.push(reading),
                Err(e) if e.is_transient() => warn!("Skipping channel {}: {}", channel, e),
                Err(e) => return Err(e.into()),
            }
        }

        let mut temperatures = Vec::new();
        for sensor in 0..device.sensors().len() {
            match read_temperature(session, sensor) {
                Ok(reading) => temperatures.push(reading),
                Err(e) if e.is_transient() => warn!("Skipping sensor {}: {}", sensor, e),
                Err(e) => return Err(e.into()),
            }
        }

        let report = MonitorRound { round, voltages, temperatures, power: device.power_state() };
        if json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print_round(&report);
        }

        if round < count {
            thread::sleep(interval);
            device.runtime_pm().poll_idle()?;
        }
    }
    Ok(())
}

fn print_round(report: &MonitorRound) {
    let volts: Vec<String> = report
        .voltages
        .iter()
        .map(|v| format!("ch{}={}mV", v.channel, v.millivolts))
        .collect();
    let temps: Vec<String> = report
        .temperatures
        .iter()
        .map(|t| format!("t{}={:.1}°C", t.sensor, t.value as f64 / 1000.0))
        .collect();
    println!("[{:>3}] {} {} ({})", report.round, volts.join(" "), temps.join(" "), report.power);
}

// ============================================================================
// Power and registers
// ============================================================================

pub fn power_report(session: &Session) -> PowerReport {
    PowerReport {
        compatible: session.device.profile().compatible,
        state: session.device.power_state(),
        registers: session
            .sim
            .snapshot()
            .into_iter()
            .map(|(offset, value)| RegisterDump { offset, value })
            .collect(),
    }
}

fn cmd_power(session: &Session, action: PowerAction, json: bool) -> Result<()> {
    let device = &session.device;
    match action {
        PowerAction::Resume => device.on_power_resume()?,
        PowerAction::Suspend => device.on_power_suspend()?,
        PowerAction::Cycle => {
            device.on_power_resume()?;
            device.on_power_suspend()?;
            device.on_power_resume()?;
        }
    }
    print_report(&power_report(session), json)
}

fn cmd_dump(session: &Session, json: bool) -> Result<()> {
    session.device.on_power_resume()?;
    print_report(&power_report(session), json)
}

fn print_report(report: &PowerReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    println!("{}: {}", report.compatible, report.state);
    if report.registers.is_empty() {
        println!("  (no registers written)");
    }
    for reg in &report.registers {
        println!("  {:#06x}: {:#010x}", reg.offset, reg.value);
    }
    Ok(())
}

/// Exit code for a failed command
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<GpadcError>() {
        Some(e) if e.is_transient() => 2,
        Some(GpadcError::UnknownVariant(_)) | Some(GpadcError::DeferredBinding(_)) => 3,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let timeout = anyhow::Error::from(GpadcError::Timeout { what: "voltage", waited_ms: 1000 });
        assert_eq!(exit_code(&timeout), 2);

        let unknown = anyhow::Error::from(GpadcError::UnknownVariant("acme".into()))
            .context("failed to bind acme");
        assert_eq!(exit_code(&unknown), 3);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}
