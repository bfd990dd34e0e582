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

//! Command Line Interface
//!
//! Drives the measurement core against the simulated peripheral.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "gpadc")]
#[command(version)]
#[command(about = "Measurement arbiter for the Allwinner GPADC / thermal sensor block")]
#[command(long_about = "Measurement arbiter for the Allwinner GPADC / thermal sensor block

Binds one simulated block and serves voltage and temperature reads through
the same controller, interrupt path and power lifecycle used on hardware.

EXAMPLES:
    gpadc variants                                  List supported blocks
    gpadc voltage 2                                 Read voltage input 2
    gpadc --compatible allwinner,sun8i-h3-ths temp  Read thermal sensor 0
    gpadc monitor --count 5 --interval-ms 200       Poll every channel
    gpadc power cycle                               Resume, suspend, resume
    gpadc --json dump                               Register file as JSON

ENVIRONMENT VARIABLES:
    GPADC_LOG=debug        Log filter (default: info)")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Device configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Identity string of the block to bind, overrides the config file
    #[arg(long, global = true)]
    pub compatible: Option<String>,

    /// File holding the 8-byte calibration cell, overrides the config file
    #[arg(long, global = true)]
    pub calibration: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List supported hardware variants
    Variants,

    /// Read one voltage input
    Voltage {
        /// Input channel (0-3)
        channel: u32,
    },

    /// Read one thermal sensor
    Temp {
        /// Sensor index
        #[arg(default_value_t = 0)]
        sensor: usize,
    },

    /// Read every available channel repeatedly
    Monitor {
        /// Number of rounds
        #[arg(long, default_value_t = 10)]
        count: u32,
        /// Pause between rounds in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },

    /// Drive the power hooks directly
    Power {
        #[arg(value_enum)]
        action: PowerAction,
    },

    /// Resume the block and print its register file
    Dump,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerAction {
    Resume,
    Suspend,
    /// Resume, suspend, resume
    Cycle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["gpadc", "temp", "--json", "--compatible", "allwinner,sun8i-h3-ths"]);
        assert!(cli.json);
        assert_eq!(cli.compatible.as_deref(), Some("allwinner,sun8i-h3-ths"));
        assert!(matches!(cli.command, Commands::Temp { sensor: 0 }));
    }

    #[test]
    fn test_parse_monitor_defaults() {
        let cli = Cli::parse_from(["gpadc", "monitor", "--count", "3"]);
        assert!(matches!(cli.command, Commands::Monitor { count: 3, interval_ms: 1000 }));
    }

    #[test]
    fn test_parse_power_action() {
        let cli = Cli::parse_from(["gpadc", "power", "cycle"]);
        assert!(matches!(cli.command, Commands::Power { action: PowerAction::Cycle }));
        assert!(Cli::try_parse_from(["gpadc", "power", "reboot"]).is_err());
    }
}
