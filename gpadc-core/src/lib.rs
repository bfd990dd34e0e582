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

//! gpadc-core - measurement arbiter for the Allwinner GPADC / thermal block
//!
//! This crate contains everything below the command-line front end:
//! - Variant profiles and their register sequences
//! - The serialized measurement controller and its interrupt path
//! - Power lifecycle (sequencer and runtime reference counting)
//! - Calibration loading, per-sensor handles and the channel table
//! - A simulated peripheral for running without hardware

pub mod calibration;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod hw;
pub mod measure;
pub mod power;
pub mod sensor;
pub mod variant;

pub use calibration::{
    load_calibration, Calibration, CalibrationStore, CalibrationWriter,
    CellError, FileCalibration, NoCalibration, NoopCalibrationWriter,
};
pub use config::{load_config, validate_config, DeviceConfig, SimulationConfig};
pub use device::{BindOptions, Gpadc};
pub use error::{GpadcError, Result};
pub use hw::{Delay, RegisterEvent, RegisterPort, SimulatedGpadc, ThreadDelay};
pub use measure::{InterruptBridge, IrqReturn, MeasurementController, Mode, SharedDeviceState};
pub use power::{PowerClaim, PowerLifecycle, PowerSequencer, PowerState, RuntimePm};
pub use sensor::{ChannelInfo, ChannelSpec, ChannelValue, SensorHandle, CHANNELS};
pub use variant::{lookup, IrqKind, Variant, VariantProfile, VariantSummary};
