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

//! Bound device
//!
//! [`Gpadc::bind`] resolves the variant, reads calibration and wires the
//! controller, power lifecycle and interrupt path together. The result is
//! the upward read interface.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::calibration::{
    load_calibration, Calibration, CalibrationStore, CalibrationWriter, NoCalibration,
    NoopCalibrationWriter,
};
use crate::constants::{timing, voltage};
use crate::error::{GpadcError, Result};
use crate::hw::{Delay, RegisterPort, ThreadDelay};
use crate::measure::{
    InterruptBridge, IrqLine, MeasurementController, Mode, SampleNotifier, SharedDeviceState,
};
use crate::power::{PowerSequencer, PowerState, RuntimePm};
use crate::sensor::{ChannelInfo, ChannelSpec, ChannelValue, SensorHandle, CHANNELS, VOLTAGE_SCALE};
use crate::variant::{self, VariantProfile};

/// Platform collaborators handed to [`Gpadc::bind`]
#[derive(Clone)]
pub struct BindOptions {
    pub calibration_store: Arc<dyn CalibrationStore>,
    pub calibration_writer: Arc<dyn CalibrationWriter>,
    pub delay: Arc<dyn Delay>,
    pub autosuspend_delay: Duration,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            calibration_store: Arc::new(NoCalibration),
            calibration_writer: Arc::new(NoopCalibrationWriter),
            delay: Arc::new(ThreadDelay),
            autosuspend_delay: Duration::from_millis(timing::AUTOSUSPEND_DELAY_MS),
        }
    }
}

impl BindOptions {
    pub fn with_calibration_store(mut self, store: Arc<dyn CalibrationStore>) -> Self {
        self.calibration_store = store;
        self
    }

    pub fn with_calibration_writer(mut self, writer: Arc<dyn CalibrationWriter>) -> Self {
        self.calibration_writer = writer;
        self
    }

    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_autosuspend_delay(mut self, delay: Duration) -> Self {
        self.autosuspend_delay = delay;
        self
    }
}

pub(crate) struct DeviceInner {
    pub(crate) profile: &'static VariantProfile,
    pub(crate) controller: MeasurementController,
    pub(crate) samples: Arc<SampleNotifier>,
}

/// One bound GPADC / THS block
pub struct Gpadc {
    inner: Arc<DeviceInner>,
    sequencer: Arc<PowerSequencer>,
    runtime: Arc<RuntimePm>,
    bridge: Arc<InterruptBridge>,
    sensors: Vec<SensorHandle>,
}

impl Gpadc {
    /// Bind to the block identified by `identity`
    ///
    /// Fails with `UnknownVariant` for an unrecognized identity and with
    /// `DeferredBinding` while the calibration cell is not ready. The block
    /// starts suspended.
    pub fn bind(identity: &str, port: Arc<dyn RegisterPort>, options: BindOptions) -> Result<Self> {
        let profile = variant::lookup(identity)?;
        let calibration = load_calibration(profile, options.calibration_store.as_ref())?;

        let sequencer = Arc::new(PowerSequencer::new(
            profile,
            port.clone(),
            calibration,
            options.calibration_writer,
        ));
        let runtime = Arc::new(RuntimePm::new(sequencer.clone(), options.autosuspend_delay));

        let line = Arc::new(IrqLine::new());
        let samples = Arc::new(SampleNotifier::new(profile.sensor_count));
        let bridge = Arc::new(InterruptBridge::new(
            profile,
            port.clone(),
            line.clone(),
            samples.clone(),
        ));
        let controller =
            MeasurementController::new(profile, port, options.delay, runtime.clone(), line);

        let inner = Arc::new(DeviceInner { profile, controller, samples });
        let sensors = (0..profile.sensor_count)
            .map(|index| SensorHandle::new(index, inner.clone()))
            .collect();

        info!(
            "Bound {} ({} {}), {} sensor(s), calibration {}",
            profile.compatible,
            profile.soc,
            profile.block.family_name(),
            profile.sensor_count,
            if calibration.is_some() { "loaded" } else { "absent" }
        );

        Ok(Self { inner, sequencer, runtime, bridge, sensors })
    }

    pub fn profile(&self) -> &'static VariantProfile {
        self.inner.profile
    }

    /// Raw 12-bit code of voltage input `channel`
    pub fn read_voltage(&self, channel: u32) -> Result<u32> {
        self.inner.controller.measure(Mode::Voltage, channel)
    }

    pub fn read_voltage_millivolts(&self, channel: u32) -> Result<u32> {
        self.read_voltage(channel).map(voltage::raw_to_millivolts)
    }

    /// Raw code of thermal sensor `sensor`
    pub fn read_temperature(&self, sensor: usize) -> Result<u32> {
        self.sensor(sensor)?.read_raw()
    }

    pub fn temperature_offset(&self) -> i32 {
        self.inner.profile.temp_offset
    }

    pub fn temperature_scale(&self) -> i32 {
        self.inner.profile.temp_scale
    }

    pub fn sensors(&self) -> &[SensorHandle] {
        &self.sensors
    }

    pub fn sensor(&self, index: usize) -> Result<&SensorHandle> {
        self.sensors.get(index).ok_or_else(|| {
            GpadcError::invalid(format!(
                "sensor {} out of range ({} available)",
                index,
                self.sensors.len()
            ))
        })
    }

    pub fn channels(&self) -> &'static [ChannelSpec] {
        &CHANNELS
    }

    /// Query one attribute of an advertised channel
    pub fn read_channel(&self, channel: &ChannelSpec, info: ChannelInfo) -> Result<ChannelValue> {
        if !channel.supports(info) {
            return Err(GpadcError::invalid(format!(
                "channel {} has no {:?} attribute",
                channel.name, info
            )));
        }
        match (channel.mode, info) {
            (Mode::Voltage, ChannelInfo::Raw) => {
                self.read_voltage(channel.index).map(|raw| ChannelValue::Int(raw as i32))
            }
            (Mode::Voltage, _) => Ok(VOLTAGE_SCALE),
            (Mode::Temperature, ChannelInfo::Raw) => self
                .read_temperature(channel.index as usize)
                .map(|raw| ChannelValue::Int(raw as i32)),
            (Mode::Temperature, ChannelInfo::Scale) => Ok(ChannelValue::Int(self.temperature_scale())),
            (Mode::Temperature, ChannelInfo::Offset) => Ok(ChannelValue::Int(self.temperature_offset())),
        }
    }

    pub fn calibration(&self) -> Option<Calibration> {
        self.sequencer.calibration()
    }

    /// Resume hook for the power-lifecycle collaborator
    pub fn on_power_resume(&self) -> Result<()> {
        self.runtime.system_resume()
    }

    /// Suspend hook for the power-lifecycle collaborator. Fails with
    /// `Power` while a measurement holds the block.
    pub fn on_power_suspend(&self) -> Result<()> {
        self.runtime.system_suspend()
    }

    pub fn power_state(&self) -> PowerState {
        self.sequencer.state()
    }

    pub fn runtime_pm(&self) -> &RuntimePm {
        &self.runtime
    }

    /// Handler to attach to the block's interrupt line
    pub fn irq_handler(&self) -> Arc<InterruptBridge> {
        self.bridge.clone()
    }

    pub fn last_sample(&self) -> SharedDeviceState {
        self.inner.controller.last_sample()
    }

    /// Whether the interrupt path would currently accept a sample
    pub fn irq_armed(&self) -> bool {
        self.inner.controller.irq_armed()
    }

    /// Power the block down and release the sensor handles
    pub fn unbind(self) -> Result<()> {
        self.runtime.force_suspend()?;
        info!("Unbound {}", self.inner.profile.compatible);
        Ok(())
    }
}

impl fmt::Debug for Gpadc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gpadc")
            .field("variant", &self.inner.profile.variant)
            .field("power", &self.power_state())
            .field("sensors", &self.sensors.len())
            .finish()
    }
}
