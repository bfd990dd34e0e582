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

//! Per-sensor handles and the advertised channel table

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::constants::voltage;
use crate::device::DeviceInner;
use crate::error::Result;
use crate::measure::Mode;

/// Attribute of a channel a caller may query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelInfo {
    Raw,
    Scale,
    Offset,
}

/// Value of a channel attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelValue {
    Int(i32),
    /// `int + nano * 1e-9`
    IntPlusNano { int: i32, nano: i32 },
}

/// One entry of the upward channel table
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChannelSpec {
    pub mode: Mode,
    pub index: u32,
    pub name: &'static str,
    pub info: &'static [ChannelInfo],
}

impl ChannelSpec {
    pub fn supports(&self, info: ChannelInfo) -> bool {
        self.info.contains(&info)
    }
}

const VOLTAGE_INFO: &[ChannelInfo] = &[ChannelInfo::Raw, ChannelInfo::Scale];
const TEMPERATURE_INFO: &[ChannelInfo] = &[ChannelInfo::Raw, ChannelInfo::Scale, ChannelInfo::Offset];

/// Four voltage inputs and the first thermal sensor
///
/// Advertised on every variant. Voltage reads on variants without a
/// voltage path fail with `InvalidConfiguration`.
pub static CHANNELS: [ChannelSpec; 5] = [
    ChannelSpec { mode: Mode::Voltage, index: 0, name: "adc_chan0", info: VOLTAGE_INFO },
    ChannelSpec { mode: Mode::Voltage, index: 1, name: "adc_chan1", info: VOLTAGE_INFO },
    ChannelSpec { mode: Mode::Voltage, index: 2, name: "adc_chan2", info: VOLTAGE_INFO },
    ChannelSpec { mode: Mode::Voltage, index: 3, name: "adc_chan3", info: VOLTAGE_INFO },
    ChannelSpec { mode: Mode::Temperature, index: 0, name: "temp_adc", info: TEMPERATURE_INFO },
];

/// Voltage scale in millivolts per code
pub const VOLTAGE_SCALE: ChannelValue =
    ChannelValue::IntPlusNano { int: 0, nano: voltage::SCALE_NANO as i32 };

/// Read access to one thermal sensor of a bound device
#[derive(Clone)]
pub struct SensorHandle {
    index: usize,
    device: Arc<DeviceInner>,
}

impl SensorHandle {
    pub(crate) fn new(index: usize, device: Arc<DeviceInner>) -> Self {
        Self { index, device }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Raw sensor code
    ///
    /// Variants with a voltage path share the ADC front end and go through
    /// the measurement controller. The others read the data register
    /// directly under a power claim.
    pub fn read_raw(&self) -> Result<u32> {
        let profile = self.device.profile;
        if profile.has_voltage_channel {
            self.device.controller.measure(Mode::Temperature, self.index as u32)
        } else {
            self.device.controller.read_direct(self.index)
        }
    }

    /// `(raw + offset) * scale`
    pub fn read_temperature(&self) -> Result<i32> {
        let raw = self.read_raw()?;
        Ok(self.device.profile.temperature_from_raw(raw as i32))
    }

    pub fn offset(&self) -> i32 {
        self.device.profile.temp_offset
    }

    pub fn scale(&self) -> i32 {
        self.device.profile.temp_scale
    }

    /// Count of "new sample" notifications delivered to this sensor
    pub fn sample_generation(&self) -> u64 {
        self.device.samples.generation(self.index)
    }
}

impl fmt::Debug for SensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorHandle")
            .field("index", &self.index)
            .field("variant", &self.device.profile.variant)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_table_layout() {
        let voltage: Vec<_> = CHANNELS.iter().filter(|c| c.mode == Mode::Voltage).collect();
        assert_eq!(voltage.len(), 4);
        for (i, chan) in voltage.iter().enumerate() {
            assert_eq!(chan.index, i as u32);
            assert!(chan.supports(ChannelInfo::Raw));
            assert!(!chan.supports(ChannelInfo::Offset));
        }

        let temp = &CHANNELS[4];
        assert_eq!(temp.name, "temp_adc");
        assert!(temp.supports(ChannelInfo::Offset));
    }

    #[test]
    fn test_voltage_scale_value() {
        assert_eq!(VOLTAGE_SCALE, ChannelValue::IntPlusNano { int: 0, nano: 732_421_875 });
    }
}
