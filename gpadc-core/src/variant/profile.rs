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

//! Per-revision variant profiles
//!
//! A profile is immutable once a device is bound. Family-specific data lives
//! in [`RegisterBlock`]; behaviour that differs per family dispatches on that
//! enum through plain functions, never through stored closures.

use serde::Serialize;

use crate::constants::{gpadc, ths, timing};
use crate::measure::Mode;

/// Known hardware revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    Sun4iA10,
    Sun5iA13,
    Sun6iA31,
    Sun8iA33,
    Sun8iH3,
}

/// Bit layout of CTRL1 on the GPADC family
#[derive(Debug, Clone, Copy)]
pub struct Ctrl1Layout {
    pub tp_mode_en: u32,
    pub tp_adc_select: u32,
    pub chan_mask: u32,
    pub chan_select: fn(u32) -> u32,
}

/// Which settle delays a request must honour before arming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettlePlan {
    pub channel_switch: bool,
    pub mode_switch: bool,
}

impl SettlePlan {
    pub fn total_ms(&self) -> u64 {
        let mut ms = 0;
        if self.channel_switch {
            ms += timing::CHANNEL_SETTLE_MS;
        }
        if self.mode_switch {
            ms += timing::MODE_SETTLE_MS;
        }
        ms
    }
}

impl Ctrl1Layout {
    /// CTRL1 value that selects `mode` (and `channel` for voltage)
    pub fn request_value(&self, mode: Mode, channel: u32) -> u32 {
        match mode {
            Mode::Voltage => self.tp_mode_en | self.tp_adc_select | (self.chan_select)(channel),
            // The thermal sensor only produces data in touchscreen mode
            Mode::Temperature => self.tp_mode_en,
        }
    }

    /// Mode currently latched in a CTRL1 value
    pub fn latched_mode(&self, latched: u32) -> Mode {
        if self.tp_adc_select != 0 && latched & self.tp_adc_select == self.tp_adc_select {
            Mode::Voltage
        } else {
            Mode::Temperature
        }
    }

    /// Compare the latched CTRL1 against the request
    pub fn settle_plan(&self, latched: u32, mode: Mode, channel: u32) -> SettlePlan {
        let channel_switch = mode == Mode::Voltage
            && latched & self.chan_mask != (self.chan_select)(channel);
        SettlePlan {
            channel_switch,
            mode_switch: self.latched_mode(latched) != mode,
        }
    }
}

fn sun4i_chan_select(chan: u32) -> u32 {
    chan & gpadc::SUN4I_CTRL1_ADC_CHAN_MASK
}

fn sun6i_chan_select(chan: u32) -> u32 {
    1u32.checked_shl(chan).unwrap_or(0) & gpadc::SUN6I_CTRL1_ADC_CHAN_MASK
}

fn no_chan_select(_chan: u32) -> u32 {
    0
}

pub(crate) const SUN4I_CTRL1: Ctrl1Layout = Ctrl1Layout {
    tp_mode_en: gpadc::SUN4I_CTRL1_TP_MODE_EN,
    tp_adc_select: gpadc::SUN4I_CTRL1_TP_ADC_SELECT,
    chan_mask: gpadc::SUN4I_CTRL1_ADC_CHAN_MASK,
    chan_select: sun4i_chan_select,
};

pub(crate) const SUN6I_CTRL1: Ctrl1Layout = Ctrl1Layout {
    tp_mode_en: gpadc::SUN6I_CTRL1_TP_MODE_EN,
    tp_adc_select: gpadc::SUN6I_CTRL1_TP_ADC_SELECT,
    chan_mask: gpadc::SUN6I_CTRL1_ADC_CHAN_MASK,
    chan_select: sun6i_chan_select,
};

pub(crate) const SUN8I_A33_CTRL1: Ctrl1Layout = Ctrl1Layout {
    tp_mode_en: gpadc::SUN8I_A33_CTRL1_CHOP_TEMP_EN,
    tp_adc_select: 0,
    chan_mask: 0,
    chan_select: no_chan_select,
};

/// GPADC family: touchscreen/ADC controller with a shared thermal sensor
#[derive(Debug, Clone, Copy)]
pub struct GpadcBlock {
    pub ctrl1: Ctrl1Layout,
    /// Samples are handed over through the data-ready interrupt
    pub data_ready_irq: bool,
}

/// H3 family: dedicated thermal block with a periodic sample interrupt
#[derive(Debug, Clone, Copy)]
pub struct ThsBlock {
    /// Bits written to THS_STAT to acknowledge a sample interrupt
    pub irq_clear: u32,
}

#[derive(Debug, Clone, Copy)]
pub enum RegisterBlock {
    Gpadc(GpadcBlock),
    Ths(ThsBlock),
}

/// How the block's interrupt line is used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqKind {
    /// No interrupt; every read is synchronous
    None,
    /// One interrupt completes one armed measurement
    DataReady,
    /// Periodic "new sample" notification, acknowledged with `clear_mask`
    PeriodicSample { clear_mask: u32 },
}

impl RegisterBlock {
    pub fn irq_kind(&self) -> IrqKind {
        match self {
            Self::Gpadc(block) if block.data_ready_irq => IrqKind::DataReady,
            Self::Gpadc(_) => IrqKind::None,
            Self::Ths(block) => IrqKind::PeriodicSample { clear_mask: block.irq_clear },
        }
    }

    pub fn ctrl1(&self) -> Option<&Ctrl1Layout> {
        match self {
            Self::Gpadc(block) => Some(&block.ctrl1),
            Self::Ths(_) => None,
        }
    }

    pub fn family_name(&self) -> &'static str {
        match self {
            Self::Gpadc(_) => "gpadc",
            Self::Ths(_) => "ths",
        }
    }
}

/// Clock and reset lines the platform must provide before binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClockNeeds {
    pub bus_clock: bool,
    pub bus_reset: bool,
    pub module_clock_hz: Option<u32>,
}

/// Immutable constant table for one hardware revision
#[derive(Debug, Clone, Copy)]
pub struct VariantProfile {
    pub variant: Variant,
    /// Identity string the platform matches on
    pub compatible: &'static str,
    pub soc: &'static str,
    pub temp_offset: i32,
    /// May be negative; flips the direction of the linear fit
    pub temp_scale: i32,
    pub temp_data_base: u32,
    pub sensor_count: usize,
    pub has_voltage_channel: bool,
    pub supports_calibration: bool,
    pub clocks: ClockNeeds,
    pub block: RegisterBlock,
}

impl VariantProfile {
    pub fn irq_kind(&self) -> IrqKind {
        self.block.irq_kind()
    }

    /// Data register of thermal sensor `index`
    pub fn temp_data_register(&self, index: usize) -> u32 {
        self.temp_data_base + 4 * index as u32
    }

    /// `(raw + offset) * scale`, in the variant's native unit
    pub fn temperature_from_raw(&self, raw: i32) -> i32 {
        raw.saturating_add(self.temp_offset).saturating_mul(self.temp_scale)
    }

    pub fn summary(&self) -> VariantSummary {
        VariantSummary {
            compatible: self.compatible,
            variant: self.variant,
            soc: self.soc,
            family: self.block.family_name(),
            temp_offset: self.temp_offset,
            temp_scale: self.temp_scale,
            sensor_count: self.sensor_count,
            has_voltage_channel: self.has_voltage_channel,
            supports_calibration: self.supports_calibration,
            interrupt: match self.irq_kind() {
                IrqKind::None => "none",
                IrqKind::DataReady => "data-ready",
                IrqKind::PeriodicSample { .. } => "periodic",
            },
            clocks: self.clocks,
        }
    }
}

/// Serializable view of a profile for listings
#[derive(Debug, Clone, Serialize)]
pub struct VariantSummary {
    pub compatible: &'static str,
    pub variant: Variant,
    pub soc: &'static str,
    pub family: &'static str,
    pub temp_offset: i32,
    pub temp_scale: i32,
    pub sensor_count: usize,
    pub has_voltage_channel: bool,
    pub supports_calibration: bool,
    pub interrupt: &'static str,
    pub clocks: ClockNeeds,
}

/// THS_STAT acknowledge mask for sensor 0
pub(crate) const H3_IRQ_CLEAR: u32 = ths::STAT_TDATA_IRQ_0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sun4i_request_values() {
        assert_eq!(SUN4I_CTRL1.request_value(Mode::Voltage, 2), 0x10 | 0x08 | 0x2);
        assert_eq!(SUN4I_CTRL1.request_value(Mode::Temperature, 0), 0x10);
    }

    #[test]
    fn test_sun6i_channel_select_is_one_hot() {
        assert_eq!((SUN6I_CTRL1.chan_select)(0), 0x1);
        assert_eq!((SUN6I_CTRL1.chan_select)(3), 0x8);
        assert_eq!((SUN6I_CTRL1.chan_select)(4), 0x0);
        assert_eq!((SUN6I_CTRL1.chan_select)(40), 0x0);
    }

    #[test]
    fn test_latched_mode_decoding() {
        assert_eq!(SUN4I_CTRL1.latched_mode(0x18), Mode::Voltage);
        assert_eq!(SUN4I_CTRL1.latched_mode(0x10), Mode::Temperature);
        assert_eq!(SUN4I_CTRL1.latched_mode(0), Mode::Temperature);
        assert_eq!(SUN8I_A33_CTRL1.latched_mode(0xffff), Mode::Temperature);
    }

    #[test]
    fn test_settle_plan_repeat_needs_nothing() {
        let latched = SUN4I_CTRL1.request_value(Mode::Voltage, 1);
        let plan = SUN4I_CTRL1.settle_plan(latched, Mode::Voltage, 1);
        assert_eq!(plan, SettlePlan::default());
        assert_eq!(plan.total_ms(), 0);

        let latched = SUN4I_CTRL1.request_value(Mode::Temperature, 0);
        let plan = SUN4I_CTRL1.settle_plan(latched, Mode::Temperature, 0);
        assert_eq!(plan.total_ms(), 0);
    }

    #[test]
    fn test_settle_plan_channel_switch() {
        let latched = SUN4I_CTRL1.request_value(Mode::Voltage, 1);
        let plan = SUN4I_CTRL1.settle_plan(latched, Mode::Voltage, 3);
        assert!(plan.channel_switch);
        assert!(!plan.mode_switch);
        assert_eq!(plan.total_ms(), timing::CHANNEL_SETTLE_MS);
    }

    #[test]
    fn test_settle_plan_mode_switch() {
        let latched = SUN6I_CTRL1.request_value(Mode::Temperature, 0);
        let plan = SUN6I_CTRL1.settle_plan(latched, Mode::Voltage, 0);
        assert!(plan.mode_switch);
        assert!(plan.total_ms() >= timing::MODE_SETTLE_MS);

        let latched = SUN6I_CTRL1.request_value(Mode::Voltage, 2);
        let plan = SUN6I_CTRL1.settle_plan(latched, Mode::Temperature, 0);
        assert!(plan.mode_switch);
        assert!(!plan.channel_switch);
    }

    #[test]
    fn test_irq_kind_dispatch() {
        let gpadc = RegisterBlock::Gpadc(GpadcBlock { ctrl1: SUN4I_CTRL1, data_ready_irq: true });
        let a33 = RegisterBlock::Gpadc(GpadcBlock { ctrl1: SUN8I_A33_CTRL1, data_ready_irq: false });
        let h3 = RegisterBlock::Ths(ThsBlock { irq_clear: H3_IRQ_CLEAR });

        assert_eq!(gpadc.irq_kind(), IrqKind::DataReady);
        assert_eq!(a33.irq_kind(), IrqKind::None);
        assert_eq!(h3.irq_kind(), IrqKind::PeriodicSample { clear_mask: 1 << 8 });
        assert!(h3.ctrl1().is_none());
    }
}
