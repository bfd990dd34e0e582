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

//! Constants for the GPADC / THS block
//!
//! Centralizes register offsets, bit fields, timing contracts and limits.
//! Other modules never hard-code register addresses - add them here first.

use std::time::Duration;

/// Register map of the GPADC family (A10, A13, A31, A33)
pub mod gpadc {
    pub const CTRL0: u32 = 0x00;
    pub const CTRL1: u32 = 0x04;
    pub const CTRL2: u32 = 0x08;
    pub const CTRL3: u32 = 0x0c;
    pub const INT_FIFOC: u32 = 0x10;
    pub const INT_FIFOS: u32 = 0x14;
    pub const TPR: u32 = 0x18;
    pub const CDAT: u32 = 0x1c;
    pub const TEMP_DATA: u32 = 0x20;
    pub const DATA: u32 = 0x24;

    /// CTRL0: ADC clock divider (2 bits at 20)
    pub const fn ctrl0_adc_clk_divider(x: u32) -> u32 {
        (x & 0x3) << 20
    }

    /// CTRL0: sample frequency divider (4 bits at 16)
    pub const fn ctrl0_fs_div(x: u32) -> u32 {
        (x & 0xf) << 16
    }

    /// CTRL0: acquisition time (16 bits)
    pub const fn ctrl0_t_acq(x: u32) -> u32 {
        x & 0xffff
    }

    // CTRL1 layout, A10/A13
    pub const SUN4I_CTRL1_TP_MODE_EN: u32 = 1 << 4;
    pub const SUN4I_CTRL1_TP_ADC_SELECT: u32 = 1 << 3;
    pub const SUN4I_CTRL1_ADC_CHAN_MASK: u32 = 0x7;

    // CTRL1 layout, A31
    pub const SUN6I_CTRL1_TP_MODE_EN: u32 = 1 << 5;
    pub const SUN6I_CTRL1_TP_ADC_SELECT: u32 = 1 << 4;
    pub const SUN6I_CTRL1_ADC_CHAN_MASK: u32 = 0xf;

    // CTRL1 layout, A33
    pub const SUN8I_A33_CTRL1_CHOP_TEMP_EN: u32 = 1 << 8;

    pub const CTRL3_FILTER_EN: u32 = 1 << 2;

    pub const fn ctrl3_filter_type(x: u32) -> u32 {
        x & 0x3
    }

    pub const INT_FIFOC_TEMP_IRQ_EN: u32 = 1 << 18;
    pub const INT_FIFOC_TP_OVERRUN_IRQ_EN: u32 = 1 << 17;
    pub const INT_FIFOC_TP_DATA_IRQ_EN: u32 = 1 << 16;
    pub const INT_FIFOC_TP_FIFO_FLUSH: u32 = 1 << 4;

    pub const fn int_fifoc_trig_level(x: u32) -> u32 {
        (x & 0x1f) << 8
    }

    pub const TPR_TEMP_ENABLE: u32 = 1 << 16;

    pub const fn tpr_temp_period(x: u32) -> u32 {
        x & 0xffff
    }
}

/// Register map of the H3 thermal sensor block
pub mod ths {
    pub const CTRL0: u32 = 0x00;
    pub const CTRL2: u32 = 0x40;
    pub const INTC: u32 = 0x44;
    pub const STAT: u32 = 0x48;
    pub const FILTER: u32 = 0x70;
    pub const TDATA0: u32 = 0x80;

    pub const CTRL2_TEMP_SENSE_EN0: u32 = 1 << 0;

    pub const fn ctrl2_acq1(x: u32) -> u32 {
        x << 16
    }

    pub const INTC_TDATA_IRQ_EN0: u32 = 1 << 8;

    pub const fn intc_temp_period(x: u32) -> u32 {
        x << 12
    }

    pub const STAT_TDATA_IRQ_0: u32 = 1 << 8;
}

/// Timing contract. Not tunable per call.
pub mod timing {
    use super::Duration;

    /// Settle after the latched channel-select changes
    pub const CHANNEL_SETTLE_MS: u64 = 10;

    /// Settle after switching between ADC and touchscreen mode
    pub const MODE_SETTLE_MS: u64 = 100;

    /// Upper bound on the completion wait
    pub const COMPLETION_TIMEOUT_MS: u64 = 1000;

    /// Idle time before the device is allowed to power down
    pub const AUTOSUSPEND_DELAY_MS: u64 = 10_000;

    /// Input clock of the GPADC acquisition logic
    pub const GPADC_CLKIN_HZ: u64 = 6_000_000;

    /// Module clock requested for the H3 thermal block
    pub const THS_MODULE_CLOCK_HZ: u32 = 4_000_000;

    /// TPR divisor programmed on resume
    pub const TEMP_PERIOD_DIVISOR: u32 = 800;

    pub fn completion_timeout() -> Duration {
        Duration::from_millis(COMPLETION_TIMEOUT_MS)
    }

    /// period = TEMP_PERIOD * 256 * 16 / clkin
    pub fn temp_sample_period() -> Duration {
        let ticks = TEMP_PERIOD_DIVISOR as u64 * 256 * 16;
        Duration::from_micros(ticks * 1_000_000 / GPADC_CLKIN_HZ)
    }
}

/// Voltage conversion
pub mod voltage {
    /// Full-scale input range in millivolts
    pub const FULL_SCALE_MV: u32 = 3000;

    /// 12-bit converter
    pub const RESOLUTION: u32 = 4096;

    /// 3000 mV / 4096 expressed in nano-millivolts per code (exact)
    pub const SCALE_NANO: u64 = 732_421_875;

    /// Convert a raw code to millivolts using the fixed-point scale
    pub fn raw_to_millivolts(raw: u32) -> u32 {
        (raw as u64 * SCALE_NANO / 1_000_000_000) as u32
    }
}

/// Sizes and bounds
pub mod limits {
    /// Voltage inputs on the GPADC block
    pub const VOLTAGE_CHANNELS: u32 = 4;

    /// Upper bound on thermal sensors per block
    pub const MAX_SENSOR_COUNT: usize = 4;

    /// Size of the factory calibration blob in bytes
    pub const CALIBRATION_BLOB_LEN: usize = 8;

    /// Name of the non-volatile cell holding the calibration blob
    pub const CALIBRATION_CELL: &str = "calibration";

    /// Maximum size of a device configuration file (64 KiB)
    pub const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

    /// Maximum accepted autosuspend delay
    pub const MAX_AUTOSUSPEND_DELAY_MS: u64 = 600_000;
}

/// Simulated peripheral defaults
pub mod sim {
    /// Interrupt generator period
    pub const DEFAULT_IRQ_PERIOD_MS: u64 = 2;

    /// Mid-scale code reported on every voltage input
    pub const DEFAULT_VOLTAGE_CODE: u32 = 2048;

    /// Raw code reported by every thermal sensor
    pub const DEFAULT_TEMPERATURE_CODE: u32 = 2200;

    /// Upper bound on the interrupt generator period
    pub const MAX_IRQ_PERIOD_MS: u64 = 1000;
}
