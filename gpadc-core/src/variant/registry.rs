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

//! Read-only identity → profile table
//!
//! Built once on first use and never mutated. Binding resolves the
//! platform's identity string here; an unknown identity refuses to bind.

use std::collections::HashMap;

use lazy_static::lazy_static;
use tracing::debug;

use super::profile::{
    ClockNeeds, GpadcBlock, RegisterBlock, ThsBlock, Variant, VariantProfile, H3_IRQ_CLEAR,
    SUN4I_CTRL1, SUN6I_CTRL1, SUN8I_A33_CTRL1,
};
use crate::constants::{gpadc, ths, timing};
use crate::error::{GpadcError, Result};

static PROFILES: [VariantProfile; 5] = [
    VariantProfile {
        variant: Variant::Sun4iA10,
        compatible: "allwinner,sun4i-a10-gpadc",
        soc: "A10",
        temp_offset: -1932,
        temp_scale: 133,
        temp_data_base: gpadc::TEMP_DATA,
        sensor_count: 1,
        has_voltage_channel: true,
        supports_calibration: false,
        clocks: ClockNeeds { bus_clock: false, bus_reset: false, module_clock_hz: None },
        block: RegisterBlock::Gpadc(GpadcBlock { ctrl1: SUN4I_CTRL1, data_ready_irq: true }),
    },
    VariantProfile {
        variant: Variant::Sun5iA13,
        compatible: "allwinner,sun5i-a13-gpadc",
        soc: "A13",
        temp_offset: -1447,
        temp_scale: 100,
        temp_data_base: gpadc::TEMP_DATA,
        sensor_count: 1,
        has_voltage_channel: true,
        supports_calibration: false,
        clocks: ClockNeeds { bus_clock: false, bus_reset: false, module_clock_hz: None },
        block: RegisterBlock::Gpadc(GpadcBlock { ctrl1: SUN4I_CTRL1, data_ready_irq: true }),
    },
    VariantProfile {
        variant: Variant::Sun6iA31,
        compatible: "allwinner,sun6i-a31-gpadc",
        soc: "A31",
        temp_offset: -1623,
        temp_scale: 167,
        temp_data_base: gpadc::TEMP_DATA,
        sensor_count: 1,
        has_voltage_channel: true,
        supports_calibration: false,
        clocks: ClockNeeds { bus_clock: false, bus_reset: false, module_clock_hz: None },
        block: RegisterBlock::Gpadc(GpadcBlock { ctrl1: SUN6I_CTRL1, data_ready_irq: true }),
    },
    VariantProfile {
        variant: Variant::Sun8iA33,
        compatible: "allwinner,sun8i-a33-ths",
        soc: "A33",
        temp_offset: -1662,
        temp_scale: 162,
        temp_data_base: gpadc::TEMP_DATA,
        sensor_count: 1,
        has_voltage_channel: false,
        supports_calibration: false,
        clocks: ClockNeeds { bus_clock: false, bus_reset: false, module_clock_hz: None },
        block: RegisterBlock::Gpadc(GpadcBlock { ctrl1: SUN8I_A33_CTRL1, data_ready_irq: false }),
    },
    VariantProfile {
        variant: Variant::Sun8iH3,
        compatible: "allwinner,sun8i-h3-ths",
        soc: "H3",
        temp_offset: -1791,
        temp_scale: -121,
        temp_data_base: ths::TDATA0,
        sensor_count: 1,
        has_voltage_channel: false,
        supports_calibration: true,
        clocks: ClockNeeds {
            bus_clock: true,
            bus_reset: true,
            module_clock_hz: Some(timing::THS_MODULE_CLOCK_HZ),
        },
        block: RegisterBlock::Ths(ThsBlock { irq_clear: H3_IRQ_CLEAR }),
    },
];

lazy_static! {
    static ref BY_IDENTITY: HashMap<&'static str, &'static VariantProfile> =
        PROFILES.iter().map(|p| (p.compatible, p)).collect();
}

/// Resolve a hardware identity string to its profile
pub fn lookup(identity: &str) -> Result<&'static VariantProfile> {
    let profile = BY_IDENTITY
        .get(identity.trim())
        .copied()
        .ok_or_else(|| GpadcError::UnknownVariant(identity.to_string()))?;
    debug!("Resolved {} to {:?}", identity, profile.variant);
    Ok(profile)
}

/// Every known profile, in table order
pub fn all() -> &'static [VariantProfile] {
    &PROFILES
}
