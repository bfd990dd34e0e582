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

//! Suspend / resume register sequences
//!
//! Both directions are plain writes of fixed values (plus one
//! read-modify-write that only sets a bit), so running either one twice
//! leaves the same register state as running it once.

use tracing::debug;

use super::profile::{RegisterBlock, VariantProfile};
use crate::calibration::{Calibration, CalibrationWriter};
use crate::constants::{gpadc, ths, timing};
use crate::error::Result;
use crate::hw::{set_bits, RegisterPort};

impl VariantProfile {
    /// Program the block for sampling
    pub fn resume(
        &self,
        port: &dyn RegisterPort,
        calibration: Option<&Calibration>,
        writer: &dyn CalibrationWriter,
    ) -> Result<()> {
        debug!("Resuming {} block ({})", self.block.family_name(), self.soc);
        match self.block {
            RegisterBlock::Gpadc(block) => gpadc_resume(port, block.ctrl1.tp_mode_en),
            RegisterBlock::Ths(_) => ths_resume(port, calibration, writer),
        }
    }

    /// Stop sampling and mask the interrupt
    pub fn suspend(&self, port: &dyn RegisterPort) -> Result<()> {
        debug!("Suspending {} block ({})", self.block.family_name(), self.soc);
        match self.block {
            RegisterBlock::Gpadc(_) => gpadc_suspend(port),
            RegisterBlock::Ths(_) => ths_suspend(port),
        }
    }
}

fn gpadc_resume(port: &dyn RegisterPort, tp_mode_en: u32) -> Result<()> {
    port.write(
        gpadc::CTRL0,
        gpadc::ctrl0_adc_clk_divider(2) | gpadc::ctrl0_fs_div(7) | gpadc::ctrl0_t_acq(63),
    )?;
    port.write(gpadc::CTRL1, tp_mode_en)?;
    port.write(gpadc::CTRL3, gpadc::CTRL3_FILTER_EN | gpadc::ctrl3_filter_type(1))?;
    port.write(
        gpadc::TPR,
        gpadc::TPR_TEMP_ENABLE | gpadc::tpr_temp_period(timing::TEMP_PERIOD_DIVISOR),
    )
}

fn gpadc_suspend(port: &dyn RegisterPort) -> Result<()> {
    port.write(gpadc::CTRL1, 0)?;
    port.write(gpadc::TPR, 0)?;
    port.write(gpadc::INT_FIFOC, 0)
}

fn ths_resume(
    port: &dyn RegisterPort,
    calibration: Option<&Calibration>,
    writer: &dyn CalibrationWriter,
) -> Result<()> {
    if let Some(calibration) = calibration {
        writer.apply(port, calibration)?;
    }
    port.write(ths::CTRL0, gpadc::ctrl0_t_acq(0xff))?;
    port.write(ths::CTRL2, ths::ctrl2_acq1(0x3f))?;
    port.write(ths::STAT, ths::STAT_TDATA_IRQ_0)?;
    port.write(ths::FILTER, gpadc::CTRL3_FILTER_EN | gpadc::ctrl3_filter_type(2))?;
    port.write(ths::INTC, ths::INTC_TDATA_IRQ_EN0 | ths::intc_temp_period(0x55))?;
    set_bits(port, ths::CTRL2, ths::CTRL2_TEMP_SENSE_EN0)
}

fn ths_suspend(port: &dyn RegisterPort) -> Result<()> {
    port.write(ths::INTC, 0)?;
    port.write(ths::CTRL2, 0)
}
