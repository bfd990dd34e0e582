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

//! Register access
//!
//! The measurement core never maps memory itself. The platform hands it a
//! [`RegisterPort`] that performs synchronous 32-bit register reads and
//! writes at byte offsets from the block base.

use crate::error::Result;

/// Synchronous access to the 32-bit registers of one GPADC/THS block
///
/// Implementations must be callable from the interrupt path, so `read`
/// must not block on anything a measurement request can hold.
#[cfg_attr(test, mockall::automock)]
pub trait RegisterPort: Send + Sync {
    /// Read the register at `reg`
    fn read(&self, reg: u32) -> Result<u32>;

    /// Write `value` to the register at `reg`
    fn write(&self, reg: u32, value: u32) -> Result<()>;
}

/// Read-modify-write that only sets `bits`, preserving everything else
pub fn set_bits(port: &dyn RegisterPort, reg: u32, bits: u32) -> Result<()> {
    let value = port.read(reg)?;
    port.write(reg, value | bits)
}
