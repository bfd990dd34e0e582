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

//! Power state of one block

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::calibration::{Calibration, CalibrationWriter};
use crate::error::Result;
use crate::hw::RegisterPort;
use crate::variant::VariantProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    Active,
    Suspended,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::Active => f.write_str("active"),
            PowerState::Suspended => f.write_str("suspended"),
        }
    }
}

/// Applies the variant's suspend/resume sequence and tracks the result
///
/// Transitions are driven from outside. Both directions may be requested
/// from either state; the sequences are idempotent.
pub struct PowerSequencer {
    profile: &'static VariantProfile,
    port: Arc<dyn RegisterPort>,
    calibration: Option<Calibration>,
    writer: Arc<dyn CalibrationWriter>,
    state: Mutex<PowerState>,
}

impl PowerSequencer {
    pub fn new(
        profile: &'static VariantProfile,
        port: Arc<dyn RegisterPort>,
        calibration: Option<Calibration>,
        writer: Arc<dyn CalibrationWriter>,
    ) -> Self {
        Self {
            profile,
            port,
            calibration,
            writer,
            state: Mutex::new(PowerState::Suspended),
        }
    }

    pub fn resume(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.profile
            .resume(self.port.as_ref(), self.calibration.as_ref(), self.writer.as_ref())?;
        if *state != PowerState::Active {
            info!("{} block powered up", self.profile.soc);
        }
        *state = PowerState::Active;
        Ok(())
    }

    pub fn suspend(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.profile.suspend(self.port.as_ref())?;
        if *state != PowerState::Suspended {
            debug!("{} block powered down", self.profile.soc);
        }
        *state = PowerState::Suspended;
        Ok(())
    }

    pub fn state(&self) -> PowerState {
        *self.state.lock()
    }

    pub fn calibration(&self) -> Option<Calibration> {
        self.calibration
    }
}

impl fmt::Debug for PowerSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerSequencer")
            .field("variant", &self.profile.variant)
            .field("state", &self.state())
            .field("calibration", &self.calibration)
            .finish()
    }
}
