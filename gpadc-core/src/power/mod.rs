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

//! Power lifecycle
//!
//! - `sequencer` - Active/Suspended state and the register sequences
//! - `runtime` - claim counting and idle autosuspend

mod runtime;
mod sequencer;

pub use runtime::{PowerClaim, PowerLifecycle, RuntimePm};
pub use sequencer::{PowerSequencer, PowerState};

#[cfg(test)]
pub use runtime::MockPowerLifecycle;
