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

//! Interrupt-context handlers
//!
//! Nothing here logs, allocates or takes the controller's lock. The only
//! shared state touched is the [`IrqLine`] and the per-sensor sample
//! counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{IrqLine, Mode};
use crate::constants::{gpadc, ths};
use crate::hw::RegisterPort;
use crate::variant::{IrqKind, VariantProfile};

/// A data register read that failed inside the interrupt path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportFault {
    pub reg: u32,
}

/// Whether the interrupt was ours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    None,
    Handled,
}

/// Pull-based "new sample available" counters, one per thermal sensor
#[derive(Debug)]
pub struct SampleNotifier {
    generations: Vec<AtomicU64>,
}

impl SampleNotifier {
    pub fn new(sensor_count: usize) -> Self {
        Self { generations: (0..sensor_count).map(|_| AtomicU64::new(0)).collect() }
    }

    pub fn notify_all(&self) {
        for generation in &self.generations {
            generation.fetch_add(1, Ordering::Release);
        }
    }

    /// Samples announced for `sensor` so far
    pub fn generation(&self, sensor: usize) -> u64 {
        self.generations
            .get(sensor)
            .map(|g| g.load(Ordering::Acquire))
            .unwrap_or(0)
    }
}

/// Entry point the platform invokes when the block raises its interrupt
pub struct InterruptBridge {
    profile: &'static VariantProfile,
    port: Arc<dyn RegisterPort>,
    line: Arc<IrqLine>,
    samples: Arc<SampleNotifier>,
}

impl InterruptBridge {
    pub fn new(
        profile: &'static VariantProfile,
        port: Arc<dyn RegisterPort>,
        line: Arc<IrqLine>,
        samples: Arc<SampleNotifier>,
    ) -> Self {
        Self { profile, port, line, samples }
    }

    pub fn handle(&self) -> IrqReturn {
        match self.profile.irq_kind() {
            IrqKind::DataReady => self.data_ready(),
            IrqKind::PeriodicSample { clear_mask } => self.periodic_sample(clear_mask),
            IrqKind::None => IrqReturn::None,
        }
    }

    fn data_ready(&self) -> IrqReturn {
        let Some((ticket, pending)) = self.line.current() else {
            return IrqReturn::None;
        };
        let reg = match pending.mode {
            Mode::Voltage => gpadc::DATA,
            Mode::Temperature => self.profile.temp_data_register(pending.index as usize),
        };
        let sample = self.port.read(reg).map_err(|_| TransportFault { reg });
        self.line.complete(ticket, sample);
        IrqReturn::Handled
    }

    fn periodic_sample(&self, clear_mask: u32) -> IrqReturn {
        // No caller to return the error to in interrupt context, and logging
        // here is off limits. The sample itself is valid, so announce it.
        let _ = self.port.write(ths::STAT, clear_mask);
        self.samples.notify_all();
        IrqReturn::Handled
    }
}

impl std::fmt::Debug for InterruptBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptBridge")
            .field("variant", &self.profile.variant)
            .field("armed", &self.line.is_armed())
            .finish()
    }
}
