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

//! Measurement state machine
//!
//! - `completion` - single-slot handoff between interrupt path and waiter
//! - `controller` - the serialized `measure(mode, channel)` request
//! - `irq` - interrupt-context handlers

mod completion;
mod controller;
mod irq;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use completion::{CompletionChannel, Ticket, WaitOutcome};
pub use controller::{MeasurementController, SharedDeviceState};
pub use irq::{InterruptBridge, IrqReturn, SampleNotifier, TransportFault};

/// The two mutually exclusive sampling modes of the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Voltage,
    Temperature,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Voltage => "voltage",
            Mode::Temperature => "temperature",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The measurement the interrupt path should complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub mode: Mode,
    /// Voltage channel or thermal sensor index
    pub index: u32,
}

impl Pending {
    fn encode(&self) -> u32 {
        let tag = match self.mode {
            Mode::Voltage => 1,
            Mode::Temperature => 2,
        };
        (tag << 16) | (self.index & 0xffff)
    }

    fn decode(raw: u32) -> Option<Self> {
        let mode = match raw >> 16 {
            1 => Mode::Voltage,
            2 => Mode::Temperature,
            _ => return None,
        };
        Some(Self { mode, index: raw & 0xffff })
    }
}

/// Value handed from the interrupt path to the waiting request
pub type IrqSample = std::result::Result<u32, TransportFault>;

/// Software side of the interrupt line
///
/// The armed request (ticket plus pending measurement) is published in one
/// atomic word so the interrupt path reads a consistent pair without taking
/// any lock the requester might hold.
#[derive(Debug, Default)]
pub struct IrqLine {
    request: AtomicU64,
    completion: CompletionChannel<IrqSample>,
}

impl IrqLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `pending` and start accepting exactly one completion for it
    pub(crate) fn arm(&self, pending: Pending) -> Ticket {
        let ticket = self.completion.arm();
        let word = ((ticket.0 as u64) << 32) | pending.encode() as u64;
        self.request.store(word, Ordering::Release);
        ticket
    }

    pub(crate) fn disarm(&self) {
        self.completion.disarm();
        self.request.store(0, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.request.load(Ordering::Acquire) != 0
    }

    /// The armed request, if any
    pub fn current(&self) -> Option<(Ticket, Pending)> {
        let word = self.request.load(Ordering::Acquire);
        let pending = Pending::decode(word as u32)?;
        Some((Ticket((word >> 32) as u32), pending))
    }

    pub(crate) fn complete(&self, ticket: Ticket, sample: IrqSample) -> bool {
        self.completion.post(ticket, sample)
    }

    pub(crate) fn wait(&self, ticket: Ticket, timeout: Duration) -> WaitOutcome<IrqSample> {
        self.completion.wait_timeout(ticket, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_encoding() {
        for pending in [
            Pending { mode: Mode::Voltage, index: 0 },
            Pending { mode: Mode::Voltage, index: 3 },
            Pending { mode: Mode::Temperature, index: 2 },
        ] {
            assert_eq!(Pending::decode(pending.encode()), Some(pending));
        }
        assert_eq!(Pending::decode(0), None);
    }

    #[test]
    fn test_line_arm_publishes_request() {
        let line = IrqLine::new();
        assert!(!line.is_armed());
        assert!(line.current().is_none());

        let pending = Pending { mode: Mode::Temperature, index: 0 };
        let ticket = line.arm(pending);
        assert!(line.is_armed());
        assert_eq!(line.current(), Some((ticket, pending)));

        line.disarm();
        assert!(!line.is_armed());
        assert!(!line.complete(ticket, Ok(1)));
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Voltage.to_string(), "voltage");
        assert_eq!(serde_json::to_string(&Mode::Temperature).unwrap(), "\"temperature\"");
    }
}
