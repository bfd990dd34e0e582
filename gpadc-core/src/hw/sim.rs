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

//! Simulated GPADC / THS peripheral
//!
//! Register file backed by a map, with an access log, per-register fault
//! injection and a periodic interrupt generator. Data registers are
//! synthesized from the configured input codes: `DATA` reports the voltage
//! input selected by the latched CTRL1, the thermal data registers report
//! the per-sensor codes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::delay::Delay;
use super::port::RegisterPort;
use crate::constants::{gpadc, limits, sim, ths};
use crate::error::{GpadcError, Result};
use crate::measure::Mode;
use crate::variant::{RegisterBlock, VariantProfile};

/// One observable access to the simulated block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterEvent {
    Read { reg: u32, value: u32 },
    Write { reg: u32, value: u32 },
    Delay { ms: u64 },
}

#[derive(Debug)]
struct SimState {
    regs: HashMap<u32, u32>,
    log: Vec<RegisterEvent>,
    faults: HashSet<u32>,
    voltage_codes: [u32; limits::VOLTAGE_CHANNELS as usize],
    temperature_codes: [u32; limits::MAX_SENSOR_COUNT],
}

/// In-memory stand-in for one GPADC or THS block
#[derive(Debug)]
pub struct SimulatedGpadc {
    profile: &'static VariantProfile,
    state: Mutex<SimState>,
    irq_muted: AtomicBool,
}

impl SimulatedGpadc {
    pub fn new(profile: &'static VariantProfile) -> Self {
        Self {
            profile,
            state: Mutex::new(SimState {
                regs: HashMap::new(),
                log: Vec::new(),
                faults: HashSet::new(),
                voltage_codes: [sim::DEFAULT_VOLTAGE_CODE; limits::VOLTAGE_CHANNELS as usize],
                temperature_codes: [sim::DEFAULT_TEMPERATURE_CODE; limits::MAX_SENSOR_COUNT],
            }),
            irq_muted: AtomicBool::new(false),
        }
    }

    pub fn profile(&self) -> &'static VariantProfile {
        self.profile
    }

    /// Set the code reported for voltage input `channel`. Out-of-range is ignored.
    pub fn set_voltage_code(&self, channel: u32, code: u32) {
        if let Some(slot) = self.state.lock().voltage_codes.get_mut(channel as usize) {
            *slot = code;
        }
    }

    pub fn set_temperature_code(&self, sensor: usize, code: u32) {
        if let Some(slot) = self.state.lock().temperature_codes.get_mut(sensor) {
            *slot = code;
        }
    }

    /// Make every access to `reg` fail with a transport error
    pub fn fail_register(&self, reg: u32) {
        self.state.lock().faults.insert(reg);
    }

    pub fn clear_fault(&self, reg: u32) {
        self.state.lock().faults.remove(&reg);
    }

    /// Suppress the interrupt generator without stopping it
    pub fn mute_interrupts(&self, muted: bool) {
        self.irq_muted.store(muted, Ordering::SeqCst);
    }

    /// Seed a register without logging the access
    pub fn preset(&self, reg: u32, value: u32) {
        self.state.lock().regs.insert(reg, value);
    }

    /// Current backing value of `reg`, not logged
    pub fn register(&self, reg: u32) -> u32 {
        self.state.lock().regs.get(&reg).copied().unwrap_or(0)
    }

    /// Snapshot of the whole register file, sorted by offset
    pub fn snapshot(&self) -> Vec<(u32, u32)> {
        let mut regs: Vec<(u32, u32)> =
            self.state.lock().regs.iter().map(|(r, v)| (*r, *v)).collect();
        regs.sort_unstable();
        regs
    }

    pub fn events(&self) -> Vec<RegisterEvent> {
        self.state.lock().log.clone()
    }

    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|event| match *event {
                RegisterEvent::Write { reg, value } => Some((reg, value)),
                _ => None,
            })
            .collect()
    }

    pub fn delays(&self) -> Vec<u64> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|event| match *event {
                RegisterEvent::Delay { ms } => Some(ms),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    /// Whether the block is currently programmed to raise its interrupt
    pub fn interrupt_enabled(&self) -> bool {
        let state = self.state.lock();
        let reg = |r: u32| state.regs.get(&r).copied().unwrap_or(0);
        match self.profile.block {
            RegisterBlock::Gpadc(_) => {
                reg(gpadc::INT_FIFOC)
                    & (gpadc::INT_FIFOC_TP_DATA_IRQ_EN | gpadc::INT_FIFOC_TEMP_IRQ_EN)
                    != 0
            }
            RegisterBlock::Ths(_) => reg(ths::INTC) & ths::INTC_TDATA_IRQ_EN0 != 0,
        }
    }

    /// Run `on_irq` every `period` while the interrupt is enabled and unmuted
    pub fn start_interrupts<F>(self: &Arc<Self>, period: Duration, on_irq: F) -> Result<InterruptSource>
    where
        F: Fn() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let fired = Arc::new(AtomicU64::new(0));
        let device = Arc::clone(self);

        let handle = {
            let stop = Arc::clone(&stop);
            let fired = Arc::clone(&fired);
            thread::Builder::new()
                .name("gpadc-sim-irq".into())
                .spawn(move || {
                    while !stop.load(Ordering::SeqCst) {
                        thread::sleep(period);
                        if device.irq_muted.load(Ordering::SeqCst) || !device.interrupt_enabled() {
                            continue;
                        }
                        on_irq();
                        fired.fetch_add(1, Ordering::SeqCst);
                    }
                })?
        };

        debug!("Simulated interrupt source started ({:?} period)", period);
        Ok(InterruptSource { stop, fired, handle: Some(handle) })
    }

    fn synthesize(&self, state: &SimState, reg: u32) -> u32 {
        let stored = state.regs.get(&reg).copied().unwrap_or(0);

        let base = self.profile.temp_data_base;
        let end = self.profile.temp_data_register(self.profile.sensor_count);
        if reg >= base && reg < end && (reg - base) % 4 == 0 {
            return state.temperature_codes[((reg - base) / 4) as usize];
        }

        match self.profile.block {
            RegisterBlock::Gpadc(block) if reg == gpadc::DATA => {
                let latched = state.regs.get(&gpadc::CTRL1).copied().unwrap_or(0);
                let layout = block.ctrl1;
                if layout.latched_mode(latched) != Mode::Voltage {
                    return stored;
                }
                (0..limits::VOLTAGE_CHANNELS)
                    .find(|ch| (layout.chan_select)(*ch) == latched & layout.chan_mask)
                    .map(|ch| state.voltage_codes[ch as usize])
                    .unwrap_or(stored)
            }
            _ => stored,
        }
    }
}

impl RegisterPort for SimulatedGpadc {
    fn read(&self, reg: u32) -> Result<u32> {
        let mut state = self.state.lock();
        if state.faults.contains(&reg) {
            return Err(GpadcError::transport(reg, "injected read fault"));
        }
        let value = self.synthesize(&state, reg);
        state.log.push(RegisterEvent::Read { reg, value });
        trace!("sim read  {:#06x} -> {:#010x}", reg, value);
        Ok(value)
    }

    fn write(&self, reg: u32, value: u32) -> Result<()> {
        let mut state = self.state.lock();
        if state.faults.contains(&reg) {
            return Err(GpadcError::transport(reg, "injected write fault"));
        }
        state.regs.insert(reg, value);
        state.log.push(RegisterEvent::Write { reg, value });
        trace!("sim write {:#06x} <- {:#010x}", reg, value);
        Ok(())
    }
}

/// Settle delays are recorded, not slept
impl Delay for SimulatedGpadc {
    fn delay_ms(&self, ms: u64) {
        self.state.lock().log.push(RegisterEvent::Delay { ms });
    }
}

/// Handle to a running interrupt generator. Stops and joins on drop.
#[derive(Debug)]
pub struct InterruptSource {
    stop: Arc<AtomicBool>,
    fired: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl InterruptSource {
    /// Interrupts delivered so far
    pub fn fired_count(&self) -> u64 {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for InterruptSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::lookup;

    fn sim(identity: &str) -> SimulatedGpadc {
        SimulatedGpadc::new(lookup(identity).unwrap())
    }

    #[test]
    fn test_accesses_are_logged() {
        let dev = sim("allwinner,sun4i-a10-gpadc");
        dev.write(gpadc::CTRL0, 0x1234).unwrap();
        assert_eq!(dev.read(gpadc::CTRL0).unwrap(), 0x1234);
        dev.delay_ms(10);

        assert_eq!(
            dev.events(),
            vec![
                RegisterEvent::Write { reg: gpadc::CTRL0, value: 0x1234 },
                RegisterEvent::Read { reg: gpadc::CTRL0, value: 0x1234 },
                RegisterEvent::Delay { ms: 10 },
            ]
        );
        dev.clear_log();
        assert!(dev.events().is_empty());
    }

    #[test]
    fn test_data_follows_sun4i_channel_select() {
        let dev = sim("allwinner,sun4i-a10-gpadc");
        dev.set_voltage_code(2, 1234);
        dev.preset(gpadc::CTRL1, 0x10 | 0x08 | 2);
        assert_eq!(dev.read(gpadc::DATA).unwrap(), 1234);

        dev.preset(gpadc::CTRL1, 0x10 | 0x08);
        assert_eq!(dev.read(gpadc::DATA).unwrap(), sim::DEFAULT_VOLTAGE_CODE);
    }

    #[test]
    fn test_data_follows_sun6i_one_hot_select() {
        let dev = sim("allwinner,sun6i-a31-gpadc");
        dev.set_voltage_code(3, 99);
        dev.preset(gpadc::CTRL1, 0x20 | 0x10 | 0x8);
        assert_eq!(dev.read(gpadc::DATA).unwrap(), 99);
    }

    #[test]
    fn test_temperature_registers_per_sensor() {
        let dev = sim("allwinner,sun8i-h3-ths");
        dev.set_temperature_code(0, 1500);
        assert_eq!(dev.read(ths::TDATA0).unwrap(), 1500);

        let dev = sim("allwinner,sun5i-a13-gpadc");
        dev.set_temperature_code(0, 1800);
        assert_eq!(dev.read(gpadc::TEMP_DATA).unwrap(), 1800);
    }

    #[test]
    fn test_fault_injection() {
        let dev = sim("allwinner,sun4i-a10-gpadc");
        dev.fail_register(gpadc::DATA);
        assert!(matches!(
            dev.read(gpadc::DATA),
            Err(GpadcError::RegisterTransport { reg: gpadc::DATA, .. })
        ));
        assert!(dev.write(gpadc::DATA, 0).is_err());

        dev.clear_fault(gpadc::DATA);
        assert!(dev.read(gpadc::DATA).is_ok());
    }

    #[test]
    fn test_interrupt_enable_tracking() {
        let dev = sim("allwinner,sun4i-a10-gpadc");
        assert!(!dev.interrupt_enabled());
        dev.write(gpadc::INT_FIFOC, gpadc::INT_FIFOC_TEMP_IRQ_EN).unwrap();
        assert!(dev.interrupt_enabled());

        let dev = sim("allwinner,sun8i-h3-ths");
        dev.write(ths::INTC, ths::INTC_TDATA_IRQ_EN0).unwrap();
        assert!(dev.interrupt_enabled());
    }

    #[test]
    fn test_interrupt_source_fires_only_when_enabled() {
        let dev = Arc::new(sim("allwinner,sun4i-a10-gpadc"));
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        let source = dev
            .start_interrupts(Duration::from_millis(1), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        thread::sleep(Duration::from_millis(20));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        dev.write(gpadc::INT_FIFOC, gpadc::INT_FIFOC_TP_DATA_IRQ_EN).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(hits.load(Ordering::SeqCst) > 0);

        drop(source);
        let after_stop = hits.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(hits.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_muted_source_stays_quiet() {
        let dev = Arc::new(sim("allwinner,sun4i-a10-gpadc"));
        dev.write(gpadc::INT_FIFOC, gpadc::INT_FIFOC_TP_DATA_IRQ_EN).unwrap();
        dev.mute_interrupts(true);
        let source = dev.start_interrupts(Duration::from_millis(1), || {}).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(source.fired_count(), 0);
    }
}
