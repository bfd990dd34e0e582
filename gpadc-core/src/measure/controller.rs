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

//! Serialized measurement requests
//!
//! One lock covers the whole request, from the FIFO flush to the point the
//! interrupt line is disarmed again, so register writes of concurrent
//! callers never interleave. The power claim is taken before the lock and
//! released after it.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use super::{IrqLine, Mode, Pending, WaitOutcome};
use crate::constants::{gpadc, limits, timing};
use crate::error::{GpadcError, Result};
use crate::hw::{Delay, RegisterPort};
use crate::power::{PowerClaim, PowerLifecycle};
use crate::variant::{Ctrl1Layout, IrqKind, VariantProfile};

/// Last successful results, guarded by the request lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SharedDeviceState {
    pub last_voltage: Option<u32>,
    pub last_temperature: Option<i32>,
}

/// Owns the measurement lifecycle of one bound block
pub struct MeasurementController {
    profile: &'static VariantProfile,
    port: Arc<dyn RegisterPort>,
    delay: Arc<dyn Delay>,
    power: Arc<dyn PowerLifecycle>,
    line: Arc<IrqLine>,
    state: Mutex<SharedDeviceState>,
}

impl MeasurementController {
    pub fn new(
        profile: &'static VariantProfile,
        port: Arc<dyn RegisterPort>,
        delay: Arc<dyn Delay>,
        power: Arc<dyn PowerLifecycle>,
        line: Arc<IrqLine>,
    ) -> Self {
        Self {
            profile,
            port,
            delay,
            power,
            line,
            state: Mutex::new(SharedDeviceState::default()),
        }
    }

    pub fn profile(&self) -> &'static VariantProfile {
        self.profile
    }

    /// Whether the interrupt path would currently accept a sample
    pub fn irq_armed(&self) -> bool {
        self.line.is_armed()
    }

    /// Snapshot of the last results; waits for an in-flight request
    pub fn last_sample(&self) -> SharedDeviceState {
        *self.state.lock()
    }

    /// Take one interrupt-driven sample
    ///
    /// `channel` is the voltage input for [`Mode::Voltage`] and the sensor
    /// index for [`Mode::Temperature`]. Invalid combinations fail before any
    /// register is touched or power is requested.
    pub fn measure(&self, mode: Mode, channel: u32) -> Result<u32> {
        let ctrl1 = self.validate(mode, channel)?;

        let _claim = PowerClaim::acquire(self.power.as_ref())?;
        let mut state = self.state.lock();

        let result = self.run_request(ctrl1, mode, channel);
        self.line.disarm();

        match result {
            Ok(raw) => {
                match mode {
                    Mode::Voltage => state.last_voltage = Some(raw),
                    Mode::Temperature => state.last_temperature = Some(raw as i32),
                }
                self.power.mark_last_busy();
                Ok(raw)
            }
            Err(e) => {
                warn!("{} measurement on channel {} failed: {}", mode, channel, e);
                Err(e)
            }
        }
    }

    /// Read a thermal sensor's data register without the interrupt path
    pub fn read_direct(&self, sensor: usize) -> Result<u32> {
        if sensor >= self.profile.sensor_count {
            return Err(GpadcError::invalid(format!(
                "sensor {} out of range ({} available)",
                sensor, self.profile.sensor_count
            )));
        }

        let _claim = PowerClaim::acquire(self.power.as_ref())?;
        let mut state = self.state.lock();

        let raw = self.port.read(self.profile.temp_data_register(sensor))?;
        state.last_temperature = Some(raw as i32);
        self.power.mark_last_busy();
        Ok(raw)
    }

    fn validate(&self, mode: Mode, channel: u32) -> Result<&'static Ctrl1Layout> {
        if self.profile.irq_kind() != IrqKind::DataReady {
            return Err(GpadcError::invalid(format!(
                "{} has no data-ready interrupt",
                self.profile.soc
            )));
        }
        let ctrl1 = self.profile.block.ctrl1().ok_or_else(|| {
            GpadcError::invalid(format!("{} has no ADC control register", self.profile.soc))
        })?;

        match mode {
            Mode::Voltage if !self.profile.has_voltage_channel => Err(GpadcError::invalid(format!(
                "{} has no voltage inputs",
                self.profile.soc
            ))),
            Mode::Voltage if channel >= limits::VOLTAGE_CHANNELS => Err(GpadcError::invalid(
                format!("voltage channel {} out of range (0..{})", channel, limits::VOLTAGE_CHANNELS),
            )),
            Mode::Temperature if channel as usize >= self.profile.sensor_count => {
                Err(GpadcError::invalid(format!(
                    "sensor {} out of range ({} available)",
                    channel, self.profile.sensor_count
                )))
            }
            _ => Ok(ctrl1),
        }
    }

    fn run_request(&self, ctrl1: &Ctrl1Layout, mode: Mode, channel: u32) -> Result<u32> {
        let port = self.port.as_ref();

        port.write(gpadc::INT_FIFOC, gpadc::int_fifoc_trig_level(1) | gpadc::INT_FIFOC_TP_FIFO_FLUSH)?;

        let latched = port.read(gpadc::CTRL1)?;
        port.write(gpadc::CTRL1, ctrl1.request_value(mode, channel))?;

        let plan = ctrl1.settle_plan(latched, mode, channel);
        if plan.channel_switch {
            debug!("Channel switch to {}, settling", channel);
            self.delay.delay_ms(timing::CHANNEL_SETTLE_MS);
        }
        if plan.mode_switch {
            debug!("Mode switch to {}, settling", mode);
            self.delay.delay_ms(timing::MODE_SETTLE_MS);
        }

        // The line must be armed before the enable, an edge may fire on the write
        let ticket = self.line.arm(Pending { mode, index: channel });
        if let Err(e) = port.write(gpadc::INT_FIFOC, gpadc::int_fifoc_trig_level(1) | irq_enable(mode)) {
            self.line.disarm();
            return Err(e);
        }

        match self.line.wait(ticket, timing::completion_timeout()) {
            WaitOutcome::Value(Ok(raw)) => Ok(raw),
            WaitOutcome::Value(Err(fault)) => {
                Err(GpadcError::transport(fault.reg, "data read failed in interrupt handler"))
            }
            WaitOutcome::TimedOut => Err(GpadcError::Timeout {
                what: mode.as_str(),
                waited_ms: timing::COMPLETION_TIMEOUT_MS,
            }),
        }
    }
}

fn irq_enable(mode: Mode) -> u32 {
    match mode {
        Mode::Voltage => gpadc::INT_FIFOC_TP_DATA_IRQ_EN,
        Mode::Temperature => gpadc::INT_FIFOC_TEMP_IRQ_EN,
    }
}

impl fmt::Debug for MeasurementController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasurementController")
            .field("variant", &self.profile.variant)
            .field("armed", &self.line.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::{InterruptSource, MockRegisterPort, RegisterEvent, SimulatedGpadc};
    use crate::measure::{InterruptBridge, IrqReturn, SampleNotifier};
    use crate::power::MockPowerLifecycle;
    use crate::variant::lookup;
    use std::time::{Duration, Instant};

    struct Rig {
        controller: MeasurementController,
        sim: Arc<SimulatedGpadc>,
        bridge: Arc<InterruptBridge>,
        _irq: InterruptSource,
    }

    fn balanced_power() -> MockPowerLifecycle {
        let mut power = MockPowerLifecycle::new();
        power.expect_get_sync().returning(|| Ok(()));
        power.expect_put_autosuspend().return_const(());
        power.expect_mark_last_busy().return_const(());
        power
    }

    fn rig_with(identity: &str, power: MockPowerLifecycle) -> Rig {
        let profile = lookup(identity).unwrap();
        let sim = Arc::new(SimulatedGpadc::new(profile));
        let line = Arc::new(IrqLine::new());
        let bridge = Arc::new(InterruptBridge::new(
            profile,
            sim.clone(),
            line.clone(),
            Arc::new(SampleNotifier::new(profile.sensor_count)),
        ));
        let irq = {
            let bridge = bridge.clone();
            sim.start_interrupts(Duration::from_millis(1), move || {
                bridge.handle();
            })
            .unwrap()
        };
        let controller =
            MeasurementController::new(profile, sim.clone(), sim.clone(), Arc::new(power), line);
        Rig { controller, sim, bridge, _irq: irq }
    }

    fn rig(identity: &str) -> Rig {
        rig_with(identity, balanced_power())
    }

    #[test]
    fn test_voltage_measurement() {
        let rig = rig("allwinner,sun4i-a10-gpadc");
        rig.sim.set_voltage_code(2, 3210);

        assert_eq!(rig.controller.measure(Mode::Voltage, 2).unwrap(), 3210);
        assert_eq!(rig.controller.last_sample().last_voltage, Some(3210));
        assert!(!rig.controller.irq_armed());
    }

    #[test]
    fn test_temperature_measurement() {
        let rig = rig("allwinner,sun6i-a31-gpadc");
        rig.sim.set_temperature_code(0, 1900);

        assert_eq!(rig.controller.measure(Mode::Temperature, 0).unwrap(), 1900);
        assert_eq!(rig.controller.last_sample().last_temperature, Some(1900));
    }

    #[test]
    fn test_request_register_sequence() {
        let rig = rig("allwinner,sun4i-a10-gpadc");
        rig.sim.preset(gpadc::CTRL1, 0x10 | 0x08 | 1);

        rig.controller.measure(Mode::Voltage, 1).unwrap();
        let writes: Vec<(u32, u32)> = rig.sim.writes().into_iter().take(3).collect();
        assert_eq!(
            writes,
            vec![
                (gpadc::INT_FIFOC, 0x100 | gpadc::INT_FIFOC_TP_FIFO_FLUSH),
                (gpadc::CTRL1, 0x10 | 0x08 | 1),
                (gpadc::INT_FIFOC, 0x100 | gpadc::INT_FIFOC_TP_DATA_IRQ_EN),
            ]
        );
    }

    #[test]
    fn test_invalid_requests_touch_nothing() {
        let mut power = MockPowerLifecycle::new();
        power.expect_get_sync().never();
        let rig = rig_with("allwinner,sun4i-a10-gpadc", power);

        for (mode, channel) in [(Mode::Voltage, 4), (Mode::Voltage, 100), (Mode::Temperature, 1)] {
            let err = rig.controller.measure(mode, channel).unwrap_err();
            assert!(matches!(err, GpadcError::InvalidConfiguration(_)), "{:?}", err);
        }
        assert!(rig.sim.events().is_empty());
    }

    #[test]
    fn test_variants_without_data_ready_rejected() {
        for identity in ["allwinner,sun8i-a33-ths", "allwinner,sun8i-h3-ths"] {
            let mut power = MockPowerLifecycle::new();
            power.expect_get_sync().never();
            let rig = rig_with(identity, power);
            for mode in [Mode::Voltage, Mode::Temperature] {
                assert!(matches!(
                    rig.controller.measure(mode, 0),
                    Err(GpadcError::InvalidConfiguration(_))
                ));
            }
        }
    }

    #[test]
    fn test_mode_switch_settles_before_arming() {
        let rig = rig("allwinner,sun4i-a10-gpadc");
        rig.sim.preset(gpadc::CTRL1, gpadc::SUN4I_CTRL1_TP_MODE_EN);

        rig.controller.measure(Mode::Voltage, 0).unwrap();
        let events = rig.sim.events();
        let settle = events
            .iter()
            .position(|e| *e == RegisterEvent::Delay { ms: timing::MODE_SETTLE_MS })
            .unwrap();
        let arm = events
            .iter()
            .position(|e| {
                *e == RegisterEvent::Write {
                    reg: gpadc::INT_FIFOC,
                    value: 0x100 | gpadc::INT_FIFOC_TP_DATA_IRQ_EN,
                }
            })
            .unwrap();
        assert!(settle < arm);
    }

    #[test]
    fn test_settle_delays_follow_latched_state() {
        let rig = rig("allwinner,sun6i-a31-gpadc");

        rig.controller.measure(Mode::Voltage, 1).unwrap();
        rig.sim.clear_log();
        rig.controller.measure(Mode::Voltage, 1).unwrap();
        assert!(rig.sim.delays().is_empty());

        rig.sim.clear_log();
        rig.controller.measure(Mode::Voltage, 3).unwrap();
        assert_eq!(rig.sim.delays(), vec![timing::CHANNEL_SETTLE_MS]);

        rig.sim.clear_log();
        rig.controller.measure(Mode::Temperature, 0).unwrap();
        assert_eq!(rig.sim.delays(), vec![timing::MODE_SETTLE_MS]);

        rig.sim.clear_log();
        rig.controller.measure(Mode::Temperature, 0).unwrap();
        assert!(rig.sim.delays().is_empty());
    }

    #[test]
    fn test_timeout_disarms_and_ignores_late_signal() {
        let rig = rig("allwinner,sun4i-a10-gpadc");
        rig.sim.mute_interrupts(true);
        rig.sim.set_voltage_code(0, 111);

        let start = Instant::now();
        let err = rig.controller.measure(Mode::Voltage, 0).unwrap_err();
        assert!(matches!(err, GpadcError::Timeout { what: "voltage", waited_ms: 1000 }));
        assert!(start.elapsed() >= timing::completion_timeout());
        assert!(!rig.controller.irq_armed());

        // The late interrupt finds nothing armed
        assert_eq!(rig.bridge.handle(), IrqReturn::None);

        rig.sim.set_voltage_code(0, 222);
        rig.sim.mute_interrupts(false);
        assert_eq!(rig.controller.measure(Mode::Voltage, 0).unwrap(), 222);
    }

    #[test]
    fn test_transport_fault_resolves_promptly() {
        let rig = rig("allwinner,sun4i-a10-gpadc");
        rig.sim.fail_register(gpadc::DATA);

        let start = Instant::now();
        let err = rig.controller.measure(Mode::Voltage, 0).unwrap_err();
        assert!(matches!(err, GpadcError::RegisterTransport { reg: gpadc::DATA, .. }));
        assert!(start.elapsed() < timing::completion_timeout());
        assert_eq!(rig.controller.last_sample().last_voltage, None);
    }

    #[test]
    fn test_power_claim_balanced_on_failure() {
        let mut power = MockPowerLifecycle::new();
        power.expect_get_sync().times(1).returning(|| Ok(()));
        power.expect_put_autosuspend().times(1).return_const(());
        power.expect_mark_last_busy().never();
        let rig = rig_with("allwinner,sun4i-a10-gpadc", power);
        rig.sim.fail_register(gpadc::CTRL1);

        assert!(rig.controller.measure(Mode::Voltage, 0).is_err());
        assert!(!rig.controller.irq_armed());
    }

    #[test]
    fn test_power_failure_aborts_before_registers() {
        let mut power = MockPowerLifecycle::new();
        power.expect_get_sync().returning(|| Err(GpadcError::Power("bus clock".into())));
        power.expect_put_autosuspend().never();
        let rig = rig_with("allwinner,sun4i-a10-gpadc", power);

        assert!(matches!(rig.controller.measure(Mode::Voltage, 0), Err(GpadcError::Power(_))));
        assert!(rig.sim.events().is_empty());
    }

    /// Port that raises the interrupt once, synchronously, when it is enabled
    struct EdgeOnEnable {
        sim: Arc<SimulatedGpadc>,
        bridge: Arc<InterruptBridge>,
        seen: Mutex<Vec<IrqReturn>>,
    }

    impl RegisterPort for EdgeOnEnable {
        fn read(&self, reg: u32) -> Result<u32> {
            self.sim.read(reg)
        }

        fn write(&self, reg: u32, value: u32) -> Result<()> {
            self.sim.write(reg, value)?;
            let enable = gpadc::INT_FIFOC_TP_DATA_IRQ_EN | gpadc::INT_FIFOC_TEMP_IRQ_EN;
            if reg == gpadc::INT_FIFOC && value & enable != 0 {
                self.seen.lock().push(self.bridge.handle());
            }
            Ok(())
        }
    }

    #[test]
    fn test_interrupt_on_enable_edge_is_delivered() {
        let profile = lookup("allwinner,sun4i-a10-gpadc").unwrap();
        let sim = Arc::new(SimulatedGpadc::new(profile));
        sim.set_voltage_code(3, 1234);
        let line = Arc::new(IrqLine::new());
        let bridge = Arc::new(InterruptBridge::new(
            profile,
            sim.clone(),
            line.clone(),
            Arc::new(SampleNotifier::new(profile.sensor_count)),
        ));
        let port = Arc::new(EdgeOnEnable { sim: sim.clone(), bridge, seen: Mutex::new(Vec::new()) });
        let controller = MeasurementController::new(
            profile,
            port.clone(),
            sim.clone(),
            Arc::new(balanced_power()),
            line,
        );

        let start = Instant::now();
        assert_eq!(controller.measure(Mode::Voltage, 3).unwrap(), 1234);
        assert!(start.elapsed() < timing::completion_timeout());
        assert_eq!(*port.seen.lock(), vec![IrqReturn::Handled]);
        assert!(!controller.irq_armed());
    }

    #[test]
    fn test_failed_interrupt_enable_disarms() {
        let profile = lookup("allwinner,sun4i-a10-gpadc").unwrap();
        let sim = Arc::new(SimulatedGpadc::new(profile));
        let mut port = MockRegisterPort::new();
        port.expect_read().returning(|_| Ok(0));
        port.expect_write().returning(|reg, value| {
            if reg == gpadc::INT_FIFOC && value & gpadc::INT_FIFOC_TP_DATA_IRQ_EN != 0 {
                Err(GpadcError::transport(reg, "bus error"))
            } else {
                Ok(())
            }
        });
        let controller = MeasurementController::new(
            profile,
            Arc::new(port),
            sim,
            Arc::new(balanced_power()),
            Arc::new(IrqLine::new()),
        );

        let start = Instant::now();
        let err = controller.measure(Mode::Voltage, 0).unwrap_err();
        assert!(matches!(err, GpadcError::RegisterTransport { reg: gpadc::INT_FIFOC, .. }));
        assert!(start.elapsed() < timing::completion_timeout());
        assert!(!controller.irq_armed());
    }

    #[test]
    fn test_direct_read() {
        let rig = rig("allwinner,sun8i-a33-ths");
        rig.sim.set_temperature_code(0, 2100);
        assert_eq!(rig.controller.read_direct(0).unwrap(), 2100);
        assert_eq!(rig.controller.last_sample().last_temperature, Some(2100));
        assert!(matches!(rig.controller.read_direct(1), Err(GpadcError::InvalidConfiguration(_))));
    }
}
