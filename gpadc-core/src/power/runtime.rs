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

//! Runtime power management
//!
//! The measurement core only talks to [`PowerLifecycle`]. Every request
//! holds a [`PowerClaim`] for its whole duration, so the block cannot be
//! powered down underneath a measurement. [`RuntimePm`] is the reference
//! implementation: a usage counter in front of a [`PowerSequencer`], with
//! autosuspend after an idle delay.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::sequencer::PowerSequencer;
use crate::error::{GpadcError, Result};

/// Reference-counted power requests
#[cfg_attr(test, mockall::automock)]
pub trait PowerLifecycle: Send + Sync {
    /// Take a reference, powering the block up if needed.
    /// On error no reference is held.
    fn get_sync(&self) -> Result<()>;

    /// Restart the idle timer
    fn mark_last_busy(&self);

    /// Drop a reference; the block may power down once idle
    fn put_autosuspend(&self);
}

/// Scoped power reference, released on drop
#[must_use = "power is released as soon as the claim is dropped"]
pub struct PowerClaim<'a> {
    power: &'a dyn PowerLifecycle,
}

impl<'a> PowerClaim<'a> {
    pub fn acquire(power: &'a dyn PowerLifecycle) -> Result<Self> {
        power.get_sync()?;
        Ok(Self { power })
    }
}

impl Drop for PowerClaim<'_> {
    fn drop(&mut self) {
        self.power.put_autosuspend();
    }
}

impl fmt::Debug for PowerClaim<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PowerClaim")
    }
}

#[derive(Debug)]
struct PmState {
    usage: u32,
    suspended: bool,
    last_busy: Instant,
}

/// Usage-counted power management with idle autosuspend
///
/// Starts suspended. The first claim resumes the block; once the count is
/// back at zero and `autosuspend_delay` has passed since the last busy
/// mark, [`RuntimePm::poll_idle`] suspends it again.
pub struct RuntimePm {
    sequencer: Arc<PowerSequencer>,
    autosuspend_delay: Duration,
    state: Mutex<PmState>,
}

impl RuntimePm {
    pub fn new(sequencer: Arc<PowerSequencer>, autosuspend_delay: Duration) -> Self {
        Self {
            sequencer,
            autosuspend_delay,
            state: Mutex::new(PmState {
                usage: 0,
                suspended: true,
                last_busy: Instant::now(),
            }),
        }
    }

    pub fn usage_count(&self) -> u32 {
        self.state.lock().usage
    }

    pub fn is_suspended(&self) -> bool {
        self.state.lock().suspended
    }

    pub fn autosuspend_delay(&self) -> Duration {
        self.autosuspend_delay
    }

    /// Suspend if idle for at least the autosuspend delay. Returns whether
    /// the block was powered down by this call.
    pub fn poll_idle(&self) -> Result<bool> {
        let mut state = self.state.lock();
        if state.usage > 0 || state.suspended {
            return Ok(false);
        }
        if state.last_busy.elapsed() < self.autosuspend_delay {
            return Ok(false);
        }
        self.sequencer.suspend()?;
        state.suspended = true;
        debug!("Autosuspended after {:?} idle", self.autosuspend_delay);
        Ok(true)
    }

    /// System-sleep resume: reapply the resume sequence and mark the block
    /// active, so the next claim does not resume it a second time.
    pub fn system_resume(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.sequencer.resume()?;
        state.suspended = false;
        state.last_busy = Instant::now();
        Ok(())
    }

    /// System-sleep suspend
    ///
    /// Refused with `Power` while any claim is outstanding; a claim covers a
    /// whole measurement, so an in-flight request is never powered down.
    pub fn system_suspend(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.usage > 0 {
            return Err(GpadcError::Power(format!(
                "suspend refused, {} outstanding claim(s)",
                state.usage
            )));
        }
        self.sequencer.suspend()?;
        state.suspended = true;
        debug!("Suspended by system sleep");
        Ok(())
    }

    /// Power down regardless of the idle timer (unbind)
    pub fn force_suspend(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.usage > 0 {
            warn!("Forcing suspend with {} outstanding claim(s)", state.usage);
        }
        if !state.suspended {
            self.sequencer.suspend()?;
            state.suspended = true;
        }
        Ok(())
    }
}

impl PowerLifecycle for RuntimePm {
    fn get_sync(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.suspended {
            self.sequencer.resume()?;
            state.suspended = false;
        }
        state.usage += 1;
        Ok(())
    }

    fn mark_last_busy(&self) {
        self.state.lock().last_busy = Instant::now();
    }

    fn put_autosuspend(&self) {
        let mut state = self.state.lock();
        match state.usage.checked_sub(1) {
            Some(usage) => state.usage = usage,
            None => warn!("Power reference released more often than taken"),
        }
    }
}

impl fmt::Debug for RuntimePm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RuntimePm")
            .field("usage", &state.usage)
            .field("suspended", &state.suspended)
            .field("autosuspend_delay", &self.autosuspend_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::NoopCalibrationWriter;
    use crate::constants::gpadc;
    use crate::hw::SimulatedGpadc;
    use crate::power::PowerState;
    use crate::variant::lookup;

    fn runtime(delay: Duration) -> (RuntimePm, Arc<PowerSequencer>, Arc<SimulatedGpadc>) {
        let profile = lookup("allwinner,sun5i-a13-gpadc").unwrap();
        let sim = Arc::new(SimulatedGpadc::new(profile));
        let seq = Arc::new(PowerSequencer::new(
            profile,
            sim.clone(),
            None,
            Arc::new(NoopCalibrationWriter),
        ));
        (RuntimePm::new(seq.clone(), delay), seq, sim)
    }

    #[test]
    fn test_claim_releases_on_drop() {
        let mut power = MockPowerLifecycle::new();
        power.expect_get_sync().times(1).returning(|| Ok(()));
        power.expect_put_autosuspend().times(1).return_const(());

        let claim = PowerClaim::acquire(&power).unwrap();
        drop(claim);
    }

    #[test]
    fn test_failed_claim_releases_nothing() {
        let mut power = MockPowerLifecycle::new();
        power.expect_get_sync().returning(|| Err(GpadcError::Power("clock".into())));
        power.expect_put_autosuspend().never();

        assert!(PowerClaim::acquire(&power).is_err());
    }

    #[test]
    fn test_first_claim_resumes() {
        let (pm, seq, _) = runtime(Duration::from_secs(10));
        assert!(pm.is_suspended());

        let claim = PowerClaim::acquire(&pm).unwrap();
        assert_eq!(pm.usage_count(), 1);
        assert_eq!(seq.state(), PowerState::Active);

        let nested = PowerClaim::acquire(&pm).unwrap();
        assert_eq!(pm.usage_count(), 2);
        drop(nested);
        drop(claim);
        assert_eq!(pm.usage_count(), 0);
        assert!(!pm.is_suspended());
    }

    #[test]
    fn test_poll_idle_honours_delay() {
        let (pm, seq, _) = runtime(Duration::from_secs(3600));
        drop(PowerClaim::acquire(&pm).unwrap());
        pm.mark_last_busy();
        assert!(!pm.poll_idle().unwrap());
        assert_eq!(seq.state(), PowerState::Active);

        let (pm, seq, _) = runtime(Duration::ZERO);
        drop(PowerClaim::acquire(&pm).unwrap());
        assert!(pm.poll_idle().unwrap());
        assert_eq!(seq.state(), PowerState::Suspended);
        assert!(!pm.poll_idle().unwrap());
    }

    #[test]
    fn test_poll_idle_keeps_claimed_block_up() {
        let (pm, seq, _) = runtime(Duration::ZERO);
        let _claim = PowerClaim::acquire(&pm).unwrap();
        assert!(!pm.poll_idle().unwrap());
        assert_eq!(seq.state(), PowerState::Active);
    }

    #[test]
    fn test_resume_failure_leaves_no_reference() {
        let (pm, _, sim) = runtime(Duration::ZERO);
        sim.fail_register(gpadc::CTRL0);
        assert!(PowerClaim::acquire(&pm).is_err());
        assert_eq!(pm.usage_count(), 0);
        assert!(pm.is_suspended());
    }

    #[test]
    fn test_force_suspend() {
        let (pm, seq, _) = runtime(Duration::from_secs(3600));
        drop(PowerClaim::acquire(&pm).unwrap());
        pm.force_suspend().unwrap();
        assert!(pm.is_suspended());
        assert_eq!(seq.state(), PowerState::Suspended);
    }

    #[test]
    fn test_system_suspend_refused_while_claimed() {
        let (pm, seq, sim) = runtime(Duration::from_secs(3600));
        let claim = PowerClaim::acquire(&pm).unwrap();
        let before = sim.snapshot();

        assert!(matches!(pm.system_suspend(), Err(GpadcError::Power(_))));
        assert_eq!(sim.snapshot(), before);
        assert_eq!(seq.state(), PowerState::Active);
        assert!(!pm.is_suspended());

        drop(claim);
        pm.system_suspend().unwrap();
        assert!(pm.is_suspended());
        assert_eq!(seq.state(), PowerState::Suspended);
    }

    #[test]
    fn test_claim_after_system_suspend_resumes() {
        let (pm, seq, _) = runtime(Duration::from_secs(3600));
        drop(PowerClaim::acquire(&pm).unwrap());
        pm.system_suspend().unwrap();

        let _claim = PowerClaim::acquire(&pm).unwrap();
        assert_eq!(seq.state(), PowerState::Active);
        assert!(!pm.is_suspended());
    }

    #[test]
    fn test_system_resume_marks_active() {
        let (pm, seq, sim) = runtime(Duration::from_secs(3600));
        pm.system_resume().unwrap();
        assert!(!pm.is_suspended());
        assert_eq!(seq.state(), PowerState::Active);

        // The claim finds the block up and writes nothing
        sim.clear_log();
        drop(PowerClaim::acquire(&pm).unwrap());
        assert!(sim.events().is_empty());
    }

    #[test]
    fn test_unbalanced_put_saturates() {
        let (pm, _, _) = runtime(Duration::ZERO);
        pm.put_autosuspend();
        assert_eq!(pm.usage_count(), 0);
    }
}
