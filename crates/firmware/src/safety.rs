#![deny(clippy::all)]
#![deny(warnings)]

//! # Safety Monitoring
//!
//! The sentinel-assertion and watchdog half of §7's hard-fault tier: a
//! periodic callback that reads the magic constants guarding the stepper
//! runtime's prep/run slot and, on corruption, latches a global emergency
//! stop and de-energizes the motors.
//!
//! - **Watchdog**: feeds the hardware's Independent Watchdog (IWDG) each
//!   tick so a wedged firmware loop resets the MCU rather than running a
//!   stale motion program indefinitely.
//! - **Sentinel check**: reads `StepperRuntime::sentinel_ok` each tick; the
//!   first failure latches the stop and is never cleared implicitly.
//! - **Emergency stop**: a globally accessible, atomic flag. Interrupt and
//!   task code alike poll it before writing to a step/dir port.

use core::sync::atomic::{AtomicBool, Ordering};
use tinyg_controller::HardFault;
use tinyg_driver_stepper::StepperRuntime;

/// A hardware-free, idempotent emergency-stop flag with its triggering
/// reason. Split out from `SentinelMonitor` so it can be unit tested
/// without an `IndependentWatchdog` peripheral.
#[derive(Default)]
pub struct EmergencyStopLatch {
    active: AtomicBool,
    last_fault: Option<HardFault>,
}

impl EmergencyStopLatch {
    pub const fn new() -> Self {
        Self { active: AtomicBool::new(false), last_fault: None }
    }

    /// Latches the stop. Idempotent; only the first reason is retained.
    pub fn trigger(&mut self, reason: HardFault) {
        if !self.active.swap(true, Ordering::SeqCst) {
            self.last_fault = Some(reason);
            #[cfg(feature = "defmt-logging")]
            defmt::error!("EMERGENCY STOP TRIGGERED: {}", defmt::Debug2Format(&reason));
        }
    }

    pub fn reset(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        self.last_fault = None;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn last_fault(&self) -> Option<HardFault> {
        self.last_fault
    }
}

/// Checks a stepper runtime's prep/run slot sentinels against the latch,
/// returning the same `HardFault` that gets recorded on trigger.
pub fn check_stepper_sentinel<const N: usize>(
    runtime: &StepperRuntime<N>,
    latch: &mut EmergencyStopLatch,
) -> Result<(), HardFault> {
    if !runtime.sentinel_ok() {
        latch.trigger(HardFault::SentinelCorrupted);
        return Err(HardFault::SentinelCorrupted);
    }
    Ok(())
}

#[cfg(feature = "embassy-rt")]
mod watchdog {
    use super::EmergencyStopLatch;
    use embassy_stm32::wdg::IndependentWatchdog;

    /// Aggregates the sentinel latch with the hardware watchdog feed.
    /// Owns no motion-planning logic; the firmware task calls
    /// `check_stepper_sentinel` and `feed_watchdog` once per tick.
    pub struct SentinelMonitor<'a> {
        watchdog: IndependentWatchdog<'a>,
        pub latch: EmergencyStopLatch,
    }

    impl<'a> SentinelMonitor<'a> {
        pub fn new(mut watchdog: IndependentWatchdog<'a>) -> Self {
            watchdog.unleash();
            Self { watchdog, latch: EmergencyStopLatch::new() }
        }

        #[inline]
        pub fn feed_watchdog(&mut self) {
            self.watchdog.feed();
        }
    }
}

#[cfg(feature = "embassy-rt")]
pub use watchdog::SentinelMonitor;

#[cfg(test)]
mod tests {
    use super::*;
    use tinyg_driver_stepper::PowerMode;

    #[test]
    fn fresh_runtime_passes_the_sentinel_check() {
        let runtime = StepperRuntime::<2>::new([PowerMode::AlwaysOn; 2]);
        let mut latch = EmergencyStopLatch::new();
        assert!(check_stepper_sentinel(&runtime, &mut latch).is_ok());
        assert!(!latch.is_active());
    }

    #[test]
    fn trigger_latches_and_keeps_the_first_reason() {
        let mut latch = EmergencyStopLatch::new();
        latch.trigger(HardFault::SentinelCorrupted);
        latch.trigger(HardFault::InvariantViolation);
        assert!(latch.is_active());
        assert_eq!(latch.last_fault(), Some(HardFault::SentinelCorrupted));
    }

    #[test]
    fn reset_clears_the_latch() {
        let mut latch = EmergencyStopLatch::new();
        latch.trigger(HardFault::PrepBufferOwnershipViolation);
        latch.reset();
        assert!(!latch.is_active());
        assert_eq!(latch.last_fault(), None);
    }
}
