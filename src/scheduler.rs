//! Cooperative task scheduler loop
//!
//! Single-threaded and non-blocking: each iteration pumps the external USB
//! stack exactly once, then checks a monotonic deadline for the liveness
//! heartbeat. The stack may synchronously invoke any number of SCSI command
//! handlers before its pump returns. The loop never sleeps — it assumes no
//! OS scheduler is present.

use crate::config::InitFailurePolicy;
use crate::device::MscDevice;
use crate::error::MscResult;
use crate::volume::BlockStore;
use std::time::{Duration, Instant};

/// Monotonic time source.
///
/// Reports elapsed time since an arbitrary fixed epoch. Abstracted so the
/// scheduler can be driven by a scripted clock in tests.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Clock backed by `std::time::Instant`
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// The external USB device stack, as the scheduler sees it.
///
/// `task` is one non-blocking pump of the stack's internal state machine;
/// it may call back into the device's SCSI handlers before returning.
pub trait UsbStack<B: BlockStore> {
    /// One-time bring-up of the stack and its bus
    fn init(&mut self) -> MscResult<()>;

    /// Pump the stack once; must return promptly
    fn task(&mut self, device: &MscDevice<B>);
}

/// Periodic deadline that does not drift.
///
/// Each firing reschedules strictly `interval` after the *previous scheduled
/// deadline*, not after the observed firing time, so heartbeats land on the
/// `t0 + k * interval` grid even when loop iterations run long. A late loop
/// catches up one interval per poll.
#[derive(Debug)]
pub struct Heartbeat {
    next_deadline: Duration,
    interval: Duration,
}

impl Heartbeat {
    /// Schedule the first beat at `start + interval`
    pub fn new(start: Duration, interval: Duration) -> Self {
        Heartbeat {
            next_deadline: start + interval,
            interval,
        }
    }

    /// Check the deadline without blocking; true if a beat is due
    pub fn poll(&mut self, now: Duration) -> bool {
        if now >= self.next_deadline {
            self.next_deadline += self.interval;
            true
        } else {
            false
        }
    }

    pub fn next_deadline(&self) -> Duration {
        self.next_deadline
    }
}

/// Owns the process's only control thread and all mutable scheduler state
pub struct Scheduler<C: Clock> {
    clock: C,
    heartbeat: Heartbeat,
    beats: u64,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C, heartbeat_interval: Duration) -> Self {
        let start = clock.now();
        Scheduler {
            clock,
            heartbeat: Heartbeat::new(start, heartbeat_interval),
            beats: 0,
        }
    }

    /// Bring up the external stack, applying the configured failure policy.
    ///
    /// A startup failure is reported once; whether it is fatal or the loop
    /// continues degraded is the policy's call, distinguishable from any
    /// steady-state handler outcome.
    pub fn start<B, S>(&self, stack: &mut S, policy: InitFailurePolicy) -> MscResult<()>
    where
        B: BlockStore,
        S: UsbStack<B>,
    {
        match stack.init() {
            Ok(()) => {
                log::info!("USB stack initialized, device ready");
                Ok(())
            }
            Err(e) => match policy {
                InitFailurePolicy::Halt => {
                    log::error!("stack init failed, halting: {e}");
                    Err(e)
                }
                InitFailurePolicy::ContinueDegraded => {
                    log::error!("stack init failed, continuing degraded: {e}");
                    Ok(())
                }
            },
        }
    }

    /// One loop iteration: pump the stack once, then poll the heartbeat.
    ///
    /// Returns whether a heartbeat fired.
    pub fn step<B, S>(&mut self, stack: &mut S, device: &MscDevice<B>) -> bool
    where
        B: BlockStore,
        S: UsbStack<B>,
    {
        stack.task(device);

        let fired = self.heartbeat.poll(self.clock.now());
        if fired {
            self.beats += 1;
            log::info!("heartbeat {}", self.beats);
        }
        fired
    }

    /// Run the loop for the lifetime of the process.
    pub fn run<B, S>(mut self, stack: &mut S, device: &MscDevice<B>) -> !
    where
        B: BlockStore,
        S: UsbStack<B>,
    {
        loop {
            self.step(stack, device);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
