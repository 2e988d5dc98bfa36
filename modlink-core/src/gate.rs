//! Event Gate
//!
//! A single coalescing flag that lets the foreground loop sleep until an
//! interrupt handler declares that something happened. There is no queue
//! and no count: any number of signals before a wait collapse into one
//! wake-up.
//!
//! ```text
//!   interrupt handler                  foreground
//!   ─────────────────                  ──────────
//!   gate.signal()  ──── flag = 1 ───►  gate.wait(cpu, clock, 100)
//!                                        mask; flag? ; idle ; unmask
//!                                        take flag → true
//! ```

use portable_atomic::{AtomicBool, Ordering};

use modlink_hal::{InterruptControl, MillisClock};

use crate::critical::{idle_until, idle_until_deadline};
use crate::time::Deadline;

/// Coalescing signal/wait primitive
#[derive(Debug)]
pub struct EventGate {
    signaled: AtomicBool,
}

impl Default for EventGate {
    fn default() -> Self {
        Self::new()
    }
}

impl EventGate {
    /// Create a gate with the flag clear
    pub const fn new() -> Self {
        Self {
            signaled: AtomicBool::new(false),
        }
    }

    /// Set the flag
    ///
    /// Callable from interrupt handlers and from the foreground. Repeated
    /// signals before the next wait are collapsed.
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    /// Whether a signal is pending, without consuming it
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    /// Idle until signaled or until `timeout_ms` has elapsed
    ///
    /// Returns `true` if the gate was signaled. The flag is consumed on
    /// return in both cases, so a signal racing with the timeout is
    /// reported rather than left for the next wait. A timeout of zero
    /// checks the flag once without idling.
    ///
    /// Must not be called from an interrupt handler.
    pub fn wait<C, K>(&self, cpu: &C, clock: &K, timeout_ms: u32) -> bool
    where
        C: InterruptControl + ?Sized,
        K: MillisClock + ?Sized,
    {
        let deadline = Deadline::after(clock, timeout_ms);
        idle_until_deadline(cpu, clock, deadline, || self.is_signaled());
        self.take()
    }

    /// Idle until signaled, without a timeout
    ///
    /// Must not be called from an interrupt handler.
    pub fn wait_forever<C>(&self, cpu: &C) -> bool
    where
        C: InterruptControl + ?Sized,
    {
        idle_until(cpu, || self.is_signaled());
        self.take()
    }

    fn take(&self) -> bool {
        self.signaled.swap(false, Ordering::AcqRel)
    }
}
