//! Host simulation of the interrupt controller and tick
//!
//! Lets the transport and the event gate run on a desktop OS with
//! threads playing the role of interrupt handlers. The model keeps the
//! properties the idle loops rely on:
//!
//! - a handler never runs while interrupts are masked;
//! - idling with interrupts masked returns as soon as a handler is pending;
//! - unmasking runs every pending handler before returning;
//! - idling also returns on a 1 ms tick, like the SysTick interrupt.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use modlink_hal::{InterruptControl, MillisClock};

const TICK: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct State {
    masked: bool,
    pending: usize,
}

/// Simulated single-core interrupt controller
#[derive(Debug, Default)]
pub struct HostInterrupts {
    state: Mutex<State>,
    changed: Condvar,
}

impl HostInterrupts {
    /// Interrupts start unmasked with nothing pending
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an interrupt from another thread
    ///
    /// Blocks while the foreground has interrupts masked, then runs
    /// `handler` to completion with the foreground excluded. The handler
    /// must not call back into this controller.
    pub fn raise(&self, handler: impl FnOnce()) {
        let mut state = self.lock();
        state.pending += 1;
        self.changed.notify_all();
        while state.masked {
            state = self.wait(state);
        }
        handler();
        state.pending -= 1;
        self.changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.changed
            .wait(guard)
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InterruptControl for HostInterrupts {
    fn disable_interrupts(&self) {
        self.lock().masked = true;
    }

    fn enable_interrupts(&self) {
        let mut state = self.lock();
        state.masked = false;
        self.changed.notify_all();
        while state.pending > 0 && !state.masked {
            state = self.wait(state);
        }
    }

    fn wait_for_interrupt(&self) {
        let state = self.lock();
        if state.pending == 0 {
            let _ = self
                .changed
                .wait_timeout(state, TICK)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

/// Millisecond tick backed by the OS monotonic clock
///
/// Truncated to 32 bits so it wraps exactly like the target tick. An
/// offset lets tests start just below the wrap point.
#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    origin: Instant,
    offset: u32,
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock {
    /// Clock reading zero now
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Clock reading `offset` now
    pub fn starting_at(offset: u32) -> Self {
        Self {
            origin: Instant::now(),
            offset,
        }
    }
}

impl MillisClock for HostClock {
    fn now_ms(&self) -> u32 {
        self.offset
            .wrapping_add(self.origin.elapsed().as_millis() as u32)
    }
}
