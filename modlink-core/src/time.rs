//! Wraparound-safe millisecond time
//!
//! The tick is a 32-bit counter that wraps from `u32::MAX` to `0`. All
//! arithmetic subtracts two readings with wrapping semantics and compares
//! the difference; absolute readings are never compared. This is correct
//! for any interval shorter than 2^32 ms (about 49.7 days).

use modlink_hal::{InterruptControl, MillisClock};

use crate::critical::idle_until_deadline;

/// Milliseconds elapsed from `start` to `now`, modulo 2^32
#[inline]
pub const fn elapsed_ms(start: u32, now: u32) -> u32 {
    now.wrapping_sub(start)
}

/// A point in the future expressed as a start tick plus a duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deadline {
    start: u32,
    timeout_ms: u32,
}

impl Deadline {
    /// Deadline `timeout_ms` after the tick `start`
    pub const fn new(start: u32, timeout_ms: u32) -> Self {
        Self { start, timeout_ms }
    }

    /// Deadline `timeout_ms` from the current time of `clock`
    pub fn after<K: MillisClock + ?Sized>(clock: &K, timeout_ms: u32) -> Self {
        Self::new(clock.now_ms(), timeout_ms)
    }

    /// Tick the deadline was started at
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Whether the deadline has passed at tick `now`
    pub fn expired(&self, now: u32) -> bool {
        elapsed_ms(self.start, now) >= self.timeout_ms
    }

    /// Milliseconds left at tick `now`, zero once expired
    pub fn remaining(&self, now: u32) -> u32 {
        self.timeout_ms.saturating_sub(elapsed_ms(self.start, now))
    }
}

/// Idle the core for at least `ms` milliseconds
///
/// The core sleeps between tick interrupts instead of spinning. Not for
/// use inside an interrupt handler.
pub fn sleep_ms<C, K>(cpu: &C, clock: &K, ms: u32)
where
    C: InterruptControl + ?Sized,
    K: MillisClock + ?Sized,
{
    let deadline = Deadline::after(clock, ms);
    idle_until_deadline(cpu, clock, deadline, || false);
}

/// Idle the core for at least `us` microseconds
///
/// Resolution is the millisecond tick, so the delay is rounded up to
/// `us / 1000 + 1` milliseconds.
pub fn sleep_us<C, K>(cpu: &C, clock: &K, us: u32)
where
    C: InterruptControl + ?Sized,
    K: MillisClock + ?Sized,
{
    sleep_ms(cpu, clock, us / 1000 + 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClock, MockCpu};
    use proptest::prelude::*;

    #[test]
    fn test_elapsed_across_wrap() {
        assert_eq!(elapsed_ms(0xFFFF_FFF0, 0x0000_0005), 21);
    }

    #[test]
    fn test_elapsed_without_wrap() {
        assert_eq!(elapsed_ms(1_000, 1_250), 250);
        assert_eq!(elapsed_ms(7, 7), 0);
    }

    #[test]
    fn test_deadline_across_wrap() {
        let deadline = Deadline::new(0xFFFF_FFF0, 20);
        assert!(!deadline.expired(0xFFFF_FFFF));
        assert!(!deadline.expired(0x0000_0003));
        assert_eq!(deadline.remaining(0x0000_0003), 1);
        assert!(deadline.expired(0x0000_0004));
        assert_eq!(deadline.remaining(0x0000_0005), 0);
    }

    #[test]
    fn test_zero_deadline_is_already_expired() {
        let deadline = Deadline::new(123, 0);
        assert!(deadline.expired(123));
    }

    #[test]
    fn test_sleep_ms_idles_until_elapsed() {
        let clock = MockClock::starting_at(u32::MAX - 2);
        let cpu = MockCpu::new();
        cpu.on_idle(|| clock.advance(1));

        sleep_ms(&cpu, &clock, 5);

        assert!(elapsed_ms(u32::MAX - 2, clock.peek()) >= 5);
        assert_eq!(cpu.idle_count(), 5);
        assert!(!cpu.is_masked());
    }

    #[test]
    fn test_sleep_us_rounds_up_to_next_ms() {
        let clock = MockClock::starting_at(0);
        let cpu = MockCpu::new();
        cpu.on_idle(|| clock.advance(1));

        sleep_us(&cpu, &clock, 1_500);

        assert_eq!(clock.peek(), 2);
    }

    proptest! {
        #[test]
        fn prop_elapsed_inverts_wrapping_add(start: u32, delta: u32) {
            prop_assert_eq!(elapsed_ms(start, start.wrapping_add(delta)), delta);
        }

        #[test]
        fn prop_deadline_expiry_depends_only_on_delta(start: u32, timeout in 0u32..1_000_000, delta in 0u32..2_000_000) {
            let deadline = Deadline::new(start, timeout);
            prop_assert_eq!(deadline.expired(start.wrapping_add(delta)), delta >= timeout);
        }
    }
}
