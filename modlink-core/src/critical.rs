//! Critical-section discipline
//!
//! Interrupt handlers are the only source of preemption on the target, so
//! foreground code excludes them by masking interrupts globally for the
//! shortest possible window. Two tools are used:
//!
//! - State shared with interrupt handlers (the receive session) lives in a
//!   [`critical_section::Mutex`]. On Cortex-M the `critical-section`
//!   implementation masks interrupts with PRIMASK and restores the previous
//!   state on exit.
//! - Idle loops use the flat [`InterruptFree`] guard around
//!   [`InterruptControl`]: mask, re-check, idle, unmask. The mask is not
//!   nested; dropping the guard always unmasks.

use modlink_hal::{InterruptControl, MillisClock};

use crate::time::Deadline;

/// Interrupts stay masked while this guard is alive
#[must_use = "interrupts are unmasked as soon as the guard is dropped"]
pub struct InterruptFree<'a, C: InterruptControl + ?Sized> {
    cpu: &'a C,
}

impl<'a, C: InterruptControl + ?Sized> InterruptFree<'a, C> {
    /// Mask interrupts until the returned guard is dropped
    pub fn new(cpu: &'a C) -> Self {
        cpu.disable_interrupts();
        Self { cpu }
    }
}

impl<C: InterruptControl + ?Sized> Drop for InterruptFree<'_, C> {
    fn drop(&mut self) {
        self.cpu.enable_interrupts();
    }
}

/// Run `f` with interrupts masked
pub fn interrupt_free<C, R>(cpu: &C, f: impl FnOnce() -> R) -> R
where
    C: InterruptControl + ?Sized,
{
    let _masked = InterruptFree::new(cpu);
    f()
}

/// Idle until `ready` returns true
///
/// Each iteration masks interrupts, re-checks `ready` and only then idles.
/// A wake-up source that fires between the unmasked check and the mask is
/// caught by the re-check; one that fires after the re-check is pending
/// when the idle instruction executes, so the core does not sleep. Its
/// handler runs when the mask is lifted at the end of the iteration.
pub fn idle_until<C>(cpu: &C, ready: impl Fn() -> bool)
where
    C: InterruptControl + ?Sized,
{
    while !ready() {
        let _masked = InterruptFree::new(cpu);
        if !ready() {
            cpu.wait_for_interrupt();
        }
    }
}

/// Idle until `ready` returns true or `deadline` expires
///
/// Returns the final value of `ready`. A deadline that has already
/// expired still performs one check of `ready` without idling.
pub fn idle_until_deadline<C, K>(
    cpu: &C,
    clock: &K,
    deadline: Deadline,
    ready: impl Fn() -> bool,
) -> bool
where
    C: InterruptControl + ?Sized,
    K: MillisClock + ?Sized,
{
    while !ready() && !deadline.expired(clock.now_ms()) {
        let _masked = InterruptFree::new(cpu);
        if !ready() {
            cpu.wait_for_interrupt();
        }
    }
    ready()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClock, MockCpu};
    use core::cell::Cell;

    #[test]
    fn test_guard_masks_for_its_lifetime() {
        let cpu = MockCpu::new();
        {
            let _masked = InterruptFree::new(&cpu);
            assert!(cpu.is_masked());
        }
        assert!(!cpu.is_masked());
    }

    #[test]
    fn test_mask_is_flat() {
        let cpu = MockCpu::new();
        cpu.disable_interrupts();
        cpu.disable_interrupts();
        cpu.enable_interrupts();
        assert!(!cpu.is_masked());
    }

    #[test]
    fn test_interrupt_free_returns_value() {
        let cpu = MockCpu::new();
        let value = interrupt_free(&cpu, || {
            assert!(cpu.is_masked());
            42
        });
        assert_eq!(value, 42);
        assert!(!cpu.is_masked());
    }

    #[test]
    fn test_idle_until_skips_idle_when_ready() {
        let cpu = MockCpu::new();
        idle_until(&cpu, || true);
        assert_eq!(cpu.idle_count(), 0);
    }

    #[test]
    fn test_idle_until_wakes_on_interrupt() {
        let ready = Cell::new(false);
        let cpu = MockCpu::new();
        cpu.on_idle(|| ready.set(true));

        idle_until(&cpu, || ready.get());

        assert_eq!(cpu.idle_count(), 1);
        assert!(!cpu.is_masked());
    }

    #[test]
    fn test_recheck_catches_wakeup_before_mask() {
        // The wake-up source fires between the loop condition and the
        // mask: the masked re-check sees it and the core never idles.
        let ready = Cell::new(false);
        let checks = Cell::new(0u32);
        let cpu = MockCpu::new();

        idle_until(&cpu, || {
            checks.set(checks.get() + 1);
            if checks.get() == 1 {
                ready.set(true);
                return false;
            }
            ready.get()
        });

        assert_eq!(cpu.idle_count(), 0);
    }

    #[test]
    fn test_expired_deadline_checks_once() {
        let clock = MockClock::starting_at(500);
        let cpu = MockCpu::new();
        let checks = Cell::new(0u32);

        let ready = idle_until_deadline(&cpu, &clock, Deadline::new(500, 0), || {
            checks.set(checks.get() + 1);
            false
        });

        assert!(!ready);
        assert_eq!(cpu.idle_count(), 0);
        assert!(checks.get() >= 1);
    }

    #[test]
    fn test_deadline_bounds_idle() {
        let clock = MockClock::starting_at(0);
        let cpu = MockCpu::new();
        cpu.on_idle(|| clock.advance(2));

        let ready = idle_until_deadline(&cpu, &clock, Deadline::new(0, 10), || false);

        assert!(!ready);
        assert_eq!(cpu.idle_count(), 5);
    }
}
