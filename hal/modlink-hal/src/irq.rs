//! Interrupt control abstractions
//!
//! On a single-core microcontroller the only source of preemption is an
//! interrupt, so mutual exclusion with interrupt handlers is a matter of
//! masking interrupts globally for a short window. The same mask is what
//! makes a "check flag, then sleep" sequence race-free: with interrupts
//! masked, an interrupt that becomes pending after the check still wakes
//! the core from its idle instruction, and its handler runs as soon as
//! the mask is lifted.

/// Global interrupt mask and low-power wait
///
/// The mask is flat: there is no nesting count, and
/// [`enable_interrupts`](InterruptControl::enable_interrupts) always
/// unmasks regardless of how many times interrupts were disabled.
pub trait InterruptControl {
    /// Mask all maskable interrupts
    ///
    /// The mask must be in effect before any memory access that follows
    /// the call (instruction and data barriers on Cortex-M).
    fn disable_interrupts(&self);

    /// Unmask interrupts
    ///
    /// A handler that became pending while masked runs immediately after
    /// this returns.
    fn enable_interrupts(&self);

    /// Idle the core until an interrupt is pending
    ///
    /// Called with interrupts masked. Must return once any interrupt is
    /// pending even though the mask prevents its handler from running.
    /// Spurious returns are allowed; callers always re-check their
    /// condition.
    fn wait_for_interrupt(&self);
}

impl<T: InterruptControl + ?Sized> InterruptControl for &T {
    fn disable_interrupts(&self) {
        (**self).disable_interrupts()
    }

    fn enable_interrupts(&self) {
        (**self).enable_interrupts()
    }

    fn wait_for_interrupt(&self) {
        (**self).wait_for_interrupt()
    }
}
