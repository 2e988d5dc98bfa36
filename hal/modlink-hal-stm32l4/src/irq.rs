//! Interrupt masking and idle for Cortex-M
#![allow(unsafe_code)]

use cortex_m::{asm, interrupt};
use modlink_hal::InterruptControl;

/// PRIMASK-based interrupt control for a single-core Cortex-M
///
/// The barriers make the mask change take effect before the next
/// instruction, so a flag re-check after masking cannot race an interrupt
/// that was already in flight.
#[derive(Debug, Clone, Copy, Default)]
pub struct CortexM;

impl InterruptControl for CortexM {
    #[inline]
    fn disable_interrupts(&self) {
        interrupt::disable();
        asm::dsb();
        asm::isb();
    }

    #[inline]
    fn enable_interrupts(&self) {
        // SAFETY: the idle loops and the interrupt-free guard are the only
        // callers, and always pair this with a preceding disable
        unsafe { interrupt::enable() };
        asm::dsb();
        asm::isb();
    }

    #[inline]
    fn wait_for_interrupt(&self) {
        // With PRIMASK set, a pending interrupt still ends `wfi`; its
        // handler runs once the caller unmasks.
        asm::wfi();
    }
}
