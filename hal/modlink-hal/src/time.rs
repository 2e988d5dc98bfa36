//! Time source abstraction

/// Monotonic millisecond tick
///
/// The counter must use all 32 bits: it counts up to `u32::MAX` and then
/// wraps to `0`. Consumers only ever subtract two readings with
/// wrapping arithmetic, never compare absolute values.
pub trait MillisClock {
    /// Current time in milliseconds
    fn now_ms(&self) -> u32;
}

impl<T: MillisClock + ?Sized> MillisClock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}
