//! Millisecond tick from the embassy time driver

use embassy_time::Instant;
use modlink_hal::MillisClock;

/// Uptime in milliseconds, truncated to 32 bits
///
/// Wraps after about 49.7 days; consumers compare times with wrapping
/// subtraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl MillisClock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
