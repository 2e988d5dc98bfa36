//! Sensor-interrupt notifier
//!
//! The radar sensor raises a dedicated line when it has data ready. The
//! platform routes the edge interrupt to [`SensorInterrupt::on_edge`], which
//! calls the registered callback from interrupt context. The current level
//! of the line can be sampled at any time without consuming edges.

use core::cell::Cell;

use critical_section::Mutex;
use modlink_hal::InputPin;

/// Zero-argument callback invoked from interrupt context on each edge
pub type SensorCallback = fn();

/// Edge notifier and level query for the sensor interrupt line
pub struct SensorInterrupt<P: InputPin> {
    pin: P,
    callback: Mutex<Cell<Option<SensorCallback>>>,
}

impl<P: InputPin> SensorInterrupt<P> {
    /// Wrap the input pin connected to the sensor interrupt line
    pub const fn new(pin: P) -> Self {
        Self {
            pin,
            callback: Mutex::new(Cell::new(None)),
        }
    }

    /// Install or remove the edge callback
    pub fn register(&self, callback: Option<SensorCallback>) {
        critical_section::with(|cs| self.callback.borrow(cs).set(callback));
    }

    /// Called by the platform edge interrupt handler
    ///
    /// The callback runs after the lock is released, so it may register a
    /// different callback.
    pub fn on_edge(&self) {
        let callback = critical_section::with(|cs| self.callback.borrow(cs).get());
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Whether the line is currently active (high)
    pub fn is_active(&self) -> bool {
        self.pin.is_high()
    }
}
