//! Sensor interrupt line

use embassy_stm32::gpio::Input;
use modlink_hal::InputPin;

/// Input pin wired to the radar sensor's interrupt output
///
/// Edge detection is configured by the board through EXTI; this wrapper
/// only samples the level.
pub struct SensorPin<'d> {
    input: Input<'d>,
}

impl<'d> SensorPin<'d> {
    pub fn new(input: Input<'d>) -> Self {
        Self { input }
    }
}

impl InputPin for SensorPin<'_> {
    fn is_high(&self) -> bool {
        self.input.is_high()
    }
}
