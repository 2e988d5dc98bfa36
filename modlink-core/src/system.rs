//! Module-system facade
//!
//! The module server talks to the platform through one flat surface: UART
//! access, the message wake-up gate, the sensor interrupt and time. This
//! type bundles the owned context objects behind that surface so the
//! server receives a single handle instead of reaching for globals.

use modlink_hal::{DmaUart, InputPin, InterruptControl, MillisClock};

use crate::config::DEFAULT_RX_CAPACITY;
use crate::gate::EventGate;
use crate::notifier::{SensorCallback, SensorInterrupt};
use crate::time;
use crate::transport::{ByteConsumer, SerialTransport};

/// Platform services consumed by the module server
pub struct ModuleSystem<'a, U, C, K, P, const N: usize = DEFAULT_RX_CAPACITY>
where
    U: 'static,
    P: InputPin,
{
    transport: &'static SerialTransport<U, N>,
    gate: &'a EventGate,
    sensor: &'a SensorInterrupt<P>,
    cpu: C,
    clock: K,
}

impl<'a, U, C, K, P, const N: usize> ModuleSystem<'a, U, C, K, P, N>
where
    U: DmaUart + 'static,
    C: InterruptControl,
    K: MillisClock,
    P: InputPin,
{
    pub fn new(
        transport: &'static SerialTransport<U, N>,
        gate: &'a EventGate,
        sensor: &'a SensorInterrupt<P>,
        cpu: C,
        clock: K,
    ) -> Self {
        Self {
            transport,
            gate,
            sensor,
            cpu,
            clock,
        }
    }

    /// Current wrapping millisecond tick
    pub fn get_time(&self) -> u32 {
        self.clock.now_ms()
    }

    /// Accepted for interface compatibility; this platform has a single
    /// run mode and sleeps only through the idle instruction.
    pub fn set_lowest_power_state(&self, _req_power_state: u32) {}

    pub fn uart_register_read_callback(&self, callback: Option<ByteConsumer>) {
        self.transport.register_consumer(callback);
    }

    pub fn get_max_uart_baudrate(&self) -> u32 {
        self.transport.max_baud_rate()
    }

    /// See [`SerialTransport::set_baud_rate`]
    pub fn uart_set_baudrate(&self, baudrate: u32) -> Result<(), U::Error> {
        self.transport.set_baud_rate(baudrate)
    }

    /// Blocking transmit; `false` if the transmit could not be issued
    pub fn uart_write_buffer(&self, buffer: &[u8]) -> bool {
        self.transport.write(&self.cpu, buffer).is_ok()
    }

    pub fn uart_get_error_count(&self) -> u32 {
        self.transport.error_count()
    }

    /// Wake a pending [`wait_for_message`](Self::wait_for_message)
    pub fn signal_message(&self) {
        self.gate.signal();
    }

    /// Idle until a message is signaled or `timeout_ms` has elapsed
    ///
    /// Returns `true` if a message was signaled.
    pub fn wait_for_message(&self, timeout_ms: u32) -> bool {
        self.gate.wait(&self.cpu, &self.clock, timeout_ms)
    }

    pub fn register_sensor_interrupt_callback(&self, callback: Option<SensorCallback>) {
        self.sensor.register(callback);
    }

    pub fn is_sensor_interrupt_active(&self) -> bool {
        self.sensor.is_active()
    }

    pub fn sleep_ms(&self, ms: u32) {
        time::sleep_ms(&self.cpu, &self.clock, ms);
    }

    pub fn sleep_us(&self, us: u32) {
        time::sleep_us(&self.cpu, &self.clock, us);
    }
}
