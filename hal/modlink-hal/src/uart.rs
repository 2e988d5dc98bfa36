//! UART serial communication abstractions
//!
//! The transport drives a UART whose receiver writes into memory through
//! DMA and raises a receive-timeout interrupt once the line has been idle
//! for a configured number of bit periods. That pairing lets packets
//! shorter than the DMA buffer be delivered promptly.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// DMA-backed UART with hardware receive-timeout
///
/// Implementations own the peripheral registers and the DMA channels.
/// Every method is called either from interrupt context or with
/// interrupts masked, so implementations need no locking of their own.
pub trait DmaUart {
    /// Error type for peripheral operations
    type Error;

    /// Initialize the peripheral with the given line configuration
    ///
    /// Failure here is unrecoverable for the transport.
    fn init(&mut self, config: &UartConfig) -> Result<(), Self::Error>;

    /// Disable the peripheral and release its line configuration
    fn deinit(&mut self);

    /// Enable the receive-timeout and program its length in bit periods
    ///
    /// The setting persists until the next [`deinit`](DmaUart::deinit).
    fn enable_receiver_timeout(&mut self, bit_periods: u32);

    /// Start a DMA reception into `buffer`
    ///
    /// The transfer keeps writing into `buffer` after this call returns.
    /// The caller keeps the buffer alive and in place until
    /// [`abort_receive`](DmaUart::abort_receive) or the next call to this
    /// method.
    fn start_receive_dma(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Abort any reception in progress
    fn abort_receive(&mut self);

    /// Bytes the receive DMA can still accept before the buffer is full
    ///
    /// Stable only once the reception has been aborted.
    fn dma_remaining(&mut self) -> usize;

    /// Start a DMA transmission of `data`
    ///
    /// Completion is reported through [`UartEvent::TransmitComplete`].
    /// Returns an error without side effects if the transmitter is busy
    /// or `data` is empty; an empty transfer never completes.
    fn start_transmit_dma(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// Interrupt-level events produced by the platform layer
///
/// The chip crate decodes status registers into these events and feeds
/// them to the transport that owns the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartEvent {
    /// The line went idle for the configured number of bit periods
    ReceiveTimeout,
    /// The receive DMA filled the whole buffer
    ReceiveComplete,
    /// A reception error (anything other than the receive-timeout)
    Error(UartErrorKind),
    /// The last DMA transmission left the shift register
    TransmitComplete,
}

/// Kinds of reception errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartErrorKind {
    /// Receive data register overwritten before it was read
    Overrun,
    /// Stop bit missing
    Framing,
    /// Noise detected on the line
    Noise,
    /// Parity mismatch
    Parity,
    /// DMA transfer error
    Dma,
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl UartConfig {
    /// 8N1 at the given baud rate
    pub const fn new(baudrate: u32) -> Self {
        Self {
            baudrate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }

    /// Same configuration at a different baud rate
    pub const fn with_baudrate(self, baudrate: u32) -> Self {
        Self { baudrate, ..self }
    }

    /// Bits on the wire per character, start and stop bits included
    pub const fn bits_per_char(&self) -> u32 {
        let data = match self.data_bits {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
            DataBits::Nine => 9,
        };
        let parity = match self.parity {
            Parity::None => 0,
            Parity::Even | Parity::Odd => 1,
        };
        let stop = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        1 + data + parity + stop
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::new(115_200)
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopBits {
    One,
    Two,
}
