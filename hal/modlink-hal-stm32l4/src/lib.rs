//! STM32L4 bindings for the modlink serial transport
//!
//! Implements the `modlink-hal` traits for the STM32L476 found on the radar
//! module:
//!
//! - [`CortexM`] - PRIMASK masking and `wfi` for the idle loops
//! - [`EmbassyClock`] - wrapping millisecond tick from the embassy time driver
//! - [`RegisterUart`] - USART with receiver timeout, fed by two DMA channels
//! - [`SensorPin`] - level of the sensor interrupt line
//!
//! # Features
//!
//! - `stm32l476rg` / `stm32l476vg` - select the chip
//! - `defmt` - Enable debug formatting support
//!
//! # Usage
//!
//! The board crate places the transport in a `static` and forwards the
//! USART and DMA interrupts to it:
//!
//! ```ignore
//! const RX: DmaChannel = DmaChannel::new(pac::DMA1, 5, 2);
//! const TX: DmaChannel = DmaChannel::new(pac::DMA1, 6, 2);
//!
//! static LINK: SerialTransport<RegisterUart> =
//!     SerialTransport::new(RegisterUart::new(pac::USART2, RX, TX, 80_000_000), TransportConfig::new(UART));
//!
//! #[interrupt]
//! fn USART2() {
//!     for event in decode_usart_events(pac::USART2) {
//!         LINK.handle_event(event);
//!     }
//! }
//!
//! #[interrupt]
//! fn DMA1_CH6() {
//!     if let Some(event) = RX.take_event() {
//!         LINK.handle_event(event);
//!     }
//! }
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod irq;
pub mod time;
pub mod uart;

pub use gpio::SensorPin;
pub use irq::CortexM;
pub use time::EmbassyClock;
pub use uart::{decode_usart_events, DmaChannel, RegisterUart, UartBusError};
