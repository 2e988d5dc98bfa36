//! modlink Hardware Abstraction Layer
//!
//! This crate defines the hardware seams of the modlink transport. The
//! board-agnostic logic in `modlink-core` is written against these traits,
//! and chip-specific crates (STM32L4, host simulation, test doubles)
//! implement them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Module server (transport consumer)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  modlink-core (transport, event gate)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  modlink-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ modlink-hal-  │       │  host / mock  │
//! │    stm32l4    │       │  (std, tests) │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::DmaUart`] - DMA-backed UART with hardware receive-timeout
//! - [`irq::InterruptControl`] - Global interrupt mask and wait-for-interrupt
//! - [`time::MillisClock`] - Wrapping millisecond tick
//! - [`gpio::InputPin`] - Digital input (sensor interrupt line)

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod irq;
pub mod time;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::InputPin;
pub use irq::InterruptControl;
pub use time::MillisClock;
pub use uart::{DmaUart, UartConfig, UartErrorKind, UartEvent};
