//! Board-agnostic serial link and wake-up logic for the module server
//!
//! This crate contains everything between the interrupt vectors and the
//! module server that does not depend on a specific chip:
//!
//! - Serial Reception Engine: DMA + receive-timeout framing into a
//!   per-byte consumer, with error counting and automatic recovery
//! - Event Gate: coalescing signal/wait that idles the core without a
//!   lost-wakeup race
//! - Critical-section discipline shared by both
//! - Sensor-interrupt notifier
//! - Wraparound-safe millisecond time arithmetic and delays
//! - Transport configuration
//! - The flat module-system facade the server calls into
//!
//! Hardware is reached only through the `modlink-hal` traits, so every
//! state machine here can be driven from host tests by injecting
//! synthetic interrupt events.

#![no_std]
#![deny(unsafe_code)]

#[cfg(any(test, feature = "alloc"))]
extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod fmt;

pub mod config;
pub mod critical;
pub mod gate;
#[cfg(any(test, feature = "std"))]
pub mod host;
#[cfg(any(test, feature = "alloc"))]
pub mod mem;
pub mod notifier;
pub mod system;
pub mod time;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, TransportConfig};
pub use gate::EventGate;
pub use notifier::SensorInterrupt;
pub use system::ModuleSystem;
pub use transport::{ByteConsumer, SerialTransport, WriteError, RX_STATUS_OK};
