//! Transport configuration
//!
//! Plain `Copy` types with `const` constructors so a transport can be
//! built directly in a `static`. With the `serde` feature the
//! configuration can be persisted as postcard binary data.

use modlink_hal::UartConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Highest baud rate the transport accepts
pub const DEFAULT_MAX_BAUDRATE: u32 = 1_000_000;

/// Idle time on the line, in bit periods, before a receive-timeout fires
pub const DEFAULT_RECEIVER_TIMEOUT_BITS: u32 = 100;

/// The receive-timeout length register is 24 bits wide
pub const MAX_RECEIVER_TIMEOUT_BITS: u32 = 0x00FF_FFFF;

/// Default receive DMA buffer capacity in bytes
pub const DEFAULT_RX_CAPACITY: usize = 10;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Baud rate of zero
    ZeroBaudrate,
    /// Baud rate above the configured maximum
    BaudrateAboveMax,
    /// Receive-timeout of zero or wider than the hardware register
    InvalidReceiverTimeout,
    /// Serialized form did not fit or could not be decoded
    Encoding,
}

/// Serial transport configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransportConfig {
    /// Line configuration applied at init and on every baud change
    pub uart: UartConfig,
    /// Baud rate changes above this value are ignored
    pub max_baudrate: u32,
    /// Receive-timeout length in bit periods
    pub receiver_timeout_bits: u32,
}

impl TransportConfig {
    /// Default limits with the given line configuration
    pub const fn new(uart: UartConfig) -> Self {
        Self {
            uart,
            max_baudrate: DEFAULT_MAX_BAUDRATE,
            receiver_timeout_bits: DEFAULT_RECEIVER_TIMEOUT_BITS,
        }
    }

    /// Check the configuration against its own limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uart.baudrate == 0 {
            return Err(ConfigError::ZeroBaudrate);
        }
        if self.uart.baudrate > self.max_baudrate {
            return Err(ConfigError::BaudrateAboveMax);
        }
        if self.receiver_timeout_bits == 0
            || self.receiver_timeout_bits > MAX_RECEIVER_TIMEOUT_BITS
        {
            return Err(ConfigError::InvalidReceiverTimeout);
        }
        Ok(())
    }

    /// Whether a baud change to `rate` would be applied
    pub fn accepts_baudrate(&self, rate: u32) -> bool {
        rate <= self.max_baudrate
    }

    /// Serialize into `buffer` as postcard binary data
    ///
    /// Returns the number of bytes written.
    #[cfg(feature = "serde")]
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, ConfigError> {
        postcard::to_slice(self, buffer)
            .map(|used| used.len())
            .map_err(|_| ConfigError::Encoding)
    }

    /// Deserialize from postcard binary data and validate the result
    #[cfg(feature = "serde")]
    pub fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Encoding)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(UartConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TransportConfig::default();
        assert_eq!(config.max_baudrate, 1_000_000);
        assert_eq!(config.receiver_timeout_bits, 100);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_baudrate() {
        let config = TransportConfig::new(UartConfig::new(0));
        assert_eq!(config.validate(), Err(ConfigError::ZeroBaudrate));
    }

    #[test]
    fn test_rejects_baudrate_above_max() {
        let config = TransportConfig::new(UartConfig::new(DEFAULT_MAX_BAUDRATE + 1));
        assert_eq!(config.validate(), Err(ConfigError::BaudrateAboveMax));
    }

    #[test]
    fn test_max_baudrate_is_inclusive() {
        let config = TransportConfig::default();
        assert!(config.accepts_baudrate(DEFAULT_MAX_BAUDRATE));
        assert!(!config.accepts_baudrate(DEFAULT_MAX_BAUDRATE + 1));
    }

    #[test]
    fn test_receiver_timeout_bounds() {
        let mut config = TransportConfig::default();
        config.receiver_timeout_bits = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidReceiverTimeout)
        );

        config.receiver_timeout_bits = MAX_RECEIVER_TIMEOUT_BITS;
        assert_eq!(config.validate(), Ok(()));

        config.receiver_timeout_bits = MAX_RECEIVER_TIMEOUT_BITS + 1;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidReceiverTimeout)
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_decode_rejects_invalid_config() {
        let mut config = TransportConfig::default();
        config.receiver_timeout_bits = 0;
        let mut buffer = [0u8; 32];
        let len = config.encode(&mut buffer).unwrap();
        assert_eq!(
            TransportConfig::decode(&buffer[..len]),
            Err(ConfigError::InvalidReceiverTimeout)
        );
    }
}
