//! Serial Reception Engine
//!
//! Turns receive-timeout, buffer-full and error interrupts of a DMA-backed
//! UART into an in-order byte stream for a registered consumer, and
//! provides a blocking DMA transmit.
//!
//! # Reception
//!
//! The receive DMA runs into a fixed buffer while the hardware
//! receive-timeout watches the line. When the line has been idle for the
//! configured number of bit periods the timeout interrupt fires even
//! though the buffer is not full, so short packets are delivered without
//! waiting for more bytes:
//!
//! ```text
//!   line:   ▌▌▌▌▌▌ ........ idle ........
//!   DMA:    [b0 b1 b2 b3 b4 b5 __ __ __ __]   remaining = 4
//!   RTO:                        ▲ pending = capacity - remaining = 6
//!           stop DMA, deliver b0..b5, re-arm DMA into the same buffer
//! ```
//!
//! A line error (overrun, framing, ...) is counted, the transfer is
//! aborted and DMA is re-armed with the receive-timeout left as it is.
//! A fresh session (first consumer registration, baud change) programs
//! the receive-timeout again before arming DMA.

use core::cell::RefCell;

use critical_section::Mutex;
use portable_atomic::{AtomicBool, Ordering};

use modlink_hal::{DmaUart, InterruptControl, UartErrorKind, UartEvent};

use crate::config::{TransportConfig, DEFAULT_RX_CAPACITY};
use crate::critical::idle_until;

/// Status passed with every byte delivered on the receive-timeout path
pub const RX_STATUS_OK: u32 = 0;

/// Per-byte consumer, called from interrupt context
///
/// Arguments are the received byte and a status code ([`RX_STATUS_OK`]).
/// The consumer must not block.
pub type ByteConsumer = fn(u8, u32);

/// Reasons [`SerialTransport::write`] can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError<E> {
    /// Nothing to transmit
    Empty,
    /// The peripheral refused the transmit
    Uart(E),
}

/// Live state of one UART instance
struct ReceiveSession<U, const N: usize> {
    uart: U,
    config: TransportConfig,
    rx_buffer: [u8; N],
    consumer: Option<ByteConsumer>,
    error_count: u32,
}

impl<U: DmaUart, const N: usize> ReceiveSession<U, N> {
    /// Abort, program the receive-timeout and arm DMA
    fn start(&mut self) {
        self.uart.abort_receive();
        self.uart
            .enable_receiver_timeout(self.config.receiver_timeout_bits);
        self.arm();
    }

    /// Arm DMA into the receive buffer, leaving the receive-timeout alone
    fn arm(&mut self) {
        if self.uart.start_receive_dma(&mut self.rx_buffer).is_err() {
            warn!("receive DMA could not be armed");
        }
    }

    /// Stop the DMA, copy out what it wrote since it was armed, then re-arm
    fn drain(&mut self, out: &mut [u8; N]) -> usize {
        self.uart.abort_receive();
        let pending = N - self.uart.dma_remaining().min(N);
        out[..pending].copy_from_slice(&self.rx_buffer[..pending]);
        self.arm();
        pending
    }

    fn recover(&mut self, kind: UartErrorKind) {
        self.error_count = self.error_count.saturating_add(1);
        warn!("uart error {:?}, total {}", kind, self.error_count);
        self.uart.abort_receive();
        self.arm();
    }
}

/// DMA-backed serial transport
///
/// One instance owns one peripheral. The transport is `Sync` and can live
/// in a `static` shared by the foreground and the interrupt handlers; the
/// platform interrupt handler feeds it through
/// [`handle_event`](SerialTransport::handle_event).
///
/// `N` is the receive DMA buffer capacity.
///
/// The receive DMA writes into a buffer inside the transport, so every
/// operation that can arm reception takes `&'static self`: the transport
/// lives in a `static` (or is leaked) and never moves while DMA runs.
pub struct SerialTransport<U, const N: usize = DEFAULT_RX_CAPACITY> {
    session: Mutex<RefCell<ReceiveSession<U, N>>>,
    tx_complete: AtomicBool,
}

impl<U: DmaUart, const N: usize> SerialTransport<U, N> {
    /// Wrap a peripheral; nothing is touched until [`init`](Self::init)
    pub const fn new(uart: U, config: TransportConfig) -> Self {
        Self {
            session: Mutex::new(RefCell::new(ReceiveSession {
                uart,
                config,
                rx_buffer: [0; N],
                consumer: None,
                error_count: 0,
            })),
            tx_complete: AtomicBool::new(false),
        }
    }

    /// Initialize the peripheral with the configured line settings
    ///
    /// Reception starts with the first consumer registration.
    pub fn init(&self) -> Result<(), U::Error> {
        self.with_session(|session| {
            let config = session.config.uart;
            session.uart.init(&config)
        })
    }

    /// Install or remove the byte consumer
    ///
    /// Registering a consumer while none is installed starts a fresh
    /// reception session. Swapping one consumer for another leaves an
    /// in-flight reception untouched. Removing the consumer keeps
    /// reception running; received bytes are then discarded.
    pub fn register_consumer(&'static self, consumer: Option<ByteConsumer>) {
        self.with_session(|session| {
            let was_idle = session.consumer.is_none();
            session.consumer = consumer;
            if was_idle && consumer.is_some() {
                debug!("reception session started");
                session.start();
            }
        });
    }

    /// Highest baud rate [`set_baud_rate`](Self::set_baud_rate) accepts
    pub fn max_baud_rate(&self) -> u32 {
        self.with_session(|session| session.config.max_baudrate)
    }

    /// Currently configured baud rate
    pub fn baud_rate(&self) -> u32 {
        self.with_session(|session| session.config.uart.baudrate)
    }

    /// Reconfigure the line speed
    ///
    /// Rates above [`max_baud_rate`](Self::max_baud_rate) are ignored and
    /// leave the current configuration and reception untouched. Otherwise
    /// reception is aborted, the peripheral is reinitialized and a fresh
    /// session is started.
    ///
    /// An error means the peripheral could not be reinitialized; the link
    /// is down and the caller's fatal-error handling takes over.
    ///
    /// Must not race with an active DMA reception; call it between
    /// messages.
    pub fn set_baud_rate(&'static self, rate: u32) -> Result<(), U::Error> {
        self.with_session(|session| {
            if !session.config.accepts_baudrate(rate) {
                debug!("baud rate {} above maximum, ignored", rate);
                return Ok(());
            }

            session.uart.abort_receive();
            session.uart.deinit();
            session.config.uart = session.config.uart.with_baudrate(rate);
            let config = session.config.uart;
            session.uart.init(&config)?;
            session.start();
            debug!("baud rate set to {}", rate);
            Ok(())
        })
    }

    /// Transmit `data` and idle until the transmission has completed
    ///
    /// Returns without blocking if `data` is empty or the transmit could
    /// not be issued. Only one transmit may be outstanding; callers
    /// serialize among themselves. Must not be called from an interrupt
    /// handler: it waits for the transmit-complete interrupt.
    pub fn write<C>(&self, cpu: &C, data: &[u8]) -> Result<(), WriteError<U::Error>>
    where
        C: InterruptControl + ?Sized,
    {
        if data.is_empty() {
            return Err(WriteError::Empty);
        }
        self.tx_complete.store(false, Ordering::Release);
        self.with_session(|session| session.uart.start_transmit_dma(data))
            .map_err(WriteError::Uart)?;
        idle_until(cpu, || self.tx_complete.load(Ordering::Acquire));
        Ok(())
    }

    /// Reception errors observed since startup
    pub fn error_count(&self) -> u32 {
        self.with_session(|session| session.error_count)
    }

    /// Dispatch an interrupt-level event
    ///
    /// Called by the platform interrupt handler that owns this transport's
    /// peripheral. Received bytes are handed to the consumer after the
    /// session lock is released, in arrival order.
    pub fn handle_event(&'static self, event: UartEvent) {
        match event {
            UartEvent::ReceiveTimeout | UartEvent::ReceiveComplete => self.deliver_pending(),
            UartEvent::Error(kind) => self.with_session(|session| session.recover(kind)),
            UartEvent::TransmitComplete => self.tx_complete.store(true, Ordering::Release),
        }
    }

    fn deliver_pending(&self) {
        let mut bytes = [0u8; N];
        let (len, consumer) = self.with_session(|session| {
            let len = session.drain(&mut bytes);
            (len, session.consumer)
        });

        let Some(consumer) = consumer else {
            trace!("no consumer, {} bytes dropped", len);
            return;
        };
        for &byte in &bytes[..len] {
            consumer(byte, RX_STATUS_OK);
        }
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut ReceiveSession<U, N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.session.borrow_ref_mut(cs)))
    }
}
