//! USART with receiver timeout, driven through DMA
//!
//! Register-level binding rather than the embassy `Uart` driver: the
//! transport needs the receive-timeout interrupt and the raw DMA counter,
//! and must be callable from interrupt handlers without an executor.

use embassy_stm32::pac::bdma::{vals as dma_vals, Dma};
use embassy_stm32::pac::usart::{regs, Usart};
use embassy_stm32::usart::Error as UsartError;
use heapless::Vec;
use modlink_hal::{DataBits, DmaUart, Parity, StopBits, UartConfig, UartErrorKind, UartEvent};

// CR1 word length and parity bits
const CR1_M1: u32 = 1 << 28;
const CR1_M0: u32 = 1 << 12;
const CR1_PCE: u32 = 1 << 10;
const CR1_PS: u32 = 1 << 9;
const CR1_FRAME_MASK: u32 = CR1_M1 | CR1_M0 | CR1_PCE | CR1_PS;

// CR2 stop bits field
const CR2_STOP_MASK: u32 = 0b11 << 12;
const CR2_STOP_TWO: u32 = 0b10 << 12;

// ISR flags cleared by writing the same bit position to ICR
const ISR_PE: u32 = 1 << 0;
const ISR_FE: u32 = 1 << 1;
const ISR_NE: u32 = 1 << 2;
const ISR_ORE: u32 = 1 << 3;
const ISR_TC: u32 = 1 << 6;
const ISR_RTOF: u32 = 1 << 11;
const ISR_CLEARABLE: u32 = ISR_PE | ISR_FE | ISR_NE | ISR_ORE | ISR_TC | ISR_RTOF;

/// Largest receiver timeout the RTOR field holds
const MAX_RTO: u32 = 0x00FF_FFFF;

/// Error from UART operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartBusError {
    /// Framing error
    Framing,
    /// Noise error
    Noise,
    /// Overrun error
    Overrun,
    /// Parity error
    Parity,
    /// Buffer longer than one DMA transfer
    BufferTooLong,
    /// Nothing to transmit
    EmptyBuffer,
    /// Transmit DMA still running
    Busy,
    /// Baud rate not reachable from the kernel clock
    InvalidBaudrate,
    /// Data bits and parity do not fit the word length
    UnsupportedFraming,
    /// Other error
    Other,
}

impl UartBusError {
    /// Line error kind as reported to the transport, if this is one
    pub fn kind(self) -> Option<UartErrorKind> {
        match self {
            UartBusError::Framing => Some(UartErrorKind::Framing),
            UartBusError::Noise => Some(UartErrorKind::Noise),
            UartBusError::Overrun => Some(UartErrorKind::Overrun),
            UartBusError::Parity => Some(UartErrorKind::Parity),
            _ => None,
        }
    }
}

impl From<UsartError> for UartBusError {
    fn from(e: UsartError) -> Self {
        match e {
            UsartError::Framing => UartBusError::Framing,
            UsartError::Noise => UartBusError::Noise,
            UsartError::Overrun => UartBusError::Overrun,
            UsartError::Parity => UartBusError::Parity,
            UsartError::BufferTooLong => UartBusError::BufferTooLong,
            _ => UartBusError::Other,
        }
    }
}

/// One channel of a DMA controller with its request mapping
#[derive(Clone, Copy)]
pub struct DmaChannel {
    dma: Dma,
    channel: usize,
    request: u8,
}

impl DmaChannel {
    /// `channel` is zero-based; `request` is the CSELR mapping for the USART
    pub const fn new(dma: Dma, channel: usize, request: u8) -> Self {
        Self {
            dma,
            channel,
            request,
        }
    }

    fn is_enabled(&self) -> bool {
        self.dma.ch(self.channel).cr().read().en()
    }

    fn stop(&self) {
        self.dma.ch(self.channel).cr().modify(|w| w.set_en(false));
    }

    fn remaining(&self) -> usize {
        self.dma.ch(self.channel).ndtr().read().ndt() as usize
    }

    fn start(&self, peripheral: u32, memory: u32, len: usize, dir: dma_vals::Dir) {
        let ch = self.dma.ch(self.channel);
        self.stop();
        self.clear_flags();
        self.dma
            .cselr()
            .modify(|w| w.set_cs(self.channel, self.request));
        ch.par().write_value(peripheral);
        ch.mar().write_value(memory);
        ch.ndtr().write(|w| w.set_ndt(len as u16));
        ch.cr().write(|w| {
            w.set_dir(dir);
            w.set_psize(dma_vals::Size::BITS8);
            w.set_msize(dma_vals::Size::BITS8);
            w.set_minc(true);
            w.set_tcie(dir == dma_vals::Dir::FROM_PERIPHERAL);
            w.set_teie(true);
            w.set_en(true);
        });
    }

    fn clear_flags(&self) {
        self.dma.ifcr().write(|w| w.set_gif(self.channel, true));
    }

    /// Read and clear this channel's interrupt flags
    ///
    /// Call from the receive channel's DMA interrupt. A transfer error is
    /// reported as [`UartErrorKind::Dma`], a completed transfer as a full
    /// receive buffer.
    pub fn take_event(&self) -> Option<UartEvent> {
        let isr = self.dma.isr().read();
        let event = if isr.teif(self.channel) {
            Some(UartEvent::Error(UartErrorKind::Dma))
        } else if isr.tcif(self.channel) {
            Some(UartEvent::ReceiveComplete)
        } else {
            None
        };
        self.clear_flags();
        event
    }
}

/// USART plus receive and transmit DMA channels
pub struct RegisterUart {
    usart: Usart,
    rx: DmaChannel,
    tx: DmaChannel,
    kernel_clock_hz: u32,
}

impl RegisterUart {
    /// `kernel_clock_hz` is the USART kernel clock the baud divisor is
    /// computed from
    pub const fn new(usart: Usart, rx: DmaChannel, tx: DmaChannel, kernel_clock_hz: u32) -> Self {
        Self {
            usart,
            rx,
            tx,
            kernel_clock_hz,
        }
    }

    fn frame_bits(config: &UartConfig) -> Result<u32, UartBusError> {
        // The word length counts the parity bit
        let word = match (config.data_bits, config.parity) {
            (DataBits::Seven, Parity::None) => CR1_M1,
            (DataBits::Seven, _) | (DataBits::Eight, Parity::None) => 0,
            (DataBits::Eight, _) | (DataBits::Nine, Parity::None) => CR1_M0,
            (DataBits::Nine, _) => return Err(UartBusError::UnsupportedFraming),
        };
        let parity = match config.parity {
            Parity::None => 0,
            Parity::Even => CR1_PCE,
            Parity::Odd => CR1_PCE | CR1_PS,
        };
        Ok(word | parity)
    }
}

/// Oversampling-by-16 divisor, rounded to nearest
fn baud_divisor(kernel_clock_hz: u32, baudrate: u32) -> Result<u32, UartBusError> {
    if baudrate == 0 {
        return Err(UartBusError::InvalidBaudrate);
    }
    let div = kernel_clock_hz.saturating_add(baudrate / 2) / baudrate;
    if !(16..=0xFFFF).contains(&div) {
        return Err(UartBusError::InvalidBaudrate);
    }
    Ok(div)
}

impl DmaUart for RegisterUart {
    type Error = UartBusError;

    fn init(&mut self, config: &UartConfig) -> Result<(), Self::Error> {
        let div = baud_divisor(self.kernel_clock_hz, config.baudrate)?;
        let frame = Self::frame_bits(config)?;
        let stop = match config.stop_bits {
            StopBits::One => 0,
            StopBits::Two => CR2_STOP_TWO,
        };

        let r = self.usart;
        r.cr1().modify(|w| w.set_ue(false));
        r.brr().write_value(regs::Brr(div));
        r.cr1().modify(|w| w.0 = (w.0 & !CR1_FRAME_MASK) | frame);
        r.cr2().modify(|w| w.0 = (w.0 & !CR2_STOP_MASK) | stop);
        r.cr3().modify(|w| {
            w.set_dmar(true);
            w.set_dmat(true);
            w.set_eie(true);
        });
        r.icr().write_value(regs::Icr(ISR_CLEARABLE));
        r.cr1().modify(|w| {
            w.set_peie(config.parity != Parity::None);
            w.set_re(true);
            w.set_te(true);
            w.set_ue(true);
        });
        Ok(())
    }

    fn deinit(&mut self) {
        self.rx.stop();
        self.tx.stop();
        let r = self.usart;
        r.cr1().modify(|w| {
            w.set_ue(false);
            w.set_re(false);
            w.set_te(false);
            w.set_rtoie(false);
            w.set_tcie(false);
            w.set_peie(false);
        });
        r.cr2().modify(|w| w.set_rtoen(false));
        r.cr3().modify(|w| {
            w.set_dmar(false);
            w.set_dmat(false);
            w.set_eie(false);
        });
    }

    fn enable_receiver_timeout(&mut self, bit_periods: u32) {
        let r = self.usart;
        r.rtor().modify(|w| w.set_rto(bit_periods.min(MAX_RTO)));
        r.cr2().modify(|w| w.set_rtoen(true));
        r.cr1().modify(|w| w.set_rtoie(true));
    }

    fn start_receive_dma(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error> {
        if buffer.len() > u16::MAX as usize {
            return Err(UartBusError::BufferTooLong);
        }
        self.rx.start(
            self.usart.rdr().as_ptr() as u32,
            buffer.as_mut_ptr() as u32,
            buffer.len(),
            dma_vals::Dir::FROM_PERIPHERAL,
        );
        Ok(())
    }

    fn abort_receive(&mut self) {
        self.rx.stop();
        self.rx.clear_flags();
    }

    fn dma_remaining(&mut self) -> usize {
        self.rx.remaining()
    }

    fn start_transmit_dma(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if data.is_empty() {
            return Err(UartBusError::EmptyBuffer);
        }
        if data.len() > u16::MAX as usize {
            return Err(UartBusError::BufferTooLong);
        }
        if self.tx.is_enabled() && self.tx.remaining() > 0 {
            return Err(UartBusError::Busy);
        }
        let r = self.usart;
        r.icr().write_value(regs::Icr(ISR_TC));
        self.tx.start(
            r.tdr().as_ptr() as u32,
            data.as_ptr() as u32,
            data.len(),
            dma_vals::Dir::FROM_MEMORY,
        );
        r.cr1().modify(|w| w.set_tcie(true));
        Ok(())
    }
}

/// Read and clear the USART interrupt flags
///
/// Call from the USART interrupt handler and feed every event to the
/// transport.
pub fn decode_usart_events(usart: Usart) -> Vec<UartEvent, 2> {
    let isr = usart.isr().read().0;
    let cr1 = usart.cr1().read();
    usart.icr().write_value(regs::Icr(isr & ISR_CLEARABLE));

    let transmit_done = isr & ISR_TC != 0 && cr1.tcie();
    if transmit_done {
        usart.cr1().modify(|w| w.set_tcie(false));
    }
    events_from_flags(isr, cr1.pce(), transmit_done)
}

/// Map USART status flags onto transport events
///
/// A line error takes precedence over a receive-timeout raised in the same
/// interrupt; only the first error kind is reported. At most one receive
/// event and one transmit completion are produced, which is the capacity
/// of the returned list.
fn events_from_flags(isr: u32, parity_enabled: bool, transmit_done: bool) -> Vec<UartEvent, 2> {
    let error = if isr & ISR_ORE != 0 {
        Some(UartErrorKind::Overrun)
    } else if isr & ISR_FE != 0 {
        Some(UartErrorKind::Framing)
    } else if isr & ISR_NE != 0 {
        Some(UartErrorKind::Noise)
    } else if isr & ISR_PE != 0 && parity_enabled {
        Some(UartErrorKind::Parity)
    } else {
        None
    };
    let receive = match error {
        Some(kind) => Some(UartEvent::Error(kind)),
        None if isr & ISR_RTOF != 0 => Some(UartEvent::ReceiveTimeout),
        None => None,
    };
    let transmit = transmit_done.then_some(UartEvent::TransmitComplete);

    let mut events = Vec::new();
    for event in receive.into_iter().chain(transmit) {
        let pushed = events.push(event);
        debug_assert!(pushed.is_ok(), "more events than flags");
    }
    events
}
