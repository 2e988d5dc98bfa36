//! Test doubles for the hardware traits

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use modlink_hal::{DmaUart, InterruptControl, MillisClock, UartConfig};

/// Interrupt controller that records masking and idling
///
/// Idling marks an interrupt pending; the hook registered with
/// [`MockCpu::on_idle`] plays the interrupt handler and runs when the mask
/// is lifted, the way a pending interrupt is dispatched on Cortex-M.
pub struct MockCpu<'a> {
    masked: Cell<bool>,
    pending: Cell<bool>,
    idles: Cell<usize>,
    handler: RefCell<Option<Box<dyn FnMut() + 'a>>>,
}

impl<'a> MockCpu<'a> {
    pub fn new() -> Self {
        Self {
            masked: Cell::new(false),
            pending: Cell::new(false),
            idles: Cell::new(0),
            handler: RefCell::new(None),
        }
    }

    pub fn on_idle(&self, handler: impl FnMut() + 'a) {
        *self.handler.borrow_mut() = Some(Box::new(handler));
    }

    pub fn is_masked(&self) -> bool {
        self.masked.get()
    }

    pub fn idle_count(&self) -> usize {
        self.idles.get()
    }
}

impl InterruptControl for MockCpu<'_> {
    fn disable_interrupts(&self) {
        self.masked.set(true);
    }

    fn enable_interrupts(&self) {
        self.masked.set(false);
        if self.pending.replace(false) {
            if let Some(handler) = self.handler.borrow_mut().as_mut() {
                handler();
            }
        }
    }

    fn wait_for_interrupt(&self) {
        assert!(self.masked.get(), "idled with interrupts enabled");
        self.idles.set(self.idles.get() + 1);
        self.pending.set(true);
    }
}

/// Millisecond clock that only moves when told to
pub struct MockClock {
    now: Cell<u32>,
}

impl MockClock {
    pub fn starting_at(now: u32) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn peek(&self) -> u32 {
        self.now.get()
    }
}

impl MillisClock for MockClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    Busy,
    Empty,
    Init,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartCall {
    Init(u32),
    Deinit,
    EnableReceiverTimeout(u32),
    StartReceive { addr: usize, len: usize },
    AbortReceive,
    ReadRemaining,
    StartTransmit(usize),
}

/// Peripheral double that records every call
///
/// `remaining` plays the DMA counter; tests set it together with the
/// bytes they place in the receive buffer.
pub struct MockUart {
    pub calls: Vec<UartCall>,
    pub remaining: usize,
    pub transmit_busy: bool,
    pub init_fails: bool,
}

impl MockUart {
    pub const fn new() -> Self {
        Self {
            calls: Vec::new(),
            remaining: 0,
            transmit_busy: false,
            init_fails: false,
        }
    }

    pub fn count(&self, pred: impl Fn(&UartCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    pub fn receive_arms(&self) -> usize {
        self.count(|call| matches!(call, UartCall::StartReceive { .. }))
    }
}

impl DmaUart for MockUart {
    type Error = MockError;

    fn init(&mut self, config: &UartConfig) -> Result<(), Self::Error> {
        self.calls.push(UartCall::Init(config.baudrate));
        if self.init_fails {
            return Err(MockError::Init);
        }
        Ok(())
    }

    fn deinit(&mut self) {
        self.calls.push(UartCall::Deinit);
    }

    fn enable_receiver_timeout(&mut self, bit_periods: u32) {
        self.calls.push(UartCall::EnableReceiverTimeout(bit_periods));
    }

    fn start_receive_dma(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.calls.push(UartCall::StartReceive {
            addr: buffer.as_ptr() as usize,
            len: buffer.len(),
        });
        self.remaining = buffer.len();
        Ok(())
    }

    fn abort_receive(&mut self) {
        self.calls.push(UartCall::AbortReceive);
    }

    fn dma_remaining(&mut self) -> usize {
        self.calls.push(UartCall::ReadRemaining);
        self.remaining
    }

    fn start_transmit_dma(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if data.is_empty() {
            return Err(MockError::Empty);
        }
        if self.transmit_busy {
            return Err(MockError::Busy);
        }
        self.calls.push(UartCall::StartTransmit(data.len()));
        Ok(())
    }
}
