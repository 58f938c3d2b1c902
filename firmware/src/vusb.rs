//! Binding to the V-USB software driver.
//!
//! V-USB is C and calls back into the application through fixed symbol
//! names. Both callbacks used here (`usbFunctionSetup` and the reset hook)
//! run from inside `usbPoll`, never from the USB interrupt, so `poll`
//! publishes the handler for exactly that window.

use core::cell::Cell;
use core::ptr::addr_of;

use avr_device::interrupt::{self, Mutex};

use tasta_core::calibration::FrameMeter;
use tasta_core::control::SetupPacket;
use tasta_core::report::HID_REPORT_DESCRIPTOR;
use tasta_core::transport::{Transport, UsbHandler};

/// `usbTxStatus_t` from usbdrv.h.
#[repr(C)]
#[allow(dead_code)]
struct TxStatus {
    len: u8,
    buffer: [u8; 11],
}

/// Set in `TxStatus::len` while the endpoint is free.
const TX_READY: u8 = 0x10;

#[allow(non_upper_case_globals)]
extern "C" {
    fn usbInit();
    fn usbPoll();
    fn usbSetInterrupt(data: *mut u8, len: u8);
    fn usbMeasureFrameLength() -> u16;

    static usbTxStatus1: TxStatus;
    static mut usbMsgPtr: *const u8;
}

/// Report descriptor, read by the driver from flash.
#[no_mangle]
#[used]
#[link_section = ".progmem.data"]
#[allow(non_upper_case_globals)]
pub static usbHidReportDescriptor: [u8; HID_REPORT_DESCRIPTOR.len()] = HID_REPORT_DESCRIPTOR;

/// Type-erased pointer to the handler passed to the current `poll`.
#[derive(Clone, Copy)]
struct Dispatch {
    ctx: *mut (),
    setup: unsafe fn(*mut (), &SetupPacket) -> (*const u8, u8),
    reset: unsafe fn(*mut ()),
}

// Only touched from the main thread; the Mutex is for `Sync`.
unsafe impl Send for Dispatch {}

static DISPATCH: Mutex<Cell<Option<Dispatch>>> = Mutex::new(Cell::new(None));

unsafe fn setup_trampoline<H: UsbHandler>(ctx: *mut (), packet: &SetupPacket) -> (*const u8, u8) {
    let handler = &mut *(ctx as *mut H);
    let data = handler.setup(packet);
    (data.as_ptr(), data.len() as u8)
}

unsafe fn reset_trampoline<H: UsbHandler>(ctx: *mut ()) {
    let handler = &mut *(ctx as *mut H);
    handler.reset_ready(&mut FrameTimer);
}

fn current() -> Option<Dispatch> {
    interrupt::free(|cs| DISPATCH.borrow(cs).get())
}

/// Called by the driver for every SETUP it does not handle itself.
#[no_mangle]
pub extern "C" fn usbFunctionSetup(data: *const u8) -> u8 {
    let mut raw = [0u8; 8];
    // SAFETY: the driver passes its 8-byte SETUP buffer.
    unsafe { core::ptr::copy_nonoverlapping(data, raw.as_mut_ptr(), raw.len()) };
    let packet = SetupPacket::from_bytes(raw);

    let Some(dispatch) = current() else {
        return 0;
    };
    // SAFETY: `ctx` was published by `VUsb::poll`, which is still on the
    // stack. The returned bytes belong to the `Device` living in main's
    // frame, so they outlive the data stage.
    unsafe {
        let (ptr, len) = (dispatch.setup)(dispatch.ctx, &packet);
        usbMsgPtr = ptr;
        len
    }
}

/// Invoked through `USB_RESET_HOOK` once the bus leaves reset.
#[no_mangle]
pub extern "C" fn usbEventResetReady() {
    if let Some(dispatch) = current() {
        // SAFETY: as in `usbFunctionSetup`.
        unsafe { (dispatch.reset)(dispatch.ctx) };
    }
}

/// Measures frame length with the driver's SOF timing loop.
struct FrameTimer;

impl FrameMeter for FrameTimer {
    fn measure_frame_length(&mut self) -> u16 {
        // The timing loop counts cycles; an interrupt would skew it.
        interrupt::free(|_| unsafe { usbMeasureFrameLength() })
    }
}

/// The V-USB driver. Only one may exist.
pub struct VUsb {
    _private: (),
}

impl VUsb {
    /// Initialise the driver. D+ and D- must still be released afterwards.
    pub fn init() -> Self {
        unsafe { usbInit() };
        Self { _private: () }
    }
}

impl Transport for VUsb {
    fn poll<H: UsbHandler>(&mut self, handler: &mut H) {
        let dispatch = Dispatch {
            ctx: handler as *mut H as *mut (),
            setup: setup_trampoline::<H>,
            reset: reset_trampoline::<H>,
        };
        interrupt::free(|cs| DISPATCH.borrow(cs).set(Some(dispatch)));
        unsafe { usbPoll() };
        interrupt::free(|cs| DISPATCH.borrow(cs).set(None));
    }

    fn interrupt_ready(&self) -> bool {
        // The ISR updates this byte; read it through a raw pointer.
        let len = unsafe { core::ptr::read_volatile(addr_of!(usbTxStatus1.len)) };
        len & TX_READY != 0
    }

    fn send_interrupt(&mut self, data: &[u8]) {
        // usbSetInterrupt copies the bytes into its own buffer.
        unsafe { usbSetInterrupt(data.as_ptr() as *mut u8, data.len() as u8) };
    }
}
