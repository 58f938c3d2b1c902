//! Contract with the software USB driver.
//!
//! The driver owns bus timing. Everything it needs from the application is
//! delivered through a [`UsbHandler`] passed into [`Transport::poll`], so the
//! callbacks run synchronously inside `poll` and borrow the same state as the
//! main loop.

use crate::calibration::FrameMeter;
use crate::control::SetupPacket;

/// Callbacks the driver makes while it is being polled.
pub trait UsbHandler {
    /// Answer a SETUP packet the driver did not handle itself. The returned
    /// bytes form the data stage; an empty slice means no data.
    fn setup(&mut self, packet: &SetupPacket) -> &[u8];

    /// The bus came out of reset and frame markers are arriving.
    fn reset_ready(&mut self, meter: &mut dyn FrameMeter);
}

pub trait Transport {
    /// Driver housekeeping: process received packets and dispatch requests.
    fn poll<H: UsbHandler>(&mut self, handler: &mut H);

    /// Whether the interrupt-in endpoint can take a new report.
    fn interrupt_ready(&self) -> bool;

    /// Queue `data` on the interrupt-in endpoint. The driver copies it.
    fn send_interrupt(&mut self, data: &[u8]);
}
