//! Talking to an attached keyboard over libusb.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use rusb::{Device, DeviceHandle, GlobalContext};
use tracing::{debug, warn};

use tasta_core::control::{
    SetupPacket, HID_GET_IDLE, HID_GET_REPORT, HID_SET_IDLE, REPORT_TYPE_INPUT,
};
use tasta_core::report::REPORT_LEN;
use tasta_core::{KeyboardReport, HID_REPORT_DESCRIPTOR};

const INTERFACE: u8 = 0;

// Standard GET_DESCRIPTOR for the HID report descriptor.
const GET_DESCRIPTOR: u8 = 0x06;
const STANDARD_IN_INTERFACE: u8 = 0x81;
const REPORT_DESCRIPTOR_TYPE: u16 = 0x22;

/// What `detect` prints for each match.
#[derive(Debug)]
pub struct DeviceInfo {
    pub bus: u8,
    pub address: u8,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

fn matching(vid: u16, pid: u16) -> Result<Vec<Device<GlobalContext>>> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    let mut found = Vec::new();
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == vid && desc.product_id() == pid {
            found.push(device);
        }
    }
    Ok(found)
}

/// All attached devices with the given IDs. String descriptors are best
/// effort: they need permission to open the device.
pub fn list(vid: u16, pid: u16) -> Result<Vec<DeviceInfo>> {
    let mut infos = Vec::new();
    for device in matching(vid, pid)? {
        let desc = device.device_descriptor()?;
        let (manufacturer, product) = match device.open() {
            Ok(handle) => (
                handle.read_manufacturer_string_ascii(&desc).ok(),
                handle.read_product_string_ascii(&desc).ok(),
            ),
            Err(e) => {
                debug!(bus = device.bus_number(), address = device.address(), error = %e, "cannot open for strings");
                (None, None)
            }
        };
        infos.push(DeviceInfo {
            bus: device.bus_number(),
            address: device.address(),
            manufacturer,
            product,
        });
    }
    Ok(infos)
}

/// An opened keyboard with its HID interface claimed.
pub struct Keyboard {
    handle: DeviceHandle<GlobalContext>,
    timeout: Duration,
}

impl Keyboard {
    /// Open the first matching device. While open the OS keyboard driver is
    /// detached, so the buttons stop typing.
    pub fn open(vid: u16, pid: u16, timeout: Duration) -> Result<Self> {
        let devices = matching(vid, pid)?;
        let Some(device) = devices.first() else {
            bail!("no device {:04x}:{:04x} found", vid, pid);
        };
        if devices.len() > 1 {
            warn!(count = devices.len(), "several devices match, using the first");
        }

        let mut handle = device
            .open()
            .context("failed to open device (may need root/sudo or udev rules)")?;
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            debug!(error = %e, "auto-detach not supported");
        }
        handle
            .claim_interface(INTERFACE)
            .context("failed to claim the HID interface")?;
        debug!(
            bus = device.bus_number(),
            address = device.address(),
            "opened"
        );

        Ok(Self { handle, timeout })
    }

    fn read(&self, packet: SetupPacket, buf: &mut [u8]) -> Result<usize> {
        let n = self
            .handle
            .read_control(
                packet.request_type,
                packet.request,
                packet.value,
                packet.index,
                buf,
                self.timeout,
            )
            .with_context(|| format!("control request 0x{:02X} failed", packet.request))?;
        debug!(request = packet.request, len = n, "control in");
        Ok(n)
    }

    pub fn get_report(&self) -> Result<KeyboardReport> {
        let packet = SetupPacket::hid_in(
            HID_GET_REPORT,
            u16::from(REPORT_TYPE_INPUT) << 8,
            u16::from(INTERFACE),
            REPORT_LEN as u16,
        );
        let mut buf = [0u8; REPORT_LEN];
        let n = self.read(packet, &mut buf)?;
        Ok(KeyboardReport::try_from(&buf[..n])?)
    }

    /// Idle rate in 4 ms units.
    pub fn get_idle(&self) -> Result<u8> {
        let packet = SetupPacket::hid_in(HID_GET_IDLE, 0, u16::from(INTERFACE), 1);
        let mut buf = [0u8; 1];
        match self.read(packet, &mut buf)? {
            1 => Ok(buf[0]),
            n => bail!("Get_Idle returned {} bytes", n),
        }
    }

    pub fn set_idle(&self, rate: u8) -> Result<()> {
        let packet = SetupPacket::hid_out(HID_SET_IDLE, u16::from(rate) << 8, u16::from(INTERFACE));
        self.handle
            .write_control(
                packet.request_type,
                packet.request,
                packet.value,
                packet.index,
                &[],
                self.timeout,
            )
            .context("Set_Idle failed")?;
        Ok(())
    }

    pub fn report_descriptor(&self) -> Result<Vec<u8>> {
        let packet = SetupPacket {
            request_type: STANDARD_IN_INTERFACE,
            request: GET_DESCRIPTOR,
            value: REPORT_DESCRIPTOR_TYPE << 8,
            index: u16::from(INTERFACE),
            length: HID_REPORT_DESCRIPTOR.len() as u16,
        };
        // Room for a longer descriptor than expected, so a mismatch shows.
        let mut buf = [0u8; 255];
        let n = self.read(packet, &mut buf)?;
        Ok(buf[..n].to_vec())
    }
}

impl Drop for Keyboard {
    fn drop(&mut self) {
        // Hands the interface back to the kernel driver.
        let _ = self.handle.release_interface(INTERFACE);
    }
}
