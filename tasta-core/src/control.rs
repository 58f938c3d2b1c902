//! SETUP packets on the control endpoint.

/// bmRequestType bits 5-6
pub const REQUEST_TYPE_MASK: u8 = 0x60;
pub const REQUEST_TYPE_CLASS: u8 = 0x20;
pub const REQUEST_TYPE_VENDOR: u8 = 0x40;

// HID class requests (HID 1.11, section 7.2)
pub const HID_GET_REPORT: u8 = 0x01;
pub const HID_GET_IDLE: u8 = 0x02;
pub const HID_GET_PROTOCOL: u8 = 0x03;
pub const HID_SET_REPORT: u8 = 0x09;
pub const HID_SET_IDLE: u8 = 0x0A;
pub const HID_SET_PROTOCOL: u8 = 0x0B;

/// HID report type carried in the high byte of wValue for Get_Report.
pub const REPORT_TYPE_INPUT: u8 = 0x01;

/// The 8-byte SETUP packet, fields decoded from little-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub const fn from_bytes(b: [u8; 8]) -> Self {
        Self {
            request_type: b[0],
            request: b[1],
            value: u16::from_le_bytes([b[2], b[3]]),
            index: u16::from_le_bytes([b[4], b[5]]),
            length: u16::from_le_bytes([b[6], b[7]]),
        }
    }

    pub const fn to_bytes(&self) -> [u8; 8] {
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            self.request_type,
            self.request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }

    pub const fn is_class(&self) -> bool {
        self.request_type & REQUEST_TYPE_MASK == REQUEST_TYPE_CLASS
    }

    pub const fn value_high(&self) -> u8 {
        (self.value >> 8) as u8
    }

    pub const fn value_low(&self) -> u8 {
        self.value as u8
    }

    /// Device-to-host HID class request to interface `interface`.
    pub const fn hid_in(request: u8, value: u16, interface: u16, length: u16) -> Self {
        Self {
            request_type: 0xA1,
            request,
            value,
            index: interface,
            length,
        }
    }

    /// Host-to-device HID class request to interface `interface`.
    pub const fn hid_out(request: u8, value: u16, interface: u16) -> Self {
        Self {
            request_type: 0x21,
            request,
            value,
            index: interface,
            length: 0,
        }
    }
}
