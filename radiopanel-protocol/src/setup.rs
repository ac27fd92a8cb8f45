//! Control-transfer SETUP packets
//!
//! Every control transfer begins with an 8-byte SETUP packet:
//! ```text
//! ┌───────────────┬──────────┬────────┬────────┬─────────┐
//! │ bmRequestType │ bRequest │ wValue │ wIndex │ wLength │
//! │ 1B            │ 1B       │ 2B LE  │ 2B LE  │ 2B LE   │
//! └───────────────┴──────────┴────────┴────────┴─────────┘
//! ```
//!
//! `bmRequestType` packs the recipient (bits 0..5), the request kind
//! (bits 5..7) and the data-stage direction (bit 7).

/// Size of a SETUP packet in bytes
pub const SETUP_PACKET_LEN: usize = 8;

const RECIPIENT_MASK: u8 = 0x1F;
const KIND_SHIFT: u8 = 5;
const KIND_MASK: u8 = 0x03;
const DIRECTION_BIT: u8 = 0x80;

/// Who a request is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
    /// Values 4..=31, reserved by the USB specification
    Reserved(u8),
}

impl Recipient {
    const fn from_bits(bits: u8) -> Self {
        match bits & RECIPIENT_MASK {
            0 => Recipient::Device,
            1 => Recipient::Interface,
            2 => Recipient::Endpoint,
            3 => Recipient::Other,
            n => Recipient::Reserved(n),
        }
    }

    const fn bits(self) -> u8 {
        match self {
            Recipient::Device => 0,
            Recipient::Interface => 1,
            Recipient::Endpoint => 2,
            Recipient::Other => 3,
            Recipient::Reserved(n) => n & RECIPIENT_MASK,
        }
    }
}

/// Request namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    Standard,
    Class,
    Vendor,
    Reserved,
}

impl RequestKind {
    const fn from_bits(bits: u8) -> Self {
        match bits & KIND_MASK {
            0 => RequestKind::Standard,
            1 => RequestKind::Class,
            2 => RequestKind::Vendor,
            _ => RequestKind::Reserved,
        }
    }

    const fn bits(self) -> u8 {
        match self {
            RequestKind::Standard => 0,
            RequestKind::Class => 1,
            RequestKind::Vendor => 2,
            RequestKind::Reserved => 3,
        }
    }
}

/// Direction of the data stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

/// The `bmRequestType` byte
///
/// Construct from the wire with [`RequestType::from_bits`] or from named
/// fields with [`RequestType::new`]; both views always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestType(u8);

impl RequestType {
    /// Encode from fields
    pub const fn new(direction: Direction, kind: RequestKind, recipient: Recipient) -> Self {
        let dir = match direction {
            Direction::HostToDevice => 0,
            Direction::DeviceToHost => DIRECTION_BIT,
        };
        Self(dir | (kind.bits() << KIND_SHIFT) | recipient.bits())
    }

    /// Wrap a raw byte
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw byte
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn recipient(self) -> Recipient {
        Recipient::from_bits(self.0)
    }

    pub const fn kind(self) -> RequestKind {
        RequestKind::from_bits(self.0 >> KIND_SHIFT)
    }

    pub const fn direction(self) -> Direction {
        if self.0 & DIRECTION_BIT != 0 {
            Direction::DeviceToHost
        } else {
            Direction::HostToDevice
        }
    }
}

/// A decoded SETUP packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: RequestType,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    /// Maximum number of bytes the host accepts in the data stage
    pub length: u16,
}

impl SetupPacket {
    /// Decode the 8 bytes latched by the controller
    pub fn parse(bytes: &[u8; SETUP_PACKET_LEN]) -> Self {
        Self {
            request_type: RequestType::from_bits(bytes[0]),
            request: bytes[1],
            value: u16::from_le_bytes([bytes[2], bytes[3]]),
            index: u16::from_le_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    /// Encode back into wire order
    pub fn to_bytes(&self) -> [u8; SETUP_PACKET_LEN] {
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            self.request_type.bits(),
            self.request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }

    /// Descriptor type requested by GET_DESCRIPTOR (high byte of `wValue`)
    pub fn descriptor_type(&self) -> u8 {
        (self.value >> 8) as u8
    }

    /// Descriptor index requested by GET_DESCRIPTOR (low byte of `wValue`)
    pub fn descriptor_index(&self) -> u8 {
        (self.value & 0xFF) as u8
    }
}

/// Standard request codes (USB 2.0, table 9-4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StandardRequest {
    GetStatus = 0,
    ClearFeature = 1,
    SetFeature = 3,
    SetAddress = 5,
    GetDescriptor = 6,
    SetDescriptor = 7,
    GetConfiguration = 8,
    SetConfiguration = 9,
    GetInterface = 10,
    SetInterface = 11,
    SynchFrame = 12,
}

impl TryFrom<u8> for StandardRequest {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::GetStatus,
            1 => Self::ClearFeature,
            3 => Self::SetFeature,
            5 => Self::SetAddress,
            6 => Self::GetDescriptor,
            7 => Self::SetDescriptor,
            8 => Self::GetConfiguration,
            9 => Self::SetConfiguration,
            10 => Self::GetInterface,
            11 => Self::SetInterface,
            12 => Self::SynchFrame,
            other => return Err(other),
        })
    }
}

/// HID class request codes (HID 1.11, section 7.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HidRequest {
    GetReport = 0x01,
    GetIdle = 0x02,
    GetProtocol = 0x03,
    SetReport = 0x09,
    SetIdle = 0x0A,
    SetProtocol = 0x0B,
}

impl TryFrom<u8> for HidRequest {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0x01 => Self::GetReport,
            0x02 => Self::GetIdle,
            0x03 => Self::GetProtocol,
            0x09 => Self::SetReport,
            0x0A => Self::SetIdle,
            0x0B => Self::SetProtocol,
            other => return Err(other),
        })
    }
}

/// Descriptor type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DescriptorType {
    Device = 0x01,
    Configuration = 0x02,
    String = 0x03,
    Interface = 0x04,
    Endpoint = 0x05,
    DeviceQualifier = 0x06,
    OtherSpeedConfiguration = 0x07,
    InterfacePower = 0x08,
    Hid = 0x21,
    HidReport = 0x22,
    HidPhysical = 0x23,
}

impl TryFrom<u8> for DescriptorType {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0x01 => Self::Device,
            0x02 => Self::Configuration,
            0x03 => Self::String,
            0x04 => Self::Interface,
            0x05 => Self::Endpoint,
            0x06 => Self::DeviceQualifier,
            0x07 => Self::OtherSpeedConfiguration,
            0x08 => Self::InterfacePower,
            0x21 => Self::Hid,
            0x22 => Self::HidReport,
            0x23 => Self::HidPhysical,
            other => return Err(other),
        })
    }
}
