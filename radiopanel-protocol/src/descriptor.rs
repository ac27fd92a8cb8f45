//! USB descriptor table
//!
//! Byte-exact descriptor records for a full-speed HID device with one
//! configuration, one interface and two interrupt endpoints. The whole
//! table is assembled by a `const fn` from a [`UsbIdentity`], so the
//! firmware keeps it in flash and never modifies it.

use zerocopy::little_endian::U16;
use zerocopy::{Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::hid::{ReportDescriptor, PANEL_REPORT_ITEMS};

/// USB 2.0
const BCD_USB: u16 = 0x0200;

/// HID 1.10
const BCD_HID: u16 = 0x0110;

/// Interface class code for HID
const CLASS_HID: u8 = 0x03;

/// Maximum packet size of the control endpoint
pub const EP0_MAX_PACKET_SIZE: u8 = 64;

/// Maximum packet size of the interrupt endpoints
pub const REPORT_MAX_PACKET_SIZE: u16 = 8;

/// Endpoint number used for both interrupt endpoints
pub const REPORT_ENDPOINT: u8 = 1;

/// The only configuration value the device accepts
pub const CONFIGURATION_VALUE: u8 = 1;

/// US English
pub const LANGUAGE_ID_EN_US: u16 = 0x0409;

/// Capacity of a string descriptor, header included
pub const MAX_STRING_DESCRIPTOR_LEN: usize = 64;

/// Descriptor construction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorError {
    /// Encoded descriptor exceeds its fixed buffer
    TooLong,
    /// String contains a non-ASCII byte
    NotAscii,
}

/// Device identity the descriptor table is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsbIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Device release number, BCD
    pub release: u16,
    pub manufacturer: &'static str,
    pub product: &'static str,
    /// Bus current draw in mA
    pub max_power_ma: u16,
    /// Interrupt endpoint polling interval in ms
    pub poll_interval_ms: u8,
}

impl UsbIdentity {
    pub const DEFAULT: Self = Self {
        vendor_id: 0xF055,
        product_id: 0x1234,
        release: 0x0001,
        manufacturer: "Ben Hekster",
        product: "Simulator Display Panel",
        max_power_ma: 40,
        poll_interval_ms: 10,
    };
}

impl Default for UsbIdentity {
    fn default() -> Self {
        Self::DEFAULT
    }
}

mod descriptor_type {
    pub const DEVICE: u8 = 0x01;
    pub const CONFIGURATION: u8 = 0x02;
    pub const STRING: u8 = 0x03;
    pub const INTERFACE: u8 = 0x04;
    pub const ENDPOINT: u8 = 0x05;
    pub const HID: u8 = 0x21;
    pub const HID_REPORT: u8 = 0x22;
}

/// Device descriptor (USB 2.0, table 9-8)
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct DeviceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub bcd_usb: U16,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub max_packet_size0: u8,
    pub vendor_id: U16,
    pub product_id: U16,
    pub bcd_device: U16,
    pub manufacturer_index: u8,
    pub product_index: u8,
    pub serial_number_index: u8,
    pub num_configurations: u8,
}

/// Configuration descriptor header (USB 2.0, table 9-10)
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ConfigurationDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub total_length: U16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub configuration_index: u8,
    pub attributes: u8,
    /// In units of 2 mA
    pub max_power: u8,
}

/// Interface descriptor (USB 2.0, table 9-12)
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct InterfaceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub interface_index: u8,
}

/// HID class descriptor with a single report descriptor (HID 1.11, 6.2.1)
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct HidDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub bcd_hid: U16,
    pub country_code: u8,
    pub num_descriptors: u8,
    pub report_descriptor_type: u8,
    pub report_descriptor_length: U16,
}

/// Endpoint descriptor (USB 2.0, table 9-13)
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct EndpointDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub endpoint_address: u8,
    pub attributes: u8,
    pub max_packet_size: U16,
    pub interval: u8,
}

/// Everything returned for GET_DESCRIPTOR(Configuration)
///
/// Interface, class and endpoint descriptors follow the configuration
/// header back to back, in the order the host parses them.
#[derive(Debug, Clone, Copy, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ConfigurationBundle {
    pub configuration: ConfigurationDescriptor,
    pub interface: InterfaceDescriptor,
    pub hid: HidDescriptor,
    pub endpoint_out: EndpointDescriptor,
    pub endpoint_in: EndpointDescriptor,
}

/// Endpoint transfer types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferType {
    Control = 0,
    Isochronous = 1,
    Bulk = 2,
    Interrupt = 3,
}

/// `bEndpointAddress` for an IN endpoint
pub const fn endpoint_in(number: u8) -> u8 {
    0x80 | (number & 0x0F)
}

/// `bEndpointAddress` for an OUT endpoint
pub const fn endpoint_out(number: u8) -> u8 {
    number & 0x0F
}

const fn interrupt_endpoint(address: u8, interval: u8) -> EndpointDescriptor {
    EndpointDescriptor {
        length: core::mem::size_of::<EndpointDescriptor>() as u8,
        descriptor_type: descriptor_type::ENDPOINT,
        endpoint_address: address,
        attributes: TransferType::Interrupt as u8,
        max_packet_size: U16::new(REPORT_MAX_PACKET_SIZE),
        interval,
    }
}

/// `bmAttributes` of a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigAttributes {
    pub self_powered: bool,
    pub remote_wakeup: bool,
}

impl ConfigAttributes {
    pub const fn bits(self) -> u8 {
        // bit 7 is reserved and must be set
        let mut bits = 0x80;
        if self.self_powered {
            bits |= 1 << 6;
        }
        if self.remote_wakeup {
            bits |= 1 << 5;
        }
        bits
    }
}

/// A string descriptor in UTF-16LE, without terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringDescriptor {
    buf: [u8; MAX_STRING_DESCRIPTOR_LEN],
}

impl StringDescriptor {
    /// String index 0: the list of supported language IDs
    pub const fn languages(language: u16) -> Self {
        let mut buf = [0u8; MAX_STRING_DESCRIPTOR_LEN];
        let id = language.to_le_bytes();
        buf[0] = 4;
        buf[1] = descriptor_type::STRING;
        buf[2] = id[0];
        buf[3] = id[1];
        Self { buf }
    }

    /// Encode an ASCII string
    pub const fn from_ascii(s: &str) -> Result<Self, DescriptorError> {
        let bytes = s.as_bytes();
        if 2 + 2 * bytes.len() > MAX_STRING_DESCRIPTOR_LEN {
            return Err(DescriptorError::TooLong);
        }

        let mut buf = [0u8; MAX_STRING_DESCRIPTOR_LEN];
        buf[0] = (2 + 2 * bytes.len()) as u8;
        buf[1] = descriptor_type::STRING;
        let mut i = 0;
        while i < bytes.len() {
            if !bytes[i].is_ascii() {
                return Err(DescriptorError::NotAscii);
            }
            buf[2 + 2 * i] = bytes[i];
            i += 1;
        }
        Ok(Self { buf })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.buf[0] as usize]
    }
}

/// The complete, immutable descriptor set of the panel
#[derive(Debug, Clone, Copy)]
pub struct DescriptorTable {
    device: DeviceDescriptor,
    configuration: ConfigurationBundle,
    report: ReportDescriptor,
    strings: [StringDescriptor; 3],
}

/// String descriptor indices
pub mod string_index {
    pub const LANGUAGES: u8 = 0;
    pub const MANUFACTURER: u8 = 1;
    pub const PRODUCT: u8 = 2;
}

const fn built<T: Copy>(result: Result<T, DescriptorError>) -> T {
    match result {
        Ok(value) => value,
        Err(DescriptorError::TooLong) => panic!("descriptor exceeds its buffer"),
        Err(DescriptorError::NotAscii) => panic!("descriptor string is not ASCII"),
    }
}

impl DescriptorTable {
    /// Assemble the table for `identity`
    ///
    /// # Panics
    ///
    /// If a string is too long or not ASCII. Evaluate in a `const` or
    /// `static` initializer so this becomes a build error.
    pub const fn new(identity: &UsbIdentity) -> Self {
        let report = built(ReportDescriptor::build(&PANEL_REPORT_ITEMS));

        let device = DeviceDescriptor {
            length: core::mem::size_of::<DeviceDescriptor>() as u8,
            descriptor_type: descriptor_type::DEVICE,
            bcd_usb: U16::new(BCD_USB),
            // class is declared per interface
            device_class: 0,
            device_subclass: 0,
            device_protocol: 0,
            max_packet_size0: EP0_MAX_PACKET_SIZE,
            vendor_id: U16::new(identity.vendor_id),
            product_id: U16::new(identity.product_id),
            bcd_device: U16::new(identity.release),
            manufacturer_index: string_index::MANUFACTURER,
            product_index: string_index::PRODUCT,
            serial_number_index: 0,
            num_configurations: 1,
        };

        let configuration = ConfigurationBundle {
            configuration: ConfigurationDescriptor {
                length: core::mem::size_of::<ConfigurationDescriptor>() as u8,
                descriptor_type: descriptor_type::CONFIGURATION,
                total_length: U16::new(core::mem::size_of::<ConfigurationBundle>() as u16),
                num_interfaces: 1,
                configuration_value: CONFIGURATION_VALUE,
                configuration_index: 0,
                attributes: ConfigAttributes {
                    self_powered: false,
                    remote_wakeup: false,
                }
                .bits(),
                max_power: (identity.max_power_ma / 2) as u8,
            },
            interface: InterfaceDescriptor {
                length: core::mem::size_of::<InterfaceDescriptor>() as u8,
                descriptor_type: descriptor_type::INTERFACE,
                interface_number: 0,
                alternate_setting: 0,
                num_endpoints: 2,
                interface_class: CLASS_HID,
                // no boot protocol
                interface_subclass: 0,
                interface_protocol: 0,
                interface_index: 0,
            },
            hid: HidDescriptor {
                length: core::mem::size_of::<HidDescriptor>() as u8,
                descriptor_type: descriptor_type::HID,
                bcd_hid: U16::new(BCD_HID),
                country_code: 0,
                num_descriptors: 1,
                report_descriptor_type: descriptor_type::HID_REPORT,
                report_descriptor_length: U16::new(report.len() as u16),
            },
            endpoint_out: interrupt_endpoint(
                endpoint_out(REPORT_ENDPOINT),
                identity.poll_interval_ms,
            ),
            endpoint_in: interrupt_endpoint(
                endpoint_in(REPORT_ENDPOINT),
                identity.poll_interval_ms,
            ),
        };

        Self {
            device,
            configuration,
            report,
            strings: [
                StringDescriptor::languages(LANGUAGE_ID_EN_US),
                built(StringDescriptor::from_ascii(identity.manufacturer)),
                built(StringDescriptor::from_ascii(identity.product)),
            ],
        }
    }

    pub fn device(&self) -> &[u8] {
        self.device.as_bytes()
    }

    /// Configuration descriptor `index`, with everything it embeds
    pub fn configuration(&self, index: u8) -> Option<&[u8]> {
        (index == 0).then(|| self.configuration.as_bytes())
    }

    pub fn string(&self, index: u8) -> Option<&[u8]> {
        self.strings.get(index as usize).map(StringDescriptor::as_bytes)
    }

    pub fn hid_report(&self) -> &[u8] {
        self.report.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: DescriptorTable = DescriptorTable::new(&UsbIdentity::DEFAULT);

    #[test]
    fn test_device_descriptor() {
        let expected: [u8; 18] = [
            18, 0x01, // length, type
            0x00, 0x02, // USB 2.0
            0, 0, 0, // class per interface
            64, // EP0 packet size
            0x55, 0xF0, // vendor
            0x34, 0x12, // product
            0x01, 0x00, // release
            1, 2, 0, // strings
            1, // configurations
        ];
        assert_eq!(TABLE.device(), &expected[..]);
    }

    #[test]
    fn test_configuration_is_41_bytes() {
        let config = TABLE.configuration(0).unwrap();
        assert_eq!(config.len(), 41);
        assert_eq!(u16::from_le_bytes([config[2], config[3]]), 41);
    }

    #[test]
    fn test_configuration_layout() {
        let config = TABLE.configuration(0).unwrap();
        // configuration header
        assert_eq!(&config[0..9], &[9, 0x02, 41, 0, 1, 1, 0, 0x80, 20]);
        // interface: HID, two endpoints
        assert_eq!(&config[9..18], &[9, 0x04, 0, 0, 2, 0x03, 0, 0, 0]);
        // HID 1.10 with a 43-byte report descriptor
        assert_eq!(&config[18..27], &[9, 0x21, 0x10, 0x01, 0, 1, 0x22, 43, 0]);
        // OUT 1 and IN 1, interrupt, 8 bytes, 10 ms
        assert_eq!(&config[27..34], &[7, 0x05, 0x01, 0x03, 8, 0, 10]);
        assert_eq!(&config[34..41], &[7, 0x05, 0x81, 0x03, 8, 0, 10]);
    }

    #[test]
    fn test_only_configuration_zero_exists() {
        assert!(TABLE.configuration(1).is_none());
    }

    #[test]
    fn test_string_descriptors() {
        assert_eq!(TABLE.string(0).unwrap(), &[4, 0x03, 0x09, 0x04]);

        let manufacturer = TABLE.string(string_index::MANUFACTURER).unwrap();
        assert_eq!(manufacturer.len(), 2 + 2 * "Ben Hekster".len());
        assert_eq!(&manufacturer[..6], &[24, 0x03, b'B', 0, b'e', 0]);

        let product = TABLE.string(string_index::PRODUCT).unwrap();
        assert_eq!(product[0] as usize, product.len());
        assert_eq!(product.len(), 48);

        assert!(TABLE.string(3).is_none());
    }

    #[test]
    fn test_string_errors() {
        let long = "0123456789012345678901234567890123456789";
        assert_eq!(
            StringDescriptor::from_ascii(long),
            Err(DescriptorError::TooLong)
        );
        assert_eq!(
            StringDescriptor::from_ascii("Pan\u{e9}l"),
            Err(DescriptorError::NotAscii)
        );
    }

    #[test]
    fn test_identity_changes_descriptors() {
        let identity = UsbIdentity {
            vendor_id: 0x1209,
            max_power_ma: 100,
            poll_interval_ms: 1,
            ..UsbIdentity::DEFAULT
        };
        let table = DescriptorTable::new(&identity);
        assert_eq!(&table.device()[8..10], &[0x09, 0x12]);

        let config = table.configuration(0).unwrap();
        assert_eq!(config[8], 50);
        assert_eq!(config[33], 1);
        assert_eq!(config[40], 1);
    }

    #[test]
    fn test_config_attributes() {
        let attrs = ConfigAttributes {
            self_powered: true,
            remote_wakeup: true,
        };
        assert_eq!(attrs.bits(), 0xE0);
    }
}
