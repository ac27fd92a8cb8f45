//! HID report descriptor items
//!
//! A report descriptor is a flat sequence of short items. Each item starts
//! with a prefix byte followed by 0, 1, 2 or 4 little-endian data bytes:
//! ```text
//!   7   6   5   4   3   2   1   0
//! ┌───────────────┬───────┬───────┐
//! │      tag      │ type  │ size  │
//! └───────────────┴───────┴───────┘
//! ```
//! `size` is 0, 1, 2 or 3, where 3 means four bytes.

use crate::descriptor::DescriptorError;

/// Largest report descriptor that fits a single control packet
pub const MAX_REPORT_DESCRIPTOR_LEN: usize = 64;

/// Item type field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ItemType {
    Main = 0,
    Global = 1,
    Local = 2,
}

/// Main item tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MainTag {
    Input = 0x8,
    Output = 0x9,
    Collection = 0xA,
    Feature = 0xB,
    EndCollection = 0xC,
}

/// Global item tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GlobalTag {
    UsagePage = 0x0,
    LogicalMinimum = 0x1,
    LogicalMaximum = 0x2,
    PhysicalMinimum = 0x3,
    PhysicalMaximum = 0x4,
    UnitExponent = 0x5,
    Unit = 0x6,
    ReportSize = 0x7,
    ReportId = 0x8,
    ReportCount = 0x9,
    Push = 0xA,
    Pop = 0xB,
}

/// Local item tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LocalTag {
    Usage = 0x0,
    UsageMinimum = 0x1,
    UsageMaximum = 0x2,
}

/// Collection kinds (data of a Collection item)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Collection {
    Physical = 0x00,
    Application = 0x01,
    Logical = 0x02,
}

/// Input/Output/Feature item flags
pub mod flags {
    pub const CONSTANT: u8 = 1 << 0;
    pub const VARIABLE: u8 = 1 << 1;
    pub const RELATIVE: u8 = 1 << 2;
    pub const WRAP: u8 = 1 << 3;
    pub const NON_LINEAR: u8 = 1 << 4;
    pub const NO_PREFERRED: u8 = 1 << 5;
    pub const NULL_STATE: u8 = 1 << 6;
    pub const VOLATILE: u8 = 1 << 7;
}

/// Item payload, sized as it will be encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ItemData {
    None,
    U8(u8),
    U16(u16),
    U32(u32),
}

impl ItemData {
    const fn size_code(self) -> u8 {
        match self {
            ItemData::None => 0,
            ItemData::U8(_) => 1,
            ItemData::U16(_) => 2,
            ItemData::U32(_) => 3,
        }
    }

    const fn len(self) -> usize {
        match self {
            ItemData::None => 0,
            ItemData::U8(_) => 1,
            ItemData::U16(_) => 2,
            ItemData::U32(_) => 4,
        }
    }

    const fn as_u32(self) -> u32 {
        match self {
            ItemData::None => 0,
            ItemData::U8(v) => v as u32,
            ItemData::U16(v) => v as u32,
            ItemData::U32(v) => v,
        }
    }
}

/// One short item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Item {
    item_type: ItemType,
    tag: u8,
    data: ItemData,
}

impl Item {
    pub const fn main(tag: MainTag, data: ItemData) -> Self {
        Self {
            item_type: ItemType::Main,
            tag: tag as u8,
            data,
        }
    }

    pub const fn global(tag: GlobalTag, data: ItemData) -> Self {
        Self {
            item_type: ItemType::Global,
            tag: tag as u8,
            data,
        }
    }

    pub const fn local(tag: LocalTag, data: ItemData) -> Self {
        Self {
            item_type: ItemType::Local,
            tag: tag as u8,
            data,
        }
    }

    /// Prefix byte
    pub const fn prefix(&self) -> u8 {
        (self.tag << 4) | ((self.item_type as u8) << 2) | self.data.size_code()
    }

    /// Encoded length including the prefix
    pub const fn encoded_len(&self) -> usize {
        1 + self.data.len()
    }
}

/// An encoded report descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportDescriptor {
    buf: [u8; MAX_REPORT_DESCRIPTOR_LEN],
    len: usize,
}

impl ReportDescriptor {
    /// Concatenate `items` into a descriptor
    pub const fn build(items: &[Item]) -> Result<Self, DescriptorError> {
        let mut buf = [0u8; MAX_REPORT_DESCRIPTOR_LEN];
        let mut len = 0;
        let mut i = 0;
        while i < items.len() {
            let item = items[i];
            if len + item.encoded_len() > MAX_REPORT_DESCRIPTOR_LEN {
                return Err(DescriptorError::TooLong);
            }
            buf[len] = item.prefix();
            len += 1;

            let bytes = item.data.as_u32().to_le_bytes();
            let mut b = 0;
            while b < item.data.len() {
                buf[len] = bytes[b];
                len += 1;
                b += 1;
            }
            i += 1;
        }
        Ok(Self { buf, len })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Vendor-defined usage page used by the panel
pub const USAGE_PAGE_PANEL: u16 = 0xFFA0;

/// Largest value a display can show
const LOGICAL_MAX: u32 = 999_999;

/// Bits per value field
const FIELD_BITS: u8 = 20;

const FIELD_FLAGS: u8 = flags::VARIABLE | flags::NO_PREFERRED | flags::VOLATILE;

/// The panel's report layout
///
/// One application collection holding a physical collection with an input
/// and an output field, each two 20-bit values ranging over 0..=999999.
pub const PANEL_REPORT_ITEMS: [Item; 19] = [
    Item::global(GlobalTag::UsagePage, ItemData::U16(USAGE_PAGE_PANEL)),
    // usages 0x01..=0x1F are reserved for top-level collections
    Item::local(LocalTag::Usage, ItemData::U8(0x01)),
    Item::main(MainTag::Collection, ItemData::U8(Collection::Application as u8)),
    Item::local(LocalTag::Usage, ItemData::U8(0x20)),
    Item::main(MainTag::Collection, ItemData::U8(Collection::Physical as u8)),
    // panel to host
    Item::local(LocalTag::Usage, ItemData::U8(0x21)),
    Item::global(GlobalTag::LogicalMinimum, ItemData::U8(0)),
    Item::global(GlobalTag::LogicalMaximum, ItemData::U32(LOGICAL_MAX)),
    Item::global(GlobalTag::ReportCount, ItemData::U8(2)),
    Item::global(GlobalTag::ReportSize, ItemData::U8(FIELD_BITS)),
    Item::main(MainTag::Input, ItemData::U8(FIELD_FLAGS)),
    // host to panel
    Item::local(LocalTag::Usage, ItemData::U8(0x22)),
    Item::global(GlobalTag::LogicalMinimum, ItemData::U8(0)),
    Item::global(GlobalTag::LogicalMaximum, ItemData::U32(LOGICAL_MAX)),
    Item::global(GlobalTag::ReportCount, ItemData::U8(2)),
    Item::global(GlobalTag::ReportSize, ItemData::U8(FIELD_BITS)),
    Item::main(MainTag::Output, ItemData::U8(FIELD_FLAGS)),
    Item::main(MainTag::EndCollection, ItemData::None),
    Item::main(MainTag::EndCollection, ItemData::None),
];
