//! Interrupt endpoint report
//!
//! The same 5-byte report travels in both directions: the panel sends it
//! after a local change, the host sends it to set both displays.

/// Report size in bytes
pub const REPORT_LEN: usize = 5;

/// Largest value a six-digit display can show
pub const VALUE_MAX: u32 = 999_999;

const FIELD_BITS: u32 = 20;
const FIELD_MASK: u32 = (1 << FIELD_BITS) - 1;

/// Report decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    /// Transfer length differs from [`REPORT_LEN`]
    WrongLength(usize),
}

/// Active and standby values
///
/// The wire format carries 20 bits per field; [`VALUE_MAX`] is a protocol
/// convention the wire does not enforce, so a decoded report may exceed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelReport {
    pub active: u32,
    pub standby: u32,
}

impl PanelReport {
    pub const fn new(active: u32, standby: u32) -> Self {
        Self { active, standby }
    }

    /// Pack into wire format
    ///
    /// Bits above the 20-bit field width are dropped.
    pub fn encode(&self) -> [u8; REPORT_LEN] {
        let packed =
            u64::from(self.active & FIELD_MASK) | (u64::from(self.standby & FIELD_MASK) << FIELD_BITS);
        let bytes = packed.to_le_bytes();
        [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]]
    }

    /// Unpack from wire format
    pub fn decode(bytes: &[u8]) -> Result<Self, ReportError> {
        let bytes: &[u8; REPORT_LEN] = bytes
            .try_into()
            .map_err(|_| ReportError::WrongLength(bytes.len()))?;

        let mut wide = [0u8; 8];
        wide[..REPORT_LEN].copy_from_slice(bytes);
        let packed = u64::from_le_bytes(wide);

        Ok(Self {
            active: (packed as u32) & FIELD_MASK,
            standby: ((packed >> FIELD_BITS) as u32) & FIELD_MASK,
        })
    }
}
