//! Configuration type definitions

pub use radiopanel_protocol::UsbIdentity;

/// Complete panel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelConfig {
    /// Values and key bindings
    pub panel: PanelSettings,
    /// Display controller setup
    pub display: DisplaySetup,
    /// USB identity and descriptor parameters
    pub usb: UsbIdentity,
}

impl PanelConfig {
    pub const DEFAULT: Self = Self {
        panel: PanelSettings::DEFAULT,
        display: DisplaySetup::DEFAULT,
        usb: UsbIdentity::DEFAULT,
    };
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Panel behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelSettings {
    /// Initial active value
    pub active: u32,
    /// Initial standby value
    pub standby: u32,
    /// Standby change per detent
    pub coarse_step: u32,
    /// Standby change per detent while the decimals key is held
    pub fine_step: u32,
    /// Debounced key bit that swaps active and standby
    pub swap_key: u8,
    /// Instantaneous key bit that selects the fine step
    pub decimals_key: u8,
}

impl PanelSettings {
    pub const DEFAULT: Self = Self {
        active: 121_500,
        standby: 122_900,
        coarse_step: 1000,
        fine_step: 25,
        swap_key: 1 << 1,
        decimals_key: 1 << 0,
    };
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Display controller setup applied at boot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplaySetup {
    /// Highest scanned digit pair (0-7)
    pub scan_limit: u8,
    /// Global brightness (0-15)
    pub intensity: u8,
    /// Per-digit 7-segment (0) or 14/16-segment (1) selection
    pub digit_type: u8,
    /// Per-digit hexadecimal font decoding
    pub decode_mode: u8,
    /// Port configuration: key scanning and IRQ output
    pub port_config: u8,
    /// Keys of the first bank that raise the interrupt output
    pub key_mask: u8,
}

impl DisplaySetup {
    pub const DEFAULT: Self = Self {
        // digit pairs 0/0a through 5/5a
        scan_limit: 5,
        intensity: 0,
        digit_type: 0x00,
        decode_mode: 0xFF,
        // 8 keys scanned, P4 becomes IRQ
        port_config: 0x20,
        key_mask: 1 << 1,
    };
}

impl Default for DisplaySetup {
    fn default() -> Self {
        Self::DEFAULT
    }
}
