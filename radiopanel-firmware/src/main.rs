//! Radio Panel - Flight Simulator Radio Panel Firmware
//!
//! Main firmware binary for the nRF52840 panel board: a MAX6954 driving
//! twelve 7-segment digits and scanning the keys, a mechanical rotary
//! encoder on QDEC, and a USB HID function carrying the active and
//! standby values to and from the simulator.
//!
//! There is no executor. Interrupt handlers only clear their event and
//! set a flag; the main loop sleeps in `WFE` and services every flag on
//! each wake-up.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::interrupt;
use static_cell::StaticCell;

#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use radiopanel_core::bus::BusTransactor;
use radiopanel_core::config::PanelConfig;
use radiopanel_core::panel::{Activity, Panel};
use radiopanel_drivers::Max6954;
use radiopanel_hal::spi::SpiConfig;
use radiopanel_hal_nrf52840::gpiote::KeyIrq;
use radiopanel_hal_nrf52840::power;
use radiopanel_hal_nrf52840::qdec::Qdec;
use radiopanel_hal_nrf52840::spim::Spim3;
use radiopanel_hal_nrf52840::usbd::{UsbBuffers, Usbd};
use radiopanel_hal_nrf52840::Wfe;
use radiopanel_protocol::DescriptorTable;

// Board configuration generated from panel.toml
include!(concat!(env!("OUT_DIR"), "/panel_config.rs"));

/// Descriptors answered on EP0, fixed for the life of the program
static DESCRIPTORS: DescriptorTable = DescriptorTable::new(&PANEL_CONFIG.usb);

static USB_BUFFERS: StaticCell<UsbBuffers> = StaticCell::new();

#[entry]
fn main() -> ! {
    #[cfg(feature = "defmt")]
    defmt::info!("Radio panel starting...");

    let p = embassy_nrf::init(Default::default());

    // Indicator LEDs, active high
    let fault = Output::new(p.P1_15, Level::Low, OutputDrive::Standard);
    let status = Output::new(p.P1_10, Level::Low, OutputDrive::Standard);

    // Supply events may already be latched, so this comes before USBD
    power::init();

    // MAX6954: CSN P1.08, SCK P0.14, MOSI P0.13, MISO P0.15, IRQ P0.26
    let spim = Spim3::new(
        p.SPI3,
        p.P1_08,
        p.P0_14,
        p.P0_13,
        p.P0_15,
        &SpiConfig::default(),
    );
    let bus = BusTransactor::new(spim, Spim3::done_flag(), Wfe);
    let key_irq = KeyIrq::new(p.GPIOTE_CH0, p.P0_26);
    let display = Max6954::new(bus, key_irq);

    // Encoder: A P0.06, B P0.08
    let decoder = Qdec::new(p.QDEC, p.P0_06, p.P0_08);

    let usb = Usbd::new(p.USBD, USB_BUFFERS.init(UsbBuffers::new()));

    let config: &PanelConfig = &PANEL_CONFIG;
    #[cfg(feature = "defmt")]
    defmt::info!("Config: {}", config);

    let mut panel = Panel::new(display, decoder, usb, fault, status, &DESCRIPTORS, config);
    panel.init();

    #[cfg(feature = "defmt")]
    defmt::info!("Panel ready");

    panel.run(Wfe, log_activity)
}

/// Report what one loop iteration did
fn log_activity(activity: &Activity) {
    if activity.is_idle() {
        return;
    }

    #[cfg(feature = "defmt")]
    {
        if let Some(Err(e)) = &activity.control {
            defmt::warn!("Control request stalled: {}", e);
        }
        if let Some(Err(e)) = &activity.host_write {
            defmt::warn!("Host write ignored: {}", e);
        }
        defmt::debug!("{}", activity);
    }
}

#[cfg(not(feature = "defmt"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    cortex_m::asm::udf()
}

#[cortex_m_rt::interrupt]
fn SPIM3() {
    Spim3::on_interrupt();
}

#[cortex_m_rt::interrupt]
fn QDEC() {
    Qdec::on_interrupt();
}

#[cortex_m_rt::interrupt]
fn GPIOTE() {
    KeyIrq::on_interrupt();
}

#[cortex_m_rt::interrupt]
fn USBD() {
    Usbd::on_interrupt();
}

#[cortex_m_rt::interrupt]
fn CLOCK_POWER() {
    power::on_interrupt();
}
