//! USB device controller
//!
//! Register-level [`UsbPeripheral`] for USBD. Only three interrupts are
//! enabled (USBEVENT, EP0SETUP, EPDATA); every DMA completion event is
//! polled by the transfer code in the core crate.
//!
//! # Power-up
//!
//! ```text
//! errata begin ─► ENABLE ─► HFCLKSTART ─► EVENTCAUSE.READY ─► errata end
//!      ─► USB power ready ─► HFCLKSTARTED ─► EP0 IN/OUT ─► D+ pull-up
//! ```

use embassy_nrf::interrupt::{self, InterruptExt};
use embassy_nrf::pac;
use embassy_nrf::pac::usbd::regs::Epdatastatus;
use embassy_nrf::peripherals::USBD;
use embassy_nrf::Peri;
use radiopanel_hal::{EndpointDirection, SignalFlag, UsbEvent, UsbPeripheral, UsbTask};

use crate::power;

static SETUP: SignalFlag = SignalFlag::new();
static DATA_OUT: SignalFlag = SignalFlag::new();

/// OUT endpoint whose arrivals raise [`UsbPeripheral::take_data_out`]
const REPORT_OUT_ENDPOINT: usize = 1;

/// EPDATASTATUS has no bits for endpoint 0, so its EPOUT field 0 is EPOUT1
const fn status_index(ep: usize) -> usize {
    ep - 1
}

/// Whether EPDATASTATUS reports a packet waiting on the report OUT endpoint
fn report_out_pending(status: Epdatastatus) -> bool {
    status.epout(status_index(REPORT_OUT_ENDPOINT))
}

/// EasyDMA buffers
///
/// Must live in RAM for the whole program; the firmware keeps them in a
/// `StaticCell`.
#[repr(C, align(4))]
pub struct UsbBuffers {
    ep0_in: [u8; 64],
    ep1_in: [u8; 8],
    ep1_out: [u8; 8],
}

impl UsbBuffers {
    pub const fn new() -> Self {
        Self {
            ep0_in: [0; 64],
            ep1_in: [0; 8],
            ep1_out: [0; 8],
        }
    }
}

impl Default for UsbBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// nRF52840 anomalies 171 and 187, from the nrfx USBD driver
mod errata {
    use core::ptr::{read_volatile, write_volatile};

    const FICR_INFO_PART_VARIANT: *const u32 = 0x1000_0130 as *const u32;
    const UNLOCK: *mut u32 = 0x4006_EC00 as *mut u32;
    const UNLOCK_KEY: u32 = 0x9375;
    const ERRATA_171: *mut u32 = 0x4006_EC14 as *mut u32;
    const ERRATA_187: *mut u32 = 0x4006_ED14 as *mut u32;

    pub fn applies() -> bool {
        // SAFETY: FICR is always readable
        unsafe { read_volatile(FICR_INFO_PART_VARIANT) == 8 }
    }

    fn poke(register: *mut u32, value: u32) {
        // SAFETY: undocumented registers, written exactly as the vendor driver does
        unsafe {
            if read_volatile(UNLOCK) == 0 {
                write_volatile(UNLOCK, UNLOCK_KEY);
                write_volatile(register, value);
                write_volatile(UNLOCK, UNLOCK_KEY);
            } else {
                write_volatile(register, value);
            }
        }
    }

    pub fn begin() {
        poke(ERRATA_187, 0x03);
        poke(ERRATA_171, 0xC0);
    }

    pub fn end() {
        poke(ERRATA_171, 0x00);
        poke(ERRATA_187, 0x00);
    }
}

/// USBD with its DMA buffers
pub struct Usbd<'d> {
    _usbd: Peri<'d, USBD>,
    buffers: &'d mut UsbBuffers,
    out_len: usize,
}

impl<'d> Usbd<'d> {
    /// Enable the controller interrupts; the bus stays detached until
    /// [`UsbPeripheral::power_up`]
    pub fn new(usbd: Peri<'d, USBD>, buffers: &'d mut UsbBuffers) -> Self {
        let r = pac::USBD;
        interrupt::USBD.disable();
        r.intenclr().write(|w| w.0 = u32::MAX);

        crate::enable_interrupt(interrupt::USBD);
        r.intenset().write(|w| {
            w.set_usbevent(true);
            w.set_ep0setup(true);
            w.set_epdata(true);
        });

        Self {
            _usbd: usbd,
            buffers,
            out_len: 0,
        }
    }

    /// Body of the USBD interrupt handler
    pub fn on_interrupt() {
        let r = pac::USBD;

        // suspend and resume are not handled
        if r.events_usbevent().read() != 0 {
            r.events_usbevent().write_value(0);
        }

        if r.events_ep0setup().read() != 0 {
            r.events_ep0setup().write_value(0);
            SETUP.set();
        }

        if r.events_epdata().read() != 0 {
            r.events_epdata().write_value(0);

            let status = r.epdatastatus().read();
            r.epdatastatus().write_value(status);
            if report_out_pending(status) {
                DATA_OUT.set();
            }
        }
    }

    fn in_buffer(&mut self, ep: u8) -> &mut [u8] {
        match ep {
            0 => &mut self.buffers.ep0_in[..],
            _ => &mut self.buffers.ep1_in[..],
        }
    }
}

impl UsbPeripheral for Usbd<'_> {
    fn take_detected(&mut self) -> bool {
        power::take_detected()
    }

    fn take_removed(&mut self) -> bool {
        power::take_removed()
    }

    fn take_setup(&mut self) -> bool {
        SETUP.test_and_clear()
    }

    fn take_data_out(&mut self) -> bool {
        DATA_OUT.test_and_clear()
    }

    fn power_up(&mut self) {
        let r = pac::USBD;
        let errata = errata::applies();

        if errata {
            errata::begin();
        }

        r.enable().write(|w| w.set_enable(true));
        pac::CLOCK.tasks_hfclkstart().write_value(1);

        while !r.eventcause().read().ready() {
            core::hint::spin_loop();
        }
        r.eventcause().write(|w| w.set_ready(true));

        if errata {
            errata::end();
        }

        while !power::is_ready() {
            core::hint::spin_loop();
        }

        let clock = pac::CLOCK;
        while clock.events_hfclkstarted().read() == 0 {
            core::hint::spin_loop();
        }
        clock.events_hfclkstarted().write_value(0);

        r.epinen().modify(|w| w.set_in(0, true));
        r.epouten().modify(|w| w.set_out(0, true));

        r.usbpullup().write(|w| w.set_connect(true));

        #[cfg(feature = "defmt")]
        defmt::info!("USB pull-up enabled");
    }

    fn power_down(&mut self) {
        let r = pac::USBD;
        r.usbpullup().write(|w| w.set_connect(false));
        r.epinen().write(|_| ());
        r.epouten().write(|_| ());
        // the next ENABLE raises EVENTCAUSE.READY again
        r.enable().write(|w| w.set_enable(false));

        #[cfg(feature = "defmt")]
        defmt::info!("USB disabled");
    }

    fn setup_packet(&self) -> [u8; 8] {
        let r = pac::USBD;
        [
            r.bmrequesttype().read().0 as u8,
            r.brequest().read().0 as u8,
            r.wvaluel().read().0 as u8,
            r.wvalueh().read().0 as u8,
            r.windexl().read().0 as u8,
            r.windexh().read().0 as u8,
            r.wlengthl().read().0 as u8,
            r.wlengthh().read().0 as u8,
        ]
    }

    fn stage_in(&mut self, ep: u8, data: &[u8]) -> usize {
        let buf = self.in_buffer(ep);
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        let ptr = buf.as_ptr() as u32;

        let r = pac::USBD;
        r.epin(ep as usize).ptr().write_value(ptr);
        r.epin(ep as usize).maxcnt().write(|w| w.set_maxcnt(len as u8));
        len
    }

    fn stage_out(&mut self, ep: u8) {
        let r = pac::USBD;
        let buf = &mut self.buffers.ep1_out;
        let received = r.size().epout(ep as usize).read().0 as usize;
        self.out_len = received.min(buf.len());

        r.epout(ep as usize).ptr().write_value(buf.as_mut_ptr() as u32);
        r.epout(ep as usize)
            .maxcnt()
            .write(|w| w.set_maxcnt(self.out_len as u8));
    }

    fn read_out(&mut self, _ep: u8, buf: &mut [u8]) -> usize {
        let len = self.out_len.min(buf.len());
        buf[..len].copy_from_slice(&self.buffers.ep1_out[..len]);
        len
    }

    fn trigger(&mut self, task: UsbTask) {
        let r = pac::USBD;
        match task {
            UsbTask::StartEpIn(ep) => r.tasks_startepin(ep as usize).write_value(1),
            UsbTask::StartEpOut(ep) => r.tasks_startepout(ep as usize).write_value(1),
            UsbTask::Ep0Status => r.tasks_ep0status().write_value(1),
            UsbTask::Ep0Stall => r.tasks_ep0stall().write_value(1),
        }
    }

    fn take_event(&mut self, event: UsbEvent) -> bool {
        let r = pac::USBD;
        let register = match event {
            UsbEvent::Started => r.events_started(),
            UsbEvent::EndEpIn(ep) => r.events_endepin(ep as usize),
            UsbEvent::EndEpOut(ep) => r.events_endepout(ep as usize),
            UsbEvent::Ep0DataDone => r.events_ep0datadone(),
        };

        if register.read() == 0 {
            return false;
        }
        register.write_value(0);
        true
    }

    fn enable_endpoint(&mut self, ep: u8, direction: EndpointDirection) {
        let r = pac::USBD;
        match direction {
            EndpointDirection::In => r.epinen().modify(|w| w.set_in(ep as usize, true)),
            EndpointDirection::Out => r.epouten().modify(|w| w.set_out(ep as usize, true)),
        }
    }

    fn arm_out(&mut self, ep: u8) {
        // any write to SIZE.EPOUT lets the endpoint accept the next packet
        pac::USBD.size().epout(ep as usize).write(|_| ());
    }
}
