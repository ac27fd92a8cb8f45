//! Synchronous endpoint transfers
//!
//! Every transfer follows the controller's DMA handshake: stage the
//! buffer, trigger the start task, then wait for each completion event in
//! order. The waits spin on the event registers; the controller does not
//! interrupt on them.

use radiopanel_hal::{UsbEvent, UsbPeripheral, UsbTask};
use radiopanel_protocol::descriptor::REPORT_ENDPOINT;
use radiopanel_protocol::{PanelReport, ReportError, REPORT_LEN};

/// Largest OUT transfer accepted on the report endpoint
const OUT_BUFFER_LEN: usize = 8;

fn wait_for<U: UsbPeripheral>(usb: &mut U, event: UsbEvent) {
    while !usb.take_event(event) {
        core::hint::spin_loop();
    }
}

/// Send `data` on IN endpoint `ep`
///
/// On endpoint 0 this is a control data stage and also completes the
/// status stage. Returns the number of bytes sent.
pub fn send<U: UsbPeripheral>(usb: &mut U, ep: u8, data: &[u8]) -> usize {
    let staged = usb.stage_in(ep, data);
    usb.trigger(UsbTask::StartEpIn(ep));
    wait_for(usb, UsbEvent::Started);
    wait_for(usb, UsbEvent::EndEpIn(ep));

    if ep == 0 {
        wait_for(usb, UsbEvent::Ep0DataDone);
        usb.trigger(UsbTask::Ep0Status);
    }

    staged
}

/// Receive the packet waiting in OUT endpoint `ep` into `buf`
///
/// Returns the number of bytes received.
pub fn receive<U: UsbPeripheral>(usb: &mut U, ep: u8, buf: &mut [u8]) -> usize {
    usb.stage_out(ep);
    usb.trigger(UsbTask::StartEpOut(ep));
    wait_for(usb, UsbEvent::Started);
    wait_for(usb, UsbEvent::EndEpOut(ep));

    usb.read_out(ep, buf)
}

/// Send the panel values on the interrupt IN endpoint
pub fn send_report<U: UsbPeripheral>(usb: &mut U, report: &PanelReport) {
    send(usb, REPORT_ENDPOINT, &report.encode());
}

/// Receive a host report from the interrupt OUT endpoint
pub fn receive_report<U: UsbPeripheral>(usb: &mut U) -> Result<PanelReport, ReportError> {
    let mut buf = [0u8; OUT_BUFFER_LEN];
    let len = receive(usb, REPORT_ENDPOINT, &mut buf);
    PanelReport::decode(&buf[..len])
}
