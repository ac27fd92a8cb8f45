//! Recording USB peripheral for host tests
//!
//! Every task completes instantly: each awaited event is reported as
//! already raised, and the order of calls is recorded for inspection.

use heapless::Vec;
use radiopanel_hal::{EndpointDirection, UsbEvent, UsbPeripheral, UsbTask};
use radiopanel_protocol::SetupPacket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    PowerUp,
    PowerDown,
    StageIn(u8, usize),
    StageOut(u8),
    ReadOut(u8),
    Trigger(UsbTask),
    Event(UsbEvent),
    Enable(u8, EndpointDirection),
    ArmOut(u8),
}

pub struct MockUsb {
    pub calls: Vec<Call, 128>,
    pub detected: bool,
    pub removed: bool,
    pub setup_pending: bool,
    pub data_out: bool,
    setup: [u8; 8],
    in_buf: [[u8; 64]; 2],
    in_len: [usize; 2],
    out_buf: [u8; 8],
    out_len: usize,
}

impl MockUsb {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            detected: false,
            removed: false,
            setup_pending: false,
            data_out: false,
            setup: [0; 8],
            in_buf: [[0; 64]; 2],
            in_len: [0; 2],
            out_buf: [0; 8],
            out_len: 0,
        }
    }

    /// Latch a SETUP packet and raise the setup flag
    pub fn receive_setup(&mut self, packet: SetupPacket) {
        self.setup = packet.to_bytes();
        self.setup_pending = true;
    }

    /// Place a host packet in the OUT endpoint and raise the data flag
    pub fn queue_out(&mut self, data: &[u8]) {
        self.out_buf[..data.len()].copy_from_slice(data);
        self.out_len = data.len();
        self.data_out = true;
    }

    /// Bytes of the last transfer staged on IN endpoint `ep`
    pub fn in_data(&self, ep: u8) -> &[u8] {
        &self.in_buf[ep as usize][..self.in_len[ep as usize]]
    }

    pub fn triggered(&self, task: UsbTask) -> usize {
        self.calls
            .iter()
            .filter(|&&call| call == Call::Trigger(task))
            .count()
    }

    pub fn stalled(&self) -> bool {
        self.triggered(UsbTask::Ep0Stall) > 0
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn record(&mut self, call: Call) {
        self.calls.push(call).unwrap();
    }
}

impl UsbPeripheral for MockUsb {
    fn take_detected(&mut self) -> bool {
        core::mem::take(&mut self.detected)
    }

    fn take_removed(&mut self) -> bool {
        core::mem::take(&mut self.removed)
    }

    fn take_setup(&mut self) -> bool {
        core::mem::take(&mut self.setup_pending)
    }

    fn take_data_out(&mut self) -> bool {
        core::mem::take(&mut self.data_out)
    }

    fn power_up(&mut self) {
        self.record(Call::PowerUp);
    }

    fn power_down(&mut self) {
        self.record(Call::PowerDown);
    }

    fn setup_packet(&self) -> [u8; 8] {
        self.setup
    }

    fn stage_in(&mut self, ep: u8, data: &[u8]) -> usize {
        let capacity = if ep == 0 { 64 } else { 8 };
        let len = data.len().min(capacity);
        self.in_buf[ep as usize][..len].copy_from_slice(&data[..len]);
        self.in_len[ep as usize] = len;
        self.record(Call::StageIn(ep, len));
        len
    }

    fn stage_out(&mut self, ep: u8) {
        self.record(Call::StageOut(ep));
    }

    fn read_out(&mut self, ep: u8, buf: &mut [u8]) -> usize {
        self.record(Call::ReadOut(ep));
        let len = self.out_len.min(buf.len());
        buf[..len].copy_from_slice(&self.out_buf[..len]);
        len
    }

    fn trigger(&mut self, task: UsbTask) {
        self.record(Call::Trigger(task));
    }

    fn take_event(&mut self, event: UsbEvent) -> bool {
        self.record(Call::Event(event));
        true
    }

    fn enable_endpoint(&mut self, ep: u8, direction: EndpointDirection) {
        self.record(Call::Enable(ep, direction));
    }

    fn arm_out(&mut self, ep: u8) {
        self.record(Call::ArmOut(ep));
    }
}
