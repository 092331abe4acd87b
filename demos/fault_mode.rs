//! Fault-mode demo: replay a canned host session against the emulated device
//!
//! No USB hardware is involved; a loopback stack stands in for the external
//! device stack and issues the same command sequence a host sends right
//! after mounting a removable disk. Run with `RUST_LOG=debug` to see the
//! per-command outcomes.

use msc_emu::{
    InitFailurePolicy, MscDevice, MscResult, Scheduler, SystemClock, UsbStack, VirtualVolume,
};
use std::time::Duration;

/// Loopback stack replaying a fixed host session, one command per pump
struct LoopbackStack {
    cdbs: Vec<Vec<u8>>,
    cursor: usize,
}

impl LoopbackStack {
    fn new() -> Self {
        LoopbackStack {
            cdbs: vec![
                vec![0x12, 0, 0, 0, 36, 0],               // INQUIRY
                vec![0x00, 0, 0, 0, 0, 0],                // TEST UNIT READY
                vec![0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0],    // READ CAPACITY (10)
                vec![0x28, 0, 0, 0, 0, 0, 0, 0, 1, 0],    // READ (10), 1 block
                vec![0x2A, 0, 0, 0, 0, 0, 0, 0, 1, 0],    // WRITE (10), 1 block
                vec![0x1A, 0, 0x3F, 0, 255, 0],           // MODE SENSE (6), unsupported
            ],
            cursor: 0,
        }
    }

    fn done(&self) -> bool {
        self.cursor >= self.cdbs.len()
    }
}

impl UsbStack<VirtualVolume> for LoopbackStack {
    fn init(&mut self) -> MscResult<()> {
        Ok(())
    }

    fn task(&mut self, device: &MscDevice<VirtualVolume>) {
        if self.cursor == 0 {
            device.on_mount();
        }
        if let Some(cdb) = self.cdbs.get(self.cursor) {
            match device.dispatch(0, cdb) {
                Ok(reply) => println!("cdb {:#04x} -> {:?}", cdb[0], reply),
                Err(e) => eprintln!("cdb {:#04x} -> error: {}", cdb[0], e),
            }
            self.cursor += 1;
            if self.done() {
                device.on_unmount();
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let device = MscDevice::builder()
        .fault_mode(true)
        .heartbeat_interval(Duration::from_millis(1000))
        .build(VirtualVolume)?;

    println!(
        "emulating {} bytes ({} blocks of {}), fault mode on",
        device.capacity(0).total_bytes(),
        device.capacity(0).block_count,
        device.capacity(0).block_size,
    );

    let mut stack = LoopbackStack::new();
    let mut scheduler = Scheduler::new(SystemClock::new(), device.config().heartbeat_interval);
    scheduler.start(&mut stack, InitFailurePolicy::Halt)?;

    // A real deployment calls `scheduler.run` and never returns; the demo
    // stops once the canned session is exhausted.
    while !stack.done() {
        scheduler.step(&mut stack, &device);
    }

    Ok(())
}
