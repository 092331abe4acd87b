//! A USB Mass Storage Class device emulator for probing bulk-only transport
//! edge cases
//!
//! This library emulates a fixed-size, read-only MSC block device whose sole
//! purpose is to exercise transfer-size edge cases in a host's bulk-only
//! transport handling — notably reporting reads one byte short of the
//! request, which provokes an endpoint re-arming defect in the host stack.
//! The short report is a configurable fault mode, not an accident: the
//! corrected behavior is available alongside so both can be compared.
//!
//! The USB link layer, enumeration, and bulk DMA engine are external
//! collaborators behind the [`UsbStack`] trait; this crate owns the SCSI
//! command handlers, the transfer-size policy, and the cooperative poll loop
//! that drives the stack.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use msc_emu::{MscDevice, MscResult, Scheduler, SystemClock, UsbStack, VirtualVolume};
//!
//! # struct MyUsbStack;
//! # impl UsbStack<VirtualVolume> for MyUsbStack {
//! #     fn init(&mut self) -> MscResult<()> { Ok(()) }
//! #     fn task(&mut self, _device: &MscDevice<VirtualVolume>) {}
//! # }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let device = MscDevice::builder()
//!     .fault_mode(true)
//!     .heartbeat_interval(Duration::from_millis(1000))
//!     .build(VirtualVolume)?;
//!
//! let mut stack = MyUsbStack;
//! let scheduler = Scheduler::new(SystemClock::new(), device.config().heartbeat_interval);
//! scheduler.start(&mut stack, device.config().init_failure_policy)?;
//! scheduler.run(&mut stack, &device);
//! # }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod scheduler;
pub mod scsi;
pub mod transfer;
pub mod volume;

pub use config::{InitFailurePolicy, MscConfig};
pub use device::{MscDevice, MscDeviceBuilder};
pub use error::{MscError, MscResult};
pub use scheduler::{Clock, Heartbeat, Scheduler, SystemClock, UsbStack};
pub use scsi::{ScsiOpcode, ScsiReply};
pub use transfer::{report_transfer, TransferOutcome, TransferReporter, TransferRequest, TRANSFER_ERROR};
pub use volume::{BlockStore, DeviceIdentity, VirtualVolume, VolumeDescriptor};

/// Version of this library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
