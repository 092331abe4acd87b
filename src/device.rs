//! Emulated MSC device: callback surface and command dispatch
//!
//! This module carries the contract the external USB stack calls into when
//! the host issues a SCSI command over bulk-only transport. Every handler is
//! stateless and idempotent and returns promptly; the command/data/status
//! phase sequencing belongs to the stack.
//!
//! All `lun` parameters are accepted but ignored — the device exposes a
//! single logical unit.

use crate::config::MscConfig;
use crate::error::{MscError, MscResult};
use crate::scsi::{
    parse_inquiry_alloc_len, parse_prevent_allow_cdb, parse_rw10_cdb, parse_start_stop_cdb,
    ScsiOpcode, ScsiReply,
};
use crate::transfer::{TransferOutcome, TransferReporter, TransferRequest, TRANSFER_ERROR};
use crate::volume::{BlockStore, DeviceIdentity, VolumeDescriptor};

/// Emulated USB mass storage device
pub struct MscDevice<B: BlockStore> {
    store: B,
    reporter: TransferReporter,
    config: MscConfig,
}

impl<B: BlockStore> MscDevice<B> {
    /// Create a new builder for configuring the device
    pub fn builder() -> MscDeviceBuilder<B> {
        MscDeviceBuilder::new()
    }

    pub fn config(&self) -> &MscConfig {
        &self.config
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    // ------------------------------------------------------------------
    // Callback surface invoked by the external stack (one per SCSI command)
    // ------------------------------------------------------------------

    /// INQUIRY: fixed identity fields, supplied verbatim
    pub fn inquiry(&self, _lun: u8) -> DeviceIdentity {
        self.store.identity()
    }

    /// READ CAPACITY: fixed volume geometry
    pub fn capacity(&self, _lun: u8) -> VolumeDescriptor {
        self.store.descriptor()
    }

    /// TEST UNIT READY: the device never reports "not ready"
    pub fn test_unit_ready(&self, _lun: u8) -> bool {
        self.store.is_ready()
    }

    /// START STOP UNIT: always accepted, all flags ignored
    pub fn start_stop(&self, _lun: u8, _power_condition: u8, _start: bool, _load_eject: bool) -> bool {
        true
    }

    /// PREVENT ALLOW MEDIUM REMOVAL: always accepted, flags ignored
    pub fn prevent_allow_medium_removal(&self, _lun: u8, _prevent: u8, _control: u8) -> bool {
        true
    }

    /// READ (10) data callback: report bytes moved for one chunk.
    ///
    /// The outcome comes from the transfer reporter regardless of whether
    /// the request addresses a valid block — in fault mode that means one
    /// byte short of every request, which is the behavior under test.
    pub fn read10(&self, _lun: u8, lba: u32, offset: u32, bufsize: u32) -> TransferOutcome {
        let request = TransferRequest {
            lba,
            offset,
            requested: bufsize,
        };
        if !self.store.descriptor().contains_block(lba) {
            log::debug!("read10 beyond capacity: lba={lba}");
        }
        let outcome = self.reporter.report(request.requested);
        log::trace!(
            "read10 lba={} offset={} requested={} reported={}",
            request.lba,
            request.offset,
            request.requested,
            outcome
        );
        outcome
    }

    /// WRITE (10) data callback: every write is rejected (read-only medium)
    pub fn write10(&self, _lun: u8, lba: u32, _offset: u32, buf: &[u8]) -> TransferOutcome {
        log::debug!("write10 rejected: lba={} bytes={}", lba, buf.len());
        TRANSFER_ERROR
    }

    /// IS WRITABLE: consistent with write10 always failing
    pub fn is_writable(&self, _lun: u8) -> bool {
        self.store.is_writable()
    }

    /// Catch-all for SCSI opcodes outside the explicit set.
    ///
    /// Must never silently succeed.
    pub fn scsi_passthrough(&self, _lun: u8, cmd: &[u8], _bufsize: u16) -> TransferOutcome {
        let opcode = cmd.first().copied().unwrap_or(0);
        log::warn!("unsupported SCSI opcode {opcode:#04x}");
        TRANSFER_ERROR
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Route a raw CDB to its handler.
    ///
    /// Explicit opcode-to-handler mapping with a mandatory default case;
    /// anything outside the named set goes through [`scsi_passthrough`].
    ///
    /// [`scsi_passthrough`]: MscDevice::scsi_passthrough
    pub fn dispatch(&self, lun: u8, cdb: &[u8]) -> MscResult<ScsiReply> {
        let Some(&raw) = cdb.first() else {
            return Ok(ScsiReply::Transfer(self.scsi_passthrough(lun, cdb, 0)));
        };

        match ScsiOpcode::from_u8(raw) {
            Some(ScsiOpcode::TestUnitReady) => Ok(ScsiReply::Status(self.test_unit_ready(lun))),
            Some(ScsiOpcode::Inquiry) => {
                let alloc_len = parse_inquiry_alloc_len(cdb)
                    .ok_or_else(|| MscError::Scsi("INQUIRY CDB too short".into()))?;
                let mut data = self.inquiry(lun).to_inquiry();
                data.truncate(alloc_len.min(data.len()));
                Ok(ScsiReply::Data(data))
            }
            Some(ScsiOpcode::StartStopUnit) => {
                let (power_condition, start, load_eject) = parse_start_stop_cdb(cdb)
                    .ok_or_else(|| MscError::Scsi("START STOP UNIT CDB too short".into()))?;
                Ok(ScsiReply::Status(self.start_stop(
                    lun,
                    power_condition,
                    start,
                    load_eject,
                )))
            }
            Some(ScsiOpcode::PreventAllowMediumRemoval) => {
                let (prevent, control) = parse_prevent_allow_cdb(cdb)
                    .ok_or_else(|| MscError::Scsi("PREVENT ALLOW CDB too short".into()))?;
                Ok(ScsiReply::Status(
                    self.prevent_allow_medium_removal(lun, prevent, control),
                ))
            }
            Some(ScsiOpcode::ReadCapacity10) => {
                Ok(ScsiReply::Data(self.capacity(lun).to_read_capacity10()))
            }
            Some(ScsiOpcode::Read10) => {
                let (lba, blocks) = parse_rw10_cdb(cdb)
                    .ok_or_else(|| MscError::Scsi("READ (10) CDB too short".into()))?;
                let requested = blocks as u32 * self.store.descriptor().block_size as u32;
                Ok(ScsiReply::Transfer(self.read10(lun, lba, 0, requested)))
            }
            Some(ScsiOpcode::Write10) => {
                let (lba, _blocks) = parse_rw10_cdb(cdb)
                    .ok_or_else(|| MscError::Scsi("WRITE (10) CDB too short".into()))?;
                Ok(ScsiReply::Transfer(self.write10(lun, lba, 0, &[])))
            }
            None => Ok(ScsiReply::Transfer(self.scsi_passthrough(
                lun,
                cdb,
                self.config.transfer_buf_size as u16,
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Stack notifications
    // ------------------------------------------------------------------

    /// Host mounted the device
    pub fn on_mount(&self) {
        log::info!("USB MSC device mounted");
    }

    /// Host unmounted the device
    pub fn on_unmount(&self) {
        log::info!("USB MSC device unmounted");
    }
}

/// Builder for configuring an emulated device
pub struct MscDeviceBuilder<B: BlockStore> {
    config: MscConfig,
    _phantom: std::marker::PhantomData<B>,
}

impl<B: BlockStore> MscDeviceBuilder<B> {
    fn new() -> Self {
        Self {
            config: MscConfig::default(),
            _phantom: std::marker::PhantomData,
        }
    }

    /// Endpoint buffer size for the storage class (default: 64)
    pub fn endpoint_buf_size(mut self, size: u16) -> Self {
        self.config.endpoint_buf_size = size;
        self
    }

    /// Internal transfer buffer size (default: 512)
    pub fn transfer_buf_size(mut self, size: u32) -> Self {
        self.config.transfer_buf_size = size;
        self
    }

    /// Control endpoint size (default: 64)
    pub fn control_ep_size(mut self, size: u16) -> Self {
        self.config.control_ep_size = size;
        self
    }

    /// Number of concurrent class interfaces enabled (default: 1)
    pub fn class_interfaces(mut self, count: u8) -> Self {
        self.config.class_interfaces = count;
        self
    }

    /// Heartbeat period (default: 1000 ms)
    pub fn heartbeat_interval(mut self, interval: std::time::Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Short-transfer fault injection (default: on)
    pub fn fault_mode(mut self, enabled: bool) -> Self {
        self.config.fault_mode = enabled;
        self
    }

    /// Startup policy when stack init fails (default: halt)
    pub fn init_failure_policy(mut self, policy: crate::config::InitFailurePolicy) -> Self {
        self.config.init_failure_policy = policy;
        self
    }

    /// Build the device with the specified block store
    pub fn build(self, store: B) -> MscResult<MscDevice<B>> {
        if self.config.endpoint_buf_size == 0 {
            return Err(MscError::Config(
                "endpoint_buf_size must be nonzero".to_string(),
            ));
        }
        if self.config.transfer_buf_size == 0 {
            return Err(MscError::Config(
                "transfer_buf_size must be nonzero".to_string(),
            ));
        }
        if self.config.control_ep_size == 0 {
            return Err(MscError::Config(
                "control_ep_size must be nonzero".to_string(),
            ));
        }
        if self.config.heartbeat_interval.is_zero() {
            return Err(MscError::Config(
                "heartbeat_interval must be nonzero".to_string(),
            ));
        }

        let reporter = TransferReporter::new(self.config.fault_mode);
        Ok(MscDevice {
            store,
            reporter,
            config: self.config,
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::VirtualVolume;
    use byteorder::{BigEndian, ByteOrder};

    fn device(fault_mode: bool) -> MscDevice<VirtualVolume> {
        MscDevice::builder()
            .fault_mode(fault_mode)
            .build(VirtualVolume)
            .unwrap()
    }

    #[test]
    fn test_inquiry_identity() {
        let dev = device(true);
        let id = dev.inquiry(0);
        assert_eq!(&id.vendor_id, b"Raspberr");
        assert_eq!(&id.product_id, b"Pico MSC BUG    ");
        assert_eq!(&id.revision, b"0.1 ");
    }

    #[test]
    fn test_capacity() {
        let dev = device(true);
        let desc = dev.capacity(0);
        assert_eq!(desc.block_count, 1024);
        assert_eq!(desc.block_size, 512);
    }

    #[test]
    fn test_test_unit_ready_always_true() {
        let dev = device(true);
        for lun in 0..4 {
            assert!(dev.test_unit_ready(lun));
        }
    }

    #[test]
    fn test_start_stop_always_accepted() {
        let dev = device(true);
        assert!(dev.start_stop(0, 0, false, false));
        assert!(dev.start_stop(0, 0xF, true, true));
    }

    #[test]
    fn test_prevent_allow_always_accepted() {
        let dev = device(true);
        assert!(dev.prevent_allow_medium_removal(0, 1, 0));
        assert!(dev.prevent_allow_medium_removal(0, 0, 0xFF));
    }

    #[test]
    fn test_read10_fault_mode_one_short() {
        let dev = device(true);
        assert_eq!(dev.read10(0, 0, 0, 64), 63);
        assert_eq!(dev.read10(0, 0, 0, 512), 511);
        assert_eq!(dev.read10(0, 0, 0, 0), 0);
    }

    #[test]
    fn test_read10_fault_applies_regardless_of_validity() {
        let dev = device(true);
        // Out-of-range LBA still gets the short report, as the hardware did
        assert_eq!(dev.read10(0, 5000, 0, 64), 63);
    }

    #[test]
    fn test_read10_correct_mode_full_length() {
        let dev = device(false);
        assert_eq!(dev.read10(0, 0, 0, 64), 64);
        assert_eq!(dev.read10(0, 0, 0, 512), 512);
    }

    #[test]
    fn test_write10_always_rejected() {
        let dev = device(true);
        assert_eq!(dev.write10(0, 0, 0, &[0u8; 512]), TRANSFER_ERROR);
        assert_eq!(dev.write10(0, 0, 0, &[]), TRANSFER_ERROR);
        assert_eq!(dev.write10(0, 9999, 0, &[1, 2, 3]), TRANSFER_ERROR);
    }

    #[test]
    fn test_is_writable_false() {
        let dev = device(false);
        assert!(!dev.is_writable(0));
    }

    #[test]
    fn test_passthrough_never_succeeds() {
        let dev = device(true);
        assert_eq!(dev.scsi_passthrough(0, &[0x1A, 0, 0, 0, 0, 0], 64), TRANSFER_ERROR);
        assert_eq!(dev.scsi_passthrough(0, &[], 0), TRANSFER_ERROR);
    }

    #[test]
    fn test_dispatch_test_unit_ready() {
        let dev = device(true);
        let cdb = [0x00, 0, 0, 0, 0, 0];
        assert_eq!(dev.dispatch(0, &cdb).unwrap(), ScsiReply::Status(true));
    }

    #[test]
    fn test_dispatch_inquiry() {
        let dev = device(true);
        let cdb = [0x12, 0, 0, 0, 36, 0];
        let ScsiReply::Data(data) = dev.dispatch(0, &cdb).unwrap() else {
            panic!("expected data reply");
        };
        assert_eq!(data.len(), 36);
        assert_eq!(&data[8..16], b"Raspberr");
        assert_eq!(&data[16..32], b"Pico MSC BUG    ");
    }

    #[test]
    fn test_dispatch_inquiry_respects_alloc_len() {
        let dev = device(true);
        let cdb = [0x12, 0, 0, 0, 5, 0];
        let ScsiReply::Data(data) = dev.dispatch(0, &cdb).unwrap() else {
            panic!("expected data reply");
        };
        assert_eq!(data.len(), 5);
    }

    #[test]
    fn test_dispatch_read_capacity() {
        let dev = device(true);
        let cdb = [0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let ScsiReply::Data(data) = dev.dispatch(0, &cdb).unwrap() else {
            panic!("expected data reply");
        };
        assert_eq!(BigEndian::read_u32(&data[0..4]), 1023);
        assert_eq!(BigEndian::read_u32(&data[4..8]), 512);
    }

    #[test]
    fn test_dispatch_read10_reports_block_bytes_short() {
        let dev = device(true);
        // READ(10): LBA=0, transfer_length=1 block = 512 bytes requested
        let cdb = [0x28, 0, 0, 0, 0, 0, 0, 0, 1, 0];
        assert_eq!(dev.dispatch(0, &cdb).unwrap(), ScsiReply::Transfer(511));
    }

    #[test]
    fn test_dispatch_write10_rejected() {
        let dev = device(true);
        let cdb = [0x2A, 0, 0, 0, 0, 0, 0, 0, 1, 0];
        assert_eq!(
            dev.dispatch(0, &cdb).unwrap(),
            ScsiReply::Transfer(TRANSFER_ERROR)
        );
    }

    #[test]
    fn test_dispatch_default_case() {
        let dev = device(true);
        for cdb in [
            &[0x03u8, 0, 0, 0, 18, 0][..], // REQUEST SENSE
            &[0x1A, 0, 0x3F, 0, 255, 0][..], // MODE SENSE (6)
            &[0xA0, 0, 0, 0, 0, 0, 0, 0, 0, 16, 0, 0][..], // REPORT LUNS
            &[0xFF, 0, 0, 0, 0, 0][..],
        ] {
            assert_eq!(
                dev.dispatch(0, cdb).unwrap(),
                ScsiReply::Transfer(TRANSFER_ERROR),
                "cdb[0]={:#04x}",
                cdb[0]
            );
        }
    }

    #[test]
    fn test_dispatch_empty_cdb_rejected() {
        let dev = device(true);
        assert_eq!(
            dev.dispatch(0, &[]).unwrap(),
            ScsiReply::Transfer(TRANSFER_ERROR)
        );
    }

    #[test]
    fn test_dispatch_short_cdb_is_error() {
        let dev = device(true);
        assert!(dev.dispatch(0, &[0x28, 0, 0]).is_err());
        assert!(dev.dispatch(0, &[0x12]).is_err());
    }

    #[test]
    fn test_builder_rejects_zero_sizes() {
        assert!(MscDevice::builder()
            .endpoint_buf_size(0)
            .build(VirtualVolume)
            .is_err());
        assert!(MscDevice::builder()
            .transfer_buf_size(0)
            .build(VirtualVolume)
            .is_err());
        assert!(MscDevice::builder()
            .heartbeat_interval(std::time::Duration::ZERO)
            .build(VirtualVolume)
            .is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let dev = device(true);
        assert_eq!(dev.config().endpoint_buf_size, 64);
        assert_eq!(dev.config().transfer_buf_size, 512);
        assert_eq!(dev.config().control_ep_size, 64);
    }
}
