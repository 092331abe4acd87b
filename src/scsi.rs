//! SCSI opcode space and CDB parsing
//!
//! Only the opcodes the emulated device answers explicitly are named here;
//! everything else falls through the dispatch default and is rejected. CDB
//! field layout follows the SCSI Block Commands (SBC) specification.

use crate::transfer::TransferOutcome;
use byteorder::{BigEndian, ByteOrder};

/// SCSI command opcodes (the explicitly handled subset)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScsiOpcode {
    TestUnitReady = 0x00,
    Inquiry = 0x12,
    StartStopUnit = 0x1B,
    PreventAllowMediumRemoval = 0x1E,
    ReadCapacity10 = 0x25,
    Read10 = 0x28,
    Write10 = 0x2A,
}

impl ScsiOpcode {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0x00 => Some(ScsiOpcode::TestUnitReady),
            0x12 => Some(ScsiOpcode::Inquiry),
            0x1B => Some(ScsiOpcode::StartStopUnit),
            0x1E => Some(ScsiOpcode::PreventAllowMediumRemoval),
            0x25 => Some(ScsiOpcode::ReadCapacity10),
            0x28 => Some(ScsiOpcode::Read10),
            0x2A => Some(ScsiOpcode::Write10),
            _ => None,
        }
    }
}

/// Result of dispatching one SCSI command.
///
/// The transport's own command/data/status framing is out of scope; this is
/// only the *content* the emulator contributes to the data and status
/// phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScsiReply {
    /// Data-phase payload (INQUIRY, READ CAPACITY)
    Data(Vec<u8>),
    /// Status-only commands: accepted or failed
    Status(bool),
    /// Bytes moved by a read or write, or a negative rejection code
    Transfer(TransferOutcome),
}

/// Parse LBA and transfer length (in blocks) from a READ/WRITE (10) CDB
pub fn parse_rw10_cdb(cdb: &[u8]) -> Option<(u32, u16)> {
    if cdb.len() < 10 {
        return None;
    }
    let lba = BigEndian::read_u32(&cdb[2..6]);
    let length = BigEndian::read_u16(&cdb[7..9]);
    Some((lba, length))
}

/// Parse the allocation length from an INQUIRY CDB
pub fn parse_inquiry_alloc_len(cdb: &[u8]) -> Option<usize> {
    if cdb.len() < 6 {
        return None;
    }
    Some(BigEndian::read_u16(&cdb[3..5]) as usize)
}

/// Parse power condition, start and load/eject flags from a START STOP UNIT
/// CDB
pub fn parse_start_stop_cdb(cdb: &[u8]) -> Option<(u8, bool, bool)> {
    if cdb.len() < 6 {
        return None;
    }
    let power_condition = cdb[4] >> 4;
    let start = cdb[4] & 0x01 != 0;
    let load_eject = cdb[4] & 0x02 != 0;
    Some((power_condition, start, load_eject))
}

/// Parse the prevent flag and control byte from a PREVENT ALLOW MEDIUM
/// REMOVAL CDB
pub fn parse_prevent_allow_cdb(cdb: &[u8]) -> Option<(u8, u8)> {
    if cdb.len() < 6 {
        return None;
    }
    Some((cdb[4] & 0x03, cdb[5]))
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for opcode in [
            ScsiOpcode::TestUnitReady,
            ScsiOpcode::Inquiry,
            ScsiOpcode::StartStopUnit,
            ScsiOpcode::PreventAllowMediumRemoval,
            ScsiOpcode::ReadCapacity10,
            ScsiOpcode::Read10,
            ScsiOpcode::Write10,
        ] {
            assert_eq!(ScsiOpcode::from_u8(opcode as u8), Some(opcode));
        }
    }

    #[test]
    fn test_unknown_opcodes_unnamed() {
        // A sample of opcodes real hosts issue that the device answers only
        // through the default path
        for raw in [0x03u8, 0x1A, 0x2F, 0x35, 0x5A, 0x9E, 0xA0, 0xFF] {
            assert_eq!(ScsiOpcode::from_u8(raw), None, "opcode {raw:#04x}");
        }
    }

    #[test]
    fn test_parse_rw10_cdb() {
        let cdb = [0x28, 0, 0, 0, 0, 100, 0, 0, 10, 0]; // LBA=100, length=10
        let (lba, length) = parse_rw10_cdb(&cdb).unwrap();
        assert_eq!(lba, 100);
        assert_eq!(length, 10);
    }

    #[test]
    fn test_parse_rw10_cdb_too_short() {
        assert!(parse_rw10_cdb(&[0x28, 0, 0]).is_none());
    }

    #[test]
    fn test_parse_inquiry_alloc_len() {
        let cdb = [0x12, 0, 0, 0, 36, 0];
        assert_eq!(parse_inquiry_alloc_len(&cdb), Some(36));
    }

    #[test]
    fn test_parse_start_stop_cdb() {
        // power condition 0, LOEJ=1, START=0 (eject request)
        let cdb = [0x1B, 0, 0, 0, 0x02, 0];
        assert_eq!(parse_start_stop_cdb(&cdb), Some((0, false, true)));
    }

    #[test]
    fn test_parse_prevent_allow_cdb() {
        let cdb = [0x1E, 0, 0, 0, 0x01, 0];
        assert_eq!(parse_prevent_allow_cdb(&cdb), Some((1, 0)));
    }
}
