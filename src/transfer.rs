//! Transfer reporting and fault injection
//!
//! The one piece of genuinely interesting policy in the emulator lives here:
//! deciding how many bytes a read or write claims to have moved. In fault
//! mode every transfer is reported one byte short of the request, which is
//! the stimulus that provokes endpoint double-arming in the host stack. The
//! corrected behavior (report the full request) is kept alongside so the two
//! can be compared deterministically.

/// Generic transfer rejection code reported back to the transport.
///
/// Used for both write attempts (read-only medium) and unsupported SCSI
/// opcodes, matching the hardware stack's single error return.
pub const TRANSFER_ERROR: i32 = -1;

/// Outcome of a read or write invocation, in bytes.
///
/// Non-negative values count bytes actually transferred, which may be less
/// than requested. Negative values reject the transfer.
pub type TransferOutcome = i32;

/// A single read/write invocation as seen from the transport callback.
///
/// Transient — constructed per callback, never persisted. `lba` and `offset`
/// are carried for logging; only `requested` feeds the reported outcome.
#[derive(Debug, Clone, Copy)]
pub struct TransferRequest {
    /// Logical block address the transfer starts at
    pub lba: u32,
    /// Byte offset within the starting block
    pub offset: u32,
    /// Bytes the host asked for
    pub requested: u32,
}

/// Report how many bytes a transfer moved.
///
/// With `fault_mode` set, the report is short by exactly one byte (a zero
/// request stays zero — the outcome is never negative). Without it, the
/// report is the identity.
pub fn report_transfer(requested: u32, fault_mode: bool) -> TransferOutcome {
    if fault_mode {
        requested.saturating_sub(1) as TransferOutcome
    } else {
        requested as TransferOutcome
    }
}

/// Centralized fault-injection policy for byte counts.
///
/// Read and write handlers consult this instead of embedding the short-byte
/// policy themselves.
#[derive(Debug, Clone, Copy)]
pub struct TransferReporter {
    fault_mode: bool,
}

impl TransferReporter {
    pub fn new(fault_mode: bool) -> Self {
        TransferReporter { fault_mode }
    }

    /// Whether short-transfer fault injection is active
    pub fn fault_mode(&self) -> bool {
        self.fault_mode
    }

    /// Bytes to claim as moved for a request of `requested` bytes
    pub fn report(&self, requested: u32) -> TransferOutcome {
        report_transfer(requested, self.fault_mode)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
