//! Configuration surface for the emulated device
//!
//! Defaults mirror the full-speed bulk configuration of the hardware build
//! this emulator reproduces: 64-byte bulk endpoints, a 512-byte internal
//! transfer buffer, and a 1-second heartbeat.

use std::time::Duration;

/// What to do when the external stack fails to initialize.
///
/// The two observed build variants differ here: one aborts startup, the
/// other logs once and keeps pumping without the failed subsystem. This is
/// an explicit policy choice, not a protocol requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitFailurePolicy {
    /// Report the failure and refuse to start
    Halt,
    /// Report the failure once and continue degraded
    ContinueDegraded,
}

/// Recognized configuration options
#[derive(Debug, Clone)]
pub struct MscConfig {
    /// Endpoint buffer size for the storage class (full-speed bulk)
    pub endpoint_buf_size: u16,
    /// Internal transfer buffer size
    pub transfer_buf_size: u32,
    /// Control endpoint size
    pub control_ep_size: u16,
    /// Number of concurrent class interfaces enabled
    pub class_interfaces: u8,
    /// Period of the liveness heartbeat
    pub heartbeat_interval: Duration,
    /// Report reads and writes one byte short of the request
    pub fault_mode: bool,
    /// Startup policy when stack init fails
    pub init_failure_policy: InitFailurePolicy,
}

impl Default for MscConfig {
    fn default() -> Self {
        MscConfig {
            endpoint_buf_size: 64,
            transfer_buf_size: 512,
            control_ep_size: 64,
            class_interfaces: 1,
            heartbeat_interval: Duration::from_millis(1000),
            fault_mode: true,
            init_failure_policy: InitFailurePolicy::Halt,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
