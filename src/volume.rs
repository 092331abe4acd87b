//! Virtual block store: volume geometry and device identity
//!
//! This module defines the interface a storage backend presents to the SCSI
//! command handlers, plus the fixed synthetic volume the emulator ships with.
//! The volume carries no backing bytes — only its geometry matters, since
//! the emulator exercises transfer *sizes*, not content.

use byteorder::{BigEndian, ByteOrder};

/// Fixed volume geometry advertised to the host.
///
/// Both fields are immutable for the process lifetime; the advertised total
/// capacity is `block_count * block_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeDescriptor {
    /// Number of logical blocks
    pub block_count: u32,
    /// Size of each block in bytes (typically 512)
    pub block_size: u16,
}

impl VolumeDescriptor {
    pub const fn new(block_count: u32, block_size: u16) -> Self {
        VolumeDescriptor {
            block_count,
            block_size,
        }
    }

    /// Total advertised capacity in bytes
    pub fn total_bytes(&self) -> u64 {
        self.block_count as u64 * self.block_size as u64
    }

    /// Whether `lba` addresses a block within the volume
    pub fn contains_block(&self, lba: u32) -> bool {
        lba < self.block_count
    }

    /// Serialize as a READ CAPACITY (10) payload.
    ///
    /// 8 bytes: last logical block address followed by block size, both
    /// big-endian.
    pub fn to_read_capacity10(&self) -> Vec<u8> {
        let mut data = vec![0u8; 8];
        let last_lba = self.block_count.saturating_sub(1);
        BigEndian::write_u32(&mut data[0..4], last_lba);
        BigEndian::write_u32(&mut data[4..8], self.block_size as u32);
        data
    }
}

/// Fixed identity strings returned verbatim from INQUIRY.
///
/// All fields are space-padded ASCII, immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor_id: [u8; 8],
    pub product_id: [u8; 16],
    pub revision: [u8; 4],
}

impl DeviceIdentity {
    /// Build an identity from string fields, truncating or space-padding
    /// each to its fixed width.
    pub fn new(vendor: &str, product: &str, revision: &str) -> Self {
        DeviceIdentity {
            vendor_id: pad_field(vendor),
            product_id: pad_field(product),
            revision: pad_field(revision),
        }
    }

    /// Serialize as a standard INQUIRY payload (36 bytes).
    ///
    /// Peripheral device type 0x00 (direct access block device), removable
    /// media bit set, SPC-3 response format.
    pub fn to_inquiry(&self) -> Vec<u8> {
        let mut data = vec![0u8; 36];

        data[0] = 0x00; // Direct access block device
        data[1] = 0x80; // RMB = 1 (removable)
        data[2] = 0x05; // SPC-3
        data[3] = 0x02; // Response data format
        data[4] = 31; // Additional length (total - 5)

        data[8..16].copy_from_slice(&self.vendor_id);
        data[16..32].copy_from_slice(&self.product_id);
        data[32..36].copy_from_slice(&self.revision);

        data
    }
}

/// Truncate or space-pad `s` into a fixed-width ASCII field
fn pad_field<const N: usize>(s: &str) -> [u8; N] {
    let mut field = [b' '; N];
    for (dst, &src) in field.iter_mut().zip(s.as_bytes().iter().take(N)) {
        *dst = src;
    }
    field
}

/// Block store trait
///
/// Implement this trait to describe the volume the emulator exposes.
/// The defaults model the synthetic device: always ready, never writable.
pub trait BlockStore: Send + Sync {
    /// Get the fixed volume geometry
    fn descriptor(&self) -> VolumeDescriptor;

    /// Whether the medium accepts writes
    fn is_writable(&self) -> bool {
        false
    }

    /// Whether the unit is ready (no removable-media state machine is
    /// modeled)
    fn is_ready(&self) -> bool {
        true
    }

    /// Get vendor identification (8 chars max)
    fn vendor_id(&self) -> &str {
        "MSC-EMU"
    }

    /// Get product identification (16 chars max)
    fn product_id(&self) -> &str {
        "Virtual Disk"
    }

    /// Get product revision (4 chars max)
    fn product_rev(&self) -> &str {
        "1.0 "
    }

    /// Assemble the padded identity fields for INQUIRY
    fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.vendor_id(), self.product_id(), self.product_rev())
    }
}

/// The fixed 512 KiB read-only synthetic volume (1024 blocks of 512 bytes).
///
/// Matches the identity the original defect reproduction advertises so that
/// host-side traces line up.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualVolume;

impl VirtualVolume {
    pub const DESCRIPTOR: VolumeDescriptor = VolumeDescriptor::new(1024, 512);
}

impl BlockStore for VirtualVolume {
    fn descriptor(&self) -> VolumeDescriptor {
        Self::DESCRIPTOR
    }

    fn vendor_id(&self) -> &str {
        "Raspberry"
    }

    fn product_id(&self) -> &str {
        "Pico MSC BUG"
    }

    fn product_rev(&self) -> &str {
        "0.1 "
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
