//! Accelerator detection and capability probing for conformance runs.
//!
//! Provides a snapshot type describing the host's accelerator inventory
//! (device count, per-device memory, compute capability) plus a runtime
//! probe. The probe honours `MODELCONF_ACCEL_FAKE` for deterministic
//! testing on hosts without accelerators; strict mode
//! (`MODELCONF_STRICT_PROBE=1`) ignores the fake and probes real hardware.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable holding a fake inventory spec, e.g. `2x80gb@9.0`.
pub const ACCEL_FAKE_ENV: &str = "MODELCONF_ACCEL_FAKE";

/// Environment variable that disables the fake and forces a real probe.
pub const STRICT_PROBE_ENV: &str = "MODELCONF_STRICT_PROBE";

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;

// ── Compute capability ───────────────────────────────────────────────────────

/// CUDA-style compute capability, ordered by generation.
///
/// # Examples
///
/// ```
/// use modelconf_device_probe::ComputeCapability;
///
/// assert!(ComputeCapability::HOPPER > ComputeCapability::AMPERE);
/// assert!(ComputeCapability::new(8, 6).at_least(ComputeCapability::AMPERE));
/// assert!(!ComputeCapability::new(7, 5).at_least(ComputeCapability::AMPERE));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComputeCapability {
    pub major: u32,
    pub minor: u32,
}

impl ComputeCapability {
    /// Ampere generation (SM 8.0).
    pub const AMPERE: Self = Self::new(8, 0);
    /// Ada Lovelace generation (SM 8.9).
    pub const ADA: Self = Self::new(8, 9);
    /// Hopper generation (SM 9.0).
    pub const HOPPER: Self = Self::new(9, 0);

    /// Create a capability from major/minor SM version numbers.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether this capability meets or exceeds the given tier.
    pub fn at_least(self, tier: Self) -> bool {
        self >= tier
    }
}

impl fmt::Display for ComputeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

// ── Inventory snapshot ───────────────────────────────────────────────────────

/// A single accelerator device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceleratorDevice {
    /// Total device memory in bytes.
    pub memory_bytes: u64,
    /// Compute capability of the device.
    pub capability: ComputeCapability,
}

/// Snapshot of the host's accelerator inventory.
///
/// Obtained from [`probe_accelerators`], or constructed synthetically for
/// tests via [`AcceleratorInventory::uniform`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AcceleratorInventory {
    /// Devices visible to this process.
    pub devices: Vec<AcceleratorDevice>,
}

impl AcceleratorInventory {
    /// An inventory with no accelerators.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A homogeneous inventory of `count` identical devices.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelconf_device_probe::{AcceleratorInventory, ComputeCapability};
    ///
    /// let inv = AcceleratorInventory::uniform(2, 80 << 30, ComputeCapability::HOPPER);
    /// assert_eq!(inv.device_count(), 2);
    /// assert_eq!(inv.total_memory_bytes(), 160 << 30);
    /// ```
    pub fn uniform(count: usize, memory_bytes: u64, capability: ComputeCapability) -> Self {
        Self {
            devices: vec![AcceleratorDevice { memory_bytes, capability }; count],
        }
    }

    /// Number of devices visible to this process.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Aggregate memory across all devices, in bytes.
    pub fn total_memory_bytes(&self) -> u64 {
        self.devices.iter().map(|d| d.memory_bytes).sum()
    }

    /// Memory of the smallest device, if any device is present.
    pub fn min_device_memory_bytes(&self) -> Option<u64> {
        self.devices.iter().map(|d| d.memory_bytes).min()
    }

    /// Lowest compute capability across devices, if any device is present.
    ///
    /// Mixed-generation hosts are gated by their weakest device.
    pub fn min_capability(&self) -> Option<ComputeCapability> {
        self.devices.iter().map(|d| d.capability).min()
    }
}

// ── Runtime probe ────────────────────────────────────────────────────────────

/// Probe the accelerator inventory visible to this process.
///
/// Honours [`ACCEL_FAKE_ENV`] unless [`STRICT_PROBE_ENV`] is set to `1`.
/// Without a fake and without accelerator runtime support compiled in, the
/// probe reports an empty inventory; embedding environments with real
/// device discovery supply their own snapshot to the harness instead.
///
/// Probing is cheap and side-effect-free, so callers take a fresh snapshot
/// per gating decision rather than caching one.
pub fn probe_accelerators() -> AcceleratorInventory {
    let strict = std::env::var(STRICT_PROBE_ENV).is_ok_and(|v| v == "1");
    if !strict {
        if let Ok(spec) = std::env::var(ACCEL_FAKE_ENV) {
            if let Some(inv) = parse_fake_spec(&spec) {
                debug!(spec = %spec, devices = inv.device_count(), "using fake accelerator inventory");
                return inv;
            }
            debug!(spec = %spec, "ignoring malformed accelerator fake spec");
        }
    }
    AcceleratorInventory::empty()
}

/// Parse a fake inventory spec.
///
/// Accepted forms: `none` (empty inventory) or `<count>x<mem>(gb|mb)@<major>.<minor>`,
/// e.g. `2x80gb@9.0` or `1x24gb@8.6`. Case-insensitive. Returns `None` on
/// any malformed input.
///
/// # Examples
///
/// ```
/// use modelconf_device_probe::{parse_fake_spec, ComputeCapability};
///
/// let inv = parse_fake_spec("2x80gb@9.0").unwrap();
/// assert_eq!(inv.device_count(), 2);
/// assert_eq!(inv.min_capability(), Some(ComputeCapability::HOPPER));
///
/// assert_eq!(parse_fake_spec("none").unwrap().device_count(), 0);
/// assert!(parse_fake_spec("garbage").is_none());
/// ```
pub fn parse_fake_spec(spec: &str) -> Option<AcceleratorInventory> {
    let spec = spec.trim().to_ascii_lowercase();
    if spec == "none" {
        return Some(AcceleratorInventory::empty());
    }

    let (count_str, rest) = spec.split_once('x')?;
    let (mem_str, cap_str) = rest.split_once('@')?;

    let count: usize = count_str.parse().ok()?;
    let memory_bytes = parse_memory(mem_str)?;
    let capability = parse_capability(cap_str)?;

    Some(AcceleratorInventory::uniform(count, memory_bytes, capability))
}

fn parse_memory(s: &str) -> Option<u64> {
    if let Some(gb) = s.strip_suffix("gb") {
        gb.parse::<u64>().ok().map(|n| n * GIB)
    } else if let Some(mb) = s.strip_suffix("mb") {
        mb.parse::<u64>().ok().map(|n| n * MIB)
    } else {
        None
    }
}

fn parse_capability(s: &str) -> Option<ComputeCapability> {
    let (major, minor) = s.split_once('.')?;
    Some(ComputeCapability::new(major.parse().ok()?, minor.parse().ok()?))
}
