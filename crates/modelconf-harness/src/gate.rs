//! Resource gating for scenario eligibility.
//!
//! A [`ResourceRequirement`] is a pure predicate over an
//! [`AcceleratorInventory`] snapshot: device count, per-device memory, and
//! compute-capability tier. Requirements compose with boolean AND only —
//! the conformance suite never needs OR/NOT — and evaluate against a fresh
//! snapshot per decision, so they can be unit-tested with synthetic
//! inventories and never touch real hardware.

use std::fmt;

use modelconf_device_probe::{AcceleratorInventory, ComputeCapability};
use serde::{Deserialize, Serialize};

/// Minimum host resources a scenario needs to run.
///
/// The zero-value requirement (via [`Default`]) is satisfied by any host,
/// including one with no accelerators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceRequirement {
    /// Minimum number of devices (e.g. the scenario's world size).
    pub min_device_count: usize,
    /// Minimum memory per device, in bytes.
    pub min_device_memory_bytes: u64,
    /// Minimum compute-capability tier across all devices.
    pub min_capability: Option<ComputeCapability>,
}

impl ResourceRequirement {
    /// Require at least `count` devices.
    pub fn device_count(count: usize) -> Self {
        Self { min_device_count: count, ..Self::default() }
    }

    /// Require at least `bytes` of memory on every device.
    pub fn device_memory(bytes: u64) -> Self {
        Self { min_device_memory_bytes: bytes, ..Self::default() }
    }

    /// Require every device to be at least the given generation.
    pub fn capability(tier: ComputeCapability) -> Self {
        Self { min_capability: Some(tier), ..Self::default() }
    }

    /// AND-compose two requirements into the stricter of each dimension.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelconf_harness::gate::ResourceRequirement;
    /// use modelconf_device_probe::ComputeCapability;
    ///
    /// let req = ResourceRequirement::device_count(2)
    ///     .and(ResourceRequirement::capability(ComputeCapability::AMPERE));
    /// assert_eq!(req.min_device_count, 2);
    /// assert_eq!(req.min_capability, Some(ComputeCapability::AMPERE));
    /// ```
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self {
            min_device_count: self.min_device_count.max(other.min_device_count),
            min_device_memory_bytes: self.min_device_memory_bytes.max(other.min_device_memory_bytes),
            min_capability: self.min_capability.max(other.min_capability),
        }
    }

    /// Whether the inventory satisfies every dimension of this requirement.
    pub fn eligible(&self, inventory: &AcceleratorInventory) -> bool {
        self.check(inventory).is_none()
    }

    /// Like [`eligible`](Self::eligible), but reports the first failed
    /// dimension for skip diagnostics.
    pub fn check(&self, inventory: &AcceleratorInventory) -> Option<SkipReason> {
        let have = inventory.device_count();
        if self.min_device_count > have {
            return Some(SkipReason::InsufficientDevices { wanted: self.min_device_count, have });
        }

        if self.min_device_memory_bytes > 0 {
            let have = inventory.min_device_memory_bytes().unwrap_or(0);
            if self.min_device_memory_bytes > have {
                return Some(SkipReason::InsufficientMemory {
                    wanted: self.min_device_memory_bytes,
                    have,
                });
            }
        }

        if let Some(wanted) = self.min_capability {
            let have = inventory.min_capability();
            if have.is_none_or(|c| !c.at_least(wanted)) {
                return Some(SkipReason::CapabilityTooOld { wanted, have });
            }
        }

        None
    }
}

/// Why a scenario was skipped rather than run.
///
/// Skips are not failures: the outer test framework must count them
/// separately, so the reason carries enough detail to report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Host has fewer devices than the scenario's world size.
    InsufficientDevices { wanted: usize, have: usize },
    /// Smallest device has less memory than required.
    InsufficientMemory { wanted: u64, have: u64 },
    /// Weakest device is older than the required generation.
    CapabilityTooOld {
        wanted: ComputeCapability,
        have: Option<ComputeCapability>,
    },
    /// Scenario is disabled in the registry with a tracked reason.
    Disabled { reason: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientDevices { wanted, have } => {
                write!(f, "world size {wanted} exceeds available devices ({have})")
            }
            Self::InsufficientMemory { wanted, have } => {
                write!(f, "not enough device memory (wanted {wanted} bytes, have {have})")
            }
            Self::CapabilityTooOld { wanted, have } => match have {
                Some(have) => write!(f, "compute capability {have} below required {wanted}"),
                None => write!(f, "no accelerator present, required capability {wanted}"),
            },
            Self::Disabled { reason } => write!(f, "disabled: {reason}"),
        }
    }
}
