//! The scenario registry: static declarations with eligibility tags.
//!
//! A [`Scenario`] pairs a model family with one configuration variant and
//! carries hardware-generation tags (minimum compute capability, minimum
//! total memory) evaluated once at collection time. That gate is
//! independent of the runner's per-invocation device-count gate: the
//! former asks "is this hardware generation capable", the latter "are
//! there enough devices" — both must permit execution.

use modelconf_device_probe::{AcceleratorInventory, ComputeCapability};
use serde::{Deserialize, Serialize};

use crate::descriptor::ScenarioDescriptor;
use crate::gate::{ResourceRequirement, SkipReason};

/// Model families covered by the conformance suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    GptJ,
    Gpt2,
    StarCoder2,
    Phi1_5,
    Phi2,
    Phi3Mini4k,
    Phi3Small8k,
    Falcon,
    Gemma2b,
    Gemma2_9bIt,
    ChatGlm3,
    Baichuan7b,
    Baichuan13b,
    Baichuan2_7b,
    Baichuan2_13b,
    Qwen,
    Qwen1_5,
    Qwen2,
}

impl ModelFamily {
    /// Directory of this family's weights under the model root.
    pub fn model_dir(&self) -> &'static str {
        match self {
            Self::GptJ => "gpt-j-6b",
            Self::Gpt2 => "gpt2-medium",
            Self::StarCoder2 => "starcoder2-3b",
            Self::Phi1_5 => "phi-1_5",
            Self::Phi2 => "phi-2",
            Self::Phi3Mini4k => "Phi-3/Phi-3-mini-4k-instruct",
            Self::Phi3Small8k => "Phi-3/Phi-3-small-8k-instruct",
            Self::Falcon => "falcon-rw-1b",
            Self::Gemma2b => "gemma/gemma-2b",
            Self::Gemma2_9bIt => "gemma/gemma-2-9b-it",
            Self::ChatGlm3 => "chatglm3-6b",
            Self::Baichuan7b => "Baichuan-7B",
            Self::Baichuan13b => "Baichuan-13B-Chat",
            Self::Baichuan2_7b => "Baichuan2-7B-Chat",
            Self::Baichuan2_13b => "Baichuan2-13B-Chat",
            Self::Qwen => "Qwen-1_8B-Chat",
            Self::Qwen1_5 => "Qwen1.5-0.5B-Chat",
            Self::Qwen2 => "Qwen2-7B-Instruct",
        }
    }
}

/// Hardware-generation tags evaluated at collection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EligibilityTags {
    /// Minimum compute-capability tier, e.g. Ampere for int4/int8 kernels,
    /// Hopper for fp8.
    pub min_capability: Option<ComputeCapability>,
    /// Minimum aggregate memory across all devices, in bytes.
    pub min_total_memory_bytes: Option<u64>,
}

impl EligibilityTags {
    /// Tags with only a capability floor.
    pub fn capability(tier: ComputeCapability) -> Self {
        Self { min_capability: Some(tier), ..Self::default() }
    }

    /// Add an aggregate-memory floor.
    #[must_use]
    pub fn with_total_memory(mut self, bytes: u64) -> Self {
        self.min_total_memory_bytes = Some(bytes);
        self
    }

    /// Evaluate the tags against an inventory snapshot.
    ///
    /// The capability check reuses the composable gate predicate; the
    /// memory floor is aggregate (a 13B model shards across devices), so
    /// it is checked against total memory here rather than per-device.
    pub fn check(&self, inventory: &AcceleratorInventory) -> Option<SkipReason> {
        if let Some(tier) = self.min_capability {
            if let Some(reason) = ResourceRequirement::capability(tier).check(inventory) {
                return Some(reason);
            }
        }
        if let Some(wanted) = self.min_total_memory_bytes {
            let have = inventory.total_memory_bytes();
            if wanted > have {
                return Some(SkipReason::InsufficientMemory { wanted, have });
            }
        }
        None
    }
}

/// One registered conformance test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique test-case name, e.g. `gpt2_int8_weight_only`.
    pub name: String,
    /// Model family under test.
    pub family: ModelFamily,
    /// The declarative execution bundle.
    pub descriptor: ScenarioDescriptor,
    /// Static hardware-generation gate.
    pub eligibility: EligibilityTags,
    /// Tracked reason this scenario is disabled, if any (bug links).
    pub disabled: Option<String>,
}

/// The enumerated scenario set.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
}

impl ScenarioRegistry {
    /// Registry over an explicit scenario list.
    pub fn from_scenarios(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    /// All registered scenarios, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    /// Number of registered scenarios, disabled ones included.
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the registry holds no scenarios at all.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Look up a scenario by name.
    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Split the registry into runnable scenarios and collection-time
    /// skips (disabled scenarios and failed eligibility tags), evaluated
    /// once against the given snapshot.
    pub fn collect_eligible<'a>(
        &'a self,
        inventory: &AcceleratorInventory,
    ) -> (Vec<&'a Scenario>, Vec<(&'a Scenario, SkipReason)>) {
        let mut runnable = Vec::new();
        let mut skipped = Vec::new();
        for scenario in &self.scenarios {
            if let Some(reason) = &scenario.disabled {
                skipped.push((scenario, SkipReason::Disabled { reason: reason.clone() }));
            } else if let Some(reason) = scenario.eligibility.check(inventory) {
                skipped.push((scenario, reason));
            } else {
                runnable.push(scenario);
            }
        }
        (runnable, skipped)
    }
}

impl<'a> IntoIterator for &'a ScenarioRegistry {
    type Item = &'a Scenario;
    type IntoIter = std::slice::Iter<'a, Scenario>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenarios.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1 << 30;

    fn scenario(name: &str, eligibility: EligibilityTags, disabled: Option<&str>) -> Scenario {
        Scenario {
            name: name.to_string(),
            family: ModelFamily::Gpt2,
            descriptor: ScenarioDescriptor::new(
                "models/gpt2-medium",
                vec!["A B C".into()],
                vec!["D E F G H I J K L M".into()],
            )
            .unwrap(),
            eligibility,
            disabled: disabled.map(String::from),
        }
    }

    #[test]
    fn collection_separates_runnable_and_skipped() {
        let registry = ScenarioRegistry::from_scenarios(vec![
            scenario("baseline", EligibilityTags::default(), None),
            scenario("fp8", EligibilityTags::capability(ComputeCapability::HOPPER), None),
            scenario("broken", EligibilityTags::default(), Some("tracked-bug-1234")),
        ]);

        let ampere = AcceleratorInventory::uniform(1, 24 * GIB, ComputeCapability::AMPERE);
        let (runnable, skipped) = registry.collect_eligible(&ampere);

        assert_eq!(runnable.len(), 1);
        assert_eq!(runnable[0].name, "baseline");
        assert_eq!(skipped.len(), 2);
        assert!(skipped.iter().any(|(s, r)| s.name == "fp8"
            && matches!(r, SkipReason::CapabilityTooOld { .. })));
        assert!(skipped.iter().any(|(s, r)| s.name == "broken"
            && matches!(r, SkipReason::Disabled { .. })));
    }

    #[test]
    fn memory_floor_is_aggregate() {
        let tags = EligibilityTags::default().with_total_memory(40 * GIB);
        // Two 24 GiB devices clear a 40 GiB aggregate floor.
        let inv = AcceleratorInventory::uniform(2, 24 * GIB, ComputeCapability::AMPERE);
        assert_eq!(tags.check(&inv), None);

        let inv = AcceleratorInventory::uniform(1, 24 * GIB, ComputeCapability::AMPERE);
        assert!(matches!(tags.check(&inv), Some(SkipReason::InsufficientMemory { .. })));
    }

    #[test]
    fn hopper_inventory_clears_ampere_tags() {
        let tags = EligibilityTags::capability(ComputeCapability::AMPERE);
        let inv = AcceleratorInventory::uniform(1, 80 * GIB, ComputeCapability::HOPPER);
        assert_eq!(tags.check(&inv), None);
    }
}
