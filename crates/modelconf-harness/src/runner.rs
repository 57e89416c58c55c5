//! Scenario execution: gate, provision, build, generate, judge.
//!
//! [`HarnessRunner`] is generic over the external collaborators — the
//! model-construction API ([`ModelFactory`]) and the hardware-inventory
//! API ([`HardwareInventorySource`]) — so the policy logic runs unchanged
//! against a real engine or against recording stubs in tests. One call to
//! [`HarnessRunner::run`] executes exactly one scenario as a synchronous,
//! blocking unit; the model handle it builds is dropped before the call
//! returns, so devices are never shared across scenarios.

use std::path::Path;

use modelconf_device_probe::{probe_accelerators, AcceleratorInventory};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::descriptor::{
    BuildConfig, DescriptorError, QuantConfig, SamplingConfig, ScenarioDescriptor,
};
use crate::error::{AssertionReport, HarnessError, PairFailure};
use crate::gate::{ResourceRequirement, SkipReason};
use crate::judge::{judge, Judgement};
use crate::provision::Provisioner;

// ── Collaborator seams ───────────────────────────────────────────────────────

/// Hardware-inventory API. A fresh snapshot is taken per gating decision.
pub trait HardwareInventorySource {
    fn snapshot(&self) -> AcceleratorInventory;
}

/// Live inventory source backed by the device probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveInventory;

impl HardwareInventorySource for LiveInventory {
    fn snapshot(&self) -> AcceleratorInventory {
        probe_accelerators()
    }
}

/// Everything the model-construction API needs for one scenario.
///
/// Borrowed views into the descriptor; the factory copies what it keeps.
#[derive(Debug, Clone, Copy)]
pub struct ModelBuildSpec<'a> {
    /// Model weights location.
    pub model_path: &'a Path,
    /// Tokenizer location.
    pub tokenizer_path: &'a Path,
    /// Quantization for this variant, if any.
    pub quant: Option<&'a QuantConfig>,
    /// Build-time choices for this variant, if any.
    pub build: Option<&'a BuildConfig>,
}

/// Model-construction API (external collaborator, opaque to the harness).
///
/// Construction may take minutes and is treated as a blocking,
/// non-cancelable unit for the scenario.
pub trait ModelFactory {
    fn build(&self, spec: ModelBuildSpec<'_>) -> anyhow::Result<Box<dyn GenerationHandle>>;
}

/// A ready-to-use generation handle for one freshly built model.
pub trait GenerationHandle {
    /// Generate one output per prompt, index-aligned with the input.
    fn generate(
        &mut self,
        prompts: &[String],
        sampling: &SamplingConfig,
    ) -> anyhow::Result<Vec<String>>;
}

// ── Reports ──────────────────────────────────────────────────────────────────

/// Judgement of one prompt/reference pair of a passed scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairReport {
    pub prompt: String,
    pub generated: String,
    pub reference: String,
    pub judgement: Judgement,
}

/// All per-pair judgements of a passed scenario, in prompt order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub pairs: Vec<PairReport>,
}

/// Non-error outcomes: a scenario either ran and passed, or was skipped.
///
/// Failures are [`HarnessError`]s so the outer framework can never confuse
/// a skip with a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScenarioOutcome {
    /// Every prompt/reference pair met the threshold.
    Passed(ScenarioReport),
    /// The resource gate declined the scenario before construction.
    Skipped(SkipReason),
}

impl ScenarioOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

// ── Runner ───────────────────────────────────────────────────────────────────

/// Executes scenarios against a model factory and an inventory source.
pub struct HarnessRunner<F, I = LiveInventory> {
    factory: F,
    inventory: I,
    provisioner: Provisioner,
}

impl<F: ModelFactory> HarnessRunner<F, LiveInventory> {
    /// Runner over the live hardware inventory with the default installer.
    pub fn new(factory: F) -> Self {
        Self::with_inventory(factory, LiveInventory)
    }
}

impl<F: ModelFactory, I: HardwareInventorySource> HarnessRunner<F, I> {
    /// Runner over an explicit inventory source (synthetic in tests).
    pub fn with_inventory(factory: F, inventory: I) -> Self {
        Self { factory, inventory, provisioner: Provisioner::new() }
    }

    /// Replace the provisioning command (tests, alternative installers).
    #[must_use]
    pub fn with_provisioner(mut self, provisioner: Provisioner) -> Self {
        self.provisioner = provisioner;
        self
    }

    /// Execute one scenario end to end.
    ///
    /// Order: device-count gate, provisioning (if the descriptor names a
    /// manifest), model construction, generation, judgement. An
    /// ineligible host yields `Ok(Skipped)` with zero collaborator calls;
    /// every later failure is an `Err` carrying its stage.
    pub fn run(&self, descriptor: &ScenarioDescriptor) -> Result<ScenarioOutcome, HarnessError> {
        // Descriptor fields are public (and serde-loadable), so the
        // alignment invariant from `ScenarioDescriptor::new` is re-checked
        // here; otherwise a short references list would truncate judging.
        if descriptor.prompts.len() != descriptor.references.len() {
            return Err(DescriptorError::PromptReferenceMismatch {
                prompts: descriptor.prompts.len(),
                references: descriptor.references.len(),
            }
            .into());
        }

        let world_size = descriptor.world_size();
        let requirement = ResourceRequirement::device_count(world_size);
        if let Some(reason) = requirement.check(&self.inventory.snapshot()) {
            info!(
                model = %descriptor.model_path.display(),
                world_size,
                %reason,
                "scenario skipped"
            );
            return Ok(ScenarioOutcome::Skipped(reason));
        }

        if let Some(manifest) = &descriptor.requirements_manifest {
            self.provisioner.ensure(manifest)?;
        }

        let model = descriptor.model_path.display().to_string();
        debug!(model = %model, quant = ?descriptor.quant, "building model");
        let mut handle = self
            .factory
            .build(ModelBuildSpec {
                model_path: &descriptor.model_path,
                tokenizer_path: descriptor.tokenizer_path(),
                quant: descriptor.quant.as_ref(),
                build: descriptor.build.as_ref(),
            })
            .map_err(|source| HarnessError::Build { model: model.clone(), source })?;

        let outputs = handle
            .generate(&descriptor.prompts, &descriptor.sampling)
            .map_err(|source| HarnessError::Generation { model: model.clone(), source })?;
        if outputs.len() != descriptor.prompts.len() {
            return Err(HarnessError::Generation {
                model,
                source: anyhow::anyhow!(
                    "engine returned {} outputs for {} prompts",
                    outputs.len(),
                    descriptor.prompts.len()
                ),
            });
        }

        // Judge every pair before deciding the verdict; no partial credit
        // and no early exit on the first miss.
        let mut pairs = Vec::with_capacity(outputs.len());
        let mut failures = Vec::new();
        for (index, (generated, (prompt, reference))) in outputs
            .into_iter()
            .zip(descriptor.prompts.iter().zip(&descriptor.references))
            .enumerate()
        {
            let judgement = judge(&generated, reference, descriptor.similarity_threshold);
            debug!(index, score = judgement.score, passed = judgement.passed, "pair judged");
            if !judgement.passed {
                failures.push(PairFailure {
                    index,
                    prompt: prompt.clone(),
                    actual: generated.clone(),
                    expected: reference.clone(),
                    score: judgement.score,
                    threshold: descriptor.similarity_threshold,
                });
            }
            pairs.push(PairReport {
                prompt: prompt.clone(),
                generated,
                reference: reference.clone(),
                judgement,
            });
        }

        if !failures.is_empty() {
            return Err(HarnessError::Assertion(AssertionReport { failures }));
        }

        info!(pairs = pairs.len(), "scenario passed");
        Ok(ScenarioOutcome::Passed(ScenarioReport { pairs }))
    }
}
