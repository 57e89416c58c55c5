//! Conformance test-execution policy engine for LLM inference engines.
//!
//! This crate decides *whether* a conformance scenario may run on the
//! current host, *how* the model under test is configured and built for a
//! given quantization/parallelism variant, and *what counts as a pass*
//! when comparing generated text against references. The inference engine
//! itself, tokenization, and quantization kernels live behind the
//! collaborator traits in [`runner`]; this crate never implements them.
//!
//! Components, leaf to root:
//!
//! - [`judge`] — fuzzy text similarity scoring and pass/fail judgement
//! - [`gate`] — resource requirements evaluated against an accelerator
//!   inventory snapshot
//! - [`descriptor`] — the declarative scenario bundle (model, prompts,
//!   references, sampling, quantization, build config, threshold)
//! - [`provision`] — the one idempotent environment-mutation seam
//! - [`runner`] — gate, provision, build, generate, judge for one scenario
//! - [`registry`] / [`scenarios`] — the enumerated scenario table

pub mod descriptor;
pub mod error;
pub mod gate;
pub mod judge;
pub mod provision;
pub mod registry;
pub mod runner;
pub mod scenarios;

pub use descriptor::{
    BuildConfig, DescriptorError, QuantAlgo, QuantConfig, SamplingConfig, ScenarioDescriptor,
};
pub use error::{AssertionReport, HarnessError, PairFailure};
pub use gate::{ResourceRequirement, SkipReason};
pub use judge::{judge, similarity_ratio, Judgement, DEFAULT_SIMILARITY_THRESHOLD};
pub use provision::Provisioner;
pub use registry::{EligibilityTags, ModelFamily, Scenario, ScenarioRegistry};
pub use scenarios::{builtin_registry, default_model_root, MODEL_ROOT_ENV};
pub use runner::{
    GenerationHandle, HardwareInventorySource, HarnessRunner, LiveInventory, ModelBuildSpec,
    ModelFactory, PairReport, ScenarioOutcome, ScenarioReport,
};

pub use modelconf_device_probe::{AcceleratorDevice, AcceleratorInventory, ComputeCapability};
