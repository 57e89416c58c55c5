//! Declarative scenario descriptors.
//!
//! A [`ScenarioDescriptor`] is the immutable bundle describing one
//! conformance test case: where the model lives, what to prompt it with,
//! what output is expected, and how the model is quantized/built for this
//! variant. Descriptors are constructed once per test case and validated
//! at construction; the harness never mutates them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::judge::DEFAULT_SIMILARITY_THRESHOLD;

/// Descriptor construction errors — test configuration mistakes, not
/// runtime failures.
#[derive(Debug, Error, PartialEq)]
pub enum DescriptorError {
    #[error("prompts ({prompts}) and references ({references}) must be the same length")]
    PromptReferenceMismatch { prompts: usize, references: usize },

    #[error("similarity threshold {0} outside (0, 1]")]
    InvalidThreshold(f32),
}

/// Sampling parameters forwarded to the generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Maximum number of tokens to generate per prompt.
    pub max_tokens: usize,
    /// Sampling temperature; `None` leaves the engine default.
    pub temperature: Option<f32>,
    /// Seed for reproducible sampling; `None` leaves the engine default.
    pub seed: Option<u64>,
}

impl SamplingConfig {
    /// Greedy-ish short generation used by most conformance prompts.
    pub fn with_max_tokens(max_tokens: usize) -> Self {
        Self { max_tokens, ..Self::default() }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { max_tokens: 10, temperature: None, seed: None }
    }
}

/// Quantization algorithms exercised by the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantAlgo {
    /// 4-bit weight-only, fp16 activations.
    W4A16,
    /// 8-bit weight-only, fp16 activations.
    W8A16,
    /// SmoothQuant int8 weights+activations, per-channel/per-token scales.
    W8A8SqPerChannelPerTokenPlugin,
    /// fp8 weights and activations (Hopper and newer).
    Fp8,
    /// Plain int8 (KV-cache quantization).
    Int8,
}

impl QuantAlgo {
    /// Short name for diagnostics and report keys.
    pub fn name(&self) -> &'static str {
        match self {
            Self::W4A16 => "w4a16",
            Self::W8A16 => "w8a16",
            Self::W8A8SqPerChannelPerTokenPlugin => "w8a8_sq_per_channel_per_token_plugin",
            Self::Fp8 => "fp8",
            Self::Int8 => "int8",
        }
    }
}

/// Numeric-precision reduction applied to the model for this variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantConfig {
    /// Weight/activation quantization algorithm.
    pub algo: QuantAlgo,
    /// Separate KV-cache quantization, if any.
    pub kv_cache_algo: Option<QuantAlgo>,
}

impl QuantConfig {
    /// Weight/activation quantization with no KV-cache quantization.
    pub fn new(algo: QuantAlgo) -> Self {
        Self { algo, kv_cache_algo: None }
    }

    /// Add KV-cache quantization on top of `self`.
    #[must_use]
    pub fn with_kv_cache(mut self, algo: QuantAlgo) -> Self {
        self.kv_cache_algo = Some(algo);
        self
    }
}

/// Construction-time choices for the model under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Tensor-parallel degree.
    pub tensor_parallel: usize,
    /// Pipeline-parallel degree.
    pub pipeline_parallel: usize,
    /// GEMM plugin selection, e.g. `auto`; `None` leaves the engine default.
    pub gemm_plugin: Option<String>,
    /// Strongly-typed graph construction.
    pub strongly_typed: bool,
}

impl BuildConfig {
    /// Devices this build claims: `tensor_parallel * pipeline_parallel`.
    pub fn world_size(&self) -> usize {
        self.tensor_parallel * self.pipeline_parallel
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tensor_parallel: 1,
            pipeline_parallel: 1,
            gemm_plugin: None,
            strongly_typed: true,
        }
    }
}

/// One complete conformance test case.
///
/// Invariant, enforced at construction: `prompts.len() == references.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDescriptor {
    /// Location of the model weights; also used as the tokenizer location.
    pub model_path: PathBuf,
    /// Prompts, in execution order.
    pub prompts: Vec<String>,
    /// Expected reference texts, index-aligned with `prompts`.
    pub references: Vec<String>,
    /// Sampling parameters for generation.
    pub sampling: SamplingConfig,
    /// Quantization applied to this variant, if any.
    pub quant: Option<QuantConfig>,
    /// Build-time choices for this variant, if any.
    pub build: Option<BuildConfig>,
    /// Minimum similarity score for a pair to pass, in `(0, 1]`.
    pub similarity_threshold: f32,
    /// Requirements manifest to provision before construction, if any.
    pub requirements_manifest: Option<PathBuf>,
}

impl ScenarioDescriptor {
    /// Build a descriptor for `model_path` with aligned prompts/references.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelconf_harness::descriptor::ScenarioDescriptor;
    ///
    /// let desc = ScenarioDescriptor::new(
    ///     "models/gpt2-medium",
    ///     vec!["A B C".into()],
    ///     vec!["D E F G H I J K L M".into()],
    /// )
    /// .unwrap();
    /// assert_eq!(desc.similarity_threshold, 0.8);
    /// assert_eq!(desc.world_size(), 1);
    /// ```
    pub fn new(
        model_path: impl Into<PathBuf>,
        prompts: Vec<String>,
        references: Vec<String>,
    ) -> Result<Self, DescriptorError> {
        if prompts.len() != references.len() {
            return Err(DescriptorError::PromptReferenceMismatch {
                prompts: prompts.len(),
                references: references.len(),
            });
        }
        Ok(Self {
            model_path: model_path.into(),
            prompts,
            references,
            sampling: SamplingConfig::default(),
            quant: None,
            build: None,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            requirements_manifest: None,
        })
    }

    /// Replace the sampling configuration.
    #[must_use]
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// Apply a quantization configuration.
    #[must_use]
    pub fn with_quant(mut self, quant: QuantConfig) -> Self {
        self.quant = Some(quant);
        self
    }

    /// Apply a build configuration.
    #[must_use]
    pub fn with_build(mut self, build: BuildConfig) -> Self {
        self.build = Some(build);
        self
    }

    /// Override the similarity threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Result<Self, DescriptorError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(DescriptorError::InvalidThreshold(threshold));
        }
        self.similarity_threshold = threshold;
        Ok(self)
    }

    /// Require a provisioning step before model construction.
    #[must_use]
    pub fn with_requirements_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.requirements_manifest = Some(manifest.into());
        self
    }

    /// Tokenizer location; the suite always co-locates it with the model.
    pub fn tokenizer_path(&self) -> &Path {
        &self.model_path
    }

    /// Devices this scenario claims, from its build config (1 when absent).
    pub fn world_size(&self) -> usize {
        self.build.as_ref().map_or(1, BuildConfig::world_size)
    }
}
