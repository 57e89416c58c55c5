//! Built-in conformance scenarios, one per model-family/variant pair.
//!
//! This is data, not logic: every entry is a static declaration consumed
//! by the generic [`HarnessRunner`](crate::runner::HarnessRunner).
//! Variants of the same family share prompts and references and differ
//! only in quantization/build config. Model paths resolve against a root
//! directory, by default from [`MODEL_ROOT_ENV`].

use std::path::{Path, PathBuf};

use modelconf_device_probe::ComputeCapability;

use crate::descriptor::{
    BuildConfig, QuantAlgo, QuantConfig, SamplingConfig, ScenarioDescriptor,
};
use crate::registry::{EligibilityTags, ModelFamily, Scenario, ScenarioRegistry};

/// Environment variable naming the model root directory.
pub const MODEL_ROOT_ENV: &str = "MODELCONF_MODEL_ROOT";

const GIB: u64 = 1024 * 1024 * 1024;

/// Model root from [`MODEL_ROOT_ENV`], falling back to `./models`.
pub fn default_model_root() -> PathBuf {
    std::env::var_os(MODEL_ROOT_ENV).map_or_else(|| PathBuf::from("models"), PathBuf::from)
}

/// The full built-in registry, with model and manifest paths resolved
/// against `root`.
pub fn builtin_registry(root: &Path) -> ScenarioRegistry {
    ScenarioRegistry::from_scenarios(builtin_scenarios(root))
}

fn ampere() -> EligibilityTags {
    EligibilityTags::capability(ComputeCapability::AMPERE)
}

fn hopper() -> EligibilityTags {
    EligibilityTags::capability(ComputeCapability::HOPPER)
}

/// `A B C` continuation shared by most families.
fn seq_descriptor(root: &Path, family: ModelFamily) -> ScenarioDescriptor {
    descriptor(root, family, vec!["A B C".into()], vec!["D E F G H I J K L M".into()])
}

/// Same continuation for families whose detokenizer keeps the leading space.
fn seq_descriptor_leading_space(root: &Path, family: ModelFamily) -> ScenarioDescriptor {
    descriptor(root, family, vec!["A B C".into()], vec![" D E F G H I J K L M".into()])
}

fn descriptor(
    root: &Path,
    family: ModelFamily,
    prompts: Vec<String>,
    references: Vec<String>,
) -> ScenarioDescriptor {
    // Lengths are aligned by construction in this table.
    ScenarioDescriptor::new(root.join(family.model_dir()), prompts, references)
        .unwrap_or_else(|e| unreachable!("builtin scenario table is malformed: {e}"))
}

fn scenario(
    name: &str,
    family: ModelFamily,
    descriptor: ScenarioDescriptor,
    eligibility: EligibilityTags,
) -> Scenario {
    Scenario {
        name: name.to_string(),
        family,
        descriptor,
        eligibility,
        disabled: None,
    }
}

#[allow(clippy::too_many_lines)]
fn builtin_scenarios(root: &Path) -> Vec<Scenario> {
    let phi_manifest = root.join("requirements/phi.txt");
    let qwen_manifest = root.join("requirements/qwen.txt");

    vec![
        // ── GPT-J ────────────────────────────────────────────────────────
        scenario("gptj", ModelFamily::GptJ, seq_descriptor(root, ModelFamily::GptJ), ampere()),
        scenario(
            "gptj_int4_weight_only",
            ModelFamily::GptJ,
            seq_descriptor(root, ModelFamily::GptJ)
                .with_quant(QuantConfig::new(QuantAlgo::W4A16)),
            ampere(),
        ),
        // ── GPT-2 medium ─────────────────────────────────────────────────
        scenario("gpt2", ModelFamily::Gpt2, seq_descriptor(root, ModelFamily::Gpt2), ampere()),
        scenario(
            "gpt2_sq",
            ModelFamily::Gpt2,
            seq_descriptor(root, ModelFamily::Gpt2).with_quant(
                QuantConfig::new(QuantAlgo::W8A8SqPerChannelPerTokenPlugin)
                    .with_kv_cache(QuantAlgo::Int8),
            ),
            ampere(),
        ),
        scenario(
            "gpt2_int8_weight_only",
            ModelFamily::Gpt2,
            seq_descriptor(root, ModelFamily::Gpt2)
                .with_quant(QuantConfig::new(QuantAlgo::W8A16).with_kv_cache(QuantAlgo::Int8)),
            ampere(),
        ),
        scenario(
            "gpt2_fp8",
            ModelFamily::Gpt2,
            seq_descriptor(root, ModelFamily::Gpt2).with_quant(QuantConfig::new(QuantAlgo::Fp8)),
            hopper(),
        ),
        // ── StarCoder2 ───────────────────────────────────────────────────
        scenario(
            "starcoder2",
            ModelFamily::StarCoder2,
            starcoder2_descriptor(root),
            ampere(),
        ),
        scenario(
            "starcoder2_fp8",
            ModelFamily::StarCoder2,
            starcoder2_descriptor(root).with_quant(QuantConfig::new(QuantAlgo::Fp8)),
            hopper(),
        ),
        // ── Phi ──────────────────────────────────────────────────────────
        scenario(
            "phi_1_5",
            ModelFamily::Phi1_5,
            seq_descriptor_leading_space(root, ModelFamily::Phi1_5),
            EligibilityTags::default(),
        ),
        scenario(
            "phi_2",
            ModelFamily::Phi2,
            seq_descriptor_leading_space(root, ModelFamily::Phi2),
            EligibilityTags::default(),
        ),
        scenario(
            "phi_3_mini_4k",
            ModelFamily::Phi3Mini4k,
            descriptor(
                root,
                ModelFamily::Phi3Mini4k,
                vec!["I am going to Paris, what should I see?".into()],
                vec!["\n\nAssistant: Paris is a city rich in history,".into()],
            )
            .with_sampling(SamplingConfig::with_max_tokens(13))
            .with_requirements_manifest(&phi_manifest),
            EligibilityTags::default(),
        ),
        scenario(
            "phi_3_small_8k",
            ModelFamily::Phi3Small8k,
            descriptor(
                root,
                ModelFamily::Phi3Small8k,
                vec!["where is France's capital?".into()],
                vec![" Paris is the capital of France. It is known".into()],
            )
            .with_build(BuildConfig {
                gemm_plugin: Some("auto".into()),
                ..BuildConfig::default()
            })
            .with_requirements_manifest(&phi_manifest),
            ampere(),
        ),
        // ── Falcon ───────────────────────────────────────────────────────
        scenario(
            "falcon",
            ModelFamily::Falcon,
            seq_descriptor(root, ModelFamily::Falcon),
            ampere(),
        ),
        scenario(
            "falcon_int4_weight_only",
            ModelFamily::Falcon,
            seq_descriptor(root, ModelFamily::Falcon)
                .with_quant(QuantConfig::new(QuantAlgo::W4A16))
                .with_build(BuildConfig { strongly_typed: false, ..BuildConfig::default() }),
            ampere(),
        ),
        // ── Gemma ────────────────────────────────────────────────────────
        scenario(
            "gemma_2b",
            ModelFamily::Gemma2b,
            seq_descriptor(root, ModelFamily::Gemma2b),
            ampere(),
        ),
        Scenario {
            disabled: Some("https://nvbugspro.nvidia.com/bug/4575937".into()),
            ..scenario(
                "gemma_2b_int4_weight_only",
                ModelFamily::Gemma2b,
                seq_descriptor(root, ModelFamily::Gemma2b)
                    .with_quant(QuantConfig::new(QuantAlgo::W4A16)),
                ampere(),
            )
        },
        scenario(
            "gemma_2_9b_it",
            ModelFamily::Gemma2_9bIt,
            seq_descriptor(root, ModelFamily::Gemma2_9bIt),
            ampere(),
        ),
        // ── ChatGLM ──────────────────────────────────────────────────────
        scenario(
            "glm",
            ModelFamily::ChatGlm3,
            seq_descriptor(root, ModelFamily::ChatGlm3),
            EligibilityTags::default(),
        ),
        // ── Baichuan ─────────────────────────────────────────────────────
        scenario(
            "baichuan_7b",
            ModelFamily::Baichuan7b,
            seq_descriptor(root, ModelFamily::Baichuan7b),
            ampere(),
        ),
        scenario(
            "baichuan2_7b",
            ModelFamily::Baichuan2_7b,
            seq_descriptor(root, ModelFamily::Baichuan2_7b),
            ampere(),
        ),
        scenario(
            "baichuan_13b",
            ModelFamily::Baichuan13b,
            seq_descriptor(root, ModelFamily::Baichuan13b),
            ampere().with_total_memory(40 * GIB),
        ),
        scenario(
            "baichuan2_13b",
            ModelFamily::Baichuan2_13b,
            seq_descriptor(root, ModelFamily::Baichuan2_13b),
            ampere().with_total_memory(40 * GIB),
        ),
        scenario(
            "baichuan2_7b_int4_weight_only",
            ModelFamily::Baichuan2_7b,
            seq_descriptor(root, ModelFamily::Baichuan2_7b)
                .with_quant(QuantConfig::new(QuantAlgo::W4A16)),
            ampere(),
        ),
        // ── Qwen ─────────────────────────────────────────────────────────
        scenario(
            "qwen",
            ModelFamily::Qwen,
            seq_descriptor(root, ModelFamily::Qwen)
                .with_requirements_manifest(&qwen_manifest),
            ampere(),
        ),
        scenario(
            "qwen1_5",
            ModelFamily::Qwen1_5,
            descriptor(root, ModelFamily::Qwen1_5, vec!["1+1=".into()], vec!["2".into()]),
            ampere(),
        ),
        scenario(
            "qwen2",
            ModelFamily::Qwen2,
            seq_descriptor(root, ModelFamily::Qwen2),
            ampere(),
        ),
        scenario(
            "qwen2_int4_weight_only",
            ModelFamily::Qwen2,
            seq_descriptor(root, ModelFamily::Qwen2)
                .with_quant(QuantConfig::new(QuantAlgo::W4A16)),
            ampere(),
        ),
        scenario(
            "qwen2_fp8",
            ModelFamily::Qwen2,
            seq_descriptor(root, ModelFamily::Qwen2).with_quant(QuantConfig::new(QuantAlgo::Fp8)),
            hopper(),
        ),
    ]
}

fn starcoder2_descriptor(root: &Path) -> ScenarioDescriptor {
    descriptor(
        root,
        ModelFamily::StarCoder2,
        vec!["def print_hello_world():".into()],
        vec!["\n    print(\"Hello World\")\n\ndef print".into()],
    )
}
