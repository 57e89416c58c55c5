//! Runner behavior against recording stub collaborators: gate ordering,
//! error-stage mapping, all-pairs verdicts, and the end-to-end pass path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use modelconf_harness::{
    builtin_registry, AcceleratorInventory, BuildConfig, ComputeCapability, GenerationHandle,
    HardwareInventorySource, HarnessError, HarnessRunner, ModelBuildSpec, ModelFactory,
    Provisioner, SamplingConfig, ScenarioDescriptor, ScenarioOutcome, SkipReason,
};

const GIB: u64 = 1 << 30;

// ── Stub collaborators ───────────────────────────────────────────────────

struct FixedInventory(AcceleratorInventory);

impl HardwareInventorySource for FixedInventory {
    fn snapshot(&self) -> AcceleratorInventory {
        self.0.clone()
    }
}

fn one_ampere() -> FixedInventory {
    FixedInventory(AcceleratorInventory::uniform(1, 24 * GIB, ComputeCapability::AMPERE))
}

/// Records whether/how often construction was invoked and serves canned
/// generation output.
#[derive(Clone)]
struct StubFactory {
    builds: Arc<AtomicUsize>,
    outputs: Vec<String>,
    build_error: Option<&'static str>,
    generation_error: Option<&'static str>,
}

impl StubFactory {
    fn returning(outputs: &[&str]) -> Self {
        Self {
            builds: Arc::new(AtomicUsize::new(0)),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            build_error: None,
            generation_error: None,
        }
    }

    fn failing_build(message: &'static str) -> Self {
        Self { build_error: Some(message), ..Self::returning(&[]) }
    }

    fn failing_generation(message: &'static str) -> Self {
        Self { generation_error: Some(message), ..Self::returning(&[]) }
    }

    fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ModelFactory for StubFactory {
    fn build(&self, _spec: ModelBuildSpec<'_>) -> anyhow::Result<Box<dyn GenerationHandle>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.build_error {
            anyhow::bail!("{msg}");
        }
        Ok(Box::new(StubHandle {
            outputs: self.outputs.clone(),
            generation_error: self.generation_error,
        }))
    }
}

struct StubHandle {
    outputs: Vec<String>,
    generation_error: Option<&'static str>,
}

impl GenerationHandle for StubHandle {
    fn generate(
        &mut self,
        _prompts: &[String],
        _sampling: &SamplingConfig,
    ) -> anyhow::Result<Vec<String>> {
        if let Some(msg) = self.generation_error {
            anyhow::bail!("{msg}");
        }
        Ok(self.outputs.clone())
    }
}

fn descriptor(prompts: &[&str], references: &[&str]) -> ScenarioDescriptor {
    ScenarioDescriptor::new(
        "models/stub",
        prompts.iter().map(|s| s.to_string()).collect(),
        references.iter().map(|s| s.to_string()).collect(),
    )
    .unwrap()
}

// ── Gating ───────────────────────────────────────────────────────────────

#[test]
fn insufficient_devices_skip_without_construction() {
    let factory = StubFactory::returning(&["2"]);
    let runner = HarnessRunner::with_inventory(factory.clone(), one_ampere());

    let desc = descriptor(&["1+1="], &["2"]).with_build(BuildConfig {
        tensor_parallel: 2,
        ..BuildConfig::default()
    });

    let outcome = runner.run(&desc).unwrap();
    assert_eq!(
        outcome,
        ScenarioOutcome::Skipped(SkipReason::InsufficientDevices { wanted: 2, have: 1 })
    );
    assert_eq!(factory.build_count(), 0, "skip must not construct the model");
}

#[test]
fn world_size_multiplies_tp_and_pp() {
    let factory = StubFactory::returning(&["2"]);
    let inventory =
        FixedInventory(AcceleratorInventory::uniform(2, 24 * GIB, ComputeCapability::AMPERE));
    let runner = HarnessRunner::with_inventory(factory.clone(), inventory);

    // tp=2, pp=2 → world size 4 > 2 devices.
    let desc = descriptor(&["1+1="], &["2"]).with_build(BuildConfig {
        tensor_parallel: 2,
        pipeline_parallel: 2,
        ..BuildConfig::default()
    });

    assert!(runner.run(&desc).unwrap().is_skipped());
    assert_eq!(factory.build_count(), 0);
}

#[test]
fn accelerator_free_host_skips_default_world_size() {
    let factory = StubFactory::returning(&["2"]);
    let runner =
        HarnessRunner::with_inventory(factory.clone(), FixedInventory(AcceleratorInventory::empty()));

    let outcome = runner.run(&descriptor(&["1+1="], &["2"])).unwrap();
    assert!(outcome.is_skipped());
    assert_eq!(factory.build_count(), 0);
}

// ── Pass path ────────────────────────────────────────────────────────────

#[test]
fn exact_match_passes_with_score_one() {
    let factory = StubFactory::returning(&["2"]);
    let runner = HarnessRunner::with_inventory(factory.clone(), one_ampere());

    let outcome = runner.run(&descriptor(&["1+1="], &["2"])).unwrap();
    match outcome {
        ScenarioOutcome::Passed(report) => {
            assert_eq!(report.pairs.len(), 1);
            assert_eq!(report.pairs[0].judgement.score, 1.0);
            assert!(report.pairs[0].judgement.passed);
        }
        other => panic!("expected Passed, got {other:?}"),
    }
    assert_eq!(factory.build_count(), 1);
}

#[test]
fn each_run_builds_a_fresh_model() {
    let factory = StubFactory::returning(&["2"]);
    let runner = HarnessRunner::with_inventory(factory.clone(), one_ampere());
    let desc = descriptor(&["1+1="], &["2"]);

    runner.run(&desc).unwrap();
    runner.run(&desc).unwrap();
    assert_eq!(factory.build_count(), 2);
}

#[test]
fn report_is_index_aligned_with_prompts() {
    let factory = StubFactory::returning(&["D E F G H I J K L M", "2"]);
    let runner = HarnessRunner::with_inventory(factory, one_ampere());

    let desc = descriptor(&["A B C", "1+1="], &["D E F G H I J K L M", "2"]);
    match runner.run(&desc).unwrap() {
        ScenarioOutcome::Passed(report) => {
            assert_eq!(report.pairs.len(), 2);
            assert_eq!(report.pairs[0].prompt, "A B C");
            assert_eq!(report.pairs[1].prompt, "1+1=");
        }
        other => panic!("expected Passed, got {other:?}"),
    }
}

// ── Verdicts ─────────────────────────────────────────────────────────────

#[test]
fn one_failing_pair_fails_the_scenario() {
    // Pair 0 scores 0.9, pair 1 scores 0.5; threshold 0.8 → overall fail.
    let factory = StubFactory::returning(&["abcdefghi?", "ab"]);
    let runner = HarnessRunner::with_inventory(factory, one_ampere());

    let desc = descriptor(&["p0", "p1"], &["abcdefghij", "abcdef"]);
    let err = runner.run(&desc).unwrap_err();
    match err {
        HarnessError::Assertion(report) => {
            assert_eq!(report.failures.len(), 1, "only the 0.5 pair is below threshold");
            let failure = &report.failures[0];
            assert_eq!(failure.index, 1);
            assert_eq!(failure.prompt, "p1");
            assert_eq!(failure.actual, "ab");
            assert_eq!(failure.expected, "abcdef");
            assert!((failure.score - 0.5).abs() < 1e-6);
            assert_eq!(failure.threshold, 0.8);
        }
        other => panic!("expected Assertion, got {other:?}"),
    }
}

#[test]
fn all_failures_are_collected_not_just_the_first() {
    let factory = StubFactory::returning(&["zzz", "qqq"]);
    let runner = HarnessRunner::with_inventory(factory, one_ampere());

    let desc = descriptor(&["p0", "p1"], &["abc", "def"]);
    match runner.run(&desc).unwrap_err() {
        HarnessError::Assertion(report) => {
            assert_eq!(report.failures.len(), 2);
            assert_eq!(report.failures[0].index, 0);
            assert_eq!(report.failures[1].index, 1);
        }
        other => panic!("expected Assertion, got {other:?}"),
    }
}

#[test]
fn scenario_threshold_override_is_honoured() {
    // Score 0.75 fails the default 0.8 but passes a 0.7 override.
    let factory = StubFactory::returning(&["bcde"]);
    let runner = HarnessRunner::with_inventory(factory, one_ampere());

    let strict = descriptor(&["p"], &["abcd"]);
    assert!(matches!(runner.run(&strict).unwrap_err(), HarnessError::Assertion(_)));

    let lenient = descriptor(&["p"], &["abcd"]).with_threshold(0.7).unwrap();
    assert!(runner.run(&lenient).unwrap().is_passed());
}

#[test]
fn mismatched_references_are_rejected_not_truncated() {
    // Public fields allow bypassing `ScenarioDescriptor::new`, so build a
    // 2-prompt/1-reference descriptor by struct literal. Judging must not
    // silently zip-truncate to the shorter list and pass.
    let desc = ScenarioDescriptor {
        model_path: "models/stub".into(),
        prompts: vec!["A B C".into(), "1+1=".into()],
        references: vec!["D E F G H I J K L M".into()],
        sampling: SamplingConfig::default(),
        quant: None,
        build: None,
        similarity_threshold: 0.8,
        requirements_manifest: None,
    };

    let factory = StubFactory::returning(&["D E F G H I J K L M", "completely wrong"]);
    let runner = HarnessRunner::with_inventory(factory.clone(), one_ampere());

    let err = runner.run(&desc).unwrap_err();
    assert_eq!(err.stage(), "configuration");
    assert_eq!(factory.build_count(), 0, "configuration errors precede construction");
}

// ── Error stages ─────────────────────────────────────────────────────────

#[test]
fn build_failure_maps_to_build_error() {
    let factory = StubFactory::failing_build("unsupported quantization for architecture");
    let runner = HarnessRunner::with_inventory(factory, one_ampere());

    let err = runner.run(&descriptor(&["p"], &["r"])).unwrap_err();
    assert_eq!(err.stage(), "build");
    assert!(format!("{err:#}").contains("models/stub"));
}

#[test]
fn generation_failure_maps_to_generation_error() {
    let factory = StubFactory::failing_generation("CUDA out of memory");
    let runner = HarnessRunner::with_inventory(factory.clone(), one_ampere());

    let err = runner.run(&descriptor(&["p"], &["r"])).unwrap_err();
    assert_eq!(err.stage(), "generation");
    assert_eq!(factory.build_count(), 1, "generation errors happen after construction");
}

#[test]
fn misaligned_engine_output_is_a_generation_error() {
    let factory = StubFactory::returning(&["only one output"]);
    let runner = HarnessRunner::with_inventory(factory, one_ampere());

    let desc = descriptor(&["p0", "p1"], &["r0", "r1"]);
    let err = runner.run(&desc).unwrap_err();
    assert_eq!(err.stage(), "generation");
}

// ── Provisioning ─────────────────────────────────────────────────────────

#[test]
fn provisioning_failure_prevents_construction() {
    let factory = StubFactory::returning(&["2"]);
    let runner = HarnessRunner::with_inventory(factory.clone(), one_ampere())
        .with_provisioner(Provisioner::with_command("false", vec![]));

    let manifest = tempfile::NamedTempFile::new().unwrap();
    let desc = descriptor(&["1+1="], &["2"]).with_requirements_manifest(manifest.path());

    let err = runner.run(&desc).unwrap_err();
    assert_eq!(err.stage(), "provisioning");
    assert_eq!(factory.build_count(), 0, "provisioning runs before construction");
}

#[test]
fn provisioning_success_proceeds_to_construction() {
    let factory = StubFactory::returning(&["2"]);
    let runner = HarnessRunner::with_inventory(factory.clone(), one_ampere())
        .with_provisioner(Provisioner::with_command("true", vec![]));

    let manifest = tempfile::NamedTempFile::new().unwrap();
    let desc = descriptor(&["1+1="], &["2"]).with_requirements_manifest(manifest.path());

    assert!(runner.run(&desc).unwrap().is_passed());
    assert_eq!(factory.build_count(), 1);
}

#[test]
fn skip_short_circuits_provisioning_too() {
    let factory = StubFactory::returning(&["2"]);
    // An installer that would fail loudly if it ever ran.
    let runner = HarnessRunner::with_inventory(
        factory.clone(),
        FixedInventory(AcceleratorInventory::empty()),
    )
    .with_provisioner(Provisioner::with_command("false", vec![]));

    let manifest = tempfile::NamedTempFile::new().unwrap();
    let desc = descriptor(&["1+1="], &["2"]).with_requirements_manifest(manifest.path());

    assert!(runner.run(&desc).unwrap().is_skipped());
    assert_eq!(factory.build_count(), 0);
}

// ── Registry-driven end to end ───────────────────────────────────────────

#[test]
fn outcome_round_trips_through_json() {
    let factory = StubFactory::returning(&["2"]);
    let runner = HarnessRunner::with_inventory(factory, one_ampere());

    let outcome = runner.run(&descriptor(&["1+1="], &["2"])).unwrap();
    let json = serde_json::to_string(&outcome).unwrap();
    let back: ScenarioOutcome = serde_json::from_str(&json).unwrap();
    assert_eq!(back, outcome);
}

#[test]
fn builtin_qwen1_5_passes_against_a_conforming_engine() {
    let registry = builtin_registry(std::path::Path::new("/models"));
    let scenario = registry.get("qwen1_5").expect("qwen1_5 is registered");

    let factory = StubFactory::returning(&["2"]);
    let runner = HarnessRunner::with_inventory(factory, one_ampere());

    match runner.run(&scenario.descriptor).unwrap() {
        ScenarioOutcome::Passed(report) => {
            assert_eq!(report.pairs[0].judgement.score, 1.0);
        }
        other => panic!("expected Passed, got {other:?}"),
    }
}
