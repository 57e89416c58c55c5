//! Error taxonomy for scenario execution.
//!
//! Every failure category is distinguishable by the outer test framework:
//! provisioning, build, and generation failures each carry their source,
//! and assertion failures carry the full per-pair diagnostics. Skips are
//! not errors — they live in
//! [`ScenarioOutcome::Skipped`](crate::runner::ScenarioOutcome).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One (actual, reference) pair that scored below threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairFailure {
    /// Index of the pair within the descriptor's prompts.
    pub index: usize,
    /// The prompt that produced the output.
    pub prompt: String,
    /// What the engine generated.
    pub actual: String,
    /// What the scenario expected.
    pub expected: String,
    /// Computed similarity score.
    pub score: f32,
    /// Threshold the score was compared against.
    pub threshold: f32,
}

/// All below-threshold pairs of a failed scenario.
///
/// A scenario passes only when every pair passes, so one report may carry
/// several failures; judging never stops at the first miss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionReport {
    /// Pairs that scored below threshold, in prompt order.
    pub failures: Vec<PairFailure>,
}

impl fmt::Display for AssertionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} prompt/reference pair(s) below threshold", self.failures.len())?;
        for p in &self.failures {
            write!(
                f,
                "\n  [{}] score {:.3} < {:.3}; prompt: {:?}, generated: {:?}, expected: {:?}",
                p.index, p.score, p.threshold, p.prompt, p.actual, p.expected
            )?;
        }
        Ok(())
    }
}

/// Fatal-to-the-scenario failures, by stage.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The descriptor itself is malformed — a test configuration error
    /// caught before any collaborator is invoked. Constructed descriptors
    /// are validated up front, but every field is public, so the runner
    /// re-checks the alignment invariant on whatever it is handed.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(#[from] crate::descriptor::DescriptorError),

    /// Dependency installation exited non-zero or could not be spawned.
    #[error("provisioning `{command}` failed ({status}): {stderr}")]
    Provisioning {
        /// The command line that was run.
        command: String,
        /// Exit status, or a spawn-failure description.
        status: String,
        /// Captured stderr (empty when the process never started).
        stderr: String,
    },

    /// Model construction failed, e.g. unsupported quantization for the
    /// architecture.
    #[error("model build failed for {model}")]
    Build {
        /// Model location from the descriptor.
        model: String,
        #[source]
        source: anyhow::Error,
    },

    /// The generation call failed, e.g. device OOM.
    #[error("generation failed for {model}")]
    Generation {
        /// Model location from the descriptor.
        model: String,
        #[source]
        source: anyhow::Error,
    },

    /// All prior stages succeeded but at least one pair scored below
    /// threshold.
    #[error("assertion failure: {0}")]
    Assertion(AssertionReport),
}

impl HarnessError {
    /// Stable stage name for logs and skip/failure accounting.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidDescriptor(_) => "configuration",
            Self::Provisioning { .. } => "provisioning",
            Self::Build { .. } => "build",
            Self::Generation { .. } => "generation",
            Self::Assertion(_) => "assertion",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_report_lists_every_failure() {
        let report = AssertionReport {
            failures: vec![
                PairFailure {
                    index: 1,
                    prompt: "A B C".into(),
                    actual: "x".into(),
                    expected: "D E F".into(),
                    score: 0.1,
                    threshold: 0.8,
                },
                PairFailure {
                    index: 3,
                    prompt: "1+1=".into(),
                    actual: "3".into(),
                    expected: "2".into(),
                    score: 0.0,
                    threshold: 0.8,
                },
            ],
        };
        let rendered = report.to_string();
        assert!(rendered.contains("2 prompt/reference pair(s)"));
        assert!(rendered.contains("[1]"));
        assert!(rendered.contains("[3]"));
        assert!(rendered.contains("\"1+1=\""));
    }

    #[test]
    fn stages_are_distinguishable() {
        let build = HarnessError::Build {
            model: "m".into(),
            source: anyhow::anyhow!("unsupported quantization"),
        };
        let generation = HarnessError::Generation {
            model: "m".into(),
            source: anyhow::anyhow!("out of memory"),
        };
        assert_eq!(build.stage(), "build");
        assert_eq!(generation.stage(), "generation");
        assert_ne!(build.stage(), generation.stage());
    }
}
