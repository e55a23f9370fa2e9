//! Run records
//!
//! A RunRecord captures the outcome of executing one plan once: per-step
//! status, the surviving artifact, elapsed time, and a terminal
//! classification. The engine only draws the fatal/recoverable line here;
//! semantic diagnosis belongs to the evaluator.

use serde::{Deserialize, Serialize};

use crate::id::generate_run_id;

/// Typed payload flowing between steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "data")]
pub enum Artifact {
    /// Raw document bytes as text (fetch output)
    RawDocument(String),
    /// Rendered document after JS execution
    RenderedDocument(String),
    /// Extracted records, one JSON object per record
    Records(Vec<serde_json::Value>),
}

impl Artifact {
    /// An artifact is empty when it carries no usable content
    pub fn is_empty(&self) -> bool {
        match self {
            Artifact::RawDocument(s) | Artifact::RenderedDocument(s) => s.trim().is_empty(),
            Artifact::Records(rs) => rs.is_empty(),
        }
    }
}

/// Why a step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Deadline elapsed (includes cooperative-cancel and non-cooperative
    /// adapters cut off at their deadline)
    Timeout,
    /// Adapter returned a structured, recoverable error
    AdapterError,
    /// Adapter returned an error from the fatal set
    FatalAdapterError,
}

/// A structured step failure, preserved verbatim from the adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub reason: FailureReason,
    /// Adapter's structured error code (e.g. "selector-not-found")
    pub code: String,
    /// Adapter's message, unedited
    pub message: String,
}

impl StepFailure {
    pub fn timeout() -> Self {
        Self {
            reason: FailureReason::Timeout,
            code: "timeout".to_string(),
            message: "step deadline elapsed".to_string(),
        }
    }

    pub fn adapter(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason: FailureReason::AdapterError,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn fatal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason: FailureReason::FatalAdapterError,
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Status of one step within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// Never started because an earlier step failed
    Skipped,
}

/// Per-step outcome within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Tool that ran (or would have run)
    pub tool: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepFailure>,
    pub elapsed_ms: u64,
}

impl StepRecord {
    pub fn succeeded(tool: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            tool: tool.into(),
            status: StepStatus::Succeeded,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(tool: impl Into<String>, failure: StepFailure, elapsed_ms: u64) -> Self {
        Self {
            tool: tool.into(),
            status: StepStatus::Failed,
            error: Some(failure),
            elapsed_ms,
        }
    }

    pub fn skipped(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            status: StepStatus::Skipped,
            error: None,
            elapsed_ms: 0,
        }
    }
}

/// Terminal classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunClassification {
    Success,
    RecoverableFailure,
    FatalFailure,
}

/// The result of executing one plan once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub plan_id: String,
    /// Attempt number carried over from the plan
    pub attempt: u32,
    pub steps: Vec<StepRecord>,
    /// Final artifact, present only when the pipeline completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    pub classification: RunClassification,
    pub started_at: i64,
    pub finished_at: i64,
}

impl RunRecord {
    pub fn new(plan_id: impl Into<String>, attempt: u32, started_at: i64) -> Self {
        Self {
            run_id: generate_run_id(),
            plan_id: plan_id.into(),
            attempt,
            steps: Vec::new(),
            artifact: None,
            classification: RunClassification::RecoverableFailure,
            started_at,
            finished_at: started_at,
        }
    }

    /// The first failed step, if any
    pub fn first_failure(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    /// True if any step failed
    pub fn has_failed_step(&self) -> bool {
        self.first_failure().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_artifact_is_empty() {
        assert!(Artifact::RawDocument("   ".to_string()).is_empty());
        assert!(!Artifact::RawDocument("<html/>".to_string()).is_empty());
        assert!(Artifact::Records(vec![]).is_empty());
        assert!(!Artifact::Records(vec![json!({"price": "9.99"})]).is_empty());
    }

    #[test]
    fn test_step_failure_constructors() {
        let t = StepFailure::timeout();
        assert_eq!(t.reason, FailureReason::Timeout);
        assert_eq!(t.code, "timeout");

        let a = StepFailure::adapter("selector-not-found", "no node matched .price");
        assert_eq!(a.reason, FailureReason::AdapterError);
        assert_eq!(a.code, "selector-not-found");

        let f = StepFailure::fatal("dns-failure", "NXDOMAIN");
        assert_eq!(f.reason, FailureReason::FatalAdapterError);
    }

    #[test]
    fn test_run_record_first_failure() {
        let mut run = RunRecord::new("plan-1", 1, 0);
        run.steps.push(StepRecord::succeeded("playwright", 1200));
        run.steps.push(StepRecord::failed(
            "soup",
            StepFailure::adapter("selector-not-found", "nope"),
            40,
        ));
        run.steps.push(StepRecord::skipped("dedupe"));

        let first = run.first_failure().unwrap();
        assert_eq!(first.tool, "soup");
        assert!(run.has_failed_step());
    }

    #[test]
    fn test_run_record_no_failure() {
        let mut run = RunRecord::new("plan-1", 1, 0);
        run.steps.push(StepRecord::succeeded("requests", 300));
        assert!(run.first_failure().is_none());
        assert!(!run.has_failed_step());
    }

    #[test]
    fn test_run_record_serde_round_trip() {
        let mut run = RunRecord::new("plan-1", 2, 100);
        run.steps.push(StepRecord::failed(
            "requests",
            StepFailure::timeout(),
            30000,
        ));
        run.classification = RunClassification::RecoverableFailure;
        let json = serde_json::to_string(&run).unwrap();
        let back: RunRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, run);
    }

    #[test]
    fn test_classification_serde_names() {
        let v = serde_json::to_value(RunClassification::RecoverableFailure).unwrap();
        assert_eq!(v, json!("recoverable-failure"));
    }
}
