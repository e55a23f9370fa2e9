//! Execution engine
//!
//! Runs a plan's steps strictly in order: the artifact produced by step i is
//! the sole input to step i+1. Each invocation is bounded by the step's
//! configured deadline; a non-cooperative adapter is abandoned at that
//! deadline and recorded as a timeout. The engine only draws the
//! fatal/recoverable line; it never interprets why a step failed.

pub mod adapter;
pub mod sim;

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::domain::plan::Plan;
use crate::domain::run::{
    Artifact, FailureReason, RunClassification, RunRecord, StepFailure, StepRecord,
};
use crate::id::now_ms;

pub use adapter::{AdapterRegistry, CancelFlag, CancelHandle, StaticAdapter, ToolAdapter};

/// Failure codes that short-circuit a job regardless of retries
const FATAL_CODES: &[&str] = &["dns-failure", "auth-rejected", "unknown-adapter"];

/// Default per-step deadline when a step carries none
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 30_000;

/// Per-execution options, adjusted by engine-targeted repair directives
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Multiplier applied to every step deadline (timeout escalation)
    pub timeout_factor: u32,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self { timeout_factor: 1 }
    }
}

/// Execution engine over an adapter registry
pub struct ExecutionEngine<'a> {
    registry: &'a AdapterRegistry,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(registry: &'a AdapterRegistry) -> Self {
        Self { registry }
    }

    /// Execute one plan once, producing a run record
    pub async fn execute(&self, plan: &Plan, opts: &ExecOptions, cancel: CancelFlag) -> RunRecord {
        let mut run = RunRecord::new(plan.plan_id.clone(), plan.attempt, now_ms());
        let mut artifact: Option<Artifact> = None;
        let mut stopped_at: Option<usize> = None;

        for (i, step) in plan.steps.iter().enumerate() {
            let deadline_ms = step
                .timeout_ms()
                .unwrap_or(DEFAULT_STEP_TIMEOUT_MS)
                .saturating_mul(opts.timeout_factor.max(1) as u64);
            let started = Instant::now();

            let outcome = match self.registry.get(&step.tool) {
                Some(adapter) => {
                    debug!(
                        "run {} step {} tool {} deadline {}ms",
                        run.run_id, i, step.tool, deadline_ms
                    );
                    let work = adapter.invoke(artifact.clone(), &step.config, cancel.clone());
                    let bounded = tokio::time::timeout(Duration::from_millis(deadline_ms), async {
                        tokio::select! {
                            result = work => Some(result),
                            _ = cancel.cancelled() => None,
                        }
                    });
                    match bounded.await {
                        Err(_) => Err(StepFailure::timeout()),
                        Ok(None) => Err(StepFailure::timeout()),
                        Ok(Some(result)) => result,
                    }
                }
                None => Err(StepFailure::fatal(
                    "unknown-adapter",
                    format!("no adapter registered for tool '{}'", step.tool),
                )),
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match outcome {
                Ok(output) => {
                    run.steps.push(StepRecord::succeeded(&step.tool, elapsed_ms));
                    artifact = Some(output);
                }
                Err(failure) => {
                    warn!(
                        "run {} step {} tool {} failed: {} ({})",
                        run.run_id, i, step.tool, failure.code, failure.message
                    );
                    run.steps
                        .push(StepRecord::failed(&step.tool, failure, elapsed_ms));
                    stopped_at = Some(i);
                    break;
                }
            }
        }

        // Steps after a failure never start
        if let Some(stop) = stopped_at {
            for step in plan.steps.iter().skip(stop + 1) {
                run.steps.push(StepRecord::skipped(&step.tool));
            }
        }

        run.artifact = artifact;
        run.classification = classify(&run);
        run.finished_at = now_ms();
        run
    }
}

/// Fatal/recoverable/success split; all further diagnosis belongs to the
/// evaluator
fn classify(run: &RunRecord) -> RunClassification {
    if let Some(failed) = run.first_failure() {
        let fatal = failed
            .error
            .as_ref()
            .map(|e| {
                e.reason == FailureReason::FatalAdapterError
                    || FATAL_CODES.contains(&e.code.as_str())
            })
            .unwrap_or(false);
        return if fatal {
            RunClassification::FatalFailure
        } else {
            RunClassification::RecoverableFailure
        };
    }

    // Zero failed steps: success requires a non-empty final artifact;
    // partial results never surface as success
    match &run.artifact {
        Some(artifact) if !artifact.is_empty() => RunClassification::Success,
        _ => RunClassification::RecoverableFailure,
    }
}
