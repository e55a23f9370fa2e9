//! Outcome evaluator
//!
//! Inspects a completed or failed run against the original goal. On success
//! it verifies field coverage and cleans the artifact; on failure it
//! classifies the reason against a fixed taxonomy and produces a repair
//! directive routed at the compiler, the engine, or the user.

use log::debug;
use serde_json::Value;

use crate::domain::goal::GoalSpec;
use crate::domain::plan::{Plan, StepRole};
use crate::domain::repair::{RepairDirective, RepairHint, RepairTarget};
use crate::domain::run::{Artifact, FailureReason, RunClassification, RunRecord, StepFailure};

/// Failure codes that read as a stale or wrong extraction step
const SELECTOR_CODES: &[&str] = &["selector-not-found", "parse-error", "extraction-failed"];

/// Failure codes that read as an anti-bot block
const ANTI_BOT_CODES: &[&str] = &["access-denied", "captcha-detected", "blocked", "http-403"];

/// Result of evaluating one run
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Goal met; artifact cleaned down to the requested fields
    Success(Artifact),
    /// Goal not met; here is what to do next
    Repair(RepairDirective),
}

/// Evaluate a run against its goal
///
/// `engine_repairs` is the number of timeout escalations already granted to
/// this job; the one-escalation bound is enforced here by rerouting further
/// timeouts to the compiler.
pub fn evaluate(
    goal: &GoalSpec,
    plan: &Plan,
    run: &RunRecord,
    engine_repairs: u32,
) -> Evaluation {
    match run.classification {
        RunClassification::Success => evaluate_success(goal, run),
        RunClassification::RecoverableFailure => {
            evaluate_recoverable(plan, run, engine_repairs)
        }
        RunClassification::FatalFailure => {
            let reason = run
                .first_failure()
                .and_then(|s| s.error.as_ref())
                .map(|e| e.code.clone())
                .unwrap_or_else(|| "fatal-failure".to_string());
            Evaluation::Repair(RepairDirective::new(RepairTarget::GoalClarification, reason))
        }
    }
}

/// Field coverage check on a successful run
///
/// A missing field is not elevated to a full failure; it becomes a compiler
/// directive so the loop can retry with an adjusted extraction step, under
/// the same attempt budget as true failures.
fn evaluate_success(goal: &GoalSpec, run: &RunRecord) -> Evaluation {
    let records = match &run.artifact {
        Some(Artifact::Records(records)) => records,
        // A successful run should end in extracted records; anything else
        // means the extraction step never did its job
        _ => {
            return missing_field_directive(
                goal.fields.first().map(|f| f.name.as_str()).unwrap_or(""),
            );
        }
    };

    for field in &goal.fields {
        let covered = records.iter().all(|r| field_present(r, &field.name));
        if !covered {
            debug!("field '{}' missing from artifact", field.name);
            return missing_field_directive(&field.name);
        }
    }

    Evaluation::Success(clean_artifact(goal, records))
}

fn field_present(record: &Value, field: &str) -> bool {
    match record.get(field) {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn missing_field_directive(field: &str) -> Evaluation {
    Evaluation::Repair(
        RepairDirective::new(RepairTarget::Compiler, "missing-field")
            .with_hint(RepairHint::ReplaceStep {
                role: StepRole::Parse,
                reason: format!("field '{}' absent from extraction output", field),
            })
            .with_hint(RepairHint::ClarifyField {
                field: field.to_string(),
            }),
    )
}

/// Retain only the requested fields in each record
fn clean_artifact(goal: &GoalSpec, records: &[Value]) -> Artifact {
    let wanted: Vec<&str> = goal.field_names();
    let cleaned = records
        .iter()
        .map(|record| {
            let mut out = serde_json::Map::new();
            if let Value::Object(map) = record {
                for (k, v) in map {
                    if wanted.contains(&k.as_str()) {
                        out.insert(k.clone(), v.clone());
                    }
                }
            }
            Value::Object(out)
        })
        .collect();
    Artifact::Records(cleaned)
}

/// Taxonomy over recoverable failures
fn evaluate_recoverable(plan: &Plan, run: &RunRecord, engine_repairs: u32) -> Evaluation {
    let Some(failed_step) = run.first_failure() else {
        // Pipeline completed but the final artifact was empty
        return Evaluation::Repair(
            RepairDirective::new(RepairTarget::Compiler, "empty-artifact").with_hint(
                RepairHint::ReplaceStep {
                    role: StepRole::Parse,
                    reason: "pipeline produced no records".to_string(),
                },
            ),
        );
    };

    let failure = failed_step
        .error
        .clone()
        .unwrap_or_else(|| StepFailure::adapter("unknown", "no error detail recorded"));
    let role = plan
        .steps
        .iter()
        .find(|s| s.tool == failed_step.tool)
        .map(|s| s.role)
        .unwrap_or(StepRole::Fetch);

    if SELECTOR_CODES.contains(&failure.code.as_str()) {
        return Evaluation::Repair(
            RepairDirective::new(RepairTarget::Compiler, failure.code.clone()).with_hint(
                RepairHint::ReplaceStep {
                    role,
                    reason: failure.code,
                },
            ),
        );
    }

    if ANTI_BOT_CODES.contains(&failure.code.as_str()) {
        return Evaluation::Repair(
            RepairDirective::new(RepairTarget::Compiler, failure.code).with_hint(
                RepairHint::RequireCapability {
                    tag: crate::compiler::ANTI_BLOCK_TAG.to_string(),
                },
            ),
        );
    }

    if failure.reason == FailureReason::Timeout {
        if engine_repairs == 0 {
            return Evaluation::Repair(
                RepairDirective::new(RepairTarget::Engine, "timeout")
                    .with_hint(RepairHint::ExtendTimeout { factor: 2 }),
            );
        }
        // Escalation already spent: swap the slow tool out instead
        return Evaluation::Repair(
            RepairDirective::new(RepairTarget::Compiler, "timeout")
                .with_hint(RepairHint::ExcludeTool {
                    name: failed_step.tool.clone(),
                })
                .with_hint(RepairHint::ReplaceStep {
                    role,
                    reason: "repeated timeout".to_string(),
                }),
        );
    }

    // Any other adapter error: replace the failing tool
    Evaluation::Repair(
        RepairDirective::new(RepairTarget::Compiler, failure.code.clone())
            .with_hint(RepairHint::ExcludeTool {
                name: failed_step.tool.clone(),
            })
            .with_hint(RepairHint::ReplaceStep {
                role,
                reason: failure.code,
            }),
    )
}
