//! ID generation utilities for Weavr
//!
//! Provides functions for generating unique identifiers for goals, plans,
//! jobs and runs, plus millisecond timestamps.

use chrono::Utc;
use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn suffixed(prefix: &str) -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("{}-{}-{:04x}", prefix, timestamp, random)
}

/// Generate a unique goal ID
///
/// Format: `goal-{timestamp_ms}-{random_hex}`
pub fn generate_goal_id() -> String {
    suffixed("goal")
}

/// Generate a job ID
///
/// Format: `job-{timestamp_ms}-{random_hex}`
pub fn generate_job_id() -> String {
    suffixed("job")
}

/// Generate a plan ID tied to the attempt that produced it
///
/// Format: `plan-{timestamp_ms}-{random_hex}-a{attempt}`
pub fn generate_plan_id(attempt: u32) -> String {
    format!("{}-a{}", suffixed("plan"), attempt)
}

/// Generate a run ID for one execution of a plan
///
/// Format: `run-{timestamp_ms}-{random_hex}`
pub fn generate_run_id() -> String {
    suffixed("run")
}
