//! Job aggregate and lifecycle states
//!
//! The Job is the top-level aggregate tracking one user request from
//! submission to terminal outcome: the current goal version, the current
//! plan, the full run history, per-stage repair counters and the lifecycle
//! state machine's position.

use serde::{Deserialize, Serialize};

use crate::domain::goal::GoalSpec;
use crate::domain::plan::{Plan, StepRole};
use crate::domain::repair::RepairDirective;
use crate::domain::run::RunRecord;
use crate::id::{generate_job_id, now_ms};

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    /// Compiling a plan from the current goal version
    Compiling,
    /// Running the compiled plan
    Executing,
    /// Classifying the run outcome
    Evaluating,
    /// A directive was issued; transitions back to Compiling or Executing
    Repairing,
    /// Suspended, waiting for a revised goal (resumable via clarify)
    AwaitingClarification,
    /// Terminal: goal met, artifact delivered
    Succeeded,
    /// Terminal: budget exhausted or fatal failure
    Failed,
}

impl JobState {
    /// Returns true if the job can never run again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Returns true if the job is parked waiting for user input
    pub fn is_suspended(&self) -> bool {
        matches!(self, JobState::AwaitingClarification)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Compiling => "compiling",
            JobState::Executing => "executing",
            JobState::Evaluating => "evaluating",
            JobState::Repairing => "repairing",
            JobState::AwaitingClarification => "awaiting-clarification",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The stateful aggregate tracking one user request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,

    /// Current goal version
    pub goal: GoalSpec,

    /// Prior goal versions, oldest first (filled by clarification)
    #[serde(default)]
    pub goal_history: Vec<GoalSpec>,

    /// Current plan, if one has compiled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,

    /// Every run executed for this job, oldest first
    #[serde(default)]
    pub runs: Vec<RunRecord>,

    pub state: JobState,

    /// Global attempt counter: one full compile/execute/evaluate cycle each
    pub attempt: u32,

    /// Repairs routed to the compiler so far
    pub compiler_repairs: u32,

    /// Repairs routed to the engine so far (timeout escalations)
    pub engine_repairs: u32,

    /// The most recent directive, kept as the headline cause on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_directive: Option<RepairDirective>,

    /// Role that last failed compilation with no-compatible-tool, and how
    /// many times in a row it has done so
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_tool_role: Option<StepRole>,
    #[serde(default)]
    pub no_tool_streak: u32,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Job {
    /// Create a new job for a freshly submitted goal, starting at Compiling
    pub fn new(goal: GoalSpec) -> Self {
        let now = now_ms();
        Self {
            job_id: generate_job_id(),
            goal,
            goal_history: Vec::new(),
            plan: None,
            runs: Vec::new(),
            state: JobState::Compiling,
            attempt: 0,
            compiler_repairs: 0,
            engine_repairs: 0,
            last_directive: None,
            no_tool_role: None,
            no_tool_streak: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adopt a revised goal, archiving the current version. The revision must
    /// be derived from the version currently held.
    pub fn adopt_goal(&mut self, revised: GoalSpec) -> bool {
        if revised.derived_from.as_deref() != Some(self.goal.goal_id.as_str()) {
            return false;
        }
        let old = std::mem::replace(&mut self.goal, revised);
        self.goal_history.push(old);
        // A new goal version starts a clean slate for stale-plan detection
        self.plan = None;
        self.no_tool_role = None;
        self.no_tool_streak = 0;
        true
    }

    /// Record a no-compatible-tool compile failure for streak tracking
    pub fn note_no_tool(&mut self, role: StepRole) {
        if self.no_tool_role == Some(role) {
            self.no_tool_streak += 1;
        } else {
            self.no_tool_role = Some(role);
            self.no_tool_streak = 1;
        }
    }

    /// Clear the no-compatible-tool streak after a successful compile
    pub fn clear_no_tool(&mut self) {
        self.no_tool_role = None;
        self.no_tool_streak = 0;
    }

    /// The most recent run, if any
    pub fn last_run(&self) -> Option<&RunRecord> {
        self.runs.last()
    }

    pub fn touch(&mut self) {
        self.updated_at = now_ms();
    }
}
