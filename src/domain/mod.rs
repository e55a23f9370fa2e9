//! Domain types: goals, tool descriptors, plans, runs, repairs, jobs.

pub mod descriptor;
pub mod event;
pub mod goal;
pub mod job;
pub mod plan;
pub mod repair;
pub mod run;

pub use descriptor::{CompatRef, ToolCategory, ToolDescriptor};
pub use event::{EventSink, LogEventSink, MemoryEventSink, TransitionEvent};
pub use goal::{FieldSpec, GoalSpec};
pub use job::{Job, JobState};
pub use plan::{Plan, Step, StepRole};
pub use repair::{RepairDirective, RepairHint, RepairTarget};
pub use run::{
    Artifact, FailureReason, RunClassification, RunRecord, StepFailure, StepRecord, StepStatus,
};
