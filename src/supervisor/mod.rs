//! Job supervisor
//!
//! Owns the job lifecycle: Compiling -> Executing -> Evaluating, looping
//! through Repairing under attempt budgets until the job succeeds, fails
//! permanently, or parks awaiting clarification. One async loop drives one
//! job; jobs share nothing mutable beyond the stores, so any number may run
//! concurrently. The single-active-stage invariant falls out of the loop
//! structure itself: a job is always in exactly one arm per iteration.

pub mod hints;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::catalog::ToolCatalog;
use crate::compiler::{self, CompileError};
use crate::config::ConfigStore;
use crate::domain::event::{EventSink, TransitionEvent};
use crate::domain::goal::GoalSpec;
use crate::domain::job::{Job, JobState};
use crate::domain::repair::{RepairDirective, RepairTarget};
use crate::engine::{AdapterRegistry, CancelFlag, CancelHandle, ExecOptions, ExecutionEngine};
use crate::error::{Result, WeavrError};
use crate::evaluator::{self, Evaluation};
use crate::storage::{HistoryEntry, HistoryStore, JobStore};

/// Budgets bounding the repair loop
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Global compile/execute/evaluate cycles per job
    pub attempt_budget: u32,
    /// Repairs routed to the compiler per job
    pub compiler_repair_budget: u32,
    /// Timeout escalations per job
    pub engine_repair_budget: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            attempt_budget: 5,
            compiler_repair_budget: 5,
            engine_repair_budget: 1,
        }
    }
}

/// The orchestration loop over compiler, engine and evaluator
pub struct Supervisor {
    catalog: Arc<ToolCatalog>,
    config_store: Arc<dyn ConfigStore>,
    registry: Arc<AdapterRegistry>,
    jobs: Arc<dyn JobStore>,
    history: Arc<dyn HistoryStore>,
    events: Arc<dyn EventSink>,
    config: SupervisorConfig,
    /// Live cancel handles for in-flight jobs, keyed by job_id
    cancels: Mutex<HashMap<String, Arc<CancelHandle>>>,
}

impl Supervisor {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        config_store: Arc<dyn ConfigStore>,
        registry: Arc<AdapterRegistry>,
        jobs: Arc<dyn JobStore>,
        history: Arc<dyn HistoryStore>,
        events: Arc<dyn EventSink>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            catalog,
            config_store,
            registry,
            jobs,
            history,
            events,
            config,
            cancels: Mutex::new(HashMap::new()),
        }
    }

    /// Submit a goal: create a job and drive it to a terminal or suspended
    /// state, returning its id
    pub async fn submit(&self, goal: GoalSpec) -> Result<String> {
        if goal.fields.is_empty() {
            return Err(WeavrError::Goal("no fields requested".to_string()));
        }
        if goal.targets.is_empty() {
            return Err(WeavrError::Goal("no targets given".to_string()));
        }

        let mut job = Job::new(goal);
        let job_id = job.job_id.clone();
        info!("job {} submitted for goal {}", job_id, job.goal.goal_id);
        self.jobs.put(&job)?;

        self.run_job(&mut job).await?;
        Ok(job_id)
    }

    /// Resume a job parked in AwaitingClarification with a revised goal
    ///
    /// The revised goal must be derived from the version the job currently
    /// holds; the resumed job compiles from the new version only.
    pub async fn clarify(&self, job_id: &str, revised: GoalSpec) -> Result<()> {
        let mut job = self
            .jobs
            .get(job_id)?
            .ok_or_else(|| WeavrError::JobNotFound(job_id.to_string()))?;

        if job.state != JobState::AwaitingClarification {
            return Err(WeavrError::InvalidState(format!(
                "job {} is {}, not awaiting clarification",
                job_id, job.state
            )));
        }
        if !job.adopt_goal(revised) {
            return Err(WeavrError::Goal(format!(
                "revised goal must be derived from {}",
                job.goal.goal_id
            )));
        }

        info!("job {} clarified; resuming with goal {}", job_id, job.goal.goal_id);
        self.transition(&mut job, JobState::Compiling)?;
        self.run_job(&mut job).await
    }

    /// Abort a job's in-flight step, if it has one
    pub fn abort(&self, job_id: &str) {
        if let Ok(cancels) = self.cancels.lock() {
            if let Some(handle) = cancels.get(job_id) {
                warn!("job {} aborted by request", job_id);
                handle.cancel();
            }
        }
    }

    /// Load a job by id
    pub fn job(&self, job_id: &str) -> Result<Option<Job>> {
        self.jobs.get(job_id)
    }

    /// All known jobs
    pub fn list(&self) -> Result<Vec<Job>> {
        self.jobs.list()
    }

    fn cancel_flag(&self, job_id: &str) -> CancelFlag {
        let (handle, flag) = CancelHandle::new();
        if let Ok(mut cancels) = self.cancels.lock() {
            cancels.insert(job_id.to_string(), Arc::new(handle));
        }
        flag
    }

    fn drop_cancel(&self, job_id: &str) {
        if let Ok(mut cancels) = self.cancels.lock() {
            cancels.remove(job_id);
        }
    }

    fn transition(&self, job: &mut Job, to: JobState) -> Result<()> {
        let from = job.state;
        job.state = to;
        job.touch();
        self.jobs.put(job)?;
        // Fire and forget: event loss never affects job correctness
        self.events
            .emit(TransitionEvent::new(job.job_id.clone(), from, to, job.attempt));
        Ok(())
    }

    /// Drive one job until it reaches a terminal or suspended state
    async fn run_job(&self, job: &mut Job) -> Result<()> {
        loop {
            match job.state {
                JobState::Compiling => self.step_compile(job)?,
                JobState::Executing => self.step_execute(job).await?,
                JobState::Evaluating => self.step_evaluate(job)?,
                JobState::Repairing => self.step_repair(job)?,
                JobState::Succeeded
                | JobState::Failed
                | JobState::AwaitingClarification => break,
            }
        }
        self.drop_cancel(&job.job_id);
        Ok(())
    }

    fn step_compile(&self, job: &mut Job) -> Result<()> {
        if job.attempt >= self.config.attempt_budget {
            warn!("job {} attempt budget exhausted", job.job_id);
            return self.transition(job, JobState::Failed);
        }
        job.attempt += 1;

        let hints = hints::build(job, self.history.as_ref());
        match compiler::compile(
            &job.goal,
            &self.catalog,
            self.config_store.as_ref(),
            &hints,
            job.attempt,
        ) {
            Ok(plan) => {
                info!(
                    "job {} compiled plan {} [{}]",
                    job.job_id,
                    plan.plan_id,
                    plan.tool_names().join(" -> ")
                );
                job.clear_no_tool();
                job.plan = Some(plan);
                self.transition(job, JobState::Executing)
            }
            Err(CompileError::NoCompatibleTool { role }) => {
                warn!("job {} compile failed: no compatible tool for {}", job.job_id, role);
                job.note_no_tool(role);
                if job.no_tool_streak >= 2 {
                    // The goal itself looks underspecified; surface outward
                    job.last_directive = Some(RepairDirective::new(
                        RepairTarget::GoalClarification,
                        "no-compatible-tool",
                    ));
                    self.transition(job, JobState::AwaitingClarification)
                } else {
                    // One more try under the same budget; a changed hint set
                    // is the only thing that can change the outcome
                    self.transition(job, JobState::Compiling)
                }
            }
            Err(CompileError::MissingConfig { key }) => {
                warn!("job {} compile failed: missing config key {}", job.job_id, key);
                job.last_directive = Some(RepairDirective::new(
                    RepairTarget::GoalClarification,
                    "missing-config",
                ));
                self.transition(job, JobState::Failed)
            }
        }
    }

    async fn step_execute(&self, job: &mut Job) -> Result<()> {
        let plan = job
            .plan
            .clone()
            .ok_or_else(|| WeavrError::InvalidState("executing without a plan".to_string()))?;

        let opts = ExecOptions {
            // One escalation doubles every deadline for the rest of the job
            timeout_factor: if job.engine_repairs > 0 { 2 } else { 1 },
        };
        let cancel = self.cancel_flag(&job.job_id);
        let engine = ExecutionEngine::new(&self.registry);
        let run = engine.execute(&plan, &opts, cancel).await;

        info!(
            "job {} run {} finished: {:?}",
            job.job_id, run.run_id, run.classification
        );
        job.runs.push(run);
        self.transition(job, JobState::Evaluating)
    }

    fn step_evaluate(&self, job: &mut Job) -> Result<()> {
        let plan = job
            .plan
            .clone()
            .ok_or_else(|| WeavrError::InvalidState("evaluating without a plan".to_string()))?;
        let run = job
            .last_run()
            .cloned()
            .ok_or_else(|| WeavrError::InvalidState("evaluating without a run".to_string()))?;

        match evaluator::evaluate(&job.goal, &plan, &run, job.engine_repairs) {
            Evaluation::Success(artifact) => {
                let mut final_run = run;
                final_run.artifact = Some(artifact);
                if let Some(last) = job.runs.last_mut() {
                    *last = final_run.clone();
                }
                if let Err(e) = self.history.record(&HistoryEntry {
                    goal: job.goal.clone(),
                    plan,
                    run: final_run,
                }) {
                    // Reuse is advisory; failing to archive never fails the job
                    warn!("job {} history write failed: {}", job.job_id, e);
                }
                self.transition(job, JobState::Succeeded)
            }
            Evaluation::Repair(directive) => {
                info!(
                    "job {} repair directive: {:?} ({})",
                    job.job_id, directive.target, directive.reason
                );
                job.last_directive = Some(directive.clone());
                match directive.target {
                    RepairTarget::GoalClarification => {
                        self.transition(job, JobState::AwaitingClarification)
                    }
                    _ => self.transition(job, JobState::Repairing),
                }
            }
        }
    }

    fn step_repair(&self, job: &mut Job) -> Result<()> {
        if job.attempt >= self.config.attempt_budget {
            warn!("job {} attempt budget exhausted during repair", job.job_id);
            return self.transition(job, JobState::Failed);
        }

        let target = job
            .last_directive
            .as_ref()
            .map(|d| d.target)
            .ok_or_else(|| WeavrError::InvalidState("repairing without a directive".to_string()))?;

        match target {
            RepairTarget::Compiler => {
                if job.compiler_repairs >= self.config.compiler_repair_budget {
                    return self.transition(job, JobState::Failed);
                }
                job.compiler_repairs += 1;
                self.transition(job, JobState::Compiling)
            }
            RepairTarget::Engine => {
                if job.engine_repairs >= self.config.engine_repair_budget {
                    return self.transition(job, JobState::Failed);
                }
                job.engine_repairs += 1;
                // Same plan, extended deadlines; this still consumes a cycle
                job.attempt += 1;
                self.transition(job, JobState::Executing)
            }
            RepairTarget::GoalClarification => {
                Err(WeavrError::InvalidState(
                    "clarification directives never reach Repairing".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::RENDERING_TAG;
    use crate::domain::descriptor::{ToolCategory, ToolDescriptor};
    use crate::domain::event::MemoryEventSink;
    use crate::domain::goal::FieldSpec;
    use crate::domain::run::{Artifact, StepFailure};
    use crate::engine::{StaticAdapter, ToolAdapter};
    use crate::storage::{MemoryHistoryStore, MemoryJobStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Adapter that fails a scripted number of times, then succeeds
    struct FlakyAdapter {
        failures: Vec<StepFailure>,
        calls: AtomicU32,
        success: Artifact,
    }

    impl FlakyAdapter {
        fn new(failures: Vec<StepFailure>, success: Artifact) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                success,
            }
        }
    }

    #[async_trait]
    impl ToolAdapter for FlakyAdapter {
        async fn invoke(
            &self,
            _input: Option<Artifact>,
            _config: &BTreeMap<String, serde_json::Value>,
            _cancel: CancelFlag,
        ) -> std::result::Result<Artifact, StepFailure> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match self.failures.get(call) {
                Some(failure) => Err(failure.clone()),
                None => Ok(self.success.clone()),
            }
        }
    }

    fn goal() -> GoalSpec {
        GoalSpec::new(
            vec!["https://example.com/products".to_string()],
            vec![FieldSpec::new("price"), FieldSpec::new("title")],
        )
        .with_requirement(RENDERING_TAG)
    }

    fn catalog() -> ToolCatalog {
        let mut catalog = ToolCatalog::new();
        catalog.add(
            ToolDescriptor::new("render-r", ToolCategory::Renderer)
                .with_capability(RENDERING_TAG)
                .with_priority(1),
        );
        catalog.add(
            ToolDescriptor::new("parse-p", ToolCategory::Parser)
                .with_capability("html_parsing")
                .with_priority(1),
        );
        catalog.add(
            ToolDescriptor::new("parse-p2", ToolCategory::Parser)
                .with_capability("html_parsing")
                .with_priority(2),
        );
        catalog
    }

    fn good_records() -> Artifact {
        Artifact::Records(vec![json!({"price": "9.99", "title": "Widget"})])
    }

    struct Harness {
        supervisor: Supervisor,
        events: Arc<MemoryEventSink>,
    }

    fn harness(registry: AdapterRegistry, config: SupervisorConfig) -> Harness {
        let events = Arc::new(MemoryEventSink::new());
        let supervisor = Supervisor::new(
            Arc::new(catalog()),
            Arc::new(crate::config::MapConfig::new()),
            Arc::new(registry),
            Arc::new(MemoryJobStore::new()),
            Arc::new(MemoryHistoryStore::new()),
            events.clone(),
            config,
        );
        Harness { supervisor, events }
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(StaticAdapter::ok(Artifact::RenderedDocument("<html/>".into()))),
        );
        registry.register("parse-p", Arc::new(StaticAdapter::ok(good_records())));

        let h = harness(registry, SupervisorConfig::default());
        let job_id = h.supervisor.submit(goal()).await.unwrap();

        let job = h.supervisor.job(&job_id).unwrap().unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.attempt, 1);
        assert_eq!(job.runs.len(), 1);
    }

    // Scenario C: first parse fails with selector-not-found, recompile with
    // the hint succeeds on attempt 2
    #[tokio::test]
    async fn test_scenario_c_repair_then_succeed() {
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(StaticAdapter::ok(Artifact::RenderedDocument("<html/>".into()))),
        );
        registry.register(
            "parse-p",
            Arc::new(FlakyAdapter::new(
                vec![StepFailure::adapter("selector-not-found", "stale selector")],
                good_records(),
            )),
        );

        let h = harness(registry, SupervisorConfig::default());
        let job_id = h.supervisor.submit(goal()).await.unwrap();

        let job = h.supervisor.job(&job_id).unwrap().unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.attempt, 2);
        assert_eq!(job.runs.len(), 2);
        assert_eq!(job.compiler_repairs, 1);
        // The repaired plan switched to the fallback selector set
        let plan = job.plan.as_ref().unwrap();
        let parse = plan.steps.iter().find(|s| s.tool == "parse-p").unwrap();
        assert_eq!(parse.config["selector_set"], json!("fallback"));
    }

    // Scenario D: a persistently failing step with budget 5 caps at 5 attempts
    #[tokio::test]
    async fn test_scenario_d_budget_caps_attempts() {
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(StaticAdapter::ok(Artifact::RenderedDocument("<html/>".into()))),
        );
        let persistent = StepFailure::adapter("selector-not-found", "layout changed");
        registry.register(
            "parse-p",
            Arc::new(StaticAdapter::err(persistent.clone())),
        );
        registry.register("parse-p2", Arc::new(StaticAdapter::err(persistent)));

        let h = harness(registry, SupervisorConfig::default());
        let job_id = h.supervisor.submit(goal()).await.unwrap();

        let job = h.supervisor.job(&job_id).unwrap().unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempt, 5);
        // Full run history retained for post-mortem
        assert_eq!(job.runs.len(), 5);
        assert_eq!(job.compiler_repairs, 4);
        assert_eq!(
            job.last_directive.as_ref().unwrap().reason,
            "selector-not-found"
        );
    }

    #[tokio::test]
    async fn test_persistent_adapter_error_exhausts_pool_then_parks() {
        // Every fetch candidate fails and gets excluded; once the pool is
        // empty twice in a row the job asks for clarification
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(StaticAdapter::err(StepFailure::adapter(
                "connection-reset",
                "peer hung up",
            ))),
        );
        registry.register("parse-p", Arc::new(StaticAdapter::ok(good_records())));

        let h = harness(registry, SupervisorConfig::default());
        let job_id = h.supervisor.submit(goal()).await.unwrap();

        let job = h.supervisor.job(&job_id).unwrap().unwrap();
        assert_eq!(job.state, JobState::AwaitingClarification);
        assert_eq!(job.no_tool_streak, 2);
        assert_eq!(
            job.last_directive.as_ref().unwrap().reason,
            "no-compatible-tool"
        );
    }

    #[tokio::test]
    async fn test_timeout_escalates_engine_once() {
        // render-r times out once, then succeeds under the doubled deadline
        struct TimeoutOnce {
            calls: AtomicU32,
        }

        #[async_trait]
        impl ToolAdapter for TimeoutOnce {
            async fn invoke(
                &self,
                _input: Option<Artifact>,
                config: &BTreeMap<String, serde_json::Value>,
                _cancel: CancelFlag,
            ) -> std::result::Result<Artifact, StepFailure> {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                // The compiled render step carries a 60s deadline; simulate a
                // slow fetch by sleeping only on the first call
                if call == 0 {
                    let timeout = config.get("timeout_ms").and_then(|v| v.as_u64()).unwrap_or(0);
                    assert!(timeout > 0);
                    return Err(StepFailure::timeout());
                }
                Ok(Artifact::RenderedDocument("<html/>".into()))
            }
        }

        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(TimeoutOnce {
                calls: AtomicU32::new(0),
            }),
        );
        registry.register("parse-p", Arc::new(StaticAdapter::ok(good_records())));

        let h = harness(registry, SupervisorConfig::default());
        let job_id = h.supervisor.submit(goal()).await.unwrap();

        let job = h.supervisor.job(&job_id).unwrap().unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.engine_repairs, 1);
        // Plan was not recompiled for the engine repair
        assert_eq!(job.plan.as_ref().unwrap().attempt, 1);
        assert_eq!(job.attempt, 2);
    }

    #[tokio::test]
    async fn test_fatal_failure_parks_for_clarification() {
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(StaticAdapter::err(StepFailure::fatal("dns-failure", "NXDOMAIN"))),
        );
        registry.register("parse-p", Arc::new(StaticAdapter::ok(good_records())));

        let h = harness(registry, SupervisorConfig::default());
        let job_id = h.supervisor.submit(goal()).await.unwrap();

        let job = h.supervisor.job(&job_id).unwrap().unwrap();
        assert_eq!(job.state, JobState::AwaitingClarification);
        assert_eq!(
            job.last_directive.as_ref().unwrap().target,
            RepairTarget::GoalClarification
        );
    }

    #[tokio::test]
    async fn test_clarify_resumes_with_new_goal_version() {
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(FlakyAdapter::new(
                vec![StepFailure::fatal("dns-failure", "NXDOMAIN")],
                Artifact::RenderedDocument("<html/>".into()),
            )),
        );
        registry.register("parse-p", Arc::new(StaticAdapter::ok(good_records())));

        let h = harness(registry, SupervisorConfig::default());
        let job_id = h.supervisor.submit(goal()).await.unwrap();
        assert_eq!(
            h.supervisor.job(&job_id).unwrap().unwrap().state,
            JobState::AwaitingClarification
        );

        let parked = h.supervisor.job(&job_id).unwrap().unwrap();
        let stale_goal_id = parked.goal.goal_id.clone();
        let mut revised = parked.goal.revise();
        revised.targets = vec!["https://example.org/products".to_string()];

        h.supervisor.clarify(&job_id, revised).await.unwrap();

        let job = h.supervisor.job(&job_id).unwrap().unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        // The resumed plan compiled from the new goal version, not the stale one
        assert_ne!(job.plan.as_ref().unwrap().goal_id, stale_goal_id);
        assert_eq!(job.plan.as_ref().unwrap().goal_id, job.goal.goal_id);
        assert_eq!(job.goal_history.len(), 1);
    }

    #[tokio::test]
    async fn test_clarify_rejects_unrelated_goal() {
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(StaticAdapter::err(StepFailure::fatal("dns-failure", "NXDOMAIN"))),
        );
        registry.register("parse-p", Arc::new(StaticAdapter::ok(good_records())));

        let h = harness(registry, SupervisorConfig::default());
        let job_id = h.supervisor.submit(goal()).await.unwrap();

        // Not derived from the parked goal
        let unrelated = goal();
        let err = h.supervisor.clarify(&job_id, unrelated).await.unwrap_err();
        assert!(matches!(err, WeavrError::Goal(_)));
    }

    #[tokio::test]
    async fn test_clarify_rejects_running_job() {
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(StaticAdapter::ok(Artifact::RenderedDocument("<html/>".into()))),
        );
        registry.register("parse-p", Arc::new(StaticAdapter::ok(good_records())));

        let h = harness(registry, SupervisorConfig::default());
        let job_id = h.supervisor.submit(goal()).await.unwrap();

        let job = h.supervisor.job(&job_id).unwrap().unwrap();
        let revised = job.goal.revise();
        let err = h.supervisor.clarify(&job_id, revised).await.unwrap_err();
        assert!(matches!(err, WeavrError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_missing_field_retries_extraction() {
        // First parse output lacks "title"; fallback selectors find it
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(StaticAdapter::ok(Artifact::RenderedDocument("<html/>".into()))),
        );
        struct SelectorSensitive;

        #[async_trait]
        impl ToolAdapter for SelectorSensitive {
            async fn invoke(
                &self,
                _input: Option<Artifact>,
                config: &BTreeMap<String, serde_json::Value>,
                _cancel: CancelFlag,
            ) -> std::result::Result<Artifact, StepFailure> {
                if config.get("selector_set").map(|v| v == &json!("fallback")).unwrap_or(false) {
                    Ok(Artifact::Records(vec![
                        json!({"price": "9.99", "title": "Widget"}),
                    ]))
                } else {
                    Ok(Artifact::Records(vec![json!({"price": "9.99"})]))
                }
            }
        }
        registry.register("parse-p", Arc::new(SelectorSensitive));

        let h = harness(registry, SupervisorConfig::default());
        let job_id = h.supervisor.submit(goal()).await.unwrap();

        let job = h.supervisor.job(&job_id).unwrap().unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.attempt, 2);
    }

    #[tokio::test]
    async fn test_events_form_coherent_chain() {
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(StaticAdapter::ok(Artifact::RenderedDocument("<html/>".into()))),
        );
        registry.register("parse-p", Arc::new(StaticAdapter::ok(good_records())));

        let h = harness(registry, SupervisorConfig::default());
        let job_id = h.supervisor.submit(goal()).await.unwrap();

        let events = h.events.events();
        assert!(!events.is_empty());
        // Consecutive events chain from->to
        for pair in events.windows(2) {
            assert_eq!(pair[0].to_state, pair[1].from_state);
        }
        assert_eq!(events.first().unwrap().from_state, JobState::Compiling);
        assert_eq!(events.last().unwrap().to_state, JobState::Succeeded);
        assert!(events.iter().all(|e| e.job_id == job_id));
    }

    #[tokio::test]
    async fn test_success_recorded_in_history() {
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(StaticAdapter::ok(Artifact::RenderedDocument("<html/>".into()))),
        );
        registry.register("parse-p", Arc::new(StaticAdapter::ok(good_records())));

        let events = Arc::new(MemoryEventSink::new());
        let history = Arc::new(MemoryHistoryStore::new());
        let supervisor = Supervisor::new(
            Arc::new(catalog()),
            Arc::new(crate::config::MapConfig::new()),
            Arc::new(registry),
            Arc::new(MemoryJobStore::new()),
            history.clone(),
            events,
            SupervisorConfig::default(),
        );

        supervisor.submit(goal()).await.unwrap();
        let entry = history.find_similar(&goal()).unwrap().unwrap();
        assert_eq!(entry.plan.tool_names(), vec!["render-r", "parse-p"]);
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_goal() {
        let registry = AdapterRegistry::new();
        let h = harness(registry, SupervisorConfig::default());

        let no_fields = GoalSpec::new(vec!["https://example.com".to_string()], vec![]);
        assert!(matches!(
            h.supervisor.submit(no_fields).await.unwrap_err(),
            WeavrError::Goal(_)
        ));

        let no_targets = GoalSpec::new(vec![], vec![FieldSpec::new("price")]);
        assert!(matches!(
            h.supervisor.submit(no_targets).await.unwrap_err(),
            WeavrError::Goal(_)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_jobs_are_independent() {
        let mut registry = AdapterRegistry::new();
        registry.register(
            "render-r",
            Arc::new(StaticAdapter::ok(Artifact::RenderedDocument("<html/>".into()))),
        );
        registry.register("parse-p", Arc::new(StaticAdapter::ok(good_records())));

        let events = Arc::new(MemoryEventSink::new());
        let supervisor = Arc::new(Supervisor::new(
            Arc::new(catalog()),
            Arc::new(crate::config::MapConfig::new()),
            Arc::new(registry),
            Arc::new(MemoryJobStore::new()),
            Arc::new(MemoryHistoryStore::new()),
            events,
            SupervisorConfig::default(),
        ));

        let a = {
            let s = supervisor.clone();
            tokio::spawn(async move { s.submit(goal()).await })
        };
        let b = {
            let s = supervisor.clone();
            tokio::spawn(async move { s.submit(goal()).await })
        };

        let id_a = a.await.unwrap().unwrap();
        let id_b = b.await.unwrap().unwrap();
        assert_ne!(id_a, id_b);
        assert_eq!(
            supervisor.job(&id_a).unwrap().unwrap().state,
            JobState::Succeeded
        );
        assert_eq!(
            supervisor.job(&id_b).unwrap().unwrap().state,
            JobState::Succeeded
        );
    }
}
