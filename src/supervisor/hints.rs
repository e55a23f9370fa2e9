//! Hint assembly for recompilation
//!
//! Before each compile the supervisor folds three sources into one hint
//! list, in precedence order: the prior plan's tool choices (kept unless the
//! directive replaces or excludes them), the evaluator's directive hints,
//! and finally plans that previously succeeded on similar goals. The
//! compiler's preference walk honors list order, so earlier wins.

use log::debug;

use crate::domain::job::Job;
use crate::domain::repair::{RepairHint, RepairTarget};
use crate::storage::HistoryStore;

/// Assemble the hint list for a job's next compile
pub fn build(job: &Job, history: &dyn HistoryStore) -> Vec<RepairHint> {
    let mut hints: Vec<RepairHint> = Vec::new();

    let directive = job
        .last_directive
        .as_ref()
        .filter(|d| d.target == RepairTarget::Compiler);

    // Prior choices carry over for roles the directive leaves alone
    if let (Some(plan), Some(d)) = (&job.plan, directive) {
        let excluded = d.excluded_tools();
        let replaced: Vec<_> = d
            .hints
            .iter()
            .filter_map(|h| match h {
                RepairHint::ReplaceStep { role, .. } => Some(*role),
                _ => None,
            })
            .collect();
        for step in &plan.steps {
            if excluded.contains(&step.tool.as_str()) || replaced.contains(&step.role) {
                continue;
            }
            hints.push(RepairHint::PreferTool {
                name: step.tool.clone(),
            });
        }
    }

    if let Some(d) = directive {
        hints.extend(d.hints.iter().cloned());
    }

    // History reuse only kicks in on repeated compilation, and only as a
    // preference, never a requirement
    if job.attempt >= 2 {
        match history.find_similar(&job.goal) {
            Ok(Some(entry)) => {
                debug!(
                    "job {} reusing plan {} from history",
                    job.job_id, entry.plan.plan_id
                );
                let excluded: Vec<&str> = directive.map(|d| d.excluded_tools()).unwrap_or_default();
                for tool in entry.plan.tool_names() {
                    if excluded.contains(&tool) {
                        continue;
                    }
                    if !hints.iter().any(
                        |h| matches!(h, RepairHint::PreferTool { name } if name.as_str() == tool),
                    ) {
                        hints.push(RepairHint::PreferTool {
                            name: tool.to_string(),
                        });
                    }
                }
            }
            Ok(None) => {}
            Err(e) => debug!("job {} history lookup failed: {}", job.job_id, e),
        }
    }

    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::goal::{FieldSpec, GoalSpec};
    use crate::domain::plan::{Plan, Step, StepRole};
    use crate::domain::repair::RepairDirective;
    use crate::domain::run::RunRecord;
    use crate::storage::{HistoryEntry, MemoryHistoryStore};

    fn goal() -> GoalSpec {
        GoalSpec::new(
            vec!["https://example.com/items".to_string()],
            vec![FieldSpec::new("price")],
        )
    }

    fn job_with_plan_and_directive(directive: RepairDirective) -> Job {
        let mut job = Job::new(goal());
        job.attempt = 1;
        job.plan = Some(Plan::new(
            job.goal.goal_id.clone(),
            1,
            vec![
                Step::new("requests", StepRole::Fetch),
                Step::new("soup", StepRole::Parse),
            ],
        ));
        job.last_directive = Some(directive);
        job
    }

    #[test]
    fn test_fresh_job_yields_no_hints() {
        let job = Job::new(goal());
        let history = MemoryHistoryStore::new();
        assert!(build(&job, &history).is_empty());
    }

    #[test]
    fn test_prior_choices_survive_unless_replaced() {
        let directive = RepairDirective::new(RepairTarget::Compiler, "selector-not-found")
            .with_hint(RepairHint::ReplaceStep {
                role: StepRole::Parse,
                reason: "selector-not-found".to_string(),
            });
        let job = job_with_plan_and_directive(directive);
        let history = MemoryHistoryStore::new();

        let hints = build(&job, &history);
        // The fetcher is preferred; the replaced parser is not
        assert!(hints.iter().any(
            |h| matches!(h, RepairHint::PreferTool { name } if name == "requests")
        ));
        assert!(!hints.iter().any(
            |h| matches!(h, RepairHint::PreferTool { name } if name == "soup")
        ));
        // The directive's own hints ride along
        assert!(hints.iter().any(|h| matches!(h, RepairHint::ReplaceStep { .. })));
    }

    #[test]
    fn test_excluded_tool_not_preferred() {
        let directive = RepairDirective::new(RepairTarget::Compiler, "adapter-error")
            .with_hint(RepairHint::ExcludeTool {
                name: "requests".to_string(),
            });
        let job = job_with_plan_and_directive(directive);
        let history = MemoryHistoryStore::new();

        let hints = build(&job, &history);
        assert!(!hints.iter().any(
            |h| matches!(h, RepairHint::PreferTool { name } if name == "requests")
        ));
        assert!(hints.iter().any(
            |h| matches!(h, RepairHint::PreferTool { name } if name == "soup")
        ));
    }

    #[test]
    fn test_engine_directive_contributes_nothing() {
        let directive = RepairDirective::new(RepairTarget::Engine, "timeout")
            .with_hint(RepairHint::ExtendTimeout { factor: 2 });
        let job = job_with_plan_and_directive(directive);
        let history = MemoryHistoryStore::new();
        assert!(build(&job, &history).is_empty());
    }

    #[test]
    fn test_history_preferred_on_repeat_compile() {
        let history = MemoryHistoryStore::new();
        let archived = goal();
        let plan = Plan::new(
            archived.goal_id.clone(),
            1,
            vec![Step::new("playwright", StepRole::Fetch)],
        );
        let run = RunRecord::new(plan.plan_id.clone(), 1, 0);
        history
            .record(&HistoryEntry {
                goal: archived,
                plan,
                run,
            })
            .unwrap();

        let mut job = Job::new(goal());
        job.attempt = 2;
        let hints = build(&job, &history);
        assert!(hints.iter().any(
            |h| matches!(h, RepairHint::PreferTool { name } if name == "playwright")
        ));

        // First compile ignores history
        job.attempt = 1;
        assert!(build(&job, &history).is_empty());
    }

    #[test]
    fn test_history_does_not_duplicate_prior_choice() {
        let history = MemoryHistoryStore::new();
        let archived = goal();
        let plan = Plan::new(
            archived.goal_id.clone(),
            1,
            vec![Step::new("requests", StepRole::Fetch)],
        );
        let run = RunRecord::new(plan.plan_id.clone(), 1, 0);
        history
            .record(&HistoryEntry {
                goal: archived,
                plan,
                run,
            })
            .unwrap();

        let directive = RepairDirective::new(RepairTarget::Compiler, "missing-field");
        let mut job = job_with_plan_and_directive(directive);
        job.attempt = 2;

        let hints = build(&job, &history);
        let requests_prefs = hints
            .iter()
            .filter(|h| matches!(h, RepairHint::PreferTool { name } if name == "requests"))
            .count();
        assert_eq!(requests_prefs, 1);
    }
}
