//! Plan compiler
//!
//! Turns a goal plus the tool catalog into an ordered execution plan, or
//! fails with a diagnosable reason. Selection is greedy with a fixed
//! precedence (prior choice > hinted replacement > catalog priority) and is
//! fully deterministic: identical goal, catalog and hints always produce the
//! same steps or the same error.
//!
//! After each pick the remaining candidate pools are pruned by the chosen
//! tool's incompatibility set, closed symmetrically and transitively to a
//! fixed point, so a returned plan never contains two pairwise-incompatible
//! steps. Every step's required config keys are confirmed present before the
//! plan is returned; absence is a compile failure, not a runtime one.

pub mod selectors;

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::catalog::ToolCatalog;
use crate::config::ConfigStore;
use crate::domain::descriptor::{ToolCategory, ToolDescriptor};
use crate::domain::goal::GoalSpec;
use crate::domain::plan::{Plan, Step, StepRole};
use crate::domain::repair::RepairHint;

/// Capability tag marking a goal as needing a browser renderer
pub const RENDERING_TAG: &str = "javascript_rendering";
/// Capability tag for anti-bot services
pub const ANTI_BLOCK_TAG: &str = "anti_block";

/// Default per-step timeout for plain fetches
const FETCH_TIMEOUT_MS: u64 = 30_000;
/// Default per-step timeout when rendering is involved
const RENDER_TIMEOUT_MS: u64 = 60_000;

/// Why compilation failed; data, not an exception
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CompileError {
    /// A required role has no eligible tool left after pruning
    #[error("no-compatible-tool for role {role}")]
    NoCompatibleTool { role: StepRole },

    /// A planned tool requires a config key the store does not hold
    #[error("missing-config key {key}")]
    MissingConfig { key: String },
}

/// Compile a goal into a plan
///
/// `hints` carry repair guidance from a prior failed attempt: tools to
/// exclude, capabilities to add, steps to replace, tools to prefer (prior
/// choices or history reuse).
pub fn compile(
    goal: &GoalSpec,
    catalog: &ToolCatalog,
    config: &dyn ConfigStore,
    hints: &[RepairHint],
    attempt: u32,
) -> Result<Plan, CompileError> {
    let roles = required_roles(goal, hints);
    debug!("compiling goal {} with roles {:?}", goal.goal_id, roles);

    let excluded = excluded_tools(hints);
    let preferred = preferred_tools(hints);
    let replace_parse = hints.iter().any(|h| {
        matches!(h, RepairHint::ReplaceStep { role, .. } if *role == StepRole::Parse)
    });

    // Initial pool per role, pruned of excluded tools and narrowed by
    // requirement tags that members of the pool advertise
    let mut pools: Vec<(StepRole, Vec<ToolDescriptor>)> = Vec::new();
    for role in &roles {
        let mut pool: Vec<ToolDescriptor> = candidates(goal, catalog, *role)
            .into_iter()
            .filter(|t| !excluded.contains(&t.name.as_str()))
            .cloned()
            .collect();
        narrow_by_requirements(goal, &mut pool);
        pools.push((*role, pool));
    }

    // Greedy pick in pipeline order, pruning after each choice
    let mut chosen: Vec<(StepRole, ToolDescriptor)> = Vec::new();
    for i in 0..pools.len() {
        let (role, pool) = &pools[i];
        let role = *role;
        let pick = select(pool, &preferred).ok_or(CompileError::NoCompatibleTool { role })?;
        debug!("role {} -> {}", role, pick.name);
        chosen.push((role, pick.clone()));

        for (_, other_pool) in pools.iter_mut().skip(i + 1) {
            prune_incompatible(other_pool, &chosen);
        }
        close_compatibility(&mut pools[i + 1..], &chosen);
    }

    // Config validation happens before the plan exists, never after
    for (_, tool) in &chosen {
        for key in &tool.required_config {
            if !config.has(key) {
                return Err(CompileError::MissingConfig { key: key.clone() });
            }
        }
    }

    let steps = chosen
        .into_iter()
        .map(|(role, tool)| build_step(goal, role, &tool, replace_parse))
        .collect();

    Ok(Plan::new(goal.goal_id.clone(), attempt, steps))
}

/// Roles this goal needs, in pipeline order
fn required_roles(goal: &GoalSpec, hints: &[RepairHint]) -> Vec<StepRole> {
    let mut roles = Vec::new();
    let anti_block = goal.requires(ANTI_BLOCK_TAG)
        || hints.iter().any(|h| {
            matches!(h, RepairHint::RequireCapability { tag } if tag == ANTI_BLOCK_TAG)
        });
    if anti_block {
        roles.push(StepRole::AntiBlock);
    }
    roles.push(StepRole::Fetch);
    roles.push(StepRole::Parse);
    if !goal.constraints.is_empty() {
        roles.push(StepRole::PostProcess);
    }
    roles
}

/// Category-based candidate pool for a role
fn candidates<'a>(
    goal: &GoalSpec,
    catalog: &'a ToolCatalog,
    role: StepRole,
) -> Vec<&'a ToolDescriptor> {
    match role {
        StepRole::Fetch => {
            if goal.requires(RENDERING_TAG) {
                catalog.by_category(ToolCategory::Renderer)
            } else {
                catalog.by_category(ToolCategory::Fetcher)
            }
        }
        StepRole::AntiBlock => catalog.by_category(ToolCategory::AntiBlock),
        StepRole::Parse => catalog.by_category(ToolCategory::Parser),
        StepRole::PostProcess => catalog.by_category(ToolCategory::PostProcessor),
    }
}

/// Restrict a pool by each goal requirement that at least one pool member
/// advertises ("needs pagination" keeps only pagination-capable fetchers,
/// while leaving pools the tag is foreign to untouched)
fn narrow_by_requirements(goal: &GoalSpec, pool: &mut Vec<ToolDescriptor>) {
    for tag in &goal.requirements {
        if pool.iter().any(|t| t.has_capability(tag)) {
            pool.retain(|t| t.has_capability(tag));
        }
    }
}

fn excluded_tools(hints: &[RepairHint]) -> Vec<&str> {
    hints
        .iter()
        .filter_map(|h| match h {
            RepairHint::ExcludeTool { name } => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

fn preferred_tools(hints: &[RepairHint]) -> Vec<&str> {
    hints
        .iter()
        .filter_map(|h| match h {
            RepairHint::PreferTool { name } => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

/// Pick one tool from a pool: preferred (prior choice / history) first,
/// otherwise the pool's deterministic head (priority, then name)
fn select<'a>(pool: &'a [ToolDescriptor], preferred: &[&str]) -> Option<&'a ToolDescriptor> {
    for name in preferred {
        if let Some(tool) = pool.iter().find(|t| &t.name == name) {
            return Some(tool);
        }
    }
    pool.iter()
        .min_by(|a, b| a.priority.cmp(&b.priority).then(a.name.cmp(&b.name)))
}

/// Remove pool members that conflict with any chosen tool, in either
/// declaration direction (exclusion is treated as symmetric)
fn prune_incompatible(pool: &mut Vec<ToolDescriptor>, chosen: &[(StepRole, ToolDescriptor)]) {
    pool.retain(|candidate| {
        !chosen
            .iter()
            .any(|(_, c)| c.excludes(candidate) || candidate.excludes(c))
    });
}

/// Transitive closure over declared compatibilities: a candidate whose
/// compatibility list no longer covers any eligible or chosen tool becomes
/// ineligible itself; repeat until a fixed point
fn close_compatibility(
    pools: &mut [(StepRole, Vec<ToolDescriptor>)],
    chosen: &[(StepRole, ToolDescriptor)],
) {
    loop {
        // Universe of still-reachable descriptors
        let universe: Vec<ToolDescriptor> = chosen
            .iter()
            .map(|(_, t)| t.clone())
            .chain(pools.iter().flat_map(|(_, p)| p.iter().cloned()))
            .collect();

        let mut removed = false;
        for (_, pool) in pools.iter_mut() {
            pool.retain(|candidate| {
                if candidate.compatibilities.is_empty() {
                    return true;
                }
                let ok = universe
                    .iter()
                    .filter(|d| d.name != candidate.name)
                    .any(|d| candidate.declares_compatible_with(d));
                if !ok {
                    removed = true;
                }
                ok
            });
        }

        if !removed {
            break;
        }
    }
}

/// Materialize a step with its role-specific default configuration
fn build_step(goal: &GoalSpec, role: StepRole, tool: &ToolDescriptor, replace_parse: bool) -> Step {
    let mut config: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    match role {
        StepRole::Fetch => {
            if goal.requires(RENDERING_TAG) {
                config.insert("wait_until".to_string(), json!("networkidle"));
                config.insert("headless".to_string(), json!(true));
                config.insert("timeout_ms".to_string(), json!(RENDER_TIMEOUT_MS));
            } else {
                config.insert("timeout_ms".to_string(), json!(FETCH_TIMEOUT_MS));
            }
            config.insert("targets".to_string(), json!(goal.targets));
        }
        StepRole::AntiBlock => {
            config.insert("targets".to_string(), json!(goal.targets));
            config.insert("timeout_ms".to_string(), json!(FETCH_TIMEOUT_MS));
        }
        StepRole::Parse => {
            config.insert(
                "selectors".to_string(),
                selectors::selectors_for(goal, replace_parse),
            );
            if replace_parse {
                config.insert("selector_set".to_string(), json!("fallback"));
            }
        }
        StepRole::PostProcess => {
            config.insert(
                "constraints".to_string(),
                serde_json::to_value(&goal.constraints).unwrap_or(json!({})),
            );
        }
    }
    Step {
        tool: tool.name.clone(),
        role,
        config,
    }
}
