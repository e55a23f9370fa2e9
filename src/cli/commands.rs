//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - submit: submit a goal file and run the job to completion
//! - status: get job status
//! - list: list all jobs
//! - clarify: resume a parked job with a revised goal
//! - catalog: browse the tool catalog

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use serde::Deserialize;

use weavr::domain::goal::{FieldSpec, GoalSpec};

/// Weavr - adaptive pipeline orchestration for data retrieval goals
#[derive(Parser, Debug)]
#[command(name = "weavr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a goal and run the job to completion
    Submit {
        /// Path to the goal file (JSON)
        #[arg(short, long)]
        goal: PathBuf,

        /// Tool catalog file (overrides the configured one)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Get status of a specific job
    Status {
        /// Job ID to check
        id: String,

        /// Show the full run history
        #[arg(short, long)]
        detailed: bool,

        /// Print the job record as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all jobs
    List {
        /// Filter by state (compiling, executing, evaluating, repairing,
        /// awaiting-clarification, succeeded, failed)
        #[arg(short, long)]
        state: Option<String>,
    },

    /// Resume a parked job with a revised goal
    Clarify {
        /// Job ID to resume
        id: String,

        /// Path to the revised goal file (JSON); fields present override
        /// the parked goal, lineage is handled automatically
        #[arg(short, long)]
        goal: PathBuf,

        /// Tool catalog file (overrides the configured one)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Browse the tool catalog
    Catalog {
        /// Show only tools advertising this capability
        #[arg(long)]
        capability: Option<String>,

        /// Tool catalog file (overrides the configured one)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

/// One requested field in a goal file: either a bare name or name plus
/// description
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        description: String,
    },
}

impl FieldEntry {
    fn into_field(self) -> FieldSpec {
        match self {
            FieldEntry::Name(name) => FieldSpec::new(name),
            FieldEntry::Full { name, description } => {
                let mut field = FieldSpec::new(name);
                field.description = description;
                field
            }
        }
    }
}

/// On-disk goal representation; ids and lineage are never user-supplied
#[derive(Debug, Deserialize, Default)]
pub struct GoalFile {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub constraints: BTreeMap<String, serde_json::Value>,
}

impl GoalFile {
    pub fn load(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read goal file {}", path.display()))?;
        serde_json::from_str(&content)
            .context(format!("Failed to parse goal file {}", path.display()))
    }

    /// Build a fresh goal from this file
    pub fn into_goal(self) -> GoalSpec {
        let mut goal = GoalSpec::new(
            self.targets,
            self.fields.into_iter().map(FieldEntry::into_field).collect(),
        )
        .with_query(self.query);
        goal.requirements = self.requirements;
        goal.constraints = self.constraints;
        goal
    }

    /// Build a revision of an existing goal: present fields override, absent
    /// ones carry over from the parked version
    pub fn revise(self, base: &GoalSpec) -> GoalSpec {
        let mut revised = base.revise();
        if !self.query.is_empty() {
            revised.query = self.query;
        }
        if !self.targets.is_empty() {
            revised.targets = self.targets;
        }
        if !self.fields.is_empty() {
            revised.fields = self.fields.into_iter().map(FieldEntry::into_field).collect();
        }
        if !self.requirements.is_empty() {
            revised.requirements = self.requirements;
        }
        if !self.constraints.is_empty() {
            revised.constraints = self.constraints;
        }
        revised
    }
}
