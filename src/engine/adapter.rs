//! Adapter boundary
//!
//! Tool adapters are opaque units behind a uniform contract: one artifact
//! in, one artifact out, structured failures as data. The registry maps
//! descriptor names to adapter instances; cancellation is cooperative via a
//! watch-based flag the adapter may poll or await.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::run::{Artifact, StepFailure};

/// Cooperative cancellation flag handed to adapters
#[derive(Debug, Clone)]
pub struct CancelFlag {
    rx: watch::Receiver<bool>,
}

impl CancelFlag {
    /// True once the owning handle has cancelled
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve when cancellation fires; never resolves if it never does
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without cancelling: stay pending
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Owning side of a cancellation flag
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> (CancelHandle, CancelFlag) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelFlag { rx })
    }

    /// Trip the flag; all clones observe it
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Uniform adapter contract
///
/// `input` is the previous step's artifact (None for the first step);
/// `config` is the step's compiled configuration. Errors are returned as
/// structured `StepFailure` data, never panics.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    async fn invoke(
        &self,
        input: Option<Artifact>,
        config: &BTreeMap<String, serde_json::Value>,
        cancel: CancelFlag,
    ) -> Result<Artifact, StepFailure>;
}

/// Registry mapping tool descriptor names to adapter instances
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ToolAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, adapter: Arc<dyn ToolAdapter>) {
        self.adapters.insert(name.into(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }
}

/// Adapter that returns a fixed outcome, for demos and tests
pub struct StaticAdapter {
    outcome: Result<Artifact, StepFailure>,
}

impl StaticAdapter {
    pub fn ok(artifact: Artifact) -> Self {
        Self {
            outcome: Ok(artifact),
        }
    }

    pub fn err(failure: StepFailure) -> Self {
        Self {
            outcome: Err(failure),
        }
    }
}

#[async_trait]
impl ToolAdapter for StaticAdapter {
    async fn invoke(
        &self,
        _input: Option<Artifact>,
        _config: &BTreeMap<String, serde_json::Value>,
        _cancel: CancelFlag,
    ) -> Result<Artifact, StepFailure> {
        self.outcome.clone()
    }
}
