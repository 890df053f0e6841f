//! Per-run state shared by every participant of a chain invocation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::UserConfig;
use crate::record::RecordDict;

/// State visible to every mod and the terminal handler.
///
/// A chain receives the context as `&mut Context`, so one invocation has
/// exclusive access for its whole duration. Writes made on the way in are
/// visible to inner participants, and writes made by inner participants are
/// visible to outer mods on the way back out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub run_id: u64,
    pub node_id: u64,
    pub node_config: UserConfig,
    pub run_config: UserConfig,
    /// Records that outlive a single message within the run.
    pub state: RecordDict,
}

impl Context {
    pub fn new(run_id: u64, node_id: u64) -> Self {
        Self { run_id, node_id, ..Self::default() }
    }
}

/// Contexts partitioned by run id.
///
/// Each run gets its own [`Context`], created on first use. Locking a run
/// serialises its invocations; the chain itself never locks anything.
#[derive(Debug, Clone)]
pub struct ContextStore {
    node_id: u64,
    node_config: UserConfig,
    runs: Arc<Mutex<HashMap<u64, Arc<Mutex<Context>>>>>,
}

impl ContextStore {
    pub fn new(node_id: u64, node_config: UserConfig) -> Self {
        Self { node_id, node_config, runs: Arc::default() }
    }

    /// Returns the context cell of `run_id`, creating it if needed.
    pub fn run(&self, run_id: u64) -> Arc<Mutex<Context>> {
        let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(runs.entry(run_id).or_insert_with(|| {
            let mut ctx = Context::new(run_id, self.node_id);
            ctx.node_config = self.node_config.clone();
            Arc::new(Mutex::new(ctx))
        }))
    }

    /// Locks a run's context. A poisoned lock is recovered: the context is
    /// plain data and stays usable after a panicking handler.
    pub fn lock(cell: &Mutex<Context>) -> MutexGuard<'_, Context> {
        cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops the context of a finished run.
    pub fn remove(&self, run_id: u64) -> Option<Context> {
        let cell = self.runs.lock().unwrap_or_else(PoisonError::into_inner).remove(&run_id)?;
        Some(Self::lock(&cell).clone())
    }

    pub fn len(&self) -> usize {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
