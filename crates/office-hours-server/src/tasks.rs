//! Named, cancellable background tasks.
//!
//! [`TaskRegistry`] keeps at most one tokio task per key. Scheduling a key
//! that already has a task aborts the old one. Every task gets a generation
//! number so a task that finished just before it was replaced or cancelled
//! can be told apart from the current one: its completion report no longer
//! matches and is discarded with [`TaskRegistry::complete`].

use std::{collections::BTreeMap, fmt::Display, future::Future};

use tokio::task::JoinHandle;

struct Entry {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Keyed registry of spawned tasks.
pub struct TaskRegistry<K> {
    tasks: BTreeMap<K, Entry>,
    next_generation: u64,
}

impl<K> Default for TaskRegistry<K> {
    fn default() -> Self {
        Self { tasks: BTreeMap::new(), next_generation: 0 }
    }
}

impl<K> std::fmt::Debug for TaskRegistry<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.tasks.len())
            .field("next_generation", &self.next_generation)
            .finish()
    }
}

impl<K: Ord + Clone + Display> TaskRegistry<K> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the task built by `task` under `key`, aborting any task already
    /// registered there.
    ///
    /// `task` receives the generation assigned to the new task. Must be
    /// called from within a tokio runtime.
    pub fn schedule<F, Fut>(&mut self, key: K, task: F) -> u64
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation;
        self.next_generation += 1;

        let handle = tokio::spawn(task(generation));
        if let Some(old) = self.tasks.insert(key.clone(), Entry { generation, handle }) {
            old.handle.abort();
            tracing::trace!(%key, "replaced scheduled task");
        }
        generation
    }

    /// Abort and forget the task under `key`. Returns whether one existed.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.tasks.remove(key) {
            Some(entry) => {
                entry.handle.abort();
                true
            },
            None => false,
        }
    }

    /// Record that the task `generation` under `key` has done its work.
    ///
    /// Returns `false` (and leaves the registry untouched) if that task has
    /// since been replaced or cancelled.
    pub fn complete(&mut self, key: &K, generation: u64) -> bool {
        match self.tasks.get(key) {
            Some(entry) if entry.generation == generation => {
                self.tasks.remove(key);
                true
            },
            _ => false,
        }
    }

    /// Whether a task is registered under `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.tasks.contains_key(key)
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks are registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Abort every task and wait for all of them to stop.
    pub async fn shutdown(&mut self) {
        let tasks = std::mem::take(&mut self.tasks);
        for entry in tasks.values() {
            entry.handle.abort();
        }
        for (key, entry) in tasks {
            match entry.handle.await {
                Ok(()) => {},
                Err(e) if e.is_cancelled() => {},
                Err(e) => tracing::warn!(%key, "task failed during shutdown: {e}"),
            }
        }
    }
}
