//! Agent Registry
//!
//! Explicit service object holding the configured agents. Readers take an
//! immutable snapshot; every change notifies subscribers with the new one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::models::agent::AgentDefinition;

pub type SubscriptionId = u64;

/// Callback receiving the registry snapshot after each change.
pub type RegistryListener = Arc<dyn Fn(Arc<[AgentDefinition]>) + Send + Sync>;

pub struct AgentRegistry {
    agents: RwLock<Arc<[AgentDefinition]>>,
    listeners: Mutex<HashMap<SubscriptionId, RegistryListener>>,
    next_id: AtomicU64,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.snapshot().len())
            .finish()
    }
}

impl AgentRegistry {
    pub fn new(agents: Vec<AgentDefinition>) -> Self {
        Self {
            agents: RwLock::new(agents.into()),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Immutable view of the current agents.
    pub fn snapshot(&self) -> Arc<[AgentDefinition]> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<AgentDefinition> {
        self.snapshot().iter().find(|a| a.id == id).cloned()
    }

    /// Replace every agent.
    pub fn replace(&self, agents: Vec<AgentDefinition>) {
        self.update(|_| agents);
    }

    /// Insert an agent, or replace the one with the same id in place.
    pub fn upsert(&self, agent: AgentDefinition) {
        self.update(|current| {
            let mut next = current.to_vec();
            match next.iter_mut().find(|a| a.id == agent.id) {
                Some(existing) => *existing = agent,
                None => next.push(agent),
            }
            next
        });
    }

    /// Remove an agent by id. Returns false when no agent matched.
    pub fn remove(&self, id: &str) -> bool {
        if !self.snapshot().iter().any(|a| a.id == id) {
            return false;
        }
        self.update(|current| current.iter().filter(|a| a.id != id).cloned().collect());
        true
    }

    pub fn subscribe(&self, listener: RegistryListener) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, listener);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some()
    }

    fn update<F>(&self, change: F)
    where
        F: FnOnce(&[AgentDefinition]) -> Vec<AgentDefinition>,
    {
        let snapshot: Arc<[AgentDefinition]> = {
            let mut agents = self.agents.write().unwrap_or_else(|e| e.into_inner());
            let next: Arc<[AgentDefinition]> = change(&agents).into();
            *agents = next.clone();
            next
        };

        // Listeners run outside both locks so they may read the registry.
        let listeners: Vec<RegistryListener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        tracing::debug!(
            agents = snapshot.len(),
            listeners = listeners.len(),
            "agent registry updated"
        );
        for listener in listeners {
            listener(snapshot.clone());
        }
    }
}
