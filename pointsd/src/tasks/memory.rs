use crate::{
    db::errors::Result,
    tasks::{TaskState, TaskStore},
    types::TaskId,
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

/// Process-local task store for tests
#[derive(Clone)]
pub struct MemoryTaskStore {
    entries: Arc<Mutex<HashMap<TaskId, (TaskState, Instant)>>>,
    ttl: Duration,
}

impl MemoryTaskStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::default(),
            ttl,
        }
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn get(&self, task_id: TaskId) -> Result<Option<TaskState>> {
        let entries = self.entries.lock().expect("task store poisoned");
        Ok(entries
            .get(&task_id)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(state, _)| state.clone()))
    }

    async fn set(&self, task_id: TaskId, state: &TaskState) -> Result<()> {
        let mut entries = self.entries.lock().expect("task store poisoned");
        entries.insert(task_id, (state.clone(), Instant::now() + self.ttl));
        Ok(())
    }

    async fn expire(&self, task_id: TaskId) -> Result<bool> {
        Ok(self.entries.lock().expect("task store poisoned").remove(&task_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let store = MemoryTaskStore::new(Duration::from_millis(20));
        let task_id = Uuid::new_v4();
        store.set(task_id, &TaskState::Pending).await.unwrap();
        assert_eq!(store.get(task_id).await.unwrap(), Some(TaskState::Pending));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get(task_id).await.unwrap(), None);
    }
}
