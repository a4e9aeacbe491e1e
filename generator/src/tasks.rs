//! Background generation tasks, tracked in memory per owner.

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use common::error::{AppError, Res};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::GenerationResult;

/// What a poll returns: `{"status": "processing"}` or the finished result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskView {
    Processing,
    Completed(GenerationResult),
}

#[derive(Debug)]
enum TaskState {
    Running,
    Finished {
        result: GenerationResult,
        finished_at: Instant,
    },
}

#[derive(Debug)]
struct TaskEntry {
    owner: Uuid,
    state: TaskState,
}

pub struct TaskRegistry {
    tasks: DashMap<Uuid, TaskEntry>,
    retention: Duration,
}

impl TaskRegistry {
    /// Finished tasks are dropped once they are older than `retention`.
    pub fn new(retention: Duration) -> Self {
        TaskRegistry {
            tasks: DashMap::new(),
            retention,
        }
    }

    /// Spawns `job` and returns the id to poll it by.
    ///
    /// A panicking job is recorded as a failed generation.
    pub fn submit<F>(self: &Arc<Self>, owner: Uuid, job: F) -> Uuid
    where
        F: Future<Output = GenerationResult> + Send + 'static,
    {
        self.prune();

        let task_id = Uuid::new_v4();
        self.tasks.insert(
            task_id,
            TaskEntry {
                owner,
                state: TaskState::Running,
            },
        );

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let result = match tokio::spawn(job).await {
                Ok(result) => result,
                Err(e) => {
                    log::error!("Generation task {} aborted: {}", task_id, e);
                    GenerationResult::from_error(&AppError::Internal(format!(
                        "Generation task {} aborted",
                        task_id
                    )))
                }
            };
            registry.finish(task_id, result);
        });

        log::info!("Submitted generation task {} for user {}", task_id, owner);
        task_id
    }

    /// Unknown ids and ids owned by someone else are both reported as missing.
    pub fn status(&self, task_id: Uuid, owner: Uuid) -> Res<TaskView> {
        self.prune();

        let entry = self
            .tasks
            .get(&task_id)
            .filter(|entry| entry.owner == owner)
            .ok_or_else(|| AppError::NotFound(format!("Task {}", task_id)))?;

        Ok(match &entry.state {
            TaskState::Running => TaskView::Processing,
            TaskState::Finished { result, .. } => TaskView::Completed(result.clone()),
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn finish(&self, task_id: Uuid, result: GenerationResult) {
        if let Some(mut entry) = self.tasks.get_mut(&task_id) {
            entry.state = TaskState::Finished {
                result,
                finished_at: Instant::now(),
            };
        }
    }

    fn prune(&self) {
        let retention = self.retention;
        self.tasks.retain(|_, entry| match entry.state {
            TaskState::Running => true,
            TaskState::Finished { finished_at, .. } => finished_at.elapsed() < retention,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::GenerationState;

    fn done() -> GenerationResult {
        GenerationResult::from_error(&AppError::Validation("days must be between 1 and 14".into()))
    }

    fn explode() -> GenerationResult {
        panic!("boom")
    }

    async fn wait_for(registry: &TaskRegistry, task_id: Uuid, owner: Uuid) -> TaskView {
        for _ in 0..100 {
            let view = registry.status(task_id, owner).unwrap();
            if view != TaskView::Processing {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task {task_id} never finished");
    }

    #[tokio::test]
    async fn running_task_reports_processing() {
        let registry = Arc::new(TaskRegistry::new(Duration::from_secs(60)));
        let owner = Uuid::new_v4();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let task_id = registry.submit(owner, async move {
            let _ = rx.await;
            done()
        });
        assert_eq!(registry.status(task_id, owner).unwrap(), TaskView::Processing);

        let body = serde_json::to_value(registry.status(task_id, owner).unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "processing" }));

        tx.send(()).unwrap();
        let TaskView::Completed(result) = wait_for(&registry, task_id, owner).await else {
            panic!("expected a finished task");
        };
        assert_eq!(result.state, GenerationState::Failed);
        assert_eq!(result.error.as_deref(), Some("days must be between 1 and 14"));
    }

    #[tokio::test]
    async fn tasks_are_private_to_their_owner() {
        let registry = Arc::new(TaskRegistry::new(Duration::from_secs(60)));
        let owner = Uuid::new_v4();
        let task_id = registry.submit(owner, async { done() });

        let err = registry.status(task_id, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(
            registry.status(Uuid::new_v4(), owner),
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn panicking_job_becomes_a_failed_result() {
        let registry = Arc::new(TaskRegistry::new(Duration::from_secs(60)));
        let owner = Uuid::new_v4();
        let task_id = registry.submit(owner, async { explode() });

        let TaskView::Completed(result) = wait_for(&registry, task_id, owner).await else {
            panic!("expected a finished task");
        };
        assert!(!result.success);
        assert_eq!(result.state, GenerationState::Failed);
    }

    #[tokio::test]
    async fn finished_tasks_expire_after_retention() {
        let registry = Arc::new(TaskRegistry::new(Duration::ZERO));
        let owner = Uuid::new_v4();
        let task_id = registry.submit(owner, async { done() });

        for _ in 0..100 {
            if registry.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            registry.prune();
        }
        assert!(registry.is_empty());
        assert!(registry.status(task_id, owner).is_err());
    }
}
