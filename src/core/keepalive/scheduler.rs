use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};
use uuid::Uuid;

use super::KeepaliveOrchestrator;
use crate::core::lifecycle::LifecycleComponent;
use crate::core::error::{KeepaliveError, KeepaliveResult};
use crate::core::store::types::{ScheduledTask, TaskType};

/// One cron job per keepalive task, each firing `run_scheduled` independently.
///
/// Jobs are registered for disabled tasks too; enablement is read when the job fires.
pub struct KeepaliveScheduler {
    scheduler: JobScheduler,
    orchestrator: Arc<KeepaliveOrchestrator>,
    jobs: Mutex<HashMap<String, Uuid>>,
}

/// Rejects expressions the cron scheduler would not accept.
pub fn validate_cron(expression: &str) -> KeepaliveResult<()> {
    Job::new_async(expression, |_uuid, _l| Box::pin(async {}))
        .map(|_| ())
        .map_err(|e| KeepaliveError::InvalidInput(format!("invalid cron expression '{}': {}", expression, e)))
}

impl KeepaliveScheduler {
    pub fn new(scheduler: JobScheduler, orchestrator: Arc<KeepaliveOrchestrator>) -> Self {
        Self {
            scheduler,
            orchestrator,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Registers every live keepalive task. Bad cron rows are skipped with a warning.
    pub async fn schedule_all(&self) -> Result<usize> {
        let tasks = self
            .orchestrator
            .tasks()
            .list_by_type(TaskType::Keepalive)
            .await?;
        let mut scheduled = 0;
        for task in &tasks {
            match self.sync_task(task).await {
                Ok(true) => scheduled += 1,
                Ok(false) => {}
                Err(e) => warn!("Not scheduling {}: {}", task.task_code, e),
            }
        }
        info!("Scheduled {} keepalive task(s)", scheduled);
        Ok(scheduled)
    }

    /// Replaces the job for `task`. Returns whether a job is now registered.
    pub async fn sync_task(&self, task: &ScheduledTask) -> Result<bool> {
        self.unschedule(&task.task_code).await?;
        if task.task_type != TaskType::Keepalive || task.cron_expression.trim().is_empty() {
            return Ok(false);
        }

        let orchestrator = self.orchestrator.clone();
        let task_code = task.task_code.clone();
        let job = Job::new_async(task.cron_expression.as_str(), move |_uuid, mut _l| {
            let orchestrator = orchestrator.clone();
            let task_code = task_code.clone();
            Box::pin(async move {
                orchestrator.run_scheduled(&task_code).await;
            })
        })?;
        let job_id = self.scheduler.add(job).await?;
        self.jobs.lock().await.insert(task.task_code.clone(), job_id);
        info!(
            "Keepalive {} scheduled with '{}'",
            task.task_code, task.cron_expression
        );
        Ok(true)
    }

    pub async fn unschedule(&self, task_code: &str) -> Result<bool> {
        let previous = self.jobs.lock().await.remove(task_code);
        match previous {
            Some(job_id) => {
                self.scheduler.remove(&job_id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn scheduled_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.jobs.lock().await.keys().cloned().collect();
        codes.sort();
        codes
    }

    async fn start(&self) -> Result<()> {
        self.scheduler.start().await?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        Ok(())
    }
}

/// Lifecycle wrapper: registers jobs on start and stops the timer on shutdown.
pub struct SchedulerService {
    scheduler: Arc<KeepaliveScheduler>,
}

impl SchedulerService {
    pub fn new(scheduler: Arc<KeepaliveScheduler>) -> Self {
        Self { scheduler }
    }
}

#[async_trait::async_trait]
impl LifecycleComponent for SchedulerService {
    fn name(&self) -> &str {
        "keepalive-scheduler"
    }

    async fn on_start(&mut self) -> Result<()> {
        self.scheduler.schedule_all().await?;
        self.scheduler.start().await
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        self.scheduler.stop().await
    }
}
