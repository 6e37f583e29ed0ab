use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ReminderError, SchedulerError};
use crate::models::{ScheduledJob, WorkerConfig};
use crate::services::scheduler::RedisJobScheduler;

/// Callback invoked when a scheduled job fires, with the original payload.
/// Handlers must be safe to re-run: delivery is at-least-once.
#[async_trait]
pub trait JobConsumer: Send + Sync {
    async fn handle(&self, payload: Value) -> Result<(), ReminderError>;
}

/// Polls the durable queue for due jobs and dispatches them to the consumer
/// registered for their queue name. Failed jobs are requeued with a delay
/// until the retry budget runs out.
pub struct ReminderWorker {
    config: WorkerConfig,
    scheduler: Arc<RedisJobScheduler>,
    consumers: HashMap<String, Arc<dyn JobConsumer>>,
    is_shutdown: tokio::sync::RwLock<bool>,
}

impl ReminderWorker {
    pub fn new(scheduler: Arc<RedisJobScheduler>, config: WorkerConfig) -> Self {
        Self {
            config,
            scheduler,
            consumers: HashMap::new(),
            is_shutdown: tokio::sync::RwLock::new(false),
        }
    }

    pub fn register(&mut self, queue: &str, consumer: Arc<dyn JobConsumer>) {
        self.consumers.insert(queue.to_string(), consumer);
    }

    #[instrument(skip(self), fields(worker_id = %self.config.worker_id))]
    pub async fn start(self: Arc<Self>) -> Result<(), SchedulerError> {
        info!("Starting reminder worker {}", self.config.worker_id);

        loop {
            if *self.is_shutdown.read().await {
                info!("Worker {} received shutdown signal", self.config.worker_id);
                break;
            }

            match self.scheduler.pop_due().await {
                Ok(Some(job)) => {
                    self.dispatch(job).await;
                }
                Ok(None) => {
                    tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
                }
                Err(e) => {
                    error!("Worker {} failed to poll queue: {}", self.config.worker_id, e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }

        Ok(())
    }

    pub async fn shutdown(&self) {
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }

    #[instrument(skip(self, job), fields(job_id = %job.job_id, queue = %job.queue))]
    async fn dispatch(&self, job: ScheduledJob) {
        let Some(consumer) = self.consumers.get(&job.queue) else {
            warn!("No consumer registered for queue {}, dropping job", job.queue);
            self.finish(&job.job_id).await;
            return;
        };

        match consumer.handle(job.payload.clone()).await {
            Ok(()) => {
                debug!("Job {} processed successfully", job.job_id);
                self.finish(&job.job_id).await;
            }
            Err(e) if job.retry_count < self.config.max_retries => {
                warn!(
                    "Job {} failed ({}), retry {}/{} in {}s",
                    job.job_id,
                    e,
                    job.retry_count + 1,
                    self.config.max_retries,
                    self.config.retry_delay_seconds
                );
                if let Err(requeue_err) = self
                    .scheduler
                    .requeue(&job, self.config.retry_delay_seconds)
                    .await
                {
                    error!("Failed to requeue job {}: {}", job.job_id, requeue_err);
                }
            }
            Err(e) => {
                error!(
                    "Job {} failed permanently after {} retries: {}",
                    job.job_id, job.retry_count, e
                );
                self.finish(&job.job_id).await;
            }
        }
    }

    async fn finish(&self, job_id: &str) {
        if let Err(e) = self.scheduler.complete(job_id).await {
            error!("Failed to purge job {}: {}", job_id, e);
        }
    }
}
