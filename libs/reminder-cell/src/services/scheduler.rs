use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::SchedulerError;
use crate::models::ScheduledJob;

const SCHEDULED_SET: &str = "reminder_queue:scheduled";

/// Durable delayed-execution facility. Delays routinely exceed process
/// lifetime, so implementations must keep jobs across restarts.
#[async_trait]
pub trait DelayedJobScheduler: Send + Sync {
    async fn schedule(
        &self,
        queue: &str,
        payload: Value,
        delay: Duration,
    ) -> Result<String, SchedulerError>;

    /// Cancel a previously scheduled job. `JobNotFound` when the job has
    /// already fired or was never scheduled.
    async fn cancel(&self, job_id: &str) -> Result<(), SchedulerError>;
}

/// Redis-backed scheduler: one hash per job plus a sorted set scored by the
/// firing timestamp in epoch milliseconds. Everything lives server-side, so
/// a restarted process picks up exactly where it left off.
pub struct RedisJobScheduler {
    pool: Pool,
}

impl RedisJobScheduler {
    pub async fn new(config: &AppConfig) -> Result<Self, SchedulerError> {
        let redis_url = config
            .redis_url
            .clone()
            .ok_or_else(|| SchedulerError::Unavailable("REDIS_URL is not configured".to_string()))?;

        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| SchedulerError::Unavailable(format!("Pool creation error: {}", e)))?;

        // Test connection
        let mut conn = pool
            .get()
            .await
            .map_err(|e| SchedulerError::Unavailable(format!("Connection error: {}", e)))?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis job scheduler initialized successfully");

        Ok(Self { pool })
    }

    fn job_key(job_id: &str) -> String {
        format!("reminder_job:{}", job_id)
    }

    async fn get_connection(&self) -> Result<Connection, SchedulerError> {
        self.pool
            .get()
            .await
            .map_err(|e| SchedulerError::Unavailable(format!("Failed to get connection: {}", e)))
    }

    /// Claim the next due job, if any. Claiming is a ZREM race so that two
    /// pollers can never both own the same job.
    pub async fn pop_due(&self) -> Result<Option<ScheduledJob>, SchedulerError> {
        let mut conn = self.get_connection().await?;
        let now_ms = Utc::now().timestamp_millis();

        let due: Vec<String> = conn
            .zrangebyscore_limit(SCHEDULED_SET, "-inf", now_ms, 0, 1)
            .await?;

        let Some(job_id) = due.into_iter().next() else {
            return Ok(None);
        };

        let claimed: i64 = conn.zrem(SCHEDULED_SET, &job_id).await?;
        if claimed == 0 {
            // Lost the race against another poller.
            return Ok(None);
        }

        let fields: std::collections::HashMap<String, String> =
            conn.hgetall(Self::job_key(&job_id)).await?;
        if fields.is_empty() {
            return Err(SchedulerError::MalformedJob(format!(
                "job {} has no record",
                job_id
            )));
        }

        Ok(Some(Self::parse_job(&job_id, fields)?))
    }

    /// Forget a job after its consumer succeeded.
    pub async fn complete(&self, job_id: &str) -> Result<(), SchedulerError> {
        let mut conn = self.get_connection().await?;
        let _: () = conn.del(Self::job_key(job_id)).await?;
        debug!("Job {} completed and purged", job_id);
        Ok(())
    }

    /// Put a failed job back on the queue with a short delay.
    pub async fn requeue(
        &self,
        job: &ScheduledJob,
        delay_seconds: u64,
    ) -> Result<(), SchedulerError> {
        let mut conn = self.get_connection().await?;
        let key = Self::job_key(&job.job_id);
        let next_fire = Utc::now() + Duration::seconds(delay_seconds as i64);

        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    ("retry_count", (job.retry_count + 1).to_string()),
                    ("fire_at", next_fire.to_rfc3339()),
                ],
            )
            .await?;
        let _: () = conn
            .zadd(SCHEDULED_SET, &job.job_id, next_fire.timestamp_millis())
            .await?;

        Ok(())
    }

    fn parse_job(
        job_id: &str,
        fields: std::collections::HashMap<String, String>,
    ) -> Result<ScheduledJob, SchedulerError> {
        let queue = fields
            .get("queue")
            .cloned()
            .ok_or_else(|| SchedulerError::MalformedJob(format!("job {} missing queue", job_id)))?;
        let payload_raw = fields
            .get("payload")
            .ok_or_else(|| SchedulerError::MalformedJob(format!("job {} missing payload", job_id)))?;
        let payload: Value = serde_json::from_str(payload_raw)?;
        let fire_at = fields
            .get("fire_at")
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| SchedulerError::MalformedJob(format!("job {} missing fire_at", job_id)))?;
        let retry_count = fields
            .get("retry_count")
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(0);

        Ok(ScheduledJob {
            job_id: job_id.to_string(),
            queue,
            payload,
            fire_at,
            retry_count,
        })
    }
}

#[async_trait]
impl DelayedJobScheduler for RedisJobScheduler {
    async fn schedule(
        &self,
        queue: &str,
        payload: Value,
        delay: Duration,
    ) -> Result<String, SchedulerError> {
        let mut conn = self.get_connection().await?;

        let job_id = Uuid::new_v4().to_string();
        let key = Self::job_key(&job_id);
        let now = Utc::now();
        let fire_at = now + delay;

        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    ("queue", queue.to_string()),
                    ("payload", serde_json::to_string(&payload)?),
                    ("fire_at", fire_at.to_rfc3339()),
                    ("retry_count", "0".to_string()),
                    ("created_at", now.to_rfc3339()),
                ],
            )
            .await?;

        // Stale-job safety net: the record outlives its firing time by a
        // week at most, even if a consumer never claims it.
        let _: () = conn
            .expire_at(&key, (fire_at + Duration::days(7)).timestamp())
            .await?;

        let _: () = conn
            .zadd(SCHEDULED_SET, &job_id, fire_at.timestamp_millis())
            .await?;

        debug!("Job {} scheduled on {} to fire at {}", job_id, queue, fire_at);
        Ok(job_id)
    }

    async fn cancel(&self, job_id: &str) -> Result<(), SchedulerError> {
        let mut conn = self.get_connection().await?;

        let removed: i64 = conn.zrem(SCHEDULED_SET, job_id).await?;
        let _: () = conn.del(Self::job_key(job_id)).await?;

        if removed == 0 {
            return Err(SchedulerError::JobNotFound(job_id.to_string()));
        }

        debug!("Job {} cancelled", job_id);
        Ok(())
    }
}
