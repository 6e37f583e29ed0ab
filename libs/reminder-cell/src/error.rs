use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Redis connection error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed job record: {0}")]
    MalformedJob(String),
}

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Job handler error: {0}")]
    Handler(String),
}
