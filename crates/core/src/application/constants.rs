// Coordination constants (No magic values)
use std::time::Duration;

/// Default deadline for one forward phase (10s)
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for each rollback / cancel / compensate call (5s)
pub const DEFAULT_COMPENSATION_TIMEOUT: Duration = Duration::from_secs(5);

/// TTL of 2PC staging keys and TCC reservation keys / locks (10 minutes)
pub const STAGING_TTL: Duration = Duration::from_secs(10 * 60);

/// TTL of final task status keys (1 hour)
pub const STATUS_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache key prefixes
pub const STATUS_KEY_PREFIX: &str = "task:status:";
pub const PREPARE_KEY_PREFIX: &str = "task:prepare:";
pub const LOCK_KEY_PREFIX: &str = "task:lock:";

/// Document store collections
pub const TASK_LOG_COLLECTION: &str = "batch_task_logs";
pub const TASK_LOG_PREPARE_COLLECTION: &str = "batch_task_logs_prepare";

/// Broker routing
pub const EXCHANGE: &str = "healthcheck.exchange";
pub const ROUTING_KEY: &str = "batch.task";
pub const CANCEL_ROUTING_KEY: &str = "batch.task.cancel";

/// Maximum accepted task id length
pub const MAX_TASK_ID_LEN: usize = 128;

pub fn status_key(task_id: &str) -> String {
    format!("{}{}", STATUS_KEY_PREFIX, task_id)
}

pub fn prepare_key(transaction_id: &str) -> String {
    format!("{}{}", PREPARE_KEY_PREFIX, transaction_id)
}

pub fn lock_key(task_id: &str) -> String {
    format!("{}{}", LOCK_KEY_PREFIX, task_id)
}
