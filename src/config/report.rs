use super::env_parse;
use std::time::Duration;

/// Tuning for the background report worker.
#[derive(Debug, Clone, Copy)]
pub struct ReportWorkerConfig {
    pub queue_capacity: usize,
    pub job_timeout: Duration,
    /// How long a cached report detail stays valid.
    pub cache_ttl_secs: u64,
}

impl Default for ReportWorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            job_timeout: Duration::from_secs(120),
            cache_ttl_secs: 300,
        }
    }
}

impl ReportWorkerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            queue_capacity: env_parse("REPORT_QUEUE_CAPACITY", defaults.queue_capacity).max(1),
            job_timeout: Duration::from_secs(
                env_parse("REPORT_JOB_TIMEOUT_SECS", defaults.job_timeout.as_secs()).max(1),
            ),
            cache_ttl_secs: env_parse("REPORT_CACHE_TTL_SECS", defaults.cache_ttl_secs),
        }
    }
}
