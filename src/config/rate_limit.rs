use super::env_flag;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

/// Route groups that get their own governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGroup {
    Auth,
    PublicRead,
    Protected,
    /// Report generation and distribution enqueue background work.
    ReportJobs,
}

impl RouteGroup {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "auth" => Some(RouteGroup::Auth),
            "public" | "public_read" | "public-read" => Some(RouteGroup::PublicRead),
            "protected" => Some(RouteGroup::Protected),
            "reports" | "report_jobs" | "report-jobs" => Some(RouteGroup::ReportJobs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub auth: RateLimitRule,
    pub public_read: RateLimitRule,
    pub protected: RateLimitRule,
    pub report_jobs: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth: RateLimitRule::new(5, 10),
            public_read: RateLimitRule::new(30, 60),
            protected: RateLimitRule::new(10, 20),
            report_jobs: RateLimitRule::new(1, 5),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.enabled = env_flag("RATE_LIMIT_ENABLED", cfg.enabled);

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            match parse_overrides(&raw) {
                Ok(overrides) => {
                    for (group, rule) in overrides {
                        cfg.set(group, rule);
                    }
                }
                Err(err) => {
                    tracing::warn!(value = %raw, "invalid RATE_LIMIT_CONFIG: {}", err);
                }
            }
        }

        cfg
    }

    pub fn rule(&self, group: RouteGroup) -> RateLimitRule {
        match group {
            RouteGroup::Auth => self.auth,
            RouteGroup::PublicRead => self.public_read,
            RouteGroup::Protected => self.protected,
            RouteGroup::ReportJobs => self.report_jobs,
        }
    }

    fn set(&mut self, group: RouteGroup, rule: RateLimitRule) {
        match group {
            RouteGroup::Auth => self.auth = rule,
            RouteGroup::PublicRead => self.public_read = rule,
            RouteGroup::Protected => self.protected = rule,
            RouteGroup::ReportJobs => self.report_jobs = rule,
        }
    }
}

const ALL_GROUPS: [RouteGroup; 4] = [
    RouteGroup::Auth,
    RouteGroup::PublicRead,
    RouteGroup::Protected,
    RouteGroup::ReportJobs,
];

/// Accepts either a global rule ("10:20") or a per-group list
/// ("auth=5:10,public=30:60,reports=1:5"). Later entries win.
fn parse_overrides(raw: &str) -> Result<Vec<(RouteGroup, RateLimitRule)>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty value".to_string());
    }

    if !trimmed.contains('=') {
        let rule = parse_rule(trimmed)?;
        return Ok(ALL_GROUPS.iter().map(|g| (*g, rule)).collect());
    }

    let mut overrides = Vec::new();
    for item in trimmed.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, raw_rule) = item
            .split_once('=')
            .ok_or_else(|| format!("invalid item '{}', expected name=per:burst", item))?;
        let group = RouteGroup::parse(name.trim()).ok_or_else(|| {
            format!(
                "unknown group '{}', expected auth/public/protected/reports",
                name.trim()
            )
        })?;
        overrides.push((group, parse_rule(raw_rule.trim())?));
    }

    Ok(overrides)
}

fn parse_rule(raw: &str) -> Result<RateLimitRule, String> {
    let (per_second_raw, burst_raw) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw))?;

    let per_second: u64 = per_second_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid per_second '{}'", per_second_raw.trim()))?;
    let burst_size: u32 = burst_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid burst_size '{}'", burst_raw.trim()))?;

    if per_second == 0 || burst_size == 0 {
        return Err("per_second and burst_size must be > 0".to_string());
    }

    Ok(RateLimitRule::new(per_second, burst_size))
}
