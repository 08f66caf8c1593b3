use std::env;

#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_address: String,
    /// Base URL of the dashboard, used for links in report emails.
    pub dashboard_url: String,
}

impl EmailConfig {
    /// Returns None if SMTP is not configured; report emails are then skipped.
    pub fn from_env() -> Option<Self> {
        let smtp_host = env::var("SMTP_HOST").ok()?;
        let smtp_port = env::var("SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);
        let smtp_username = env::var("SMTP_USERNAME").ok()?;
        let smtp_password = env::var("SMTP_PASSWORD").ok()?;
        let from_address = env::var("SMTP_FROM")
            .unwrap_or_else(|_| format!("Showroom <{}>", smtp_username));

        Some(Self {
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            from_address,
            dashboard_url: dashboard_url(),
        })
    }
}

pub fn dashboard_url() -> String {
    env::var("DASHBOARD_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}
