use std::env;
use std::sync::OnceLock;

static APP_ENV: OnceLock<AppEnv> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => AppEnv::Development,
            _ => AppEnv::Production,
        }
    }

    pub fn from_env() -> Self {
        env::var("APP_ENV")
            .map(|v| Self::parse(&v))
            .unwrap_or(AppEnv::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
        }
    }
}

/// Process-wide environment, read once on first use.
pub fn app_env() -> AppEnv {
    *APP_ENV.get_or_init(AppEnv::from_env)
}

/// Raw error strings are only attached to error responses in development.
pub fn expose_error_details() -> bool {
    app_env() == AppEnv::Development
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_development_aliases() {
        assert_eq!(AppEnv::parse("development"), AppEnv::Development);
        assert_eq!(AppEnv::parse(" DEV "), AppEnv::Development);
        assert_eq!(AppEnv::parse("local"), AppEnv::Development);
    }

    #[test]
    fn anything_else_is_production() {
        assert_eq!(AppEnv::parse("production"), AppEnv::Production);
        assert_eq!(AppEnv::parse("staging"), AppEnv::Production);
        assert_eq!(AppEnv::parse(""), AppEnv::Production);
    }
}
