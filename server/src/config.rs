use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use axum::http::HeaderValue;
use axum_extra::extract::cookie::Key;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use platform_authn::{AuthnService, DemoCredentials};

const DEFAULT_DATA_URL: &str = "https://backend.jotish.in/backend_dev/gettabledata.php";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub cookie_key: Key,
    pub cors_allowed_origins: Vec<String>,
    pub demo_credentials: DemoCredentials,
    pub providers: Vec<String>,
    pub session_ttl: chrono::Duration,
    pub max_upload_bytes: usize,
    pub source: SourceConfig,
}

/// Where and how the employee dataset is fetched.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub url: String,
    pub credentials: DemoCredentials,
    pub timeout: Duration,
}

impl SourceConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = DemoCredentials::default();
        let timeout_secs = env_parse("PORTAL_FETCH_TIMEOUT_SECS", 15u64)?;
        Ok(Self {
            url: std::env::var("PORTAL_DATA_URL").unwrap_or_else(|_| DEFAULT_DATA_URL.into()),
            credentials: DemoCredentials {
                username: std::env::var("PORTAL_DATA_USERNAME").unwrap_or(defaults.username),
                password: std::env::var("PORTAL_DATA_PASSWORD").unwrap_or(defaults.password),
            },
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let cookie_secret =
            std::env::var("COOKIE_SECRET_BASE64").context("COOKIE_SECRET_BASE64 missing")?;
        let secret_bytes = STANDARD
            .decode(cookie_secret.trim())
            .context("invalid COOKIE_SECRET_BASE64")?;
        if secret_bytes.len() < 64 {
            return Err(anyhow!(
                "COOKIE_SECRET_BASE64 must decode to at least 64 bytes"
            ));
        }
        let cookie_key = Key::try_from(&secret_bytes[..64])
            .map_err(|err| anyhow!("invalid COOKIE_SECRET_BASE64: {err:?}"))?;

        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        )?;
        let providers = split_list(&std::env::var("AUTH_PROVIDERS").unwrap_or_else(|_| "google".into()));

        let defaults = DemoCredentials::default();
        let demo_credentials = DemoCredentials {
            username: std::env::var("DEMO_USERNAME").unwrap_or(defaults.username),
            password: std::env::var("DEMO_PASSWORD").unwrap_or(defaults.password),
        };

        let ttl_minutes = env_parse("SESSION_TTL_MINUTES", 720i64)?;
        if ttl_minutes <= 0 {
            return Err(anyhow!("SESSION_TTL_MINUTES must be positive"));
        }
        let max_upload_bytes = env_parse("PORTAL_MAX_UPLOAD_BYTES", 10 * 1024 * 1024usize)?;

        Ok(Self {
            cookie_key,
            cors_allowed_origins,
            demo_credentials,
            providers,
            session_ttl: chrono::Duration::minutes(ttl_minutes),
            max_upload_bytes,
            source: SourceConfig::from_env()?,
        })
    }

    pub fn authn(&self) -> AuthnService {
        self.providers.iter().fold(
            AuthnService::new(self.demo_credentials.clone()),
            |service, provider| service.with_provider(provider.clone()),
        )
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Credentialed CORS needs explicit origins, so an empty list is rejected.
fn parse_origins(raw: &str) -> Result<Vec<String>> {
    let origins = split_list(raw);
    if origins.is_empty() {
        return Err(anyhow!("CORS_ALLOWED_ORIGINS must name at least one origin"));
    }
    for origin in &origins {
        origin
            .parse::<HeaderValue>()
            .with_context(|| format!("invalid CORS origin: {origin}"))?;
    }
    Ok(origins)
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {raw}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            cookie_key: Key::generate(),
            cors_allowed_origins: vec!["http://localhost:5173".into()],
            demo_credentials: DemoCredentials::default(),
            providers: vec!["google".into()],
            session_ttl: chrono::Duration::minutes(30),
            max_upload_bytes: 1024 * 1024,
            source: SourceConfig {
                url: "http://127.0.0.1:9/unused".into(),
                credentials: DemoCredentials::default(),
                timeout: Duration::from_secs(1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(
            split_list(" http://a , ,http://b,"),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
    }

    #[test]
    fn origins_must_be_present_and_valid() {
        assert_eq!(
            parse_origins("http://a, http://b").unwrap(),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
        assert!(parse_origins("").is_err());
        assert!(parse_origins(" , ").is_err());
        assert!(parse_origins("http://ok,bad\norigin").is_err());
    }

    #[test]
    fn authn_registers_every_provider() {
        let mut config = AppConfig::for_tests();
        config.providers = vec!["google".into(), "microsoft".into()];
        assert_eq!(config.authn().providers(), ["google", "microsoft"]);
    }
}
