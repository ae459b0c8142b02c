//! Configuration loading for the Personas API.
//!
//! Settings come from layered `.env` files overlaid by `PERSONAS_*` process
//! environment variables, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "PERSONAS_";

/// Application configuration derived from `PERSONAS_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// External base URL of the deployment, used for OAuth redirect URIs
    /// and avatar public URLs.
    #[serde(default = "default_app_url")]
    pub app_url: String,
    /// 32-byte key (base64 in the environment) for API-key encryption at rest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto_key: Option<Vec<u8>>,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,
    /// Filesystem root where avatar blobs are stored.
    #[serde(default = "default_avatar_storage_root")]
    pub avatar_storage_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_oauth_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_api_base: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            app_url: default_app_url(),
            crypto_key: None,
            session_ttl_hours: default_session_ttl_hours(),
            avatar_storage_root: default_avatar_storage_root(),
            github_client_id: None,
            github_client_secret: None,
            github_oauth_base: None,
            github_api_base: None,
        }
    }
}

impl AppConfig {
    /// The configured bind address parsed as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// JSON rendering of the config with secret values replaced, safe to log
    /// at startup.
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut redacted = self.clone();
        if redacted.crypto_key.is_some() {
            redacted.crypto_key = Some(b"[REDACTED]".to_vec());
        }
        for secret in [
            &mut redacted.github_client_id,
            &mut redacted.github_client_secret,
        ] {
            if secret.is_some() {
                *secret = Some("[REDACTED]".to_string());
            }
        }
        serde_json::to_string_pretty(&redacted)
    }

    /// Checks that required settings are present and well-formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.crypto_key {
            None => return Err(ConfigError::MissingCryptoKey),
            Some(key) if key.len() != 32 => {
                return Err(ConfigError::InvalidCryptoKeyLength { length: key.len() });
            }
            Some(_) => {}
        }

        // OAuth credentials are only mandatory outside local/test profiles.
        if !matches!(self.profile.as_str(), "local" | "test") {
            if self.github_client_id.is_none() {
                return Err(ConfigError::MissingGitHubClientId);
            }
            if self.github_client_secret.is_none() {
                return Err(ConfigError::MissingGitHubClientSecret);
            }
        }

        if self.session_ttl_hours == 0 {
            return Err(ConfigError::InvalidSessionTtl {
                value: self.session_ttl_hours,
            });
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/personas".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_app_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_session_ttl_hours() -> u64 {
    24 * 7
}

fn default_avatar_storage_root() -> String {
    "data/agent-avatars".to_string()
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("PERSONAS_CRYPTO_KEY is not valid base64: {error}")]
    InvalidCryptoKeyBase64 { error: String },
    #[error("crypto key must be exactly 32 bytes, got {length}")]
    InvalidCryptoKeyLength { length: usize },
    #[error("PERSONAS_CRYPTO_KEY is required")]
    MissingCryptoKey,
    #[error("PERSONAS_GITHUB_CLIENT_ID is required outside local/test profiles")]
    MissingGitHubClientId,
    #[error("PERSONAS_GITHUB_CLIENT_SECRET is required outside local/test profiles")]
    MissingGitHubClientSecret,
    #[error("session TTL must be greater than zero, got {value}")]
    InvalidSessionTtl { value: u64 },
}

/// Loads [`AppConfig`] from layered `.env` files plus the process environment.
///
/// Layering order (later wins): `.env`, `.env.local`, `.env.{profile}`,
/// `.env.{profile}.local`, then `PERSONAS_*` process environment variables.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

/// Pops `key` from the layered map, treating an empty value as unset.
fn take(layered: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    layered.remove(key).filter(|v| !v.is_empty())
}

/// Pops `key` and parses it, falling back to the default on absence or a
/// parse failure.
fn take_parsed<T: FromStr>(layered: &mut BTreeMap<String, String>, key: &str, default: T) -> T {
    layered
        .remove(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ConfigLoader {
    /// A loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// A loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Resolves configuration from the layered sources.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay the process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(name.to_string(), value);
            }
        }

        let crypto_key = match layered.remove("CRYPTO_KEY") {
            Some(encoded) => {
                use base64::{Engine as _, engine::general_purpose};
                let decoded = general_purpose::STANDARD.decode(&encoded).map_err(|e| {
                    ConfigError::InvalidCryptoKeyBase64 {
                        error: e.to_string(),
                    }
                })?;
                Some(decoded)
            }
            None => None,
        };

        Ok(AppConfig {
            profile: take(&mut layered, "PROFILE").unwrap_or(profile_hint),
            api_bind_addr: take(&mut layered, "API_BIND_ADDR")
                .unwrap_or_else(default_api_bind_addr),
            log_level: take(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level),
            log_format: take(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format),
            database_url: take(&mut layered, "DATABASE_URL").unwrap_or_else(default_database_url),
            db_max_connections: take_parsed(
                &mut layered,
                "DB_MAX_CONNECTIONS",
                default_db_max_connections(),
            ),
            db_acquire_timeout_ms: take_parsed(
                &mut layered,
                "DB_ACQUIRE_TIMEOUT_MS",
                default_db_acquire_timeout_ms(),
            ),
            // Trailing slash is trimmed so URL joins stay predictable.
            app_url: take(&mut layered, "APP_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(default_app_url),
            crypto_key,
            session_ttl_hours: take_parsed(
                &mut layered,
                "SESSION_TTL_HOURS",
                default_session_ttl_hours(),
            ),
            avatar_storage_root: take(&mut layered, "AVATAR_STORAGE_ROOT")
                .unwrap_or_else(default_avatar_storage_root),
            github_client_id: take(&mut layered, "GITHUB_CLIENT_ID"),
            github_client_secret: take(&mut layered, "GITHUB_CLIENT_SECRET"),
            github_oauth_base: take(&mut layered, "GITHUB_OAUTH_BASE"),
            github_api_base: take(&mut layered, "GITHUB_API_BASE"),
        })
    }

    /// Reads the `.env` layers in order, then resolves the profile so the
    /// profile-specific layers can be applied on top.
    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        for name in [".env", ".env.local"] {
            self.merge_dotenv(self.base_dir.join(name), &mut values)?;
        }

        let profile = env::var("PERSONAS_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        for name in [
            format!(".env.{}", profile),
            format!(".env.{}.local", profile),
        ] {
            self.merge_dotenv(self.base_dir.join(name), &mut values)?;
        }

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        into: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        let entries = match dotenvy::from_path_iter(&path) {
            Ok(entries) => entries,
            // Absent layers are simply skipped.
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                return Ok(());
            }
            Err(source) => return Err(ConfigError::EnvFile { path, source }),
        };

        for entry in entries {
            let (key, value) = entry.map_err(|source| ConfigError::EnvFile {
                path: path.clone(),
                source,
            })?;
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                into.insert(name.to_string(), value);
            }
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_without_env_files() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_base_dir(dir.path().to_path_buf());
        let config = loader.load().unwrap();

        assert_eq!(config.api_bind_addr, "0.0.0.0:8080");
        assert_eq!(config.log_format, "json");
        assert_eq!(config.session_ttl_hours, 24 * 7);
        assert!(config.crypto_key.is_none());
    }

    #[test]
    fn env_file_values_are_loaded() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".env"),
            "PERSONAS_API_BIND_ADDR=127.0.0.1:9999\nPERSONAS_APP_URL=https://personas.test/\n",
        )
        .unwrap();

        let loader = ConfigLoader::with_base_dir(dir.path().to_path_buf());
        let config = loader.load().unwrap();

        assert_eq!(config.api_bind_addr, "127.0.0.1:9999");
        assert_eq!(config.app_url, "https://personas.test");
    }

    #[test]
    fn profile_specific_file_overrides_base() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "PERSONAS_LOG_LEVEL=info\n").unwrap();
        fs::write(dir.path().join(".env.local"), "PERSONAS_LOG_LEVEL=debug\n").unwrap();

        let loader = ConfigLoader::with_base_dir(dir.path().to_path_buf());
        let config = loader.load().unwrap();
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn invalid_crypto_key_base64_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "PERSONAS_CRYPTO_KEY=not-base64!!\n").unwrap();

        let loader = ConfigLoader::with_base_dir(dir.path().to_path_buf());
        let err = loader.load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCryptoKeyBase64 { .. }));
    }

    #[test]
    fn validate_rejects_short_crypto_key() {
        let config = AppConfig {
            crypto_key: Some(vec![0u8; 16]),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCryptoKeyLength { length: 16 })
        ));
    }

    #[test]
    fn redacted_json_hides_secrets() {
        let config = AppConfig {
            crypto_key: Some(vec![0u8; 32]),
            github_client_secret: Some("shh".to_string()),
            ..Default::default()
        };

        let json = config.redacted_json().unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("shh"));
    }
}
