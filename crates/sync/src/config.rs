//! Sync engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PRINTBRIDGE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `PRINTIFY_API_TOKEN` - Printify personal access token
//! - `PRINTIFY_SHOP_ID` - Printify shop to import from
//! - `WOOCOMMERCE_URL` - Store base URL (e.g. `https://shop.example.com/`)
//! - `WOOCOMMERCE_CONSUMER_KEY` - WooCommerce REST API consumer key
//! - `WOOCOMMERCE_CONSUMER_SECRET` - WooCommerce REST API consumer secret
//!
//! ## Optional
//! - `PRINTIFY_API_URL` - API base (default: `https://api.printify.com/v1/`)
//! - `IMPORT_BATCH_SIZE` - Products per batch page (default: 10, max 100)
//! - `IMPORT_COMPLETION_DELAY_SECS` - Grace delay before completion (default: 60)
//! - `IMPORT_COMPLETION_MAX_DEFERRALS` - Completion re-checks while imports wait (default: 5)
//! - `GALLERY_IMAGE_STAGGER_SECS` - Delay between gallery image tasks (default: 5)
//! - `WORKER_POLL_INTERVAL_SECS` - Task worker poll interval (default: 5)
//! - `WORKER_BATCH_SIZE` - Tasks claimed per poll (default: 10)
//! - `WORKER_VISIBILITY_TIMEOUT_SECS` - Re-queue claimed tasks after this (default: 600)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::time::Duration;

use printbridge_core::ShopId;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;
const DEFAULT_PRINTIFY_API_URL: &str = "https://api.printify.com/v1/";
const MAX_BATCH_SIZE: u32 = 100;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Printify API configuration
    pub printify: PrintifyConfig,
    /// WooCommerce REST API configuration
    pub woocommerce: WooCommerceConfig,
    /// Import pipeline tuning
    pub import: ImportSettings,
    /// Task worker tuning
    pub worker: WorkerSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
}

/// Printify API configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct PrintifyConfig {
    /// API base URL (with trailing slash)
    pub api_url: Url,
    /// Personal access token
    pub api_token: SecretString,
    /// Shop to import from
    pub shop_id: ShopId,
}

impl std::fmt::Debug for PrintifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintifyConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &"[REDACTED]")
            .field("shop_id", &self.shop_id)
            .finish()
    }
}

/// WooCommerce REST API configuration.
///
/// Implements `Debug` manually to redact the consumer secret.
#[derive(Clone)]
pub struct WooCommerceConfig {
    /// Store base URL (the REST API lives under `wp-json/wc/v3/`)
    pub store_url: Url,
    /// REST API consumer key
    pub consumer_key: String,
    /// REST API consumer secret
    pub consumer_secret: SecretString,
}

impl std::fmt::Debug for WooCommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooCommerceConfig")
            .field("store_url", &self.store_url.as_str())
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .finish()
    }
}

/// Tuning for the batched import.
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Shop the import walks.
    pub shop_id: ShopId,
    /// Products requested per page (also the "full page" threshold).
    pub batch_size: u32,
    /// Delay between the last batch and the completion task.
    pub completion_delay: Duration,
    /// How often completion re-schedules itself while product imports are still queued.
    pub max_completion_deferrals: u32,
    /// Delay between consecutive gallery image tasks of one product.
    pub gallery_stagger: Duration,
}

impl ImportSettings {
    /// Settings with defaults for the given shop.
    #[must_use]
    pub const fn for_shop(shop_id: ShopId) -> Self {
        Self {
            shop_id,
            batch_size: 10,
            completion_delay: Duration::from_secs(60),
            max_completion_deferrals: 5,
            gallery_stagger: Duration::from_secs(5),
        }
    }
}

/// Tuning for the task worker.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Interval between polls when the queue is idle.
    pub poll_interval: Duration,
    /// Tasks claimed per poll.
    pub batch_size: u32,
    /// Claimed tasks older than this are handed out again.
    pub visibility_timeout: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 10,
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("PRINTBRIDGE_DATABASE_URL")?;
        let printify = PrintifyConfig::from_env()?;
        let woocommerce = WooCommerceConfig::from_env()?;
        let import = ImportSettings::from_env(printify.shop_id)?;
        let worker = WorkerSettings::from_env()?;

        Ok(Self {
            database_url,
            printify,
            woocommerce,
            import,
            worker,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl PrintifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let shop_id = get_required_env("PRINTIFY_SHOP_ID")?
            .parse::<i64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PRINTIFY_SHOP_ID".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_url: parse_base_url(
                "PRINTIFY_API_URL",
                &get_env_or_default("PRINTIFY_API_URL", DEFAULT_PRINTIFY_API_URL),
            )?,
            api_token: get_validated_secret("PRINTIFY_API_TOKEN")?,
            shop_id: ShopId::new(shop_id),
        })
    }
}

impl WooCommerceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store_url: parse_base_url(
                "WOOCOMMERCE_URL",
                &get_required_env("WOOCOMMERCE_URL")?,
            )?,
            consumer_key: get_required_env("WOOCOMMERCE_CONSUMER_KEY")?,
            consumer_secret: get_validated_secret("WOOCOMMERCE_CONSUMER_SECRET")?,
        })
    }
}

impl ImportSettings {
    fn from_env(shop_id: ShopId) -> Result<Self, ConfigError> {
        let defaults = Self::for_shop(shop_id);

        let batch_size = get_parsed_or("IMPORT_BATCH_SIZE", defaults.batch_size)?;
        validate_batch_size(batch_size)?;

        Ok(Self {
            shop_id,
            batch_size,
            completion_delay: get_secs_or(
                "IMPORT_COMPLETION_DELAY_SECS",
                defaults.completion_delay,
            )?,
            max_completion_deferrals: get_parsed_or(
                "IMPORT_COMPLETION_MAX_DEFERRALS",
                defaults.max_completion_deferrals,
            )?,
            gallery_stagger: get_secs_or("GALLERY_IMAGE_STAGGER_SECS", defaults.gallery_stagger)?,
        })
    }
}

impl WorkerSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            poll_interval: get_secs_or("WORKER_POLL_INTERVAL_SECS", defaults.poll_interval)?,
            batch_size: get_parsed_or("WORKER_BATCH_SIZE", defaults.batch_size)?,
            visibility_timeout: get_secs_or(
                "WORKER_VISIBILITY_TIMEOUT_SECS",
                defaults.visibility_timeout,
            )?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn get_parsed_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn get_secs_or(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    get_parsed_or(key, default.as_secs()).map(Duration::from_secs)
}

/// Parse a base URL, forcing a trailing slash so `Url::join` keeps the path.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn validate_batch_size(batch_size: u32) -> Result<(), ConfigError> {
    if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::InvalidEnvVar(
            "IMPORT_BATCH_SIZE".to_string(),
            format!("must be between 1 and {MAX_BATCH_SIZE} (got {batch_size})"),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the credential from the provider dashboard."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-printify-token", "PRINTIFY_API_TOKEN");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("cs_9f8A7b6C5d4E3f2G1h0IjKlMnOp", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("WOOCOMMERCE_URL", "https://shop.test").unwrap();
        assert_eq!(url.as_str(), "https://shop.test/");
        let joined = url.join("wp-json/wc/v3/products").unwrap();
        assert_eq!(joined.as_str(), "https://shop.test/wp-json/wc/v3/products");
    }

    #[test]
    fn test_parse_base_url_keeps_path() {
        let url = parse_base_url("PRINTIFY_API_URL", "https://api.printify.com/v1").unwrap();
        let joined = url.join("shops/1/products.json").unwrap();
        assert_eq!(
            joined.as_str(),
            "https://api.printify.com/v1/shops/1/products.json"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(matches!(
            parse_base_url("WOOCOMMERCE_URL", "not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_batch_size_bounds() {
        assert!(validate_batch_size(1).is_ok());
        assert!(validate_batch_size(100).is_ok());
        assert!(validate_batch_size(0).is_err());
        assert!(validate_batch_size(101).is_err());
    }

    #[test]
    fn test_import_settings_defaults() {
        let settings = ImportSettings::for_shop(ShopId::new(7));
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.completion_delay, Duration::from_secs(60));
        assert_eq!(settings.shop_id, ShopId::new(7));
    }

    #[test]
    fn test_printify_config_debug_redacts_token() {
        let config = PrintifyConfig {
            api_url: Url::parse(DEFAULT_PRINTIFY_API_URL).unwrap(),
            api_token: SecretString::from("super_secret_printify_token"),
            shop_id: ShopId::new(12),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.printify.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_printify_token"));
    }

    #[test]
    fn test_woocommerce_config_debug_redacts_secret() {
        let config = WooCommerceConfig {
            store_url: Url::parse("https://shop.test/").unwrap(),
            consumer_key: "ck_public".to_string(),
            consumer_secret: SecretString::from("cs_super_secret_value"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("ck_public"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("cs_super_secret_value"));
    }
}
