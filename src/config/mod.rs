use aws_config::BehaviorVersion;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_ses::Client as SesClient;
use aws_sdk_ssm::Client as SsmClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

const ENV_PREFIX: &str = "PASSHELPER";
const PARAMETER_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Parameter not found: {name}")]
    ParameterNotFound { name: String },

    #[error("AWS SDK error: {source}")]
    AwsSdk {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Environment variable missing: {name}")]
    MissingEnvironmentVariable { name: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cognito: CognitoConfig,
    pub email: EmailConfig,
    pub calendar: CalendarConfig,
    pub aws: AwsConfig,
    pub observability: ObservabilityConfig,
}

/// Local server settings and the public domain of the site
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    #[serde(default)]
    pub domain_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_passport_table")]
    pub passport_table_name: String,
    #[serde(default = "default_notification_table")]
    pub notification_table_name: String,
    #[serde(default = "default_notification_endpoint_table")]
    pub notification_endpoint_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CognitoConfig {
    #[serde(default)]
    pub user_pool_id: String,
    #[serde(default)]
    pub client_id: String,
    /// Used as-is when set, otherwise read from `client_secret_parameter`
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub client_secret_parameter: Option<String>,
    /// Hosted UI domain, with or without scheme
    #[serde(default)]
    pub hosted_ui_domain: String,
    #[serde(default = "default_jwks_cache_seconds")]
    pub jwks_cache_seconds: u64,
}

/// Sender of reminder emails, `{email_name}@{email_domain}`
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_email_name")]
    pub email_name: String,
    #[serde(default)]
    pub email_domain: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub ics_bucket_name: String,
}

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    pub dynamodb_client: DynamoDbClient,
    pub ssm_client: SsmClient,
    pub s3_client: S3Client,
    pub ses_client: SesClient,
    pub cognito_client: CognitoClient,
    pub parameter_store: Arc<ParameterStoreConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default = "default_otlp_endpoint_option")]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_enable_json_logging")]
    pub enable_json_logging: bool,
}

pub struct ParameterStoreConfig {
    ssm_client: SsmClient,
    cache: Arc<RwLock<HashMap<String, (String, Instant)>>>,
    cache_ttl: Duration,
}

impl std::fmt::Debug for ParameterStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStoreConfig")
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl Config {
    pub async fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");

        let server = ServerConfig::from_env()?;
        let database = DatabaseConfig::from_env()?;
        let cognito = CognitoConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let calendar = CalendarConfig::from_env()?;
        let observability = ObservabilityConfig::from_env()?;

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(database.region.clone()))
            .load()
            .await;

        let ssm_client = SsmClient::new(&aws_config);
        let parameter_store = Arc::new(ParameterStoreConfig::new(
            ssm_client.clone(),
            PARAMETER_CACHE_TTL,
        ));

        let aws = AwsConfig {
            region: database.region.clone(),
            dynamodb_client: DynamoDbClient::new(&aws_config),
            ssm_client,
            s3_client: S3Client::new(&aws_config),
            ses_client: SesClient::new(&aws_config),
            cognito_client: CognitoClient::new(&aws_config),
            parameter_store,
        };

        let config = Config {
            server,
            database,
            cognito,
            email,
            calendar,
            aws,
            observability,
        };

        config.server.validate()?;
        config.database.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    /// Everything the website needs on top of the shared settings
    pub fn validate_for_website(&self) -> Result<(), ConfigError> {
        require("domain name", &self.server.domain_name)?;
        self.cognito.validate()?;
        self.calendar.validate()
    }

    /// Everything the reminder listener needs on top of the shared settings
    pub fn validate_for_notifications(&self) -> Result<(), ConfigError> {
        require("Cognito user pool ID", &self.cognito.user_pool_id)?;
        self.email.validate()
    }

    /// The Cognito app client secret, from the environment or Parameter Store
    pub async fn cognito_client_secret(&self) -> Result<String, ConfigError> {
        if let Some(secret) = self.cognito.client_secret.as_deref().filter(|s| !s.is_empty()) {
            return Ok(secret.to_string());
        }

        match self.cognito.client_secret_parameter.as_deref() {
            Some(name) if !name.is_empty() => self.aws.parameter_store.get_parameter(name).await,
            _ => Err(ConfigError::MissingEnvironmentVariable {
                name: format!("{}_CLIENT_SECRET", ENV_PREFIX),
            }),
        }
    }
}

fn require(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            message: format!("{} cannot be empty", name),
        });
    }
    Ok(())
}

/// Every section reads the same flat `PASSHELPER_*` namespace
fn from_env<T: DeserializeOwned>(section: &str) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        from_env("server")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Request timeout cannot be 0".to_string(),
            });
        }
        Ok(())
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        from_env("database")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require("Passport table name", &self.passport_table_name)?;
        require("Notification table name", &self.notification_table_name)?;
        require(
            "Notification endpoint table name",
            &self.notification_endpoint_table_name,
        )?;
        require("Region", &self.region)
    }
}

impl CognitoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        from_env("cognito")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require("Cognito user pool ID", &self.user_pool_id)?;
        require("Cognito client ID", &self.client_id)?;
        require("Cognito hosted UI domain", &self.hosted_ui_domain)?;

        let has_secret = [&self.client_secret, &self.client_secret_parameter]
            .iter()
            .any(|value| value.as_deref().is_some_and(|v| !v.trim().is_empty()));
        if !has_secret {
            return Err(ConfigError::ValidationError {
                message: "Cognito client secret or its parameter name must be set".to_string(),
            });
        }
        Ok(())
    }

    /// Hosted UI origin, `https://` added when the domain carries no scheme
    pub fn hosted_ui_url(&self) -> String {
        let domain = self.hosted_ui_domain.trim_end_matches('/');
        if domain.starts_with("https://") || domain.starts_with("http://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        }
    }

    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_seconds)
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        from_env("email")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require("Email name", &self.email_name)?;
        require("Email domain", &self.email_domain)
    }
}

impl CalendarConfig {
    fn from_env() -> Result<Self, ConfigError> {
        from_env("calendar")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require("Calendar bucket name", &self.ics_bucket_name)
    }
}

impl ObservabilityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        from_env("observability")
    }
}

impl ParameterStoreConfig {
    pub fn new(ssm_client: SsmClient, cache_ttl: Duration) -> Self {
        Self {
            ssm_client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl,
        }
    }

    /// Decrypted value of a parameter, cached for the configured TTL
    pub async fn get_parameter(&self, name: &str) -> Result<String, ConfigError> {
        debug!("Getting parameter: {}", name);

        {
            let cache = self.cache.read().await;
            if let Some((value, timestamp)) = cache.get(name) {
                if timestamp.elapsed() < self.cache_ttl {
                    debug!("Parameter found in cache: {}", name);
                    return Ok(value.clone());
                }
                debug!("Parameter cache expired: {}", name);
            }
        }

        let result = self
            .ssm_client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| ConfigError::AwsSdk {
                source: Box::new(e),
            })?;

        let value = result
            .parameter()
            .and_then(|p| p.value())
            .ok_or_else(|| ConfigError::ParameterNotFound {
                name: name.to_string(),
            })?
            .to_string();

        {
            let mut cache = self.cache.write().await;
            cache.insert(name.to_string(), (value.clone(), Instant::now()));
        }

        debug!("Parameter retrieved and cached: {}", name);
        Ok(value)
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

pub(crate) fn default_passport_table() -> String {
    "Passports".to_string()
}

pub(crate) fn default_notification_table() -> String {
    "PassportNotifications".to_string()
}

pub(crate) fn default_notification_endpoint_table() -> String {
    "NotificationEndpoints".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_jwks_cache_seconds() -> u64 {
    60 * 60
}

pub(crate) fn default_email_name() -> String {
    "reminders".to_string()
}

pub(crate) fn default_service_name() -> String {
    "passhelper-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_otlp_endpoint_option() -> Option<String> {
    std::env::var("PASSHELPER_OTLP_ENDPOINT").ok()
}

pub(crate) fn default_enable_json_logging() -> bool {
    std::env::var("PASSHELPER_ENABLE_JSON_LOGGING")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false)
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
