/// Configuration management for the Kizuna linker
use crate::error::{LinkerError, LinkerResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub idp: IdpConfig,
    pub flow: FlowConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Externally reachable base URL, used to build hop/redirect URLs
    pub public_url: String,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub link_db: PathBuf,
}

/// API authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer API keys accepted on the linker surface
    pub api_keys: Vec<String>,
}

/// Wikidot identity-provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdpConfig {
    /// Base endpoint of the identity provider
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Code challenge method sent on authorization ("S256" or "plain")
    pub challenge_method: String,
    /// Outbound request timeout in seconds
    pub timeout_secs: u64,
}

/// Linking flow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// FlowState time-to-live in seconds
    pub state_ttl_secs: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> LinkerResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("KIZUNA_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("KIZUNA_PORT")
            .unwrap_or_else(|_| "8374".to_string())
            .parse()
            .map_err(|_| LinkerError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("KIZUNA_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port));
        let version = env::var("KIZUNA_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("KIZUNA_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let link_db = env::var("KIZUNA_LINK_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("links.sqlite"));

        // Comma-separated API keys
        let api_keys = env::var("KIZUNA_API_KEYS")
            .map_err(|_| LinkerError::Validation("KIZUNA_API_KEYS is required".to_string()))?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let idp_endpoint = env::var("KIZUNA_IDP_ENDPOINT")
            .map_err(|_| LinkerError::Validation("KIZUNA_IDP_ENDPOINT is required".to_string()))?;
        let client_id = env::var("KIZUNA_IDP_CLIENT_ID")
            .map_err(|_| LinkerError::Validation("KIZUNA_IDP_CLIENT_ID is required".to_string()))?;
        let client_secret = env::var("KIZUNA_IDP_CLIENT_SECRET").map_err(|_| {
            LinkerError::Validation("KIZUNA_IDP_CLIENT_SECRET is required".to_string())
        })?;
        let redirect_uri = env::var("KIZUNA_IDP_REDIRECT_URI")
            .unwrap_or_else(|_| format!("{}/v1/callback", public_url));
        let challenge_method =
            env::var("KIZUNA_IDP_CHALLENGE_METHOD").unwrap_or_else(|_| "S256".to_string());
        let idp_timeout_secs = env::var("KIZUNA_IDP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let state_ttl_secs = env::var("KIZUNA_FLOW_STATE_TTL_SECS")
            .unwrap_or_else(|_| "600".to_string())
            .parse()
            .unwrap_or(600);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version,
            },
            storage: StorageConfig {
                data_directory,
                link_db,
            },
            auth: AuthConfig { api_keys },
            idp: IdpConfig {
                endpoint: idp_endpoint,
                client_id,
                client_secret,
                redirect_uri,
                challenge_method,
                timeout_secs: idp_timeout_secs,
            },
            flow: FlowConfig { state_ttl_secs },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> LinkerResult<()> {
        if self.service.hostname.is_empty() {
            return Err(LinkerError::Validation(
                "Hostname cannot be empty".to_string(),
            ));
        }

        if self.auth.api_keys.is_empty() {
            return Err(LinkerError::Validation(
                "At least one API key must be configured".to_string(),
            ));
        }

        if self.auth.api_keys.iter().any(|k| k.len() < 16) {
            return Err(LinkerError::Validation(
                "API keys must be at least 16 characters".to_string(),
            ));
        }

        crate::pkce::ChallengeMethod::parse(&self.idp.challenge_method)?;

        if self.flow.state_ttl_secs <= 0 {
            return Err(LinkerError::Validation(
                "Flow state TTL must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
