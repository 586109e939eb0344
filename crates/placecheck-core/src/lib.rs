pub mod app_config;
pub mod config;
pub mod identity;
pub mod place;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use identity::{is_supported_url, resolve_identity, IdentityError, ListingIdentity};
pub use place::{CompetitorRecord, PlaceRecord, Plan, MAX_KEYWORDS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
