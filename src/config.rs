//! Configuration for Harbor
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Harbor - per-user registry of named object-storage endpoints
#[derive(Parser, Debug, Clone)]
#[command(name = "harbor")]
#[command(about = "Registry service for named object-storage endpoints")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "harbor")]
    pub mongodb_db: String,

    /// Bucket prefix that default storage entries are derived from.
    /// A new user's default entry points at "<prefix>/<user id>/".
    #[arg(long, env = "ENDPOINT_PREFIX", default_value = "s3://harbor")]
    pub endpoint_prefix: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (relaxed auth, MongoDB optional)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.endpoint_prefix.trim_matches('/').is_empty() {
            return Err("ENDPOINT_PREFIX must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_args() -> Args {
        Args {
            node_id: Uuid::new_v4(),
            listen: "127.0.0.1:8080".parse().unwrap(),
            mongodb_uri: "mongodb://localhost:27017".into(),
            mongodb_db: "harbor".into(),
            endpoint_prefix: "s3://harbor".into(),
            jwt_secret: Some("test-secret-that-is-at-least-32-characters".into()),
            jwt_expiry_seconds: 3600,
            dev_mode: false,
            log_level: "info".into(),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(test_args().validate().is_ok());
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        let mut args = test_args();
        args.jwt_secret = None;
        assert!(args.validate().is_err());

        args.dev_mode = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_empty_endpoint_prefix_rejected() {
        let mut args = test_args();
        args.endpoint_prefix = "".into();
        assert!(args.validate().is_err());

        args.endpoint_prefix = "///".into();
        assert!(args.validate().is_err());
    }
}
