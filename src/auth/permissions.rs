//! Permission levels for route authorization

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission levels carried in JWT claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum PermissionLevel {
    /// No authentication
    #[default]
    Public = 0,
    /// Authenticated user - may read and register own storage entries
    Authenticated = 1,
    /// Admin - reserved for operational tooling
    Admin = 2,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Public => write!(f, "PUBLIC"),
            PermissionLevel::Authenticated => write!(f, "AUTHENTICATED"),
            PermissionLevel::Admin => write!(f, "ADMIN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(PermissionLevel::Public < PermissionLevel::Authenticated);
        assert!(PermissionLevel::Authenticated < PermissionLevel::Admin);
        assert!(PermissionLevel::Admin >= PermissionLevel::Authenticated);
    }

    #[test]
    fn test_serde_roundtrip() {
        let json = serde_json::to_string(&PermissionLevel::Authenticated).unwrap();
        assert_eq!(json, "\"AUTHENTICATED\"");

        let level: PermissionLevel = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(level, PermissionLevel::Admin);
    }

    #[test]
    fn test_default_is_public() {
        assert_eq!(PermissionLevel::default(), PermissionLevel::Public);
    }
}
