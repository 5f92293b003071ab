//! Authentication and authorization for Harbor
//!
//! Provides:
//! - JWT token generation and validation
//! - Permission levels for route authorization
//! - Password hashing with Argon2

pub mod jwt;
pub mod password;
pub mod permissions;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use password::{hash_password, verify_password};
pub use permissions::PermissionLevel;

use uuid::Uuid;

/// Authenticated caller identity handed to the storage registry.
///
/// Produced from validated JWT claims; requests that fail authentication
/// never reach the registry.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub identifier: String,
}

impl From<&Claims> for AuthUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.user_id,
            identifier: claims.identifier.clone(),
        }
    }
}
