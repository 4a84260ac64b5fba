//!
//! Documentation of the auth module.
//! Turns an opaque credential into the identity every ride operation is called with.
//!

use std::fmt;
use std::str::FromStr;

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of user roles
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Driver,
    Rider,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Driver => "driver",
            Role::Rider => "rider",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

/// Only the exact lowercase names are accepted
impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "driver" => Ok(Role::Driver),
            "rider" => Ok(Role::Rider),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Who is calling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: ObjectId,
    pub role: Role,
}

impl CallerIdentity {
    pub fn new(user_id: ObjectId, role: Role) -> Self {
        CallerIdentity { user_id, role }
    }

    pub fn is(&self, user: &ObjectId) -> bool {
        &self.user_id == user
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.user_id.to_hex(), self.role)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingCredential,

    #[error("Malformed credential: {0}")]
    Malformed(String),

    #[error("Credential carries an {0}")]
    UnknownRole(#[from] UnknownRole),
}

///
/// Validates credentials issued by the identity service.
///
/// Implementations must not touch any ambient session state; the
/// returned identity is threaded explicitly into the ride operations.
///
pub trait IdentityOracle: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<CallerIdentity, AuthError>;
}

///
/// Oracle for the session cookie.
///
/// The cookie jar has already decrypted and verified the cookie with the
/// shared secret key, so what is left is the `<userId>:<role>` payload.
///
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionCookieOracle;

impl IdentityOracle for SessionCookieOracle {
    fn authenticate(&self, token: &str) -> Result<CallerIdentity, AuthError> {
        let (user, role) = token
            .split_once(':')
            .ok_or_else(|| AuthError::Malformed("expected '<userId>:<role>'".to_string()))?;

        let user_id = ObjectId::parse_str(user.trim())
            .map_err(|_| AuthError::Malformed(format!("'{}' is not a user id", user)))?;
        let role = role.trim().parse::<Role>()?;

        Ok(CallerIdentity::new(user_id, role))
    }
}

/// Builds the cookie payload understood by `SessionCookieOracle`
#[cfg(test)]
pub fn session_token(identity: &CallerIdentity) -> String {
    format!("{}:{}", identity.user_id.to_hex(), identity.role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_only_exact_lowercase_names() {
        assert_eq!("driver".parse::<Role>(), Ok(Role::Driver));
        assert_eq!("rider".parse::<Role>(), Ok(Role::Rider));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("Driver".parse::<Role>(), Err(UnknownRole("Driver".to_string())));
        assert!("passenger".parse::<Role>().is_err());
    }

    #[test]
    fn session_cookie_round_trips_identity() {
        let identity = CallerIdentity::new(ObjectId::new(), Role::Rider);
        let token = session_token(&identity);

        assert_eq!(SessionCookieOracle.authenticate(&token), Ok(identity));
    }

    #[test]
    fn session_cookie_rejects_garbage() {
        let oracle = SessionCookieOracle;

        assert!(matches!(oracle.authenticate("no-separator"), Err(AuthError::Malformed(_))));
        assert!(matches!(oracle.authenticate("xyz:driver"), Err(AuthError::Malformed(_))));

        let id = ObjectId::new().to_hex();
        assert!(matches!(
            oracle.authenticate(&format!("{}:DRIVER", id)),
            Err(AuthError::UnknownRole(_))
        ));
    }
}
